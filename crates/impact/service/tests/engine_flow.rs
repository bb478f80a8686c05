//! End-to-end flows through the engine facade.

use chrono::Utc;
use futures::future::join_all;
use impact_anchor::{AnchoringAdapter, InMemoryAnchorTransport, RetryPolicy};
use impact_ledger::{VerificationError, VerificationLedger, VerifyRequest};
use impact_ranking::{GeographyTiers, InMemoryCatalog, RankingConfig, RankingEngine};
use impact_service::{EngineError, ImpactEngine};
use impact_storage::{InMemoryMatchStore, QueryWindow};
use impact_trust::{InMemoryTrustSource, TrustConfig, TrustGate, TrustThresholds};
use impact_types::{
    Badge, Cause, CauseId, MatchId, MatchStatus, OrgId, TrustVerdict, VolunteerId,
    VolunteerProfile,
};
use std::collections::HashSet;
use std::sync::Arc;

struct Harness {
    engine: ImpactEngine,
    anchor: Arc<InMemoryAnchorTransport>,
    trust_source: Arc<InMemoryTrustSource>,
}

fn corpus() -> Vec<Cause> {
    vec![
        Cause::new(
            "c-plant-blr",
            "Tree Plantation Drive",
            "Plant trees and care for saplings in Bangalore parks",
            "Environment",
            "Bangalore",
            "org-green",
        ),
        Cause::new(
            "c-beach-che",
            "Beach Cleanup",
            "Clean the beach and plant native dune grass",
            "Environment",
            "Chennai",
            "org-coast",
        ),
        Cause::new(
            "c-read-del",
            "Reading Hour",
            "Teach children to read at the community library",
            "Education",
            "Delhi",
            "org-books",
        ),
        Cause::new(
            "c-food-mum",
            "Food Bank",
            "Sort and pack food for families",
            "Hunger",
            "Mumbai",
            "org-food",
        ),
    ]
}

fn harness() -> Harness {
    let catalog = InMemoryCatalog::new();
    for cause in corpus() {
        catalog.upsert_cause(cause).unwrap();
    }
    for volunteer in [
        VolunteerProfile::new("v-blr", "plant trees", "Bangalore"),
        VolunteerProfile::new("v-che", "plant trees", "Chennai"),
        VolunteerProfile::new("v-nowhere", "teach children", "Atlantis"),
        VolunteerProfile::new("v-blank", "", "Bangalore"),
    ] {
        catalog.upsert_volunteer(volunteer).unwrap();
    }

    let ranking = RankingEngine::new(
        Arc::new(catalog),
        GeographyTiers::default(),
        RankingConfig::default(),
    );

    let trust_source = Arc::new(InMemoryTrustSource::with_scores(
        TrustThresholds::default(),
        [("org-green", 92u8), ("org-weak", 30u8)],
    ));
    let trust = Arc::new(TrustGate::new(trust_source.clone(), TrustConfig::default()));
    let anchor = Arc::new(InMemoryAnchorTransport::new());
    let adapter = Arc::new(AnchoringAdapter::new(anchor.clone(), RetryPolicy::immediate(3)));
    let ledger = VerificationLedger::new(Arc::new(InMemoryMatchStore::new()), trust, adapter);

    Harness {
        engine: ImpactEngine::from_parts(ranking, ledger),
        anchor,
        trust_source,
    }
}

fn request(match_id: &MatchId, org: &str) -> VerifyRequest {
    VerifyRequest {
        match_id: match_id.clone(),
        verifier_org: OrgId::new(org),
        admin_override: false,
    }
}

#[tokio::test]
async fn bangalore_and_chennai_volunteers_get_nearby_tree_causes_first() {
    let h = harness();

    let blr = h.engine.rank(&VolunteerId::new("v-blr"), Some(2)).await.unwrap();
    assert_eq!(blr.len(), 2);
    assert_eq!(blr[0].cause.cause_id, CauseId::new("c-plant-blr"));
    assert!(blr.iter().all(|r| !r.geography_fallback));
    assert!(blr
        .iter()
        .all(|r| r.cause.city == "Bangalore" || r.cause.city == "Chennai"));

    let che = h.engine.rank(&VolunteerId::new("v-che"), Some(5)).await.unwrap();
    let ids: Vec<_> = che.iter().map(|r| r.cause.cause_id.as_str()).collect();
    assert!(ids.contains(&"c-plant-blr"));
    assert!(!ids.contains(&"c-read-del"));
}

#[tokio::test]
async fn ranking_is_deterministic() {
    let h = harness();
    let volunteer = VolunteerId::new("v-blr");
    let first = h.engine.rank(&volunteer, None).await.unwrap();
    for _ in 0..5 {
        assert_eq!(h.engine.rank(&volunteer, None).await.unwrap(), first);
    }
}

#[tokio::test]
async fn unknown_city_falls_back_to_whole_corpus() {
    let h = harness();
    let ranked = h
        .engine
        .rank(&VolunteerId::new("v-nowhere"), Some(3))
        .await
        .unwrap();
    assert_eq!(ranked.len(), 3);
    assert!(ranked.iter().all(|r| r.geography_fallback));
    assert_eq!(ranked[0].cause.cause_id, CauseId::new("c-read-del"));
}

#[tokio::test]
async fn blank_interests_still_rank_nearby_causes() {
    let h = harness();
    let ranked = h.engine.rank(&VolunteerId::new("v-blank"), None).await.unwrap();
    assert_eq!(ranked.len(), 2);
    assert!(ranked.iter().all(|r| r.score == 0.0));
}

#[tokio::test]
async fn concurrent_verifications_attach_exactly_one_proof() {
    let h = harness();
    let volunteer = VolunteerId::new("v-blr");
    let created = h
        .engine
        .create_match(&volunteer, &CauseId::new("c-plant-blr"))
        .await
        .unwrap();

    let calls = (0..24).map(|_| {
        let engine = h.engine.clone();
        let req = request(&created.match_id, "org-green");
        async move { engine.verify(req).await }
    });
    let results = join_all(calls).await;

    let mut references = HashSet::new();
    for result in results {
        match result {
            Ok(proof) => {
                references.insert(proof.anchor_reference);
            }
            Err(EngineError::Verification(VerificationError::AlreadyFinalized {
                status: MatchStatus::Verified,
                ..
            })) => {}
            Err(other) => panic!("unexpected verification outcome: {}", other),
        }
    }

    let stored = h.engine.get_match(&created.match_id).await.unwrap();
    assert_eq!(stored.status, MatchStatus::Verified);
    let proof = stored.proof.expect("verified match carries its proof");
    assert_eq!(references.len(), 1);
    assert!(references.contains(&proof.anchor_reference));
    assert!(h.engine.audit_chain_intact().await.unwrap());
}

#[tokio::test]
async fn untrusted_org_rejects_the_match() {
    let h = harness();
    let created = h
        .engine
        .create_match(&VolunteerId::new("v-che"), &CauseId::new("c-beach-che"))
        .await
        .unwrap();

    let err = h
        .engine
        .verify(request(&created.match_id, "org-weak"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Verification(VerificationError::TrustDenied { .. })
    ));

    let stored = h.engine.get_match(&created.match_id).await.unwrap();
    assert_eq!(stored.status, MatchStatus::Rejected);
    assert!(stored.proof.is_none());
    assert_eq!(h.anchor.submissions(), 0);
}

#[tokio::test]
async fn dashboard_only_org_needs_admin_override() {
    let h = harness();
    h.engine.ledger().trust_gate().prime(TrustVerdict {
        org_id: OrgId::new("org-pending"),
        score: 70,
        verified: false,
        dashboard_access: true,
        fetched_at: Utc::now(),
    });
    let volunteer = VolunteerId::new("v-blr");
    let without = h
        .engine
        .create_match(&volunteer, &CauseId::new("c-plant-blr"))
        .await
        .unwrap();
    let with = h
        .engine
        .create_match(&volunteer, &CauseId::new("c-beach-che"))
        .await
        .unwrap();

    let err = h
        .engine
        .verify(request(&without.match_id, "org-pending"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Verification(VerificationError::TrustDenied { .. })
    ));

    let proof = h
        .engine
        .verify(VerifyRequest {
            admin_override: true,
            ..request(&with.match_id, "org-pending")
        })
        .await
        .unwrap();
    assert_eq!(proof.verified_by, OrgId::new("org-pending"));
}

#[tokio::test]
async fn anchor_outage_leaves_match_retriable() {
    let h = harness();
    let created = h
        .engine
        .create_match(&VolunteerId::new("v-blr"), &CauseId::new("c-plant-blr"))
        .await
        .unwrap();

    h.anchor.fail_always(true);
    let err = h
        .engine
        .verify(request(&created.match_id, "org-green"))
        .await
        .unwrap_err();
    match err {
        EngineError::Verification(inner) => assert!(inner.is_retriable()),
        other => panic!("expected a verification error, got {}", other),
    }
    assert_eq!(
        h.engine.get_match(&created.match_id).await.unwrap().status,
        MatchStatus::Interested
    );

    h.anchor.fail_always(false);
    h.engine
        .verify(request(&created.match_id, "org-green"))
        .await
        .unwrap();
    assert_eq!(
        h.engine.get_match(&created.match_id).await.unwrap().status,
        MatchStatus::Verified
    );
}

#[tokio::test]
async fn trust_outage_with_no_history_fails_closed() {
    let h = harness();
    h.trust_source.set_unavailable(true);
    let created = h
        .engine
        .create_match(&VolunteerId::new("v-blr"), &CauseId::new("c-plant-blr"))
        .await
        .unwrap();

    let err = h
        .engine
        .verify(request(&created.match_id, "org-green"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Verification(VerificationError::TrustDenied { .. })
    ));
}

#[tokio::test]
async fn deny_is_idempotent_and_terminal() {
    let h = harness();
    let created = h
        .engine
        .create_match(&VolunteerId::new("v-blr"), &CauseId::new("c-plant-blr"))
        .await
        .unwrap();
    let org = OrgId::new("org-green");

    let first = h.engine.deny(&created.match_id, &org, "did not attend").await.unwrap();
    let second = h.engine.deny(&created.match_id, &org, "other").await.unwrap();
    assert_eq!(first.status, MatchStatus::Rejected);
    assert_eq!(first.rejection, second.rejection);

    let err = h
        .engine
        .verify(request(&created.match_id, "org-green"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Verification(VerificationError::AlreadyFinalized {
            status: MatchStatus::Rejected,
            ..
        })
    ));
}

#[tokio::test]
async fn standing_grows_with_verified_matches() {
    let h = harness();
    let volunteer = VolunteerId::new("v-blr");
    let causes = corpus();

    for cause in &causes[..3] {
        let created = h.engine.create_match(&volunteer, &cause.cause_id).await.unwrap();
        h.engine
            .verify(request(&created.match_id, "org-green"))
            .await
            .unwrap();
    }
    h.engine
        .create_match(&volunteer, &causes[3].cause_id)
        .await
        .unwrap();

    let standing = h.engine.impact_standing(&volunteer).await.unwrap();
    assert_eq!(standing.verified_matches, 3);
    assert_eq!(standing.pending_matches, 1);
    assert_eq!(standing.impact_score, 60);
    assert_eq!(standing.badge, Some(Badge::Bronze));

    let pending = h.engine.pending_for(&volunteer).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].cause_id, causes[3].cause_id);

    let attempts = h
        .engine
        .attempts(QueryWindow {
            limit: 2,
            offset: 0,
        })
        .await
        .unwrap();
    assert_eq!(attempts.len(), 2);
    assert!(attempts[0].sequence > attempts[1].sequence);
}
