use thiserror::Error;

/// Failures of the catalog collaborator.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog seed error: {0}")]
    Seed(String),

    #[error("catalog backend error: {0}")]
    Backend(String),
}

/// Ranking errors. A missing geography tier is never one of them.
#[derive(Debug, Error)]
pub enum RankingError {
    #[error("volunteer not found: {0}")]
    VolunteerNotFound(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
