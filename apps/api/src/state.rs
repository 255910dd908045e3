use std::sync::Arc;

use sqlx::PgPool;

use crate::sponsors::catalog::TagCatalog;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Tag vocabulary used by the seed endpoint.
    pub catalog: Arc<TagCatalog>,
}
