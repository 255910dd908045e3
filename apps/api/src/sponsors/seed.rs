use anyhow::{Context, Result};
use sqlx::{Connection, PgConnection};
use tracing::{info, warn};

use crate::sponsors::catalog::TagCatalog;
use crate::sponsors::repository::upsert_tag;

/// Writes every catalog tag into `sponsor_tags`, technical tags first, and
/// commits once at the end.
///
/// Existing tags are updated in place, so running this again never creates
/// duplicates. Returns the number of tags written.
pub async fn create_tags(conn: &mut PgConnection, catalog: &TagCatalog) -> Result<usize> {
    catalog.validate()?;
    if catalog.is_empty() {
        warn!("Tag catalog is empty, no sponsor tags to seed");
    }

    let mut tx = conn.begin().await?;
    let mut written = 0;
    for (tag_type, def) in catalog.entries() {
        info!("Adding tag {}", def.tag);
        upsert_tag(&mut tx, tag_type, def)
            .await
            .with_context(|| format!("Failed to upsert tag '{}'", def.tag))?;
        written += 1;
    }
    tx.commit().await?;

    info!("Seeded {written} sponsor tags");
    Ok(written)
}
