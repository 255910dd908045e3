//! Data access for the sponsor directory tables.
//!
//! Every function takes the caller's connection, so a request can run several
//! of them inside one `Transaction` (which derefs to `PgConnection`).

use std::collections::HashMap;

use anyhow::Result;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::models::sponsor::{
    Availability, SponsorMetricsRow, SponsorMetricsTag, SponsorTag, SponsorTagRow, TagType,
};
use crate::models::user::User;
use crate::sponsors::catalog::TagDefinition;
use crate::sponsors::metrics::{NewSponsorMetrics, SponsorMetrics};

/// Join row plus the tag it points at.
#[derive(Debug, FromRow)]
struct AttachedTagRow {
    user_id: Uuid,
    tag: String,
    tag_type: i32,
    label: String,
    long_description: String,
}

impl AttachedTagRow {
    fn into_parts(self) -> (Uuid, SponsorTag) {
        let tag = SponsorTagRow {
            tag: self.tag,
            tag_type: self.tag_type,
            label: self.label,
            long_description: self.long_description,
        };
        (self.user_id, tag.into())
    }
}

/// Availability codes of sponsors shown in the directory.
fn listed_codes() -> Vec<i32> {
    vec![Availability::Restricted.code(), Availability::Public.code()]
}

pub async fn find_user(conn: &mut PgConnection, user_id: Uuid) -> Result<Option<User>> {
    Ok(sqlx::query_as::<_, User>(
        "SELECT id, name, email, created_at FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?)
}

pub async fn find_users(conn: &mut PgConnection, user_ids: &[Uuid]) -> Result<Vec<User>> {
    Ok(sqlx::query_as::<_, User>(
        "SELECT id, name, email, created_at FROM users WHERE id = ANY($1) ORDER BY id",
    )
    .bind(user_ids)
    .fetch_all(&mut *conn)
    .await?)
}

/// Loads one sponsor's metrics row with its tags attached.
pub async fn find_metrics_by_user(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> Result<Option<SponsorMetrics>> {
    let row: Option<SponsorMetricsRow> =
        sqlx::query_as("SELECT * FROM sponsor_metrics WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await?;

    match row {
        Some(row) => {
            let tags = find_tags_for_metrics(conn, user_id).await?;
            Ok(Some(SponsorMetrics::from_row(row, tags)))
        }
        None => Ok(None),
    }
}

/// Tags attached to a sponsor, in the order they were attached.
pub async fn find_tags_for_metrics(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> Result<Vec<SponsorTag>> {
    let rows = sqlx::query_as::<_, SponsorTagRow>(
        r#"
        SELECT t.tag, t.tag_type, t.label, t.long_description
        FROM sponsor_metrics_tags mt
        JOIN sponsor_tags t ON t.tag = mt.tag
        WHERE mt.user_id = $1
        ORDER BY mt.position, t.tag
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(SponsorTag::from).collect())
}

pub async fn list_tags(conn: &mut PgConnection) -> Result<Vec<SponsorTag>> {
    let rows = sqlx::query_as::<_, SponsorTagRow>(
        "SELECT tag, tag_type, label, long_description FROM sponsor_tags ORDER BY tag_type, label",
    )
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(SponsorTag::from).collect())
}

/// Listed sponsors attached to every tag in `tags`.
///
/// An empty filter matches every listed sponsor.
pub async fn find_user_ids_with_tags(
    conn: &mut PgConnection,
    tags: &[String],
) -> Result<Vec<Uuid>> {
    let tags = dedup_preserving_order(tags);

    if tags.is_empty() {
        return Ok(sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM sponsor_metrics WHERE availability = ANY($1) ORDER BY user_id",
        )
        .bind(listed_codes())
        .fetch_all(&mut *conn)
        .await?);
    }

    Ok(sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT m.user_id
        FROM sponsor_metrics m
        JOIN sponsor_metrics_tags mt ON mt.user_id = m.user_id
        WHERE m.availability = ANY($1) AND mt.tag = ANY($2)
        GROUP BY m.user_id
        HAVING COUNT(DISTINCT mt.tag) = $3
        ORDER BY m.user_id
        "#,
    )
    .bind(listed_codes())
    .bind(&tags)
    .bind(tags.len() as i64)
    .fetch_all(&mut *conn)
    .await?)
}

/// Listed sponsors, optionally narrowed to those carrying all of `tags`.
pub async fn list_metrics(
    conn: &mut PgConnection,
    tags: &[String],
) -> Result<Vec<SponsorMetrics>> {
    let user_ids = find_user_ids_with_tags(conn, tags).await?;
    if user_ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, SponsorMetricsRow>(
        "SELECT * FROM sponsor_metrics WHERE user_id = ANY($1) ORDER BY user_id",
    )
    .bind(&user_ids)
    .fetch_all(&mut *conn)
    .await?;

    let attached = sqlx::query_as::<_, AttachedTagRow>(
        r#"
        SELECT mt.user_id, t.tag, t.tag_type, t.label, t.long_description
        FROM sponsor_metrics_tags mt
        JOIN sponsor_tags t ON t.tag = mt.tag
        WHERE mt.user_id = ANY($1)
        ORDER BY mt.user_id, mt.position, t.tag
        "#,
    )
    .bind(&user_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_user: HashMap<Uuid, Vec<SponsorTag>> = HashMap::new();
    for row in attached {
        let (user_id, tag) = row.into_parts();
        by_user.entry(user_id).or_default().push(tag);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let tags = by_user.remove(&row.user_id).unwrap_or_default();
            SponsorMetrics::from_row(row, tags)
        })
        .collect())
}

/// Inserts or replaces the single metrics row of a user.
pub async fn save_metrics(
    conn: &mut PgConnection,
    metrics: &NewSponsorMetrics,
) -> Result<SponsorMetricsRow> {
    Ok(sqlx::query_as::<_, SponsorMetricsRow>(
        r#"
        INSERT INTO sponsor_metrics
            (user_id, availability, contact, types, guidelines, guidelines_text, social_requirements)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (user_id) DO UPDATE SET
            availability = EXCLUDED.availability,
            contact = EXCLUDED.contact,
            types = EXCLUDED.types,
            guidelines = EXCLUDED.guidelines,
            guidelines_text = EXCLUDED.guidelines_text,
            social_requirements = EXCLUDED.social_requirements
        RETURNING *
        "#,
    )
    .bind(metrics.user_id)
    .bind(metrics.availability.code())
    .bind(metrics.contact.code())
    .bind(metrics.types.as_deref())
    .bind(metrics.guidelines.code())
    .bind(metrics.guidelines_text.as_deref())
    .bind(metrics.social_requirements.as_deref())
    .fetch_one(&mut *conn)
    .await?)
}

/// Replaces the tags attached to a sponsor. Repeated identifiers are kept
/// once, at their first position.
pub async fn set_metrics_tags(
    conn: &mut PgConnection,
    user_id: Uuid,
    tags: &[String],
) -> Result<Vec<SponsorMetricsTag>> {
    sqlx::query("DELETE FROM sponsor_metrics_tags WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    let mut inserted = Vec::new();
    for (position, tag) in dedup_preserving_order(tags).into_iter().enumerate() {
        let row = sqlx::query_as::<_, SponsorMetricsTag>(
            r#"
            INSERT INTO sponsor_metrics_tags (tag, user_id, position)
            VALUES ($1, $2, $3)
            RETURNING tag, user_id, position
            "#,
        )
        .bind(tag)
        .bind(user_id)
        .bind(position as i32)
        .fetch_one(&mut *conn)
        .await?;
        inserted.push(row);
    }
    Ok(inserted)
}

/// Returns false when the user had no metrics row.
pub async fn delete_metrics(conn: &mut PgConnection, user_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM sponsor_metrics WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Inserts a tag or refreshes its category, label and description.
pub async fn upsert_tag(
    conn: &mut PgConnection,
    tag_type: TagType,
    def: &TagDefinition,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO sponsor_tags (tag, tag_type, label, long_description)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (tag) DO UPDATE SET
            tag_type = EXCLUDED.tag_type,
            label = EXCLUDED.label,
            long_description = EXCLUDED.long_description
        "#,
    )
    .bind(&def.tag)
    .bind(tag_type.code())
    .bind(&def.label)
    .bind(&def.long_description)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Tags that do not exist in `sponsor_tags`.
pub async fn find_unknown_tags(conn: &mut PgConnection, tags: &[String]) -> Result<Vec<String>> {
    if tags.is_empty() {
        return Ok(Vec::new());
    }
    let known: Vec<String> = sqlx::query_scalar("SELECT tag FROM sponsor_tags WHERE tag = ANY($1)")
        .bind(tags)
        .fetch_all(&mut *conn)
        .await?;
    Ok(dedup_preserving_order(tags)
        .into_iter()
        .filter(|t| !known.contains(t))
        .collect())
}

fn dedup_preserving_order(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        if !out.contains(tag) {
            out.push(tag.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sponsor::{ContactMethod, GuidelinesMode};
    use crate::sponsors::catalog::TagCatalog;
    use crate::sponsors::seed::create_tags;
    use sqlx::PgPool;

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let tags = vec![
            "dh".to_string(),
            "irc".to_string(),
            "dh".to_string(),
            "qa".to_string(),
        ];
        assert_eq!(dedup_preserving_order(&tags), vec!["dh", "irc", "qa"]);
    }

    #[test]
    fn test_listed_codes_match_enum() {
        assert_eq!(listed_codes(), vec![1, 2]);
    }

    async fn insert_user(conn: &mut PgConnection, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO users (id, name, email) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(name)
            .bind(format!("{name}@example.org"))
            .execute(&mut *conn)
            .await
            .unwrap();
        id
    }

    fn new_metrics(user_id: Uuid, availability: Availability) -> NewSponsorMetrics {
        NewSponsorMetrics {
            user_id,
            availability,
            contact: ContactMethod::Email,
            types: Some("Python modules".into()),
            guidelines: GuidelinesMode::Url,
            guidelines_text: Some("http://example.org".into()),
            social_requirements: None,
        }
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_save_and_find_metrics(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        create_tags(&mut conn, &TagCatalog::builtin()).await.unwrap();
        let user = insert_user(&mut conn, "alice").await;

        save_metrics(&mut conn, &new_metrics(user, Availability::Public))
            .await
            .unwrap();
        let tags = vec!["irc".to_string(), "dfsg".to_string(), "irc".to_string()];
        let rows = set_metrics_tags(&mut conn, user, &tags).await.unwrap();
        assert_eq!(rows.len(), 2);

        let m = find_metrics_by_user(&mut conn, user).await.unwrap().unwrap();
        assert_eq!(m.all_tags(), vec!["irc", "dfsg"]);
        assert_eq!(m.technical_tags(), vec!["dfsg"]);
        assert_eq!(m.social_tags(), vec!["irc"]);
        assert_eq!(
            m.formatted_guidelines(),
            "<a href=\"http://example.org\">http://example.org</a>"
        );
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_save_metrics_keeps_one_row_per_user(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = insert_user(&mut conn, "bob").await;

        save_metrics(&mut conn, &new_metrics(user, Availability::Public))
            .await
            .unwrap();
        save_metrics(&mut conn, &new_metrics(user, Availability::Restricted))
            .await
            .unwrap();

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sponsor_metrics WHERE user_id = $1")
                .bind(user)
                .fetch_one(&mut *conn)
                .await
                .unwrap();
        assert_eq!(count, 1);
        let m = find_metrics_by_user(&mut conn, user).await.unwrap().unwrap();
        assert_eq!(m.availability, Availability::Restricted);
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_tag_filter_requires_all_tags(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        create_tags(&mut conn, &TagCatalog::builtin()).await.unwrap();

        let both = insert_user(&mut conn, "carol").await;
        let one = insert_user(&mut conn, "dave").await;
        let hidden = insert_user(&mut conn, "erin").await;
        for (user, availability) in [
            (both, Availability::Public),
            (one, Availability::Restricted),
            (hidden, Availability::Private),
        ] {
            save_metrics(&mut conn, &new_metrics(user, availability))
                .await
                .unwrap();
        }
        let dh_irc = vec!["dh".to_string(), "irc".to_string()];
        set_metrics_tags(&mut conn, both, &dh_irc).await.unwrap();
        set_metrics_tags(&mut conn, one, &["dh".to_string()]).await.unwrap();
        set_metrics_tags(&mut conn, hidden, &dh_irc).await.unwrap();

        let ids = find_user_ids_with_tags(&mut conn, &dh_irc).await.unwrap();
        assert_eq!(ids, vec![both]);

        let listed = list_metrics(&mut conn, &[]).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|m| m.user_id != hidden));
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_deleting_user_cascades(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        create_tags(&mut conn, &TagCatalog::builtin()).await.unwrap();
        let user = insert_user(&mut conn, "frank").await;
        save_metrics(&mut conn, &new_metrics(user, Availability::Public))
            .await
            .unwrap();
        set_metrics_tags(&mut conn, user, &["qa".to_string()])
            .await
            .unwrap();

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user)
            .execute(&mut *conn)
            .await
            .unwrap();

        assert!(find_metrics_by_user(&mut conn, user).await.unwrap().is_none());
        let join_rows: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sponsor_metrics_tags WHERE user_id = $1")
                .bind(user)
                .fetch_one(&mut *conn)
                .await
                .unwrap();
        assert_eq!(join_rows, 0);
        assert!(!delete_metrics(&mut conn, user).await.unwrap());
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_attaching_missing_tag_is_foreign_key_violation(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let user = insert_user(&mut conn, "grace").await;
        save_metrics(&mut conn, &new_metrics(user, Availability::Public))
            .await
            .unwrap();

        let err = set_metrics_tags(&mut conn, user, &["never-seeded".to_string()])
            .await
            .unwrap_err();
        assert!(crate::errors::is_foreign_key_violation(&err));
    }

    #[sqlx::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_unknown_tags_reported(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        create_tags(&mut conn, &TagCatalog::builtin()).await.unwrap();
        let unknown = find_unknown_tags(
            &mut conn,
            &["dh".to_string(), "bogus".to_string(), "bogus".to_string()],
        )
        .await
        .unwrap();
        assert_eq!(unknown, vec!["bogus"]);
    }
}
