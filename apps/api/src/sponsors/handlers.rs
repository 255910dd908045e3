use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::{is_foreign_key_violation, AppError};
use crate::models::sponsor::{Availability, ContactMethod, GuidelinesMode, SponsorTag};
use crate::models::user::User;
use crate::sponsors::metrics::{NewSponsorMetrics, SponsorMetrics};
use crate::sponsors::repository;
use crate::sponsors::seed::create_tags;
use crate::state::AppState;

/// A sponsor as shown in the directory. Text fields are HTML fragments.
#[derive(Debug, Serialize)]
pub struct SponsorView {
    pub user_id: Uuid,
    pub name: Option<String>,
    /// Present only when the sponsor allows contact by email.
    pub email: Option<String>,
    pub availability: Availability,
    pub contact: ContactMethod,
    pub types: String,
    pub guidelines: String,
    pub social_requirements: String,
    pub technical_tags: Vec<String>,
    pub social_tags: Vec<String>,
}

impl SponsorView {
    pub fn new(metrics: &SponsorMetrics, user: Option<&User>) -> Self {
        let email = user
            .filter(|_| metrics.allowed(ContactMethod::Email))
            .map(|u| u.email.clone());
        SponsorView {
            user_id: metrics.user_id,
            name: user.map(|u| u.name.clone()),
            email,
            availability: metrics.availability,
            contact: metrics.contact,
            types: metrics.formatted_types(),
            guidelines: metrics.formatted_guidelines(),
            social_requirements: metrics.formatted_social_requirements(),
            technical_tags: owned_tags(metrics.technical_tags()),
            social_tags: owned_tags(metrics.social_tags()),
        }
    }
}

fn owned_tags(tags: Vec<&str>) -> Vec<String> {
    tags.into_iter().map(str::to_string).collect()
}

#[derive(Debug, Deserialize)]
pub struct SponsorListQuery {
    /// Comma separated tag identifiers; sponsors must carry all of them.
    pub tags: Option<String>,
}

fn parse_tag_filter(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
pub struct SaveMetricsRequest {
    pub availability: Availability,
    pub contact: ContactMethod,
    #[serde(default)]
    pub types: Option<String>,
    #[serde(default = "default_guidelines")]
    pub guidelines: GuidelinesMode,
    #[serde(default)]
    pub guidelines_text: Option<String>,
    #[serde(default)]
    pub social_requirements: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_guidelines() -> GuidelinesMode {
    GuidelinesMode::None
}

impl SaveMetricsRequest {
    /// Rejects values the directory cannot store or render.
    ///
    /// Guideline URLs must be http(s) links since they are rendered as an
    /// anchor target.
    pub fn validate(&self) -> Result<(), AppError> {
        if let Availability::Unknown(code) = self.availability {
            return Err(AppError::Validation(format!("Unknown availability {code}")));
        }
        if let ContactMethod::Unknown(code) = self.contact {
            return Err(AppError::Validation(format!("Unknown contact method {code}")));
        }
        let text = self
            .guidelines_text
            .as_deref()
            .map(str::trim)
            .unwrap_or_default();
        match self.guidelines {
            GuidelinesMode::Unknown(code) => {
                return Err(AppError::Validation(format!("Unknown guidelines mode {code}")));
            }
            GuidelinesMode::Text if text.is_empty() => {
                return Err(AppError::Validation(
                    "guidelines_text is required for inline guidelines".into(),
                ));
            }
            GuidelinesMode::Url if !(text.starts_with("http://") || text.starts_with("https://")) => {
                return Err(AppError::Validation(
                    "guidelines_text must be an http(s) URL".into(),
                ));
            }
            _ => {}
        }
        Ok(())
    }

    fn into_new_metrics(self, user_id: Uuid) -> (NewSponsorMetrics, Vec<String>) {
        let guidelines_text = match self.guidelines {
            GuidelinesMode::Url => self.guidelines_text.map(|t| t.trim().to_string()),
            _ => self.guidelines_text,
        };
        (
            NewSponsorMetrics {
                user_id,
                availability: self.availability,
                contact: self.contact,
                types: self.types,
                guidelines: self.guidelines,
                guidelines_text,
                social_requirements: self.social_requirements,
            },
            self.tags,
        )
    }
}

/// A tag removed between the existence check and the insert still reports as
/// a bad request rather than a server error.
fn tag_write_error(err: anyhow::Error) -> AppError {
    if is_foreign_key_violation(&err) {
        AppError::Validation("Unknown tags in request".into())
    } else {
        AppError::Internal(err)
    }
}

#[derive(Serialize)]
pub struct SeedResponse {
    pub seeded: usize,
}

/// GET /api/v1/sponsor-tags
pub async fn handle_list_tags(
    State(state): State<AppState>,
) -> Result<Json<Vec<SponsorTag>>, AppError> {
    let mut conn = state.db.acquire().await?;
    let tags = repository::list_tags(&mut conn).await?;
    Ok(Json(tags))
}

/// POST /api/v1/sponsor-tags/seed
pub async fn handle_seed_tags(
    State(state): State<AppState>,
) -> Result<Json<SeedResponse>, AppError> {
    let mut conn = state.db.acquire().await?;
    let seeded = create_tags(&mut conn, &state.catalog).await?;
    Ok(Json(SeedResponse { seeded }))
}

/// GET /api/v1/sponsors
pub async fn handle_list_sponsors(
    State(state): State<AppState>,
    Query(params): Query<SponsorListQuery>,
) -> Result<Json<Vec<SponsorView>>, AppError> {
    let filter = parse_tag_filter(params.tags.as_deref());
    let mut conn = state.db.acquire().await?;

    let sponsors = repository::list_metrics(&mut conn, &filter).await?;
    let ids: Vec<Uuid> = sponsors.iter().map(|m| m.user_id).collect();
    let users: HashMap<Uuid, User> = repository::find_users(&mut conn, &ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    Ok(Json(
        sponsors
            .iter()
            .map(|m| SponsorView::new(m, users.get(&m.user_id)))
            .collect(),
    ))
}

/// GET /api/v1/sponsors/:user_id
pub async fn handle_get_sponsor(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<SponsorView>, AppError> {
    let mut conn = state.db.acquire().await?;
    let metrics = repository::find_metrics_by_user(&mut conn, user_id)
        .await?
        .filter(|m| m.availability.is_listed())
        .ok_or_else(|| AppError::NotFound(format!("No sponsor metrics for user {user_id}")))?;
    let user = repository::find_user(&mut conn, user_id).await?;
    Ok(Json(SponsorView::new(&metrics, user.as_ref())))
}

/// PUT /api/v1/sponsors/:user_id
pub async fn handle_save_sponsor(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<SaveMetricsRequest>,
) -> Result<Json<SponsorView>, AppError> {
    req.validate()?;
    let (metrics, tags) = req.into_new_metrics(user_id);

    let mut tx = state.db.begin().await?;

    let user = repository::find_user(&mut tx, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))?;

    let unknown = repository::find_unknown_tags(&mut tx, &tags).await?;
    if !unknown.is_empty() {
        return Err(AppError::Validation(format!(
            "Unknown tags: {}",
            unknown.join(", ")
        )));
    }

    repository::save_metrics(&mut tx, &metrics).await?;
    repository::set_metrics_tags(&mut tx, user_id, &tags)
        .await
        .map_err(tag_write_error)?;
    let saved = repository::find_metrics_by_user(&mut tx, user_id)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Saved metrics for {user_id} vanished")))?;

    tx.commit().await?;
    info!("Saved sponsor metrics for user {user_id} with {} tags", saved.tags.len());

    Ok(Json(SponsorView::new(&saved, Some(&user))))
}

/// DELETE /api/v1/sponsors/:user_id
pub async fn handle_delete_sponsor(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let mut conn = state.db.acquire().await?;
    if !repository::delete_metrics(&mut conn, user_id).await? {
        return Err(AppError::NotFound(format!(
            "No sponsor metrics for user {user_id}"
        )));
    }
    info!("Deleted sponsor metrics for user {user_id}");
    Ok(StatusCode::NO_CONTENT)
}
