//! Handlers for the three reference vocabularies.
//!
//! The handlers are generic over a [`Vocabulary`] marker so one set of
//! functions serves `/allocated-units`, `/construction-units` and
//! `/allocation-waves`. Any authenticated user may read and write them.

use axum::extract::State;
use axum::http::StatusCode;
use ctrack_core::error::CoreError;
use ctrack_core::reference::{normalize_name, ReferenceKind};
use ctrack_core::types::DbId;
use ctrack_db::models::reference::{ReferenceEntry, ReferenceInput};
use ctrack_db::repositories::ReferenceRepo;

use crate::error::{AppError, AppResult};
use crate::extract::{Json, Path};
use crate::middleware::auth::AuthUser;
use crate::response::MessageResponse;
use crate::state::AppState;

/// Selects the vocabulary a handler instance operates on.
pub trait Vocabulary: Send + Sync + 'static {
    const KIND: ReferenceKind;
}

pub struct AllocatedUnits;
pub struct ConstructionUnits;
pub struct AllocationWaves;

impl Vocabulary for AllocatedUnits {
    const KIND: ReferenceKind = ReferenceKind::AllocatedUnit;
}

impl Vocabulary for ConstructionUnits {
    const KIND: ReferenceKind = ReferenceKind::ConstructionUnit;
}

impl Vocabulary for AllocationWaves {
    const KIND: ReferenceKind = ReferenceKind::AllocationWave;
}

fn not_found(kind: ReferenceKind, id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: kind.entity(),
        id,
    })
}

fn validated_name(input: &ReferenceInput) -> Result<String, CoreError> {
    normalize_name(&input.name).map_err(CoreError::Validation)
}

/// POST /api/<vocabulary>
pub async fn create<V: Vocabulary>(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<ReferenceInput>,
) -> AppResult<(StatusCode, Json<ReferenceEntry>)> {
    let name = validated_name(&input)?;
    let entry = ReferenceRepo::create(&state.pool, V::KIND, &name).await?;
    tracing::info!(
        table = V::KIND.table(),
        entry_id = entry.id,
        user_id = user.user_id,
        "Reference entry created"
    );
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /api/<vocabulary>
pub async fn list<V: Vocabulary>(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<Vec<ReferenceEntry>>> {
    Ok(Json(ReferenceRepo::list(&state.pool, V::KIND).await?))
}

/// GET /api/<vocabulary>/{id}
pub async fn get<V: Vocabulary>(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<ReferenceEntry>> {
    let entry = ReferenceRepo::find_by_id(&state.pool, V::KIND, id)
        .await?
        .ok_or_else(|| not_found(V::KIND, id))?;
    Ok(Json(entry))
}

/// PATCH /api/<vocabulary>/{id}
pub async fn rename<V: Vocabulary>(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<ReferenceInput>,
) -> AppResult<Json<ReferenceEntry>> {
    let name = validated_name(&input)?;
    let entry = ReferenceRepo::rename(&state.pool, V::KIND, id, &name)
        .await?
        .ok_or_else(|| not_found(V::KIND, id))?;
    tracing::info!(
        table = V::KIND.table(),
        entry_id = id,
        user_id = user.user_id,
        "Reference entry renamed"
    );
    Ok(Json(entry))
}

/// DELETE /api/<vocabulary>/{id}
pub async fn delete<V: Vocabulary>(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<MessageResponse>> {
    if !ReferenceRepo::delete(&state.pool, V::KIND, id).await? {
        return Err(not_found(V::KIND, id));
    }
    tracing::info!(
        table = V::KIND.table(),
        entry_id = id,
        user_id = user.user_id,
        "Reference entry deleted"
    );
    Ok(Json(MessageResponse::new("Deleted")))
}
