//! # cs-api Handlers
//!
//! Coordinates the flow between HTTP requests, the running stage session and
//! the store ports.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use cs_core::{
    AppError, ApprovalState, EventDirectory, ModerationStore, RandomSource, RawStageSettings,
    StageSettings, SubmissionDraft, SubmissionRecord,
};
use cs_cues::{DeckView, EmojiBurst, EmojiBursts, EmojiReaction, StageCue, StageDeck, StageNotice};
use cs_rotation::{StageScheduler, StageSnapshot};
use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::info;

use crate::error::ApiError;

const NOTICE_BUFFER: usize = 64;

/// State shared by all handlers of one hosted stage.
pub struct AppState {
    pub event_id: String,
    pub scheduler: Arc<StageScheduler>,
    pub moderation: Arc<dyn ModerationStore>,
    pub directory: Arc<dyn EventDirectory>,
    deck: Mutex<StageDeck>,
    bursts: Mutex<EmojiBursts>,
    rng: Mutex<Box<dyn RandomSource>>,
    notices: broadcast::Sender<StageNotice>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AppState {
    pub fn new(
        scheduler: Arc<StageScheduler>,
        moderation: Arc<dyn ModerationStore>,
        directory: Arc<dyn EventDirectory>,
        rng: Box<dyn RandomSource>,
    ) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_BUFFER);
        Self {
            event_id: scheduler.event_id().to_string(),
            scheduler,
            moderation,
            directory,
            deck: Mutex::new(StageDeck::new()),
            bursts: Mutex::new(EmojiBursts::new()),
            rng: Mutex::new(rng),
            notices,
        }
    }

    /// Notices the stage reported (video or audio ended).
    pub fn subscribe_notices(&self) -> broadcast::Receiver<StageNotice> {
        self.notices.subscribe()
    }
}

/// Everything the stage screen renders.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageView {
    pub event_id: String,
    pub slots: StageSnapshot,
    pub deck: DeckView,
    pub emojis: Vec<EmojiBurst>,
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn stage_view(State(state): State<Arc<AppState>>) -> Json<StageView> {
    let now = Utc::now();
    let deck = lock(&state.deck).view(now);
    let emojis = {
        let mut bursts = lock(&state.bursts);
        bursts.prune(now);
        bursts.live(now)
    };
    Json(StageView {
        event_id: state.event_id.clone(),
        slots: state.scheduler.snapshot(),
        deck,
        emojis,
    })
}

pub async fn apply_cue(
    State(state): State<Arc<AppState>>,
    Json(cue): Json<StageCue>,
) -> Result<Json<DeckView>, ApiError> {
    let now = Utc::now();
    let mut deck = lock(&state.deck);
    if !deck.apply(cue, now) {
        return Err(AppError::ValidationError("cue ignored".into()).into());
    }
    Ok(Json(deck.view(now)))
}

pub async fn report_notice(
    State(state): State<Arc<AppState>>,
    Json(notice): Json<StageNotice>,
) -> StatusCode {
    info!(?notice, "stage notice");
    // Nobody listening is fine; the notice is informational.
    let _ = state.notices.send(notice);
    StatusCode::ACCEPTED
}

pub async fn push_emoji(
    State(state): State<Arc<AppState>>,
    Json(reaction): Json<EmojiReaction>,
) -> Response {
    let now = Utc::now();
    let mut bursts = lock(&state.bursts);
    let mut rng = lock(&state.rng);
    match bursts.push(reaction, now, &mut **rng) {
        Some(burst) => (StatusCode::CREATED, Json(burst.clone())).into_response(),
        // stale or already on screen
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Validates and stores new settings. The running stage picks them up from
/// the event document.
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(raw): Json<RawStageSettings>,
) -> Result<Json<RawStageSettings>, ApiError> {
    let settings = StageSettings::accept(&raw)?;
    let stored = settings.to_raw();
    state.directory.update_settings(&state.event_id, stored.clone()).await?;
    info!(
        event = %state.event_id,
        image = settings.image.capacity,
        text = settings.text.capacity,
        "moderator updated stage settings"
    );
    Ok(Json(stored))
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<SubmissionDraft>,
) -> Result<(StatusCode, Json<SubmissionRecord>), ApiError> {
    let record = state.moderation.submit(&state.event_id, draft).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn set_status(
    state: &AppState,
    id: &str,
    status: ApprovalState,
) -> Result<Json<SubmissionRecord>, ApiError> {
    let record = state
        .moderation
        .set_status(&state.event_id, id, status)
        .await?
        .ok_or_else(|| AppError::NotFound("Submission".into(), id.into()))?;
    info!(submission = %id, ?status, "moderation decision");
    Ok(Json(record))
}

pub async fn approve(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SubmissionRecord>, ApiError> {
    set_status(&state, &id, ApprovalState::Approved).await
}

/// Moves an approved submission back to pending. The stage clears it at once.
pub async fn retract(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SubmissionRecord>, ApiError> {
    set_status(&state, &id, ApprovalState::Pending).await
}

pub async fn delete_submission(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.moderation.delete(&state.event_id, &id).await? {
        info!(submission = %id, "submission deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Submission".into(), id).into())
    }
}
