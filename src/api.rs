// src/api.rs
use axum::{
    extract::{FromRequest, Multipart, Query, Request, State},
    http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tracing::error;

use crate::orchestrator::{Orchestrator, ReviewRequest};
use crate::policy::{parse_campaign_date, PolicyWindow, VolatilityReport};
use crate::state::CampaignState;

pub const SERVICE_NAME: &str = "influencer-agent";
pub const HEADER_STAGE: &str = "x-review-stage";
pub const HEADER_ERRORS: &str = "x-review-errors";
const INVALID_PROFILE: &str = "Invalid JSON format in 'influencer_profile' field.";

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/analyze_live", post(analyze_live))
        .route("/policy", get(active_policy))
        .route("/policy/volatility", get(policy_volatility))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

// ---------- errors ----------

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("bad_request", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("not_found", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

// ---------- handlers ----------

#[derive(Serialize)]
struct Health {
    status: &'static str,
    service: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        service: SERVICE_NAME,
    })
}

#[derive(Deserialize)]
struct AnalyzeLiveBody {
    csv_data: String,
    approved_script: String,
    influencer_transcript: String,
    campaign_date: String,
    /// Either a JSON object or a JSON-encoded string of one.
    influencer_profile: Value,
}

impl AnalyzeLiveBody {
    /// Multipart form: `csv_file` (the upload; `csv_data` also accepted) plus
    /// text fields, with `influencer_profile` as a JSON string.
    async fn from_multipart(mut form: Multipart) -> Result<Self, ApiError> {
        let mut csv_data = None;
        let mut approved_script = None;
        let mut influencer_transcript = None;
        let mut campaign_date = None;
        let mut influencer_profile = None;

        while let Some(field) = form
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(format!("field '{name}': {}", e.body_text())))?;
            match name.as_str() {
                "csv_file" | "csv_data" => csv_data = Some(text),
                "approved_script" => approved_script = Some(text),
                "influencer_transcript" => influencer_transcript = Some(text),
                "campaign_date" => campaign_date = Some(text),
                "influencer_profile" => influencer_profile = Some(Value::String(text)),
                _ => {}
            }
        }

        let required = |v: Option<String>, field: &str| {
            v.ok_or_else(|| ApiError::bad_request(format!("missing form field '{field}'")))
        };
        Ok(Self {
            csv_data: required(csv_data, "csv_file")?,
            approved_script: required(approved_script, "approved_script")?,
            influencer_transcript: required(influencer_transcript, "influencer_transcript")?,
            campaign_date: required(campaign_date, "campaign_date")?,
            influencer_profile: influencer_profile.ok_or_else(|| {
                ApiError::bad_request("missing form field 'influencer_profile'")
            })?,
        })
    }
}

fn is_multipart(req: &Request) -> bool {
    req.headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

/// Accepts the multipart upload form or an equivalent JSON body.
async fn analyze_live(State(state): State<AppState>, req: Request) -> Result<Response, ApiError> {
    let body = if is_multipart(&req) {
        let form = Multipart::from_request(req, &state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        AnalyzeLiveBody::from_multipart(form).await?
    } else {
        let Json(body) = Json::<AnalyzeLiveBody>::from_request(req, &state)
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?;
        body
    };

    let influencer_profile = match body.influencer_profile {
        Value::String(raw) => {
            serde_json::from_str(&raw).map_err(|_| ApiError::bad_request(INVALID_PROFILE))?
        }
        other => other,
    };

    let request = ReviewRequest {
        approved_script: body.approved_script,
        influencer_transcript: body.influencer_transcript,
        csv_data: body.csv_data,
        campaign_date: body.campaign_date,
        influencer_profile,
    };

    let orchestrator = state.orchestrator.clone();
    let final_state: CampaignState = tokio::spawn(async move { orchestrator.run(request).await })
        .await
        .map_err(|e| {
            error!(target: "api", error = %e, "review task crashed");
            ApiError::internal(e.to_string())
        })?;

    let mut headers = HeaderMap::new();
    headers.insert(HEADER_STAGE, HeaderValue::from_static(final_state.stage.as_str()));
    headers.insert(HEADER_ERRORS, HeaderValue::from(final_state.errors.len()));
    Ok((headers, Json(final_state)).into_response())
}

#[derive(Deserialize)]
struct PolicyQuery {
    date: String,
}

async fn active_policy(
    State(state): State<AppState>,
    Query(q): Query<PolicyQuery>,
) -> Result<Json<PolicyWindow>, ApiError> {
    let date = parse_campaign_date(&q.date).map_err(|e| ApiError::bad_request(e.to_string()))?;
    state
        .orchestrator
        .policies()
        .resolve(date)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("No active Brand Policy found for date {date}")))
}

#[derive(Deserialize)]
struct VolatilityQuery {
    from: String,
    to: String,
    #[serde(default)]
    chaos: u8,
}

async fn policy_volatility(
    State(state): State<AppState>,
    Query(q): Query<VolatilityQuery>,
) -> Result<Json<VolatilityReport>, ApiError> {
    let from = parse_campaign_date(&q.from).map_err(|e| ApiError::bad_request(e.to_string()))?;
    let to = parse_campaign_date(&q.to).map_err(|e| ApiError::bad_request(e.to_string()))?;
    Ok(Json(state.orchestrator.policies().volatility(from, to, q.chaos)))
}
