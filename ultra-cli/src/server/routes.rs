use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use ultra_core::time::local_today;
use ultra_finance::pipeline::{self, DigestRequest, PipelineError};
use ultra_finance::{summarize, BudgetSummary, Digest};

use super::auth::Authorized;
use super::error::ApiError;
use super::AppContext;

fn parse_date(field: &str, value: Option<&str>) -> Result<NaiveDate, ApiError> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("Missing {field}")))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid {field} '{raw}' (expected YYYY-MM-DD)")))
}

pub async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

/// GET /api/lunch-money: transactions in the canonical sign convention,
/// each with its resolved `accountName`.
pub async fn transactions(
    _auth: Authorized,
    State(ctx): State<AppContext>,
    Query(q): Query<RangeQuery>,
) -> Result<Json<Value>, ApiError> {
    let source = ctx.source()?;
    let start = parse_date("start_date", q.start_date.as_deref())?;
    let end = parse_date("end_date", q.end_date.as_deref())?;
    if start > end {
        return Err(ApiError::BadRequest("start_date is after end_date".to_string()));
    }
    info!("GET /api/lunch-money {start}..{end}");

    let txns = pipeline::fetch_transactions(source, start, end)
        .await
        .map_err(ApiError::upstream("Failed to fetch transactions"))?;
    Ok(Json(json!({ "transactions": txns })))
}

/// GET /api/lunch-money-balances
pub async fn balances(_auth: Authorized, State(ctx): State<AppContext>) -> Result<Json<Value>, ApiError> {
    let source = ctx.source()?;
    info!("GET /api/lunch-money-balances");
    let accounts = pipeline::fetch_balances(source)
        .await
        .map_err(ApiError::upstream("Failed to fetch balances"))?;
    Ok(Json(json!({ "accounts": accounts })))
}

/// GET /api/lunch-money-categories
pub async fn categories(_auth: Authorized, State(ctx): State<AppContext>) -> Result<Json<Value>, ApiError> {
    let source = ctx.source()?;
    info!("GET /api/lunch-money-categories");
    let categories = source
        .categories()
        .await
        .map_err(ApiError::upstream("Failed to fetch categories"))?;
    Ok(Json(json!({ "categories": categories })))
}

/// GET /api/budget-state
pub async fn budget_state(
    _auth: Authorized,
    State(ctx): State<AppContext>,
) -> Result<Json<BudgetSummary>, ApiError> {
    let store = ctx.store()?;
    info!("GET /api/budget-state");
    let loaded = pipeline::load_latest(store, ctx.settings.user_email.as_deref())
        .await
        .map_err(ApiError::pipeline("Failed to fetch budget state"))?;
    Ok(Json(summarize(
        &loaded.state,
        loaded.row.user_email.clone(),
        loaded.row.updated_at,
    )))
}

/// PUT /api/budget-state: store a full state blob of any supported version.
pub async fn replace_budget_state(
    _auth: Authorized,
    State(ctx): State<AppContext>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let store = ctx.store()?;
    let Json(blob) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    info!("PUT /api/budget-state");

    let loaded = pipeline::replace_state(store, ctx.settings.user_email.as_deref(), blob, Utc::now())
        .await
        .map_err(|e| match e {
            PipelineError::State(invalid) => ApiError::BadRequest(invalid.to_string()),
            other => ApiError::pipeline("Failed to save budget state")(other),
        })?;
    Ok(Json(json!({
        "success": true,
        "fromVersion": loaded.from_version,
        "notes": loaded.notes,
    })))
}

#[derive(Debug, Deserialize)]
pub struct SaveMappingRequest {
    category: Option<String>,
    #[serde(rename = "groupId")]
    group_id: Option<String>,
}

/// POST /api/save-mapping {category, groupId}
pub async fn save_mapping(
    _auth: Authorized,
    State(ctx): State<AppContext>,
    body: Result<Json<SaveMappingRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let non_empty = |s: Option<String>| s.filter(|v| !v.trim().is_empty());
    let (Some(category), Some(group_id)) = (non_empty(req.category), non_empty(req.group_id)) else {
        return Err(ApiError::BadRequest("Missing category or groupId".to_string()));
    };
    let store = ctx.store()?;
    info!("POST /api/save-mapping {category} -> {group_id}");

    pipeline::save_mapping(
        store,
        ctx.settings.user_email.as_deref(),
        &category,
        &group_id,
        Utc::now(),
    )
    .await
    .map_err(ApiError::pipeline("Failed to save mapping"))?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Mapped {category} to {group_id}"),
    })))
}

#[derive(Debug, Deserialize)]
pub struct DigestQuery {
    today: Option<String>,
}

/// GET /api/financial-digest[?today=YYYY-MM-DD]
pub async fn financial_digest(
    _auth: Authorized,
    State(ctx): State<AppContext>,
    Query(q): Query<DigestQuery>,
) -> Result<Json<Digest>, ApiError> {
    let store = ctx.store()?;
    let source = ctx.source()?;
    let today = match q.today.as_deref() {
        Some(raw) => parse_date("today", Some(raw))?,
        None => local_today(Utc::now(), &ctx.settings.timezone)
            .map_err(|e| ApiError::Config(e.to_string()))?,
    };
    info!("GET /api/financial-digest today={today}");

    let req = DigestRequest {
        today,
        history_months: ctx.settings.history_months,
        user_email: ctx.settings.user_email.clone(),
    };
    let digest = pipeline::run_digest(source, store, &ctx.settings.business, &req)
        .await
        .map_err(ApiError::pipeline("Failed to build financial digest"))?;
    Ok(Json(digest))
}
