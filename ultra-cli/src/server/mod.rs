//! HTTP API: thin proxy endpoints over Lunch Money and the state store,
//! plus the financial digest.

pub mod auth;
pub mod error;
pub mod rate_limit;
pub mod routes;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use ultra_finance::sources::{StateStore, TransactionSource};
use ultra_finance::{BusinessAccounts, LunchMoneyClient, SupabaseStore};

use crate::config::{Config, Secrets};
use error::{method_not_allowed, ApiError};
use rate_limit::RateLimiter;

/// Everything a handler needs that does not come from the request.
#[derive(Debug, Clone)]
pub struct Settings {
    pub business: BusinessAccounts,
    pub user_email: Option<String>,
    pub history_months: u32,
    pub timezone: String,
    pub app_secret: Option<String>,
}

#[derive(Clone)]
pub struct AppContext {
    /// `None` when the Lunch Money key is not configured
    pub source: Option<Arc<dyn TransactionSource>>,
    /// `None` when the service key is not configured
    pub store: Option<Arc<dyn StateStore>>,
    pub settings: Arc<Settings>,
    pub limiter: Arc<RateLimiter>,
}

impl AppContext {
    /// Build clients for whichever keys are present. Missing keys surface
    /// per request as configuration errors.
    pub fn from_config(cfg: &Config, secrets: &Secrets) -> Result<Self> {
        let source: Option<Arc<dyn TransactionSource>> = match &secrets.lunch_money_key {
            Some(key) => Some(Arc::new(LunchMoneyClient::new(
                key.clone(),
                cfg.lunch_money.base_url.clone(),
                cfg.lunch_money.timeout(),
                cfg.lunch_money.max_retries,
            )?)),
            None => {
                warn!("LUNCH_MONEY_API_KEY not set; transaction endpoints will fail");
                None
            }
        };
        let store: Option<Arc<dyn StateStore>> = match &secrets.service_key {
            Some(key) => Some(Arc::new(SupabaseStore::new(
                &cfg.store.url,
                &cfg.store.table,
                key,
                cfg.lunch_money.timeout(),
            )?)),
            None => {
                warn!("SUPABASE_SERVICE_KEY not set; state endpoints will fail");
                None
            }
        };
        if secrets.app_secret.is_none() {
            warn!("ULTRA_APP_SECRET not set; API is unauthenticated");
        }

        Ok(Self {
            source,
            store,
            settings: Arc::new(Settings {
                business: cfg.accounts.business(),
                user_email: cfg.store.user_email.clone(),
                history_months: cfg.digest.history_months,
                timezone: cfg.digest.timezone.clone(),
                app_secret: secrets.app_secret.clone(),
            }),
            limiter: Arc::new(RateLimiter::in_memory(
                cfg.rate_limit.max_requests,
                cfg.rate_limit.window_secs,
            )),
        })
    }

    pub fn source(&self) -> Result<&dyn TransactionSource, ApiError> {
        self.source
            .as_deref()
            .ok_or_else(|| ApiError::Config("LUNCH_MONEY_API_KEY missing".to_string()))
    }

    pub fn store(&self) -> Result<&dyn StateStore, ApiError> {
        self.store
            .as_deref()
            .ok_or_else(|| ApiError::Config("SUPABASE_SERVICE_KEY missing".to_string()))
    }
}

pub fn router(ctx: AppContext) -> Router {
    let api = Router::new()
        .route(
            "/lunch-money",
            get(routes::transactions).fallback(method_not_allowed),
        )
        .route(
            "/lunch-money-balances",
            get(routes::balances).fallback(method_not_allowed),
        )
        .route(
            "/lunch-money-categories",
            get(routes::categories).fallback(method_not_allowed),
        )
        .route(
            "/budget-state",
            get(routes::budget_state)
                .put(routes::replace_budget_state)
                .fallback(method_not_allowed),
        )
        .route(
            "/save-mapping",
            axum::routing::post(routes::save_mapping).fallback(method_not_allowed),
        )
        .route(
            "/financial-digest",
            get(routes::financial_digest).fallback(method_not_allowed),
        )
        .layer(middleware::from_fn_with_state(ctx.clone(), rate_limit::enforce));

    Router::new()
        .route("/healthz", get(routes::healthz))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

pub async fn serve(ctx: AppContext, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("bind {bind}"))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(
        listener,
        router(ctx).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;
    Ok(())
}
