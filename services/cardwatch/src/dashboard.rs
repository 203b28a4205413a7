//! Web dashboard: JSON API over the card registry plus a small HTML index

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use crate::client::BackendClient;
use crate::registry::{CardPatch, RegistryHandle};
use crate::scheduler::PollScheduler;

/// Dashboard application state
#[derive(Clone)]
pub struct DashboardState {
    pub registry: RegistryHandle,
    pub scheduler: Arc<PollScheduler>,
    pub client: Arc<BackendClient>,
}

/// Build the dashboard axum router
pub fn build_router(
    registry: RegistryHandle,
    scheduler: Arc<PollScheduler>,
    client: Arc<BackendClient>,
) -> Router {
    let state = DashboardState {
        registry,
        scheduler,
        client,
    };

    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/cards", get(list_cards_handler).post(add_card_handler))
        .route(
            "/api/cards/{id}",
            get(card_detail_handler)
                .put(update_card_handler)
                .delete(delete_card_handler),
        )
        .route("/api/cards/{id}/auto-refresh", put(auto_refresh_handler))
        .route("/api/cards/{id}/refresh", post(refresh_card_handler))
        .route("/api/changed", get(changed_handler))
        .route(
            "/api/refresh-interval",
            get(interval_handler).put(set_interval_handler),
        )
        .route("/api/diff/service/{service}", get(diff_page_handler))
        .route("/api/diff/{id}", get(diff_detail_handler))
        .with_state(state)
}

fn error_response(err: crate::CardwatchError) -> Response {
    let status = match &err {
        crate::CardwatchError::Validation(_) => StatusCode::BAD_REQUEST,
        crate::CardwatchError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string()).into_response()
}

async fn health_handler() -> impl IntoResponse {
    "OK"
}

async fn index_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let registry = dashboard.registry.read().await;

    let card_rows: String = registry
        .cards()
        .iter()
        .map(|card| {
            let outcome = match (&card.error, &card.response) {
                (Some(error), _) => format!("Error: {}", error),
                (None, Some(_)) => "OK".to_string(),
                (None, None) => "Pending".to_string(),
            };
            let last_updated = match card.last_updated {
                Some(ms) => format!(
                    r#"<script>document.write(new Date({}).toLocaleTimeString())</script>"#,
                    ms
                ),
                None => "Never".to_string(),
            };
            let highlight = if registry.is_changed(&card.id) {
                " style=\"background-color: #fff3cd;\""
            } else {
                ""
            };
            format!(
                r#"<tr{}>
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem;">{}</td>
                    <td style="padding: 0.5rem;">{}</td>
                </tr>"#,
                highlight,
                card.name,
                card.url,
                if card.auto_refresh { "on" } else { "off" },
                outcome,
                last_updated
            )
        })
        .collect();

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Cardwatch</title>
    <script>setInterval(() => location.reload(), 5000);</script>
</head>
<body style="font-family: system-ui, sans-serif; max-width: 960px; margin: 0 auto; padding: 1rem;">
    <h1>Cardwatch</h1>
    <table style="width: 100%; border-collapse: collapse;">
        <thead>
            <tr style="border-bottom: 2px solid #dee2e6;">
                <th style="padding: 0.5rem; text-align: left;">Name</th>
                <th style="padding: 0.5rem; text-align: left;">URL</th>
                <th style="padding: 0.5rem; text-align: left;">Auto-refresh</th>
                <th style="padding: 0.5rem; text-align: left;">Last Outcome</th>
                <th style="padding: 0.5rem; text-align: left;">Last Updated</th>
            </tr>
        </thead>
        <tbody>{card_rows}</tbody>
    </table>
</body>
</html>"#,
        card_rows = card_rows,
    );

    Html(html)
}

async fn list_cards_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let registry = dashboard.registry.read().await;
    Json(registry.cards().to_vec())
}

#[derive(Debug, Deserialize)]
struct AddCardRequest {
    name: String,
    url: String,
    #[serde(default)]
    swagger_url: Option<String>,
}

async fn add_card_handler(
    State(dashboard): State<DashboardState>,
    Json(request): Json<AddCardRequest>,
) -> Response {
    let result = {
        let mut registry = dashboard.registry.write().await;
        registry.add_card(&request.name, &request.url, request.swagger_url)
    };
    match result {
        Ok(card) => {
            dashboard.scheduler.rebuild().await;
            (StatusCode::CREATED, Json(card)).into_response()
        }
        Err(err) => error_response(err),
    }
}

/// Detail view; reading it clears the card's changed highlight
async fn card_detail_handler(
    State(dashboard): State<DashboardState>,
    Path(id): Path<String>,
) -> Response {
    let mut registry = dashboard.registry.write().await;
    match registry.card(&id).cloned() {
        Some(card) => {
            registry.mark_viewed(&id);
            Json(card).into_response()
        }
        None => error_response(crate::CardwatchError::NotFound(id)),
    }
}

async fn update_card_handler(
    State(dashboard): State<DashboardState>,
    Path(id): Path<String>,
    Json(patch): Json<CardPatch>,
) -> Response {
    let result = {
        let mut registry = dashboard.registry.write().await;
        registry.update_card(&id, patch)
    };
    match result {
        Ok(()) => {
            dashboard.scheduler.rebuild().await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn delete_card_handler(
    State(dashboard): State<DashboardState>,
    Path(id): Path<String>,
) -> Response {
    let result = {
        let mut registry = dashboard.registry.write().await;
        registry.delete_card(&id)
    };
    match result {
        Ok(()) => {
            dashboard.scheduler.rebuild().await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
struct AutoRefreshRequest {
    enabled: bool,
}

async fn auto_refresh_handler(
    State(dashboard): State<DashboardState>,
    Path(id): Path<String>,
    Json(request): Json<AutoRefreshRequest>,
) -> Response {
    let result = {
        let mut registry = dashboard.registry.write().await;
        registry.set_auto_refresh(&id, request.enabled)
    };
    match result {
        Ok(()) => {
            dashboard.scheduler.rebuild().await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn refresh_card_handler(
    State(dashboard): State<DashboardState>,
    Path(id): Path<String>,
) -> Response {
    if let Err(err) = dashboard.scheduler.refresh_now(&id).await {
        return error_response(err);
    }
    let registry = dashboard.registry.read().await;
    match registry.card(&id).cloned() {
        Some(card) => Json(card).into_response(),
        None => error_response(crate::CardwatchError::NotFound(id)),
    }
}

async fn changed_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let registry = dashboard.registry.read().await;
    Json(registry.changed_ids())
}

async fn interval_handler(State(dashboard): State<DashboardState>) -> impl IntoResponse {
    let registry = dashboard.registry.read().await;
    Json(serde_json::json!({ "interval_ms": registry.refresh_interval_ms() }))
}

#[derive(Debug, Deserialize)]
struct SetIntervalRequest {
    interval_ms: u64,
}

async fn set_interval_handler(
    State(dashboard): State<DashboardState>,
    Json(request): Json<SetIntervalRequest>,
) -> Response {
    let result = {
        let mut registry = dashboard.registry.write().await;
        registry.set_refresh_interval_ms(request.interval_ms)
    };
    match result {
        Ok(()) => {
            dashboard.scheduler.rebuild().await;
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Deserialize)]
struct DiffPageQuery {
    #[serde(default)]
    page: u32,
    #[serde(default = "default_page_size")]
    size: u32,
}

fn default_page_size() -> u32 {
    20
}

async fn diff_page_handler(
    State(dashboard): State<DashboardState>,
    Path(service): Path<String>,
    Query(query): Query<DiffPageQuery>,
) -> Response {
    match dashboard
        .client
        .fetch_diff_page(&service, query.page, query.size)
        .await
    {
        Ok(value) => Json(value).into_response(),
        Err(err) => (StatusCode::BAD_GATEWAY, err.to_string()).into_response(),
    }
}

async fn diff_detail_handler(
    State(dashboard): State<DashboardState>,
    Path(id): Path<String>,
) -> Response {
    match dashboard.client.fetch_diff_detail(&id).await {
        Ok(value) => Json(value).into_response(),
        Err(err) => (StatusCode::BAD_GATEWAY, err.to_string()).into_response(),
    }
}
