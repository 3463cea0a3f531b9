//! 运维接口：刷新与健康检查

use axum::{extract::State, Json};
use serde_json::json;
use tracing::info;

use crate::resolver::{request_refresh, RefreshOutcome, RefreshTrigger};
use crate::util::WebResult;
use crate::{version, AppState};

/// POST /actuator/refresh
///
/// `data` 为发生变化的配置键列表。
pub async fn refresh(State(state): State<AppState>) -> Json<WebResult> {
    info!(target: "api.actuator", event = "refresh.requested");

    let result = match request_refresh(&state.refresh_tx, RefreshTrigger::Http).await {
        RefreshOutcome::Refreshed { changed } => WebResult::ok(changed),
        RefreshOutcome::Ignored => {
            WebResult::ok_with_msg(Vec::<String>::new(), "static refresh mode")
        }
        RefreshOutcome::Failed { reason } => WebResult::err_with_code(503, reason),
    };

    result.into_json()
}

/// GET /actuator/health
pub async fn health(State(state): State<AppState>) -> Json<WebResult> {
    WebResult::ok(json!({
        "status": "UP",
        "sourceMode": state.resolver.source_mode().as_str(),
        "refreshMode": state.resolver.refresh_mode().as_str(),
        "version": version::summary(),
    }))
    .into_json()
}
