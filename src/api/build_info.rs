//! 构建信息接口

use axum::extract::State;
use tracing::debug;

use crate::model::format;
use crate::AppState;

/// GET /build-info
pub async fn get_build_info(State(state): State<AppState>) -> String {
    let snapshot = state.resolver.current();
    debug!(target: "api.build_info", event = "build_info.read", snapshot = %snapshot);
    format(&snapshot)
}
