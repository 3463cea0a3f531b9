use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::timeout::TimeoutLayer;

use crate::AppState;

pub mod actuator;
pub mod build_info;

pub fn routes(app_state: AppState) -> Router {
    let request_timeout = Duration::from_secs(app_state.config.server.request_timeout_secs.max(1));

    Router::new()
        .route("/build-info", get(build_info::get_build_info))
        .route("/actuator/refresh", post(actuator::refresh))
        .route("/actuator/health", get(actuator::health))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{spawn_refresh_listener, ConfigValueResolver, MapSource, PropertySource};
    use crate::util::config::{Config, ConfigLoader, RefreshMode, SourceMode};
    use serde_json::Value;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    fn state_with(
        app: Arc<dyn PropertySource>,
        source_mode: SourceMode,
        refresh_mode: RefreshMode,
    ) -> AppState {
        let resolver = ConfigValueResolver::new(
            app,
            Arc::new(MapSource::new("env")),
            source_mode,
            refresh_mode,
        );
        state_from(Config::default(), resolver)
    }

    /// 带刷新监听任务的应用状态，需在 tokio 运行时内调用
    fn state_from(config: Config, resolver: ConfigValueResolver) -> AppState {
        let resolver = Arc::new(resolver);
        let (refresh_tx, refresh_rx) = mpsc::channel(8);
        spawn_refresh_listener(resolver.clone(), refresh_rx);
        AppState::new(config, resolver, refresh_tx)
    }

    async fn spawn_app(state: AppState) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, routes(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn get_text(url: &str) -> (u16, String) {
        let resp = reqwest::get(url).await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.text().await.unwrap())
    }

    #[tokio::test]
    async fn test_build_info_defaults() {
        let state = state_with(Arc::new(MapSource::new("app")), SourceMode::Named, RefreshMode::Live);
        let base = spawn_app(state).await;

        let (status, body) = get_text(&format!("{base}/build-info")).await;
        assert_eq!(status, 200);
        assert_eq!(
            body,
            "BuildId: 100 | Version: 1.0.0 | Name: Default-Build | Type: Default"
        );
    }

    #[tokio::test]
    async fn test_build_info_from_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(&path, "server:\n  port: 8080\nbuild:\n  id: \"2001\"\n").unwrap();

        let config = ConfigLoader::read_yaml(&path).unwrap();
        let resolver = ConfigValueResolver::from_config(&config.resolution, &path);
        let base = spawn_app(state_from(config, resolver)).await;

        let (_, body) = get_text(&format!("{base}/build-info")).await;
        assert_eq!(
            body,
            "BuildId: 2001 | Version: 1.0.0 | Name: Default-Build | Type: Default"
        );

        // live 模式：改文件后下一次读取可见
        std::fs::write(&path, "build:\n  id: \"2002\"\n  type: Release\n").unwrap();
        let (_, body) = get_text(&format!("{base}/build-info")).await;
        assert_eq!(
            body,
            "BuildId: 2002 | Version: 1.0.0 | Name: Default-Build | Type: Release"
        );

        // 文件不可读时沿用上一次快照
        std::fs::remove_file(&path).unwrap();
        let (status, body) = get_text(&format!("{base}/build-info")).await;
        assert_eq!(status, 200);
        assert_eq!(
            body,
            "BuildId: 2002 | Version: 1.0.0 | Name: Default-Build | Type: Release"
        );
    }

    #[tokio::test]
    async fn test_build_info_is_idempotent() {
        let app = Arc::new(MapSource::with_entries("app", [("build.name", "Stable")]));
        let base = spawn_app(state_with(app, SourceMode::Named, RefreshMode::Static)).await;

        let (_, first) = get_text(&format!("{base}/build-info")).await;
        let (_, second) = get_text(&format!("{base}/build-info")).await;
        assert_eq!(first, second);
        assert!(first.contains("Name: Stable"));
    }

    #[tokio::test]
    async fn test_refresh_endpoint_reports_changed_keys() {
        let app = Arc::new(MapSource::new("app"));
        let base = spawn_app(state_with(app.clone(), SourceMode::Named, RefreshMode::Live)).await;
        let client = reqwest::Client::new();

        app.set("build.version", "3.1.4");
        let body: Value = client
            .post(format!("{base}/actuator/refresh"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["success"], true);
        assert_eq!(body["data"], serde_json::json!(["build.version"]));
    }

    #[tokio::test]
    async fn test_refresh_endpoint_in_static_mode() {
        let app = Arc::new(MapSource::new("app"));
        let base = spawn_app(state_with(app.clone(), SourceMode::Named, RefreshMode::Static)).await;

        app.set("build.id", "999");
        let body: Value = reqwest::Client::new()
            .post(format!("{base}/actuator/refresh"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["errorMsg"], "static refresh mode");
        assert_eq!(body["data"], serde_json::json!([]));

        let (_, text) = get_text(&format!("{base}/build-info")).await;
        assert!(text.starts_with("BuildId: 100 |"));
    }

    #[tokio::test]
    async fn test_refresh_endpoint_reports_unavailable_listener() {
        let resolver = Arc::new(ConfigValueResolver::new(
            Arc::new(MapSource::new("app")),
            Arc::new(MapSource::new("env")),
            SourceMode::Named,
            RefreshMode::Live,
        ));
        let (refresh_tx, refresh_rx) = mpsc::channel(1);
        drop(refresh_rx);
        let base = spawn_app(AppState::new(Config::default(), resolver, refresh_tx)).await;

        let body: Value = reqwest::Client::new()
            .post(format!("{base}/actuator/refresh"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["errorCode"], 503);
    }

    #[tokio::test]
    async fn test_health_reports_modes() {
        let state = state_with(
            Arc::new(MapSource::new("app")),
            SourceMode::Environment,
            RefreshMode::Static,
        );
        let base = spawn_app(state).await;

        let body: Value = reqwest::get(format!("{base}/actuator/health"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["data"]["status"], "UP");
        assert_eq!(body["data"]["sourceMode"], "environment");
        assert_eq!(body["data"]["refreshMode"], "static");
    }
}
