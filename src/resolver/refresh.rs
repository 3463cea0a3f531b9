//! 刷新触发
//!
//! 所有触发源（HTTP、SIGHUP、定时轮询、外部系统）只负责往通道里投递
//! [`RefreshRequest`]，由单个监听任务调用 [`ConfigValueResolver::refresh`]。
//! 需要结果的投递方（如 HTTP）附带一个 oneshot 回执。

use super::{ConfigValueResolver, RefreshOutcome};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// 刷新事件来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshTrigger {
    Http,
    Signal,
    Watch,
    External(String),
}

impl fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshTrigger::Http => f.write_str("http"),
            RefreshTrigger::Signal => f.write_str("signal"),
            RefreshTrigger::Watch => f.write_str("watch"),
            RefreshTrigger::External(origin) => write!(f, "external:{origin}"),
        }
    }
}

/// 通道中的一次刷新请求
#[derive(Debug)]
pub struct RefreshRequest {
    pub trigger: RefreshTrigger,
    reply: Option<oneshot::Sender<RefreshOutcome>>,
}

impl RefreshRequest {
    /// 需要回执的请求
    pub fn with_reply(trigger: RefreshTrigger) -> (Self, oneshot::Receiver<RefreshOutcome>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                trigger,
                reply: Some(tx),
            },
            rx,
        )
    }
}

impl From<RefreshTrigger> for RefreshRequest {
    fn from(trigger: RefreshTrigger) -> Self {
        Self {
            trigger,
            reply: None,
        }
    }
}

/// 投递刷新请求并等待监听任务的处理结果
pub async fn request_refresh(
    sender: &mpsc::Sender<RefreshRequest>,
    trigger: RefreshTrigger,
) -> RefreshOutcome {
    let (request, reply) = RefreshRequest::with_reply(trigger);
    if sender.send(request).await.is_err() {
        return RefreshOutcome::Failed {
            reason: "refresh listener stopped".to_string(),
        };
    }

    reply.await.unwrap_or_else(|_| RefreshOutcome::Failed {
        reason: "refresh listener dropped the request".to_string(),
    })
}

/// 消费刷新请求直到所有发送端关闭
pub fn spawn_refresh_listener(
    resolver: Arc<ConfigValueResolver>,
    mut events: mpsc::Receiver<RefreshRequest>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(event = "refresh.listener.start");
        while let Some(RefreshRequest { trigger, reply }) = events.recv().await {
            let outcome = resolver.refresh(&trigger);
            if let RefreshOutcome::Refreshed { changed } = &outcome {
                if !changed.is_empty() {
                    info!(event = "refresh.applied", trigger = %trigger, changed = ?changed);
                }
            }
            if let Some(reply) = reply {
                // 投递方可能已超时离开
                let _ = reply.send(outcome);
            }
        }
        info!(event = "refresh.listener.stop");
    })
}

/// 按固定间隔投递 [`RefreshTrigger::Watch`]
pub fn spawn_watch(sender: mpsc::Sender<RefreshRequest>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // 第一次 tick 立即返回
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if sender.send(RefreshTrigger::Watch.into()).await.is_err() {
                break;
            }
        }
    })
}

/// 每收到一次 SIGHUP 投递一次 [`RefreshTrigger::Signal`]
#[cfg(unix)]
pub fn spawn_signal_listener(sender: mpsc::Sender<RefreshRequest>) -> Option<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!(event = "refresh.signal.unavailable", error = %e);
            return None;
        }
    };

    Some(tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            info!(event = "refresh.signal", signal = "SIGHUP");
            if sender.send(RefreshTrigger::Signal.into()).await.is_err() {
                break;
            }
        }
    }))
}

#[cfg(not(unix))]
pub fn spawn_signal_listener(_sender: mpsc::Sender<RefreshRequest>) -> Option<JoinHandle<()>> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::MapSource;
    use crate::util::config::{RefreshMode, SourceMode};

    #[test]
    fn test_trigger_display() {
        assert_eq!(RefreshTrigger::Http.to_string(), "http");
        assert_eq!(
            RefreshTrigger::External("config-bus".into()).to_string(),
            "external:config-bus"
        );
    }

    #[tokio::test]
    async fn test_listener_applies_injected_events() {
        let app = Arc::new(MapSource::new("app"));
        let resolver = Arc::new(ConfigValueResolver::new(
            app.clone(),
            Arc::new(MapSource::new("env")),
            SourceMode::Named,
            RefreshMode::Live,
        ));
        let (tx, rx) = mpsc::channel(8);
        let handle = spawn_refresh_listener(resolver.clone(), rx);

        app.set("build.name", "Injected");
        tx.send(RefreshTrigger::External("test".into()).into())
            .await
            .unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(resolver.last_snapshot().build_name, "Injected");
    }

    #[tokio::test]
    async fn test_watch_emits_ticks_until_receiver_closes() {
        let (tx, mut rx) = mpsc::channel(8);
        let handle = spawn_watch(tx, Duration::from_millis(10));

        let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap();
        assert_eq!(first.map(|request| request.trigger), Some(RefreshTrigger::Watch));

        drop(rx);
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_request_refresh_returns_listener_outcome() {
        let app = Arc::new(MapSource::new("app"));
        let resolver = Arc::new(ConfigValueResolver::new(
            app.clone(),
            Arc::new(MapSource::new("env")),
            SourceMode::Named,
            RefreshMode::Live,
        ));
        let (tx, rx) = mpsc::channel(8);
        spawn_refresh_listener(resolver, rx);

        app.set("build.id", "55");
        assert_eq!(
            request_refresh(&tx, RefreshTrigger::Http).await,
            RefreshOutcome::Refreshed {
                changed: vec!["build.id".to_string()]
            }
        );
    }

    #[tokio::test]
    async fn test_request_refresh_without_listener_fails() {
        let (tx, rx) = mpsc::channel::<RefreshRequest>(1);
        drop(rx);

        assert!(matches!(
            request_refresh(&tx, RefreshTrigger::Http).await,
            RefreshOutcome::Failed { .. }
        ));
    }
}
