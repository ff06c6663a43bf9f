use axum::Router;
use std::{future::IntoFuture, sync::Arc};
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::api::{create_router, AppState};
use crate::config::ServerConfig;
use crate::metrics::PollMetrics;
use crate::store::{PollOps, PollStore};

pub struct PollServer {
    config: ServerConfig,
    state: AppState,
    shutdown_tx: watch::Sender<bool>,
}

impl PollServer {
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let query_store: Arc<dyn PollOps> = Arc::new(PollStore::new());
        let body_store = if config.shared_store {
            Arc::clone(&query_store)
        } else {
            Arc::new(PollStore::new()) as Arc<dyn PollOps>
        };

        let state = AppState {
            query_store,
            body_store,
            shared_store: config.shared_store,
            metrics: Arc::new(PollMetrics::new()?),
        };
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            state,
            shutdown_tx,
        })
    }

    pub fn router(&self) -> Router {
        let app = create_router(self.state.clone()).layer(TraceLayer::new_for_http());

        if self.config.cors_enabled {
            app.layer(CorsLayer::permissive())
        } else {
            app
        }
    }

    pub async fn start(&self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;
        info!(
            "poll-server listening on {} (shared store: {})",
            listener.local_addr()?,
            self.config.shared_store
        );

        let serve = axum::serve(listener, self.router())
            .with_graceful_shutdown(Self::shutdown_signal(self.shutdown_tx.clone()))
            .into_future();

        // Bound the drain once a shutdown has been requested.
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let timeout = self.config.shutdown_timeout();
        let drain_deadline = async move {
            if shutdown_rx.wait_for(|stop| *stop).await.is_err() {
                std::future::pending::<()>().await;
            }
            tokio::time::sleep(timeout).await;
        };

        tokio::select! {
            result = serve => result?,
            _ = drain_deadline => {
                warn!("In-flight requests did not finish within {:?}, exiting", timeout);
            }
        }

        info!("poll-server stopped");
        Ok(())
    }

    async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
        let mut shutdown = shutdown_tx.subscribe();

        #[cfg(unix)]
        let mut sigterm = {
            use tokio::signal::unix::{signal, SignalKind};
            signal(SignalKind::terminate()).ok()
        };

        tokio::select! {
            _ = async {
                #[cfg(unix)]
                {
                    if let Some(ref mut sigterm) = sigterm {
                        sigterm.recv().await;
                    } else {
                        std::future::pending::<()>().await;
                    }
                }
                #[cfg(not(unix))]
                {
                    std::future::pending::<()>().await;
                }
            } => {
                info!("Received SIGTERM, starting graceful shutdown");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, starting graceful shutdown");
            }
            _ = shutdown.wait_for(|stop| *stop) => {
                info!("Shutdown requested");
            }
        }

        shutdown_tx.send_replace(true);
    }

    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_isolated_stores_by_default() {
        let server = PollServer::new(ServerConfig::default()).unwrap();
        server
            .state
            .query_store
            .create("Q", vec!["a".into(), "b".into()])
            .unwrap();

        assert_eq!(server.state.query_store.poll_count(), 1);
        assert_eq!(server.state.body_store.poll_count(), 0);
        assert_eq!(server.state.total_polls(), 1);
    }

    #[test]
    fn test_shared_store() {
        let config = ServerConfig {
            shared_store: true,
            ..Default::default()
        };
        let server = PollServer::new(config).unwrap();
        server
            .state
            .body_store
            .create("Q", vec!["a".into(), "b".into()])
            .unwrap();

        assert_eq!(server.state.query_store.poll_count(), 1);
        assert_eq!(server.state.total_polls(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ServerConfig {
            shutdown_timeout_secs: 0,
            ..Default::default()
        };
        assert!(PollServer::new(config).is_err());
    }

    #[tokio::test]
    async fn test_start_stops_on_shutdown() {
        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        };
        let server = Arc::new(PollServer::new(config).unwrap());

        let running = Arc::clone(&server);
        let handle = tokio::spawn(async move { running.start().await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        server.shutdown();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("server did not stop")
            .expect("server task panicked");
        assert!(result.is_ok());
    }
}
