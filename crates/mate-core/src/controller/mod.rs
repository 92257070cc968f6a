//! Driver loop
//!
//! The Controller owns one [`EndpointSource`] and one [`Consumer`] and decides
//! when passes run:
//! - Every `sync_interval` (first tick immediately): `consumer.sync` with the
//!   source's full endpoint set
//! - For every endpoint the source's watch stream yields: `consumer.process`
//!
//! A failed pass is logged and the loop carries on; the next tick retries.
//! The loop ends on ctrl-c, or on a supplied oneshot signal in tests.

use crate::error::Result;
use crate::traits::{Consumer, EndpointSource};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tokio_stream::StreamExt;
use tracing::{debug, error, info};

/// Periodic and event-driven driver for a consumer
pub struct Controller {
    /// Producer of desired endpoints
    source: Box<dyn EndpointSource>,

    /// Selected consumer
    consumer: Box<dyn Consumer>,

    /// Time between full sync passes
    sync_interval: Duration,
}

impl Controller {
    pub fn new(
        source: Box<dyn EndpointSource>,
        consumer: Box<dyn Consumer>,
        sync_interval: Duration,
    ) -> Self {
        Self {
            source,
            consumer,
            sync_interval,
        }
    }

    /// Run until SIGINT
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run until the given oneshot fires (or SIGINT when `None`)
    ///
    /// Used by tests and embedders that manage shutdown themselves.
    pub async fn run_with_shutdown(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    /// Run a single full sync pass
    pub async fn sync_once(&self) -> Result<()> {
        let endpoints = self.source.endpoints().await?;
        debug!(
            "Syncing {} endpoint(s) with consumer {}",
            endpoints.len(),
            self.consumer.consumer_name()
        );
        self.consumer.sync(&endpoints).await
    }

    async fn run_internal(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        info!(
            "Controller started (consumer: {}, interval: {:?})",
            self.consumer.consumer_name(),
            self.sync_interval
        );

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for shutdown signal: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        let mut ticker = tokio::time::interval(self.sync_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut watch = self.source.watch();
        let mut watching = true;

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }

                _ = ticker.tick() => {
                    if let Err(e) = self.sync_once().await {
                        error!("Sync pass failed: {}", e);
                    }
                }

                next = watch.next(), if watching => match next {
                    Some(endpoint) => {
                        if let Err(e) = self.consumer.process(&endpoint).await {
                            error!("Failed to process {}: {}", endpoint.dns_name, e);
                        }
                    }
                    None => {
                        debug!("Endpoint watch stream ended");
                        watching = false;
                    }
                },
            }
        }

        info!("Controller stopped");
        Ok(())
    }
}
