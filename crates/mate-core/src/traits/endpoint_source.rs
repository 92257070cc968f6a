// # Endpoint Source Trait
//
// The producer boundary: where desired endpoints come from. Discovery itself
// (cluster inventories, service registries) lives outside this crate.
//
// ## Usage
//
// ```rust,ignore
// use mate_core::EndpointSource;
// use tokio_stream::StreamExt;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* EndpointSource implementation */;
//
//     // Full desired set
//     let endpoints = source.endpoints().await?;
//
//     // Newly observed endpoints
//     let mut stream = source.watch();
//     while let Some(endpoint) = stream.next().await {
//         println!("new endpoint: {:?}", endpoint);
//     }
//
//     Ok(())
// }
// ```

use crate::types::Endpoint;
use async_trait::async_trait;
use std::pin::Pin;
use tokio_stream::Stream;

/// Trait for endpoint producers
///
/// # Trust Level: Semi-Trusted
///
/// Sources observe; they never write DNS and never decide when a sync runs.
#[async_trait]
pub trait EndpointSource: Send + Sync {
    /// Get the complete desired endpoint set, in priority order
    async fn endpoints(&self) -> Result<Vec<Endpoint>, crate::Error>;

    /// Stream of endpoints that have just appeared
    ///
    /// Each yielded endpoint is handed to `Consumer::process`, so a source
    /// must only yield endpoints whose records do not exist yet. A source
    /// without an event feed returns an empty stream.
    fn watch(&self) -> Pin<Box<dyn Stream<Item = Endpoint> + Send + 'static>>;
}
