//! File-backed endpoint source
//!
//! Reads a JSON array of `{dns_name, ip, hostname}` objects. The file is
//! re-read on every pass, so whatever writes it (a discovery sidecar, a
//! deploy script) only has to replace it. There is no event feed: new
//! endpoints are picked up by the next periodic sync.

use async_trait::async_trait;
use mate_core::{EndpointSource, Endpoint};
use std::path::PathBuf;
use std::pin::Pin;
use tokio_stream::Stream;
use tracing::debug;

/// Endpoint source reading a JSON file
pub struct FileEndpointSource {
    path: PathBuf,
}

impl FileEndpointSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl EndpointSource for FileEndpointSource {
    async fn endpoints(&self) -> mate_core::Result<Vec<Endpoint>> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let endpoints: Vec<Endpoint> = serde_json::from_str(&raw)?;
        debug!(
            "Read {} endpoint(s) from {}",
            endpoints.len(),
            self.path.display()
        );
        Ok(endpoints)
    }

    fn watch(&self) -> Pin<Box<dyn Stream<Item = Endpoint> + Send + 'static>> {
        Box::pin(tokio_stream::empty())
    }
}
