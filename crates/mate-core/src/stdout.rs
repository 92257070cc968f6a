//! Stdout consumer
//!
//! Prints every desired endpoint as one JSON line and never talks to a DNS
//! provider. Useful to check what a producer emits before pointing it at a
//! real zone.

use crate::error::Result;
use crate::traits::Consumer;
use crate::types::Endpoint;
use async_trait::async_trait;
use serde::Serialize;
use std::io::Write;
use std::sync::{Mutex, PoisonError};

#[derive(Serialize)]
struct Line<'a> {
    action: &'a str,
    endpoint: &'a Endpoint,
}

/// Consumer that writes endpoints as JSON lines
pub struct StdoutConsumer {
    out: Mutex<Box<dyn Write + Send>>,
}

impl StdoutConsumer {
    /// Write to the process's standard output
    pub fn new() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    /// Write to any writer
    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    fn write_line(&self, action: &str, endpoint: &Endpoint) -> Result<()> {
        let line = serde_json::to_string(&Line { action, endpoint })?;
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "{}", line)?;
        out.flush()?;
        Ok(())
    }
}

impl Default for StdoutConsumer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Consumer for StdoutConsumer {
    async fn sync(&self, endpoints: &[Endpoint]) -> Result<()> {
        for endpoint in endpoints {
            self.write_line("sync", endpoint)?;
        }
        Ok(())
    }

    async fn process(&self, endpoint: &Endpoint) -> Result<()> {
        self.write_line("process", endpoint)
    }

    fn consumer_name(&self) -> &'static str {
        "stdout"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuffer {
        fn lines(&self) -> Vec<serde_json::Value> {
            let bytes = self.0.lock().unwrap().clone();
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }
    }

    #[tokio::test]
    async fn test_sync_writes_one_line_per_endpoint() {
        let buffer = SharedBuffer::default();
        let consumer = StdoutConsumer::with_writer(Box::new(buffer.clone()));

        consumer
            .sync(&[
                Endpoint::with_hostname("a.example.com", "elb.com"),
                Endpoint::with_ip("b.example.com", "10.0.0.1"),
            ])
            .await
            .unwrap();

        let lines = buffer.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["action"], "sync");
        assert_eq!(lines[0]["endpoint"]["hostname"], "elb.com");
        assert_eq!(lines[1]["endpoint"]["ip"], "10.0.0.1");
    }

    #[tokio::test]
    async fn test_process_writes_action() {
        let buffer = SharedBuffer::default();
        let consumer = StdoutConsumer::with_writer(Box::new(buffer.clone()));

        consumer
            .process(&Endpoint::with_ip("c.example.com", "10.0.0.3"))
            .await
            .unwrap();

        let lines = buffer.lines();
        assert_eq!(lines[0]["action"], "process");
        assert_eq!(lines[0]["endpoint"]["dns_name"], "c.example.com");
        assert_eq!(consumer.consumer_name(), "stdout");
    }
}
