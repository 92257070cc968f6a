//! Test doubles and fixtures for the contract tests
//!
//! The fixture state mirrors a small account with three hosted zones shared
//! between this installation (`testing-group-id`) and a foreign one
//! (`new-group-id`), plus a couple of records nobody tagged.

#![allow(dead_code)]

use mate_core::config::{MateConfig, ProviderConfig};
use mate_core::error::{Error, Result};
use mate_core::ownership::record_target;
use mate_core::traits::{Consumer, EndpointSource};
use mate_core::types::{Endpoint, HostedZone, Record, RecordType};
use mate_core::{MemoryZoneProvider, ReconcileEvent, Reconciler};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_stream::Stream;

pub const GROUP_ID: &str = "testing-group-id";
pub const FOREIGN_GROUP_ID: &str = "new-group-id";

pub const EXAMPLE_ZONE: &str = "/hostedzone/example.com";
pub const SUB_ZONE: &str = "/hostedzone/sub.example.com";
pub const FOO_ZONE: &str = "/hostedzone/foo.com";

/// TXT value written by an installation
pub fn tag_value(group_id: &str) -> String {
    format!("\"mate:{}\"", group_id)
}

pub fn txt(name: &str, value: &str) -> Record {
    Record::new(RecordType::Txt, name, vec![value.to_string()]).with_ttl(300)
}

pub fn plain_a(name: &str, ip: &str) -> Record {
    Record::new(RecordType::A, name, vec![ip.to_string()]).with_ttl(300)
}

/// Alias record plus this installation's TXT record
pub fn owned_alias(name: &str, target: &str, zone_id: &str) -> Vec<Record> {
    vec![
        Record::alias(name, target, zone_id),
        txt(name, &tag_value(GROUP_ID)),
    ]
}

pub fn hosted_zones() -> Vec<HostedZone> {
    vec![
        HostedZone::new(EXAMPLE_ZONE, "example.com."),
        HostedZone::new(SUB_ZONE, "sub.example.com."),
        HostedZone::new(FOO_ZONE, "foo.com."),
    ]
}

/// Provider holding the fixture zones with no records
pub fn empty_state() -> MemoryZoneProvider {
    MemoryZoneProvider::new(hosted_zones())
}

/// Provider seeded with the shared fixture state
pub async fn original_state() -> MemoryZoneProvider {
    let provider = MemoryZoneProvider::new(hosted_zones());

    let mut example = Vec::new();
    example.extend(owned_alias("test.example.com.", "404.elb.com.", EXAMPLE_ZONE));
    example.extend(owned_alias("update.example.com.", "302.elb.com.", EXAMPLE_ZONE));
    example.push(Record::alias("withouttxt.example.com.", "400.elb.com.", EXAMPLE_ZONE));
    example.push(Record::alias("another.example.com.", "200.elb.com.", EXAMPLE_ZONE));
    example.push(txt("another.example.com.", &tag_value(FOREIGN_GROUP_ID)));
    example.push(
        Record::new(
            RecordType::Cname,
            "cname.example.com.",
            vec!["some-elb.amazon.com".to_string()],
        )
        .with_ttl(300),
    );
    provider.seed(EXAMPLE_ZONE, example).await;

    let mut foo = vec![
        plain_a("public-ip.foo.com.", "127.0.0.1"),
        txt("public-ip.foo.com.", &tag_value(GROUP_ID)),
    ];
    foo.extend(owned_alias("update.foo.com.", "404.elb.com.", FOO_ZONE));
    foo.push(Record::alias("test.foo.com.", "foo.elb.", FOO_ZONE));
    foo.push(txt("test.foo.com.", &tag_value(FOREIGN_GROUP_ID)));
    provider.seed(FOO_ZONE, foo).await;

    provider
}

/// Reconciler for `group_id` writing through a clone of `provider`
pub fn reconciler_for(
    provider: &MemoryZoneProvider,
    group_id: &str,
) -> (Reconciler, mpsc::Receiver<ReconcileEvent>) {
    let config = MateConfig::new(group_id, ProviderConfig::default());
    Reconciler::new(Box::new(provider.clone()), &config).expect("valid reconciler config")
}

pub fn reconciler(provider: &MemoryZoneProvider) -> (Reconciler, mpsc::Receiver<ReconcileEvent>) {
    reconciler_for(provider, GROUP_ID)
}

/// (name, target) of the data records in `records`, sorted by name
pub fn targets(records: &[Record]) -> Vec<(String, String)> {
    let mut targets: Vec<(String, String)> = records
        .iter()
        .filter(|record| !record.is_txt())
        .map(|record| (record.name.clone(), record_target(record)))
        .collect();
    targets.sort();
    targets
}

/// Names of the TXT records in `records`, sorted
pub fn txt_names(records: &[Record]) -> Vec<String> {
    let mut names: Vec<String> = records
        .iter()
        .filter(|record| record.is_txt())
        .map(|record| record.name.clone())
        .collect();
    names.sort();
    names
}

pub fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(name, target)| (name.to_string(), target.to_string()))
        .collect()
}

pub fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|name| name.to_string()).collect()
}

/// Drain every event currently buffered in the channel
pub fn drain(events: &mut mpsc::Receiver<ReconcileEvent>) -> Vec<ReconcileEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

/// An EndpointSource whose endpoints and watch feed are driven by the test
pub struct ControlledEndpointSource {
    /// Full set returned by endpoints()
    endpoints: Arc<Mutex<Vec<Endpoint>>>,
    /// Receiver handed out by watch()
    watch_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<Endpoint>>>>,
    /// Call counter for endpoints()
    endpoints_call_count: Arc<AtomicUsize>,
}

impl ControlledEndpointSource {
    /// Create a new controlled source and the sender feeding its watch stream
    pub fn new(endpoints: Vec<Endpoint>) -> (Self, mpsc::UnboundedSender<Endpoint>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let source = Self {
            endpoints: Arc::new(Mutex::new(endpoints)),
            watch_rx: Arc::new(Mutex::new(Some(rx))),
            endpoints_call_count: Arc::new(AtomicUsize::new(0)),
        };

        (source, tx)
    }

    /// Create a handle sharing state with an existing source
    pub fn sharing_state_with(other: &Self) -> Self {
        Self {
            endpoints: Arc::clone(&other.endpoints),
            watch_rx: Arc::clone(&other.watch_rx),
            endpoints_call_count: Arc::clone(&other.endpoints_call_count),
        }
    }

    /// Replace the desired set returned by later endpoints() calls
    pub fn set_endpoints(&self, endpoints: Vec<Endpoint>) {
        *self.endpoints.lock().unwrap() = endpoints;
    }

    /// Get the number of times endpoints() was called
    pub fn endpoints_call_count(&self) -> usize {
        self.endpoints_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EndpointSource for ControlledEndpointSource {
    async fn endpoints(&self) -> Result<Vec<Endpoint>> {
        self.endpoints_call_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.endpoints.lock().unwrap().clone())
    }

    fn watch(&self) -> Pin<Box<dyn Stream<Item = Endpoint> + Send + 'static>> {
        let rx = self
            .watch_rx
            .lock()
            .unwrap()
            .take()
            .expect("watch() can only be called once");

        Box::pin(tokio_stream::wrappers::UnboundedReceiverStream::new(rx))
    }
}

/// A Consumer that records calls and optionally fails them
pub struct RecordingConsumer {
    sync_call_count: Arc<AtomicUsize>,
    processed: Arc<Mutex<Vec<String>>>,
    fail: bool,
}

impl RecordingConsumer {
    pub fn new() -> Self {
        Self {
            sync_call_count: Arc::new(AtomicUsize::new(0)),
            processed: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    /// A consumer whose every call fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Create a new RecordingConsumer that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            sync_call_count: Arc::clone(&other.sync_call_count),
            processed: Arc::clone(&other.processed),
            fail: other.fail,
        }
    }

    pub fn sync_call_count(&self) -> usize {
        self.sync_call_count.load(Ordering::SeqCst)
    }

    pub fn processed(&self) -> Vec<String> {
        self.processed.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Consumer for RecordingConsumer {
    async fn sync(&self, _endpoints: &[Endpoint]) -> Result<()> {
        self.sync_call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::provider("recording", "sync failed"));
        }
        Ok(())
    }

    async fn process(&self, endpoint: &Endpoint) -> Result<()> {
        self.processed
            .lock()
            .unwrap()
            .push(endpoint.dns_name.clone());
        if self.fail {
            return Err(Error::provider("recording", "process failed"));
        }
        Ok(())
    }

    fn consumer_name(&self) -> &'static str {
        "recording"
    }
}
