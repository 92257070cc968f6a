//! Built-in zone provider implementations
//!
//! - [`MemoryZoneProvider`]: in-memory zones (testing, dry runs)
//!
//! HTTP-backed providers live in their own crates and register through
//! [`crate::registry::ProviderRegistry`].

pub mod memory;

pub use memory::{MemoryZoneProvider, MemoryZoneProviderFactory};
