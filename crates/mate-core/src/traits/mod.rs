//! Core traits for the reconciliation engine
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`Consumer`]: Turn desired endpoints into DNS state
//! - [`ZoneProvider`]: List and change records at a DNS provider
//! - [`EndpointSource`]: Produce desired endpoints

pub mod consumer;
pub mod endpoint_source;
pub mod zone_provider;

pub use consumer::Consumer;
pub use endpoint_source::EndpointSource;
pub use zone_provider::{ZoneProvider, ZoneProviderFactory};
