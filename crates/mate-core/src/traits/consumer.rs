// # Consumer Trait
//
// The contract between the driver loop and whatever turns desired endpoints
// into DNS state. The driver holds exactly one consumer, chosen at startup.
//
// ## Implementations
//
// - `Reconciler`: ownership-aware sync against a `ZoneProvider`
// - `StdoutConsumer`: prints desired endpoints, touches nothing

use crate::types::Endpoint;
use async_trait::async_trait;

#[async_trait]
pub trait Consumer: Send + Sync {
    /// Bring DNS in line with the full desired endpoint set
    ///
    /// Input order matters: the first endpoint claiming a name wins.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: every zone was listed and every change batch accepted
    /// - `Err(Error)`: at least one zone failed; other zones were still applied
    async fn sync(&self, endpoints: &[Endpoint]) -> Result<(), crate::Error>;

    /// Create the records for one endpoint that is known not to exist yet
    ///
    /// # Returns
    ///
    /// - `Ok(())`: the create batch was accepted
    /// - `Err(Error::ZoneNotFound)`: no hosted zone matches the name
    /// - `Err(Error)`: the provider rejected the batch
    async fn process(&self, endpoint: &Endpoint) -> Result<(), crate::Error>;

    /// Get the consumer name (for logging/debugging)
    fn consumer_name(&self) -> &'static str;
}
