// # Beacon Trait
//
// Defines the interface for discovering the caller's public IP address.
//
// ## Implementations
//
// - HTTP echo services: `piphos-beacon-http` crate
//
// ## Usage
//
// ```rust,ignore
// use piphos_core::Beacon;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let beacon = /* Beacon implementation */;
//
//     let ip = beacon.ping().await?;
//     println!("{} says {}", beacon.name(), ip);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::config::BeaconDescriptor;

/// Trait for beacon implementations
///
/// A beacon answers one question: what address does the outside world see
/// for this machine. Implementations perform a single request per call.
///
/// ## Allowed
/// - One outbound request to the beacon's own endpoint
/// - Bounded reads of the response
///
/// ## Forbidden
/// - Retries or backoff (a failed attempt is surfaced to the caller)
/// - Caching the answer between calls
/// - Talking to tenders
#[async_trait]
pub trait Beacon: Send + Sync {
    /// Query the beacon and return the public IP address
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The trimmed address, already validated as an IP literal
    /// - `Err(Error::Unreachable)`: Transport failure or timeout
    /// - `Err(Error::BadStatus)`: Status outside 200-299
    /// - `Err(Error::ResponseTooLarge)`: Body exceeded the size bound
    /// - `Err(Error::InvalidIp)`: Body was not an IP literal
    async fn ping(&self) -> Result<String, crate::Error>;

    /// Name of the beacon (for logging/debugging)
    fn name(&self) -> &str;
}

/// Helper trait for constructing beacons from their descriptor
pub trait BeaconFactory: Send + Sync {
    /// Create a Beacon instance for the given descriptor
    fn create(&self, descriptor: &BeaconDescriptor) -> Result<Box<dyn Beacon>, crate::Error>;
}
