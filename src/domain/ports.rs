//! Domain Ports - Collector identifiers and the backend contract
//!
//! A backend is a named factory of collector instances. The provider resolves
//! backends by name at request time, so new resource types plug in without
//! touching the dispatch layer.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

// =============================================================================
// Collector ID
// =============================================================================

/// Length of the canonical textual form of a [`CollectorId`]
pub const COLLECTOR_ID_STR_LEN: usize = 36;

/// Opaque 128-bit identifier of a collector, minted by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectorId(Uuid);

impl CollectorId {
    /// Generate a fresh random id
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl std::fmt::Display for CollectorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for CollectorId {
    type Err = Error;

    /// Only the 36-character hyphenated form is accepted
    fn from_str(s: &str) -> Result<Self> {
        if s.len() != COLLECTOR_ID_STR_LEN {
            return Err(Error::InvalidCollectorId(format!(
                "expected {} characters, got {}",
                COLLECTOR_ID_STR_LEN,
                s.len()
            )));
        }
        Uuid::try_parse(s)
            .map(Self)
            .map_err(|e| Error::InvalidCollectorId(e.to_string()))
    }
}

impl Serialize for CollectorId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CollectorId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Collector Instance Port
// =============================================================================

/// A live collector created by a backend.
///
/// Instances are shared between concurrent requests, so every method takes
/// `&self` and implementations must be reentrant. `close` and `destroy` are
/// called at most once, after the collector has left the provider's table.
#[async_trait]
pub trait CollectorInstance: Send + Sync {
    /// Release in-memory state, leaving external state intact
    async fn close(&self) -> Result<()>;

    /// Release in-memory state and erase external state
    async fn destroy(&self) -> Result<()>;

    /// Notification verb, never reports failure
    async fn hello(&self);

    /// Compute `x + y`
    async fn sum(&self, x: i32, y: i32) -> Result<i32>;

    /// Dispatch a backend-specific verb by name
    async fn invoke(&self, operation: &str, args: serde_json::Value) -> Result<serde_json::Value> {
        let _ = args;
        Err(Error::OpUnsupported {
            backend: "unknown".into(),
            operation: operation.to_string(),
        })
    }
}

// =============================================================================
// Collector Backend Port
// =============================================================================

/// A named implementation of the collector lifecycle
#[async_trait]
pub trait CollectorBackend: Send + Sync {
    /// Name clients use as the collector type
    fn name(&self) -> &str;

    /// Instantiate new collector state
    async fn create(&self, config: Option<&str>) -> Result<Box<dyn CollectorInstance>>;

    /// Attach to existing external state
    async fn open(&self, config: Option<&str>) -> Result<Box<dyn CollectorInstance>>;
}

pub type CollectorBackendRef = Arc<dyn CollectorBackend>;
pub type CollectorInstanceRef = Arc<dyn CollectorInstance>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_id_round_trip() {
        let id = CollectorId::generate();
        let s = id.to_string();
        assert_eq!(s.len(), COLLECTOR_ID_STR_LEN);
        assert_eq!(s.parse::<CollectorId>().unwrap(), id);
    }

    #[test]
    fn test_collector_id_rejects_other_lengths() {
        let id = CollectorId::generate();
        let simple = id.as_bytes().iter().map(|b| format!("{:02x}", b)).collect::<String>();
        assert_eq!(simple.len(), 32);
        assert!(simple.parse::<CollectorId>().is_err());
        assert!(format!("{{{}}}", id).parse::<CollectorId>().is_err());
        assert!("".parse::<CollectorId>().is_err());
        assert!("zzzzzzzz-zzzz-zzzz-zzzz-zzzzzzzzzzzz".parse::<CollectorId>().is_err());
    }

    #[test]
    fn test_collector_id_serde_as_string() {
        let id = CollectorId::from_bytes([7; 16]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"07070707-0707-0707-0707-070707070707\"");
        let back: CollectorId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<CollectorId>("\"short\"").is_err());
    }

    #[test]
    fn test_generated_ids_differ() {
        assert_ne!(CollectorId::generate(), CollectorId::generate());
    }
}
