//! Dummy Collector Backend
//!
//! Built-in backend registered on every provider so the service is usable
//! without any external backend. Its instances only hold their parsed JSON
//! configuration.

use crate::domain::ports::{CollectorBackend, CollectorInstance};
use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::info;

/// Backend name of [`DummyBackend`]
pub const DUMMY_BACKEND_NAME: &str = "dummy";

// =============================================================================
// Dummy Backend
// =============================================================================

/// Backend creating [`DummyCollector`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyBackend;

impl DummyBackend {
    pub fn new() -> Self {
        Self
    }

    /// `None` yields an empty object; anything that is not valid JSON fails
    fn parse_config(config: Option<&str>) -> Result<Value> {
        match config {
            None => Ok(json!({})),
            Some(raw) => serde_json::from_str(raw).map_err(|e| Error::InvalidConfig {
                backend: DUMMY_BACKEND_NAME.into(),
                reason: e.to_string(),
            }),
        }
    }
}

#[async_trait]
impl CollectorBackend for DummyBackend {
    fn name(&self) -> &str {
        DUMMY_BACKEND_NAME
    }

    async fn create(&self, config: Option<&str>) -> Result<Box<dyn CollectorInstance>> {
        let config = Self::parse_config(config)?;
        Ok(Box::new(DummyCollector::new(config)))
    }

    async fn open(&self, config: Option<&str>) -> Result<Box<dyn CollectorInstance>> {
        let config = Self::parse_config(config)?;
        Ok(Box::new(DummyCollector::new(config)))
    }
}

// =============================================================================
// Dummy Collector
// =============================================================================

/// Instance of the dummy backend
#[derive(Debug)]
pub struct DummyCollector {
    /// Released on close/destroy
    config: Mutex<Option<Value>>,
}

impl DummyCollector {
    pub fn new(config: Value) -> Self {
        Self {
            config: Mutex::new(Some(config)),
        }
    }

    /// Configuration, or `None` once released
    pub fn config(&self) -> Option<Value> {
        self.config.lock().clone()
    }

    fn release(&self) {
        self.config.lock().take();
    }
}

#[async_trait]
impl CollectorInstance for DummyCollector {
    async fn close(&self) -> Result<()> {
        self.release();
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        self.release();
        Ok(())
    }

    async fn hello(&self) {
        info!("Hello World from Dummy collector");
    }

    async fn sum(&self, x: i32, y: i32) -> Result<i32> {
        Ok(x.wrapping_add(y))
    }

    async fn invoke(&self, operation: &str, args: Value) -> Result<Value> {
        match operation {
            "hello" => {
                self.hello().await;
                Ok(Value::Null)
            }
            "sum" => {
                let operand = |key: &str| {
                    args.get(key)
                        .and_then(Value::as_i64)
                        .and_then(|v| i32::try_from(v).ok())
                        .ok_or_else(|| {
                            Error::InvalidArgs(format!("sum expects an i32 field `{}`", key))
                        })
                };
                let result = self.sum(operand("x")?, operand("y")?).await?;
                Ok(json!(result))
            }
            "get_config" => Ok(self.config().unwrap_or(Value::Null)),
            _ => Err(Error::OpUnsupported {
                backend: DUMMY_BACKEND_NAME.into(),
                operation: operation.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_create_without_config_uses_empty_object() {
        let backend = DummyBackend::new();
        let collector = backend.create(None).await.unwrap();
        assert_eq!(
            collector.invoke("get_config", Value::Null).await.unwrap(),
            json!({})
        );
    }

    #[tokio::test]
    async fn test_open_keeps_config() {
        let backend = DummyBackend::new();
        let collector = backend.open(Some(r#"{"path": "/tmp/x"}"#)).await.unwrap();
        assert_eq!(
            collector.invoke("get_config", Value::Null).await.unwrap(),
            json!({"path": "/tmp/x"})
        );
    }

    #[tokio::test]
    async fn test_malformed_config_rejected() {
        let backend = DummyBackend::new();
        assert_matches!(
            backend.create(Some("{ashqw{")).await.map(|_| ()),
            Err(Error::InvalidConfig { .. })
        );
        assert_matches!(
            backend.open(Some("")).await.map(|_| ()),
            Err(Error::InvalidConfig { .. })
        );
    }

    #[tokio::test]
    async fn test_sum() {
        let collector = DummyCollector::new(json!({}));
        assert_eq!(collector.sum(45, 55).await.unwrap(), 100);
        assert_eq!(collector.sum(i32::MAX, 1).await.unwrap(), i32::MIN);
    }

    #[tokio::test]
    async fn test_close_releases_config() {
        let collector = DummyCollector::new(json!({"a": 1}));
        collector.close().await.unwrap();
        assert!(collector.config().is_none());

        let collector = DummyCollector::new(json!({"a": 1}));
        collector.destroy().await.unwrap();
        assert!(collector.config().is_none());
    }

    #[tokio::test]
    async fn test_invoke_verbs() {
        let collector = DummyCollector::new(json!({}));
        assert_eq!(
            collector.invoke("sum", json!({"x": 2, "y": 3})).await.unwrap(),
            json!(5)
        );
        assert_matches!(
            collector.invoke("sum", json!({"x": 2})).await,
            Err(Error::InvalidArgs(_))
        );
        assert_eq!(
            collector.invoke("hello", Value::Null).await.unwrap(),
            Value::Null
        );
        assert_matches!(
            collector.invoke("explode", Value::Null).await,
            Err(Error::OpUnsupported { .. })
        );
    }
}
