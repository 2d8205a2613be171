//! The envelope stored under every cache key

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::CacheResult;

/// A cached payload together with the moment it was captured.
///
/// Records are immutable once built; their identity is the key they are
/// stored under. The in-memory backend keeps them as-is, the Redis backend
/// stores their JSON encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub data: Value,
    pub captured_at: DateTime<Utc>,
    /// Free-form annotations, not interpreted by any backend
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl CacheRecord {
    /// Wrap a serializable payload, stamping it with the current time.
    pub fn new<T: Serialize + ?Sized>(payload: &T) -> CacheResult<Self> {
        Ok(Self::from_value(serde_json::to_value(payload)?))
    }

    pub fn from_value(data: Value) -> Self {
        Self {
            data,
            captured_at: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Decode the payload into a concrete type.
    pub fn payload_as<T: DeserializeOwned>(&self) -> CacheResult<T> {
        Ok(T::deserialize(&self.data)?)
    }

    pub(crate) fn to_bytes(&self) -> CacheResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub(crate) fn from_bytes(raw: &[u8]) -> CacheResult<Self> {
        Ok(serde_json::from_slice(raw)?)
    }
}
