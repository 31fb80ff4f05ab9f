use serde::{Deserialize, Serialize};

use crate::wire::DEFAULT_MAX_PAYLOAD;

/// Configuration for a [`RefContext`](crate::RefContext).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefConfig {
    /// Largest payload length accepted when decoding.
    pub max_decode_payload: u64,
    /// Whether intra-file constructors bind the new reference to the
    /// location it was created against.
    pub bind_on_create: bool,
}

impl Default for RefConfig {
    fn default() -> Self {
        Self {
            max_decode_payload: DEFAULT_MAX_PAYLOAD,
            bind_on_create: true,
        }
    }
}

impl RefConfig {
    /// Tight decode ceiling (1 MiB) for references read from untrusted data.
    pub fn strict() -> Self {
        Self {
            max_decode_payload: 1024 * 1024,
            ..Default::default()
        }
    }
}
