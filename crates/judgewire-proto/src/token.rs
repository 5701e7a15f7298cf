//! Correlation tokens for request/reply pairing.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque token injected into a request and echoed in its reply.
///
/// Unique among the outstanding requests of one client instance; not stable
/// across restarts. Serialized as a bare string on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestToken(Uuid);

impl RequestToken {
    /// Generate a fresh token.
    #[must_use]
    pub fn fresh() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
