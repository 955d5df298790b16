//! Mutation gating.
//!
//! Authorization is a boundary concern: the gate is checked before any
//! mutating store operation is invoked, never inside the store itself.

use relic_core::error::{RelicError, RelicResult};

/// Capability check for mutating operations
#[derive(Debug, Clone)]
pub struct MutationGate {
    enabled: bool,
    expected: Option<String>,
}

impl MutationGate {
    pub fn new(enabled: bool, expected: Option<String>) -> Self {
        Self { enabled, expected }
    }

    /// Whether mutations are enabled at all
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Authorize one mutating operation with a caller-supplied token
    pub fn authorize(&self, provided: Option<&str>) -> RelicResult<()> {
        if !self.enabled {
            return Err(RelicError::permission_denied(
                "mutations are disabled (set mutations_enabled = true)",
            ));
        }
        match self.expected.as_deref() {
            None => Ok(()),
            Some(expected) => match provided {
                None => Err(RelicError::permission_denied("missing token")),
                Some(got) if got == expected => Ok(()),
                Some(_) => Err(RelicError::permission_denied("invalid token")),
            },
        }
    }
}
