//! Capability Access States
//!
//! Permission status reported by the platform for a capability.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform permission status for a capability.
///
/// Produced by [`CapabilityManager::check_access`](crate::capability::CapabilityManager::check_access)
/// and [`CapabilityManager::request_access`](crate::capability::CapabilityManager::request_access).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AccessState {
    /// The platform has not reported a status yet
    #[default]
    Unknown,
    /// Access is granted and the hardware is usable
    Available,
    /// The user or the OS denied access
    Denied,
    /// Access is restricted by policy (parental controls, MDM)
    Restricted,
    /// The capability is switched off at the device level
    Disabled,
}

impl AccessState {
    /// Whether the capability may be used right now.
    pub fn is_available(&self) -> bool {
        matches!(self, AccessState::Available)
    }

    /// Whether a new prompt can change the outcome.
    ///
    /// Restricted and disabled capabilities cannot be granted from inside the app.
    pub fn can_prompt(&self) -> bool {
        matches!(self, AccessState::Unknown | AccessState::Denied)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessState::Unknown => "Unknown",
            AccessState::Available => "Available",
            AccessState::Denied => "Denied",
            AccessState::Restricted => "Restricted",
            AccessState::Disabled => "Disabled",
        }
    }
}

impl fmt::Display for AccessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_state_flags() {
        assert!(AccessState::Available.is_available());
        assert!(!AccessState::Denied.is_available());
        assert!(AccessState::Unknown.can_prompt());
        assert!(!AccessState::Restricted.can_prompt());
        assert_eq!(AccessState::default(), AccessState::Unknown);
    }

    #[test]
    fn test_access_state_display() {
        assert_eq!(AccessState::Disabled.to_string(), "Disabled");
    }
}
