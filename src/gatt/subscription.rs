//! Notification subscription gate
//!
//! Tracks whether the connected peer enabled notifications through the
//! client configuration descriptor. Scoped to one connection.

#[derive(Debug, Default)]
pub struct SubscriptionGate {
    enabled: bool,
}

impl SubscriptionGate {
    pub fn new() -> Self {
        Self { enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Apply a descriptor write outcome
    pub fn set(&mut self, enabled: bool) {
        if enabled != self.enabled {
            log::info!(
                "Notifications {}",
                if enabled { "enabled" } else { "disabled" }
            );
        }
        self.enabled = enabled;
    }

    /// Forget the subscription when the peer goes away
    pub fn clear(&mut self) {
        self.enabled = false;
    }
}
