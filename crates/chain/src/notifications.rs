use alloy_primitives::U256;
use ember_primitives::SealedBlock;
use std::sync::Arc;
use tokio::sync::broadcast;

/// A notification that the canonical chain advanced: emitted after a block
/// was successfully imported.
#[derive(Debug, Clone)]
pub struct CanonStateNotification {
    /// The new canonical head.
    pub block: Arc<SealedBlock>,
    /// Total difficulty up to and including the new head.
    pub total_difficulty: U256,
}

/// Sender half of the canonical state broadcast channel.
pub type CanonStateNotificationSender = broadcast::Sender<CanonStateNotification>;

/// Receiver of canonical state notifications.
pub type CanonStateNotifications = broadcast::Receiver<CanonStateNotification>;

/// A type that grants access to canonical state change notifications.
pub trait CanonStateSubscriptions: Send + Sync {
    /// Subscribes to notifications about changes of the canonical head.
    fn subscribe_canon_state(&self) -> CanonStateNotifications;
}
