//! Per-channel in-flight guard.
//!
//! Generation is serialized per logical conversation: a second request for
//! a channel that already has one outstanding is dropped, not queued. This
//! keeps typing indicators and provider calls from overlapping.

use std::sync::Arc;

use dashmap::DashMap;

use chorus_types::message::ChannelId;

/// Tracks which channels have a generation cycle in flight.
///
/// Clones share state, so the registry can be handed to every surface that
/// triggers generation.
#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    channels: Arc<DashMap<ChannelId, ()>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to claim the channel. `None` means a cycle is already running
    /// and the caller must drop this request.
    pub fn try_acquire(&self, channel: &ChannelId) -> Option<InFlightGuard> {
        match self.channels.entry(channel.clone()) {
            dashmap::Entry::Occupied(_) => None,
            dashmap::Entry::Vacant(slot) => {
                slot.insert(());
                Some(InFlightGuard {
                    channels: Arc::clone(&self.channels),
                    channel: channel.clone(),
                })
            }
        }
    }

    pub fn is_busy(&self, channel: &ChannelId) -> bool {
        self.channels.contains_key(channel)
    }
}

/// Releases the channel claim on drop, including on panic or early return.
#[derive(Debug)]
pub struct InFlightGuard {
    channels: Arc<DashMap<ChannelId, ()>>,
    channel: ChannelId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.channels.remove(&self.channel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_and_release() {
        let registry = InFlightRegistry::new();
        let channel = ChannelId::new("#lounge");

        let guard = registry.try_acquire(&channel);
        assert!(guard.is_some());
        assert!(registry.is_busy(&channel));

        drop(guard);
        assert!(!registry.is_busy(&channel));
    }

    #[test]
    fn test_second_acquire_is_dropped() {
        let registry = InFlightRegistry::new();
        let channel = ChannelId::new("#lounge");

        let _guard = registry.try_acquire(&channel).unwrap();
        assert!(registry.try_acquire(&channel).is_none());
    }

    #[test]
    fn test_channels_are_independent() {
        let registry = InFlightRegistry::new();
        let _a = registry.try_acquire(&ChannelId::new("#a")).unwrap();
        assert!(registry.try_acquire(&ChannelId::new("#b")).is_some());
    }

    #[test]
    fn test_clones_share_state() {
        let registry = InFlightRegistry::new();
        let other = registry.clone();
        let channel = ChannelId::new("#lounge");

        let _guard = registry.try_acquire(&channel).unwrap();
        assert!(other.try_acquire(&channel).is_none());
    }
}
