//! Connection state tracking
//!
//! Turns raw status notifications into the three-state connection machine and
//! reports which session boundaries a notification crossed.

use crate::types::{ConnectionState, DeviceStatus, TelemetryEvent, TelemetryKind};

/// What a status notification did to the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub previous: ConnectionState,
    pub current: ConnectionState,
}

impl Transition {
    /// Every Connected notification starts a session, even when already
    /// connected; the new session supersedes the old one.
    pub fn entered_connected(&self) -> bool {
        self.current == ConnectionState::Connected
    }

    pub fn left_connected(&self) -> bool {
        self.previous == ConnectionState::Connected && self.current != ConnectionState::Connected
    }

    /// STATUS event describing the new state
    pub fn status_event(&self) -> TelemetryEvent {
        TelemetryEvent::new(TelemetryKind::Status, self.current.label())
    }
}

/// Three-state tracker fed exclusively by collaborator status events
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    state: ConnectionState,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Apply a raw status notification
    pub fn on_status(&mut self, status: DeviceStatus) -> Transition {
        let transition = Transition {
            previous: self.state,
            current: status.to_state(),
        };
        self.state = transition.current;
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        let mut tracker = ConnectionTracker::new();

        let t = tracker.on_status(DeviceStatus::Connecting);
        assert_eq!(t.status_event().value, "Connecting...");
        assert!(!t.entered_connected());

        let t = tracker.on_status(DeviceStatus::Connected);
        assert_eq!(t.status_event(), TelemetryEvent::new(TelemetryKind::Status, "Connected"));
        assert!(t.entered_connected());

        let t = tracker.on_status(DeviceStatus::Unknown);
        assert_eq!(t.status_event().value, "Disconnected");
        assert!(t.left_connected());
        assert_eq!(tracker.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_repeated_connected_reenters() {
        let mut tracker = ConnectionTracker::new();
        tracker.on_status(DeviceStatus::Connected);

        let t = tracker.on_status(DeviceStatus::Connected);
        assert!(t.entered_connected());
        assert!(!t.left_connected());
    }

    #[test]
    fn test_connecting_from_connected_leaves_session() {
        let mut tracker = ConnectionTracker::new();
        tracker.on_status(DeviceStatus::Connected);

        let t = tracker.on_status(DeviceStatus::Connecting);
        assert!(t.left_connected());
        assert!(!t.entered_connected());
    }

    #[test]
    fn test_disconnect_while_disconnected_is_not_a_boundary() {
        let mut tracker = ConnectionTracker::new();
        let t = tracker.on_status(DeviceStatus::Disconnected);
        assert!(!t.left_connected());
        assert!(!t.entered_connected());
    }
}
