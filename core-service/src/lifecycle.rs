//! Reader lifecycle state machine
//!
//! ```text
//! Uninitialized ──> Initializing ──> Ready ──> Deinitializing ──> Uninitialized
//!       ▲                │                           │
//!       │                ▼                           ▼
//!       └── Deinitializing <──────── Failed <────────┘
//!                                      │
//!                                      └──> Initializing (retry)
//! ```

use std::fmt;

use core_runtime::events::{BridgeEvent, EventBus};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReaderState {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
    Deinitializing,
    /// A transition failed on a collaborator error. Leave with
    /// `deinitTagReader` or retry `initTagReader`.
    Failed,
}

impl ReaderState {
    pub fn as_str(self) -> &'static str {
        match self {
            ReaderState::Uninitialized => "Uninitialized",
            ReaderState::Initializing => "Initializing",
            ReaderState::Ready => "Ready",
            ReaderState::Deinitializing => "Deinitializing",
            ReaderState::Failed => "Failed",
        }
    }

    pub fn is_ready(self) -> bool {
        self == ReaderState::Ready
    }

    /// Set only while a transition task holds the lock.
    pub fn is_transient(self) -> bool {
        matches!(self, ReaderState::Initializing | ReaderState::Deinitializing)
    }

    pub fn can_transition_to(self, next: ReaderState) -> bool {
        use ReaderState::*;

        matches!(
            (self, next),
            (Uninitialized, Initializing)
                | (Failed, Initializing)
                | (Initializing, Ready)
                | (Initializing, Failed)
                | (Ready, Deinitializing)
                | (Failed, Deinitializing)
                | (Deinitializing, Uninitialized)
                | (Deinitializing, Failed)
        )
    }
}

impl fmt::Display for ReaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current state plus its observers.
pub(crate) struct Lifecycle {
    state: watch::Sender<ReaderState>,
    events: EventBus,
}

impl Lifecycle {
    pub(crate) fn new(events: EventBus) -> Self {
        let (state, _) = watch::channel(ReaderState::Uninitialized);
        Self { state, events }
    }

    pub(crate) fn current(&self) -> ReaderState {
        *self.state.borrow()
    }

    pub(crate) fn watch(&self) -> watch::Receiver<ReaderState> {
        self.state.subscribe()
    }

    /// Moves to `next`, returning the previous state.
    pub(crate) fn transition(&self, next: ReaderState) -> Result<ReaderState> {
        let previous = self.current();
        if !previous.can_transition_to(next) {
            return Err(CoreError::Runtime(core_runtime::Error::Internal(format!(
                "invalid reader transition {} -> {}",
                previous, next
            ))));
        }

        self.state.send_replace(next);
        match next {
            ReaderState::Failed => warn!(from = %previous, "Tag reader failed"),
            state if state.is_transient() => {
                debug!(from = %previous, to = %next, "Tag reader state changed")
            }
            _ => info!(from = %previous, to = %next, "Tag reader state changed"),
        }

        let event = BridgeEvent::ReaderStateChanged {
            previous: previous.to_string(),
            current: next.to_string(),
        };
        if self.events.emit(event).is_err() {
            debug!("No host receiver for state change");
        }

        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_transitions() {
        use ReaderState::*;

        assert!(Uninitialized.can_transition_to(Initializing));
        assert!(Initializing.can_transition_to(Ready));
        assert!(Ready.can_transition_to(Deinitializing));
        assert!(Deinitializing.can_transition_to(Uninitialized));
        assert!(Failed.can_transition_to(Initializing));
        assert!(Failed.can_transition_to(Deinitializing));

        assert!(!Uninitialized.can_transition_to(Ready));
        assert!(!Ready.can_transition_to(Initializing));
        assert!(!Ready.can_transition_to(Uninitialized));
        assert!(!Failed.can_transition_to(Ready));
    }

    #[tokio::test]
    async fn test_transition_notifies_watchers_and_bus() {
        let bus = EventBus::new(8);
        let mut events = bus.subscribe();
        let lifecycle = Lifecycle::new(bus);
        let mut watcher = lifecycle.watch();

        let previous = lifecycle.transition(ReaderState::Initializing).unwrap();
        assert_eq!(previous, ReaderState::Uninitialized);

        watcher.changed().await.unwrap();
        assert_eq!(*watcher.borrow(), ReaderState::Initializing);

        let event = events.recv().await.unwrap();
        assert_eq!(
            event,
            BridgeEvent::ReaderStateChanged {
                previous: "Uninitialized".to_string(),
                current: "Initializing".to_string(),
            }
        );
    }

    #[test]
    fn test_transient_states() {
        assert!(ReaderState::Initializing.is_transient());
        assert!(ReaderState::Deinitializing.is_transient());
        assert!(!ReaderState::Uninitialized.is_transient());
        assert!(!ReaderState::Ready.is_transient());
        assert!(!ReaderState::Failed.is_transient());
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let lifecycle = Lifecycle::new(EventBus::new(8));
        let err = lifecycle.transition(ReaderState::Ready).unwrap_err();

        assert!(matches!(err, CoreError::Runtime(_)));
        assert_eq!(lifecycle.current(), ReaderState::Uninitialized);
    }
}
