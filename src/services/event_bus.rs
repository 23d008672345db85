//! Run event bus.
//!
//! Broadcast-based: any number of observers subscribe, publishing never
//! blocks, and an observer that falls behind by more than the channel
//! capacity loses the oldest events (`RecvError::Lagged`) instead of stalling
//! the loop. Events carry a sequence number assigned at publish time, so
//! observers can detect gaps.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::domain::models::{IterationRecord, OrchestratorState};

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonically increasing sequence number assigned by [`EventBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SequenceNumber(pub u64);

impl fmt::Display for SequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RunEventPayload {
    /// Human-readable status line for the state just entered
    Progress {
        state: OrchestratorState,
        message: String,
    },
    /// Full observable state after the transition
    Snapshot(Box<IterationRecord>),
}

/// Event envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunEvent {
    pub id: EventId,
    pub sequence: SequenceNumber,
    pub timestamp: DateTime<Utc>,
    pub run_id: Uuid,
    pub payload: RunEventPayload,
}

impl RunEvent {
    pub fn progress(&self) -> Option<(OrchestratorState, &str)> {
        match &self.payload {
            RunEventPayload::Progress { state, message } => Some((*state, message.as_str())),
            RunEventPayload::Snapshot(_) => None,
        }
    }

    pub fn snapshot(&self) -> Option<&IterationRecord> {
        match &self.payload {
            RunEventPayload::Snapshot(record) => Some(record),
            RunEventPayload::Progress { .. } => None,
        }
    }
}

pub struct EventBus {
    sender: broadcast::Sender<RunEvent>,
    sequence: AtomicU64,
}

impl EventBus {
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// Create a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            sequence: AtomicU64::new(0),
        }
    }

    /// Publish an event. Returns the assigned sequence number.
    pub fn publish(&self, run_id: Uuid, payload: RunEventPayload) -> SequenceNumber {
        let sequence = SequenceNumber(self.sequence.fetch_add(1, Ordering::SeqCst));
        let event = RunEvent {
            id: EventId::new(),
            sequence,
            timestamp: Utc::now(),
            run_id,
            payload,
        };
        // No subscribers is fine
        let _ = self.sender.send(event);
        sequence
    }

    pub fn publish_progress(&self, run_id: Uuid, state: OrchestratorState, message: impl Into<String>) -> SequenceNumber {
        self.publish(
            run_id,
            RunEventPayload::Progress {
                state,
                message: message.into(),
            },
        )
    }

    pub fn publish_snapshot(&self, record: &IterationRecord) -> SequenceNumber {
        self.publish(record.run_id, RunEventPayload::Snapshot(Box::new(record.clone())))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }

    /// Sequence number the next event will get.
    pub fn current_sequence(&self) -> SequenceNumber {
        SequenceNumber(self.sequence.load(Ordering::SeqCst))
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
