//! # Event Bus System
//!
//! Typed events broadcast over `tokio::sync::broadcast` so the host (and tests)
//! can observe identity changes, sync runs, reports and downloads without
//! coupling to the modules that produce them.
//!
//! ```text
//! ┌───────────────┐  emit   ┌───────────┐  subscribe  ┌────────────┐
//! │ IdentityMgr   ├────────>│           ├────────────>│ Host UI    │
//! ├───────────────┤         │ EventBus  │             └────────────┘
//! │ SyncCoord.    ├────────>│           │  subscribe  ┌────────────┐
//! ├───────────────┤         │           ├────────────>│ Tests      │
//! │ ImageFetcher  ├────────>│           │             └────────────┘
//! └───────────────┘         └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
//!
//! let event_bus = EventBus::new(32);
//! let mut receiver = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Sync(SyncEvent::Superseded {
//!         run_id: "r1".to_string(),
//!     }))
//!     .ok();
//!
//! assert!(matches!(receiver.try_recv(), Ok(CoreEvent::Sync(_))));
//! ```
//!
//! `emit` fails only when nobody is subscribed; producers ignore that error.
//! Slow subscribers get `RecvError::Lagged(n)` and can keep reading.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Identity(IdentityEvent),
    Sync(SyncEvent),
    Report(ReportEvent),
    Fetch(FetchEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Identity(e) => e.description(),
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Report(e) => e.description(),
            CoreEvent::Fetch(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::Aborted { .. }) => EventSeverity::Error,
            CoreEvent::Identity(IdentityEvent::CredentialsRejected { .. }) => {
                EventSeverity::Warning
            }
            CoreEvent::Report(ReportEvent::Failed { .. }) => EventSeverity::Warning,
            CoreEvent::Fetch(FetchEvent::Failed { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Identity(IdentityEvent::UserRegistered { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Identity Events
// ============================================================================

/// Changes to the locally persisted smart user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum IdentityEvent {
    /// User record read from disk.
    UserLoaded { user_id: String },
    /// A fresh anonymous user was registered with the server.
    UserRegistered { user_id: String },
    /// The host replaced the user after a login flow.
    UserReplaced { user_id: String },
    /// The server rejected the stored credentials.
    CredentialsRejected { user_id: String },
}

impl IdentityEvent {
    fn description(&self) -> &str {
        match self {
            IdentityEvent::UserLoaded { .. } => "Smart user loaded",
            IdentityEvent::UserRegistered { .. } => "Smart user registered",
            IdentityEvent::UserReplaced { .. } => "Smart user replaced",
            IdentityEvent::CredentialsRejected { .. } => "Smart credentials rejected",
        }
    }
}

// ============================================================================
// Sync Events
// ============================================================================

/// Lifecycle of one sync run. `run_id` is unique per invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    Started {
        run_id: String,
        generation: u64,
    },
    /// Local favorites were scanned and unreported ones submitted.
    UploadFinished {
        run_id: String,
        scanned: u64,
        reported: u64,
    },
    /// Server-side favorites queued for download.
    DownloadQueued {
        run_id: String,
        count: u64,
    },
    Completed {
        run_id: String,
        reported: u64,
        downloaded: u64,
        failed: u64,
    },
    /// A newer run started; this one stopped at a checkpoint.
    Superseded {
        run_id: String,
    },
    /// The smart or sync preference was switched off mid-run.
    Disabled {
        run_id: String,
    },
    /// The run could not start its work (no user, server unreachable).
    Aborted {
        run_id: String,
        message: String,
    },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Started { .. } => "Sync started",
            SyncEvent::UploadFinished { .. } => "Local favorites uploaded",
            SyncEvent::DownloadQueued { .. } => "Remote favorites queued",
            SyncEvent::Completed { .. } => "Sync completed",
            SyncEvent::Superseded { .. } => "Sync superseded by a newer run",
            SyncEvent::Disabled { .. } => "Sync stopped, feature disabled",
            SyncEvent::Aborted { .. } => "Sync aborted",
        }
    }
}

// ============================================================================
// Report Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ReportEvent {
    Submitted {
        /// File name only, never the full path
        file: String,
        tag: String,
    },
    Failed {
        file: String,
        tag: String,
        outcome: String,
    },
}

impl ReportEvent {
    fn description(&self) -> &str {
        match self {
            ReportEvent::Submitted { .. } => "Image reported",
            ReportEvent::Failed { .. } => "Image report failed",
        }
    }
}

// ============================================================================
// Fetch Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum FetchEvent {
    Fetched {
        url: String,
        file: String,
        already_present: bool,
    },
    NotAnImage {
        url: String,
    },
    Failed {
        url: String,
        message: String,
    },
}

impl FetchEvent {
    fn description(&self) -> &str {
        match self {
            FetchEvent::Fetched { .. } => "Image fetched",
            FetchEvent::NotAnImage { .. } => "URL is not an image",
            FetchEvent::Failed { .. } => "Image fetch failed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel. Cloning shares the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Subscribers falling more than `capacity` events behind get `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Returns the number of subscribers that received the event, or an
    /// error when there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// `broadcast::Receiver` with an optional predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(16);
/// let sync_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Sync(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Next event passing the filter.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// `None` when no matching event is buffered right now.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}
