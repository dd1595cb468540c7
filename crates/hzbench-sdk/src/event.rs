//! Lifecycle events and the listener registry.
//!
//! Every state transition of a [`Benchmark`](crate::Benchmark) or
//! [`Suite`](crate::Suite) (start, cycle, complete, abort, reset, error, add)
//! is published as an [`Event`] through an [`Emitter`]. Listeners run in
//! registration order and can influence the transition:
//!
//! - returning [`Flow::Cancel`] (or `false`) marks the event cancelled, which
//!   vetoes the default action of cancellable transitions (abort, reset, add,
//!   error handling);
//! - calling [`Event::abort`] stops the remaining listeners; on `cycle` events
//!   it also asks the emitter's owner to abort the run.
//!
//! ```
//! use hzbench_sdk::event::{Emitter, Event, EventKind, Flow};
//!
//! let mut emitter = Emitter::new();
//! emitter.on(EventKind::Reset, |_event: &mut Event| false);
//!
//! let mut event = Event::new(EventKind::Reset);
//! assert_eq!(emitter.emit(&mut event), Some(Flow::Cancel));
//! assert!(event.cancelled);
//! ```

use crate::benchmark::BenchState;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

/// Event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A run was aborted.
    Abort,
    /// A benchmark is about to be added to a suite.
    Add,
    /// A run finished.
    Complete,
    /// A timed cycle finished, or a suite member finished running.
    Cycle,
    /// The measured operation failed.
    Error,
    /// State is about to be restored to defaults.
    Reset,
    /// A run is starting.
    Start,
}

impl EventKind {
    /// Returns the lowercase tag of the event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Abort => "abort",
            EventKind::Add => "add",
            EventKind::Complete => "complete",
            EventKind::Cycle => "cycle",
            EventKind::Error => "error",
            EventKind::Reset => "reset",
            EventKind::Start => "start",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a listener asks of the emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Let the default action proceed.
    Continue,
    /// Veto the default action.
    Cancel,
}

impl From<()> for Flow {
    fn from(_: ()) -> Self {
        Flow::Continue
    }
}

impl From<bool> for Flow {
    fn from(proceed: bool) -> Self {
        if proceed { Flow::Continue } else { Flow::Cancel }
    }
}

/// Summary of a suite carried by suite events.
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteInfo {
    /// Suite name.
    pub name: String,
    /// Number of member benchmarks.
    pub len: usize,
    /// Whether the suite is running.
    pub running: bool,
    /// Whether the suite was aborted.
    pub aborted: bool,
}

/// The object an event concerns, captured when the event is created.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// A benchmark snapshot.
    Benchmark(Box<BenchState>),
    /// A suite summary.
    Suite(SuiteInfo),
}

impl Target {
    /// Name of the benchmark or suite.
    pub fn name(&self) -> &str {
        match self {
            Target::Benchmark(state) => &state.name,
            Target::Suite(info) => &info.name,
        }
    }

    /// The benchmark snapshot, if this target is a benchmark.
    pub fn as_benchmark(&self) -> Option<&BenchState> {
        match self {
            Target::Benchmark(state) => Some(state),
            Target::Suite(_) => None,
        }
    }
}

/// A single emission. Created per transition and not retained.
#[derive(Debug, Clone)]
pub struct Event {
    /// Event type.
    pub kind: EventKind,
    /// The object the event originated from.
    pub target: Option<Target>,
    /// The object whose listeners are being processed.
    pub current_target: Option<Target>,
    /// Set when a listener vetoed the default action.
    pub cancelled: bool,
    /// Set when listener iteration (and, for cycles, the run) should stop.
    pub aborted: bool,
    /// Return value of the last listener executed.
    pub result: Option<Flow>,
    /// Error description for `error` events.
    pub message: Option<String>,
    /// When the event was created.
    pub timestamp: SystemTime,
}

impl Event {
    /// Creates an event of the given type.
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            target: None,
            current_target: None,
            cancelled: false,
            aborted: false,
            result: None,
            message: None,
            timestamp: SystemTime::now(),
        }
    }

    /// Sets the event's target.
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = Some(target);
        self
    }

    /// Attaches an error description.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Vetoes the default action.
    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    /// Stops the remaining listeners and, on cycle events, the run itself.
    pub fn abort(&mut self) {
        self.aborted = true;
    }
}

impl From<EventKind> for Event {
    fn from(kind: EventKind) -> Self {
        Event::new(kind)
    }
}

/// Identifies a registered listener so it can be removed later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

type Callback = Box<dyn FnMut(&mut Event) -> Flow + Send>;

/// A registered listener.
pub struct Listener {
    id: ListenerId,
    callback: Callback,
}

impl Listener {
    /// Wraps a closure as a listener.
    pub fn new<F, R>(mut callback: F) -> Self
    where
        F: FnMut(&mut Event) -> R + Send + 'static,
        R: Into<Flow>,
    {
        Self {
            id: ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed)),
            callback: Box::new(move |event| callback(event).into()),
        }
    }

    /// The listener's identifier.
    pub fn id(&self) -> ListenerId {
        self.id
    }

    fn call(&mut self, event: &mut Event) -> Flow {
        (self.callback)(event)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener").field("id", &self.id).finish()
    }
}

/// Listener registry keyed by event type.
#[derive(Debug, Default)]
pub struct Emitter {
    listeners: HashMap<EventKind, Vec<Listener>>,
}

impl Emitter {
    /// Creates an emitter with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for `kind`, after any already registered.
    pub fn on<F, R>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: FnMut(&mut Event) -> R + Send + 'static,
        R: Into<Flow>,
    {
        let listener = Listener::new(listener);
        let id = listener.id();
        self.listeners(kind).push(listener);
        id
    }

    /// Unregisters one listener, or every listener of `kind` when `id` is
    /// `None`. Returns how many listeners were removed.
    pub fn off(&mut self, kind: EventKind, id: Option<ListenerId>) -> usize {
        let Some(listeners) = self.listeners.get_mut(&kind) else {
            return 0;
        };
        let before = listeners.len();
        match id {
            Some(id) => listeners.retain(|l| l.id != id),
            None => listeners.clear(),
        }
        before - listeners.len()
    }

    /// The listeners for `kind`, for direct manipulation.
    pub fn listeners(&mut self, kind: EventKind) -> &mut Vec<Listener> {
        self.listeners.entry(kind).or_default()
    }

    /// Number of listeners registered for `kind`.
    pub fn count(&self, kind: EventKind) -> usize {
        self.listeners.get(&kind).map_or(0, Vec::len)
    }

    /// Runs the listeners of `event.kind` in order.
    ///
    /// Iteration stops early once a listener aborts the event. Returns the
    /// last listener's result, or `None` when no listener ran.
    pub fn emit(&mut self, event: &mut Event) -> Option<Flow> {
        event.result = None;
        if let Some(listeners) = self.listeners.get_mut(&event.kind) {
            for listener in listeners.iter_mut() {
                let flow = listener.call(event);
                if flow == Flow::Cancel {
                    event.cancelled = true;
                }
                event.result = Some(flow);
                if event.aborted {
                    break;
                }
            }
        }
        event.result
    }
}
