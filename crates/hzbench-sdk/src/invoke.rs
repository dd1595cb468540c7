//! Generic sequencer for collections of schedulable items.
//!
//! [`Invoke`] walks a collection, calling an operation on each item in turn,
//! and reports progress through [`Hooks`]: one `start` before the first item,
//! one `cycle` after every item, one `complete` at the end. Setting
//! `aborted` on the `start` or a `cycle` event skips the remaining items and
//! goes straight to `complete`.
//!
//! In queued mode each finished item is removed from the front of the
//! collection instead of being indexed, so hooks may append to the collection
//! while it is being walked. Removed items are handed back in
//! [`Invocation::dequeued`].
//!
//! The synchronous path ([`Invoke::run`]) loops in place. The async path
//! ([`Invoke::run_async`]) awaits each item's future and, for asynchronous
//! items, sleeps the item's delay before starting it.

use crate::event::{Event, EventKind, Target};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tracing::trace;

/// An item [`Invoke`] can sequence.
pub trait Schedulable {
    /// Event target describing the item.
    fn target(&self) -> Target;

    /// Whether the item yields to the runtime between steps.
    fn is_asynchronous(&self) -> bool {
        false
    }

    /// Pause before starting the item on the async path.
    fn delay(&self) -> Duration {
        Duration::ZERO
    }
}

/// Progress callbacks. Each receives the event and the live collection.
pub trait Hooks<T> {
    /// Called once before the first item.
    fn on_start(&mut self, _event: &mut Event, _items: &mut Vec<T>) {}

    /// Called after each item.
    fn on_cycle(&mut self, _event: &mut Event, _items: &mut Vec<T>) {}

    /// Called once after the last item or after an abort.
    fn on_complete(&mut self, _event: &mut Event, _items: &mut Vec<T>) {}
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl<T> Hooks<T> for NoHooks {}

/// Results of one sequencing pass.
#[derive(Debug)]
pub struct Invocation<R, T> {
    /// Return value of each invoked item, in invocation order.
    pub results: Vec<R>,
    /// Items removed from the front of the collection in queued mode.
    pub dequeued: Vec<T>,
}

impl<R, T> Default for Invocation<R, T> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            dequeued: Vec::new(),
        }
    }
}

/// A boxed future borrowing the item it runs.
pub type ItemFuture<'a, R> = Pin<Box<dyn Future<Output = R> + Send + 'a>>;

/// Sequencer configuration.
///
/// # Example
///
/// ```
/// use hzbench_sdk::event::{SuiteInfo, Target};
/// use hzbench_sdk::invoke::{Invoke, NoHooks, Schedulable};
///
/// struct Job(u32);
///
/// impl Schedulable for Job {
///     fn target(&self) -> Target {
///         Target::Suite(SuiteInfo {
///             name: format!("job {}", self.0),
///             len: 0,
///             running: false,
///             aborted: false,
///         })
///     }
/// }
///
/// let mut jobs = vec![Job(1), Job(2), Job(3)];
/// let done = Invoke::new(NoHooks).run(&mut jobs, |job| job.0 * 10);
/// assert_eq!(done.results, vec![10, 20, 30]);
/// ```
#[derive(Debug)]
pub struct Invoke<H> {
    hooks: H,
    queued: bool,
}

impl<H> Invoke<H> {
    /// Creates a sequencer reporting to `hooks`.
    pub fn new(hooks: H) -> Self {
        Self {
            hooks,
            queued: false,
        }
    }

    /// Removes finished items from the front of the collection.
    pub fn queued(mut self, queued: bool) -> Self {
        self.queued = queued;
        self
    }

    /// Consumes the sequencer, returning its hooks.
    pub fn into_hooks(self) -> H {
        self.hooks
    }

    /// Index of the item to run next, or `None` when the walk is over.
    fn current<T>(&self, index: usize, items: &[T]) -> Option<usize> {
        if self.queued {
            (!items.is_empty()).then_some(0)
        } else {
            (index < items.len()).then_some(index)
        }
    }

    /// Emits `start`. Returns `false` if a hook aborted it, after emitting
    /// `cycle` and `complete`.
    fn start<T>(&mut self, items: &mut Vec<T>) -> bool
    where
        T: Schedulable,
        H: Hooks<T>,
    {
        let target = items[0].target();
        let mut event = Event::new(EventKind::Start).with_target(target.clone());
        self.hooks.on_start(&mut event, items);
        if !event.aborted {
            return true;
        }
        let mut cycle = Event::new(EventKind::Cycle).with_target(target.clone());
        self.hooks.on_cycle(&mut cycle, items);
        let mut complete = Event::new(EventKind::Complete).with_target(target);
        self.hooks.on_complete(&mut complete, items);
        false
    }

    /// Emits `cycle` for the item at `at` and advances. Returns the next
    /// index, or `None` after emitting `complete`.
    fn advance<T, R>(
        &mut self,
        at: usize,
        index: usize,
        items: &mut Vec<T>,
        invocation: &mut Invocation<R, T>,
    ) -> Option<usize>
    where
        T: Schedulable,
        H: Hooks<T>,
    {
        let target = items[at].target();
        let mut cycle = Event::new(EventKind::Cycle).with_target(target.clone());
        self.hooks.on_cycle(&mut cycle, items);

        if self.queued && !items.is_empty() {
            invocation.dequeued.push(items.remove(0));
        }
        let next = index + 1;
        if !cycle.aborted && self.current(next, items).is_some() {
            return Some(next);
        }
        let mut complete = Event::new(EventKind::Complete).with_target(target);
        self.hooks.on_complete(&mut complete, items);
        None
    }

    /// Runs `f` on each item in order on the calling thread.
    pub fn run<T, R, F>(&mut self, items: &mut Vec<T>, mut f: F) -> Invocation<R, T>
    where
        T: Schedulable,
        H: Hooks<T>,
        F: FnMut(&mut T) -> R,
    {
        let mut invocation = Invocation::default();
        if items.is_empty() || !self.start(items) {
            return invocation;
        }
        let mut index = 0;
        while let Some(at) = self.current(index, items) {
            trace!(index, "invoking item");
            invocation.results.push(f(&mut items[at]));
            match self.advance(at, index, items, &mut invocation) {
                Some(next) => index = next,
                None => break,
            }
        }
        invocation
    }

    /// Runs `f` on each item in order, awaiting each item's future.
    ///
    /// Asynchronous items after the first are preceded by their delay.
    pub async fn run_async<T, R, F>(&mut self, items: &mut Vec<T>, mut f: F) -> Invocation<R, T>
    where
        T: Schedulable,
        H: Hooks<T>,
        F: for<'a> FnMut(&'a mut T) -> ItemFuture<'a, R>,
    {
        let mut invocation = Invocation::default();
        if items.is_empty() || !self.start(items) {
            return invocation;
        }
        let mut index = 0;
        while let Some(at) = self.current(index, items) {
            let item = &mut items[at];
            if index > 0 && item.is_asynchronous() {
                tokio::time::sleep(item.delay()).await;
            }
            trace!(index, "invoking item");
            invocation.results.push(f(item).await);
            match self.advance(at, index, items, &mut invocation) {
                Some(next) => index = next,
                None => break,
            }
        }
        invocation
    }
}
