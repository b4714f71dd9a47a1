//! Publish/subscribe plumbing for pipeline observability.
//!
//! A stage (breaker, retry, limiter, cache) declares its own event enum and
//! implements [`PipelineEvent`] on it. The stage's configuration owns an
//! [`EventListeners`] list; hooks such as `on_state_transition` on the
//! builders push closures into that list through [`FnListener`].

use std::fmt;
use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// Metadata every stage event carries.
pub trait PipelineEvent: Send + Sync + fmt::Debug {
    /// Snake-case tag, stable across releases, e.g. `"call_rejected"`.
    fn event_type(&self) -> &'static str;

    fn timestamp(&self) -> Instant;

    /// The `name` the stage was configured with.
    fn component_name(&self) -> &str;
}

/// Subscriber for one event type.
pub trait EventListener<E: PipelineEvent>: Send + Sync {
    fn on_event(&self, event: &E);
}

pub type BoxedEventListener<E> = Arc<dyn EventListener<E>>;

/// Subscribers of a single stage, notified synchronously on the calling task.
///
/// Cloning is shallow: the clone shares the already registered subscribers
/// but later `add` calls affect only the list they are made on.
#[derive(Clone)]
pub struct EventListeners<E: PipelineEvent> {
    subscribers: Vec<BoxedEventListener<E>>,
}

impl<E: PipelineEvent> EventListeners<E> {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    /// Appends a subscriber; delivery follows insertion order.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.subscribers.push(Arc::new(listener));
    }

    /// Delivers `event` to each subscriber and returns how many of them
    /// panicked. A panic never reaches the stage that published the event.
    pub fn emit(&self, event: &E) -> usize {
        self.subscribers
            .iter()
            .filter(|subscriber| !deliver(subscriber.as_ref(), event))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }
}

fn deliver<E: PipelineEvent>(subscriber: &dyn EventListener<E>, event: &E) -> bool {
    catch_unwind(AssertUnwindSafe(|| subscriber.on_event(event))).is_ok()
}

impl<E: PipelineEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: PipelineEvent> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// Closure subscriber, the usual way builder hooks register themselves.
pub struct FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    callback: F,
    _event: PhantomData<fn(&E)>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            _event: PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: PipelineEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.callback)(event)
    }
}
