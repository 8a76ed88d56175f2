//! In-process publish/subscribe bus
//!
//! `publish` invokes every handler registered for an event, in registration
//! order, and returns without waiting for them. Each handler future runs as
//! its own tokio task under a supervisor that records failures (errors and
//! panics) in a bounded dead-letter log instead of dropping them.

use crate::error::CoreResult;
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

/// Boxed future returned by a handler
pub type HandlerFuture = Pin<Box<dyn Future<Output = CoreResult<()>> + Send>>;

/// Type-erased event handler
pub type Handler = Arc<dyn Fn(Value) -> HandlerFuture + Send + Sync>;

struct Subscription {
    handler: Handler,
    once: bool,
}

/// A handler failure captured by the supervisor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeadLetter {
    pub event: String,
    pub error: String,
    pub at: String,
}

/// Dead letters kept before the oldest are discarded
pub const DEFAULT_DEAD_LETTER_CAPACITY: usize = 256;

struct DeadLetterLog {
    entries: VecDeque<DeadLetter>,
    capacity: usize,
}

impl DeadLetterLog {
    fn push(&mut self, letter: DeadLetter) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(letter);
    }
}

pub struct PubSub {
    subscribers: Mutex<HashMap<String, Vec<Subscription>>>,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
    dead_letters: Arc<Mutex<DeadLetterLog>>,
}

impl Default for PubSub {
    fn default() -> Self {
        Self::with_dead_letter_capacity(DEFAULT_DEAD_LETTER_CAPACITY)
    }
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PubSub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus that keeps at most `capacity` dead letters, newest last
    pub fn with_dead_letter_capacity(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::default(),
            in_flight: Mutex::default(),
            dead_letters: Arc::new(Mutex::new(DeadLetterLog {
                entries: VecDeque::new(),
                capacity,
            })),
        }
    }

    /// Register a handler for every future `event`
    pub fn subscribe<F, Fut>(&self, event: &str, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CoreResult<()>> + Send + 'static,
    {
        self.register(event, handler, false);
    }

    /// Register a handler for the next `event` only
    pub fn subscribe_once<F, Fut>(&self, event: &str, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CoreResult<()>> + Send + 'static,
    {
        self.register(event, handler, true);
    }

    fn register<F, Fut>(&self, event: &str, handler: F, once: bool)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CoreResult<()>> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |payload| Box::pin(handler(payload)) as HandlerFuture);
        locked(&self.subscribers)
            .entry(event.to_string())
            .or_default()
            .push(Subscription { handler, once });
    }

    /// Number of handlers currently registered for `event`
    pub fn subscriber_count(&self, event: &str) -> usize {
        locked(&self.subscribers).get(event).map_or(0, Vec::len)
    }

    /// Deliver `payload` to every handler of `event`.
    ///
    /// Returns the number of handlers invoked. Must be called from within a
    /// tokio runtime.
    pub fn publish(&self, event: &str, payload: Value) -> usize {
        let handlers: Vec<Handler> = {
            let mut subscribers = locked(&self.subscribers);
            match subscribers.get_mut(event) {
                Some(list) => {
                    let handlers = list.iter().map(|s| s.handler.clone()).collect();
                    list.retain(|s| !s.once);
                    handlers
                }
                None => Vec::new(),
            }
        };

        log::trace!("Publishing '{}' to {} handler(s)", event, handlers.len());

        for handler in &handlers {
            let future = handler(payload.clone());
            self.supervise(event, future);
        }

        handlers.len()
    }

    fn supervise(&self, event: &str, future: HandlerFuture) {
        let task = tokio::spawn(future);
        let dead_letters = self.dead_letters.clone();
        let event = event.to_string();

        let supervisor = tokio::spawn(async move {
            let failure = match task.await {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(e) => Some(format!("handler aborted: {}", e)),
            };

            if let Some(error) = failure {
                log::error!(target: "tallyweb::pubsub", "Handler for '{}' failed: {}", event, error);
                locked(&dead_letters).push(DeadLetter {
                    event,
                    error,
                    at: tallyweb_utils::now_iso(),
                });
            }
        });

        let mut in_flight = locked(&self.in_flight);
        in_flight.retain(|handle| !handle.is_finished());
        in_flight.push(supervisor);
    }

    /// Wait until every handler started so far (and any they trigger) has finished
    pub async fn settle(&self) {
        loop {
            let pending = std::mem::take(&mut *locked(&self.in_flight));
            if pending.is_empty() {
                break;
            }
            for handle in pending {
                let _ = handle.await;
            }
        }
    }

    /// Snapshot of captured handler failures, oldest first
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        locked(&self.dead_letters).entries.iter().cloned().collect()
    }

    /// Take every captured failure, leaving the log empty
    pub fn drain_dead_letters(&self) -> Vec<DeadLetter> {
        locked(&self.dead_letters).entries.drain(..).collect()
    }
}
