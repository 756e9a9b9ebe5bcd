//! Named lifecycle hooks.
//!
//! An [`EventBus`] maps event names to an ordered list of handlers. Each
//! handler is a transformation `C -> C` over the in-flight context: publishing
//! threads the context through every handler registered for that name, in
//! registration order, on the calling thread. A handler that changes nothing
//! simply returns its input; it never stops the chain.
//!
//! The bus is built once at startup, populated with subscriptions, then
//! handed to the component that publishes. Nothing registers globally.
//!
//! ```
//! use quire::events::EventBus;
//!
//! let mut bus: EventBus<Vec<&str>> = EventBus::new();
//! bus.subscribe("saved", |mut log| { log.push("first"); log });
//! bus.subscribe("saved", |mut log| { log.push("second"); log });
//!
//! assert_eq!(bus.publish("saved", Vec::new()), vec!["first", "second"]);
//! ```

use std::collections::HashMap;
use std::fmt;

/// A context transformation registered for one event name.
pub type Handler<C> = Box<dyn Fn(C) -> C>;

/// Ordered publish/subscribe registry over contexts of type `C`.
pub struct EventBus<C> {
    handlers: HashMap<String, Vec<Handler<C>>>,
}

impl<C> EventBus<C> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Append a handler to the chain for `event`.
    pub fn subscribe<F>(&mut self, event: &str, handler: F)
    where
        F: Fn(C) -> C + 'static,
    {
        self.handlers
            .entry(event.to_string())
            .or_default()
            .push(Box::new(handler));
    }

    /// Run every handler for `event` in subscription order.
    ///
    /// Events without subscribers return the context unchanged.
    pub fn publish(&self, event: &str, context: C) -> C {
        let Some(chain) = self.handlers.get(event) else {
            return context;
        };
        tracing::trace!(event, handlers = chain.len(), "publishing");
        chain.iter().fold(context, |ctx, handler| handler(ctx))
    }

    /// Number of handlers registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.handlers.get(event).map_or(0, Vec::len)
    }

    pub fn has_listeners(&self, event: &str) -> bool {
        self.listener_count(event) > 0
    }
}

impl<C> Default for EventBus<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for EventBus<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts: Vec<(&str, usize)> = self
            .handlers
            .iter()
            .map(|(name, chain)| (name.as_str(), chain.len()))
            .collect();
        counts.sort();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}
