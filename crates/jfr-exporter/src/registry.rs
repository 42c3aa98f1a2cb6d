use std::any::Any;
use std::collections::HashMap;
use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use jfr_types::EventSubscription;
use jfr_types::RawEvent;
use tracing::debug;
use tracing::error;
use tracing::trace;

use crate::handlers::EventHandler;
use crate::handlers::Handler;
use crate::source::EventSource;

/// Routes raw events to the handler registered for their type.
#[derive(Default)]
pub struct HandlerRegistry {
    entries: HashMap<String, (EventSubscription, Arc<dyn EventHandler>)>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for the event type of `subscription`.
    ///
    /// A later registration for the same event type replaces the earlier one.
    pub fn register(&mut self, subscription: EventSubscription, handler: Arc<dyn EventHandler>) {
        let event_type = subscription.event_type().to_string();
        if self
            .entries
            .insert(event_type.clone(), (subscription, handler))
            .is_some()
        {
            debug!(event_type, "replacing handler");
        }
    }

    /// Register every subscription of every handler.
    pub fn register_all(&mut self, handlers: Vec<Handler>) {
        for handler in handlers {
            let handler: Arc<dyn EventHandler> = Arc::new(handler);
            for subscription in handler.subscriptions() {
                self.register(subscription, Arc::clone(&handler));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tell `source` which event types to deliver and how.
    pub fn subscribe(&self, source: &mut dyn EventSource) {
        for (subscription, _) in self.entries.values() {
            source.enable(subscription);
        }
    }

    /// Hand `event` to the handler registered for `event_type`.
    ///
    /// Handler failures and panics are logged and never reach the caller.
    pub fn dispatch(&self, event_type: &str, event: &RawEvent) {
        let Some((_, handler)) = self.entries.get(event_type) else {
            trace!(event_type, "no handler registered");
            return;
        };

        match catch_unwind(AssertUnwindSafe(|| handler.on_event(event))) {
            Ok(Ok(())) => {}
            Ok(Err(report)) => error!(event_type, error = ?report, "failed to handle event"),
            Err(payload) => error!(
                event_type,
                panic = panic_message(payload.as_ref()),
                "handler panicked"
            ),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic>"
    }
}
