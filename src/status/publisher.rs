//! Push channel a component uses to announce its status.

use parking_lot::Mutex;
use std::sync::Arc;

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Fans a published status out to every registered handler.
///
/// Handlers run synchronously on the caller of [`StatusPublisher::publish`]
/// and must stay short.
pub struct StatusPublisher<T> {
    handlers: Mutex<Vec<Handler<T>>>,
}

impl<T> Default for StatusPublisher<T> {
    fn default() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
        }
    }
}

impl<T> StatusPublisher<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_status_handler<F>(&self, handler: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.handlers.lock().push(Arc::new(handler));
    }

    pub fn publish(&self, status: &T) {
        // Snapshot so a handler may register further handlers without deadlocking
        let handlers: Vec<Handler<T>> = self.handlers.lock().clone();
        for handler in handlers {
            handler(status);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.lock().len()
    }
}
