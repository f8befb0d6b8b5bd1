//! Aggregates sub-component states into one overall service state.
//!
//! A job registers each of its sub-components here. Every state a sub-component
//! publishes goes through three steps, in order:
//! update registry → fire matching one-shot watchers → recompute overall state.
//!
//! Watchers and policy evaluation run on the publishing thread; the aggregator
//! owns no task of its own.

use anyhow::Result;
use parking_lot::{Mutex, ReentrantMutex};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

use super::component_state::ComponentState;
use super::publisher::StatusPublisher;

/// Derives the overall service state from sub-component states.
///
/// `components` is in registration order. Returning `None` leaves the overall
/// state as it is.
pub trait AggregationPolicy: Send + Sync {
    fn overall_state(&self, components: &[(String, ComponentState)]) -> Option<ComponentState>;
}

/// Any error wins (first by registration order), then all-running, then
/// all-finished.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAggregationPolicy;

impl AggregationPolicy for DefaultAggregationPolicy {
    fn overall_state(&self, components: &[(String, ComponentState)]) -> Option<ComponentState> {
        if components.is_empty() {
            return None;
        }

        if let Some((_, error)) = components
            .iter()
            .find(|(_, state)| matches!(state, ComponentState::Error(_)))
        {
            return Some(error.clone());
        }

        if components
            .iter()
            .all(|(_, state)| *state == ComponentState::Running)
        {
            return Some(ComponentState::Running);
        }

        if components
            .iter()
            .all(|(_, state)| matches!(state, ComponentState::Finished(_)))
        {
            return components.first().map(|(_, state)| state.clone());
        }

        None
    }
}

type WatcherAction = Box<dyn FnOnce() -> Result<()> + Send>;

struct Watcher {
    target: ComponentState,
    action: WatcherAction,
}

impl Watcher {
    /// `Finished(None)` matches any finish reason; other targets match exactly.
    fn matches(&self, state: &ComponentState) -> bool {
        match (&self.target, state) {
            (ComponentState::Finished(None), ComponentState::Finished(_)) => true,
            (target, state) => target == state,
        }
    }
}

#[derive(Default)]
struct Registry {
    components: Vec<(String, ComponentState)>,
    watchers: HashMap<String, Vec<Watcher>>,
}

impl Registry {
    fn entry_mut(&mut self, id: &str) -> Option<&mut ComponentState> {
        self.components
            .iter_mut()
            .find(|(existing, _)| existing == id)
            .map(|(_, state)| state)
    }

    /// Removes and returns the watchers on `id` waiting for `state`.
    fn take_matching(&mut self, id: &str, state: &ComponentState) -> Vec<Watcher> {
        let Some(pending) = self.watchers.get_mut(id) else {
            return Vec::new();
        };

        let (fired, kept): (Vec<_>, Vec<_>) = pending
            .drain(..)
            .partition(|watcher| watcher.matches(state));
        *pending = kept;
        fired
    }
}

struct Inner {
    name: String,
    registry: Mutex<Registry>,
    overall: Mutex<ComponentState>,
    /// Held across set + deliver so listeners see overall states in the order
    /// they were stored. Reentrant because a listener may publish again.
    delivery: ReentrantMutex<()>,
    policy: Box<dyn AggregationPolicy>,
    publisher: StatusPublisher<ComponentState>,
}

/// Cheaply cloneable handle to one service's status registry.
#[derive(Clone)]
pub struct StatusAggregator {
    inner: Arc<Inner>,
}

impl StatusAggregator {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_policy(name, DefaultAggregationPolicy)
    }

    pub fn with_policy(name: impl Into<String>, policy: impl AggregationPolicy + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                registry: Mutex::new(Registry::default()),
                overall: Mutex::new(ComponentState::Starting),
                delivery: ReentrantMutex::new(()),
                policy: Box::new(policy),
                publisher: StatusPublisher::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Start tracking `component` under `id`.
    pub fn register_sub_component(&self, id: &str, component: &StatusPublisher<ComponentState>) {
        {
            let mut registry = self.inner.registry.lock();
            if registry.entry_mut(id).is_some() {
                warn!("{}: sub-component {} already registered", self.inner.name, id);
                return;
            }
            registry
                .components
                .push((id.to_string(), ComponentState::Starting));
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let component_id = id.to_string();
        component.add_status_handler(move |state| {
            if let Some(inner) = weak.upgrade() {
                StatusAggregator { inner }.on_sub_component_state(&component_id, state);
            }
        });

        debug!("{}: registered sub-component {}", self.inner.name, id);
    }

    /// Begin a one-shot watcher on the component registered as `id`.
    pub fn whenever(&self, id: &str) -> Whenever<'_> {
        Whenever {
            aggregator: self,
            id: id.to_string(),
        }
    }

    /// Force the overall state regardless of sub-component states.
    pub fn publish_status(&self, state: ComponentState) {
        self.set_overall(state);
    }

    /// Drop every outstanding watcher so nothing fires against a stopped job.
    pub fn clear_watchers(&self) {
        let dropped: usize = {
            let mut registry = self.inner.registry.lock();
            registry.watchers.drain().map(|(_, list)| list.len()).sum()
        };
        if dropped > 0 {
            debug!("{}: dropped {} pending watchers", self.inner.name, dropped);
        }
    }

    /// Listen for changes to the overall state.
    pub fn add_status_handler<F>(&self, handler: F)
    where
        F: Fn(&ComponentState) + Send + Sync + 'static,
    {
        self.inner.publisher.add_status_handler(handler);
    }

    pub fn state(&self) -> ComponentState {
        self.inner.overall.lock().clone()
    }

    pub fn component_state(&self, id: &str) -> Option<ComponentState> {
        self.inner.registry.lock().entry_mut(id).cloned()
    }

    pub fn pending_watchers(&self, id: &str) -> usize {
        self.inner
            .registry
            .lock()
            .watchers
            .get(id)
            .map_or(0, Vec::len)
    }

    fn add_watcher(&self, id: String, target: ComponentState, action: WatcherAction) {
        let mut registry = self.inner.registry.lock();
        registry
            .watchers
            .entry(id)
            .or_default()
            .push(Watcher { target, action });
    }

    fn on_sub_component_state(&self, id: &str, state: &ComponentState) {
        let fired = {
            let mut registry = self.inner.registry.lock();
            let Some(current) = registry.entry_mut(id) else {
                warn!("{}: state from unknown component {}", self.inner.name, id);
                return;
            };

            if current.is_terminal() {
                warn!(
                    "{}: ignoring {} from {}, already {}",
                    self.inner.name, state, id, current
                );
                return;
            }
            if *current == *state {
                return;
            }

            info!("{}: {} transitioned {} -> {}", self.inner.name, id, current, state);
            *current = state.clone();
            registry.take_matching(id, state)
        };

        for watcher in fired {
            if let Err(e) = (watcher.action)() {
                warn!("{}: watcher on {} failed: {:#}", self.inner.name, id, e);
            }
        }

        let snapshot = self.inner.registry.lock().components.clone();
        if let Some(overall) = self.inner.policy.overall_state(&snapshot) {
            self.set_overall(overall);
        }
    }

    fn set_overall(&self, state: ComponentState) {
        let _delivery = self.inner.delivery.lock();
        {
            let mut overall = self.inner.overall.lock();
            if overall.is_terminal() {
                debug!(
                    "{}: overall state already {}, ignoring {}",
                    self.inner.name, overall, state
                );
                return;
            }
            if *overall == state {
                return;
            }
            info!("{}: overall state {} -> {}", self.inner.name, overall, state);
            *overall = state.clone();
        }

        self.inner.publisher.publish(&state);
    }
}

/// Builder returned by [`StatusAggregator::whenever`].
pub struct Whenever<'a> {
    aggregator: &'a StatusAggregator,
    id: String,
}

impl Whenever<'_> {
    /// Run `action` the first time the component enters `target`, then forget it.
    ///
    /// A `Finished(None)` target fires on any finish; `Finished(Some(reason))`
    /// only on that reason.
    pub fn transitions_to<F>(self, target: ComponentState, action: F)
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.aggregator
            .add_watcher(self.id, target, Box::new(action));
    }
}
