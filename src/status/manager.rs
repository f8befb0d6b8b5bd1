//! Worker-level health manager.
//!
//! Combines busy status with per-component health and publishes a fresh
//! [`WorkerStatus`] whenever either changes. The app wires its publisher to
//! the webhook dispatcher.

use parking_lot::{Mutex, ReentrantMutex};
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use tracing::{info, warn};

use super::aggregator::StatusAggregator;
use super::component_state::{ComponentState, ErrorScope};
use super::publisher::StatusPublisher;
use super::worker_status::{BusyStatus, HealthStatus, OverallHealth, WorkerStatus};

struct ManagerState {
    busy: BusyStatus,
    health: BTreeMap<String, (HealthStatus, String)>,
}

impl ManagerState {
    fn snapshot(&self) -> WorkerStatus {
        let unhealthy = self
            .health
            .values()
            .any(|(status, _)| *status == HealthStatus::Unhealthy);

        WorkerStatus::new(
            self.busy,
            OverallHealth {
                status: if unhealthy {
                    HealthStatus::Unhealthy
                } else {
                    HealthStatus::Healthy
                },
                details: self
                    .health
                    .iter()
                    .map(|(id, (_, detail))| (id.clone(), detail.clone()))
                    .collect(),
            },
        )
    }
}

pub struct StatusManager {
    state: Mutex<ManagerState>,
    /// Held across change + publish so handlers see statuses in order.
    delivery: ReentrantMutex<()>,
    publisher: StatusPublisher<WorkerStatus>,
}

impl Default for StatusManager {
    fn default() -> Self {
        Self {
            state: Mutex::new(ManagerState {
                busy: BusyStatus::Idle,
                health: BTreeMap::new(),
            }),
            delivery: ReentrantMutex::new(()),
            publisher: StatusPublisher::new(),
        }
    }
}

impl StatusManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn overall_status(&self) -> WorkerStatus {
        self.state.lock().snapshot()
    }

    pub fn add_status_handler<F>(&self, handler: F)
    where
        F: Fn(&WorkerStatus) + Send + Sync + 'static,
    {
        self.publisher.add_status_handler(handler);
    }

    pub fn update_busy_status(&self, busy: BusyStatus) {
        self.update(|state| state.busy = busy);
    }

    pub fn update_health(&self, component: &str, status: HealthStatus, detail: impl Into<String>) {
        let detail = detail.into();
        self.update(|state| {
            state.health.insert(component.to_string(), (status, detail));
        });
    }

    /// Mirror a capture job's overall state into busy status and health.
    pub fn track_service(self: &Arc<Self>, service: &StatusAggregator) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let name = service.name().to_string();
        service.add_status_handler(move |state| {
            let Some(manager) = weak.upgrade() else {
                return;
            };
            match state {
                ComponentState::Starting => {}
                ComponentState::Running => manager.update_busy_status(BusyStatus::Busy),
                ComponentState::Finished(_) => manager.update_busy_status(BusyStatus::Idle),
                ComponentState::Error(kind) => {
                    let system = kind.scope() == ErrorScope::System;
                    if system {
                        warn!("{} hit a system error: {}", name, kind);
                    }
                    let detail = kind.to_string();
                    manager.update(|s| {
                        s.busy = BusyStatus::Idle;
                        if system {
                            s.health
                                .insert(name.clone(), (HealthStatus::Unhealthy, detail));
                        }
                    });
                }
            }
        });
    }

    fn update<F>(&self, change: F)
    where
        F: FnOnce(&mut ManagerState),
    {
        let _delivery = self.delivery.lock();
        let (before, after) = {
            let mut state = self.state.lock();
            let before = state.snapshot();
            change(&mut *state);
            (before, state.snapshot())
        };

        if before != after {
            info!(
                "Worker status now {:?} / {:?}",
                after.busy_status, after.health.status
            );
            self.publisher.publish(&after);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::component_state::ErrorKind;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn recorded(manager: &StatusManager) -> Arc<Mutex<Vec<WorkerStatus>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        manager.add_status_handler(move |status| sink.lock().push(status.clone()));
        seen
    }

    #[test]
    fn test_defaults_to_idle_healthy() {
        let manager = StatusManager::new();
        assert_eq!(manager.overall_status(), WorkerStatus::idle_healthy());
    }

    #[test]
    fn test_publishes_only_on_change() {
        let manager = StatusManager::new();
        let seen = recorded(&manager);

        manager.update_busy_status(BusyStatus::Idle);
        manager.update_busy_status(BusyStatus::Busy);
        manager.update_busy_status(BusyStatus::Busy);

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].busy_status, BusyStatus::Busy);
    }

    #[test]
    fn test_any_unhealthy_component_makes_worker_unhealthy() {
        let manager = StatusManager::new();
        manager.update_health("capture", HealthStatus::Healthy, "");
        manager.update_health("browser", HealthStatus::Unhealthy, "hung");

        let status = manager.overall_status();
        assert_eq!(status.health.status, HealthStatus::Unhealthy);
        assert_eq!(status.health.details.get("browser").map(String::as_str), Some("hung"));
    }

    #[test]
    fn test_track_service() {
        let manager = Arc::new(StatusManager::new());
        let service = StatusAggregator::new("Web recording");
        manager.track_service(&service);

        service.publish_status(ComponentState::Running);
        assert_eq!(manager.overall_status().busy_status, BusyStatus::Busy);

        service.publish_status(ComponentState::Error(ErrorKind::SettingPresenceFields));
        let status = manager.overall_status();
        assert_eq!(status.busy_status, BusyStatus::Idle);
        // Session-scoped errors leave the worker healthy
        assert_eq!(status.health.status, HealthStatus::Healthy);
    }

    #[test]
    fn test_track_service_system_error() {
        let manager = Arc::new(StatusManager::new());
        let seen = recorded(&manager);
        let service = StatusAggregator::new("Web recording");
        manager.track_service(&service);

        service.publish_status(ComponentState::Error(ErrorKind::backend(
            ErrorScope::System,
            "browser crashed",
        )));

        let status = manager.overall_status();
        assert_eq!(status.health.status, HealthStatus::Unhealthy);
        assert_eq!(
            status.health.details.get("Web recording").map(String::as_str),
            Some("browser crashed")
        );
        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_statuses_reach_handlers_in_update_order() {
        let manager = Arc::new(StatusManager::new());

        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let entered_tx = Mutex::new(entered_tx);
        let release_rx = Mutex::new(release_rx);
        manager.add_status_handler(move |status| {
            if status.busy_status == BusyStatus::Busy {
                entered_tx.lock().send(()).unwrap();
                release_rx.lock().recv().unwrap();
            }
        });
        let seen = recorded(&manager);

        let busy = {
            let manager = Arc::clone(&manager);
            thread::spawn(move || manager.update_busy_status(BusyStatus::Busy))
        };
        entered_rx.recv().unwrap();

        let idle = {
            let manager = Arc::clone(&manager);
            thread::spawn(move || manager.update_busy_status(BusyStatus::Idle))
        };
        thread::sleep(Duration::from_millis(50));
        release_tx.send(()).unwrap();

        busy.join().unwrap();
        idle.join().unwrap();

        let seen: Vec<BusyStatus> = seen.lock().iter().map(|s| s.busy_status).collect();
        assert_eq!(seen, vec![BusyStatus::Busy, BusyStatus::Idle]);
        assert_eq!(manager.overall_status().busy_status, BusyStatus::Idle);
    }

    #[test]
    fn test_late_running_does_not_leave_worker_busy_after_error() {
        let manager = Arc::new(StatusManager::new());
        let service = StatusAggregator::new("Web recording");
        let component = Arc::new(StatusPublisher::<ComponentState>::new());
        service.register_sub_component("automation", &component);

        // Registered ahead of the manager, so it stalls Running delivery
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let entered_tx = Mutex::new(entered_tx);
        let release_rx = Mutex::new(release_rx);
        service.add_status_handler(move |state| {
            if *state == ComponentState::Running {
                entered_tx.lock().send(()).unwrap();
                release_rx.lock().recv().unwrap();
            }
        });
        manager.track_service(&service);

        let running = {
            let component = Arc::clone(&component);
            thread::spawn(move || component.publish(&ComponentState::Running))
        };
        entered_rx.recv().unwrap();

        let failed = {
            let service = service.clone();
            thread::spawn(move || {
                service.publish_status(ComponentState::Error(ErrorKind::SettingPresenceFields))
            })
        };
        thread::sleep(Duration::from_millis(50));
        release_tx.send(()).unwrap();

        running.join().unwrap();
        failed.join().unwrap();

        assert_eq!(
            service.state(),
            ComponentState::Error(ErrorKind::SettingPresenceFields)
        );
        assert_eq!(manager.overall_status().busy_status, BusyStatus::Idle);
    }
}
