// src/engine/orchestrator.rs

use std::sync::Arc;

use tracing::{debug, error, trace};

use crate::exec::TaskSupervisor;
use crate::watch::{ChangeEvent, ChangeSource};

/// Wires a [`ChangeSource`] to a set of [`TaskSupervisor`]s.
///
/// On each change event, every supervisor whose patterns match the changed
/// path gets a reload. No deduplication happens here; coalescing is each
/// supervisor's own debounce. Supervisors should be started before the
/// change source begins dispatching.
pub struct Orchestrator {
    supervisors: Vec<Arc<TaskSupervisor>>,
}

impl Orchestrator {
    pub fn new(supervisors: Vec<Arc<TaskSupervisor>>) -> Arc<Self> {
        Arc::new(Self { supervisors })
    }

    pub fn supervisors(&self) -> &[Arc<TaskSupervisor>] {
        &self.supervisors
    }

    /// Route one change event to every matching supervisor.
    pub fn dispatch(&self, event: &ChangeEvent) {
        for sup in &self.supervisors {
            let matched = sup.matches(&event.path);
            trace!(task = %sup.id(), path = %event.path, matched, "checking");

            if matched {
                debug!(task = %sup.id(), path = %event.path, "change matched; scheduling reload");
                if let Err(err) = sup.reload() {
                    error!(task = %sup.name(), error = %err, "failed to schedule reload");
                }
            }
        }
    }

    /// Register this orchestrator as a listener on the change source.
    pub fn attach(self: &Arc<Self>, source: &ChangeSource) {
        let orchestrator = Arc::clone(self);
        source.register_listener(move |event| orchestrator.dispatch(&event));
    }
}
