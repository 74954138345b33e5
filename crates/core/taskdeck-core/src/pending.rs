//! Tracks which interactive controls have a request in flight.
//!
//! A control is disabled while its own request runs, so the same control can
//! never submit twice. Different controls are independent and may overlap.

use std::collections::HashSet;

use crate::model::TaskId;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Control {
    /// Login or register form.
    AuthForm,
    /// The "new task" form.
    CreateForm,
    /// Toggle/edit/delete controls of a single task.
    Task(TaskId),
    /// Initial or manual reload of the whole list.
    Reload,
}

#[derive(Debug, Clone, Default)]
pub struct PendingControls {
    in_flight: HashSet<Control>,
}

impl PendingControls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the control busy. Returns false if it already was.
    pub fn try_begin(&mut self, control: Control) -> bool {
        self.in_flight.insert(control)
    }

    pub fn finish(&mut self, control: &Control) {
        self.in_flight.remove(control);
    }

    pub fn is_pending(&self, control: &Control) -> bool {
        self.in_flight.contains(control)
    }

    pub fn is_task_pending(&self, id: &str) -> bool {
        self.in_flight.contains(&Control::Task(id.to_string()))
    }

    pub fn clear(&mut self) {
        self.in_flight.clear();
    }

    pub fn len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}
