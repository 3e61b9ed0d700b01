//! Property change notifications.
//!
//! Events are queued on the graph and handed out by `drain_events`; there
//! are no callbacks, so observers never run while the graph is mid-write.

use super::Graph;
use crate::model::PropertyHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyEventKind {
    /// The value was written (by `set_value`, a reset or a link push).
    Value,
    /// The option labels of an enum property were replaced.
    Options,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyEvent {
    pub property: PropertyHandle,
    pub kind: PropertyEventKind,
}

impl Graph {
    pub(crate) fn emit(&mut self, property: PropertyHandle, kind: PropertyEventKind) {
        if self.config.record_events {
            self.events.push(PropertyEvent { property, kind });
        }
    }

    /// Take all queued events, oldest first.
    pub fn drain_events(&mut self) -> Vec<PropertyEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_events(&self) -> &[PropertyEvent] {
        &self.events
    }
}
