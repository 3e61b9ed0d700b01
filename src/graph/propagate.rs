//! Value writes and push propagation.
//!
//! A write to a property pushes its value through every out-link, and each
//! destination continues through its own out-links, depth first. The walk
//! uses an explicit stack; a link that is re-entered while it is still on
//! the current path closes a cycle and is not pushed again.

use hashbrown::HashSet;
use tracing::{trace, warn};

use super::{Graph, PropertyEventKind};
use crate::config::CyclePolicy;
use crate::model::*;
use crate::{Error, Result};

/// What a single write did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationStats {
    pub links_pushed: usize,
    pub properties_written: usize,
    /// Links that were skipped because they closed a cycle.
    pub cycles: Vec<LinkId>,
}

impl PropagationStats {
    pub fn merge(&mut self, other: PropagationStats) {
        self.links_pushed += other.links_pushed;
        self.properties_written += other.properties_written;
        self.cycles.extend(other.cycles);
    }

    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }
}

enum Step {
    Enter(LinkId),
    Exit(LinkId),
}

impl Graph {
    // ========================================================================
    // Writes
    // ========================================================================

    /// Assign a value and propagate it.
    pub fn set_value(&mut self, handle: PropertyHandle, value: impl Into<Value>) -> Result<PropagationStats> {
        self.set_value_with(handle, value.into(), SetFlags::NONE)
    }

    /// Assign a value with explicit change/event flags and propagate it.
    pub fn set_value_with(&mut self, handle: PropertyHandle, value: Value, flags: SetFlags) -> Result<PropagationStats> {
        let schema = self.property(handle)?.schema();
        if !schema.accepts(&value) {
            return Err(Error::TypeError {
                expected: schema.shape_name(),
                got: value.type_name().into(),
            });
        }

        self.property_mut(handle)?.assign(value);
        self.commit(handle, flags)?;

        let mut stats = self.propagate_from(handle)?;
        stats.properties_written += 1;
        Ok(stats)
    }

    /// Fire an event property.
    pub fn fire(&mut self, handle: PropertyHandle) -> Result<PropagationStats> {
        let property = self.property(handle)?;
        if !property.is_event() {
            return Err(Error::TypeError {
                expected: "event".into(),
                got: property.schema().shape_name(),
            });
        }
        let count = property.value().as_number().unwrap_or(0.0);
        self.set_value(handle, Value::Number(count + 1.0))
    }

    /// Restore the schema preset and propagate it.
    pub fn reset(&mut self, handle: PropertyHandle) -> Result<PropagationStats> {
        let value = self.property(handle)?.reset_value();
        self.set_value(handle, value)
    }

    pub fn validated_value(&self, handle: PropertyHandle) -> Result<Value> {
        Ok(self.property(handle)?.validated_value())
    }

    /// Replace the option labels of an enum property.
    pub fn set_options(&mut self, handle: PropertyHandle, options: Vec<String>) -> Result<()> {
        let property = self.property(handle)?;
        if property.kind() != ValueKind::Enum || property.schema().enum_type.is_some() {
            return Err(Error::TypeError {
                expected: "option list".into(),
                got: property.schema().shape_name(),
            });
        }
        self.property_mut(handle)?.set_options(options);
        self.emit(handle, PropertyEventKind::Options);
        Ok(())
    }

    /// Resize a multi property; new channels hold the preset.
    pub fn set_channel_count(&mut self, handle: PropertyHandle, count: usize) -> Result<PropagationStats> {
        self.property_mut(handle)?.resize_channels(count)?;
        self.commit(handle, SetFlags::NONE)?;

        let mut stats = self.propagate_from(handle)?;
        stats.properties_written += 1;
        Ok(stats)
    }

    /// Raise change flags and queue the value event for a written property.
    fn commit(&mut self, handle: PropertyHandle, flags: SetFlags) -> Result<()> {
        if !flags.silent {
            let node = self.node_mut(handle.owner)?;
            if let Some(property) = node.linkable.property_mut(handle) {
                property.mark_changed();
            }
            if handle.role == GroupRole::Ins {
                node.linkable.set_changed(true);
            }
        }
        if !flags.no_event {
            self.emit(handle, PropertyEventKind::Value);
        }
        Ok(())
    }

    // ========================================================================
    // Propagation
    // ========================================================================

    /// Push the current value of `handle` through all of its out-links.
    pub fn propagate_from(&mut self, handle: PropertyHandle) -> Result<PropagationStats> {
        let roots = self.property(handle)?.out_links().to_vec();
        self.run(&roots)
    }

    pub(crate) fn propagate_link(&mut self, link: LinkId) -> Result<PropagationStats> {
        self.run(&[link])
    }

    fn run(&mut self, roots: &[LinkId]) -> Result<PropagationStats> {
        let limit = self.config().max_propagation_steps;
        let mut stats = PropagationStats::default();
        let mut active: HashSet<LinkId> = HashSet::new();
        let mut stack: Vec<Step> = roots.iter().rev().map(|id| Step::Enter(*id)).collect();

        while let Some(step) = stack.pop() {
            let id = match step {
                Step::Exit(id) => {
                    active.remove(&id);
                    continue;
                }
                Step::Enter(id) => id,
            };

            if active.contains(&id) {
                self.on_cycle(id)?;
                stats.cycles.push(id);
                continue;
            }
            if stats.links_pushed >= limit {
                return Err(Error::PropagationLimit(limit));
            }

            let destination = self.push(id)?;
            stats.links_pushed += 1;
            stats.properties_written += 1;

            active.insert(id);
            stack.push(Step::Exit(id));
            let next = self.property(destination)?.out_links();
            stack.extend(next.iter().rev().map(|l| Step::Enter(*l)));
        }

        Ok(stats)
    }

    fn on_cycle(&self, link: LinkId) -> Result<()> {
        match self.config().cycle_policy {
            CyclePolicy::Ignore => Ok(()),
            CyclePolicy::Warn => {
                warn!(link = %link, "Propagation cycle cut");
                Ok(())
            }
            CyclePolicy::Error => Err(Error::CycleDetected { link }),
        }
    }

    /// Copy the source value of one link into its destination.
    fn push(&mut self, id: LinkId) -> Result<PropertyHandle> {
        let link = self
            .link(id)
            .ok_or_else(|| Error::LinkCorruption(format!("link {id} listed but not registered")))?;
        let (source, destination, plan) = (link.source(), link.destination(), *link.plan());

        let input = self.property(source)?.value().clone();
        self.property_mut(destination)?.receive(&plan, &input);
        self.commit(destination, SetFlags::NONE)?;

        trace!(link = %id, destination = %destination, "Link pushed");
        Ok(destination)
    }
}
