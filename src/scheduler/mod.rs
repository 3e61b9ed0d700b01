//! # Scheduler
//!
//! One pulse runs three passes over the owners in sorted order:
//!
//! 1. `update` for every owner whose `changed` flag is set. Outputs written
//!    here propagate at once, so downstream owners later in the order are
//!    updated in the same pulse.
//! 2. `tick` for every component (continuous and animated sources).
//! 3. `tock` for every component (late consumers such as renderers).
//!
//! Input and output `changed` flags are cleared after an owner's update. Values
//! written in `tick` mark their consumers changed for the next pulse.

mod context;
mod pulse;

use std::any::Any;

use tracing::{debug, trace};

use crate::graph::Graph;
use crate::model::{GroupRole, LinkableId, Schema};
use crate::Result;

pub use context::{FromValue, NodeContext};
pub use pulse::{Pulse, PulseClock};

// ============================================================================
// Component contract
// ============================================================================

/// Properties a component declares when it is added to a graph.
#[derive(Debug, Clone, Default)]
pub struct PropertySet {
    pub ins: Vec<(String, Schema)>,
    pub outs: Vec<(String, Schema)>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, key: &str, schema: Schema) -> Self {
        self.ins.push((key.to_string(), schema));
        self
    }

    pub fn output(mut self, key: &str, schema: Schema) -> Self {
        self.outs.push((key.to_string(), schema));
        self
    }
}

/// Behavior attached to a linkable.
///
/// Each pass returns whether the component produced new output.
pub trait Component: Any {
    fn type_name(&self) -> &str;

    fn properties(&self) -> PropertySet;

    /// Recompute from inputs. Only called when an input changed.
    fn update(&mut self, _ctx: &mut NodeContext<'_>) -> Result<bool> {
        Ok(false)
    }

    fn tick(&mut self, _ctx: &mut NodeContext<'_>) -> Result<bool> {
        Ok(false)
    }

    fn tock(&mut self, _ctx: &mut NodeContext<'_>) -> Result<bool> {
        Ok(false)
    }

    /// Called once when the owner is removed from the graph.
    fn dispose(&mut self) {}
}

/// Counts from one pulse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PulseStats {
    pub updated: usize,
    pub ticked: usize,
    pub tocked: usize,
    /// Passes that reported new output.
    pub changed: usize,
}

#[derive(Clone, Copy)]
enum Pass {
    Update,
    Tick,
    Tock,
}

// ============================================================================
// Pulse
// ============================================================================

impl Graph {
    pub fn pulse(&mut self, pulse: &Pulse) -> Result<PulseStats> {
        let order = self.sorted_order().to_vec();
        let mut stats = PulseStats::default();

        for &id in &order {
            let due = self.linkable(id).is_some_and(|l| l.changed());
            if !due {
                continue;
            }
            if self.run_component(id, pulse, Pass::Update)? {
                stats.changed += 1;
            }
            let node = self.node_mut(id)?;
            node.linkable.group_mut(GroupRole::Ins).clear_changed();
            node.linkable.group_mut(GroupRole::Outs).clear_changed();
            node.linkable.set_changed(false);
            stats.updated += 1;
        }

        for &id in &order {
            if self.component(id).is_none() {
                continue;
            }
            if self.run_component(id, pulse, Pass::Tick)? {
                stats.changed += 1;
            }
            stats.ticked += 1;
        }

        for &id in &order {
            if self.component(id).is_none() {
                continue;
            }
            if self.run_component(id, pulse, Pass::Tock)? {
                stats.changed += 1;
            }
            stats.tocked += 1;
        }

        debug!(
            frame = pulse.frame,
            updated = stats.updated,
            ticked = stats.ticked,
            "Pulse complete"
        );
        Ok(stats)
    }

    /// Run one pass of an owner's component. The component is taken out of
    /// its node for the call and put back even if it fails.
    fn run_component(&mut self, id: LinkableId, pulse: &Pulse, pass: Pass) -> Result<bool> {
        let Some(mut component) = self.node_mut(id)?.component.take() else {
            return Ok(false);
        };

        let result = {
            let mut ctx = NodeContext::new(self, id, pulse);
            match pass {
                Pass::Update => component.update(&mut ctx),
                Pass::Tick => component.tick(&mut ctx),
                Pass::Tock => component.tock(&mut ctx),
            }
        };

        trace!(linkable = %id, type_name = component.type_name(), "Component ran");
        self.node_mut(id)?.component = Some(component);
        result
    }
}
