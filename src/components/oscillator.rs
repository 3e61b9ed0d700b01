//! Sine oscillator, advanced by the pulse delta on every tick.

use std::f64::consts::TAU;

use crate::model::Schema;
use crate::scheduler::{Component, NodeContext, PropertySet};
use crate::Result;

/// `value = offset + amplitude * sin(2π * phase)`, with the phase advancing
/// by `frequency * delta` cycles per tick while `enabled`.
#[derive(Debug, Default)]
pub struct Oscillator {
    phase: f64,
}

impl Oscillator {
    pub const TYPE: &'static str = "Oscillator";

    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase in cycles, in `[0, 1)`.
    pub fn phase(&self) -> f64 {
        self.phase
    }
}

impl Component for Oscillator {
    fn type_name(&self) -> &str {
        Self::TYPE
    }

    fn properties(&self) -> PropertySet {
        PropertySet::new()
            .input("frequency", Schema::number(1.0).with_min(0.0).with_label("Frequency"))
            .input("amplitude", Schema::number(1.0).with_label("Amplitude"))
            .input("offset", Schema::number(0.0).with_label("Offset"))
            .input("enabled", Schema::boolean(true).with_label("Enabled"))
            .output("value", Schema::number(0.0).with_label("Value"))
    }

    fn tick(&mut self, ctx: &mut NodeContext<'_>) -> Result<bool> {
        if !ctx.boolean("enabled")? {
            return Ok(false);
        }
        let frequency = ctx.number("frequency")?;
        let amplitude = ctx.number("amplitude")?;
        let offset = ctx.number("offset")?;

        self.phase = (self.phase + frequency * ctx.pulse().delta).rem_euclid(1.0);
        let value = offset + amplitude * (TAU * self.phase).sin();
        ctx.set_output("value", value)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::model::Value;
    use crate::scheduler::PulseClock;
    use chrono::{DateTime, Duration, Utc};

    fn value(g: &Graph, id: crate::model::LinkableId) -> f64 {
        g.value(g.output(id, "value").unwrap()).unwrap().as_number().unwrap()
    }

    #[test]
    fn test_quarter_cycle_peaks() {
        let mut g = Graph::new();
        let id = g.add_component("osc", Box::new(Oscillator::new())).unwrap();
        g.set_value(g.input(id, "amplitude").unwrap(), 2.0).unwrap();
        g.set_value(g.input(id, "offset").unwrap(), 1.0).unwrap();

        let mut clock = PulseClock::starting_at(DateTime::<Utc>::UNIX_EPOCH);
        g.pulse(&clock.advance_by(Duration::zero())).unwrap();
        assert!((value(&g, id) - 1.0).abs() < 1e-9);

        g.pulse(&clock.advance_by(Duration::milliseconds(250))).unwrap();
        assert!((value(&g, id) - 3.0).abs() < 1e-9);
        assert!((g.component_as::<Oscillator>(id).unwrap().phase() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_disabled_holds_value() {
        let mut g = Graph::new();
        let id = g.add_component("osc", Box::new(Oscillator::new())).unwrap();
        g.set_value(g.input(id, "enabled").unwrap(), false).unwrap();
        let mut clock = PulseClock::starting_at(DateTime::<Utc>::UNIX_EPOCH);
        clock.advance_by(Duration::zero());
        let stats = g.pulse(&clock.advance_by(Duration::milliseconds(100))).unwrap();
        assert_eq!(stats.changed, 0);
        assert_eq!(g.value(g.output(id, "value").unwrap()).unwrap(), &Value::Number(0.0));
    }
}
