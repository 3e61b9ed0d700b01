//! What a component sees while it runs.

use super::Pulse;
use crate::graph::{Graph, PropagationStats};
use crate::model::*;
use crate::{Error, Result};

/// Convert a property value into a concrete type.
pub trait FromValue: Sized {
    fn from_value(val: &Value) -> Result<Self>;
}

impl FromValue for f64 {
    fn from_value(val: &Value) -> Result<Self> {
        val.as_number().ok_or_else(|| Error::TypeError {
            expected: "number".into(),
            got: val.type_name().into(),
        })
    }
}

impl FromValue for bool {
    fn from_value(val: &Value) -> Result<Self> {
        val.as_bool().ok_or_else(|| Error::TypeError {
            expected: "boolean".into(),
            got: val.type_name().into(),
        })
    }
}

impl FromValue for String {
    fn from_value(val: &Value) -> Result<Self> {
        match val {
            Value::String(s) => Ok(s.clone()),
            _ => Err(Error::TypeError {
                expected: "string".into(),
                got: val.type_name().into(),
            }),
        }
    }
}

impl FromValue for Vec<f64> {
    fn from_value(val: &Value) -> Result<Self> {
        val.as_numbers().ok_or_else(|| Error::TypeError {
            expected: "number array".into(),
            got: val.type_name().into(),
        })
    }
}

/// Handed to `Component::update`/`tick`/`tock` for the owner being run.
///
/// Reads resolve input keys, writes resolve output keys; a write
/// propagates immediately like any other `set_value`.
pub struct NodeContext<'a> {
    graph: &'a mut Graph,
    owner: LinkableId,
    pulse: &'a Pulse,
}

impl<'a> NodeContext<'a> {
    pub(crate) fn new(graph: &'a mut Graph, owner: LinkableId, pulse: &'a Pulse) -> Self {
        Self { graph, owner, pulse }
    }

    pub fn owner(&self) -> LinkableId {
        self.owner
    }

    pub fn pulse(&self) -> &Pulse {
        self.pulse
    }

    pub fn graph(&self) -> &Graph {
        &*self.graph
    }

    pub fn linkable(&self) -> Result<&Linkable> {
        self.graph
            .linkable(self.owner)
            .ok_or_else(|| Error::NotFound(format!("Linkable {}", self.owner)))
    }

    pub fn ins(&self) -> Result<&PropertyGroup> {
        Ok(self.linkable()?.ins())
    }

    pub fn outs(&self) -> Result<&PropertyGroup> {
        Ok(self.linkable()?.outs())
    }

    /// Current value of an input.
    pub fn value(&self, key: &str) -> Result<&Value> {
        let handle = self.graph.input(self.owner, key)?;
        self.graph.value(handle)
    }

    /// Validated input value converted to `T`.
    pub fn get<T: FromValue>(&self, key: &str) -> Result<T> {
        let handle = self.graph.input(self.owner, key)?;
        T::from_value(&self.graph.validated_value(handle)?)
    }

    pub fn number(&self, key: &str) -> Result<f64> {
        self.get(key)
    }

    pub fn boolean(&self, key: &str) -> Result<bool> {
        self.get(key)
    }

    /// Whether an input changed since the owner's last update.
    pub fn changed(&self, key: &str) -> bool {
        self.graph
            .input(self.owner, key)
            .and_then(|h| self.graph.property(h))
            .is_ok_and(Property::changed)
    }

    pub fn output(&self, key: &str) -> Result<&Value> {
        let handle = self.graph.output(self.owner, key)?;
        self.graph.value(handle)
    }

    /// Write an output and push it downstream.
    pub fn set_output(&mut self, key: &str, value: impl Into<Value>) -> Result<PropagationStats> {
        let handle = self.graph.output(self.owner, key)?;
        self.graph.set_value(handle, value)
    }

    /// Write any property of this owner by handle.
    pub fn set(&mut self, handle: PropertyHandle, value: Value) -> Result<PropagationStats> {
        if handle.owner != self.owner {
            return Err(Error::ComponentError(format!(
                "{} may not write {handle} owned by {}",
                self.owner, handle.owner
            )));
        }
        self.graph.set_value(handle, value)
    }
}
