//! Property: a single typed, reactive value cell.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::{LinkId, LinkableId, Schema, Value, ValueKind};
use crate::convert::CopyPlan;
use crate::{Error, Result};

/// Which of its owner's two groups a property lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupRole {
    Ins,
    Outs,
}

impl std::fmt::Display for GroupRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupRole::Ins => write!(f, "ins"),
            GroupRole::Outs => write!(f, "outs"),
        }
    }
}

/// Non-owning address of a property: owner, group and arena slot.
///
/// Slots are never reused within a group, so a handle to a removed
/// property resolves to nothing rather than to a different property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyHandle {
    pub owner: LinkableId,
    pub role: GroupRole,
    pub slot: u32,
}

impl std::fmt::Display for PropertyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}[{}]", self.owner, self.role, self.slot)
    }
}

/// Flags for `Graph::set_value_with`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetFlags {
    /// Don't raise the `changed` flags (property and owner).
    pub silent: bool,
    /// Don't queue a value-changed event.
    pub no_event: bool,
}

impl SetFlags {
    pub const NONE: SetFlags = SetFlags { silent: false, no_event: false };
    pub const SILENT: SetFlags = SetFlags { silent: true, no_event: false };
    pub const NO_EVENT: SetFlags = SetFlags { silent: false, no_event: true };
}

/// A property: current value, change flag, schema and link lists.
///
/// Properties are owned by a `PropertyGroup`; everything else refers to
/// them through `PropertyHandle`s. All mutation that can touch another
/// property (links, propagation) goes through `Graph`.
#[derive(Debug, Clone)]
pub struct Property {
    handle: PropertyHandle,
    key: String,
    path: String,
    schema: Schema,
    value: Value,
    changed: bool,
    custom: bool,
    in_links: SmallVec<[LinkId; 2]>,
    out_links: SmallVec<[LinkId; 2]>,
}

impl Property {
    pub(crate) fn new(handle: PropertyHandle, key: String, path: String, schema: Schema, custom: bool) -> Self {
        let value = schema.default_value();
        Self {
            handle,
            key,
            path,
            schema,
            value,
            changed: false,
            custom,
            in_links: SmallVec::new(),
            out_links: SmallVec::new(),
        }
    }

    pub fn handle(&self) -> PropertyHandle { self.handle }
    pub fn key(&self) -> &str { &self.key }
    pub fn path(&self) -> &str { &self.path }
    pub fn schema(&self) -> &Schema { &self.schema }
    pub fn value(&self) -> &Value { &self.value }
    pub fn changed(&self) -> bool { self.changed }
    pub fn is_custom(&self) -> bool { self.custom }
    pub fn kind(&self) -> ValueKind { self.schema.kind }
    pub fn element_count(&self) -> usize { self.schema.element_count() }
    pub fn is_array(&self) -> bool { self.schema.is_array() }
    pub fn is_multi(&self) -> bool { self.schema.is_multi() }
    pub fn is_event(&self) -> bool { self.schema.is_event() }
    pub fn is_input(&self) -> bool { self.handle.role == GroupRole::Ins }
    pub fn is_output(&self) -> bool { self.handle.role == GroupRole::Outs }
    pub fn in_links(&self) -> &[LinkId] { &self.in_links }
    pub fn out_links(&self) -> &[LinkId] { &self.out_links }

    pub fn has_links(&self) -> bool {
        !self.in_links.is_empty() || !self.out_links.is_empty()
    }

    /// Number of channels; 1 for non-multi properties.
    pub fn channel_count(&self) -> usize {
        match &self.value {
            Value::Multi(channels) => channels.len(),
            _ => 1,
        }
    }

    /// True if the value equals a fresh one; for multi properties that is a
    /// single channel holding the preset.
    pub fn is_default(&self) -> bool {
        self.value == self.schema.default_value()
    }

    /// Value with numeric bounds and enum/option ranges enforced.
    pub fn validated_value(&self) -> Value {
        self.schema.validate(&self.value)
    }

    /// Label for the current enum/option index, if any.
    pub fn option_text(&self) -> Option<&str> {
        let index = self.validated_value().as_number()?;
        self.schema.option_text(index as usize)
    }

    // ------------------------------------------------------------------------
    // Crate-internal mutation
    // ------------------------------------------------------------------------

    pub(crate) fn assign(&mut self, value: Value) {
        self.value = value;
    }

    /// Apply an incoming link push.
    pub(crate) fn receive(&mut self, plan: &CopyPlan, input: &Value) {
        plan.apply(input, &mut self.value, &self.schema.preset);
    }

    /// Value to assign on `reset()`.
    pub(crate) fn reset_value(&self) -> Value {
        self.schema.default_value()
    }

    pub(crate) fn resize_channels(&mut self, count: usize) -> Result<()> {
        let Value::Multi(channels) = &mut self.value else {
            return Err(Error::TypeError {
                expected: "multi property".into(),
                got: self.schema.shape_name(),
            });
        };
        channels.resize(count, self.schema.preset.clone());
        Ok(())
    }

    pub(crate) fn set_options(&mut self, options: Vec<String>) {
        self.schema.options = Some(options);
    }

    pub(crate) fn mark_changed(&mut self) {
        self.changed = true;
    }

    pub(crate) fn clear_changed(&mut self) {
        self.changed = false;
    }

    pub(crate) fn add_in_link(&mut self, link: LinkId) {
        self.in_links.push(link);
    }

    pub(crate) fn add_out_link(&mut self, link: LinkId) {
        self.out_links.push(link);
    }

    pub(crate) fn remove_in_link(&mut self, link: LinkId) -> Result<()> {
        let pos = self.in_links.iter().position(|l| *l == link).ok_or_else(|| {
            Error::LinkCorruption(format!("link {link} missing from in-links of {}", self.handle))
        })?;
        self.in_links.remove(pos);
        Ok(())
    }

    pub(crate) fn remove_out_link(&mut self, link: LinkId) -> Result<()> {
        let pos = self.out_links.iter().position(|l| *l == link).ok_or_else(|| {
            Error::LinkCorruption(format!("link {link} missing from out-links of {}", self.handle))
        })?;
        self.out_links.remove(pos);
        Ok(())
    }
}
