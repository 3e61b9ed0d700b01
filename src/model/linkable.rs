//! Linkable: an owner of one input and one output property group.

use serde::{Deserialize, Serialize};

use super::{GroupRole, Property, PropertyGroup, PropertyHandle};

/// Opaque linkable identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkableId(pub u64);

impl std::fmt::Display for LinkableId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A participant in the dependency graph.
///
/// `name` is the unique string id used by snapshots; `id` is the arena
/// handle used everywhere else.
#[derive(Debug, Clone)]
pub struct Linkable {
    id: LinkableId,
    name: String,
    type_name: String,
    changed: bool,
    ins: PropertyGroup,
    outs: PropertyGroup,
}

impl Linkable {
    pub fn new(id: LinkableId, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            type_name: type_name.into(),
            // new owners are due for their first update
            changed: true,
            ins: PropertyGroup::new(id, GroupRole::Ins),
            outs: PropertyGroup::new(id, GroupRole::Outs),
        }
    }

    pub fn id(&self) -> LinkableId { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn type_name(&self) -> &str { &self.type_name }
    pub fn changed(&self) -> bool { self.changed }
    pub fn ins(&self) -> &PropertyGroup { &self.ins }
    pub fn outs(&self) -> &PropertyGroup { &self.outs }

    pub(crate) fn set_changed(&mut self, changed: bool) {
        self.changed = changed;
    }

    pub fn group(&self, role: GroupRole) -> &PropertyGroup {
        match role {
            GroupRole::Ins => &self.ins,
            GroupRole::Outs => &self.outs,
        }
    }

    pub(crate) fn group_mut(&mut self, role: GroupRole) -> &mut PropertyGroup {
        match role {
            GroupRole::Ins => &mut self.ins,
            GroupRole::Outs => &mut self.outs,
        }
    }

    pub fn property(&self, handle: PropertyHandle) -> Option<&Property> {
        if handle.owner != self.id {
            return None;
        }
        self.group(handle.role).property(handle.slot)
    }

    pub(crate) fn property_mut(&mut self, handle: PropertyHandle) -> Option<&mut Property> {
        if handle.owner != self.id {
            return None;
        }
        self.group_mut(handle.role).property_mut(handle.slot)
    }

    /// Every property handle, inputs first, each group in insertion order.
    pub fn handles(&self) -> Vec<PropertyHandle> {
        let mut all = self.ins.handles();
        all.extend(self.outs.handles());
        all
    }

    pub fn has_links(&self) -> bool {
        self.ins.has_links() || self.outs.has_links()
    }
}
