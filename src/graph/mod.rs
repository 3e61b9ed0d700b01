//! # Graph
//!
//! The arena that owns every linkable (with its component), every property
//! (through the linkables' groups) and every link. It is the only place
//! where links are created or destroyed, so a link is always added to, or
//! removed from, both of its endpoints together.
//!
//! ## Ownership
//!
//! ```text
//! Graph ─┬─ Node ─┬─ Linkable ─┬─ ins:  PropertyGroup ── Property*
//!        │        │            └─ outs: PropertyGroup ── Property*
//!        │        └─ Box<dyn Component>
//!        └─ links: LinkId → PropertyLink (source/destination are handles)
//! ```
//!
//! Properties list the ids of their links; links name their endpoints by
//! `PropertyHandle`. Neither owns the other.

pub mod events;
pub mod json;
pub mod propagate;
pub mod sorter;

use std::any::Any;

use hashbrown::HashMap;
use tracing::debug;

use crate::config::GraphConfig;
use crate::convert::CopyPlan;
use crate::model::*;
use crate::scheduler::{Component, PropertySet};
use crate::{Error, Result};

pub use events::{PropertyEvent, PropertyEventKind};
pub use propagate::PropagationStats;
pub use sorter::{LinkableSorter, SortOutcome};

// ============================================================================
// Graph
// ============================================================================

pub(crate) struct Node {
    pub(crate) linkable: Linkable,
    pub(crate) component: Option<Box<dyn Component>>,
}

/// Owner of all linkables and links.
pub struct Graph {
    config: GraphConfig,
    nodes: HashMap<LinkableId, Node>,
    /// Creation order; the sorter walks roots in this order.
    order: Vec<LinkableId>,
    names: HashMap<String, LinkableId>,
    links: HashMap<LinkId, PropertyLink>,
    next_linkable_id: u64,
    next_link_id: u64,
    sort_requested: bool,
    sorted: Vec<LinkableId>,
    back_edges: Vec<(LinkableId, LinkableId)>,
    events: Vec<PropertyEvent>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            config,
            nodes: HashMap::new(),
            order: Vec::new(),
            names: HashMap::new(),
            links: HashMap::new(),
            next_linkable_id: 1,
            next_link_id: 1,
            sort_requested: false,
            sorted: Vec::new(),
            back_edges: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    // ========================================================================
    // Linkables
    // ========================================================================

    /// Add a bare owner with empty groups. `name` must be unique.
    pub fn add_linkable(&mut self, name: &str, type_name: &str) -> Result<LinkableId> {
        if self.names.contains_key(name) {
            return Err(Error::DuplicateId(name.to_string()));
        }
        let id = LinkableId(self.next_linkable_id);
        self.next_linkable_id += 1;

        self.nodes.insert(id, Node {
            linkable: Linkable::new(id, name, type_name),
            component: None,
        });
        self.order.push(id);
        self.names.insert(name.to_string(), id);
        self.request_sort();

        debug!(linkable = %id, name, type_name, "Linkable added");
        Ok(id)
    }

    /// Add an owner driven by `component`; its groups are created from
    /// `Component::properties()`.
    pub fn add_component(&mut self, name: &str, component: Box<dyn Component>) -> Result<LinkableId> {
        let set = component.properties();
        let id = self.add_linkable(name, component.type_name())?;

        let declared = declare(&mut self.node_mut(id)?.linkable, set);
        if let Err(e) = declared {
            self.remove_linkable(id)?;
            return Err(e);
        }
        self.node_mut(id)?.component = Some(component);
        Ok(id)
    }

    /// Dispose an owner: unlink every property, dispose the component and
    /// drop the owner with its groups.
    pub fn remove_linkable(&mut self, id: LinkableId) -> Result<()> {
        let handles = self.node(id)?.linkable.handles();
        for handle in handles {
            self.unlink_property(handle)?;
        }

        let mut node = self
            .nodes
            .remove(&id)
            .ok_or_else(|| Error::NotFound(format!("Linkable {id}")))?;
        if let Some(component) = node.component.as_mut() {
            component.dispose();
        }
        self.order.retain(|l| *l != id);
        self.names.remove(node.linkable.name());
        self.sorted.retain(|l| *l != id);
        self.request_sort();

        debug!(linkable = %id, name = node.linkable.name(), "Linkable removed");
        Ok(())
    }

    pub fn linkable(&self, id: LinkableId) -> Option<&Linkable> {
        self.nodes.get(&id).map(|n| &n.linkable)
    }

    pub fn linkable_by_name(&self, name: &str) -> Option<&Linkable> {
        self.names.get(name).and_then(|id| self.linkable(*id))
    }

    /// Linkables in creation order.
    pub fn linkables(&self) -> impl Iterator<Item = &Linkable> {
        self.order.iter().filter_map(|id| self.linkable(*id))
    }

    pub fn linkable_ids(&self) -> &[LinkableId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Explicit `name → id` map, as consumed by deserialization.
    pub fn id_map(&self) -> HashMap<String, LinkableId> {
        self.names.clone()
    }

    pub fn component(&self, id: LinkableId) -> Option<&dyn Component> {
        self.nodes.get(&id).and_then(|n| n.component.as_deref())
    }

    /// Concrete component of an owner, if it has one of type `T`.
    pub fn component_as<T: Component>(&self, id: LinkableId) -> Option<&T> {
        let component: &dyn Any = self.component(id)?;
        component.downcast_ref::<T>()
    }

    pub(crate) fn node(&self, id: LinkableId) -> Result<&Node> {
        self.nodes.get(&id).ok_or_else(|| Error::NotFound(format!("Linkable {id}")))
    }

    pub(crate) fn node_mut(&mut self, id: LinkableId) -> Result<&mut Node> {
        self.nodes.get_mut(&id).ok_or_else(|| Error::NotFound(format!("Linkable {id}")))
    }

    // ========================================================================
    // Properties
    // ========================================================================

    pub fn create_property(&mut self, owner: LinkableId, role: GroupRole, key: &str, schema: Schema) -> Result<PropertyHandle> {
        self.node_mut(owner)?.linkable.group_mut(role).create_property(key, schema)
    }

    /// Add a dynamic property at runtime (e.g. graph boundary ports).
    pub fn create_custom_property(
        &mut self,
        owner: LinkableId,
        role: GroupRole,
        path: &str,
        schema: Schema,
        key: Option<&str>,
    ) -> Result<PropertyHandle> {
        let handle = self
            .node_mut(owner)?
            .linkable
            .group_mut(role)
            .create_custom_property(path, schema, key)?;
        debug!(property = %handle, path, "Custom property added");
        Ok(handle)
    }

    /// Remove a property from its group. Fails while it has links.
    pub fn remove_property(&mut self, handle: PropertyHandle) -> Result<()> {
        let key = self.property(handle)?.key().to_string();
        self.node_mut(handle.owner)?
            .linkable
            .group_mut(handle.role)
            .remove_property(&key)?;
        Ok(())
    }

    pub fn find(&self, owner: LinkableId, role: GroupRole, key: &str) -> Result<PropertyHandle> {
        self.node(owner)?
            .linkable
            .group(role)
            .handle(key)
            .ok_or_else(|| Error::NotFound(format!("Property {owner}.{role}.{key}")))
    }

    pub fn input(&self, owner: LinkableId, key: &str) -> Result<PropertyHandle> {
        self.find(owner, GroupRole::Ins, key)
    }

    pub fn output(&self, owner: LinkableId, key: &str) -> Result<PropertyHandle> {
        self.find(owner, GroupRole::Outs, key)
    }

    pub fn property(&self, handle: PropertyHandle) -> Result<&Property> {
        self.node(handle.owner)?
            .linkable
            .property(handle)
            .ok_or_else(|| Error::NotFound(format!("Property {handle}")))
    }

    pub(crate) fn property_mut(&mut self, handle: PropertyHandle) -> Result<&mut Property> {
        self.node_mut(handle.owner)?
            .linkable
            .property_mut(handle)
            .ok_or_else(|| Error::NotFound(format!("Property {handle}")))
    }

    pub fn value(&self, handle: PropertyHandle) -> Result<&Value> {
        Ok(self.property(handle)?.value())
    }

    // ========================================================================
    // Links
    // ========================================================================

    /// Link compatibility check. `Ok(())` iff `destination` may be linked
    /// from `source` with the given element indices.
    pub fn check_link(
        &self,
        destination: PropertyHandle,
        source: PropertyHandle,
        source_index: Option<usize>,
        destination_index: Option<usize>,
    ) -> Result<()> {
        let src = self.property(source)?;
        let dst = self.property(destination)?;

        if !dst.is_input() {
            return Err(Error::LinkError(format!("{destination} is an output and cannot be linked to")));
        }
        if src.schema().is_static() || dst.schema().is_static() {
            return Err(Error::LinkError("static properties cannot be linked".into()));
        }
        if source_index.is_some() && !src.is_array() {
            return Err(Error::LinkError(format!("{source} is not an array and cannot be indexed")));
        }
        if destination_index.is_some() && !dst.is_array() {
            return Err(Error::LinkError(format!("{destination} is not an array and cannot be indexed")));
        }

        let src_whole = src.is_array() && source_index.is_none();
        let dst_whole = dst.is_array() && destination_index.is_none();
        if src_whole != dst_whole {
            return Err(Error::LinkError("whole arrays only link to whole arrays".into()));
        }
        if src_whole && src.element_count() != dst.element_count() {
            return Err(Error::LinkError(format!(
                "array sizes differ: {} vs {}",
                src.element_count(),
                dst.element_count()
            )));
        }

        if src.kind() == ValueKind::Object && dst.kind() == ValueKind::Object {
            let accepted = match (&dst.schema().object_type, &src.schema().object_type) {
                (None, _) => true,
                (Some(_), None) => false,
                (Some(expected), Some(given)) => expected.accepts(given),
            };
            if !accepted {
                return Err(Error::LinkError(format!("{destination} does not accept the object type of {source}")));
            }
        }
        // index ranges and kind conversion
        CopyPlan::for_endpoints(src.schema(), dst.schema(), source_index, destination_index)?;

        if self.find_link(destination, source, source_index, destination_index).is_some() {
            return Err(Error::LinkError(format!("{source} is already linked to {destination}")));
        }
        Ok(())
    }

    pub fn can_link_from(
        &self,
        destination: PropertyHandle,
        source: PropertyHandle,
        source_index: Option<usize>,
        destination_index: Option<usize>,
    ) -> bool {
        self.check_link(destination, source, source_index, destination_index).is_ok()
    }

    pub fn can_link_to(
        &self,
        source: PropertyHandle,
        destination: PropertyHandle,
        source_index: Option<usize>,
        destination_index: Option<usize>,
    ) -> bool {
        self.can_link_from(destination, source, source_index, destination_index)
    }

    /// Link `destination` from `source` and push the current source value
    /// through the new link.
    pub fn link_from(
        &mut self,
        destination: PropertyHandle,
        source: PropertyHandle,
        source_index: Option<usize>,
        destination_index: Option<usize>,
    ) -> Result<LinkId> {
        self.check_link(destination, source, source_index, destination_index)?;

        let id = LinkId(self.next_link_id);
        let link = PropertyLink::new(
            id,
            self.property(source)?,
            self.property(destination)?,
            source_index,
            destination_index,
        )?;
        self.next_link_id += 1;

        // both endpoints resolved above, so neither of these can fail halfway
        self.property_mut(source)?.add_out_link(id);
        self.property_mut(destination)?.add_in_link(id);
        self.links.insert(id, link);
        self.request_sort();

        debug!(
            link = %id,
            source = %source,
            destination = %destination,
            ?source_index,
            ?destination_index,
            "Link created"
        );

        self.propagate_link(id)?;
        Ok(id)
    }

    pub fn link_to(
        &mut self,
        source: PropertyHandle,
        destination: PropertyHandle,
        source_index: Option<usize>,
        destination_index: Option<usize>,
    ) -> Result<LinkId> {
        self.link_from(destination, source, source_index, destination_index)
    }

    /// Remove the link from `source` (with the same indices) into `destination`.
    pub fn unlink_from(
        &mut self,
        destination: PropertyHandle,
        source: PropertyHandle,
        source_index: Option<usize>,
        destination_index: Option<usize>,
    ) -> Result<()> {
        let id = self
            .find_link(destination, source, source_index, destination_index)
            .ok_or_else(|| Error::LinkError(format!("no link from {source} to {destination}")))?;
        self.remove_link(id)
    }

    /// Id of the link from `source` into `destination` with these indices.
    pub fn find_link(
        &self,
        destination: PropertyHandle,
        source: PropertyHandle,
        source_index: Option<usize>,
        destination_index: Option<usize>,
    ) -> Option<LinkId> {
        self.property(destination)
            .ok()?
            .in_links()
            .iter()
            .copied()
            .find(|id| {
                self.links
                    .get(id)
                    .is_some_and(|link| link.matches(source, source_index, destination_index))
            })
    }

    pub fn unlink_to(
        &mut self,
        source: PropertyHandle,
        destination: PropertyHandle,
        source_index: Option<usize>,
        destination_index: Option<usize>,
    ) -> Result<()> {
        self.unlink_from(destination, source, source_index, destination_index)
    }

    /// Remove a link from both endpoints, or from neither.
    pub fn remove_link(&mut self, id: LinkId) -> Result<()> {
        let link = self
            .links
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("Link {id}")))?;
        let (source, destination) = (link.source(), link.destination());

        let in_source = self.property(source)?.out_links().contains(&id);
        let in_destination = self.property(destination)?.in_links().contains(&id);
        if !in_source || !in_destination {
            return Err(Error::LinkCorruption(format!(
                "link {id} not registered on both {source} and {destination}"
            )));
        }

        self.property_mut(source)?.remove_out_link(id)?;
        self.property_mut(destination)?.remove_in_link(id)?;
        self.links.remove(&id);
        self.request_sort();

        debug!(link = %id, source = %source, destination = %destination, "Link removed");
        Ok(())
    }

    /// Remove every in- and out-link of a property.
    pub fn unlink_property(&mut self, handle: PropertyHandle) -> Result<()> {
        let property = self.property(handle)?;
        let ids: Vec<LinkId> = property
            .in_links()
            .iter()
            .chain(property.out_links())
            .copied()
            .collect();

        for id in ids {
            // a self-link shows up in both lists
            if self.links.contains_key(&id) {
                self.remove_link(id)?;
            }
        }

        if self.property(handle)?.has_links() {
            return Err(Error::LinkCorruption(format!("{handle} still has links after unlink")));
        }
        Ok(())
    }

    /// Any in-link, or an in-link into element `index`.
    pub fn has_in_links(&self, handle: PropertyHandle, index: Option<usize>) -> bool {
        let Ok(property) = self.property(handle) else {
            return false;
        };
        match index {
            None => !property.in_links().is_empty(),
            Some(i) => property
                .in_links()
                .iter()
                .filter_map(|id| self.links.get(id))
                .any(|link| link.destination_index() == Some(i)),
        }
    }

    /// Any out-link, or an out-link reading element `index`.
    pub fn has_out_links(&self, handle: PropertyHandle, index: Option<usize>) -> bool {
        let Ok(property) = self.property(handle) else {
            return false;
        };
        match index {
            None => !property.out_links().is_empty(),
            Some(i) => property
                .out_links()
                .iter()
                .filter_map(|id| self.links.get(id))
                .any(|link| link.source_index() == Some(i)),
        }
    }

    /// True if an in-link feeds the whole value (no destination index).
    pub fn has_main_in_link(&self, handle: PropertyHandle) -> bool {
        let Ok(property) = self.property(handle) else {
            return false;
        };
        property
            .in_links()
            .iter()
            .filter_map(|id| self.links.get(id))
            .any(PropertyLink::is_main)
    }

    pub fn link(&self, id: LinkId) -> Option<&PropertyLink> {
        self.links.get(&id)
    }

    pub fn links(&self) -> impl Iterator<Item = &PropertyLink> {
        self.links.values()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    // ========================================================================
    // Evaluation order
    // ========================================================================

    /// Invalidate the cached evaluation order. Cheap; the sort itself runs
    /// on the next `sorted_order` or pulse.
    pub fn request_sort(&mut self) {
        self.sort_requested = true;
    }

    pub fn sort_requested(&self) -> bool {
        self.sort_requested
    }

    /// Producer-before-consumer order, re-sorted if a sort was requested.
    pub fn sorted_order(&mut self) -> &[LinkableId] {
        if self.sort_requested {
            self.sort();
        }
        &self.sorted
    }

    /// Back edges found by the last sort (cyclic link groups).
    pub fn back_edges(&self) -> &[(LinkableId, LinkableId)] {
        &self.back_edges
    }

    /// Recompute the evaluation order now.
    pub fn sort(&mut self) -> SortOutcome {
        let outcome = LinkableSorter::new().sort(self);
        self.sorted = outcome.order.clone();
        self.back_edges = outcome.back_edges.clone();
        self.sort_requested = false;
        outcome
    }
}

fn declare(linkable: &mut Linkable, set: PropertySet) -> Result<()> {
    for (key, schema) in set.ins {
        linkable.group_mut(GroupRole::Ins).create_property(&key, schema)?;
    }
    for (key, schema) in set.outs {
        linkable.group_mut(GroupRole::Outs).create_property(&key, schema)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (Graph, PropertyHandle, PropertyHandle) {
        let mut g = Graph::new();
        let a = g.add_linkable("a", "Test").unwrap();
        let b = g.add_linkable("b", "Test").unwrap();
        let out = g.create_property(a, GroupRole::Outs, "out", Schema::number(0.0)).unwrap();
        let inp = g.create_property(b, GroupRole::Ins, "in", Schema::number(0.0)).unwrap();
        (g, out, inp)
    }

    #[test]
    fn test_duplicate_linkable_name() {
        let mut g = Graph::new();
        g.add_linkable("a", "Test").unwrap();
        assert!(matches!(g.add_linkable("a", "Test"), Err(Error::DuplicateId(_))));
    }

    #[test]
    fn test_link_registers_both_endpoints() {
        let (mut g, out, inp) = pair();
        let id = g.link_from(inp, out, None, None).unwrap();
        assert_eq!(g.property(out).unwrap().out_links(), &[id]);
        assert_eq!(g.property(inp).unwrap().in_links(), &[id]);
        assert!(g.has_main_in_link(inp));
        assert!(g.sort_requested());
    }

    #[test]
    fn test_output_cannot_be_destination() {
        let (g, out, inp) = pair();
        assert!(!g.can_link_from(out, inp, None, None));
    }

    #[test]
    fn test_duplicate_link_rejected() {
        let (mut g, out, inp) = pair();
        g.link_from(inp, out, None, None).unwrap();
        assert!(!g.can_link_from(inp, out, None, None));
    }

    #[test]
    fn test_remove_link_detects_corruption() {
        let (mut g, out, inp) = pair();
        let id = g.link_from(inp, out, None, None).unwrap();
        // break one side by hand
        g.property_mut(inp).unwrap().remove_in_link(id).unwrap();
        assert!(matches!(g.remove_link(id), Err(Error::LinkCorruption(_))));
        // the other endpoint is untouched
        assert_eq!(g.property(out).unwrap().out_links(), &[id]);
    }

    #[test]
    fn test_unlink_property_clears_everything() {
        let (mut g, out, inp) = pair();
        g.link_from(inp, out, None, None).unwrap();
        g.unlink_property(out).unwrap();
        assert!(!g.property(out).unwrap().has_links());
        assert!(!g.property(inp).unwrap().has_links());
        assert_eq!(g.link_count(), 0);
    }

    #[test]
    fn test_unlink_from_unknown_link() {
        let (mut g, out, inp) = pair();
        assert!(matches!(g.unlink_from(inp, out, None, None), Err(Error::LinkError(_))));
    }

    #[test]
    fn test_remove_linked_property_fails() {
        let (mut g, out, inp) = pair();
        g.link_from(inp, out, None, None).unwrap();
        assert!(matches!(g.remove_property(inp), Err(Error::HasLinks(_))));
        g.unlink_from(inp, out, None, None).unwrap();
        g.remove_property(inp).unwrap();
        assert!(g.property(inp).is_err());
    }
}
