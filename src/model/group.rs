//! PropertyGroup: ordered, keyed collection of properties owned by a linkable.

use hashbrown::HashMap;

use super::{GroupRole, LinkableId, Property, PropertyHandle, Schema};
use crate::{Error, Result};

/// An owner's input or output properties.
///
/// Properties live in a slot arena so handles stay valid while other
/// properties are added or removed. Insertion order is kept separately;
/// it is significant for serialization and positional access.
#[derive(Debug, Clone)]
pub struct PropertyGroup {
    owner: LinkableId,
    role: GroupRole,
    slots: Vec<Option<Property>>,
    order: Vec<u32>,
    keys: HashMap<String, u32>,
}

impl PropertyGroup {
    pub fn new(owner: LinkableId, role: GroupRole) -> Self {
        Self {
            owner,
            role,
            slots: Vec::new(),
            order: Vec::new(),
            keys: HashMap::new(),
        }
    }

    pub fn owner(&self) -> LinkableId { self.owner }
    pub fn role(&self) -> GroupRole { self.role }
    pub fn is_input(&self) -> bool { self.role == GroupRole::Ins }
    pub fn is_output(&self) -> bool { self.role == GroupRole::Outs }
    pub fn len(&self) -> usize { self.order.len() }
    pub fn is_empty(&self) -> bool { self.order.is_empty() }

    /// Add a declared (non-custom) property. The path defaults to the key.
    pub fn create_property(&mut self, key: &str, schema: Schema) -> Result<PropertyHandle> {
        let path = schema.label.clone().unwrap_or_else(|| key.to_string());
        self.insert(key.to_string(), path, schema, false)
    }

    /// Add a custom (dynamic) property; custom properties serialize their
    /// path and schema so they can be recreated on load.
    pub fn create_custom_property(&mut self, path: &str, schema: Schema, key: Option<&str>) -> Result<PropertyHandle> {
        let key = key.map(str::to_string).unwrap_or_else(|| key_from_path(path));
        self.insert(key, path.to_string(), schema, true)
    }

    fn insert(&mut self, key: String, path: String, schema: Schema, custom: bool) -> Result<PropertyHandle> {
        if self.keys.contains_key(&key) {
            return Err(Error::DuplicateKey {
                group: format!("{}.{}", self.owner, self.role),
                key,
            });
        }
        let slot = self.slots.len() as u32;
        let handle = PropertyHandle { owner: self.owner, role: self.role, slot };
        self.slots.push(Some(Property::new(handle, key.clone(), path, schema, custom)));
        self.order.push(slot);
        self.keys.insert(key, slot);
        Ok(handle)
    }

    /// Remove a property. Linked properties must be unlinked first.
    pub fn remove_property(&mut self, key: &str) -> Result<Property> {
        let slot = *self.keys.get(key).ok_or_else(|| Error::NotFound(format!("Property '{key}'")))?;
        let linked = self.property(slot).is_some_and(Property::has_links);
        if linked {
            return Err(Error::HasLinks(format!("{}.{}.{key}", self.owner, self.role)));
        }
        self.keys.remove(key);
        self.order.retain(|s| *s != slot);
        self.slots[slot as usize]
            .take()
            .ok_or_else(|| Error::NotFound(format!("Property '{key}'")))
    }

    pub fn get(&self, key: &str) -> Option<&Property> {
        self.keys.get(key).and_then(|slot| self.property(*slot))
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut Property> {
        let slot = *self.keys.get(key)?;
        self.property_mut(slot)
    }

    pub fn handle(&self, key: &str) -> Option<PropertyHandle> {
        self.get(key).map(Property::handle)
    }

    pub fn property(&self, slot: u32) -> Option<&Property> {
        self.slots.get(slot as usize).and_then(Option::as_ref)
    }

    pub(crate) fn property_mut(&mut self, slot: u32) -> Option<&mut Property> {
        self.slots.get_mut(slot as usize).and_then(Option::as_mut)
    }

    /// Property at an insertion-order position.
    pub fn at(&self, position: usize) -> Option<&Property> {
        self.order.get(position).and_then(|slot| self.property(*slot))
    }

    pub fn position_of(&self, key: &str) -> Option<usize> {
        let slot = self.keys.get(key)?;
        self.order.iter().position(|s| s == slot)
    }

    /// Properties in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.order.iter().filter_map(|slot| self.property(*slot))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.iter().map(Property::key)
    }

    pub(crate) fn handles(&self) -> Vec<PropertyHandle> {
        self.iter().map(Property::handle).collect()
    }

    /// True if any property changed since the flags were last cleared.
    pub fn changed(&self) -> bool {
        self.iter().any(Property::changed)
    }

    pub(crate) fn clear_changed(&mut self) {
        for p in self.slots.iter_mut().flatten() {
            p.clear_changed();
        }
    }

    pub fn has_links(&self) -> bool {
        self.iter().any(Property::has_links)
    }
}

/// `"Lights.Key Color"` → `"keyColor"`.
fn key_from_path(path: &str) -> String {
    let last = path.rsplit('.').next().unwrap_or(path);
    let mut key = String::with_capacity(last.len());
    let mut upper_next = false;
    for c in last.chars() {
        if c.is_whitespace() || c == '-' || c == '_' {
            upper_next = !key.is_empty();
        } else if key.is_empty() {
            key.extend(c.to_lowercase());
        } else if upper_next {
            key.extend(c.to_uppercase());
            upper_next = false;
        } else {
            key.push(c);
        }
    }
    key
}
