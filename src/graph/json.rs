//! JSON snapshots of property values and links.
//!
//! A property is written only as far as it differs from what its owner
//! would recreate on its own: custom properties carry their `path` and
//! `schema`, unlinked inputs carry a non-default `value`, and every
//! out-link is listed by destination owner id and property key.
//!
//! ```text
//! { "linkables": [
//!     { "id": "light", "type": "Light",
//!       "ins":  { "intensity": { "value": 0.5 } },
//!       "outs": { "level": { "links": [ { "id": "fog", "key": "density" } ] } } } ] }
//! ```
//!
//! Owner lookup during restore goes through an explicit `name → id` map
//! (see `Graph::id_map`).

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::Graph;
use crate::model::*;
use crate::{Error, Result};

/// Snapshot of one group: property key → `PropertyJson`, insertion ordered.
pub type GroupJson = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<LinkJson>,
}

impl PropertyJson {
    pub fn is_empty(&self) -> bool {
        self.path.is_none() && self.schema.is_none() && self.value.is_none() && self.links.is_empty()
    }
}

/// An out-link, addressed by destination owner id and property key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkJson {
    pub id: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkableJson {
    pub id: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub ins: GroupJson,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub outs: GroupJson,
}

/// Whole-graph snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphJson {
    pub linkables: Vec<LinkableJson>,
}

impl GraphJson {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Graph {
    // ========================================================================
    // Property
    // ========================================================================

    pub fn property_to_json(&self, handle: PropertyHandle) -> Result<PropertyJson> {
        let property = self.property(handle)?;
        let mut json = PropertyJson::default();

        if property.is_custom() {
            json.path = Some(property.path().to_string());
            json.schema = Some(property.schema().clone());
        }

        let writes_value = property.is_input()
            && property.kind() != ValueKind::Object
            && !self.has_main_in_link(handle)
            && !property.is_default();
        if writes_value {
            json.value = Some(property.value().clone());
        }

        for id in property.out_links() {
            let link = self
                .link(*id)
                .ok_or_else(|| Error::LinkCorruption(format!("link {id} listed but not registered")))?;
            let destination = link.destination();
            let owner = self.node(destination.owner)?;
            let target = self.property(destination)?;
            json.links.push(LinkJson {
                id: owner.linkable.name().to_string(),
                key: target.key().to_string(),
                src_index: link.source_index(),
                dst_index: link.destination_index(),
            });
        }

        Ok(json)
    }

    /// Restore the value of `handle`, then its out-links.
    pub fn property_from_json(
        &mut self,
        handle: PropertyHandle,
        json: &PropertyJson,
        ids: &HashMap<String, LinkableId>,
    ) -> Result<()> {
        self.restore_value(handle, json)?;
        self.restore_links(handle, json, ids)
    }

    fn restore_value(&mut self, handle: PropertyHandle, json: &PropertyJson) -> Result<()> {
        let Some(value) = &json.value else {
            return Ok(());
        };
        if self.property(handle)?.kind() == ValueKind::Object {
            return Ok(());
        }
        let value = self.property(handle)?.schema().conform(value.clone())?;
        self.set_value(handle, value)?;
        Ok(())
    }

    fn restore_links(
        &mut self,
        handle: PropertyHandle,
        json: &PropertyJson,
        ids: &HashMap<String, LinkableId>,
    ) -> Result<()> {
        for link in &json.links {
            let owner = *ids
                .get(&link.id)
                .ok_or_else(|| Error::NotFound(format!("Linkable '{}'", link.id)))?;
            let destination = self.input(owner, &link.key)?;
            if self.find_link(destination, handle, link.src_index, link.dst_index).is_some() {
                continue;
            }
            self.link_from(destination, handle, link.src_index, link.dst_index)?;
        }
        Ok(())
    }

    // ========================================================================
    // Group
    // ========================================================================

    /// Snapshot of a group; properties with nothing to record are omitted.
    pub fn group_to_json(&self, owner: LinkableId, role: GroupRole) -> Result<GroupJson> {
        let mut json = GroupJson::new();
        for property in self.node(owner)?.linkable.group(role).iter() {
            let entry = self.property_to_json(property.handle())?;
            if !entry.is_empty() {
                json.insert(property.key().to_string(), serde_json::to_value(entry)?);
            }
        }
        Ok(json)
    }

    /// Restore a group: create missing custom properties, restore values,
    /// then re-link through `ids`.
    pub fn group_from_json(
        &mut self,
        owner: LinkableId,
        role: GroupRole,
        json: &GroupJson,
        ids: &HashMap<String, LinkableId>,
    ) -> Result<()> {
        let entries = self.restore_group_values(owner, role, json)?;
        for (handle, entry) in &entries {
            self.restore_links(*handle, entry, ids)?;
        }
        Ok(())
    }

    fn restore_group_values(
        &mut self,
        owner: LinkableId,
        role: GroupRole,
        json: &GroupJson,
    ) -> Result<Vec<(PropertyHandle, PropertyJson)>> {
        let mut entries = Vec::with_capacity(json.len());
        for (key, raw) in json {
            let entry: PropertyJson = serde_json::from_value(raw.clone())?;
            let handle = match self.find(owner, role, key) {
                Ok(handle) => handle,
                Err(_) => match (&entry.path, &entry.schema) {
                    (Some(path), Some(schema)) => {
                        self.create_custom_property(owner, role, path, schema.clone(), Some(key))?
                    }
                    _ => return Err(Error::NotFound(format!("Property {owner}.{role}.{key}"))),
                },
            };
            self.restore_value(handle, &entry)?;
            entries.push((handle, entry));
        }
        Ok(entries)
    }

    // ========================================================================
    // Graph
    // ========================================================================

    pub fn to_json(&self) -> Result<GraphJson> {
        let mut linkables = Vec::with_capacity(self.len());
        for linkable in self.linkables() {
            linkables.push(LinkableJson {
                id: linkable.name().to_string(),
                type_name: linkable.type_name().to_string(),
                ins: self.group_to_json(linkable.id(), GroupRole::Ins)?,
                outs: self.group_to_json(linkable.id(), GroupRole::Outs)?,
            });
        }
        debug!(linkables = linkables.len(), "Graph snapshot taken");
        Ok(GraphJson { linkables })
    }

    /// Apply a snapshot. Owners missing from the graph are recreated as
    /// bare linkables; values are restored before any link so links may
    /// target owners listed later.
    pub fn restore(&mut self, json: &GraphJson) -> Result<()> {
        for entry in &json.linkables {
            if self.linkable_by_name(&entry.id).is_none() {
                self.add_linkable(&entry.id, &entry.type_name)?;
            }
        }
        let ids = self.id_map();

        let mut pending = Vec::new();
        for entry in &json.linkables {
            let owner = *ids
                .get(&entry.id)
                .ok_or_else(|| Error::NotFound(format!("Linkable '{}'", entry.id)))?;
            pending.extend(self.restore_group_values(owner, GroupRole::Ins, &entry.ins)?);
            pending.extend(self.restore_group_values(owner, GroupRole::Outs, &entry.outs)?);
        }

        for (handle, entry) in &pending {
            self.restore_links(*handle, entry, &ids)?;
        }

        info!(linkables = json.linkables.len(), links = self.link_count(), "Graph restored");
        Ok(())
    }
}
