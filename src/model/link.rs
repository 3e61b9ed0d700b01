//! PropertyLink: a directed, converting edge between two properties.

use serde::{Deserialize, Serialize};

use super::{Property, PropertyHandle, Value};
use crate::convert::CopyPlan;
use crate::Result;

/// Opaque link identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkId(pub u64);

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A link from `source` (optionally one of its elements) to `destination`
/// (optionally one of its elements).
///
/// Immutable once built. The copy plan is resolved at construction so a
/// push does no further kind dispatch.
#[derive(Debug, Clone)]
pub struct PropertyLink {
    id: LinkId,
    source: PropertyHandle,
    destination: PropertyHandle,
    source_index: Option<usize>,
    destination_index: Option<usize>,
    plan: CopyPlan,
}

impl PropertyLink {
    /// Build a link between two properties. Fails if an index addresses a
    /// non-array endpoint or the kinds cannot be converted; compatibility
    /// rules beyond that are enforced by `Graph::can_link_from`.
    pub(crate) fn new(
        id: LinkId,
        source: &Property,
        destination: &Property,
        source_index: Option<usize>,
        destination_index: Option<usize>,
    ) -> Result<Self> {
        let plan = CopyPlan::for_endpoints(source.schema(), destination.schema(), source_index, destination_index)?;
        Ok(Self {
            id,
            source: source.handle(),
            destination: destination.handle(),
            source_index,
            destination_index,
            plan,
        })
    }

    pub fn id(&self) -> LinkId { self.id }
    pub fn source(&self) -> PropertyHandle { self.source }
    pub fn destination(&self) -> PropertyHandle { self.destination }
    pub fn source_index(&self) -> Option<usize> { self.source_index }
    pub fn destination_index(&self) -> Option<usize> { self.destination_index }
    pub fn plan(&self) -> &CopyPlan { &self.plan }

    /// A main link feeds the whole destination value.
    pub fn is_main(&self) -> bool {
        self.destination_index.is_none()
    }

    pub fn matches(
        &self,
        source: PropertyHandle,
        source_index: Option<usize>,
        destination_index: Option<usize>,
    ) -> bool {
        self.source == source && self.source_index == source_index && self.destination_index == destination_index
    }

    /// Destination value after pushing `input` into `output`.
    pub fn transfer(&self, input: &Value, output: &Value, preset: &Value) -> Value {
        let mut result = output.clone();
        self.plan.apply(input, &mut result, preset);
        result
    }
}
