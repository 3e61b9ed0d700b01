//! Graph boundary: inputs forwarded unchanged to outputs of the same key.

use tracing::debug;

use crate::graph::Graph;
use crate::model::*;
use crate::scheduler::{Component, NodeContext, PropertySet};
use crate::{Error, Result};

/// Owner whose ports are custom properties created in input/output pairs.
///
/// Other owners link into a port's input; whatever is linked from the
/// matching output receives the value after the boundary's update. Links
/// may also be made directly from the input, which the sorter follows as
/// pass-through.
#[derive(Debug, Default)]
pub struct Boundary;

impl Boundary {
    pub const TYPE: &'static str = "Boundary";

    pub fn new() -> Self {
        Self
    }

    /// Add a port. Returns the `(input, output)` handles; both share the key
    /// derived from `path`.
    pub fn add_port(
        graph: &mut Graph,
        owner: LinkableId,
        path: &str,
        schema: Schema,
    ) -> Result<(PropertyHandle, PropertyHandle)> {
        if graph.component_as::<Boundary>(owner).is_none() {
            return Err(Error::ComponentError(format!("{owner} is not a boundary")));
        }

        let input = graph.create_custom_property(owner, GroupRole::Ins, path, schema.clone(), None)?;
        let key = graph.property(input)?.key().to_string();
        let output = match graph.create_custom_property(owner, GroupRole::Outs, path, schema, Some(&key)) {
            Ok(output) => output,
            Err(e) => {
                graph.remove_property(input)?;
                return Err(e);
            }
        };

        debug!(linkable = %owner, key = %key, "Boundary port added");
        Ok((input, output))
    }

    /// Unlink and remove both halves of a port.
    pub fn remove_port(graph: &mut Graph, owner: LinkableId, key: &str) -> Result<()> {
        for handle in [graph.input(owner, key)?, graph.output(owner, key)?] {
            graph.unlink_property(handle)?;
            graph.remove_property(handle)?;
        }
        debug!(linkable = %owner, key, "Boundary port removed");
        Ok(())
    }
}

impl Component for Boundary {
    fn type_name(&self) -> &str {
        Self::TYPE
    }

    fn properties(&self) -> PropertySet {
        PropertySet::new()
    }

    fn update(&mut self, ctx: &mut NodeContext<'_>) -> Result<bool> {
        let changed: Vec<(String, Value)> = ctx
            .ins()?
            .iter()
            .filter(|p| p.changed())
            .map(|p| (p.key().to_string(), p.value().clone()))
            .collect();

        for (key, value) in &changed {
            ctx.set_output(key, value.clone())?;
        }
        Ok(!changed.is_empty())
    }
}
