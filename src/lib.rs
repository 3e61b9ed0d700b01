//! # propgraph: Reactive Property Graph
//!
//! The dataflow substrate of a component-entity scene runtime. Components
//! ("linkables") expose typed input and output properties; links connect
//! properties (with kind conversion and array-element addressing), values
//! propagate along links as soon as they are set, and a sorter derives the
//! producer-before-consumer order in which owners are updated each pulse.
//!
//! ## Design Principles
//!
//! 1. **One mutation point**: `Graph` owns every linkable and link, so both
//!    endpoints of a link always change together
//! 2. **Handles, not pointers**: properties are addressed by `PropertyHandle`;
//!    groups own properties, linkables own groups
//! 3. **Resolve once, push cheaply**: conversions and copy strategies are
//!    fixed when a link is built
//! 4. **Cycles are reported, not fatal**: propagation cuts re-entered links,
//!    the sorter reports back edges
//!
//! ## Quick Start
//!
//! ```rust
//! use propgraph::{Graph, GroupRole, Schema, Value};
//!
//! # fn example() -> propgraph::Result<()> {
//! let mut graph = Graph::new();
//! let a = graph.add_linkable("a", "Source")?;
//! let b = graph.add_linkable("b", "Sink")?;
//! let level = graph.create_property(a, GroupRole::Outs, "level", Schema::number(0.0))?;
//! let visible = graph.create_property(b, GroupRole::Ins, "visible", Schema::boolean(false))?;
//!
//! graph.link_from(visible, level, None, None)?;
//! graph.set_value(level, Value::Number(5.0))?;
//! assert_eq!(graph.property(visible)?.value(), &Value::Boolean(true));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod convert;
pub mod graph;
pub mod scheduler;
pub mod components;
pub mod config;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    Value, ObjectRef, Schema, ValueKind, ObjectType, EnumType,
    Property, PropertyHandle, GroupRole, SetFlags,
    PropertyGroup, PropertyLink, LinkId, Linkable, LinkableId,
};

// ============================================================================
// Re-exports: Graph
// ============================================================================

pub use graph::{
    Graph, PropagationStats, PropertyEvent, PropertyEventKind,
    LinkableSorter, SortOutcome,
};
pub use graph::json::{PropertyJson, LinkJson, LinkableJson, GraphJson};

// ============================================================================
// Re-exports: Scheduler / Config
// ============================================================================

pub use scheduler::{Component, NodeContext, Pulse, PulseClock, PulseStats, PropertySet};
pub use config::{GraphConfig, CyclePolicy};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Link error: {0}")]
    LinkError(String),

    #[error("Duplicate property key '{key}' in {group}")]
    DuplicateKey { group: String, key: String },

    #[error("Duplicate linkable id '{0}'")]
    DuplicateId(String),

    #[error("Property {0} still has links")]
    HasLinks(String),

    #[error("Link list corrupted: {0}")]
    LinkCorruption(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Type error: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },

    #[error("Propagation cycle through link {link}")]
    CycleDetected { link: LinkId },

    #[error("Propagation exceeded {0} link pushes")]
    PropagationLimit(usize),

    #[error("Component error: {0}")]
    ComponentError(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
