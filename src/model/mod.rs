//! # Property Graph Model
//!
//! Plain data: values, schemas, properties, groups, links and their owners.
//! Nothing here touches more than one property at a time; operations that
//! do (linking, propagation, disposal) live on `graph::Graph`.

pub mod value;
pub mod schema;
pub mod property;
pub mod group;
pub mod link;
pub mod linkable;

pub use value::{Value, ObjectRef};
pub use schema::{Schema, ValueKind, ObjectType, EnumType};
pub use property::{Property, PropertyHandle, GroupRole, SetFlags};
pub use group::PropertyGroup;
pub use link::{PropertyLink, LinkId};
pub use linkable::{Linkable, LinkableId};
