//! Generic loaders
//!
//! One routine for all node types and one for all relationship types, each
//! parameterised by a declaration from the [`SchemaRegistry`](crate::SchemaRegistry).

mod nodes;
mod relationships;

pub use nodes::load_nodes;
pub use relationships::load_relationships;
