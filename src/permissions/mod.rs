//! Cross-principal capability resolution for the guardianship graph.

mod edges;
mod resolver;

pub use edges::{
    load_edges, InMemoryRelationships, LinkStatus, RelationshipEdge, RelationshipSource,
};
pub use resolver::{Capability, PermissionResolver};
