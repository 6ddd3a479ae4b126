//! Relationship edges of the guardianship graph.
//!
//! Edges are directed and capability-qualified. A capability check never
//! infers transitive access across two edges of different kinds; the
//! resolver only ever looks at edges already oriented actor→subject.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::broker::ScopedClient;
use crate::error::{BrokerError, BrokerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelationshipEdge {
    /// `subject.managed_by_parent_id == actor.id`: the subject is the
    /// actor's dependent.
    ManagedByParent,
    /// Student↔parent link; only `Approved` links grant anything.
    LinkedParent { status: LinkStatus },
    /// Observer grant with per-capability flags.
    ObserverLink { can_comment: bool, can_view_evidence: bool },
    /// Advisor assignment; inactive assignments grant nothing.
    AdvisorAssignment { is_active: bool },
}

/// Supplies the edges oriented actor→subject for a capability check.
/// Production implementations read through a scoped client; tests use
/// `InMemoryRelationships`.
pub trait RelationshipSource {
    fn edges(&self, actor: Uuid, subject: Uuid) -> BrokerResult<Vec<RelationshipEdge>>;
}

/// Fixture-style source for tests and simulations.
#[derive(Default)]
pub struct InMemoryRelationships {
    edges: HashMap<(Uuid, Uuid), Vec<RelationshipEdge>>,
}

impl InMemoryRelationships {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, actor: Uuid, subject: Uuid, edge: RelationshipEdge) {
        self.edges.entry((actor, subject)).or_default().push(edge);
    }
}

impl RelationshipSource for InMemoryRelationships {
    fn edges(&self, actor: Uuid, subject: Uuid) -> BrokerResult<Vec<RelationshipEdge>> {
        Ok(self.edges.get(&(actor, subject)).cloned().unwrap_or_default())
    }
}

/// Fetch the actor→subject edges through a scoped client. The client's own
/// scope decides what the store lets the query see.
pub async fn load_edges(
    client: &ScopedClient,
    actor: Uuid,
    subject: Uuid,
) -> BrokerResult<Vec<RelationshipEdge>> {
    let rows: Value = client
        .from("relationship_edges")
        .select("kind,status,can_comment,can_view_evidence,is_active")
        .eq("actor_id", &actor.to_string())
        .eq("subject_id", &subject.to_string())
        .fetch()
        .await?;
    serde_json::from_value(rows)
        .map_err(|e| BrokerError::Database(format!("malformed relationship rows: {}", e)))
}
