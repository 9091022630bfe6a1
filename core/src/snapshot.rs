use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The static analysis view of a live workflow tree.
///
/// `TreeSnapshot` is the structural picture of a host at one point in time:
/// which node instances are mounted where, and which subscriptions each one
/// keeps running. Nodes are listed parent-first, root at index 0.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct TreeSnapshot {
    pub session: Uuid,
    pub render_passes: u64,
    pub nodes: Vec<NodeSnapshot>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeSnapshot {
    pub id: Uuid,
    pub parent: Option<Uuid>,
    /// Workflow type name
    pub workflow: String,
    /// Position key within the parent (`Type[key]#ordinal`)
    pub key: String,
    pub children: Vec<Uuid>,
    pub subscriptions: Vec<String>,
}

impl TreeSnapshot {
    pub fn root(&self) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|n| n.parent.is_none())
    }

    pub fn node(&self, id: Uuid) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// All mounted instances of the named workflow type.
    pub fn find_by_workflow<'a>(
        &'a self,
        workflow: &'a str,
    ) -> impl Iterator<Item = &'a NodeSnapshot> {
        self.nodes.iter().filter(move |n| n.workflow == workflow)
    }

    /// Total running subscriptions across the tree.
    pub fn subscription_count(&self) -> usize {
        self.nodes.iter().map(|n| n.subscriptions.len()).sum()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
