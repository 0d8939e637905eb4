//! Persisted record shapes: one JSON object per line, tagged by `record`.

use opencomp_kernel::{Node, NodeId, NodeKind, Pathway, TaxonomyParts, UserProfile};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum Record {
    /// Store-level counters. Written first.
    Meta { next_id: u64 },
    Node(Node),
    /// One explicit sibling sequence.
    Order {
        parent: NodeId,
        kind: NodeKind,
        ids: Vec<NodeId>,
    },
    Profile(UserProfile),
    Pathway(Pathway),
}

impl Record {
    /// Every `record` tag a store line may carry.
    pub const TAGS: [&'static str; 5] = ["meta", "node", "order", "profile", "pathway"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Record::Meta { .. } => "meta",
            Record::Node(_) => "node",
            Record::Order { .. } => "order",
            Record::Profile(_) => "profile",
            Record::Pathway(_) => "pathway",
        }
    }
}

/// Flatten taxonomy parts into records in canonical order: meta, nodes,
/// orders, profiles, pathways, each in key order.
pub fn records_from_parts(parts: TaxonomyParts) -> Vec<Record> {
    let mut records = Vec::with_capacity(
        1 + parts.nodes.len() + parts.orders.len() + parts.profiles.len() + parts.pathways.len(),
    );
    records.push(Record::Meta {
        next_id: parts.next_id,
    });
    records.extend(parts.nodes.into_iter().map(Record::Node));
    records.extend(
        parts
            .orders
            .into_iter()
            .map(|(parent, kind, ids)| Record::Order { parent, kind, ids }),
    );
    records.extend(parts.profiles.into_iter().map(Record::Profile));
    records.extend(parts.pathways.into_iter().map(Record::Pathway));
    records
}

/// Gather records back into parts. Later records win on duplicate keys;
/// the highest `meta` counter is kept.
pub fn parts_from_records(records: Vec<Record>) -> TaxonomyParts {
    let mut parts = TaxonomyParts::default();
    for record in records {
        match record {
            Record::Meta { next_id } => parts.next_id = parts.next_id.max(next_id),
            Record::Node(node) => parts.nodes.push(node),
            Record::Order { parent, kind, ids } => parts.orders.push((parent, kind, ids)),
            Record::Profile(profile) => parts.profiles.push(profile),
            Record::Pathway(pathway) => parts.pathways.push(pathway),
        }
    }
    parts
}
