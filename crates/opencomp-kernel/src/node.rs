//! Node types: the entities of the competency hierarchy.
//!
//! Every hierarchy entity shares one `Node` record. What differs per kind
//! (parent links, owner, level type) lives in the tagged `NodeBody`, and the
//! parent/child edges between kinds are declared statically on `NodeKind`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric node identifier. One id space is shared by every node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(NodeId)
            .map_err(|_| format!("invalid node id `{s}`"))
    }
}

/// The closed set of hierarchy entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    School,
    SubjectArea,
    SubdisciplineArea,
    CompetencyArea,
    Level,
    EssentialUnderstanding,
    LearningTarget,
}

impl NodeKind {
    pub const ALL: [NodeKind; 7] = [
        NodeKind::School,
        NodeKind::SubjectArea,
        NodeKind::SubdisciplineArea,
        NodeKind::CompetencyArea,
        NodeKind::Level,
        NodeKind::EssentialUnderstanding,
        NodeKind::LearningTarget,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::School => "school",
            NodeKind::SubjectArea => "subject_area",
            NodeKind::SubdisciplineArea => "subdiscipline_area",
            NodeKind::CompetencyArea => "competency_area",
            NodeKind::Level => "level",
            NodeKind::EssentialUnderstanding => "essential_understanding",
            NodeKind::LearningTarget => "learning_target",
        }
    }

    /// Child kinds reachable from this kind, in display order.
    ///
    /// This table is the only description of the hierarchy's edges; cascades
    /// and traversals walk it instead of discovering relations at runtime.
    pub fn child_kinds(&self) -> &'static [NodeKind] {
        match self {
            NodeKind::School => &[NodeKind::SubjectArea],
            NodeKind::SubjectArea => &[NodeKind::SubdisciplineArea, NodeKind::CompetencyArea],
            NodeKind::SubdisciplineArea => &[NodeKind::CompetencyArea],
            NodeKind::CompetencyArea => &[NodeKind::Level, NodeKind::EssentialUnderstanding],
            NodeKind::EssentialUnderstanding => &[NodeKind::LearningTarget],
            NodeKind::Level | NodeKind::LearningTarget => &[],
        }
    }

    /// Whether `child` may be created directly under this kind.
    pub fn accepts_child(&self, child: NodeKind) -> bool {
        self.child_kinds().contains(&child)
    }

    /// Leaf levels carry a student-friendly rephrasing.
    pub fn supports_student_friendly(&self) -> bool {
        matches!(
            self,
            NodeKind::Level | NodeKind::EssentialUnderstanding | NodeKind::LearningTarget
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .or(match normalized.as_str() {
                "organization" => Some(NodeKind::School),
                "sa" => Some(NodeKind::SubjectArea),
                "sda" => Some(NodeKind::SubdisciplineArea),
                "ca" => Some(NodeKind::CompetencyArea),
                "eu" => Some(NodeKind::EssentialUnderstanding),
                "lt" | "learning_objective" => Some(NodeKind::LearningTarget),
                _ => None,
            })
            .ok_or_else(|| format!("unknown node kind `{s}`"))
    }
}

/// Fixed progression of levels within a competency area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LevelType {
    Apprentice,
    Technician,
    Master,
    Professional,
}

impl LevelType {
    pub const ALL: [LevelType; 4] = [
        LevelType::Apprentice,
        LevelType::Technician,
        LevelType::Master,
        LevelType::Professional,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LevelType::Apprentice => "Apprentice",
            LevelType::Technician => "Technician",
            LevelType::Master => "Master",
            LevelType::Professional => "Professional",
        }
    }
}

impl fmt::Display for LevelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LevelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LevelType::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown level type `{s}`"))
    }
}

/// An actor identity as supplied by the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The viewer or editor of one request. Passed explicitly into every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Anonymous,
    User(ActorId),
}

impl Actor {
    pub fn user(id: impl Into<String>) -> Self {
        Actor::User(ActorId::new(id))
    }

    pub fn id(&self) -> Option<&ActorId> {
        match self {
            Actor::Anonymous => None,
            Actor::User(id) => Some(id),
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Anonymous => f.write_str("anonymous"),
            Actor::User(id) => write!(f, "{id}"),
        }
    }
}

pub const DEFAULT_ALIAS_CA: &str = "competency area";
pub const DEFAULT_ALIAS_EU: &str = "essential understanding";

fn default_alias_ca() -> String {
    DEFAULT_ALIAS_CA.to_string()
}

fn default_alias_eu() -> String {
    DEFAULT_ALIAS_EU.to_string()
}

/// Kind-specific node data, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeBody {
    School {
        owner: ActorId,
        #[serde(default = "default_alias_ca")]
        alias_ca: String,
        #[serde(default = "default_alias_eu")]
        alias_eu: String,
    },
    SubjectArea {
        school: NodeId,
    },
    SubdisciplineArea {
        subject_area: NodeId,
    },
    CompetencyArea {
        subject_area: NodeId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subdiscipline_area: Option<NodeId>,
    },
    Level {
        competency_area: NodeId,
        level_type: LevelType,
    },
    EssentialUnderstanding {
        competency_area: NodeId,
    },
    LearningTarget {
        essential_understanding: NodeId,
    },
}

impl NodeBody {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeBody::School { .. } => NodeKind::School,
            NodeBody::SubjectArea { .. } => NodeKind::SubjectArea,
            NodeBody::SubdisciplineArea { .. } => NodeKind::SubdisciplineArea,
            NodeBody::CompetencyArea { .. } => NodeKind::CompetencyArea,
            NodeBody::Level { .. } => NodeKind::Level,
            NodeBody::EssentialUnderstanding { .. } => NodeKind::EssentialUnderstanding,
            NodeBody::LearningTarget { .. } => NodeKind::LearningTarget,
        }
    }

    /// The effective parent: a competency area hangs off its subdiscipline
    /// area when it has one, otherwise off its subject area.
    pub fn parent(&self) -> Option<NodeId> {
        match self {
            NodeBody::School { .. } => None,
            NodeBody::SubjectArea { school } => Some(*school),
            NodeBody::SubdisciplineArea { subject_area } => Some(*subject_area),
            NodeBody::CompetencyArea {
                subject_area,
                subdiscipline_area,
            } => Some(subdiscipline_area.unwrap_or(*subject_area)),
            NodeBody::Level {
                competency_area, ..
            }
            | NodeBody::EssentialUnderstanding { competency_area } => Some(*competency_area),
            NodeBody::LearningTarget {
                essential_understanding,
            } => Some(*essential_understanding),
        }
    }

    /// The node whose order list holds this node.
    ///
    /// Competency areas share one list per subject area regardless of
    /// subdiscipline; every other kind is ordered by its parent.
    pub fn order_parent(&self) -> Option<NodeId> {
        match self {
            NodeBody::CompetencyArea { subject_area, .. } => Some(*subject_area),
            other => other.parent(),
        }
    }
}

/// One node of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub label: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub student_friendly: String,
    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub body: NodeBody,
}

fn default_timestamp() -> DateTime<Utc> {
    Utc::now()
}

impl Node {
    pub fn new(id: NodeId, label: impl Into<String>, body: NodeBody) -> Self {
        let now = Utc::now();
        Self {
            id,
            label: label.into(),
            public: false,
            description: String::new(),
            student_friendly: String::new(),
            created_at: now,
            updated_at: now,
            body,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.body.kind()
    }

    pub fn parent_id(&self) -> Option<NodeId> {
        self.body.parent()
    }

    pub fn touch_updated_at(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Short human reference, e.g. `competency_area 12`.
    pub fn reference(&self) -> String {
        format!("{} {}", self.kind(), self.id)
    }
}

/// Field values for create and update.
///
/// `None` leaves a field untouched on update. Values arrive already
/// validated for length and type by the form layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeFields {
    pub label: Option<String>,
    pub description: Option<String>,
    pub student_friendly: Option<String>,
    pub level_type: Option<LevelType>,
}

impl NodeFields {
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    pub fn with_level_type(mut self, level_type: LevelType) -> Self {
        self.level_type = Some(level_type);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.description.is_none()
            && self.student_friendly.is_none()
            && self.level_type.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_aliases() {
        assert_eq!(
            "competency-area".parse::<NodeKind>(),
            Ok(NodeKind::CompetencyArea)
        );
        assert_eq!("eu".parse::<NodeKind>(), Ok(NodeKind::EssentialUnderstanding));
        assert_eq!("Organization".parse::<NodeKind>(), Ok(NodeKind::School));
        assert!("pathway".parse::<NodeKind>().is_err());
    }

    #[test]
    fn competency_area_parent_prefers_subdiscipline() {
        let general = NodeBody::CompetencyArea {
            subject_area: NodeId(2),
            subdiscipline_area: None,
        };
        let scoped = NodeBody::CompetencyArea {
            subject_area: NodeId(2),
            subdiscipline_area: Some(NodeId(5)),
        };
        assert_eq!(general.parent(), Some(NodeId(2)));
        assert_eq!(scoped.parent(), Some(NodeId(5)));
        assert_eq!(scoped.order_parent(), Some(NodeId(2)));
    }

    #[test]
    fn node_serializes_flat_with_kind_tag() {
        let node = Node::new(
            NodeId(9),
            "Apply ratios",
            NodeBody::Level {
                competency_area: NodeId(4),
                level_type: LevelType::Master,
            },
        );
        let value = serde_json::to_value(&node).expect("node should serialize");
        assert_eq!(value["kind"], "level");
        assert_eq!(value["competency_area"], 4);
        assert_eq!(value["level_type"], "Master");
        assert_eq!(value["public"], false);
        assert!(value.get("description").is_none());

        let back: Node = serde_json::from_value(value).expect("node should parse");
        assert_eq!(back.kind(), NodeKind::Level);
    }

    #[test]
    fn school_aliases_default_when_missing() {
        let raw = r#"{"id":1,"label":"North High","kind":"school","owner":"alice"}"#;
        let node: Node = serde_json::from_str(raw).expect("school should parse");
        match node.body {
            NodeBody::School {
                alias_ca, alias_eu, ..
            } => {
                assert_eq!(alias_ca, DEFAULT_ALIAS_CA);
                assert_eq!(alias_eu, DEFAULT_ALIAS_EU);
            }
            other => panic!("expected school body, got {other:?}"),
        }
    }

    #[test]
    fn level_type_parses_case_insensitively() {
        assert_eq!("technician".parse::<LevelType>(), Ok(LevelType::Technician));
        assert!("novice".parse::<LevelType>().is_err());
    }
}
