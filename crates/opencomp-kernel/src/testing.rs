//! Shared fixture for unit tests.

use crate::node::{ActorId, LevelType, NodeFields, NodeId, NodeKind};
use crate::tree::Taxonomy;

pub(crate) struct Sample {
    pub taxonomy: Taxonomy,
    pub school: NodeId,
    pub math: NodeId,
    pub english: NodeId,
    pub sda: NodeId,
    pub algebra: NodeId,
    pub geometry: NodeId,
    pub sda_ca: NodeId,
    pub eu: NodeId,
    pub lt: NodeId,
    pub level: NodeId,
}

fn child(taxonomy: &mut Taxonomy, parent: NodeId, kind: NodeKind, fields: NodeFields) -> NodeId {
    taxonomy
        .insert_child(parent, kind, fields)
        .expect("fixture node should insert")
}

/// One school owned by `owner`, everything private:
///
/// ```text
/// North High (1)
/// ├── Mathematics (2)
/// │   ├── Statistics (4)            subdiscipline
/// │   │   └── Probability (7)
/// │   ├── Algebra (5)
/// │   │   ├── Variables represent quantities (8)
/// │   │   │   └── Solve linear equations (9)
/// │   │   └── Algebra apprentice (10)  level
/// │   └── Geometry (6)
/// └── English (3)
/// ```
pub(crate) fn sample() -> Sample {
    let mut taxonomy = Taxonomy::new();
    let owner = ActorId::new("owner");
    let school = taxonomy.insert_school("North High", owner.clone());
    taxonomy
        .grant_school_raw(&owner, school)
        .expect("fixture grant should apply");

    let math = child(&mut taxonomy, school, NodeKind::SubjectArea, NodeFields::labeled("Mathematics"));
    let english = child(&mut taxonomy, school, NodeKind::SubjectArea, NodeFields::labeled("English"));
    let sda = child(
        &mut taxonomy,
        math,
        NodeKind::SubdisciplineArea,
        NodeFields::labeled("Statistics"),
    );
    let algebra = child(&mut taxonomy, math, NodeKind::CompetencyArea, NodeFields::labeled("Algebra"));
    let geometry = child(&mut taxonomy, math, NodeKind::CompetencyArea, NodeFields::labeled("Geometry"));
    let sda_ca = child(&mut taxonomy, sda, NodeKind::CompetencyArea, NodeFields::labeled("Probability"));
    let eu = child(
        &mut taxonomy,
        algebra,
        NodeKind::EssentialUnderstanding,
        NodeFields::labeled("Variables represent quantities"),
    );
    let lt = child(
        &mut taxonomy,
        eu,
        NodeKind::LearningTarget,
        NodeFields::labeled("Solve linear equations"),
    );
    let level = child(
        &mut taxonomy,
        algebra,
        NodeKind::Level,
        NodeFields::labeled("Algebra apprentice").with_level_type(LevelType::Apprentice),
    );

    Sample {
        taxonomy,
        school,
        math,
        english,
        sda,
        algebra,
        geometry,
        sda_ca,
        eu,
        lt,
        level,
    }
}
