use crate::support::{Ctx, fail_taxonomy, load_store_or_exit, print_json};
use opencomp_kernel::{NodeId, NodeKind, gate};
use serde_json::json;

pub fn run(ctx: &Ctx, school: u64, subject_area: Option<u64>) {
    let action = "can_edit";
    let store = load_store_or_exit(ctx, action);
    let taxonomy = store.taxonomy();
    let school = NodeId(school);
    let subject_area = subject_area.map(NodeId);

    gate::get_node(taxonomy, NodeKind::School, school)
        .unwrap_or_else(|e| fail_taxonomy(ctx, action, e));
    if let Some(sa) = subject_area {
        gate::get_node(taxonomy, NodeKind::SubjectArea, sa)
            .unwrap_or_else(|e| fail_taxonomy(ctx, action, e));
    }
    let allowed = gate::can_edit(taxonomy, &ctx.actor, school, subject_area);

    if ctx.json {
        print_json(&json!({
            "action": action,
            "storePath": ctx.store_display(),
            "actor": ctx.actor.to_string(),
            "school": school.0,
            "subjectArea": subject_area.map(|id| id.0),
            "canEdit": allowed
        }));
    } else {
        println!("opencomp can-edit {school}");
        println!("  Actor: {}", ctx.actor);
        if let Some(sa) = subject_area {
            println!("  Subject area: {sa}");
        }
        println!("  Can edit: {}", if allowed { "yes" } else { "no" });
    }
}
