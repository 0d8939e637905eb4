use crate::support::{Ctx, fail_taxonomy, load_store_or_exit, print_json};
use opencomp_kernel::NodeId;
use serde_json::json;

pub fn run(ctx: &Ctx, subject_area: u64) {
    let action = "summary";
    let store = load_store_or_exit(ctx, action);
    let summary = store
        .taxonomy()
        .subject_area_summary(NodeId(subject_area), &ctx.actor)
        .unwrap_or_else(|e| fail_taxonomy(ctx, action, e));

    if ctx.json {
        print_json(&json!({
            "action": action,
            "storePath": ctx.store_display(),
            "subjectArea": subject_area,
            "summary": summary
        }));
    } else {
        print!("{}", summary.render_text());
    }
}
