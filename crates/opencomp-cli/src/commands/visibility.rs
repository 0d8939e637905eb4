use crate::cli::{ModeArg, VisibilityCommands};
use crate::support::{Ctx, fail, ids_json, mutate_or_exit, print_json};
use opencomp_kernel::{NodeId, VisibilityChange, VisibilityMode, gate};
use serde_json::json;

pub fn run(ctx: &Ctx, command: VisibilityCommands) {
    match command {
        VisibilityCommands::Set { id, mode } => run_set(ctx, NodeId(id), mode),
        VisibilityCommands::Batch { changes } => run_batch(ctx, changes),
    }
}

fn run_set(ctx: &Ctx, id: NodeId, mode: ModeArg) {
    let action = "visibility.set";
    let mode = VisibilityMode::from(mode);
    let changed = mutate_or_exit(ctx, action, |t| {
        let changed = gate::set_visibility(t, &ctx.actor, id, mode)?;
        let dirty = !changed.is_empty();
        Ok((changed, dirty))
    });
    report(ctx, action, &changed, &format!("opencomp visibility set {id} {mode}"));
}

/// Parse `ID=MODE`.
fn parse_change(raw: &str) -> Result<VisibilityChange, String> {
    let (id, mode) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=MODE, got `{raw}`"))?;
    Ok(VisibilityChange::new(id.parse::<NodeId>()?, mode.parse::<VisibilityMode>()?))
}

fn run_batch(ctx: &Ctx, raw: Vec<String>) {
    let action = "visibility.batch";
    let changes = raw
        .iter()
        .map(|entry| parse_change(entry))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|e| fail(ctx, action, "invalid_arguments", e));

    let changed = mutate_or_exit(ctx, action, |t| {
        let changed = gate::set_visibility_batch(t, &ctx.actor, &changes)?;
        let dirty = !changed.is_empty();
        Ok((changed, dirty))
    });
    report(
        ctx,
        action,
        &changed,
        &format!("opencomp visibility batch ({} changes)", changes.len()),
    );
}

fn report(ctx: &Ctx, action: &str, changed: &[NodeId], heading: &str) {
    if ctx.json {
        print_json(&json!({
            "action": action,
            "storePath": ctx.store_display(),
            "count": changed.len(),
            "changed": ids_json(changed)
        }));
    } else {
        println!("{heading}");
        println!("  Changed: {}", changed.len());
        for id in changed {
            println!("    {id}");
        }
    }
}
