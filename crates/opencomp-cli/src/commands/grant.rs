use crate::cli::GrantCommands;
use crate::support::{Ctx, mutate_or_exit, print_json};
use opencomp_kernel::{ActorId, NodeId, gate};
use serde_json::json;

pub fn run(ctx: &Ctx, command: GrantCommands) {
    let (action, scope, user, target) = match command {
        GrantCommands::School { user, school } => ("grant.school", "school", user, NodeId(school)),
        GrantCommands::SubjectArea { user, subject_area } => (
            "grant.subject_area",
            "subject_area",
            user,
            NodeId(subject_area),
        ),
    };
    let grantee = ActorId::new(user);

    let changed = mutate_or_exit(ctx, action, |t| {
        let changed = if scope == "school" {
            gate::grant_school(t, &ctx.actor, &grantee, target)?
        } else {
            gate::grant_subject_area(t, &ctx.actor, &grantee, target)?
        };
        Ok((changed, changed))
    });

    if ctx.json {
        print_json(&json!({
            "action": action,
            "storePath": ctx.store_display(),
            "grantee": grantee.0,
            "scope": scope,
            "target": target.0,
            "changed": changed
        }));
    } else {
        println!(
            "opencomp grant {}\n  Grantee: {grantee}\n  Target: {scope} {target}\n  Changed: {}",
            scope.replace('_', "-"),
            if changed { "yes" } else { "no" }
        );
    }
}
