use crate::cli::SchoolCommands;
use crate::support::{
    Ctx, fail_taxonomy, load_store_or_exit, mutate_or_exit, node_json, node_line, print_json,
};
use opencomp_kernel::{NodeId, NodeKind, gate};
use serde_json::json;

pub fn run(ctx: &Ctx, command: SchoolCommands) {
    match command {
        SchoolCommands::Add { name } => run_add(ctx, name),
        SchoolCommands::List => run_list(ctx),
        SchoolCommands::Show { id } => run_show(ctx, NodeId(id)),
        SchoolCommands::Alias {
            id,
            competency_area,
            essential_understanding,
        } => run_alias(ctx, NodeId(id), competency_area, essential_understanding),
    }
}

fn run_add(ctx: &Ctx, name: String) {
    let action = "school.add";
    let school = mutate_or_exit(ctx, action, |t| {
        let id = gate::create_school(t, &ctx.actor, name)?;
        Ok((t.node(id)?.clone(), true))
    });

    if ctx.json {
        print_json(&json!({
            "action": action,
            "storePath": ctx.store_display(),
            "school": node_json(&school)
        }));
    } else {
        println!(
            "opencomp school add\n  Added: {}\n  Store: {}",
            node_line(&school),
            ctx.store_display()
        );
    }
}

fn run_list(ctx: &Ctx) {
    let action = "school.list";
    let store = load_store_or_exit(ctx, action);
    let schools = gate::list_schools(store.taxonomy());

    if ctx.json {
        let items = schools.iter().map(|node| node_json(node)).collect::<Vec<_>>();
        print_json(&json!({
            "action": action,
            "storePath": ctx.store_display(),
            "count": items.len(),
            "items": items
        }));
    } else {
        println!("opencomp school list");
        println!("  Count: {}", schools.len());
        for school in schools {
            println!("  {}", node_line(school));
        }
    }
}

fn run_show(ctx: &Ctx, id: NodeId) {
    let action = "school.show";
    let store = load_store_or_exit(ctx, action);
    let taxonomy = store.taxonomy();
    let school = gate::get_node(taxonomy, NodeKind::School, id)
        .unwrap_or_else(|e| fail_taxonomy(ctx, action, e));
    let subject_areas = gate::list_children(taxonomy, id, NodeKind::SubjectArea, &ctx.actor)
        .unwrap_or_else(|e| fail_taxonomy(ctx, action, e));
    let editable = gate::can_edit(taxonomy, &ctx.actor, id, None);

    if ctx.json {
        print_json(&json!({
            "action": action,
            "storePath": ctx.store_display(),
            "school": node_json(school),
            "canEdit": editable,
            "subjectAreas": subject_areas.iter().map(|node| node_json(node)).collect::<Vec<_>>()
        }));
    } else {
        println!("opencomp school show {id}");
        println!("  {}", node_line(school));
        println!("  Editable: {}", if editable { "yes" } else { "no" });
        for sa in subject_areas {
            println!("    {}", node_line(sa));
        }
    }
}

fn run_alias(
    ctx: &Ctx,
    id: NodeId,
    competency_area: Option<String>,
    essential_understanding: Option<String>,
) {
    let action = "school.alias";
    let (school, changed) = mutate_or_exit(ctx, action, |t| {
        let changed =
            gate::update_school_aliases(t, &ctx.actor, id, competency_area, essential_understanding)?;
        Ok(((t.node(id)?.clone(), changed), changed))
    });

    if ctx.json {
        print_json(&json!({
            "action": action,
            "storePath": ctx.store_display(),
            "changed": changed,
            "school": node_json(&school)
        }));
    } else {
        println!(
            "opencomp school alias {id}\n  Changed: {}",
            if changed { "yes" } else { "no" }
        );
    }
}
