use crate::cli::{KindArg, PathwayCommands};
use crate::support::{
    Ctx, fail_taxonomy, ids_json, load_store_or_exit, mutate_or_exit, node_json, node_line,
    print_json,
};
use opencomp_kernel::{NodeId, NodeKind, Pathway, PathwayId, gate};
use serde_json::json;

pub fn run(ctx: &Ctx, command: PathwayCommands) {
    match command {
        PathwayCommands::Add { school, name } => run_add(ctx, NodeId(school), name),
        PathwayCommands::Select { pathway, node } => {
            run_selection(ctx, "pathway.select", PathwayId(pathway), NodeId(node), true)
        }
        PathwayCommands::Deselect { pathway, node } => {
            run_selection(ctx, "pathway.deselect", PathwayId(pathway), NodeId(node), false)
        }
        PathwayCommands::Show { pathway } => run_show(ctx, PathwayId(pathway)),
        PathwayCommands::Candidates { pathway, kind } => {
            run_candidates(ctx, PathwayId(pathway), kind)
        }
    }
}

fn pathway_json(pathway: &Pathway) -> serde_json::Value {
    let ids = |set: &std::collections::BTreeSet<NodeId>| {
        ids_json(&set.iter().copied().collect::<Vec<_>>())
    };
    json!({
        "id": pathway.id.0,
        "name": pathway.name,
        "school": pathway.school.0,
        "selectedCount": pathway.selected_count(),
        "subjectAreas": ids(&pathway.subject_areas),
        "subdisciplineAreas": ids(&pathway.subdiscipline_areas),
        "competencyAreas": ids(&pathway.competency_areas),
        "essentialUnderstandings": ids(&pathway.essential_understandings),
        "learningTargets": ids(&pathway.learning_targets)
    })
}

fn run_add(ctx: &Ctx, school: NodeId, name: String) {
    let action = "pathway.add";
    let pathway = mutate_or_exit(ctx, action, |t| {
        let id = gate::create_pathway(t, &ctx.actor, school, name)?;
        Ok((t.pathway(id)?.clone(), true))
    });

    if ctx.json {
        print_json(&json!({
            "action": action,
            "storePath": ctx.store_display(),
            "pathway": pathway_json(&pathway)
        }));
    } else {
        println!(
            "opencomp pathway add\n  Added: [{}] {}\n  School: {school}\n  Store: {}",
            pathway.id,
            pathway.name,
            ctx.store_display()
        );
    }
}

fn run_selection(ctx: &Ctx, action: &str, id: PathwayId, node: NodeId, select: bool) {
    let (pathway, changed) = mutate_or_exit(ctx, action, |t| {
        let changed = if select {
            gate::select_pathway_node(t, &ctx.actor, id, node)?
        } else {
            gate::deselect_pathway_node(t, &ctx.actor, id, node)?
        };
        Ok(((t.pathway(id)?.clone(), changed), changed))
    });

    if ctx.json {
        print_json(&json!({
            "action": action,
            "storePath": ctx.store_display(),
            "node": node.0,
            "changed": changed,
            "pathway": pathway_json(&pathway)
        }));
    } else {
        println!(
            "opencomp {} {id} {node}\n  Selected: {}\n  Changed: {}",
            action.replace('.', " "),
            pathway.selected_count(),
            if changed { "yes" } else { "no" }
        );
    }
}

fn run_show(ctx: &Ctx, id: PathwayId) {
    let action = "pathway.show";
    let store = load_store_or_exit(ctx, action);
    let taxonomy = store.taxonomy();
    let pathway = taxonomy
        .pathway(id)
        .unwrap_or_else(|e| fail_taxonomy(ctx, action, e));
    let nodes = taxonomy
        .pathway_nodes(id, &ctx.actor)
        .unwrap_or_else(|e| fail_taxonomy(ctx, action, e));

    if ctx.json {
        print_json(&json!({
            "action": action,
            "storePath": ctx.store_display(),
            "pathway": pathway_json(pathway),
            "nodes": nodes.iter().map(|node| node_json(node)).collect::<Vec<_>>()
        }));
    } else {
        println!("opencomp pathway show {id}");
        println!("  Name: {}", pathway.name);
        println!("  School: {}", pathway.school);
        println!("  Visible selections: {}", nodes.len());
        for node in nodes {
            println!("  {}", node_line(node));
        }
    }
}

fn run_candidates(ctx: &Ctx, id: PathwayId, kind: KindArg) {
    let action = "pathway.candidates";
    let kind = NodeKind::from(kind);
    let store = load_store_or_exit(ctx, action);
    let candidates = store
        .taxonomy()
        .pathway_candidates(id, kind)
        .unwrap_or_else(|e| fail_taxonomy(ctx, action, e));

    if ctx.json {
        print_json(&json!({
            "action": action,
            "storePath": ctx.store_display(),
            "pathway": id.0,
            "kind": kind.as_str(),
            "candidates": ids_json(&candidates)
        }));
    } else {
        println!("opencomp pathway candidates {id} {kind}");
        println!("  Count: {}", candidates.len());
        for candidate in candidates {
            println!("    {candidate}");
        }
    }
}
