use crate::cli::{KindArg, LevelTypeArg, NodeCommands};
use crate::support::{
    Ctx, fail, fail_taxonomy, load_store_or_exit, mutate_or_exit, node_json, node_line,
    print_json,
};
use opencomp_kernel::{NodeFields, NodeId, NodeKind, gate};
use serde_json::json;

pub fn run(ctx: &Ctx, command: NodeCommands) {
    match command {
        NodeCommands::Add {
            parent,
            kind,
            label,
            description,
            student_friendly,
            level_type,
        } => run_add(
            ctx,
            NodeId(parent),
            kind,
            fields(Some(label), description, student_friendly, level_type),
        ),

        NodeCommands::Show { id } => run_show(ctx, NodeId(id)),

        NodeCommands::Update {
            id,
            label,
            description,
            student_friendly,
            level_type,
        } => run_update(
            ctx,
            NodeId(id),
            fields(label, description, student_friendly, level_type),
        ),

        NodeCommands::Children { parent, kind } => run_children(ctx, NodeId(parent), kind),
    }
}

fn fields(
    label: Option<String>,
    description: Option<String>,
    student_friendly: Option<String>,
    level_type: Option<LevelTypeArg>,
) -> NodeFields {
    NodeFields {
        label,
        description,
        student_friendly,
        level_type: level_type.map(Into::into),
    }
}

fn run_add(ctx: &Ctx, parent: NodeId, kind: KindArg, fields: NodeFields) {
    let action = "node.add";
    let kind = NodeKind::from(kind);
    let node = mutate_or_exit(ctx, action, |t| {
        let id = gate::create_node(t, &ctx.actor, parent, kind, fields)?;
        Ok((t.node(id)?.clone(), true))
    });

    if ctx.json {
        print_json(&json!({
            "action": action,
            "storePath": ctx.store_display(),
            "node": node_json(&node)
        }));
    } else {
        println!(
            "opencomp node add\n  Added: {}\n  Parent: {parent}\n  Store: {}",
            node_line(&node),
            ctx.store_display()
        );
    }
}

fn run_show(ctx: &Ctx, id: NodeId) {
    let action = "node.show";
    let store = load_store_or_exit(ctx, action);
    let taxonomy = store.taxonomy();
    let node = gate::view_node(taxonomy, id, &ctx.actor)
        .unwrap_or_else(|e| fail_taxonomy(ctx, action, e));
    let editable = taxonomy
        .can_edit_node(&ctx.actor, id)
        .unwrap_or_else(|e| fail_taxonomy(ctx, action, e));
    let ancestors = taxonomy
        .ancestors(id)
        .unwrap_or_else(|e| fail_taxonomy(ctx, action, e));

    if ctx.json {
        print_json(&json!({
            "action": action,
            "storePath": ctx.store_display(),
            "node": node_json(node),
            "canEdit": editable,
            "ancestors": ancestors.iter().map(|id| id.0).collect::<Vec<_>>()
        }));
    } else {
        println!("opencomp node show {id}");
        println!("  {}", node_line(node));
        if !node.description.is_empty() {
            println!("  Description: {}", node.description);
        }
        if !node.student_friendly.is_empty() {
            println!("  Student friendly: {}", node.student_friendly);
        }
        let path = ancestors
            .iter()
            .rev()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" > ");
        if !path.is_empty() {
            println!("  Path: {path}");
        }
        println!("  Editable: {}", if editable { "yes" } else { "no" });
    }
}

fn run_update(ctx: &Ctx, id: NodeId, fields: NodeFields) {
    let action = "node.update";
    if fields.is_empty() {
        fail(ctx, action, "invalid_arguments", "nothing to update");
    }
    let (node, changed) = mutate_or_exit(ctx, action, |t| {
        let changed = gate::update_node(t, &ctx.actor, id, fields)?;
        Ok(((t.node(id)?.clone(), changed), changed))
    });

    if ctx.json {
        print_json(&json!({
            "action": action,
            "storePath": ctx.store_display(),
            "changed": changed,
            "node": node_json(&node)
        }));
    } else {
        println!(
            "opencomp node update {id}\n  {}\n  Changed: {}",
            node_line(&node),
            if changed { "yes" } else { "no" }
        );
    }
}

fn run_children(ctx: &Ctx, parent: NodeId, kind: KindArg) {
    let action = "node.children";
    let kind = NodeKind::from(kind);
    let store = load_store_or_exit(ctx, action);
    let children = gate::list_children(store.taxonomy(), parent, kind, &ctx.actor)
        .unwrap_or_else(|e| fail_taxonomy(ctx, action, e));

    if ctx.json {
        let items = children.iter().map(|node| node_json(node)).collect::<Vec<_>>();
        print_json(&json!({
            "action": action,
            "storePath": ctx.store_display(),
            "parent": parent.0,
            "kind": kind.as_str(),
            "count": items.len(),
            "items": items
        }));
    } else {
        println!("opencomp node children {parent} {kind}");
        println!("  Count: {}", children.len());
        for child in children {
            println!("  {}", node_line(child));
        }
    }
}
