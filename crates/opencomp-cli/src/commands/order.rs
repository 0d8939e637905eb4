use crate::cli::{DirectionArg, KindArg, OrderCommands};
use crate::support::{Ctx, fail_taxonomy, ids_json, load_store_or_exit, mutate_or_exit, print_json};
use opencomp_kernel::{Direction, NodeId, NodeKind, gate};
use serde_json::json;

pub fn run(ctx: &Ctx, command: OrderCommands) {
    match command {
        OrderCommands::Get { parent, kind } => run_get(ctx, NodeId(parent), kind.into()),
        OrderCommands::Set { parent, kind, ids } => run_set(
            ctx,
            NodeId(parent),
            kind,
            ids.into_iter().map(NodeId).collect(),
        ),
        OrderCommands::Move {
            parent,
            child,
            direction,
        } => run_move(ctx, NodeId(parent), NodeId(child), direction),
    }
}

fn run_get(ctx: &Ctx, parent: NodeId, kind: NodeKind) {
    let action = "order.get";
    let store = load_store_or_exit(ctx, action);
    let order = gate::get_order(store.taxonomy(), parent, kind)
        .unwrap_or_else(|e| fail_taxonomy(ctx, action, e));
    print_order(ctx, action, parent, kind, &order, None);
}

fn run_set(ctx: &Ctx, parent: NodeId, kind: KindArg, sequence: Vec<NodeId>) {
    let action = "order.set";
    let kind = NodeKind::from(kind);
    let (order, changed) = mutate_or_exit(ctx, action, |t| {
        let changed = gate::set_order(t, &ctx.actor, parent, kind, sequence)?;
        Ok(((t.get_order(parent, kind)?, changed), changed))
    });
    print_order(ctx, action, parent, kind, &order, Some(changed));
}

fn run_move(ctx: &Ctx, parent: NodeId, child: NodeId, direction: DirectionArg) {
    let action = "order.move";
    let direction = Direction::from(direction);
    let (order, kind, moved) = mutate_or_exit(ctx, action, |t| {
        let moved = gate::move_child(t, &ctx.actor, parent, child, direction)?;
        let kind = t.node(child)?.kind();
        Ok(((t.get_order(parent, kind)?, kind, moved), moved))
    });
    print_order(ctx, action, parent, kind, &order, Some(moved));
}

fn print_order(
    ctx: &Ctx,
    action: &str,
    parent: NodeId,
    kind: NodeKind,
    order: &[NodeId],
    changed: Option<bool>,
) {
    if ctx.json {
        let mut payload = json!({
            "action": action,
            "storePath": ctx.store_display(),
            "parent": parent.0,
            "kind": kind.as_str(),
            "order": ids_json(order)
        });
        if let Some(changed) = changed {
            payload["changed"] = json!(changed);
        }
        print_json(&payload);
    } else {
        println!("opencomp {} {parent} {kind}", action.replace('.', " "));
        let ids = order.iter().map(ToString::to_string).collect::<Vec<_>>();
        println!("  Order: [{}]", ids.join(", "));
        if let Some(changed) = changed {
            println!("  Changed: {}", if changed { "yes" } else { "no" });
        }
    }
}
