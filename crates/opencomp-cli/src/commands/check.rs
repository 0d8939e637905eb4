use crate::support::{Ctx, fail, load_store_or_exit, print_json};
use opencomp_kernel::OrderDrift;
use opencomp_store::{StoreError, mutate_taxonomy_jsonl};
use serde_json::json;

/// Report order lists that drifted from the live children. With `repair`,
/// write the reconciled lists back.
pub fn run(ctx: &Ctx, repair: bool) {
    let action = if repair { "check.repair" } else { "check" };

    let (drift, snapshot_ref) = if repair {
        let result = mutate_taxonomy_jsonl(&ctx.store_path, ctx.expect_snapshot.as_deref(), |store| {
            let drift = store.repaired().to_vec();
            let snapshot_ref = store.snapshot_ref()?;
            let changed = !drift.is_empty();
            Ok::<_, StoreError>(((drift, snapshot_ref), changed))
        });
        result.unwrap_or_else(|err| {
            let class = err.class();
            fail(ctx, action, class, err)
        })
    } else {
        let store = load_store_or_exit(ctx, action);
        let snapshot_ref = store
            .snapshot_ref()
            .unwrap_or_else(|e| fail(ctx, action, "store", e));
        (store.repaired().to_vec(), snapshot_ref)
    };

    if ctx.json {
        print_json(&json!({
            "action": action,
            "storePath": ctx.store_display(),
            "count": drift.len(),
            "repaired": repair && !drift.is_empty(),
            "drift": drift,
            "snapshotRef": snapshot_ref
        }));
    } else {
        println!("opencomp check");
        println!("  Store: {}", ctx.store_display());
        println!("  Drifted order lists: {}", drift.len());
        for entry in &drift {
            println!("    {}", drift_line(entry));
        }
        if repair && !drift.is_empty() {
            println!("  Repaired: yes");
        }
        println!("  Snapshot: {snapshot_ref}");
    }
}

fn drift_line(drift: &OrderDrift) -> String {
    let ids = |list: &[opencomp_kernel::NodeId]| {
        list.iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    };
    format!(
        "{} {}: stale [{}] missing [{}] duplicates [{}]",
        drift.parent,
        drift.kind,
        ids(&drift.stale),
        ids(&drift.missing),
        ids(&drift.duplicates)
    )
}
