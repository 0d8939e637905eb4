use opencomp_kernel::{Actor, Node, NodeBody, NodeId, Taxonomy, TaxonomyError};
use opencomp_store::{AtomicStoreMutationError, TaxonomyStore, mutate_taxonomy_jsonl};
use serde_json::{Value, json};
use std::fmt::Display;
use std::path::PathBuf;

/// Resolved invocation settings shared by every command.
#[derive(Debug, Clone)]
pub struct Ctx {
    pub store_path: PathBuf,
    pub actor: Actor,
    pub json: bool,
    pub expect_snapshot: Option<String>,
}

impl Ctx {
    pub fn store_display(&self) -> String {
        self.store_path.display().to_string()
    }
}

/// Print `message` (or a JSON error payload) and exit with status 1.
pub fn fail(ctx: &Ctx, action: &str, class: &str, message: impl Display) -> ! {
    if ctx.json {
        let payload = json!({
            "action": action,
            "storePath": ctx.store_display(),
            "error": {
                "class": class,
                "message": message.to_string()
            }
        });
        print_json(&payload);
    } else {
        eprintln!("error: {message}");
    }
    std::process::exit(1);
}

pub fn fail_taxonomy(ctx: &Ctx, action: &str, err: TaxonomyError) -> ! {
    fail(ctx, action, err.class(), err)
}

pub fn print_json(payload: &Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(payload).expect("json serialization")
    );
}

/// Load the store for a read. A missing store reads as empty.
pub fn load_store_or_exit(ctx: &Ctx, action: &str) -> TaxonomyStore {
    TaxonomyStore::load_jsonl_or_empty(&ctx.store_path).unwrap_or_else(|e| {
        fail(
            ctx,
            action,
            "store",
            format!("failed to load {}: {e}", ctx.store_display()),
        )
    })
}

/// Run one lock-scoped edit. `edit` returns `(value, changed)`; only a
/// successful change is written.
pub fn mutate_or_exit<T>(
    ctx: &Ctx,
    action: &str,
    edit: impl FnOnce(&mut Taxonomy) -> Result<(T, bool), TaxonomyError>,
) -> T {
    let result = mutate_taxonomy_jsonl(&ctx.store_path, ctx.expect_snapshot.as_deref(), |store| {
        edit(store.taxonomy_mut())
    });
    match result {
        Ok(value) => value,
        Err(AtomicStoreMutationError::Mutation(err)) => fail_taxonomy(ctx, action, err),
        Err(err) => {
            let class = err.class();
            fail(ctx, action, class, err)
        }
    }
}

pub fn ids_json(ids: &[NodeId]) -> Value {
    json!(ids.iter().map(|id| id.0).collect::<Vec<_>>())
}

pub fn node_json(node: &Node) -> Value {
    let mut value = json!({
        "id": node.id.0,
        "kind": node.kind().as_str(),
        "label": node.label,
        "public": node.public,
        "parent": node.parent_id().map(|id| id.0),
        "description": node.description,
        "updatedAt": node.updated_at.to_rfc3339(),
    });
    if node.kind().supports_student_friendly() {
        value["studentFriendly"] = json!(node.student_friendly);
    }
    match &node.body {
        NodeBody::School {
            owner,
            alias_ca,
            alias_eu,
        } => {
            value["owner"] = json!(owner.0);
            value["aliases"] = json!({
                "competencyArea": alias_ca,
                "essentialUnderstanding": alias_eu
            });
        }
        NodeBody::CompetencyArea {
            subject_area,
            subdiscipline_area,
        } => {
            value["subjectArea"] = json!(subject_area.0);
            value["subdisciplineArea"] = json!(subdiscipline_area.map(|id| id.0));
        }
        NodeBody::Level { level_type, .. } => {
            value["levelType"] = json!(level_type.as_str());
        }
        _ => {}
    }
    value
}

/// One-line text form: `[id] kind label (public|private)`.
pub fn node_line(node: &Node) -> String {
    let state = if node.public { "public" } else { "private" };
    format!("[{}] {} {} ({state})", node.id, node.kind(), node.label)
}
