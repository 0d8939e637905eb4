use opencomp_store::store_lock_path;
use serde_json::Value;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "opencomp-cli-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn run_opencomp_in<I, S>(dir: &Path, args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = env!("CARGO_BIN_EXE_opencomp");
    Command::new(bin)
        .current_dir(dir)
        .env_remove("OPENCOMP_LOG")
        .args(args)
        .output()
        .expect("opencomp command should execute")
}

/// Run against `store` as `actor` (anonymous when `None`) with JSON output.
fn run_json(store: &Path, actor: Option<&str>, args: &[&str]) -> Output {
    let dir = store.parent().expect("store should have a parent dir");
    let mut full = vec![
        "--store".to_string(),
        store.display().to_string(),
        "--json".to_string(),
    ];
    if let Some(actor) = actor {
        full.push("--as".to_string());
        full.push(actor.to_string());
    }
    full.extend(args.iter().map(|arg| arg.to_string()));
    run_opencomp_in(dir, full)
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "command failed with status {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn assert_failure(output: &Output) {
    if output.status.success() {
        panic!(
            "command unexpectedly succeeded\nstdout:\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn parse_json_stdout(output: &Output) -> Value {
    serde_json::from_slice::<Value>(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "expected valid JSON stdout, got error: {e}\nstdout:\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

fn ok_json(store: &Path, actor: Option<&str>, args: &[&str]) -> Value {
    let out = run_json(store, actor, args);
    assert_success(&out);
    parse_json_stdout(&out)
}

fn err_class(store: &Path, actor: Option<&str>, args: &[&str]) -> String {
    let out = run_json(store, actor, args);
    assert_failure(&out);
    let payload = parse_json_stdout(&out);
    payload["error"]["class"]
        .as_str()
        .expect("error class should be a string")
        .to_string()
}

/// School 1 "Oak" owned by olive, subject area 2 "Math", competency areas
/// 3 "C1", 4 "C2", 5 "C3".
fn seed(store: &Path) {
    let school = ok_json(store, Some("olive"), &["school", "add", "Oak"]);
    assert_eq!(school["school"]["id"], 1);
    assert_eq!(school["school"]["owner"], "olive");
    assert_eq!(school["school"]["public"], false);

    let sa = ok_json(store, Some("olive"), &["node", "add", "1", "sa", "Math"]);
    assert_eq!(sa["node"]["id"], 2);
    assert_eq!(sa["node"]["kind"], "subject_area");

    for (label, id) in [("C1", 3), ("C2", 4), ("C3", 5)] {
        let ca = ok_json(store, Some("olive"), &["node", "add", "2", "ca", label]);
        assert_eq!(ca["node"]["id"], id);
        assert_eq!(ca["node"]["subjectArea"], 2);
    }
}

#[test]
fn school_add_writes_store_and_lists_in_text() {
    let tmp = TempDirGuard::new("school-add");
    let store = tmp.path().join("taxonomy.jsonl");

    let out = run_opencomp_in(
        tmp.path(),
        [
            OsStr::new("--store"),
            store.as_os_str(),
            OsStr::new("--as"),
            OsStr::new("olive"),
            OsStr::new("school"),
            OsStr::new("add"),
            OsStr::new("Oak"),
        ],
    );
    assert_success(&out);
    let text = stdout_text(&out);
    assert!(text.contains("opencomp school add"), "stdout:\n{text}");
    assert!(text.contains("[1] school Oak (private)"), "stdout:\n{text}");
    assert!(store.exists(), "store should be written");

    let listed = ok_json(&store, None, &["school", "list"]);
    assert_eq!(listed["count"], 1);
    assert_eq!(listed["items"][0]["label"], "Oak");
}

#[test]
fn anonymous_school_add_is_rejected() {
    let tmp = TempDirGuard::new("anon-school");
    let store = tmp.path().join("taxonomy.jsonl");
    assert_eq!(err_class(&store, None, &["school", "add", "Oak"]), "unauthenticated");
    assert!(!store.exists(), "rejected edit should not create the store");
}

#[test]
fn publishing_requires_a_public_parent() {
    let tmp = TempDirGuard::new("publish");
    let store = tmp.path().join("taxonomy.jsonl");
    seed(&store);

    assert_eq!(
        err_class(&store, Some("olive"), &["visibility", "set", "3", "public"]),
        "parent_not_public"
    );

    let sa = ok_json(&store, Some("olive"), &["visibility", "set", "2", "public"]);
    assert_eq!(sa["changed"], serde_json::json!([2]));
    let ca = ok_json(&store, Some("olive"), &["visibility", "set", "3", "public"]);
    assert_eq!(ca["changed"], serde_json::json!([3]));

    let shown = ok_json(&store, None, &["node", "show", "2"]);
    assert_eq!(shown["node"]["public"], true);
    assert_eq!(shown["canEdit"], false);
}

#[test]
fn cascade_public_and_private_cascade() {
    let tmp = TempDirGuard::new("cascade");
    let store = tmp.path().join("taxonomy.jsonl");
    seed(&store);

    let up = ok_json(
        &store,
        Some("olive"),
        &["visibility", "set", "4", "cascade-public"],
    );
    assert_eq!(up["changed"], serde_json::json!([1, 2, 4]));

    let down = ok_json(&store, Some("olive"), &["visibility", "set", "2", "private"]);
    assert_eq!(down["changed"], serde_json::json!([2, 4]));

    let school = ok_json(&store, None, &["school", "show", "1"]);
    assert_eq!(school["school"]["public"], true);
}

#[test]
fn anonymous_children_listing_hides_private_nodes() {
    let tmp = TempDirGuard::new("children");
    let store = tmp.path().join("taxonomy.jsonl");
    seed(&store);
    ok_json(
        &store,
        Some("olive"),
        &["visibility", "set", "4", "cascade-public"],
    );

    let anon = ok_json(&store, None, &["node", "children", "2", "ca"]);
    assert_eq!(anon["count"], 1);
    assert_eq!(anon["items"][0]["label"], "C2");

    let owner = ok_json(&store, Some("olive"), &["node", "children", "2", "ca"]);
    assert_eq!(owner["count"], 3);

    assert_eq!(err_class(&store, None, &["node", "show", "3"]), "not_found");
}

#[test]
fn order_move_swaps_neighbours_and_stops_at_the_edges() {
    let tmp = TempDirGuard::new("order");
    let store = tmp.path().join("taxonomy.jsonl");
    seed(&store);

    let moved = ok_json(&store, Some("olive"), &["order", "move", "2", "4", "up"]);
    assert_eq!(moved["order"], serde_json::json!([4, 3, 5]));
    assert_eq!(moved["changed"], true);

    let top = ok_json(&store, Some("olive"), &["order", "move", "2", "4", "up"]);
    assert_eq!(top["order"], serde_json::json!([4, 3, 5]));
    assert_eq!(top["changed"], false);

    let bottom = ok_json(&store, Some("olive"), &["order", "move", "2", "5", "down"]);
    assert_eq!(bottom["changed"], false);

    let got = ok_json(&store, None, &["order", "get", "2", "ca"]);
    assert_eq!(got["order"], serde_json::json!([4, 3, 5]));

    let set = ok_json(
        &store,
        Some("olive"),
        &["order", "set", "2", "ca", "5", "4", "3"],
    );
    assert_eq!(set["order"], serde_json::json!([5, 4, 3]));

    assert_eq!(
        err_class(&store, Some("olive"), &["order", "set", "2", "ca", "5", "4"]),
        "invalid_order"
    );

    let updated = ok_json(
        &store,
        Some("olive"),
        &["node", "update", "4", "--label", "C2 renamed"],
    );
    assert_eq!(updated["changed"], true);
    let got = ok_json(&store, None, &["order", "get", "2", "ca"]);
    assert_eq!(got["order"], serde_json::json!([5, 4, 3]));
}

#[test]
fn subject_area_grant_scopes_editing() {
    let tmp = TempDirGuard::new("grant");
    let store = tmp.path().join("taxonomy.jsonl");
    seed(&store);
    ok_json(&store, Some("olive"), &["node", "add", "1", "sa", "English"]);

    assert_eq!(
        err_class(&store, Some("sam"), &["grant", "subject-area", "sam", "2"]),
        "permission_denied"
    );

    let granted = ok_json(&store, Some("olive"), &["grant", "subject-area", "sam", "2"]);
    assert_eq!(granted["changed"], true);

    let math = ok_json(
        &store,
        Some("sam"),
        &["can-edit", "1", "--subject-area", "2"],
    );
    assert_eq!(math["canEdit"], true);
    let english = ok_json(
        &store,
        Some("sam"),
        &["can-edit", "1", "--subject-area", "6"],
    );
    assert_eq!(english["canEdit"], false);
    let school = ok_json(&store, Some("sam"), &["can-edit", "1"]);
    assert_eq!(school["canEdit"], false);

    ok_json(&store, Some("sam"), &["node", "add", "2", "ca", "C4"]);
    assert_eq!(
        err_class(&store, Some("sam"), &["node", "add", "6", "ca", "Poetry"]),
        "permission_denied"
    );
}

#[test]
fn batch_visibility_is_applied_as_one_unit() {
    let tmp = TempDirGuard::new("batch");
    let store = tmp.path().join("taxonomy.jsonl");
    seed(&store);

    let batch = ok_json(
        &store,
        Some("olive"),
        &["visibility", "batch", "3=cascade-public", "5=cascade-public"],
    );
    assert_eq!(batch["changed"], serde_json::json!([1, 2, 3, 5]));

    let before = fs::read(&store).expect("store should be readable");
    assert_eq!(
        err_class(&store, Some("olive"), &["visibility", "batch", "3=private", "99=public"]),
        "not_found"
    );
    let after = fs::read(&store).expect("store should be readable");
    assert_eq!(before, after, "failed batch should leave the store untouched");

    assert_eq!(
        err_class(&store, Some("olive"), &["visibility", "batch", "nonsense"]),
        "invalid_arguments"
    );
}

#[test]
fn summary_renders_text_and_json() {
    let tmp = TempDirGuard::new("summary");
    let store = tmp.path().join("taxonomy.jsonl");
    ok_json(&store, Some("olive"), &["school", "add", "Oak"]);
    ok_json(&store, Some("olive"), &["node", "add", "1", "sa", "Math"]);
    ok_json(&store, Some("olive"), &["node", "add", "2", "ca", "Algebra"]);
    ok_json(&store, Some("olive"), &["node", "add", "3", "eu", "Variables"]);

    let out = run_opencomp_in(
        tmp.path(),
        [
            OsStr::new("--store"),
            store.as_os_str(),
            OsStr::new("--as"),
            OsStr::new("olive"),
            OsStr::new("summary"),
            OsStr::new("2"),
        ],
    );
    assert_success(&out);
    let expected = [
        "Oak",
        "Math",
        "",
        "Competency Area | Essential Understanding",
        "Algebra         |",
        "                | Variables",
        "",
    ]
    .join("\n");
    assert_eq!(stdout_text(&out), expected);

    let json = ok_json(&store, Some("olive"), &["summary", "2"]);
    assert_eq!(json["summary"]["rows"][0]["row"], "competency_area");
    assert_eq!(json["summary"]["rows"][1]["label"], "Variables");

    assert_eq!(err_class(&store, None, &["summary", "2"]), "not_found");
}

#[test]
fn pathway_selection_follows_the_hierarchy() {
    let tmp = TempDirGuard::new("pathway");
    let store = tmp.path().join("taxonomy.jsonl");
    seed(&store);

    let added = ok_json(&store, Some("olive"), &["pathway", "add", "1", "STEM"]);
    assert_eq!(added["pathway"]["school"], 1);
    let pathway = added["pathway"]["id"]
        .as_u64()
        .expect("pathway id should be numeric")
        .to_string();

    let empty = ok_json(&store, Some("olive"), &["pathway", "candidates", &pathway, "ca"]);
    assert_eq!(empty["candidates"], serde_json::json!([]));
    assert_eq!(
        err_class(&store, Some("olive"), &["pathway", "select", &pathway, "3"]),
        "invalid_selection"
    );

    ok_json(&store, Some("olive"), &["pathway", "select", &pathway, "2"]);
    let cas = ok_json(&store, Some("olive"), &["pathway", "candidates", &pathway, "ca"]);
    assert_eq!(cas["candidates"], serde_json::json!([3, 4, 5]));
    ok_json(&store, Some("olive"), &["pathway", "select", &pathway, "3"]);

    let shown = ok_json(&store, Some("olive"), &["pathway", "show", &pathway]);
    assert_eq!(shown["pathway"]["selectedCount"], 2);
    let hidden = ok_json(&store, None, &["pathway", "show", &pathway]);
    assert_eq!(hidden["nodes"], serde_json::json!([]));

    let pruned = ok_json(&store, Some("olive"), &["pathway", "deselect", &pathway, "2"]);
    assert_eq!(pruned["pathway"]["selectedCount"], 0);
}

#[test]
fn lock_busy_rejects_edits() {
    let tmp = TempDirGuard::new("lock");
    let store = tmp.path().join("taxonomy.jsonl");
    seed(&store);

    let lock_path = store_lock_path(&store);
    fs::write(&lock_path, "busy\n").expect("lock file should be created");

    let out = run_opencomp_in(
        tmp.path(),
        [
            OsStr::new("--store"),
            store.as_os_str(),
            OsStr::new("--as"),
            OsStr::new("olive"),
            OsStr::new("node"),
            OsStr::new("add"),
            OsStr::new("2"),
            OsStr::new("ca"),
            OsStr::new("C4"),
        ],
    );
    assert_failure(&out);
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(
        stderr.contains("taxonomy store lock busy"),
        "expected lock-busy stderr, got:\n{stderr}"
    );

    assert_eq!(
        err_class(&store, Some("olive"), &["node", "add", "2", "ca", "C4"]),
        "lock_busy"
    );

    let listed = ok_json(&store, Some("olive"), &["node", "children", "2", "ca"]);
    assert_eq!(listed["count"], 3, "reads do not take the lock");
}

#[test]
fn stale_snapshot_is_rejected() {
    let tmp = TempDirGuard::new("snapshot");
    let store = tmp.path().join("taxonomy.jsonl");
    seed(&store);

    let check = ok_json(&store, None, &["check"]);
    let snapshot = check["snapshotRef"]
        .as_str()
        .expect("snapshot ref should be a string")
        .to_string();
    assert!(snapshot.starts_with("ocs1_"));

    ok_json(
        &store,
        Some("olive"),
        &["--expect-snapshot", &snapshot, "node", "add", "2", "ca", "C4"],
    );
    assert_eq!(
        err_class(
            &store,
            Some("olive"),
            &["--expect-snapshot", &snapshot, "node", "add", "2", "ca", "C5"],
        ),
        "snapshot_mismatch"
    );
}

#[test]
fn check_repairs_drifted_order_lists() {
    let tmp = TempDirGuard::new("check");
    let store = tmp.path().join("taxonomy.jsonl");
    seed(&store);

    let raw = fs::read_to_string(&store).expect("store should be readable");
    let drifted = raw.replace("\"ids\":[3,4,5]", "\"ids\":[5,99,3]");
    assert_ne!(raw, drifted, "fixture should contain the competency-area order");
    fs::write(&store, drifted).expect("store should be rewritten");

    let report = ok_json(&store, None, &["check"]);
    assert_eq!(report["count"], 1);
    assert_eq!(report["drift"][0]["stale"], serde_json::json!([99]));
    assert_eq!(report["drift"][0]["missing"], serde_json::json!([4]));

    let repaired = ok_json(&store, None, &["check", "--repair"]);
    assert_eq!(repaired["repaired"], true);

    let clean = ok_json(&store, None, &["check"]);
    assert_eq!(clean["count"], 0);
    let order = ok_json(&store, None, &["order", "get", "2", "ca"]);
    assert_eq!(order["order"], serde_json::json!([5, 3, 4]));
}

#[test]
fn config_file_supplies_store_and_actor() {
    let tmp = TempDirGuard::new("config");
    let config_dir = tmp.path().join(".opencomp");
    fs::create_dir_all(&config_dir).expect("config dir should be created");
    fs::write(
        config_dir.join("config.toml"),
        "store = \"school.jsonl\"\nactor = \"olive\"\n",
    )
    .expect("config should be written");

    let out = run_opencomp_in(tmp.path(), ["--json", "school", "add", "Oak"]);
    assert_success(&out);
    let payload = parse_json_stdout(&out);
    assert_eq!(payload["school"]["owner"], "olive");
    assert!(tmp.path().join("school.jsonl").exists());

    let other = run_opencomp_in(tmp.path(), ["--json", "--as", "sam", "can-edit", "1"]);
    assert_success(&other);
    assert_eq!(parse_json_stdout(&other)["canEdit"], false);

    fs::write(config_dir.join("config.toml"), "colour = \"blue\"\n")
        .expect("config should be rewritten");
    let bad = run_opencomp_in(tmp.path(), ["school", "list"]);
    assert_failure(&bad);
    let stderr = String::from_utf8_lossy(&bad.stderr);
    assert!(stderr.contains("invalid config"), "stderr:\n{stderr}");
}
