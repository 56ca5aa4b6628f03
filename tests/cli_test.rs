#[path = "common/mod.rs"]
mod common;

use common::BackofficeTest;
use serial_test::serial;

// ============================================================================
// Collections
// ============================================================================

#[test]
fn test_collections_lists_every_collection() {
    let bo = BackofficeTest::new();
    let output = bo.run_success(&["collections"]);
    for name in ["products", "categories", "brands", "vendors", "shops"] {
        assert!(output.contains(name), "missing {name} in:\n{output}");
    }
}

#[test]
fn test_collection_fields_as_json() {
    let bo = BackofficeTest::new();
    let json = bo.run_json(&["collections", "brands"]);
    assert_eq!(json["name"], "brands");
    let fields = json["fields"].as_array().unwrap();
    let name = fields.iter().find(|f| f["name"] == "name").unwrap();
    assert_eq!(name["required"], true);
    let logo = fields.iter().find(|f| f["name"] == "logo").unwrap();
    assert_eq!(logo["kind"], "image file");
}

#[test]
fn test_unknown_collection_fails() {
    let bo = BackofficeTest::new();
    let stderr = bo.run_failure(&["--offline", "ls", "widgets"]);
    assert!(stderr.contains("unknown collection 'widgets'"));
}

// ============================================================================
// Records (offline backend)
// ============================================================================

#[test]
fn test_offline_ls_last_page() {
    let bo = BackofficeTest::new();
    let json = bo.run_json(&["--offline", "ls", "products", "--page", "3"]);
    assert_eq!(json["current_page"], 3);
    assert_eq!(json["last_page"], 3);
    assert_eq!(json["total"], 25);
    assert_eq!(json["items"].as_array().unwrap().len(), 5);
}

#[test]
fn test_offline_ls_search() {
    let bo = BackofficeTest::new();
    let json = bo.run_json(&["--offline", "ls", "products", "-q", "product 07"]);
    let items = json["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["sku"], "SKU-0007");
}

#[test]
fn test_offline_ls_renders_table() {
    let bo = BackofficeTest::new();
    let output = bo.run_success(&["--offline", "ls", "brands"]);
    assert!(output.contains("Sunrise"));
    assert!(output.contains("Hilltop"));
}

#[test]
fn test_offline_show() {
    let bo = BackofficeTest::new();
    let json = bo.run_json(&["--offline", "show", "shops", "201"]);
    assert_eq!(json["id"], "201");
    assert_eq!(json["name"], "Lakshmi Stores");
}

#[test]
fn test_offline_create() {
    let bo = BackofficeTest::new();
    let json = bo.run_json(&["--offline", "create", "brands", "--set", "name=Riverside"]);
    assert_eq!(json["action"], "created");
    assert_eq!(json["record"]["name"], "Riverside");
}

#[test]
fn test_create_with_missing_fields_reports_them() {
    let bo = BackofficeTest::new();
    let stderr = bo.run_failure(&["--offline", "create", "products", "--set", "name=Green tea"]);
    assert!(stderr.contains("SKU is required"), "stderr was:\n{stderr}");
    assert!(stderr.contains("validation failed"));
}

#[test]
fn test_create_rejects_unknown_field() {
    let bo = BackofficeTest::new();
    let stderr = bo.run_failure(&["--offline", "create", "brands", "--set", "colour=red"]);
    assert!(stderr.contains("colour"));
}

#[test]
fn test_update_needs_changes() {
    let bo = BackofficeTest::new();
    let stderr = bo.run_failure(&["--offline", "update", "brands", "11"]);
    assert!(stderr.contains("nothing to update"));
}

#[test]
fn test_offline_update() {
    let bo = BackofficeTest::new();
    let json = bo.run_json(&["--offline", "edit", "brands", "11", "-s", "name=Sunrise Foods"]);
    assert_eq!(json["action"], "updated");
    assert_eq!(json["record"]["name"], "Sunrise Foods");
    assert_eq!(json["record"]["status"], "active");
}

#[test]
fn test_offline_rm() {
    let bo = BackofficeTest::new();
    let json = bo.run_json(&["--offline", "rm", "brands", "12"]);
    assert_eq!(json["action"], "deleted");
    assert_eq!(json["id"], "12");

    bo.run_failure(&["--offline", "rm", "brands", "999"]);
}

#[test]
fn test_offline_stock() {
    let bo = BackofficeTest::new();
    bo.run_success(&["--offline", "stock", "add", "501", "4", "--note", "opening"]);
    let json = bo.run_json(&["--offline", "stock", "ls", "501"]);
    // Each invocation gets a fresh offline backend.
    assert_eq!(json["current_stock"], 0);

    let stderr = bo.run_failure(&["--offline", "stock", "add", "501", "0"]);
    assert!(stderr.contains("quantity"));
}

// ============================================================================
// Session
// ============================================================================

#[test]
#[serial]
fn test_online_commands_need_login() {
    let bo = BackofficeTest::new();
    let stderr = bo.run_failure(&["ls", "products"]);
    assert!(stderr.contains("not logged in"));
}

#[test]
#[serial]
fn test_login_token_logout() {
    let bo = BackofficeTest::new();

    let json = bo.run_json(&["token"]);
    assert_eq!(json["logged_in"], false);

    bo.run_success(&["login", "secret-token-value"]);
    let json = bo.run_json(&["token"]);
    assert_eq!(json["logged_in"], true);
    assert_eq!(json["source"], "session file");
    let text = bo.run_success(&["token"]);
    assert!(!text.contains("secret-token-value"));

    let stderr = bo.run_failure(&["ls", "products"]);
    assert!(stderr.contains("base URL"), "stderr was:\n{stderr}");

    let json = bo.run_json(&["logout"]);
    assert_eq!(json["was_logged_in"], true);
    let json = bo.run_json(&["token"]);
    assert_eq!(json["logged_in"], false);
}

#[test]
#[serial]
fn test_login_refused_when_env_token_set() {
    let bo = BackofficeTest::new();
    let output = bo
        .command(&["login", "abc"])
        .env("BACKOFFICE_TOKEN", "from-env")
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("BACKOFFICE_TOKEN"));
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn test_config_set_and_get() {
    let bo = BackofficeTest::new();
    bo.run_success(&["config", "set", "list.per_page", "25"]);
    let output = bo.run_success(&["config", "get", "list.per_page"]);
    assert_eq!(output.trim(), "25");

    bo.run_success(&["config", "set", "api.base_url", "https://api.example.com/"]);
    let json = bo.run_json(&["config", "show"]);
    assert_eq!(json["values"]["api.base_url"], "https://api.example.com/");
    assert_eq!(json["values"]["list.per_page"], "25");
}

#[test]
fn test_config_rejects_bad_input() {
    let bo = BackofficeTest::new();
    bo.run_failure(&["config", "set", "nonsense.key", "1"]);
    bo.run_failure(&["config", "set", "list.per_page", "zero"]);
    bo.run_failure(&["config", "get", "nonsense.key"]);
}

#[test]
fn test_config_get_unset_value() {
    let bo = BackofficeTest::new();
    let stderr = bo.run_failure(&["config", "get", "auth.session_file"]);
    assert!(stderr.contains("auth.session_file not set"));
}

// ============================================================================
// Completions
// ============================================================================

#[test]
fn test_completions_bash() {
    let bo = BackofficeTest::new();
    let output = bo.run_success(&["completions", "bash"]);
    assert!(output.contains("backoffice"));
}
