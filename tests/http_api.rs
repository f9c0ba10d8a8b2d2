//! Black-box tests for the HTTP surface.
//!
//! Each test writes a settings document and a modules directory into a temp
//! workspace, stands up a real host on an ephemeral port, and talks to it
//! with a plain HTTP client.

use std::fs;

use reqwest::StatusCode;
use serde_json::{json, Value};
use tempfile::TempDir;

use apiary::config::Settings;
use apiary::modules::{discover_modules, RouteRegistry};
use apiary::server::build_router;

const SETTINGS: &str = r#"{ "apiSettings": { "creator": "Created Using Apiary UI" } }"#;

struct TestHost {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
    _workspace: TempDir,
}

impl TestHost {
    /// Run the same loading pipeline as `apiary serve` against a prepared
    /// workspace, bound to an ephemeral port.
    async fn spawn(workspace: TempDir) -> Self {
        let settings = Settings::load(&workspace.path().join("settings.json")).unwrap();
        let report = discover_modules(&workspace.path().join("modules"));

        let mut registry = RouteRegistry::new();
        for module in report.modules {
            // Conflicting modules are dropped, as in serve.
            let _ = registry.bind_module(module);
        }

        let app = build_router(settings, registry);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            handle,
            _workspace: workspace,
        }
    }
}

impl Drop for TestHost {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Build a workspace with the given settings document and module files.
fn workspace(settings: &str, modules: &[(&str, Value)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("settings.json"), settings).unwrap();

    let modules_dir = tmp.path().join("modules");
    fs::create_dir(&modules_dir).unwrap();
    for (file, manifest) in modules {
        let path = modules_dir.join(file);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, serde_json::to_string_pretty(manifest).unwrap()).unwrap();
    }
    tmp
}

fn ping_module() -> Value {
    json!({
        "name": "Ping",
        "desc": "Liveness probe",
        "path": "/ping",
        "method": "get",
        "author": "apiary",
        "category": "system",
        "handler": { "kind": "static", "body": { "message": "pong" } }
    })
}

fn echo_module() -> Value {
    json!({
        "name": "Echo",
        "desc": "Echo the request body",
        "path": "/echo",
        "method": "post",
        "author": "apiary",
        "category": "utility",
        "handler": { "kind": "echo", "merge": {} }
    })
}

fn util_module() -> Value {
    json!({
        "name": "Inspect",
        "desc": "Show request details",
        "path": "/util?verbose=1",
        "method": "get",
        "category": "utility",
        "handler": { "kind": "inspect" }
    })
}

#[tokio::test]
async fn ping_round_trip() {
    let srv = TestHost::spawn(workspace(SETTINGS, &[("ping.json", ping_module())])).await;

    let res = reqwest::get(format!("{}/api/ping", srv.base_url))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body,
        json!({
            "status": 200,
            "creator": "Created Using Apiary UI",
            "message": "pong"
        })
    );
}

#[tokio::test]
async fn echo_reflects_request_body() {
    let srv = TestHost::spawn(workspace(SETTINGS, &[("echo.json", echo_module())])).await;

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{}/api/echo", srv.base_url))
        .json(&json!({ "text": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body,
        json!({
            "status": 200,
            "creator": "Created Using Apiary UI",
            "text": "hi"
        })
    );
}

#[tokio::test]
async fn echo_module_can_pin_its_own_status() {
    let mut module = echo_module();
    module["handler"]["merge"] = json!({ "status": 201 });
    let srv = TestHost::spawn(workspace(SETTINGS, &[("echo.json", module)])).await;

    let client = reqwest::Client::new();
    let body: Value = client
        .post(format!("{}/api/echo", srv.base_url))
        .json(&json!({ "x": 1 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        body,
        json!({
            "status": 201,
            "creator": "Created Using Apiary UI",
            "x": 1
        })
    );
}

#[tokio::test]
async fn catalog_groups_routes_by_category() {
    // Discovery order is by file name: echo, ping, util. The first
    // category seen is utility, so it leads the catalog.
    let srv = TestHost::spawn(workspace(
        SETTINGS,
        &[
            ("ping.json", ping_module()),
            ("echo.json", echo_module()),
            ("util.json", util_module()),
        ],
    ))
    .await;

    let res = reqwest::get(format!("{}/api/info", srv.base_url))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], 200);
    assert_eq!(body["creator"], "Created Using Apiary UI");

    let categories = body["categories"].as_array().unwrap();
    assert_eq!(categories.len(), 2);

    assert_eq!(categories[0]["name"], "utility");
    let utility: Vec<&str> = categories[0]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["name"].as_str().unwrap())
        .collect();
    assert_eq!(utility, vec!["Echo", "Inspect"]);

    assert_eq!(categories[1]["name"], "system");
    assert_eq!(categories[1]["items"][0]["name"], "Ping");

    // Metadata defaults and display path survive into the catalog.
    let inspect = &categories[0]["items"][1];
    assert_eq!(inspect["author"], "unknown");
    assert_eq!(inspect["path"], "/api/util?verbose=1");
    assert_eq!(inspect["method"], "get");

    let ping = &categories[1]["items"][0];
    assert_eq!(ping["path"], "/api/ping");
}

#[tokio::test]
async fn invalid_modules_are_skipped_but_host_serves() {
    let tmp = workspace(SETTINGS, &[("ping.json", ping_module())]);
    fs::write(tmp.path().join("modules/broken.json"), "{ not json").unwrap();
    fs::write(
        tmp.path().join("modules/nohandler.json"),
        r#"{ "name": "NoHandler", "path": "/nohandler" }"#,
    )
    .unwrap();
    let srv = TestHost::spawn(tmp).await;

    let res = reqwest::get(format!("{}/api/ping", srv.base_url))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = reqwest::get(format!("{}/api/info", srv.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let categories = body["categories"].as_array().unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0]["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn conflicting_module_is_dropped() {
    let mut rival = ping_module();
    rival["name"] = json!("Rival");
    rival["handler"] = json!({ "kind": "static", "body": { "message": "intruder" } });

    // File names decide discovery order; "a_ping" loads first and wins.
    let srv = TestHost::spawn(workspace(
        SETTINGS,
        &[("a_ping.json", ping_module()), ("b_rival.json", rival)],
    ))
    .await;

    let body: Value = reqwest::get(format!("{}/api/ping", srv.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["message"], "pong");

    let info: Value = reqwest::get(format!("{}/api/info", srv.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let items = info["categories"][0]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "Ping");
}

#[tokio::test]
async fn query_parameters_reach_the_handler() {
    let srv = TestHost::spawn(workspace(SETTINGS, &[("util.json", util_module())])).await;

    let body: Value = reqwest::get(format!("{}/api/util?verbose=1&limit=2", srv.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["method"], "get");
    assert_eq!(body["path"], "/util");
    assert_eq!(body["query"]["verbose"], "1");
    assert_eq!(body["query"]["limit"], "2");
}

#[tokio::test]
async fn unknown_routes_get_the_not_found_body() {
    let srv = TestHost::spawn(workspace(SETTINGS, &[("ping.json", ping_module())])).await;
    let client = reqwest::Client::new();

    // A path no module claims.
    let res = reqwest::get(format!("{}/api/missing", srv.base_url))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], 404);
    assert_eq!(body["error"], "Not Found");

    // A known path with an unregistered method gets the same treatment.
    let res = client
        .post(format!("{}/api/ping", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], 404);

    // Outside /api as well.
    let res = reqwest::get(format!("{}/elsewhere", srv.base_url))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn settings_document_is_served_verbatim() {
    let doc = "{\n  \"apiSettings\": { \"creator\": \"Created Using Apiary UI\" },\n  \"theme\": \"dark\"\n}";
    let srv = TestHost::spawn(workspace(doc, &[])).await;

    let res = reqwest::get(format!("{}/settings.json", srv.base_url))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()["content-type"].to_str().unwrap(),
        "application/json"
    );

    let bytes = res.bytes().await.unwrap();
    assert_eq!(&bytes[..], doc.as_bytes());
}

#[tokio::test]
async fn handler_failure_returns_the_internal_error_body() {
    let module = json!({
        "name": "Report",
        "desc": "Serves a report that is not there",
        "path": "/report",
        "method": "get",
        "handler": { "kind": "json_file", "file": "missing.json" }
    });
    let srv = TestHost::spawn(workspace(SETTINGS, &[("report.json", module)])).await;

    let res = reqwest::get(format!("{}/api/report", srv.base_url))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], 500);
    assert_eq!(body["error"], "Internal Server Error");
}

#[tokio::test]
async fn json_file_handler_serves_documents_next_to_the_module() {
    let tmp = workspace(
        SETTINGS,
        &[(
            "reports/daily.json",
            json!({
                "name": "Daily",
                "desc": "Daily report",
                "path": "/reports/daily",
                "method": "get",
                "handler": { "kind": "json_file", "file": "data.json" }
            }),
        )],
    );
    fs::write(
        tmp.path().join("modules/reports/data.json"),
        r#"{ "rows": [1, 2, 3] }"#,
    )
    .unwrap();
    let srv = TestHost::spawn(tmp).await;

    let body: Value = reqwest::get(format!("{}/api/reports/daily", srv.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], 200);
    assert_eq!(body["rows"], json!([1, 2, 3]));
}

#[tokio::test]
async fn non_object_payloads_pass_through_unwrapped() {
    let module = json!({
        "name": "List",
        "desc": "A bare array payload",
        "path": "/list",
        "method": "get",
        "handler": { "kind": "static", "body": [1, 2, 3] }
    });
    let srv = TestHost::spawn(workspace(SETTINGS, &[("list.json", module)])).await;

    let res = reqwest::get(format!("{}/api/list", srv.base_url))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let bytes = res.bytes().await.unwrap();
    assert_eq!(&bytes[..], b"[1,2,3]");
}

#[tokio::test]
async fn payload_keys_override_the_envelope() {
    let module = json!({
        "name": "Custom",
        "desc": "Claims its own status and creator",
        "path": "/custom",
        "method": "get",
        "handler": {
            "kind": "static",
            "body": { "status": 201, "creator": "module itself", "ok": true }
        }
    });
    let srv = TestHost::spawn(workspace(SETTINGS, &[("custom.json", module)])).await;

    let body: Value = reqwest::get(format!("{}/api/custom", srv.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], 201);
    assert_eq!(body["creator"], "module itself");
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn creator_comes_from_the_settings_document() {
    let doc = r#"{ "apiSettings": { "creator": "Created Using Hive UI" } }"#;
    let srv = TestHost::spawn(workspace(doc, &[("ping.json", ping_module())])).await;

    let body: Value = reqwest::get(format!("{}/api/ping", srv.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["creator"], "Created Using Hive UI");
}

#[tokio::test]
async fn same_path_supports_multiple_methods() {
    let list = json!({
        "name": "ListNotes",
        "desc": "List notes",
        "path": "/notes",
        "method": "get",
        "category": "notes",
        "handler": { "kind": "static", "body": { "op": "list" } }
    });
    let create = json!({
        "name": "CreateNote",
        "desc": "Create a note",
        "path": "/notes",
        "method": "post",
        "category": "notes",
        "handler": { "kind": "static", "body": { "op": "create" } }
    });
    let srv = TestHost::spawn(workspace(
        SETTINGS,
        &[("notes_list.json", list), ("notes_create.json", create)],
    ))
    .await;

    let client = reqwest::Client::new();

    let body: Value = reqwest::get(format!("{}/api/notes", srv.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["op"], "list");

    let body: Value = client
        .post(format!("{}/api/notes", srv.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["op"], "create");
}

#[tokio::test]
async fn empty_modules_directory_still_serves_the_catalog() {
    let srv = TestHost::spawn(workspace(SETTINGS, &[])).await;

    let res = reqwest::get(format!("{}/api/info", srv.base_url))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["categories"], json!([]));
}
