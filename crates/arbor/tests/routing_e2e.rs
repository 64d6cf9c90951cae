//! End-to-end routing tests.
//!
//! These drive a small site through [`TestClient`] and check what a client
//! sees for path resolution, canonical redirects, extension negotiation,
//! argument binding, generic handlers and guards.

use arbor::prelude::*;
use arbor_test::{TestClient, TestError};
use http::{Method, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;

fn text(name: &'static str, body: &'static str) -> Handler {
    Handler::new(name, move |_| async move { Ok(Reply::text(body)) })
}

/// Echoes what the handler was called with as JSON.
fn echo(name: &'static str, signature: Signature) -> Handler {
    Handler::new(name, move |inv: Invocation| async move {
        Ok(Reply::data(json!({
            "handler": name,
            "positional": inv.args().positional(),
            "keyword": inv.args().keyword(),
        })))
    })
    .signature(signature)
    .json()
}

/// Serves any format and reports the remainder and the negotiated
/// extension.
fn files() -> Handler {
    Handler::new("files", |inv: Invocation| async move {
        let path: Vec<&str> = inv.varargs().iter().filter_map(Value::as_str).collect();
        let extension = inv.context().extension().unwrap_or("none");
        Ok(Reply::text(format!("{} ext={extension}", path.join("/"))))
    })
    .signature(Signature::new().varargs())
    .expose(None, None)
}

fn item(id: &str) -> HandlerNode {
    HandlerNode::new(format!("item-{id}"))
        .with_index(echo("item_index", Signature::new().param("id")))
        .with_handler("edit", echo("item_edit", Signature::new().param("id").param("field")))
}

fn site() -> HandlerNode {
    let admin = HandlerNode::new("admin")
        .with_guard(Guard::new(|request, _| request.header("x-admin") == Some("yes")))
        .with_index(text("admin_index", "admin"))
        .with_unlocked_handler("login", text("admin_login", "please log in"));

    let form = Handler::generic("form", text("form_default", "form for any method"))
        .when(Method::GET, text("form_get", "empty form"))
        .when(Method::POST, text("form_post", "form saved"));

    HandlerNode::new("root")
        .with_index(text("root_index", "welcome"))
        .with_handler("about", text("about", "about us"))
        .with_handler(
            "report",
            echo("report", Signature::new().param("one").param("two")),
        )
        .with_handler("search", echo("search", Signature::new().varkw()))
        .with_handler("form", form)
        .with_child("admin", admin)
        .with_child(
            "sub",
            HandlerNode::new("sub")
                .with_index(text("sub_index", "sub"))
                .with_child("sub", HandlerNode::new("sub").with_handler("deeper", text("deeper", "deeper"))),
        )
        .with_child(
            "items",
            HandlerNode::new("items").with_lookup(
                Signature::new().param("id").varargs(),
                |ctx, id, rest| {
                    if id == "missing" {
                        return Err(DispatchError::not_found("no such item"));
                    }
                    ctx.set_routing_args(vec![id.to_string()]);
                    Ok((Arc::new(item(id)), rest.to_vec()))
                },
            ),
        )
        .with_child(
            "files",
            HandlerNode::new("files").with_default(files()),
        )
        .with_child(
            "docs",
            HandlerNode::new("docs").with_index(text("docs_index", "docs").accept_noncanonical()),
        )
        .with_child(
            "broken",
            HandlerNode::new("broken")
                .with_lookup(Signature::new().param("id"), |_, _, _| {
                    Err(DispatchError::not_found("never called"))
                }),
        )
}

fn client() -> TestClient {
    TestClient::new(Application::builder(site()).build().unwrap())
}

async fn json(client: &TestClient, uri: &str) -> Value {
    let response = client.get(uri).send().await.unwrap();
    response.assert_status(StatusCode::OK);
    response.json().unwrap()
}

#[tokio::test]
async fn test_root_index() {
    let response = client().get("/").send().await.unwrap();
    response.assert_status(StatusCode::OK).assert_body_eq("welcome");
    assert_eq!(response.content_type(), Some("text/html"));
}

#[tokio::test]
async fn test_empty_path_redirects_to_root() {
    let response = client().get("").send().await.unwrap();
    response.assert_status(StatusCode::FOUND);
    assert_eq!(response.location(), Some("http://localhost/"));
}

#[tokio::test]
async fn test_index_segment_reaches_index() {
    client()
        .get("/index")
        .send()
        .await
        .unwrap()
        .assert_body_eq("welcome");
}

#[tokio::test]
async fn test_nested_children() {
    client()
        .get("/sub/sub/deeper")
        .send()
        .await
        .unwrap()
        .assert_status(StatusCode::OK)
        .assert_body_eq("deeper");
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let client = client();
    for uri in ["/nowhere", "/sub/sub/nowhere", "/items/missing", "/items/42/unknown"] {
        client
            .get(uri)
            .send()
            .await
            .unwrap()
            .assert_status(StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn test_remainder_binds_positionally_and_params_fill_the_rest() {
    let value = json(&client(), "/report/five?two=six").await;
    assert_eq!(value["positional"], json!(["five", "six"]));
    assert_eq!(value["keyword"], json!({}));
}

#[tokio::test]
async fn test_varkw_captures_params() {
    let value = json(&client(), "/search?id=2&dummy=dummy").await;
    assert_eq!(value["positional"], json!([]));
    assert_eq!(value["keyword"], json!({"id": "2", "dummy": "dummy"}));
}

#[tokio::test]
async fn test_surplus_remainder_is_404() {
    client()
        .get("/report/a/b/c")
        .send()
        .await
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_default_receives_whole_remainder() {
    client()
        .get("/files/a/b/c")
        .send()
        .await
        .unwrap()
        .assert_body_eq("a/b/c ext=none");
}

#[tokio::test]
async fn test_inner_empty_segment_reaches_default() {
    client()
        .get("/files/a//b/")
        .send()
        .await
        .unwrap()
        .assert_body_eq("a//b ext=none");
}

#[tokio::test]
async fn test_lookup_recurses_with_routing_args() {
    let value = json(&client(), "/items/42/").await;
    assert_eq!(value["handler"], "item_index");
    assert_eq!(value["positional"], json!(["42"]));

    let value = json(&client(), "/items/42/edit/title").await;
    assert_eq!(value["handler"], "item_edit");
    assert_eq!(value["positional"], json!(["42", "title"]));
}

#[tokio::test]
async fn test_lookup_without_varargs_is_configuration_error() {
    let err = client().get("/broken/1").send().await.unwrap_err();
    assert!(matches!(
        err,
        TestError::Dispatch(DispatchError::Configuration { .. })
    ));
}

#[tokio::test]
async fn test_extension_negotiation() {
    let response = client().get("/files/gradient.js.js").send().await.unwrap();
    response.assert_body_eq("gradient.js ext=.js");
    assert_eq!(response.content_type(), Some("application/javascript"));
}

#[tokio::test]
async fn test_hidden_file_has_empty_extension() {
    client()
        .get("/files/.vimrc")
        .send()
        .await
        .unwrap()
        .assert_body_eq(".vimrc ext=");
}

#[tokio::test]
async fn test_forced_content_type_outside_exposure_is_404() {
    client()
        .get("/about.json")
        .send()
        .await
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND);
    client()
        .get("/about.html")
        .send()
        .await
        .unwrap()
        .assert_body_eq("about us");
}

#[tokio::test]
async fn test_canonical_redirect_keeps_query_and_forwarded_proto() {
    let response = client()
        .get("/sub?page=2")
        .header("x-forwarded-proto", "https")
        .header("host", "example.com")
        .send()
        .await
        .unwrap();
    response.assert_status(StatusCode::FOUND);
    assert_eq!(response.location(), Some("https://example.com/sub/?page=2"));
}

#[tokio::test]
async fn test_canonical_post_is_configuration_error() {
    let err = client().post("/sub").send().await.unwrap_err();
    assert!(matches!(
        err,
        TestError::Dispatch(DispatchError::Configuration { .. })
    ));
}

#[tokio::test]
async fn test_noncanonical_allowed_when_disabled() {
    let app = Application::builder(site())
        .force_canonical(false)
        .build()
        .unwrap();
    TestClient::new(app)
        .post("/sub")
        .send()
        .await
        .unwrap()
        .assert_body_eq("sub");
}

#[tokio::test]
async fn test_accept_noncanonical_suppresses_redirect() {
    client()
        .get("/docs")
        .send()
        .await
        .unwrap()
        .assert_status(StatusCode::OK)
        .assert_body_eq("docs");
}

#[tokio::test]
async fn test_leaf_handler_path_is_canonical() {
    client()
        .get("/about")
        .send()
        .await
        .unwrap()
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_permanent_redirect_code_from_config() {
    let mut config = ArborConfig::default();
    config.dispatch.canonical_redirect_code = 301;
    let app = Application::builder(site()).config(config).build().unwrap();
    TestClient::new(app)
        .get("/sub")
        .send()
        .await
        .unwrap()
        .assert_status(StatusCode::MOVED_PERMANENTLY);
}

#[tokio::test]
async fn test_generic_selects_by_method() {
    let client = client();
    client.get("/form").send().await.unwrap().assert_body_eq("empty form");
    client.post("/form").send().await.unwrap().assert_body_eq("form saved");
    client
        .put("/form")
        .send()
        .await
        .unwrap()
        .assert_body_eq("form for any method");
}

#[tokio::test]
async fn test_guard_denies_with_401() {
    let client = client();
    client
        .get("/admin/")
        .send()
        .await
        .unwrap()
        .assert_status(StatusCode::UNAUTHORIZED);
    client
        .get("/admin/")
        .header("x-admin", "yes")
        .send()
        .await
        .unwrap()
        .assert_body_eq("admin");
}

#[tokio::test]
async fn test_unlocked_edge_bypasses_guard() {
    client()
        .get("/admin/login")
        .send()
        .await
        .unwrap()
        .assert_status(StatusCode::OK)
        .assert_body_eq("please log in");
}
