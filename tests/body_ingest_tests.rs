//! Body ingestion over the wire: content-type enforcement, size limits,
//! JSON parsing, and schema validation short-circuits.

use routegate::{GateConfig, HandlerResponse, RouteDescriptor};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

mod common;
use common::{body_of, post, start_service, status_of};

fn echo_route() -> RouteDescriptor {
    RouteDescriptor::new().respond(|req| HandlerResponse::ok(json!({ "body": req.body })))
}

#[test]
fn json_body_is_parsed_and_passed_to_the_responder() {
    let mut routes = HashMap::new();
    routes.insert("POST /echo".to_string(), echo_route());
    let (handle, addr) = start_service(vec![routes], GateConfig::new("secret"));

    let response = post(
        &addr,
        "/echo",
        "Content-Type: application/json\r\n",
        r#"{"n":1}"#,
    );
    assert_eq!(status_of(&response), 200);
    assert_eq!(body_of(&response), r#"{"success":{"body":{"n":1}}}"#);

    handle.stop();
}

#[test]
fn absent_content_type_is_acceptable() {
    let mut routes = HashMap::new();
    routes.insert("POST /echo".to_string(), echo_route());
    let (handle, addr) = start_service(vec![routes], GateConfig::new("secret"));

    let response = post(&addr, "/echo", "", r#"{"n":2}"#);
    assert_eq!(status_of(&response), 200);

    handle.stop();
}

#[test]
fn wrong_content_type_is_406() {
    let mut routes = HashMap::new();
    routes.insert("POST /echo".to_string(), echo_route());
    let (handle, addr) = start_service(vec![routes], GateConfig::new("secret"));

    let response = post(&addr, "/echo", "Content-Type: text/xml\r\n", "<x/>");
    assert_eq!(status_of(&response), 406);
    assert_eq!(
        body_of(&response),
        r#"{"failure":"Content-Type is not application/json."}"#
    );

    handle.stop();
}

#[test]
fn invalid_json_is_400() {
    let mut routes = HashMap::new();
    routes.insert("POST /echo".to_string(), echo_route());
    let (handle, addr) = start_service(vec![routes], GateConfig::new("secret"));

    let response = post(&addr, "/echo", "", "{not json");
    assert_eq!(status_of(&response), 400);
    assert_eq!(
        body_of(&response),
        r#"{"failure":"Message could not parse as JSON."}"#
    );

    handle.stop();
}

#[test]
fn eleven_bytes_against_a_ten_byte_route_limit_is_413() {
    let mut routes = HashMap::new();
    routes.insert("POST /small".to_string(), echo_route().limit(10));
    let (handle, addr) = start_service(vec![routes], GateConfig::new("secret"));

    let body = r#"{"key":"v"}"#;
    assert_eq!(body.len(), 11);
    let response = post(&addr, "/small", "", body);
    assert_eq!(status_of(&response), 413);
    assert_eq!(body_of(&response), r#"{"failure":"Message is too large."}"#);

    handle.stop();
}

#[test]
fn declared_length_over_the_limit_never_reaches_the_responder() {
    let invoked = Arc::new(AtomicBool::new(false));
    let seen = invoked.clone();
    let mut routes = HashMap::new();
    routes.insert(
        "POST /small".to_string(),
        RouteDescriptor::new().limit(10).respond(move |_req| {
            seen.store(true, Ordering::SeqCst);
            HandlerResponse::ok(json!("unreachable"))
        }),
    );
    let (handle, addr) = start_service(vec![routes], GateConfig::new("secret"));

    let response = post(&addr, "/small", "", &"x".repeat(64));
    assert_eq!(status_of(&response), 413);
    assert!(!invoked.load(Ordering::SeqCst));

    handle.stop();
}

#[test]
fn service_default_limit_applies_when_the_route_has_none() {
    let mut routes = HashMap::new();
    routes.insert("POST /echo".to_string(), echo_route());
    let (handle, addr) = start_service(
        vec![routes],
        GateConfig::new("secret").body_limit(16),
    );

    let response = post(&addr, "/echo", "", r#"{"padding":"xxxxxxxxxx"}"#);
    assert_eq!(status_of(&response), 413);

    handle.stop();
}

#[test]
fn get_routes_skip_body_ingestion() {
    let mut routes = HashMap::new();
    routes.insert(
        "GET /nobody".to_string(),
        RouteDescriptor::new().respond(|req| HandlerResponse::ok(json!(req.body.is_none()))),
    );
    let (handle, addr) = start_service(vec![routes], GateConfig::new("secret"));

    let response = common::get(&addr, "/nobody", "");
    assert_eq!(body_of(&response), r#"{"success":true}"#);

    handle.stop();
}

#[test]
fn opted_out_routes_skip_content_type_enforcement() {
    let mut routes = HashMap::new();
    routes.insert(
        "POST /raw".to_string(),
        RouteDescriptor::new()
            .accept(false)
            .respond(|req| HandlerResponse::ok(json!(req.body.is_none()))),
    );
    let (handle, addr) = start_service(vec![routes], GateConfig::new("secret"));

    let response = post(&addr, "/raw", "Content-Type: text/plain\r\n", "raw bytes");
    assert_eq!(status_of(&response), 200);
    assert_eq!(body_of(&response), r#"{"success":true}"#);

    handle.stop();
}

#[test]
fn schema_rejection_is_400_and_the_responder_never_runs() {
    let invoked = Arc::new(AtomicBool::new(false));
    let seen = invoked.clone();
    let mut routes = HashMap::new();
    routes.insert(
        "POST /strict".to_string(),
        RouteDescriptor::new()
            .validate(json!({
                "body": {
                    "type": "object",
                    "properties": { "name": { "type": "string" } },
                    "required": ["name"]
                }
            }))
            .respond(move |_req| {
                seen.store(true, Ordering::SeqCst);
                HandlerResponse::ok(json!("unreachable"))
            }),
    );
    let (handle, addr) = start_service(vec![routes], GateConfig::new("secret"));

    let response = post(&addr, "/strict", "", r#"{"name":42}"#);
    assert_eq!(status_of(&response), 400);
    assert_eq!(body_of(&response), r#"{"failure":"Message is invalid."}"#);
    assert!(!invoked.load(Ordering::SeqCst));

    handle.stop();
}

#[test]
fn schema_acceptance_dispatches_normally() {
    let mut routes = HashMap::new();
    routes.insert(
        "POST /strict".to_string(),
        echo_route().validate(json!({
            "body": {
                "type": "object",
                "properties": { "name": { "type": "string" } },
                "required": ["name"]
            }
        })),
    );
    let (handle, addr) = start_service(vec![routes], GateConfig::new("secret"));

    let response = post(&addr, "/strict", "", r#"{"name":"ok"}"#);
    assert_eq!(status_of(&response), 200);
    assert_eq!(body_of(&response), r#"{"success":{"body":{"name":"ok"}}}"#);

    handle.stop();
}
