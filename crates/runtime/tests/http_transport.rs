//! `HttpTransport` against a local axum server.

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::Router;
use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use websend_runtime::{HttpRequest, Invocable, Invocation, Runtime, RuntimeConfig, Transport, Value, Verb};
use websend_runtime::{Error, Heartbeat, HttpTransport, Rejected};

const JSON: &str = "application/json";

async fn create(Query(params): Query<HashMap<String, String>>, body: String) -> impl IntoResponse {
	if params.get("q").map(String::as_str) != Some("create") || body != "[]" {
		return (StatusCode::BAD_REQUEST, [(header::CONTENT_TYPE, JSON)], String::new());
	}
	(StatusCode::OK, [(header::CONTENT_TYPE, JSON)], r#"{"key":"k7"}"#.to_string())
}

async fn read() -> impl IntoResponse {
	([(header::CONTENT_TYPE, JSON)], r#"{"=":"hello"}"#)
}

async fn run(Query(params): Query<HashMap<String, String>>, headers: HeaderMap, body: String) -> impl IntoResponse {
	let content_type = headers
		.get(header::CONTENT_TYPE)
		.and_then(|value| value.to_str().ok())
		.unwrap_or_default()
		.to_string();
	let echoed = serde_json::json!({
		"q": params.get("q"),
		"x": params.get("x"),
		"w": params.get("w"),
		"type": content_type,
		"body": body,
	});
	([(header::CONTENT_TYPE, JSON)], echoed.to_string())
}

async fn moved() -> impl IntoResponse {
	(StatusCode::SEE_OTHER, [(header::LOCATION, "./obj#s=moved")])
}

async fn opaque() -> impl IntoResponse {
	([(header::CONTENT_TYPE, "application/do-not-execute; charset=utf-8")], "raw <text>")
}

async fn garbled() -> impl IntoResponse {
	([(header::CONTENT_TYPE, JSON)], vec![b'{', b'"', b'=', b'"', b':', b'"', 0xff, 0xfe, b'"', b'}'])
}

async fn spawn_server() -> SocketAddr {
	let app = Router::new()
		.route("/app/", post(create))
		.route("/app/obj", get(read).post(run))
		.route("/app/moved", get(moved))
		.route("/app/opaque", get(opaque))
		.route("/app/garbled", get(garbled));
	let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	tokio::spawn(async move {
		axum::serve(listener, app).await.unwrap();
	});
	addr
}

#[tokio::test]
async fn get_decodes_json_body() {
	let addr = spawn_server().await;
	let runtime = Runtime::http(RuntimeConfig::default()).unwrap();
	let value = runtime.seal(&format!("http://{addr}/app/obj")).invoke(Invocation::get()).await;
	assert_eq!(value, Value::from("hello"));
}

#[tokio::test]
async fn post_carries_session_params_and_body() {
	let addr = spawn_server().await;
	let runtime = Runtime::http(RuntimeConfig::default()).unwrap();
	let target = runtime.seal(&format!("http://{addr}/app/obj"));

	let echoed = target
		.invoke(Invocation::post("run").with_body(vec![Value::from(1.0)]))
		.await;
	assert_eq!(echoed.get("q"), Some(&Value::from("run")));
	assert_eq!(echoed.get("x"), Some(&Value::from("k7")));
	assert_eq!(echoed.get("w"), Some(&Value::from("1")));
	assert_eq!(echoed.get("type"), Some(&Value::from("text/plain")));
	assert_eq!(echoed.get("body"), Some(&Value::from("[1]")));

	let snapshot = runtime.session(&format!("http://{addr}")).unwrap();
	assert!(snapshot.established);
	assert_eq!(snapshot.responses, 2);
}

#[tokio::test]
async fn see_other_is_not_followed() {
	let addr = spawn_server().await;
	let transport = HttpTransport::new().unwrap();
	let response = transport
		.send(HttpRequest::new(Verb::Get, format!("http://{addr}/app/moved")), Heartbeat::new())
		.await
		.unwrap();
	assert_eq!(response.status, 303);
	assert_eq!(response.header("location"), Some("./obj#s=moved"));
	assert_eq!(response.phrase, "See Other");
}

#[tokio::test]
async fn see_other_becomes_a_reference() {
	let addr = spawn_server().await;
	let runtime = Runtime::http(RuntimeConfig::default()).unwrap();
	let value = runtime.seal(&format!("http://{addr}/app/moved")).invoke(Invocation::get()).await;
	assert_eq!(
		runtime.unsealer().unseal(&value),
		Some(format!("http://{addr}/app/obj#s=moved"))
	);
}

#[tokio::test]
async fn opaque_content_is_returned_as_text() {
	let addr = spawn_server().await;
	let runtime = Runtime::http(RuntimeConfig::default()).unwrap();
	let value = runtime.seal(&format!("http://{addr}/app/opaque")).invoke(Invocation::get()).await;
	assert_eq!(value, Value::from("raw <text>"));
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
	let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
	let addr = listener.local_addr().unwrap();
	drop(listener);

	let transport = HttpTransport::new().unwrap();
	let err = transport
		.send(
			HttpRequest::new(Verb::Post, format!("http://{addr}/app/obj?q=run&x=SESSIONKEY&w=1&s=WEBKEY")),
			Heartbeat::new(),
		)
		.await
		.unwrap_err();
	assert!(err.is_transient());
	let text = err.to_string();
	assert!(!text.contains("SESSIONKEY"), "{text}");
	assert!(!text.contains("WEBKEY"), "{text}");
}

#[tokio::test]
async fn body_that_is_not_utf8_is_a_decode_error() {
	let addr = spawn_server().await;
	let transport = HttpTransport::new().unwrap();
	let err = transport
		.send(HttpRequest::new(Verb::Get, format!("http://{addr}/app/garbled")), Heartbeat::new())
		.await
		.unwrap_err();
	assert!(matches!(err, Error::DecodeError(_)));
}

#[tokio::test]
async fn body_that_is_not_utf8_rejects_only_its_request() {
	let addr = spawn_server().await;
	let runtime = Runtime::http(RuntimeConfig::default()).unwrap();
	let garbled = runtime.seal(&format!("http://{addr}/app/garbled")).invoke(Invocation::get());
	let next = runtime.seal(&format!("http://{addr}/app/obj")).invoke(Invocation::get());

	let value = garbled.await;
	assert_eq!(value.as_rejected().and_then(Rejected::kind), Some("BadSyntax"));
	assert_eq!(next.await, Value::from("hello"));
}
