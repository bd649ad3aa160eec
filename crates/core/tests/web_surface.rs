use websend::fake_transport::{FakeTransportBuilder, FakeTransportController};
use websend::{HttpResponse, Invocable, Invocation, MemoryHost, Runtime, RuntimeConfig, Value, Web};

const PAGE: &str = "https://example.com/app/home#s=page";

fn web() -> (Web<MemoryHost>, FakeTransportController) {
	let (transport, controller) = FakeTransportBuilder::new().build();
	let runtime = Runtime::new(transport, RuntimeConfig::default()).unwrap();
	(Web::new(runtime, MemoryHost::new(PAGE)), controller)
}

#[tokio::test]
async fn page_is_the_host_location() {
	let (web, _controller) = web();
	let page = Value::from(web.page().unwrap());
	assert_eq!(web.extract(&page, None).as_deref(), Some(PAGE));
}

#[tokio::test]
async fn page_requires_an_absolute_location() {
	let (transport, _controller) = FakeTransportBuilder::new().build();
	let runtime = Runtime::new(transport, RuntimeConfig::default()).unwrap();
	let web = Web::new(runtime, MemoryHost::new("about"));
	assert!(web.page().is_none());
	assert!(web.construct(None, "x", &[]).is_none());
}

#[tokio::test]
async fn extract_inverts_construct() {
	let (web, _controller) = web();
	let base = Value::from(web.construct(None, "./", &[]).unwrap());
	assert_eq!(web.extract(&base, None).as_deref(), Some("https://example.com/app/"));

	let target = Value::from(web.construct(Some(&base), "a/b?x=1", &[]).unwrap());
	assert_eq!(web.extract(&target, Some(&base)).as_deref(), Some("a/b?x=1"));
	assert_eq!(web.extract(&target, None).as_deref(), Some("https://example.com/app/a/b?x=1"));
}

#[tokio::test]
async fn construct_appends_args_before_fragment() {
	let (web, _controller) = web();
	let target = web
		.construct(None, "item?id=7#s=key", &[("name", "a b&c"), ("n", "2")])
		.unwrap();
	assert_eq!(
		web.extract(&Value::from(target), None).as_deref(),
		Some("https://example.com/app/item?id=7&name=a%20b%26c&n=2#s=key")
	);
}

#[tokio::test]
async fn construct_refuses_a_base_that_is_not_a_reference() {
	let (web, _controller) = web();
	let forged = Value::from("https://evil.example/");
	assert!(web.construct(Some(&forged), "x", &[]).is_none());
}

#[tokio::test]
async fn extract_across_origins_is_absolute() {
	let (web, _controller) = web();
	let base = Value::from(web.page().unwrap());
	let other = Value::from(web.construct(None, "https://other.example/x", &[]).unwrap());
	assert_eq!(web.extract(&other, Some(&base)).as_deref(), Some("https://other.example/x"));
}

#[tokio::test]
async fn extract_ignores_a_base_that_is_not_a_reference() {
	let (web, _controller) = web();
	let target = Value::from(web.construct(None, "a", &[]).unwrap());
	let base = Value::from("https://example.com/app/");
	assert_eq!(web.extract(&target, Some(&base)).as_deref(), Some("https://example.com/app/a"));
}

#[tokio::test]
async fn malformed_input_never_yields_a_uri() {
	let (web, _controller) = web();
	let inputs = [
		Value::Null,
		Value::from("https://example.com/app/a"),
		Value::from(3.0),
		Value::Array(vec![Value::from("https://example.com/")]),
		Value::object([("@", Value::from("https://example.com/"))]),
	];
	for input in &inputs {
		assert_eq!(web.extract(input, None), None);
		assert!(!web.navigate(input));
		assert!(!web.set_attribute("link", "href", input));
	}
	assert!(web.host().navigations().is_empty());
	assert!(web.host().attributes().is_empty());
}

#[tokio::test]
async fn navigate_and_attributes_reach_the_host() {
	let (web, _controller) = web();
	let target = Value::from(web.construct(None, "next", &[]).unwrap());

	assert!(web.set_attribute("link", "href", &target));
	assert_eq!(web.host().attribute("link", "href").as_deref(), Some("https://example.com/app/next"));

	assert!(web.navigate(&target));
	assert_eq!(web.host().navigations(), vec!["https://example.com/app/next"]);
	let page = Value::from(web.page().unwrap());
	assert_eq!(web.extract(&page, None).as_deref(), Some("https://example.com/app/next"));
}

#[tokio::test]
async fn title_passes_through() {
	let (web, _controller) = web();
	assert_eq!(web.title(), "");
	web.set_title("Inbox (3)");
	assert_eq!(web.title(), "Inbox (3)");
}

#[tokio::test(start_paused = true)]
async fn constructed_references_are_invocable() {
	let (web, controller) = web();
	controller.reply(HttpResponse::json(r#"{"=":"hi"}"#));

	let target = web.construct(None, "greeting#s=g", &[("lang", "en")]).unwrap();
	assert_eq!(target.invoke(Invocation::get()).await, Value::from("hi"));

	let sent = controller.take_sent();
	assert_eq!(sent[0].request.uri, "https://example.com/app/greeting?lang=en&s=g");
}
