//! Production transport over reqwest.

use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use tracing::{debug, trace};
use websend_protocol::{HttpRequest, HttpResponse, uri};

use crate::error::{Error, Result};
use crate::transport::{Heartbeat, SendFuture, Transport};

/// HTTP transport with redirects disabled, so a `303` reaches the codec.
#[derive(Debug, Clone)]
pub struct HttpTransport {
	client: reqwest::Client,
}

impl HttpTransport {
	pub fn new() -> Result<Self> {
		let client = reqwest::Client::builder()
			.redirect(Policy::none())
			.build()
			.map_err(|e| Error::TransportError(format!("failed to build HTTP client: {e}")))?;
		Ok(Self { client })
	}

	/// Wraps a preconfigured client. The client must not follow redirects.
	pub fn with_client(client: reqwest::Client) -> Self {
		Self { client }
	}
}

impl Transport for HttpTransport {
	fn send(&self, request: HttpRequest, heartbeat: Heartbeat) -> SendFuture {
		let client = self.client.clone();
		Box::pin(async move {
			let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
				.map_err(|e| Error::TransportError(format!("invalid method {}: {e}", request.method)))?;
			debug!(
				target: "websend.http",
				method = %request.method,
				origin = uri::origin(&request.uri).unwrap_or(""),
				"issuing request"
			);

			let mut builder = client.request(method, request.uri.as_str());
			if let Some(content_type) = &request.content_type {
				builder = builder.header(CONTENT_TYPE, content_type.as_str());
			}
			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await.map_err(transport_error)?;
			heartbeat.beat();

			let status = response.status();
			let headers = response
				.headers()
				.iter()
				.filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
				.collect();

			let mut body = Vec::new();
			let mut chunks = response.bytes_stream();
			while let Some(chunk) = chunks.next().await {
				let chunk = chunk.map_err(transport_error)?;
				heartbeat.beat();
				body.extend_from_slice(&chunk);
			}
			trace!(target: "websend.http", status = status.as_u16(), bytes = body.len(), "response received");

			let body = String::from_utf8(body).map_err(|e| Error::DecodeError(format!("response body is not UTF-8: {e}")))?;
			Ok(HttpResponse {
				status: status.as_u16(),
				phrase: status.canonical_reason().unwrap_or_default().to_string(),
				headers,
				body,
			})
		})
	}
}

/// The request URI carries the session key and web-key; keep it out of the
/// error text.
fn transport_error(err: reqwest::Error) -> Error {
	Error::TransportError(err.without_url().to_string())
}
