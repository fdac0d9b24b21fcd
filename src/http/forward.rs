//! Upstream forwarding.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the upstream's authority
//! - Send the request through a pooled HTTP client
//! - Map transport failures to 502 Bad Gateway
//!
//! # Design Decisions
//! - Path and query are kept; an upstream base path is prepended
//! - Headers (including Host) are passed through untouched
//! - Response bodies are streamed, never buffered

use std::fmt;

use axum::body::Body;
use axum::http::uri::Authority;
use axum::http::{Request, Response, StatusCode, Uri, Version};
use axum::response::IntoResponse;
use futures_util::future::BoxFuture;
use hyper::body::Incoming;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use thiserror::Error;
use url::Url;

use crate::load_balancer::Handler;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid url: {0}")]
    Parse(#[from] url::ParseError),

    #[error("unsupported url '{0}'")]
    Unsupported(String),
}

/// Leaf handler forwarding requests to one upstream server.
pub struct Upstream {
    authority: Authority,
    base_path: String,
    client: Client<HttpConnector, Body>,
}

impl Upstream {
    pub fn new(url: &str) -> Result<Self, UpstreamError> {
        let parsed = Url::parse(url)?;
        let host = match parsed.host_str() {
            Some(host) if parsed.scheme() == "http" => host,
            _ => return Err(UpstreamError::Unsupported(url.to_string())),
        };
        let port = parsed.port_or_known_default().unwrap_or(80);
        let authority = Authority::try_from(format!("{}:{}", host, port))
            .map_err(|_| UpstreamError::Unsupported(url.to_string()))?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Ok(Self {
            authority,
            base_path: parsed.path().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn target(&self, uri: &Uri) -> Result<Uri, axum::http::Error> {
        let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        Uri::builder()
            .scheme("http")
            .authority(self.authority.clone())
            .path_and_query(format!("{}{}", self.base_path, path_and_query))
            .build()
    }

    async fn forward(&self, request: Request<Body>) -> Response<Body> {
        let (mut parts, body) = request.into_parts();
        parts.uri = match self.target(&parts.uri) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::warn!(upstream = %self.authority, error = %e, "Cannot rewrite request uri");
                return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
            }
        };
        // The client speaks HTTP/1.1 to upstreams whatever the client used.
        parts.version = Version::HTTP_11;

        tracing::debug!(upstream = %self.authority, uri = %parts.uri, "Forwarding request");

        match self.client.request(Request::from_parts(parts, body)).await {
            Ok(response) => stream_back(response),
            Err(e) => {
                tracing::error!(upstream = %self.authority, error = %e, "Upstream error");
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
        }
    }
}

/// Hand the upstream body to the client without buffering it.
fn stream_back(response: Response<Incoming>) -> Response<Body> {
    response.map(Body::new)
}

impl fmt::Debug for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upstream")
            .field("authority", &self.authority)
            .field("base_path", &self.base_path)
            .finish()
    }
}

impl Handler for Upstream {
    fn handle(&self, request: Request<Body>) -> BoxFuture<'_, Response<Body>> {
        Box::pin(self.forward(request))
    }
}
