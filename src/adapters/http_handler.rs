use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    Router,
    body::Body as AxumBody,
    extract::Request as AxumRequest,
    http::{HeaderValue, StatusCode, header, uri::Authority},
    middleware,
    response::IntoResponse,
    routing::any,
};
use hyper::{Request, Response};
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::{
    adapters::middleware::{RequestId, request_id_middleware, security_headers_middleware},
    core::{VanityRequest, VanityResponse, VanityService},
    metrics::{self, RequestTimer},
    ports::http_server::{HandlerError, HttpHandler},
    tracing_setup::create_request_span,
};

/// HTTP front of the vanity service.
///
/// Holds the current [`VanityService`] behind an `ArcSwap` so a configuration
/// reload swaps store and renderer without touching in-flight requests.
#[derive(Clone)]
pub struct VanityHttpHandler {
    service: Arc<ArcSwap<VanityService>>,
}

impl VanityHttpHandler {
    pub fn new(service: Arc<ArcSwap<VanityService>>) -> Self {
        Self { service }
    }

    /// Shared handle used to swap in a rebuilt service.
    pub fn service(&self) -> &Arc<ArcSwap<VanityService>> {
        &self.service
    }

    /// Replace the service answering new requests.
    pub fn replace_service(&self, service: VanityService) {
        self.service.store(Arc::new(service));
    }

    /// Extract the lookup inputs from an HTTP request.
    ///
    /// The host comes from the `Host` header, falling back to the request
    /// URI for absolute-form targets. Any port is dropped and the name is
    /// lowercased. Returns `None` when no usable host is present.
    pub fn vanity_request(req: &Request<AxumBody>) -> Option<VanityRequest> {
        let raw_host = req
            .headers()
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .or_else(|| req.uri().authority().map(Authority::as_str))?;

        let authority: Authority = raw_host.trim().parse().ok()?;
        let hostname = authority.host().trim_end_matches('.').to_ascii_lowercase();
        if hostname.is_empty() {
            return None;
        }

        Some(VanityRequest::new(hostname, req.uri().path()))
    }

    fn into_http_response(response: VanityResponse) -> Result<Response<AxumBody>, HandlerError> {
        Ok(Response::builder()
            .status(response.status)
            .header(
                header::CONTENT_TYPE,
                HeaderValue::from_static(response.content_type),
            )
            .body(AxumBody::from(response.body))?)
    }
}

impl HttpHandler for VanityHttpHandler {
    async fn handle_request(
        &self,
        req: Request<AxumBody>,
    ) -> Result<Response<AxumBody>, HandlerError> {
        let timer = RequestTimer::new();
        let request_id = req
            .extensions()
            .get::<RequestId>()
            .map(|id| id.0.clone())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let vanity_request = Self::vanity_request(&req);
        let span = create_request_span(
            req.method().as_str(),
            vanity_request
                .as_ref()
                .map(|r| r.hostname.as_str())
                .unwrap_or("-"),
            req.uri().path(),
            &request_id,
        );

        let response = match vanity_request {
            Some(vanity_request) => {
                // Pin the service for the duration of this request
                let service = self.service.load_full();
                service
                    .handle(&vanity_request)
                    .instrument(span.clone())
                    .await
            }
            None => {
                span.in_scope(|| tracing::debug!("Request without a usable Host header"));
                VanityResponse::not_found()
            }
        };

        let status = response.status;
        metrics::increment_request_total(status.as_u16());
        span.record("http.status_code", status.as_u16());
        span.record("duration_ms", timer.elapsed_ms() as u64);
        span.in_scope(|| tracing::info!("Answered {}", status));

        Self::into_http_response(response)
    }
}

/// Build the axum router answering every path on every method.
pub fn router(handler: VanityHttpHandler) -> Router {
    Router::new()
        .route("/", any(serve_vanity))
        .route("/{*path}", any(serve_vanity))
        .with_state(handler)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}

async fn serve_vanity(
    axum::extract::State(handler): axum::extract::State<VanityHttpHandler>,
    req: AxumRequest,
) -> axum::response::Response {
    match handler.handle_request(req).await {
        Ok(response) => response.into_response(),
        Err(e) => {
            tracing::error!("Failed to answer request: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                crate::core::service::INTERNAL_ERROR_BODY,
            )
                .into_response()
        }
    }
}
