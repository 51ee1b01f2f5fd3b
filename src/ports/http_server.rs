use axum::body::Body as AxumBody;
use hyper::{Request, Response};
use thiserror::Error;

/// Error type for HTTP handler operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HandlerError {
    /// The response could not be assembled
    #[error("Failed to build response: {0}")]
    ResponseBuild(#[from] hyper::http::Error),
}

/// HttpHandler defines the port for handling HTTP requests
pub trait HttpHandler: Send + Sync + 'static {
    /// Handle an incoming HTTP request
    ///
    /// # Arguments
    /// * `req` - The HTTP request to handle
    ///
    /// # Returns
    /// A future that resolves to an HTTP response or an error
    fn handle_request(
        &self,
        req: Request<AxumBody>,
    ) -> impl std::future::Future<Output = Result<Response<AxumBody>, HandlerError>> + Send;
}
