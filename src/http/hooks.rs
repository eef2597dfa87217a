//! Pre-dispatch hook.
//!
//! Runs after the landing-page check and before the target is validated.
//! The hook sees the request and the parsed target (if any) and may answer
//! the request itself.

use axum::{body::Body, http::Request, response::Response};

use crate::routing::Target;

/// Extension point consulted before the gateway validates a target.
pub trait InitialRequestHandler: Send + Sync {
    /// Return a response to stop the pipeline, or `None` to continue.
    fn handle(&self, request: &Request<Body>, target: Option<&Target>) -> Option<Response>;
}

/// Lets every request through.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl InitialRequestHandler for PassThrough {
    fn handle(&self, _request: &Request<Body>, _target: Option<&Target>) -> Option<Response> {
        None
    }
}
