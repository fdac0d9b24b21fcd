//! Request-handling capability shared by backends and balancers.
//!
//! Anything that turns a request into a response implements [`Handler`]:
//! upstream forwarders, test stubs and [`Balancer`] itself, which is what lets
//! balancers nest under each other without special cases.

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use tower::Service;

use crate::load_balancer::wrr::Balancer;

/// Process a request, produce a response.
pub trait Handler: Send + Sync {
    fn handle(&self, request: Request<Body>) -> BoxFuture<'_, Response<Body>>;
}

/// A [`Handler`] built from an async closure. See [`handler_fn`].
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
}

/// Wrap an async closure as a [`Handler`].
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Request<Body>) -> Fut + Send + Sync,
    Fut: Future<Output = Response<Body>> + Send + 'static,
{
    HandlerFn { f }
}

impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Request<Body>) -> Fut + Send + Sync,
    Fut: Future<Output = Response<Body>> + Send + 'static,
{
    fn handle(&self, request: Request<Body>) -> BoxFuture<'_, Response<Body>> {
        Box::pin((self.f)(request))
    }
}

impl std::fmt::Debug for dyn Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Handler")
    }
}

/// Tower adapter so a shared balancer can be mounted in an axum router.
#[derive(Debug, Clone)]
pub struct BalancerService {
    balancer: Arc<Balancer>,
}

impl BalancerService {
    pub fn new(balancer: Arc<Balancer>) -> Self {
        Self { balancer }
    }
}

impl Service<Request<Body>> for BalancerService {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response<Body>, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let balancer = self.balancer.clone();
        Box::pin(async move { Ok(balancer.handle(request).await) })
    }
}
