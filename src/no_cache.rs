use std::task::{Context, Poll};

use futures_util::future::{MapOk, TryFutureExt};
use hyper::{
    header::{self, HeaderValue},
    service::Service,
    Request, Response,
};

pub const NO_CACHE: &str = "no-store, no-cache, must-revalidate";

/// Wraps a service and marks every response it produces as uncacheable.
///
/// Any `Cache-Control` the inner service set is replaced, so the header appears
/// exactly once. Status, body and errors pass through untouched.
#[derive(Clone, Debug)]
pub struct NoCache<S> {
    inner: S,
}

impl<S> NoCache<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

fn disable_cache<B>(mut resp: Response<B>) -> Response<B> {
    resp.headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));
    resp
}

impl<S, B, R> Service<Request<B>> for NoCache<S>
where
    S: Service<Request<B>, Response = Response<R>>,
{
    type Response = Response<R>;

    type Error = S::Error;

    type Future = MapOk<S::Future, fn(Response<R>) -> Response<R>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        self.inner
            .call(req)
            .map_ok(disable_cache as fn(Response<R>) -> Response<R>)
    }
}
