use std::{
    convert::Infallible,
    future::Future,
    net::SocketAddr,
    path::PathBuf,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use hyper::{service::Service, Method, Request, Response, StatusCode};
use tracing::{error, info};

use crate::{
    body::Body,
    file::{FileReaderOpener, TokioFileReaderOpener},
    listing,
    request_resolve::{RequestResolve, Resolved},
    resp_builder::ResponseBuilder,
    response,
};

const SERVER_TROUBLE: &str = "Server got itself in trouble";
const FORBIDDEN: &str = "Request forbidden -- authorization will not help";

/// Static file service over whatever `T` opens, by default a local directory.
///
/// Request failures become HTTP statuses, so the service itself never errors.
pub struct FileService<T = TokioFileReaderOpener> {
    opener: Arc<T>,
    remote_addr: Option<SocketAddr>,
}

impl<T> Clone for FileService<T> {
    fn clone(&self) -> Self {
        Self {
            opener: self.opener.clone(),
            remote_addr: self.remote_addr,
        }
    }
}

impl FileService {
    pub fn new(local_root: impl Into<PathBuf>) -> Self {
        Self::with_opener(TokioFileReaderOpener::new(local_root))
    }
}

impl<T: FileReaderOpener> FileService<T> {
    pub fn with_opener(opener: T) -> Self {
        Self {
            opener: Arc::new(opener),
            remote_addr: None,
        }
    }

    /// Client address used in the request log.
    pub fn with_remote_addr(mut self, remote_addr: SocketAddr) -> Self {
        self.remote_addr = Some(remote_addr);
        self
    }

    async fn serv<B>(opener: Arc<T>, req: Request<B>) -> Response<Body> {
        let is_head = req.method() == Method::HEAD;
        let uri_path = req.uri().path().to_string();
        let resolved = RequestResolve::new(opener.as_ref(), &req).resolve().await;
        match resolved {
            Ok(Resolved::Found(file)) => {
                let path = file.path.clone();
                ResponseBuilder::new()
                    .request(&req)
                    .build(file)
                    .unwrap_or_else(|e| {
                        error!(path = %path.display(), "failed to build response: {}", e);
                        response::error(StatusCode::INTERNAL_SERVER_ERROR, SERVER_TROUBLE, is_head)
                    })
            }
            Ok(Resolved::Directory(dir)) => match listing::render(&dir, &uri_path).await {
                Ok(page) => response::listing(page, is_head),
                Err(e) => {
                    error!(dir = %dir.display(), "failed to list directory: {}", e);
                    let explain = "No permission to list directory";
                    response::error(StatusCode::NOT_FOUND, explain, is_head)
                }
            },
            Ok(Resolved::Redirect(location)) => response::redirect(&location),
            Ok(Resolved::NotFound) => {
                response::error(StatusCode::NOT_FOUND, "File not found", is_head)
            }
            Ok(Resolved::PermissionDenied) => {
                response::error(StatusCode::FORBIDDEN, FORBIDDEN, is_head)
            }
            Ok(Resolved::MethodNotMatched) => response::not_implemented(req.method()),
            Err(e) => {
                error!(path = %uri_path, "failed to resolve request: {}", e);
                response::error(StatusCode::INTERNAL_SERVER_ERROR, SERVER_TROUBLE, is_head)
            }
        }
    }
}

impl<T, B> Service<Request<B>> for FileService<T>
where
    T: FileReaderOpener,
    B: Send + 'static,
{
    type Response = Response<Body>;

    type Error = Infallible;

    type Future = FileResponse;

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let opener = self.opener.clone();
        let remote_addr = self.remote_addr;
        let method = req.method().clone();
        let uri = req.uri().clone();
        let inner = Box::pin(async move {
            let resp = Self::serv(opener, req).await;
            let status = resp.status().as_u16();
            match remote_addr {
                Some(client) => info!(%client, %method, %uri, status, "request"),
                None => info!(%method, %uri, status, "request"),
            }
            resp
        });
        FileResponse { inner }
    }

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }
}

pub struct FileResponse {
    inner: Pin<Box<dyn Future<Output = Response<Body>> + Send>>,
}

impl Future for FileResponse {
    type Output = Result<Response<Body>, Infallible>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx).map(Ok)
    }
}
