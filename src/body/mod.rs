use std::{
    io::Error,
    pin::Pin,
    task::{Context, Poll},
};

use futures_util::Stream;
use hyper::body::{Bytes, SizeHint};

pub use self::file_stream::FileStream;
pub use self::multipart::MultipartStream;

mod file_stream;
mod multipart;

/// Response body of the file service.
pub enum Body {
    Empty,
    /// in-memory page: error pages and directory listings.
    Full(Option<Bytes>),
    /// a whole file or one range of it.
    File(FileStream),
    Multipart(MultipartStream),
}

impl Body {
    pub fn full(bytes: impl Into<Bytes>) -> Self {
        Body::Full(Some(bytes.into()))
    }
}

impl hyper::body::HttpBody for Body {
    type Data = Bytes;

    type Error = Error;

    fn poll_data(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Self::Data, Self::Error>>> {
        match *self {
            Body::Empty => Poll::Ready(None),
            Body::Full(ref mut bytes) => Poll::Ready(bytes.take().map(Ok)),
            Body::File(ref mut file) => Pin::new(file).poll_next(cx),
            Body::Multipart(ref mut parts) => Pin::new(parts).poll_next(cx),
        }
    }

    fn poll_trailers(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Result<Option<hyper::HeaderMap>, Self::Error>> {
        Poll::Ready(Ok(None))
    }

    fn is_end_stream(&self) -> bool {
        matches!(*self, Body::Empty | Body::Full(None))
    }

    fn size_hint(&self) -> SizeHint {
        match *self {
            Body::Empty | Body::Full(None) => SizeHint::with_exact(0),
            Body::Full(Some(ref bytes)) => SizeHint::with_exact(bytes.len() as u64),
            _ => SizeHint::default(),
        }
    }
}
