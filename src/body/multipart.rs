use std::{
    io::Result,
    pin::Pin,
    task::{Context, Poll},
    vec,
};

use futures_util::{ready, Stream};
use hyper::body::Bytes;

use super::file_stream::FileStream;
use crate::{file::TokioFileReader, range::HttpRange};

/// `multipart/byteranges` body with one part per range.
pub struct MultipartStream {
    parts: vec::IntoIter<HttpRange>,
    current: FileStream,
    boundary: &'static str,
    content_type: String,
    file_size: u64,
    first_part: bool,
    finished: bool,
}

impl MultipartStream {
    pub fn new(
        reader: TokioFileReader,
        ranges: Vec<HttpRange>,
        boundary: &'static str,
        content_type: String,
        file_size: u64,
    ) -> Self {
        Self {
            parts: ranges.into_iter(),
            current: FileStream::whole(reader, 0),
            boundary,
            content_type,
            file_size,
            first_part: true,
            finished: false,
        }
    }

    /// Exact body length, for `Content-Length`.
    pub fn content_length(&self) -> u64 {
        let parts: u64 = self
            .parts
            .as_slice()
            .iter()
            .enumerate()
            .map(|(i, range)| self.part_header(range, i == 0).len() as u64 + range.length)
            .sum();
        parts + self.closing().len() as u64
    }

    fn part_header(&self, range: &HttpRange, first: bool) -> String {
        // parts after the first start on a fresh line
        let lead = if first { "" } else { "\r\n" };
        format!(
            "{lead}--{}\r\nContent-Type: {}\r\nContent-Range: {}\r\n\r\n",
            self.boundary,
            self.content_type,
            range.content_range(self.file_size),
        )
    }

    fn closing(&self) -> String {
        format!("\r\n--{}--\r\n", self.boundary)
    }
}

impl Stream for MultipartStream {
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        if !this.current.is_drained() {
            if let Some(chunk) = ready!(Pin::new(&mut this.current).poll_next(cx)) {
                return Poll::Ready(Some(chunk));
            }
        }
        let next = match this.parts.next() {
            Some(range) => {
                let header = this.part_header(&range, this.first_part);
                this.first_part = false;
                this.current.restart(&range);
                header
            }
            None => {
                this.finished = true;
                this.closing()
            }
        };
        Poll::Ready(Some(Ok(Bytes::from(next))))
    }
}
