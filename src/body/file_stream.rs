use std::{
    io::{Error, ErrorKind, Result, SeekFrom},
    pin::Pin,
    task::{Context, Poll},
};

use futures_util::{ready, Stream};
use hyper::body::Bytes;
use tokio::io::AsyncSeek;

use crate::{
    file::{FileReader, TokioFileReader},
    range::HttpRange,
};

#[derive(Debug, Clone, Copy)]
enum Seek {
    /// seek to this offset before the next read.
    To(u64),
    /// `start_seek` issued, waiting on `poll_complete`.
    InFlight,
    Done,
}

/// Streams `remaining` bytes of a file, optionally from an offset.
///
/// A file that ends early yields `UnexpectedEof` instead of a short body.
pub struct FileStream<T = TokioFileReader> {
    reader: T,
    seek: Seek,
    remaining: u64,
}

impl<T: FileReader> FileStream<T> {
    /// The first `len` bytes, no seek.
    pub fn whole(reader: T, len: u64) -> Self {
        Self {
            reader,
            seek: Seek::Done,
            remaining: len,
        }
    }

    pub fn range(reader: T, range: &HttpRange) -> Self {
        let mut stream = Self::whole(reader, 0);
        stream.restart(range);
        stream
    }

    /// Point the stream at another range of the same file.
    pub(crate) fn restart(&mut self, range: &HttpRange) {
        self.seek = Seek::To(range.start);
        self.remaining = range.length;
    }

    pub(crate) fn is_drained(&self) -> bool {
        self.remaining == 0
    }

    fn poll_seek(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        loop {
            match self.seek {
                Seek::Done => return Poll::Ready(Ok(())),
                Seek::To(offset) => {
                    Pin::new(&mut self.reader).start_seek(SeekFrom::Start(offset))?;
                    self.seek = Seek::InFlight;
                }
                Seek::InFlight => {
                    ready!(Pin::new(&mut self.reader).poll_complete(cx))?;
                    self.seek = Seek::Done;
                }
            }
        }
    }
}

impl<T: FileReader> Stream for FileStream<T> {
    type Item = Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.is_drained() {
            return Poll::Ready(None);
        }
        if let Err(e) = ready!(this.poll_seek(cx)) {
            return Poll::Ready(Some(Err(e)));
        }
        let chunk = match ready!(Pin::new(&mut this.reader).poll_read(cx, this.remaining)) {
            Ok(chunk) => chunk,
            Err(e) => return Poll::Ready(Some(Err(e))),
        };
        if chunk.is_empty() {
            // the file shrank after its size was sent
            this.remaining = 0;
            let e = Error::new(ErrorKind::UnexpectedEof, "file ended before the response did");
            return Poll::Ready(Some(Err(e)));
        }
        this.remaining -= chunk.len() as u64;
        Poll::Ready(Some(Ok(chunk)))
    }
}
