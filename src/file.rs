use std::{
    cmp::min,
    fs::{self, OpenOptions},
    future::Future,
    io::{Error, ErrorKind, Result, SeekFrom},
    mem::MaybeUninit,
    path::{Component, Path, PathBuf},
    pin::Pin,
    task::{Context, Poll},
    time::SystemTime,
};

use futures_util::ready;
use hyper::body::Bytes;
use percent_encoding::percent_decode_str;
use tokio::{
    fs::File,
    io::{AsyncRead, AsyncSeek, ReadBuf},
    task::JoinHandle,
};

const READ_BUF_SIZE: usize = 10240;

/// An opened file plus the metadata the response headers need.
#[derive(Debug)]
pub struct FileWithMeta {
    pub path: PathBuf,
    pub size: u64,
    pub file: File,
    pub modified: Option<SystemTime>,
}

/// What a request path points at on disk.
#[derive(Debug)]
pub enum Opened {
    File(FileWithMeta),
    Dir(PathBuf),
}

/// Reads at most `readn` bytes per poll into a body chunk. An empty chunk means end of file.
pub trait FileReader: AsyncSeek + Unpin + Send + 'static {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, readn: u64) -> Poll<Result<Bytes>>;
}

/// Opens request paths relative to some root.
pub trait FileReaderOpener: Send + Sync + 'static {
    type Future: Future<Output = Result<Opened>> + Unpin + Send + 'static;

    /// `path` is the raw, still percent-encoded URI path.
    fn open(&self, path: &str) -> Self::Future;
}

/// [`FileReader`] over a tokio file with a fixed read buffer.
pub struct TokioFileReader {
    file: tokio::fs::File,
    buf: Box<[MaybeUninit<u8>; READ_BUF_SIZE]>,
}

impl TokioFileReader {
    fn new(file: File) -> Self {
        Self {
            file,
            buf: Box::new([MaybeUninit::uninit(); READ_BUF_SIZE]),
        }
    }
}

impl FileReader for TokioFileReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        readn: u64,
    ) -> Poll<Result<Bytes>> {
        let Self {
            ref mut file,
            ref mut buf,
        } = *self;
        let buf_len = min(readn, buf.len() as u64) as usize;
        let mut buf = ReadBuf::uninit(&mut buf[..buf_len]);
        ready!(Pin::new(file).poll_read(cx, &mut buf))?;
        Poll::Ready(Ok(Bytes::copy_from_slice(buf.filled())))
    }
}

impl AsyncSeek for TokioFileReader {
    fn start_seek(self: Pin<&mut Self>, position: SeekFrom) -> Result<()> {
        Pin::new(&mut self.get_mut().file).start_seek(position)
    }

    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<u64>> {
        Pin::new(&mut self.get_mut().file).poll_complete(cx)
    }
}

impl From<FileWithMeta> for TokioFileReader {
    fn from(meta: FileWithMeta) -> Self {
        TokioFileReader::new(meta.file)
    }
}

/// Map a URI path onto `root`.
///
/// Segments are percent-decoded; empty, `.`, `..` and anything that is not a single
/// plain path component are dropped, so the result never leaves `root`.
pub fn translate_path(root: &Path, uri_path: &str) -> PathBuf {
    let decoded = percent_decode_str(uri_path).decode_utf8_lossy();
    let mut full_path = root.to_path_buf();
    for segment in decoded.split('/') {
        let mut components = Path::new(segment).components();
        if let (Some(Component::Normal(name)), None) = (components.next(), components.next()) {
            full_path.push(name);
        }
    }
    full_path
}

/// Stats and opens a path on the blocking pool.
pub struct OpenedFuture {
    inner: JoinHandle<Result<Opened>>,
}

impl OpenedFuture {
    fn new(path: PathBuf) -> Self {
        let inner = tokio::task::spawn_blocking(move || -> Result<Opened> {
            if fs::metadata(&path)?.is_dir() {
                return Ok(Opened::Dir(path));
            }
            let file = OpenOptions::new().read(true).open(&path)?;
            let meta = file.metadata()?;
            let file = tokio::fs::File::from_std(file);
            Ok(Opened::File(FileWithMeta {
                path,
                file,
                size: meta.len(),
                modified: meta.modified().ok(),
            }))
        });
        Self { inner }
    }
}

impl Future for OpenedFuture {
    type Output = Result<Opened>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match ready!(Pin::new(&mut self.inner).poll(cx)) {
            Ok(opened) => Poll::Ready(opened),
            // the blocking task panicked or was cancelled
            Err(e) => Poll::Ready(Err(Error::new(ErrorKind::Other, e))),
        }
    }
}

pub struct TokioFileReaderOpener {
    root: PathBuf,
}

impl TokioFileReaderOpener {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FileReaderOpener for TokioFileReaderOpener {
    type Future = OpenedFuture;

    fn open(&self, path: &str) -> Self::Future {
        OpenedFuture::new(translate_path(&self.root, path))
    }
}
