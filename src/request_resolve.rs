use std::{
    io::{ErrorKind, Result},
    path::PathBuf,
};

use hyper::{Method, Request};

use crate::file::{FileReaderOpener, FileWithMeta, Opened};

const INDEX_FILES: [&str; 2] = ["index.html", "index.htm"];

#[derive(Debug)]
pub enum Resolved {
    MethodNotMatched,
    NotFound,
    PermissionDenied,
    /// directory requested without the trailing slash; holds the new location.
    Redirect(String),
    /// directory without an index file.
    Directory(PathBuf),
    Found(FileWithMeta),
}

pub(crate) struct RequestResolve<'a, T> {
    opener: &'a T,
    method: Method,
    path: String,
    query: Option<String>,
}

impl<'a, T: FileReaderOpener> RequestResolve<'a, T> {
    pub fn new<B>(opener: &'a T, request: &Request<B>) -> Self {
        let uri = request.uri();
        Self {
            opener,
            method: request.method().clone(),
            path: uri.path().to_string(),
            query: uri.query().map(String::from),
        }
    }

    pub async fn resolve(&self) -> Result<Resolved> {
        let Self {
            opener,
            ref method,
            ref path,
            ref query,
        } = *self;
        match *method {
            Method::GET | Method::HEAD => {}
            _ => return Ok(Resolved::MethodNotMatched),
        }
        let opened = match opener.open(path).await {
            Ok(opened) => opened,
            Err(e) => return Self::resolve_error(e),
        };
        let dir = match opened {
            // a file never has a trailing slash
            Opened::File(_) if path.ends_with('/') => return Ok(Resolved::NotFound),
            Opened::File(file) => return Ok(Resolved::Found(file)),
            Opened::Dir(dir) => dir,
        };
        if !path.ends_with('/') {
            let location = match query {
                Some(query) => format!("{path}/?{query}"),
                None => format!("{path}/"),
            };
            return Ok(Resolved::Redirect(location));
        }
        for index in INDEX_FILES {
            match opener.open(&format!("{path}{index}")).await {
                Ok(Opened::File(file)) => return Ok(Resolved::Found(file)),
                Ok(Opened::Dir(_)) => continue,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Self::resolve_error(e),
            }
        }
        Ok(Resolved::Directory(dir))
    }

    fn resolve_error(e: std::io::Error) -> Result<Resolved> {
        match e.kind() {
            // NUL bytes and similar never name a file
            ErrorKind::NotFound | ErrorKind::InvalidInput => Ok(Resolved::NotFound),
            ErrorKind::PermissionDenied => Ok(Resolved::PermissionDenied),
            _ => Err(e),
        }
    }
}
