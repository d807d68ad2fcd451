use std::{io, net::SocketAddr};

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RangeError {
    /// not a `bytes=` range set we can read.
    #[error("invalid range")]
    InvalidRange,
    /// well formed, but every range lies past the end of the file.
    #[error("no overlap")]
    NoOverlap,
}

/// Errors that stop the server from starting or keep it from serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("failed to read the bound address: {0}")]
    LocalAddr(#[source] io::Error),

    #[error("failed to start the runtime: {0}")]
    Runtime(#[source] io::Error),

    #[error("server error: {0}")]
    Serve(#[from] hyper::Error),
}
