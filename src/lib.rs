//! Static file server for sharing a local directory with every device on the LAN.
//!
//! Files are served by [`FileService`]; [`NoCache`] wraps it so browsers always fetch
//! fresh content, and [`LanServer`] binds all interfaces and prints where to connect.

mod body;
mod error;
mod file;
mod filesvr;
mod listing;
mod no_cache;
mod range;
mod request_resolve;
mod resp_builder;
mod response;

pub mod banner;
pub mod config;
pub mod probe;
pub mod server;

pub use body::Body;
pub use error::{RangeError, ServerError};
pub use filesvr::{FileResponse, FileService};
pub use no_cache::{NoCache, NO_CACHE};
pub use range::HttpRange;
pub use server::{run, LanServer};
