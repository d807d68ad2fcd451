use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
};

use clap::Parser;

pub const DEFAULT_PORT: u16 = 8000;

/// Serve a directory over HTTP to every device on the LAN.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "lanserve", version, about)]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(short, long, env = "LANSERVE_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to bind; the default reaches every interface.
    #[arg(short, long, env = "LANSERVE_BIND", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// Directory to serve.
    #[arg(short, long, env = "LANSERVE_ROOT", default_value = ".")]
    pub root: PathBuf,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            root: PathBuf::from("."),
        }
    }
}
