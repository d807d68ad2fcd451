use std::{
    fmt::{self, Display, Formatter},
    net::{IpAddr, SocketAddr},
};

const RULE: &str = "======================================================================";

/// Startup text listing every URL the server can be reached by.
#[derive(Debug, Clone)]
pub struct Banner<'a> {
    pub bind: IpAddr,
    pub port: u16,
    pub local_ip: &'a str,
}

impl<'a> Banner<'a> {
    pub fn local_url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    pub fn network_url(&self) -> String {
        // the fallback text is not an address, keep it as is
        match self.local_ip.parse::<IpAddr>() {
            Ok(ip) => format!("http://{}", SocketAddr::new(ip, self.port)),
            Err(_) => format!("http://{}:{}", self.local_ip, self.port),
        }
    }

    pub fn bind_url(&self) -> String {
        format!("http://{}", SocketAddr::new(self.bind, self.port))
    }
}

impl<'a> Display for Banner<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, "lanserve - HTTP Server")?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "\nServer running on port {}\n", self.port)?;
        writeln!(f, "Access URLs:")?;
        writeln!(f, "   * Local:    {}", self.local_url())?;
        writeln!(f, "   * Network:  {}", self.network_url())?;
        writeln!(f, "   * LAN:      {}", self.bind_url())?;
        writeln!(f, "\nOther devices on your network can access via:")?;
        writeln!(f, "   {}", self.network_url())?;
        writeln!(f, "\nPress Ctrl+C to stop the server")?;
        writeln!(f, "{RULE}")
    }
}
