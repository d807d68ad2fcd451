use std::{
    convert::Infallible,
    future::Future,
    net::{SocketAddr, TcpListener},
    path::PathBuf,
    time::Duration,
};

use hyper::{server::conn::AddrStream, service::make_service_fn, Server};
use tokio::{runtime::Builder, sync::oneshot};
use tracing::{error, info, warn};

use crate::{
    banner::Banner,
    config::ServerConfig,
    error::ServerError,
    filesvr::FileService,
    no_cache::NoCache,
    probe,
};

/// How long in-flight connections get to finish once shutdown starts.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// A bound, not yet serving, LAN file server.
#[derive(Debug)]
pub struct LanServer {
    listener: TcpListener,
    config: ServerConfig,
}

impl LanServer {
    /// Bind the configured address. There is no retry and no fallback port.
    pub fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        let addr = config.socket_addr();
        let listener = TcpListener::bind(addr)
            .and_then(|listener| listener.set_nonblocking(true).map(|_| listener))
            .map_err(|source| ServerError::Bind { addr, source })?;
        Ok(Self {
            listener,
            config: config.clone(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener.local_addr().map_err(ServerError::LocalAddr)
    }

    /// Banner for the bound port, which differs from the configured one for port 0.
    pub fn banner<'a>(&self, local_ip: &'a str) -> Result<Banner<'a>, ServerError> {
        Ok(Banner {
            bind: self.config.bind,
            port: self.local_addr()?.port(),
            local_ip,
        })
    }

    /// Serve until `signal` resolves. The listener is closed when this returns.
    ///
    /// Connections still open [`SHUTDOWN_GRACE`] after the signal are abandoned, so a
    /// stalled client cannot hold the process open.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let addr = self.local_addr()?;
        let root: PathBuf = self.config.root;
        let make_svc = make_service_fn(move |conn: &AddrStream| {
            let svc = FileService::new(root.clone()).with_remote_addr(conn.remote_addr());
            let svc = NoCache::new(svc);
            async move { Ok::<_, Infallible>(svc) }
        });
        let (stop, stopped) = oneshot::channel::<()>();
        let server = Server::from_tcp(self.listener)?
            .serve(make_svc)
            .with_graceful_shutdown(async {
                let _ = stopped.await;
            });
        info!(%addr, "listening");

        tokio::pin!(server, signal);
        tokio::select! {
            res = &mut server => return res.map_err(ServerError::from),
            _ = &mut signal => info!("shutting down"),
        }
        let _ = stop.send(());
        match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
            Ok(res) => res?,
            Err(_) => warn!(grace = ?SHUTDOWN_GRACE, "abandoning open connections"),
        }
        info!("stopped");
        Ok(())
    }

    /// Serve until the process receives Ctrl-C.
    pub async fn serve_until_interrupt(self) -> Result<(), ServerError> {
        self.serve_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                // without a handler the server runs until killed
                error!("failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }
}

/// Bind, announce and serve `config` on a single-threaded runtime until interrupted.
pub fn run(config: &ServerConfig) -> Result<(), ServerError> {
    let rt = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(ServerError::Runtime)?;
    let server = LanServer::bind(config)?;
    let local_ip = probe::discover_local_address();
    println!("{}", server.banner(&local_ip)?);
    let served = rt.block_on(server.serve_until_interrupt());
    // abandoned connections and file reads must not keep the process alive
    rt.shutdown_background();
    served?;
    println!("\n\nServer stopped by user");
    Ok(())
}
