/// TCP listener accepting player connections

use crate::error::{MudError, Result};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

pub struct TcpServer {
    listener: TcpListener,
}

impl TcpServer {
    /// Bind the listener
    ///
    /// # Errors
    /// - `MudError::BindFailed`: address unparsable or already in use
    pub async fn bind(addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|source| MudError::BindFailed {
            addr: addr.to_string(),
            source,
        })?;

        info!("Listening on {}", addr);
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Wait for the next connection, with Nagle disabled for prompt echo
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr)> {
        let (stream, peer) = self.listener.accept().await?;
        stream.set_nodelay(true)?;

        debug!(%peer, "Accepted connection");
        Ok((stream, peer))
    }
}
