//! TCP listener binding.
//!
//! # Responsibilities
//! - Parse the configured bind address
//! - Bind the single HTTP port shared by every virtual host
//! - Report the bound address (needed when binding port 0)

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The bind address is not `ip:port`.
    #[error("invalid bind address '{address}': {message}")]
    InvalidAddress { address: String, message: String },

    /// Failed to bind to address.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Bind a listener on `bind_address` (e.g. "0.0.0.0:80").
pub async fn bind(bind_address: &str) -> Result<(TcpListener, SocketAddr), ListenerError> {
    let addr: SocketAddr = bind_address
        .parse()
        .map_err(|e: std::net::AddrParseError| ListenerError::InvalidAddress {
            address: bind_address.to_string(),
            message: e.to_string(),
        })?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ListenerError::Bind { address: addr, source })?;

    let local_addr = listener
        .local_addr()
        .map_err(|source| ListenerError::Bind { address: addr, source })?;

    tracing::info!(address = %local_addr, "Listener bound");

    Ok((listener, local_addr))
}
