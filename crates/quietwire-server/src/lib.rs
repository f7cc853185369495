//! Quietwire relay server.
//!
//! A trustless rendezvous point: clients connect over WebSocket, get an
//! ephemeral session id, exchange public key bundles through the relay, and
//! route ciphertext to each other. The relay stores no messages and holds no
//! key material beyond the public bundles clients publish.
//!
//! ## Architecture
//!
//! ```text
//! quietwire-server
//!   ├─ Server                  (bind + accept loop)
//!   ├─ ConnectionRegistry      (session ids, routing, lifecycle states)
//!   ├─ KeyExchangeCoordinator  (bundle storage + pairwise exchange)
//!   ├─ MessageRelay            (1:1 routing, group fan-out)
//!   ├─ GroupTable              (fixed-membership descriptors)
//!   └─ connection actor        (per-client select loop, heartbeats)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod connection;
mod error;
mod exchange;
mod groups;
mod rate_limit;
mod registry;
mod relay;

pub use config::ServerConfig;
use connection::ConnectionContext;
pub use error::{RelayError, ServerError};
pub use exchange::KeyExchangeCoordinator;
pub use groups::{GroupRecord, GroupTable};
pub use rate_limit::RateLimiter;
pub use registry::{ConnectionRegistry, ConnectionState};
pub use relay::MessageRelay;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Production relay server.
pub struct Server {
    listener: TcpListener,
    ctx: ConnectionContext,
}

impl Server {
    /// Create and bind a new server.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the configured address fails.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.bind_address).await?;

        let registry = ConnectionRegistry::new();
        let groups = GroupTable::new();
        let ctx = ConnectionContext {
            exchange: KeyExchangeCoordinator::new(registry.clone()),
            relay: MessageRelay::new(registry.clone(), groups),
            registry,
            config,
        };

        Ok(Self { listener, ctx })
    }

    /// The bound local address.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket has no local address.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the server, accepting connections until an accept error occurs.
    pub async fn run(self) -> Result<(), ServerError> {
        info!("relay accepting connections");

        loop {
            let (stream, addr) = self.listener.accept().await?;
            let ctx = self.ctx.clone();

            tokio::spawn(async move {
                let ws = match tokio_tungstenite::accept_async(stream).await {
                    Ok(ws) => ws,
                    Err(err) => {
                        warn!(%addr, %err, "websocket handshake failed");
                        return;
                    },
                };
                if let Err(err) = connection::serve(ws, ctx).await {
                    warn!(%addr, %err, "connection ended with error");
                }
            });
        }
    }
}
