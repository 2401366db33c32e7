#![forbid(unsafe_code)]

mod error;

pub use error::ServerError;

use std::net::SocketAddr;

use node::{Node, Role};
use socket2::{Domain, Socket, Type};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::task::JoinSet;

/// Shared login secrets handed to every accepted connection.
#[derive(Clone)]
pub struct Credentials {
    pub hmac_key: Vec<u8>,
    pub challenge_key: Vec<u8>,
}

/// Binds a listener and runs one task per accepted connection, tracking
/// the set of in-flight connection tasks so they can all be waited on (or
/// implicitly cancelled by dropping the `Acceptor`).
///
/// Mirrors the reference implementation's bind-with-`SO_REUSEADDR` and
/// per-connection-task shape, modernized from a hand-polled connection
/// stream to a `tokio::task::JoinSet`.
pub struct Acceptor {
    listener: TcpListener,
    credentials: Credentials,
    tasks: JoinSet<()>,
}

impl Acceptor {
    pub async fn bind(addr: SocketAddr, credentials: Credentials) -> Result<Self, ServerError> {
        let domain = if addr.is_ipv6() {
            Domain::IPV6
        } else {
            Domain::IPV4
        };
        let socket = Socket::new(domain, Type::STREAM, None)
            .map_err(|e| ServerError::Bind(addr.to_string(), e))?;
        socket
            .set_reuse_address(true)
            .map_err(|e| ServerError::Bind(addr.to_string(), e))?;
        socket
            .bind(&addr.into())
            .map_err(|e| ServerError::Bind(addr.to_string(), e))?;
        socket
            .listen(128)
            .map_err(|e| ServerError::Bind(addr.to_string(), e))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| ServerError::Bind(addr.to_string(), e))?;

        let listener = TcpListener::from_std(socket.into())
            .map_err(|e| ServerError::Bind(addr.to_string(), e))?;

        Ok(Acceptor {
            listener,
            credentials,
            tasks: JoinSet::new(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until an I/O error occurs, spawning a fresh
    /// responder `Node` task for each. Does not return on a clean
    /// shutdown request; callers that want graceful cancellation should
    /// race this future against their own cancellation signal and then
    /// drop the `Acceptor`, which aborts every outstanding task.
    pub async fn run(&mut self) -> std::io::Error {
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(pair) => pair,
                Err(e) => return e,
            };
            tracing::debug!(%peer, "accepted connection");

            let credentials = self.credentials.clone();
            self.tasks.spawn(async move {
                let (read_half, write_half): (OwnedReadHalf, OwnedWriteHalf) = stream.into_split();
                let mut node = Node::new(
                    read_half,
                    write_half,
                    Role::Responder {
                        hmac_key: credentials.hmac_key,
                        challenge_key: credentials.challenge_key,
                    },
                );
                node.run().await;
                tracing::debug!(node = node.id(), "connection closed");
            });

            // Reap finished tasks without blocking the accept loop.
            while self.tasks.try_join_next().is_some() {}
        }
    }

    /// Number of connection tasks currently tracked (finished tasks are
    /// reaped lazily on the next `run` iteration or on `shutdown`).
    pub fn live_connections(&self) -> usize {
        self.tasks.len()
    }

    /// Aborts every outstanding connection task.
    pub fn shutdown(&mut self) {
        self.tasks.abort_all();
    }
}
