#![forbid(unsafe_code)]

mod error;

pub use error::ClientError;

use login::ClientLogin;
use node::{Node, Role};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use wire::{Command, Datagram, ErrorCode};

/// Turns a server reply into an error if it was a coded `ERR` rather than
/// the expected `RESP`.
fn reject_if_error(dg: &Datagram) -> Result<(), ClientError> {
    if Command::from_i32(dg.command()) == Some(Command::Err) {
        let code = dg
            .data()
            .as_i64()
            .and_then(|v| ErrorCode::from_i32(v as i32))
            .unwrap_or(ErrorCode::Disconnect);
        return Err(ClientError::Rejected(code));
    }
    Ok(())
}

/// The initiator side of a connection: dials a server, completes the
/// Diffie-Hellman handshake, and authenticates over SRP-6a bound by HMAC.
pub struct Client {
    node: Node<OwnedReadHalf, OwnedWriteHalf>,
}

impl Client {
    /// Connects to `addr` and completes the cleartext DH handshake. Login
    /// is a separate step ([`Client::login`]) so callers can inspect the
    /// negotiated node before presenting credentials.
    pub async fn connect(addr: &str) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| ClientError::Connect(addr.to_string(), e))?;
        let (read_half, write_half) = stream.into_split();
        let mut node = Node::new(read_half, write_half, Role::Initiator);

        if !node.handshake().await {
            return Err(ClientError::HandshakeFailed);
        }

        Ok(Client { node })
    }

    /// Runs the full SRP-6a login conversation over the connection
    /// established by [`Client::connect`], installing the negotiated
    /// session key as the counter cipher and setting this node's name on
    /// success.
    pub async fn login(
        &mut self,
        name: &str,
        hmac_key: &[u8],
        password: &[u8],
    ) -> Result<(), ClientError> {
        let (login_dg, login) = ClientLogin::start(name, hmac_key, password);
        self.node.send(&login_dg).await;
        tracing::debug!(name, "sent LOGIN");

        let ack = self.node.recv().await.ok_or(ClientError::Disconnected)?;
        reject_if_error(&ack)?;

        let (ephemeral_dg, login) = login.send_ephemeral();
        self.node.send(&ephemeral_dg).await;

        let challenge_dg = self.node.recv().await.ok_or(ClientError::Disconnected)?;
        reject_if_error(&challenge_dg)?;
        let pair = challenge_dg
            .data()
            .as_array()
            .ok_or(ClientError::Login(login::LoginError::Challenge(
                "challenge response was not a two-element array",
            )))?;
        let salt_hex = pair.first().and_then(|v| v.as_str()).unwrap_or_default();
        let b_pub_hex = pair.get(1).and_then(|v| v.as_str()).unwrap_or_default();
        let (proof_dg, login) = login.process_challenge(salt_hex, b_pub_hex)?;
        self.node.send(&proof_dg).await;

        let hamk_dg = self.node.recv().await.ok_or(ClientError::Disconnected)?;
        reject_if_error(&hamk_dg)?;
        let (verified_name, fresh_id, session_key) = login.finish(&hamk_dg)?;

        self.node.install_session_cipher(&session_key)?;
        self.node.set_name(verified_name)?;
        self.node.set_id(fresh_id)?;
        tracing::debug!(node = self.node.id(), "login succeeded");
        Ok(())
    }

    /// Resumes the idle dispatch loop (error handling, future traffic)
    /// after a successful login. Returns once the peer disconnects.
    pub async fn serve(&mut self) {
        self.node.serve().await;
    }

    pub fn name(&self) -> Option<&str> {
        self.node.name()
    }

    pub fn node(&self) -> &Node<OwnedReadHalf, OwnedWriteHalf> {
        &self.node
    }
}
