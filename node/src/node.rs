use framer::Framer;
use keyhandler::KeyHandler;
use login::ServerLogin;
use num_bigint::BigUint;
use rand::RngCore;
use tokio::io::{AsyncRead, AsyncWrite};
use wire::{Command, Datagram, ErrorCode};

use crate::dispatch::DispatchOutcome;
use crate::error::NodeError;
use crate::role::Role;

/// An endpoint of one connection: the framed record I/O, the cryptographic
/// state, and the write-once identity fields, regardless of which side of
/// the handshake this particular node is playing.
pub struct Node<R, W> {
    framer: Framer<R, W>,
    key_handler: KeyHandler,
    id: String,
    id_reassigned: bool,
    name: Option<String>,
    role: Role,
    logged_in: bool,
}

impl<R, W> Node<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, role: Role) -> Self {
        let mut id_bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut id_bytes);

        Node {
            framer: Framer::new(reader, writer),
            key_handler: KeyHandler::new(),
            id: hex::encode(id_bytes),
            id_reassigned: false,
            name: None,
            role,
            logged_in: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Replaces the connection-local id generated at construction with a
    /// fresh identity minted by the peer (the server, on successful
    /// login). May only be called once.
    pub fn set_id(&mut self, id: impl Into<String>) -> Result<(), NodeError> {
        if self.id_reassigned {
            return Err(NodeError::AlreadySet);
        }
        self.id = id.into();
        self.id_reassigned = true;
        Ok(())
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    pub fn key_handler(&self) -> &KeyHandler {
        &self.key_handler
    }

    /// Assigns the post-login identity. May only be called once.
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<(), NodeError> {
        if self.name.is_some() {
            return Err(NodeError::AlreadySet);
        }
        self.name = Some(name.into());
        Ok(())
    }

    /// Sends the initial `SHAKE` datagram carrying this node's DH public
    /// value, in cleartext: the outer encrypt is a no-op until the peer's
    /// counterpart is installed.
    pub async fn send_shake(&mut self) {
        let mut dg = Datagram::new(Command::Shake.as_i32(), &self.id, &self.id);
        dg.set_data(serde_json::Value::String(
            self.key_handler.public_key().to_string(),
        ));
        self.framer.send(&dg, &self.key_handler).await;
    }

    pub async fn send(&mut self, dg: &Datagram) {
        self.framer.send(dg, &self.key_handler).await;
    }

    pub async fn recv(&mut self) -> Option<Datagram> {
        self.framer.recv(&self.key_handler).await
    }

    pub async fn send_error(&mut self, code: ErrorCode) {
        let mut dg = Datagram::new(Command::Err.as_i32(), &self.id, &self.id);
        dg.set_data(serde_json::json!(code.as_i32()));
        self.send(&dg).await;
    }

    fn handle_handshake(&mut self, dg: &Datagram) -> DispatchOutcome {
        let parsed = dg
            .data()
            .as_str()
            .and_then(|s| s.parse::<BigUint>().ok());
        match parsed {
            Some(counter_key) => match self.key_handler.set_counter_key(&counter_key) {
                Ok(()) => DispatchOutcome::Continue,
                Err(err) => {
                    tracing::warn!(node = %self.id, %err, "duplicate SHAKE datagram");
                    DispatchOutcome::Terminate
                }
            },
            None => {
                tracing::warn!(node = %self.id, "SHAKE datagram did not carry a valid public key");
                DispatchOutcome::Terminate
            }
        }
    }

    fn handle_error(&mut self, dg: &Datagram) -> DispatchOutcome {
        let code = dg
            .data()
            .as_i64()
            .and_then(|v| ErrorCode::from_i32(v as i32));
        tracing::warn!(node = %self.id, ?code, "peer reported an error");
        if self.logged_in {
            DispatchOutcome::Continue
        } else {
            DispatchOutcome::Terminate
        }
    }

    /// Drives the full server-side SRP login conversation for a freshly
    /// received `LOGIN` datagram, reading the intervening `RESP` frames
    /// directly rather than through [`Node::dispatch`]. Only meaningful
    /// for a `Responder` node; an `Initiator` that receives `LOGIN` treats
    /// it as an unexpected command.
    async fn handle_login(&mut self, dg: Datagram) -> DispatchOutcome {
        let (hmac_key, challenge_key) = match &self.role {
            Role::Responder {
                hmac_key,
                challenge_key,
            } => (hmac_key.clone(), challenge_key.clone()),
            Role::Initiator => {
                self.send_error(ErrorCode::Disconnect).await;
                return DispatchOutcome::Continue;
            }
        };

        let server = ServerLogin::new(&hmac_key, &challenge_key);
        let name = match server.verify_name(&dg) {
            Ok(n) => n,
            Err(e) => {
                self.send_error(e.code()).await;
                return DispatchOutcome::Terminate;
            }
        };

        let (ack, server) = match server.verify_hmac(&name, dg.hmac()) {
            Ok(pair) => pair,
            Err(e) => {
                self.send_error(e.code()).await;
                return DispatchOutcome::Terminate;
            }
        };
        self.send(&ack).await;

        let Some(ephemeral_dg) = self.recv().await else {
            return DispatchOutcome::Terminate;
        };
        let a_pub_hex = ephemeral_dg.data().as_str().unwrap_or_default();
        let (challenge_dg, server) = match server.challenge(a_pub_hex) {
            Ok(pair) => pair,
            Err(e) => {
                self.send_error(e.code()).await;
                return DispatchOutcome::Terminate;
            }
        };
        self.send(&challenge_dg).await;

        let Some(proof_dg) = self.recv().await else {
            return DispatchOutcome::Terminate;
        };
        let m_hex = proof_dg.data().as_str().unwrap_or_default();
        let (hamk_dg, session_key, fresh_id) = match server.verify_session(m_hex) {
            Ok(triple) => triple,
            Err(e) => {
                self.send_error(e.code()).await;
                return DispatchOutcome::Terminate;
            }
        };
        self.send(&hamk_dg).await;

        if self.key_handler.set_counter_cipher(&session_key).is_err() {
            tracing::warn!(node = %self.id, "counter cipher already installed");
            return DispatchOutcome::Terminate;
        }
        if self.set_name(name).is_err() {
            return DispatchOutcome::Terminate;
        }
        if self.set_id(fresh_id).is_err() {
            return DispatchOutcome::Terminate;
        }
        self.logged_in = true;
        tracing::debug!(node = %self.id, name = ?self.name, "login succeeded");
        DispatchOutcome::Continue
    }

    async fn dispatch(&mut self, dg: Datagram) -> DispatchOutcome {
        match Command::from_i32(dg.command()) {
            Some(Command::Shake) => self.handle_handshake(&dg),
            Some(Command::Err) => self.handle_error(&dg),
            Some(Command::Login) => self.handle_login(dg).await,
            Some(Command::Resp) | None => {
                self.send_error(ErrorCode::Disconnect).await;
                DispatchOutcome::Continue
            }
        }
    }

    async fn dispatch_loop(&mut self) {
        loop {
            match self.recv().await {
                None => break,
                Some(dg) => {
                    if self.dispatch(dg).await == DispatchOutcome::Terminate {
                        break;
                    }
                }
            }
        }
    }

    /// Sends the cleartext handshake and then loops receiving and
    /// dispatching datagrams until the peer disconnects or a handler
    /// signals termination. Used by a `Responder` node, whose peer's
    /// `LOGIN` arrives through this same loop.
    pub async fn run(&mut self) {
        self.send_shake().await;
        self.dispatch_loop().await;
    }

    /// Sends this node's `SHAKE` and waits for the peer's, installing the
    /// counter key. Used by an `Initiator`, which drives the rest of the
    /// login conversation explicitly rather than through the dispatch
    /// loop. Returns `false` if the peer disconnected or did not send a
    /// usable `SHAKE`.
    pub async fn handshake(&mut self) -> bool {
        self.send_shake().await;
        match self.recv().await {
            Some(dg) if Command::from_i32(dg.command()) == Some(Command::Shake) => {
                matches!(self.handle_handshake(&dg), DispatchOutcome::Continue)
            }
            _ => false,
        }
    }

    /// Installs the SRP-derived session key as the counter cipher, once
    /// login completes successfully.
    pub fn install_session_cipher(&mut self, session_key: &[u8]) -> Result<(), NodeError> {
        self.key_handler.set_counter_cipher(session_key)?;
        Ok(())
    }

    /// Resumes the idle dispatch loop (`ERR` handling) after an
    /// `Initiator` has completed login on its own.
    pub async fn serve(&mut self) {
        self.dispatch_loop().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use login::ClientLogin;
    use tokio::io::{split, DuplexStream};

    type TestNode = Node<tokio::io::ReadHalf<DuplexStream>, tokio::io::WriteHalf<DuplexStream>>;

    fn pair() -> (TestNode, TestNode) {
        let (client_io, server_io) = tokio::io::duplex(8192);
        let (client_r, client_w) = split(client_io);
        let (server_r, server_w) = split(server_io);

        let client = Node::new(client_r, client_w, Role::Initiator);
        let server = Node::new(
            server_r,
            server_w,
            Role::Responder {
                hmac_key: b"hmac-key".to_vec(),
                challenge_key: b"password".to_vec(),
            },
        );
        (client, server)
    }

    #[tokio::test]
    async fn full_handshake_and_login_drive_both_nodes_into_the_logged_in_state() {
        let (mut client, mut server) = pair();

        let server_task = tokio::spawn(async move {
            server.run().await;
            server
        });

        assert!(client.handshake().await);

        let (login_dg, client_login) = ClientLogin::start("alice", b"hmac-key", b"password");
        client.send(&login_dg).await;

        let ack = client.recv().await.expect("ack");
        assert_eq!(ack.data(), &serde_json::Value::Bool(true));

        let (ephemeral_dg, client_login) = client_login.send_ephemeral();
        client.send(&ephemeral_dg).await;

        let challenge_dg = client.recv().await.expect("challenge");
        let pair = challenge_dg.data().as_array().unwrap();
        let salt_hex = pair[0].as_str().unwrap();
        let b_pub_hex = pair[1].as_str().unwrap();
        let (proof_dg, client_login) = client_login.process_challenge(salt_hex, b_pub_hex).unwrap();
        client.send(&proof_dg).await;

        let hamk_dg = client.recv().await.expect("hamk");
        let (verified_name, fresh_id, session_key) = client_login.finish(&hamk_dg).unwrap();

        client.install_session_cipher(&session_key).unwrap();
        client.set_name(verified_name.clone()).unwrap();
        client.set_id(fresh_id.clone()).unwrap();

        assert_eq!(client.name(), Some("alice"));
        assert_eq!(client.id(), fresh_id);

        drop(client);
        let server = server_task.await.unwrap();
        assert!(server.is_logged_in());
        assert_eq!(server.name(), Some("alice"));
        assert_eq!(server.id(), fresh_id);
    }

    #[tokio::test]
    async fn bad_hmac_terminates_the_server_side_connection() {
        let (mut client, mut server) = pair();
        let server_task = tokio::spawn(async move {
            server.run().await;
            server
        });

        assert!(client.handshake().await);

        let (mut login_dg, _client_login) = ClientLogin::start("alice", b"hmac-key", b"password");
        login_dg.set_hmac("garbage-tag");
        client.send(&login_dg).await;

        let err_dg = client.recv().await.expect("err datagram");
        assert_eq!(Command::from_i32(err_dg.command()), Some(Command::Err));

        drop(client);
        let server = server_task.await.unwrap();
        assert!(!server.is_logged_in());
    }
}
