use keyhandler::KeyHandler;
use rand::RngCore;
use sha1::Sha1;
use srp::client::{SrpClient, SrpClientVerifier};
use srp::groups::G_2048;
use wire::{Command, Datagram};

use crate::error::LoginError;

/// Client-side SRP-6a login state machine, one instance per connection
/// attempt. Each step consumes `self` and returns the next state together
/// with the datagram to send, matching the one-shot nature of the
/// handshake (there is no retry of an individual step).
pub struct ClientLogin {
    name: String,
    hmac_key: Vec<u8>,
    password: Vec<u8>,
    secret_a: Vec<u8>,
}

/// Reached after the client has sent its ephemeral public value and is
/// waiting on the server's salt/challenge.
pub struct AwaitingChallenge {
    name: String,
    password: Vec<u8>,
    secret_a: Vec<u8>,
}

/// Reached after the client has answered the challenge with its proof and
/// is waiting on the server's `HAMK`.
pub struct AwaitingVerification {
    name: String,
    verifier: SrpClientVerifier<Sha1>,
}

impl ClientLogin {
    /// Builds the initial `LOGIN` datagram (name + HMAC over its UTF-8
    /// bytes) and the continuation used to drive the rest of the exchange.
    pub fn start(name: &str, hmac_key: &[u8], password: &[u8]) -> (Datagram, ClientLogin) {
        let tag = KeyHandler::hmac_sign(name.as_bytes(), hmac_key);
        let mut dg = Datagram::new(Command::Login.as_i32(), name, "");
        dg.set_data_bytes(name.as_bytes());
        dg.set_hmac(tag);

        let mut secret_a = vec![0u8; 64];
        rand::thread_rng().fill_bytes(&mut secret_a);

        (
            dg,
            ClientLogin {
                name: name.to_string(),
                hmac_key: hmac_key.to_vec(),
                password: password.to_vec(),
                secret_a,
            },
        )
    }

    /// Wraps the client's SRP ephemeral public value `A` as a `RESP`.
    pub fn send_ephemeral(self) -> (Datagram, AwaitingChallenge) {
        let client = SrpClient::<Sha1>::new(&G_2048);
        let a_pub = client.compute_public_ephemeral(&self.secret_a);

        let mut dg = Datagram::new(Command::Resp.as_i32(), &self.name, "");
        dg.set_data(serde_json::Value::String(hex::encode(a_pub)));

        (
            dg,
            AwaitingChallenge {
                name: self.name,
                password: self.password,
                secret_a: self.secret_a,
            },
        )
    }

    pub fn hmac_key(&self) -> &[u8] {
        &self.hmac_key
    }
}

impl AwaitingChallenge {
    /// Processes the server's `[hex(s), hex(B)]` challenge, returning the
    /// `RESP` carrying the client proof `M`.
    pub fn process_challenge(
        self,
        salt_hex: &str,
        b_pub_hex: &str,
    ) -> Result<(Datagram, AwaitingVerification), LoginError> {
        if salt_hex.is_empty() || b_pub_hex.is_empty() {
            return Err(LoginError::Challenge("missing salt or server ephemeral"));
        }
        let salt = hex::decode(salt_hex).map_err(|_| LoginError::Challenge("bad salt hex"))?;
        let b_pub =
            hex::decode(b_pub_hex).map_err(|_| LoginError::Challenge("bad ephemeral hex"))?;

        let client = SrpClient::<Sha1>::new(&G_2048);
        let verifier = client
            .process_reply(
                &self.secret_a,
                self.name.as_bytes(),
                &self.password,
                &salt,
                &b_pub,
            )
            .map_err(|_| LoginError::Challenge("process_reply rejected server ephemeral"))?;

        let mut dg = Datagram::new(Command::Resp.as_i32(), &self.name, "");
        dg.set_data(serde_json::Value::String(hex::encode(verifier.proof())));

        Ok((
            dg,
            AwaitingVerification {
                name: self.name,
                verifier,
            },
        ))
    }
}

impl AwaitingVerification {
    /// Verifies the server's `HAMK` proof and, on success, returns the
    /// login name, the fresh identity the server minted for this
    /// connection (carried in the `HAMK` datagram's `recipient`), and the
    /// negotiated SRP session key to install as the counter cipher.
    pub fn finish(self, hamk_dg: &Datagram) -> Result<(String, String, Vec<u8>), LoginError> {
        let hamk_hex = hamk_dg.data().as_str().unwrap_or_default();
        if hamk_hex.is_empty() {
            return Err(LoginError::Verification);
        }
        let hamk = hex::decode(hamk_hex).map_err(|_| LoginError::Verification)?;
        self.verifier
            .verify_server(&hamk)
            .map_err(|_| LoginError::Verification)?;

        let fresh_id = hamk_dg.recipient();
        if fresh_id.is_empty() {
            return Err(LoginError::Verification);
        }

        Ok((self.name, fresh_id.to_string(), self.verifier.key().to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_produces_a_login_datagram_with_hmac() {
        let (dg, login) = ClientLogin::start("alice", b"hmac-key", b"s3cret");
        assert_eq!(dg.command(), Command::Login.as_i32());
        assert!(dg.hmac().is_some());
        assert!(KeyHandler::hmac_verify(
            dg.hmac().unwrap(),
            b"alice",
            login.hmac_key()
        ));
    }

    #[test]
    fn process_challenge_rejects_empty_fields() {
        let (_, login) = ClientLogin::start("alice", b"hmac-key", b"s3cret");
        let (_, awaiting) = login.send_ephemeral();
        let err = awaiting.process_challenge("", "").unwrap_err();
        assert!(matches!(err, LoginError::Challenge(_)));
    }
}
