use rand::RngCore;
use sha1::Sha1;
use srp::groups::G_2048;
use srp::server::{SrpServer, SrpServerVerifier};
use wire::{is_valid_name, Command, Datagram};

use crate::error::LoginError;

/// Server-side SRP-6a login state machine for one in-progress connection.
///
/// The workspace authenticates against a single configured `challenge_key`
/// shared across all names rather than a per-user credential store — the
/// verifier is derived fresh from `(name, challenge_key)` on every login
/// attempt, matching the single-password deployment the reference
/// implementation demonstrates.
pub struct ServerLogin {
    hmac_key: Vec<u8>,
    challenge_key: Vec<u8>,
}

pub struct AwaitingEphemeral {
    name: String,
    challenge_key: Vec<u8>,
}

pub struct AwaitingProof {
    name: String,
    secret_b: Vec<u8>,
    verifier_bytes: Vec<u8>,
    a_pub: Vec<u8>,
}

impl ServerLogin {
    pub fn new(hmac_key: &[u8], challenge_key: &[u8]) -> Self {
        ServerLogin {
            hmac_key: hmac_key.to_vec(),
            challenge_key: challenge_key.to_vec(),
        }
    }

    /// Extracts and validates the login name from a `LOGIN` datagram.
    pub fn verify_name(&self, dg: &Datagram) -> Result<String, LoginError> {
        let name = dg.data().as_str().ok_or(LoginError::Credentials)?;
        if !is_valid_name(name) {
            return Err(LoginError::Credentials);
        }
        Ok(name.to_string())
    }

    /// Verifies the HMAC carried on the `LOGIN` datagram and, on success,
    /// returns the continuation for the SRP ephemeral exchange together
    /// with the `RESP { data: true }` acknowledgement to send.
    pub fn verify_hmac(
        self,
        name: &str,
        hmac_tag: Option<&str>,
    ) -> Result<(Datagram, AwaitingEphemeral), LoginError> {
        let tag = hmac_tag.ok_or(LoginError::Hmac)?;
        if !keyhandler::KeyHandler::hmac_verify(tag, name.as_bytes(), &self.hmac_key) {
            return Err(LoginError::Hmac);
        }

        let mut dg = Datagram::new(Command::Resp.as_i32(), "", name);
        dg.set_data(serde_json::Value::Bool(true));

        Ok((
            dg,
            AwaitingEphemeral {
                name: name.to_string(),
                challenge_key: self.challenge_key,
            },
        ))
    }
}

impl AwaitingEphemeral {
    /// Builds a fresh salt and verifier for `name`, computes the server's
    /// ephemeral public value against the client's `A`, and returns the
    /// `RESP { data: [hex(s), hex(B)] }` challenge.
    pub fn challenge(
        self,
        a_pub_hex: &str,
    ) -> Result<(Datagram, AwaitingProof), LoginError> {
        if a_pub_hex.is_empty() {
            return Err(LoginError::Challenge("missing client ephemeral"));
        }
        let a_pub = hex::decode(a_pub_hex).map_err(|_| LoginError::Challenge("bad ephemeral hex"))?;

        let mut salt = vec![0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);

        let client = srp::client::SrpClient::<Sha1>::new(&G_2048);
        let verifier_bytes = client.compute_verifier(self.name.as_bytes(), &self.challenge_key, &salt);

        let mut secret_b = vec![0u8; 64];
        rand::thread_rng().fill_bytes(&mut secret_b);

        let server = SrpServer::<Sha1>::new(&G_2048);
        let b_pub = server.compute_public_ephemeral(&secret_b, &verifier_bytes);

        let mut dg = Datagram::new(Command::Resp.as_i32(), "", &self.name);
        dg.set_data(serde_json::json!([hex::encode(&salt), hex::encode(&b_pub)]));

        Ok((
            dg,
            AwaitingProof {
                name: self.name,
                secret_b,
                verifier_bytes,
                a_pub,
            },
        ))
    }
}

impl AwaitingProof {
    /// Verifies the client's proof `M`, returning the `RESP { HAMK }`
    /// datagram (whose `recipient` carries a freshly minted identity for
    /// the now-authenticated client), the negotiated session key, and that
    /// same fresh identity for the caller to adopt as its own node id. A
    /// failed verification leaves the session key uninstalled by the
    /// caller (this function simply does not hand one back).
    pub fn verify_session(self, m_hex: &str) -> Result<(Datagram, Vec<u8>, String), LoginError> {
        if m_hex.is_empty() {
            return Err(LoginError::Verification);
        }
        let client_proof = hex::decode(m_hex).map_err(|_| LoginError::Verification)?;

        let server = SrpServer::<Sha1>::new(&G_2048);
        let verifier: SrpServerVerifier<Sha1> = server
            .process_reply(&self.secret_b, &self.verifier_bytes, &self.a_pub)
            .map_err(|_| LoginError::Verification)?;

        verifier
            .verify_client(&client_proof)
            .map_err(|_| LoginError::Verification)?;

        let mut fresh_id_bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut fresh_id_bytes);
        let fresh_id = hex::encode(fresh_id_bytes);

        let mut dg = Datagram::new(Command::Resp.as_i32(), "", &fresh_id);
        dg.set_data(serde_json::Value::String(hex::encode(verifier.proof())));

        Ok((dg, verifier.key().to_vec(), fresh_id))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientLogin;

    #[test]
    fn full_login_exchange_converges_on_matching_session_keys() {
        let hmac_key = b"shared-hmac-key";
        let challenge_key = b"shared-srp-password";

        let (login_dg, client) = ClientLogin::start("alice", hmac_key, challenge_key);

        let server = ServerLogin::new(hmac_key, challenge_key);
        let name = server.verify_name(&login_dg).unwrap();
        let (_, server) = server.verify_hmac(&name, login_dg.hmac()).unwrap();

        let (ephemeral_dg, client) = client.send_ephemeral();
        let a_pub_hex = ephemeral_dg.data().as_str().unwrap();
        let (challenge_dg, server) = server.challenge(a_pub_hex).unwrap();

        let pair = challenge_dg.data().as_array().unwrap();
        let salt_hex = pair[0].as_str().unwrap();
        let b_pub_hex = pair[1].as_str().unwrap();
        let (proof_dg, client) = client.process_challenge(salt_hex, b_pub_hex).unwrap();

        let m_hex = proof_dg.data().as_str().unwrap();
        let (hamk_dg, server_key, fresh_id) = server.verify_session(m_hex).unwrap();

        let (verified_name, client_id, client_key) = client.finish(&hamk_dg).unwrap();

        assert_eq!(verified_name, "alice");
        assert_eq!(client_id, fresh_id);
        assert_eq!(client_key, server_key);
    }

    #[test]
    fn wrong_password_fails_client_side_verification() {
        let hmac_key = b"shared-hmac-key";
        let (login_dg, client) = ClientLogin::start("alice", hmac_key, b"wrong-password");

        let server = ServerLogin::new(hmac_key, b"real-password");
        let name = server.verify_name(&login_dg).unwrap();
        let (_, server) = server.verify_hmac(&name, login_dg.hmac()).unwrap();

        let (ephemeral_dg, client) = client.send_ephemeral();
        let a_pub_hex = ephemeral_dg.data().as_str().unwrap();
        let (challenge_dg, server) = server.challenge(a_pub_hex).unwrap();

        let pair = challenge_dg.data().as_array().unwrap();
        let salt_hex = pair[0].as_str().unwrap();
        let b_pub_hex = pair[1].as_str().unwrap();
        let (proof_dg, _client) = client.process_challenge(salt_hex, b_pub_hex).unwrap();

        let m_hex = proof_dg.data().as_str().unwrap();
        let err = server.verify_session(m_hex).unwrap_err();
        assert!(matches!(err, LoginError::Verification));
    }

    #[test]
    fn tampered_hmac_is_rejected() {
        let (mut login_dg, _client) = ClientLogin::start("alice", b"real-key", b"pw");
        login_dg.set_hmac("not-the-right-tag");

        let server = ServerLogin::new(b"real-key", b"pw");
        let name = server.verify_name(&login_dg).unwrap();
        let err = server.verify_hmac(&name, login_dg.hmac()).unwrap_err();
        assert!(matches!(err, LoginError::Hmac));
    }
}
