/// Which side of a connection a [`crate::Node`] is playing.
///
/// This replaces the reference implementation's `ClientBase`/`ClientAI`
/// class split: both roles share one connection type, and behavior that
/// differs between them (who drives the login conversation, what shared
/// secrets are available) is carried as data on this value instead of as a
/// separate subclass.
pub enum Role {
    /// Opens the connection and presents credentials during login.
    Initiator,
    /// Accepts the connection, verifies credentials, and assigns the peer
    /// a fresh identity on successful login.
    Responder {
        hmac_key: Vec<u8>,
        challenge_key: Vec<u8>,
    },
}
