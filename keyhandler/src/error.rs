/// Errors raised by [`crate::KeyHandler`].
///
/// Both variants are fatal to the owning connection: `AlreadySet` is a
/// programming error (a write-once field assigned twice), `BadPadding` means
/// the peer sent a record that does not decrypt cleanly under the installed
/// cipher(s).
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("counter key or counter cipher was already set")]
    AlreadySet,
    #[error("invalid PKCS#7 padding")]
    BadPadding,
}
