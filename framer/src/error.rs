/// Diagnostic cause for a `None` return from [`crate::Framer::recv`].
///
/// The public contract is "the loop returns `None` and exits" — no framing
/// error is ever surfaced through a `Result` to dispatch code — but tests
/// and logging want to know *why*, so `Framer` stashes the most recent one
/// here.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("short read of the length prefix")]
    ShortLengthRead,
    #[error("declared frame length {0} exceeds the configured cap of {1} bytes")]
    TooLarge(u32, u32),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cipher error: {0}")]
    Cipher(#[from] keyhandler::KeyError),
    #[error("decrypted payload is not valid UTF-8")]
    NotUtf8,
    #[error("base85 decode error: {0}")]
    Base85(#[from] wire::base85::Base85Error),
    #[error("datagram decode error: {0}")]
    Datagram(#[from] wire::DatagramError),
}
