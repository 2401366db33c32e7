#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("name was already set")]
    AlreadySet,
    #[error("cipher state error: {0}")]
    Cipher(#[from] keyhandler::KeyError),
}
