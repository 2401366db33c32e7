use wire::ErrorCode;

/// Failure of a step in the SRP-6a-bound-by-HMAC login handshake. Each
/// variant names the coded `ErrorCode` the owning `Node` should send back
/// to the peer before tearing down the connection.
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("name did not pass validation")]
    Credentials,
    #[error("HMAC verification failed")]
    Hmac,
    #[error("SRP challenge could not be processed: {0}")]
    Challenge(&'static str),
    #[error("SRP mutual verification failed")]
    Verification,
}

impl LoginError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LoginError::Credentials => ErrorCode::Credentials,
            LoginError::Hmac => ErrorCode::Hmac,
            LoginError::Challenge(_) => ErrorCode::Challenge,
            LoginError::Verification => ErrorCode::Verification,
        }
    }
}
