#[derive(Debug, thiserror::Error)]
pub enum DatagramError {
    #[error("malformed datagram: {reason}")]
    Malformed { reason: String },
    #[error("datagram is not valid JSON")]
    Json(#[from] serde_json::Error),
}
