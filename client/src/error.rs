#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("could not connect to {0}: {1}")]
    Connect(String, std::io::Error),
    #[error("peer closed the connection during the handshake")]
    HandshakeFailed,
    #[error("login failed: {0}")]
    Login(#[from] login::LoginError),
    #[error("peer closed the connection during login")]
    Disconnected,
    #[error("server rejected the login: {}", .0.info())]
    Rejected(wire::ErrorCode),
    #[error("node state error: {0}")]
    Node(#[from] node::NodeError),
}
