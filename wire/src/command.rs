/// Command tag carried in every [`crate::Datagram`].
///
/// Negative values are reserved for control-plane commands that exist
/// outside of the application command space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Command {
    Shake = -1,
    Err = 0,
    Resp = 1,
    Login = 2,
}

impl Command {
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            -1 => Some(Command::Shake),
            0 => Some(Command::Err),
            1 => Some(Command::Resp),
            2 => Some(Command::Login),
            _ => None,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Error codes carried as the `data` payload of an `Err` datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    NoConnection = -1,
    Disconnect = 0,
    Credentials = 1,
    Hmac = 2,
    Challenge = 3,
    Verification = 4,
}

impl ErrorCode {
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            -1 => Some(ErrorCode::NoConnection),
            0 => Some(ErrorCode::Disconnect),
            1 => Some(ErrorCode::Credentials),
            2 => Some(ErrorCode::Hmac),
            3 => Some(ErrorCode::Challenge),
            4 => Some(ErrorCode::Verification),
            _ => None,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Human-readable description, mirroring the reference error info table.
    pub fn info(self) -> &'static str {
        match self {
            ErrorCode::NoConnection => "no connection is established",
            ErrorCode::Disconnect => "peer disconnected or sent an unrecognized command",
            ErrorCode::Credentials => "unknown user name",
            ErrorCode::Hmac => "HMAC verification failed",
            ErrorCode::Challenge => "SRP challenge could not be processed",
            ErrorCode::Verification => "SRP mutual verification failed",
        }
    }
}
