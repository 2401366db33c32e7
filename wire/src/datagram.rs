use serde_json::Value;

use crate::error::DatagramError;

/// The single message unit exchanged between nodes, after the framing and
/// cipher layers have been stripped away.
///
/// `command` and `sender` are set at construction and never change.
/// `recipient` and `data` may be rewritten after construction (coercing a
/// byte sequence to its UTF-8 string form); `hmac` is attached only while
/// carrying a login proof.
#[derive(Debug, Clone, PartialEq)]
pub struct Datagram {
    command: i32,
    sender: String,
    recipient: String,
    data: Value,
    hmac: Option<String>,
}

impl Datagram {
    pub fn new(command: i32, sender: impl Into<String>, recipient: impl Into<String>) -> Self {
        Datagram {
            command,
            sender: sender.into(),
            recipient: recipient.into(),
            data: Value::Null,
            hmac: None,
        }
    }

    pub fn command(&self) -> i32 {
        self.command
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn hmac(&self) -> Option<&str> {
        self.hmac.as_deref()
    }

    /// Replaces `recipient` with an arbitrary string.
    pub fn set_recipient(&mut self, recipient: impl Into<String>) {
        self.recipient = recipient.into();
    }

    /// Replaces `recipient`, decoding a byte sequence as UTF-8 (lossily).
    pub fn set_recipient_bytes(&mut self, recipient: &[u8]) {
        self.recipient = String::from_utf8_lossy(recipient).into_owned();
    }

    pub fn set_data(&mut self, data: Value) {
        self.data = data;
    }

    /// Replaces `data` with the UTF-8 (lossy) decoding of a byte sequence.
    pub fn set_data_bytes(&mut self, data: &[u8]) {
        self.data = Value::String(String::from_utf8_lossy(data).into_owned());
    }

    pub fn set_hmac(&mut self, hmac: impl Into<String>) {
        self.hmac = Some(hmac.into());
    }

    /// The `(sender, recipient)` pair identifying this datagram's route.
    pub fn route(&self) -> (&str, &str) {
        (&self.sender, &self.recipient)
    }

    pub fn to_string_utf8(&self) -> String {
        // Field order is fixed (wire's serde_json dependency carries
        // `preserve_order`) so peers that compare raw bytes rather than
        // parsing JSON still interoperate.
        let obj = serde_json::json!({
            "command": self.command,
            "sender": self.sender,
            "recipient": self.recipient,
            "data": self.data,
            "hmac": self.hmac,
        });
        obj.to_string()
    }

    pub fn from_string(s: &str) -> Result<Self, DatagramError> {
        let value: Value = serde_json::from_str(s)?;
        let obj = value.as_object().ok_or_else(|| DatagramError::Malformed {
            reason: "datagram is not a JSON object".to_string(),
        })?;

        let command = obj
            .get("command")
            .and_then(Value::as_i64)
            .ok_or_else(|| DatagramError::Malformed {
                reason: "missing or non-integer `command`".to_string(),
            })? as i32;

        let sender = obj
            .get("sender")
            .and_then(Value::as_str)
            .ok_or_else(|| DatagramError::Malformed {
                reason: "missing or non-string `sender`".to_string(),
            })?
            .to_string();

        let recipient = obj
            .get("recipient")
            .and_then(Value::as_str)
            .ok_or_else(|| DatagramError::Malformed {
                reason: "missing or non-string `recipient`".to_string(),
            })?
            .to_string();

        let data = obj
            .get("data")
            .cloned()
            .ok_or_else(|| DatagramError::Malformed {
                reason: "missing `data`".to_string(),
            })?;

        let hmac = match obj.get("hmac") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                return Err(DatagramError::Malformed {
                    reason: "`hmac` must be a string or null".to_string(),
                })
            }
        };

        Ok(Datagram {
            command,
            sender,
            recipient,
            data,
            hmac,
        })
    }
}
