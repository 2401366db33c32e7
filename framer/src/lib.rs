#![forbid(unsafe_code)]

mod error;

pub use error::FrameError;

use keyhandler::KeyHandler;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use wire::Datagram;

/// Records larger than this are rejected without ever allocating a buffer
/// for them. 8 MiB comfortably exceeds any legitimate datagram this
/// protocol carries.
pub const DEFAULT_MAX_FRAME_LEN: u32 = 8 * 1024 * 1024;

/// Length-prefixed record reader/writer over a split async stream.
///
/// `recv` never surfaces a distinct error type to its caller: any framing
/// failure (short length read, oversized length, decrypt/padding failure,
/// base85 decode failure, JSON parse failure) is reported uniformly as
/// `None`, matching the protocol's "the loop just stops" contract. The
/// underlying cause is retained in `last_error` for diagnostics and tests.
pub struct Framer<R, W> {
    reader: R,
    writer: W,
    max_frame_len: u32,
    last_error: Option<FrameError>,
}

impl<R, W> Framer<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_max_frame_len(reader, writer, DEFAULT_MAX_FRAME_LEN)
    }

    pub fn with_max_frame_len(reader: R, writer: W, max_frame_len: u32) -> Self {
        Framer {
            reader,
            writer,
            max_frame_len,
            last_error: None,
        }
    }

    /// The cause of the most recent `None` returned by `recv`, if any.
    pub fn last_error(&self) -> Option<&FrameError> {
        self.last_error.as_ref()
    }

    /// Base85-encodes, encrypts, and writes `dg` as one length-prefixed
    /// record. A write failure (e.g. a reset connection) is swallowed: the
    /// caller observes it on the next `recv` as end-of-stream instead.
    pub async fn send(&mut self, dg: &Datagram, key_handler: &KeyHandler) {
        let payload = wire::base85::encode(dg.to_string_utf8().as_bytes());
        let ciphertext = match key_handler.encrypt(payload.as_bytes()) {
            Ok(ct) => ct,
            Err(_) => return,
        };
        let len = ciphertext.len() as u32;

        if self.writer.write_all(&len.to_be_bytes()).await.is_err() {
            return;
        }
        if self.writer.write_all(&ciphertext).await.is_err() {
            return;
        }
        let _ = self.writer.flush().await;
    }

    /// Reads, decrypts, and parses one record. Returns `None` on any
    /// framing failure; see `last_error` for the cause.
    pub async fn recv(&mut self, key_handler: &KeyHandler) -> Option<Datagram> {
        let mut len_buf = [0u8; 4];
        if self.reader.read_exact(&mut len_buf).await.is_err() {
            self.last_error = Some(FrameError::ShortLengthRead);
            return None;
        }
        let len = u32::from_be_bytes(len_buf);
        if len > self.max_frame_len {
            self.last_error = Some(FrameError::TooLarge(len, self.max_frame_len));
            return None;
        }

        // A single read, not read_exact: a peer that sends fewer body
        // bytes than it declared produces a body that fails to decrypt,
        // which this function reports the same way as any other framing
        // failure.
        let mut body = vec![0u8; len as usize];
        let got = match self.reader.read(&mut body).await {
            Ok(n) => n,
            Err(e) => {
                self.last_error = Some(FrameError::Io(e));
                return None;
            }
        };
        body.truncate(got);

        let plaintext = match key_handler.decrypt(&body) {
            Ok(pt) => pt,
            Err(e) => {
                self.last_error = Some(FrameError::Cipher(e));
                return None;
            }
        };
        let plaintext_str = match std::str::from_utf8(&plaintext) {
            Ok(s) => s,
            Err(_) => {
                self.last_error = Some(FrameError::NotUtf8);
                return None;
            }
        };
        let json_bytes = match wire::base85::decode(plaintext_str) {
            Ok(b) => b,
            Err(e) => {
                self.last_error = Some(FrameError::Base85(e));
                return None;
            }
        };
        let json_str = match std::str::from_utf8(&json_bytes) {
            Ok(s) => s,
            Err(_) => {
                self.last_error = Some(FrameError::NotUtf8);
                return None;
            }
        };
        match Datagram::from_string(json_str) {
            Ok(dg) => {
                self.last_error = None;
                Some(dg)
            }
            Err(e) => {
                self.last_error = Some(FrameError::Datagram(e));
                None
            }
        }
    }
}
