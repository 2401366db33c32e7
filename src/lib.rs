#![forbid(unsafe_code)]

//! Re-exports the crates that make up a jugg connection endpoint, plus the
//! inert configuration record hosts use to construct them. Configuration
//! *loading* (files, environment variables) is the host's job; this crate
//! only describes the shape of what a host must supply.

use std::path::PathBuf;

pub use client::{Client, ClientError};
pub use framer::{FrameError, Framer};
pub use keyhandler::{KeyError, KeyHandler};
pub use login::{ClientLogin, LoginError, ServerLogin};
pub use node::{DispatchOutcome, Node, NodeError, Role};
pub use server::{Acceptor, Credentials, ServerError};
pub use wire::{Command, Datagram, DatagramError, ErrorCode};

/// Everything a host must supply to stand up a jugg client or server.
///
/// An inert data record: nothing in this crate reads it from a file or the
/// environment. `want_ssl`/`crt_file`/`key_file` are carried through for the
/// host's own use — TLS wrapping of the stream happens before it reaches
/// [`Client::connect`] or [`Acceptor::bind`], not inside this workspace.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub want_ssl: bool,
    pub crt_file: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    pub hmac_key: Vec<u8>,
    pub challenge_password: Vec<u8>,
    pub name_regex: Option<String>,
}

impl Config {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            hmac_key: self.hmac_key.clone(),
            challenge_key: self.challenge_password.clone(),
        }
    }
}
