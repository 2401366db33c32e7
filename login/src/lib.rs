#![forbid(unsafe_code)]

mod client;
mod error;
mod server;

pub use client::{AwaitingChallenge, AwaitingVerification, ClientLogin};
pub use error::LoginError;
pub use server::{AwaitingEphemeral, AwaitingProof, ServerLogin};
