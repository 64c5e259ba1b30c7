//! Data model and wire helpers for Warden.
//!
//! This crate defines what a "session" looks like and how it travels:
//!
//! - **Types** ([`SessionData`], [`TaggedSession`], [`PersistedSession`],
//!   [`Credentials`], [`Scope`]): the records that flow between the
//!   authenticator, the state machine, and storage.
//! - **Codec** ([`encode_form`], [`decode_response_body`]): how OAuth2
//!   request bodies are built and how token endpoint responses are read.
//! - **Expiry** ([`expiry`]): relative `expires_in` seconds to absolute
//!   epoch milliseconds, and refresh deadline math.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! The protocol layer knows nothing about HTTP clients, timers, or storage
//! backends. It only knows the shape of the data.
//!
//! ```text
//! Transport (HTTP) → Protocol (SessionData) → Session (AuthState)
//! ```

mod codec;
mod error;
pub mod expiry;
mod types;

pub use codec::{decode_response_body, encode_form};
pub use error::ProtocolError;
pub use types::{Credentials, PersistedSession, Scope, SessionData, TaggedSession};
