//! Core type definitions for the CSVBox importer embed.
//!
//! This crate defines the host-agnostic types shared by the controller and
//! the browser binding:
//! - Session tokens correlating outbound and inbound frame messages
//! - Inbound messages posted by the embedded importer, decoded defensively
//! - Outbound messages posted into the embedded importer
//!
//! Nothing here touches the DOM. Rendering lives in `csvbox-embed-web`.

mod message;
mod token;

pub use message::{
    InboundEnvelope, InboundMessage, InitPayload, Metadata, OutboundMessage, PushStatusPayload,
    RawRow, SubmitPayload, OPEN_MODAL_INSTRUCTION, TOKEN_FIELD, is_truthy,
};
pub use token::SessionToken;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid session token: {0}")]
    InvalidToken(String),
}
