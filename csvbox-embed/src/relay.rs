//! Inbound message relay: token filtering and payload reshaping.
//!
//! The relay is owned by one controller and scoped to its session token.
//! It turns accepted messages into [`RelayAction`]s; the controller applies
//! them. After [`MessageRelay::dispose`] nothing is accepted.

use crate::rows::RowLayout;
use csvbox_types::{InboundEnvelope, InboundMessage, Metadata, PushStatusPayload, SessionToken};
use serde_json::Value;
use tracing::debug;

/// What the controller should do in response to an inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayAction {
    Submit(Metadata),
    Import {
        success: bool,
        metadata: Option<Metadata>,
    },
    Close,
    Ignore,
}

#[derive(Debug)]
pub struct MessageRelay {
    token: SessionToken,
    disposed: bool,
}

impl MessageRelay {
    pub fn new(token: SessionToken) -> Self {
        Self {
            token,
            disposed: false,
        }
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    /// Detaches the relay. Idempotent.
    pub fn dispose(&mut self) {
        if !self.disposed {
            debug!(token = %self.token, "Message relay disposed");
        }
        self.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Decodes `raw` and keeps it only if it carries this relay's token.
    pub fn accept(&self, raw: &Value) -> Option<InboundMessage> {
        if self.disposed {
            debug!(token = %self.token, "Message ignored: relay disposed");
            return None;
        }
        let Some(envelope) = InboundEnvelope::decode(raw) else {
            debug!("Message ignored: not an importer envelope");
            return None;
        };
        if !envelope.is_for(&self.token) {
            debug!(kind = envelope.message.kind(), "Message ignored: token mismatch");
            return None;
        }
        Some(envelope.message)
    }

    /// Accepts and routes in one step.
    pub fn process(&self, raw: &Value) -> RelayAction {
        self.accept(raw).map_or(RelayAction::Ignore, Self::route)
    }

    /// Maps an accepted message to the action it requires.
    pub fn route(message: InboundMessage) -> RelayAction {
        match message {
            InboundMessage::Submitted(payload) => {
                let mut metadata = payload.data;
                metadata.insert("column_mappings".into(), payload.column_mapping.unwrap_or_default());
                RelayAction::Submit(metadata)
            }
            InboundMessage::PushStatus(payload) => push_status_action(payload),
            InboundMessage::ModalHidden => RelayAction::Close,
            InboundMessage::UploadSuccessful => RelayAction::Import {
                success: true,
                metadata: None,
            },
            InboundMessage::UploadFailed => RelayAction::Import {
                success: false,
                metadata: None,
            },
            InboundMessage::Unrecognized(kind) => {
                debug!(kind = ?kind, "Unrecognized importer message");
                RelayAction::Ignore
            }
        }
    }
}

fn push_status_action(payload: PushStatusPayload) -> RelayAction {
    if !payload.succeeded {
        return RelayAction::Import {
            success: false,
            metadata: Some(payload.data),
        };
    }
    if !payload.has_row_data {
        return RelayAction::Import {
            success: true,
            metadata: Some(payload.data),
        };
    }

    let rows = RowLayout::from_payload(&payload).shape_all(&payload.rows);
    let mut metadata = payload.data;
    metadata.insert("rows".into(), Value::Array(rows));
    metadata.insert("column_mappings".into(), payload.column_mapping.unwrap_or_default());
    metadata.insert("raw_columns".into(), payload.raw_columns.unwrap_or_default());
    metadata.insert("ignored_columns".into(), payload.ignored_column_row.unwrap_or_default());
    RelayAction::Import {
        success: true,
        metadata: Some(metadata),
    }
}
