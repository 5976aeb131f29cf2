//! Cross-document messages exchanged with the embedded importer.
//!
//! Inbound payloads arrive as loosely shaped JSON. Decoding never fails
//! hard: unknown fields are ignored, missing optional fields become empty,
//! and anything without a `data.unique_token` string is rejected as foreign.

use crate::SessionToken;
use serde_json::{Map, Value, json};

/// Loosely typed metadata object handed to import and submit handlers.
pub type Metadata = Map<String, Value>;

/// Field inside `data` carrying the session token.
pub const TOKEN_FIELD: &str = "unique_token";

/// Literal instruction understood by the importer as "show yourself".
pub const OPEN_MODAL_INSTRUCTION: &str = "openModal";

/// Truthiness as the importer's payload producer understands it.
///
/// `null`, `false`, `0`, and `""` are falsy. Arrays and objects are always
/// truthy, even when empty.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// A decoded inbound message together with the token it claims.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEnvelope {
    pub token: String,
    pub message: InboundMessage,
}

impl InboundEnvelope {
    /// Decodes a raw `postMessage` payload.
    ///
    /// Returns `None` unless the payload is an object whose `data` is an
    /// object with a string `unique_token`.
    pub fn decode(raw: &Value) -> Option<Self> {
        let envelope = raw.as_object()?;
        let data = envelope.get("data")?.as_object()?;
        let token = data.get(TOKEN_FIELD)?.as_str()?.to_string();
        let message = InboundMessage::from_parts(envelope, data);
        Some(Self { token, message })
    }

    /// Returns true if the envelope was addressed to `token`.
    #[must_use]
    pub fn is_for(&self, token: &SessionToken) -> bool {
        token.matches(&self.token)
    }
}

/// Inbound message kinds, keyed by the payload's `type` discriminator.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// `data-on-submit`: the user submitted the import.
    Submitted(SubmitPayload),
    /// `data-push-status`: the importer finished pushing data.
    PushStatus(PushStatusPayload),
    /// `csvbox-modal-hidden`: the importer closed its modal.
    ModalHidden,
    /// `csvbox-upload-successful`
    UploadSuccessful,
    /// `csvbox-upload-failed`
    UploadFailed,
    /// Any other `type`, or none at all.
    Unrecognized(Option<String>),
}

impl InboundMessage {
    fn from_parts(envelope: &Map<String, Value>, data: &Map<String, Value>) -> Self {
        match envelope.get("type").and_then(Value::as_str) {
            Some("data-on-submit") => Self::Submitted(SubmitPayload {
                data: without_token(data),
                column_mapping: field(envelope, "column_mapping"),
            }),
            Some("data-push-status") => {
                Self::PushStatus(PushStatusPayload::from_parts(envelope, data))
            }
            Some("csvbox-modal-hidden") => Self::ModalHidden,
            Some("csvbox-upload-successful") => Self::UploadSuccessful,
            Some("csvbox-upload-failed") => Self::UploadFailed,
            other => Self::Unrecognized(other.map(str::to_string)),
        }
    }

    /// The wire discriminator, for logging.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Submitted(_) => "data-on-submit",
            Self::PushStatus(_) => "data-push-status",
            Self::ModalHidden => "csvbox-modal-hidden",
            Self::UploadSuccessful => "csvbox-upload-successful",
            Self::UploadFailed => "csvbox-upload-failed",
            Self::Unrecognized(Some(kind)) => kind.as_str(),
            Self::Unrecognized(None) => "<none>",
        }
    }
}

/// Payload of `data-on-submit`. `data` already has the token removed.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitPayload {
    pub data: Metadata,
    pub column_mapping: Option<Value>,
}

/// Payload of `data-push-status`. `data` already has the token removed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PushStatusPayload {
    pub data: Metadata,
    /// `data.import_status == "success"`.
    pub succeeded: bool,
    /// Whether `data.row_data` is truthy. The rows themselves travel in
    /// the top-level `row_data` field.
    pub has_row_data: bool,
    pub rows: Vec<RawRow>,
    /// Column names by position. Entries that are neither strings nor
    /// scalars decode as `None`.
    pub headers: Vec<Option<String>>,
    pub dynamic_indexes: Vec<usize>,
    pub virtual_indexes: Vec<usize>,
    pub column_mapping: Option<Value>,
    pub raw_columns: Option<Value>,
    pub ignored_column_row: Option<Value>,
}

impl PushStatusPayload {
    fn from_parts(envelope: &Map<String, Value>, data: &Map<String, Value>) -> Self {
        let rows = envelope
            .get("row_data")
            .and_then(Value::as_array)
            .map(|rows| rows.iter().map(RawRow::from_value).collect())
            .unwrap_or_default();
        let headers = envelope
            .get("headers")
            .and_then(Value::as_array)
            .map(|headers| headers.iter().map(header_key).collect())
            .unwrap_or_default();

        Self {
            data: without_token(data),
            succeeded: data.get("import_status").and_then(Value::as_str) == Some("success"),
            has_row_data: data.get("row_data").is_some_and(is_truthy),
            rows,
            headers,
            dynamic_indexes: indexes(envelope, "dynamicColumnsIndexes"),
            virtual_indexes: indexes(envelope, "virtualColumnsIndexes"),
            column_mapping: field(envelope, "column_mapping"),
            raw_columns: field(envelope, "raw_columns"),
            ignored_column_row: field(envelope, "ignored_column_row"),
        }
    }
}

/// One imported row as sent by the importer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRow {
    /// Positional cell values, aligned with the headers.
    pub data: Vec<Value>,
    pub unmapped_data: Option<Value>,
}

impl RawRow {
    /// Decodes a row. Non-object rows decode as empty.
    pub fn from_value(value: &Value) -> Self {
        let Some(row) = value.as_object() else {
            return Self::default();
        };
        Self {
            data: row
                .get("data")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default(),
            unmapped_data: field(row, "unmapped_data"),
        }
    }
}

/// Initialization payload posted once the frame has loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct InitPayload {
    pub customer: Option<Value>,
    pub columns: Option<Value>,
    pub options: Option<Value>,
    pub unique_token: SessionToken,
}

/// Messages posted into the embedded importer.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    /// `{customer, columns, options, unique_token}`
    Init(InitPayload),
    /// The literal `"openModal"` string.
    OpenModal,
    /// `{customer}` after the host replaced the user data.
    CustomerUpdate(Option<Value>),
}

impl OutboundMessage {
    /// The JSON value handed to `postMessage`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Init(payload) => json!({
                "customer": payload.customer,
                "columns": payload.columns,
                "options": payload.options,
                "unique_token": payload.unique_token.as_str(),
            }),
            Self::OpenModal => Value::String(OPEN_MODAL_INSTRUCTION.to_string()),
            Self::CustomerUpdate(customer) => json!({ "customer": customer }),
        }
    }
}

fn without_token(data: &Map<String, Value>) -> Metadata {
    let mut metadata = data.clone();
    metadata.remove(TOKEN_FIELD);
    metadata
}

/// Present, non-null field.
fn field(object: &Map<String, Value>, key: &str) -> Option<Value> {
    object.get(key).filter(|v| !v.is_null()).cloned()
}

fn header_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn indexes(object: &Map<String, Value>, key: &str) -> Vec<usize> {
    object
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_u64)
                .filter_map(|i| usize::try_from(i).ok())
                .collect()
        })
        .unwrap_or_default()
}
