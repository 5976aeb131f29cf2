//! Host-agnostic controller for the CSVBox importer embed.
//!
//! Builds and vets the importer URL, drives the frame lifecycle through a
//! [`RenderSurface`], and relays token-scoped inbound messages to handlers
//! registered per event kind.
//!
//! # Security
//!
//! Inbound messages are filtered by session token only; their origin is
//! not checked. Any page that learns the token can inject events. Hosts
//! that care should verify `MessageEvent.origin` before calling
//! [`EmbedController::handle_message`].

mod config;
mod controller;
mod embed_url;
mod error;
mod handlers;
mod relay;
mod rows;
mod style;
mod surface;

pub use config::{EmbedConfig, JsonMap};
pub use controller::{EmbedController, LifecyclePhase, RequestQueue};
pub use embed_url::{DEFAULT_DOMAIN, EmbedUrl, FRAMEWORK, LIBRARY_VERSION, escape_env, unescape_env};
pub use error::{EmbedError, EmbedResult};
pub use handlers::{DispatchReport, EmbedEvent, EventKind, HandlerRegistry, HandlerSlot};
pub use relay::{MessageRelay, RelayAction};
pub use rows::RowLayout;
pub use style::{GLOBAL_CSS, HOLDER_CLASS, STYLE_ELEMENT_ID};
pub use surface::{RecordingSurface, RenderSurface, SurfaceCall};

pub use csvbox_types::{Metadata, OutboundMessage, SessionToken};
