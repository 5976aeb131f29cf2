//! Browser bindings for the CSVBox importer embed.
//!
//! On `wasm32` this crate provides:
//! - [`DomSurface`]: a `RenderSurface` over `web-sys`
//! - [`MessageSubscription`]: the window `message` listener, removed on drop
//! - [`EmbedHandle`]: a controller wired to both
//! - `CsvboxImporter`: the JavaScript-facing API
//!
//! [`ActivationState`] is target independent so hosts rendering their own
//! activation control can use it anywhere.

mod activation;

#[cfg(target_arch = "wasm32")]
mod bindings;
#[cfg(target_arch = "wasm32")]
mod dom;

pub use activation::{ActivationState, DISABLED_ATTRIBUTE, TOKEN_ATTRIBUTE};

#[cfg(target_arch = "wasm32")]
pub use bindings::CsvboxImporter;
#[cfg(target_arch = "wasm32")]
pub use dom::{DomSurface, EmbedHandle, MessageSubscription};
