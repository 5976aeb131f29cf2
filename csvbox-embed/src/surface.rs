//! Rendering capability the controller drives.
//!
//! The controller never touches a DOM. It asks a [`RenderSurface`] to inject
//! the stylesheet, create the overlay and frame, toggle visibility, and post
//! messages into the frame. `csvbox-embed-web` implements it over `web-sys`;
//! [`RecordingSurface`] records the calls for tests and headless hosts.

use crate::error::EmbedResult;
use csvbox_types::OutboundMessage;
use serde_json::Value;

pub trait RenderSurface {
    /// Inserts `css` into the page. Must be a no-op when already present.
    fn inject_stylesheet(&mut self, css: &str) -> EmbedResult<()>;

    /// Creates the hidden overlay container `holder_id` holding a
    /// borderless frame pointed at `src`.
    fn create_frame(&mut self, holder_id: &str, src: &str) -> EmbedResult<()>;

    fn set_overlay_visible(&mut self, visible: bool) -> EmbedResult<()>;

    /// Posts `message` into the frame. Surfaces whose frame has no window
    /// yet drop the message silently.
    fn post_to_frame(&mut self, message: &OutboundMessage) -> EmbedResult<()>;

    /// Releases whatever the surface holds. Called once on dispose.
    fn teardown(&mut self) {}
}

/// One observed surface call.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    InjectStylesheet,
    CreateFrame { holder_id: String, src: String },
    SetOverlayVisible(bool),
    Post(Value),
    Teardown,
}

/// Surface that renders nothing and remembers every call.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    calls: Vec<SurfaceCall>,
    stylesheet_present: bool,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    /// Messages posted into the frame, in order.
    pub fn posted(&self) -> Vec<&Value> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                SurfaceCall::Post(value) => Some(value),
                _ => None,
            })
            .collect()
    }

    /// Last visibility set on the overlay; hidden before any call.
    pub fn overlay_visible(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|call| match call {
                SurfaceCall::SetOverlayVisible(visible) => Some(*visible),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn count(&self, predicate: impl Fn(&SurfaceCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }
}

impl RenderSurface for RecordingSurface {
    fn inject_stylesheet(&mut self, _css: &str) -> EmbedResult<()> {
        if !self.stylesheet_present {
            self.stylesheet_present = true;
            self.calls.push(SurfaceCall::InjectStylesheet);
        }
        Ok(())
    }

    fn create_frame(&mut self, holder_id: &str, src: &str) -> EmbedResult<()> {
        self.calls.push(SurfaceCall::CreateFrame {
            holder_id: holder_id.to_string(),
            src: src.to_string(),
        });
        Ok(())
    }

    fn set_overlay_visible(&mut self, visible: bool) -> EmbedResult<()> {
        self.calls.push(SurfaceCall::SetOverlayVisible(visible));
        Ok(())
    }

    fn post_to_frame(&mut self, message: &OutboundMessage) -> EmbedResult<()> {
        self.calls.push(SurfaceCall::Post(message.to_value()));
        Ok(())
    }

    fn teardown(&mut self) {
        self.calls.push(SurfaceCall::Teardown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stylesheet_is_recorded_once() {
        let mut surface = RecordingSurface::new();
        surface.inject_stylesheet("a").unwrap();
        surface.inject_stylesheet("a").unwrap();
        assert_eq!(surface.calls(), &[SurfaceCall::InjectStylesheet]);
    }

    #[test]
    fn overlay_visibility_tracks_last_call() {
        let mut surface = RecordingSurface::new();
        assert!(!surface.overlay_visible());
        surface.set_overlay_visible(true).unwrap();
        assert!(surface.overlay_visible());
        surface.set_overlay_visible(false).unwrap();
        assert!(!surface.overlay_visible());
    }

    #[test]
    fn posted_filters_messages() {
        let mut surface = RecordingSurface::new();
        surface.create_frame("h", "https://x").unwrap();
        surface.post_to_frame(&OutboundMessage::OpenModal).unwrap();
        assert_eq!(surface.posted(), vec![&Value::String("openModal".into())]);
    }
}
