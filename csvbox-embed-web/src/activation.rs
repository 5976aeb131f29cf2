//! State of the host's "open importer" control.

use csvbox_embed::{EmbedController, RenderSurface};

/// Carries the session token so pages can tell importer buttons apart.
pub const TOKEN_ATTRIBUTE: &str = "data-csvbox-token";

pub const DISABLED_ATTRIBUTE: &str = "disabled";

/// What the activation control should look like right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationState {
    pub token: String,
    pub enabled: bool,
}

impl ActivationState {
    pub fn of<S: RenderSurface>(controller: &EmbedController<S>) -> Self {
        Self {
            token: controller.token().to_string(),
            enabled: controller.activation_enabled(),
        }
    }

    /// Attribute updates to apply. `None` means remove the attribute.
    pub fn attributes(&self) -> [(&'static str, Option<String>); 2] {
        [
            (TOKEN_ATTRIBUTE, Some(self.token.clone())),
            (DISABLED_ATTRIBUTE, (!self.enabled).then(String::new)),
        ]
    }
}
