//! Descriptor and HTTP API for the importer preview server.
//!
//! The descriptor is produced by running a real controller against a
//! recording surface, so the page serves exactly the URL, token and init
//! payload the embed would use.

use axum::{
    Router,
    extract::State,
    response::{Html, Json},
    routing::get,
};
use csvbox_embed::{
    EmbedConfig, EmbedController, EmbedResult, FRAMEWORK, GLOBAL_CSS, HOLDER_CLASS, LIBRARY_VERSION,
    RecordingSurface,
};
use csvbox_embed_web::TOKEN_ATTRIBUTE;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EmbedDescriptor {
    pub url: String,
    pub host: String,
    pub token: String,
    pub holder_id: String,
    pub lazy: bool,
    pub library_version: String,
    pub framework: String,
    /// Message posted to the frame once it loads.
    pub init: Value,
}

impl EmbedDescriptor {
    pub fn from_config(config: EmbedConfig) -> EmbedResult<Self> {
        let lazy = config.lazy;
        let mut controller = EmbedController::new(config.lazy(false), RecordingSurface::new())?;
        controller.mount()?;
        controller.frame_loaded()?;

        let init = controller
            .surface()
            .posted()
            .first()
            .map(|message| (*message).clone())
            .unwrap_or(Value::Null);

        Ok(Self {
            url: controller.url().to_string(),
            host: controller.url().host().to_string(),
            token: controller.token().to_string(),
            holder_id: controller.token().holder_id(),
            lazy,
            library_version: LIBRARY_VERSION.to_string(),
            framework: FRAMEWORK.to_string(),
            init,
        })
    }
}

const PAGE_TEMPLATE: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>CSVBox importer preview</title>
<style>__CSS__</style>
</head>
<body>
<p class="csvbox-preview-note">Static preview page. Importer events are logged to the browser console.</p>
<button id="csvbox-open" __TOKEN_ATTRIBUTE__="__TOKEN__"__BUTTON_STATE__>Import</button>
<div id="__HOLDER_ID__" class="__HOLDER_CLASS__"><iframe __SRC_ATTRIBUTE__="__URL__" frameborder="0"></iframe></div>
<script>
const init = __INIT__;
const holder = document.getElementById("__HOLDER_ID__");
const frame = holder.querySelector("iframe");
const button = document.getElementById("csvbox-open");
let loaded = false;
let openOnLoad = false;
function show() {
  holder.style.display = "block";
  frame.contentWindow.postMessage("openModal", "*");
}
frame.addEventListener("load", () => {
  if (!frame.getAttribute("src")) return;
  loaded = true;
  frame.contentWindow.postMessage(init, "*");
  button.removeAttribute("disabled");
  if (openOnLoad) {
    openOnLoad = false;
    show();
  }
});
button.addEventListener("click", () => {
  if (loaded) return show();
  openOnLoad = true;
  if (!frame.getAttribute("src")) frame.setAttribute("src", frame.dataset.src);
});
window.addEventListener("message", (event) => {
  const message = event.data || {};
  if (!message.data || message.data.unique_token !== init.unique_token) return;
  console.log("csvbox", message.type, message);
  if (message.type === "csvbox-modal-hidden") holder.style.display = "none";
});
</script>
</body>
</html>
"#;

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Host page embedding the importer.
///
/// A lazy descriptor renders the frame with `data-src` only and an enabled
/// button; the first click points the frame at the importer and opens it
/// once loaded.
pub fn render_page(descriptor: &EmbedDescriptor) -> String {
    let init = descriptor.init.to_string().replace("</", "<\\/");
    let (src_attribute, button_state) = if descriptor.lazy {
        ("data-src", "")
    } else {
        ("src", " disabled")
    };
    PAGE_TEMPLATE
        .replace("__SRC_ATTRIBUTE__", src_attribute)
        .replace("__BUTTON_STATE__", button_state)
        .replace("__CSS__", GLOBAL_CSS)
        .replace("__TOKEN_ATTRIBUTE__", TOKEN_ATTRIBUTE)
        .replace("__TOKEN__", &escape_attribute(&descriptor.token))
        .replace("__HOLDER_ID__", &escape_attribute(&descriptor.holder_id))
        .replace("__HOLDER_CLASS__", HOLDER_CLASS)
        .replace("__URL__", &escape_attribute(&descriptor.url))
        .replace("__INIT__", &init)
}

async fn descriptor_handler(State(descriptor): State<Arc<EmbedDescriptor>>) -> Json<EmbedDescriptor> {
    Json((*descriptor).clone())
}

async fn page_handler(State(descriptor): State<Arc<EmbedDescriptor>>) -> Html<String> {
    Html(render_page(&descriptor))
}

/// Build the HTTP router serving `descriptor`.
pub fn build_router(descriptor: Arc<EmbedDescriptor>) -> Router {
    Router::new()
        .route("/", get(page_handler))
        .route("/api/v1/embed", get(descriptor_handler))
        .with_state(descriptor)
}
