//! The one global stylesheet the embed needs.

/// Class on the overlay container.
pub const HOLDER_CLASS: &str = "csvbox-holder";

/// Id of the injected `<style>` element; surfaces use it to insert at most once.
pub const STYLE_ELEMENT_ID: &str = "csvbox-global-style";

/// Full-viewport fixed overlay, hidden until the modal opens.
pub const GLOBAL_CSS: &str = r#"
.csvbox-holder {
  z-index: 2147483647;
  position: fixed;
  top: 0;
  bottom: 0;
  left: 0;
  right: 0;
  display: none;
}
.csvbox-holder iframe {
  height: 100%;
  width: 100%;
  position: absolute;
  top: 0px;
  left: 0px;
}
"#;
