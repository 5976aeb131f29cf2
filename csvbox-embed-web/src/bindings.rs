//! JavaScript API.
//!
//! ```js
//! const importer = new CsvboxImporter({ license_key: "abc123", lazy: true });
//! importer.on("on_import", (success, metadata) => console.log(success, metadata));
//! importer.mount();
//! importer.bindButton(document.getElementById("import"));
//! ```

use crate::dom::EmbedHandle;
use csvbox_embed::{EmbedConfig, EmbedError, EmbedEvent, HandlerSlot, JsonMap};
use js_sys::{Function, JSON};
use serde_json::Value;
use tracing::warn;
use wasm_bindgen::prelude::*;
use web_sys::Element;

fn to_js(err: EmbedError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn js_to_json(value: &JsValue) -> Result<Value, JsValue> {
    if value.is_null() || value.is_undefined() {
        return Ok(Value::Null);
    }
    let text = JSON::stringify(value)?
        .as_string()
        .ok_or_else(|| JsValue::from_str("value is not JSON-representable"))?;
    serde_json::from_str(&text).map_err(|err| JsValue::from_str(&err.to_string()))
}

fn json_to_js(value: &Value) -> Result<JsValue, JsValue> {
    JSON::parse(&value.to_string())
}

fn call_handler(callback: &Function, event: &EmbedEvent) -> Result<JsValue, JsValue> {
    let this = JsValue::NULL;
    match event {
        EmbedEvent::Submitted(metadata) => {
            callback.call1(&this, &json_to_js(&Value::Object(metadata.clone()))?)
        }
        EmbedEvent::Imported { success, metadata } => {
            let metadata = match metadata {
                Some(metadata) => json_to_js(&Value::Object(metadata.clone()))?,
                None => JsValue::UNDEFINED,
            };
            callback.call2(&this, &JsValue::from_bool(*success), &metadata)
        }
        EmbedEvent::LoadStarted | EmbedEvent::Ready | EmbedEvent::Closed => callback.call0(&this),
    }
}

#[wasm_bindgen]
pub struct CsvboxImporter {
    handle: EmbedHandle,
    token: String,
}

#[wasm_bindgen]
impl CsvboxImporter {
    /// Builds an importer from a plain config object. The overlay goes into
    /// `container`, or `document.body` when omitted.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue, container: Option<Element>) -> Result<CsvboxImporter, JsValue> {
        let config: EmbedConfig =
            serde_json::from_value(js_to_json(&config)?).map_err(|err| JsValue::from_str(&err.to_string()))?;
        let handle = EmbedHandle::new(config, container).map_err(to_js)?;
        let token = handle.controller().borrow().token().to_string();
        Ok(Self { handle, token })
    }

    /// Registers `callback` in the slot named `slot` (`on_import`,
    /// `is_ready`, `load_started`, ...). Exceptions thrown by the callback
    /// are logged and do not stop other handlers.
    pub fn on(&self, slot: &str, callback: Function) -> Result<(), JsValue> {
        let slot = HandlerSlot::from_name(slot)
            .ok_or_else(|| JsValue::from_str(&format!("unknown handler slot '{slot}'")))?;
        let mut controller = self
            .handle
            .controller()
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("cannot register handlers while an event is dispatching"))?;
        controller.on(slot, move |event| {
            if let Err(err) = call_handler(&callback, event) {
                warn!(slot = slot.name(), error = ?err, "Importer handler threw");
            }
        });
        Ok(())
    }

    pub fn mount(&self) -> Result<(), JsValue> {
        self.handle.mount().map_err(to_js)
    }

    pub fn open(&self) -> Result<(), JsValue> {
        self.handle.open().map_err(to_js)
    }

    /// Replaces the customer data; `null` clears it. Called from inside a
    /// handler, the update is applied once the handler returns.
    #[wasm_bindgen(js_name = setUser)]
    pub fn set_user(&self, user: JsValue) -> Result<(), JsValue> {
        let user: Option<JsonMap> = match js_to_json(&user)? {
            Value::Null => None,
            Value::Object(map) => Some(map),
            _ => return Err(JsValue::from_str("user must be an object or null")),
        };
        self.handle.set_user(user).map_err(to_js)
    }

    #[wasm_bindgen(js_name = bindButton)]
    pub fn bind_button(&self, button: Element) -> Result<(), JsValue> {
        self.handle.bind_button(button).map_err(to_js)
    }

    /// Safe to call from inside a handler.
    pub fn dispose(&self) {
        self.handle.dispose();
    }

    #[wasm_bindgen(getter)]
    pub fn token(&self) -> String {
        self.token.clone()
    }

    #[wasm_bindgen(getter, js_name = activationEnabled)]
    pub fn activation_enabled(&self) -> bool {
        self.handle
            .controller()
            .try_borrow()
            .is_ok_and(|controller| controller.activation_enabled())
    }
}
