//! `web-sys` rendering surface, message listener and the handle tying them
//! to a controller.

use crate::activation::ActivationState;
use csvbox_embed::{
    EmbedConfig, EmbedController, EmbedError, EmbedResult, HOLDER_CLASS, JsonMap, RequestQueue,
    OutboundMessage, RenderSurface, STYLE_ELEMENT_ID,
};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, Event, HtmlElement, HtmlIFrameElement, MessageEvent, Node, Window};

fn js_error(context: &'static str) -> impl Fn(JsValue) -> EmbedError {
    move |err| EmbedError::Surface(format!("{context}: {err:?}"))
}

fn create<T: JsCast>(document: &Document, tag: &str) -> EmbedResult<T> {
    document
        .create_element(tag)
        .map_err(js_error("create element"))?
        .dyn_into::<T>()
        .map_err(|_| EmbedError::Surface(format!("<{tag}> has an unexpected type")))
}

/// Renders the overlay and frame into a live document.
pub struct DomSurface {
    document: Document,
    /// Parent of the overlay. `document.body` when unset.
    container: Option<Element>,
    holder: Option<HtmlElement>,
    frame: Option<HtmlIFrameElement>,
    on_load: Option<Closure<dyn FnMut()>>,
    load_listener: Option<Rc<dyn Fn()>>,
}

impl DomSurface {
    pub fn new(window: &Window, container: Option<Element>) -> EmbedResult<Self> {
        let document = window
            .document()
            .ok_or_else(|| EmbedError::Surface("window has no document".into()))?;
        Ok(Self {
            document,
            container,
            holder: None,
            frame: None,
            on_load: None,
            load_listener: None,
        })
    }

    /// Called whenever the frame fires `load`. Must be set before the frame
    /// is created.
    pub fn set_load_listener(&mut self, listener: impl Fn() + 'static) {
        self.load_listener = Some(Rc::new(listener));
    }

    fn parent(&self) -> EmbedResult<Node> {
        match &self.container {
            Some(container) => Ok(container.clone().into()),
            None => self
                .document
                .body()
                .map(Node::from)
                .ok_or_else(|| EmbedError::Surface("document has no body".into())),
        }
    }
}

impl RenderSurface for DomSurface {
    fn inject_stylesheet(&mut self, css: &str) -> EmbedResult<()> {
        if self.document.get_element_by_id(STYLE_ELEMENT_ID).is_some() {
            return Ok(());
        }
        let style: Element = create(&self.document, "style")?;
        style.set_id(STYLE_ELEMENT_ID);
        style.set_text_content(Some(css));

        let target: Node = match self.document.head() {
            Some(head) => head.into(),
            None => self.parent()?,
        };
        target
            .append_child(&style)
            .map_err(js_error("insert stylesheet"))?;
        Ok(())
    }

    fn create_frame(&mut self, holder_id: &str, src: &str) -> EmbedResult<()> {
        let holder: HtmlElement = create(&self.document, "div")?;
        holder.set_id(holder_id);
        holder.set_class_name(HOLDER_CLASS);

        let frame: HtmlIFrameElement = create(&self.document, "iframe")?;
        frame.set_src(src);
        frame.set_frame_border("0");
        if let Some(listener) = self.load_listener.clone() {
            let on_load = Closure::<dyn FnMut()>::new(move || listener());
            frame.set_onload(Some(on_load.as_ref().unchecked_ref()));
            self.on_load = Some(on_load);
        }

        holder
            .append_child(&frame)
            .map_err(js_error("attach frame"))?;
        self.parent()?
            .append_child(&holder)
            .map_err(js_error("attach overlay"))?;

        self.holder = Some(holder);
        self.frame = Some(frame);
        Ok(())
    }

    fn set_overlay_visible(&mut self, visible: bool) -> EmbedResult<()> {
        let Some(holder) = &self.holder else {
            return Ok(());
        };
        holder
            .style()
            .set_property("display", if visible { "block" } else { "none" })
            .map_err(js_error("toggle overlay"))
    }

    fn post_to_frame(&mut self, message: &OutboundMessage) -> EmbedResult<()> {
        let Some(target) = self.frame.as_ref().and_then(|frame| frame.content_window()) else {
            debug!("Frame has no window yet, message dropped");
            return Ok(());
        };
        let payload = js_sys::JSON::parse(&serde_json::to_string(&message.to_value())?)
            .map_err(js_error("encode message"))?;
        target
            .post_message(&payload, "*")
            .map_err(js_error("post message"))
    }

    fn teardown(&mut self) {
        if let Some(frame) = self.frame.take() {
            frame.set_onload(None);
        }
        if let Some(holder) = self.holder.take() {
            holder.remove();
        }
        self.on_load = None;
        self.load_listener = None;
    }
}

/// The window `message` listener. Removed on [`MessageSubscription::detach`]
/// or drop.
pub struct MessageSubscription {
    target: Window,
    callback: Option<Closure<dyn FnMut(MessageEvent)>>,
}

impl MessageSubscription {
    /// Calls `on_message` with every message whose data is JSON-representable.
    pub fn attach(window: &Window, mut on_message: impl FnMut(Value) + 'static) -> EmbedResult<Self> {
        let callback = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            if let Some(value) = message_json(&event.data()) {
                on_message(value);
            }
        });
        window
            .add_event_listener_with_callback("message", callback.as_ref().unchecked_ref())
            .map_err(js_error("listen for messages"))?;
        Ok(Self {
            target: window.clone(),
            callback: Some(callback),
        })
    }

    pub fn detach(&mut self) {
        let Some(callback) = self.callback.take() else {
            return;
        };
        if let Err(err) = self
            .target
            .remove_event_listener_with_callback("message", callback.as_ref().unchecked_ref())
        {
            warn!(error = ?err, "Failed to remove message listener");
        }
    }
}

impl Drop for MessageSubscription {
    fn drop(&mut self) {
        self.detach();
    }
}

fn message_json(data: &JsValue) -> Option<Value> {
    let text = js_sys::JSON::stringify(data).ok()?.as_string()?;
    serde_json::from_str(&text).ok()
}

type SharedController = Rc<RefCell<EmbedController<DomSurface>>>;

/// A controller rendering into the page, listening to window messages and
/// optionally driving an activation button.
///
/// Dropping the handle disposes the controller.
pub struct EmbedHandle {
    controller: SharedController,
    requests: RequestQueue,
    button: Rc<RefCell<Option<Element>>>,
    button_click: RefCell<Option<Closure<dyn FnMut(Event)>>>,
    subscription: RefCell<Option<MessageSubscription>>,
}

impl EmbedHandle {
    /// Builds the controller without mounting it, so handlers can be
    /// registered first.
    pub fn new(config: EmbedConfig, container: Option<Element>) -> EmbedResult<Self> {
        let window = web_sys::window().ok_or_else(|| EmbedError::Surface("no global window".into()))?;
        let surface = DomSurface::new(&window, container)?;
        let controller: SharedController = Rc::new(RefCell::new(EmbedController::new(config, surface)?));
        let requests = controller.borrow().request_queue();
        let button: Rc<RefCell<Option<Element>>> = Rc::default();

        let weak = Rc::downgrade(&controller);
        let load_button = Rc::clone(&button);
        controller.borrow_mut().surface_mut().set_load_listener(move || {
            let Some(controller) = weak.upgrade() else {
                return;
            };
            let Ok(mut controller) = controller.try_borrow_mut() else {
                warn!("Frame load event dropped: controller busy");
                return;
            };
            if let Err(err) = controller.frame_loaded() {
                warn!(error = %err, "Failed to initialize importer frame");
            }
            refresh_button(&load_button, &controller);
        });

        let weak = Rc::downgrade(&controller);
        let subscription = MessageSubscription::attach(&window, move |message| {
            let Some(controller) = weak.upgrade() else {
                return;
            };
            let Ok(mut controller) = controller.try_borrow_mut() else {
                warn!("Importer message dropped: controller busy");
                return;
            };
            if let Err(err) = controller.handle_message(&message) {
                warn!(error = %err, "Failed to handle importer message");
            }
        })?;

        Ok(Self {
            controller,
            requests,
            button,
            button_click: RefCell::new(None),
            subscription: RefCell::new(Some(subscription)),
        })
    }

    pub fn controller(&self) -> &SharedController {
        &self.controller
    }

    pub fn mount(&self) -> EmbedResult<()> {
        let mut controller = self.controller_mut()?;
        controller.mount()?;
        refresh_button(&self.button, &controller);
        Ok(())
    }

    /// Opens the importer. From inside a handler the request is queued
    /// until the running dispatch finishes.
    pub fn open(&self) -> EmbedResult<()> {
        match self.controller.try_borrow_mut() {
            Ok(mut controller) => {
                controller.open()?;
                refresh_button(&self.button, &controller);
                Ok(())
            }
            Err(_) => {
                self.requests.request_open();
                Ok(())
            }
        }
    }

    /// Replaces the customer data, queued like [`EmbedHandle::open`] when
    /// called from inside a handler.
    pub fn set_user(&self, user: Option<JsonMap>) -> EmbedResult<()> {
        match self.controller.try_borrow_mut() {
            Ok(mut controller) => controller.set_user(user),
            Err(_) => {
                self.requests.request_user(user);
                Ok(())
            }
        }
    }

    /// Makes `button` open the importer and keeps its token and disabled
    /// attributes in sync. Replaces any previously bound button.
    pub fn bind_button(&self, button: Element) -> EmbedResult<()> {
        self.unbind_button();

        let weak = Rc::downgrade(&self.controller);
        let requests = self.requests.clone();
        let click = Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
            let Some(controller) = weak.upgrade() else {
                return;
            };
            match controller.try_borrow_mut() {
                Ok(mut controller) => {
                    if let Err(err) = controller.open() {
                        warn!(error = %err, "Failed to open importer");
                    }
                }
                Err(_) => requests.request_open(),
            }
        });
        button
            .add_event_listener_with_callback("click", click.as_ref().unchecked_ref())
            .map_err(js_error("bind activation control"))?;

        *self.button.borrow_mut() = Some(button);
        *self.button_click.borrow_mut() = Some(click);
        refresh_button(&self.button, &*self.controller_mut()?);
        Ok(())
    }

    /// Detaches every listener and tears down the overlay. Idempotent.
    /// From inside a handler the controller is disposed once the running
    /// dispatch finishes.
    pub fn dispose(&self) {
        if let Some(mut subscription) = self.subscription.borrow_mut().take() {
            subscription.detach();
        }
        self.unbind_button();
        match self.controller.try_borrow_mut() {
            Ok(mut controller) => controller.dispose(),
            Err(_) => {
                debug!("Controller busy: dispose queued");
                self.requests.request_dispose();
            }
        }
    }

    fn unbind_button(&self) {
        let button = self.button.borrow_mut().take();
        if let (Some(button), Some(click)) = (button, self.button_click.borrow_mut().take()) {
            if let Err(err) =
                button.remove_event_listener_with_callback("click", click.as_ref().unchecked_ref())
            {
                warn!(error = ?err, "Failed to unbind activation control");
            }
        }
    }

    fn controller_mut(&self) -> EmbedResult<std::cell::RefMut<'_, EmbedController<DomSurface>>> {
        self.controller
            .try_borrow_mut()
            .map_err(|_| EmbedError::Surface("controller is busy dispatching an event".into()))
    }
}

impl Drop for EmbedHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn refresh_button(button: &RefCell<Option<Element>>, controller: &EmbedController<DomSurface>) {
    let button = button.borrow();
    let Some(button) = button.as_ref() else {
        return;
    };
    for (name, value) in ActivationState::of(controller).attributes() {
        let result = match value {
            Some(value) => button.set_attribute(name, &value),
            None => button.remove_attribute(name),
        };
        if let Err(err) = result {
            warn!(attribute = name, error = ?err, "Failed to update activation control");
        }
    }
}
