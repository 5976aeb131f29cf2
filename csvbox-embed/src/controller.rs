//! Frame lifecycle and message dispatch for one importer instance.
//!
//! ```text
//! Uninitialized ──mount()──▶ Idle (lazy, activation enabled)
//!       │                     │ open()
//!       └──mount()────────────┴──▶ Loading ──frame_loaded()──▶ Ready
//!                                                              │ open()
//!                                   ModalClosed ◀──hidden msg── ModalOpen
//!                                        └──────────open()─────────▲
//! ```
//!
//! Everything runs on the host's UI thread. Handlers run synchronously
//! while the controller is mutably borrowed, so a handler that wants to
//! open the importer, replace the customer data or dispose the instance
//! does so through a [`RequestQueue`]. Queued requests are applied once the
//! current dispatch has finished.
//!
//! A frame that never reports `load` leaves the controller in `Loading`
//! with any open request pending. There is no load timeout.

use crate::config::{EmbedConfig, JsonMap};
use crate::embed_url::EmbedUrl;
use crate::error::EmbedResult;
use crate::handlers::{DispatchReport, EmbedEvent, HandlerRegistry, HandlerSlot};
use crate::relay::{MessageRelay, RelayAction};
use crate::style::GLOBAL_CSS;
use crate::surface::RenderSurface;
use csvbox_types::{InitPayload, OutboundMessage, SessionToken};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Built, not yet mounted.
    Uninitialized,
    /// Lazy mode, waiting for the first open request.
    Idle,
    /// Frame created, waiting for its load event.
    Loading,
    /// Frame loaded, modal never opened.
    Ready,
    ModalOpen,
    ModalClosed,
}

/// Cloneable handle for requests made while the controller is busy.
///
/// Safe to call from inside a handler. Drained after every dispatch in the
/// order user update, dispose, open. A pending dispose drops a pending open.
#[derive(Debug, Clone, Default)]
pub struct RequestQueue(Rc<PendingRequests>);

#[derive(Debug, Default)]
struct PendingRequests {
    open: Cell<bool>,
    dispose: Cell<bool>,
    user: RefCell<Option<Option<JsonMap>>>,
}

impl RequestQueue {
    pub fn request_open(&self) {
        self.0.open.set(true);
    }

    pub fn request_dispose(&self) {
        self.0.dispose.set(true);
    }

    /// Queues a customer data replacement. A later request overwrites an
    /// earlier one that has not been applied yet.
    pub fn request_user(&self, user: Option<JsonMap>) {
        *self.0.user.borrow_mut() = Some(user);
    }

    fn take_open(&self) -> bool {
        self.0.open.replace(false)
    }

    fn take_dispose(&self) -> bool {
        self.0.dispose.replace(false)
    }

    fn take_user(&self) -> Option<Option<JsonMap>> {
        self.0.user.borrow_mut().take()
    }
}

pub struct EmbedController<S: RenderSurface> {
    config: EmbedConfig,
    url: EmbedUrl,
    surface: S,
    handlers: HandlerRegistry,
    relay: MessageRelay,
    phase: LifecyclePhase,
    frame_created: bool,
    frame_loaded: bool,
    modal_shown: bool,
    open_on_load: bool,
    activation_enabled: bool,
    requests: RequestQueue,
}

impl<S: RenderSurface> EmbedController<S> {
    /// Generates the session token and builds the importer URL.
    ///
    /// Fails without touching `surface` when the config is invalid or the
    /// URL does not pass the resource policy.
    pub fn new(config: EmbedConfig, surface: S) -> EmbedResult<Self> {
        let url = EmbedUrl::build(&config)?;
        let token = SessionToken::generate();
        info!(token = %token, host = %url.host(), lazy = config.lazy, "Importer embed initialized");

        Ok(Self {
            config,
            url,
            surface,
            handlers: HandlerRegistry::new(),
            relay: MessageRelay::new(token),
            phase: LifecyclePhase::Uninitialized,
            frame_created: false,
            frame_loaded: false,
            modal_shown: false,
            open_on_load: false,
            activation_enabled: false,
            requests: RequestQueue::default(),
        })
    }

    /// Starts the lifecycle. Lazy instances go idle with activation enabled;
    /// eager ones create the frame right away.
    pub fn mount(&mut self) -> EmbedResult<()> {
        if self.phase != LifecyclePhase::Uninitialized {
            warn!(token = %self.token(), phase = ?self.phase, "mount() called twice");
            return Ok(());
        }
        if self.config.lazy {
            self.phase = LifecyclePhase::Idle;
            self.activation_enabled = true;
            debug!(token = %self.token(), "Lazy mode: frame deferred until first open");
            Ok(())
        } else {
            self.activation_enabled = false;
            self.begin_loading()
        }
    }

    /// Opens the importer, creating or waiting for the frame as needed.
    pub fn open(&mut self) -> EmbedResult<()> {
        if self.relay.is_disposed() {
            debug!(token = %self.token(), "open() ignored: controller disposed");
            return Ok(());
        }
        if !self.frame_created {
            self.open_on_load = true;
            return self.begin_loading();
        }
        if self.modal_shown {
            return Ok(());
        }
        if self.frame_loaded {
            self.show_modal()
        } else {
            self.open_on_load = true;
            Ok(())
        }
    }

    /// Host notification that the frame fired its `load` event.
    pub fn frame_loaded(&mut self) -> EmbedResult<()> {
        if !self.frame_created || self.relay.is_disposed() {
            debug!(token = %self.token(), "Load event ignored: no live frame");
            return Ok(());
        }

        self.dispatch(&EmbedEvent::Ready);
        self.activation_enabled = true;
        self.frame_loaded = true;
        if self.phase == LifecyclePhase::Loading {
            self.phase = LifecyclePhase::Ready;
        }
        info!(token = %self.token(), "Importer frame ready");

        let init = OutboundMessage::Init(InitPayload {
            customer: self.config.user.clone().map(Value::Object),
            columns: self.config.dynamic_columns.clone().map(Value::Object),
            options: self.config.options.clone().map(Value::Object),
            unique_token: self.token().clone(),
        });
        let posted = self.surface.post_to_frame(&init);
        if let Err(err) = &posted {
            warn!(token = %self.token(), error = %err, "Init message not delivered");
        }

        if std::mem::take(&mut self.open_on_load) {
            self.open()?;
        }
        self.drain_requests()?;
        posted
    }

    /// Feeds one inbound `postMessage` payload through the relay.
    ///
    /// The origin is not checked here; see the crate docs.
    pub fn handle_message(&mut self, raw: &Value) -> EmbedResult<()> {
        let mut hidden = Ok(());
        match self.relay.process(raw) {
            RelayAction::Ignore => return Ok(()),
            RelayAction::Submit(metadata) => {
                self.dispatch(&EmbedEvent::Submitted(metadata));
            }
            RelayAction::Import { success, metadata } => {
                self.dispatch(&EmbedEvent::Imported { success, metadata });
            }
            RelayAction::Close => {
                if self.frame_created {
                    hidden = self.surface.set_overlay_visible(false);
                    if let Err(err) = &hidden {
                        warn!(token = %self.token(), error = %err, "Failed to hide importer overlay");
                    }
                }
                self.modal_shown = false;
                self.phase = LifecyclePhase::ModalClosed;
                info!(token = %self.token(), "Importer modal closed");
                self.dispatch(&EmbedEvent::Closed);
            }
        }
        self.drain_requests()?;
        hidden
    }

    /// Replaces the customer data. Forwards it to a live frame only when it
    /// differs from the current value.
    pub fn set_user(&mut self, user: Option<JsonMap>) -> EmbedResult<()> {
        if self.config.user == user {
            return Ok(());
        }
        self.config.user = user;
        if self.frame_created && !self.relay.is_disposed() {
            debug!(token = %self.token(), "Forwarding updated customer data");
            let update = OutboundMessage::CustomerUpdate(self.config.user.clone().map(Value::Object));
            self.surface.post_to_frame(&update)?;
        }
        Ok(())
    }

    /// Detaches the relay and tears down the surface. Idempotent.
    pub fn dispose(&mut self) {
        if self.relay.is_disposed() {
            return;
        }
        self.relay.dispose();
        self.surface.teardown();
        info!(token = %self.token(), "Importer embed disposed");
    }

    pub fn token(&self) -> &SessionToken {
        self.relay.token()
    }

    pub fn url(&self) -> &EmbedUrl {
        &self.url
    }

    pub fn config(&self) -> &EmbedConfig {
        &self.config
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    /// Whether the host's activation control should be clickable.
    pub fn activation_enabled(&self) -> bool {
        self.activation_enabled
    }

    pub fn is_modal_shown(&self) -> bool {
        self.modal_shown
    }

    pub fn is_frame_loaded(&self) -> bool {
        self.frame_loaded
    }

    pub fn is_disposed(&self) -> bool {
        self.relay.is_disposed()
    }

    pub fn request_queue(&self) -> RequestQueue {
        self.requests.clone()
    }

    pub fn handlers_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.handlers
    }

    /// Shorthand for `handlers_mut().register(slot, handler)`.
    pub fn on(&mut self, slot: HandlerSlot, handler: impl FnMut(&EmbedEvent) + 'static) {
        self.handlers.register(slot, handler);
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    fn begin_loading(&mut self) -> EmbedResult<()> {
        if self.frame_created {
            return Ok(());
        }
        self.dispatch(&EmbedEvent::LoadStarted);
        self.surface.inject_stylesheet(GLOBAL_CSS)?;
        let holder_id = self.token().holder_id();
        self.surface.create_frame(&holder_id, self.url.as_str())?;
        self.frame_created = true;
        self.phase = LifecyclePhase::Loading;
        info!(token = %self.token(), holder = %holder_id, "Importer frame loading");
        self.drain_requests()
    }

    fn show_modal(&mut self) -> EmbedResult<()> {
        self.modal_shown = true;
        self.phase = LifecyclePhase::ModalOpen;
        self.surface.set_overlay_visible(true)?;
        self.surface.post_to_frame(&OutboundMessage::OpenModal)?;
        info!(token = %self.token(), "Importer modal opened");
        Ok(())
    }

    fn dispatch(&mut self, event: &EmbedEvent) -> DispatchReport {
        let report = self.handlers.dispatch(event);
        if report.panicked > 0 {
            warn!(
                token = %self.relay.token(),
                kind = ?event.kind(),
                panicked = report.panicked,
                invoked = report.invoked,
                "Some handlers panicked"
            );
        }
        report
    }

    fn drain_requests(&mut self) -> EmbedResult<()> {
        let updated = match self.requests.take_user() {
            Some(user) => self.set_user(user),
            None => Ok(()),
        };
        if self.requests.take_dispose() {
            self.requests.take_open();
            self.dispose();
            return updated;
        }
        if self.requests.take_open() {
            self.open()?;
        }
        updated
    }
}

impl<S: RenderSurface + std::fmt::Debug> std::fmt::Debug for EmbedController<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbedController")
            .field("token", self.token())
            .field("phase", &self.phase)
            .field("url", &self.url)
            .field("surface", &self.surface)
            .field("handlers", &self.handlers)
            .finish()
    }
}
