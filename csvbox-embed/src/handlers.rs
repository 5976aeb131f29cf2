//! Event handlers registered by the host, grouped in named slots.
//!
//! Each event kind has up to three slots that accumulated over time
//! (`on_import`, `is_imported`, `imported`, ...). Slots fire in declaration
//! order, handlers within a slot in registration order, and every handler
//! sees the same event. A handler that panics is logged and skipped; the
//! rest still run.

use csvbox_types::Metadata;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::warn;

/// What happened, as delivered to handlers.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbedEvent {
    /// Frame creation began.
    LoadStarted,
    /// The importer frame finished loading.
    Ready,
    /// The user submitted an import.
    Submitted(Metadata),
    /// An import finished. `metadata` is absent for the bare upload signals.
    Imported {
        success: bool,
        metadata: Option<Metadata>,
    },
    /// The importer modal was closed.
    Closed,
}

impl EmbedEvent {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::LoadStarted => EventKind::LoadStarted,
            Self::Ready => EventKind::Ready,
            Self::Submitted(_) => EventKind::Submit,
            Self::Imported { .. } => EventKind::Import,
            Self::Closed => EventKind::Close,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    LoadStarted,
    Ready,
    Submit,
    Import,
    Close,
}

/// Named handler slot. Declaration order is firing order within a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HandlerSlot {
    OnImport,
    IsImported,
    Imported,

    OnReady,
    IsReady,
    ImporterReady,

    OnClose,
    IsClosed,
    Closed,

    OnSubmit,
    IsSubmitted,
    Submitted,

    LoadStarted,
}

impl HandlerSlot {
    /// Every slot, in firing order.
    pub const ALL: [HandlerSlot; 13] = [
        Self::OnImport,
        Self::IsImported,
        Self::Imported,
        Self::OnReady,
        Self::IsReady,
        Self::ImporterReady,
        Self::OnClose,
        Self::IsClosed,
        Self::Closed,
        Self::OnSubmit,
        Self::IsSubmitted,
        Self::Submitted,
        Self::LoadStarted,
    ];

    /// The event kind this slot listens to.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::OnImport | Self::IsImported | Self::Imported => EventKind::Import,
            Self::OnReady | Self::IsReady | Self::ImporterReady => EventKind::Ready,
            Self::OnClose | Self::IsClosed | Self::Closed => EventKind::Close,
            Self::OnSubmit | Self::IsSubmitted | Self::Submitted => EventKind::Submit,
            Self::LoadStarted => EventKind::LoadStarted,
        }
    }

    /// Host-facing name of the slot.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::OnImport => "on_import",
            Self::IsImported => "is_imported",
            Self::Imported => "imported",
            Self::OnReady => "on_ready",
            Self::IsReady => "is_ready",
            Self::ImporterReady => "importer_ready",
            Self::OnClose => "on_close",
            Self::IsClosed => "is_closed",
            Self::Closed => "closed",
            Self::OnSubmit => "on_submit",
            Self::IsSubmitted => "is_submitted",
            Self::Submitted => "submitted",
            Self::LoadStarted => "load_started",
        }
    }

    /// Inverse of [`HandlerSlot::name`].
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.name() == name)
    }
}

type Handler = Box<dyn FnMut(&EmbedEvent)>;

/// Outcome of delivering one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub invoked: usize,
    pub panicked: usize,
}

/// Ordered handler lists keyed by slot.
#[derive(Default)]
pub struct HandlerRegistry {
    slots: BTreeMap<HandlerSlot, Vec<Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `handler` to `slot`.
    pub fn register(&mut self, slot: HandlerSlot, handler: impl FnMut(&EmbedEvent) + 'static) {
        self.slots.entry(slot).or_default().push(Box::new(handler));
    }

    /// Registers an import handler receiving `(success, metadata)`.
    pub fn on_import(&mut self, mut handler: impl FnMut(bool, Option<&Metadata>) + 'static) {
        self.register(HandlerSlot::OnImport, move |event| {
            if let EmbedEvent::Imported { success, metadata } = event {
                handler(*success, metadata.as_ref());
            }
        });
    }

    pub fn on_submit(&mut self, mut handler: impl FnMut(&Metadata) + 'static) {
        self.register(HandlerSlot::OnSubmit, move |event| {
            if let EmbedEvent::Submitted(metadata) = event {
                handler(metadata);
            }
        });
    }

    pub fn on_ready(&mut self, mut handler: impl FnMut() + 'static) {
        self.register(HandlerSlot::OnReady, move |_| handler());
    }

    pub fn on_close(&mut self, mut handler: impl FnMut() + 'static) {
        self.register(HandlerSlot::OnClose, move |_| handler());
    }

    pub fn load_started(&mut self, mut handler: impl FnMut() + 'static) {
        self.register(HandlerSlot::LoadStarted, move |_| handler());
    }

    /// Number of handlers listening to `kind`.
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.slots
            .iter()
            .filter(|(slot, _)| slot.kind() == kind)
            .map(|(_, handlers)| handlers.len())
            .sum()
    }

    /// Delivers `event` to every handler of its kind.
    pub fn dispatch(&mut self, event: &EmbedEvent) -> DispatchReport {
        let kind = event.kind();
        let mut report = DispatchReport::default();

        for (slot, handlers) in self.slots.iter_mut() {
            if slot.kind() != kind {
                continue;
            }
            for handler in handlers.iter_mut() {
                report.invoked += 1;
                if let Err(payload) = catch_unwind(AssertUnwindSafe(|| handler(event))) {
                    report.panicked += 1;
                    warn!(
                        slot = slot.name(),
                        panic = panic_message(payload.as_ref()),
                        "Event handler panicked"
                    );
                }
            }
        }
        report
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: BTreeMap<&str, usize> = self
            .slots
            .iter()
            .map(|(slot, handlers)| (slot.name(), handlers.len()))
            .collect();
        f.debug_struct("HandlerRegistry").field("slots", &counts).finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<&'static str>>>;

    fn recorder() -> (Log, impl Fn(&'static str) -> Box<dyn FnMut(&EmbedEvent)>) {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let make = move |name: &'static str| {
            let log = Rc::clone(&sink);
            Box::new(move |_: &EmbedEvent| log.borrow_mut().push(name)) as Box<dyn FnMut(&EmbedEvent)>
        };
        (log, make)
    }

    #[test]
    fn slots_fire_in_declaration_order() {
        let (log, make) = recorder();
        let mut registry = HandlerRegistry::new();
        // Registered out of order on purpose.
        registry.register(HandlerSlot::Imported, make("imported"));
        registry.register(HandlerSlot::OnImport, make("on_import"));
        registry.register(HandlerSlot::IsImported, make("is_imported"));

        registry.dispatch(&EmbedEvent::Imported { success: true, metadata: None });
        assert_eq!(*log.borrow(), vec!["on_import", "is_imported", "imported"]);
    }

    #[test]
    fn same_slot_fires_in_registration_order() {
        let (log, make) = recorder();
        let mut registry = HandlerRegistry::new();
        registry.register(HandlerSlot::OnClose, make("first"));
        registry.register(HandlerSlot::OnClose, make("second"));

        registry.dispatch(&EmbedEvent::Closed);
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn other_kinds_are_not_invoked() {
        let (log, make) = recorder();
        let mut registry = HandlerRegistry::new();
        registry.register(HandlerSlot::OnReady, make("ready"));

        let report = registry.dispatch(&EmbedEvent::Closed);
        assert_eq!(report, DispatchReport::default());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn panicking_handler_does_not_block_others() {
        let (log, make) = recorder();
        let mut registry = HandlerRegistry::new();
        registry.register(HandlerSlot::OnSubmit, |_| panic!("consumer bug"));
        registry.register(HandlerSlot::IsSubmitted, make("is_submitted"));
        registry.register(HandlerSlot::Submitted, make("submitted"));

        let report = registry.dispatch(&EmbedEvent::Submitted(Metadata::new()));
        assert_eq!(report, DispatchReport { invoked: 3, panicked: 1 });
        assert_eq!(*log.borrow(), vec!["is_submitted", "submitted"]);
    }

    #[test]
    fn typed_import_handler_receives_arguments() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut registry = HandlerRegistry::new();
        registry.on_import(move |success, metadata| {
            sink.borrow_mut().push((success, metadata.cloned()));
        });

        let mut metadata = Metadata::new();
        metadata.insert("row_count".into(), serde_json::json!(3));
        registry.dispatch(&EmbedEvent::Imported {
            success: false,
            metadata: Some(metadata.clone()),
        });
        registry.dispatch(&EmbedEvent::Imported { success: true, metadata: None });

        assert_eq!(*seen.borrow(), vec![(false, Some(metadata)), (true, None)]);
    }

    #[test]
    fn count_groups_by_kind() {
        let mut registry = HandlerRegistry::new();
        registry.on_ready(|| {});
        registry.register(HandlerSlot::IsReady, |_| {});
        registry.register(HandlerSlot::ImporterReady, |_| {});
        registry.on_close(|| {});
        assert_eq!(registry.count(EventKind::Ready), 3);
        assert_eq!(registry.count(EventKind::Close), 1);
        assert_eq!(registry.count(EventKind::Import), 0);
    }

    #[test]
    fn every_slot_has_a_distinct_name() {
        let names: std::collections::HashSet<_> = HandlerSlot::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(names.len(), HandlerSlot::ALL.len());
        for slot in HandlerSlot::ALL {
            assert_eq!(HandlerSlot::from_name(slot.name()), Some(slot));
        }
        assert_eq!(HandlerSlot::from_name("onImport"), None);
    }

    #[test]
    fn all_is_sorted() {
        let mut sorted = HandlerSlot::ALL;
        sorted.sort();
        assert_eq!(sorted, HandlerSlot::ALL);
    }
}
