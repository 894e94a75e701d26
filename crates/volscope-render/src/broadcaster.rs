//! Fan-out of change events between the surfaces of a view mode.
//!
//! Surfaces subscribe when they become active and unsubscribe when they are
//! released. Delivery is synchronous and in subscription order; listeners
//! registered with [`ChangeBroadcaster::subscribe_after_fanout`] run once all
//! surfaces have been notified.

use std::cell::Cell;
use std::time::{Duration, Instant};

use volscope_core::{Delegate, InteractorStyle, SubscriptionId, VolumeIndex};

/// What changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A surface rendered.
    Render,
    /// An animation tick moved the scene.
    Timer,
    /// A pointer drag moved the scene.
    PointerMove,
    /// A wheel step moved the scene.
    Wheel,
    /// Data or transfer functions changed.
    ContentChanged,
    /// The interaction style changed.
    StyleChanged(InteractorStyle),
}

impl ChangeKind {
    /// Returns true for changes produced during an ongoing interaction.
    pub fn is_interactive(self) -> bool {
        matches!(
            self,
            ChangeKind::Timer | ChangeKind::PointerMove | ChangeKind::Wheel
        )
    }
}

/// A change tagged with the surface it originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Originating surface, or `None` for changes made outside any surface.
    pub origin: Option<VolumeIndex>,
    /// What changed.
    pub kind: ChangeKind,
}

impl ChangeEvent {
    /// Creates an event originating from a surface.
    pub fn from_surface(origin: VolumeIndex, kind: ChangeKind) -> Self {
        Self {
            origin: Some(origin),
            kind,
        }
    }

    /// Creates an event with no originating surface.
    pub fn external(kind: ChangeKind) -> Self {
        Self { origin: None, kind }
    }
}

/// Per-view-mode notification hub.
#[derive(Debug, Default)]
pub struct ChangeBroadcaster {
    surfaces: Delegate<ChangeEvent>,
    after_fanout: Delegate<ChangeEvent>,
    debounce: Cell<Duration>,
    last_pointer: Cell<Option<Instant>>,
    pending: Cell<Option<ChangeEvent>>,
    delivered: Cell<u64>,
}

impl ChangeBroadcaster {
    /// Creates a broadcaster without pointer debouncing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a broadcaster that delivers at most one pointer move per `debounce`.
    pub fn with_debounce(debounce: Duration) -> Self {
        let broadcaster = Self::default();
        broadcaster.debounce.set(debounce);
        broadcaster
    }

    /// Sets the pointer-move debounce interval.
    pub fn set_debounce(&self, debounce: Duration) {
        self.debounce.set(debounce);
    }

    /// Subscribes a surface handler.
    pub fn subscribe_surface(&self, handler: impl Fn(&ChangeEvent) + 'static) -> SubscriptionId {
        self.surfaces.subscribe(handler)
    }

    /// Unsubscribes a surface handler.
    pub fn unsubscribe_surface(&self, id: SubscriptionId) -> bool {
        self.surfaces.unsubscribe(id)
    }

    /// Subscribes a listener that runs after every surface was notified.
    pub fn subscribe_after_fanout(
        &self,
        listener: impl Fn(&ChangeEvent) + 'static,
    ) -> SubscriptionId {
        self.after_fanout.subscribe(listener)
    }

    /// Unsubscribes an after-fan-out listener.
    pub fn unsubscribe_after_fanout(&self, id: SubscriptionId) -> bool {
        self.after_fanout.unsubscribe(id)
    }

    /// Returns the number of subscribed surfaces.
    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    /// Returns the number of after-fan-out listeners.
    pub fn listener_count(&self) -> usize {
        self.after_fanout.len()
    }

    /// Returns the number of events delivered so far.
    pub fn delivered(&self) -> u64 {
        self.delivered.get()
    }

    /// Returns true if a debounced pointer move is waiting.
    pub fn has_pending(&self) -> bool {
        self.pending.get().is_some()
    }

    /// Posts an event. Returns false if it was held back by the debounce.
    pub fn post(&self, event: ChangeEvent) -> bool {
        self.post_at(event, Instant::now())
    }

    /// Posts an event as if it happened at `now`.
    pub fn post_at(&self, event: ChangeEvent, now: Instant) -> bool {
        if event.kind == ChangeKind::PointerMove {
            let debounce = self.debounce.get();
            if !debounce.is_zero() {
                if let Some(last) = self.last_pointer.get() {
                    if now.saturating_duration_since(last) < debounce {
                        log::trace!("pointer move from {:?} debounced", event.origin);
                        self.pending.set(Some(event));
                        return false;
                    }
                }
            }
            self.last_pointer.set(Some(now));
        }
        // A delivered event re-renders everything, covering any pending move.
        self.pending.set(None);
        self.deliver(&event);
        true
    }

    /// Delivers a debounced pointer move, if one is waiting.
    pub fn flush(&self) -> bool {
        match self.pending.take() {
            Some(event) => {
                self.last_pointer.set(Some(Instant::now()));
                self.deliver(&event);
                true
            }
            None => false,
        }
    }

    fn deliver(&self, event: &ChangeEvent) {
        log::trace!(
            "{:?} from {:?} to {} surface(s)",
            event.kind,
            event.origin,
            self.surfaces.len()
        );
        self.delivered.set(self.delivered.get() + 1);
        self.surfaces.emit(event);
        self.after_fanout.emit(event);
    }
}
