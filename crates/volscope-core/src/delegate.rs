//! Ordered subscriber lists.
//!
//! A [`Delegate`] holds callbacks in subscription order and invokes them in
//! that order. It is single-threaded and uses interior mutability, so a
//! delegate can be shared behind an `Rc` and subscribed to from inside a
//! callback.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Handle returned by [`Delegate::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Callback<A> = Rc<dyn Fn(&A)>;

/// An ordered list of callbacks taking `&A`.
pub struct Delegate<A: ?Sized> {
    next_id: Cell<u64>,
    subscribers: RefCell<Vec<(SubscriptionId, Callback<A>)>>,
}

impl<A: ?Sized> Default for Delegate<A> {
    fn default() -> Self {
        Self {
            next_id: Cell::new(0),
            subscribers: RefCell::new(Vec::new()),
        }
    }
}

impl<A: ?Sized> fmt::Debug for Delegate<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delegate")
            .field("subscribers", &self.len())
            .finish()
    }
}

impl<A: ?Sized> Delegate<A> {
    /// Creates an empty delegate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a callback and returns its handle.
    pub fn subscribe(&self, callback: impl Fn(&A) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        let callback: Callback<A> = Rc::new(callback);
        self.subscribers.borrow_mut().push((id, callback));
        id
    }

    /// Removes a callback. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Returns true if the handle is still subscribed.
    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.subscribers.borrow().iter().any(|(sid, _)| *sid == id)
    }

    /// Invokes every callback in subscription order.
    ///
    /// Callbacks unsubscribed by an earlier callback of the same emission are
    /// skipped; callbacks subscribed during the emission run from the next one.
    pub fn emit(&self, args: &A) {
        let snapshot: Vec<(SubscriptionId, Callback<A>)> = self.subscribers.borrow().clone();
        for (id, callback) in snapshot {
            if self.contains(id) {
                callback(args);
            }
        }
    }

    /// Returns the number of subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Returns true if nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.subscribers.borrow().is_empty()
    }

    /// Removes every subscriber.
    pub fn clear(&self) {
        self.subscribers.borrow_mut().clear();
    }
}
