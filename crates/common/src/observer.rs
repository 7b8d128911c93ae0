/// Handle returned by [`Observers::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

/// Typed callback registry for a single event kind.
///
/// Listeners are invoked synchronously, in subscription order, on the thread
/// that emits. There is one registry per event type, so handlers are checked
/// against the event type at compile time.
pub struct Observers<E> {
    next: u64,
    listeners: Vec<(Subscription, Box<dyn FnMut(&E)>)>,
}

impl<E> Observers<E> {
    pub fn new() -> Self {
        Self {
            next: 0,
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&E) + 'static) -> Subscription {
        let handle = Subscription(self.next);
        self.next += 1;
        self.listeners.push((handle, Box::new(listener)));
        handle
    }

    /// Returns true if the subscription existed.
    pub fn unsubscribe(&mut self, handle: Subscription) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(h, _)| *h != handle);
        self.listeners.len() != before
    }

    pub fn emit(&mut self, event: &E) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<E> Default for Observers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for Observers<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn emit_reaches_all_listeners_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut obs: Observers<u32> = Observers::new();
        let a = seen.clone();
        obs.subscribe(move |v| a.borrow_mut().push(("a", *v)));
        let b = seen.clone();
        obs.subscribe(move |v| b.borrow_mut().push(("b", *v)));

        obs.emit(&3);
        assert_eq!(*seen.borrow(), vec![("a", 3), ("b", 3)]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let count = Rc::new(RefCell::new(0));
        let mut obs: Observers<()> = Observers::new();
        let c = count.clone();
        let handle = obs.subscribe(move |_| *c.borrow_mut() += 1);
        obs.emit(&());
        assert!(obs.unsubscribe(handle));
        assert!(!obs.unsubscribe(handle));
        obs.emit(&());
        assert_eq!(*count.borrow(), 1);
        assert!(obs.is_empty());
    }
}
