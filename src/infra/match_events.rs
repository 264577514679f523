use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// How a match ended, from the point of view of the AI fighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchResult {
    SelfWin,
    OpponentWin,
    Draw,
}

/// Receives match lifecycle events
pub trait MatchListener {
    /// Called when a new match (episode) begins
    fn on_match_start(&mut self);

    /// Called once when a match is decided
    fn on_match_end(&mut self, result: MatchResult);
}

type ListenerRef = Weak<RefCell<dyn MatchListener>>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, ListenerRef)>,
}

/// Event source a match coordinator raises lifecycle events through.
///
/// Listeners are held weakly. Each subscription returns a [`Subscription`]
/// guard; dropping it removes the listener.
#[derive(Clone, Default)]
pub struct MatchEvents {
    registry: Rc<RefCell<Registry>>,
}

impl MatchEvents {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<L>(&self, listener: &Rc<RefCell<L>>) -> Subscription
    where
        L: MatchListener + 'static,
    {
        let listener: Rc<RefCell<dyn MatchListener>> = listener.clone();
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, Rc::downgrade(&listener)));

        Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registry
            .borrow()
            .listeners
            .iter()
            .filter(|(_, l)| l.strong_count() > 0)
            .count()
    }

    pub fn emit_match_start(&self) {
        for listener in self.live_listeners() {
            listener.borrow_mut().on_match_start();
        }
    }

    pub fn emit_match_end(&self, result: MatchResult) {
        for listener in self.live_listeners() {
            listener.borrow_mut().on_match_end(result);
        }
    }

    // Snapshot first so listeners may subscribe or unsubscribe while handling
    fn live_listeners(&self) -> Vec<Rc<RefCell<dyn MatchListener>>> {
        let mut registry = self.registry.borrow_mut();
        registry.listeners.retain(|(_, l)| l.strong_count() > 0);
        registry
            .listeners
            .iter()
            .filter_map(|(_, l)| l.upgrade())
            .collect()
    }
}

/// Keeps a listener registered while alive.
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .borrow_mut()
                .listeners
                .retain(|(id, _)| *id != self.id);
        }
    }
}
