use std::{
    collections::HashMap,
    sync::{RwLock, atomic::{AtomicUsize, Ordering}},
};

use crate::astro::{EqCoord, HorizCoord};

#[derive(Clone, Debug)]
pub enum Event {
    /// New equatorial target accepted
    TargetChanged(EqCoord),
    /// Planner got a new horizontal target
    SlewStarted(HorizCoord),
    /// Both axes reached the target
    Arrived(HorizCoord),
    TrackingChanged(bool),
    ParkedChanged(bool),
}

type SubscriptionFun = dyn Fn(Event) + Send + Sync + 'static;

pub struct Subscription(usize);

pub struct EventSubscriptions {
    items:   RwLock<HashMap<usize, Box<SubscriptionFun>>>,
    next_id: AtomicUsize,
}

impl EventSubscriptions {
    pub fn new() -> Self {
        Self {
            items:   RwLock::new(HashMap::new()),
            next_id: AtomicUsize::new(1),
        }
    }

    pub fn subscribe(
        &self,
        fun: impl Fn(Event) + Send + Sync + 'static
    ) -> Subscription {
        let mut items = self.items.write().unwrap();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        items.insert(id, Box::new(fun));
        Subscription(id)
    }

    pub fn unsubscribe(&self, subscription: Subscription) {
        let Subscription(id) = subscription;
        let mut items = self.items.write().unwrap();
        items.remove(&id);
    }

    pub fn notify(&self, event: Event) {
        let items = self.items.read().unwrap();
        for s in items.values() {
            s(event.clone());
        }
    }
}

impl Default for EventSubscriptions {
    fn default() -> Self {
        Self::new()
    }
}

#[test]
fn test_subscribe_and_unsubscribe() {
    use std::sync::{Arc, Mutex};

    let subscriptions = EventSubscriptions::new();
    let events = Arc::new(Mutex::new(Vec::new()));

    let subscription = subscriptions.subscribe({
        let events = Arc::clone(&events);
        move |event| events.lock().unwrap().push(event)
    });

    subscriptions.notify(Event::TrackingChanged(true));
    assert_eq!(events.lock().unwrap().len(), 1);

    subscriptions.unsubscribe(subscription);
    subscriptions.notify(Event::TrackingChanged(false));
    assert_eq!(events.lock().unwrap().len(), 1);
}
