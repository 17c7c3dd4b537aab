// SPDX-License-Identifier: MIT OR Apache-2.0
//! Synchronous publish/subscribe bus and the core event types.

use crate::handle::{AttributeHandle, HandleCounter};
use crate::registry::TypeRegistry;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub use crate::handle::SubscriptionId;

/// Marker for types that can travel over the [`EventBus`]
pub trait Event: Any + Send + Sync {}

/// Callback invoked for each published event of one type
pub type EventCallback = Arc<dyn Fn(&dyn Any) + Send + Sync>;

#[derive(Default)]
struct BusState {
    subscribers: HashMap<TypeId, Vec<(SubscriptionId, EventCallback)>>,
    next_id: HandleCounter,
}

/// Shared event dispatcher.
///
/// Clones publish to and subscribe on the same set of callbacks. Callbacks
/// run on the publishing thread with no internal lock held, so they may
/// publish or subscribe themselves.
#[derive(Clone, Default)]
pub struct EventBus {
    state: Arc<Mutex<BusState>>,
}

impl EventBus {
    /// Create a bus with no subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for events of exactly type `E`
    pub fn subscribe<E: Event>(&self, callback: impl Fn(&E) + Send + Sync + 'static) -> SubscriptionId {
        let erased: EventCallback = Arc::new(move |event: &dyn Any| {
            if let Some(event) = event.downcast_ref::<E>() {
                callback(event);
            }
        });

        let mut state = self.state.lock();
        let id = SubscriptionId::new(state.next_id.next());
        state
            .subscribers
            .entry(TypeId::of::<E>())
            .or_default()
            .push((id, erased));
        tracing::trace!("Subscription {} added for {}", id, std::any::type_name::<E>());
        id
    }

    /// Deliver `event` to every subscriber of `E`, returning how many ran
    pub fn publish<E: Event>(&self, event: &E) -> usize {
        let callbacks: Vec<EventCallback> = {
            let state = self.state.lock();
            match state.subscribers.get(&TypeId::of::<E>()) {
                Some(list) => list.iter().map(|(_, callback)| callback.clone()).collect(),
                None => return 0,
            }
        };

        tracing::trace!(
            "Dispatching {} to {} subscribers",
            std::any::type_name::<E>(),
            callbacks.len()
        );
        for callback in &callbacks {
            callback(event as &dyn Any);
        }
        callbacks.len()
    }

    /// Remove a subscription; false when the id is unknown
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.lock();
        let mut removed = false;
        for list in state.subscribers.values_mut() {
            let before = list.len();
            list.retain(|(existing, _)| *existing != id);
            removed |= list.len() != before;
        }
        state.subscribers.retain(|_, list| !list.is_empty());
        removed
    }

    /// Number of callbacks registered for `E`
    pub fn subscriber_count<E: Event>(&self) -> usize {
        self.state
            .lock()
            .subscribers
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("EventBus")
            .field("event_types", &state.subscribers.len())
            .field(
                "subscriptions",
                &state.subscribers.values().map(Vec::len).sum::<usize>(),
            )
            .finish()
    }
}

/// Identity of a scene, used to scope attribute events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SceneId(pub Uuid);

impl SceneId {
    /// Create a new random scene ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SceneId {
    fn default() -> Self {
        Self::new()
    }
}

/// What happened to an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeMessage {
    /// The stored value was written
    Changed,
    /// A connection now ends or starts here
    Connected,
    /// A connection touching it was removed
    Disconnected,
}

/// Notification about a single attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeEvent {
    /// Kind of notification
    pub message: AttributeMessage,
    /// Attribute concerned
    pub attribute: AttributeHandle,
    /// Scene the attribute lives in, if any
    pub scope: Option<SceneId>,
}

impl AttributeEvent {
    /// A value-changed notification
    pub fn changed(attribute: AttributeHandle, scope: Option<SceneId>) -> Self {
        Self {
            message: AttributeMessage::Changed,
            attribute,
            scope,
        }
    }
}

impl Event for AttributeEvent {}

/// A connection was inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionAddedEvent {
    /// Source attribute
    pub from: AttributeHandle,
    /// Target attribute
    pub to: AttributeHandle,
}

impl Event for ConnectionAddedEvent {}

/// A connection was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionRemovedEvent {
    /// Source attribute
    pub from: AttributeHandle,
    /// Target attribute
    pub to: AttributeHandle,
}

impl Event for ConnectionRemovedEvent {}

/// Register the core events for introspection
pub fn register_core_events(registry: &TypeRegistry) {
    registry.register_event_type::<AttributeEvent>("AttributeEvent", "Attribute");
    registry.register_event_type::<ConnectionAddedEvent>("ConnectionAddedEvent", "Connection");
    registry.register_event_type::<ConnectionRemovedEvent>("ConnectionRemovedEvent", "Connection");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

    struct TestEvent {
        value: i32,
    }

    impl Event for TestEvent {}

    struct OtherEvent;

    impl Event for OtherEvent {}

    #[test]
    fn test_publish_reaches_subscribers() {
        let bus = EventBus::new();
        let total = Arc::new(AtomicI32::new(0));

        let first = total.clone();
        bus.subscribe::<TestEvent>(move |e| {
            first.fetch_add(e.value, Ordering::SeqCst);
        });
        let second = total.clone();
        bus.subscribe::<TestEvent>(move |e| {
            second.fetch_add(e.value * 10, Ordering::SeqCst);
        });

        assert_eq!(bus.publish(&TestEvent { value: 2 }), 2);
        assert_eq!(total.load(Ordering::SeqCst), 22);
    }

    #[test]
    fn test_dispatch_is_by_exact_type() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let sink = hits.clone();
        bus.subscribe::<TestEvent>(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(bus.publish(&OtherEvent), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let sink = hits.clone();
        let id = bus.subscribe::<TestEvent>(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        });
        assert!(id.is_valid());
        assert_eq!(bus.subscriber_count::<TestEvent>(), 1);

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.subscriber_count::<TestEvent>(), 0);

        bus.publish(&TestEvent { value: 1 });
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_ids_are_monotonic() {
        let bus = EventBus::new();
        let a = bus.subscribe::<TestEvent>(|_| {});
        let b = bus.subscribe::<OtherEvent>(|_| {});

        assert_eq!(a, SubscriptionId::new(1));
        assert_eq!(b, SubscriptionId::new(2));
    }

    #[test]
    fn test_callbacks_may_publish() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let inner = bus.clone();
        bus.subscribe::<TestEvent>(move |e| {
            if e.value > 0 {
                inner.publish(&TestEvent { value: e.value - 1 });
            }
        });
        let sink = hits.clone();
        bus.subscribe::<TestEvent>(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        });

        bus.publish(&TestEvent { value: 2 });
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_register_core_events() {
        let registry = TypeRegistry::new();
        register_core_events(&registry);

        assert_eq!(registry.event_types_in_category("Connection").len(), 2);
        assert_eq!(
            registry.event_categories(),
            vec!["Attribute".to_string(), "Connection".to_string()]
        );
    }
}
