/// Live queries
///
/// A live query is a query result that is delivered again every time
/// a write could have changed it. The store keeps the registry of
/// listeners; screens hold a `LiveQuery` handle and release the
/// subscription by dropping it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::data::Crime;
use super::worker::Command;

/// Identifies one live query for its whole lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// A registered consumer of query results
enum Listener {
    /// Every crime, re-delivered after any write
    List(UnboundedSender<Vec<Crime>>),
    /// One crime, re-delivered after writes to that id
    Crime(Uuid, UnboundedSender<Option<Crime>>),
}

/// Registered live queries, keyed by subscription
#[derive(Default)]
pub struct LiveRegistry {
    listeners: HashMap<SubscriptionId, Listener>,
}

impl LiveRegistry {
    pub fn add_list(&mut self, subscription: SubscriptionId, sender: UnboundedSender<Vec<Crime>>) {
        tracing::debug!(?subscription, "crime list subscribed");
        self.listeners.insert(subscription, Listener::List(sender));
    }

    pub fn add_crime(
        &mut self,
        subscription: SubscriptionId,
        id: Uuid,
        sender: UnboundedSender<Option<Crime>>,
    ) {
        tracing::debug!(?subscription, %id, "crime subscribed");
        self.listeners.insert(subscription, Listener::Crime(id, sender));
    }

    pub fn remove(&mut self, subscription: SubscriptionId) {
        if self.listeners.remove(&subscription).is_some() {
            tracing::debug!(?subscription, "unsubscribed");
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether any list query is registered
    pub fn has_list(&self) -> bool {
        self.listeners
            .values()
            .any(|listener| matches!(listener, Listener::List(_)))
    }

    /// Whether any single-crime query watches `id`
    pub fn watches(&self, id: Uuid) -> bool {
        self.listeners
            .values()
            .any(|listener| matches!(listener, Listener::Crime(watched, _) if *watched == id))
    }

    /// Hand fresh results to the listeners affected by a write to `changed`.
    /// Listeners whose receiver is gone are dropped.
    pub fn deliver(&mut self, changed: Uuid, list: Option<Vec<Crime>>, crime: Option<Option<Crime>>) {
        self.listeners.retain(|subscription, listener| {
            let delivered = match listener {
                Listener::List(sender) => match &list {
                    Some(crimes) => sender.send(crimes.clone()).is_ok(),
                    None => true,
                },
                Listener::Crime(id, sender) if *id == changed => match &crime {
                    Some(value) => sender.send(value.clone()).is_ok(),
                    None => true,
                },
                Listener::Crime(..) => true,
            };

            if !delivered {
                tracing::debug!(?subscription, "dropping closed subscription");
            }
            delivered
        });
    }
}

/// Handle to a live query.
///
/// Values arrive in the order the worker produced them; the first one is
/// the state at subscription time. Dropping the handle unsubscribes.
pub struct LiveQuery<T> {
    id: SubscriptionId,
    receiver: Arc<Mutex<UnboundedReceiver<T>>>,
    commands: UnboundedSender<Command>,
}

impl<T: Send + 'static> LiveQuery<T> {
    pub(crate) fn new(
        id: SubscriptionId,
        receiver: UnboundedReceiver<T>,
        commands: UnboundedSender<Command>,
    ) -> Self {
        Self {
            id,
            receiver: Arc::new(Mutex::new(receiver)),
            commands,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Wait for the next delivered value.
    /// Returns None once the subscription has been released.
    #[cfg(test)]
    pub async fn next(&self) -> Option<T> {
        self.receiver.lock().await.recv().await
    }

    /// Wait for the next delivered value (None once released). The future
    /// owns what it needs so it can be handed to the UI runtime.
    pub fn changes(&self) -> impl Future<Output = Option<T>> + Send + 'static {
        let receiver = Arc::clone(&self.receiver);
        async move { receiver.lock().await.recv().await }
    }
}

impl<T> Drop for LiveQuery<T> {
    fn drop(&mut self) {
        // The worker may already be gone at shutdown
        let _ = self.commands.send(Command::Unsubscribe(self.id));
    }
}

impl<T> std::fmt::Debug for LiveQuery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveQuery").field("id", &self.id).finish()
    }
}
