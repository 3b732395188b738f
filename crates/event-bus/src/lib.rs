//! In-memory event bus and disposable listeners.
//!
//! Listeners registered through [`InMemoryBus::listen`] run on their own task and are torn down
//! through a [`Subscription`] handle. Disposal is idempotent: only the first call reports that it
//! actually unregistered the listener, which lets competing triggers (completion, timeout, tab
//! closure) agree on a single winner.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use snauth_core_types::HelperError;

/// Trait implemented by payload types that can be carried on the bus.
pub trait Event: Clone + Send + Sync + std::fmt::Debug + 'static {}

impl<T> Event for T where T: Clone + Send + Sync + std::fmt::Debug + 'static {}

#[async_trait]
pub trait EventBus<E>: Send + Sync
where
    E: Event,
{
    async fn publish(&self, event: E) -> Result<(), HelperError>;
    fn subscribe(&self) -> broadcast::Receiver<E>;
}

/// Simple in-memory bus backed by a broadcast channel.
pub struct InMemoryBus<E>
where
    E: Event,
{
    sender: broadcast::Sender<E>,
}

impl<E> InMemoryBus<E>
where
    E: Event,
{
    pub fn new(capacity: usize) -> Arc<Self> {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Arc::new(Self { sender })
    }

    /// Number of receivers currently attached, listeners included.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Register `handler` for every event published after this call returns.
    ///
    /// The receiver is attached before the listener task is spawned, so nothing published after
    /// `listen` returns is missed. The handler receives the subscription so it can dispose itself.
    pub fn listen<F>(&self, mut handler: F) -> Subscription
    where
        F: FnMut(E, &Subscription) + Send + 'static,
    {
        let mut rx = self.sender.subscribe();
        let subscription = Subscription::new();
        let task_sub = subscription.clone();
        let token = subscription.inner.cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    received = rx.recv() => match received {
                        Ok(event) => {
                            if !task_sub.is_active() {
                                break;
                            }
                            handler(event, &task_sub);
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "listener lagged behind event bus");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
        });
        subscription
    }
}

#[async_trait]
impl<E> EventBus<E> for InMemoryBus<E>
where
    E: Event,
{
    /// Publishing with no receivers attached is not an error; the event is simply dropped.
    async fn publish(&self, event: E) -> Result<(), HelperError> {
        if self.sender.receiver_count() == 0 {
            return Ok(());
        }
        self.sender
            .send(event)
            .map(|_| ())
            .map_err(|err| HelperError::new(err.to_string()))
    }

    fn subscribe(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }
}

struct SubscriptionInner {
    active: AtomicBool,
    cancel: CancellationToken,
}

/// Disposer for a listener registered with [`InMemoryBus::listen`].
///
/// Clones share the same registration.
#[derive(Clone)]
pub struct Subscription {
    inner: Arc<SubscriptionInner>,
}

impl Subscription {
    fn new() -> Self {
        Self {
            inner: Arc::new(SubscriptionInner {
                active: AtomicBool::new(true),
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Unregister the listener. Returns `true` only for the call that performed the removal.
    pub fn dispose(&self) -> bool {
        let was_active = self.inner.active.swap(false, Ordering::SeqCst);
        self.inner.cancel.cancel();
        was_active
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Resolves once the subscription has been disposed by any holder.
    pub async fn disposed(&self) {
        self.inner.cancel.cancelled().await
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
