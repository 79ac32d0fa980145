use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, mpsc, oneshot};
use uuid::Uuid;

use super::config::Config;
use super::data::Crime;
use super::error::RepositoryError;
use super::live::{LiveQuery, SubscriptionId};
use super::store::CrimeStore;
use super::worker::{self, Command, WriteFailure};

/// Failures kept for slow receivers before they start lagging
const FAILURE_BACKLOG: usize = 32;

/// The CrimeRepository is the single access point to the crime store.
///
/// Reads are live queries; writes are queued on the background worker
/// and never block the caller.
pub struct CrimeRepository {
    commands: mpsc::UnboundedSender<Command>,
    failures: broadcast::Sender<WriteFailure>,
    next_subscription: AtomicU64,
}

impl CrimeRepository {
    /// Open the database named by `config` and start the write worker
    pub fn open(config: &Config) -> Result<Self, RepositoryError> {
        let store = CrimeStore::open(&config.database_path)?;
        Self::with_store(store)
    }

    /// Start the write worker on an already opened store
    pub fn with_store(store: CrimeStore) -> Result<Self, RepositoryError> {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (failures, _) = broadcast::channel(FAILURE_BACKLOG);

        worker::spawn(store, receiver, failures.clone()).map_err(RepositoryError::WorkerSpawn)?;

        Ok(Self {
            commands,
            failures,
            next_subscription: AtomicU64::new(1),
        })
    }

    /// Live query over every crime
    pub fn get_crimes(&self) -> LiveQuery<Vec<Crime>> {
        let id = self.subscription_id();
        let (sender, receiver) = mpsc::unbounded_channel();
        self.submit(Command::SubscribeList(id, sender));
        LiveQuery::new(id, receiver, self.commands.clone())
    }

    /// Live query over one crime; delivers None while it doesn't exist
    pub fn get_crime(&self, crime_id: Uuid) -> LiveQuery<Option<Crime>> {
        let id = self.subscription_id();
        let (sender, receiver) = mpsc::unbounded_channel();
        self.submit(Command::SubscribeCrime(id, crime_id, sender));
        LiveQuery::new(id, receiver, self.commands.clone())
    }

    /// Queue an insert
    pub fn add_crime(&self, crime: Crime) {
        tracing::debug!(id = %crime.id, "queueing crime insert");
        self.submit(Command::Insert(crime));
    }

    /// Queue an update
    pub fn update_crime(&self, crime: Crime) {
        tracing::debug!(id = %crime.id, "queueing crime update");
        self.submit(Command::Update(crime));
    }

    /// Wait until every command queued before this call has run
    #[cfg(test)]
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        self.submit(Command::Flush(done));
        // An error here means the worker is gone, so nothing is pending
        let _ = wait.await;
    }

    /// Block the calling thread until every queued write has run.
    /// Called on shutdown; must not be called from inside an async runtime.
    pub fn flush_blocking(&self) {
        let (done, wait) = oneshot::channel();
        self.submit(Command::Flush(done));
        if wait.blocking_recv().is_err() {
            tracing::warn!("write worker stopped before the queue drained");
        }
    }

    /// Subscribe to failed writes
    pub fn write_failures(&self) -> broadcast::Receiver<WriteFailure> {
        self.failures.subscribe()
    }

    fn subscription_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed))
    }

    fn submit(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::error!("write worker is not running; command dropped");
        }
    }
}

impl std::fmt::Debug for CrimeRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrimeRepository")
            .field("next_subscription", &self.next_subscription)
            .finish()
    }
}
