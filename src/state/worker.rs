/// Background write worker
///
/// Exactly one thread owns the crime store. Writes, subscriptions and
/// flushes arrive over one channel and run strictly in submission order.

use std::thread::{self, JoinHandle};
use tokio::sync::{broadcast, mpsc, oneshot};
use uuid::Uuid;

use super::data::Crime;
use super::live::SubscriptionId;
use super::store::CrimeStore;

const WORKER_NAME: &str = "crime-writer";

/// Work for the background thread
pub(crate) enum Command {
    Insert(Crime),
    Update(Crime),
    SubscribeList(SubscriptionId, mpsc::UnboundedSender<Vec<Crime>>),
    SubscribeCrime(SubscriptionId, Uuid, mpsc::UnboundedSender<Option<Crime>>),
    Unsubscribe(SubscriptionId),
    /// Answered once every earlier command has run
    Flush(oneshot::Sender<()>),
}

/// Which write failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Insert,
    Update,
}

impl std::fmt::Display for WriteOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteOp::Insert => f.write_str("insert"),
            WriteOp::Update => f.write_str("update"),
        }
    }
}

/// A write that could not be applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    pub crime_id: Uuid,
    pub op: WriteOp,
    pub message: String,
}

/// Start the worker thread. It runs until every command sender is dropped.
pub(crate) fn spawn(
    mut store: CrimeStore,
    mut commands: mpsc::UnboundedReceiver<Command>,
    failures: broadcast::Sender<WriteFailure>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(WORKER_NAME.to_string())
        .spawn(move || {
            tracing::debug!("write worker started");
            while let Some(command) = commands.blocking_recv() {
                run(&mut store, command, &failures);
            }
            tracing::debug!("write worker stopped");
        })
}

fn run(store: &mut CrimeStore, command: Command, failures: &broadcast::Sender<WriteFailure>) {
    match command {
        Command::Insert(crime) => {
            if let Err(e) = store.insert(&crime) {
                report(failures, crime.id, WriteOp::Insert, e);
            }
        }
        Command::Update(crime) => {
            if let Err(e) = store.update(&crime) {
                report(failures, crime.id, WriteOp::Update, e);
            }
        }
        Command::SubscribeList(subscription, sender) => {
            if let Err(e) = store.subscribe_list(subscription, sender) {
                tracing::error!(error = %e, ?subscription, "failed to load crime list");
            }
        }
        Command::SubscribeCrime(subscription, id, sender) => {
            if let Err(e) = store.subscribe_crime(subscription, id, sender) {
                tracing::error!(error = %e, ?subscription, %id, "failed to load crime");
            }
        }
        Command::Unsubscribe(subscription) => store.unsubscribe(subscription),
        Command::Flush(done) => {
            // Nobody waiting is fine
            let _ = done.send(());
        }
    }
}

fn report(
    failures: &broadcast::Sender<WriteFailure>,
    crime_id: Uuid,
    op: WriteOp,
    error: super::error::StoreError,
) {
    tracing::error!(error = %error, %crime_id, %op, "crime write failed");

    // No receivers means nobody is showing errors right now
    let _ = failures.send(WriteFailure {
        crime_id,
        op,
        message: error.to_string(),
    });
}
