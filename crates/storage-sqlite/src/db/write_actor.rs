//! Single-writer actor: all mutations are funneled through one dedicated
//! thread, each job wrapped in an immediate transaction. This serializes
//! writers (SQLite allows only one) and makes every `exec` call atomic.

use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;
use log::warn;
use std::any::Any;
use std::thread;
use tokio::sync::{mpsc, oneshot};

use cointrack_core::errors::{DatabaseError, Error, Result};

use crate::errors::StorageError;

type ErasedResult = Result<Box<dyn Any + Send>>;
type WriteJob = Box<dyn FnOnce(&mut SqliteConnection) -> ErasedResult + Send>;

enum TxError {
    Domain(Error),
    Diesel(diesel::result::Error),
}

impl From<diesel::result::Error> for TxError {
    fn from(err: diesel::result::Error) -> Self {
        TxError::Diesel(err)
    }
}

#[derive(Clone)]
pub struct WriteHandle {
    tx: mpsc::UnboundedSender<(WriteJob, oneshot::Sender<ErasedResult>)>,
}

/// Spawns the writer thread and returns a cloneable handle to it.
pub fn spawn_writer(pool: Pool<ConnectionManager<SqliteConnection>>) -> WriteHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<(WriteJob, oneshot::Sender<ErasedResult>)>();

    thread::spawn(move || {
        while let Some((job, reply)) = rx.blocking_recv() {
            let result = run_job(&pool, job);
            if reply.send(result).is_err() {
                warn!("Write job completed but the caller went away");
            }
        }
    });

    WriteHandle { tx }
}

fn run_job(pool: &Pool<ConnectionManager<SqliteConnection>>, job: WriteJob) -> ErasedResult {
    let mut conn = pool
        .get()
        .map_err(StorageError::from)
        .map_err(Error::from)?;

    conn.immediate_transaction::<_, TxError, _>(|tx| job(tx).map_err(TxError::Domain))
        .map_err(|e| match e {
            TxError::Domain(err) => err,
            TxError::Diesel(err) => Error::from(StorageError::from(err)),
        })
}

impl WriteHandle {
    /// Runs `job` on the writer thread inside its own transaction and
    /// returns its result.
    pub async fn exec<T, F>(&self, job: F) -> Result<T>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let erased: WriteJob =
            Box::new(move |conn| job(conn).map(|value| Box::new(value) as Box<dyn Any + Send>));

        self.tx.send((erased, reply_tx)).map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "Write actor is no longer running".to_string(),
            ))
        })?;

        let erased_value = reply_rx.await.map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "Write actor dropped the reply channel".to_string(),
            ))
        })??;

        erased_value.downcast::<T>().map(|boxed| *boxed).map_err(|_| {
            Error::Database(DatabaseError::Internal(
                "Write job returned an unexpected type".to_string(),
            ))
        })
    }
}
