//! Transaction lifecycle (spec.md C4, §4.4).
//!
//! Grounded on `examples/original_source/ledis/tx.go`: `Begin` takes the
//! DB's exclusive write-lock, opens a store transaction, and clones the DB
//! into a shell whose five batches all share one transaction-mode batch.
//! `Commit`/`Rollback` release the store transaction and the write-lock and
//! discard the shell. Rust expresses "discard" by consuming `self` rather
//! than null-checking a pointer, and reclaims sole ownership of the shared
//! store transaction by dropping the shell (and its batches) first.

use crate::db::LogicalDb;
use crate::store::StoreTx;
use std::sync::{Arc, Mutex as StdMutex};
use thiserror::Error;
use tokio::sync::OwnedRwLockWriteGuard;

#[derive(Debug, Error)]
pub enum TxError {
    #[error("nest transaction not supported")]
    NestTx,
    #[error("transaction has already been committed or rolled back")]
    TxDone,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Commands forbidden while a transaction is in progress (spec.md §6:
/// "Transaction deny-list (fixed)"). Checked case-insensitively by the
/// dispatcher before routing into the transaction handler.
pub const DENY_LIST: &[&str] = &["select", "echo", "ping", "slaveof", "fullsync", "sync", "quit", "config"];

pub fn is_denied(cmd: &str) -> bool {
    DENY_LIST.contains(&cmd.to_ascii_lowercase().as_str())
}

/// One write or pass-through command recorded for AOF emission at commit.
#[derive(Debug, Clone)]
pub struct Action {
    pub command: String,
    pub args: Vec<Vec<u8>>,
}

/// Per-connection transaction state. `None` on the connection when it is
/// not in a transaction; constructed between `BEGIN` and
/// `COMMIT`/`ROLLBACK`.
pub struct TransactionContext {
    write_guard: Option<OwnedRwLockWriteGuard<()>>,
    shared_tx: Option<Arc<StdMutex<Box<dyn StoreTx>>>>,
    tx_db: Option<Arc<LogicalDb>>,
    pub actions: Vec<Action>,
}

impl TransactionContext {
    /// `begin` on a non-transactional DB (spec.md §4.4 steps 1-4).
    pub async fn begin(db: &Arc<LogicalDb>) -> Result<Self, TxError> {
        if db.is_tx {
            return Err(TxError::NestTx);
        }

        let write_guard = Arc::clone(&db.write_lock()).write_owned().await;
        let store_tx = db.source_begin()?;
        let shared_tx = Arc::new(StdMutex::new(store_tx));

        let shell = LogicalDb::new_tx_shell(db.index, Arc::clone(&db.keyspace), Arc::clone(&shared_tx));

        Ok(Self {
            write_guard: Some(write_guard),
            shared_tx: Some(shared_tx),
            tx_db: Some(Arc::new(shell)),
            actions: Vec::new(),
        })
    }

    /// The transactional DB shell commands run against while this context
    /// is live.
    pub fn db(&self) -> &Arc<LogicalDb> {
        self.tx_db.as_ref().expect("transaction already finished")
    }

    pub fn record(&mut self, command: &str, args: &[Vec<u8>]) {
        self.actions.push(Action {
            command: command.to_string(),
            args: args.to_vec(),
        });
    }

    /// Commit the store transaction. Returns the recorded actions so the
    /// caller can emit them to the AOF. The DB's exclusive write-lock is
    /// deliberately *not* released here — it stays held in `self` until the
    /// caller drops this context, so the caller can append the commit's
    /// actions to the AOF before any other writer on this DB can run (and
    /// possibly beat it into the AOF), keeping AOF record order aligned
    /// with commit order the same way [`crate::dispatch::WriteExecutor`]
    /// does for ordinary writes.
    pub fn commit(&mut self) -> Result<Vec<Action>, TxError> {
        let shared = self.shared_tx.take().ok_or(TxError::TxDone)?;
        // Drop the shell DB first: its five batches each hold a clone of
        // `shared`, so this is what brings the Arc's strong count down to
        // the one held locally, letting us reclaim the boxed transaction.
        self.tx_db.take();
        let tx = reclaim(shared)?;
        tx.commit()?;
        Ok(std::mem::take(&mut self.actions))
    }

    pub fn rollback(mut self) -> Result<(), TxError> {
        let shared = self.shared_tx.take().ok_or(TxError::TxDone)?;
        self.tx_db.take();
        let tx = reclaim(shared)?;
        tx.rollback()?;
        self.write_guard.take();
        Ok(())
    }
}

fn reclaim(shared: Arc<StdMutex<Box<dyn StoreTx>>>) -> Result<Box<dyn StoreTx>, TxError> {
    Arc::try_unwrap(shared)
        .map_err(|_| TxError::Store(anyhow::anyhow!("transaction handle still referenced elsewhere")))
        .map(|m| m.into_inner().unwrap())
}

/// Drop without an explicit commit/rollback (connection loss mid-transaction)
/// rolls back the store transaction, matching spec.md §3: "reset... on
/// commit, rollback, or connection drop."
impl Drop for TransactionContext {
    fn drop(&mut self) {
        self.tx_db.take();
        if let Some(shared) = self.shared_tx.take() {
            if let Ok(tx) = reclaim(shared) {
                let _ = tx.rollback();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbBank;
    use crate::store::mem::MemStore;

    #[tokio::test]
    async fn test_begin_commit_writes_through() {
        let bank = DbBank::new(1, Arc::new(MemStore::new()));
        let db = bank.get(0);

        let mut ctx = TransactionContext::begin(&db).await.unwrap();
        {
            let mut h = ctx.db().kv_batch.acquire().await;
            h.put(b"k".to_vec(), b"v".to_vec());
            h.commit().unwrap();
        }
        ctx.record("set", &[b"k".to_vec(), b"v".to_vec()]);
        let actions = ctx.commit().unwrap();
        assert_eq!(actions.len(), 1);
        assert_eq!(db.get(b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let bank = DbBank::new(1, Arc::new(MemStore::new()));
        let db = bank.get(0);

        let ctx = TransactionContext::begin(&db).await.unwrap();
        {
            let mut h = ctx.db().kv_batch.acquire().await;
            h.put(b"k".to_vec(), b"v".to_vec());
            h.commit().unwrap();
        }
        ctx.rollback().unwrap();
        assert_eq!(db.get(b"k").unwrap(), None);
    }

    #[tokio::test]
    async fn test_nested_begin_rejected() {
        let bank = DbBank::new(1, Arc::new(MemStore::new()));
        let db = bank.get(0);
        let ctx = TransactionContext::begin(&db).await.unwrap();
        assert!(matches!(TransactionContext::begin(ctx.db()).await, Err(TxError::NestTx)));
    }

    #[tokio::test]
    async fn test_drop_without_commit_rolls_back() {
        let bank = DbBank::new(1, Arc::new(MemStore::new()));
        let db = bank.get(0);
        {
            let ctx = TransactionContext::begin(&db).await.unwrap();
            let mut h = ctx.db().kv_batch.acquire().await;
            h.put(b"k".to_vec(), b"v".to_vec());
            h.commit().unwrap();
            // ctx drops here without commit/rollback
        }
        assert_eq!(db.get(b"k").unwrap(), None);
    }

    #[test]
    fn test_deny_list_is_case_insensitive() {
        assert!(is_denied("SELECT"));
        assert!(is_denied("Ping"));
        assert!(!is_denied("get"));
    }
}
