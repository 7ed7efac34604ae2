use sqlx::pool::PoolConnection;
use sqlx::{Any, AnyConnection, AnyPool, Transaction};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMappedMutexGuard, OwnedMutexGuard};
use tokio::time::Instant;

use super::transactor::HookRegistrar;
use crate::errors::AppError;

// ============================================================================
// Database Context
// ============================================================================
//
// Explicit handle passed by reference through handlers and repositories.
// Outside a unit of work it resolves to a pooled connection; inside one it
// resolves to the transaction owned by the innermost active scope.
//
// A `Conn` guard must be dropped before starting a nested unit of work.
//
// ============================================================================

pub(crate) type SharedTransaction = Arc<Mutex<Option<Transaction<'static, Any>>>>;

/// State of one active unit of work (outermost or nested)
pub(crate) struct TxScope {
    pub(crate) conn: SharedTransaction,
    pub(crate) depth: u32,
    pub(crate) hooks: HookRegistrar,
    rollback_only: Arc<AtomicBool>,
}

impl TxScope {
    pub(crate) fn outermost(tx: Transaction<'static, Any>) -> Self {
        Self {
            conn: Arc::new(Mutex::new(Some(tx))),
            depth: 0,
            hooks: HookRegistrar::default(),
            rollback_only: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Child scope sharing this scope's transaction with its own hook list
    pub(crate) fn nested(&self) -> Self {
        Self {
            conn: self.conn.clone(),
            depth: self.depth + 1,
            hooks: HookRegistrar::default(),
            rollback_only: self.rollback_only.clone(),
        }
    }

    pub(crate) fn mark_rollback_only(&self) {
        self.rollback_only.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_rollback_only(&self) -> bool {
        self.rollback_only.load(Ordering::SeqCst)
    }

    /// Remove the transaction from the shared slot
    pub(crate) async fn take(&self) -> Option<Transaction<'static, Any>> {
        self.conn.lock().await.take()
    }
}

#[derive(Clone)]
pub struct DbContext {
    pool: AnyPool,
    scope: Option<Arc<TxScope>>,
    deadline: Option<Instant>,
}

impl DbContext {
    /// Context with no transaction and no deadline
    pub fn root(pool: AnyPool) -> Self {
        Self {
            pool,
            scope: None,
            deadline: None,
        }
    }

    /// Fresh context on the same pool, without transaction or deadline
    ///
    /// Handed to post-commit hooks and event deliveries, which outlive the
    /// request that triggered them.
    pub fn detached(&self) -> Self {
        Self::root(self.pool.clone())
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        };
        Self {
            deadline: Some(deadline),
            ..self.clone()
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn in_transaction(&self) -> bool {
        self.scope.is_some()
    }

    /// Nesting depth of the active unit of work (0 = outermost)
    pub fn transaction_depth(&self) -> Option<u32> {
        self.scope.as_ref().map(|scope| scope.depth)
    }

    pub(crate) fn scope(&self) -> Option<&Arc<TxScope>> {
        self.scope.as_ref()
    }

    pub(crate) fn with_scope(&self, scope: Arc<TxScope>) -> Self {
        Self {
            scope: Some(scope),
            ..self.clone()
        }
    }

    /// Resolve the current database handle
    pub async fn conn(&self) -> Result<Conn, AppError> {
        match &self.scope {
            Some(scope) => {
                let guard = scope.conn.clone().lock_owned().await;
                OwnedMutexGuard::try_map(guard, |slot| slot.as_mut())
                    .map(Conn::Tx)
                    .map_err(|_| AppError::operation_failed("transaction has already completed"))
            }
            None => Ok(Conn::Pooled(self.pool.acquire().await?)),
        }
    }
}

/// Database handle resolved from a `DbContext`
pub enum Conn {
    Pooled(PoolConnection<Any>),
    Tx(OwnedMappedMutexGuard<Option<Transaction<'static, Any>>, Transaction<'static, Any>>),
}

impl Deref for Conn {
    type Target = AnyConnection;

    fn deref(&self) -> &AnyConnection {
        match self {
            Conn::Pooled(conn) => &**conn,
            Conn::Tx(tx) => &***tx,
        }
    }
}

impl DerefMut for Conn {
    fn deref_mut(&mut self) -> &mut AnyConnection {
        match self {
            Conn::Pooled(conn) => &mut **conn,
            Conn::Tx(tx) => &mut ***tx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backbone::store::testing::lazy_pool;

    #[tokio::test]
    async fn test_root_context_has_no_transaction() {
        let ctx = DbContext::root(lazy_pool());
        assert!(!ctx.in_transaction());
        assert_eq!(ctx.transaction_depth(), None);
        assert!(ctx.deadline().is_none());
    }

    #[tokio::test]
    async fn test_deadline_only_tightens() {
        let ctx = DbContext::root(lazy_pool()).with_timeout(Duration::from_secs(1));
        let first = ctx.deadline().unwrap();

        let looser = ctx.with_timeout(Duration::from_secs(60));
        assert_eq!(looser.deadline(), Some(first));

        let tighter = ctx.with_deadline(first - Duration::from_millis(500));
        assert!(tighter.deadline().unwrap() < first);
    }

    #[tokio::test]
    async fn test_detached_drops_deadline() {
        let ctx = DbContext::root(lazy_pool()).with_timeout(Duration::from_secs(1));
        assert!(ctx.detached().deadline().is_none());
    }
}
