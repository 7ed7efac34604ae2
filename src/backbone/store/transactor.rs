use futures_util::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;

use super::context::{DbContext, SharedTransaction, TxScope};
use crate::backbone::panic_message;
use crate::errors::{AppError, ErrorKind};
use crate::metrics::Metrics;

// ============================================================================
// Unit of Work / Transactor
// ============================================================================
//
// Flow of an outermost unit of work:
//   begin → bind handle into a derived context → run body
//     → error:   rollback, drop hooks, propagate
//     → success: commit, then run hooks in registration order on a detached task
//
// Nested units of work reuse the outer transaction according to the
// configured `NestingStrategy`. Their hooks are handed to the enclosing unit
// on success and dropped on failure, so hooks only ever run after the
// outermost commit.
//
// Hook failures are logged and never retried.
//
// ============================================================================

pub type PostCommitHook =
    Box<dyn FnOnce(DbContext) -> BoxFuture<'static, Result<(), AppError>> + Send>;

/// Collects post-commit hooks for one unit of work
#[derive(Clone, Default)]
pub struct HookRegistrar {
    hooks: Arc<Mutex<Vec<PostCommitHook>>>,
}

impl HookRegistrar {
    pub fn register<F, Fut>(&self, hook: F)
    where
        F: FnOnce(DbContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), AppError>> + Send + 'static,
    {
        self.lock().push(Box::new(move |ctx| hook(ctx).boxed()));
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take(&self) -> Vec<PostCommitHook> {
        std::mem::take(&mut *self.lock())
    }

    fn append(&self, hooks: Vec<PostCommitHook>) {
        self.lock().extend(hooks);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PostCommitHook>> {
        self.hooks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// How a unit of work started inside another one behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NestingStrategy {
    /// Reuse the outer transaction; a nested failure dooms the outer commit
    Flatten,
    /// Open `SAVEPOINT sp_<depth>`; a nested failure rolls back only to it
    #[default]
    Savepoints,
}

impl FromStr for NestingStrategy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "flatten" => Ok(NestingStrategy::Flatten),
            "savepoints" | "savepoint" => Ok(NestingStrategy::Savepoints),
            other => Err(format!("unknown nesting strategy: {other}")),
        }
    }
}

#[derive(Clone)]
pub struct Transactor {
    strategy: NestingStrategy,
    metrics: Arc<Metrics>,
}

impl Transactor {
    pub fn new(strategy: NestingStrategy, metrics: Arc<Metrics>) -> Self {
        Self { strategy, metrics }
    }

    pub fn strategy(&self) -> NestingStrategy {
        self.strategy
    }

    /// Run `body` inside a unit of work bound to `ctx`
    ///
    /// `body` receives the transaction-scoped context and the registrar for
    /// hooks that must only run once the outermost transaction has committed.
    pub async fn run_in_transaction<T, F, Fut>(&self, ctx: &DbContext, body: F) -> Result<T, AppError>
    where
        F: FnOnce(DbContext, HookRegistrar) -> Fut + Send,
        Fut: Future<Output = Result<T, AppError>> + Send,
        T: Send,
    {
        match ctx.scope().cloned() {
            None => self.run_outermost(ctx, body).await,
            Some(parent) => match self.strategy {
                NestingStrategy::Savepoints => self.run_in_savepoint(ctx, parent, body).await,
                NestingStrategy::Flatten => self.run_flattened(ctx, parent, body).await,
            },
        }
    }

    async fn run_outermost<T, F, Fut>(&self, ctx: &DbContext, body: F) -> Result<T, AppError>
    where
        F: FnOnce(DbContext, HookRegistrar) -> Fut + Send,
        Fut: Future<Output = Result<T, AppError>> + Send,
        T: Send,
    {
        let tx = match ctx.pool().begin().await {
            Ok(tx) => tx,
            Err(e) => {
                self.metrics.record_transaction("begin_failed");
                tracing::error!(error = %e, "Failed to begin transaction");
                return Err(AppError::new(ErrorKind::TransactionBegin, "failed to begin transaction")
                    .with_source(e));
            }
        };

        let scope = Arc::new(TxScope::outermost(tx));
        let _guard = RollbackGuard(scope.conn.clone());

        let outcome = with_deadline(
            ctx.deadline(),
            body(ctx.with_scope(scope.clone()), scope.hooks.clone()),
        )
        .await;

        let value = match outcome {
            Ok(value) => value,
            Err(err) => {
                self.rollback(&scope).await;
                return Err(err);
            }
        };

        if scope.is_rollback_only() {
            self.rollback(&scope).await;
            return Err(AppError::new(
                ErrorKind::TransactionCommit,
                "transaction is rollback-only after a failed nested unit of work",
            ));
        }

        let Some(tx) = scope.take().await else {
            self.metrics.record_transaction("commit_failed");
            return Err(AppError::new(
                ErrorKind::TransactionCommit,
                "transaction was released before commit",
            ));
        };

        if let Err(e) = tx.commit().await {
            self.metrics.record_transaction("commit_failed");
            tracing::error!(error = %e, "Failed to commit transaction");
            return Err(AppError::new(ErrorKind::TransactionCommit, "failed to commit transaction")
                .with_source(e));
        }

        self.metrics.record_transaction("committed");
        self.spawn_hooks(scope.hooks.take(), ctx.detached());

        Ok(value)
    }

    async fn run_in_savepoint<T, F, Fut>(
        &self,
        ctx: &DbContext,
        parent: Arc<TxScope>,
        body: F,
    ) -> Result<T, AppError>
    where
        F: FnOnce(DbContext, HookRegistrar) -> Fut + Send,
        Fut: Future<Output = Result<T, AppError>> + Send,
        T: Send,
    {
        let scope = Arc::new(parent.nested());
        let savepoint = format!("sp_{}", scope.depth);

        execute(&scope.conn, &format!("SAVEPOINT {savepoint}"))
            .await
            .map_err(|e| {
                AppError::new(
                    ErrorKind::TransactionBegin,
                    format!("failed to create savepoint {savepoint}"),
                )
                .with_source(e)
            })?;

        match body(ctx.with_scope(scope.clone()), scope.hooks.clone()).await {
            Ok(value) => {
                execute(&scope.conn, &format!("RELEASE SAVEPOINT {savepoint}"))
                    .await
                    .map_err(|e| {
                        AppError::new(
                            ErrorKind::TransactionCommit,
                            format!("failed to release savepoint {savepoint}"),
                        )
                        .with_source(e)
                    })?;
                parent.hooks.append(scope.hooks.take());
                Ok(value)
            }
            Err(err) => {
                if let Err(e) = execute(&scope.conn, &format!("ROLLBACK TO SAVEPOINT {savepoint}")).await {
                    tracing::warn!(savepoint = %savepoint, error = %e, "Failed to roll back to savepoint");
                    scope.mark_rollback_only();
                }
                tracing::debug!(savepoint = %savepoint, error = %err, "Nested unit of work rolled back");
                Err(err)
            }
        }
    }

    async fn run_flattened<T, F, Fut>(
        &self,
        ctx: &DbContext,
        parent: Arc<TxScope>,
        body: F,
    ) -> Result<T, AppError>
    where
        F: FnOnce(DbContext, HookRegistrar) -> Fut + Send,
        Fut: Future<Output = Result<T, AppError>> + Send,
        T: Send,
    {
        let scope = Arc::new(parent.nested());

        match body(ctx.with_scope(scope.clone()), scope.hooks.clone()).await {
            Ok(value) => {
                parent.hooks.append(scope.hooks.take());
                Ok(value)
            }
            Err(err) => {
                scope.mark_rollback_only();
                tracing::debug!(depth = scope.depth, error = %err, "Nested unit of work failed, outer transaction doomed");
                Err(err)
            }
        }
    }

    async fn rollback(&self, scope: &TxScope) {
        self.metrics.record_transaction("rolled_back");
        if let Some(tx) = scope.take().await {
            if let Err(e) = tx.rollback().await {
                tracing::warn!(error = %e, "Failed to roll back transaction");
            }
        }
    }

    fn spawn_hooks(&self, hooks: Vec<PostCommitHook>, ctx: DbContext) {
        if hooks.is_empty() {
            return;
        }

        let metrics = self.metrics.clone();
        tokio::spawn(async move {
            let total = hooks.len();
            for (index, hook) in hooks.into_iter().enumerate() {
                let hook_ctx = ctx.clone();
                let outcome = AssertUnwindSafe(async move { hook(hook_ctx).await })
                    .catch_unwind()
                    .await;

                match outcome {
                    Ok(Ok(())) => metrics.record_hook("ok"),
                    Ok(Err(e)) => {
                        metrics.record_hook("error");
                        tracing::error!(hook = index + 1, total, error = %e, "Post-commit hook failed");
                    }
                    Err(payload) => {
                        metrics.record_hook("panic");
                        tracing::error!(
                            hook = index + 1,
                            total,
                            panic = %panic_message(payload.as_ref()),
                            "💥 Post-commit hook panicked"
                        );
                    }
                }
            }
        });
    }
}

/// Drops an unfinished transaction if the unit of work is abandoned
///
/// sqlx rolls back a transaction that is dropped without commit.
struct RollbackGuard(SharedTransaction);

impl Drop for RollbackGuard {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.0.try_lock() {
            slot.take();
        }
    }
}

async fn with_deadline<T>(
    deadline: Option<Instant>,
    body: impl Future<Output = Result<T, AppError>>,
) -> Result<T, AppError> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, body)
            .await
            .unwrap_or_else(|_| Err(AppError::operation_failed("transaction deadline exceeded"))),
        None => body.await,
    }
}

async fn execute(conn: &SharedTransaction, sql: &str) -> Result<(), AppError> {
    let mut slot = conn.lock().await;
    let tx = slot
        .as_mut()
        .ok_or_else(|| AppError::operation_failed("transaction has already completed"))?;
    sqlx::query(sql).execute(&mut **tx).await?;
    Ok(())
}
