use uuid::Uuid;

use super::aggregate::Order;
use crate::backbone::store::{from_millis, DbContext};
use crate::errors::AppError;

// ============================================================================
// Order Repository
// ============================================================================

type OrderRow = (String, String, i64, i64, Option<i64>);

#[derive(Debug, Default, Clone)]
pub struct OrderRepository;

impl OrderRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn create(&self, ctx: &DbContext, order: &Order) -> Result<(), AppError> {
        let mut conn = ctx.conn().await?;
        sqlx::query(
            "INSERT INTO orders (id, customer_id, order_total, created_at, canceled_at) VALUES ($1, $2, $3, $4, NULL)",
        )
        .bind(order.id.to_string())
        .bind(order.customer_id.to_string())
        .bind(order.order_total)
        .bind(order.created_at.timestamp_millis())
        .execute(&mut *conn)
        .await?;

        tracing::debug!(order_id = %order.id, customer_id = %order.customer_id, "Order inserted");
        Ok(())
    }

    /// Find an order that has not been canceled
    pub async fn find_active_by_id(&self, ctx: &DbContext, id: Uuid) -> Result<Option<Order>, AppError> {
        let mut conn = ctx.conn().await?;
        let row: Option<OrderRow> = sqlx::query_as(
            "SELECT id, customer_id, order_total, created_at, canceled_at FROM orders WHERE id = $1 AND canceled_at IS NULL",
        )
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

        row.map(into_order).transpose()
    }

    /// Persist the cancellation; fails if the order was canceled concurrently
    pub async fn cancel(&self, ctx: &DbContext, order: &Order) -> Result<(), AppError> {
        let canceled_at = order
            .canceled_at
            .ok_or_else(|| AppError::operation_failed(format!("order {} is not canceled", order.id)))?;

        let mut conn = ctx.conn().await?;
        let result = sqlx::query("UPDATE orders SET canceled_at = $1 WHERE id = $2 AND canceled_at IS NULL")
            .bind(canceled_at.timestamp_millis())
            .bind(order.id.to_string())
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("the order with given id was not found"));
        }
        Ok(())
    }
}

fn into_order((id, customer_id, order_total, created_at, canceled_at): OrderRow) -> Result<Order, AppError> {
    let parse = |raw: &str| {
        Uuid::parse_str(raw).map_err(|e| AppError::data_integrity(format!("invalid uuid {raw}")).with_source(e))
    };

    Ok(Order {
        id: parse(&id)?,
        customer_id: parse(&customer_id)?,
        order_total,
        created_at: from_millis(created_at)?,
        canceled_at: canceled_at.map(from_millis).transpose()?,
    })
}
