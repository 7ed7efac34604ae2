use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::aggregate::Customer;
use super::value_objects::Email;
use crate::backbone::store::{from_millis, DbContext};
use crate::errors::AppError;

// ============================================================================
// Customer Repository
// ============================================================================
//
// Every call resolves its handle from the context, so the same repository
// works inside and outside a unit of work.
//
// ============================================================================

type CustomerRow = (String, String, i64, i64, i64);

#[derive(Debug, Default, Clone)]
pub struct CustomerRepository;

impl CustomerRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn create(&self, ctx: &DbContext, customer: &Customer) -> Result<(), AppError> {
        let mut conn = ctx.conn().await?;
        sqlx::query(
            "INSERT INTO customers (id, email, credit, created_at, updated_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(customer.id.to_string())
        .bind(customer.email.to_string())
        .bind(customer.credit)
        .bind(customer.created_at.timestamp_millis())
        .bind(customer.updated_at.timestamp_millis())
        .execute(&mut *conn)
        .await?;

        tracing::debug!(customer_id = %customer.id, "Customer inserted");
        Ok(())
    }

    pub async fn find_by_id(&self, ctx: &DbContext, id: Uuid) -> Result<Option<Customer>, AppError> {
        let mut conn = ctx.conn().await?;
        let row: Option<CustomerRow> = sqlx::query_as(
            "SELECT id, email, credit, created_at, updated_at FROM customers WHERE id = $1",
        )
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

        row.map(into_customer).transpose()
    }

    pub async fn exists_by_email(&self, ctx: &DbContext, email: &Email) -> Result<bool, AppError> {
        let mut conn = ctx.conn().await?;
        let row: Option<(String,)> = sqlx::query_as("SELECT id FROM customers WHERE email = $1")
            .bind(email.to_string())
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.is_some())
    }

    /// Take `amount` off the stored balance only when it covers it.
    /// Returns false when the customer is missing or the balance is short.
    pub async fn reserve_credit(
        &self,
        ctx: &DbContext,
        id: Uuid,
        amount: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut conn = ctx.conn().await?;
        let result = sqlx::query(
            "UPDATE customers SET credit = credit - $1, updated_at = $2 WHERE id = $3 AND credit >= $4",
        )
        .bind(amount)
        .bind(updated_at.timestamp_millis())
        .bind(id.to_string())
        .bind(amount)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Add `amount` to the stored balance, clamping a negative balance to zero first
    pub async fn release_credit(
        &self,
        ctx: &DbContext,
        id: Uuid,
        amount: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut conn = ctx.conn().await?;
        let result = sqlx::query(
            "UPDATE customers SET credit = (CASE WHEN credit < 0 THEN 0 ELSE credit END) + $1, updated_at = $2 WHERE id = $3",
        )
        .bind(amount)
        .bind(updated_at.timestamp_millis())
        .bind(id.to_string())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("customer {id} was not found")));
        }
        Ok(())
    }
}

fn into_customer((id, email, credit, created_at, updated_at): CustomerRow) -> Result<Customer, AppError> {
    let id = Uuid::parse_str(&id)
        .map_err(|e| AppError::data_integrity(format!("invalid customer id {id}")).with_source(e))?;
    let email = Email::parse(email)
        .map_err(|e| AppError::data_integrity(format!("invalid stored email for customer {id}")).with_source(e))?;

    Ok(Customer::restore(
        id,
        email,
        credit,
        from_millis(created_at)?,
        from_millis(updated_at)?,
    ))
}
