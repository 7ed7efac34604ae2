use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use super::aggregate::Order;
use super::errors::OrderError;
use super::repository::OrderRepository;
use crate::backbone::messaging::{Mediator, RequestHandler};
use crate::backbone::store::{DbContext, Transactor};
use crate::contracts::customer::{GetCustomerByIdQuery, ReleaseCreditCommand, ReserveCreditCommand};
use crate::contracts::notification::NotificationService;
use crate::contracts::order::{CancelOrderCommand, CreateOrderCommand};
use crate::errors::AppError;

// ============================================================================
// Order Command Handlers
// ============================================================================
//
// Credit lives in the customer module; orders reach it only through the
// mediator, inside the same unit of work as the order write.
//
// ============================================================================

const ORDER_CREATED_SUBJECT: &str = "Order Created";

pub struct CreateOrderHandler {
    transactor: Transactor,
    mediator: Mediator,
    repository: Arc<OrderRepository>,
    notifications: Arc<dyn NotificationService>,
}

impl CreateOrderHandler {
    pub fn new(
        transactor: Transactor,
        mediator: Mediator,
        repository: Arc<OrderRepository>,
        notifications: Arc<dyn NotificationService>,
    ) -> Self {
        Self {
            transactor,
            mediator,
            repository,
            notifications,
        }
    }
}

#[async_trait]
impl RequestHandler for CreateOrderHandler {
    type Request = CreateOrderCommand;

    async fn handle(&self, ctx: &DbContext, command: CreateOrderCommand) -> Result<Uuid, AppError> {
        if command.order_total <= 0 {
            return Err(OrderError::TotalMustBePositive.into());
        }

        let customer = self
            .mediator
            .send(
                ctx,
                GetCustomerByIdQuery {
                    customer_id: command.customer_id,
                },
            )
            .await?;

        let order = Order::new(customer.id, command.order_total)?;
        let mediator = &self.mediator;
        let repository = &self.repository;
        let notifications = self.notifications.clone();

        let order_id = self
            .transactor
            .run_in_transaction(ctx, move |ctx, hooks| async move {
                mediator
                    .send(
                        &ctx,
                        ReserveCreditCommand {
                            customer_id: order.customer_id,
                            amount: order.order_total,
                        },
                    )
                    .await?;

                repository.create(&ctx, &order).await?;

                let (order_id, total) = (order.id, order.order_total);
                hooks.register(move |_| async move {
                    notifications
                        .send_email(
                            &customer.email,
                            ORDER_CREATED_SUBJECT,
                            serde_json::json!({ "order_id": order_id, "total": total }),
                        )
                        .await
                });

                Ok::<_, AppError>(order.id)
            })
            .await?;

        tracing::info!(%order_id, customer_id = %command.customer_id, total = command.order_total, "✅ Order created");
        Ok(order_id)
    }
}

pub struct CancelOrderHandler {
    transactor: Transactor,
    mediator: Mediator,
    repository: Arc<OrderRepository>,
}

impl CancelOrderHandler {
    pub fn new(transactor: Transactor, mediator: Mediator, repository: Arc<OrderRepository>) -> Self {
        Self {
            transactor,
            mediator,
            repository,
        }
    }
}

#[async_trait]
impl RequestHandler for CancelOrderHandler {
    type Request = CancelOrderCommand;

    async fn handle(&self, ctx: &DbContext, command: CancelOrderCommand) -> Result<(), AppError> {
        let order = self
            .repository
            .find_active_by_id(ctx, command.order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        let mediator = &self.mediator;
        let repository = &self.repository;

        self.transactor
            .run_in_transaction(ctx, move |ctx, _hooks| async move {
                let mut order = order;
                order.cancel()?;
                repository.cancel(&ctx, &order).await?;

                mediator
                    .send(
                        &ctx,
                        ReleaseCreditCommand {
                            customer_id: order.customer_id,
                            amount: order.order_total,
                        },
                    )
                    .await?;

                Ok::<_, AppError>(())
            })
            .await?;

        tracing::info!(order_id = %command.order_id, "🚫 Order canceled");
        Ok(())
    }
}
