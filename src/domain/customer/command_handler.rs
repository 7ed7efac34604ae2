use async_trait::async_trait;
use std::sync::Arc;

use super::aggregate::Customer;
use super::errors::CustomerError;
use super::events::CustomerDomainEvent;
use super::repository::CustomerRepository;
use super::value_objects::Email;
use crate::backbone::core::{Aggregate, DomainEvent};
use crate::backbone::messaging::{DomainEventDispatcher, DomainEventHandler, RequestHandler};
use crate::backbone::store::{DbContext, Transactor};
use crate::contracts::customer::{
    CreateCustomerCommand, CustomerInfo, GetCustomerByIdQuery, ReleaseCreditCommand,
    ReserveCreditCommand,
};
use crate::contracts::messaging::{customer_created, AppEventBus};
use crate::errors::AppError;

// ============================================================================
// Customer Command Handlers
// ============================================================================
//
// Orchestrates: Command → Aggregate → Repository (inside a unit of work)
//               → post-commit hook → domain events → integration events
//
// ============================================================================

pub struct CreateCustomerHandler {
    transactor: Transactor,
    repository: Arc<CustomerRepository>,
    dispatcher: DomainEventDispatcher<CustomerDomainEvent>,
}

impl CreateCustomerHandler {
    pub fn new(
        transactor: Transactor,
        repository: Arc<CustomerRepository>,
        dispatcher: DomainEventDispatcher<CustomerDomainEvent>,
    ) -> Self {
        Self {
            transactor,
            repository,
            dispatcher,
        }
    }
}

#[async_trait]
impl RequestHandler for CreateCustomerHandler {
    type Request = CreateCustomerCommand;

    async fn handle(&self, ctx: &DbContext, command: CreateCustomerCommand) -> Result<uuid::Uuid, AppError> {
        if command.credit <= 0 {
            return Err(CustomerError::CreditMustBePositive.into());
        }
        let email = Email::parse(command.email)?;

        if self.repository.exists_by_email(ctx, &email).await? {
            return Err(CustomerError::EmailExists.into());
        }

        let customer = Customer::new(email, command.credit)?;
        let repository = &self.repository;
        let dispatcher = self.dispatcher.clone();

        let customer_id = self
            .transactor
            .run_in_transaction(ctx, move |ctx, hooks| async move {
                let mut customer = customer;
                repository.create(&ctx, &customer).await?;

                let events = customer.pull_domain_events();
                hooks.register(move |hook_ctx| async move { dispatcher.dispatch(&hook_ctx, &events).await });

                Ok::<_, AppError>(customer.id)
            })
            .await?;

        tracing::info!(%customer_id, "✅ Customer created");
        Ok(customer_id)
    }
}

pub struct GetCustomerByIdHandler {
    repository: Arc<CustomerRepository>,
}

impl GetCustomerByIdHandler {
    pub fn new(repository: Arc<CustomerRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl RequestHandler for GetCustomerByIdHandler {
    type Request = GetCustomerByIdQuery;

    async fn handle(&self, ctx: &DbContext, query: GetCustomerByIdQuery) -> Result<CustomerInfo, AppError> {
        let customer = self
            .repository
            .find_by_id(ctx, query.customer_id)
            .await?
            .ok_or(CustomerError::NotFound)?;
        Ok(customer.info())
    }
}

pub struct ReserveCreditHandler {
    transactor: Transactor,
    repository: Arc<CustomerRepository>,
}

impl ReserveCreditHandler {
    pub fn new(transactor: Transactor, repository: Arc<CustomerRepository>) -> Self {
        Self {
            transactor,
            repository,
        }
    }
}

#[async_trait]
impl RequestHandler for ReserveCreditHandler {
    type Request = ReserveCreditCommand;

    async fn handle(&self, ctx: &DbContext, command: ReserveCreditCommand) -> Result<(), AppError> {
        let repository = &self.repository;
        self.transactor
            .run_in_transaction(ctx, move |ctx, _hooks| async move {
                let mut customer = repository
                    .find_by_id(&ctx, command.customer_id)
                    .await?
                    .ok_or(CustomerError::NotFound)?;
                customer.reserve_credit(command.amount)?;

                // the snapshot may be stale; the conditional update is the real check
                if !repository
                    .reserve_credit(&ctx, customer.id, command.amount, customer.updated_at)
                    .await?
                {
                    return Err(CustomerError::InsufficientCredit.into());
                }

                tracing::debug!(customer_id = %customer.id, amount = command.amount, "Credit reserved");
                Ok::<_, AppError>(())
            })
            .await
    }
}

pub struct ReleaseCreditHandler {
    transactor: Transactor,
    repository: Arc<CustomerRepository>,
}

impl ReleaseCreditHandler {
    pub fn new(transactor: Transactor, repository: Arc<CustomerRepository>) -> Self {
        Self {
            transactor,
            repository,
        }
    }
}

#[async_trait]
impl RequestHandler for ReleaseCreditHandler {
    type Request = ReleaseCreditCommand;

    async fn handle(&self, ctx: &DbContext, command: ReleaseCreditCommand) -> Result<(), AppError> {
        let repository = &self.repository;
        self.transactor
            .run_in_transaction(ctx, move |ctx, _hooks| async move {
                let mut customer = repository
                    .find_by_id(&ctx, command.customer_id)
                    .await?
                    .ok_or(CustomerError::NotFound)?;
                customer.release_credit(command.amount)?;
                repository
                    .release_credit(&ctx, customer.id, command.amount, customer.updated_at)
                    .await?;

                tracing::debug!(customer_id = %customer.id, amount = command.amount, "Credit released");
                Ok::<_, AppError>(())
            })
            .await
    }
}

// ============================================================================
// Domain Event Handlers
// ============================================================================

/// Projects `CustomerCreated` onto the shared event bus
pub struct CustomerCreatedHandler {
    event_bus: AppEventBus,
}

impl CustomerCreatedHandler {
    pub fn new(event_bus: AppEventBus) -> Self {
        Self { event_bus }
    }
}

#[async_trait]
impl DomainEventHandler<CustomerDomainEvent> for CustomerCreatedHandler {
    async fn handle(&self, ctx: &DbContext, event: &DomainEvent<CustomerDomainEvent>) -> Result<(), AppError> {
        match &event.payload {
            CustomerDomainEvent::Created { customer_id, email } => {
                self.event_bus.publish(ctx, customer_created(*customer_id, email.clone()))
            }
        }
    }
}
