use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::CustomerError;
use super::events::CustomerDomainEvent;
use super::value_objects::Email;
use crate::backbone::core::{Aggregate, PendingEvents};
use crate::contracts::customer::CustomerInfo;

// ============================================================================
// Customer Aggregate - Domain Logic
// ============================================================================
//
// Invariants:
// - credit never drops below zero
// - a new customer starts with strictly positive credit
//
// ============================================================================

#[derive(Debug, Clone)]
pub struct Customer {
    pub id: Uuid,
    pub email: Email,
    pub credit: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    events: PendingEvents<CustomerDomainEvent>,
}

impl Customer {
    /// Register a new customer and record `CustomerCreated`
    pub fn new(email: Email, credit: i64) -> Result<Self, CustomerError> {
        if credit <= 0 {
            return Err(CustomerError::CreditMustBePositive);
        }

        let now = Utc::now();
        let mut customer = Self {
            id: Uuid::now_v7(),
            email,
            credit,
            created_at: now,
            updated_at: now,
            events: PendingEvents::default(),
        };
        customer.events.record(CustomerDomainEvent::Created {
            customer_id: customer.id,
            email: customer.email.to_string(),
        });
        Ok(customer)
    }

    /// Rebuild a customer loaded from storage; records no events
    pub fn restore(
        id: Uuid,
        email: Email,
        credit: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            email,
            credit,
            created_at,
            updated_at,
            events: PendingEvents::default(),
        }
    }

    pub fn reserve_credit(&mut self, amount: i64) -> Result<(), CustomerError> {
        if amount <= 0 {
            return Err(CustomerError::AmountMustBePositive);
        }
        self.credit = self
            .credit
            .checked_sub(amount)
            .filter(|remaining| *remaining >= 0)
            .ok_or(CustomerError::InsufficientCredit)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Return credit; a non-positive balance is reset to zero first
    pub fn release_credit(&mut self, amount: i64) -> Result<(), CustomerError> {
        if amount <= 0 {
            return Err(CustomerError::AmountMustBePositive);
        }
        self.credit = self
            .credit
            .max(0)
            .checked_add(amount)
            .ok_or(CustomerError::CreditOverflow)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn info(&self) -> CustomerInfo {
        CustomerInfo {
            id: self.id,
            email: self.email.to_string(),
            credit: self.credit,
        }
    }
}

impl Aggregate for Customer {
    type Event = CustomerDomainEvent;

    fn pending_events(&mut self) -> &mut PendingEvents<CustomerDomainEvent> {
        &mut self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> Email {
        Email::parse("ada@example.com").unwrap()
    }

    #[test]
    fn test_new_customer_records_created_event() {
        let mut customer = Customer::new(email(), 100).unwrap();

        let events = customer.pull_domain_events();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].payload,
            CustomerDomainEvent::Created {
                customer_id: customer.id,
                email: "ada@example.com".to_string(),
            }
        );
        assert!(customer.pull_domain_events().is_empty());
    }

    #[test]
    fn test_new_customer_requires_positive_credit() {
        assert_eq!(Customer::new(email(), 0).unwrap_err(), CustomerError::CreditMustBePositive);
        assert_eq!(Customer::new(email(), -5).unwrap_err(), CustomerError::CreditMustBePositive);
    }

    #[test]
    fn test_reserve_credit() {
        let mut customer = Customer::new(email(), 100).unwrap();

        customer.reserve_credit(60).unwrap();
        assert_eq!(customer.credit, 40);

        assert_eq!(customer.reserve_credit(41), Err(CustomerError::InsufficientCredit));
        assert_eq!(customer.credit, 40);

        customer.reserve_credit(40).unwrap();
        assert_eq!(customer.credit, 0);
    }

    #[test]
    fn test_release_credit() {
        let mut customer = Customer::new(email(), 100).unwrap();
        customer.reserve_credit(60).unwrap();
        customer.release_credit(60).unwrap();
        assert_eq!(customer.credit, 100);

        let mut overdrawn = Customer::restore(Uuid::now_v7(), email(), -20, Utc::now(), Utc::now());
        overdrawn.release_credit(10).unwrap();
        assert_eq!(overdrawn.credit, 10);
    }

    #[test]
    fn test_release_credit_rejects_overflow() {
        let mut customer = Customer::restore(Uuid::now_v7(), email(), i64::MAX - 5, Utc::now(), Utc::now());

        assert_eq!(customer.release_credit(6), Err(CustomerError::CreditOverflow));
        assert_eq!(customer.credit, i64::MAX - 5);

        customer.release_credit(5).unwrap();
        assert_eq!(customer.credit, i64::MAX);
    }

    #[test]
    fn test_amounts_must_be_positive() {
        let mut customer = Customer::new(email(), 100).unwrap();
        assert_eq!(customer.reserve_credit(0), Err(CustomerError::AmountMustBePositive));
        assert_eq!(customer.release_credit(-1), Err(CustomerError::AmountMustBePositive));
        assert_eq!(customer.credit, 100);
    }

    #[test]
    fn test_restored_customer_has_no_pending_events() {
        let mut customer = Customer::restore(Uuid::now_v7(), email(), 10, Utc::now(), Utc::now());
        assert!(customer.pull_domain_events().is_empty());
    }
}
