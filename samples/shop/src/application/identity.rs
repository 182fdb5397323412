//! Customer use cases.

use storefront::prelude::*;
use uuid::Uuid;

use super::ShopPipeline;
use crate::domain::identity::{Address, Customer, Registration};

pub fn customer_not_found(customer_id: Uuid) -> ErrorInfo {
    ErrorInfo::not_found(format!("Customer {customer_id} was not found."))
}

/// Registers a customer. E-mails are unique, compared case-insensitively.
pub fn register_customer(registration: Registration) -> ShopPipeline<Customer> {
    pipeline! {
        customer <= Pipeline::from_result(Customer::register(registration));
        let email = customer.email.clone();
        let conflict = ErrorInfo::conflict(format!("A customer with e-mail '{email}' already exists."));
        _ <= ensure_absent(move |existing: &Customer| existing.email == email, conflict);
        add_entity(customer)
    }
}

/// Fields of a new shipping address.
#[derive(Debug, Clone, Default)]
pub struct AddressInput {
    pub line1: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// Validates and stores a customer's shipping address.
pub fn change_address(customer_id: Uuid, input: AddressInput) -> ShopPipeline<Customer> {
    let address = Address::parse(&input.line1, &input.city, &input.postal_code, &input.country);
    pipeline! {
        address <= Pipeline::from_result(address);
        get_update_entity(
            move |customer: &Customer| customer.id == customer_id,
            customer_not_found(customer_id),
            QueryOptions::new(),
            [Transition::pure(move |customer: Customer| customer.change_address(address))],
        )
    }
}
