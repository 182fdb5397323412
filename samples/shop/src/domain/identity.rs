//! Identity: customers and their shipping address.

use serde::Serialize;
use storefront::prelude::*;
use uuid::Uuid;

use super::required;

/// Raised when a customer registers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerRegistered {
    pub customer_id: Uuid,
    pub email: String,
}

impl DomainEvent for CustomerRegistered {
    fn name(&self) -> &'static str {
        "identity.customer_registered"
    }
}

/// Raised when a customer changes their shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressChanged {
    pub customer_id: Uuid,
    pub city: String,
}

impl DomainEvent for AddressChanged {
    fn name(&self) -> &'static str {
        "identity.address_changed"
    }
}

/// A postal address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Address {
    pub line1: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl Address {
    /// Validates every field at once.
    ///
    /// # Errors
    ///
    /// Returns one `Validation` failure listing every invalid field.
    pub fn parse(line1: &str, city: &str, postal_code: &str, country: &str) -> Fin<Self> {
        let country = required(country, "Country is required.").and_then(|country| {
            if country.len() == 2 && country.chars().all(|c| c.is_ascii_alphabetic()) {
                Ok(country.to_ascii_uppercase())
            } else {
                fail(ErrorInfo::validation("Country must be a two-letter code."))
            }
        });
        let street_and_city = accumulate2(
            required(line1, "Address line is required."),
            required(city, "City is required."),
            |line1, city| (line1, city),
        );
        accumulate3(
            street_and_city,
            required(postal_code, "Postal code is required."),
            country,
            |(line1, city), postal_code, country| Self {
                line1,
                city,
                postal_code,
                country,
            },
        )
    }
}

/// Registration input.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
}

/// A registered customer.
#[derive(Debug, Clone)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub address: Option<Address>,
    pub audit: AuditInfo,
    pub events: DomainEvents,
}

impl Customer {
    /// Registers a customer. The e-mail is stored lowercase.
    ///
    /// # Errors
    ///
    /// Returns one `Validation` failure listing every invalid field.
    pub fn register(registration: Registration) -> Fin<Self> {
        accumulate2(
            required(&registration.name, "Customer name is required."),
            normalize_email(&registration.email),
            |name, email| {
                let id = Uuid::new_v4();
                let mut customer = Self {
                    id,
                    name,
                    email: email.clone(),
                    address: None,
                    audit: AuditInfo::default(),
                    events: DomainEvents::default(),
                };
                customer.events.raise(CustomerRegistered {
                    customer_id: id,
                    email,
                });
                customer
            },
        )
    }

    /// Replaces the shipping address.
    pub fn change_address(mut self, address: Address) -> Fin<Self> {
        self.events.raise(AddressChanged {
            customer_id: self.id,
            city: address.city.clone(),
        });
        self.address = Some(address);
        Ok(self)
    }
}

impl Entity for Customer {
    type Id = Uuid;
    const NAME: &'static str = "Customer";

    fn id(&self) -> Uuid {
        self.id
    }

    fn audit_mut(&mut self) -> Option<&mut AuditInfo> {
        Some(&mut self.audit)
    }

    fn events_mut(&mut self) -> Option<&mut DomainEvents> {
        Some(&mut self.events)
    }
}

/// Trims and lowercases an e-mail address after a shape check.
///
/// # Errors
///
/// Returns `Validation` for a blank or malformed address.
pub fn normalize_email(email: &str) -> Fin<String> {
    let email = required(email, "E-mail is required.")?.to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') => {
            Ok(email)
        }
        _ => fail(ErrorInfo::validation(format!("'{email}' is not a valid e-mail."))),
    }
}
