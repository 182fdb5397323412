//! Customer registration and addresses.

mod common;

use common::{fixture, register};
use rstest::rstest;
use shop::application::identity::{self, AddressInput};
use shop::domain::identity::{Customer, Registration};
use storefront::prelude::*;

#[rstest]
#[tokio::test]
async fn email_is_unique_regardless_of_case() {
    let fixture = fixture();
    register(&fixture.shop, "ada@example.com").await;

    let error = fixture
        .shop
        .execute(identity::register_customer(Registration {
            name: "Ada".to_owned(),
            email: " ADA@Example.com ".to_owned(),
        }))
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Conflict);
    assert_eq!(error.message(), "A customer with e-mail 'ada@example.com' already exists.");
    assert_eq!(fixture.shop.store().snapshot::<Customer>().len(), 1);
}

#[rstest]
#[tokio::test]
async fn registration_accumulates_field_errors() {
    let fixture = fixture();

    let error = fixture
        .shop
        .execute(identity::register_customer(Registration {
            name: " ".to_owned(),
            email: "not-an-email".to_owned(),
        }))
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Validation);
    assert_eq!(error.details().len(), 2);
}

#[rstest]
#[tokio::test]
async fn change_address_validates_then_stores() {
    let fixture = fixture();
    let customer = register(&fixture.shop, "ada@example.com").await;

    let rejected = fixture
        .shop
        .execute(identity::change_address(customer.id, AddressInput::default()))
        .await
        .unwrap_err();
    assert_eq!(rejected.details().len(), 4);

    let updated = fixture
        .shop
        .execute(identity::change_address(
            customer.id,
            AddressInput {
                line1: "12 Analytical Row".to_owned(),
                city: "London".to_owned(),
                postal_code: "N1 9GU".to_owned(),
                country: "gb".to_owned(),
            },
        ))
        .await
        .unwrap();

    let address = updated.address.unwrap();
    assert_eq!(address.country, "GB");
    let stored = fixture.shop.store().find::<Customer>(&customer.id).unwrap();
    assert_eq!(stored.address.map(|address| address.city), Some("London".to_owned()));
    assert!(stored.audit.updated_at >= stored.audit.created_at);
}

#[rstest]
#[tokio::test]
async fn unknown_customer_is_not_found() {
    let fixture = fixture();
    let missing = uuid::Uuid::new_v4();

    let error = fixture
        .shop
        .execute(identity::change_address(
            missing,
            AddressInput {
                line1: "1".to_owned(),
                city: "Oslo".to_owned(),
                postal_code: "0150".to_owned(),
                country: "NO".to_owned(),
            },
        ))
        .await
        .unwrap_err();

    assert_eq!(error, identity::customer_not_found(missing));
}
