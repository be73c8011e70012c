mod common;

use assert_matches::assert_matches;
use common::{customer, TestApp};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use bloomshop_api::{
    entities::{cart_item, CartItem},
    errors::ServiceError,
    services::carts::AddItemInput,
};

#[tokio::test]
async fn cart_creation_is_idempotent_per_user() {
    let app = TestApp::new().await;
    let user = customer();

    let first = app
        .state
        .services
        .carts
        .get_or_create_cart(&user)
        .await
        .unwrap();
    let second = app
        .state
        .services
        .carts
        .get_or_create_cart(&user)
        .await
        .unwrap();

    assert_eq!(first.id, second.id);

    // A different user gets a different cart.
    let other = app
        .state
        .services
        .carts
        .get_or_create_cart(&customer())
        .await
        .unwrap();
    assert_ne!(first.id, other.id);
}

#[tokio::test]
async fn adding_same_flower_merges_into_one_row() {
    let app = TestApp::new().await;
    let user = customer();
    let cart = app
        .state
        .services
        .carts
        .get_or_create_cart(&user)
        .await
        .unwrap();
    let flower = app.seed_flower("Tulip", dec!(4.50), 100).await;

    app.state
        .services
        .carts
        .add_item(
            cart.id,
            AddItemInput {
                flower_id: flower.id,
                quantity: 2,
            },
        )
        .await
        .unwrap();
    let merged = app
        .state
        .services
        .carts
        .add_item(
            cart.id,
            AddItemInput {
                flower_id: flower.id,
                quantity: 3,
            },
        )
        .await
        .unwrap();

    assert_eq!(merged.quantity, 5);

    let row_count = CartItem::find()
        .filter(cart_item::Column::CartId.eq(cart.id))
        .count(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(row_count, 1);
}

#[tokio::test]
async fn adding_unknown_flower_fails_with_not_found() {
    let app = TestApp::new().await;
    let user = customer();
    let cart = app
        .state
        .services
        .carts
        .get_or_create_cart(&user)
        .await
        .unwrap();

    let err = app
        .state
        .services
        .carts
        .add_item(
            cart.id,
            AddItemInput {
                flower_id: Uuid::new_v4(),
                quantity: 1,
            },
        )
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn adding_to_unknown_cart_fails_with_not_found() {
    let app = TestApp::new().await;
    let flower = app.seed_flower("Rose", dec!(7.00), 10).await;

    let err = app
        .state
        .services
        .carts
        .add_item(
            Uuid::new_v4(),
            AddItemInput {
                flower_id: flower.id,
                quantity: 1,
            },
        )
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn non_positive_quantities_are_rejected() {
    let app = TestApp::new().await;
    let user = customer();
    let cart = app
        .state
        .services
        .carts
        .get_or_create_cart(&user)
        .await
        .unwrap();
    let flower = app.seed_flower("Lily", dec!(3.25), 10).await;

    for quantity in [0, -2] {
        let err = app
            .state
            .services
            .carts
            .add_item(
                cart.id,
                AddItemInput {
                    flower_id: flower.id,
                    quantity,
                },
            )
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(_));
    }
}

#[tokio::test]
async fn update_replaces_quantity_outright() {
    let app = TestApp::new().await;
    let user = customer();
    let cart = app
        .state
        .services
        .carts
        .get_or_create_cart(&user)
        .await
        .unwrap();
    let flower = app.seed_flower("Orchid", dec!(12.00), 50).await;

    let item = app
        .state
        .services
        .carts
        .add_item(
            cart.id,
            AddItemInput {
                flower_id: flower.id,
                quantity: 4,
            },
        )
        .await
        .unwrap();

    // Replacement, not accumulation: 4 becomes 2, not 6.
    let updated = app
        .state
        .services
        .carts
        .update_item(cart.id, item.id, 2)
        .await
        .unwrap();
    assert_eq!(updated.quantity, 2);
}

#[tokio::test]
async fn update_rejects_item_from_another_cart() {
    let app = TestApp::new().await;
    let user_a = customer();
    let user_b = customer();
    let cart_a = app
        .state
        .services
        .carts
        .get_or_create_cart(&user_a)
        .await
        .unwrap();
    let cart_b = app
        .state
        .services
        .carts
        .get_or_create_cart(&user_b)
        .await
        .unwrap();
    let flower = app.seed_flower("Daisy", dec!(2.00), 10).await;

    let item = app
        .state
        .services
        .carts
        .add_item(
            cart_a.id,
            AddItemInput {
                flower_id: flower.id,
                quantity: 1,
            },
        )
        .await
        .unwrap();

    let err = app
        .state
        .services
        .carts
        .update_item(cart_b.id, item.id, 3)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidRequest(_));
}

#[tokio::test]
async fn removing_an_item_deletes_the_row() {
    let app = TestApp::new().await;
    let user = customer();
    let cart = app
        .state
        .services
        .carts
        .get_or_create_cart(&user)
        .await
        .unwrap();
    let flower = app.seed_flower("Peony", dec!(9.99), 20).await;

    let item = app
        .state
        .services
        .carts
        .add_item(
            cart.id,
            AddItemInput {
                flower_id: flower.id,
                quantity: 2,
            },
        )
        .await
        .unwrap();

    app.state
        .services
        .carts
        .remove_item(cart.id, item.id)
        .await
        .unwrap();

    let remaining = CartItem::find()
        .filter(cart_item::Column::CartId.eq(cart.id))
        .count(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(remaining, 0);

    let err = app
        .state
        .services
        .carts
        .remove_item(cart.id, item.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn cart_view_shows_live_catalog_prices() {
    let app = TestApp::new().await;
    let user = customer();
    let cart = app
        .state
        .services
        .carts
        .get_or_create_cart(&user)
        .await
        .unwrap();
    let flower = app.seed_flower("Sunflower", dec!(5.00), 30).await;

    app.state
        .services
        .carts
        .add_item(
            cart.id,
            AddItemInput {
                flower_id: flower.id,
                quantity: 3,
            },
        )
        .await
        .unwrap();

    let view = app
        .state
        .services
        .carts
        .get_cart(cart.id, &user)
        .await
        .unwrap();
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].flower.name, "Sunflower");
    assert_eq!(view.items[0].total_price, dec!(15.00));
    assert_eq!(view.total_price, dec!(15.00));

    // Display pricing follows the catalog: a price change shows up on the
    // next read (unlike frozen order prices).
    use sea_orm::{ActiveModelTrait, Set};
    let mut catalog_entry: bloomshop_api::entities::flower::ActiveModel =
        bloomshop_api::entities::Flower::find_by_id(flower.id)
            .one(&*app.state.db)
            .await
            .unwrap()
            .unwrap()
            .into();
    catalog_entry.price = Set(dec!(6.00));
    catalog_entry.update(&*app.state.db).await.unwrap();

    let view = app
        .state
        .services
        .carts
        .get_cart(cart.id, &user)
        .await
        .unwrap();
    assert_eq!(view.total_price, dec!(18.00));
}

#[tokio::test]
async fn cart_is_invisible_to_other_users() {
    let app = TestApp::new().await;
    let owner = customer();
    let stranger = customer();
    let cart = app
        .state
        .services
        .carts
        .get_or_create_cart(&owner)
        .await
        .unwrap();

    let err = app
        .state
        .services
        .carts
        .get_cart(cart.id, &stranger)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let err = app
        .state
        .services
        .carts
        .delete_cart(cart.id, &stranger)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn deleting_a_cart_removes_its_items() {
    let app = TestApp::new().await;
    let user = customer();
    let cart = app
        .state
        .services
        .carts
        .get_or_create_cart(&user)
        .await
        .unwrap();
    let flower = app.seed_flower("Iris", dec!(3.00), 10).await;

    app.state
        .services
        .carts
        .add_item(
            cart.id,
            AddItemInput {
                flower_id: flower.id,
                quantity: 1,
            },
        )
        .await
        .unwrap();

    app.state
        .services
        .carts
        .delete_cart(cart.id, &user)
        .await
        .unwrap();

    let remaining = CartItem::find()
        .filter(cart_item::Column::CartId.eq(cart.id))
        .count(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}
