//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use domain::{Cart, Money, Order, OrderDraft, OrderItem, Product, ShippingAddress, User};
use serial_test::serial;
use sqlx::PgPool;
use store::{OrderQuery, PostgresStore, ProductQuery, Store, StoreError, StoreExt, Version};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            // Run migrations using raw_sql to execute multiple statements
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_storefront_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    // Create a fresh pool for each test to avoid connection issues
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation
    sqlx::query("TRUNCATE TABLE products, users, carts, orders")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

fn product(name: &str, price_cents: i64, stock: u32) -> Product {
    let mut product = Product::sample(common::UserId::new());
    product.name = name.to_string();
    product.price = Money::from_cents(price_cents);
    product.count_in_stock = stock;
    product
}

fn user(email: &str) -> User {
    User::new("Test User", email, "$argon2id$placeholder".to_string())
}

fn order_for(user: &User, lines: &[(&Product, u32)]) -> Order {
    let items: Vec<OrderItem> = lines
        .iter()
        .map(|(product, qty)| OrderItem {
            product_id: product.id,
            name: product.name.clone(),
            image: product.image.clone(),
            price: product.price,
            qty: *qty,
        })
        .collect();
    let total = items.iter().map(OrderItem::line_total).sum();

    Order::place(
        user,
        OrderDraft {
            items,
            shipping_address: ShippingAddress {
                address: "1 Main St".to_string(),
                city: "Springfield".to_string(),
                postal_code: "12345".to_string(),
                country: "US".to_string(),
                mobile_number: "555-0100".to_string(),
            },
            payment_method: "PayPal".to_string(),
            tax_price: Money::zero(),
            shipping_price: Money::zero(),
            total_price: total,
            delivery_type: Some("standard".to_string()),
        },
    )
    .unwrap()
}

#[tokio::test]
#[serial]
async fn product_roundtrip_and_update() {
    let store = get_test_store().await;
    let mut widget = product("Widget", 1999, 7);

    store.insert_product(&widget).await.unwrap();

    let loaded = store.get_product(widget.id).await.unwrap().unwrap();
    assert_eq!(loaded.name, "Widget");
    assert_eq!(loaded.price, Money::from_cents(1999));
    assert_eq!(loaded.count_in_stock, 7);

    widget.count_in_stock = 3;
    store.update_product(&widget).await.unwrap();
    let loaded = store.get_product(widget.id).await.unwrap().unwrap();
    assert_eq!(loaded.count_in_stock, 3);

    assert!(store.delete_product(widget.id).await.unwrap());
    assert!(!store.delete_product(widget.id).await.unwrap());
    assert!(store.get_product(widget.id).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn find_products_by_keyword_and_price() {
    let store = get_test_store().await;
    store.insert_product(&product("Red Phone", 5000, 1)).await.unwrap();
    store.insert_product(&product("Blue Phone", 15000, 1)).await.unwrap();
    store.insert_product(&product("100% Cotton", 2000, 1)).await.unwrap();

    let phones = store
        .find_products(
            &ProductQuery::new()
                .keyword("phone")
                .max_price(Money::from_cents(10000)),
        )
        .await
        .unwrap();
    assert_eq!(phones.len(), 1);
    assert_eq!(phones[0].name, "Red Phone");

    // Wildcards in the keyword match literally.
    let percent = store
        .find_products(&ProductQuery::new().keyword("0%"))
        .await
        .unwrap();
    assert_eq!(percent.len(), 1);

    let all = store.find_products(&ProductQuery::new()).await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
#[serial]
async fn cart_optimistic_concurrency() {
    let store = get_test_store().await;
    let widget = product("Widget", 1000, 10);
    store.insert_product(&widget).await.unwrap();
    let owner = common::UserId::new();

    let mut cart = store.get_cart_or_empty(owner).await.unwrap();
    cart.upsert_item(&widget, 2).unwrap();
    let v1 = store.save_cart(&cart).await.unwrap();
    assert_eq!(v1, Version::first());

    let first = store.get_cart(owner).await.unwrap().unwrap();
    let second = first.clone();
    assert_eq!(first.total_price(), Money::from_cents(2000));

    store.save_cart(&first).await.unwrap();
    let result = store.save_cart(&second).await;

    assert!(matches!(
        result,
        Err(StoreError::ConcurrencyConflict { expected, actual, .. })
            if expected == Version::first() && actual == Version::new(2)
    ));

    // A second "new" cart for the same user loses as well.
    let result = store.save_cart(&Cart::empty(owner)).await;
    assert!(matches!(result, Err(StoreError::ConcurrencyConflict { .. })));
}

#[tokio::test]
#[serial]
async fn place_order_commits_atomically() {
    let store = get_test_store().await;
    let buyer = user("buyer@example.com");
    store.insert_user(&buyer).await.unwrap();
    let widget = product("Widget", 1000, 5);
    store.insert_product(&widget).await.unwrap();

    let mut cart = Cart::empty(buyer.id);
    cart.upsert_item(&widget, 2).unwrap();
    store.save_cart(&cart).await.unwrap();

    let order = order_for(&buyer, &[(&widget, 2)]);
    store.place_order(&order).await.unwrap();

    let widget = store.get_product(widget.id).await.unwrap().unwrap();
    assert_eq!(widget.count_in_stock, 3);
    assert!(store.get_cart(buyer.id).await.unwrap().is_none());

    let loaded = store.get_order(order.id()).await.unwrap().unwrap();
    assert_eq!(loaded.items(), order.items());
    assert_eq!(loaded.total_price(), Money::from_cents(2000));
}

#[tokio::test]
#[serial]
async fn place_order_rolls_back_on_insufficient_stock() {
    let store = get_test_store().await;
    let buyer = user("buyer@example.com");
    let plenty = product("Plenty", 100, 10);
    let scarce = product("Scarce", 100, 1);
    store.insert_product(&plenty).await.unwrap();
    store.insert_product(&scarce).await.unwrap();

    let mut cart = Cart::empty(buyer.id);
    cart.upsert_item(&plenty, 3).unwrap();
    store.save_cart(&cart).await.unwrap();

    let order = order_for(&buyer, &[(&plenty, 3), (&scarce, 2)]);
    let result = store.place_order(&order).await;

    assert!(matches!(
        result,
        Err(StoreError::InsufficientStock {
            requested: 2,
            available: 1,
            ..
        })
    ));

    let plenty = store.get_product(plenty.id).await.unwrap().unwrap();
    assert_eq!(plenty.count_in_stock, 10);
    assert!(store.get_cart(buyer.id).await.unwrap().is_some());
    assert!(store.get_order(order.id()).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn concurrent_place_order_sells_last_unit_once() {
    let store = get_test_store().await;
    let last = product("Last One", 1000, 1);
    store.insert_product(&last).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        let order = order_for(&user(&format!("buyer{i}@example.com")), &[(&last, 1)]);
        handles.push(tokio::spawn(async move { store.place_order(&order).await }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => succeeded += 1,
            Err(e) => assert!(matches!(e, StoreError::InsufficientStock { requested: 1, .. })),
        }
    }

    assert_eq!(succeeded, 1);
    let last = store.get_product(last.id).await.unwrap().unwrap();
    assert_eq!(last.count_in_stock, 0);
    let orders = store.find_orders(&OrderQuery::all()).await.unwrap();
    assert_eq!(orders.len(), 1);
}

#[tokio::test]
#[serial]
async fn place_order_with_deleted_product_fails() {
    let store = get_test_store().await;
    let buyer = user("buyer@example.com");
    let ghost = product("Ghost", 100, 1);

    let result = store.place_order(&order_for(&buyer, &[(&ghost, 1)])).await;

    assert!(matches!(result, Err(StoreError::ProductNotFound(id)) if id == ghost.id));
}

#[tokio::test]
#[serial]
async fn order_status_update_and_listing() {
    let store = get_test_store().await;
    let alice = user("alice@example.com");
    let bob = user("bob@example.com");
    let widget = product("Widget", 100, 10);
    store.insert_product(&widget).await.unwrap();

    let mut order = order_for(&alice, &[(&widget, 1)]);
    store.place_order(&order).await.unwrap();
    store.place_order(&order_for(&bob, &[(&widget, 1)])).await.unwrap();

    order
        .mark_paid(&alice.requester(), Default::default())
        .unwrap();
    store.save_order_status(&order).await.unwrap();

    let loaded = store.get_order(order.id()).await.unwrap().unwrap();
    assert!(loaded.is_paid());
    assert!(loaded.paid_at().is_some());

    let mine = store.find_orders(&OrderQuery::for_user(alice.id)).await.unwrap();
    assert_eq!(mine.len(), 1);
    let all = store.find_orders(&OrderQuery::all()).await.unwrap();
    assert_eq!(all.len(), 2);

    let never_placed = order_for(&bob, &[(&widget, 1)]);
    let result = store.save_order_status(&never_placed).await;
    assert!(matches!(result, Err(StoreError::OrderNotFound(_))));
}

#[tokio::test]
#[serial]
async fn users_unique_email_and_profile() {
    let store = get_test_store().await;
    let mut jane = user("jane@example.com");
    store.insert_user(&jane).await.unwrap();

    let result = store.insert_user(&user("jane@example.com")).await;
    assert!(matches!(result, Err(StoreError::DuplicateEmail(_))));

    jane.shipping_address = Some(ShippingAddress {
        address: "2 Side St".to_string(),
        city: "Shelbyville".to_string(),
        postal_code: "54321".to_string(),
        country: "US".to_string(),
        mobile_number: "555-0199".to_string(),
    });
    store.update_user(&jane).await.unwrap();

    let loaded = store
        .find_user_by_email("jane@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.id, jane.id);
    assert_eq!(loaded.shipping_address, jane.shipping_address);

    assert_eq!(store.list_users().await.unwrap().len(), 1);
    assert!(store.delete_user(jane.id).await.unwrap());
    assert!(store.get_user(jane.id).await.unwrap().is_none());
}
