//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container and serialize on it.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration
//! ```

use std::sync::Arc;

use common::BookId;
use domain::{
    Book, DomainError, Money, Order, OrderLine, OrderStatus, PaymentMethod, PricingEngine,
    ShippingAddress, User,
};
use serial_test::serial;
use sqlx::PgPool;
use store::{BookstoreStore, PostgresStore, StoreError, StoreSession};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

#[ctor::ctor]
fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

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

            // Create a temporary pool just for the schema
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_bookstore_tables.sql"
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

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation
    sqlx::query("TRUNCATE TABLE orders, books, users")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

fn test_book(isbn: &str, quantity: u32) -> Book {
    Book::new(
        isbn,
        "The Left Hand of Darkness",
        "Ursula K. Le Guin",
        Money::from_cents(1299),
        0,
        quantity,
    )
    .unwrap()
}

fn test_order(user: &User, book: &Book, quantity: u32) -> Order {
    let items = vec![OrderLine::new(
        book.id,
        book.title.clone(),
        quantity,
        book.price,
        book.discount_percent,
    )];
    let totals = PricingEngine::default().price(&items);
    Order::new(
        user.id,
        items,
        ShippingAddress::new("12 Shelf Lane", "Omaha", "68102", "USA"),
        PaymentMethod::CreditCard,
        &totals,
    )
}

async fn seed_user(store: &PostgresStore, email: &str) -> User {
    let user = User::new("Test Reader", email);
    let mut session = store.begin().await.unwrap();
    session.insert_user(&user).await.unwrap();
    session.commit().await.unwrap();
    user
}

async fn seed_book(store: &PostgresStore, isbn: &str, quantity: u32) -> Book {
    let book = test_book(isbn, quantity);
    let mut session = store.begin().await.unwrap();
    session.insert_book(&book).await.unwrap();
    session.commit().await.unwrap();
    book
}

#[tokio::test]
#[serial]
async fn insert_and_read_back_book() {
    let store = get_test_store().await;
    let book = test_book("9780441478125", 7);

    let mut session = store.begin().await.unwrap();
    session.insert_book(&book).await.unwrap();
    session.commit().await.unwrap();

    let stored = store.get_book(book.id).await.unwrap().unwrap();
    assert_eq!(stored.isbn, book.isbn);
    assert_eq!(stored.title, book.title);
    assert_eq!(stored.price, book.price);
    assert_eq!(stored.quantity, 7);
}

#[tokio::test]
#[serial]
async fn uncommitted_writes_stay_invisible() {
    let store = get_test_store().await;
    let book = test_book("9780441478125", 7);

    let mut session = store.begin().await.unwrap();
    session.insert_book(&book).await.unwrap();

    // Visible inside the transaction, invisible outside it.
    assert!(session.find_book(book.id).await.unwrap().is_some());
    assert!(store.get_book(book.id).await.unwrap().is_none());

    session.abort().await.unwrap();
    assert!(store.get_book(book.id).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn duplicate_isbn_rejected() {
    let store = get_test_store().await;
    seed_book(&store, "9780441478125", 1).await;

    let clone = test_book("9780441478125", 5);
    let mut session = store.begin().await.unwrap();
    let err = session.insert_book(&clone).await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateDocument { .. }));
}

#[tokio::test]
#[serial]
async fn duplicate_email_rejected() {
    let store = get_test_store().await;
    seed_user(&store, "reader@example.com").await;

    let clone = User::new("Another Reader", "reader@example.com");
    let mut session = store.begin().await.unwrap();
    let err = session.insert_user(&clone).await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateDocument { .. }));
}

#[tokio::test]
#[serial]
async fn reserve_stock_decrements_only_when_sufficient() {
    let store = get_test_store().await;
    let book = seed_book(&store, "9780441478125", 5).await;

    let mut session = store.begin().await.unwrap();
    let updated = session.reserve_stock(book.id, 3).await.unwrap().unwrap();
    assert_eq!(updated.quantity, 2);

    // Only 2 left inside this transaction, so 3 more cannot match.
    assert!(session.reserve_stock(book.id, 3).await.unwrap().is_none());
    session.commit().await.unwrap();

    assert_eq!(store.get_book(book.id).await.unwrap().unwrap().quantity, 2);
}

#[tokio::test]
#[serial]
async fn reserve_stock_missing_book_returns_none() {
    let store = get_test_store().await;

    let mut session = store.begin().await.unwrap();
    let result = session.reserve_stock(BookId::new(), 1).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
#[serial]
async fn reserve_stock_with_oversized_request_returns_none() {
    let store = get_test_store().await;
    let book = seed_book(&store, "9780441478125", 5).await;

    let mut session = store.begin().await.unwrap();
    assert!(
        session
            .reserve_stock(book.id, u32::MAX)
            .await
            .unwrap()
            .is_none()
    );
    session.commit().await.unwrap();

    assert_eq!(store.get_book(book.id).await.unwrap().unwrap().quantity, 5);
}

#[tokio::test]
#[serial]
async fn restore_stock_missing_book_is_noop() {
    let store = get_test_store().await;

    let mut session = store.begin().await.unwrap();
    session.restore_stock(BookId::new(), 3).await.unwrap();
    session.commit().await.unwrap();
}

#[tokio::test]
#[serial]
async fn restore_stock_adds_back_reserved_amount() {
    let store = get_test_store().await;
    let book = seed_book(&store, "9780441478125", 5).await;

    let mut session = store.begin().await.unwrap();
    session.reserve_stock(book.id, 4).await.unwrap().unwrap();
    session.commit().await.unwrap();

    let mut session = store.begin().await.unwrap();
    session.restore_stock(book.id, 4).await.unwrap();
    session.commit().await.unwrap();

    assert_eq!(store.get_book(book.id).await.unwrap().unwrap().quantity, 5);
}

#[tokio::test]
#[serial]
async fn reservation_rolls_back_with_its_transaction() {
    let store = get_test_store().await;
    let user = seed_user(&store, "reader@example.com").await;
    let book = seed_book(&store, "9780441478125", 5).await;

    let mut session = store.begin().await.unwrap();
    session.reserve_stock(book.id, 4).await.unwrap().unwrap();
    let order = test_order(&user, &book, 4);
    session.insert_order(&order).await.unwrap();
    session.abort().await.unwrap();

    // Neither the decrement nor the order survives the rollback.
    assert_eq!(store.get_book(book.id).await.unwrap().unwrap().quantity, 5);
    assert!(store.get_order(order.id).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn concurrent_reservations_never_oversell() {
    let store = get_test_store().await;
    let book = seed_book(&store, "9780441478125", 1).await;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let store = store.clone();
        let id = book.id;
        handles.push(tokio::spawn(async move {
            let mut session = store.begin().await.unwrap();
            let reserved = session.reserve_stock(id, 1).await.unwrap().is_some();
            session.commit().await.unwrap();
            reserved
        }));
    }

    let mut reservations = 0;
    for handle in handles {
        if handle.await.unwrap() {
            reservations += 1;
        }
    }

    assert_eq!(reservations, 1);
    assert_eq!(store.get_book(book.id).await.unwrap().unwrap().quantity, 0);
}

#[tokio::test]
#[serial]
async fn order_roundtrips_with_line_snapshots() {
    let store = get_test_store().await;
    let user = seed_user(&store, "reader@example.com").await;
    let book = seed_book(&store, "9780441478125", 5).await;
    let order = test_order(&user, &book, 2);

    let mut session = store.begin().await.unwrap();
    session.insert_order(&order).await.unwrap();
    session.commit().await.unwrap();

    let stored = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.user_id, user.id);
    assert_eq!(stored.status, OrderStatus::Pending);
    assert_eq!(stored.items.len(), 1);
    assert_eq!(stored.items[0].book_id, book.id);
    assert_eq!(stored.items[0].unit_price, book.price);
    assert_eq!(stored.total_price, order.total_price);
    assert_eq!(stored.payment_method, PaymentMethod::CreditCard);
}

#[tokio::test]
#[serial]
async fn transition_order_status_is_conditional() {
    let store = get_test_store().await;
    let user = seed_user(&store, "reader@example.com").await;
    let book = seed_book(&store, "9780441478125", 5).await;
    let order = test_order(&user, &book, 1);

    let mut session = store.begin().await.unwrap();
    session.insert_order(&order).await.unwrap();
    session.commit().await.unwrap();

    let mut session = store.begin().await.unwrap();
    let updated = session
        .transition_order_status(order.id, &[OrderStatus::Pending], OrderStatus::Processing)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, OrderStatus::Processing);

    // The order already left Pending, so this predicate matches nothing.
    let missed = session
        .transition_order_status(order.id, &[OrderStatus::Pending], OrderStatus::Cancelled)
        .await
        .unwrap();
    assert!(missed.is_none());
    session.commit().await.unwrap();

    let stored = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Processing);
}

#[tokio::test]
#[serial]
async fn delivered_transition_records_delivery() {
    let store = get_test_store().await;
    let user = seed_user(&store, "reader@example.com").await;
    let book = seed_book(&store, "9780441478125", 5).await;
    let mut order = test_order(&user, &book, 1);
    order.status = OrderStatus::Shipped;

    let mut session = store.begin().await.unwrap();
    session.insert_order(&order).await.unwrap();
    let updated = session
        .transition_order_status(order.id, &[OrderStatus::Shipped], OrderStatus::Delivered)
        .await
        .unwrap()
        .unwrap();
    session.commit().await.unwrap();

    assert_eq!(updated.status, OrderStatus::Delivered);
    assert!(updated.is_delivered);
    assert!(updated.delivered_at.is_some());
}

#[tokio::test]
#[serial]
async fn payment_and_tracking_updates_persist() {
    let store = get_test_store().await;
    let user = seed_user(&store, "reader@example.com").await;
    let book = seed_book(&store, "9780441478125", 5).await;
    let order = test_order(&user, &book, 1);

    let mut session = store.begin().await.unwrap();
    session.insert_order(&order).await.unwrap();
    session.commit().await.unwrap();

    let paid_at = chrono::Utc::now();
    let mut session = store.begin().await.unwrap();
    session.set_order_paid(order.id, paid_at).await.unwrap();
    session
        .set_order_tracking(order.id, "TRACK-123")
        .await
        .unwrap();
    session.commit().await.unwrap();

    let stored = store.get_order(order.id).await.unwrap().unwrap();
    assert!(stored.is_paid);
    assert!(stored.paid_at.is_some());
    assert_eq!(stored.tracking_number.as_deref(), Some("TRACK-123"));
}

#[tokio::test]
#[serial]
async fn update_book_pricing_rejects_out_of_range_discount() {
    let store = get_test_store().await;
    let book = seed_book(&store, "9780441478125", 5).await;

    let mut session = store.begin().await.unwrap();
    let err = session
        .update_book_pricing(book.id, Money::from_cents(999), 101)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::Domain(DomainError::InvalidDiscount {
            discount_percent: 101
        })
    ));
    session.abort().await.unwrap();

    let stored = store.get_book(book.id).await.unwrap().unwrap();
    assert_eq!(stored.price, Money::from_cents(1299));
    assert_eq!(stored.discount_percent, 0);
}

#[tokio::test]
#[serial]
async fn get_book_by_isbn_looks_up_catalog() {
    let store = get_test_store().await;
    let book = seed_book(&store, "9780441478125", 5).await;

    let found = store
        .get_book_by_isbn("9780441478125")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, book.id);
    assert!(store.get_book_by_isbn("0000").await.unwrap().is_none());
}
