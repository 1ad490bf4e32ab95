use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Book, Money, Order, OrderLine, PaymentMethod, PricingEngine, ShippingAddress, User};
use store::{BookstoreStore, InMemoryStore, StoreSession};

fn make_book(quantity: u32) -> Book {
    Book::new(
        "9780441478125",
        "The Left Hand of Darkness",
        "Ursula K. Le Guin",
        Money::from_cents(1299),
        10,
        quantity,
    )
    .unwrap()
}

fn make_order(user: &User, book: &Book, quantity: u32) -> Order {
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

fn bench_begin_commit(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("store/begin_commit_empty", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryStore::new();
                let session = store.begin().await.unwrap();
                session.commit().await.unwrap();
            });
        });
    });
}

fn bench_insert_book(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("store/insert_book_commit", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryStore::new();
                let mut session = store.begin().await.unwrap();
                session.insert_book(&make_book(100)).await.unwrap();
                session.commit().await.unwrap();
            });
        });
    });
}

fn bench_reserve_stock(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryStore::new();
    let book = make_book(1_000_000);

    rt.block_on(async {
        let mut session = store.begin().await.unwrap();
        session.insert_book(&book).await.unwrap();
        session.commit().await.unwrap();
    });

    // Aborting keeps the seeded quantity stable across iterations.
    c.bench_function("store/reserve_stock_abort", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut session = store.begin().await.unwrap();
                session.reserve_stock(book.id, 2).await.unwrap().unwrap();
                session.abort().await.unwrap();
            });
        });
    });
}

fn bench_place_order_transaction(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("store/place_order_transaction", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryStore::new();
                let user = User::new("Bench Reader", "bench@example.com");
                let book = make_book(100);

                let mut session = store.begin().await.unwrap();
                session.insert_user(&user).await.unwrap();
                session.insert_book(&book).await.unwrap();
                session.commit().await.unwrap();

                let mut session = store.begin().await.unwrap();
                session.find_user(user.id).await.unwrap().unwrap();
                session.reserve_stock(book.id, 2).await.unwrap().unwrap();
                session
                    .insert_order(&make_order(&user, &book, 2))
                    .await
                    .unwrap();
                session.commit().await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_begin_commit,
    bench_insert_book,
    bench_reserve_stock,
    bench_place_order_transaction
);
criterion_main!(benches);
