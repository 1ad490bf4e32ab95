//! API server entry point.

use api::Config;
use api::routes::orders::AppState;
use domain::{Book, Money, User};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{BookstoreStore, InMemoryStore, PostgresStore, StoreError, StoreSession};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn seed_demo_user<S: BookstoreStore>(store: &S, user: &User) -> Result<(), StoreError> {
    let mut session = store.begin().await?;
    let inserted = match session.insert_user(user).await {
        Ok(()) => session.commit().await,
        Err(e) => {
            session.abort().await.ok();
            Err(e)
        }
    };

    match inserted {
        Ok(()) => {
            tracing::info!(
                user_id = %user.id,
                email = %user.email,
                admin = user.is_admin,
                "seeded demo user"
            );
            Ok(())
        }
        Err(StoreError::DuplicateDocument { .. }) => {
            tracing::debug!(email = %user.email, "demo user already present");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Seeds a demo reader, a demo admin, and a small catalog. Safe to run
/// on every boot: books are keyed by ISBN and existing users are left
/// alone. The logged user IDs are what goes in the `x-user-id` header.
async fn seed_demo_data<S: BookstoreStore + Clone + 'static>(
    state: &AppState<S>,
) -> Result<(), StoreError> {
    let reader = User::new("Demo Reader", "reader@bookstore.dev");
    let admin = User::new_admin("Demo Admin", "admin@bookstore.dev");
    seed_demo_user(&state.store, &reader).await?;
    seed_demo_user(&state.store, &admin).await?;

    let catalog = [
        ("9780441172719", "Dune", "Frank Herbert", 1099, 0, 25),
        ("9780553283686", "Hyperion", "Dan Simmons", 1250, 10, 18),
        ("9780765382030", "The Fifth Season", "N. K. Jemisin", 1599, 0, 12),
        ("9780060853983", "Good Omens", "Terry Pratchett", 999, 25, 30),
    ];
    for (isbn, title, author, price_cents, discount, quantity) in catalog {
        let book = Book::new(
            isbn,
            title,
            author,
            Money::from_cents(price_cents),
            discount,
            quantity,
        )
        .expect("demo catalog entries are valid");
        state.book_refs.resolve_or_create(&state.store, book).await?;
    }

    Ok(())
}

async fn run<S: BookstoreStore + Clone + 'static>(
    store: S,
    config: Config,
    metrics_handle: PrometheusHandle,
) {
    let state = api::create_state(store, &config);

    if config.seed_demo_data {
        seed_demo_data(state.as_ref())
            .await
            .expect("failed to seed demo data");
    }

    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Pick the store backend and serve
    match config.database_url.clone() {
        Some(database_url) => {
            let store = PostgresStore::connect(&database_url, 10)
                .await
                .expect("failed to connect to Postgres");
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("connected to Postgres store");
            run(store, config, metrics_handle).await;
        }
        None => {
            tracing::warn!(
                "DATABASE_URL not set, using the in-memory store; data is lost on shutdown"
            );
            run(InMemoryStore::new(), config, metrics_handle).await;
        }
    }
}
