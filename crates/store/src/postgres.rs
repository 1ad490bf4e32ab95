use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BookId, OrderId, UserId};
use domain::{
    Book, DomainError, Money, Order, OrderLine, OrderStatus, PaymentMethod, ShippingAddress, User,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgExecutor, PgPool, Row};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::store::{BookstoreStore, StoreSession};

/// PostgreSQL-backed document store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the given database URL with a fresh pool.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

fn row_to_user(row: PgRow) -> Result<User> {
    Ok(User {
        id: UserId::from_uuid(row.try_get::<Uuid, _>("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        is_admin: row.try_get("is_admin")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_book(row: PgRow) -> Result<Book> {
    let quantity: i32 = row.try_get("quantity")?;
    Ok(Book {
        id: BookId::from_uuid(row.try_get::<Uuid, _>("id")?),
        isbn: row.try_get("isbn")?,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        discount_percent: row.try_get::<i16, _>("discount_percent")? as u8,
        quantity: quantity as u32,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_order(row: PgRow) -> Result<Order> {
    let items: Vec<OrderLine> = serde_json::from_value(row.try_get("items")?)?;
    let shipping_address: ShippingAddress =
        serde_json::from_value(row.try_get("shipping_address")?)?;
    let payment_method: PaymentMethod = serde_json::from_value(serde_json::Value::String(
        row.try_get::<String, _>("payment_method")?,
    ))?;
    let status: OrderStatus = serde_json::from_value(serde_json::Value::String(
        row.try_get::<String, _>("status")?,
    ))?;

    Ok(Order {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        items,
        shipping_address,
        payment_method,
        status,
        shipping_price: Money::from_cents(row.try_get("shipping_price_cents")?),
        tax_price: Money::from_cents(row.try_get("tax_price_cents")?),
        total_price: Money::from_cents(row.try_get("total_price_cents")?),
        is_paid: row.try_get("is_paid")?,
        paid_at: row.try_get("paid_at")?,
        is_delivered: row.try_get("is_delivered")?,
        delivered_at: row.try_get("delivered_at")?,
        tracking_number: row.try_get("tracking_number")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

async fn fetch_user<'e>(executor: impl PgExecutor<'e>, id: UserId) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, name, email, is_admin, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id.as_uuid())
    .fetch_optional(executor)
    .await?;

    row.map(row_to_user).transpose()
}

async fn fetch_book<'e>(executor: impl PgExecutor<'e>, id: BookId) -> Result<Option<Book>> {
    let row = sqlx::query(
        r#"
        SELECT id, isbn, title, author, price_cents, discount_percent, quantity,
               created_at, updated_at
        FROM books
        WHERE id = $1
        "#,
    )
    .bind(id.as_uuid())
    .fetch_optional(executor)
    .await?;

    row.map(row_to_book).transpose()
}

async fn fetch_order<'e>(executor: impl PgExecutor<'e>, id: OrderId) -> Result<Option<Order>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, items, shipping_address, payment_method, status,
               shipping_price_cents, tax_price_cents, total_price_cents,
               is_paid, paid_at, is_delivered, delivered_at, tracking_number,
               created_at, updated_at
        FROM orders
        WHERE id = $1
        "#,
    )
    .bind(id.as_uuid())
    .fetch_optional(executor)
    .await?;

    row.map(row_to_order).transpose()
}

#[async_trait]
impl BookstoreStore for PostgresStore {
    type Session = PostgresSession;

    async fn begin(&self) -> Result<PostgresSession> {
        let tx = self.pool.begin().await?;
        Ok(PostgresSession { tx })
    }

    async fn get_book(&self, id: BookId) -> Result<Option<Book>> {
        fetch_book(&self.pool, id).await
    }

    async fn get_book_by_isbn(&self, isbn: &str) -> Result<Option<Book>> {
        let row = sqlx::query(
            r#"
            SELECT id, isbn, title, author, price_cents, discount_percent, quantity,
                   created_at, updated_at
            FROM books
            WHERE isbn = $1
            "#,
        )
        .bind(isbn)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_book).transpose()
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        fetch_user(&self.pool, id).await
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        fetch_order(&self.pool, id).await
    }
}

/// One open PostgreSQL transaction.
pub struct PostgresSession {
    tx: sqlx::Transaction<'static, sqlx::Postgres>,
}

#[async_trait]
impl StoreSession for PostgresSession {
    async fn find_user(&mut self, id: UserId) -> Result<Option<User>> {
        fetch_user(&mut *self.tx, id).await
    }

    async fn find_book(&mut self, id: BookId) -> Result<Option<Book>> {
        fetch_book(&mut *self.tx, id).await
    }

    async fn find_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        fetch_order(&mut *self.tx, id).await
    }

    async fn insert_user(&mut self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, is_admin, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.is_admin)
        .bind(user.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::DuplicateDocument {
                    collection: "users",
                    id: user.id.to_string(),
                };
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn insert_book(&mut self, book: &Book) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO books (id, isbn, title, author, price_cents, discount_percent,
                               quantity, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(book.id.as_uuid())
        .bind(&book.isbn)
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.price.cents())
        .bind(i16::from(book.discount_percent))
        .bind(i64::from(book.quantity))
        .bind(book.created_at)
        .bind(book.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::DuplicateDocument {
                    collection: "books",
                    id: book.id.to_string(),
                };
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        let items = serde_json::to_value(&order.items)?;
        let shipping_address = serde_json::to_value(&order.shipping_address)?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, items, shipping_address, payment_method, status,
                                shipping_price_cents, tax_price_cents, total_price_cents,
                                is_paid, paid_at, is_delivered, delivered_at, tracking_number,
                                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(items)
        .bind(shipping_address)
        .bind(order.payment_method.as_str())
        .bind(order.status.as_str())
        .bind(order.shipping_price.cents())
        .bind(order.tax_price.cents())
        .bind(order.total_price.cents())
        .bind(order.is_paid)
        .bind(order.paid_at)
        .bind(order.is_delivered)
        .bind(order.delivered_at)
        .bind(order.tracking_number.as_deref())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return StoreError::DuplicateDocument {
                    collection: "orders",
                    id: order.id.to_string(),
                };
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn reserve_stock(&mut self, id: BookId, amount: u32) -> Result<Option<Book>> {
        // No INTEGER stock level can satisfy a request beyond i32::MAX,
        // and the raw u32 must never wrap through the bind.
        let Ok(amount) = i32::try_from(amount) else {
            return Ok(None);
        };

        let row = sqlx::query(
            r#"
            UPDATE books
            SET quantity = quantity - $2, updated_at = NOW()
            WHERE id = $1 AND quantity >= $2
            RETURNING id, isbn, title, author, price_cents, discount_percent, quantity,
                      created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(amount)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_book).transpose()
    }

    async fn restore_stock(&mut self, id: BookId, amount: u32) -> Result<()> {
        // BIGINT bind: the column's assignment cast rejects a result
        // that no longer fits INTEGER instead of wrapping it.
        sqlx::query(
            r#"
            UPDATE books
            SET quantity = quantity + $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(i64::from(amount))
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn update_book_pricing(
        &mut self,
        id: BookId,
        price: Money,
        discount_percent: u8,
    ) -> Result<()> {
        if price.is_negative() {
            return Err(StoreError::Domain(DomainError::NegativePrice { price }));
        }
        if discount_percent > 100 {
            return Err(StoreError::Domain(DomainError::InvalidDiscount {
                discount_percent,
            }));
        }

        sqlx::query(
            r#"
            UPDATE books
            SET price_cents = $2, discount_percent = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(price.cents())
        .bind(i16::from(discount_percent))
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn transition_order_status(
        &mut self,
        id: OrderId,
        allowed_from: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<Option<Order>> {
        let allowed: Vec<String> = allowed_from.iter().map(|s| s.as_str().to_string()).collect();

        let row = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2,
                is_delivered = CASE WHEN $2 = 'Delivered' THEN TRUE ELSE is_delivered END,
                delivered_at = CASE WHEN $2 = 'Delivered' THEN NOW() ELSE delivered_at END,
                updated_at = NOW()
            WHERE id = $1 AND status = ANY($3)
            RETURNING id, user_id, items, shipping_address, payment_method, status,
                      shipping_price_cents, tax_price_cents, total_price_cents,
                      is_paid, paid_at, is_delivered, delivered_at, tracking_number,
                      created_at, updated_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(to.as_str())
        .bind(allowed)
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(row_to_order).transpose()
    }

    async fn set_order_tracking(&mut self, id: OrderId, tracking_number: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET tracking_number = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(tracking_number)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn set_order_paid(&mut self, id: OrderId, paid_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET is_paid = TRUE, paid_at = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(paid_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn abort(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
