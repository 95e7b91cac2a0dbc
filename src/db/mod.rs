use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{NewProduct, Product, ProductRow};

/// Persistence capabilities the product service is built on.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Every stored product, in whatever order the store yields them.
    async fn list_all(&self) -> AppResult<Vec<Product>>;

    /// The first product in store order, without loading the rest.
    async fn first(&self) -> AppResult<Option<Product>>;

    async fn get_by_id(&self, id: i64) -> AppResult<Option<Product>>;

    /// Persist a new product; the store assigns the id.
    async fn insert(
        &self,
        product: &NewProduct,
        created_at: DateTime<Utc>,
    ) -> AppResult<Product>;

    /// Write the mutable fields of an existing product. `created_at` is never touched.
    async fn update(&self, product: &Product) -> AppResult<Product>;
}

pub async fn connect(config: &Config) -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

fn decode_row(row: ProductRow) -> AppResult<Product> {
    Product::try_from(row)
        .map_err(|e| AppError::StoreUnavailable(sqlx::Error::Decode(Box::new(e))))
}

/// `ProductRepository` backed by an SQLite pool.
#[derive(Clone)]
pub struct SqliteProductStore {
    pool: SqlitePool, // cheap to clone
}

impl SqliteProductStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductRepository for SqliteProductStore {
    async fn list_all(&self) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, description, price_cents, is_available, created_at
             FROM products",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(decode_row).collect()
    }

    async fn first(&self) -> AppResult<Option<Product>> {
        sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, description, price_cents, is_available, created_at
             FROM products LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?
        .map(decode_row)
        .transpose()
    }

    async fn get_by_id(&self, id: i64) -> AppResult<Option<Product>> {
        sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, description, price_cents, is_available, created_at
             FROM products WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(decode_row)
        .transpose()
    }

    async fn insert(
        &self,
        product: &NewProduct,
        created_at: DateTime<Utc>,
    ) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            INSERT INTO products (name, description, price_cents, is_available, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id, name, description, price_cents, is_available, created_at
            "#,
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(product.is_available)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        decode_row(row)
    }

    async fn update(&self, product: &Product) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            UPDATE products
            SET name         = ?,
                description  = ?,
                price_cents  = ?,
                is_available = ?
            WHERE id = ?
            RETURNING id, name, description, price_cents, is_available, created_at
            "#,
        )
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.cents())
        .bind(product.is_available)
        .bind(product.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {} not found", product.id)))?;

        decode_row(row)
    }
}

/// Fresh in-memory store with the schema applied.
#[cfg(test)]
pub async fn memory_pool() -> SqlitePool {
    // One connection that never recycles: each in-memory connection is its own database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    migrate(&pool).await.unwrap();
    pool
}
