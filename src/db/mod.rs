pub mod errors;
pub mod memory;
pub mod models;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};

pub use errors::{DbError, Result};
use models::{
    ContactMessage, Entity, Experience, NewContactMessage, NewSession, Project, Session,
    SettingsUpdate, SiteSettings, Skill, SocialLink, Testimonial, User,
};

/// `DATABASE_URL` prefix selecting the in-process store.
pub const MEMORY_URL_PREFIX: &str = "memory:";

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// CRUD access to one content table.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// All rows in the entity's display order.
    async fn list(&self) -> Result<Vec<E>>;

    async fn get(&self, id: i32) -> Result<Option<E>>;

    /// Insert a row and return its id.
    async fn create(&self, input: &E::Input) -> Result<i32>;

    /// Overwrite a row. Returns `false` if no row has this id.
    async fn update(&self, id: i32, input: &E::Input) -> Result<bool>;

    /// Returns `false` if no row has this id.
    async fn delete(&self, id: i32) -> Result<bool>;

    async fn count(&self) -> Result<i64>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// All messages, newest first.
    async fn list(&self) -> Result<Vec<ContactMessage>>;

    async fn get(&self, id: i32) -> Result<Option<ContactMessage>>;

    async fn create(&self, message: &NewContactMessage) -> Result<i32>;

    /// Flip an unread message to read and return the stored row.
    async fn mark_read(&self, id: i32) -> Result<Option<ContactMessage>>;

    async fn delete(&self, id: i32) -> Result<bool>;

    async fn count(&self) -> Result<i64>;

    async fn count_unread(&self) -> Result<i64>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Fetch the settings row, inserting defaults if it does not exist yet.
    async fn get_or_create(&self) -> Result<SiteSettings>;

    async fn update(&self, update: &SettingsUpdate) -> Result<SiteSettings>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn get(&self, id: i32) -> Result<Option<User>>;

    async fn create(&self, username: &str, password_hash: &str) -> Result<User>;

    /// Returns `false` if the user does not exist.
    async fn set_password(&self, username: &str, password_hash: &str) -> Result<bool>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &NewSession) -> Result<()>;

    /// Session with this token hash that has not expired at `now`.
    async fn find_active(&self, token_hash: &str, now: DateTime<Utc>) -> Result<Option<Session>>;

    async fn delete(&self, token_hash: &str) -> Result<bool>;

    /// Remove sessions that expired before `now`; returns how many were removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// Persistence layer handed to request handlers through the application state.
#[async_trait]
pub trait Store: Send + Sync {
    fn projects(&self) -> &dyn Repository<Project>;
    fn skills(&self) -> &dyn Repository<Skill>;
    fn testimonials(&self) -> &dyn Repository<Testimonial>;
    fn experiences(&self) -> &dyn Repository<Experience>;
    fn social_links(&self) -> &dyn Repository<SocialLink>;
    fn messages(&self) -> &dyn MessageRepository;
    fn settings(&self) -> &dyn SettingsRepository;
    fn users(&self) -> &dyn UserRepository;
    fn sessions(&self) -> &dyn SessionRepository;

    /// Round-trip to the backend, used by health checks.
    async fn ping(&self) -> Result<std::time::Duration>;
}

pub async fn init_pool(config: &DbConfig) -> std::result::Result<PgPool, sqlx::Error> {
    tracing::info!("Initializing database connection pool...");
    tracing::debug!(
        "Database URL: {}",
        config.url.replace(
            |c: char| !c.is_ascii_alphanumeric() && c != ':' && c != '/' && c != '@' && c != '.',
            "*"
        )
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(std::time::Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(std::time::Duration::from_secs(1800))
        .test_before_acquire(true)
        .connect(&config.url)
        .await?;

    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    tracing::info!("Database connection pool initialized successfully");

    Ok(pool)
}

/// Open the store named by `config.url`, running migrations for Postgres.
pub async fn connect(config: &DbConfig) -> std::result::Result<Arc<dyn Store>, sqlx::Error> {
    if config.url.starts_with(MEMORY_URL_PREFIX) {
        tracing::warn!("Using in-memory store; content is lost on restart");
        return Ok(Arc::new(memory::MemoryStore::new()));
    }

    let pool = init_pool(config).await?;
    run_migrations(&pool).await?;
    Ok(Arc::new(postgres::PgStore::new(pool)))
}

pub async fn run_migrations(pool: &PgPool) -> std::result::Result<(), sqlx::Error> {
    tracing::info!("Running database migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id SERIAL PRIMARY KEY,
            username VARCHAR(80) UNIQUE NOT NULL,
            password_hash VARCHAR(255) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token_hash TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            expires_at TIMESTAMPTZ NOT NULL
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id SERIAL PRIMARY KEY,
            title VARCHAR(200) NOT NULL,
            description TEXT NOT NULL,
            image VARCHAR(255),
            technologies VARCHAR(500),
            link VARCHAR(255),
            display_order INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS skills (
            id SERIAL PRIMARY KEY,
            name VARCHAR(100) NOT NULL,
            category VARCHAR(100),
            proficiency INTEGER NOT NULL DEFAULT 50
                CHECK (proficiency BETWEEN 0 AND 100),
            display_order INTEGER NOT NULL DEFAULT 0
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS testimonials (
            id SERIAL PRIMARY KEY,
            name VARCHAR(100) NOT NULL,
            role VARCHAR(150),
            company VARCHAR(150),
            message TEXT NOT NULL,
            display_order INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS experiences (
            id SERIAL PRIMARY KEY,
            title VARCHAR(200) NOT NULL,
            company VARCHAR(200) NOT NULL,
            location VARCHAR(200),
            start_date VARCHAR(50) NOT NULL,
            end_date VARCHAR(50),
            description TEXT NOT NULL,
            display_order INTEGER NOT NULL DEFAULT 0
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contact_messages (
            id SERIAL PRIMARY KEY,
            name VARCHAR(100) NOT NULL,
            email VARCHAR(120) NOT NULL,
            subject VARCHAR(200) NOT NULL,
            message TEXT NOT NULL,
            status VARCHAR(20) NOT NULL DEFAULT 'unread'
                CHECK (status IN ('unread', 'read')),
            received_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_contact_messages_received_at \
         ON contact_messages(received_at DESC)",
    )
    .execute(pool)
    .await?;

    // The CHECK on id makes a second settings row impossible.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS site_settings (
            id INTEGER PRIMARY KEY DEFAULT 1 CHECK (id = 1),
            header_title VARCHAR(100) NOT NULL,
            page_title VARCHAR(200) NOT NULL,
            profile_name VARCHAR(100) NOT NULL,
            position VARCHAR(200),
            profile_image VARCHAR(255),
            tagline VARCHAR(200) NOT NULL,
            about_me TEXT,
            cv_filename VARCHAR(255),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
    "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS social_links (
            id SERIAL PRIMARY KEY,
            platform VARCHAR(50) NOT NULL,
            url VARCHAR(500) NOT NULL,
            icon_class VARCHAR(100) NOT NULL,
            display_order INTEGER NOT NULL DEFAULT 0
        )
    "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> DbConfig {
        DbConfig {
            url: url.to_string(),
            max_connections: 1,
            min_connections: 0,
            connect_timeout_secs: 1,
            idle_timeout_secs: 1,
        }
    }

    #[tokio::test]
    async fn test_connect_memory_url_uses_memory_store() {
        let store = connect(&config("memory://")).await.unwrap();
        assert!(store.ping().await.is_ok());
        assert_eq!(store.projects().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_connect_invalid_url_fails() {
        assert!(connect(&config("not-a-database-url")).await.is_err());
    }
}
