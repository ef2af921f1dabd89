//! PostgreSQL implementation of the store traits.

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    postgres::{PgArguments, PgRow},
    Arguments, FromRow, PgPool,
};

use super::errors::{DbError, Result};
use super::models::{
    ContactMessage, Entity, Experience, MessageStatus, NewContactMessage, NewSession, Project,
    Session, SettingsUpdate, SiteSettings, Skill, SocialLink, Testimonial, User, SETTINGS_ROW_ID,
};
use super::{
    MessageRepository, Repository, SessionRepository, SettingsRepository, Store, UserRepository,
};

/// Table layout of an entity stored in Postgres.
pub trait PgEntity: Entity + for<'r> FromRow<'r, PgRow> {
    const TABLE: &'static str;
    /// Select list, including `id`.
    const COLUMNS: &'static str;
    /// Columns written from `Entity::Input`, in the order `encode_input` binds them.
    const INPUT_COLUMNS: &'static [&'static str];
    /// Must match `Entity::list_order`.
    const ORDER_BY: &'static str;

    fn encode_input(input: &Self::Input, args: &mut PgArguments) -> Result<()>;
}

fn add<'q, T>(args: &mut PgArguments, value: T) -> Result<()>
where
    T: 'q + sqlx::Encode<'q, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    args.add(value).map_err(|e| DbError::Encode(e.to_string()))
}

impl PgEntity for Project {
    const TABLE: &'static str = "projects";
    const COLUMNS: &'static str =
        "id, title, description, image, technologies, link, display_order, created_at";
    const INPUT_COLUMNS: &'static [&'static str] = &[
        "title",
        "description",
        "image",
        "technologies",
        "link",
        "display_order",
    ];
    const ORDER_BY: &'static str = "display_order ASC, created_at DESC, id DESC";

    fn encode_input(input: &Self::Input, args: &mut PgArguments) -> Result<()> {
        add(args, input.title.clone())?;
        add(args, input.description.clone())?;
        add(args, input.image.clone())?;
        add(args, input.technologies.clone())?;
        add(args, input.link.clone())?;
        add(args, input.display_order)
    }
}

impl PgEntity for Skill {
    const TABLE: &'static str = "skills";
    const COLUMNS: &'static str = "id, name, category, proficiency, display_order";
    const INPUT_COLUMNS: &'static [&'static str] =
        &["name", "category", "proficiency", "display_order"];
    const ORDER_BY: &'static str = "category ASC NULLS LAST, display_order ASC, id ASC";

    fn encode_input(input: &Self::Input, args: &mut PgArguments) -> Result<()> {
        add(args, input.name.clone())?;
        add(args, input.category.clone())?;
        add(args, input.proficiency)?;
        add(args, input.display_order)
    }
}

impl PgEntity for Testimonial {
    const TABLE: &'static str = "testimonials";
    const COLUMNS: &'static str = "id, name, role, company, message, display_order, created_at";
    const INPUT_COLUMNS: &'static [&'static str] =
        &["name", "role", "company", "message", "display_order"];
    const ORDER_BY: &'static str = "display_order ASC, created_at DESC, id DESC";

    fn encode_input(input: &Self::Input, args: &mut PgArguments) -> Result<()> {
        add(args, input.name.clone())?;
        add(args, input.role.clone())?;
        add(args, input.company.clone())?;
        add(args, input.message.clone())?;
        add(args, input.display_order)
    }
}

impl PgEntity for Experience {
    const TABLE: &'static str = "experiences";
    const COLUMNS: &'static str =
        "id, title, company, location, start_date, end_date, description, display_order";
    const INPUT_COLUMNS: &'static [&'static str] = &[
        "title",
        "company",
        "location",
        "start_date",
        "end_date",
        "description",
        "display_order",
    ];
    const ORDER_BY: &'static str = "display_order ASC, id DESC";

    fn encode_input(input: &Self::Input, args: &mut PgArguments) -> Result<()> {
        add(args, input.title.clone())?;
        add(args, input.company.clone())?;
        add(args, input.location.clone())?;
        add(args, input.start_date.clone())?;
        add(args, input.end_date.clone())?;
        add(args, input.description.clone())?;
        add(args, input.display_order)
    }
}

impl PgEntity for SocialLink {
    const TABLE: &'static str = "social_links";
    const COLUMNS: &'static str = "id, platform, url, icon_class, display_order";
    const INPUT_COLUMNS: &'static [&'static str] =
        &["platform", "url", "icon_class", "display_order"];
    const ORDER_BY: &'static str = "display_order ASC, id ASC";

    fn encode_input(input: &Self::Input, args: &mut PgArguments) -> Result<()> {
        add(args, input.platform.clone())?;
        add(args, input.url.clone())?;
        add(args, input.icon_class.clone())?;
        add(args, input.display_order)
    }
}

/// Generic single-table repository driven by `PgEntity` metadata.
pub struct PgRepository<E> {
    pool: PgPool,
    _entity: PhantomData<fn() -> E>,
}

impl<E> PgRepository<E> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<E: PgEntity> Repository<E> for PgRepository<E> {
    async fn list(&self) -> Result<Vec<E>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            E::COLUMNS,
            E::TABLE,
            E::ORDER_BY
        );
        Ok(sqlx::query_as::<_, E>(&sql).fetch_all(&self.pool).await?)
    }

    async fn get(&self, id: i32) -> Result<Option<E>> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", E::COLUMNS, E::TABLE);
        Ok(sqlx::query_as::<_, E>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create(&self, input: &E::Input) -> Result<i32> {
        let mut args = PgArguments::default();
        E::encode_input(input, &mut args)?;

        let placeholders: Vec<String> = (1..=E::INPUT_COLUMNS.len())
            .map(|i| format!("${}", i))
            .collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING id",
            E::TABLE,
            E::INPUT_COLUMNS.join(", "),
            placeholders.join(", ")
        );

        Ok(sqlx::query_scalar_with::<_, i32, _>(&sql, args)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update(&self, id: i32, input: &E::Input) -> Result<bool> {
        let mut args = PgArguments::default();
        E::encode_input(input, &mut args)?;
        add(&mut args, id)?;

        let assignments: Vec<String> = E::INPUT_COLUMNS
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = ${}", column, i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ${}",
            E::TABLE,
            assignments.join(", "),
            E::INPUT_COLUMNS.len() + 1
        );

        let result = sqlx::query_with(&sql, args).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i32) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE id = $1", E::TABLE);
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", E::TABLE);
        Ok(sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&self.pool)
            .await?)
    }
}

const MESSAGE_COLUMNS: &str = "id, name, email, subject, message, status, received_at";

pub struct PgMessages {
    pool: PgPool,
}

#[async_trait]
impl MessageRepository for PgMessages {
    async fn list(&self) -> Result<Vec<ContactMessage>> {
        let sql = format!(
            "SELECT {} FROM contact_messages ORDER BY received_at DESC, id DESC",
            MESSAGE_COLUMNS
        );
        Ok(sqlx::query_as::<_, ContactMessage>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get(&self, id: i32) -> Result<Option<ContactMessage>> {
        let sql = format!("SELECT {} FROM contact_messages WHERE id = $1", MESSAGE_COLUMNS);
        Ok(sqlx::query_as::<_, ContactMessage>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create(&self, message: &NewContactMessage) -> Result<i32> {
        Ok(sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO contact_messages (name, email, subject, message, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&message.name)
        .bind(&message.email)
        .bind(&message.subject)
        .bind(&message.message)
        .bind(MessageStatus::Unread.as_str())
        .fetch_one(&self.pool)
        .await?)
    }

    async fn mark_read(&self, id: i32) -> Result<Option<ContactMessage>> {
        // Only touches unread rows, so repeated views do not rewrite the row.
        sqlx::query("UPDATE contact_messages SET status = $1 WHERE id = $2 AND status = $3")
            .bind(MessageStatus::Read.as_str())
            .bind(id)
            .bind(MessageStatus::Unread.as_str())
            .execute(&self.pool)
            .await?;
        self.get(id).await
    }

    async fn delete(&self, id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM contact_messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM contact_messages")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn count_unread(&self) -> Result<i64> {
        Ok(
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM contact_messages WHERE status = $1")
                .bind(MessageStatus::Unread.as_str())
                .fetch_one(&self.pool)
                .await?,
        )
    }
}

const SETTINGS_COLUMNS: &str = "id, header_title, page_title, profile_name, position, \
     profile_image, tagline, about_me, cv_filename, updated_at";

pub struct PgSettings {
    pool: PgPool,
}

#[async_trait]
impl SettingsRepository for PgSettings {
    async fn get_or_create(&self) -> Result<SiteSettings> {
        let defaults = SiteSettings::with_defaults(Utc::now());

        // Concurrent first reads both attempt the insert; the primary key keeps one row.
        sqlx::query(
            r#"
            INSERT INTO site_settings
                (id, header_title, page_title, profile_name, position, tagline)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(SETTINGS_ROW_ID)
        .bind(&defaults.header_title)
        .bind(&defaults.page_title)
        .bind(&defaults.profile_name)
        .bind(&defaults.position)
        .bind(&defaults.tagline)
        .execute(&self.pool)
        .await?;

        let sql = format!("SELECT {} FROM site_settings WHERE id = $1", SETTINGS_COLUMNS);
        Ok(sqlx::query_as::<_, SiteSettings>(&sql)
            .bind(SETTINGS_ROW_ID)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update(&self, update: &SettingsUpdate) -> Result<SiteSettings> {
        self.get_or_create().await?;

        let sql = format!(
            r#"
            UPDATE site_settings
            SET header_title = $1, page_title = $2, profile_name = $3, position = $4,
                tagline = $5, about_me = $6,
                profile_image = COALESCE($7, profile_image),
                cv_filename = COALESCE($8, cv_filename),
                updated_at = now()
            WHERE id = $9
            RETURNING {}
            "#,
            SETTINGS_COLUMNS
        );

        Ok(sqlx::query_as::<_, SiteSettings>(&sql)
            .bind(&update.header_title)
            .bind(&update.page_title)
            .bind(&update.profile_name)
            .bind(&update.position)
            .bind(&update.tagline)
            .bind(&update.about_me)
            .bind(&update.profile_image)
            .bind(&update.cv_filename)
            .bind(SETTINGS_ROW_ID)
            .fetch_one(&self.pool)
            .await?)
    }
}

pub struct PgUsers {
    pool: PgPool,
}

#[async_trait]
impl UserRepository for PgUsers {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn get(&self, id: i32) -> Result<Option<User>> {
        Ok(sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create(&self, username: &str, password_hash: &str) -> Result<User> {
        Ok(sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES ($1, $2)
            RETURNING id, username, password_hash, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn set_password(&self, username: &str, password_hash: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE username = $2")
            .bind(password_hash)
            .bind(username)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

pub struct PgSessions {
    pool: PgPool,
}

#[async_trait]
impl SessionRepository for PgSessions {
    async fn create(&self, session: &NewSession) -> Result<()> {
        sqlx::query("INSERT INTO sessions (token_hash, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&session.token_hash)
            .bind(session.user_id)
            .bind(session.expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_active(&self, token_hash: &str, now: DateTime<Utc>) -> Result<Option<Session>> {
        Ok(sqlx::query_as::<_, Session>(
            r#"
            SELECT token_hash, user_id, created_at, expires_at
            FROM sessions
            WHERE token_hash = $1 AND expires_at > $2
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete(&self, token_hash: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

pub struct PgStore {
    pool: PgPool,
    projects: PgRepository<Project>,
    skills: PgRepository<Skill>,
    testimonials: PgRepository<Testimonial>,
    experiences: PgRepository<Experience>,
    social_links: PgRepository<SocialLink>,
    messages: PgMessages,
    settings: PgSettings,
    users: PgUsers,
    sessions: PgSessions,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            projects: PgRepository::new(pool.clone()),
            skills: PgRepository::new(pool.clone()),
            testimonials: PgRepository::new(pool.clone()),
            experiences: PgRepository::new(pool.clone()),
            social_links: PgRepository::new(pool.clone()),
            messages: PgMessages { pool: pool.clone() },
            settings: PgSettings { pool: pool.clone() },
            users: PgUsers { pool: pool.clone() },
            sessions: PgSessions { pool: pool.clone() },
            pool,
        }
    }
}

#[async_trait]
impl Store for PgStore {
    fn projects(&self) -> &dyn Repository<Project> {
        &self.projects
    }

    fn skills(&self) -> &dyn Repository<Skill> {
        &self.skills
    }

    fn testimonials(&self) -> &dyn Repository<Testimonial> {
        &self.testimonials
    }

    fn experiences(&self) -> &dyn Repository<Experience> {
        &self.experiences
    }

    fn social_links(&self) -> &dyn Repository<SocialLink> {
        &self.social_links
    }

    fn messages(&self) -> &dyn MessageRepository {
        &self.messages
    }

    fn settings(&self) -> &dyn SettingsRepository {
        &self.settings
    }

    fn users(&self) -> &dyn UserRepository {
        &self.users
    }

    fn sessions(&self) -> &dyn SessionRepository {
        &self.sessions
    }

    async fn ping(&self) -> Result<std::time::Duration> {
        let start = std::time::Instant::now();
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(start.elapsed())
    }
}
