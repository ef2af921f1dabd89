//! In-process store selected with `DATABASE_URL=memory://`.
//!
//! Used for local demo runs without Postgres and by the test suite. Each table is a
//! `BTreeMap` behind a tokio `RwLock`; every operation takes the lock once, so single
//! calls are atomic just like single statements in Postgres.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::errors::{DbError, Result};
use super::models::{
    ContactMessage, Entity, Experience, MessageStatus, NewContactMessage, NewSession, Project,
    Session, SettingsUpdate, SiteSettings, Skill, SocialLink, Testimonial, User,
};
use super::{
    MessageRepository, Repository, SessionRepository, SettingsRepository, Store, UserRepository,
};

/// Monotonic id source, like a SERIAL column.
#[derive(Debug)]
struct Sequence(AtomicI32);

impl Sequence {
    fn new() -> Self {
        Self(AtomicI32::new(1))
    }

    fn next(&self) -> i32 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MemoryRepository<E> {
    rows: RwLock<BTreeMap<i32, E>>,
    ids: Sequence,
}

impl<E> MemoryRepository<E> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            ids: Sequence::new(),
        }
    }
}

impl<E> Default for MemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for MemoryRepository<E> {
    async fn list(&self) -> Result<Vec<E>> {
        let mut rows: Vec<E> = self.rows.read().await.values().cloned().collect();
        rows.sort_by(E::list_order);
        Ok(rows)
    }

    async fn get(&self, id: i32) -> Result<Option<E>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn create(&self, input: &E::Input) -> Result<i32> {
        let id = self.ids.next();
        let row = E::from_input(id, input, Utc::now());
        self.rows.write().await.insert(id, row);
        Ok(id)
    }

    async fn update(&self, id: i32, input: &E::Input) -> Result<bool> {
        match self.rows.write().await.get_mut(&id) {
            Some(row) => {
                row.apply(input);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: i32) -> Result<bool> {
        Ok(self.rows.write().await.remove(&id).is_some())
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.rows.read().await.len() as i64)
    }
}

#[derive(Default)]
pub struct MemoryMessages {
    rows: RwLock<BTreeMap<i32, ContactMessage>>,
    ids: Sequence,
}

#[async_trait]
impl MessageRepository for MemoryMessages {
    async fn list(&self) -> Result<Vec<ContactMessage>> {
        let mut rows: Vec<ContactMessage> = self.rows.read().await.values().cloned().collect();
        rows.sort_by(|a, b| {
            b.received_at
                .cmp(&a.received_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(rows)
    }

    async fn get(&self, id: i32) -> Result<Option<ContactMessage>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn create(&self, message: &NewContactMessage) -> Result<i32> {
        let id = self.ids.next();
        let row = ContactMessage {
            id,
            name: message.name.clone(),
            email: message.email.clone(),
            subject: message.subject.clone(),
            message: message.message.clone(),
            status: MessageStatus::Unread,
            received_at: Utc::now(),
        };
        self.rows.write().await.insert(id, row);
        Ok(id)
    }

    async fn mark_read(&self, id: i32) -> Result<Option<ContactMessage>> {
        let mut rows = self.rows.write().await;
        Ok(rows.get_mut(&id).map(|row| {
            row.status = MessageStatus::Read;
            row.clone()
        }))
    }

    async fn delete(&self, id: i32) -> Result<bool> {
        Ok(self.rows.write().await.remove(&id).is_some())
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.rows.read().await.len() as i64)
    }

    async fn count_unread(&self) -> Result<i64> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .filter(|m| m.status == MessageStatus::Unread)
            .count() as i64)
    }
}

#[derive(Default)]
pub struct MemorySettings {
    row: RwLock<Option<SiteSettings>>,
}

#[async_trait]
impl SettingsRepository for MemorySettings {
    async fn get_or_create(&self) -> Result<SiteSettings> {
        let mut row = self.row.write().await;
        Ok(row
            .get_or_insert_with(|| SiteSettings::with_defaults(Utc::now()))
            .clone())
    }

    async fn update(&self, update: &SettingsUpdate) -> Result<SiteSettings> {
        let mut row = self.row.write().await;
        let settings = row.get_or_insert_with(|| SiteSettings::with_defaults(Utc::now()));

        settings.header_title = update.header_title.clone();
        settings.page_title = update.page_title.clone();
        settings.profile_name = update.profile_name.clone();
        settings.position = update.position.clone();
        settings.tagline = update.tagline.clone();
        settings.about_me = update.about_me.clone();
        if let Some(image) = &update.profile_image {
            settings.profile_image = Some(image.clone());
        }
        if let Some(cv) = &update.cv_filename {
            settings.cv_filename = Some(cv.clone());
        }
        settings.updated_at = Utc::now();

        Ok(settings.clone())
    }
}

#[derive(Default)]
pub struct MemoryUsers {
    rows: RwLock<BTreeMap<i32, User>>,
    ids: Sequence,
}

#[async_trait]
impl UserRepository for MemoryUsers {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn get(&self, id: i32) -> Result<Option<User>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn create(&self, username: &str, password_hash: &str) -> Result<User> {
        let mut rows = self.rows.write().await;
        if rows.values().any(|u| u.username == username) {
            return Err(DbError::UniqueViolation {
                constraint: "users_username_key".to_string(),
            });
        }

        let user = User {
            id: self.ids.next(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn set_password(&self, username: &str, password_hash: &str) -> Result<bool> {
        let mut rows = self.rows.write().await;
        match rows.values_mut().find(|u| u.username == username) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct MemorySessions {
    rows: RwLock<BTreeMap<String, Session>>,
}

#[async_trait]
impl SessionRepository for MemorySessions {
    async fn create(&self, session: &NewSession) -> Result<()> {
        let row = Session {
            token_hash: session.token_hash.clone(),
            user_id: session.user_id,
            created_at: Utc::now(),
            expires_at: session.expires_at,
        };
        self.rows
            .write()
            .await
            .insert(session.token_hash.clone(), row);
        Ok(())
    }

    async fn find_active(&self, token_hash: &str, now: DateTime<Utc>) -> Result<Option<Session>> {
        Ok(self
            .rows
            .read()
            .await
            .get(token_hash)
            .filter(|s| s.expires_at > now)
            .cloned())
    }

    async fn delete(&self, token_hash: &str) -> Result<bool> {
        Ok(self.rows.write().await.remove(token_hash).is_some())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, s| s.expires_at > now);
        Ok((before - rows.len()) as u64)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    projects: MemoryRepository<Project>,
    skills: MemoryRepository<Skill>,
    testimonials: MemoryRepository<Testimonial>,
    experiences: MemoryRepository<Experience>,
    social_links: MemoryRepository<SocialLink>,
    messages: MemoryMessages,
    settings: MemorySettings,
    users: MemoryUsers,
    sessions: MemorySessions,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
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
        Ok(std::time::Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{NewProject, NewSkill};
    use chrono::Duration;

    fn new_skill(name: &str, category: Option<&str>) -> NewSkill {
        NewSkill {
            name: name.to_string(),
            category: category.map(str::to_string),
            proficiency: 80,
            display_order: 0,
        }
    }

    #[tokio::test]
    async fn test_repository_crud_cycle() {
        let store = MemoryStore::new();
        let repo = store.skills();

        let id = repo.create(&new_skill("Rust", Some("Lang"))).await.unwrap();
        assert_eq!(repo.get(id).await.unwrap().unwrap().name, "Rust");

        assert!(repo.update(id, &new_skill("Go", None)).await.unwrap());
        let updated = repo.get(id).await.unwrap().unwrap();
        assert_eq!(updated.name, "Go");
        assert!(updated.category.is_none());

        assert!(repo.delete(id).await.unwrap());
        assert!(!repo.delete(id).await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_missing_row_reports_false() {
        let store = MemoryStore::new();
        let input = NewProject {
            title: "x".to_string(),
            description: "y".to_string(),
            image: None,
            technologies: None,
            link: None,
            display_order: 0,
        };
        assert!(!store.projects().update(42, &input).await.unwrap());
    }

    #[tokio::test]
    async fn test_ids_are_not_reused_after_delete() {
        let store = MemoryStore::new();
        let first = store.skills().create(&new_skill("A", None)).await.unwrap();
        store.skills().delete(first).await.unwrap();
        let second = store.skills().create(&new_skill("B", None)).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_settings_singleton_created_once() {
        let store = MemoryStore::new();
        let first = store.settings().get_or_create().await.unwrap();
        let second = store.settings().get_or_create().await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.updated_at, second.updated_at);
    }

    #[tokio::test]
    async fn test_settings_update_keeps_files_when_not_replaced() {
        let store = MemoryStore::new();
        let mut update = SettingsUpdate {
            header_title: "H".to_string(),
            page_title: "P".to_string(),
            profile_name: "Jo".to_string(),
            position: None,
            tagline: "T".to_string(),
            about_me: None,
            profile_image: Some("/uploads/images/1_me.png".to_string()),
            cv_filename: None,
        };
        store.settings().update(&update).await.unwrap();

        update.profile_image = None;
        update.profile_name = "Joanne".to_string();
        let settings = store.settings().update(&update).await.unwrap();
        assert_eq!(settings.profile_name, "Joanne");
        assert_eq!(
            settings.profile_image.as_deref(),
            Some("/uploads/images/1_me.png")
        );
    }

    #[tokio::test]
    async fn test_duplicate_username_is_unique_violation() {
        let store = MemoryStore::new();
        store.users().create("admin", "hash").await.unwrap();
        let err = store.users().create("admin", "other").await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_expired_sessions_are_not_active() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .sessions()
            .create(&NewSession {
                token_hash: "old".to_string(),
                user_id: 1,
                expires_at: now - Duration::minutes(1),
            })
            .await
            .unwrap();
        store
            .sessions()
            .create(&NewSession {
                token_hash: "fresh".to_string(),
                user_id: 1,
                expires_at: now + Duration::hours(1),
            })
            .await
            .unwrap();

        assert!(store.sessions().find_active("old", now).await.unwrap().is_none());
        assert!(store.sessions().find_active("fresh", now).await.unwrap().is_some());
        assert_eq!(store.sessions().purge_expired(now).await.unwrap(), 1);
    }
}
