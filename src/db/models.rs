//! Database Models - structs representing database tables (used by sqlx/serde).

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

/// A table of admin-editable content with integer ids and a display order.
///
/// `list_order` must agree with the `ORDER BY` clause the Postgres store uses for the
/// same table so both backends list rows identically.
pub trait Entity: Clone + Send + Sync + Unpin + 'static {
    /// Validated field values used for both inserts and updates.
    type Input: Send + Sync;

    /// Human readable resource name, used in errors and logs.
    const RESOURCE: &'static str;

    fn id(&self) -> i32;

    fn from_input(id: i32, input: &Self::Input, now: DateTime<Utc>) -> Self;

    /// Overwrite every mutable field with `input`.
    fn apply(&mut self, input: &Self::Input);

    fn list_order(a: &Self, b: &Self) -> Ordering;
}

/// Admin user
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Server-side record of a logged-in browser session
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub token_hash: String,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSession {
    pub token_hash: String,
    pub user_id: i32,
    pub expires_at: DateTime<Utc>,
}

/// Portfolio project
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Project {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub technologies: Option<String>,
    pub link: Option<String>,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub technologies: Option<String>,
    pub link: Option<String>,
    pub display_order: i32,
}

impl Project {
    /// Comma separated technologies, trimmed, without empty entries.
    pub fn technology_list(&self) -> Vec<String> {
        self.technologies
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Entity for Project {
    type Input = NewProject;
    const RESOURCE: &'static str = "Project";

    fn id(&self) -> i32 {
        self.id
    }

    fn from_input(id: i32, input: &NewProject, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: input.title.clone(),
            description: input.description.clone(),
            image: input.image.clone(),
            technologies: input.technologies.clone(),
            link: input.link.clone(),
            display_order: input.display_order,
            created_at: now,
        }
    }

    fn apply(&mut self, input: &NewProject) {
        self.title = input.title.clone();
        self.description = input.description.clone();
        self.image = input.image.clone();
        self.technologies = input.technologies.clone();
        self.link = input.link.clone();
        self.display_order = input.display_order;
    }

    fn list_order(a: &Self, b: &Self) -> Ordering {
        a.display_order
            .cmp(&b.display_order)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| b.id.cmp(&a.id))
    }
}

/// Skill with proficiency percentage
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Skill {
    pub id: i32,
    pub name: String,
    pub category: Option<String>,
    pub proficiency: i32,
    pub display_order: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSkill {
    pub name: String,
    pub category: Option<String>,
    pub proficiency: i32,
    pub display_order: i32,
}

impl Entity for Skill {
    type Input = NewSkill;
    const RESOURCE: &'static str = "Skill";

    fn id(&self) -> i32 {
        self.id
    }

    fn from_input(id: i32, input: &NewSkill, _now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: input.name.clone(),
            category: input.category.clone(),
            proficiency: input.proficiency,
            display_order: input.display_order,
        }
    }

    fn apply(&mut self, input: &NewSkill) {
        self.name = input.name.clone();
        self.category = input.category.clone();
        self.proficiency = input.proficiency;
        self.display_order = input.display_order;
    }

    // Postgres sorts NULL categories last in ascending order.
    fn list_order(a: &Self, b: &Self) -> Ordering {
        a.category
            .is_none()
            .cmp(&b.category.is_none())
            .then_with(|| a.category.cmp(&b.category))
            .then_with(|| a.display_order.cmp(&b.display_order))
            .then_with(|| a.id.cmp(&b.id))
    }
}

/// Client or colleague testimonial
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Testimonial {
    pub id: i32,
    pub name: String,
    pub role: Option<String>,
    pub company: Option<String>,
    pub message: String,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTestimonial {
    pub name: String,
    pub role: Option<String>,
    pub company: Option<String>,
    pub message: String,
    pub display_order: i32,
}

impl Entity for Testimonial {
    type Input = NewTestimonial;
    const RESOURCE: &'static str = "Testimonial";

    fn id(&self) -> i32 {
        self.id
    }

    fn from_input(id: i32, input: &NewTestimonial, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: input.name.clone(),
            role: input.role.clone(),
            company: input.company.clone(),
            message: input.message.clone(),
            display_order: input.display_order,
            created_at: now,
        }
    }

    fn apply(&mut self, input: &NewTestimonial) {
        self.name = input.name.clone();
        self.role = input.role.clone();
        self.company = input.company.clone();
        self.message = input.message.clone();
        self.display_order = input.display_order;
    }

    fn list_order(a: &Self, b: &Self) -> Ordering {
        a.display_order
            .cmp(&b.display_order)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| b.id.cmp(&a.id))
    }
}

/// Work experience entry. Dates are free-form labels ("Jan 2020", "Present").
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Experience {
    pub id: i32,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub start_date: String,
    pub end_date: Option<String>,
    pub description: String,
    pub display_order: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewExperience {
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub start_date: String,
    pub end_date: Option<String>,
    pub description: String,
    pub display_order: i32,
}

impl Entity for Experience {
    type Input = NewExperience;
    const RESOURCE: &'static str = "Experience";

    fn id(&self) -> i32 {
        self.id
    }

    fn from_input(id: i32, input: &NewExperience, _now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: input.title.clone(),
            company: input.company.clone(),
            location: input.location.clone(),
            start_date: input.start_date.clone(),
            end_date: input.end_date.clone(),
            description: input.description.clone(),
            display_order: input.display_order,
        }
    }

    fn apply(&mut self, input: &NewExperience) {
        self.title = input.title.clone();
        self.company = input.company.clone();
        self.location = input.location.clone();
        self.start_date = input.start_date.clone();
        self.end_date = input.end_date.clone();
        self.description = input.description.clone();
        self.display_order = input.display_order;
    }

    fn list_order(a: &Self, b: &Self) -> Ordering {
        a.display_order
            .cmp(&b.display_order)
            .then_with(|| b.id.cmp(&a.id))
    }
}

/// Link to a social profile shown in the site header/footer
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SocialLink {
    pub id: i32,
    pub platform: String,
    pub url: String,
    pub icon_class: String,
    pub display_order: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSocialLink {
    pub platform: String,
    pub url: String,
    pub icon_class: String,
    pub display_order: i32,
}

impl Entity for SocialLink {
    type Input = NewSocialLink;
    const RESOURCE: &'static str = "Social link";

    fn id(&self) -> i32 {
        self.id
    }

    fn from_input(id: i32, input: &NewSocialLink, _now: DateTime<Utc>) -> Self {
        Self {
            id,
            platform: input.platform.clone(),
            url: input.url.clone(),
            icon_class: input.icon_class.clone(),
            display_order: input.display_order,
        }
    }

    fn apply(&mut self, input: &NewSocialLink) {
        self.platform = input.platform.clone();
        self.url = input.url.clone();
        self.icon_class = input.icon_class.clone();
        self.display_order = input.display_order;
    }

    fn list_order(a: &Self, b: &Self) -> Ordering {
        a.display_order
            .cmp(&b.display_order)
            .then_with(|| a.id.cmp(&b.id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Unread,
    Read,
}

impl MessageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageStatus::Unread => "unread",
            MessageStatus::Read => "read",
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown message status '{0}'")]
pub struct UnknownMessageStatus(String);

impl TryFrom<String> for MessageStatus {
    type Error = UnknownMessageStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "unread" => Ok(MessageStatus::Unread),
            "read" => Ok(MessageStatus::Read),
            _ => Err(UnknownMessageStatus(value)),
        }
    }
}

/// Message submitted through the public contact form
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ContactMessage {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    #[sqlx(try_from = "String")]
    pub status: MessageStatus,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

/// Singleton row holding the site-wide profile and page settings
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SiteSettings {
    pub id: i32,
    pub header_title: String,
    pub page_title: String,
    pub profile_name: String,
    pub position: Option<String>,
    pub profile_image: Option<String>,
    pub tagline: String,
    pub about_me: Option<String>,
    pub cv_filename: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Primary key of the only settings row.
pub const SETTINGS_ROW_ID: i32 = 1;

impl SiteSettings {
    pub fn with_defaults(now: DateTime<Utc>) -> Self {
        Self {
            id: SETTINGS_ROW_ID,
            header_title: "Portfolio".to_string(),
            page_title: "My Portfolio".to_string(),
            profile_name: "Your Name".to_string(),
            position: Some("Software Engineer".to_string()),
            profile_image: None,
            tagline: "Building things for the web".to_string(),
            about_me: None,
            cv_filename: None,
            updated_at: now,
        }
    }
}

/// Settings update. `None` file fields keep the current upload.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsUpdate {
    pub header_title: String,
    pub page_title: String,
    pub profile_name: String,
    pub position: Option<String>,
    pub tagline: String,
    pub about_me: Option<String>,
    pub profile_image: Option<String>,
    pub cv_filename: Option<String>,
}

/// Counters shown on the admin dashboard
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DashboardCounts {
    pub projects: i64,
    pub skills: i64,
    pub testimonials: i64,
    pub experiences: i64,
    pub unread_messages: i64,
    pub total_messages: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn project(id: i32, order: i32, age_secs: i64) -> Project {
        Project {
            id,
            title: format!("p{}", id),
            description: "d".to_string(),
            image: None,
            technologies: Some(" Rust, ,Axum ,sqlx".to_string()),
            link: None,
            display_order: order,
            created_at: Utc::now() - Duration::seconds(age_secs),
        }
    }

    fn skill(id: i32, category: Option<&str>, order: i32) -> Skill {
        Skill {
            id,
            name: format!("s{}", id),
            category: category.map(str::to_string),
            proficiency: 50,
            display_order: order,
        }
    }

    #[test]
    fn test_project_order_then_recency() {
        let mut projects = vec![project(1, 1, 100), project(2, 0, 50), project(3, 0, 10)];
        projects.sort_by(Project::list_order);
        let ids: Vec<i32> = projects.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn test_skill_order_puts_missing_category_last() {
        let mut skills = vec![
            skill(1, None, 0),
            skill(2, Some("Net"), 2),
            skill(3, Some("Cloud"), 0),
            skill(4, Some("Net"), 1),
        ];
        skills.sort_by(Skill::list_order);
        let ids: Vec<i32> = skills.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![3, 4, 2, 1]);
    }

    #[test]
    fn test_technology_list_skips_blanks() {
        assert_eq!(project(1, 0, 0).technology_list(), vec!["Rust", "Axum", "sqlx"]);
    }

    #[test]
    fn test_message_status_round_trip_from_column() {
        assert_eq!(
            MessageStatus::try_from("read".to_string()).unwrap(),
            MessageStatus::Read
        );
        assert!(MessageStatus::try_from("archived".to_string()).is_err());
        assert_eq!(MessageStatus::Unread.as_str(), "unread");
    }
}
