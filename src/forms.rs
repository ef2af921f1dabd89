//! Form payloads and field validation for every editable entity.
//!
//! Raw forms keep every field as a `String` so a malformed number becomes a field error
//! instead of a rejected request. `validate` turns a raw form into the typed input the
//! store accepts, and `From<&Entity>` fills a form from an existing row for editing.

use std::collections::BTreeMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::db::models::{
    Experience, NewContactMessage, NewExperience, NewProject, NewSkill, NewSocialLink,
    NewTestimonial, Project, SiteSettings, Skill, SocialLink, Testimonial,
};

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid");
}

const REQUIRED: &str = "This field is required.";

/// Validation messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.0.keys().copied().collect()
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(value)` if no errors were recorded.
    pub fn finish<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }

    fn required(&mut self, field: &'static str, raw: &str, min: usize, max: usize) -> String {
        let value = raw.trim();
        let len = value.chars().count();
        if value.is_empty() {
            self.add(field, REQUIRED);
        } else if min <= 1 && len > max {
            self.add(
                field,
                format!("Field cannot be longer than {max} characters."),
            );
        } else if len < min || len > max {
            self.add(
                field,
                format!("Field must be between {min} and {max} characters long."),
            );
        }
        value.to_string()
    }

    fn required_max(&mut self, field: &'static str, raw: &str, max: usize) -> String {
        self.required(field, raw, 1, max)
    }

    fn required_text(&mut self, field: &'static str, raw: &str) -> String {
        self.required(field, raw, 1, usize::MAX)
    }

    fn optional(&mut self, field: &'static str, raw: &str, max: usize) -> Option<String> {
        let value = raw.trim();
        if value.is_empty() {
            return None;
        }
        if value.chars().count() > max {
            self.add(
                field,
                format!("Field cannot be longer than {max} characters."),
            );
        }
        Some(value.to_string())
    }

    fn integer(&mut self, field: &'static str, raw: &str, min: i32, max: i32) -> Option<i32> {
        match raw.trim().parse::<i32>() {
            Ok(n) if n < min || n > max => {
                if max == i32::MAX {
                    self.add(field, format!("Number must be at least {min}."));
                } else {
                    self.add(field, format!("Number must be between {min} and {max}."));
                }
                None
            }
            Ok(n) => Some(n),
            Err(_) => {
                self.add(field, "Not a valid integer value.");
                None
            }
        }
    }

    /// Optional non-negative display order; blank means 0.
    fn order(&mut self, raw: &str) -> i32 {
        if raw.trim().is_empty() {
            return 0;
        }
        self.integer("order", raw, 0, i32::MAX).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    TextArea,
    Number,
    Email,
    Password,
    Hidden,
}

/// Rendering metadata for one form field.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

const fn field(
    name: &'static str,
    label: &'static str,
    kind: FieldKind,
    required: bool,
) -> FieldSpec {
    FieldSpec {
        name,
        label,
        kind,
        required,
    }
}

const ORDER_FIELD: FieldSpec = field("order", "Display Order", FieldKind::Number, false);

pub trait FormSpec: DeserializeOwned + Serialize + Default + Send + Sync + 'static {
    type Output;

    const FIELDS: &'static [FieldSpec];

    fn validate(&self) -> Result<Self::Output, FieldErrors>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: String,
}

/// Credentials that passed the required-field checks.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl FormSpec for LoginForm {
    type Output = Credentials;

    const FIELDS: &'static [FieldSpec] = &[
        field("username", "Username", FieldKind::Text, true),
        field("password", "Password", FieldKind::Password, true),
        field("next", "", FieldKind::Hidden, false),
    ];

    fn validate(&self) -> Result<Credentials, FieldErrors> {
        let mut errors = FieldErrors::new();
        let username = errors.required_text("username", &self.username);
        // Passwords are compared verbatim.
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors.finish(Credentials {
            username,
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl FormSpec for ContactForm {
    type Output = NewContactMessage;

    const FIELDS: &'static [FieldSpec] = &[
        field("name", "Name", FieldKind::Text, true),
        field("email", "Email", FieldKind::Email, true),
        field("subject", "Subject", FieldKind::Text, true),
        field("message", "Message", FieldKind::TextArea, true),
    ];

    fn validate(&self) -> Result<NewContactMessage, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = errors.required("name", &self.name, 2, 100);
        let email = errors.required_max("email", &self.email, 120);
        if !email.is_empty() && !EMAIL_RE.is_match(&email) {
            errors.add("email", "Invalid email address.");
        }
        let subject = errors.required("subject", &self.subject, 2, 200);
        let message = self.message.trim().to_string();
        if message.is_empty() {
            errors.add("message", REQUIRED);
        } else if message.chars().count() < 10 {
            errors.add("message", "Field must be at least 10 characters long.");
        }
        errors.finish(NewContactMessage {
            name,
            email,
            subject,
            message,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectForm {
    pub title: String,
    pub description: String,
    pub image: String,
    pub technologies: String,
    pub link: String,
    pub order: String,
}

impl FormSpec for ProjectForm {
    type Output = NewProject;

    const FIELDS: &'static [FieldSpec] = &[
        field("title", "Title", FieldKind::Text, true),
        field("description", "Description", FieldKind::TextArea, true),
        field("image", "Image URL", FieldKind::Text, false),
        field(
            "technologies",
            "Technologies (comma-separated)",
            FieldKind::Text,
            false,
        ),
        field("link", "Project Link", FieldKind::Text, false),
        ORDER_FIELD,
    ];

    fn validate(&self) -> Result<NewProject, FieldErrors> {
        let mut errors = FieldErrors::new();
        let input = NewProject {
            title: errors.required("title", &self.title, 2, 200),
            description: errors.required_text("description", &self.description),
            image: errors.optional("image", &self.image, 255),
            technologies: errors.optional("technologies", &self.technologies, 500),
            link: errors.optional("link", &self.link, 255),
            display_order: errors.order(&self.order),
        };
        errors.finish(input)
    }
}

impl From<&Project> for ProjectForm {
    fn from(project: &Project) -> Self {
        Self {
            title: project.title.clone(),
            description: project.description.clone(),
            image: project.image.clone().unwrap_or_default(),
            technologies: project.technologies.clone().unwrap_or_default(),
            link: project.link.clone().unwrap_or_default(),
            order: project.display_order.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillForm {
    pub name: String,
    pub category: String,
    pub proficiency: String,
    pub order: String,
}

impl FormSpec for SkillForm {
    type Output = NewSkill;

    const FIELDS: &'static [FieldSpec] = &[
        field("name", "Skill Name", FieldKind::Text, true),
        field("category", "Category", FieldKind::Text, false),
        field("proficiency", "Proficiency (0-100)", FieldKind::Number, true),
        ORDER_FIELD,
    ];

    fn validate(&self) -> Result<NewSkill, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = errors.required("name", &self.name, 2, 100);
        let category = errors.optional("category", &self.category, 100);
        let proficiency = if self.proficiency.trim().is_empty() {
            errors.add("proficiency", REQUIRED);
            0
        } else {
            errors
                .integer("proficiency", &self.proficiency, 0, 100)
                .unwrap_or(0)
        };
        let display_order = errors.order(&self.order);
        errors.finish(NewSkill {
            name,
            category,
            proficiency,
            display_order,
        })
    }
}

impl From<&Skill> for SkillForm {
    fn from(skill: &Skill) -> Self {
        Self {
            name: skill.name.clone(),
            category: skill.category.clone().unwrap_or_default(),
            proficiency: skill.proficiency.to_string(),
            order: skill.display_order.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TestimonialForm {
    pub name: String,
    pub role: String,
    pub company: String,
    pub message: String,
    pub order: String,
}

impl FormSpec for TestimonialForm {
    type Output = NewTestimonial;

    const FIELDS: &'static [FieldSpec] = &[
        field("name", "Name", FieldKind::Text, true),
        field("role", "Role/Position", FieldKind::Text, false),
        field("company", "Company", FieldKind::Text, false),
        field("message", "Testimonial", FieldKind::TextArea, true),
        ORDER_FIELD,
    ];

    fn validate(&self) -> Result<NewTestimonial, FieldErrors> {
        let mut errors = FieldErrors::new();
        let input = NewTestimonial {
            name: errors.required("name", &self.name, 2, 100),
            role: errors.optional("role", &self.role, 150),
            company: errors.optional("company", &self.company, 150),
            message: errors.required_text("message", &self.message),
            display_order: errors.order(&self.order),
        };
        errors.finish(input)
    }
}

impl From<&Testimonial> for TestimonialForm {
    fn from(t: &Testimonial) -> Self {
        Self {
            name: t.name.clone(),
            role: t.role.clone().unwrap_or_default(),
            company: t.company.clone().unwrap_or_default(),
            message: t.message.clone(),
            order: t.display_order.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceForm {
    pub title: String,
    pub company: String,
    pub location: String,
    pub start_date: String,
    pub end_date: String,
    pub description: String,
    pub order: String,
}

impl FormSpec for ExperienceForm {
    type Output = NewExperience;

    const FIELDS: &'static [FieldSpec] = &[
        field("title", "Job Title", FieldKind::Text, true),
        field("company", "Company", FieldKind::Text, true),
        field("location", "Location", FieldKind::Text, false),
        field(
            "start_date",
            "Start Date (e.g., Jan 2020)",
            FieldKind::Text,
            true,
        ),
        field(
            "end_date",
            "End Date (e.g., Dec 2022 or \"Present\")",
            FieldKind::Text,
            false,
        ),
        field("description", "Description", FieldKind::TextArea, true),
        ORDER_FIELD,
    ];

    fn validate(&self) -> Result<NewExperience, FieldErrors> {
        let mut errors = FieldErrors::new();
        let input = NewExperience {
            title: errors.required("title", &self.title, 2, 200),
            company: errors.required("company", &self.company, 2, 200),
            location: errors.optional("location", &self.location, 200),
            start_date: errors.required_max("start_date", &self.start_date, 50),
            end_date: errors.optional("end_date", &self.end_date, 50),
            description: errors.required_text("description", &self.description),
            display_order: errors.order(&self.order),
        };
        errors.finish(input)
    }
}

impl From<&Experience> for ExperienceForm {
    fn from(e: &Experience) -> Self {
        Self {
            title: e.title.clone(),
            company: e.company.clone(),
            location: e.location.clone().unwrap_or_default(),
            start_date: e.start_date.clone(),
            end_date: e.end_date.clone().unwrap_or_default(),
            description: e.description.clone(),
            order: e.display_order.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialLinkForm {
    pub platform: String,
    pub url: String,
    pub icon_class: String,
    pub order: String,
}

impl FormSpec for SocialLinkForm {
    type Output = NewSocialLink;

    const FIELDS: &'static [FieldSpec] = &[
        field("platform", "Platform Name", FieldKind::Text, true),
        field("url", "URL", FieldKind::Text, true),
        field(
            "icon_class",
            "Icon Class (e.g., fab fa-linkedin)",
            FieldKind::Text,
            true,
        ),
        ORDER_FIELD,
    ];

    fn validate(&self) -> Result<NewSocialLink, FieldErrors> {
        let mut errors = FieldErrors::new();
        let input = NewSocialLink {
            platform: errors.required("platform", &self.platform, 2, 50),
            url: errors.required_max("url", &self.url, 500),
            icon_class: errors.required_max("icon_class", &self.icon_class, 100),
            display_order: errors.order(&self.order),
        };
        errors.finish(input)
    }
}

impl From<&SocialLink> for SocialLinkForm {
    fn from(link: &SocialLink) -> Self {
        Self {
            platform: link.platform.clone(),
            url: link.url.clone(),
            icon_class: link.icon_class.clone(),
            order: link.display_order.to_string(),
        }
    }
}

/// Text part of the settings form. Uploaded files travel separately.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsForm {
    pub header_title: String,
    pub page_title: String,
    pub profile_name: String,
    pub position: String,
    pub tagline: String,
    pub about_me: String,
}

/// Validated settings text; header and page titles fall back to the current values when
/// left blank.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsText {
    pub header_title: Option<String>,
    pub page_title: Option<String>,
    pub profile_name: String,
    pub position: Option<String>,
    pub tagline: String,
    pub about_me: Option<String>,
}

impl FormSpec for SettingsForm {
    type Output = SettingsText;

    const FIELDS: &'static [FieldSpec] = &[
        field("header_title", "Header Title", FieldKind::Text, false),
        field("page_title", "Page Title", FieldKind::Text, false),
        field("profile_name", "Profile Name", FieldKind::Text, true),
        field("position", "Position", FieldKind::Text, false),
        field("tagline", "Tagline", FieldKind::Text, true),
        field("about_me", "About Me", FieldKind::TextArea, false),
    ];

    fn validate(&self) -> Result<SettingsText, FieldErrors> {
        let mut errors = FieldErrors::new();
        let text = SettingsText {
            header_title: errors.optional("header_title", &self.header_title, 100),
            page_title: errors.optional("page_title", &self.page_title, 200),
            profile_name: errors.required("profile_name", &self.profile_name, 2, 100),
            position: errors.optional("position", &self.position, 200),
            tagline: errors.required_max("tagline", &self.tagline, 200),
            about_me: errors.optional("about_me", &self.about_me, usize::MAX),
        };
        errors.finish(text)
    }
}

impl From<&SiteSettings> for SettingsForm {
    fn from(s: &SiteSettings) -> Self {
        Self {
            header_title: s.header_title.clone(),
            page_title: s.page_title.clone(),
            profile_name: s.profile_name.clone(),
            position: s.position.clone().unwrap_or_default(),
            tagline: s.tagline.clone(),
            about_me: s.about_me.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn skill_form(proficiency: &str) -> SkillForm {
        SkillForm {
            name: "Rust".to_string(),
            category: String::new(),
            proficiency: proficiency.to_string(),
            order: String::new(),
        }
    }

    #[test]
    fn test_proficiency_bounds_inclusive() {
        assert_eq!(skill_form("0").validate().unwrap().proficiency, 0);
        assert_eq!(skill_form("100").validate().unwrap().proficiency, 100);

        for bad in ["-1", "101"] {
            let errors = skill_form(bad).validate().unwrap_err();
            assert_eq!(errors.field_names(), vec!["proficiency"]);
        }
    }

    #[test]
    fn test_non_numeric_integer_is_field_error() {
        let errors = skill_form("lots").validate().unwrap_err();
        assert_eq!(errors.get("proficiency"), ["Not a valid integer value."]);

        let mut form = skill_form("50");
        form.order = "first".to_string();
        assert_eq!(form.validate().unwrap_err().field_names(), vec!["order"]);
    }

    #[test]
    fn test_blank_optional_fields_become_none() {
        let input = ProjectForm {
            title: "  Site ".to_string(),
            description: "A site".to_string(),
            image: "   ".to_string(),
            technologies: String::new(),
            link: " https://example.com ".to_string(),
            order: String::new(),
        }
        .validate()
        .unwrap();
        assert_eq!(input.title, "Site");
        assert!(input.image.is_none());
        assert!(input.technologies.is_none());
        assert_eq!(input.link.as_deref(), Some("https://example.com"));
        assert_eq!(input.display_order, 0);
    }

    #[test]
    fn test_negative_order_rejected() {
        let mut form = skill_form("10");
        form.order = "-3".to_string();
        assert_eq!(
            form.validate().unwrap_err().get("order"),
            ["Number must be at least 0."]
        );
    }

    #[test]
    fn test_contact_message_minimum_length() {
        let form = ContactForm {
            name: "Jo Smith".to_string(),
            email: "jo@example.com".to_string(),
            subject: "Hi".to_string(),
            message: "Too short".to_string(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.field_names(), vec!["message"]);
    }

    #[test]
    fn test_contact_email_format() {
        let form = ContactForm {
            name: "Jo".to_string(),
            email: "not-an-email".to_string(),
            subject: "Hello".to_string(),
            message: "Hello there, nice site!".to_string(),
        };
        assert_eq!(
            form.validate().unwrap_err().get("email"),
            ["Invalid email address."]
        );
    }

    #[test]
    fn test_length_is_counted_in_characters() {
        let form = SocialLinkForm {
            platform: "Ünï".to_string(),
            url: "https://example.com".to_string(),
            icon_class: "fab fa-x".to_string(),
            order: "2".to_string(),
        };
        assert_eq!(form.validate().unwrap().display_order, 2);
    }

    #[test]
    fn test_login_requires_both_fields() {
        let errors = LoginForm::default().validate().unwrap_err();
        assert_eq!(errors.field_names(), vec!["password", "username"]);
    }

    #[test]
    fn test_entity_to_form_mapping() {
        let experience = Experience {
            id: 7,
            title: "Engineer".to_string(),
            company: "Acme".to_string(),
            location: None,
            start_date: "Jan 2020".to_string(),
            end_date: Some("Present".to_string()),
            description: "Built things".to_string(),
            display_order: 3,
        };
        let form = ExperienceForm::from(&experience);
        assert_eq!(form.location, "");
        assert_eq!(form.end_date, "Present");
        assert_eq!(form.order, "3");
        assert_eq!(form.validate().unwrap().display_order, 3);
    }

    #[test]
    fn test_settings_form_requires_profile_name_and_tagline() {
        let mut form = SettingsForm::from(&SiteSettings::with_defaults(Utc::now()));
        assert!(form.validate().is_ok());

        form.profile_name = "J".to_string();
        form.tagline = String::new();
        assert_eq!(
            form.validate().unwrap_err().field_names(),
            vec!["profile_name", "tagline"]
        );
    }
}
