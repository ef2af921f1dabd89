//! Prepare a database: create the schema, set up the admin account and optionally load
//! demo content.
//!
//! Usage: `init-db [--demo]` with `DATABASE_URL`, `ADMIN_PASSWORD` and optionally
//! `ADMIN_USERNAME` set in the environment or `.env`.

use std::env;

use portfolio_cms::auth::password::hash_password;
use portfolio_cms::db::models::{
    NewExperience, NewProject, NewSkill, NewSocialLink, NewTestimonial,
};
use portfolio_cms::db::{self, DbConfig, Store, MEMORY_URL_PREFIX};

const MIN_PASSWORD_LEN: usize = 8;

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("init-db: {message}");
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let demo = env::args().skip(1).any(|arg| arg == "--demo");

    let config = DbConfig::from_env().unwrap_or_else(|e| fail(e));
    if config.url.starts_with(MEMORY_URL_PREFIX) {
        fail("DATABASE_URL points at the in-memory store; nothing to initialize");
    }

    let username = env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
    let password = env::var("ADMIN_PASSWORD")
        .unwrap_or_else(|_| fail("ADMIN_PASSWORD environment variable must be set"));
    if password.chars().count() < MIN_PASSWORD_LEN {
        fail(format!(
            "ADMIN_PASSWORD must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }

    // connect() creates the schema
    let store = db::connect(&config)
        .await
        .unwrap_or_else(|e| fail(format!("cannot open database: {e}")));
    println!("Schema is up to date");

    let hash = hash_password(password)
        .await
        .unwrap_or_else(|e| fail(format!("cannot hash password: {e}")));
    let users = store.users();
    let reset = users
        .set_password(&username, &hash)
        .await
        .unwrap_or_else(|e| fail(e));
    if reset {
        println!("Password reset for admin user '{username}'");
    } else {
        users
            .create(&username, &hash)
            .await
            .unwrap_or_else(|e| fail(e));
        println!("Created admin user '{username}'");
    }

    if demo {
        match seed_demo_content(store.as_ref()).await {
            Ok(true) => println!("Demo content added"),
            Ok(false) => println!("Content already present, demo content skipped"),
            Err(e) => fail(format!("cannot add demo content: {e}")),
        }
    }
}

/// Insert a small set of sample rows. Skipped when any project already exists.
async fn seed_demo_content(store: &dyn Store) -> db::Result<bool> {
    if store.projects().count().await? > 0 {
        return Ok(false);
    }

    store.settings().get_or_create().await?;

    store
        .projects()
        .create(&NewProject {
            title: "Portfolio CMS".to_string(),
            description: "This site: public pages plus an admin panel for editing them."
                .to_string(),
            image: None,
            technologies: Some("Rust, Axum, PostgreSQL".to_string()),
            link: None,
            display_order: 0,
        })
        .await?;

    for (name, category, proficiency, order) in [
        ("Rust", "Languages", 85, 0),
        ("SQL", "Languages", 75, 1),
        ("Docker", "Tools", 70, 0),
    ] {
        store
            .skills()
            .create(&NewSkill {
                name: name.to_string(),
                category: Some(category.to_string()),
                proficiency,
                display_order: order,
            })
            .await?;
    }

    store
        .experiences()
        .create(&NewExperience {
            title: "Software Engineer".to_string(),
            company: "Example Corp".to_string(),
            location: Some("Remote".to_string()),
            start_date: "2021".to_string(),
            end_date: None,
            description: "Backend services and internal tooling.".to_string(),
            display_order: 0,
        })
        .await?;

    store
        .testimonials()
        .create(&NewTestimonial {
            name: "Sam Lee".to_string(),
            role: Some("Engineering Manager".to_string()),
            company: Some("Example Corp".to_string()),
            message: "Reliable, thorough and easy to work with.".to_string(),
            display_order: 0,
        })
        .await?;

    store
        .social_links()
        .create(&NewSocialLink {
            platform: "GitHub".to_string(),
            url: "https://github.com/".to_string(),
            icon_class: "fab fa-github".to_string(),
            display_order: 0,
        })
        .await?;

    Ok(true)
}
