//! Admin list/add/edit/delete pages, shared by every content type.
//!
//! Each content type implements [`AdminResource`] and gets five routes under
//! `/admin/{slug}` from [`routes`].

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Serialize;

use crate::auth::AuthContext;
use crate::db::models::{Entity, Experience, Project, Skill, SocialLink, Testimonial};
use crate::db::{Repository, Store};
use crate::errors::Error;
use crate::forms::{
    ExperienceForm, FieldErrors, FieldSpec, FormSpec, ProjectForm, SkillForm, SocialLinkForm,
    TestimonialForm,
};
use crate::routes::EntityId;
use crate::services;
use crate::views::{flash, Flash, IncomingFlash};
use crate::AppState;

pub trait AdminResource: Entity {
    type Form: FormSpec<Output = Self::Input> + for<'a> From<&'a Self>;

    /// Path segment under `/admin`
    const SLUG: &'static str;
    const SINGULAR: &'static str;
    const PLURAL: &'static str;
    const COLUMNS: &'static [&'static str];

    /// Cell values for the list page, one per column.
    fn row(&self) -> Vec<String>;

    fn repository(store: &dyn Store) -> &dyn Repository<Self>;

    /// Page shown after a successful change.
    fn return_to() -> String {
        format!("/admin/{}", Self::SLUG)
    }
}

fn or_dash(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

impl AdminResource for Project {
    type Form = ProjectForm;
    const SLUG: &'static str = "projects";
    const SINGULAR: &'static str = "Project";
    const PLURAL: &'static str = "Projects";
    const COLUMNS: &'static [&'static str] = &["Title", "Technologies", "Order"];

    fn row(&self) -> Vec<String> {
        vec![
            self.title.clone(),
            or_dash(&self.technologies),
            self.display_order.to_string(),
        ]
    }

    fn repository(store: &dyn Store) -> &dyn Repository<Self> {
        store.projects()
    }
}

impl AdminResource for Skill {
    type Form = SkillForm;
    const SLUG: &'static str = "skills";
    const SINGULAR: &'static str = "Skill";
    const PLURAL: &'static str = "Skills";
    const COLUMNS: &'static [&'static str] = &["Name", "Category", "Proficiency", "Order"];

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            or_dash(&self.category),
            format!("{}%", self.proficiency),
            self.display_order.to_string(),
        ]
    }

    fn repository(store: &dyn Store) -> &dyn Repository<Self> {
        store.skills()
    }
}

impl AdminResource for Testimonial {
    type Form = TestimonialForm;
    const SLUG: &'static str = "testimonials";
    const SINGULAR: &'static str = "Testimonial";
    const PLURAL: &'static str = "Testimonials";
    const COLUMNS: &'static [&'static str] = &["Name", "Role", "Company", "Order"];

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            or_dash(&self.role),
            or_dash(&self.company),
            self.display_order.to_string(),
        ]
    }

    fn repository(store: &dyn Store) -> &dyn Repository<Self> {
        store.testimonials()
    }
}

impl AdminResource for Experience {
    type Form = ExperienceForm;
    const SLUG: &'static str = "experiences";
    const SINGULAR: &'static str = "Experience";
    const PLURAL: &'static str = "Experiences";
    const COLUMNS: &'static [&'static str] = &["Title", "Company", "Dates", "Order"];

    fn row(&self) -> Vec<String> {
        vec![
            self.title.clone(),
            self.company.clone(),
            format!(
                "{} - {}",
                self.start_date,
                self.end_date.as_deref().unwrap_or("Present")
            ),
            self.display_order.to_string(),
        ]
    }

    fn repository(store: &dyn Store) -> &dyn Repository<Self> {
        store.experiences()
    }
}

impl AdminResource for SocialLink {
    type Form = SocialLinkForm;
    const SLUG: &'static str = "social-links";
    const SINGULAR: &'static str = "Social link";
    const PLURAL: &'static str = "Social links";
    const COLUMNS: &'static [&'static str] = &["Platform", "URL", "Icon", "Order"];

    fn row(&self) -> Vec<String> {
        vec![
            self.platform.clone(),
            self.url.clone(),
            self.icon_class.clone(),
            self.display_order.to_string(),
        ]
    }

    fn repository(store: &dyn Store) -> &dyn Repository<Self> {
        store.social_links()
    }

    // Social links are managed from the settings page.
    fn return_to() -> String {
        "/admin/settings".to_string()
    }
}

#[derive(Serialize)]
struct ListRow {
    id: i32,
    cells: Vec<String>,
}

#[derive(Serialize)]
struct ListPage<'a> {
    admin: &'a str,
    slug: &'static str,
    singular: &'static str,
    plural: &'static str,
    columns: &'static [&'static str],
    rows: Vec<ListRow>,
}

#[derive(Serialize)]
struct FormPage<'a, F> {
    admin: &'a str,
    heading: String,
    singular: &'static str,
    action: String,
    cancel_url: String,
    fields: &'static [FieldSpec],
    form: &'a F,
    errors: &'a FieldErrors,
}

fn render_form<R: AdminResource>(
    state: &AppState,
    auth: &AuthContext,
    status: StatusCode,
    id: Option<i32>,
    form: &R::Form,
    errors: &FieldErrors,
    flash: &IncomingFlash,
) -> Response {
    let (heading, action) = match id {
        Some(id) => (
            format!("Edit {}", R::SINGULAR),
            format!("/admin/{}/edit/{}", R::SLUG, id),
        ),
        None => (
            format!("Add {}", R::SINGULAR),
            format!("/admin/{}/add", R::SLUG),
        ),
    };
    let page = FormPage {
        admin: &auth.username,
        heading,
        singular: R::SINGULAR,
        action,
        cancel_url: R::return_to(),
        fields: R::Form::FIELDS,
        form,
        errors,
    };
    state.views.page(status, "admin/form.html", &page, flash)
}

/// GET /admin/{slug}
pub async fn list<R: AdminResource>(
    State(state): State<AppState>,
    auth: AuthContext,
    flash: IncomingFlash,
) -> Response {
    let rows = match services::list(R::repository(state.store.as_ref())).await {
        Ok(rows) => rows,
        Err(e) => return e.into_response(),
    };
    let page = ListPage {
        admin: &auth.username,
        slug: R::SLUG,
        singular: R::SINGULAR,
        plural: R::PLURAL,
        columns: R::COLUMNS,
        rows: rows
            .iter()
            .map(|row| ListRow {
                id: row.id(),
                cells: row.row(),
            })
            .collect(),
    };
    state
        .views
        .page(StatusCode::OK, "admin/list.html", &page, &flash)
}

/// GET /admin/{slug}/add
pub async fn new_form<R: AdminResource>(
    State(state): State<AppState>,
    auth: AuthContext,
    flash: IncomingFlash,
) -> Response {
    render_form::<R>(
        &state,
        &auth,
        StatusCode::OK,
        None,
        &R::Form::default(),
        &FieldErrors::new(),
        &flash,
    )
}

/// POST /admin/{slug}/add
pub async fn create<R: AdminResource>(
    State(state): State<AppState>,
    auth: AuthContext,
    Form(form): Form<R::Form>,
) -> Response {
    match services::create(R::repository(state.store.as_ref()), &form).await {
        Ok(_) => flash::redirect_with(
            &R::return_to(),
            Flash::success(format!("{} added successfully!", R::SINGULAR)),
        ),
        Err(Error::Validation(errors)) => render_form::<R>(
            &state,
            &auth,
            StatusCode::BAD_REQUEST,
            None,
            &form,
            &errors,
            &IncomingFlash::default(),
        ),
        Err(e) => e.into_response(),
    }
}

/// GET /admin/{slug}/edit/{id}
pub async fn edit_form<R: AdminResource>(
    State(state): State<AppState>,
    auth: AuthContext,
    flash: IncomingFlash,
    EntityId(id): EntityId,
) -> Response {
    match services::get(R::repository(state.store.as_ref()), id).await {
        Ok(entity) => render_form::<R>(
            &state,
            &auth,
            StatusCode::OK,
            Some(id),
            &R::Form::from(&entity),
            &FieldErrors::new(),
            &flash,
        ),
        Err(e) => e.into_response(),
    }
}

/// POST /admin/{slug}/edit/{id}
pub async fn update<R: AdminResource>(
    State(state): State<AppState>,
    auth: AuthContext,
    EntityId(id): EntityId,
    Form(form): Form<R::Form>,
) -> Response {
    match services::update(R::repository(state.store.as_ref()), id, &form).await {
        Ok(()) => flash::redirect_with(
            &R::return_to(),
            Flash::success(format!("{} updated successfully!", R::SINGULAR)),
        ),
        Err(Error::Validation(errors)) => render_form::<R>(
            &state,
            &auth,
            StatusCode::BAD_REQUEST,
            Some(id),
            &form,
            &errors,
            &IncomingFlash::default(),
        ),
        Err(e) => e.into_response(),
    }
}

/// POST /admin/{slug}/delete/{id}
pub async fn delete<R: AdminResource>(
    State(state): State<AppState>,
    _auth: AuthContext,
    EntityId(id): EntityId,
) -> Response {
    match services::delete(R::repository(state.store.as_ref()), id).await {
        Ok(()) => flash::redirect_with(
            &R::return_to(),
            Flash::success(format!("{} deleted successfully!", R::SINGULAR)),
        ),
        Err(e) => e.into_response(),
    }
}

pub fn routes<R: AdminResource>() -> Router<AppState> {
    let base = format!("/admin/{}", R::SLUG);
    Router::new()
        .route(&base, get(list::<R>))
        .route(
            &format!("{base}/add"),
            get(new_form::<R>).post(create::<R>),
        )
        .route(
            &format!("{base}/edit/{{id}}"),
            get(edit_form::<R>).post(update::<R>),
        )
        .route(&format!("{base}/delete/{{id}}"), post(delete::<R>))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{NewExperience, NewProject, NewSkill, NewSocialLink, NewTestimonial};
    use crate::test_utils::{
        body_string, get, get_with_cookie, location, login, post_form, set_cookie, test_app,
        TestContext,
    };
    use tower::ServiceExt;

    /// Delete an id that does not exist next to one real row of `R`.
    async fn assert_missing_delete_keeps_rows<R: AdminResource>(
        app: &Router,
        ctx: &TestContext,
        cookie: &str,
        seed: R::Input,
    ) {
        let repository = R::repository(ctx.state.store.as_ref());
        let id = repository.create(&seed).await.unwrap();
        let missing = id + 100;
        let before = repository.count().await.unwrap();

        let res = app
            .clone()
            .oneshot(post_form(
                &format!("/admin/{}/delete/{missing}", R::SLUG),
                "",
                Some(cookie),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{}", R::SLUG);

        let err = services::delete(repository, missing).await.unwrap_err();
        assert!(
            matches!(err, Error::NotFound { resource, id } if resource == R::RESOURCE && id == missing),
            "{}: {err:?}",
            R::SLUG
        );
        assert_eq!(repository.count().await.unwrap(), before, "{}", R::SLUG);
        assert!(repository.get(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_admin_pages_redirect_anonymous_users_to_login() {
        let (app, _ctx) = test_app().await;
        let res = app.oneshot(get("/admin/projects")).await.unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/admin/login?next=%2Fadmin%2Fprojects");
    }

    #[tokio::test]
    async fn test_create_project_then_list() {
        let (app, ctx) = test_app().await;
        let cookie = login(&app).await;

        let res = app
            .clone()
            .oneshot(post_form(
                "/admin/projects/add",
                "title=Portfolio+CMS&description=This+site&technologies=Rust%2C+Axum&order=1",
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&res), "/admin/projects");
        assert!(set_cookie(&res, "flash").is_some());

        assert_eq!(ctx.state.store.projects().count().await.unwrap(), 1);
        let res = app
            .oneshot(get_with_cookie("/admin/projects", &cookie))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_string(res).await.contains("Portfolio CMS"));
    }

    #[tokio::test]
    async fn test_invalid_form_rerenders_with_errors() {
        let (app, ctx) = test_app().await;
        let cookie = login(&app).await;

        let res = app
            .oneshot(post_form(
                "/admin/skills/add",
                "name=Rust&proficiency=101",
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = body_string(res).await;
        assert!(body.contains("Number must be between 0 and 100."));
        assert!(body.contains("value=\"Rust\""));
        assert_eq!(ctx.state.store.skills().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_edit_form_is_prefilled_and_update_applies() {
        let (app, ctx) = test_app().await;
        let cookie = login(&app).await;
        let id = ctx
            .state
            .store
            .skills()
            .create(&NewSkill {
                name: "Python".to_string(),
                category: Some("Languages".to_string()),
                proficiency: 75,
                display_order: 0,
            })
            .await
            .unwrap();

        let res = app
            .clone()
            .oneshot(get_with_cookie(&format!("/admin/skills/edit/{id}"), &cookie))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_string(res).await;
        assert!(body.contains("value=\"Python\""));
        assert!(body.contains("value=\"75\""));

        let res = app
            .oneshot(post_form(
                &format!("/admin/skills/edit/{id}"),
                "name=Python&category=&proficiency=80&order=2",
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);

        let skill = ctx.state.store.skills().get(id).await.unwrap().unwrap();
        assert_eq!(skill.proficiency, 80);
        assert!(skill.category.is_none());
        assert_eq!(skill.display_order, 2);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let (app, _ctx) = test_app().await;
        let cookie = login(&app).await;

        let res = app
            .clone()
            .oneshot(get_with_cookie("/admin/experiences/edit/404", &cookie))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let res = app
            .oneshot(post_form("/admin/testimonials/delete/9", "", Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_deleting_missing_id_leaves_every_table_unchanged() {
        let (app, ctx) = test_app().await;
        let cookie = login(&app).await;

        assert_missing_delete_keeps_rows::<Project>(
            &app,
            &ctx,
            &cookie,
            NewProject {
                title: "Portfolio CMS".to_string(),
                description: "This site".to_string(),
                image: None,
                technologies: None,
                link: None,
                display_order: 0,
            },
        )
        .await;
        assert_missing_delete_keeps_rows::<Skill>(
            &app,
            &ctx,
            &cookie,
            NewSkill {
                name: "Rust".to_string(),
                category: None,
                proficiency: 90,
                display_order: 0,
            },
        )
        .await;
        assert_missing_delete_keeps_rows::<Testimonial>(
            &app,
            &ctx,
            &cookie,
            NewTestimonial {
                name: "Sam Lee".to_string(),
                role: None,
                company: None,
                message: "Great to work with.".to_string(),
                display_order: 0,
            },
        )
        .await;
        assert_missing_delete_keeps_rows::<Experience>(
            &app,
            &ctx,
            &cookie,
            NewExperience {
                title: "Engineer".to_string(),
                company: "Example Corp".to_string(),
                location: None,
                start_date: "2021".to_string(),
                end_date: None,
                description: "Backend services.".to_string(),
                display_order: 0,
            },
        )
        .await;
        assert_missing_delete_keeps_rows::<SocialLink>(
            &app,
            &ctx,
            &cookie,
            NewSocialLink {
                platform: "GitHub".to_string(),
                url: "https://github.com/jo".to_string(),
                icon_class: "fab fa-github".to_string(),
                display_order: 0,
            },
        )
        .await;
    }

    #[tokio::test]
    async fn test_malformed_id_gets_not_found_page() {
        let (app, _ctx) = test_app().await;
        let cookie = login(&app).await;

        for uri in [
            "/admin/projects/edit/abc",
            "/admin/projects/edit/99999999999",
            "/admin/messages/view/1x",
        ] {
            let res = app
                .clone()
                .oneshot(get_with_cookie(uri, &cookie))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::NOT_FOUND, "{uri}");
            assert!(body_string(res).await.contains("<h1>404</h1>"), "{uri}");
        }

        for uri in ["/admin/skills/delete/abc", "/admin/messages/delete/-"] {
            let res = app
                .clone()
                .oneshot(post_form(uri, "", Some(&cookie)))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_social_link_changes_return_to_settings() {
        let (app, ctx) = test_app().await;
        let cookie = login(&app).await;

        let res = app
            .clone()
            .oneshot(post_form(
                "/admin/social-links/add",
                "platform=GitHub&url=https%3A%2F%2Fgithub.com%2Fjo&icon_class=fab+fa-github",
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(location(&res), "/admin/settings");

        let id = ctx.state.store.social_links().list().await.unwrap()[0].id;
        let res = app
            .oneshot(post_form(
                &format!("/admin/social-links/delete/{id}"),
                "",
                Some(&cookie),
            ))
            .await
            .unwrap();
        assert_eq!(location(&res), "/admin/settings");
        assert_eq!(ctx.state.store.social_links().count().await.unwrap(), 0);
    }
}
