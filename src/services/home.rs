//! Read model for the public pages.

use serde::Serialize;

use crate::db::models::{Experience, Project, SiteSettings, Skill, SocialLink, Testimonial};
use crate::db::Store;
use crate::errors::Result;

/// Number of projects featured on the home page.
pub const FEATURED_PROJECTS: usize = 6;

/// Heading used for skills without a category.
pub const UNCATEGORIZED: &str = "Other";

#[derive(Debug, Clone, Serialize)]
pub struct ProjectCard {
    #[serde(flatten)]
    pub project: Project,
    pub technology_list: Vec<String>,
}

impl From<Project> for ProjectCard {
    fn from(project: Project) -> Self {
        Self {
            technology_list: project.technology_list(),
            project,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SkillGroup {
    pub category: String,
    pub skills: Vec<Skill>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HomePage {
    pub settings: SiteSettings,
    pub projects: Vec<ProjectCard>,
    pub skill_groups: Vec<SkillGroup>,
    pub experiences: Vec<Experience>,
    pub testimonials: Vec<Testimonial>,
    pub social_links: Vec<SocialLink>,
}

/// Group skills by category, keeping the order in which categories first appear.
pub fn group_skills(skills: Vec<Skill>) -> Vec<SkillGroup> {
    let mut groups: Vec<SkillGroup> = Vec::new();
    for skill in skills {
        let category = skill
            .category
            .clone()
            .unwrap_or_else(|| UNCATEGORIZED.to_string());
        match groups.iter_mut().find(|g| g.category == category) {
            Some(group) => group.skills.push(skill),
            None => groups.push(SkillGroup {
                category,
                skills: vec![skill],
            }),
        }
    }
    groups
}

pub async fn home_page(store: &dyn Store) -> Result<HomePage> {
    let projects = store
        .projects()
        .list()
        .await?
        .into_iter()
        .take(FEATURED_PROJECTS)
        .map(ProjectCard::from)
        .collect();

    Ok(HomePage {
        settings: store.settings().get_or_create().await?,
        projects,
        skill_groups: group_skills(store.skills().list().await?),
        experiences: store.experiences().list().await?,
        testimonials: store.testimonials().list().await?,
        social_links: store.social_links().list().await?,
    })
}

pub async fn all_projects(store: &dyn Store) -> Result<Vec<ProjectCard>> {
    Ok(store
        .projects()
        .list()
        .await?
        .into_iter()
        .map(ProjectCard::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::models::{NewProject, NewSkill};

    fn skill(id: i32, name: &str, category: Option<&str>) -> Skill {
        Skill {
            id,
            name: name.to_string(),
            category: category.map(str::to_string),
            proficiency: 50,
            display_order: 0,
        }
    }

    #[test]
    fn test_group_skills_uses_other_for_missing_category() {
        let groups = group_skills(vec![skill(1, "A", Some("Net")), skill(2, "B", None)]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].category, "Net");
        assert_eq!(groups[0].skills[0].name, "A");
        assert_eq!(groups[1].category, "Other");
        assert_eq!(groups[1].skills[0].name, "B");
    }

    #[tokio::test]
    async fn test_home_page_features_top_six_projects() {
        let store = MemoryStore::new();
        for order in 0..8 {
            store
                .projects()
                .create(&NewProject {
                    title: format!("Project {order}"),
                    description: "d".to_string(),
                    image: None,
                    technologies: Some("Rust, Axum".to_string()),
                    link: None,
                    display_order: 7 - order,
                })
                .await
                .unwrap();
        }
        store
            .skills()
            .create(&NewSkill {
                name: "Rust".to_string(),
                category: None,
                proficiency: 90,
                display_order: 0,
            })
            .await
            .unwrap();

        let page = home_page(&store).await.unwrap();
        assert_eq!(page.projects.len(), FEATURED_PROJECTS);
        assert_eq!(page.projects[0].project.display_order, 0);
        assert_eq!(page.projects[0].technology_list, vec!["Rust", "Axum"]);
        assert_eq!(page.skill_groups[0].category, UNCATEGORIZED);
        assert_eq!(page.settings.profile_name, "Your Name");
        assert_eq!(all_projects(&store).await.unwrap().len(), 8);
    }
}
