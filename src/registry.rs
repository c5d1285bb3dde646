//! Ordered, shared list of monitored projects.

use std::sync::{Arc, RwLock};
use tracing::info;

use crate::error::ValidationError;
use crate::models::{NewProject, Project};

/// Append-only project list shared by the API and the poll scheduler.
///
/// Cloning shares the underlying list.
#[derive(Debug, Clone, Default)]
pub struct ProjectRegistry {
    projects: Arc<RwLock<Vec<Arc<Project>>>>,
}

impl ProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current projects in display order. The returned vector is a copy of
    /// the references, so later appends do not show up in it.
    pub fn list(&self) -> Vec<Arc<Project>> {
        self.projects
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Project>> {
        self.projects
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .find(|p| p.name == name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.projects
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn add(&self, input: NewProject) -> Result<Arc<Project>, ValidationError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingName);
        }
        let endpoint = input.endpoint.trim();
        if endpoint.is_empty() {
            return Err(ValidationError::MissingEndpoint);
        }
        if let Some(lat) = input.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(ValidationError::Latitude(lat));
            }
        }
        if let Some(lon) = input.longitude {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(ValidationError::Longitude(lon));
            }
        }

        let project = Arc::new(Project {
            name: name.to_string(),
            endpoint: normalize_endpoint(endpoint),
            username: input.username,
            password: input.password,
            latitude: input.latitude,
            longitude: input.longitude,
        });

        // Duplicate check and append under one write lock.
        let mut projects = self
            .projects
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if projects.iter().any(|p| p.name == project.name) {
            return Err(ValidationError::DuplicateName(project.name.clone()));
        }
        projects.push(project.clone());
        drop(projects);

        info!(project = %project.name, endpoint = %project.endpoint, "project registered");
        Ok(project)
    }
}

/// The only place endpoints get their trailing `/`.
fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.ends_with('/') {
        endpoint.to_string()
    } else {
        format!("{}/", endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(registry: &ProjectRegistry) -> Vec<String> {
        registry.list().iter().map(|p| p.name.clone()).collect()
    }

    #[test]
    fn test_add_appends_in_order() {
        let registry = ProjectRegistry::new();
        registry.add(NewProject::new("A", "http://a/")).unwrap();
        registry.add(NewProject::new("B", "http://b/")).unwrap();
        let added = registry.add(NewProject::new("P", "http://x")).unwrap();

        assert_eq!(names(&registry), vec!["A", "B", "P"]);
        assert_eq!(added.name, "P");
        assert_eq!(registry.list().last().unwrap().name, "P");
    }

    #[test]
    fn test_missing_name_leaves_list_unchanged() {
        let registry = ProjectRegistry::new();
        registry.add(NewProject::new("A", "http://a/")).unwrap();
        let before = registry.list();

        let err = registry.add(NewProject::new("", "http://x")).unwrap_err();
        assert_eq!(err, ValidationError::MissingName);
        let err = registry.add(NewProject::new("   ", "http://x")).unwrap_err();
        assert_eq!(err, ValidationError::MissingName);

        assert_eq!(registry.list(), before);
    }

    #[test]
    fn test_missing_endpoint_rejected() {
        let registry = ProjectRegistry::new();
        let err = registry.add(NewProject::new("P", "")).unwrap_err();
        assert_eq!(err, ValidationError::MissingEndpoint);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let registry = ProjectRegistry::new();
        registry.add(NewProject::new("P", "http://x/")).unwrap();
        let err = registry.add(NewProject::new(" P ", "http://y/")).unwrap_err();
        assert_eq!(err, ValidationError::DuplicateName("P".into()));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("P").unwrap().endpoint, "http://x/");
    }

    #[test]
    fn test_coordinates_validated() {
        let registry = ProjectRegistry::new();
        let err = registry
            .add(NewProject::new("P", "http://x/").with_location(91.0, 0.0))
            .unwrap_err();
        assert_eq!(err, ValidationError::Latitude(91.0));
        let err = registry
            .add(NewProject::new("P", "http://x/").with_location(0.0, -181.0))
            .unwrap_err();
        assert_eq!(err, ValidationError::Longitude(-181.0));

        let project = registry
            .add(NewProject::new("P", "http://x/").with_location(18.4861, -69.9312))
            .unwrap();
        assert_eq!(project.latitude, Some(18.4861));
    }

    #[test]
    fn test_endpoint_normalized() {
        let registry = ProjectRegistry::new();
        let project = registry
            .add(NewProject::new("P", " https://egauge1.egaug.es/632E1 "))
            .unwrap();
        assert_eq!(project.endpoint, "https://egauge1.egaug.es/632E1/");
        assert_eq!(
            crate::egauge::snapshot_url(&project.endpoint),
            "https://egauge1.egaug.es/632E1/cgi-bin/egauge?inst&tot"
        );

        let project = registry.add(NewProject::new("Q", "http://10.0.0.5/")).unwrap();
        assert_eq!(
            crate::egauge::snapshot_url(&project.endpoint),
            "http://10.0.0.5/cgi-bin/egauge?inst&tot"
        );
    }

    #[test]
    fn test_list_is_a_point_in_time_copy() {
        let registry = ProjectRegistry::new();
        registry.add(NewProject::new("A", "http://a/")).unwrap();
        let snapshot = registry.list();

        registry.add(NewProject::new("B", "http://b/")).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_concurrent_adds_are_not_torn() {
        let registry = ProjectRegistry::new();
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for i in 0..25 {
                        registry
                            .add(NewProject::new(format!("p-{}-{}", t, i), "http://x/"))
                            .unwrap();
                        let _ = registry.list();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(registry.len(), 200);
    }
}
