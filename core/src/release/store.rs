//! Release persistent store

use std::path::PathBuf;

use uuid::Uuid;

use crate::error::Error;
use crate::storage::JsonCollection;
use crate::Result;

use super::model::Release;

#[derive(Clone)]
pub struct ReleaseStore {
    releases: JsonCollection<Release>,
}

impl ReleaseStore {
    pub async fn new(file_path: PathBuf) -> Result<Self> {
        Ok(Self {
            releases: JsonCollection::open(file_path).await?,
        })
    }

    /// Releases of a project ordered by deadline
    pub async fn list(&self, project_id: Uuid) -> Vec<Release> {
        let mut releases = self.releases.filter(|r| r.project_id == project_id).await;
        releases.sort_by(|a, b| a.deadline.cmp(&b.deadline).then(a.name.cmp(&b.name)));
        releases
    }

    pub async fn get(&self, project_id: Uuid, id: Uuid) -> Option<Release> {
        self.releases
            .get(id)
            .await
            .filter(|r| r.project_id == project_id)
    }

    pub async fn insert(&self, release: Release) -> Result<Release> {
        self.releases.insert(release).await
    }

    pub async fn update<F>(&self, project_id: Uuid, id: Uuid, apply: F) -> Result<Release>
    where
        F: FnOnce(&mut Release) -> Result<()>,
    {
        self.releases
            .update(id, |release| {
                if release.project_id != project_id {
                    return Err(Error::not_found("Release", id));
                }
                apply(release)?;
                Ok(release.clone())
            })
            .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<Option<Release>> {
        self.releases.remove(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::CreateReleaseRequest;
    use chrono::{Duration, Utc};
    use tempfile::tempdir;

    fn release(project_id: Uuid, name: &str, days: i64) -> Release {
        CreateReleaseRequest {
            name: name.to_string(),
            description: String::new(),
            deadline: Utc::now() + Duration::days(days),
        }
        .into_release(project_id)
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_by_deadline_and_scoped_get() {
        let dir = tempdir().unwrap();
        let store = ReleaseStore::new(dir.path().join("releases.json")).await.unwrap();
        let project = Uuid::new_v4();

        store.insert(release(project, "2.0", 60)).await.unwrap();
        let first = store.insert(release(project, "1.0", 10)).await.unwrap();

        let names: Vec<_> = store.list(project).await.into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["1.0", "2.0"]);

        assert!(store.get(Uuid::new_v4(), first.id).await.is_none());
        assert!(store
            .update(Uuid::new_v4(), first.id, |_| Ok(()))
            .await
            .is_err());
    }
}
