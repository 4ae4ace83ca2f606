//! Status persistent store

use std::path::PathBuf;

use uuid::Uuid;

use crate::error::Error;
use crate::storage::JsonCollection;
use crate::Result;

use super::model::{Status, UpdateStatusRequest};

#[derive(Clone)]
pub struct StatusStore {
    statuses: JsonCollection<Status>,
}

impl StatusStore {
    pub async fn new(file_path: PathBuf) -> Result<Self> {
        Ok(Self {
            statuses: JsonCollection::open(file_path).await?,
        })
    }

    /// Statuses of a project ordered by ordinal
    pub async fn list(&self, project_id: Uuid) -> Vec<Status> {
        let mut statuses = self.statuses.filter(|s| s.project_id == project_id).await;
        statuses.sort_by(|a, b| a.ordinal.cmp(&b.ordinal).then(a.name.cmp(&b.name)));
        statuses
    }

    pub async fn get(&self, project_id: Uuid, id: Uuid) -> Option<Status> {
        self.statuses
            .get(id)
            .await
            .filter(|s| s.project_id == project_id)
    }

    pub async fn insert(&self, status: Status) -> Result<Status> {
        self.statuses.insert(status).await
    }

    /// The default columns of a new project
    pub async fn create_defaults(&self, project_id: Uuid) -> Result<Vec<Status>> {
        self.statuses.insert_many(Status::defaults(project_id)).await
    }

    pub async fn update(
        &self,
        project_id: Uuid,
        id: Uuid,
        request: UpdateStatusRequest,
    ) -> Result<Status> {
        self.statuses
            .update(id, |status| {
                if status.project_id != project_id {
                    return Err(Error::not_found("Status", id));
                }
                request.apply(status)?;
                Ok(status.clone())
            })
            .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<Option<Status>> {
        self.statuses.remove(id).await
    }

    pub async fn first_begin(&self, project_id: Uuid) -> Option<Status> {
        self.list(project_id).await.into_iter().find(|s| s.begin)
    }

    pub async fn first_final(&self, project_id: Uuid) -> Option<Status> {
        self.list(project_id).await.into_iter().find(|s| s.is_final)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_list_is_ordered_and_scoped_to_project() {
        let dir = tempdir().unwrap();
        let store = StatusStore::new(dir.path().join("statuses.json"))
            .await
            .unwrap();
        let project = Uuid::new_v4();
        let other = Uuid::new_v4();

        store.create_defaults(project).await.unwrap();
        store.insert(Status::new(other, "Elsewhere", 0, 0)).await.unwrap();

        let listed = store.list(project).await;
        let names: Vec<_> = listed.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["To Do", "In Progress", "Done"]);

        assert_eq!(store.first_begin(project).await.unwrap().name, "To Do");
        assert_eq!(store.first_final(project).await.unwrap().name, "Done");
        assert!(store.get(other, listed[0].id).await.is_none());
    }

    #[tokio::test]
    async fn test_update_rejects_status_of_other_project() {
        let dir = tempdir().unwrap();
        let store = StatusStore::new(dir.path().join("statuses.json"))
            .await
            .unwrap();
        let status = store
            .insert(Status::new(Uuid::new_v4(), "Open", 0, 0))
            .await
            .unwrap();

        let result = store
            .update(Uuid::new_v4(), status.id, UpdateStatusRequest::default())
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }
}
