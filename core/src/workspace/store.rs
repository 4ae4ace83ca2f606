//! Workspace persistent store

use std::path::PathBuf;

use chrono::Utc;
use uuid::Uuid;

use crate::storage::JsonCollection;
use crate::validation;
use crate::Result;

use super::model::{Workspace, INBOX_ID};

#[derive(Clone)]
pub struct WorkspaceStore {
    workspaces: JsonCollection<Workspace>,
}

impl WorkspaceStore {
    pub async fn new(file_path: PathBuf) -> Result<Self> {
        Ok(Self {
            workspaces: JsonCollection::open(file_path).await?,
        })
    }

    /// Workspaces of a user ordered by name, then id
    pub async fn list_for_user(&self, user_id: Uuid) -> Vec<Workspace> {
        let mut workspaces = self.workspaces.filter(|w| w.user_id == user_id).await;
        workspaces.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        workspaces
    }

    pub async fn get(&self, user_id: Uuid, id: u64) -> Option<Workspace> {
        self.workspaces.get((user_id, id)).await
    }

    pub async fn create(&self, user_id: Uuid, name: &str) -> Result<Workspace> {
        let name = validation::name(name)?;
        self.workspaces
            .insert_with(|existing| {
                let next_id = existing
                    .values()
                    .filter(|w| w.user_id == user_id)
                    .map(|w| w.id)
                    .max()
                    .unwrap_or(INBOX_ID)
                    + 1;
                Ok(Workspace::new(next_id, user_id, name))
            })
            .await
    }

    /// Return the user's inbox, creating it on first use
    pub async fn ensure_inbox(&self, user_id: Uuid) -> Result<Workspace> {
        if let Some(inbox) = self.get(user_id, INBOX_ID).await {
            return Ok(inbox);
        }
        self.workspaces.insert(Workspace::inbox(user_id)).await
    }

    pub async fn rename(&self, user_id: Uuid, id: u64, name: &str) -> Result<Workspace> {
        let name = validation::name(name)?;
        self.workspaces
            .update((user_id, id), |workspace| {
                workspace.name = name;
                workspace.updated_at = Utc::now();
                Ok(workspace.clone())
            })
            .await
    }

    pub async fn delete(&self, user_id: Uuid, id: u64) -> Result<Option<Workspace>> {
        self.workspaces.remove((user_id, id)).await
    }

    pub async fn delete_for_user(&self, user_id: Uuid) -> Result<usize> {
        Ok(self
            .workspaces
            .remove_where(|w| w.user_id == user_id)
            .await?
            .len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_workspace_store_numbers_per_user_and_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("workspaces.json");
        let store = WorkspaceStore::new(path.clone()).await.unwrap();

        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let first = store.create(alice, " Platform ").await.unwrap();
        let second = store.create(alice, "Design").await.unwrap();
        let bobs = store.create(bob, "Personal").await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(first.name, "Platform");
        assert_eq!(second.id, 2);
        assert_eq!(bobs.id, 1);

        let store2 = WorkspaceStore::new(path).await.unwrap();
        let listed = store2.list_for_user(alice).await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "Design");
    }

    #[tokio::test]
    async fn test_inbox_does_not_shift_numbering() {
        let dir = tempdir().unwrap();
        let store = WorkspaceStore::new(dir.path().join("workspaces.json"))
            .await
            .unwrap();
        let user = Uuid::new_v4();

        let inbox = store.ensure_inbox(user).await.unwrap();
        let again = store.ensure_inbox(user).await.unwrap();
        assert_eq!(inbox.id, 0);
        assert_eq!(again.created_at, inbox.created_at);

        let created = store.create(user, "Work").await.unwrap();
        assert_eq!(created.id, 1);
    }

    #[tokio::test]
    async fn test_rename_validates_and_reports_missing() {
        let dir = tempdir().unwrap();
        let store = WorkspaceStore::new(dir.path().join("workspaces.json"))
            .await
            .unwrap();
        let user = Uuid::new_v4();
        let created = store.create(user, "Work").await.unwrap();

        let renamed = store.rename(user, created.id, "Home").await.unwrap();
        assert_eq!(renamed.name, "Home");

        let invalid = store.rename(user, created.id, "  ").await;
        assert!(matches!(invalid, Err(Error::InvalidInput(_))));

        let missing = store.rename(user, 42, "Other").await;
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }
}
