use serde::Serialize;
use uuid::Uuid;

use crate::error::Error;
use crate::project::{
    CreateProjectRequest, Project, ProjectMember, ProjectRole, UpdateProjectRequest,
};
use crate::validation;
use crate::workspace::INBOX_ID;
use crate::Result;

use super::Tracker;

/// A project as seen by one of its members
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetails {
    #[serde(flatten)]
    pub project: Project,
    pub role: ProjectRole,
    pub privileges: u8,
    pub workspace_id: u64,
}

impl ProjectDetails {
    fn new(project: Project, member: &ProjectMember) -> Self {
        Self {
            project,
            role: member.role,
            privileges: member.role.privileges(),
            workspace_id: member.workspace_id,
        }
    }
}

impl Tracker {
    /// Create a project in one of the caller's workspaces with the default
    /// status columns; the caller becomes its owner.
    pub async fn create_project(
        &self,
        user_id: Uuid,
        request: CreateProjectRequest,
    ) -> Result<ProjectDetails> {
        let (name, description) = request.normalized()?;
        if self
            .workspaces
            .get(user_id, request.workspace_id)
            .await
            .is_none()
        {
            return Err(Error::not_found("Workspace", request.workspace_id));
        }

        let project = self.projects.insert(Project::new(name, description)).await?;
        self.statuses.create_defaults(project.id).await?;
        let member = self
            .projects
            .add_member(ProjectMember::new(
                project.id,
                user_id,
                request.workspace_id,
                ProjectRole::Owner,
            ))
            .await?;

        tracing::info!(project_id = %project.id, user_id = %user_id, "project created");
        Ok(ProjectDetails::new(project, &member))
    }

    pub async fn get_project(&self, user_id: Uuid, id: Uuid) -> Result<ProjectDetails> {
        let (project, member) = self.membership(user_id, id).await?;
        Ok(ProjectDetails::new(project, &member))
    }

    pub async fn list_projects(&self, user_id: Uuid) -> Vec<ProjectDetails> {
        let mut result = Vec::new();
        for member in self.projects.memberships_for_user(user_id).await {
            if let Some(project) = self.projects.get(member.project_id).await {
                result.push(ProjectDetails::new(project, &member));
            }
        }
        result.sort_by(|a, b| {
            a.project
                .name
                .cmp(&b.project.name)
                .then(a.project.id.cmp(&b.project.id))
        });
        result
    }

    /// Apply a partial update. Moving the project to another workspace only
    /// refiles the caller's own membership.
    pub async fn update_project(
        &self,
        user_id: Uuid,
        id: Uuid,
        request: UpdateProjectRequest,
    ) -> Result<ProjectDetails> {
        let (_, mut member) = self.membership(user_id, id).await?;

        let name = request.name.as_deref().map(validation::name).transpose()?;
        let description = request
            .description
            .as_deref()
            .map(validation::description)
            .transpose()?;

        if let Some(workspace_id) = request.workspace_id {
            if workspace_id != member.workspace_id {
                if self.workspaces.get(user_id, workspace_id).await.is_none() {
                    return Err(Error::not_found("Workspace", workspace_id));
                }
                let previous = member.workspace_id;
                member = self.projects.move_member(id, user_id, workspace_id).await?;
                if previous == INBOX_ID && !self.projects.workspace_in_use(user_id, INBOX_ID).await {
                    self.workspaces.delete(user_id, INBOX_ID).await?;
                }
            }
        }

        let project = self
            .projects
            .update(id, |project| {
                if let Some(name) = name {
                    project.name = name;
                }
                if let Some(description) = description {
                    project.description = description;
                }
                Ok(())
            })
            .await?;
        Ok(ProjectDetails::new(project, &member))
    }

    /// Soft delete; owners only
    pub async fn delete_project(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        let (_, member) = self.membership(user_id, id).await?;
        if member.role != ProjectRole::Owner {
            return Err(Error::Forbidden(
                "only the project owner can delete it".to_string(),
            ));
        }
        self.projects.soft_delete(id).await?;
        tracing::info!(project_id = %id, user_id = %user_id, "project deleted");
        Ok(())
    }

    pub async fn list_members(&self, user_id: Uuid, id: Uuid) -> Result<Vec<ProjectMember>> {
        self.require_member(user_id, id).await?;
        Ok(self.projects.members(id).await)
    }

    pub async fn get_member(
        &self,
        user_id: Uuid,
        id: Uuid,
        member_id: Uuid,
    ) -> Result<ProjectMember> {
        self.require_member(user_id, id).await?;
        self.projects
            .member(id, member_id)
            .await
            .ok_or_else(|| Error::not_found("Project member", member_id))
    }

    /// File every invitee as a member of each listed project the caller
    /// belongs to, in the invitee's inbox. Returns the projects that took
    /// part; empty when there was nobody to invite.
    pub async fn invite(
        &self,
        user_id: Uuid,
        invitees: &[Uuid],
        project_ids: &[Uuid],
    ) -> Result<Vec<Uuid>> {
        let mut accepted = Vec::new();
        for &project_id in project_ids {
            if accepted.contains(&project_id) || !self.is_member(user_id, project_id).await {
                continue;
            }
            accepted.push(project_id);
            for &invitee in invitees {
                if self.projects.member(project_id, invitee).await.is_some() {
                    continue;
                }
                self.workspaces.ensure_inbox(invitee).await?;
                self.projects
                    .add_member(ProjectMember::new(
                        project_id,
                        invitee,
                        INBOX_ID,
                        ProjectRole::Member,
                    ))
                    .await?;
                tracing::debug!(project_id = %project_id, user_id = %invitee, "member invited");
            }
        }
        if invitees.is_empty() {
            accepted.clear();
        }
        Ok(accepted)
    }

    /// Remove members other than the caller; owners only
    pub async fn remove_members(
        &self,
        user_id: Uuid,
        id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<Vec<Uuid>> {
        let (_, member) = self.membership(user_id, id).await?;
        if !member.role.can_manage_members() {
            return Err(Error::Forbidden(
                "only the project owner can remove members".to_string(),
            ));
        }
        let mut removed = Vec::new();
        for &target in user_ids.iter().filter(|target| **target != user_id) {
            if self.projects.remove_member(id, target).await?.is_some() {
                self.meetings.remove_participant(id, target).await?;
                removed.push(target);
            }
        }
        Ok(removed)
    }

    pub async fn leave_project(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        self.require_member(user_id, id).await?;
        self.projects.remove_member(id, user_id).await?;
        self.meetings.remove_participant(id, user_id).await?;
        tracing::debug!(project_id = %id, user_id = %user_id, "member left project");
        Ok(())
    }

    /// Members of a live project, for integrations resolving users
    pub async fn project_members(&self, id: Uuid) -> Vec<ProjectMember> {
        if self.projects.get(id).await.is_none() {
            return Vec::new();
        }
        self.projects.members(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::test_support::fixture;

    #[tokio::test]
    async fn test_create_project_adds_owner_and_default_statuses() {
        let fx = fixture().await;
        let details = fx.tracker.get_project(fx.owner, fx.project.id).await.unwrap();
        assert_eq!(details.role, ProjectRole::Owner);
        assert_eq!(details.privileges, 1);

        let statuses = fx
            .tracker
            .list_statuses(fx.owner, fx.project.id)
            .await
            .unwrap();
        let names: Vec<_> = statuses.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["To Do", "In Progress", "Done"]);
    }

    #[tokio::test]
    async fn test_create_project_in_foreign_workspace_fails() {
        let fx = fixture().await;
        let err = fx
            .tracker
            .create_project(
                Uuid::new_v4(),
                CreateProjectRequest {
                    name: "Other".to_string(),
                    description: String::new(),
                    workspace_id: 1,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_non_member_sees_not_found() {
        let fx = fixture().await;
        let err = fx
            .tracker
            .get_project(Uuid::new_v4(), fx.project.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_invite_lands_in_inbox_and_member_cannot_delete() {
        let fx = fixture().await;
        let member = fx.member().await;

        let details = fx.tracker.get_project(member, fx.project.id).await.unwrap();
        assert_eq!(details.workspace_id, INBOX_ID);
        assert_eq!(details.role, ProjectRole::Member);

        let err = fx
            .tracker
            .delete_project(member, fx.project.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        let again = fx
            .tracker
            .invite(fx.owner, &[member], &[fx.project.id])
            .await
            .unwrap();
        assert_eq!(again, vec![fx.project.id]);
        assert_eq!(
            fx.tracker
                .list_members(fx.owner, fx.project.id)
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn test_invite_without_membership_or_invitees_is_empty() {
        let fx = fixture().await;
        let outsider = Uuid::new_v4();
        let accepted = fx
            .tracker
            .invite(outsider, &[Uuid::new_v4()], &[fx.project.id])
            .await
            .unwrap();
        assert!(accepted.is_empty());

        let none = fx.tracker.invite(fx.owner, &[], &[fx.project.id]).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_remove_members_skips_self_and_requires_owner() {
        let fx = fixture().await;
        let member = fx.member().await;

        let err = fx
            .tracker
            .remove_members(member, fx.project.id, &[fx.owner])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        let removed = fx
            .tracker
            .remove_members(fx.owner, fx.project.id, &[fx.owner, member])
            .await
            .unwrap();
        assert_eq!(removed, vec![member]);
        assert!(!fx.tracker.is_member(member, fx.project.id).await);
        assert!(fx.tracker.is_member(fx.owner, fx.project.id).await);
    }

    #[tokio::test]
    async fn test_moving_out_of_inbox_drops_empty_inbox() {
        let fx = fixture().await;
        let member = fx.member().await;
        let own = fx.tracker.create_workspace(member, "Mine").await.unwrap();

        let details = fx
            .tracker
            .update_project(
                member,
                fx.project.id,
                UpdateProjectRequest {
                    workspace_id: Some(own.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(details.workspace_id, own.id);
        assert!(fx.tracker.get_workspace(member, INBOX_ID).await.is_err());
    }

    #[tokio::test]
    async fn test_deleted_project_disappears() {
        let fx = fixture().await;
        fx.tracker.delete_project(fx.owner, fx.project.id).await.unwrap();
        assert!(fx.tracker.get_project(fx.owner, fx.project.id).await.is_err());
        assert!(fx.tracker.list_projects(fx.owner).await.is_empty());
    }
}
