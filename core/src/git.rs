//! Vendor-agnostic git hosting types
//!
//! Integrations translate their own payloads into these shapes so tasks and
//! routes never depend on a specific hosting service.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    /// Issue number within the repository
    pub id: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub service: String,
    /// `open` or `closed`
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub id: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub merged: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub url: String,
    pub private: bool,
    pub service: String,
}

/// What to do with the issue linked to a task.
///
/// On the wire this is either the keyword `"create"` / `"detach"` or an
/// issue object previously listed for the project, which attaches it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawAction<Issue>")]
pub enum IssueAction {
    Create,
    Detach,
    Attach(Issue),
}

/// What to do with the pull request linked to a task: `"detach"` or a pull
/// request object to attach.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawAction<PullRequest>")]
pub enum PullAction {
    Detach,
    Attach(PullRequest),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAction<T> {
    Keyword(String),
    Object(T),
}

impl TryFrom<RawAction<Issue>> for IssueAction {
    type Error = String;

    fn try_from(raw: RawAction<Issue>) -> Result<Self, Self::Error> {
        match raw {
            RawAction::Keyword(word) => match word.as_str() {
                "create" => Ok(Self::Create),
                "detach" => Ok(Self::Detach),
                other => Err(format!("unknown issue action '{}'", other)),
            },
            RawAction::Object(issue) => Ok(Self::Attach(issue)),
        }
    }
}

impl TryFrom<RawAction<PullRequest>> for PullAction {
    type Error = String;

    fn try_from(raw: RawAction<PullRequest>) -> Result<Self, Self::Error> {
        match raw {
            RawAction::Keyword(word) if word == "detach" => Ok(Self::Detach),
            RawAction::Keyword(other) => Err(format!("unknown pull request action '{}'", other)),
            RawAction::Object(pull) => Ok(Self::Attach(pull)),
        }
    }
}
