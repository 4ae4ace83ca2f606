//! Status model definitions

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::Entity;
use crate::validation;
use crate::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    /// RGB color packed into an integer
    pub color: u32,
    pub ordinal: u32,
    /// Tasks opened on a linked service land in the first begin status
    pub begin: bool,
    /// Tasks in a final status count as done
    #[serde(rename = "final")]
    pub is_final: bool,
}

impl Status {
    pub fn new(project_id: Uuid, name: impl Into<String>, color: u32, ordinal: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id,
            name: name.into(),
            color,
            ordinal,
            begin: false,
            is_final: false,
        }
    }

    pub fn with_begin(mut self, begin: bool) -> Self {
        self.begin = begin;
        self
    }

    pub fn with_final(mut self, is_final: bool) -> Self {
        self.is_final = is_final;
        self
    }

    /// Columns every new project starts with
    pub fn defaults(project_id: Uuid) -> Vec<Self> {
        vec![
            Self::new(project_id, "To Do", 0x4C9AFF, 0).with_begin(true),
            Self::new(project_id, "In Progress", 0xFFAB00, 1),
            Self::new(project_id, "Done", 0x36B37E, 2).with_final(true),
        ]
    }
}

impl Entity for Status {
    type Key = Uuid;
    const NAME: &'static str = "Status";

    fn key(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStatusRequest {
    pub name: String,
    #[serde(default)]
    pub color: u32,
    #[serde(default)]
    pub ordinal: u32,
    #[serde(default)]
    pub begin: bool,
    #[serde(default, rename = "final")]
    pub is_final: bool,
}

impl CreateStatusRequest {
    pub fn into_status(self, project_id: Uuid) -> Result<Status> {
        let name = validation::name(&self.name)?;
        Ok(Status::new(project_id, name, self.color, self.ordinal)
            .with_begin(self.begin)
            .with_final(self.is_final))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub name: Option<String>,
    pub color: Option<u32>,
    pub ordinal: Option<u32>,
    pub begin: Option<bool>,
    #[serde(rename = "final")]
    pub is_final: Option<bool>,
}

impl UpdateStatusRequest {
    pub fn apply(self, status: &mut Status) -> Result<()> {
        if let Some(name) = self.name {
            status.name = validation::name(&name)?;
        }
        if let Some(color) = self.color {
            status.color = color;
        }
        if let Some(ordinal) = self.ordinal {
            status.ordinal = ordinal;
        }
        if let Some(begin) = self.begin {
            status.begin = begin;
        }
        if let Some(is_final) = self.is_final {
            status.is_final = is_final;
        }
        Ok(())
    }
}
