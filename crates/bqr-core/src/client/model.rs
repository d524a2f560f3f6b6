//! Dataset resource fields read and written by the access commands.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Why a dataset id string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseDatasetRefError {
    #[error("dataset id is empty")]
    Empty,
    #[error("dataset id `{0}` has no project and no default project is configured")]
    MissingProject(String),
    #[error("invalid dataset id `{0}` (letters, digits and underscores only)")]
    InvalidDatasetId(String),
    #[error("invalid project id `{0}`")]
    InvalidProjectId(String),
}

/// `project.dataset` pair identifying a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetRef {
    pub project_id: String,
    pub dataset_id: String,
}

impl DatasetRef {
    pub fn new(project_id: impl Into<String>, dataset_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            dataset_id: dataset_id.into(),
        }
    }

    /// Parses `project.dataset` or a bare `dataset` qualified with
    /// `default_project`. Domain-scoped projects (`example.com:proj`) are
    /// accepted; the dataset id is whatever follows the last `.`.
    pub fn parse(s: &str, default_project: Option<&str>) -> Result<Self, ParseDatasetRefError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseDatasetRefError::Empty);
        }
        let (project, dataset) = match s.rsplit_once('.') {
            Some((project, dataset)) => (project, dataset),
            None => match default_project {
                Some(project) => (project, s),
                None => return Err(ParseDatasetRefError::MissingProject(s.to_string())),
            },
        };
        if dataset.is_empty() || !dataset.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ParseDatasetRefError::InvalidDatasetId(dataset.to_string()));
        }
        let project_ok = !project.is_empty()
            && project
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | ':'));
        if !project_ok {
            return Err(ParseDatasetRefError::InvalidProjectId(project.to_string()));
        }
        Ok(Self::new(project, dataset))
    }
}

impl fmt::Display for DatasetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.project_id, self.dataset_id)
    }
}

/// One entry of a dataset's `access` list: a role granted to one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_by_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iam_member: Option<String>,
    /// Authorized view, routine or dataset; kept opaque.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl AccessEntry {
    pub fn user(role: &str, email: &str) -> Self {
        Self {
            role: Some(role.to_string()),
            user_by_email: Some(email.to_string()),
            ..Self::default()
        }
    }

    pub fn group(role: &str, email: &str) -> Self {
        Self {
            role: Some(role.to_string()),
            group_by_email: Some(email.to_string()),
            ..Self::default()
        }
    }

    /// Field name and value of a string-typed entity.
    fn entity(&self) -> Option<(&'static str, &str)> {
        [
            ("userByEmail", &self.user_by_email),
            ("groupByEmail", &self.group_by_email),
            ("domain", &self.domain),
            ("specialGroup", &self.special_group),
            ("iamMember", &self.iam_member),
        ]
        .into_iter()
        .find_map(|(name, value)| value.as_deref().map(|v| (name, v)))
    }

    /// Email, domain, special group or IAM member this entry grants to.
    /// `None` for authorized views, routines and datasets.
    pub fn entity_id(&self) -> Option<&str> {
        self.entity().map(|(_, id)| id)
    }

    pub fn entity_type(&self) -> Option<&'static str> {
        self.entity()
            .map(|(name, _)| name)
            .or_else(|| ["view", "routine", "dataset"].into_iter().find(|k| self.other.contains_key(*k)))
    }
}

/// Dataset fields that can be sent in a partial update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetField {
    Access,
    Description,
    FriendlyName,
    Labels,
    DefaultTableExpirationMs,
}

impl DatasetField {
    pub fn api_name(self) -> &'static str {
        match self {
            DatasetField::Access => "access",
            DatasetField::Description => "description",
            DatasetField::FriendlyName => "friendlyName",
            DatasetField::Labels => "labels",
            DatasetField::DefaultTableExpirationMs => "defaultTableExpirationMs",
        }
    }
}

/// Dataset resource. Fields not modelled here are kept in `other` so a
/// read-modify-write cycle does not drop them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub dataset_reference: DatasetRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default)]
    pub access: Vec<AccessEntry>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Dataset {
    pub fn new(reference: DatasetRef) -> Self {
        Self {
            dataset_reference: reference,
            etag: None,
            access: Vec::new(),
            other: Map::new(),
        }
    }

    /// Body of a PATCH request carrying only `fields`. Unset fields are sent
    /// as `null`, which clears them on the server.
    pub fn patch_body(&self, fields: &[DatasetField]) -> Result<Value, serde_json::Error> {
        let mut body = Map::new();
        for field in fields {
            let value = match field {
                DatasetField::Access => serde_json::to_value(&self.access)?,
                other => self.other.get(other.api_name()).cloned().unwrap_or(Value::Null),
            };
            body.insert(field.api_name().to_string(), value);
        }
        Ok(Value::Object(body))
    }
}
