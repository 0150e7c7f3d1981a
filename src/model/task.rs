use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// A task as returned by the task service, projected to the fields a sprint close needs.
#[derive(Debug, Clone, Deserialize)]
pub struct Task {
    pub gid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub assignee: Option<UserRef>,
    #[serde(default)]
    pub memberships: Vec<Membership>,
    #[serde(default)]
    pub custom_fields: Vec<CustomFieldValue>,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub gid: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GidRef {
    gid: String,
}

#[derive(Debug, Deserialize)]
struct RawMembership {
    project: Option<GidRef>,
    section: Option<GidRef>,
}

/// One placement of a task: a section on a project board.
///
/// Reads the nested `{ "project": { "gid" }, "section": { "gid" } }` shape and
/// writes the flat `{ "project": gid, "section": gid }` shape create calls expect.
/// A placement without a section is written as `{ "project": gid }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Membership {
    pub project: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

impl Membership {
    pub fn new(project: impl Into<String>, section: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            section: Some(section.into()),
        }
    }
}

impl<'de> Deserialize<'de> for Membership {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawMembership::deserialize(deserializer)?;
        Ok(Membership {
            project: raw.project.map(|p| p.gid).unwrap_or_default(),
            section: raw.section.map(|s| s.gid),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Enum,
    Text,
    Number,
    Other(String),
}

impl From<String> for FieldKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "enum" => FieldKind::Enum,
            "text" => FieldKind::Text,
            "number" => FieldKind::Number,
            _ => FieldKind::Other(kind),
        }
    }
}

impl<'de> Deserialize<'de> for FieldKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(FieldKind::from)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnumOption {
    pub gid: String,
}

/// A custom field as attached to a task. Only the value slot matching `kind` is meaningful.
#[derive(Debug, Clone, Deserialize)]
pub struct CustomFieldValue {
    pub gid: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default)]
    pub enum_value: Option<EnumOption>,
    #[serde(default)]
    pub text_value: Option<String>,
    #[serde(default)]
    pub number_value: Option<f64>,
}

/// Value written for one custom field on a newly created task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// gid of the chosen enum option
    Option(String),
    Text(Option<String>),
    Number(Option<f64>),
}

/// Payload of a create call: the duplicate of an unfinished task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTask {
    pub name: String,
    pub assignee: Option<String>,
    pub memberships: Vec<Membership>,
    pub custom_fields: BTreeMap<String, FieldValue>,
}

/// Partial update; unset fields are left untouched by the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TaskUpdate {
    pub fn complete() -> Self {
        Self {
            completed: Some(true),
        }
    }
}
