use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// --- Policy rules ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRule {
    /// API groups this rule applies to (e.g., "" for core, "*" for all)
    pub api_groups: Vec<String>,
    /// Resource types (e.g., "users", "pods", "*" for all)
    pub resources: Vec<String>,
    /// Allowed verbs (e.g., "get", "impersonate", "*" for all)
    pub verbs: Vec<String>,
    /// Specific object names the rule is limited to (empty = all)
    #[serde(default)]
    pub resource_names: Vec<String>,
}

// --- Subject ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SubjectKind {
    User,
    ServiceAccount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub kind: SubjectKind,
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

// --- Role reference ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RoleRefKind {
    Role,
    ClusterRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleRef {
    pub kind: RoleRefKind,
    pub name: String,
}

// --- Cluster-scoped permission objects ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRole {
    pub name: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    pub rules: Vec<PolicyRule>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRoleBinding {
    pub name: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    pub subjects: Vec<Subject>,
    pub role_ref: RoleRef,
    pub created_at: DateTime<Utc>,
}

// --- Namespaced permission binding ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleBinding {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    pub subjects: Vec<Subject>,
    pub role_ref: RoleRef,
    pub created_at: DateTime<Utc>,
}

// --- Service account principal ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceAccount {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
}

/// Objects discoverable by their label map.
///
/// Label equality is the only association between a Grant and the objects
/// derived from it, so every swept kind must expose its labels.
pub trait Labeled {
    fn labels(&self) -> &HashMap<String, String>;
}

impl Labeled for ClusterRole {
    fn labels(&self) -> &HashMap<String, String> {
        &self.labels
    }
}

impl Labeled for ClusterRoleBinding {
    fn labels(&self) -> &HashMap<String, String> {
        &self.labels
    }
}

impl Labeled for RoleBinding {
    fn labels(&self) -> &HashMap<String, String> {
        &self.labels
    }
}

impl Labeled for ServiceAccount {
    fn labels(&self) -> &HashMap<String, String> {
        &self.labels
    }
}
