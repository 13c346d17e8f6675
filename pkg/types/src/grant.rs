use crate::rbac::Subject;
use crate::validate::validate_name;
use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use pkg_constants::auth;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reference to the role a Grant confers on its subject.
///
/// `namespaces: None` means the role is granted cluster-wide; otherwise one
/// namespaced binding is materialized per listed namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantRoleRef {
    pub name: String,
    #[serde(default)]
    pub namespaces: Option<Vec<String>>,
}

impl GrantRoleRef {
    pub fn is_cluster_scoped(&self) -> bool {
        self.namespaces.is_none()
    }
}

/// Hub-resident declaration mapping one subject to one role on the spoke.
///
/// Only the finalizer list is ever written back to the hub by the agent;
/// everything else is authored by the administrator. The labels double as the
/// association key for every object derived from this Grant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grant {
    pub name: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    pub subjects: Vec<Subject>,
    pub role_ref: GrantRoleRef,
    #[serde(default)]
    pub finalizers: Vec<String>,
    #[serde(default)]
    pub deletion_timestamp: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Grant {
    /// The single honored subject. Entries past the first are ignored.
    pub fn subject(&self) -> Result<&Subject> {
        match self.subjects.first() {
            Some(subject) => Ok(subject),
            None => bail!("grant '{}' has no subjects", self.name),
        }
    }

    /// Identifier of the owning hub, read from the well-known label.
    pub fn hub_owner_id(&self) -> Result<&str> {
        match self.labels.get(auth::HUB_OWNER_LABEL) {
            Some(owner) => Ok(owner),
            None => bail!("grant '{}' is missing label {}", self.name, auth::HUB_OWNER_LABEL),
        }
    }

    pub fn is_deleting(&self) -> bool {
        self.deletion_timestamp.is_some()
    }

    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.finalizers.iter().any(|f| f == finalizer)
    }

    pub fn add_finalizer(&mut self, finalizer: &str) {
        if !self.has_finalizer(finalizer) {
            self.finalizers.push(finalizer.to_string());
        }
    }

    pub fn remove_finalizer(&mut self, finalizer: &str) {
        self.finalizers.retain(|f| f != finalizer);
    }

    /// Reject malformed grants before any spoke object is materialized.
    /// A grant with zero subjects or no owner label can never converge.
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        self.subject()?;
        self.hub_owner_id()?;
        if self.role_ref.name.is_empty() {
            bail!("grant '{}' has an empty role reference", self.name);
        }
        if let Some(namespaces) = &self.role_ref.namespaces {
            for ns in namespaces {
                validate_name(ns)?;
            }
        }
        Ok(())
    }
}

/// Name of the impersonation role derived from a (subject, hub owner) pair.
/// Must stay bit-exact across restarts: the name is the object's identity.
pub fn impersonation_role_name(subject: &str, owner: &str) -> String {
    format!("impersonate-{}-{}", subject, owner)
}

/// Name of the binding that attaches the impersonation proxy to the role.
pub fn impersonation_binding_name(subject: &str, owner: &str) -> String {
    format!(
        "impersonate-{}-{}-{}",
        subject,
        owner,
        auth::IMPERSONATION_BINDING_SUFFIX
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::SubjectKind;

    fn base_grant() -> Grant {
        let mut labels = HashMap::new();
        labels.insert(auth::HUB_OWNER_LABEL.to_string(), "hub1".to_string());
        Grant {
            name: "g1".to_string(),
            labels,
            subjects: vec![Subject {
                kind: SubjectKind::User,
                name: "alice".to_string(),
                namespace: None,
            }],
            role_ref: GrantRoleRef {
                name: "viewer".to_string(),
                namespaces: None,
            },
            finalizers: vec![],
            deletion_timestamp: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn derived_names_are_deterministic() {
        assert_eq!(impersonation_role_name("alice", "hub1"), "impersonate-alice-hub1");
        assert_eq!(
            impersonation_binding_name("alice", "hub1"),
            "impersonate-alice-hub1-rolebinding"
        );
    }

    #[test]
    fn valid_grant_passes() {
        assert!(base_grant().validate().is_ok());
    }

    #[test]
    fn zero_subjects_rejected() {
        let mut grant = base_grant();
        grant.subjects.clear();
        let err = grant.validate().unwrap_err();
        assert!(err.to_string().contains("no subjects"));
    }

    #[test]
    fn missing_owner_label_rejected() {
        let mut grant = base_grant();
        grant.labels.remove(auth::HUB_OWNER_LABEL);
        assert!(grant.validate().is_err());
    }

    #[test]
    fn bad_namespace_rejected() {
        let mut grant = base_grant();
        grant.role_ref.namespaces = Some(vec!["Prod".to_string()]);
        assert!(grant.validate().is_err());
    }

    #[test]
    fn finalizer_helpers() {
        let mut grant = base_grant();
        assert!(!grant.has_finalizer(auth::SPOKE_CLEANUP_FINALIZER));
        grant.add_finalizer(auth::SPOKE_CLEANUP_FINALIZER);
        grant.add_finalizer(auth::SPOKE_CLEANUP_FINALIZER);
        assert_eq!(grant.finalizers.len(), 1);
        grant.remove_finalizer(auth::SPOKE_CLEANUP_FINALIZER);
        assert!(grant.finalizers.is_empty());
    }
}
