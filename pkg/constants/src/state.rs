//! State store registry key prefixes.
//!
//! Hub and spoke stores share the etcd-style `/registry/...` key scheme.
//! Cluster-scoped kinds key by name, namespaced kinds by `<ns>/<name>`.

/// Hub store: Grant objects.
pub const GRANT_PREFIX: &str = "/registry/grants/";

/// Spoke store: cluster-scoped permission objects.
pub const CLUSTER_ROLE_PREFIX: &str = "/registry/clusterroles/";

/// Spoke store: cluster-scoped permission bindings.
pub const CLUSTER_ROLE_BINDING_PREFIX: &str = "/registry/clusterrolebindings/";

/// Spoke store: namespaced permission bindings (`<prefix><ns>/<name>`).
pub const ROLE_BINDING_PREFIX: &str = "/registry/rolebindings/";

/// Spoke store: service account principals (`<prefix><ns>/<name>`).
pub const SERVICE_ACCOUNT_PREFIX: &str = "/registry/serviceaccounts/";
