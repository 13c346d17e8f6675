//! Authorization constants: finalizer, owner label, impersonation proxy.

/// Finalizer placed on every Grant while its spoke-side objects exist.
/// Deletion of the hub object is held back until the spoke cleanup has run.
pub const SPOKE_CLEANUP_FINALIZER: &str = "authorization.authsync.dev/spoke-cleanup";

/// Label on a Grant carrying the identifier of the hub that owns it.
/// The value becomes the `<owner>` segment of derived impersonation names.
pub const HUB_OWNER_LABEL: &str = "authorization.authsync.dev/hub-owner";

/// Service account that fronts impersonated requests on the spoke.
/// Every impersonation binding grants this identity, never the end user.
pub const IMPERSONATION_PROXY_NAME: &str = "cluster-gateway";

/// Namespace of the impersonation proxy service account.
pub const IMPERSONATION_PROXY_NAMESPACE: &str = "authsync-system";

/// Suffix appended to an impersonation role name to form its binding name.
pub const IMPERSONATION_BINDING_SUFFIX: &str = "rolebinding";
