use chrono::Utc;
use pkg_constants::{auth, state as keys};
use pkg_state::client::StateStore;
use pkg_types::grant::{Grant, impersonation_binding_name, impersonation_role_name};
use pkg_types::rbac::{
    ClusterRole, ClusterRoleBinding, Labeled, PolicyRule, RoleBinding, RoleRef, RoleRefKind,
    ServiceAccount, Subject, SubjectKind,
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::sync::{create_or_update, get_as, list_as};

fn grant_key(name: &str) -> String {
    format!("{}{}", keys::GRANT_PREFIX, name)
}

fn cluster_role_key(name: &str) -> String {
    format!("{}{}", keys::CLUSTER_ROLE_PREFIX, name)
}

fn cluster_role_binding_key(name: &str) -> String {
    format!("{}{}", keys::CLUSTER_ROLE_BINDING_PREFIX, name)
}

fn role_binding_key(namespace: &str, name: &str) -> String {
    format!("{}{}/{}", keys::ROLE_BINDING_PREFIX, namespace, name)
}

/// Controller that materializes hub Grants into spoke authorization objects.
///
/// For every Active grant it keeps three kinds of objects converged on the
/// spoke: an impersonation role for the subject, a binding handing that role
/// to the impersonation proxy, and the grant binding(s) conferring the actual
/// role. A finalizer on the hub object holds deletion back until all derived
/// objects have been swept.
///
/// Reconciliation is level-triggered and idempotent: any event, duplicate or
/// stale, triggers a full re-read and convergence pass, and a failed pass is
/// simply retried on the next event or resync tick.
pub struct GrantController {
    hub: StateStore,
    spoke: StateStore,
    resync_interval: Duration,
}

impl GrantController {
    pub fn new(hub: StateStore, spoke: StateStore) -> Self {
        Self {
            hub,
            spoke,
            resync_interval: Duration::from_secs(30),
        }
    }

    pub fn with_resync_interval(mut self, interval: Duration) -> Self {
        self.resync_interval = interval;
        self
    }

    /// Start the controller loop as a background task.
    ///
    /// Reconciles on every hub watch event touching a grant key, plus a full
    /// resync every `resync_interval` so failed or missed reconciliations are
    /// redelivered.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "GrantController started (resync={}s)",
                self.resync_interval.as_secs()
            );
            let mut events = self.hub.event_log.subscribe();
            let mut interval = tokio::time::interval(self.resync_interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = self.resync_all().await {
                            warn!("GrantController resync error: {}", e);
                        }
                    }
                    event = events.recv() => match event {
                        Ok(event) => {
                            if let Some(name) = event.key.strip_prefix(keys::GRANT_PREFIX) {
                                let name = name.to_string();
                                if let Err(e) = self.reconcile(&name).await {
                                    warn!("Grant {} reconcile error: {}", name, e);
                                }
                            }
                        }
                        Err(RecvError::Lagged(missed)) => {
                            warn!("Grant watch lagged, {} events dropped; resync will recover", missed);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        })
    }

    /// One pass over every grant in the hub store.
    async fn resync_all(&self) -> anyhow::Result<()> {
        for (key, _) in self.hub.list_prefix(keys::GRANT_PREFIX).await? {
            let name = key.strip_prefix(keys::GRANT_PREFIX).unwrap_or_default();
            if name.is_empty() {
                continue;
            }
            if let Err(e) = self.reconcile(name).await {
                warn!("Grant {} reconcile error: {}", name, e);
            }
        }
        Ok(())
    }

    /// One reconciliation pass for a single grant.
    ///
    /// A missing grant is terminal (already erased). A grant marked for
    /// deletion is swept and released; anything else is validated, gets the
    /// cleanup finalizer, and has its spoke objects converged. Any store
    /// failure aborts the pass and is surfaced to the caller for redelivery.
    pub async fn reconcile(&self, name: &str) -> anyhow::Result<()> {
        let key = grant_key(name);
        let Some(mut grant) = get_as::<Grant>(&self.hub, &key).await? else {
            return Ok(());
        };

        if grant.is_deleting() {
            // Without the finalizer there is nothing left to clean up.
            if grant.has_finalizer(auth::SPOKE_CLEANUP_FINALIZER) {
                self.cleanup(&grant).await?;
                self.release(&mut grant).await?;
                info!("Grant {} cleaned up and released", grant.name);
            }
            return Ok(());
        }

        grant.validate()?;
        self.ensure_finalizer(&mut grant).await?;
        self.materialize(&grant).await
    }

    /// Add the cleanup finalizer to the hub object if not already present.
    /// This is the only field the agent ever writes back to the hub.
    async fn ensure_finalizer(&self, grant: &mut Grant) -> anyhow::Result<()> {
        if grant.has_finalizer(auth::SPOKE_CLEANUP_FINALIZER) {
            return Ok(());
        }
        grant.add_finalizer(auth::SPOKE_CLEANUP_FINALIZER);
        self.hub
            .put(&grant_key(&grant.name), &serde_json::to_vec(grant)?)
            .await?;
        info!("Grant {} gained finalizer", grant.name);
        Ok(())
    }

    /// Drop the cleanup finalizer. A deleting object with no finalizers left
    /// is erased from the store, releasing the grant for good.
    async fn release(&self, grant: &mut Grant) -> anyhow::Result<()> {
        grant.remove_finalizer(auth::SPOKE_CLEANUP_FINALIZER);
        let key = grant_key(&grant.name);
        if grant.finalizers.is_empty() {
            self.hub.delete(&key).await
        } else {
            self.hub.put(&key, &serde_json::to_vec(grant)?).await
        }
    }

    /// Converge all spoke objects derived from an Active grant.
    ///
    /// Order matters: role before binding before grant binding(s), so no
    /// binding ever references a role that does not exist yet. A failure
    /// aborts the rest; the partial state is converged on the next pass.
    /// Every derived object carries exactly the grant's labels, which is what
    /// cleanup later keys on.
    async fn materialize(&self, grant: &Grant) -> anyhow::Result<()> {
        let subject = grant.subject()?;
        let owner = grant.hub_owner_id()?;
        let role_name = impersonation_role_name(&subject.name, owner);

        let role = ClusterRole {
            name: role_name.clone(),
            labels: grant.labels.clone(),
            rules: vec![PolicyRule {
                api_groups: vec![String::new()],
                resources: vec!["users".to_string()],
                verbs: vec!["impersonate".to_string()],
                resource_names: vec![subject.name.clone()],
            }],
            created_at: Utc::now(),
        };
        create_or_update(&self.spoke, &cluster_role_key(&role.name), role, |d, e| {
            e.labels = d.labels.clone();
            e.rules = d.rules.clone();
        })
        .await?;

        // Lets the impersonation proxy act as the subject on this spoke.
        let proxy_binding = ClusterRoleBinding {
            name: impersonation_binding_name(&subject.name, owner),
            labels: grant.labels.clone(),
            subjects: vec![Subject {
                kind: SubjectKind::ServiceAccount,
                name: auth::IMPERSONATION_PROXY_NAME.to_string(),
                namespace: Some(auth::IMPERSONATION_PROXY_NAMESPACE.to_string()),
            }],
            role_ref: RoleRef {
                kind: RoleRefKind::ClusterRole,
                name: role_name,
            },
            created_at: Utc::now(),
        };
        create_or_update(
            &self.spoke,
            &cluster_role_binding_key(&proxy_binding.name),
            proxy_binding,
            |d, e| {
                e.labels = d.labels.clone();
                e.subjects = d.subjects.clone();
                e.role_ref = d.role_ref.clone();
            },
        )
        .await?;

        // The actual permission, granted to the user principal itself.
        let user = vec![Subject {
            kind: SubjectKind::User,
            name: subject.name.clone(),
            namespace: None,
        }];

        match &grant.role_ref.namespaces {
            None => {
                let binding = ClusterRoleBinding {
                    name: grant.name.clone(),
                    labels: grant.labels.clone(),
                    subjects: user,
                    role_ref: RoleRef {
                        kind: RoleRefKind::ClusterRole,
                        name: grant.role_ref.name.clone(),
                    },
                    created_at: Utc::now(),
                };
                create_or_update(
                    &self.spoke,
                    &cluster_role_binding_key(&binding.name),
                    binding,
                    |d, e| {
                        e.labels = d.labels.clone();
                        e.subjects = d.subjects.clone();
                        e.role_ref = d.role_ref.clone();
                    },
                )
                .await?;
            }
            Some(namespaces) => {
                for ns in namespaces {
                    let binding = RoleBinding {
                        name: grant.name.clone(),
                        namespace: ns.clone(),
                        labels: grant.labels.clone(),
                        subjects: user.clone(),
                        role_ref: RoleRef {
                            kind: RoleRefKind::Role,
                            name: grant.role_ref.name.clone(),
                        },
                        created_at: Utc::now(),
                    };
                    create_or_update(
                        &self.spoke,
                        &role_binding_key(ns, &binding.name),
                        binding,
                        |d, e| {
                            e.labels = d.labels.clone();
                            e.subjects = d.subjects.clone();
                            e.role_ref = d.role_ref.clone();
                        },
                    )
                    .await?;
                }
            }
        }
        Ok(())
    }

    /// Delete every spoke object whose labels equal the grant's labels.
    ///
    /// Sweeps the cluster-scoped kinds plus, for a namespaced grant, the
    /// per-namespace bindings in each recorded target namespace. Listing
    /// failures are soft (logged, treated as no matches); deletion failures
    /// abort the sweep so the finalizer stays put and the pass is retried.
    async fn cleanup(&self, grant: &Grant) -> anyhow::Result<()> {
        self.sweep::<ServiceAccount>(keys::SERVICE_ACCOUNT_PREFIX, &grant.labels)
            .await?;
        self.sweep::<ClusterRole>(keys::CLUSTER_ROLE_PREFIX, &grant.labels)
            .await?;
        self.sweep::<ClusterRoleBinding>(keys::CLUSTER_ROLE_BINDING_PREFIX, &grant.labels)
            .await?;
        if let Some(namespaces) = &grant.role_ref.namespaces {
            for ns in namespaces {
                let prefix = format!("{}{}/", keys::ROLE_BINDING_PREFIX, ns);
                self.sweep::<RoleBinding>(&prefix, &grant.labels).await?;
            }
        }
        Ok(())
    }

    async fn sweep<T: DeserializeOwned + Labeled>(
        &self,
        prefix: &str,
        selector: &HashMap<String, String>,
    ) -> anyhow::Result<()> {
        let entries = match list_as::<T>(&self.spoke, prefix).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cleanup listing under {} failed, treating as empty: {}", prefix, e);
                return Ok(());
            }
        };
        for (key, obj) in entries {
            if obj.labels() == selector {
                self.spoke.delete(&key).await?;
                info!("Swept {}", key);
            }
        }
        Ok(())
    }
}
