use pkg_state::client::StateStore;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Create-or-update a single stored object.
///
/// `apply` copies the mutable fields of `desired` onto an already-existing
/// object, leaving store-managed fields (such as `created_at`) untouched.
/// If nothing exists under `key`, `desired` is written as-is. The write is
/// skipped entirely when the applied result matches what is already stored,
/// so repeated calls with the same desired state settle into pure reads.
///
/// This never deletes and surfaces store errors unmodified. It is the only
/// write path the materializer uses, which rules out whole-object overwrites
/// racing with concurrent writers of unrelated fields.
pub async fn create_or_update<T, F>(
    store: &StateStore,
    key: &str,
    desired: T,
    apply: F,
) -> anyhow::Result<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce(&T, &mut T),
{
    match store.get(key).await? {
        Some(raw) => {
            let mut existing: T = serde_json::from_slice(&raw)?;
            apply(&desired, &mut existing);
            // Compare as JSON values, not bytes: map key order is not stable
            // across deserialize/serialize round trips.
            let updated = serde_json::to_value(&existing)?;
            if updated != serde_json::from_slice::<serde_json::Value>(&raw)? {
                store.put(key, &serde_json::to_vec(&existing)?).await?;
            }
            Ok(existing)
        }
        None => {
            store.put(key, &serde_json::to_vec(&desired)?).await?;
            Ok(desired)
        }
    }
}

/// Fetch and deserialize one object, or `None` if the key is absent.
pub async fn get_as<T: DeserializeOwned>(
    store: &StateStore,
    key: &str,
) -> anyhow::Result<Option<T>> {
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
        None => Ok(None),
    }
}

/// Deserialize every entry under `prefix`, skipping undecodable values.
pub async fn list_as<T: DeserializeOwned>(
    store: &StateStore,
    prefix: &str,
) -> anyhow::Result<Vec<(String, T)>> {
    let entries = store.list_prefix(prefix).await?;
    Ok(entries
        .into_iter()
        .filter_map(|(k, v)| serde_json::from_slice(&v).ok().map(|obj| (k, obj)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pkg_types::rbac::{ClusterRole, PolicyRule};
    use std::collections::HashMap;
    use uuid::Uuid;

    async fn scratch_store() -> StateStore {
        let dir = std::env::temp_dir().join(format!("authsync-sync-test-{}", Uuid::new_v4()));
        StateStore::new(dir.to_str().unwrap()).await.unwrap()
    }

    fn viewer_role(verb: &str) -> ClusterRole {
        ClusterRole {
            name: "viewer".to_string(),
            labels: HashMap::new(),
            rules: vec![PolicyRule {
                api_groups: vec!["".to_string()],
                resources: vec!["pods".to_string()],
                verbs: vec![verb.to_string()],
                resource_names: vec![],
            }],
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn apply_role(desired: &ClusterRole, existing: &mut ClusterRole) {
        existing.labels = desired.labels.clone();
        existing.rules = desired.rules.clone();
    }

    #[tokio::test]
    async fn creates_when_absent() {
        let store = scratch_store().await;
        create_or_update(&store, "/registry/clusterroles/viewer", viewer_role("get"), apply_role)
            .await
            .unwrap();

        let stored: ClusterRole = get_as(&store, "/registry/clusterroles/viewer")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.rules[0].verbs, vec!["get"]);
    }

    #[tokio::test]
    async fn update_preserves_store_managed_fields() {
        let store = scratch_store().await;
        let key = "/registry/clusterroles/viewer";
        create_or_update(&store, key, viewer_role("get"), apply_role)
            .await
            .unwrap();

        // Second sync with different mutable fields and a different created_at
        let mut changed = viewer_role("list");
        changed.created_at = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        create_or_update(&store, key, changed, apply_role).await.unwrap();

        let stored: ClusterRole = get_as(&store, key).await.unwrap().unwrap();
        assert_eq!(stored.rules[0].verbs, vec!["list"]);
        // created_at is store-managed: the original creation time survives
        assert_eq!(
            stored.created_at,
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn repeated_sync_is_a_noop() {
        let store = scratch_store().await;
        let key = "/registry/clusterroles/viewer";
        create_or_update(&store, key, viewer_role("get"), apply_role)
            .await
            .unwrap();
        let first = store.get(key).await.unwrap().unwrap();

        // An unchanged second sync must not rewrite the object
        let mut rx = store.event_log.subscribe();
        create_or_update(&store, key, viewer_role("get"), apply_role)
            .await
            .unwrap();
        let second = store.get(key).await.unwrap().unwrap();
        assert_eq!(first, second);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn list_as_skips_undecodable_entries() {
        let store = scratch_store().await;
        create_or_update(&store, "/registry/clusterroles/viewer", viewer_role("get"), apply_role)
            .await
            .unwrap();
        store
            .put("/registry/clusterroles/garbage", b"not-json")
            .await
            .unwrap();

        let roles: Vec<(String, ClusterRole)> =
            list_as(&store, "/registry/clusterroles/").await.unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].1.name, "viewer");
    }
}
