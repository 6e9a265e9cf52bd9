// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers and the status writer.
//!
//! # Condition Format
//!
//! Kubernetes conditions follow a standard format:
//! - `type`: The aspect of the resource being reported (e.g., "Ready", "`DefaultZone`")
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: A programmatic identifier (`CamelCase`)
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp when the status value last changed
//!
//! Conditions are replaced on write keyed by type and kept sorted by type, so the
//! serialized status is stable across passes and unchanged passes write nothing.
//!
//! # Example
//!
//! ```rust,no_run
//! use cloudflare_operator::reconcilers::status::set_condition;
//!
//! let mut conditions = vec![];
//! set_condition(&mut conditions, "Ready", "True", "Ready", "Bucket is ready");
//! ```

use crate::crd::{
    BucketDomainState, BucketState, CloudflareDomainStatus, Condition, DomainRegistrationStatus,
    DomainState, IdentityProviderState, IdentityProviderStatus, NotificationState,
    R2BucketDomainStatus, R2BucketNotificationStatus, R2BucketStatus, RegistrationState,
};
use anyhow::Result;
use chrono::Utc;
use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::fmt::Debug;
use tracing::debug;

use super::retry::retry_api_call;

/// Create a new Kubernetes condition with the current timestamp.
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Find a condition by type in a list of conditions.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Update or add a condition in a mutable conditions list (in-memory, no API call).
///
/// Preserves `lastTransitionTime` while the status value is unchanged, and keeps
/// the list sorted by condition type.
///
/// # Example
///
/// ```rust
/// use cloudflare_operator::reconcilers::status::set_condition;
///
/// let mut conditions = vec![];
/// set_condition(&mut conditions, "Ready", "False", "BucketNotReady", "waiting");
/// set_condition(&mut conditions, "DefaultZone", "True", "DefaultZoneUnique", "unique");
///
/// assert_eq!(conditions[0].r#type, "DefaultZone");
/// assert_eq!(conditions[1].r#type, "Ready");
/// ```
pub fn set_condition(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        if existing.status != status || existing.last_transition_time.is_none() {
            existing.last_transition_time = Some(Utc::now().to_rfc3339());
        }
        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.message = Some(message.to_string());
    } else {
        conditions.push(create_condition(condition_type, status, reason, message));
    }

    conditions.sort_by(|a, b| a.r#type.cmp(&b.r#type));
}

/// Remove a condition by type.
pub fn remove_condition(conditions: &mut Vec<Condition>, condition_type: &str) {
    conditions.retain(|c| c.r#type != condition_type);
}

/// Compare two condition lists ignoring `lastTransitionTime`.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    current.len() == new.len()
        && new.iter().all(|n| {
            find_condition(current, &n.r#type).is_some_and(|c| {
                c.status == n.status && c.reason == n.reason && c.message == n.message
            })
        })
}

/// Common view over the status of every managed kind.
pub trait KindStatus:
    Clone + Debug + Default + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    fn conditions(&self) -> &[Condition];

    fn conditions_mut(&mut self) -> &mut Vec<Condition>;

    fn observed_generation(&self) -> Option<i64>;

    fn set_observed_generation(&mut self, generation: Option<i64>);

    fn failure_count(&self) -> u32;

    fn set_failure_count(&mut self, count: u32);

    /// Waiting on configuration (missing credential, binding, bucket, queue).
    fn mark_pending(&mut self);

    /// Failed remote operation.
    fn mark_error(&mut self);

    /// Set a condition on this status.
    fn set_condition(&mut self, condition_type: &str, status: &str, reason: &str, message: &str) {
        set_condition(self.conditions_mut(), condition_type, status, reason, message);
    }
}

macro_rules! impl_kind_status {
    ($($status:ty => $state:ident),+ $(,)?) => {
        $(
            impl KindStatus for $status {
                fn conditions(&self) -> &[Condition] {
                    &self.conditions
                }

                fn conditions_mut(&mut self) -> &mut Vec<Condition> {
                    &mut self.conditions
                }

                fn observed_generation(&self) -> Option<i64> {
                    self.observed_generation
                }

                fn set_observed_generation(&mut self, generation: Option<i64>) {
                    self.observed_generation = generation;
                }

                fn failure_count(&self) -> u32 {
                    self.failure_count
                }

                fn set_failure_count(&mut self, count: u32) {
                    self.failure_count = count;
                }

                fn mark_pending(&mut self) {
                    self.state = $state::Pending;
                }

                fn mark_error(&mut self) {
                    self.state = $state::Error;
                }
            }
        )+
    };
}

impl_kind_status!(
    CloudflareDomainStatus => DomainState,
    R2BucketStatus => BucketState,
    R2BucketDomainStatus => BucketDomainState,
    R2BucketNotificationStatus => NotificationState,
    DomainRegistrationStatus => RegistrationState,
    IdentityProviderStatus => IdentityProviderState,
);

/// Whether a status computed for `ours` must not overwrite the stored status.
///
/// A pass that reconciled an older generation than the one already recorded lost
/// a race with a newer pass.
#[must_use]
pub fn is_stale_write(stored: Option<i64>, ours: Option<i64>) -> bool {
    match (stored, ours) {
        (Some(stored), Some(ours)) => stored > ours,
        _ => false,
    }
}

/// Whether `new` differs from `current` in anything but transition times.
#[must_use]
pub fn status_changed<S: KindStatus>(current: Option<&S>, new: &S) -> bool {
    let Some(current) = current else {
        return true;
    };
    if !conditions_equal(current.conditions(), new.conditions()) {
        return true;
    }
    let mut normalized = new.clone();
    *normalized.conditions_mut() = current.conditions().to_vec();
    normalized != *current
}

/// Persist `status` for `resource` unless the write is stale or a no-op.
///
/// Re-reads the object first so the stale-write guard sees the latest stored
/// `observedGeneration`. Returns `true` when a patch was sent.
///
/// # Errors
///
/// Returns an error if reading or patching the object fails.
pub async fn write_status<K>(client: &Client, resource: &K, status: &K::Status) -> Result<bool>
where
    K: StatusResource,
{
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();
    let api: Api<K> = Api::namespaced(client.clone(), &namespace);

    let label = format!("get {} {namespace}/{name}", K::kind(&()));
    let Some(latest) = retry_api_call(|| api.get_opt(&name), &label).await? else {
        debug!(kind = %K::kind(&()), %namespace, %name, "Object gone, skipping status write");
        return Ok(false);
    };

    let stored = latest.status_ref();
    if is_stale_write(
        stored.and_then(|s| s.observed_generation()),
        status.observed_generation(),
    ) {
        debug!(kind = %K::kind(&()), %namespace, %name, "Newer generation already recorded, skipping status write");
        return Ok(false);
    }
    if !status_changed(stored, status) {
        debug!(kind = %K::kind(&()), %namespace, %name, "Status unchanged, skipping update");
        return Ok(false);
    }

    let patch = json!({ "status": status });
    api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    debug!(
        kind = %K::kind(&()),
        %namespace,
        %name,
        conditions = status.conditions().len(),
        "Updated status"
    );
    Ok(true)
}

/// A namespaced custom resource with a [`KindStatus`].
pub trait StatusResource:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    type Status: KindStatus;

    fn status_ref(&self) -> Option<&Self::Status>;
}

macro_rules! impl_status_resource {
    ($($kind:ty => $status:ty),+ $(,)?) => {
        $(
            impl StatusResource for $kind {
                type Status = $status;

                fn status_ref(&self) -> Option<&Self::Status> {
                    self.status.as_ref()
                }
            }
        )+
    };
}

impl_status_resource!(
    crate::crd::CloudflareDomain => CloudflareDomainStatus,
    crate::crd::R2Bucket => R2BucketStatus,
    crate::crd::R2BucketDomain => R2BucketDomainStatus,
    crate::crd::R2BucketNotification => R2BucketNotificationStatus,
    crate::crd::DomainRegistration => DomainRegistrationStatus,
    crate::crd::IdentityProvider => IdentityProviderStatus,
);

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
