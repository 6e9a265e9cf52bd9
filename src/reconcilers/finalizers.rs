// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Finalizer management for namespaced custom resources.
//!
//! Every managed kind carries a `<kind>.cloudflare.firestoned.io/finalizer` from its
//! first reconcile on. The finalizer is removed only after the deletion branch
//! confirms the remote object is gone or the deletion policy is `Orphan`.
//!
//! # Example
//!
//! ```rust,ignore
//! use cloudflare_operator::constants::FINALIZER_R2_BUCKET;
//! use cloudflare_operator::reconcilers::finalizers::ensure_finalizer;
//!
//! async fn reconcile(client: Client, bucket: R2Bucket) -> anyhow::Result<()> {
//!     ensure_finalizer(&client, &bucket, FINALIZER_R2_BUCKET).await?;
//!     Ok(())
//! }
//! ```

use anyhow::Result;
use kube::api::{Patch, PatchParams};
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::json;
use tracing::info;

/// Whether `resource` carries `finalizer`.
#[must_use]
pub fn has_finalizer<T: Resource>(resource: &T, finalizer: &str) -> bool {
    resource
        .meta()
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|x| x == finalizer))
}

/// Finalizer list with `finalizer` appended, or `None` if already present.
#[must_use]
pub fn finalizers_with<T: Resource>(resource: &T, finalizer: &str) -> Option<Vec<String>> {
    if has_finalizer(resource, finalizer) {
        return None;
    }
    let mut finalizers = resource.meta().finalizers.clone().unwrap_or_default();
    finalizers.push(finalizer.to_string());
    Some(finalizers)
}

/// Finalizer list without `finalizer`, or `None` if it was not present.
#[must_use]
pub fn finalizers_without<T: Resource>(resource: &T, finalizer: &str) -> Option<Vec<String>> {
    if !has_finalizer(resource, finalizer) {
        return None;
    }
    let mut finalizers = resource.meta().finalizers.clone().unwrap_or_default();
    finalizers.retain(|f| f != finalizer);
    Some(finalizers)
}

/// Add `finalizer` to a namespaced resource if missing.
///
/// # Errors
///
/// Returns an error if the Kubernetes API patch fails.
pub async fn ensure_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let Some(finalizers) = finalizers_with(resource, finalizer) else {
        return Ok(());
    };
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();

    info!(
        "Adding finalizer {} to {}/{} {}",
        finalizer,
        namespace,
        name,
        T::kind(&())
    );

    let api: Api<T> = Api::namespaced(client.clone(), &namespace);
    let patch = json!({ "metadata": { "finalizers": finalizers } });
    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    Ok(())
}

/// Remove `finalizer` from a namespaced resource if present.
///
/// # Errors
///
/// Returns an error if the Kubernetes API patch fails.
pub async fn remove_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let Some(finalizers) = finalizers_without(resource, finalizer) else {
        return Ok(());
    };
    let namespace = resource.namespace().unwrap_or_default();
    let name = resource.name_any();

    info!(
        "Removing finalizer {} from {}/{} {}",
        finalizer,
        namespace,
        name,
        T::kind(&())
    );

    let api: Api<T> = Api::namespaced(client.clone(), &namespace);
    let patch = json!({ "metadata": { "finalizers": finalizers } });
    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    info!(
        "Successfully removed finalizer {} from {}/{} {}",
        finalizer,
        namespace,
        name,
        T::kind(&())
    );

    Ok(())
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
