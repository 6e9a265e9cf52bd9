// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `IdentityProvider` reconciliation logic.
//!
//! Cloudflare never returns client secrets, so secret drift is tracked through the
//! SHA-256 of the secret last applied (`status.configHash`). Non-secret drift only
//! considers the configuration keys set in the spec; server-populated keys such as
//! `redirect_url` are left alone.
//!
//! Updates are full PUTs, so the body starts from the remote provider and lays the
//! desired keys over it. Remote keys the spec does not set, and SCIM settings when
//! the spec has none, are sent back unchanged.

use crate::cloudflare::types::{AccessIdentityProvider, IdentityProviderRequest};
use crate::constants::FINALIZER_IDENTITY_PROVIDER;
use crate::context::Context;
use crate::credentials::Credential;
use crate::crd::{
    CredentialRef, DeletionPolicy, IdentityProvider, IdentityProviderConfig,
    IdentityProviderState, IdentityProviderStatus, ScimConfig,
};
use crate::errors::ReconcileError;
use async_trait::async_trait;
use kube::ResourceExt;
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::engine::{absent_ok, KindReconciler, ManagedResource, SyncProgress};

/// Key Cloudflare expects the client secret under.
const CLIENT_SECRET_KEY: &str = "client_secret";

impl ManagedResource for IdentityProvider {
    const FINALIZER: &'static str = FINALIZER_IDENTITY_PROVIDER;

    fn deletion_policy(&self) -> DeletionPolicy {
        self.spec.deletion_policy
    }

    fn credential_ref(&self) -> Option<&CredentialRef> {
        self.spec.credential_ref.as_ref()
    }
}

fn snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Serialize `value` as an object with Cloudflare's snake_case keys.
fn snake_case_object<T: Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map
            .into_iter()
            .map(|(key, value)| (snake_case(&key), value))
            .collect(),
        _ => Map::new(),
    }
}

/// Non-secret configuration as Cloudflare spells it. The secret reference is dropped.
#[must_use]
pub fn desired_config(config: &IdentityProviderConfig) -> Map<String, Value> {
    let mut map = snake_case_object(config);
    map.remove("client_secret_ref");
    map
}

/// SCIM settings as Cloudflare spells them.
#[must_use]
pub fn desired_scim(scim: &ScimConfig) -> Map<String, Value> {
    snake_case_object(scim)
}

/// Hex SHA-256 of the client secret, if any.
#[must_use]
pub fn config_hash(secret: Option<&str>) -> Option<String> {
    secret.map(|s| format!("{:x}", Sha256::digest(s.as_bytes())))
}

/// Whether every key of `desired` holds the same value in `remote`.
fn keys_match(desired: &Map<String, Value>, remote: Option<&Value>) -> bool {
    let Some(remote) = remote.and_then(Value::as_object) else {
        return desired.is_empty();
    };
    desired.iter().all(|(key, value)| remote.get(key) == Some(value))
}

/// Non-secret differences between the spec and the remote provider.
#[must_use]
pub fn provider_drifted(resource: &IdentityProvider, remote: &AccessIdentityProvider) -> bool {
    let spec = &resource.spec;
    remote.name != spec.name
        || remote.provider_type != spec.r#type.as_str()
        || !keys_match(&desired_config(&spec.config), Some(&remote.config))
        || spec
            .scim_config
            .as_ref()
            .is_some_and(|scim| !keys_match(&desired_scim(scim), remote.scim_config.as_ref()))
}

/// `base` with every key of `desired` laid over it.
fn overlay(base: Option<&Value>, desired: Map<String, Value>) -> Map<String, Value> {
    let mut merged = base.and_then(Value::as_object).cloned().unwrap_or_default();
    merged.extend(desired);
    merged
}

fn with_secret(mut config: Map<String, Value>, secret: Option<&str>) -> Value {
    if let Some(secret) = secret {
        config.insert(CLIENT_SECRET_KEY.to_string(), Value::String(secret.to_string()));
    }
    Value::Object(config)
}

fn create_request(resource: &IdentityProvider, secret: Option<&str>) -> IdentityProviderRequest {
    let spec = &resource.spec;
    IdentityProviderRequest {
        name: spec.name.clone(),
        provider_type: spec.r#type.as_str().to_string(),
        config: with_secret(desired_config(&spec.config), secret),
        scim_config: spec
            .scim_config
            .as_ref()
            .map(|scim| Value::Object(desired_scim(scim))),
    }
}

/// PUT body for `remote`: its current settings with the desired ones laid over them.
#[must_use]
pub fn update_request(
    resource: &IdentityProvider,
    remote: &AccessIdentityProvider,
    secret: Option<&str>,
) -> IdentityProviderRequest {
    let spec = &resource.spec;
    let config = overlay(Some(&remote.config), desired_config(&spec.config));
    let scim_config = match spec.scim_config.as_ref() {
        Some(scim) => Some(Value::Object(overlay(
            remote.scim_config.as_ref(),
            desired_scim(scim),
        ))),
        None => remote.scim_config.clone(),
    };
    IdentityProviderRequest {
        name: spec.name.clone(),
        provider_type: spec.r#type.as_str().to_string(),
        config: with_secret(config, secret),
        scim_config,
    }
}

/// How the remote provider of a pass was obtained.
enum Origin {
    /// Found through `status.providerId`.
    Tracked,
    /// Found by name and type; its secret is unknown.
    Adopted,
    Created,
}

/// Reconciles `IdentityProvider` resources.
pub struct IdentityProviderReconciler;

impl IdentityProviderReconciler {
    async fn existing(
        ctx: &Context,
        credential: &Credential,
        status: &IdentityProviderStatus,
    ) -> Result<Option<AccessIdentityProvider>, ReconcileError> {
        let Some(id) = status.provider_id.as_deref() else {
            return Ok(None);
        };
        let found = ctx.cloudflare.get_identity_provider(credential, id).await?;
        if found.is_none() {
            warn!(provider_id = %id, "Identity provider was deleted outside the operator, recreating");
        }
        Ok(found)
    }
}

#[async_trait]
impl KindReconciler for IdentityProviderReconciler {
    type Resource = IdentityProvider;

    async fn sync(
        &self,
        resource: &IdentityProvider,
        ctx: &Context,
        credential: &Credential,
        status: &mut IdentityProviderStatus,
    ) -> Result<SyncProgress, ReconcileError> {
        let namespace = resource.namespace().unwrap_or_default();
        let name = &resource.spec.name;

        let secret = match resource.spec.config.client_secret_ref.as_ref() {
            Some(key_ref) => Some(ctx.credentials.secret_value(&namespace, key_ref).await?),
            None => None,
        };
        let hash = config_hash(secret.as_deref());
        let provider_type = resource.spec.r#type.as_str();

        let (remote, origin) = match Self::existing(ctx, credential, status).await? {
            Some(remote) => (remote, Origin::Tracked),
            None => match ctx
                .cloudflare
                .find_identity_provider(credential, name, provider_type)
                .await?
            {
                Some(remote) => {
                    info!(provider = %name, provider_id = ?remote.id, "Adopting existing identity provider");
                    (remote, Origin::Adopted)
                }
                None => {
                    info!(provider = %name, %provider_type, "Creating identity provider");
                    let created = ctx
                        .cloudflare
                        .create_identity_provider(
                            credential,
                            &create_request(resource, secret.as_deref()),
                        )
                        .await?;
                    (created, Origin::Created)
                }
            },
        };

        // Record the id before anything else can fail so the next pass does not create again
        status.provider_id.clone_from(&remote.id);
        status.account_id = Some(credential.account_id().to_string());
        match origin {
            Origin::Created => status.config_hash.clone_from(&hash),
            Origin::Adopted => status.config_hash = None,
            Origin::Tracked => {}
        }

        let secret_stale = status.config_hash != hash;
        if provider_drifted(resource, &remote) || secret_stale {
            let Some(id) = remote.id.as_deref() else {
                return Err(ReconcileError::readback("identity provider id"));
            };
            info!(provider = %name, provider_id = %id, secret_stale, "Updating identity provider");
            ctx.cloudflare
                .update_identity_provider(
                    credential,
                    id,
                    &update_request(resource, &remote, secret.as_deref()),
                )
                .await?;
            status.config_hash = hash;
        } else {
            debug!(provider = %name, "Identity provider up to date");
        }

        status.state = IdentityProviderState::Active;
        Ok(SyncProgress::Ready(format!(
            "Identity provider {name} is configured"
        )))
    }

    async fn cleanup(
        &self,
        _resource: &IdentityProvider,
        ctx: &Context,
        credential: &Credential,
        status: &IdentityProviderStatus,
    ) -> Result<(), ReconcileError> {
        let Some(id) = status.provider_id.as_deref() else {
            debug!("Identity provider was never created, nothing to delete");
            return Ok(());
        };

        info!(provider_id = %id, "Deleting identity provider");
        absent_ok(ctx.cloudflare.delete_identity_provider(credential, id).await)
    }
}

#[cfg(test)]
#[path = "identityprovider_tests.rs"]
mod identityprovider_tests;
