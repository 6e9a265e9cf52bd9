// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloudflare API credential resolution.
//!
//! A resource either names a Secret through `credentialRef` or falls back to the
//! operator-wide default credential from configuration. Credential Secrets carry
//! two keys:
//!
//! - `apiToken` - a Cloudflare API token, sent as a bearer token
//! - `accountId` - the Cloudflare account the token operates on
//!
//! Secret values are never logged and never written to status. [`Credential`]'s
//! `Debug` implementation redacts the token.

use crate::constants::{SECRET_KEY_ACCOUNT_ID, SECRET_KEY_API_TOKEN};
use crate::crd::{CredentialRef, SecretKeyRef};
use crate::status_reasons::{
    REASON_CREDENTIAL_NOT_FOUND, REASON_NO_DEFAULT_CREDENTIAL, REASON_SECRET_NOT_FOUND,
};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::{Api, Client};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// An API token together with the account it belongs to.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    api_token: String,
    account_id: String,
}

impl Credential {
    #[must_use]
    pub fn new(api_token: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            account_id: account_id.into(),
        }
    }

    #[must_use]
    pub fn api_token(&self) -> &str {
        &self.api_token
    }

    #[must_use]
    pub fn account_id(&self) -> &str {
        &self.account_id
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("api_token", &"<redacted>")
            .field("account_id", &self.account_id)
            .finish()
    }
}

/// Failure to obtain a credential or secret value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CredentialError {
    /// The credential Secret or one of its keys is missing.
    #[error("credential secret {namespace}/{name}: {detail}")]
    CredentialNotFound {
        namespace: String,
        name: String,
        detail: String,
    },

    /// A Secret key referenced from a spec is missing.
    #[error("secret {namespace}/{name} has no key {key}")]
    SecretNotFound {
        namespace: String,
        name: String,
        key: String,
    },

    /// Neither a `credentialRef` nor an operator-wide default credential.
    #[error("no credentialRef set and no default Cloudflare credential configured")]
    NoDefault,

    /// The Kubernetes API could not be queried.
    #[error("failed to read secret {namespace}/{name}: {message}")]
    Lookup {
        namespace: String,
        name: String,
        message: String,
    },
}

impl CredentialError {
    /// Lookup failures talk to the Kubernetes API and may succeed on retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Lookup { .. })
    }

    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::CredentialNotFound { .. } | Self::Lookup { .. } => REASON_CREDENTIAL_NOT_FOUND,
            Self::SecretNotFound { .. } => REASON_SECRET_NOT_FOUND,
            Self::NoDefault => REASON_NO_DEFAULT_CREDENTIAL,
        }
    }
}

/// Maps credential references to credentials and reads Secret key references.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// Resolve the credential for a resource in `namespace`.
    ///
    /// `None` selects the operator-wide default credential.
    async fn resolve(
        &self,
        namespace: &str,
        reference: Option<&CredentialRef>,
    ) -> Result<Credential, CredentialError>;

    /// Read one key of a Secret in `namespace`.
    async fn secret_value(
        &self,
        namespace: &str,
        key_ref: &SecretKeyRef,
    ) -> Result<String, CredentialError>;
}

/// Build a credential from decoded Secret data.
///
/// # Errors
///
/// Returns [`CredentialError::CredentialNotFound`] when `apiToken` or `accountId`
/// is missing or empty.
pub fn credential_from_data(
    namespace: &str,
    name: &str,
    data: &BTreeMap<String, String>,
) -> Result<Credential, CredentialError> {
    let field = |key: &str| {
        data.get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| CredentialError::CredentialNotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
                detail: format!("missing key {key}"),
            })
    };

    Ok(Credential::new(
        field(SECRET_KEY_API_TOKEN)?,
        field(SECRET_KEY_ACCOUNT_ID)?,
    ))
}

fn decode_secret_data(data: Option<BTreeMap<String, ByteString>>) -> BTreeMap<String, String> {
    data.unwrap_or_default()
        .into_iter()
        .filter_map(|(k, v)| String::from_utf8(v.0).ok().map(|s| (k, s)))
        .collect()
}

/// Resolves credentials from Kubernetes Secrets.
pub struct SecretCredentialResolver {
    client: Client,
    default: Option<Credential>,
}

impl SecretCredentialResolver {
    #[must_use]
    pub fn new(client: Client, default: Option<Credential>) -> Self {
        Self { client, default }
    }

    async fn read_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<BTreeMap<String, String>>, CredentialError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = api
            .get_opt(name)
            .await
            .map_err(|e| CredentialError::Lookup {
                namespace: namespace.to_string(),
                name: name.to_string(),
                message: e.to_string(),
            })?;

        Ok(secret.map(|s| decode_secret_data(s.data)))
    }
}

#[async_trait]
impl CredentialResolver for SecretCredentialResolver {
    async fn resolve(
        &self,
        namespace: &str,
        reference: Option<&CredentialRef>,
    ) -> Result<Credential, CredentialError> {
        let Some(reference) = reference else {
            return self.default.clone().ok_or(CredentialError::NoDefault);
        };

        let secret_namespace = reference.namespace.as_deref().unwrap_or(namespace);
        debug!(
            namespace = %secret_namespace,
            secret = %reference.name,
            "Resolving Cloudflare credential from secret"
        );

        let data = self
            .read_secret(secret_namespace, &reference.name)
            .await?
            .ok_or_else(|| CredentialError::CredentialNotFound {
                namespace: secret_namespace.to_string(),
                name: reference.name.clone(),
                detail: "secret does not exist".to_string(),
            })?;

        credential_from_data(secret_namespace, &reference.name, &data)
    }

    async fn secret_value(
        &self,
        namespace: &str,
        key_ref: &SecretKeyRef,
    ) -> Result<String, CredentialError> {
        let not_found = || CredentialError::SecretNotFound {
            namespace: namespace.to_string(),
            name: key_ref.name.clone(),
            key: key_ref.key.clone(),
        };

        let data = self
            .read_secret(namespace, &key_ref.name)
            .await?
            .ok_or_else(not_found)?;

        data.get(&key_ref.key).cloned().ok_or_else(not_found)
    }
}

/// In-memory resolver for tests.
#[cfg(test)]
#[derive(Default)]
pub struct StaticCredentials {
    pub default: Option<Credential>,
    pub secrets: std::collections::HashMap<(String, String), BTreeMap<String, String>>,
}

#[cfg(test)]
impl StaticCredentials {
    pub fn with_default(credential: Credential) -> Self {
        Self {
            default: Some(credential),
            ..Default::default()
        }
    }

    pub fn insert_secret(&mut self, namespace: &str, name: &str, data: &[(&str, &str)]) {
        self.secrets.insert(
            (namespace.to_string(), name.to_string()),
            data.iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        );
    }
}

#[cfg(test)]
#[async_trait]
impl CredentialResolver for StaticCredentials {
    async fn resolve(
        &self,
        namespace: &str,
        reference: Option<&CredentialRef>,
    ) -> Result<Credential, CredentialError> {
        let Some(reference) = reference else {
            return self.default.clone().ok_or(CredentialError::NoDefault);
        };
        let ns = reference.namespace.as_deref().unwrap_or(namespace);
        let data = self
            .secrets
            .get(&(ns.to_string(), reference.name.clone()))
            .ok_or_else(|| CredentialError::CredentialNotFound {
                namespace: ns.to_string(),
                name: reference.name.clone(),
                detail: "secret does not exist".to_string(),
            })?;
        credential_from_data(ns, &reference.name, data)
    }

    async fn secret_value(
        &self,
        namespace: &str,
        key_ref: &SecretKeyRef,
    ) -> Result<String, CredentialError> {
        self.secrets
            .get(&(namespace.to_string(), key_ref.name.clone()))
            .and_then(|data| data.get(&key_ref.key).cloned())
            .ok_or_else(|| CredentialError::SecretNotFound {
                namespace: namespace.to_string(),
                name: key_ref.name.clone(),
                key: key_ref.key.clone(),
            })
    }
}

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod credentials_tests;
