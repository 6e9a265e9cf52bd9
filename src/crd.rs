// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for Cloudflare resource management.
//!
//! This module defines all Kubernetes Custom Resource Definitions used by the
//! operator to manage Cloudflare resources declaratively.
//!
//! # Resource Types
//!
//! ## Zones
//!
//! - [`CloudflareDomain`] - Binds a DNS suffix to a Cloudflare zone
//!
//! ## R2 Object Storage
//!
//! - [`R2Bucket`] - An R2 bucket with CORS and lifecycle configuration
//! - [`R2BucketDomain`] - A custom hostname serving an R2 bucket
//! - [`R2BucketNotification`] - Event notification rules delivering to a queue
//!
//! ## Registrar and Access
//!
//! - [`DomainRegistration`] - Registrar settings for a domain registered with Cloudflare
//! - [`IdentityProvider`] - A Cloudflare Access identity provider
//!
//! # Example: Binding a Zone
//!
//! ```rust,no_run
//! use cloudflare_operator::crd::CloudflareDomainSpec;
//!
//! let spec = CloudflareDomainSpec {
//!     domain: "example.com".to_string(),
//!     zone_id: None,
//!     is_default: true,
//!     credential_ref: None,
//! };
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Standard Kubernetes-style condition.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition. Common types include: Ready, DefaultZone, ZoneResolved, LocationHint.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Reference to a Secret holding Cloudflare API credentials.
///
/// The Secret must contain the keys `apiToken` and `accountId`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRef {
    /// Name of the Secret.
    pub name: String,

    /// Namespace of the Secret. Defaults to the namespace of the referencing resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// Reference to a single key within a Secret in the resource's namespace.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeyRef {
    /// Name of the Secret.
    pub name: String,

    /// Key within the Secret.
    pub key: String,
}

/// What happens to the remote object when the custom resource is deleted.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub enum DeletionPolicy {
    /// Delete the remote object and wait for its removal before finalizing.
    #[default]
    Delete,

    /// Leave the remote object untouched and only release the custom resource.
    Orphan,
}

// ============================================================================
// CloudflareDomain
// ============================================================================

/// `CloudflareDomain` binds a DNS suffix to a Cloudflare zone.
///
/// Hostname-bearing resources (such as [`R2BucketDomain`]) find their zone by
/// longest-suffix match over all `CloudflareDomain` resources. At most one binding
/// may set `isDefault`; it catches hostnames that match no other binding.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cloudflare.firestoned.io",
    version = "v1alpha1",
    kind = "CloudflareDomain",
    namespaced,
    shortname = "cfdomain",
    category = "cloudflare",
    doc = "CloudflareDomain binds a DNS suffix to a Cloudflare zone. Hostname-bearing resources resolve their zone through these bindings by longest-suffix match.",
    printcolumn = r#"{"name":"Domain","type":"string","jsonPath":".spec.domain"}"#,
    printcolumn = r#"{"name":"Zone","type":"string","jsonPath":".status.zoneId"}"#,
    printcolumn = r#"{"name":"Default","type":"boolean","jsonPath":".spec.isDefault"}"#,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#
)]
#[kube(status = "CloudflareDomainStatus")]
#[serde(rename_all = "camelCase")]
pub struct CloudflareDomainSpec {
    /// DNS suffix covered by this binding (e.g., "example.com").
    pub domain: String,

    /// Explicit zone ID. When set, the zone is fetched by ID instead of looked up by name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,

    /// Marks this binding as the fallback for hostnames no other binding matches.
    #[serde(default)]
    pub is_default: bool,

    /// Credentials to use. Defaults to the operator's configured credentials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_ref: Option<CredentialRef>,
}

/// Lifecycle state of a `CloudflareDomain`.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub enum DomainState {
    #[default]
    Pending,
    Verifying,
    Ready,
    Error,
}

/// `CloudflareDomain` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CloudflareDomainStatus {
    #[serde(default)]
    pub state: DomainState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub failure_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name_servers: Vec<String>,
    /// Zone status as reported by Cloudflare (active, pending, initializing, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_status: Option<String>,
}

// ============================================================================
// R2Bucket
// ============================================================================

/// Location hint for a new R2 bucket.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LocationHint {
    /// Asia-Pacific
    Apac,
    /// Eastern Europe
    Eeur,
    /// Eastern North America
    Enam,
    /// Western Europe
    Weur,
    /// Western North America
    Wnam,
    /// Oceania
    Oc,
}

impl LocationHint {
    /// The hint as Cloudflare spells it.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Apac => "apac",
            Self::Eeur => "eeur",
            Self::Enam => "enam",
            Self::Weur => "weur",
            Self::Wnam => "wnam",
            Self::Oc => "oc",
        }
    }
}

/// Default storage class for objects written to an R2 bucket.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub enum StorageClass {
    Standard,
    InfrequentAccess,
}

impl StorageClass {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::InfrequentAccess => "InfrequentAccess",
        }
    }
}

/// A single CORS rule. Rules are evaluated in order.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CorsRule {
    /// Optional identifier for the rule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Origins allowed to make cross-origin requests.
    #[serde(default)]
    pub allowed_origins: Vec<String>,

    /// HTTP methods allowed (GET, PUT, POST, DELETE, HEAD).
    #[serde(default)]
    pub allowed_methods: Vec<String>,

    /// Request headers allowed.
    #[serde(default)]
    pub allowed_headers: Vec<String>,

    /// Response headers exposed to the client.
    #[serde(default)]
    pub expose_headers: Vec<String>,

    /// How long the browser may cache the preflight response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age_seconds: Option<u32>,
}

/// A single object lifecycle rule, identified by `id`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleRule {
    /// Unique identifier of the rule within the bucket.
    pub id: String,

    /// Whether the rule is enforced.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Only objects whose key starts with this prefix are affected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    /// Delete objects this many days after creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_days: Option<u32>,

    /// Abort incomplete multipart uploads this many days after initiation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_multipart_upload_days: Option<u32>,

    /// Move objects to `InfrequentAccess` this many days after creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition_to_infrequent_access_days: Option<u32>,
}

fn default_true() -> bool {
    true
}

/// `R2Bucket` manages a Cloudflare R2 object-storage bucket.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cloudflare.firestoned.io",
    version = "v1alpha1",
    kind = "R2Bucket",
    namespaced,
    shortname = "r2b",
    category = "cloudflare",
    doc = "R2Bucket manages a Cloudflare R2 bucket together with its CORS policy and object lifecycle rules.",
    printcolumn = r#"{"name":"Bucket","type":"string","jsonPath":".status.bucketName"}"#,
    printcolumn = r#"{"name":"Location","type":"string","jsonPath":".status.location"}"#,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#
)]
#[kube(status = "R2BucketStatus")]
#[serde(rename_all = "camelCase")]
pub struct R2BucketSpec {
    /// Bucket name at Cloudflare. Defaults to the resource name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Location hint applied at creation. Immutable afterwards.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_hint: Option<LocationHint>,

    /// Default storage class for new objects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<StorageClass>,

    /// CORS rules, evaluated in order. An empty list removes the CORS policy.
    #[serde(default)]
    pub cors_rules: Vec<CorsRule>,

    /// Object lifecycle rules. An empty list clears all rules.
    #[serde(default)]
    pub lifecycle_rules: Vec<LifecycleRule>,

    #[serde(default)]
    pub deletion_policy: DeletionPolicy,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_ref: Option<CredentialRef>,
}

/// Lifecycle state of an `R2Bucket`.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub enum BucketState {
    #[default]
    Pending,
    Creating,
    Ready,
    Deleting,
    Error,
}

/// `R2Bucket` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct R2BucketStatus {
    #[serde(default)]
    pub state: BucketState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub failure_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub cors_rules_count: u32,
    #[serde(default)]
    pub lifecycle_rules_count: u32,
}

// ============================================================================
// R2BucketDomain
// ============================================================================

/// Minimum TLS version accepted on a custom domain.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub enum MinTls {
    #[serde(rename = "1.0")]
    Tls10,
    #[serde(rename = "1.1")]
    Tls11,
    #[serde(rename = "1.2")]
    Tls12,
    #[serde(rename = "1.3")]
    Tls13,
}

impl MinTls {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tls10 => "1.0",
            Self::Tls11 => "1.1",
            Self::Tls12 => "1.2",
            Self::Tls13 => "1.3",
        }
    }
}

/// `R2BucketDomain` serves an [`R2Bucket`] on a custom hostname.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cloudflare.firestoned.io",
    version = "v1alpha1",
    kind = "R2BucketDomain",
    namespaced,
    shortname = "r2bd",
    category = "cloudflare",
    doc = "R2BucketDomain attaches a custom hostname to an R2 bucket. The hostname's zone is resolved through CloudflareDomain bindings unless zoneId is set explicitly.",
    printcolumn = r#"{"name":"Domain","type":"string","jsonPath":".spec.domain"}"#,
    printcolumn = r#"{"name":"Bucket","type":"string","jsonPath":".spec.bucketRef"}"#,
    printcolumn = r#"{"name":"SSL","type":"string","jsonPath":".status.sslStatus"}"#,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#
)]
#[kube(status = "R2BucketDomainStatus")]
#[serde(rename_all = "camelCase")]
pub struct R2BucketDomainSpec {
    /// Name of the `R2Bucket` in the same namespace.
    pub bucket_ref: String,

    /// Hostname to serve the bucket on (e.g., "assets.example.com").
    pub domain: String,

    /// Explicit zone ID. Overrides resolution through `CloudflareDomain` bindings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_tls: Option<MinTls>,

    /// Whether the bucket is publicly readable through this hostname.
    #[serde(default = "default_true")]
    pub enable_public_access: bool,

    #[serde(default)]
    pub deletion_policy: DeletionPolicy,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_ref: Option<CredentialRef>,
}

/// Lifecycle state of an `R2BucketDomain`.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub enum BucketDomainState {
    #[default]
    Pending,
    Initializing,
    Active,
    Error,
}

/// `R2BucketDomain` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct R2BucketDomainStatus {
    #[serde(default)]
    pub state: BucketDomainState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub failure_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ownership_status: Option<String>,
}

// ============================================================================
// R2BucketNotification
// ============================================================================

/// Object event that triggers a notification.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, JsonSchema)]
pub enum NotificationEventType {
    /// Objects written by put, copy or multipart completion.
    #[serde(rename = "object-create")]
    ObjectCreate,

    /// Objects removed explicitly or by a lifecycle rule.
    #[serde(rename = "object-delete")]
    ObjectDelete,
}

/// A single notification rule. Rules are ordered.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRule {
    pub event_types: Vec<NotificationEventType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// `R2BucketNotification` delivers object events of an [`R2Bucket`] to a queue.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cloudflare.firestoned.io",
    version = "v1alpha1",
    kind = "R2BucketNotification",
    namespaced,
    shortname = "r2bn",
    category = "cloudflare",
    doc = "R2BucketNotification configures event notification rules that deliver object events from an R2 bucket to a Cloudflare queue.",
    printcolumn = r#"{"name":"Bucket","type":"string","jsonPath":".spec.bucketRef"}"#,
    printcolumn = r#"{"name":"Queue","type":"string","jsonPath":".spec.queue"}"#,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#
)]
#[kube(status = "R2BucketNotificationStatus")]
#[serde(rename_all = "camelCase")]
pub struct R2BucketNotificationSpec {
    /// Name of the `R2Bucket` in the same namespace.
    pub bucket_ref: String,

    /// Name of the destination queue.
    pub queue: String,

    /// Ordered notification rules.
    #[serde(default)]
    pub rules: Vec<NotificationRule>,

    #[serde(default)]
    pub deletion_policy: DeletionPolicy,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_ref: Option<CredentialRef>,
}

/// Lifecycle state of an `R2BucketNotification`.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub enum NotificationState {
    #[default]
    Pending,
    Active,
    Error,
}

/// `R2BucketNotification` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct R2BucketNotificationStatus {
    #[serde(default)]
    pub state: NotificationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub failure_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,
    #[serde(default)]
    pub rule_count: u32,
}

// ============================================================================
// DomainRegistration
// ============================================================================

/// Registrant contact details.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrantContact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    /// ISO 3166-1 alpha-2 country code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// `DomainRegistration` reconciles registrar settings of a domain registered with Cloudflare.
///
/// Only fields set in the spec are managed. The domain itself is never registered,
/// transferred or cancelled by the operator.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cloudflare.firestoned.io",
    version = "v1alpha1",
    kind = "DomainRegistration",
    namespaced,
    shortname = "cfreg",
    category = "cloudflare",
    doc = "DomainRegistration manages registrar settings (auto-renew, privacy, lock, name servers, contact) for a domain registered with Cloudflare Registrar.",
    printcolumn = r#"{"name":"Domain","type":"string","jsonPath":".spec.domainName"}"#,
    printcolumn = r#"{"name":"Expires","type":"string","jsonPath":".status.expiresAt"}"#,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#
)]
#[kube(status = "DomainRegistrationStatus")]
#[serde(rename_all = "camelCase")]
pub struct DomainRegistrationSpec {
    /// Registered domain name (e.g., "example.com").
    pub domain_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_renew: Option<bool>,

    /// WHOIS privacy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy: Option<bool>,

    /// Registrar transfer lock.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_servers: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrant_contact: Option<RegistrantContact>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_ref: Option<CredentialRef>,
}

/// Lifecycle state of a `DomainRegistration`.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub enum RegistrationState {
    #[default]
    Pending,
    Syncing,
    Active,
    TransferPending,
    Expired,
    Error,
}

/// `DomainRegistration` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DomainRegistrationStatus {
    #[serde(default)]
    pub state: RegistrationState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub failure_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_renew: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name_servers: Vec<String>,
}

// ============================================================================
// IdentityProvider
// ============================================================================

/// Kind of Cloudflare Access identity provider.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub enum IdentityProviderType {
    #[serde(rename = "azureAD")]
    AzureAd,
    #[serde(rename = "centrify")]
    Centrify,
    #[serde(rename = "facebook")]
    Facebook,
    #[serde(rename = "github")]
    Github,
    #[serde(rename = "google")]
    Google,
    #[serde(rename = "google-apps")]
    GoogleApps,
    #[serde(rename = "linkedin")]
    Linkedin,
    #[serde(rename = "oidc")]
    Oidc,
    #[serde(rename = "okta")]
    Okta,
    #[serde(rename = "onelogin")]
    Onelogin,
    #[serde(rename = "onetimepin")]
    Onetimepin,
    #[serde(rename = "pingone")]
    Pingone,
    #[serde(rename = "saml")]
    Saml,
    #[serde(rename = "yandex")]
    Yandex,
}

impl IdentityProviderType {
    /// The type as Cloudflare spells it.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AzureAd => "azureAD",
            Self::Centrify => "centrify",
            Self::Facebook => "facebook",
            Self::Github => "github",
            Self::Google => "google",
            Self::GoogleApps => "google-apps",
            Self::Linkedin => "linkedin",
            Self::Oidc => "oidc",
            Self::Okta => "okta",
            Self::Onelogin => "onelogin",
            Self::Onetimepin => "onetimepin",
            Self::Pingone => "pingone",
            Self::Saml => "saml",
            Self::Yandex => "yandex",
        }
    }
}

/// Provider-specific configuration. Which fields apply depends on the provider type.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProviderConfig {
    /// OAuth client ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Secret key holding the OAuth client secret.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret_ref: Option<SecretKeyRef>,

    /// Authorization endpoint (OIDC).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_url: Option<String>,

    /// Token endpoint (OIDC).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,

    /// JWKS endpoint (OIDC).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certs_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,

    /// Additional claims to request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_claim_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pkce_enabled: Option<bool>,

    /// Azure AD directory (tenant) ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_groups: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditional_access_enabled: Option<bool>,

    /// Google Workspace domain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apps_domain: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub okta_account: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub onelogin_account: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ping_env_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub centrify_account: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub centrify_app_id: Option<String>,

    /// SAML issuer URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer_url: Option<String>,

    /// SAML single sign-on URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sso_target_url: Option<String>,

    /// SAML signing certificate(s), PEM encoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idp_public_certs: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sign_request: Option<bool>,

    /// SAML attributes to forward.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_attribute_name: Option<String>,
}

/// SCIM provisioning settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScimConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_deprovision: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seat_deprovision: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_member_deprovision: Option<bool>,

    /// One of `automatic`, `reauth` or `no_action`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_update_behavior: Option<String>,
}

/// `IdentityProvider` manages a Cloudflare Access identity provider.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cloudflare.firestoned.io",
    version = "v1alpha1",
    kind = "IdentityProvider",
    namespaced,
    shortname = "cfidp",
    category = "cloudflare",
    doc = "IdentityProvider manages a Cloudflare Access identity provider. Client secrets are read from a Secret and never stored inline.",
    printcolumn = r#"{"name":"Type","type":"string","jsonPath":".spec.type"}"#,
    printcolumn = r#"{"name":"Provider","type":"string","jsonPath":".status.providerId"}"#,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#
)]
#[kube(status = "IdentityProviderStatus")]
#[serde(rename_all = "camelCase")]
pub struct IdentityProviderSpec {
    /// Display name of the provider in Cloudflare Access.
    pub name: String,

    #[serde(rename = "type")]
    pub r#type: IdentityProviderType,

    #[serde(default)]
    pub config: IdentityProviderConfig,

    /// SCIM settings. When absent the remote SCIM settings are left untouched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scim_config: Option<ScimConfig>,

    #[serde(default)]
    pub deletion_policy: DeletionPolicy,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_ref: Option<CredentialRef>,
}

/// Lifecycle state of an `IdentityProvider`.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub enum IdentityProviderState {
    #[default]
    Pending,
    Active,
    Error,
}

/// `IdentityProvider` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProviderStatus {
    #[serde(default)]
    pub state: IdentityProviderState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub failure_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    /// SHA-256 of the secret material last applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
