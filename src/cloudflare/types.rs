// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Wire types of the Cloudflare v4 API.
//!
//! Field names follow Cloudflare's JSON exactly, which is not consistent across
//! products: zones and registrar use `snake_case`, R2 configuration documents use
//! `camelCase`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Common response envelope: `{ success, errors, messages, result }`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    pub result: Option<T>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

// ============================================================================
// Zones
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    /// `active`, `pending`, `initializing`, `moved`, `deleted` or `deactivated`.
    pub status: String,
    #[serde(default)]
    pub name_servers: Vec<String>,
    #[serde(default)]
    pub account: Option<ZoneAccount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ZoneAccount {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

// ============================================================================
// R2 Buckets
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Bucket {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub storage_class: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBucketRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CorsPolicy {
    #[serde(default)]
    pub rules: Vec<CorsRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorsRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub allowed: CorsAllowed,
    #[serde(default)]
    pub expose_headers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age_seconds: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CorsAllowed {
    #[serde(default)]
    pub origins: Vec<String>,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub headers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LifecyclePolicy {
    #[serde(default)]
    pub rules: Vec<LifecycleRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleRule {
    pub id: String,
    pub enabled: bool,
    #[serde(default)]
    pub conditions: LifecycleConditions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_objects_transition: Option<AgeTransition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort_multipart_uploads_transition: Option<AgeTransition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub storage_class_transitions: Vec<StorageClassTransition>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LifecycleConditions {
    #[serde(default)]
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AgeTransition {
    pub condition: AgeCondition,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeCondition {
    /// Always `Age` for rules this operator writes.
    #[serde(rename = "type")]
    pub condition_type: String,
    /// Age in seconds.
    pub max_age: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageClassTransition {
    pub condition: AgeCondition,
    pub storage_class: String,
}

// ============================================================================
// R2 Custom Domains
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomDomain {
    pub domain: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub status: CustomDomainStatus,
    #[serde(rename = "minTLS", default, skip_serializing_if = "Option::is_none")]
    pub min_tls: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CustomDomainStatus {
    /// `pending`, `active`, `deactivated`, `blocked`, `error` or `unknown`.
    #[serde(default)]
    pub ownership: String,
    /// `initializing`, `pending`, `active`, `deactivated`, `error` or `unknown`.
    #[serde(default)]
    pub ssl: String,
}

impl CustomDomainStatus {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.ownership == "active" && self.ssl == "active"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomDomainRequest {
    pub domain: String,
    pub zone_id: String,
    pub enabled: bool,
    #[serde(rename = "minTLS", skip_serializing_if = "Option::is_none")]
    pub min_tls: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateCustomDomainRequest {
    pub enabled: bool,
    #[serde(rename = "minTLS", skip_serializing_if = "Option::is_none")]
    pub min_tls: Option<String>,
}

// ============================================================================
// Queues and Event Notifications
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Queue {
    pub queue_id: String,
    pub queue_name: String,
}

/// Event notification configuration of a bucket, grouped by destination queue.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationConfiguration {
    #[serde(default)]
    pub queues: Vec<QueueNotifications>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueNotifications {
    pub queue_id: String,
    #[serde(default)]
    pub rules: Vec<NotificationRule>,
}

/// A notification rule. `rule_id` and `created_at` are assigned by Cloudflare.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRule {
    pub actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing)]
    pub rule_id: Option<String>,
    #[serde(default, skip_serializing)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PutNotificationRulesRequest<'a> {
    pub rules: &'a [NotificationRule],
}

// ============================================================================
// Registrar
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RegistrarDomain {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub auto_renew: Option<bool>,
    #[serde(default)]
    pub privacy: Option<bool>,
    #[serde(default)]
    pub locked: Option<bool>,
    #[serde(default)]
    pub expires_at: Option<String>,
    /// Registry status string, e.g. `active`, `expired`, `pendingTransfer`.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub name_servers: Vec<String>,
    #[serde(default)]
    pub registrant_contact: Option<Contact>,
    #[serde(default)]
    pub transfer_in: Option<TransferIn>,
}

/// Progress of an inbound transfer. Each step is `ok`, `pending`, `needed` or `unknown`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransferIn {
    #[serde(default)]
    pub unlock_domain: Option<String>,
    #[serde(default)]
    pub disable_privacy: Option<String>,
    #[serde(default)]
    pub enter_auth_code: Option<String>,
    #[serde(default)]
    pub approve_transfer: Option<String>,
    #[serde(default)]
    pub accept_foa: Option<String>,
}

impl TransferIn {
    /// True while any transfer step is still outstanding.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        [
            &self.unlock_domain,
            &self.disable_privacy,
            &self.enter_auth_code,
            &self.approve_transfer,
            &self.accept_foa,
        ]
        .into_iter()
        .flatten()
        .any(|step| step == "pending" || step == "needed")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

/// Partial registrar update. Only fields that are `Some` are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrarUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_renew: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub privacy: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_servers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrant_contact: Option<Contact>,
}

impl RegistrarUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ============================================================================
// Access Identity Providers
// ============================================================================

/// Identity provider as stored by Cloudflare Access.
///
/// `config` and `scim_config` are kept as raw JSON objects: their shape depends on
/// the provider type and Cloudflare adds server-side fields (such as `redirect_url`).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AccessIdentityProvider {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub provider_type: String,
    #[serde(default)]
    pub config: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scim_config: Option<Value>,
}

/// Create or update body. `scim_config` is omitted when `None`, leaving remote SCIM untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentityProviderRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub provider_type: String,
    pub config: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scim_config: Option<Value>,
}
