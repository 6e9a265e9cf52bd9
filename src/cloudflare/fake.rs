// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory [`CloudflareApi`] for reconciler tests.
//!
//! Records every call as `"<operation> <target>"` and supports one-shot failure
//! injection per operation.

use super::error::{CloudflareError, Result};
use super::types::{
    AccessIdentityProvider, Bucket, CorsRule, CreateBucketRequest, CreateCustomDomainRequest,
    CustomDomain, CustomDomainStatus, IdentityProviderRequest, LifecycleRule, NotificationRule,
    Queue, RegistrarDomain, RegistrarUpdate, UpdateCustomDomainRequest, Zone,
};
use super::CloudflareApi;
use crate::credentials::Credential;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Operations that only read remote state.
const READ_PREFIXES: [&str; 4] = ["get_", "lookup_", "list_", "find_"];

#[derive(Default)]
struct State {
    zones: BTreeMap<String, Zone>,
    buckets: BTreeMap<String, Bucket>,
    cors: HashMap<String, Vec<CorsRule>>,
    lifecycle: HashMap<String, Vec<LifecycleRule>>,
    custom_domains: HashMap<(String, String), CustomDomain>,
    queues: Vec<Queue>,
    notifications: HashMap<(String, String), Vec<NotificationRule>>,
    registrar: HashMap<String, RegistrarDomain>,
    identity_providers: BTreeMap<String, AccessIdentityProvider>,
    client_secrets: HashMap<String, String>,
    next_id: u32,
    calls: Vec<String>,
    failures: HashMap<String, VecDeque<CloudflareError>>,
}

#[derive(Default)]
pub struct FakeCloudflare {
    state: Mutex<State>,
}

impl FakeCloudflare {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Record a call and pop an injected failure for it, if any.
    fn enter(&self, operation: &str, target: &str) -> Result<MutexGuard<'_, State>> {
        let mut state = self.lock();
        state.calls.push(format!("{operation} {target}"));
        if let Some(err) = state
            .failures
            .get_mut(operation)
            .and_then(VecDeque::pop_front)
        {
            return Err(err);
        }
        Ok(state)
    }

    /// Fail the next call of `operation` with `err`.
    pub fn fail_once(&self, operation: &str, err: CloudflareError) {
        self.lock()
            .failures
            .entry(operation.to_string())
            .or_default()
            .push_back(err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Calls that change remote state.
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !READ_PREFIXES.iter().any(|p| c.starts_with(p)))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn add_zone(&self, id: &str, name: &str, status: &str) {
        self.lock().zones.insert(
            id.to_string(),
            Zone {
                id: id.to_string(),
                name: name.to_string(),
                status: status.to_string(),
                name_servers: vec![
                    "ada.ns.cloudflare.com".to_string(),
                    "bob.ns.cloudflare.com".to_string(),
                ],
                account: None,
            },
        );
    }

    pub fn add_bucket(&self, name: &str, location: &str) {
        self.lock().buckets.insert(
            name.to_string(),
            Bucket {
                name: name.to_string(),
                location: Some(location.to_string()),
                creation_date: Some("2025-01-01T00:00:00Z".to_string()),
                storage_class: Some("Standard".to_string()),
            },
        );
    }

    /// Simulate out-of-band deletion.
    pub fn remove_bucket(&self, name: &str) {
        self.lock().buckets.remove(name);
    }

    pub fn bucket(&self, name: &str) -> Option<Bucket> {
        self.lock().buckets.get(name).cloned()
    }

    pub fn cors(&self, bucket: &str) -> Vec<CorsRule> {
        self.lock().cors.get(bucket).cloned().unwrap_or_default()
    }

    pub fn lifecycle(&self, bucket: &str) -> Vec<LifecycleRule> {
        self.lock().lifecycle.get(bucket).cloned().unwrap_or_default()
    }

    pub fn add_queue(&self, id: &str, name: &str) {
        self.lock().queues.push(Queue {
            queue_id: id.to_string(),
            queue_name: name.to_string(),
        });
    }

    pub fn notification_rules(&self, bucket: &str, queue_id: &str) -> Vec<NotificationRule> {
        self.lock()
            .notifications
            .get(&(bucket.to_string(), queue_id.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn custom_domain(&self, bucket: &str, domain: &str) -> Option<CustomDomain> {
        self.lock()
            .custom_domains
            .get(&(bucket.to_string(), domain.to_string()))
            .cloned()
    }

    pub fn set_custom_domain_status(&self, bucket: &str, domain: &str, ownership: &str, ssl: &str) {
        if let Some(d) = self
            .lock()
            .custom_domains
            .get_mut(&(bucket.to_string(), domain.to_string()))
        {
            d.status = CustomDomainStatus {
                ownership: ownership.to_string(),
                ssl: ssl.to_string(),
            };
        }
    }

    pub fn add_registrar_domain(&self, domain: RegistrarDomain) {
        self.lock().registrar.insert(domain.name.clone(), domain);
    }

    pub fn registrar_domain(&self, name: &str) -> Option<RegistrarDomain> {
        self.lock().registrar.get(name).cloned()
    }

    pub fn identity_provider(&self, id: &str) -> Option<AccessIdentityProvider> {
        self.lock().identity_providers.get(id).cloned()
    }

    pub fn identity_provider_count(&self) -> usize {
        self.lock().identity_providers.len()
    }

    /// Client secret last written to provider `id`.
    pub fn identity_provider_secret(&self, id: &str) -> Option<String> {
        self.lock().client_secrets.get(id).cloned()
    }

    /// Replace provider `id` without recording a call, as an out-of-band edit would.
    pub fn set_identity_provider(&self, provider: AccessIdentityProvider) {
        if let Some(id) = provider.id.clone() {
            self.lock().identity_providers.insert(id, provider);
        }
    }

    /// Store a provider the way Cloudflare does: secrets are kept aside and never returned.
    fn store_provider(
        state: &mut State,
        id: &str,
        request: &IdentityProviderRequest,
    ) -> AccessIdentityProvider {
        let mut config = request.config.clone();
        if let Some(secret) = config
            .as_object_mut()
            .and_then(|map| map.remove("client_secret"))
        {
            if let Some(secret) = secret.as_str() {
                state.client_secrets.insert(id.to_string(), secret.to_string());
            }
        }
        let provider = AccessIdentityProvider {
            id: Some(id.to_string()),
            name: request.name.clone(),
            provider_type: request.provider_type.clone(),
            config,
            scim_config: request.scim_config.clone(),
        };
        state.identity_providers.insert(id.to_string(), provider.clone());
        provider
    }
}

fn not_found(resource: String) -> CloudflareError {
    CloudflareError::NotFound { resource }
}

#[async_trait]
impl CloudflareApi for FakeCloudflare {
    async fn lookup_zone(&self, _cred: &Credential, name: &str) -> Result<Option<Zone>> {
        let state = self.enter("lookup_zone", name)?;
        Ok(state.zones.values().find(|z| z.name == name).cloned())
    }

    async fn get_zone(&self, _cred: &Credential, zone_id: &str) -> Result<Option<Zone>> {
        let state = self.enter("get_zone", zone_id)?;
        Ok(state.zones.get(zone_id).cloned())
    }

    async fn get_bucket(&self, _cred: &Credential, name: &str) -> Result<Option<Bucket>> {
        let state = self.enter("get_bucket", name)?;
        Ok(state.buckets.get(name).cloned())
    }

    async fn create_bucket(
        &self,
        _cred: &Credential,
        request: &CreateBucketRequest,
    ) -> Result<Bucket> {
        let mut state = self.enter("create_bucket", &request.name)?;
        let bucket = state
            .buckets
            .entry(request.name.clone())
            .or_insert_with(|| Bucket {
                name: request.name.clone(),
                location: Some(
                    request
                        .location_hint
                        .as_deref()
                        .unwrap_or("enam")
                        .to_uppercase(),
                ),
                creation_date: Some("2025-01-01T00:00:00Z".to_string()),
                storage_class: Some(
                    request
                        .storage_class
                        .clone()
                        .unwrap_or_else(|| "Standard".to_string()),
                ),
            });
        Ok(bucket.clone())
    }

    async fn update_bucket(&self, _cred: &Credential, name: &str, storage_class: &str) -> Result<()> {
        let mut state = self.enter("update_bucket", name)?;
        let bucket = state
            .buckets
            .get_mut(name)
            .ok_or_else(|| not_found(format!("bucket {name}")))?;
        bucket.storage_class = Some(storage_class.to_string());
        Ok(())
    }

    async fn delete_bucket(&self, _cred: &Credential, name: &str) -> Result<()> {
        let mut state = self.enter("delete_bucket", name)?;
        state
            .buckets
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_found(format!("bucket {name}")))
    }

    async fn get_bucket_cors(&self, _cred: &Credential, bucket: &str) -> Result<Vec<CorsRule>> {
        let state = self.enter("get_bucket_cors", bucket)?;
        Ok(state.cors.get(bucket).cloned().unwrap_or_default())
    }

    async fn put_bucket_cors(&self, _cred: &Credential, bucket: &str, rules: &[CorsRule]) -> Result<()> {
        let mut state = self.enter("put_bucket_cors", bucket)?;
        state.cors.insert(bucket.to_string(), rules.to_vec());
        Ok(())
    }

    async fn delete_bucket_cors(&self, _cred: &Credential, bucket: &str) -> Result<()> {
        let mut state = self.enter("delete_bucket_cors", bucket)?;
        state.cors.remove(bucket);
        Ok(())
    }

    async fn get_bucket_lifecycle(
        &self,
        _cred: &Credential,
        bucket: &str,
    ) -> Result<Vec<LifecycleRule>> {
        let state = self.enter("get_bucket_lifecycle", bucket)?;
        Ok(state.lifecycle.get(bucket).cloned().unwrap_or_default())
    }

    async fn put_bucket_lifecycle(
        &self,
        _cred: &Credential,
        bucket: &str,
        rules: &[LifecycleRule],
    ) -> Result<()> {
        let mut state = self.enter("put_bucket_lifecycle", bucket)?;
        state.lifecycle.insert(bucket.to_string(), rules.to_vec());
        Ok(())
    }

    async fn get_custom_domain(
        &self,
        _cred: &Credential,
        bucket: &str,
        domain: &str,
    ) -> Result<Option<CustomDomain>> {
        let state = self.enter("get_custom_domain", domain)?;
        Ok(state
            .custom_domains
            .get(&(bucket.to_string(), domain.to_string()))
            .cloned())
    }

    async fn create_custom_domain(
        &self,
        _cred: &Credential,
        bucket: &str,
        request: &CreateCustomDomainRequest,
    ) -> Result<CustomDomain> {
        let mut state = self.enter("create_custom_domain", &request.domain)?;
        let domain = state
            .custom_domains
            .entry((bucket.to_string(), request.domain.clone()))
            .or_insert_with(|| CustomDomain {
                domain: request.domain.clone(),
                enabled: request.enabled,
                status: CustomDomainStatus {
                    ownership: "pending".to_string(),
                    ssl: "initializing".to_string(),
                },
                min_tls: request.min_tls.clone(),
                zone_id: Some(request.zone_id.clone()),
                zone_name: None,
            });
        Ok(domain.clone())
    }

    async fn update_custom_domain(
        &self,
        _cred: &Credential,
        bucket: &str,
        domain: &str,
        request: &UpdateCustomDomainRequest,
    ) -> Result<()> {
        let mut state = self.enter("update_custom_domain", domain)?;
        let existing = state
            .custom_domains
            .get_mut(&(bucket.to_string(), domain.to_string()))
            .ok_or_else(|| not_found(format!("custom domain {domain}")))?;
        existing.enabled = request.enabled;
        existing.min_tls.clone_from(&request.min_tls);
        Ok(())
    }

    async fn delete_custom_domain(&self, _cred: &Credential, bucket: &str, domain: &str) -> Result<()> {
        let mut state = self.enter("delete_custom_domain", domain)?;
        state
            .custom_domains
            .remove(&(bucket.to_string(), domain.to_string()))
            .map(|_| ())
            .ok_or_else(|| not_found(format!("custom domain {domain}")))
    }

    async fn lookup_queue(&self, _cred: &Credential, name: &str) -> Result<Option<Queue>> {
        let state = self.enter("lookup_queue", name)?;
        Ok(state.queues.iter().find(|q| q.queue_name == name).cloned())
    }

    async fn get_notification_rules(
        &self,
        _cred: &Credential,
        bucket: &str,
        queue_id: &str,
    ) -> Result<Vec<NotificationRule>> {
        let state = self.enter("get_notification_rules", bucket)?;
        Ok(state
            .notifications
            .get(&(bucket.to_string(), queue_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn put_notification_rules(
        &self,
        _cred: &Credential,
        bucket: &str,
        queue_id: &str,
        rules: &[NotificationRule],
    ) -> Result<()> {
        let mut state = self.enter("put_notification_rules", bucket)?;
        state.next_id += 1;
        let base = state.next_id;
        let stored = rules
            .iter()
            .enumerate()
            .map(|(i, r)| NotificationRule {
                rule_id: Some(format!("rule-{base}-{i}")),
                created_at: Some("2025-01-01T00:00:00Z".to_string()),
                ..r.clone()
            })
            .collect();
        state
            .notifications
            .insert((bucket.to_string(), queue_id.to_string()), stored);
        Ok(())
    }

    async fn delete_notification_rules(
        &self,
        _cred: &Credential,
        bucket: &str,
        queue_id: &str,
    ) -> Result<()> {
        let mut state = self.enter("delete_notification_rules", bucket)?;
        state
            .notifications
            .remove(&(bucket.to_string(), queue_id.to_string()))
            .map(|_| ())
            .ok_or_else(|| not_found(format!("notification rules of bucket {bucket}")))
    }

    async fn get_registrar_domain(
        &self,
        _cred: &Credential,
        domain: &str,
    ) -> Result<Option<RegistrarDomain>> {
        let state = self.enter("get_registrar_domain", domain)?;
        Ok(state.registrar.get(domain).cloned())
    }

    async fn update_registrar_domain(
        &self,
        _cred: &Credential,
        domain: &str,
        update: &RegistrarUpdate,
    ) -> Result<()> {
        let mut state = self.enter("update_registrar_domain", domain)?;
        let existing = state
            .registrar
            .get_mut(domain)
            .ok_or_else(|| not_found(format!("registered domain {domain}")))?;
        if let Some(v) = update.auto_renew {
            existing.auto_renew = Some(v);
        }
        if let Some(v) = update.privacy {
            existing.privacy = Some(v);
        }
        if let Some(v) = update.locked {
            existing.locked = Some(v);
        }
        if let Some(v) = &update.name_servers {
            existing.name_servers.clone_from(v);
        }
        if let Some(v) = &update.registrant_contact {
            existing.registrant_contact = Some(v.clone());
        }
        Ok(())
    }

    async fn get_identity_provider(
        &self,
        _cred: &Credential,
        id: &str,
    ) -> Result<Option<AccessIdentityProvider>> {
        let state = self.enter("get_identity_provider", id)?;
        Ok(state.identity_providers.get(id).cloned())
    }

    async fn find_identity_provider(
        &self,
        _cred: &Credential,
        name: &str,
        provider_type: &str,
    ) -> Result<Option<AccessIdentityProvider>> {
        let state = self.enter("find_identity_provider", name)?;
        Ok(state
            .identity_providers
            .values()
            .find(|p| p.name == name && p.provider_type == provider_type)
            .cloned())
    }

    async fn create_identity_provider(
        &self,
        _cred: &Credential,
        request: &IdentityProviderRequest,
    ) -> Result<AccessIdentityProvider> {
        let mut state = self.enter("create_identity_provider", &request.name)?;
        state.next_id += 1;
        let id = format!("idp-{}", state.next_id);
        Ok(Self::store_provider(&mut state, &id, request))
    }

    async fn update_identity_provider(
        &self,
        _cred: &Credential,
        id: &str,
        request: &IdentityProviderRequest,
    ) -> Result<AccessIdentityProvider> {
        let mut state = self.enter("update_identity_provider", id)?;
        if !state.identity_providers.contains_key(id) {
            return Err(not_found(format!("identity provider {id}")));
        }
        // PUT replaces the whole provider
        Ok(Self::store_provider(&mut state, id, request))
    }

    async fn delete_identity_provider(&self, _cred: &Credential, id: &str) -> Result<()> {
        let mut state = self.enter("delete_identity_provider", id)?;
        state
            .identity_providers
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found(format!("identity provider {id}")))
    }
}
