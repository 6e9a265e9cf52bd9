// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `reqwest` implementation of [`CloudflareApi`].
//!
//! Every request carries the credential's API token as a bearer token and is bounded
//! by the configured request timeout. Transient failures (network errors, timeouts,
//! HTTP 429 and 5xx) are retried in-process with exponential backoff until the retry
//! budget is spent; everything else fails fast and is left to the reconciler.

use super::error::{CloudflareError, Result};
use super::types::{
    AccessIdentityProvider, Bucket, CorsPolicy, CorsRule, CreateBucketRequest,
    CreateCustomDomainRequest, CustomDomain, CustomDomainStatus, Envelope,
    IdentityProviderRequest, LifecyclePolicy, LifecycleRule, NotificationConfiguration,
    NotificationRule, PutNotificationRulesRequest, Queue, RegistrarDomain, RegistrarUpdate,
    UpdateCustomDomainRequest, Zone,
};
use super::CloudflareApi;
use crate::constants::{R2_STORAGE_CLASS_HEADER, USER_AGENT};
use crate::credentials::Credential;
use crate::metrics::record_cloudflare_request;
use crate::reconcilers::retry::{http_backoff, HTTP_MAX_ELAPSED_TIME_SECS};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Page size used when listing queues and identity providers.
const LIST_PAGE_SIZE: usize = 100;

/// Upper bound on pages fetched by a single listing.
const MAX_LIST_PAGES: u32 = 50;

/// A single HTTP call to make.
struct ApiRequest {
    operation: &'static str,
    method: Method,
    path: String,
    /// Human-readable name of the addressed object, used in `NotFound` errors.
    resource: String,
    /// Query parameters. Values are DNS names, queue names or numbers and need no escaping.
    query: Vec<(&'static str, String)>,
    headers: Vec<(&'static str, String)>,
    body: Option<Value>,
}

impl ApiRequest {
    fn new(
        operation: &'static str,
        method: Method,
        path: String,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            method,
            path,
            resource: resource.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    fn query(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }

    fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    fn json<B: Serialize>(mut self, body: &B) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| CloudflareError::InvalidResponse(format!("unserializable body: {e}")))?;
        self.body = Some(value);
        Ok(self)
    }
}

/// HTTPS client for the Cloudflare v4 API.
#[derive(Clone)]
pub struct CloudflareClient {
    http: reqwest::Client,
    base_url: String,
    retry_budget: Duration,
}

impl CloudflareClient {
    /// Create a client for `base_url` (normally `https://api.cloudflare.com/client/v4`).
    ///
    /// # Errors
    ///
    /// Returns [`CloudflareError::Network`] if the underlying HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CloudflareError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry_budget: Duration::from_secs(HTTP_MAX_ELAPSED_TIME_SECS),
        })
    }

    /// Limit the time spent retrying transient failures. `Duration::ZERO` disables retries.
    #[must_use]
    pub fn with_retry_budget(mut self, budget: Duration) -> Self {
        self.retry_budget = budget;
        self
    }

    /// Execute a request, retrying transient failures with exponential backoff.
    async fn execute<T: DeserializeOwned>(
        &self,
        cred: &Credential,
        request: &ApiRequest,
    ) -> Result<Option<T>> {
        let mut backoff = http_backoff();
        let start_time = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let started = Instant::now();
            let result = self.execute_once::<T>(cred, request).await;

            let outcome = match &result {
                Ok(_) => "success",
                Err(e) => e.metric_label(),
            };
            record_cloudflare_request(request.operation, outcome, started.elapsed());

            match result {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(
                            operation = request.operation,
                            attempt = attempt,
                            elapsed = ?start_time.elapsed(),
                            "Cloudflare API call succeeded after retries"
                        );
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() && start_time.elapsed() < self.retry_budget => {
                    let Some(delay) = backoff.next_backoff() else {
                        return Err(e);
                    };
                    warn!(
                        operation = request.operation,
                        attempt = attempt,
                        retry_after = ?delay,
                        error = %e,
                        "Retryable Cloudflare API error, will retry"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    debug!(
                        operation = request.operation,
                        attempt = attempt,
                        error = %e,
                        "Cloudflare API call failed"
                    );
                    return Err(e);
                }
            }
        }
    }

    async fn execute_once<T: DeserializeOwned>(
        &self,
        cred: &Credential,
        request: &ApiRequest,
    ) -> Result<Option<T>> {
        let mut url = format!("{}{}", self.base_url, request.path);
        if !request.query.is_empty() {
            let query: Vec<String> = request
                .query
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            url = format!("{url}?{}", query.join("&"));
        }
        debug!(
            operation = request.operation,
            method = %request.method,
            url = %url,
            "Cloudflare API request"
        );

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .bearer_auth(cred.api_token());
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        decode_response(status, &text, &request.resource)
    }

    /// Fetch every page of a list endpoint.
    async fn list_all<T: DeserializeOwned>(
        &self,
        cred: &Credential,
        operation: &'static str,
        path: &str,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        for page in 1..=MAX_LIST_PAGES {
            let request = ApiRequest::new(operation, Method::GET, path.to_string(), path)
                .query("page", page.to_string())
                .query("per_page", LIST_PAGE_SIZE.to_string());
            let batch: Vec<T> = self.execute(cred, &request).await?.unwrap_or_default();
            let done = batch.len() < LIST_PAGE_SIZE;
            items.extend(batch);
            if done {
                break;
            }
        }
        Ok(items)
    }
}

/// Turn an HTTP status and body into the envelope's `result`.
///
/// `Ok(None)` means a successful response without a result (e.g. a delete).
pub(crate) fn decode_response<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
    resource: &str,
) -> Result<Option<T>> {
    if status == StatusCode::NOT_FOUND {
        return Err(CloudflareError::NotFound {
            resource: resource.to_string(),
        });
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(CloudflareError::RateLimited);
    }

    if !status.is_success() {
        let first = serde_json::from_str::<Envelope<Value>>(body)
            .ok()
            .and_then(|env| env.errors.into_iter().next());
        let (code, message) = first.map_or_else(
            || (0, status.canonical_reason().unwrap_or("error").to_string()),
            |e| (e.code, e.message),
        );
        return Err(CloudflareError::Api {
            status: status.as_u16(),
            code,
            message,
        });
    }

    if body.trim().is_empty() {
        return Ok(None);
    }

    let envelope: Envelope<T> = serde_json::from_str(body)
        .map_err(|e| CloudflareError::InvalidResponse(format!("{resource}: {e}")))?;

    if !envelope.success {
        let (code, message) = envelope
            .errors
            .into_iter()
            .next()
            .map_or_else(|| (0, "unknown error".to_string()), |e| (e.code, e.message));
        return Err(CloudflareError::Api {
            status: status.as_u16(),
            code,
            message,
        });
    }

    Ok(envelope.result)
}

/// Cloudflare reports duplicates either as HTTP 409 or as a 4xx with an
/// "already exists" message.
fn is_conflict(err: &CloudflareError) -> bool {
    match err {
        CloudflareError::AlreadyExists { .. } => true,
        CloudflareError::Api {
            status, message, ..
        } => *status == 409 || message.to_lowercase().contains("already exists"),
        _ => false,
    }
}

/// Map `NotFound` to `None` for read operations.
fn found<T>(result: Result<Option<T>>) -> Result<Option<T>> {
    match result {
        Err(e) if e.is_not_found() => Ok(None),
        other => other,
    }
}

/// Map `NotFound` to an empty document for configuration reads.
fn found_or_default<T: Default>(result: Result<Option<T>>) -> Result<T> {
    found(result).map(Option::unwrap_or_default)
}

fn account_path(cred: &Credential, suffix: &str) -> String {
    format!("/accounts/{}{suffix}", cred.account_id())
}

fn bucket_path(cred: &Credential, bucket: &str, suffix: &str) -> String {
    account_path(cred, &format!("/r2/buckets/{bucket}{suffix}"))
}

fn notification_path(cred: &Credential, bucket: &str, suffix: &str) -> String {
    account_path(
        cred,
        &format!("/event_notifications/r2/{bucket}/configuration{suffix}"),
    )
}

#[async_trait]
impl CloudflareApi for CloudflareClient {
    async fn lookup_zone(&self, cred: &Credential, name: &str) -> Result<Option<Zone>> {
        let request = ApiRequest::new("lookup_zone", Method::GET, "/zones".into(), name)
            .query("name", name);
        let zones: Vec<Zone> = found(self.execute(cred, &request).await)?.unwrap_or_default();
        Ok(zones
            .into_iter()
            .find(|z| z.name.eq_ignore_ascii_case(name)))
    }

    async fn get_zone(&self, cred: &Credential, zone_id: &str) -> Result<Option<Zone>> {
        let request = ApiRequest::new(
            "get_zone",
            Method::GET,
            format!("/zones/{zone_id}"),
            format!("zone {zone_id}"),
        );
        found(self.execute(cred, &request).await)
    }

    async fn get_bucket(&self, cred: &Credential, name: &str) -> Result<Option<Bucket>> {
        let request = ApiRequest::new(
            "get_bucket",
            Method::GET,
            bucket_path(cred, name, ""),
            format!("bucket {name}"),
        );
        found(self.execute(cred, &request).await)
    }

    async fn create_bucket(
        &self,
        cred: &Credential,
        create: &CreateBucketRequest,
    ) -> Result<Bucket> {
        let request = ApiRequest::new(
            "create_bucket",
            Method::POST,
            account_path(cred, "/r2/buckets"),
            format!("bucket {}", create.name),
        )
        .json(create)?;

        match self.execute::<Bucket>(cred, &request).await {
            Ok(Some(bucket)) => Ok(bucket),
            Ok(None) => self.get_bucket(cred, &create.name).await?.ok_or_else(|| {
                CloudflareError::InvalidResponse(format!(
                    "bucket {} missing after create",
                    create.name
                ))
            }),
            Err(e) if is_conflict(&e) => {
                debug!(bucket = %create.name, "Bucket already exists, reading it back");
                self.get_bucket(cred, &create.name)
                    .await?
                    .ok_or(CloudflareError::AlreadyExists {
                        resource: format!("bucket {}", create.name),
                    })
            }
            Err(e) => Err(e),
        }
    }

    async fn update_bucket(&self, cred: &Credential, name: &str, storage_class: &str) -> Result<()> {
        let request = ApiRequest::new(
            "update_bucket",
            Method::PATCH,
            bucket_path(cred, name, ""),
            format!("bucket {name}"),
        )
        .header(R2_STORAGE_CLASS_HEADER, storage_class);
        self.execute::<Value>(cred, &request).await.map(|_| ())
    }

    async fn delete_bucket(&self, cred: &Credential, name: &str) -> Result<()> {
        let request = ApiRequest::new(
            "delete_bucket",
            Method::DELETE,
            bucket_path(cred, name, ""),
            format!("bucket {name}"),
        );
        self.execute::<Value>(cred, &request).await.map(|_| ())
    }

    async fn get_bucket_cors(&self, cred: &Credential, bucket: &str) -> Result<Vec<CorsRule>> {
        let request = ApiRequest::new(
            "get_bucket_cors",
            Method::GET,
            bucket_path(cred, bucket, "/cors"),
            format!("CORS policy of bucket {bucket}"),
        );
        found_or_default::<CorsPolicy>(self.execute(cred, &request).await).map(|p| p.rules)
    }

    async fn put_bucket_cors(&self, cred: &Credential, bucket: &str, rules: &[CorsRule]) -> Result<()> {
        let request = ApiRequest::new(
            "put_bucket_cors",
            Method::PUT,
            bucket_path(cred, bucket, "/cors"),
            format!("bucket {bucket}"),
        )
        .json(&CorsPolicy {
            rules: rules.to_vec(),
        })?;
        self.execute::<Value>(cred, &request).await.map(|_| ())
    }

    async fn delete_bucket_cors(&self, cred: &Credential, bucket: &str) -> Result<()> {
        let request = ApiRequest::new(
            "delete_bucket_cors",
            Method::DELETE,
            bucket_path(cred, bucket, "/cors"),
            format!("CORS policy of bucket {bucket}"),
        );
        self.execute::<Value>(cred, &request).await.map(|_| ())
    }

    async fn get_bucket_lifecycle(
        &self,
        cred: &Credential,
        bucket: &str,
    ) -> Result<Vec<LifecycleRule>> {
        let request = ApiRequest::new(
            "get_bucket_lifecycle",
            Method::GET,
            bucket_path(cred, bucket, "/lifecycle"),
            format!("lifecycle policy of bucket {bucket}"),
        );
        found_or_default::<LifecyclePolicy>(self.execute(cred, &request).await).map(|p| p.rules)
    }

    async fn put_bucket_lifecycle(
        &self,
        cred: &Credential,
        bucket: &str,
        rules: &[LifecycleRule],
    ) -> Result<()> {
        let request = ApiRequest::new(
            "put_bucket_lifecycle",
            Method::PUT,
            bucket_path(cred, bucket, "/lifecycle"),
            format!("bucket {bucket}"),
        )
        .json(&LifecyclePolicy {
            rules: rules.to_vec(),
        })?;
        self.execute::<Value>(cred, &request).await.map(|_| ())
    }

    async fn get_custom_domain(
        &self,
        cred: &Credential,
        bucket: &str,
        domain: &str,
    ) -> Result<Option<CustomDomain>> {
        let request = ApiRequest::new(
            "get_custom_domain",
            Method::GET,
            bucket_path(cred, bucket, &format!("/domains/custom/{domain}")),
            format!("custom domain {domain}"),
        );
        found(self.execute(cred, &request).await)
    }

    async fn create_custom_domain(
        &self,
        cred: &Credential,
        bucket: &str,
        create: &CreateCustomDomainRequest,
    ) -> Result<CustomDomain> {
        let request = ApiRequest::new(
            "create_custom_domain",
            Method::POST,
            bucket_path(cred, bucket, "/domains/custom"),
            format!("custom domain {}", create.domain),
        )
        .json(create)?;

        match self.execute::<Value>(cred, &request).await {
            Ok(_) => {}
            Err(e) if is_conflict(&e) => {
                debug!(domain = %create.domain, "Custom domain already exists, reading it back");
            }
            Err(e) => return Err(e),
        }

        // The create response omits validation status; read the full object back.
        Ok(self
            .get_custom_domain(cred, bucket, &create.domain)
            .await?
            .unwrap_or_else(|| CustomDomain {
                domain: create.domain.clone(),
                enabled: create.enabled,
                status: CustomDomainStatus::default(),
                min_tls: create.min_tls.clone(),
                zone_id: Some(create.zone_id.clone()),
                zone_name: None,
            }))
    }

    async fn update_custom_domain(
        &self,
        cred: &Credential,
        bucket: &str,
        domain: &str,
        update: &UpdateCustomDomainRequest,
    ) -> Result<()> {
        let request = ApiRequest::new(
            "update_custom_domain",
            Method::PUT,
            bucket_path(cred, bucket, &format!("/domains/custom/{domain}")),
            format!("custom domain {domain}"),
        )
        .json(update)?;
        self.execute::<Value>(cred, &request).await.map(|_| ())
    }

    async fn delete_custom_domain(&self, cred: &Credential, bucket: &str, domain: &str) -> Result<()> {
        let request = ApiRequest::new(
            "delete_custom_domain",
            Method::DELETE,
            bucket_path(cred, bucket, &format!("/domains/custom/{domain}")),
            format!("custom domain {domain}"),
        );
        self.execute::<Value>(cred, &request).await.map(|_| ())
    }

    async fn lookup_queue(&self, cred: &Credential, name: &str) -> Result<Option<Queue>> {
        let queues: Vec<Queue> = self
            .list_all(cred, "lookup_queue", &account_path(cred, "/queues"))
            .await?;
        Ok(queues.into_iter().find(|q| q.queue_name == name))
    }

    async fn get_notification_rules(
        &self,
        cred: &Credential,
        bucket: &str,
        queue_id: &str,
    ) -> Result<Vec<NotificationRule>> {
        let request = ApiRequest::new(
            "get_notification_rules",
            Method::GET,
            notification_path(cred, bucket, ""),
            format!("notification configuration of bucket {bucket}"),
        );
        let configuration: NotificationConfiguration =
            found_or_default(self.execute(cred, &request).await)?;

        Ok(configuration
            .queues
            .into_iter()
            .filter(|q| q.queue_id == queue_id)
            .flat_map(|q| q.rules)
            .collect())
    }

    async fn put_notification_rules(
        &self,
        cred: &Credential,
        bucket: &str,
        queue_id: &str,
        rules: &[NotificationRule],
    ) -> Result<()> {
        let request = ApiRequest::new(
            "put_notification_rules",
            Method::PUT,
            notification_path(cred, bucket, &format!("/queues/{queue_id}")),
            format!("bucket {bucket}"),
        )
        .json(&PutNotificationRulesRequest { rules })?;
        self.execute::<Value>(cred, &request).await.map(|_| ())
    }

    async fn delete_notification_rules(
        &self,
        cred: &Credential,
        bucket: &str,
        queue_id: &str,
    ) -> Result<()> {
        let request = ApiRequest::new(
            "delete_notification_rules",
            Method::DELETE,
            notification_path(cred, bucket, &format!("/queues/{queue_id}")),
            format!("notification rules of bucket {bucket} for queue {queue_id}"),
        );
        self.execute::<Value>(cred, &request).await.map(|_| ())
    }

    async fn get_registrar_domain(
        &self,
        cred: &Credential,
        domain: &str,
    ) -> Result<Option<RegistrarDomain>> {
        let request = ApiRequest::new(
            "get_registrar_domain",
            Method::GET,
            account_path(cred, &format!("/registrar/domains/{domain}")),
            format!("registered domain {domain}"),
        );
        found(self.execute(cred, &request).await)
    }

    async fn update_registrar_domain(
        &self,
        cred: &Credential,
        domain: &str,
        update: &RegistrarUpdate,
    ) -> Result<()> {
        let request = ApiRequest::new(
            "update_registrar_domain",
            Method::PUT,
            account_path(cred, &format!("/registrar/domains/{domain}")),
            format!("registered domain {domain}"),
        )
        .json(update)?;
        self.execute::<Value>(cred, &request).await.map(|_| ())
    }

    async fn get_identity_provider(
        &self,
        cred: &Credential,
        id: &str,
    ) -> Result<Option<AccessIdentityProvider>> {
        let request = ApiRequest::new(
            "get_identity_provider",
            Method::GET,
            account_path(cred, &format!("/access/identity_providers/{id}")),
            format!("identity provider {id}"),
        );
        found(self.execute(cred, &request).await)
    }

    async fn find_identity_provider(
        &self,
        cred: &Credential,
        name: &str,
        provider_type: &str,
    ) -> Result<Option<AccessIdentityProvider>> {
        let existing: Vec<AccessIdentityProvider> = self
            .list_all(
                cred,
                "list_identity_providers",
                &account_path(cred, "/access/identity_providers"),
            )
            .await?;
        Ok(existing
            .into_iter()
            .find(|p| p.name == name && p.provider_type == provider_type))
    }

    async fn create_identity_provider(
        &self,
        cred: &Credential,
        create: &IdentityProviderRequest,
    ) -> Result<AccessIdentityProvider> {
        let request = ApiRequest::new(
            "create_identity_provider",
            Method::POST,
            account_path(cred, "/access/identity_providers"),
            format!("identity provider {}", create.name),
        )
        .json(create)?;
        self.execute(cred, &request).await?.ok_or_else(|| {
            CloudflareError::InvalidResponse(format!(
                "identity provider {} missing from create response",
                create.name
            ))
        })
    }

    async fn update_identity_provider(
        &self,
        cred: &Credential,
        id: &str,
        update: &IdentityProviderRequest,
    ) -> Result<AccessIdentityProvider> {
        let request = ApiRequest::new(
            "update_identity_provider",
            Method::PUT,
            account_path(cred, &format!("/access/identity_providers/{id}")),
            format!("identity provider {id}"),
        )
        .json(update)?;
        self.execute(cred, &request).await?.ok_or_else(|| {
            CloudflareError::InvalidResponse(format!(
                "identity provider {id} missing from update response"
            ))
        })
    }

    async fn delete_identity_provider(&self, cred: &Credential, id: &str) -> Result<()> {
        let request = ApiRequest::new(
            "delete_identity_provider",
            Method::DELETE,
            account_path(cred, &format!("/access/identity_providers/{id}")),
            format!("identity provider {id}"),
        );
        self.execute::<Value>(cred, &request).await.map(|_| ())
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod client_tests;
