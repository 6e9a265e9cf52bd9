// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `CloudflareDomain` reconciliation logic.
//!
//! A `CloudflareDomain` never creates or deletes a zone. It discovers the zone that
//! owns its domain and records the zone ID in status, where the Domain Resolver
//! picks it up for hostname-bearing kinds.
//!
//! # Zone Discovery
//!
//! - `spec.zoneId` set: the zone is fetched by ID.
//! - Otherwise the zone is looked up by name, walking up one label at a time:
//!   `a.b.example.com`, then `b.example.com`, then `example.com`.
//!
//! # States
//!
//! - `active` zone: `Ready`
//! - `pending` or `initializing` zone (name servers not delegated yet): `Verifying`
//! - anything else (`moved`, `deactivated`, ...): configuration error

use crate::cloudflare::types::Zone;
use crate::constants::FINALIZER_CLOUDFLARE_DOMAIN;
use crate::context::Context;
use crate::credentials::Credential;
use crate::crd::{
    CloudflareDomain, CloudflareDomainStatus, CredentialRef, DeletionPolicy, DomainState,
};
use crate::errors::ReconcileError;
use crate::resolver::{normalize_hostname, ZoneSnapshot};
use crate::status_reasons::{
    CONDITION_STATUS_FALSE, CONDITION_STATUS_TRUE, CONDITION_TYPE_DEFAULT_ZONE,
    REASON_AMBIGUOUS_DEFAULT_ZONE, REASON_DEFAULT_ZONE_UNIQUE, REASON_NOT_DEFAULT,
    REASON_ZONE_NOT_FOUND, REASON_ZONE_VERIFYING,
};
use async_trait::async_trait;
use kube::ResourceExt;
use tracing::{debug, warn};

use super::engine::{KindReconciler, ManagedResource, SyncProgress};
use super::status::KindStatus;

impl ManagedResource for CloudflareDomain {
    const FINALIZER: &'static str = FINALIZER_CLOUDFLARE_DOMAIN;

    /// Zones are never deleted by the operator.
    fn deletion_policy(&self) -> DeletionPolicy {
        DeletionPolicy::Orphan
    }

    fn credential_ref(&self) -> Option<&CredentialRef> {
        self.spec.credential_ref.as_ref()
    }
}

/// Names to try when looking for the zone owning `domain`, most specific first.
///
/// Stops at the registrable two-label name; a bare TLD is never a zone.
#[must_use]
pub fn zone_candidates(domain: &str) -> Vec<String> {
    let domain = normalize_hostname(domain);
    let labels: Vec<&str> = domain.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() < 2 {
        return vec![domain];
    }
    (0..=labels.len() - 2)
        .map(|start| labels[start..].join("."))
        .collect()
}

/// Reconciles `CloudflareDomain` resources.
pub struct DomainReconciler;

impl DomainReconciler {
    async fn find_zone(
        ctx: &Context,
        credential: &Credential,
        domain: &CloudflareDomain,
    ) -> Result<Zone, ReconcileError> {
        if let Some(zone_id) = domain.spec.zone_id.as_deref().filter(|id| !id.is_empty()) {
            return ctx
                .cloudflare
                .get_zone(credential, zone_id)
                .await?
                .ok_or_else(|| {
                    ReconcileError::dependency(
                        REASON_ZONE_NOT_FOUND,
                        format!("zone {zone_id} does not exist in Cloudflare"),
                    )
                });
        }

        for candidate in zone_candidates(&domain.spec.domain) {
            debug!(domain = %domain.spec.domain, %candidate, "Looking up zone");
            if let Some(zone) = ctx.cloudflare.lookup_zone(credential, &candidate).await? {
                return Ok(zone);
            }
        }

        Err(ReconcileError::dependency(
            REASON_ZONE_NOT_FOUND,
            format!(
                "no Cloudflare zone owns {} in account {}",
                domain.spec.domain,
                credential.account_id()
            ),
        ))
    }
}

/// Report whether this binding's default claim is unambiguous.
fn report_default_claim(
    domain: &CloudflareDomain,
    snapshot: &ZoneSnapshot,
    status: &mut CloudflareDomainStatus,
) {
    if !domain.spec.is_default {
        status.set_condition(
            CONDITION_TYPE_DEFAULT_ZONE,
            CONDITION_STATUS_FALSE,
            REASON_NOT_DEFAULT,
            "Not a default zone",
        );
        return;
    }

    let own_key = format!(
        "{}/{}",
        domain.namespace().unwrap_or_default(),
        domain.name_any()
    );
    let mut others: Vec<String> = snapshot
        .defaults()
        .into_iter()
        .map(|b| b.key())
        .filter(|k| *k != own_key)
        .collect();
    others.sort();

    if others.is_empty() {
        status.set_condition(
            CONDITION_TYPE_DEFAULT_ZONE,
            CONDITION_STATUS_TRUE,
            REASON_DEFAULT_ZONE_UNIQUE,
            "This is the only default zone",
        );
    } else {
        warn!(domain = %own_key, others = ?others, "Several CloudflareDomains claim to be the default zone");
        status.set_condition(
            CONDITION_TYPE_DEFAULT_ZONE,
            CONDITION_STATUS_FALSE,
            REASON_AMBIGUOUS_DEFAULT_ZONE,
            &format!(
                "Default zone is also claimed by {}; hostnames without a matching domain cannot be resolved",
                others.join(", ")
            ),
        );
    }
}

#[async_trait]
impl KindReconciler for DomainReconciler {
    type Resource = CloudflareDomain;

    async fn sync(
        &self,
        domain: &CloudflareDomain,
        ctx: &Context,
        credential: &Credential,
        status: &mut CloudflareDomainStatus,
    ) -> Result<SyncProgress, ReconcileError> {
        report_default_claim(domain, &ctx.zone_snapshot(), status);

        let zone = Self::find_zone(ctx, credential, domain).await?;
        status.zone_id = Some(zone.id.clone());
        status.zone_name = Some(zone.name.clone());
        status.account_id = Some(
            zone.account
                .as_ref()
                .map_or_else(|| credential.account_id().to_string(), |a| a.id.clone()),
        );
        status.name_servers.clone_from(&zone.name_servers);
        status.zone_status = Some(zone.status.clone());

        match zone.status.as_str() {
            "active" => {
                status.state = DomainState::Ready;
                Ok(SyncProgress::Ready(format!(
                    "Zone {} ({}) is active",
                    zone.name, zone.id
                )))
            }
            "pending" | "initializing" => {
                status.state = DomainState::Verifying;
                Ok(SyncProgress::Progressing {
                    reason: REASON_ZONE_VERIFYING,
                    message: format!(
                        "Zone {} is {}; delegate to {}",
                        zone.name,
                        zone.status,
                        zone.name_servers.join(", ")
                    ),
                })
            }
            other => Err(ReconcileError::dependency(
                REASON_ZONE_NOT_FOUND,
                format!("zone {} is {other}", zone.name),
            )),
        }
    }

    async fn cleanup(
        &self,
        _domain: &CloudflareDomain,
        _ctx: &Context,
        _credential: &Credential,
        _status: &CloudflareDomainStatus,
    ) -> Result<(), ReconcileError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "domain_tests.rs"]
mod domain_tests;
