// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `DomainRegistration` reconciliation logic.
//!
//! Manages registrar settings of a domain already registered with Cloudflare
//! Registrar. The operator never registers, transfers, renews or cancels a domain,
//! so deletion always leaves the registration untouched.
//!
//! Only fields set in the spec are managed, and only those differing from the
//! registrar are sent.
//!
//! # States
//!
//! - domain not at the registrar: permanent error (`DomainNotRegistered`)
//! - registration expired: `Expired`
//! - inbound transfer still in progress: `TransferPending`
//! - settings sent but not reported back yet: `Syncing`
//! - otherwise: `Active`

use crate::cloudflare::types::{Contact, RegistrarDomain, RegistrarUpdate};
use crate::constants::FINALIZER_DOMAIN_REGISTRATION;
use crate::context::Context;
use crate::credentials::Credential;
use crate::crd::{
    CredentialRef, DeletionPolicy, DomainRegistration, DomainRegistrationSpec,
    DomainRegistrationStatus, RegistrantContact, RegistrationState,
};
use crate::errors::ReconcileError;
use crate::resolver::normalize_hostname;
use crate::status_reasons::{
    REASON_DOMAIN_EXPIRED, REASON_DOMAIN_NOT_REGISTERED, REASON_SYNCING, REASON_TRANSFER_PENDING,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::engine::{KindReconciler, ManagedResource, SyncProgress};

impl ManagedResource for DomainRegistration {
    const FINALIZER: &'static str = FINALIZER_DOMAIN_REGISTRATION;

    /// Registrations are never cancelled by the operator.
    fn deletion_policy(&self) -> DeletionPolicy {
        DeletionPolicy::Orphan
    }

    fn credential_ref(&self) -> Option<&CredentialRef> {
        self.spec.credential_ref.as_ref()
    }
}

/// Whether the registration has lapsed at `now`.
#[must_use]
pub fn is_expired(remote: &RegistrarDomain, now: DateTime<Utc>) -> bool {
    if remote
        .status
        .as_deref()
        .is_some_and(|s| s.eq_ignore_ascii_case("expired"))
    {
        return true;
    }
    remote
        .expires_at
        .as_deref()
        .and_then(|at| DateTime::parse_from_rfc3339(at).ok())
        .is_some_and(|at| at.with_timezone(&Utc) < now)
}

fn normalized_name_servers(servers: &[String]) -> Vec<String> {
    let mut servers: Vec<String> = servers.iter().map(|s| normalize_hostname(s)).collect();
    servers.sort();
    servers.dedup();
    servers
}

/// Remote contact with every field set in `desired` applied on top.
fn merge_contact(desired: &RegistrantContact, remote: Option<&Contact>) -> Contact {
    let mut merged = remote.cloned().unwrap_or_default();
    let fields = [
        (&desired.first_name, &mut merged.first_name),
        (&desired.last_name, &mut merged.last_name),
        (&desired.organization, &mut merged.organization),
        (&desired.email, &mut merged.email),
        (&desired.phone, &mut merged.phone),
        (&desired.address, &mut merged.address),
        (&desired.address2, &mut merged.address2),
        (&desired.city, &mut merged.city),
        (&desired.state, &mut merged.state),
        (&desired.zip, &mut merged.zip),
        (&desired.country, &mut merged.country),
    ];
    for (want, have) in fields {
        if want.is_some() {
            have.clone_from(want);
        }
    }
    merged
}

/// Settings in `spec` that differ from `remote`.
#[must_use]
pub fn registrar_update(spec: &DomainRegistrationSpec, remote: &RegistrarDomain) -> RegistrarUpdate {
    let differs = |want: Option<bool>, have: Option<bool>| want.filter(|w| Some(*w) != have);

    let name_servers = spec.name_servers.as_ref().and_then(|want| {
        let want = normalized_name_servers(want);
        (want != normalized_name_servers(&remote.name_servers)).then_some(want)
    });

    let registrant_contact = spec.registrant_contact.as_ref().and_then(|want| {
        let merged = merge_contact(want, remote.registrant_contact.as_ref());
        (Some(&merged) != remote.registrant_contact.as_ref()).then_some(merged)
    });

    RegistrarUpdate {
        auto_renew: differs(spec.auto_renew, remote.auto_renew),
        privacy: differs(spec.privacy, remote.privacy),
        locked: differs(spec.locked, remote.locked),
        name_servers,
        registrant_contact,
    }
}

fn record(status: &mut DomainRegistrationStatus, remote: &RegistrarDomain) {
    status.registrar_status.clone_from(&remote.status);
    status.expires_at.clone_from(&remote.expires_at);
    status.auto_renew = remote.auto_renew;
    status.privacy = remote.privacy;
    status.locked = remote.locked;
    status.name_servers.clone_from(&remote.name_servers);
}

/// Reconciles `DomainRegistration` resources.
pub struct DomainRegistrationReconciler;

#[async_trait]
impl KindReconciler for DomainRegistrationReconciler {
    type Resource = DomainRegistration;

    async fn sync(
        &self,
        registration: &DomainRegistration,
        ctx: &Context,
        credential: &Credential,
        status: &mut DomainRegistrationStatus,
    ) -> Result<SyncProgress, ReconcileError> {
        let domain = normalize_hostname(&registration.spec.domain_name);

        let Some(remote) = ctx
            .cloudflare
            .get_registrar_domain(credential, &domain)
            .await?
        else {
            return Err(ReconcileError::rejected(
                REASON_DOMAIN_NOT_REGISTERED,
                format!(
                    "{domain} is not registered with Cloudflare Registrar in account {}",
                    credential.account_id()
                ),
            ));
        };
        record(status, &remote);

        if is_expired(&remote, Utc::now()) {
            status.state = RegistrationState::Expired;
            return Ok(SyncProgress::Blocked {
                reason: REASON_DOMAIN_EXPIRED,
                message: format!(
                    "{domain} expired at {}",
                    remote.expires_at.as_deref().unwrap_or("an unknown date")
                ),
            });
        }

        if remote.transfer_in.as_ref().is_some_and(|t| t.is_pending()) {
            status.state = RegistrationState::TransferPending;
            return Ok(SyncProgress::Progressing {
                reason: REASON_TRANSFER_PENDING,
                message: format!("Inbound transfer of {domain} is in progress"),
            });
        }

        let update = registrar_update(&registration.spec, &remote);
        if update.is_empty() {
            debug!(%domain, "Registrar settings up to date");
            status.state = RegistrationState::Active;
            return Ok(SyncProgress::Ready(format!(
                "Registrar settings of {domain} are up to date"
            )));
        }

        info!(%domain, "Updating registrar settings");
        ctx.cloudflare
            .update_registrar_domain(credential, &domain, &update)
            .await?;

        let readback = ctx
            .cloudflare
            .get_registrar_domain(credential, &domain)
            .await?
            .unwrap_or(remote);
        record(status, &readback);

        if registrar_update(&registration.spec, &readback).is_empty() {
            status.state = RegistrationState::Active;
            Ok(SyncProgress::Ready(format!(
                "Registrar settings of {domain} updated"
            )))
        } else {
            status.state = RegistrationState::Syncing;
            Ok(SyncProgress::Progressing {
                reason: REASON_SYNCING,
                message: format!("Waiting for the registrar to apply settings of {domain}"),
            })
        }
    }

    async fn cleanup(
        &self,
        _registration: &DomainRegistration,
        _ctx: &Context,
        _credential: &Credential,
        _status: &DomainRegistrationStatus,
    ) -> Result<(), ReconcileError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "domainregistration_tests.rs"]
mod domainregistration_tests;
