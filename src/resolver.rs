// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Hostname to zone resolution over `CloudflareDomain` bindings.
//!
//! Resolution runs against a [`ZoneSnapshot`], an immutable copy of every binding
//! taken from the reflector store at the start of a reconcile pass. The snapshot is
//! cheap to build and never blocks watchers.
//!
//! # Algorithm
//!
//! 1. Lowercase the hostname and strip one trailing dot.
//! 2. Candidates are bindings whose domain equals the hostname or is a dot-separated
//!    suffix of it.
//! 3. The longest domain wins. A tie is broken by the single default binding among
//!    the tied candidates, otherwise resolution fails with
//!    [`ResolveError::AmbiguousMatch`].
//! 4. Without candidates the unique default binding is used. Two or more defaults
//!    fail with [`ResolveError::AmbiguousDefault`]; none fails with
//!    [`ResolveError::NotFound`].
//! 5. A selected binding without a known zone ID yields [`ResolveError::ZonePending`].
//!
//! # Example
//!
//! ```rust
//! use cloudflare_operator::resolver::{ZoneBinding, ZoneSnapshot};
//!
//! let snapshot = ZoneSnapshot::new(vec![
//!     ZoneBinding::new("default", "example", "example.com", true, Some("z1")),
//!     ZoneBinding::new("default", "staging", "staging.example.com", false, Some("z2")),
//! ]);
//!
//! assert_eq!(snapshot.resolve("api.staging.example.com").unwrap().zone_id, "z2");
//! assert_eq!(snapshot.resolve("unrelated.org").unwrap().zone_id, "z1");
//! ```

use crate::crd::CloudflareDomain;
use crate::status_reasons::{
    REASON_AMBIGUOUS_DEFAULT_ZONE, REASON_AMBIGUOUS_ZONE_MATCH, REASON_ZONE_NOT_FOUND,
    REASON_ZONE_PENDING,
};
use kube::runtime::reflector::Store;
use kube::ResourceExt;
use thiserror::Error;

/// Lowercase a DNS name and strip one trailing dot.
#[must_use]
pub fn normalize_hostname(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    match lower.strip_suffix('.') {
        Some(stripped) => stripped.to_string(),
        None => lower,
    }
}

/// One `CloudflareDomain` as seen by the resolver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZoneBinding {
    pub namespace: String,
    pub name: String,
    /// Normalized domain suffix.
    pub domain: String,
    pub is_default: bool,
    /// `spec.zoneId` when set, otherwise `status.zoneId`.
    pub zone_id: Option<String>,
    /// Zone name reported by Cloudflare, if already known.
    pub zone_name: Option<String>,
}

impl ZoneBinding {
    #[must_use]
    pub fn new(
        namespace: &str,
        name: &str,
        domain: &str,
        is_default: bool,
        zone_id: Option<&str>,
    ) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
            domain: normalize_hostname(domain),
            is_default,
            zone_id: zone_id.map(str::to_string),
            zone_name: None,
        }
    }

    /// Build a binding from a `CloudflareDomain`, skipping objects being deleted.
    #[must_use]
    pub fn from_domain(domain: &CloudflareDomain) -> Option<Self> {
        if domain.metadata.deletion_timestamp.is_some() {
            return None;
        }
        let status = domain.status.as_ref();
        let zone_id = domain
            .spec
            .zone_id
            .clone()
            .filter(|id| !id.is_empty())
            .or_else(|| status.and_then(|s| s.zone_id.clone()));

        Some(Self {
            namespace: domain.namespace().unwrap_or_default(),
            name: domain.name_any(),
            domain: normalize_hostname(&domain.spec.domain),
            is_default: domain.spec.is_default,
            zone_id,
            zone_name: status.and_then(|s| s.zone_name.clone()),
        })
    }

    /// `namespace/name` of the binding.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    fn matches(&self, hostname: &str) -> bool {
        hostname == self.domain
            || hostname
                .strip_suffix(self.domain.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    }
}

/// A successfully resolved zone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedZone {
    pub zone_id: String,
    pub zone_name: String,
    /// `namespace/name` of the binding that matched.
    pub binding: String,
    /// Whether the zone was reached through the default fallback.
    pub via_default: bool,
}

/// Resolution failure. All variants are configuration errors that clear once the
/// bindings are fixed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no CloudflareDomain matches {hostname} and no default zone is configured")]
    NotFound { hostname: String },

    #[error("{hostname} falls back to the default zone but several CloudflareDomains claim it: {}", candidates.join(", "))]
    AmbiguousDefault {
        hostname: String,
        candidates: Vec<String>,
    },

    #[error("{hostname} matches several CloudflareDomains for the same domain: {}", candidates.join(", "))]
    AmbiguousMatch {
        hostname: String,
        candidates: Vec<String>,
    },

    #[error("CloudflareDomain {binding} matches {hostname} but its zone ID is not known yet")]
    ZonePending { hostname: String, binding: String },
}

impl ResolveError {
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => REASON_ZONE_NOT_FOUND,
            Self::AmbiguousDefault { .. } => REASON_AMBIGUOUS_DEFAULT_ZONE,
            Self::AmbiguousMatch { .. } => REASON_AMBIGUOUS_ZONE_MATCH,
            Self::ZonePending { .. } => REASON_ZONE_PENDING,
        }
    }
}

/// Point-in-time view of all zone bindings.
#[derive(Clone, Debug, Default)]
pub struct ZoneSnapshot {
    bindings: Vec<ZoneBinding>,
}

impl ZoneSnapshot {
    #[must_use]
    pub fn new(bindings: Vec<ZoneBinding>) -> Self {
        Self { bindings }
    }

    /// Snapshot the reflector store of `CloudflareDomain` objects.
    #[must_use]
    pub fn from_store(store: &Store<CloudflareDomain>) -> Self {
        Self::new(
            store
                .state()
                .iter()
                .filter_map(|d| ZoneBinding::from_domain(d))
                .collect(),
        )
    }

    #[must_use]
    pub fn bindings(&self) -> &[ZoneBinding] {
        &self.bindings
    }

    /// Bindings claiming to be the default zone.
    #[must_use]
    pub fn defaults(&self) -> Vec<&ZoneBinding> {
        self.bindings.iter().filter(|b| b.is_default).collect()
    }

    /// Resolve `hostname` to a zone.
    ///
    /// # Errors
    ///
    /// See [`ResolveError`].
    pub fn resolve(&self, hostname: &str) -> Result<ResolvedZone, ResolveError> {
        let hostname = normalize_hostname(hostname);

        let candidates: Vec<&ZoneBinding> =
            self.bindings.iter().filter(|b| b.matches(&hostname)).collect();

        let (binding, via_default) = match candidates.iter().map(|b| b.domain.len()).max() {
            Some(longest) => {
                let tied: Vec<&ZoneBinding> = candidates
                    .into_iter()
                    .filter(|b| b.domain.len() == longest)
                    .collect();
                (Self::break_tie(&hostname, &tied)?, false)
            }
            None => (self.unique_default(&hostname)?, true),
        };

        let zone_id = binding
            .zone_id
            .clone()
            .ok_or_else(|| ResolveError::ZonePending {
                hostname: hostname.clone(),
                binding: binding.key(),
            })?;

        Ok(ResolvedZone {
            zone_id,
            zone_name: binding
                .zone_name
                .clone()
                .unwrap_or_else(|| binding.domain.clone()),
            binding: binding.key(),
            via_default,
        })
    }

    fn break_tie<'a>(
        hostname: &str,
        tied: &[&'a ZoneBinding],
    ) -> Result<&'a ZoneBinding, ResolveError> {
        if let [only] = tied {
            return Ok(only);
        }
        let defaults: Vec<&&ZoneBinding> = tied.iter().filter(|b| b.is_default).collect();
        match defaults.as_slice() {
            [only] => Ok(only),
            _ => Err(ResolveError::AmbiguousMatch {
                hostname: hostname.to_string(),
                candidates: sorted_keys(tied.iter().copied()),
            }),
        }
    }

    fn unique_default(&self, hostname: &str) -> Result<&ZoneBinding, ResolveError> {
        let defaults = self.defaults();
        match defaults.as_slice() {
            [] => Err(ResolveError::NotFound {
                hostname: hostname.to_string(),
            }),
            [only] => Ok(only),
            many => Err(ResolveError::AmbiguousDefault {
                hostname: hostname.to_string(),
                candidates: sorted_keys(many.iter().copied()),
            }),
        }
    }
}

fn sorted_keys<'a>(bindings: impl Iterator<Item = &'a ZoneBinding>) -> Vec<String> {
    let mut keys: Vec<String> = bindings.map(ZoneBinding::key).collect();
    keys.sort();
    keys
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod resolver_tests;
