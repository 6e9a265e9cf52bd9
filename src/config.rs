// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator command line and environment configuration.
//!
//! Every flag can also be set through the environment variable shown in `--help`.

use crate::constants::{
    CLOUDFLARE_API_BASE, DEFAULT_API_TIMEOUT_SECS, DEFAULT_CONCURRENCY,
    DEFAULT_MAX_DELETION_ATTEMPTS, DEFAULT_METRICS_BIND_ADDRESS, DEFAULT_PENDING_REQUEUE_SECS,
    DEFAULT_PERMANENT_REQUEUE_SECS, DEFAULT_READY_REQUEUE_SECS,
};
use crate::context::ReconcileSettings;
use crate::credentials::Credential;
use anyhow::{bail, Result};
use clap::Parser;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Clone, Parser)]
#[command(name = "cloudflare-operator")]
#[command(about = "Kubernetes operator for Cloudflare DNS zones, R2 and Access", long_about = None)]
#[command(version)]
pub struct OperatorConfig {
    /// API token used for resources without a `credentialRef`
    #[arg(long, env = "CLOUDFLARE_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Account of the default API token
    #[arg(long, env = "CLOUDFLARE_ACCOUNT_ID")]
    pub account_id: Option<String>,

    /// Cloudflare API base URL
    #[arg(long, env = "CLOUDFLARE_API_URL", default_value = CLOUDFLARE_API_BASE)]
    pub api_url: String,

    /// Timeout of a single Cloudflare API request, in seconds
    #[arg(long, env = "CLOUDFLARE_API_TIMEOUT_SECS", default_value_t = DEFAULT_API_TIMEOUT_SECS)]
    pub api_timeout_secs: u64,

    /// Objects reconciled in parallel by each controller
    #[arg(
        long,
        env = "OPERATOR_CONCURRENCY",
        default_value_t = DEFAULT_CONCURRENCY,
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub concurrency: u16,

    /// Listen address of the `/metrics` and `/healthz` endpoints
    #[arg(long, env = "METRICS_BIND_ADDRESS", default_value = DEFAULT_METRICS_BIND_ADDRESS)]
    pub metrics_bind_address: SocketAddr,

    /// Resync interval of settled resources, in seconds
    #[arg(long, env = "READY_REQUEUE_SECS", default_value_t = DEFAULT_READY_REQUEUE_SECS)]
    pub ready_requeue_secs: u64,

    /// Retry interval of configuration errors and provisioning in progress, in seconds
    #[arg(long, env = "PENDING_REQUEUE_SECS", default_value_t = DEFAULT_PENDING_REQUEUE_SECS)]
    pub pending_requeue_secs: u64,

    /// Retry interval of permanent errors, in seconds
    #[arg(long, env = "PERMANENT_REQUEUE_SECS", default_value_t = DEFAULT_PERMANENT_REQUEUE_SECS)]
    pub permanent_requeue_secs: u64,

    /// Consecutive failed deletions before `DeletionFailed` is reported
    #[arg(
        long,
        env = "MAX_DELETION_ATTEMPTS",
        default_value_t = DEFAULT_MAX_DELETION_ATTEMPTS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_deletion_attempts: u32,
}

impl fmt::Debug for OperatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorConfig")
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("account_id", &self.account_id)
            .field("api_url", &self.api_url)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("concurrency", &self.concurrency)
            .field("metrics_bind_address", &self.metrics_bind_address)
            .field("ready_requeue_secs", &self.ready_requeue_secs)
            .field("pending_requeue_secs", &self.pending_requeue_secs)
            .field("permanent_requeue_secs", &self.permanent_requeue_secs)
            .field("max_deletion_attempts", &self.max_deletion_attempts)
            .finish()
    }
}

impl OperatorConfig {
    #[must_use]
    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    #[must_use]
    pub fn settings(&self) -> ReconcileSettings {
        ReconcileSettings {
            ready_requeue: Duration::from_secs(self.ready_requeue_secs),
            pending_requeue: Duration::from_secs(self.pending_requeue_secs),
            permanent_requeue: Duration::from_secs(self.permanent_requeue_secs),
            max_deletion_attempts: self.max_deletion_attempts,
        }
    }

    /// Credential for resources without a `credentialRef`.
    ///
    /// # Errors
    ///
    /// Returns an error when only one of the token and the account is set.
    pub fn default_credential(&self) -> Result<Option<Credential>> {
        let token = self.api_token.as_deref().filter(|t| !t.is_empty());
        let account = self.account_id.as_deref().filter(|a| !a.is_empty());
        match (token, account) {
            (Some(token), Some(account)) => Ok(Some(Credential::new(token, account))),
            (None, None) => Ok(None),
            (Some(_), None) => bail!("CLOUDFLARE_API_TOKEN is set but CLOUDFLARE_ACCOUNT_ID is not"),
            (None, Some(_)) => bail!("CLOUDFLARE_ACCOUNT_ID is set but CLOUDFLARE_API_TOKEN is not"),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
