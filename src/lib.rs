// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # Cloudflare Operator for Kubernetes
//!
//! A Kubernetes operator written in Rust that manages Cloudflare DNS zones, R2 storage
//! and Access identity providers through Custom Resource Definitions (CRDs).
//!
//! ## Overview
//!
//! This library provides the core functionality of the operator, including:
//!
//! - Custom Resource Definitions (CRDs) for zones, buckets, registrations and identity providers
//! - A shared reconcile engine with per-kind strategies
//! - Zone resolution across `CloudflareDomain` bindings
//! - A Cloudflare v4 API client
//!
//! ## Modules
//!
//! - [`crd`] - Custom Resource Definition types
//! - [`reconcilers`] - Reconcile engine and per-kind strategies
//! - [`controller`] - Kubernetes controllers driving the reconcilers
//! - [`resolver`] - Hostname to zone resolution
//! - [`cloudflare`] - Cloudflare API client
//! - [`credentials`] - API token resolution from Secrets
//! - [`context`] - Shared context and reflector stores
//! - [`config`] - Command line and environment configuration
//! - [`metrics`] - Prometheus metrics and their HTTP endpoint
//!
//! ## Example
//!
//! ```rust,no_run
//! use cloudflare_operator::crd::{DeletionPolicy, R2BucketSpec};
//!
//! let spec = R2BucketSpec {
//!     name: Some("assets".to_string()),
//!     location_hint: None,
//!     storage_class: None,
//!     cors_rules: vec![],
//!     lifecycle_rules: vec![],
//!     deletion_policy: DeletionPolicy::Orphan,
//!     credential_ref: None,
//! };
//! ```

pub mod cloudflare;
pub mod config;
pub mod constants;
pub mod context;
pub mod controller;
pub mod crd;
pub mod credentials;
pub mod errors;
pub mod http_errors;
pub mod metrics;
pub mod reconcilers;
pub mod resolver;
pub mod status_reasons;
