// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes controllers for the Cloudflare custom resources.
//!
//! One [`Controller`] runs per kind. Each pass:
//!
//! 1. adds the kind's finalizer to live objects
//! 2. runs the shared engine with the kind's strategy
//! 3. removes the finalizer once deletion completed, or writes the status
//! 4. requeues after the interval picked by the engine
//!
//! Cloudflare failures never reach the controller's error policy; the engine
//! turns them into status. Only Kubernetes API failures (finalizer patches and
//! status writes) do, and they requeue after [`ERROR_REQUEUE_DURATION_SECS`].
//!
//! `CloudflareDomain` and `R2Bucket` objects are also mirrored into reflector
//! stores shared through the [`Context`], so dependents can resolve zones and
//! buckets without API calls.

use crate::cloudflare::CloudflareApi;
use crate::constants::ERROR_REQUEUE_DURATION_SECS;
use crate::context::{Context, ReconcileSettings, Stores};
use crate::credentials::CredentialResolver;
use crate::crd::{
    CloudflareDomain, DomainRegistration, IdentityProvider, R2Bucket, R2BucketDomain,
    R2BucketNotification,
};
use crate::reconcilers::engine::{self, KindReconciler, ManagedResource};
use crate::reconcilers::finalizers::{ensure_finalizer, remove_finalizer};
use crate::reconcilers::status::write_status;
use crate::reconcilers::{
    DomainReconciler, DomainRegistrationReconciler, IdentityProviderReconciler,
    R2BucketDomainReconciler, R2BucketNotificationReconciler, R2BucketReconciler,
};
use anyhow::{anyhow, Result};
use futures::StreamExt;
use kube::runtime::controller::{self, Action};
use kube::runtime::reflector::{self, store::Writer, ObjectRef, Store};
use kube::runtime::{watcher, Controller, WatchStreamExt};
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Kubernetes API failure surfaced to the controller's error policy.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ControllerError(#[from] anyhow::Error);

/// Shared state of one controller.
struct ControllerContext<R> {
    client: Client,
    context: Context,
    reconciler: R,
}

/// Resources that point at an `R2Bucket` by name.
pub trait BucketDependent: Resource<DynamicType = ()> + Clone + 'static {
    fn bucket_ref(&self) -> &str;
}

impl BucketDependent for R2BucketDomain {
    fn bucket_ref(&self) -> &str {
        &self.spec.bucket_ref
    }
}

impl BucketDependent for R2BucketNotification {
    fn bucket_ref(&self) -> &str {
        &self.spec.bucket_ref
    }
}

/// Objects in `store` that reference `bucket` from the same namespace.
#[must_use]
pub fn bucket_dependents<K: BucketDependent>(store: &Store<K>, bucket: &R2Bucket) -> Vec<ObjectRef<K>> {
    let namespace = bucket.namespace();
    let name = bucket.name_any();
    store
        .state()
        .iter()
        .filter(|dependent| dependent.namespace() == namespace && dependent.bucket_ref() == name)
        .map(|dependent| ObjectRef::from_obj(dependent.as_ref()))
        .collect()
}

/// All controllers of the operator.
pub struct Operator {
    client: Client,
    context: Context,
    domain_writer: Writer<CloudflareDomain>,
    bucket_writer: Writer<R2Bucket>,
    concurrency: u16,
}

impl Operator {
    #[must_use]
    pub fn new(
        client: Client,
        cloudflare: Arc<dyn CloudflareApi>,
        credentials: Arc<dyn CredentialResolver>,
        settings: ReconcileSettings,
        concurrency: u16,
    ) -> Self {
        let (domains, domain_writer) = reflector::store();
        let (buckets, bucket_writer) = reflector::store();
        let context = Context {
            cloudflare,
            credentials,
            stores: Stores { domains, buckets },
            settings,
        };
        Self {
            client,
            context,
            domain_writer,
            bucket_writer,
            concurrency,
        }
    }

    /// Run every reflector and controller until one of them stops.
    ///
    /// # Errors
    ///
    /// Returns an error when any of them exits, which should never happen.
    pub async fn run(self) -> Result<()> {
        let Self {
            client,
            context,
            domain_writer,
            bucket_writer,
            concurrency,
        } = self;

        let domain_api = Api::<CloudflareDomain>::all(client.clone());
        let bucket_api = Api::<R2Bucket>::all(client.clone());
        let config = watcher::Config::default();

        let bucket_domains = Controller::new(Api::<R2BucketDomain>::all(client.clone()), config.clone());
        let bucket_domain_store = bucket_domains.store();
        let zone_store = bucket_domain_store.clone();
        let bucket_domains = bucket_domains
            .watches(bucket_api.clone(), config.clone(), move |bucket| {
                bucket_dependents(&bucket_domain_store, &bucket)
            })
            .watches(domain_api.clone(), config.clone(), move |_domain| {
                // Any zone binding change can move the zone of any custom domain
                zone_store
                    .state()
                    .iter()
                    .map(|d| ObjectRef::from_obj(d.as_ref()))
                    .collect::<Vec<_>>()
            });

        let notifications =
            Controller::new(Api::<R2BucketNotification>::all(client.clone()), config.clone());
        let notification_store = notifications.store();
        let notifications = notifications.watches(bucket_api.clone(), config.clone(), move |bucket| {
            bucket_dependents(&notification_store, &bucket)
        });

        let kinds = Kinds {
            client: client.clone(),
            context: context.clone(),
            concurrency,
        };

        tokio::select! {
            result = run_reflector(domain_api.clone(), domain_writer) => exited("CloudflareDomain reflector", result),
            result = run_reflector(bucket_api.clone(), bucket_writer) => exited("R2Bucket reflector", result),
            result = kinds.run(Controller::new(domain_api, config.clone()), DomainReconciler) => {
                exited("CloudflareDomain controller", result)
            }
            result = kinds.run(Controller::new(bucket_api, config.clone()), R2BucketReconciler) => {
                exited("R2Bucket controller", result)
            }
            result = kinds.run(bucket_domains, R2BucketDomainReconciler) => {
                exited("R2BucketDomain controller", result)
            }
            result = kinds.run(notifications, R2BucketNotificationReconciler) => {
                exited("R2BucketNotification controller", result)
            }
            result = kinds.run(
                Controller::new(Api::<DomainRegistration>::all(client.clone()), config.clone()),
                DomainRegistrationReconciler,
            ) => exited("DomainRegistration controller", result),
            result = kinds.run(
                Controller::new(Api::<IdentityProvider>::all(client.clone()), config),
                IdentityProviderReconciler,
            ) => exited("IdentityProvider controller", result),
        }
    }
}

fn exited(what: &str, result: Result<()>) -> Result<()> {
    error!("CRITICAL: {what} exited unexpectedly: {result:?}");
    result?;
    Err(anyhow!("{what} exited unexpectedly without error"))
}

/// Mirror every object of a kind into a reflector store.
async fn run_reflector<K>(api: Api<K>, writer: Writer<K>) -> Result<()>
where
    K: Resource<DynamicType = ()> + Clone + Debug + DeserializeOwned + Send + Sync + 'static,
{
    info!(kind = %K::kind(&()), "Starting reflector");
    reflector::reflector(writer, watcher::watcher(api, watcher::Config::default()))
        .default_backoff()
        .applied_objects()
        .for_each(|result| {
            if let Err(err) = result {
                warn!(kind = %K::kind(&()), error = %err, "Reflector watch failed");
            }
            futures::future::ready(())
        })
        .await;
    Ok(())
}

/// Settings shared by every per-kind controller.
struct Kinds {
    client: Client,
    context: Context,
    concurrency: u16,
}

impl Kinds {
    async fn run<R>(&self, controller: Controller<R::Resource>, reconciler: R) -> Result<()>
    where
        R: KindReconciler + 'static,
    {
        let kind = R::Resource::kind(&()).to_string();

        // Dependents read zones and buckets from the shared stores
        wait_for_stores(&self.context.stores).await?;
        info!(%kind, concurrency = self.concurrency, "Starting controller");

        let ctx = Arc::new(ControllerContext {
            client: self.client.clone(),
            context: self.context.clone(),
            reconciler,
        });

        controller
            .with_config(controller::Config::default().concurrency(self.concurrency))
            .run(reconcile_object::<R>, error_policy::<R>, ctx)
            .for_each(|result| {
                match result {
                    Ok((object, action)) => debug!(%kind, object = %object, ?action, "Reconciled"),
                    Err(err) => warn!(%kind, error = %err, "Reconcile failed"),
                }
                futures::future::ready(())
            })
            .await;

        Ok(())
    }
}

async fn wait_for_stores(stores: &Stores) -> Result<()> {
    stores
        .domains
        .wait_until_ready()
        .await
        .map_err(|_| anyhow!("CloudflareDomain reflector stopped before its first sync"))?;
    stores
        .buckets
        .wait_until_ready()
        .await
        .map_err(|_| anyhow!("R2Bucket reflector stopped before its first sync"))?;
    Ok(())
}

/// One controller pass: finalizer, engine, then finalizer removal or status write.
async fn reconcile_object<R>(
    resource: Arc<R::Resource>,
    ctx: Arc<ControllerContext<R>>,
) -> Result<Action, ControllerError>
where
    R: KindReconciler + 'static,
{
    let resource = resource.as_ref();
    let finalizer = <R::Resource as ManagedResource>::FINALIZER;

    if resource.meta().deletion_timestamp.is_none() {
        ensure_finalizer(&ctx.client, resource, finalizer).await?;
    }

    let outcome = engine::reconcile(&ctx.reconciler, resource, &ctx.context).await;

    if outcome.finalize {
        remove_finalizer(&ctx.client, resource, finalizer).await?;
        return Ok(Action::await_change());
    }
    if let Some(status) = &outcome.status {
        write_status(&ctx.client, resource, status).await?;
    }

    Ok(outcome
        .requeue
        .map_or_else(Action::await_change, Action::requeue))
}

fn error_policy<R>(
    resource: Arc<R::Resource>,
    err: &ControllerError,
    _ctx: Arc<ControllerContext<R>>,
) -> Action
where
    R: KindReconciler + 'static,
{
    error!(
        kind = %R::Resource::kind(&()),
        namespace = ?resource.namespace(),
        name = %resource.name_any(),
        error = %err,
        "Kubernetes API call failed"
    );
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod controller_tests;
