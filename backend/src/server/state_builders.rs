//! Builders wiring adapters into domain services.
//!
//! Storage is PostgreSQL when a database URL is configured, otherwise the
//! process-local store. Everything downstream of the repositories is the same
//! in both cases.

use std::io;
use std::sync::Arc;

use mockable::{Clock, DefaultClock};
use tracing::{info, warn};

use canary_backend::domain::ports::{
    CanaryRepository, LiveChannel, NotificationPreferencesRepository, OneTimePasswordValidator,
    SubscriptionRepository, TrustedCanaryRepository, WarrantRepository,
};
use canary_backend::domain::{
    CanaryService, DraftReaper, NotificationDispatcher, NotificationFanOut, RenewalMonitor,
    Scheduler, SubscriptionService, WarrantService, WarrantServicePorts,
};
use canary_backend::inbound::http::state::HttpState;
use canary_backend::outbound::delivery::{DeliverySettings, HttpNotificationTransport};
use canary_backend::outbound::live::{LoggingLiveChannel, RedisLiveChannel};
use canary_backend::outbound::memory::InMemoryCanaryStore;
use canary_backend::outbound::persistence::{
    DbPool, DieselCanaryRepository, DieselNotificationPreferencesRepository,
    DieselSubscriptionRepository, DieselTrustedCanaryRepository, DieselWarrantRepository,
    PoolConfig, run_migrations,
};
use canary_backend::outbound::queue::{NotificationReceiver, notification_channel};
use canary_backend::outbound::storage::{LocalDocumentStorage, StorageLimits};
use canary_backend::outbound::verification::{
    DohDomainVerifier, HttpOneTimePasswordValidator, UnconfiguredOneTimePasswordValidator,
};

use super::config::AppSettings;

/// Everything the server needs once adapters are wired.
pub struct Components {
    pub http_state: HttpState,
    pub dispatcher: Arc<dyn NotificationDispatcher>,
    pub receiver: NotificationReceiver,
    pub scheduler: Scheduler,
}

struct Repositories<W, C, S, T, P> {
    warrants: Arc<W>,
    canaries: Arc<C>,
    subscriptions: Arc<S>,
    trusted: Arc<T>,
    preferences: Arc<P>,
}

fn other(message: impl std::fmt::Display) -> io::Error {
    io::Error::other(message.to_string())
}

/// Build components for the configured storage backend.
pub async fn build_components(settings: &AppSettings) -> io::Result<Components> {
    match settings.database_url.as_deref() {
        Some(url) => {
            run_migrations(url).await.map_err(other)?;
            let pool = DbPool::new(PoolConfig::new(url)).await.map_err(other)?;
            info!(storage = "postgres", "storage configured");
            let repos = Repositories {
                warrants: Arc::new(DieselWarrantRepository::new(pool.clone())),
                canaries: Arc::new(DieselCanaryRepository::new(pool.clone())),
                subscriptions: Arc::new(DieselSubscriptionRepository::new(pool.clone())),
                trusted: Arc::new(DieselTrustedCanaryRepository::new(pool.clone())),
                preferences: Arc::new(DieselNotificationPreferencesRepository::new(pool)),
            };
            assemble(repos, settings).await
        }
        None => {
            warn!(
                storage = "memory",
                "no database URL configured; state is lost on restart"
            );
            let store = Arc::new(InMemoryCanaryStore::new());
            let repos = Repositories {
                warrants: store.clone(),
                canaries: store.clone(),
                subscriptions: store.clone(),
                trusted: store.clone(),
                preferences: store,
            };
            assemble(repos, settings).await
        }
    }
}

async fn live_channel(settings: &AppSettings) -> io::Result<Arc<dyn LiveChannel>> {
    match settings.redis_url.as_deref() {
        Some(url) => {
            let channel = RedisLiveChannel::connect(url).await.map_err(other)?;
            Ok(Arc::new(channel))
        }
        None => {
            info!("no redis URL configured; live updates are logged only");
            Ok(Arc::new(LoggingLiveChannel))
        }
    }
}

fn otp_validator(settings: &AppSettings) -> io::Result<Arc<dyn OneTimePasswordValidator>> {
    match settings.otp_url().map_err(other)? {
        Some(endpoint) => {
            let validator = HttpOneTimePasswordValidator::new(
                endpoint,
                settings.outbound_timeout().map_err(other)?,
            )
            .map_err(other)?;
            Ok(Arc::new(validator))
        }
        None => {
            warn!("no one-time password endpoint configured; second-factor checks will fail");
            Ok(Arc::new(UnconfiguredOneTimePasswordValidator))
        }
    }
}

async fn assemble<W, C, S, T, P>(
    repos: Repositories<W, C, S, T, P>,
    settings: &AppSettings,
) -> io::Result<Components>
where
    W: WarrantRepository + 'static,
    C: CanaryRepository + 'static,
    S: SubscriptionRepository + 'static,
    T: TrustedCanaryRepository + 'static,
    P: NotificationPreferencesRepository + 'static,
{
    let Repositories {
        warrants,
        canaries,
        subscriptions,
        trusted,
        preferences,
    } = repos;
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let timeout = settings.outbound_timeout().map_err(other)?;

    let (queue, receiver) = notification_channel(settings.fanout_queue_capacity().map_err(other)?);
    let queue = Arc::new(queue);
    let otp = otp_validator(settings)?;
    let storage = Arc::new(
        LocalDocumentStorage::open(
            &settings.documents_dir(),
            StorageLimits {
                max_bytes: settings.document_max_bytes().map_err(other)?,
                allowed_extensions: settings.document_extensions(),
            },
        )
        .map_err(other)?,
    );
    let logos = Arc::new(
        LocalDocumentStorage::open(
            &settings.logos_dir(),
            StorageLimits {
                max_bytes: settings.logo_max_bytes().map_err(other)?,
                allowed_extensions: settings.logo_extensions(),
            },
        )
        .map_err(other)?,
    );
    let verifier =
        Arc::new(DohDomainVerifier::new(settings.doh_url().map_err(other)?, timeout).map_err(other)?);
    let transport = Arc::new(
        HttpNotificationTransport::new(DeliverySettings {
            timeout,
            ntfy_url: settings.ntfy_url().map_err(other)?,
        })
        .map_err(other)?,
    );

    let warrant_service = Arc::new(WarrantService::new(
        WarrantServicePorts {
            warrants: warrants.clone(),
            canaries: canaries.clone(),
            otp: otp.clone(),
            storage,
            queue: queue.clone(),
        },
        clock.clone(),
        settings.documents_max_amount().map_err(other)?,
    ));
    let canary_service = Arc::new(CanaryService::new(
        canaries.clone(),
        trusted,
        verifier,
        otp,
        logos,
        clock.clone(),
    ));
    let subscription_service = Arc::new(SubscriptionService::new(subscriptions.clone(), canaries));

    let dispatcher: Arc<dyn NotificationDispatcher> = Arc::new(NotificationFanOut::new(
        subscriptions,
        preferences,
        live_channel(settings).await?,
        transport,
    ));

    let scheduler = Scheduler::new()
        .every(
            settings.monitor_interval().map_err(other)?,
            Arc::new(RenewalMonitor::new(warrants.clone(), queue, clock.clone())),
        )
        .every(
            settings.reaper_interval().map_err(other)?,
            Arc::new(DraftReaper::new(warrants, clock)),
        );

    Ok(Components {
        http_state: HttpState {
            warrants: warrant_service.clone(),
            warrant_query: warrant_service,
            canaries: canary_service.clone(),
            canary_query: canary_service,
            subscriptions: subscription_service,
        },
        dispatcher,
        receiver,
        scheduler,
    })
}
