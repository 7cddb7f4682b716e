use std::sync::Arc;

use crate::auth::{StaticTokenVerifier, TokenVerifier};
use crate::config::Config;
use crate::error::AppError;
use crate::geocode::{NoopGeocoder, ReverseGeocode};
use crate::notify::{LoggingNotifier, PushNotifier};
use crate::observability::metrics::Metrics;
use crate::presence::PresenceRegistry;
use crate::realtime::EventHub;
use crate::store::Store;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub presence: PresenceRegistry,
    pub hub: EventHub,
    pub notifier: Arc<dyn PushNotifier>,
    pub geocoder: Arc<dyn ReverseGeocode>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>) -> Result<Self, AppError> {
        let verifier = StaticTokenVerifier::from_env_value(&config.auth_tokens)?;
        let hub = EventHub::new(config.event_buffer_size);

        Ok(Self {
            config,
            store,
            presence: PresenceRegistry::default(),
            hub,
            notifier: Arc::new(LoggingNotifier),
            geocoder: Arc::new(NoopGeocoder),
            verifier: Arc::new(verifier),
            metrics: Metrics::new(),
        })
    }
}
