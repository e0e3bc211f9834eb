use crate::google::GoogleAdapter;
use crate::meta::MetaAdapter;
use crate::tiktok::TiktokAdapter;
use crate::PlatformAdapter;
use adportal_core::config::PlatformsConfig;
use adportal_core::Platform;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// The adapters available to this node, one per platform.
#[derive(Clone)]
pub struct AdapterSet {
    adapters: HashMap<Platform, Arc<dyn PlatformAdapter>>,
    request_timeout: Duration,
}

impl AdapterSet {
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            adapters: HashMap::new(),
            request_timeout,
        }
    }

    /// Build the HTTP adapters for every supported platform.
    pub fn from_config(config: &PlatformsConfig) -> Result<Self, reqwest::Error> {
        let set = Self::new(Duration::from_millis(config.request_timeout_ms))
            .with(Arc::new(MetaAdapter::new(&config.meta)?))
            .with(Arc::new(GoogleAdapter::new(&config.google)?))
            .with(Arc::new(TiktokAdapter::new(&config.tiktok)?));
        info!(
            platforms = set.adapters.len(),
            timeout_ms = config.request_timeout_ms,
            "Platform adapters initialized"
        );
        Ok(set)
    }

    pub fn with(mut self, adapter: Arc<dyn PlatformAdapter>) -> Self {
        self.insert(adapter);
        self
    }

    pub fn insert(&mut self, adapter: Arc<dyn PlatformAdapter>) {
        self.adapters.insert(adapter.platform(), adapter);
    }

    pub fn get(&self, platform: Platform) -> Option<Arc<dyn PlatformAdapter>> {
        self.adapters.get(&platform).cloned()
    }

    pub fn platforms(&self) -> Vec<Platform> {
        let mut platforms: Vec<Platform> = self.adapters.keys().copied().collect();
        platforms.sort();
        platforms
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}
