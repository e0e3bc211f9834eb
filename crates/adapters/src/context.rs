use adportal_core::models::{Credential, IntegrationSettings};
use adportal_core::Platform;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Everything one adapter call needs, built fresh per invocation and never
/// shared or mutated across calls.
#[derive(Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
    pub platform: Platform,
    pub integration_id: Uuid,
    pub access_token: String,
    pub ad_account_id: String,
    pub settings: IntegrationSettings,
    pub timeout: Duration,
}

impl RequestContext {
    pub fn new(credential: &Credential, timeout: Duration) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            platform: credential.platform,
            integration_id: credential.integration_id,
            access_token: credential.access_token.clone(),
            ad_account_id: credential.ad_account_id.clone(),
            settings: credential.settings.clone(),
            timeout,
        }
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("platform", &self.platform)
            .field("ad_account_id", &self.ad_account_id)
            .field("access_token", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}
