//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::sync::Arc;

use dispatch::domain::ports::RouteProvider;
use dispatch::domain::{PricingConfig, RetryPolicy};
use dispatch::outbound::persistence::DbPool;

/// Builder-style configuration for creating the server and its consumers.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) routes: Arc<dyn RouteProvider>,
    pub(crate) pricing: PricingConfig,
    pub(crate) retry_policy: RetryPolicy,
    pub(crate) db_pool: Option<DbPool>,
}

impl ServerConfig {
    #[must_use]
    pub fn new(bind_addr: SocketAddr, routes: Arc<dyn RouteProvider>) -> Self {
        Self {
            bind_addr,
            routes,
            pricing: PricingConfig::default(),
            retry_policy: RetryPolicy::default(),
            db_pool: None,
        }
    }

    /// Persist trips in PostgreSQL instead of process memory.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    #[must_use]
    pub fn with_pricing(mut self, pricing: PricingConfig) -> Self {
        self.pricing = pricing;
        self
    }

    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }
}
