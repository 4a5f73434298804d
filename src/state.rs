//! Shared application state: the composition root constructs one of these
//! and hands clones to every route and middleware.

use crate::auth::token::TokenCodec;
use crate::config::ServerConfig;
use crate::db::pool::PoolManager;
use crate::registry::AgencyRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pools: Arc<PoolManager>,
    pub registry: AgencyRegistry,
    pub codec: Arc<TokenCodec>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Result<Self, crate::error::ConfigError> {
        let pools = Arc::new(PoolManager::new(&config.database_url, config.pool.clone())?);
        let registry = AgencyRegistry::new(pools.main_pool());
        let codec = Arc::new(TokenCodec::new(
            &config.jwt_secret,
            chrono::Duration::hours(config.token_ttl_hours),
        )?);
        Ok(AppState {
            pools,
            registry,
            codec,
            config: Arc::new(config),
        })
    }
}
