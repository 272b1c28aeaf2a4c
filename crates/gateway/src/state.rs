//! Shared application state for the gateway

use std::sync::Arc;

use sqlx::SqlitePool;

use cycle_chamas::ChamaService;
use cycle_config::InviteConfig;
use cycle_database::DatabaseConfig;
use cycle_ledger::{InMemoryLedger, Ledger, LogNotifier, Notifier};

use crate::error::{GatewayError, GatewayResult};

/// Shared application state: the pool for direct lookups (auth) plus the
/// chama service for everything else.
#[derive(Clone)]
pub struct GatewayState {
    pub pool: SqlitePool,
    pub chama_service: ChamaService,
}

impl GatewayState {
    pub fn new(
        pool: SqlitePool,
        ledger: Arc<dyn Ledger>,
        notifier: Arc<dyn Notifier>,
        invites: &InviteConfig,
    ) -> Self {
        let chama_service = ChamaService::new(pool.clone(), ledger, notifier, invites);
        Self {
            pool,
            chama_service,
        }
    }

    /// State over a freshly initialized database, wired to the in-memory
    /// reference ledger.
    pub async fn from_config(
        config: &DatabaseConfig,
        invites: &InviteConfig,
    ) -> GatewayResult<Self> {
        let pool = cycle_database::initialize_database(config)
            .await
            .map_err(|e| {
                GatewayError::InternalError(format!("Failed to initialize database: {}", e))
            })?;

        Ok(Self::new(
            pool,
            Arc::new(InMemoryLedger::new()),
            Arc::new(LogNotifier),
            invites,
        ))
    }

    pub fn chama_service(&self) -> &ChamaService {
        &self.chama_service
    }
}
