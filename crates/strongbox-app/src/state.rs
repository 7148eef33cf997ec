use std::sync::Arc;

use salvo::async_trait;

use strongbox_core::{config::{Settings, StoreBackend}, error::CoreError};
use strongbox_db::{
    db::{connection::create_pool, migrations::run_migrations},
    store::{CredentialStore, MemoryStore, PgStore, ShareStore},
};
use strongbox_service::{
    access::AccessGate,
    auth::{AuthSettings, SessionAuthenticator},
    share::ShareRegistry,
    vault::FileVault,
};

use crate::error::AppResult;

/// ## Summary
/// Components shared by every request, built once at startup.
pub struct AppState {
    pub authenticator: SessionAuthenticator,
    pub gate: AccessGate,
    pub vault: FileVault,
    pub shares: ShareRegistry,
}

impl AppState {
    /// ## Summary
    /// Wires the components over a store that holds both credentials and shares.
    #[must_use]
    pub fn with_store<S>(store: Arc<S>, vault: FileVault, settings: &Settings) -> Self
    where
        S: CredentialStore + ShareStore + 'static,
    {
        let credentials: Arc<dyn CredentialStore> = store.clone();
        let share_store: Arc<dyn ShareStore> = store;

        Self {
            authenticator: SessionAuthenticator::new(
                Arc::clone(&credentials),
                AuthSettings::from(&settings.auth),
            ),
            gate: AccessGate::from(&settings.access),
            shares: ShareRegistry::new(share_store, credentials, vault.clone()),
            vault,
        }
    }

    /// ## Summary
    /// Opens the vault root and the configured store backend.
    ///
    /// ## Side Effects
    /// Creates the vault root if missing. For PostgreSQL, runs pending migrations.
    ///
    /// ## Errors
    /// Returns an error if the vault cannot be opened, the database URL is
    /// missing, or migrations fail.
    pub async fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let vault = FileVault::open(&settings.vault.root).await?;
        tracing::info!(root = %vault.root().path().display(), "Vault opened");

        match settings.database.backend {
            StoreBackend::Postgres => {
                let url = settings.database.url.as_deref().ok_or_else(|| {
                    CoreError::InvalidConfiguration(
                        "database.url is required for the postgres backend".to_string(),
                    )
                })?;

                run_migrations(url).await?;
                let pool = create_pool(url, u32::from(settings.database.max_connections)).await?;
                tracing::info!("Database connection pool created.");

                Ok(Self::with_store(Arc::new(PgStore::new(pool)), vault, settings))
            }
            StoreBackend::Memory => {
                tracing::warn!("Using the in-memory store; users and sessions are lost on restart");
                Ok(Self::with_store(Arc::new(MemoryStore::new()), vault, settings))
            }
        }
    }
}

/// Hoop that injects the shared `AppState` into the depot.
pub struct StateHandler {
    pub state: Arc<AppState>,
}

#[async_trait]
impl salvo::Handler for StateHandler {
    #[tracing::instrument(skip_all)]
    async fn handle(
        &self,
        _req: &mut salvo::Request,
        depot: &mut salvo::Depot,
        _res: &mut salvo::Response,
        _ctrl: &mut salvo::FlowCtrl,
    ) {
        depot.inject(Arc::clone(&self.state));
    }
}

/// ## Summary
/// Retrieves the shared application state from the depot.
///
/// ## Errors
/// Returns an error if the state is not found in the depot.
pub fn get_state_from_depot(depot: &salvo::Depot) -> AppResult<Arc<AppState>> {
    depot
        .obtain::<Arc<AppState>>()
        .cloned()
        .map_err(|_err| CoreError::InvariantViolation("Application state not found in depot").into())
}
