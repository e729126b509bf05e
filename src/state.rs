use std::sync::Arc;
use tracing::warn;

use crate::config::Config;
use crate::db::Store;
use crate::services::auth_service::AuthService;
use crate::services::auth_service_impl::SeaOrmAuthService;
use crate::services::oidc::OidcClient;
use crate::services::token_service::TokenIssuer;

#[derive(Clone)]
pub struct SharedState {
    pub config: Config,

    pub store: Store,

    pub tokens: Arc<TokenIssuer>,

    pub auth_service: Arc<dyn AuthService>,

    /// `None` when federated login is not (fully) configured; the related
    /// endpoints answer 503 in that case.
    pub oidc: Option<Arc<OidcClient>>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        config.validate()?;

        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let tokens = Arc::new(TokenIssuer::new(config.security.jwt_secret.as_bytes()));

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            tokens.clone(),
            config.security.clone(),
        )) as Arc<dyn AuthService>;

        let oidc = if config.oidc.is_complete() {
            match OidcClient::discover(config.oidc.clone()).await {
                Ok(client) => Some(Arc::new(client)),
                Err(e) => {
                    warn!(error = %e, "OIDC discovery failed, federated login disabled");
                    None
                }
            }
        } else {
            if config.oidc != crate::config::OidcSettings::default() {
                warn!("Incomplete OIDC configuration, federated login disabled");
            }
            None
        };

        Ok(Self {
            config,
            store,
            tokens,
            auth_service,
            oidc,
        })
    }
}
