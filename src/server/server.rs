use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::SessionConfig;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::Settings;
use std::sync::Arc;
use std::time::Duration;

/// Every long-lived component, built once at startup.
pub struct Server {
    pub session_issuer: Arc<dyn SessionIssuer>,
    pub session_verifier: Arc<dyn SessionVerifier>,
    pub session_revoker: Arc<dyn SessionRevoker>,
    pub session_config: SessionConfig,
    pub refresh_cookie_path: String,
}

impl Server {
    /// Build the server with the revocation backend named in settings.
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let store: Arc<dyn RevocationStore> = match settings.revocation.backend.as_str() {
            "memory" => {
                warn!("revocation records are kept in process memory and lost on restart");
                let memory_store = Arc::new(MemoryRevocationStore::new(clock.clone()));
                memory_store.spawn_purge(Duration::from_secs(
                    settings.revocation.purge_interval_secs,
                ));
                memory_store
            }
            "redis" => {
                let url = settings
                    .revocation
                    .url
                    .as_deref()
                    .ok_or_else(|| anyhow::anyhow!("redis revocation backend requires a url"))?;
                let redis_client = redis::Client::open(url)?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(RedisRevocationStore::new(
                    redis_manager,
                    settings.revocation.prefix.clone(),
                    Duration::from_millis(settings.revocation.timeout_ms),
                ))
            }
            other => return Err(anyhow::anyhow!("Unknown revocation backend: {}", other)),
        };

        let server = Self::with_parts(settings, store, clock)?;
        info!(
            backend = %settings.revocation.backend,
            transport = ?server.session_config.transport,
            "server started"
        );
        Ok(server)
    }

    /// Build the server around an already constructed store and clock.
    pub fn with_parts(
        settings: &Settings,
        store: Arc<dyn RevocationStore>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        settings.validate()?;
        let session_config = settings.session_config();

        let token_codec: Arc<dyn TokenCodec> =
            Arc::new(JwtHs256Codec::new(settings.jwt_config(), clock.clone()));

        let session_issuer: Arc<dyn SessionIssuer> = Arc::new(RealSessionIssuer::new(
            token_codec.clone(),
            store.clone(),
            &session_config,
        ));
        let session_verifier: Arc<dyn SessionVerifier> = Arc::new(RealSessionVerifier::new(
            token_codec.clone(),
            store.clone(),
            session_issuer.clone(),
            clock.clone(),
            &session_config,
        ));
        let session_revoker: Arc<dyn SessionRevoker> =
            Arc::new(RealSessionRevoker::new(token_codec, store, clock));

        Ok(Self {
            session_issuer,
            session_verifier,
            session_revoker,
            session_config,
            refresh_cookie_path: settings.auth.refresh_cookie_path.clone(),
        })
    }
}
