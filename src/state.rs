/*
 * Responsibility
 * - Shared context attached to the Router (AppState)
 *   - config, token resolver, path classifier, upstream client, artifact cache
 * - Clone is cheap (everything inside is Arc or Arc-backed)
 */
use std::sync::Arc;

use crate::config::Config;
use crate::services::{
    auth::TokenResolver,
    cache::{ArtifactCache, ArtifactLimits},
    identity::IdentityProvider,
    proxy::{PathClassifier, UpstreamClient, UpstreamError},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tokens: TokenResolver,
    pub classifier: Arc<PathClassifier>,
    pub upstream: UpstreamClient,
    pub artifacts: ArtifactCache,
}

impl AppState {
    pub fn new(config: Config, identity: Arc<dyn IdentityProvider>) -> Result<Self, UpstreamError> {
        let upstream = UpstreamClient::new(config.upstream_base_url.as_deref(), config.upstream_timeout)?;
        let tokens = TokenResolver::new(identity, config.debug_full_token);
        let classifier = Arc::new(PathClassifier::new(&config.protected_read_prefixes));
        let artifacts = ArtifactCache::new(ArtifactLimits {
            ttl: config.decision_record_ttl,
            capacity: config.decision_record_capacity,
            max_bytes: config.decision_record_max_bytes,
        });

        Ok(Self {
            config: Arc::new(config),
            tokens,
            classifier,
            upstream,
            artifacts,
        })
    }
}
