// ============================================================================
// Identity & Trust Manager
// ============================================================================
//
// The Component is embedded by every lattice node. It owns the node's
// identity record, the discovery announcement path, bearer-token validation
// against the rotating auth-server key, and the metadata plumbing that
// threads identity through every RPC in both directions.
//
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tonic::metadata::{MetadataMap, MetadataValue};
use tonic::Request;
use tracing::{info, warn};

use crate::config::Config;
use crate::diagnostics::{self, StatsHandle};
use crate::discovery::RegistryClient;
use crate::error::CoreError;
use crate::interceptor::{trace_chain, TraceLayer};
use crate::proto::discovery::v1::Announcement;
use crate::token::{self, Claims};
use crate::tokenkey::{HttpKeyProvider, KeyProvider};

/// Shared identity & trust state for one node instance.
///
/// Construct once at startup and share via `Arc`. The identity is
/// process-lifetime; it is re-announced on every start.
pub struct Component {
    identity: Announcement,
    discovery_server: String,
    provider: Option<Arc<dyn KeyProvider>>,
    diagnostics: StatsHandle,
}

impl Component {
    /// Creates a new Component from explicit configuration.
    ///
    /// Starts the background diagnostics loop; must be called within a tokio
    /// runtime. `service_name` is the node's service kind ("gateway",
    /// "router", ...), `announced_address` the address peers should dial.
    pub fn new(config: &Config, service_name: &str, announced_address: &str) -> Self {
        let provider: Option<Arc<dyn KeyProvider>> = if config.auth_server.is_empty() {
            None
        } else {
            Some(Arc::new(HttpKeyProvider::new(
                &config.auth_server,
                config.key_cache_path.clone(),
            )))
        };

        Self {
            identity: Announcement {
                id: config.component_id.clone(),
                token: config.component_token.clone(),
                description: config.description.clone(),
                service_name: service_name.to_string(),
                net_address: announced_address.to_string(),
            },
            discovery_server: config.discovery_server.clone(),
            provider,
            diagnostics: diagnostics::spawn(Duration::from_secs(
                config.diagnostics_interval_secs.max(1),
            )),
        }
    }

    /// Replaces the token key provider. Intended for tests and embedders
    /// with a non-HTTP key source.
    pub fn with_provider(mut self, provider: Arc<dyn KeyProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// The node's own identity record.
    pub fn identity(&self) -> &Announcement {
        &self.identity
    }

    /// Announces this node to the discovery registry.
    ///
    /// Blocks for the connect + RPC round trip. Not retried internally; the
    /// caller owns retry/backoff policy. A failed announce leaves the node
    /// running but undiscoverable.
    pub async fn announce(&self) -> Result<(), CoreError> {
        if self.discovery_server.is_empty() {
            return Err(CoreError::ConfigMissing("discovery server"));
        }
        if self.identity.id.is_empty() {
            return Err(CoreError::ConfigMissing("component id"));
        }

        // Connection is scoped to this call; the channel closes on drop
        // whether or not the RPC succeeded.
        let mut client = RegistryClient::connect(&self.discovery_server).await?;
        client.announce(self.request(self.identity.clone())).await?;

        info!(
            id = %self.identity.id,
            service = %self.identity.service_name,
            "announced to discovery registry"
        );
        Ok(())
    }

    /// Forces a refresh of the token verification key.
    ///
    /// Key rotation is best-effort maintenance: a fetch failure is logged
    /// and swallowed, and the previous key stays in use until a hard
    /// validation failure occurs.
    pub async fn update_token_key(&self) -> Result<(), CoreError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or(CoreError::ConfigMissing("token key provider"))?;

        match provider.get(true).await {
            Ok(key) => {
                info!(algorithm = %key.algorithm, "refreshed token verification key");
            }
            Err(e) => {
                warn!(error = %e, "failed to refresh token verification key, keeping previous key");
            }
        }
        Ok(())
    }

    /// Verifies a caller-presented bearer token and returns its claims.
    ///
    /// Validation failures are always returned; rejecting the calling RPC is
    /// the business layer's responsibility.
    pub async fn validate_token(&self, token: &str) -> Result<Claims, CoreError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or(CoreError::ConfigMissing("token key provider"))?;
        token::validate(provider.as_ref(), token).await
    }

    /// Server middleware tracing caller identity on every inbound call.
    ///
    /// Apply via `tonic::transport::Server::builder().layer(..)`.
    pub fn server_options(&self) -> TraceLayer {
        TraceLayer::new(trace_chain())
    }

    /// Metadata for outgoing calls: this node's `id` and `token`.
    ///
    /// Always succeeds and never blocks; unset identity fields degrade to
    /// empty strings rather than omitted keys.
    pub fn call_metadata(&self) -> MetadataMap {
        let mut metadata = MetadataMap::new();
        metadata.insert("id", ascii_or_empty(&self.identity.id));
        metadata.insert("token", ascii_or_empty(&self.identity.token));
        metadata
    }

    /// Wraps a message in a request carrying [`Component::call_metadata`].
    pub fn request<T>(&self, message: T) -> Request<T> {
        Request::from_parts(
            self.call_metadata(),
            tonic::Extensions::default(),
            message,
        )
    }

    /// Stops the background diagnostics loop.
    pub fn shutdown(&self) {
        self.diagnostics.stop();
    }
}

fn ascii_or_empty(value: &str) -> MetadataValue<tonic::metadata::Ascii> {
    MetadataValue::try_from(value).unwrap_or_else(|_| MetadataValue::from_static(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Config {
        Config {
            component_id: "node-1".to_string(),
            component_token: "abc".to_string(),
            description: "test node".to_string(),
            discovery_server: "http://127.0.0.1:1".to_string(),
            auth_server: String::new(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn request_carries_identity_metadata() {
        let component = Component::new(&configured(), "router", "localhost:1904");
        let request = component.request(());

        assert_eq!(request.metadata().get("id").unwrap(), "node-1");
        assert_eq!(request.metadata().get("token").unwrap(), "abc");
        component.shutdown();
    }

    #[tokio::test]
    async fn request_degrades_to_empty_metadata() {
        let component = Component::new(&Config::default(), "router", "");
        let request = component.request(());

        // Keys are present even for a zero-value identity.
        assert_eq!(request.metadata().get("id").unwrap(), "");
        assert_eq!(request.metadata().get("token").unwrap(), "");
        component.shutdown();
    }

    #[tokio::test]
    async fn announce_requires_discovery_server() {
        let mut config = configured();
        config.discovery_server = String::new();
        let component = Component::new(&config, "router", "localhost:1904");

        let err = component.announce().await.unwrap_err();
        assert!(matches!(err, CoreError::ConfigMissing("discovery server")));
        component.shutdown();
    }

    #[tokio::test]
    async fn announce_requires_component_id() {
        let mut config = configured();
        config.component_id = String::new();
        let component = Component::new(&config, "router", "localhost:1904");

        let err = component.announce().await.unwrap_err();
        assert!(matches!(err, CoreError::ConfigMissing("component id")));
        component.shutdown();
    }

    #[tokio::test]
    async fn validate_token_requires_provider() {
        let component = Component::new(&configured(), "router", "localhost:1904");

        let err = component.validate_token("whatever").await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::ConfigMissing("token key provider")
        ));
        component.shutdown();
    }

    #[tokio::test]
    async fn update_token_key_requires_provider() {
        let component = Component::new(&configured(), "router", "localhost:1904");

        let err = component.update_token_key().await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::ConfigMissing("token key provider")
        ));
        component.shutdown();
    }
}
