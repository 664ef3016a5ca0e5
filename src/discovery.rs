// ============================================================================
// Discovery Registry Client
// ============================================================================
//
// Client wrapper for the discovery registry. The registry tracks live node
// instances; nodes announce themselves once at startup (and re-announce on
// restart, identity is process-lifetime). The connect is blocking: it does
// not return until the channel is established or has failed.
//
// ============================================================================

use tonic::transport::{Channel, Endpoint};
use tonic::Request;
use tracing::debug;

use crate::error::CoreError;
use crate::proto::discovery::v1::discovery_client::DiscoveryClient;
use crate::proto::discovery::v1::Announcement;

/// A connected client for the discovery registry.
pub struct RegistryClient {
    client: DiscoveryClient<Channel>,
}

impl RegistryClient {
    /// Opens a connection to the registry. Returns only once the channel is
    /// established or has failed.
    pub async fn connect(endpoint: &str) -> Result<Self, CoreError> {
        debug!(endpoint = %endpoint, "connecting to discovery registry");

        let channel = Endpoint::from_shared(endpoint.to_string())
            .map_err(CoreError::ConnectFailure)?
            .connect()
            .await
            .map_err(CoreError::ConnectFailure)?;

        Ok(Self {
            client: DiscoveryClient::new(channel),
        })
    }

    /// Issues a single announce RPC. The request is expected to carry the
    /// node's own `id`/`token` metadata (see `Component::request`).
    pub async fn announce(&mut self, request: Request<Announcement>) -> Result<(), CoreError> {
        self.client
            .announce(request)
            .await
            .map_err(CoreError::RpcFailure)?;
        Ok(())
    }
}
