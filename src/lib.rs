//! Shared identity, trust and discovery plumbing for lattice nodes.
//!
//! Every node of the lattice network (gateways, routers, brokers, handlers)
//! embeds a [`Component`]: it announces the node to the discovery registry,
//! validates bearer tokens against the rotating auth-server key, attaches
//! the node's identity to outgoing RPCs and traces the caller identity of
//! inbound RPCs.
//!
//! The crate owns no sockets of its own besides the outbound discovery and
//! key-endpoint calls; hosting services plug [`Component::server_options`]
//! into their tonic server and call [`Component::request`] when talking to
//! peers.

// Include the Protobuf generated code.
// This creates the `proto::discovery::v1` module structure.
pub mod proto {
    pub mod discovery {
        pub mod v1 {
            tonic::include_proto!("lattice.discovery.v1");
        }
    }
}

pub mod component;
pub mod config;
pub mod diagnostics;
pub mod discovery;
pub mod error;
pub mod interceptor;
pub mod telemetry;
pub mod token;
pub mod tokenkey;

pub use component::Component;
pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use proto::discovery::v1::Announcement;
