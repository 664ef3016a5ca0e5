// ============================================================================
// Inbound Call Interceptors
// ============================================================================
//
// Every inbound RPC passes through the trace middleware before reaching
// business logic. The middleware builds a per-call trace record (caller id
// from the `id` metadata key, peer address from transport info, method from
// the request path), runs the ordered interceptor chain over it, and then
// delegates unconditionally. Missing identity never rejects a call;
// authorization belongs to the business layer.
//
// tonic routes unary and streaming calls through the same HTTP service, so
// one layer covers both call kinds.
//
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::task::{Context, Poll};

use tonic::transport::server::TcpConnectInfo;
use tower::{Layer, Service};
use tracing::debug;

/// Ephemeral record of an inbound call, built per request and discarded
/// after the chain runs.
#[derive(Debug, Clone)]
pub struct CallTrace {
    /// Caller id from the `id` metadata key, if present
    pub caller_id: Option<String>,
    /// Remote peer address, if the transport exposes one
    pub caller_addr: Option<SocketAddr>,
    /// Full method path, e.g. "/lattice.discovery.v1.Discovery/Announce"
    pub method: String,
}

impl CallTrace {
    /// Extracts the trace record from an inbound request. Extraction never
    /// fails; absent peer info or metadata degrades to `None`.
    pub fn from_http<B>(request: &http::Request<B>) -> Self {
        let caller_id = request
            .headers()
            .get("id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let caller_addr = request
            .extensions()
            .get::<TcpConnectInfo>()
            .and_then(TcpConnectInfo::remote_addr);

        Self {
            caller_id,
            caller_addr,
            method: request.uri().path().to_string(),
        }
    }
}

/// An interceptor observes the trace record of an inbound call before the
/// handler runs. It cannot reject the call.
pub type Interceptor = Arc<dyn Fn(&CallTrace) + Send + Sync>;

/// Explicit ordered list of interceptors, applied front to back on every
/// inbound call.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    entries: Vec<Interceptor>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an interceptor to the end of the chain.
    pub fn with(mut self, f: impl Fn(&CallTrace) + Send + Sync + 'static) -> Self {
        self.entries.push(Arc::new(f));
        self
    }

    pub fn run(&self, trace: &CallTrace) {
        for entry in &self.entries {
            entry(trace);
        }
    }
}

/// Default chain: one interceptor emitting the structured trace record.
pub fn trace_chain() -> InterceptorChain {
    InterceptorChain::new().with(|trace| {
        debug!(
            caller_id = trace.caller_id.as_deref().unwrap_or(""),
            caller_addr = %trace
                .caller_addr
                .map(|a| a.to_string())
                .unwrap_or_default(),
            method = %trace.method,
            "handle request"
        );
    })
}

/// Tower layer applying an [`InterceptorChain`] to every inbound call of a
/// tonic server.
#[derive(Clone)]
pub struct TraceLayer {
    chain: Arc<InterceptorChain>,
}

impl TraceLayer {
    pub fn new(chain: InterceptorChain) -> Self {
        Self {
            chain: Arc::new(chain),
        }
    }
}

impl<S> Layer<S> for TraceLayer {
    type Service = TraceService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TraceService {
            inner,
            chain: self.chain.clone(),
        }
    }
}

#[derive(Clone)]
pub struct TraceService<S> {
    inner: S,
    chain: Arc<InterceptorChain>,
}

impl<S, B> Service<http::Request<B>> for TraceService<S>
where
    S: Service<http::Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: http::Request<B>) -> Self::Future {
        let trace = CallTrace::from_http(&request);
        self.chain.run(&trace);
        self.inner.call(request)
    }
}
