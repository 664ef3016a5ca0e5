use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

/// Errors produced by the identity & trust core.
///
/// Configuration and connectivity errors from `announce` are returned to the
/// caller, who owns retry policy. Token-validation errors are always
/// returned, never swallowed. Key-refresh errors on the maintenance path are
/// logged and suppressed instead (see `Component::update_token_key`).
#[derive(Error, Debug)]
pub enum CoreError {
    // ===== Configuration =====
    #[error("configuration missing: no {0} configured")]
    ConfigMissing(&'static str),

    // ===== Discovery =====
    #[error("failed to connect to discovery registry")]
    ConnectFailure(#[source] tonic::transport::Error),

    #[error("failed to announce to discovery registry")]
    RpcFailure(#[source] tonic::Status),

    // ===== Token key provider =====
    #[error("token key provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("invalid token key material: {0}")]
    InvalidKeyMaterial(String),

    // ===== Token validation =====
    #[error("token algorithm {got} does not match key algorithm {expected}")]
    AlgorithmMismatch { expected: String, got: String },

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("token is expired or not yet valid")]
    ExpiredToken,
}

impl CoreError {
    /// Create a provider-unavailable error
    pub fn provider_unavailable(msg: impl Into<String>) -> Self {
        CoreError::ProviderUnavailable(msg.into())
    }

    /// Create a malformed-token error
    pub fn malformed(msg: impl Into<String>) -> Self {
        CoreError::MalformedToken(msg.into())
    }
}
