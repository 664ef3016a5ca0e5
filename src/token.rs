// ============================================================================
// Bearer Token Validation
// ============================================================================
//
// Verifies a caller-presented bearer token against the current signing key.
// The token's declared algorithm must equal the cached key's algorithm; a
// token signed with a different scheme is rejected before any signature
// work. Validation failures are always returned to the caller.
//
// ============================================================================

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};

use crate::error::CoreError;
use crate::tokenkey::KeyProvider;

/// Claims carried by a validated token. Arbitrary string-keyed values,
/// recomputed per call and never cached.
pub type Claims = serde_json::Map<String, serde_json::Value>;

/// Validates `token` against the provider's current key and returns its
/// claim set.
pub async fn validate(provider: &dyn KeyProvider, token: &str) -> Result<Claims, CoreError> {
    let header = decode_header(token).map_err(|e| CoreError::malformed(e.to_string()))?;

    // Non-forced: validation must not pay refresh latency on every call.
    let key = provider.get(false).await?;

    let expected: Algorithm = key
        .algorithm
        .parse()
        .map_err(|_| CoreError::InvalidKeyMaterial(format!("unknown algorithm {}", key.algorithm)))?;
    if header.alg != expected {
        return Err(CoreError::AlgorithmMismatch {
            expected: key.algorithm.clone(),
            got: format!("{:?}", header.alg),
        });
    }

    let decoding_key = decoding_key_for(expected, &key.key)?;
    let mut validation = Validation::new(expected);
    // Claims are arbitrary; time-bound claims are checked when present.
    validation.required_spec_claims.clear();
    validation.validate_aud = false;

    let data = decode::<Claims>(token, &decoding_key, &validation).map_err(map_jwt_error)?;
    Ok(data.claims)
}

fn decoding_key_for(alg: Algorithm, key: &str) -> Result<DecodingKey, CoreError> {
    let result = match alg {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
            return Ok(DecodingKey::from_secret(key.as_bytes()));
        }
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => DecodingKey::from_rsa_pem(key.as_bytes()),
        Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(key.as_bytes()),
        Algorithm::EdDSA => DecodingKey::from_ed_pem(key.as_bytes()),
    };
    result.map_err(|e| CoreError::InvalidKeyMaterial(e.to_string()))
}

fn map_jwt_error(e: jsonwebtoken::errors::Error) -> CoreError {
    use jsonwebtoken::errors::ErrorKind;

    match e.kind() {
        ErrorKind::ExpiredSignature | ErrorKind::ImmatureSignature => CoreError::ExpiredToken,
        ErrorKind::InvalidSignature => CoreError::InvalidSignature,
        _ => CoreError::malformed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenkey::TokenKey;
    use async_trait::async_trait;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    struct FixedProvider(TokenKey);

    #[async_trait]
    impl KeyProvider for FixedProvider {
        async fn get(&self, _force_refresh: bool) -> Result<TokenKey, CoreError> {
            Ok(self.0.clone())
        }
    }

    fn hs256_provider(secret: &str) -> FixedProvider {
        FixedProvider(TokenKey {
            algorithm: "HS256".to_string(),
            key: secret.to_string(),
        })
    }

    fn mint(secret: &str, claims: &serde_json::Value) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn future_exp() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64
            + 3600
    }

    #[tokio::test]
    async fn valid_token_returns_full_claims() {
        let provider = hs256_provider("s3cr3t");
        let token = mint(
            "s3cr3t",
            &json!({"sub": "node-7", "role": "router", "exp": future_exp()}),
        );

        let claims = validate(&provider, &token).await.unwrap();
        assert_eq!(claims["sub"], json!("node-7"));
        assert_eq!(claims["role"], json!("router"));
    }

    #[tokio::test]
    async fn empty_token_is_malformed() {
        let provider = hs256_provider("s3cr3t");
        let err = validate(&provider, "").await.unwrap_err();
        assert!(matches!(err, CoreError::MalformedToken(_)));
    }

    #[tokio::test]
    async fn garbage_token_is_malformed() {
        let provider = hs256_provider("s3cr3t");
        let err = validate(&provider, "not.a.jwt").await.unwrap_err();
        assert!(matches!(err, CoreError::MalformedToken(_)));
    }

    #[tokio::test]
    async fn algorithm_mismatch_is_rejected_before_verification() {
        // The key says RS256; a syntactically valid HS256 token must be
        // rejected even though its signature would verify under HS256.
        let provider = FixedProvider(TokenKey {
            algorithm: "RS256".to_string(),
            key: "irrelevant".to_string(),
        });
        let token = mint("irrelevant", &json!({"sub": "x", "exp": future_exp()}));

        let err = validate(&provider, &token).await.unwrap_err();
        match err {
            CoreError::AlgorithmMismatch { expected, got } => {
                assert_eq!(expected, "RS256");
                assert_eq!(got, "HS256");
            }
            other => panic!("expected AlgorithmMismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn tampered_signature_is_invalid() {
        let provider = hs256_provider("s3cr3t");
        let token = mint("wrong-secret", &json!({"sub": "x", "exp": future_exp()}));

        let err = validate(&provider, &token).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidSignature));
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let provider = hs256_provider("s3cr3t");
        let token = mint("s3cr3t", &json!({"sub": "x", "exp": 1_000_000}));

        let err = validate(&provider, &token).await.unwrap_err();
        assert!(matches!(err, CoreError::ExpiredToken));
    }

    #[tokio::test]
    async fn token_without_time_claims_is_accepted() {
        let provider = hs256_provider("s3cr3t");
        let token = mint("s3cr3t", &json!({"sub": "x"}));

        let claims = validate(&provider, &token).await.unwrap();
        assert_eq!(claims["sub"], json!("x"));
    }
}
