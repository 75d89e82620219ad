//! Engine API authentication.
//!
//! Every request carries an HS256 token whose only claim is `iat`. Engines
//! reject tokens issued more than 60 seconds away from their own clock, so a
//! token is reused for a while and re-minted before it gets that old.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::ExecutionError;

const TOKEN_VALIDITY_DURATION: Duration = Duration::from_secs(55);

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iat: u64,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    issued_at: SystemTime,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        // A clock that moved backwards makes `elapsed` fail; mint a new token then.
        self.issued_at.elapsed().is_ok_and(|age| age < TOKEN_VALIDITY_DURATION)
    }
}

/// Mints and caches the bearer token for one engine.
pub struct JwtProvider {
    key: EncodingKey,
    cache: RwLock<Option<CachedToken>>,
}

impl JwtProvider {
    pub fn new(secret: [u8; 32]) -> Self {
        Self { key: EncodingKey::from_secret(&secret), cache: RwLock::new(None) }
    }

    /// Returns a fresh token, minting one if the cached token is too old.
    pub async fn get_token(&self) -> Result<String, ExecutionError> {
        if let Some(cached) = self.cache.read().await.as_ref() &&
            cached.is_fresh()
        {
            return Ok(cached.token.clone());
        }

        let mut cache = self.cache.write().await;
        // Another caller may have refreshed it while we waited for the write lock.
        if let Some(cached) = cache.as_ref() &&
            cached.is_fresh()
        {
            return Ok(cached.token.clone());
        }

        let issued_at = SystemTime::now();
        let iat = issued_at
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ExecutionError::Jwt(e.to_string()))?
            .as_secs();
        let token = encode(&Header::default(), &Claims { iat }, &self.key)
            .map_err(|e| ExecutionError::Jwt(e.to_string()))?;

        cache.replace(CachedToken { token: token.clone(), issued_at });
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
    use tokio::task::JoinSet;

    use super::*;

    async fn expire(provider: &JwtProvider) {
        let mut cache = provider.cache.write().await;
        if let Some(cached) = cache.as_mut() {
            cached.issued_at = SystemTime::now() - Duration::from_secs(60);
        }
    }

    #[tokio::test]
    async fn token_is_cached() {
        let provider = JwtProvider::new([1; 32]);
        let token1 = provider.get_token().await.unwrap();
        assert!(!token1.is_empty());

        let token2 = provider.get_token().await.unwrap();
        assert_eq!(token1, token2);
    }

    #[tokio::test]
    async fn token_carries_iat_signed_with_secret() {
        let secret = [2u8; 32];
        let token = JwtProvider::new(secret).get_token().await.unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        let claims = decode::<Claims>(&token, &DecodingKey::from_secret(&secret), &validation)
            .unwrap()
            .claims;
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
        assert!(now.abs_diff(claims.iat) <= 1);

        let wrong_key = DecodingKey::from_secret(&[3u8; 32]);
        assert!(decode::<Claims>(&token, &wrong_key, &validation).is_err());
    }

    #[tokio::test]
    async fn stale_token_is_reminted() {
        let provider = JwtProvider::new([3u8; 32]);
        let token1 = provider.get_token().await.unwrap();

        expire(&provider).await;
        // `iat` has one second resolution.
        tokio::time::sleep(Duration::from_secs(1)).await;

        let token2 = provider.get_token().await.unwrap();
        assert_ne!(token1, token2);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_reminted_token() {
        let provider = Arc::new(JwtProvider::new([4u8; 32]));
        let initial_token = provider.get_token().await.unwrap();

        expire(&provider).await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        let mut set = JoinSet::new();
        for _ in 0..10 {
            let provider = provider.clone();
            set.spawn(async move { provider.get_token().await.unwrap() });
        }

        let mut tokens = Vec::new();
        while let Some(res) = set.join_next().await {
            tokens.push(res.unwrap());
        }

        assert_eq!(tokens.len(), 10);
        assert!(tokens.iter().all(|t| t == &tokens[0]));
        assert_ne!(initial_token, tokens[0]);
    }
}
