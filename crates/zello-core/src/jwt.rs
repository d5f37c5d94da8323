//! RS256 JWT minting for Zello developer authentication.
//!
//! Zello's consumer API accepts a short-lived token signed with the
//! developer's RSA key: header `{alg: RS256, typ: JWT}` and claims
//! `{iss, exp}`. The key arrives as a PKCS#1 or PKCS#8 PEM block from the
//! configured key file.

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Result, ZelloError};

/// Token lifetime in seconds.
const TOKEN_TTL_SECS: u64 = 3000;

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    exp: u64,
}

/// Mint a compact RS256 JWT for the given issuer.
pub fn create_jwt(issuer: &str, private_key_pem: &str) -> Result<String> {
    if issuer.is_empty() || private_key_pem.is_empty() {
        return Err(ZelloError::EmptyInput);
    }

    let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
        .map_err(|e| ZelloError::PemParse(e.to_string()))?;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let claims = Claims { iss: issuer, exp: now + TOKEN_TTL_SECS };

    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
        .map_err(|e| ZelloError::JwtSign(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;
    use rsa::pkcs1::EncodeRsaPrivateKey;
    use rsa::pkcs8::EncodePrivateKey;
    use rsa::RsaPrivateKey;

    fn test_key() -> RsaPrivateKey {
        let mut rng = rand::rngs::OsRng;
        RsaPrivateKey::new(&mut rng, 2048).unwrap()
    }

    #[test]
    fn test_empty_inputs_rejected() {
        assert!(matches!(create_jwt("", "pem"), Err(ZelloError::EmptyInput)));
        assert!(matches!(create_jwt("iss", ""), Err(ZelloError::EmptyInput)));
    }

    #[test]
    fn test_bad_pem_rejected() {
        assert!(matches!(
            create_jwt("issuer", "not a pem block"),
            Err(ZelloError::PemParse(_))
        ));
    }

    #[test]
    fn test_token_structure_and_claims() {
        let pem = test_key().to_pkcs8_pem(rsa::pkcs8::LineEnding::LF).unwrap();
        let token = create_jwt("my-issuer", &pem).unwrap();

        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);

        let header: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[0]).unwrap()).unwrap();
        assert_eq!(header["alg"], "RS256");
        assert_eq!(header["typ"], "JWT");

        let claims: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        assert_eq!(claims["iss"], "my-issuer");

        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
        let exp = claims["exp"].as_u64().unwrap();
        assert!(exp > now && exp <= now + TOKEN_TTL_SECS + 5);

        // Signature is present and base64url-decodable.
        assert!(!URL_SAFE_NO_PAD.decode(parts[2]).unwrap().is_empty());
    }

    #[test]
    fn test_pkcs1_pem_accepted() {
        let pem = test_key().to_pkcs1_pem(rsa::pkcs8::LineEnding::LF).unwrap();
        assert!(create_jwt("issuer", &pem).is_ok());
    }
}
