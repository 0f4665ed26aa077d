//! Webhook signature verification and secret encryption.
//!
//! The platform signs every callback it delivers: the `x-rpc-bot_sign`
//! header carries a base64 RSA PKCS#1 v1.5 / SHA-256 signature over the
//! form-urlencoded pair `body=<raw body>&secret=<bot secret>`, verifiable
//! with the bot's published RSA key.
//!
//! The same key material is used on the outbound side: API requests
//! authenticate with an HMAC-SHA256 of the bot secret keyed by the public
//! key PEM (see [`encrypt_secret`]).

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::error::AuthError;
use crate::identity::BotIdentity;

/// Re-wraps a public key into well-formed PEM.
///
/// The developer console hands keys out with the armor lines intact but the
/// base64 body flattened onto one space-separated line; `rsa` rejects that,
/// so rebuild a proper `-----BEGIN PUBLIC KEY-----` block first.
pub fn normalize_pub_key(raw: &str) -> String {
    let mut body = raw.trim();
    if let Some(stripped) = body.strip_prefix("-----BEGIN PUBLIC KEY-----") {
        body = stripped;
    }
    if let Some(stripped) = body.strip_suffix("-----END PUBLIC KEY-----") {
        body = stripped;
    }
    let body = body.trim().replace(' ', "\n");
    format!("-----BEGIN PUBLIC KEY-----\n{body}\n-----END PUBLIC KEY-----\n")
}

/// Builds the exact byte sequence the platform signs for a callback body.
///
/// Trailing newlines are stripped from the body before encoding, matching
/// the platform's canonicalization. Public so test harnesses can produce
/// correctly-signed payloads.
pub fn signing_payload(body: &str, secret: &str) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair("body", body.trim_end_matches('\n'))
        .append_pair("secret", secret)
        .finish()
}

/// Encrypts a bot secret for use in outbound API auth headers.
///
/// HMAC-SHA256 of the secret, keyed by the normalized public key PEM,
/// hex-encoded.
pub fn encrypt_secret(pub_key: &str, secret: &str) -> String {
    let pem = normalize_pub_key(pub_key);
    let mut mac = Hmac::<Sha256>::new_from_slice(pem.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(secret.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies webhook payload signatures for one bot.
///
/// Built once at registration from the bot's credentials; cheap to use on
/// every inbound request. Verification failures carry no detail about how
/// far verification got -- the RSA library compares the full recovered
/// digest, so no partial-match timing channel is exposed.
#[derive(Clone)]
pub struct SignatureVerifier {
    /// Absent only when verification is disabled for the bot.
    pub_key: Option<RsaPublicKey>,
    secret: String,
    enabled: bool,
}

impl SignatureVerifier {
    /// Builds a verifier from a bot identity.
    ///
    /// Fails with [`AuthError::InvalidKey`] if the key does not parse; this
    /// surfaces at registration time, never while serving. Identities with
    /// verification disabled accept unparseable key material, so local
    /// setups can replay payloads without real credentials.
    pub fn new(identity: &BotIdentity) -> Result<Self, AuthError> {
        let pem = normalize_pub_key(&identity.pub_key);
        let pub_key = match RsaPublicKey::from_public_key_pem(&pem) {
            Ok(key) => Some(key),
            Err(_) if !identity.verify_event => None,
            Err(e) => return Err(AuthError::InvalidKey(e.to_string())),
        };
        Ok(Self {
            pub_key,
            secret: identity.secret.clone(),
            enabled: identity.verify_event,
        })
    }

    /// Whether this verifier actually checks signatures.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Verifies the signature header against the raw request body.
    ///
    /// Returns `Ok(())` when the signature is valid, or when verification
    /// is disabled for this bot.
    pub fn verify(&self, body: &[u8], sign_header: Option<&str>) -> Result<(), AuthError> {
        if !self.enabled {
            return Ok(());
        }
        let header = sign_header.ok_or(AuthError::MalformedHeader)?;
        let signature = BASE64
            .decode(header.trim())
            .map_err(|_| AuthError::MalformedHeader)?;
        let body = std::str::from_utf8(body).map_err(|_| AuthError::InvalidSignature)?;

        // The key is always present when verification is enabled; see new().
        let pub_key = self.pub_key.as_ref().ok_or(AuthError::InvalidSignature)?;

        let payload = signing_payload(body, &self.secret);
        let digest = Sha256::digest(payload.as_bytes());
        pub_key
            .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, &signature)
            .map_err(|_| AuthError::InvalidSignature)
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::RsaPrivateKey;
    use rsa::pkcs8::EncodePublicKey;

    fn test_key() -> (RsaPrivateKey, String) {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, 2048).expect("key generation");
        let pem = private
            .to_public_key()
            .to_public_key_pem(rsa::pkcs8::LineEnding::LF)
            .expect("PEM encoding");
        (private, pem)
    }

    fn sign(private: &RsaPrivateKey, body: &str, secret: &str) -> String {
        let payload = signing_payload(body, secret);
        let digest = Sha256::digest(payload.as_bytes());
        let signature = private
            .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
            .expect("signing");
        BASE64.encode(signature)
    }

    fn verifier(pem: &str, secret: &str) -> SignatureVerifier {
        let identity = BotIdentity::new("bot_test", secret, pem, "/callback");
        SignatureVerifier::new(&identity).expect("verifier")
    }

    #[test]
    fn valid_signature_verifies() {
        let (private, pem) = test_key();
        let body = r#"{"event":{"type":2}}"#;
        let header = sign(&private, body, "secret123");

        let v = verifier(&pem, "secret123");
        assert!(v.verify(body.as_bytes(), Some(&header)).is_ok());
    }

    #[test]
    fn mutated_body_is_rejected() {
        let (private, pem) = test_key();
        let body = r#"{"event":{"type":2}}"#;
        let header = sign(&private, body, "secret123");

        let v = verifier(&pem, "secret123");
        let tampered = r#"{"event":{"type":3}}"#;
        assert!(matches!(
            v.verify(tampered.as_bytes(), Some(&header)),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn mutated_signature_is_rejected() {
        let (private, pem) = test_key();
        let body = "payload";
        let header = sign(&private, body, "secret123");

        // Flip one bit in the decoded signature.
        let mut raw = BASE64.decode(&header).unwrap();
        raw[0] ^= 0x01;
        let tampered = BASE64.encode(raw);

        let v = verifier(&pem, "secret123");
        assert!(matches!(
            v.verify(body.as_bytes(), Some(&tampered)),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let (private, pem) = test_key();
        let body = "payload";
        let header = sign(&private, body, "secret123");

        let v = verifier(&pem, "other-secret");
        assert!(v.verify(body.as_bytes(), Some(&header)).is_err());
    }

    #[test]
    fn missing_or_garbled_header_is_malformed() {
        let (_, pem) = test_key();
        let v = verifier(&pem, "secret123");

        assert!(matches!(
            v.verify(b"body", None),
            Err(AuthError::MalformedHeader)
        ));
        assert!(matches!(
            v.verify(b"body", Some("!!! not base64 !!!")),
            Err(AuthError::MalformedHeader)
        ));
    }

    #[test]
    fn disabled_verifier_accepts_anything() {
        let (_, pem) = test_key();
        let identity =
            BotIdentity::new("bot_test", "secret", &pem, "/callback").without_verification();
        let v = SignatureVerifier::new(&identity).unwrap();
        assert!(v.verify(b"whatever", None).is_ok());
    }

    #[test]
    fn trailing_newlines_do_not_affect_the_signature() {
        let (private, pem) = test_key();
        let body = "payload";
        let header = sign(&private, body, "secret123");

        let v = verifier(&pem, "secret123");
        assert!(v.verify(b"payload\n\n", Some(&header)).is_ok());
    }

    #[test]
    fn mangled_console_key_is_normalized() {
        let (_, pem) = test_key();
        // Simulate the console's single-line, space-separated rendition.
        let mangled = pem
            .trim()
            .strip_prefix("-----BEGIN PUBLIC KEY-----")
            .unwrap()
            .strip_suffix("-----END PUBLIC KEY-----")
            .unwrap()
            .trim()
            .replace('\n', " ");
        let mangled = format!("-----BEGIN PUBLIC KEY-----{mangled}-----END PUBLIC KEY-----");

        let identity = BotIdentity::new("bot_test", "secret", &mangled, "/callback");
        assert!(SignatureVerifier::new(&identity).is_ok());
    }

    #[test]
    fn encrypted_secret_is_stable_hex() {
        let (_, pem) = test_key();
        let a = encrypt_secret(&pem, "secret123");
        let b = encrypt_secret(&pem, "secret123");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, encrypt_secret(&pem, "other"));
    }
}
