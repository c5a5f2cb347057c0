//! OCI request-signature construction.
//!
//! Outgoing requests are authenticated with the draft-cavage HTTP signature
//! scheme the Object Storage and Identity APIs expect:
//!
//! 1. Assemble the ordered list of signed headers, starting with the
//!    `(request-target)` pseudo-header (lowercased method, then the path
//!    plus query exactly as sent).
//! 2. Join them into the signing string, one `name: value` line each, no
//!    trailing newline. Requests with a body additionally sign
//!    `content-type`, `content-length` and `x-content-sha256`.
//! 3. Sign the string with RSA PKCS#1 v1.5 over SHA-256 and base64-encode
//!    the result.
//! 4. Emit the `Authorization` header advertising exactly the names that
//!    were signed.
//!
//! Both the signing string and the advertised name list derive from one
//! [`SignedHeaders`] value, so they cannot disagree. The main entry point is
//! [`RequestSigner`].

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use http::Method;
use rsa::RsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::debug;

use crate::environment::{CredentialSet, Environment};
use crate::error::AuthError;

/// Signature scheme version advertised in the authorization header.
const SIGNATURE_VERSION: &str = "1";

/// Signing algorithm advertised in the authorization header.
const ALGORITHM: &str = "rsa-sha256";

/// RFC 1123 format the `date` header is stamped with, always GMT.
const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// A request body together with its declared content type.
#[derive(Debug, Clone, Copy)]
pub struct RequestContent<'a> {
    /// Value of the `content-type` header.
    pub content_type: &'a str,
    /// The exact bytes that will go on the wire.
    pub body: &'a [u8],
}

/// The parts of an HTTP request that participate in the signature.
#[derive(Debug, Clone)]
pub struct SigningRequest<'a> {
    /// HTTP method.
    pub method: Method,
    /// Path plus query string, exactly as it will appear on the request line.
    pub request_target: &'a str,
    /// Host the request is addressed to.
    pub host: &'a str,
    /// Body and content type, for requests that carry one.
    pub content: Option<RequestContent<'a>>,
}

/// The ordered header list one signature covers.
///
/// # Examples
///
/// ```
/// use http::Method;
/// use stowage_auth::{SignedHeaders, SigningRequest};
///
/// let request = SigningRequest {
///     method: Method::GET,
///     request_target: "/n/",
///     host: "objectstorage.sa-saopaulo-1.oraclecloud.com",
///     content: None,
/// };
/// let headers = SignedHeaders::assemble(&request, "Fri, 01 Jan 2021 00:00:00 GMT");
/// assert_eq!(headers.names(), "(request-target) date host");
/// ```
#[derive(Debug, Clone)]
pub struct SignedHeaders {
    entries: Vec<(&'static str, String)>,
}

impl SignedHeaders {
    /// Assemble the signed header set for `request` at `date`.
    ///
    /// Bodyless requests sign `(request-target)`, `date` and `host`.
    /// Requests with a body additionally sign `content-type`,
    /// `content-length` and `x-content-sha256`, in that order.
    #[must_use]
    pub fn assemble(request: &SigningRequest<'_>, date: &str) -> Self {
        let method = request.method.as_str().to_lowercase();
        let mut entries = vec![
            (
                "(request-target)",
                format!("{method} {}", request.request_target),
            ),
            ("date", date.to_owned()),
            ("host", request.host.to_owned()),
        ];

        if let Some(content) = request.content {
            entries.push(("content-type", content.content_type.to_owned()));
            entries.push(("content-length", content.body.len().to_string()));
            entries.push(("x-content-sha256", digest_body(content.body)));
        }

        Self { entries }
    }

    /// The newline-joined signing string, without a trailing newline.
    #[must_use]
    pub fn signing_string(&self) -> String {
        self.entries
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Space-joined header names for the `headers="…"` attribute.
    #[must_use]
    pub fn names(&self) -> String {
        self.entries
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The computed `x-content-sha256` value, when a body was signed.
    #[must_use]
    pub fn content_sha256(&self) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| *name == "x-content-sha256")
            .map(|(_, value)| value.as_str())
    }
}

/// Base64-encoded SHA-256 digest of `body`.
///
/// The digest covers the exact bytes that go on the wire.
///
/// # Examples
///
/// ```
/// use stowage_auth::digest_body;
///
/// // SHA-256 of the empty body
/// assert_eq!(digest_body(b""), "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=");
/// ```
#[must_use]
pub fn digest_body(body: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(body))
}

/// Sign `signing_string` with RSA PKCS#1 v1.5 over SHA-256 and return the
/// base64-encoded signature.
///
/// The scheme is deterministic: the same key and input always produce the
/// same signature.
///
/// # Errors
///
/// Returns [`AuthError::Signing`] when the RSA operation fails.
pub fn sign_with_key(key: &RsaPrivateKey, signing_string: &str) -> Result<String, AuthError> {
    let signing_key = SigningKey::<Sha256>::new(key.clone());
    let signature = signing_key
        .try_sign(signing_string.as_bytes())
        .map_err(|e| AuthError::Signing(e.to_string()))?;
    Ok(STANDARD.encode(signature.to_vec()))
}

/// Assemble the `Authorization` header value advertising `names` as signed.
#[must_use]
pub fn authorization_header(key_id: &str, names: &str, signature: &str) -> String {
    format!(
        "Signature version=\"{SIGNATURE_VERSION}\",keyId=\"{key_id}\",\
         algorithm=\"{ALGORITHM}\",headers=\"{names}\",signature=\"{signature}\""
    )
}

/// Headers produced by signing one request.
#[derive(Debug, Clone)]
pub struct SignatureHeaders {
    /// RFC 1123 GMT date the request was signed at.
    pub date: String,
    /// Complete `Authorization` header value.
    pub authorization: String,
    /// `x-content-sha256` digest, for requests that signed a body.
    pub content_sha256: Option<String>,
    /// `content-length`, for requests that signed a body.
    pub content_length: Option<usize>,
}

/// Signs requests with one environment's credentials.
///
/// A signer borrows an immutable [`CredentialSet`] and loads its private key
/// once at construction. Nothing about signing one request can leak into
/// requests signed for another environment.
pub struct RequestSigner<'a> {
    tenancy_ocid: &'a str,
    credentials: &'a CredentialSet,
    signing_key: SigningKey<Sha256>,
}

impl<'a> RequestSigner<'a> {
    /// Create a signer for `credentials`, loading the private key from its
    /// configured source.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyNotFound`] or [`AuthError::InvalidKeyFormat`]
    /// when the key cannot be loaded.
    pub fn new(tenancy_ocid: &'a str, credentials: &'a CredentialSet) -> Result<Self, AuthError> {
        let key = credentials.key.load()?;
        Ok(Self {
            tenancy_ocid,
            credentials,
            signing_key: SigningKey::<Sha256>::new(key),
        })
    }

    /// The `keyId` attribute: `tenancy/user/fingerprint`.
    #[must_use]
    pub fn key_id(&self) -> String {
        format!(
            "{}/{}/{}",
            self.tenancy_ocid, self.credentials.user_ocid, self.credentials.fingerprint
        )
    }

    /// Environment this signer's credentials belong to.
    #[must_use]
    pub fn environment(&self) -> Environment {
        self.credentials.environment
    }

    /// Sign `request`, stamping it with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] when the RSA operation fails.
    pub fn sign(&self, request: &SigningRequest<'_>) -> Result<SignatureHeaders, AuthError> {
        self.sign_at(request, Utc::now())
    }

    /// Sign `request`, stamping it with an explicit time.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] when the RSA operation fails.
    pub fn sign_at(
        &self,
        request: &SigningRequest<'_>,
        at: DateTime<Utc>,
    ) -> Result<SignatureHeaders, AuthError> {
        let date = at.format(DATE_FORMAT).to_string();
        let headers = SignedHeaders::assemble(request, &date);
        let signing_string = headers.signing_string();

        debug!(
            environment = %self.credentials.environment,
            target = request.request_target,
            signed = %headers.names(),
            "Signing request"
        );

        let signature = self
            .signing_key
            .try_sign(signing_string.as_bytes())
            .map_err(|e| AuthError::Signing(e.to_string()))?;
        let signature = STANDARD.encode(signature.to_vec());

        let authorization = authorization_header(&self.key_id(), &headers.names(), &signature);

        Ok(SignatureHeaders {
            date,
            authorization,
            content_sha256: headers.content_sha256().map(ToOwned::to_owned),
            content_length: request.content.map(|content| content.body.len()),
        })
    }
}

impl fmt::Debug for RequestSigner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("environment", &self.credentials.environment)
            .field("key_id", &self.key_id())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use rand_chacha::ChaCha20Rng;
    use rand_chacha::rand_core::SeedableRng;
    use rsa::pkcs1v15::VerifyingKey;
    use rsa::pkcs8::{EncodePrivateKey, LineEnding};
    use rsa::signature::Verifier;

    use super::*;
    use crate::environment::CredentialRegistry;
    use crate::keys::KeySource;

    const TEST_HOST: &str = "objectstorage.sa-saopaulo-1.oraclecloud.com";

    fn test_key(seed: &str) -> RsaPrivateKey {
        let hash = Sha256::digest(seed.as_bytes());
        let mut rng = ChaCha20Rng::from_seed(hash.into());
        RsaPrivateKey::new(&mut rng, 2048).unwrap()
    }

    fn credential_set(environment: Environment, user: &str, seed: &str) -> CredentialSet {
        let pem = test_key(seed).to_pkcs8_pem(LineEnding::LF).unwrap().to_string();
        CredentialSet {
            environment,
            user_ocid: user.to_owned(),
            fingerprint: "aa:bb:cc:dd".to_owned(),
            key: KeySource::Pem(pem),
        }
    }

    fn namespace_request() -> SigningRequest<'static> {
        SigningRequest {
            method: Method::GET,
            request_target: "/n/",
            host: TEST_HOST,
            content: None,
        }
    }

    fn test_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_should_build_bodyless_signing_string() {
        let headers = SignedHeaders::assemble(&namespace_request(), "Fri, 01 Jan 2021 00:00:00 GMT");

        let expected = "(request-target): get /n/\n\
                        date: Fri, 01 Jan 2021 00:00:00 GMT\n\
                        host: objectstorage.sa-saopaulo-1.oraclecloud.com";
        assert_eq!(headers.signing_string(), expected);
        assert_eq!(headers.names(), "(request-target) date host");
    }

    #[test]
    fn test_should_lowercase_method_in_request_target_line() {
        let request = SigningRequest {
            method: Method::DELETE,
            request_target: "/n/ns/b/reports",
            host: TEST_HOST,
            content: None,
        };
        let headers = SignedHeaders::assemble(&request, "Fri, 01 Jan 2021 00:00:00 GMT");
        assert!(
            headers
                .signing_string()
                .starts_with("(request-target): delete /n/ns/b/reports\n")
        );
    }

    #[test]
    fn test_should_sign_body_headers_in_fixed_order() {
        let body = br#"{"name":"reports","compartmentId":"ocid1.compartment.oc1..xyz"}"#;
        let request = SigningRequest {
            method: Method::POST,
            request_target: "/n/ns/b/",
            host: TEST_HOST,
            content: Some(RequestContent {
                content_type: "application/json",
                body,
            }),
        };

        let headers = SignedHeaders::assemble(&request, "Fri, 01 Jan 2021 00:00:00 GMT");
        let expected = format!(
            "(request-target): post /n/ns/b/\n\
             date: Fri, 01 Jan 2021 00:00:00 GMT\n\
             host: {TEST_HOST}\n\
             content-type: application/json\n\
             content-length: {}\n\
             x-content-sha256: {}",
            body.len(),
            digest_body(body)
        );
        assert_eq!(headers.signing_string(), expected);
        assert_eq!(
            headers.names(),
            "(request-target) date host content-type content-length x-content-sha256"
        );
        assert_eq!(headers.content_sha256(), Some(digest_body(body).as_str()));
    }

    #[test]
    fn test_should_digest_empty_body_to_known_value() {
        assert_eq!(digest_body(b""), "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=");
    }

    #[test]
    fn test_should_digest_different_bytes_differently() {
        assert_ne!(digest_body(b"a"), digest_body(b"b"));
        assert_eq!(digest_body(b"same"), digest_body(b"same"));
    }

    #[test]
    fn test_should_sign_deterministically() {
        let key = test_key("determinism");
        let first = sign_with_key(&key, "(request-target): get /n/").unwrap();
        let second = sign_with_key(&key, "(request-target): get /n/").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_should_produce_verifiable_signature() {
        let key = test_key("verification");
        let signing_string = "(request-target): get /n/\n\
                              date: Fri, 01 Jan 2021 00:00:00 GMT\n\
                              host: objectstorage.sa-saopaulo-1.oraclecloud.com";
        let signature = sign_with_key(&key, signing_string).unwrap();

        let bytes = STANDARD.decode(signature).unwrap();
        let signature = rsa::pkcs1v15::Signature::try_from(bytes.as_slice()).unwrap();
        let verifying_key = VerifyingKey::<Sha256>::new(key.to_public_key());
        verifying_key
            .verify(signing_string.as_bytes(), &signature)
            .unwrap();
    }

    #[test]
    fn test_should_assemble_authorization_header() {
        let header = authorization_header(
            "ocid1.tenancy.oc1..t/ocid1.user.oc1..u/aa:bb",
            "(request-target) date host",
            "c2lnbmF0dXJl",
        );
        assert_eq!(
            header,
            "Signature version=\"1\",\
             keyId=\"ocid1.tenancy.oc1..t/ocid1.user.oc1..u/aa:bb\",\
             algorithm=\"rsa-sha256\",\
             headers=\"(request-target) date host\",\
             signature=\"c2lnbmF0dXJl\""
        );
    }

    #[test]
    fn test_should_sign_bodyless_request_end_to_end() {
        let set = credential_set(Environment::Dev, "ocid1.user.oc1..dev", "dev-key");
        let signer = RequestSigner::new("ocid1.tenancy.oc1..tttt", &set).unwrap();

        let headers = signer.sign_at(&namespace_request(), test_date()).unwrap();

        assert_eq!(headers.date, "Fri, 01 Jan 2021 00:00:00 GMT");
        assert!(headers.authorization.starts_with("Signature version=\"1\","));
        assert!(
            headers
                .authorization
                .contains("keyId=\"ocid1.tenancy.oc1..tttt/ocid1.user.oc1..dev/aa:bb:cc:dd\"")
        );
        assert!(headers.authorization.contains("algorithm=\"rsa-sha256\""));
        assert!(
            headers
                .authorization
                .contains("headers=\"(request-target) date host\"")
        );
        assert!(headers.content_sha256.is_none());
        assert!(headers.content_length.is_none());
    }

    #[test]
    fn test_should_sign_body_request_end_to_end() {
        let set = credential_set(Environment::Prd, "ocid1.user.oc1..prd", "prd-key");
        let signer = RequestSigner::new("ocid1.tenancy.oc1..tttt", &set).unwrap();

        let body = b"object bytes";
        let request = SigningRequest {
            method: Method::PUT,
            request_target: "/n/ns/b/reports/o/daily.csv",
            host: TEST_HOST,
            content: Some(RequestContent {
                content_type: "text/csv",
                body,
            }),
        };

        let headers = signer.sign_at(&request, test_date()).unwrap();

        assert_eq!(headers.content_length, Some(body.len()));
        assert_eq!(headers.content_sha256.as_deref(), Some(digest_body(body).as_str()));
        assert!(headers.authorization.contains(
            "headers=\"(request-target) date host content-type content-length x-content-sha256\""
        ));
    }

    #[test]
    fn test_should_report_key_errors_at_signer_construction() {
        let set = CredentialSet {
            environment: Environment::Dev,
            user_ocid: "ocid1.user.oc1..dev".to_owned(),
            fingerprint: "aa:bb".to_owned(),
            key: KeySource::Pem("not a key".to_owned()),
        };
        let result = RequestSigner::new("ocid1.tenancy.oc1..tttt", &set);
        assert!(matches!(result, Err(AuthError::InvalidKeyFormat)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_should_keep_environments_isolated_under_concurrency() {
        let registry = Arc::new(CredentialRegistry::new(
            "ocid1.tenancy.oc1..tttt",
            vec![
                credential_set(Environment::Dev, "ocid1.user.oc1..dev", "dev-key"),
                credential_set(Environment::Prd, "ocid1.user.oc1..prd", "prd-key"),
            ],
        ));

        let mut handles = Vec::new();
        for i in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                let environment = if i % 2 == 0 {
                    Environment::Dev
                } else {
                    Environment::Prd
                };
                let expected_user = match environment {
                    Environment::Dev => "ocid1.user.oc1..dev",
                    Environment::Prd => "ocid1.user.oc1..prd",
                };

                let set = registry.credentials_for(environment).unwrap();
                let signer = RequestSigner::new(registry.tenancy_ocid(), set).unwrap();
                let headers = signer
                    .sign(&SigningRequest {
                        method: Method::GET,
                        request_target: "/n/",
                        host: TEST_HOST,
                        content: None,
                    })
                    .unwrap();

                assert!(headers.authorization.contains(expected_user));
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }
    }
}
