//! AWS Signature Version 4 for the MTurk requester API.

use std::fmt;
use std::time::SystemTime;

use aws_config::{BehaviorVersion, Region};
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_sigv4::http_request::{
    sign, SignableBody, SignableRequest, SigningParams, SigningSettings,
};
use aws_sigv4::sign::v4;
use tracing::debug;

use super::ProviderError;

/// Signing name of the requester service.
pub const MTURK_SIGNING_NAME: &str = "mturk-requester";

/// Signs requester calls with credentials from an AWS credential provider.
#[derive(Clone)]
pub struct RequestSigner {
    credentials: SharedCredentialsProvider,
    region: String,
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    pub fn new(credentials: impl ProvideCredentials + 'static, region: impl Into<String>) -> Self {
        Self {
            credentials: SharedCredentialsProvider::new(credentials),
            region: region.into(),
        }
    }

    /// Resolve credentials through the default AWS chain
    /// (environment, shared profile, SSO, instance metadata).
    pub async fn from_environment(region: &str) -> Result<Self, ProviderError> {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        let credentials = config.credentials_provider().ok_or_else(|| {
            ProviderError::NotConfigured("no AWS credentials provider found".to_string())
        })?;

        Ok(Self {
            credentials,
            region: region.to_string(),
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Headers to add to a `POST` of `body` to `url` carrying `headers`.
    ///
    /// Every header passed in is covered by the signature, so the request must
    /// be sent with exactly these headers and this body.
    pub async fn sign(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &[u8],
    ) -> Result<Vec<(String, String)>, ProviderError> {
        let credentials = self
            .credentials
            .provide_credentials()
            .await
            .map_err(|e| ProviderError::NotConfigured(format!("AWS credentials: {}", e)))?;
        let identity = credentials.into();

        let params: SigningParams<'_> = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name(MTURK_SIGNING_NAME)
            .time(SystemTime::now())
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| ProviderError::Signing(e.to_string()))?
            .into();

        let request = SignableRequest::new(
            "POST",
            url,
            headers.iter().copied(),
            SignableBody::Bytes(body),
        )
        .map_err(|e| ProviderError::Signing(e.to_string()))?;

        let (instructions, _signature) = sign(request, &params)
            .map_err(|e| ProviderError::Signing(e.to_string()))?
            .into_parts();

        let signed: Vec<(String, String)> = instructions
            .headers()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        debug!(
            "Signed request with {}",
            signed.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>().join(", ")
        );
        Ok(signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_credential_types::Credentials;

    fn header<'a>(signed: &'a [(String, String)], name: &str) -> Option<&'a str> {
        signed
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[tokio::test]
    async fn test_sign_adds_authorization() {
        let signer = RequestSigner::new(
            Credentials::new("AKIDFIELDWORK", "secret", None, None, "test"),
            "us-east-1",
        );

        let signed = signer
            .sign(
                "https://mturk-requester.us-east-1.amazonaws.com/",
                &[
                    ("content-type", "application/x-amz-json-1.1"),
                    ("x-amz-target", "MTurkRequesterServiceV20170117.ListHITs"),
                ],
                br#"{"MaxResults":100}"#,
            )
            .await
            .unwrap();

        let authorization = header(&signed, "authorization").unwrap();
        assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKIDFIELDWORK/"));
        assert!(authorization.contains("/us-east-1/mturk-requester/aws4_request"));
        assert!(authorization.contains("x-amz-target"));
        assert!(header(&signed, "x-amz-date").is_some());
        assert!(header(&signed, "x-amz-security-token").is_none());
    }

    #[tokio::test]
    async fn test_session_token_is_forwarded() {
        let signer = RequestSigner::new(
            Credentials::new("AKIDFIELDWORK", "secret", Some("session".to_string()), None, "test"),
            "us-east-1",
        );

        let signed = signer
            .sign("https://localhost/", &[], b"{}")
            .await
            .unwrap();
        assert_eq!(header(&signed, "x-amz-security-token"), Some("session"));
    }
}
