//! Backend request signing (AWS Signature Version 4).
//!
//! # Responsibilities
//! - Resolve credentials for each request from the configured provider
//! - Attach `Authorization`, `X-Amz-Date`, `X-Amz-Content-Sha256` and, for
//!   temporary credentials, `X-Amz-Security-Token`
//!
//! # Design Decisions
//! - The signature algorithm is the `aws-sigv4` library's; nothing here
//!   reimplements it
//! - S3 signing rules: single percent-encoding, no path normalization,
//!   payload hash sent as a header
//! - The trait exists so tests can sign (or fail to sign) without AWS

use std::time::SystemTime;

use async_trait::async_trait;
use aws_credential_types::provider::error::CredentialsError;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{
    sign, PayloadChecksumKind, PercentEncodingMode, SignableBody, SignableRequest, SigningParams,
    SigningSettings, UriPathNormalizationMode,
};
use aws_sigv4::sign::v4;
use aws_smithy_runtime_api::client::identity::Identity;
use axum::http::Request;

use crate::backend::request::BackendRequest;

/// Signing service name for S3.
pub const SIGNING_SERVICE: &str = "s3";

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("no credentials available: {0}")]
    Credentials(#[from] CredentialsError),
    #[error("failed to sign request: {0}")]
    Sign(String),
}

/// Produces an authenticated backend request.
#[async_trait]
pub trait RequestSigner: Send + Sync {
    async fn sign(&self, request: &mut BackendRequest, region: &str) -> Result<(), SigningError>;
}

/// SigV4 signer backed by an AWS credentials provider.
#[derive(Debug, Clone)]
pub struct SigV4Signer {
    credentials: SharedCredentialsProvider,
}

impl SigV4Signer {
    pub fn new(credentials: SharedCredentialsProvider) -> Self {
        Self { credentials }
    }

    /// Signer with fixed credentials.
    pub fn from_static(credentials: Credentials) -> Self {
        Self::new(SharedCredentialsProvider::new(credentials))
    }

    /// Sign with explicit credentials and signing time.
    pub fn sign_at(
        &self,
        request: &mut BackendRequest,
        region: &str,
        credentials: Credentials,
        time: SystemTime,
    ) -> Result<(), SigningError> {
        let identity: Identity = credentials.into();

        let mut settings = SigningSettings::default();
        settings.payload_checksum_kind = PayloadChecksumKind::XAmzSha256;
        settings.percent_encoding_mode = PercentEncodingMode::Single;
        settings.uri_path_normalization_mode = UriPathNormalizationMode::Disabled;

        let params: SigningParams<'_> = v4::SigningParams::builder()
            .identity(&identity)
            .region(region)
            .name(SIGNING_SERVICE)
            .time(time)
            .settings(settings)
            .build()
            .map_err(|e| SigningError::Sign(e.to_string()))?
            .into();

        let uri = request.uri().to_string();
        let headers = request
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|value| (name.as_str(), value)));
        let signable = SignableRequest::new(
            request.method().as_str(),
            uri.as_str(),
            headers,
            SignableBody::Bytes(&[]),
        )
        .map_err(|e| SigningError::Sign(e.to_string()))?;

        let (instructions, _signature) = sign(signable, &params)
            .map_err(|e| SigningError::Sign(e.to_string()))?
            .into_parts();

        let mut signed = Request::new(());
        *signed.method_mut() = request.method().clone();
        *signed.uri_mut() = request.uri().clone();
        *signed.headers_mut() = request.headers().clone();
        instructions.apply_to_request_http1x(&mut signed);

        let (parts, ()) = signed.into_parts();
        *request.headers_mut() = parts.headers;
        Ok(())
    }
}

#[async_trait]
impl RequestSigner for SigV4Signer {
    async fn sign(&self, request: &mut BackendRequest, region: &str) -> Result<(), SigningError> {
        let credentials = self.credentials.provide_credentials().await?;
        self.sign_at(request, region, credentials, SystemTime::now())
    }
}
