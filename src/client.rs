//! The top-level inference API client and its builder.

use std::path::Path;
use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::artifacts::ArtifactFetcher;
use crate::auth::{Credential, RsaPrivateKey};
use crate::config::{RetryConfig, TokenResetPolicy};
use crate::error::{Error, Result};
use crate::http::JwtHttpClient;
use crate::types::{Inference, InferenceRecord};

/// Default base URL of the production API.
pub const DEFAULT_BASE_URL: &str = "https://api.bunkerhillhealth.com/";

/// Default auth endpoint path.
pub const DEFAULT_AUTH_PATH: &str = "api/auth/jwt_login/";

/// Default resource path template. The template is deployment
/// configuration: installations that key inferences by study/series
/// identifiers instead of patient MRN supply their own.
pub const DEFAULT_RESOURCE_PATH_TEMPLATE: &str =
    "api/models/{model_id}/patients/{patient_mrn}/inferences/";

const MODEL_ID_PLACEHOLDER: &str = "{model_id}";
const PATIENT_MRN_PLACEHOLDER: &str = "{patient_mrn}";

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the Bunkerhill Health Inference API.
///
/// Fetches inference records for a model and patient and downloads their
/// segmentation artifacts locally. One client instance holds one
/// authenticated identity; its bearer token is refreshed automatically.
///
/// ## Example
///
/// ```rust,ignore
/// use bunkerhill_inference::{InferenceClient, RsaPrivateKey};
///
/// #[tokio::main]
/// async fn main() -> Result<(), bunkerhill_inference::Error> {
///     let client = InferenceClient::builder()
///         .identity("datashare-admin")
///         .private_key(RsaPrivateKey::from_pem_file("private_key.pem")?)
///         .build()?;
///
///     let inferences = client
///         .get_inferences("e7ad8122-14cf-4bb2-b57f-075a07b51e2b", "1", "/tmp/segmentations")
///         .await?;
///     println!("{:?}", inferences);
///     Ok(())
/// }
/// ```
pub struct InferenceClient {
    http: JwtHttpClient,
    fetcher: ArtifactFetcher,
    resource_path_template: String,
}

impl InferenceClient {
    /// Creates a new client builder.
    pub fn builder() -> InferenceClientBuilder {
        InferenceClientBuilder::new()
    }

    /// Fetches all inferences matching `model_id` and `patient_mrn`,
    /// downloading each inference's segmentation artifacts into
    /// `dest_dir`.
    ///
    /// Returns one [`Inference`] per matching record; the endpoint may
    /// match zero, one, or many.
    ///
    /// # Errors
    ///
    /// - [`Error::AuthenticationFailed`]: the auth POST exhausted its
    ///   retries or returned >= 400.
    /// - [`Error::RequestFailed`]: the resource GET exhausted its retries
    ///   or returned >= 400.
    /// - [`Error::ResponseParseFailed`]: a 2xx response carried invalid
    ///   JSON.
    /// - [`Error::ArtifactDownloadFailed`] /
    ///   [`Error::ArtifactWriteFailed`]: a segmentation could not be
    ///   downloaded or persisted. The batch aborts on the first failing
    ///   artifact and `dest_dir` may be partially populated; nothing is
    ///   rolled back.
    pub async fn get_inferences(
        &self,
        model_id: &str,
        patient_mrn: &str,
        dest_dir: impl AsRef<Path>,
    ) -> Result<Vec<Inference>> {
        let resource_path = self
            .resource_path_template
            .replace(MODEL_ID_PLACEHOLDER, model_id)
            .replace(PATIENT_MRN_PLACEHOLDER, patient_mrn);

        let records: Vec<InferenceRecord> = self.http.get_json(&resource_path).await?;
        debug!(model_id, patient_mrn, matches = records.len(), "fetched inference records");

        let mut inferences = Vec::with_capacity(records.len());
        for record in records {
            self.fetcher
                .fetch_all(&record.segmentation_presigned_urls, dest_dir.as_ref())
                .await?;
            inferences.push(Inference {
                model_id: model_id.to_string(),
                patient_mrn: patient_mrn.to_string(),
                segmentation_presigned_urls: record.segmentation_presigned_urls,
            });
        }
        Ok(inferences)
    }
}

impl std::fmt::Debug for InferenceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceClient")
            .field("resource_path_template", &self.resource_path_template)
            .finish_non_exhaustive()
    }
}

/// Builder for [`InferenceClient`].
///
/// `identity` and `private_key` are required; everything else has
/// production defaults. Validation happens in [`build`](Self::build), and
/// a bad configuration is immediate and fatal, never retried.
#[derive(Debug, Default)]
pub struct InferenceClientBuilder {
    identity: Option<String>,
    private_key: Option<RsaPrivateKey>,
    base_url: Option<String>,
    auth_path: Option<String>,
    resource_path_template: Option<String>,
    failure_threshold: Option<u32>,
    retry_config: Option<RetryConfig>,
    token_reset_policy: Option<TokenResetPolicy>,
    max_concurrent_downloads: Option<usize>,
}

impl InferenceClientBuilder {
    fn new() -> Self {
        Self::default()
    }

    /// Sets the identity (username) to authenticate as. Required.
    #[must_use]
    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Sets the RS256 private key. Required.
    ///
    /// Construct the key from exactly one source with
    /// [`RsaPrivateKey::from_pem`] or [`RsaPrivateKey::from_pem_file`].
    #[must_use]
    pub fn private_key(mut self, key: RsaPrivateKey) -> Self {
        self.private_key = Some(key);
        self
    }

    /// Overrides the base URL. Defaults to [`DEFAULT_BASE_URL`].
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Overrides the auth endpoint path. Defaults to
    /// [`DEFAULT_AUTH_PATH`].
    #[must_use]
    pub fn auth_path(mut self, auth_path: impl Into<String>) -> Self {
        self.auth_path = Some(auth_path.into());
        self
    }

    /// Overrides the resource path template. Defaults to
    /// [`DEFAULT_RESOURCE_PATH_TEMPLATE`]. Must contain the
    /// `{model_id}` and `{patient_mrn}` placeholders.
    #[must_use]
    pub fn resource_path_template(mut self, template: impl Into<String>) -> Self {
        self.resource_path_template = Some(template.into());
        self
    }

    /// Sets the consecutive-failure threshold driving forced token
    /// invalidation. Defaults to 3.
    #[must_use]
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = Some(threshold);
        self
    }

    /// Sets the retry configuration applied to every network call.
    #[must_use]
    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = Some(config);
        self
    }

    /// Sets the token reset policy applied on request failure.
    #[must_use]
    pub fn token_reset_policy(mut self, policy: TokenResetPolicy) -> Self {
        self.token_reset_policy = Some(policy);
        self
    }

    /// Caps how many artifacts of one batch download concurrently.
    /// Defaults to 4.
    #[must_use]
    pub fn max_concurrent_downloads(mut self, max: usize) -> Self {
        self.max_concurrent_downloads = Some(max);
        self
    }

    /// Validates the configuration and builds the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidClientConfiguration`] when `identity` or
    /// `private_key` is missing, the base URL does not parse, or the
    /// resource path template lacks a required placeholder.
    pub fn build(self) -> Result<InferenceClient> {
        let identity = match self.identity {
            Some(identity) if !identity.is_empty() => identity,
            Some(_) => return Err(Error::configuration("identity must not be empty")),
            None => return Err(Error::configuration("identity must be provided")),
        };
        let private_key = self
            .private_key
            .ok_or_else(|| Error::configuration("a private key must be provided"))?;

        // Base URLs are joined with relative resource paths, so a missing
        // trailing slash would silently drop the last path segment.
        let mut base_url = self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let base_url = Url::parse(&base_url)
            .map_err(|e| Error::configuration(format!("invalid base URL '{}': {}", base_url, e)))?;

        let template = self
            .resource_path_template
            .unwrap_or_else(|| DEFAULT_RESOURCE_PATH_TEMPLATE.to_string());
        for placeholder in [MODEL_ID_PLACEHOLDER, PATIENT_MRN_PLACEHOLDER] {
            if !template.contains(placeholder) {
                return Err(Error::configuration(format!(
                    "resource path template '{}' is missing the {} placeholder",
                    template, placeholder
                )));
            }
        }

        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::configuration(format!("failed to create HTTP client: {}", e)))?;

        Ok(InferenceClient {
            http: JwtHttpClient::new(
                http.clone(),
                base_url,
                self.auth_path.unwrap_or_else(|| DEFAULT_AUTH_PATH.to_string()),
                Credential::new(identity, private_key),
                self.retry_config.unwrap_or_default(),
                self.failure_threshold.unwrap_or(3),
                self.token_reset_policy.unwrap_or_default(),
            ),
            fetcher: ArtifactFetcher::new(http, self.max_concurrent_downloads.unwrap_or(4)),
            resource_path_template: template,
        })
    }
}
