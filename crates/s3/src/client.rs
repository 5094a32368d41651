//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from osb-core.

use std::ops::Range;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::{ByteStream, Length};
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart as S3CompletedPart};
use aws_smithy_http_client::proxy::ProxyConfig;
use aws_smithy_http_client::tls::{self, rustls_provider::CryptoMode};
use aws_smithy_http_client::{Builder as HttpClientBuilder, Connector};
use aws_smithy_types::error::display::DisplayErrorContext;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use aws_smithy_types::retry::RetryConfig;
use aws_smithy_types::timeout::TimeoutConfig;

use osb_core::{
    BucketRef, CompletedPart, Error, ListOptions, ListPage, ObjectBody, ObjectEntry, ObjectStore,
    Profile, Result,
};

/// Service error codes reported for a missing bucket or key
const NOT_FOUND_CODES: &[&str] = &["NoSuchKey", "NoSuchBucket", "NotFound", "BucketNotFound"];

/// Service error codes reported for rejected credentials
const AUTH_CODES: &[&str] = &[
    "AccessDenied",
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
    "Forbidden",
    "Unauthorized",
];

/// Read buffer used when streaming a part from disk: 1 MiB
const PART_BUFFER_SIZE: usize = 1024 * 1024;

/// S3 client wrapper
pub struct S3Client {
    inner: aws_sdk_s3::Client,
    namespace: String,
}

impl S3Client {
    /// Create a new S3 client from a profile
    pub async fn new(profile: &Profile) -> Result<Self> {
        let endpoint = profile.endpoint_url()?;

        let credentials = aws_credential_types::Credentials::new(
            profile.access_key.clone(),
            profile.secret_key.clone(),
            None,
            None,
            "osb-static-credentials",
        );

        let retry = profile.retry_config();
        let retry_config = RetryConfig::standard()
            .with_max_attempts(retry.max_attempts.max(1))
            .with_initial_backoff(Duration::from_millis(retry.initial_backoff_ms))
            .with_max_backoff(Duration::from_millis(retry.max_backoff_ms));

        let timeout = profile.timeout_config();
        let timeout_config = TimeoutConfig::builder()
            .connect_timeout(Duration::from_millis(timeout.connect_ms))
            .read_timeout(Duration::from_millis(timeout.read_ms))
            .build();

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(profile.region.clone()))
            .endpoint_url(endpoint.as_str())
            .retry_config(retry_config)
            .timeout_config(timeout_config);

        if let Some(proxy) = proxy_config(profile)? {
            loader = loader.http_client(HttpClientBuilder::new().build_with_connector_fn(
                move |settings, components| {
                    let mut builder = Connector::builder().proxy_config(proxy.clone());
                    builder.set_connector_settings(settings.cloned());
                    if let Some(components) = components {
                        builder.set_sleep_impl(components.sleep_impl());
                    }
                    builder
                        .tls_provider(tls::Provider::Rustls(CryptoMode::AwsLc))
                        .build()
                },
            ));
        }

        let config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(profile.force_path_style())
            .build();

        tracing::debug!(%endpoint, region = %profile.region, "Built S3 client");

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
            namespace: profile.namespace.clone(),
        })
    }
}

/// Proxy every request through the profile's proxy, if it has one
fn proxy_config(profile: &Profile) -> Result<Option<ProxyConfig>> {
    let Some(url) = profile.proxy_url() else {
        return Ok(None);
    };
    tracing::debug!(proxy = %url, "Routing requests through proxy");
    ProxyConfig::all(url.as_str())
        .map(Some)
        .map_err(|e| Error::Config(format!("Invalid proxy '{url}': {e}")))
}

/// Map an SDK failure onto the core error taxonomy
fn classify<E, R>(err: SdkError<E, R>, subject: &str) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let code = err.as_service_error().and_then(|e| e.code()).map(str::to_owned);
    let message = DisplayErrorContext(&err).to_string();

    match code.as_deref() {
        Some(code) if NOT_FOUND_CODES.contains(&code) => Error::NotFound(subject.to_string()),
        Some(code) if AUTH_CODES.contains(&code) => Error::Auth(format!("{subject}: {code}")),
        _ => Error::Network(message),
    }
}

fn object_subject(bucket: &BucketRef, key: &str) -> String {
    format!("{bucket}/{key}")
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn namespace(&self) -> Result<String> {
        if self.namespace.is_empty() {
            return Err(Error::Connectivity("no namespace configured".into()));
        }
        Ok(self.namespace.clone())
    }

    async fn list_objects(&self, bucket: &BucketRef, options: ListOptions) -> Result<ListPage> {
        let mut request = self.inner.list_objects_v2().bucket(&bucket.bucket);

        if let Some(prefix) = options.prefix {
            request = request.prefix(prefix);
        }
        if let Some(max) = options.max_keys {
            request = request.max_keys(max);
        }
        if let Some(token) = options.start_with {
            request = request.continuation_token(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify(e, &bucket.to_string()))?;

        let entries = response
            .contents()
            .iter()
            .map(|object| {
                ObjectEntry::new(
                    object.key().unwrap_or_default(),
                    object.size().unwrap_or(0).max(0) as u64,
                )
            })
            .collect();

        let next_start_with = if response.is_truncated().unwrap_or(false) {
            response.next_continuation_token().map(str::to_owned)
        } else {
            None
        };

        Ok(ListPage {
            entries,
            next_start_with,
        })
    }

    async fn get_object(&self, bucket: &BucketRef, key: &str) -> Result<ObjectBody> {
        let response = self
            .inner
            .get_object()
            .bucket(&bucket.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify(e, &object_subject(bucket, key)))?;

        Ok(Box::new(response.body.into_async_read()))
    }

    async fn put_object(&self, bucket: &BucketRef, key: &str, path: &Path) -> Result<()> {
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| Error::General(format!("{}: {e}", path.display())))?;
        let content_type = mime_guess::from_path(path).first_or_octet_stream();

        self.inner
            .put_object()
            .bucket(&bucket.bucket)
            .key(key)
            .content_type(content_type.as_ref())
            .body(body)
            .send()
            .await
            .map_err(|e| classify(e, &object_subject(bucket, key)))?;

        Ok(())
    }

    async fn create_multipart_upload(&self, bucket: &BucketRef, key: &str) -> Result<String> {
        let response = self
            .inner
            .create_multipart_upload()
            .bucket(&bucket.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify(e, &object_subject(bucket, key)))?;

        response
            .upload_id()
            .map(str::to_owned)
            .ok_or_else(|| Error::General(format!("no upload id returned for {key}")))
    }

    async fn upload_part(
        &self,
        bucket: &BucketRef,
        key: &str,
        upload_id: &str,
        part_number: i32,
        path: &Path,
        range: Range<u64>,
    ) -> Result<CompletedPart> {
        let length = range.end - range.start;
        let body = ByteStream::read_from()
            .path(path)
            .offset(range.start)
            .length(Length::Exact(length))
            .buffer_size(PART_BUFFER_SIZE)
            .build()
            .await
            .map_err(|e| Error::General(format!("{}: {e}", path.display())))?;

        let response = self
            .inner
            .upload_part()
            .bucket(&bucket.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .content_length(length as i64)
            .body(body)
            .send()
            .await
            .map_err(|e| classify(e, &object_subject(bucket, key)))?;

        let etag = response
            .e_tag()
            .ok_or_else(|| Error::General(format!("no etag returned for part {part_number}")))?;

        Ok(CompletedPart {
            part_number,
            etag: etag.to_string(),
        })
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &BucketRef,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<()> {
        let parts = parts
            .into_iter()
            .map(|part| {
                S3CompletedPart::builder()
                    .part_number(part.part_number)
                    .e_tag(part.etag)
                    .build()
            })
            .collect();

        let upload = CompletedMultipartUpload::builder()
            .set_parts(Some(parts))
            .build();

        self.inner
            .complete_multipart_upload()
            .bucket(&bucket.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(upload)
            .send()
            .await
            .map_err(|e| classify(e, &object_subject(bucket, key)))?;

        Ok(())
    }

    async fn abort_multipart_upload(
        &self,
        bucket: &BucketRef,
        key: &str,
        upload_id: &str,
    ) -> Result<()> {
        self.inner
            .abort_multipart_upload()
            .bucket(&bucket.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| classify(e, &object_subject(bucket, key)))?;

        Ok(())
    }

    async fn delete_object(&self, bucket: &BucketRef, key: &str) -> Result<()> {
        // DeleteObject succeeds for missing keys, so check existence first
        if let Err(e) = self
            .inner
            .head_object()
            .bucket(&bucket.bucket)
            .key(key)
            .send()
            .await
        {
            if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                return Err(Error::NotFound(object_subject(bucket, key)));
            }
            return Err(classify(e, &object_subject(bucket, key)));
        }

        self.inner
            .delete_object()
            .bucket(&bucket.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify(e, &object_subject(bucket, key)))?;

        Ok(())
    }
}
