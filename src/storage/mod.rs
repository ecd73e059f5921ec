//! Media host module
//!
//! Handles:
//! - Avatar decoding from `data:` URIs
//! - Media file upload (Cloudflare R2, public bucket)

pub mod avatar;
mod media;

pub use avatar::AvatarImage;
pub use media::MediaStorage;

use axum::async_trait;

use crate::error::AppError;

/// External image host
///
/// Stores bytes under a key and hands back the public HTTPS URL
/// clients should use to fetch them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaHost: Send + Sync {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: &str)
    -> Result<String, AppError>;
}

pub(crate) fn build_r2_http_client() -> aws_sdk_s3::config::SharedHttpClient {
    use aws_smithy_runtime::client::http::hyper_014::HyperClientBuilder;

    let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_only()
        .enable_http1()
        .enable_http2()
        .build();

    HyperClientBuilder::new().build(https_connector)
}
