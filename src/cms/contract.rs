//! # contract: the vendor API seam
//!
//! [`CmsApi`] has one async method per CMS endpoint the crate uses. The
//! transactions in this crate are written against the trait only:
//! - [`CmsClient`](crate::cms::CmsClient) implements it over HTTP with reqwest.
//! - `MockCmsApi` (generated by `mockall`, exported under the `test-export-mocks`
//!   feature) implements it for tests.
//!
//! Methods that the vendor answers with plain text return the body verbatim.
//! Methods that return JSON either extract the interesting field or hand back
//! the parsed [`serde_json::Value`] for the caller to inspect.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use super::CmsError;

/// Vendor session token, sent as `X-Auth-Token`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

/// Lock action on a page or asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    In,
    Out,
}

impl Check {
    /// Endpoint suffix: `checkin` or `checkout`.
    pub fn as_str(self) -> &'static str {
        match self {
            Check::In => "checkin",
            Check::Out => "checkout",
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata for `POST /assets/new`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGalleryAsset {
    pub name: String,
    pub asset_type: i64,
    pub description: String,
    pub tags: Vec<String>,
    pub thumbnail_height: u32,
    pub thumbnail_width: u32,
    pub force_crop: bool,
}

/// One image for `POST /assets/add_image`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub title: String,
    pub thumb_width: u32,
    pub thumb_height: u32,
    pub bytes: Vec<u8>,
}

/// Per-image attributes for `POST /assets/save`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageMetadata {
    pub title: String,
    pub description: String,
    pub caption: String,
    pub link: String,
}

/// Image attributes keyed by the image name the vendor assigned on upload.
pub type ImageMetadataMap = BTreeMap<String, ImageMetadata>;

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CmsApi: Send + Sync {
    /// `POST /authentication/login`; returns the `gadget_token`.
    async fn login(
        &self,
        account: &str,
        username: &str,
        password: &str,
    ) -> Result<SessionToken, CmsError>;

    /// `POST /files/checkout` or `/files/checkin`; raw response text.
    async fn check_page(
        &self,
        token: &SessionToken,
        site: &str,
        path: &str,
        action: Check,
    ) -> Result<String, CmsError>;

    /// `GET /files/source`; the page's `source` field.
    async fn page_source(
        &self,
        token: &SessionToken,
        site: &str,
        path: &str,
    ) -> Result<String, CmsError>;

    /// `POST /files/save` with `wysiwyg=false`; raw response text.
    async fn save_page(
        &self,
        token: &SessionToken,
        site: &str,
        path: &str,
        source: &str,
    ) -> Result<String, CmsError>;

    /// `GET /rs/calendars/{site}/events`; raw response text.
    async fn calendar_events(
        &self,
        token: &SessionToken,
        site: &str,
        categories: &[String],
    ) -> Result<String, CmsError>;

    /// `GET /assets/view`; raw response text.
    async fn view_asset(
        &self,
        token: &SessionToken,
        site: &str,
        asset: i64,
    ) -> Result<String, CmsError>;

    /// `POST /assets/new`; the parsed response (`{asset, warnings}` or `{error}`).
    async fn new_asset(
        &self,
        token: &SessionToken,
        site: &str,
        asset: &NewGalleryAsset,
    ) -> Result<serde_json::Value, CmsError>;

    /// `POST /assets/checkout` or `/assets/checkin`; raw response text.
    async fn check_asset(
        &self,
        token: &SessionToken,
        site: &str,
        asset: i64,
        action: Check,
    ) -> Result<String, CmsError>;

    /// Plain unauthenticated GET of a vendor staging URL.
    async fn download(&self, url: &str) -> Result<Vec<u8>, CmsError>;

    /// Multipart `POST /assets/add_image`; the parsed response (`{image}`).
    async fn add_image(
        &self,
        token: &SessionToken,
        site: &str,
        asset: i64,
        upload: &ImageUpload,
    ) -> Result<serde_json::Value, CmsError>;

    /// `POST /assets/save` with the JSON-encoded `images` map; raw response text.
    async fn save_asset_images(
        &self,
        token: &SessionToken,
        site: &str,
        asset: i64,
        images: &ImageMetadataMap,
    ) -> Result<String, CmsError>;
}
