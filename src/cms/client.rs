//! reqwest implementation of [`CmsApi`].

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::calendar::calendar_events_url;
use super::contract::{
    Check, CmsApi, ImageMetadataMap, ImageUpload, NewGalleryAsset, SessionToken,
};
use super::error::vendor_error;
use super::CmsError;
use crate::config::CmsConfig;

pub const AUTH_HEADER: &str = "X-Auth-Token";
const LOGIN_SKIN: &str = "oucampus";

/// HTTP client for one CMS host. Holds no session state; tokens are passed per call.
#[derive(Debug, Clone)]
pub struct CmsClient {
    http: Client,
    base_url: String,
}

impl CmsClient {
    pub fn new(config: &CmsConfig) -> Result<Self, CmsError> {
        let http = Client::builder().timeout(config.timeout()).build()?;
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| CmsError::InvalidUrl(format!("{base_url}: {e}")))?;
        info!(base_url = %base_url, timeout_secs = config.timeout_secs, "[CMS] Client configured");
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authed(&self, request: RequestBuilder, token: &SessionToken) -> RequestBuilder {
        request.header(AUTH_HEADER, token.as_str())
    }
}

async fn text(response: Response, endpoint: &str) -> Result<String, CmsError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        warn!(
            status = %status,
            endpoint = endpoint,
            "[CMS] Non-success status, returning body as-is"
        );
    }
    Ok(body)
}

/// Parses a JSON body and turns a vendor `error` field into [`CmsError::Vendor`].
async fn json(response: Response, endpoint: &str) -> Result<Value, CmsError> {
    let body = text(response, endpoint).await?;
    let value: Value = serde_json::from_str(&body)?;
    if let Some(message) = vendor_error(&value) {
        warn!(endpoint = endpoint, error = %message, "[CMS] Vendor reported an error");
        return Err(CmsError::Vendor(message));
    }
    Ok(value)
}

#[async_trait]
impl CmsApi for CmsClient {
    async fn login(
        &self,
        account: &str,
        username: &str,
        password: &str,
    ) -> Result<SessionToken, CmsError> {
        debug!(account = account, username = username, "[CMS] Authenticating");
        let form = [
            ("skin", LOGIN_SKIN),
            ("account", account),
            ("username", username),
            ("password", password),
        ];
        let response = self
            .http
            .post(self.endpoint("authentication/login"))
            .form(&form)
            .send()
            .await?;
        let value = json(response, "authentication/login").await?;
        value
            .get("gadget_token")
            .and_then(Value::as_str)
            .map(SessionToken::new)
            .ok_or(CmsError::MissingField("gadget_token"))
    }

    async fn check_page(
        &self,
        token: &SessionToken,
        site: &str,
        path: &str,
        action: Check,
    ) -> Result<String, CmsError> {
        let endpoint = format!("files/{action}");
        debug!(site = site, path = path, action = %action, "[CMS] Page lock");
        let request = self
            .http
            .post(self.endpoint(&endpoint))
            .form(&[("site", site), ("path", path)]);
        let response = self.authed(request, token).send().await?;
        text(response, &endpoint).await
    }

    async fn page_source(
        &self,
        token: &SessionToken,
        site: &str,
        path: &str,
    ) -> Result<String, CmsError> {
        let request = self
            .http
            .get(self.endpoint("files/source"))
            .query(&[("site", site), ("path", path)]);
        let response = self.authed(request, token).send().await?;
        let value = json(response, "files/source").await?;
        value
            .get("source")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or(CmsError::MissingField("source"))
    }

    async fn save_page(
        &self,
        token: &SessionToken,
        site: &str,
        path: &str,
        source: &str,
    ) -> Result<String, CmsError> {
        let form = [
            ("site", site),
            ("path", path),
            ("wysiwyg", "false"),
            ("text", source),
        ];
        let request = self.http.post(self.endpoint("files/save")).form(&form);
        let response = self.authed(request, token).send().await?;
        text(response, "files/save").await
    }

    async fn calendar_events(
        &self,
        token: &SessionToken,
        site: &str,
        categories: &[String],
    ) -> Result<String, CmsError> {
        let url = calendar_events_url(&self.base_url, site, categories)?;
        debug!(url = %url, "[CMS] Fetching calendar events");
        let response = self.authed(self.http.get(url), token).send().await?;
        text(response, "rs/calendars").await
    }

    async fn view_asset(
        &self,
        token: &SessionToken,
        site: &str,
        asset: i64,
    ) -> Result<String, CmsError> {
        let asset = asset.to_string();
        let request = self
            .http
            .get(self.endpoint("assets/view"))
            .query(&[("asset", asset.as_str()), ("site", site)]);
        let response = self.authed(request, token).send().await?;
        text(response, "assets/view").await
    }

    async fn new_asset(
        &self,
        token: &SessionToken,
        site: &str,
        asset: &NewGalleryAsset,
    ) -> Result<Value, CmsError> {
        let mut form: Vec<(&str, String)> = vec![
            ("name", asset.name.clone()),
            ("site", site.to_string()),
            ("type", asset.asset_type.to_string()),
            ("description", asset.description.clone()),
            ("site_locked", "true".to_string()),
            ("thumbnail_height", asset.thumbnail_height.to_string()),
            ("thumbnail_width", asset.thumbnail_width.to_string()),
            ("force_crop", asset.force_crop.to_string()),
        ];
        form.extend(asset.tags.iter().map(|tag| ("tags", tag.clone())));

        let request = self.http.post(self.endpoint("assets/new")).form(&form);
        let response = self.authed(request, token).send().await?;
        // The caller inspects `error` itself so it can phrase the failure.
        let body = text(response, "assets/new").await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn check_asset(
        &self,
        token: &SessionToken,
        site: &str,
        asset: i64,
        action: Check,
    ) -> Result<String, CmsError> {
        let endpoint = format!("assets/{action}");
        let asset = asset.to_string();
        let request = self
            .http
            .post(self.endpoint(&endpoint))
            .form(&[("asset", asset.as_str()), ("site", site)]);
        let response = self.authed(request, token).send().await?;
        text(response, &endpoint).await
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, CmsError> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn add_image(
        &self,
        token: &SessionToken,
        site: &str,
        asset: i64,
        upload: &ImageUpload,
    ) -> Result<Value, CmsError> {
        let query = [
            ("site", site.to_string()),
            ("asset", asset.to_string()),
            ("thumb_width", upload.thumb_width.to_string()),
            ("thumb_height", upload.thumb_height.to_string()),
            ("title", upload.title.clone()),
        ];
        let image = Part::bytes(upload.bytes.clone()).file_name(upload.file_name.clone());
        let form = Form::new()
            .part("image", image)
            .text("title", upload.title.clone());

        let request = self
            .http
            .post(self.endpoint("assets/add_image"))
            .query(&query)
            .multipart(form);
        let response = self.authed(request, token).send().await?;
        json(response, "assets/add_image").await
    }

    async fn save_asset_images(
        &self,
        token: &SessionToken,
        site: &str,
        asset: i64,
        images: &ImageMetadataMap,
    ) -> Result<String, CmsError> {
        let form = [
            ("asset", asset.to_string()),
            ("site", site.to_string()),
            ("images", serde_json::to_string(images)?),
        ];
        let request = self.http.post(self.endpoint("assets/save")).form(&form);
        let response = self.authed(request, token).send().await?;
        text(response, "assets/save").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed_from_base_url() {
        let config = CmsConfig {
            base_url: "https://cms.example.edu/".to_string(),
            ..CmsConfig::default()
        };
        let client = CmsClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "https://cms.example.edu");
        assert_eq!(
            client.endpoint("files/save"),
            "https://cms.example.edu/files/save"
        );
    }

    #[test]
    fn rejects_unparseable_base_url() {
        let config = CmsConfig {
            base_url: "not a url".to_string(),
            ..CmsConfig::default()
        };
        assert!(matches!(
            CmsClient::new(&config),
            Err(CmsError::InvalidUrl(_))
        ));
    }
}
