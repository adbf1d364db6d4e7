//! Gallery assets: typed decoding of the vendor's node tree and the
//! cross-account transfer flows.
//!
//! `GET /assets/view` describes a gallery as nested `{tagName, childNodes}`
//! elements whose leaves are scalars:
//!
//! ```json
//! {"name": "Campus", "type": 1, "description": "", "tags": [{"tag": "quad"}],
//!  "gallery": {"childNodes": [
//!     {"tagName": "thumbnailWidth", "childNodes": [150]},
//!     {"tagName": "images", "childNodes": [
//!         {"tagName": "image", "staging_url": "https://…/a.jpg", "childNodes": [
//!             {"tagName": "title", "childNodes": ["Quad"]}]}]}]}}
//! ```
//!
//! [`GalleryAsset::from_json`] maps that into plain records and names the
//! missing node when the shape is not what we expect.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::contract::{
    Check, CmsApi, ImageMetadata, ImageMetadataMap, ImageUpload, NewGalleryAsset, SessionToken,
};
use super::error::{vendor_error, vendor_error_in_text};
use super::saga::{Compensation, Step};
use super::CmsError;

const THUMBNAIL_WIDTH: &str = "thumbnailWidth";
const THUMBNAIL_HEIGHT: &str = "thumbnailHeight";
const FORCE_CROP: &str = "forceCrop";
const IMAGES: &str = "images";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryAsset {
    pub name: String,
    pub asset_type: i64,
    pub description: String,
    pub tags: Vec<String>,
    pub gallery: Gallery,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gallery {
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
    pub force_crop: bool,
    /// `None` when the gallery has no `images` node at all.
    pub images: Option<Vec<GalleryImage>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryImage {
    pub staging_url: String,
    pub friendly_name: String,
    pub title: String,
    pub description: String,
    pub caption: String,
    pub link: String,
}

impl GalleryImage {
    pub fn metadata(&self) -> ImageMetadata {
        ImageMetadata {
            title: self.title.clone(),
            description: self.description.clone(),
            caption: self.caption.clone(),
            link: self.link.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Node {
    Element(Element),
    Leaf(Value),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Element {
    #[serde(default)]
    tag_name: String,
    #[serde(default)]
    child_nodes: Vec<Node>,
    #[serde(default, rename = "staging_url")]
    staging_url: Option<String>,
}

impl Element {
    fn elements(&self) -> impl Iterator<Item = &Element> {
        self.child_nodes.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Leaf(_) => None,
        })
    }

    fn find(&self, tag: &str) -> Option<&Element> {
        self.elements().find(|e| e.tag_name == tag)
    }

    /// First scalar child, rendered as text.
    fn text(&self) -> Option<String> {
        self.child_nodes.iter().find_map(|node| match node {
            Node::Leaf(value) => scalar_text(value),
            Node::Element(_) => None,
        })
    }

    fn text_of(&self, tag: &str) -> String {
        self.find(tag).and_then(Element::text).unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct RawAsset {
    name: String,
    #[serde(rename = "type")]
    asset_type: Value,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tags: Vec<RawTag>,
    gallery: Element,
}

#[derive(Debug, Deserialize)]
struct RawTag {
    tag: String,
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn required_text(gallery: &Element, tag: &str) -> Result<String, CmsError> {
    gallery
        .find(tag)
        .ok_or_else(|| CmsError::Decode(format!("gallery has no `{tag}` node")))?
        .text()
        .ok_or_else(|| CmsError::Decode(format!("gallery node `{tag}` has no value")))
}

fn dimension(gallery: &Element, tag: &str) -> Result<u32, CmsError> {
    let text = required_text(gallery, tag)?;
    text.trim()
        .parse()
        .map_err(|_| CmsError::Decode(format!("gallery node `{tag}` is not a dimension: {text:?}")))
}

fn flag(gallery: &Element, tag: &str) -> Result<bool, CmsError> {
    let text = required_text(gallery, tag)?;
    match text.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        other => Err(CmsError::Decode(format!(
            "gallery node `{tag}` is not a boolean: {other:?}"
        ))),
    }
}

fn decode_image(index: usize, image: &Element) -> Result<GalleryImage, CmsError> {
    let staging_url = image
        .staging_url
        .clone()
        .ok_or_else(|| CmsError::Decode(format!("image {index} has no `staging_url`")))?;
    Ok(GalleryImage {
        staging_url,
        friendly_name: image.text_of("friendlyName"),
        title: image.text_of("title"),
        description: image.text_of("description"),
        caption: image.text_of("caption"),
        link: image.text_of("link"),
    })
}

impl GalleryAsset {
    /// Decodes a `GET /assets/view` body.
    pub fn from_json(body: &str) -> Result<Self, CmsError> {
        let value: Value = serde_json::from_str(body)?;
        if let Some(message) = vendor_error(&value) {
            return Err(CmsError::Vendor(message));
        }
        let raw: RawAsset =
            serde_json::from_value(value).map_err(|e| CmsError::Decode(format!("asset: {e}")))?;

        let asset_type = match &raw.asset_type {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| {
            CmsError::Decode(format!("asset type is not an integer: {}", raw.asset_type))
        })?;

        let images = raw
            .gallery
            .find(IMAGES)
            .map(|node| {
                node.elements()
                    .enumerate()
                    .map(|(i, image)| decode_image(i, image))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        let gallery = Gallery {
            thumbnail_width: dimension(&raw.gallery, THUMBNAIL_WIDTH)?,
            thumbnail_height: dimension(&raw.gallery, THUMBNAIL_HEIGHT)?,
            force_crop: flag(&raw.gallery, FORCE_CROP)?,
            images,
        };

        Ok(GalleryAsset {
            name: raw.name,
            asset_type,
            description: raw.description.unwrap_or_default(),
            tags: raw.tags.into_iter().map(|t| t.tag).collect(),
            gallery,
        })
    }

    /// Creation request for a copy of this asset, with `extra_tag` appended.
    pub fn to_new_asset(&self, extra_tag: &str) -> NewGalleryAsset {
        let mut tags = self.tags.clone();
        tags.push(extra_tag.to_string());
        NewGalleryAsset {
            name: self.name.clone(),
            asset_type: self.asset_type,
            description: self.description.clone(),
            tags,
            thumbnail_height: self.gallery.thumbnail_height,
            thumbnail_width: self.gallery.thumbnail_width,
            force_crop: self.gallery.force_crop,
        }
    }
}

/// Raw `GET /assets/view` body.
pub async fn get_asset<A>(
    api: &A,
    token: &SessionToken,
    site: &str,
    asset: i64,
) -> Result<String, CmsError>
where
    A: CmsApi + ?Sized,
{
    api.view_asset(token, site, asset).await
}

/// Fetches and decodes a gallery asset.
pub async fn get_gallery_asset<A>(
    api: &A,
    token: &SessionToken,
    site: &str,
    asset: i64,
) -> Result<GalleryAsset, CmsError>
where
    A: CmsApi + ?Sized,
{
    let body = get_asset(api, token, site, asset).await?;
    GalleryAsset::from_json(&body)
}

/// Checks an asset out or in and returns the vendor's raw response.
pub async fn check_asset_in_or_out<A>(
    api: &A,
    token: &SessionToken,
    site: &str,
    asset: i64,
    action: Check,
) -> Result<String, CmsError>
where
    A: CmsApi + ?Sized,
{
    api.check_asset(token, site, asset, action).await
}

/// Recreates gallery asset `asset` of `site` on the destination account.
///
/// The copy keeps name, type, description, thumbnail settings and tags, plus
/// `default_tag`. Images are not copied; see [`transfer_images_for_gallery_asset`].
/// Returns the new asset id.
pub async fn transfer_gallery_asset<A>(
    api: &A,
    asset: i64,
    destination_token: &SessionToken,
    source_token: &SessionToken,
    site: &str,
    default_tag: &str,
) -> Result<i64, CmsError>
where
    A: CmsApi + ?Sized,
{
    info!(asset = asset, site = site, "[CMS][GALLERY] Transferring gallery asset");
    let source = get_gallery_asset(api, source_token, site, asset).await?;
    let new_asset = source.to_new_asset(default_tag);
    debug!(?new_asset, "[CMS][GALLERY] Creating destination asset");

    let response = api.new_asset(destination_token, site, &new_asset).await?;
    if let Some(message) = vendor_error(&response) {
        error!(asset = asset, error = %message, "[CMS][GALLERY][ERROR] Asset creation refused");
        return Err(CmsError::Vendor(format!("Error creating asset: {message}")));
    }
    if let Some(warnings) = response.get("warnings").filter(|w| !w.is_null()) {
        warn!(asset = asset, warnings = %warnings, "[CMS][GALLERY] Asset created with warnings");
    }

    let new_id = response
        .get("asset")
        .and_then(|id| id.as_i64().or_else(|| id.as_str()?.parse().ok()))
        .ok_or(CmsError::MissingField("asset"))?;
    info!(asset = asset, new_asset = new_id, "[CMS][GALLERY] Destination asset created");
    Ok(new_id)
}

/// Where images are copied from and to.
#[derive(Debug, Clone, Copy)]
pub struct ImageTransfer<'a> {
    pub source_token: &'a SessionToken,
    pub source_site: &'a str,
    pub source_asset: i64,
    pub destination_token: &'a SessionToken,
    pub destination_site: &'a str,
    pub destination_asset: i64,
}

/// Copies every image of the source gallery into the destination gallery.
///
/// The destination asset is checked out for the whole run. Each image is
/// downloaded from its staging URL, uploaded, and then given its title,
/// description, caption and link under the name the vendor assigned. Returns
/// the assigned names in upload order.
pub async fn transfer_images_for_gallery_asset<A>(
    api: &A,
    transfer: ImageTransfer<'_>,
    compensation: Compensation,
) -> Result<Vec<String>, CmsError>
where
    A: CmsApi + ?Sized,
{
    let ImageTransfer {
        destination_token,
        destination_site,
        destination_asset,
        ..
    } = transfer;
    info!(
        source_site = transfer.source_site,
        source_asset = transfer.source_asset,
        destination_site = destination_site,
        destination_asset = destination_asset,
        "[CMS][GALLERY] Transferring images"
    );

    let checkout = check_asset_in_or_out(
        api,
        destination_token,
        destination_site,
        destination_asset,
        Check::Out,
    )
    .await
    .map_err(|e| CmsError::aborted(Step::CheckoutAsset, false, e))?;
    if let Some(message) = vendor_error_in_text(&checkout) {
        return Err(CmsError::aborted(
            Step::CheckoutAsset,
            false,
            CmsError::Vendor(message),
        ));
    }

    match copy_images(api, &transfer).await {
        Ok(names) => {
            check_asset_in_or_out(
                api,
                destination_token,
                destination_site,
                destination_asset,
                Check::In,
            )
            .await
            .map_err(|e| CmsError::aborted(Step::CheckinAsset, false, e))?;
            info!(images = names.len(), "[CMS][GALLERY] Images transferred, asset checked in");
            Ok(names)
        }
        Err((step, e)) => {
            error!(step = %step, error = %e, "[CMS][GALLERY][ERROR] Image transfer failed");
            let released = match compensation {
                Compensation::ReleaseLock => {
                    release_asset(api, destination_token, destination_site, destination_asset).await
                }
                Compensation::LeaveCheckedOut => false,
            };
            Err(CmsError::aborted(step, released, e))
        }
    }
}

async fn copy_images<A>(api: &A, t: &ImageTransfer<'_>) -> Result<Vec<String>, (Step, CmsError)>
where
    A: CmsApi + ?Sized,
{
    let source = get_gallery_asset(api, t.source_token, t.source_site, t.source_asset)
        .await
        .map_err(|e| (Step::FetchAsset, e))?;
    let images = source.gallery.images.as_deref().ok_or_else(|| {
        (
            Step::FetchAsset,
            CmsError::Decode(format!("gallery has no `{IMAGES}` node")),
        )
    })?;

    let mut names = Vec::with_capacity(images.len());
    for image in images {
        debug!(
            url = %image.staging_url,
            file = %image.friendly_name,
            "[CMS][GALLERY] Copying image"
        );
        let bytes = api
            .download(&image.staging_url)
            .await
            .map_err(|e| (Step::DownloadImage, e))?;

        let upload = ImageUpload {
            file_name: image.friendly_name.clone(),
            title: image.title.clone(),
            thumb_width: source.gallery.thumbnail_width,
            thumb_height: source.gallery.thumbnail_height,
            bytes,
        };
        let response = api
            .add_image(t.destination_token, t.destination_site, t.destination_asset, &upload)
            .await
            .map_err(|e| (Step::UploadImage, e))?;
        let name = response
            .get("image")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or((Step::UploadImage, CmsError::MissingField("image")))?;

        let metadata: ImageMetadataMap = [(name.clone(), image.metadata())].into_iter().collect();
        let saved = api
            .save_asset_images(
                t.destination_token,
                t.destination_site,
                t.destination_asset,
                &metadata,
            )
            .await
            .map_err(|e| (Step::SaveImageMetadata, e))?;
        if let Some(message) = vendor_error_in_text(&saved) {
            return Err((Step::SaveImageMetadata, CmsError::Vendor(message)));
        }
        names.push(name);
    }
    Ok(names)
}

async fn release_asset<A>(api: &A, token: &SessionToken, site: &str, asset: i64) -> bool
where
    A: CmsApi + ?Sized,
{
    match check_asset_in_or_out(api, token, site, asset, Check::In).await {
        Ok(_) => true,
        Err(e) => {
            error!(
                site = site,
                asset = asset,
                error = %e,
                "[CMS][GALLERY][ERROR] Compensating checkin failed"
            );
            false
        }
    }
}
