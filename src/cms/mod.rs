//! Modern Campus (OmniUpdate) CMS API client.
//!
//! - [`contract`]: the [`CmsApi`] trait and its request/response types
//! - [`client`]: the reqwest implementation
//! - [`token_cache`]: per-account session tokens
//! - [`page`], [`calendar`], [`gallery`]: operations built on [`CmsApi`]
//! - [`saga`]: named transaction steps and compensation policy

pub mod calendar;
pub mod client;
pub mod contract;
pub mod error;
pub mod gallery;
pub mod page;
pub mod saga;
pub mod token_cache;

pub use calendar::{calendar_events_url, get_all_calendar_entries};
pub use client::CmsClient;
pub use contract::{
    Check, CmsApi, ImageMetadata, ImageMetadataMap, ImageUpload, NewGalleryAsset, SessionToken,
};
#[cfg(any(test, feature = "test-export-mocks"))]
pub use contract::MockCmsApi;
pub use error::CmsError;
pub use gallery::{
    check_asset_in_or_out, get_asset, get_gallery_asset, transfer_gallery_asset,
    transfer_images_for_gallery_asset, Gallery, GalleryAsset, GalleryImage, ImageTransfer,
};
pub use page::{
    apply_directives, check_page_in_or_out, find_and_replace_all_in_page, EditOptions,
    FindAndReplace, Pattern,
};
pub use saga::{Compensation, Step};
pub use token_cache::TokenCache;
