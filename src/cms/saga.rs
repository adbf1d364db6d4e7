//! Named steps of the checkout → modify → checkin transactions.
//!
//! Each transaction in [`crate::cms::page`] and [`crate::cms::gallery`] holds a
//! vendor lock (a checked-out page or asset) between its first and last step.
//! When an intermediate step fails, the transaction runs its compensating
//! action according to [`Compensation`] and reports the failing [`Step`] in
//! [`CmsError::Aborted`](crate::cms::CmsError::Aborted).

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    CheckoutPage,
    FetchSource,
    ApplyDirectives,
    SavePage,
    CheckinPage,
    CheckoutAsset,
    FetchAsset,
    DownloadImage,
    UploadImage,
    SaveImageMetadata,
    CheckinAsset,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Step::CheckoutPage => "checkout page",
            Step::FetchSource => "fetch source",
            Step::ApplyDirectives => "apply directives",
            Step::SavePage => "save page",
            Step::CheckinPage => "checkin page",
            Step::CheckoutAsset => "checkout asset",
            Step::FetchAsset => "fetch asset",
            Step::DownloadImage => "download image",
            Step::UploadImage => "upload image",
            Step::SaveImageMetadata => "save image metadata",
            Step::CheckinAsset => "checkin asset",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do with a held lock when a later step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compensation {
    /// Issue a checkin before returning the error.
    #[default]
    ReleaseLock,
    /// Return the error and leave the resource checked out.
    LeaveCheckedOut,
}
