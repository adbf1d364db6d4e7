//! Page lock and source find-and-replace.

use std::fmt;

use regex::Regex;
use tracing::{debug, error, info, warn};

use super::contract::{Check, CmsApi, SessionToken};
use super::error::vendor_error_in_text;
use super::saga::{Compensation, Step};
use super::CmsError;

/// What a directive looks for.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Every literal occurrence. An empty pattern matches at every character
    /// boundary, so `"abc"` with `""` -> `"-"` becomes `"-a-b-c-"`.
    Literal(String),
    /// Every match. Replacements reference groups as `$1` or `$name`; a group
    /// followed by a letter, digit or `_` needs braces, as in `${1}x`, since
    /// `$1x` names a group called `1x`.
    Regex(Regex),
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Literal(s) => f.write_str(s),
            Pattern::Regex(re) => write!(f, "/{}/g", re.as_str()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FindAndReplace {
    pub find: Pattern,
    pub replace: String,
}

impl FindAndReplace {
    pub fn literal(find: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            find: Pattern::Literal(find.into()),
            replace: replace.into(),
        }
    }

    pub fn regex(pattern: &str, replace: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            find: Pattern::Regex(Regex::new(pattern)?),
            replace: replace.into(),
        })
    }

    /// Replaces every occurrence in `source`.
    pub fn apply(&self, source: &str) -> String {
        match &self.find {
            Pattern::Literal(find) => source.replace(find.as_str(), &self.replace),
            Pattern::Regex(re) => re.replace_all(source, self.replace.as_str()).into_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EditOptions {
    /// Fail when a directive leaves the text unchanged.
    pub error_out: bool,
    pub compensation: Compensation,
}

impl Default for EditOptions {
    fn default() -> Self {
        Self {
            error_out: true,
            compensation: Compensation::default(),
        }
    }
}

/// Applies `directives` in order, each one to the previous one's output.
pub fn apply_directives(
    source: &str,
    directives: &[FindAndReplace],
    error_out: bool,
) -> Result<String, CmsError> {
    let mut source = source.to_string();
    for directive in directives {
        let replaced = directive.apply(&source);
        if replaced == source {
            if error_out {
                return Err(CmsError::FindNotFound(directive.find.to_string()));
            }
            debug!(find = %directive.find, "[CMS][PAGE] Directive matched nothing, continuing");
        }
        source = replaced;
    }
    Ok(source)
}

/// Checks a page out or in and returns the vendor's raw response.
pub async fn check_page_in_or_out<A>(
    api: &A,
    token: &SessionToken,
    site: &str,
    path: &str,
    action: Check,
) -> Result<String, CmsError>
where
    A: CmsApi + ?Sized,
{
    api.check_page(token, site, path, action).await
}

/// Checkout, fetch source, apply `directives`, save, checkin.
///
/// Returns the raw save response. A failure after checkout is reported as
/// [`CmsError::Aborted`] naming the failed step; with
/// [`Compensation::ReleaseLock`] the page is checked back in first.
pub async fn find_and_replace_all_in_page<A>(
    api: &A,
    token: &SessionToken,
    site: &str,
    path: &str,
    directives: &[FindAndReplace],
    options: EditOptions,
) -> Result<String, CmsError>
where
    A: CmsApi + ?Sized,
{
    info!(
        site = site,
        path = path,
        directives = directives.len(),
        "[CMS][PAGE] Starting find-and-replace"
    );

    let checkout = check_page_in_or_out(api, token, site, path, Check::Out)
        .await
        .map_err(|e| CmsError::aborted(Step::CheckoutPage, false, e))?;
    if let Some(message) = vendor_error_in_text(&checkout) {
        error!(site = site, path = path, error = %message, "[CMS][PAGE][ERROR] Checkout refused");
        return Err(CmsError::aborted(
            Step::CheckoutPage,
            false,
            CmsError::Vendor(message),
        ));
    }

    match edit_checked_out(api, token, site, path, directives, options.error_out).await {
        Ok(saved) => {
            check_page_in_or_out(api, token, site, path, Check::In)
                .await
                .map_err(|e| CmsError::aborted(Step::CheckinPage, false, e))?;
            info!(site = site, path = path, "[CMS][PAGE] Saved and checked in");
            Ok(saved)
        }
        Err((step, e)) => {
            error!(
                site = site,
                path = path,
                step = %step,
                error = %e,
                "[CMS][PAGE][ERROR] Transaction failed"
            );
            let released = match options.compensation {
                Compensation::ReleaseLock => release_page(api, token, site, path).await,
                Compensation::LeaveCheckedOut => {
                    warn!(site = site, path = path, "[CMS][PAGE] Leaving page checked out");
                    false
                }
            };
            Err(CmsError::aborted(step, released, e))
        }
    }
}

async fn edit_checked_out<A>(
    api: &A,
    token: &SessionToken,
    site: &str,
    path: &str,
    directives: &[FindAndReplace],
    error_out: bool,
) -> Result<String, (Step, CmsError)>
where
    A: CmsApi + ?Sized,
{
    let source = api
        .page_source(token, site, path)
        .await
        .map_err(|e| (Step::FetchSource, e))?;

    let edited =
        apply_directives(&source, directives, error_out).map_err(|e| (Step::ApplyDirectives, e))?;

    let saved = api
        .save_page(token, site, path, &edited)
        .await
        .map_err(|e| (Step::SavePage, e))?;
    if let Some(message) = vendor_error_in_text(&saved) {
        return Err((Step::SavePage, CmsError::Vendor(message)));
    }
    Ok(saved)
}

/// Compensating checkin. Failures are logged, never raised.
async fn release_page<A>(api: &A, token: &SessionToken, site: &str, path: &str) -> bool
where
    A: CmsApi + ?Sized,
{
    match check_page_in_or_out(api, token, site, path, Check::In).await {
        Ok(_) => {
            info!(site = site, path = path, "[CMS][PAGE] Compensating checkin done");
            true
        }
        Err(e) => {
            error!(
                site = site,
                path = path,
                error = %e,
                "[CMS][PAGE][ERROR] Compensating checkin failed"
            );
            false
        }
    }
}
