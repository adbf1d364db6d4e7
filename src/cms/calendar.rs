use reqwest::Url;
use tracing::{debug, info};

use super::contract::{CmsApi, SessionToken};
use super::CmsError;

/// `{base}/rs/calendars/{site}/events`, plus one `category` pair per category
/// in the given order. No categories means no query string at all.
pub fn calendar_events_url(
    base_url: &str,
    site: &str,
    categories: &[String],
) -> Result<Url, CmsError> {
    let mut url = Url::parse(base_url.trim_end_matches('/'))
        .map_err(|e| CmsError::InvalidUrl(format!("{base_url}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| CmsError::InvalidUrl(format!("{base_url}: cannot be a base")))?
        .pop_if_empty()
        .extend(["rs", "calendars", site, "events"]);

    if !categories.is_empty() {
        let mut query = url.query_pairs_mut();
        for category in categories {
            query.append_pair("category", category);
        }
    }
    Ok(url)
}

/// Every event of `site`'s calendar, optionally filtered by category, as raw text.
///
/// The vendor returns the whole result set in one response.
pub async fn get_all_calendar_entries<A>(
    api: &A,
    token: &SessionToken,
    site: &str,
    categories: &[String],
) -> Result<String, CmsError>
where
    A: CmsApi + ?Sized,
{
    debug!(site = site, categories = ?categories, "[CMS][CALENDAR] Fetching events");
    let events = api.calendar_events(token, site, categories).await?;
    info!(site = site, bytes = events.len(), "[CMS][CALENDAR] Events fetched");
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://a.cms.omniupdate.com";

    #[test]
    fn no_categories_means_no_query() {
        let url = calendar_events_url(BASE, "main", &[]).unwrap();
        assert_eq!(url.as_str(), "https://a.cms.omniupdate.com/rs/calendars/main/events");
        assert_eq!(url.query(), None);
    }

    #[test]
    fn categories_repeat_in_order() {
        let categories = vec!["Sports".to_string(), "Arts & Culture".to_string()];
        let url = calendar_events_url(BASE, "main", &categories).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("category".to_string(), "Sports".to_string()),
                ("category".to_string(), "Arts & Culture".to_string()),
            ]
        );
    }

    #[test]
    fn site_is_a_single_escaped_segment() {
        let url = calendar_events_url(BASE, "my site/x", &[]).unwrap();
        assert_eq!(url.path(), "/rs/calendars/my%20site%2Fx/events");
    }
}
