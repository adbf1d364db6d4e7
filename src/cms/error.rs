use thiserror::Error;

use super::saga::Step;

#[derive(Error, Debug)]
pub enum CmsError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The vendor answered with an `error` field.
    #[error("{0}")]
    Vendor(String),

    #[error("Find string \"{0}\" isn't found in the page")]
    FindNotFound(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("response is missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// A multi-step transaction stopped at `step`. `released` tells whether the
    /// compensating checkin went through.
    #[error("{step} failed (lock released: {released}): {source}")]
    Aborted {
        step: Step,
        released: bool,
        #[source]
        source: Box<CmsError>,
    },
}

impl CmsError {
    pub(crate) fn aborted(step: Step, released: bool, source: CmsError) -> Self {
        CmsError::Aborted {
            step,
            released,
            source: Box::new(source),
        }
    }

    /// The innermost error, looking through any [`CmsError::Aborted`] wrapper.
    pub fn root(&self) -> &CmsError {
        match self {
            CmsError::Aborted { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Returns the vendor's message if `value` is an object carrying an `error` field.
pub fn vendor_error(value: &serde_json::Value) -> Option<String> {
    let error = value.as_object()?.get("error")?;
    Some(match error {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// Like [`vendor_error`] for raw text bodies. Non-JSON text is never an error.
pub fn vendor_error_in_text(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| vendor_error(&v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_error_field() {
        assert_eq!(
            vendor_error(&json!({"error": "locked by jdoe"})).as_deref(),
            Some("locked by jdoe")
        );
        assert_eq!(
            vendor_error(&json!({"error": {"code": 3}})).as_deref(),
            Some("{\"code\":3}")
        );
        assert_eq!(vendor_error(&json!({"asset": 12})), None);
        assert_eq!(vendor_error(&json!(["error"])), None);
    }

    #[test]
    fn plain_text_is_not_an_error() {
        assert_eq!(vendor_error_in_text("OK"), None);
        assert_eq!(vendor_error_in_text(""), None);
        assert_eq!(
            vendor_error_in_text(r#"{"error":"nope"}"#).as_deref(),
            Some("nope")
        );
    }

    #[test]
    fn root_unwraps_nested_aborts() {
        let err = CmsError::aborted(
            Step::SavePage,
            true,
            CmsError::Vendor("disk full".into()),
        );
        assert!(matches!(err.root(), CmsError::Vendor(m) if m == "disk full"));
        assert!(err.to_string().starts_with("save page failed"));
    }
}
