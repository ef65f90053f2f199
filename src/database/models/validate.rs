use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// A payload field that is missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn required(field: &str) -> Self {
        Self {
            field: field.to_string(),
            message: format!("{} is required", field),
        }
    }

    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Trimmed, non-empty text for a field required on create.
pub fn required_text(field: &str, value: Option<String>) -> Result<String, ValidationError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::required(field)),
    }
}

/// On update a required field may be omitted but not blanked.
pub fn non_empty_text(field: &str, value: Option<String>) -> Result<Option<String>, ValidationError> {
    match value {
        None => Ok(None),
        Some(v) => {
            let trimmed = v.trim().to_string();
            if trimmed.is_empty() {
                Err(ValidationError::invalid(field, format!("{} cannot be empty", field)))
            } else {
                Ok(Some(trimmed))
            }
        }
    }
}

/// Optional text where an empty string means "not provided".
pub fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Absolute http(s) URL.
pub fn url(field: &str, value: Option<String>) -> Result<Option<String>, ValidationError> {
    let Some(value) = optional_text(value) else {
        return Ok(None);
    };
    match url::Url::parse(&value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(Some(value)),
        _ => Err(ValidationError::invalid(field, format!("{} must be a valid URL", field))),
    }
}

/// On update a required URL may be omitted but not blanked.
pub fn non_empty_url(field: &str, value: Option<String>) -> Result<Option<String>, ValidationError> {
    match value {
        Some(v) if v.trim().is_empty() => {
            Err(ValidationError::invalid(field, format!("{} cannot be empty", field)))
        }
        other => url(field, other),
    }
}

/// Update value for a nullable URL column. Absent leaves the column alone;
/// `null` or `""` clears it.
pub fn clearable_url(
    field: &str,
    value: Option<Option<String>>,
) -> Result<Option<Option<String>>, ValidationError> {
    value.map(|inner| url(field, inner)).transpose()
}

/// `deserialize_with` for update fields that can be cleared: a missing key
/// stays `None` (with `#[serde(default)]`), an explicit `null` becomes `Some(None)`.
pub fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub fn required_url(field: &str, value: Option<String>) -> Result<String, ValidationError> {
    url(field, value)?.ok_or_else(|| ValidationError::required(field))
}

pub fn email(field: &str, value: Option<String>) -> Result<Option<String>, ValidationError> {
    let Some(value) = optional_text(value) else {
        return Ok(None);
    };
    let value = value.to_lowercase();
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(Some(value))
    } else {
        Err(ValidationError::invalid(field, format!("{} must be a valid email address", field)))
    }
}

pub fn required_email(field: &str, value: Option<String>) -> Result<String, ValidationError> {
    email(field, value)?.ok_or_else(|| ValidationError::required(field))
}

/// Trims entries and drops blanks, keeping order.
pub fn string_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_trims_and_rejects_blank() {
        assert_eq!(required_text("title", Some("  T  ".into())).unwrap(), "T");
        assert_eq!(required_text("title", Some("   ".into())), Err(ValidationError::required("title")));
        assert_eq!(required_text("title", None), Err(ValidationError::required("title")));
    }

    #[test]
    fn non_empty_text_allows_absent() {
        assert_eq!(non_empty_text("name", None).unwrap(), None);
        assert!(non_empty_text("name", Some("".into())).is_err());
    }

    #[test]
    fn url_checks_scheme() {
        assert_eq!(
            url("image", Some("https://cdn.example.com/a.png".into())).unwrap().as_deref(),
            Some("https://cdn.example.com/a.png")
        );
        assert!(url("image", Some("ftp://example.com/a".into())).is_err());
        assert!(url("image", Some("not a url".into())).is_err());
        assert_eq!(url("image", Some("".into())).unwrap(), None);
        assert!(required_url("image", None).is_err());
    }

    #[test]
    fn clearing_urls_on_update() {
        assert_eq!(clearable_url("url", None).unwrap(), None);
        assert_eq!(clearable_url("url", Some(None)).unwrap(), Some(None));
        assert_eq!(clearable_url("url", Some(Some("  ".into()))).unwrap(), Some(None));
        assert_eq!(
            clearable_url("url", Some(Some("https://cdn.example.com/a.png".into()))).unwrap(),
            Some(Some("https://cdn.example.com/a.png".to_string()))
        );
        assert!(clearable_url("url", Some(Some("nope".into()))).is_err());

        assert!(non_empty_url("image", Some("".into())).is_err());
        assert_eq!(non_empty_url("image", None).unwrap(), None);
    }

    #[derive(Debug, serde::Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        url: Option<Option<String>>,
    }

    #[test]
    fn nullable_tells_null_from_missing() {
        let missing: Patch = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(missing.url, None);
        let null: Patch = serde_json::from_value(serde_json::json!({ "url": null })).unwrap();
        assert_eq!(null.url, Some(None));
        let set: Patch = serde_json::from_value(serde_json::json!({ "url": "https://a.io" })).unwrap();
        assert_eq!(set.url, Some(Some("https://a.io".into())));
    }

    #[test]
    fn email_is_normalised() {
        assert_eq!(
            required_email("email", Some(" Ada@Example.COM ".into())).unwrap(),
            "ada@example.com"
        );
        assert!(email("email", Some("no-at-sign".into())).is_err());
        assert!(email("email", Some("a@b".into())).is_err());
        assert!(email("email", Some("a@@b.com".into())).is_err());
    }

    #[test]
    fn string_list_drops_blanks() {
        assert_eq!(
            string_list(vec![" rust ".into(), "".into(), "axum".into()]),
            vec!["rust".to_string(), "axum".to_string()]
        );
    }
}
