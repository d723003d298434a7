/// Serde utility functions for common patterns
use serde::{Deserialize, Deserializer};

/// Deserialize `Option<Option<T>>` so a request can tell "leave as is" from "clear".
///
/// - Missing field → `None` (needs `#[serde(default)]` on the field)
/// - Field is `null` → `Some(None)`
/// - Field has value → `Some(Some(value))`
///
/// Usage:
/// ```ignore
/// #[derive(Deserialize)]
/// struct Patch {
///     #[serde(default, deserialize_with = "crate::serde_utils::double_option")]
///     details: Option<Option<String>>,
/// }
/// ```
pub fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "super::double_option")]
        details: Option<Option<String>>,
    }

    #[test]
    fn missing_field_is_none() {
        let patch: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(patch.details, None);
    }

    #[test]
    fn null_field_is_some_none() {
        let patch: Patch = serde_json::from_str(r#"{"details": null}"#).unwrap();
        assert_eq!(patch.details, Some(None));
    }

    #[test]
    fn present_field_is_some_some() {
        let patch: Patch = serde_json::from_str(r#"{"details": "Use the blue bucket"}"#).unwrap();
        assert_eq!(patch.details, Some(Some("Use the blue bucket".to_string())));
    }
}
