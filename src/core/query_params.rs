use std::collections::HashMap;

/// Parse query parameters from a URI string
///
/// Handles URL decoding (including `+` as space) and returns a HashMap of
/// parameter key-value pairs. Multiple values for the same key are not
/// supported (only the last is kept).
///
/// # Example
/// ```
/// use social_media::core::query_params::parse_query_params;
///
/// let params = parse_query_params("/profiles?username=jo&page=2");
/// assert_eq!(params.get("username"), Some(&"jo".to_string()));
/// assert_eq!(params.get("page"), Some(&"2".to_string()));
/// ```
pub fn parse_query_params(uri: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();

    if let Some(query_start) = uri.find('?') {
        let query = &uri[query_start + 1..];
        for param in query.split('&').filter(|p| !p.is_empty()) {
            if let Some(eq_idx) = param.find('=') {
                let key = &param[..eq_idx];
                let encoded_value = param[eq_idx + 1..].replace('+', " ");
                let decoded = urlencoding::decode(&encoded_value)
                    .map(|v| v.into_owned())
                    .unwrap_or(encoded_value);
                params.insert(key.to_string(), decoded);
            } else {
                // Flag parameter without value
                params.insert(param.to_string(), String::new());
            }
        }
    }

    params
}

/// Get a non-empty string parameter
pub fn get_string(params: &HashMap<String, String>, key: &str) -> Option<String> {
    params
        .get(key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_values() {
        let params = parse_query_params("/posts/hashtag-posts?hashtag=rust%20lang&x");
        assert_eq!(params.get("hashtag").map(String::as_str), Some("rust lang"));
        assert_eq!(params.get("x").map(String::as_str), Some(""));
    }

    #[test]
    fn empty_values_read_as_missing() {
        let params = parse_query_params("/posts/hashtag-posts?hashtag=");
        assert_eq!(get_string(&params, "hashtag"), None);
        assert_eq!(get_string(&parse_query_params("/posts"), "hashtag"), None);
    }
}
