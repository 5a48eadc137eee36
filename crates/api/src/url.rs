//! Versioned resource URL helper, used for cross-linking in payloads.

/// API version segment in resource URLs.
pub const API_VERSION: &str = "2";

/// Relative URL for a resource: `api/v2/<resource>[/<id>]`, no trailing
/// slash when the id is absent.
pub fn api_url(resource: &str, id: Option<&str>) -> String {
    match id {
        Some(id) => format!("api/v{API_VERSION}/{resource}/{id}"),
        None => format!("api/v{API_VERSION}/{resource}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_id() {
        assert_eq!(api_url("posts", Some("12")), "api/v2/posts/12");
    }

    #[test]
    fn without_id_has_no_trailing_slash() {
        assert_eq!(api_url("posts", None), "api/v2/posts");
    }
}
