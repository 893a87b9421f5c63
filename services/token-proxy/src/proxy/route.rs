use crate::config::RouteMode;
use http::Uri;

impl RouteMode {
    /// Map an inbound URI onto the path-and-query sent to the backend.
    ///
    /// Returns `None` when prefix mode is active and the path lies outside the
    /// prefix. Matching is per path segment, so `/apix` is not under `/api`.
    pub fn rewrite(&self, uri: &Uri) -> Option<String> {
        let path = uri.path();

        let path = match self {
            RouteMode::Passthrough => path,
            RouteMode::Prefix(prefix) => {
                let rest = path.strip_prefix(prefix.as_str())?;
                if rest.is_empty() {
                    "/"
                } else if rest.starts_with('/') {
                    rest
                } else {
                    return None;
                }
            }
        };

        Some(match uri.query() {
            Some(query) => format!("{}?{}", path, query),
            None => path.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    fn prefix() -> RouteMode {
        RouteMode::Prefix("/api".to_string())
    }

    #[test]
    fn test_prefix_is_stripped() {
        assert_eq!(
            prefix().rewrite(&uri("/api/widgets/7")).as_deref(),
            Some("/widgets/7")
        );
    }

    #[test]
    fn test_bare_prefix_maps_to_root() {
        assert_eq!(prefix().rewrite(&uri("/api")).as_deref(), Some("/"));
        assert_eq!(prefix().rewrite(&uri("/api/")).as_deref(), Some("/"));
        assert_eq!(
            prefix().rewrite(&uri("/api?page=2")).as_deref(),
            Some("/?page=2")
        );
    }

    #[test]
    fn test_query_is_preserved() {
        assert_eq!(
            prefix().rewrite(&uri("/api/widgets?color=red&size=l")).as_deref(),
            Some("/widgets?color=red&size=l")
        );
        assert_eq!(
            RouteMode::Passthrough
                .rewrite(&uri("/widgets?color=red"))
                .as_deref(),
            Some("/widgets?color=red")
        );
    }

    #[test]
    fn test_paths_outside_prefix_are_not_routed() {
        assert_eq!(prefix().rewrite(&uri("/")), None);
        assert_eq!(prefix().rewrite(&uri("/static/app.js")), None);
        assert_eq!(prefix().rewrite(&uri("/apix/widgets")), None);
    }

    #[test]
    fn test_passthrough_keeps_full_path() {
        assert_eq!(
            RouteMode::Passthrough
                .rewrite(&uri("/api/widgets/7"))
                .as_deref(),
            Some("/api/widgets/7")
        );
        assert_eq!(RouteMode::Passthrough.rewrite(&uri("/")).as_deref(), Some("/"));
    }

    #[test]
    fn test_absolute_form_uses_path_only() {
        assert_eq!(
            prefix()
                .rewrite(&uri("http://proxy.local:3000/api/widgets/7"))
                .as_deref(),
            Some("/widgets/7")
        );
    }
}
