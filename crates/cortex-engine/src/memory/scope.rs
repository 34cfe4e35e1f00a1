use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Where a memory applies: the host plus the first two path segments.
///
/// `https://a.com/x/y/z?q=1` is scoped to `("a.com", "/x/y")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub host: String,
    pub path_prefix: String,
}

const PATH_DEPTH: usize = 2;

impl Scope {
    pub fn new(host: &str, path_prefix: &str) -> Self {
        Self {
            host: host.to_lowercase(),
            path_prefix: path_prefix.to_string(),
        }
    }

    /// `None` for URLs without a host (`about:blank`, `file://`, garbage).
    pub fn from_url(raw: &str) -> Option<Self> {
        let url = Url::parse(raw).ok()?;
        let host = url.host_str()?.to_lowercase();
        if host.is_empty() {
            return None;
        }
        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).take(PATH_DEPTH).collect())
            .unwrap_or_default();
        Some(Self {
            host,
            path_prefix: format!("/{}", segments.join("/")),
        })
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.host, self.path_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_two_path_segments() {
        let s = Scope::from_url("https://A.com/x/y/z?q=1#frag").unwrap();
        assert_eq!(s, Scope::new("a.com", "/x/y"));
        assert_eq!(
            Scope::from_url("https://a.com").unwrap().path_prefix,
            "/"
        );
        assert_eq!(
            Scope::from_url("https://a.com/only/").unwrap().path_prefix,
            "/only"
        );
    }

    #[test]
    fn hostless_urls_have_no_scope() {
        assert!(Scope::from_url("about:blank").is_none());
        assert!(Scope::from_url("not a url").is_none());
    }
}
