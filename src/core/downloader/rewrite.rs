/// Upstream prefix that the download mirror knows how to serve.
const UPSTREAM_PREFIX: &str = "https://github.com/";
/// Path segment the mirror expects in front of upstream paths.
const MIRROR_SEGMENT: &str = "/gh/";

/// URL substitutions applied to every asset before it is requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewriteRules {
    /// Prepended verbatim to the asset URL.
    pub asset_proxy: Option<String>,
    /// Base URL of a download mirror replacing `https://github.com/`.
    pub mirror_domain: Option<String>,
    pub mirror_enabled: bool,
}

impl RewriteRules {
    /// Effective URL for an asset, or `None` when there is nothing to fetch.
    ///
    /// The asset proxy is applied first, then mirror substitution. The mirror
    /// only kicks in while the URL still starts with the upstream prefix, so
    /// a configured proxy takes precedence.
    pub fn apply(&self, url: &str) -> Option<String> {
        if url.is_empty() {
            return None;
        }

        let mut effective = match self.asset_proxy.as_deref() {
            Some(proxy) if !proxy.is_empty() => format!("{proxy}{url}"),
            _ => url.to_string(),
        };

        if self.mirror_enabled {
            if let Some(domain) = self.mirror_domain.as_deref().filter(|d| !d.is_empty()) {
                if let Some(rest) = effective.strip_prefix(UPSTREAM_PREFIX) {
                    effective = format!(
                        "{}{}{}",
                        domain.trim_end_matches('/'),
                        MIRROR_SEGMENT,
                        rest
                    );
                }
            }
        }

        Some(effective)
    }
}
