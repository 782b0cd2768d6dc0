// ─── Repository Resolver ───
// Turns a launcher's source page into the upstream repository it publishes from.

pub mod identity;
pub mod rule;

use reqwest::redirect::Policy;
use reqwest::Client;
use scraper::Html;
use tracing::debug;
use url::Url;

pub use identity::RepositoryIdentity;
pub use rule::MatchRule;

use crate::core::error::{MirrorError, MirrorResult};

/// Host that repositories and releases live on.
pub const UPSTREAM_HOST: &str = "github.com";

const MAX_REDIRECTS: usize = 5;

pub struct RepositoryResolver {
    client: Client,
}

impl RepositoryResolver {
    pub fn new(user_agent: &str) -> MirrorResult<Self> {
        // Single page only: follow redirects while they stay on the source host.
        let policy = Policy::custom(|attempt| {
            if attempt.previous().len() > MAX_REDIRECTS {
                return attempt.error("too many redirects");
            }
            let origin = attempt.previous().first().and_then(|u| u.host_str());
            if origin.is_some() && attempt.url().host_str() == origin {
                attempt.follow()
            } else {
                attempt.stop()
            }
        });

        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(policy)
            .build()?;
        Ok(Self { client })
    }

    /// Resolve `source_url` to a repository identity.
    ///
    /// Upstream URLs with at least `owner/repo` in their path are answered
    /// without any request. Anything else is fetched once (no crawling) and
    /// the first link accepted by `rule`, in document order, wins.
    pub async fn resolve(
        &self,
        source_url: &str,
        rule: &MatchRule,
    ) -> MirrorResult<RepositoryIdentity> {
        let url = Url::parse(source_url).map_err(|e| MirrorError::InvalidSourceUrl {
            url: source_url.to_string(),
            reason: e.to_string(),
        })?;

        if identity::is_upstream_host(url.host_str()) {
            if let Some(identity) = RepositoryIdentity::from_path(url.path()) {
                return Ok(identity);
            }
        }

        let html = self.fetch_page(&url).await?;
        let link = find_repository_link(&html, rule).ok_or_else(|| {
            MirrorError::RepositoryNotFound {
                source_url: source_url.to_string(),
            }
        })?;
        debug!("Source page {} links to {}", source_url, link);

        RepositoryIdentity::from_repository_url(&link)
    }

    async fn fetch_page(&self, url: &Url) -> MirrorResult<String> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MirrorError::PageFetchFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

/// Scan `html` for the first element selected by `rule` whose `href` it accepts.
pub fn find_repository_link(html: &str, rule: &MatchRule) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(rule.selector())
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .find_map(|href| rule.accept(href))
}
