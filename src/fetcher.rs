// Online-players fetcher: GET through a proxy, pull the embedded Next.js
// payload out of the page and decode the player list.

use std::time::Duration;

use scraper::{ElementRef, Html};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::FetchError;

/// `id` of the script node carrying the page's hydration JSON.
pub const NEXT_DATA_ID: &str = "__NEXT_DATA__";

/// A player as listed on the online page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
}

impl Player {
    /// Same player with the name lowercased, as stored and compared.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.to_lowercase();
        self
    }
}

// Only `props.pageProps.stats.onlinePlayers` is consumed.
#[derive(Deserialize)]
struct NextData {
    props: Props,
}

#[derive(Deserialize)]
struct Props {
    #[serde(rename = "pageProps")]
    page_props: PageProps,
}

#[derive(Deserialize)]
struct PageProps {
    stats: Stats,
}

#[derive(Deserialize)]
struct Stats {
    #[serde(rename = "onlinePlayers", deserialize_with = "null_as_empty")]
    online_players: Vec<Player>,
}

// The page sends `null` instead of `[]` when nobody is online.
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Player>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Player>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Fetches the online-players page. One attempt per call, no retries.
#[derive(Debug, Clone)]
pub struct PlayerFetcher {
    url: String,
    timeout: Duration,
}

impl PlayerFetcher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    /// Fetch and decode the player list, routing the request through `proxy`.
    pub async fn fetch(&self, proxy: &str) -> Result<Vec<Player>, FetchError> {
        let client = build_client(proxy, self.timeout)?;

        let response = client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| FetchError::Request {
                url: self.url.clone(),
                proxy: proxy.to_string(),
                source,
            })?;

        let body = response.text().await.map_err(|source| FetchError::Parse {
            url: self.url.clone(),
            source,
        })?;

        parse_players(&body, &self.url)
    }
}

/// HTTP client whose every request goes through `proxy`.
pub fn build_client(proxy: &str, timeout: Duration) -> Result<reqwest::Client, FetchError> {
    let proxy_err = |source| FetchError::Proxy {
        proxy: proxy.to_string(),
        source,
    };
    let route = reqwest::Proxy::all(proxy).map_err(proxy_err)?;
    reqwest::Client::builder()
        .proxy(route)
        .timeout(timeout)
        .build()
        .map_err(proxy_err)
}

/// Extract and decode the player list from an HTML document.
/// `url` is only used for error context.
pub fn parse_players(html: &str, url: &str) -> Result<Vec<Player>, FetchError> {
    let raw = extract_next_data(html).ok_or_else(|| FetchError::DataNotFound {
        url: url.to_string(),
    })?;
    decode_players(&raw).map_err(|source| FetchError::Decode {
        url: url.to_string(),
        source,
    })
}

/// Depth-first search for `<script id="__NEXT_DATA__">`, returning the text
/// of its first text child. When several nodes match, the last one in
/// document order wins. An empty payload counts as missing.
pub fn extract_next_data(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let payload = doc
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "script" && el.value().attr("id") == Some(NEXT_DATA_ID))
        .last()
        .and_then(|el| el.text().next().map(str::to_owned));
    payload.filter(|raw| !raw.trim().is_empty())
}

fn decode_players(raw: &str) -> Result<Vec<Player>, serde_json::Error> {
    let data: NextData = serde_json::from_str(raw)?;
    Ok(data.props.page_props.stats.online_players)
}
