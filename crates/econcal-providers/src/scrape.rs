//! Economic calendar scraped from an HTML page.
//!
//! The page is expected to render one `<tr>` per event with the event
//! fields as `data-*` attributes:
//!
//! ```html
//! <tr class="calendar-row" data-event-id="1234" data-country="US"
//!     data-title="CPI m/m" data-impact="red" data-date="2024-01-11"
//!     data-time="8:30am" data-forecast="0.2%" data-previous="0.1%"
//!     data-currency="USD">
//! ```
//!
//! Rows without any `data-*` attribute (headers, spacers) are ignored.

use std::sync::LazyLock;

use econcal_core::SourceKind;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::SourceResult;
use crate::http::{HttpSourceConfig, SourceHttpClient};
use crate::raw_record::RawRecord;
use crate::source::{BoxFuture, FetchWindow, SourceAdapter};

/// Regex for the opening tag of a table row, capturing its attributes.
static ROW_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr\b([^>]*)>").expect("Invalid row regex"));

/// Regex for a `data-*` attribute with a quoted value.
static DATA_ATTR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bdata-([a-z0-9-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("Invalid data attribute regex")
});

/// Attribute holding the provider's row identifier.
const ID_ATTR: &str = "event-id";

/// Source adapter for a scraped HTML calendar page.
#[derive(Debug)]
pub struct ScrapedHtmlSource {
    client: SourceHttpClient,
    config: HttpSourceConfig,
}

impl ScrapedHtmlSource {
    pub fn new(config: HttpSourceConfig) -> SourceResult<Self> {
        let client = SourceHttpClient::new(SourceKind::ScrapedHtml, &config)?;
        Ok(Self { client, config })
    }

    fn request_url(&self, window: FetchWindow) -> url::Url {
        let (from, to) = window.query_dates();
        let mut url = self.config.url.clone();
        url.query_pairs_mut()
            .append_pair("from", &from)
            .append_pair("to", &to);
        url
    }
}

impl SourceAdapter for ScrapedHtmlSource {
    fn kind(&self) -> SourceKind {
        SourceKind::ScrapedHtml
    }

    fn fetch(&self, window: FetchWindow) -> BoxFuture<'_, SourceResult<Vec<RawRecord>>> {
        Box::pin(async move {
            let body = self.client.get_text(self.request_url(window)).await?;
            let records = parse_page(&body);
            if records.is_empty() {
                warn!("Calendar page contained no event rows; the page layout may have changed");
            } else {
                debug!(count = records.len(), "Scraped calendar page");
            }
            Ok(records)
        })
    }
}

/// Extracts one raw record per annotated table row.
pub fn parse_page(html: &str) -> Vec<RawRecord> {
    ROW_REGEX
        .captures_iter(html)
        .filter_map(|row| parse_row(row.get(1).map_or("", |m| m.as_str())))
        .enumerate()
        .map(|(index, (id, fields))| {
            let id = id.unwrap_or_else(|| format!("row-{}", index));
            RawRecord {
                source: SourceKind::ScrapedHtml,
                id,
                fields,
            }
        })
        .collect()
}

fn parse_row(attributes: &str) -> Option<(Option<String>, Map<String, Value>)> {
    let mut fields = Map::new();
    let mut id = None;

    for attr in DATA_ATTR_REGEX.captures_iter(attributes) {
        let name = attr[1].to_ascii_lowercase();
        let value = attr
            .get(2)
            .or_else(|| attr.get(3))
            .map_or(String::new(), |m| unescape(m.as_str()));

        if name == ID_ATTR {
            id = Some(value.clone());
        }
        fields.insert(name, Value::String(value));
    }

    (!fields.is_empty()).then_some((id, fields))
}

/// Decodes the handful of entities that show up in attribute values.
fn unescape(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
