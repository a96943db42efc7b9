//! Economic calendar published as an RSS feed.
//!
//! Each `<item>` is one event. Calendar fields live in child elements,
//! usually under a vendor namespace (`<ec:country>`, `<ec:volatility>`);
//! only the local name is considered. `volatility` is a numeric impact code
//! (`3` high, `2` medium, `1` low). When `date`/`time` are absent the item's
//! `pubDate` is used as the event start.

use econcal_core::SourceKind;
use quick_xml::events::Event;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{SourceError, SourceResult};
use crate::http::{HttpSourceConfig, SourceHttpClient};
use crate::raw_record::RawRecord;
use crate::source::{BoxFuture, FetchWindow, SourceAdapter};

/// Child elements of `<item>` that are kept.
const ITEM_FIELDS: &[&str] = &[
    "title",
    "country",
    "currency",
    "volatility",
    "date",
    "time",
    "pubDate",
    "forecast",
    "actual",
    "previous",
    "guid",
];

/// Source adapter for an RSS calendar feed.
#[derive(Debug)]
pub struct RssSource {
    client: SourceHttpClient,
    config: HttpSourceConfig,
}

impl RssSource {
    pub fn new(config: HttpSourceConfig) -> SourceResult<Self> {
        let client = SourceHttpClient::new(SourceKind::Rss, &config)?;
        Ok(Self { client, config })
    }
}

impl SourceAdapter for RssSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Rss
    }

    fn fetch(&self, _window: FetchWindow) -> BoxFuture<'_, SourceResult<Vec<RawRecord>>> {
        Box::pin(async move {
            let body = self.client.get_text(self.config.url.clone()).await?;
            let records = parse_feed(&body)?;
            debug!(count = records.len(), "Fetched RSS calendar feed");
            Ok(records)
        })
    }
}

/// Parses an RSS document into one raw record per `<item>`.
pub fn parse_feed(xml: &str) -> SourceResult<Vec<RawRecord>> {
    let mut records = Vec::new();

    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut item: Option<Map<String, Value>> = None;
    let mut current_field: Option<&'static str> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                let local = local_name(&name);

                if local == "item" {
                    item = Some(Map::new());
                } else if item.is_some() {
                    current_field = ITEM_FIELDS.iter().copied().find(|f| *f == local);
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if local_name(&name) == "item" {
                    if let Some(fields) = item.take() {
                        records.push(item_record(records.len(), fields));
                    }
                }
                current_field = None;
            }
            Ok(Event::Text(e)) => {
                if let (Some(field), Some(fields)) = (current_field, item.as_mut()) {
                    let text = e.unescape().unwrap_or_default().to_string();
                    append_text(fields, field, &text);
                }
            }
            Ok(Event::CData(e)) => {
                if let (Some(field), Some(fields)) = (current_field, item.as_mut()) {
                    let text = String::from_utf8_lossy(&e).to_string();
                    append_text(fields, field, &text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SourceError::invalid_response(format!(
                    "Malformed RSS at byte {}: {}",
                    reader.buffer_position(),
                    e
                ))
                .with_source_kind(SourceKind::Rss));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(records)
}

fn item_record(index: usize, fields: Map<String, Value>) -> RawRecord {
    let id = fields
        .get("guid")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("item-{}", index));
    RawRecord {
        source: SourceKind::Rss,
        id,
        fields,
    }
}

fn append_text(fields: &mut Map<String, Value>, field: &str, text: &str) {
    match fields.get_mut(field) {
        Some(Value::String(existing)) => existing.push_str(text),
        _ => {
            fields.insert(field.to_string(), Value::String(text.to_string()));
        }
    }
}

/// Extracts the local name from a potentially namespaced element name.
fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}
