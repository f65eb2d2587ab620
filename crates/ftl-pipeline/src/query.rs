//! Query surface (spec §4.10): `search_events` compiles chips and free-text
//! tokens into an in-process predicate over events joined with upload
//! metadata, then renders an Elastic-style `{objects, meta}` envelope.

use ftl_core::model::Event;
use ftl_core::path::get_at_path;
use ftl_core::value::Value;
use rusqlite::Connection;

/// Sort order for `search_events` results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Desc,
    Asc,
}

/// One chip in a `search_events` filter (spec §4.10).
#[derive(Debug, Clone)]
pub enum Chip {
    /// Substring match against the JSON-serialized `event_category` list.
    Label { value: String, negate: bool },
    /// Exact match on `event_kind`/`event_action` or an attribute path.
    Term {
        field: String,
        value: String,
        negate: bool,
    },
    /// Closed timestamp range; either bound `None` means open (`*`).
    Datetime {
        start: Option<i64>,
        end: Option<i64>,
    },
}

/// The filter object accompanying a `search_events` query string.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// Upload ids to restrict the search to, rendered as strings (the
    /// Elastic-style "index" name); `None` searches every upload.
    pub indices: Option<Vec<String>>,
    pub chips: Vec<Chip>,
    pub size: usize,
    pub from: usize,
    pub order: Order,
}

impl SearchFilter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            indices: None,
            chips: Vec::new(),
            size: 20,
            from: 0,
            order: Order::Desc,
        }
    }
}

/// One result row in the Elastic-style envelope.
#[derive(Debug, Clone)]
pub struct SearchObject {
    pub id: String,
    pub index: String,
    pub source: Event,
}

/// Aggregate counts accompanying a `search_events` result.
#[derive(Debug, Clone)]
pub struct SearchMeta {
    pub total_count: i64,
    pub count_per_upload: Vec<(i64, i64)>,
}

/// The result of a `search_events` call.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub objects: Vec<SearchObject>,
    pub meta: SearchMeta,
}

/// Search events across every upload (or those named in `filter.indices`),
/// applying chips and free-text tokens, then paginating and sorting.
///
/// # Errors
/// Returns an error on a SQLite failure.
pub fn search_events(
    conn: &Connection,
    query: &str,
    filter: &SearchFilter,
) -> rusqlite::Result<SearchResult> {
    let uploads = ftl_store::uploads::list(conn)?;
    let candidate_uploads: Vec<_> = uploads
        .into_iter()
        .filter(|u| {
            filter
                .indices
                .as_ref()
                .is_none_or(|names| names.contains(&u.id.to_string()))
        })
        .collect();

    let tokens = parse_tokens(query);

    let mut matched: Vec<SearchObject> = Vec::new();
    for upload in &candidate_uploads {
        let events = ftl_store::events::list_for_upload(conn, upload.id)?;
        for event in events {
            if filter.chips.iter().all(|chip| chip_matches(chip, &event))
                && tokens.iter().all(|token| token_matches(token, &event))
            {
                matched.push(SearchObject {
                    id: event.id.to_string(),
                    index: upload.id.to_string(),
                    source: event,
                });
            }
        }
    }

    match filter.order {
        Order::Asc => matched.sort_by_key(|o| o.source.timestamp),
        Order::Desc => matched.sort_by_key(|o| std::cmp::Reverse(o.source.timestamp)),
    }

    let total_count = i64::try_from(matched.len()).unwrap_or(i64::MAX);
    let page = matched
        .into_iter()
        .skip(filter.from)
        .take(if filter.size == 0 { usize::MAX } else { filter.size })
        .collect();

    let count_per_upload = ftl_store::events::count_per_upload(conn)?;

    Ok(SearchResult {
        objects: page,
        meta: SearchMeta {
            total_count,
            count_per_upload,
        },
    })
}

fn chip_matches(chip: &Chip, event: &Event) -> bool {
    match chip {
        Chip::Label { value, negate } => {
            let haystack = event
                .event_category
                .as_ref()
                .map(|c| serde_json::to_string(c).unwrap_or_default())
                .unwrap_or_default();
            haystack.contains(value.as_str()) != *negate
        }
        Chip::Term { field, value, negate } => {
            let matched = field_value(event, field) == *value;
            matched != *negate
        }
        Chip::Datetime { start, end } => {
            start.is_none_or(|s| event.timestamp >= s) && end.is_none_or(|e| event.timestamp <= e)
        }
    }
}

/// One free-text search token: either a scoped `key:value` pair or a bare
/// substring term searched across message and attributes.
enum Token {
    Scoped { field: String, value: String },
    Bare(String),
}

fn parse_tokens(query: &str) -> Vec<Token> {
    query
        .split_whitespace()
        .map(|raw| match raw.split_once(':') {
            Some((field, value)) if !field.is_empty() => Token::Scoped {
                field: field.to_string(),
                value: value.to_string(),
            },
            _ => Token::Bare(raw.to_string()),
        })
        .collect()
}

fn token_matches(token: &Token, event: &Event) -> bool {
    match token {
        Token::Scoped { field, value } => field_value(event, field).contains(value.as_str()),
        Token::Bare(value) => {
            event.message.contains(value.as_str()) || attributes_blob(event).contains(value.as_str())
        }
    }
}

/// Resolve a search token's field name against `message`/`event_kind`/
/// `event_action` (first-class columns) or an attributes JSON path.
fn field_value(event: &Event, field: &str) -> String {
    match field {
        "message" => event.message.clone(),
        "event_kind" => event.event_kind.clone(),
        "event_action" => event.event_action.clone(),
        path => {
            let attributes = Value::Mapping(event.attributes.clone());
            get_at_path(&attributes, path, &Value::Null).coerce_to_string()
        }
    }
}

fn attributes_blob(event: &Event) -> String {
    serde_json::to_string(&Value::Mapping(event.attributes.clone()).to_json()).unwrap_or_default()
}
