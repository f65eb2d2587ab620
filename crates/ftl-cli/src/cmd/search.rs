use std::io::{self, Write};

use clap::{Args, ValueEnum};
use ftl_pipeline::query::{search_events, Chip, Order, SearchFilter};
use serde::Serialize;

use crate::output::{render_list, OutputMode, Renderable};

#[derive(Clone, Copy, ValueEnum)]
pub enum OrderArg {
    Asc,
    Desc,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Free-text query: space-separated bare substrings or `key:value` scoped terms.
    pub query: String,

    /// Upload id to restrict the search to; may be repeated.
    #[arg(long = "index")]
    pub indices: Vec<String>,

    /// A structured filter chip, one of:
    /// `label:<value>`, `term:<field>=<value>`, `datetime:<start>..<end>`
    /// (either bound may be `*` for open-ended); prefix with `!` to negate
    /// a label or term chip.
    #[arg(long = "chip")]
    pub chips: Vec<String>,

    #[arg(long, default_value_t = 20)]
    pub size: usize,

    #[arg(long, default_value_t = 0)]
    pub from: usize,

    #[arg(long, value_enum, default_value_t = OrderArg::Desc)]
    pub order: OrderArg,
}

/// Parse a `--chip` argument into a [`Chip`].
///
/// # Errors
/// Returns an error if the chip has no recognized kind prefix or is missing
/// the separator its kind requires.
fn parse_chip(raw: &str) -> anyhow::Result<Chip> {
    let (negate, raw) = raw.strip_prefix('!').map_or((false, raw), |rest| (true, rest));
    let (kind, body) = raw
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("chip '{raw}' is missing a ':' separator"))?;

    match kind {
        "label" => Ok(Chip::Label {
            value: body.to_string(),
            negate,
        }),
        "term" => {
            let (field, value) = body
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("term chip '{raw}' is missing a '=' separator"))?;
            Ok(Chip::Term {
                field: field.to_string(),
                value: value.to_string(),
                negate,
            })
        }
        "datetime" => {
            let (start, end) = body
                .split_once("..")
                .ok_or_else(|| anyhow::anyhow!("datetime chip '{raw}' is missing a '..' separator"))?;
            Ok(Chip::Datetime {
                start: parse_bound(start)?,
                end: parse_bound(end)?,
            })
        }
        other => Err(anyhow::anyhow!("unknown chip kind '{other}'")),
    }
}

fn parse_bound(raw: &str) -> anyhow::Result<Option<i64>> {
    if raw == "*" {
        Ok(None)
    } else {
        Ok(Some(raw.parse()?))
    }
}

#[derive(Serialize)]
struct SearchRow {
    id: String,
    index: String,
    timestamp: i64,
    event_action: String,
    message: String,
}

impl Renderable for SearchRow {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "[{}] {} {} — {}", self.index, self.timestamp, self.event_action, self.message)
    }

    fn render_json(&self, w: &mut dyn Write) -> io::Result<()> {
        write!(w, "{}", serde_json::to_string(self).unwrap_or_default())
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{}\t{}\t{}\t{}\t{}", self.id, self.index, self.timestamp, self.event_action, self.message)
    }

    fn table_headers() -> &'static [&'static str] {
        &["ID", "INDEX", "TIMESTAMP", "ACTION", "MESSAGE"]
    }
}

/// Run the `search` subcommand.
///
/// # Errors
/// Returns an error if the database cannot be opened, a `--chip` argument
/// fails to parse, or the search query fails.
pub fn run(args: &SearchArgs, db_path: &std::path::Path, mode: OutputMode) -> anyhow::Result<()> {
    let conn = ftl_store::connection::open(db_path)?;

    let mut filter = SearchFilter::new();
    if !args.indices.is_empty() {
        filter.indices = Some(args.indices.clone());
    }
    for raw in &args.chips {
        filter.chips.push(parse_chip(raw)?);
    }
    filter.size = args.size;
    filter.from = args.from;
    filter.order = match args.order {
        OrderArg::Asc => Order::Asc,
        OrderArg::Desc => Order::Desc,
    };

    let result = search_events(&conn, &args.query, &filter)?;
    let rows: Vec<SearchRow> = result
        .objects
        .into_iter()
        .map(|object| SearchRow {
            id: object.id,
            index: object.index,
            timestamp: object.source.timestamp,
            event_action: object.source.event_action,
            message: object.source.message,
        })
        .collect();

    render_list(&rows, mode)?;
    if mode != OutputMode::Json {
        println!("total: {}", result.meta.total_count);
    }
    Ok(())
}
