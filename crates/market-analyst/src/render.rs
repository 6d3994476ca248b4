//! Terminal rendering for series, catalogs and transcripts

use crate::catalog::{AssetSelection, SectorCatalog};
use crate::conversation::{ChatRole, Transcript};
use crate::error::AnalystError;
use crate::series::NormalizedSeries;
use crate::timeframe::Timeframe;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use std::fmt::Write;

fn table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn price(value: f64) -> Cell {
    Cell::new(format!("{value:.2}")).set_alignment(CellAlignment::Right)
}

/// Candlestick table holding the most recent `max_rows` bars
pub fn series_table(series: &NormalizedSeries, max_rows: usize) -> Table {
    let mut table = table();
    table.set_header(vec!["Time", "Open", "High", "Low", "Close", "Volume"]);

    let bars = series.bars();
    let skip = bars.len().saturating_sub(max_rows);
    for bar in &bars[skip..] {
        table.add_row(vec![
            Cell::new(bar.time.to_string()),
            price(bar.open),
            price(bar.high),
            price(bar.low),
            price(bar.close),
            Cell::new(bar.volume).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

/// Title, summary, axis hint and table for a series
pub fn series_report(series: &NormalizedSeries, max_rows: usize) -> String {
    let summary = series.summary();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} {} ({} bars, {} to {})",
        series.symbol(),
        series.timeframe().label(),
        summary.bars,
        summary.first,
        summary.last
    );
    let change = match summary.change_pct {
        Some(pct) => format!("{:+.2} ({pct:+.2}%)", summary.change),
        None => format!("{:+.2}", summary.change),
    };
    let _ = writeln!(
        out,
        "Last {:.2}  Change {change}  Range {:.2} - {:.2}",
        summary.last_close, summary.min_low, summary.max_high
    );
    let _ = writeln!(
        out,
        "Axis: {}",
        if series.suppress_weekend_gaps() {
            "non-trading days hidden"
        } else {
            "continuous calendar"
        }
    );
    if summary.bars > max_rows {
        let _ = writeln!(out, "Showing the last {max_rows} bars");
    }
    let _ = write!(out, "{}", series_table(series, max_rows));
    out
}

/// Explicit error state shown in place of a chart
pub fn chart_error(symbol: &str, timeframe: Timeframe, error: &AnalystError) -> String {
    format!("No chart for {symbol} ({}): {error}", timeframe.label())
}

/// Sectors and their symbols, marking the active selection
pub fn catalog_table(catalog: &SectorCatalog, selection: Option<&AssetSelection>) -> Table {
    let mut table = table();
    table.set_header(vec!["Sector", "Symbols"]);

    for entry in catalog.entries() {
        let active = selection.filter(|s| s.sector() == entry.name);
        let name = if active.is_some() {
            format!("* {}", entry.name)
        } else {
            entry.name.clone()
        };
        let symbols = entry
            .symbols
            .iter()
            .map(|symbol| match active {
                Some(s) if s.symbol() == symbol.as_str() => format!("[{symbol}]"),
                _ => symbol.clone(),
            })
            .collect::<Vec<_>>()
            .join(" ");
        table.add_row(vec![name, symbols]);
    }
    table
}

/// One "Speaker: text" line per message
pub fn transcript_text(transcript: &Transcript) -> String {
    transcript
        .iter()
        .map(|message| {
            let speaker = match message.role {
                ChatRole::User => "You",
                ChatRole::Assistant => "Analyst",
            };
            format!("{speaker}: {}", message.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Granularity, RawBar, RawBarSet, RawStamp};
    use crate::conversation::ConversationManager;
    use crate::series::normalize;
    use chrono::NaiveDate;

    fn series(days: u32) -> NormalizedSeries {
        let rows = (1..=days)
            .map(|d| RawBar {
                stamp: RawStamp::Date(NaiveDate::from_ymd_opt(2024, 1, d).unwrap()),
                open: 10.0,
                high: 12.0,
                low: 9.0,
                close: 11.0,
                volume: 500,
            })
            .collect();
        normalize(
            "AAPL",
            Timeframe::Month1,
            RawBarSet {
                granularity: Granularity::Daily,
                rows,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_series_table_keeps_latest_rows() {
        let rendered = series_table(&series(10), 3).to_string();
        assert!(rendered.contains("2024-01-10"));
        assert!(rendered.contains("2024-01-08"));
        assert!(!rendered.contains("2024-01-07"));
        assert!(rendered.contains("11.00"));
    }

    #[test]
    fn test_series_report_header() {
        let report = series_report(&series(5), 50);
        assert!(report.starts_with("AAPL 1M (5 bars, 2024-01-01 to 2024-01-05)"));
        assert!(report.contains("Change +1.00 (+10.00%)"));
        assert!(report.contains("non-trading days hidden"));
        assert!(!report.contains("Showing the last"));
    }

    #[test]
    fn test_chart_error() {
        let err = AnalystError::unavailable("ZZZZ", "no usable bars");
        assert_eq!(
            chart_error("ZZZZ", Timeframe::Year5, &err),
            "No chart for ZZZZ (5Y): Data not available for ZZZZ: no usable bars"
        );
    }

    #[test]
    fn test_catalog_marks_selection() {
        let catalog = SectorCatalog::builtin();
        let selection = catalog.select("Finance").unwrap();
        let rendered = catalog_table(&catalog, Some(&selection)).to_string();
        assert!(rendered.contains("* Finance"));
        assert!(rendered.contains("[JPM]"));
        assert!(!rendered.contains("[AAPL]"));
    }

    #[test]
    fn test_transcript_text() {
        let text = transcript_text(&ConversationManager::initial_greeting());
        assert!(text.starts_with("Analyst: Hello!"));
    }
}
