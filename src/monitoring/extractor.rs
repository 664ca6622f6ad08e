//! Pulls the most recent death out of a graveyard page.
//!
//! The page is not parsed as a document. The first `<tbody>` is located, its
//! `<tr>` rows are split out, and the first row's `<td>` cells are read by
//! position according to a [`ColumnLayout`]. Any change to the page layout
//! surfaces as an [`ExtractionError`] rather than a half-filled record.

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;

use crate::api::{DeathRecord, PageFetcher};
use crate::error::{ExtractStage, ExtractionError};

/// Header plus history; anything shorter is not a graveyard table.
pub const MIN_ROWS: usize = 10;
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Cell positions within a graveyard row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub timestamp: usize,
    pub class: usize,
    pub base_fame: usize,
    pub killed_by: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            timestamp: 0,
            class: 2,
            base_fame: 4,
            killed_by: 9,
        }
    }
}

pub struct GraveyardParser {
    tbody: Regex,
    row: Regex,
    cell: Regex,
    layout: ColumnLayout,
}

impl Default for GraveyardParser {
    fn default() -> Self {
        Self::with_layout(ColumnLayout::default())
    }
}

impl GraveyardParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(layout: ColumnLayout) -> Self {
        Self {
            tbody: Regex::new(r"(?is)<tbody(?:\s[^>]*)?>(.*?)</tbody>")
                .expect("tbody pattern is valid"),
            row: Regex::new(r"(?is)<tr(?:\s[^>]*)?>(.*?)</tr>").expect("row pattern is valid"),
            cell: Regex::new(r"(?is)<td(?:\s[^>]*)?>(.*?)</td>").expect("cell pattern is valid"),
            layout,
        }
    }

    pub fn layout(&self) -> ColumnLayout {
        self.layout
    }

    pub fn parse(&self, player: &str, html: &str) -> Result<DeathRecord, ExtractionError> {
        let tbody = self
            .tbody
            .captures(html)
            .and_then(|c| c.get(1))
            .ok_or_else(|| ExtractionError::new(player, ExtractStage::Tbody, "no <tbody> found"))?
            .as_str();

        let rows: Vec<&str> = self
            .row
            .captures_iter(tbody)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect();
        if rows.len() < MIN_ROWS {
            return Err(ExtractionError::new(
                player,
                ExtractStage::Rows,
                format!("found {} rows, need at least {}", rows.len(), MIN_ROWS),
            ));
        }

        // Newest death is always the first row.
        let cells: Vec<String> = self
            .cell
            .captures_iter(rows[0])
            .filter_map(|c| c.get(1).map(|m| cell_text(m.as_str())))
            .collect();
        if cells.is_empty() {
            return Err(ExtractionError::new(
                player,
                ExtractStage::Cells,
                "first row has no <td> cells",
            ));
        }

        let column = |index: usize, name: &str| -> Result<String, ExtractionError> {
            cells.get(index).cloned().ok_or_else(|| {
                ExtractionError::new(
                    player,
                    ExtractStage::Column,
                    format!("{} column {} missing, row has {} cells", name, index, cells.len()),
                )
            })
        };

        let raw_time = column(self.layout.timestamp, "timestamp")?;
        let died_at = parse_timestamp(&raw_time).ok_or_else(|| {
            ExtractionError::new(
                player,
                ExtractStage::Timestamp,
                format!("unparseable death time {:?}", raw_time),
            )
        })?;

        Ok(DeathRecord {
            player: player.to_string(),
            died_at,
            class: column(self.layout.class, "class")?,
            base_fame: column(self.layout.base_fame, "base fame")?,
            killed_by: column(self.layout.killed_by, "killed by")?,
        })
    }
}

/// One GET plus one parse; no retries.
pub async fn fetch_latest_death(
    fetcher: &dyn PageFetcher,
    parser: &GraveyardParser,
    player: &str,
) -> Result<DeathRecord, ExtractionError> {
    let html = fetcher.fetch_page(player).await?;
    parser.parse(player, &html)
}

/// `d` marks a required ASCII digit; every other byte must match literally.
const TIMESTAMP_SHAPE: &[u8] = b"dddd-dd-ddTdd:dd:ddZ";

/// chrono alone accepts unpadded fields, so the exact shape is checked first.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if !has_timestamp_shape(raw) {
        return None;
    }
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

fn has_timestamp_shape(raw: &str) -> bool {
    raw.len() == TIMESTAMP_SHAPE.len()
        && raw
            .bytes()
            .zip(TIMESTAMP_SHAPE.iter())
            .all(|(b, &expected)| match expected {
                b'd' => b.is_ascii_digit(),
                _ => b == expected,
            })
}

fn cell_text(inner: &str) -> String {
    normalize_ws(&decode_entities(&strip_tags(inner)))
}

fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

fn decode_entities(s: &str) -> String {
    // &amp; last so "&amp;lt;" stays "&lt;".
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::api::graveyard::MockPageFetcher;
    use chrono::TimeZone;

    #[test]
    fn test_parse_first_row() {
        let html = graveyard("2023-05-01T10:00:00Z", "Wizard", "1234", "Oryx the Mad God");
        let record = GraveyardParser::new().parse("alice", &html).unwrap();

        assert_eq!(record.player, "alice");
        assert_eq!(record.died_at, Utc.with_ymd_and_hms(2023, 5, 1, 10, 0, 0).unwrap());
        assert_eq!(record.class, "Wizard");
        assert_eq!(record.base_fame, "1234");
        assert_eq!(record.killed_by, "Oryx the Mad God");
    }

    #[test]
    fn test_parse_is_repeatable() {
        let html = graveyard("2023-05-01T10:00:00Z", "Wizard", "1234", "Oryx the Mad God");
        let parser = GraveyardParser::new();
        assert_eq!(
            parser.parse("alice", &html).unwrap(),
            parser.parse("alice", &html).unwrap()
        );
    }

    #[test]
    fn test_cells_are_cleaned() {
        let html = graveyard(
            "2023-05-01T10:00:00Z",
            "<a href=\"/wiki/wizard\">Wizard</a>",
            " 1234\n",
            "Tom &amp; Jerry",
        );
        let record = GraveyardParser::new().parse("alice", &html).unwrap();
        assert_eq!(record.class, "Wizard");
        assert_eq!(record.base_fame, "1234");
        assert_eq!(record.killed_by, "Tom & Jerry");
    }

    #[test]
    fn test_multiline_markup() {
        let html = graveyard("2023-05-01T10:00:00Z", "Wizard", "1234", "Oryx")
            .replace("<tr>", "\n  <tr class=\"death\">\n")
            .replace("<tbody>", "<TBODY>\n")
            .replace("</tbody>", "\n</TBODY>");
        let record = GraveyardParser::new().parse("alice", &html).unwrap();
        assert_eq!(record.killed_by, "Oryx");
    }

    #[test]
    fn test_missing_tbody() {
        let err = GraveyardParser::new()
            .parse("alice", "<html><table></table></html>")
            .unwrap_err();
        assert_eq!(err.stage, ExtractStage::Tbody);
    }

    #[test]
    fn test_too_few_rows() {
        let rows: Vec<Vec<String>> = (0..MIN_ROWS - 1)
            .map(|_| death_row("2023-05-01T10:00:00Z", "Wizard", "1", "Oryx"))
            .collect();
        let err = GraveyardParser::new().parse("alice", &page(&rows)).unwrap_err();
        assert_eq!(err.stage, ExtractStage::Rows);
    }

    #[test]
    fn test_first_row_without_cells() {
        let mut rows: Vec<Vec<String>> = vec![vec![]];
        rows.extend((0..MIN_ROWS).map(|_| death_row("2023-05-01T10:00:00Z", "Wizard", "1", "Oryx")));
        let err = GraveyardParser::new().parse("alice", &page(&rows)).unwrap_err();
        assert_eq!(err.stage, ExtractStage::Cells);
    }

    #[test]
    fn test_short_row_is_column_error() {
        let mut rows = vec![vec!["2023-05-01T10:00:00Z".to_string(), "x".to_string()]];
        rows.extend((0..MIN_ROWS).map(|_| death_row("2023-05-01T10:00:00Z", "Wizard", "1", "Oryx")));
        let err = GraveyardParser::new().parse("alice", &page(&rows)).unwrap_err();
        assert_eq!(err.stage, ExtractStage::Column);
    }

    #[test]
    fn test_bad_timestamp() {
        let html = graveyard("May 1st 2023", "Wizard", "1234", "Oryx");
        let err = GraveyardParser::new().parse("alice", &html).unwrap_err();
        assert_eq!(err.stage, ExtractStage::Timestamp);
    }

    #[test]
    fn test_timestamp_requires_zulu_suffix() {
        assert!(parse_timestamp("2023-05-01T10:00:00Z").is_some());
        assert!(parse_timestamp("2023-05-01T10:00:00").is_none());
        assert!(parse_timestamp("2023-05-01T10:00:00+02:00").is_none());
        assert!(parse_timestamp("2023-05-01 10:00:00Z").is_none());
    }

    #[test]
    fn test_timestamp_rejects_unpadded_fields() {
        assert!(parse_timestamp("2023-5-1T10:00:00Z").is_none());
        assert!(parse_timestamp("23-05-01T10:00:00Z").is_none());
        assert!(parse_timestamp("2023-05-01T1:0:0Z").is_none());
        assert!(parse_timestamp(" 2023-05-01T10:00:00Z").is_none());
        assert!(parse_timestamp("2023-13-01T10:00:00Z").is_none());
    }

    #[test]
    fn test_short_year_cell_is_timestamp_error() {
        let html = graveyard("23-05-01T10:00:00Z", "Wizard", "1234", "Oryx");
        let err = GraveyardParser::new().parse("alice", &html).unwrap_err();
        assert_eq!(err.stage, ExtractStage::Timestamp);
    }

    #[test]
    fn test_custom_layout() {
        let layout = ColumnLayout {
            timestamp: 0,
            class: 1,
            base_fame: 2,
            killed_by: 3,
        };
        let rows: Vec<Vec<String>> = (0..MIN_ROWS)
            .map(|_| {
                vec!["2023-05-01T10:00:00Z", "Priest", "77", "Lich"]
                    .into_iter()
                    .map(String::from)
                    .collect()
            })
            .collect();
        let parser = GraveyardParser::with_layout(layout);
        assert_eq!(parser.layout(), layout);
        assert_ne!(GraveyardParser::new().layout(), layout);

        let record = parser.parse("bob", &page(&rows)).unwrap();
        assert_eq!(record.class, "Priest");
        assert_eq!(record.base_fame, "77");
        assert_eq!(record.killed_by, "Lich");
    }

    #[tokio::test]
    async fn test_fetch_latest_death_passes_transport_error_through() {
        let mut fetcher = MockPageFetcher::new();
        fetcher
            .expect_fetch_page()
            .times(1)
            .returning(|player| Err(ExtractionError::transport(player, "connection reset")));

        let err = fetch_latest_death(&fetcher, &GraveyardParser::new(), "alice")
            .await
            .unwrap_err();
        assert_eq!(err.stage, ExtractStage::Transport);
    }

    #[tokio::test]
    async fn test_fetch_latest_death_parses_page() {
        let mut fetcher = MockPageFetcher::new();
        fetcher
            .expect_fetch_page()
            .times(1)
            .returning(|_| Ok(graveyard("2023-05-01T10:00:00Z", "Wizard", "1234", "Oryx")));

        let record = fetch_latest_death(&fetcher, &GraveyardParser::new(), "alice")
            .await
            .unwrap();
        assert_eq!(record.class, "Wizard");
    }
}
