use std::borrow::Cow;
use std::collections::HashSet;

use comfy_table::{Table, presets::ASCII_BORDERS_ONLY_CONDENSED};

use super::Listing;

/// Maximum width for free-form columns (status reasons, image refs)
const MAX_WIDE_COLUMN_WIDTH: usize = 60;

/// Columns that should have width limits in table mode
const WIDE_COLUMNS: &[&str] = &["REASON", "IMAGE", "LATEST REVISION"];

/// Truncate a string to max_len chars, adding "..." if truncated
fn truncate_value(s: &str, max_len: usize) -> Cow<'_, str> {
    if s.chars().count() <= max_len {
        Cow::Borrowed(s)
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        Cow::Owned(format!("{}...", truncated))
    }
}

pub struct TableFormatter;

impl TableFormatter {
    pub fn format(listing: &Listing, no_headers: bool) -> String {
        if listing.rows.is_empty() {
            return "(no resources)".to_string();
        }

        let mut table = Table::new();
        table.load_preset(ASCII_BORDERS_ONLY_CONDENSED);

        let truncate_cols: HashSet<usize> = listing
            .columns
            .iter()
            .enumerate()
            .filter_map(|(idx, col)| {
                if WIDE_COLUMNS.contains(&col.as_str()) {
                    Some(idx)
                } else {
                    None
                }
            })
            .collect();

        if !no_headers {
            table.set_header(&listing.columns);
        }

        for row in &listing.rows {
            let cells: Vec<Cow<'_, str>> = row
                .iter()
                .enumerate()
                .map(|(idx, val)| {
                    if truncate_cols.contains(&idx) {
                        truncate_value(val, MAX_WIDE_COLUMN_WIDTH)
                    } else {
                        Cow::Borrowed(val.as_str())
                    }
                })
                .collect();
            table.add_row(cells);
        }

        table.to_string()
    }
}
