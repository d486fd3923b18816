mod json;
mod table;
mod yaml;

pub use json::JsonFormatter;
pub use table::TableFormatter;
pub use yaml::YamlFormatter;

use std::collections::BTreeMap;

use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

use crate::cli::OutputFormat;

/// A tabular listing of resources, ready for any output format.
#[derive(Debug, Clone)]
pub struct Listing {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Listing {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(ToString::to_string).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn format(&self, format: &OutputFormat, no_headers: bool) -> String {
        match format {
            OutputFormat::Table => TableFormatter::format(self, no_headers),
            OutputFormat::Json => JsonFormatter::format(self),
            OutputFormat::Yaml => YamlFormatter::format(self),
        }
    }

    /// Rows as column-keyed maps, for the structured formats.
    fn to_json_rows(&self) -> Vec<BTreeMap<String, String>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(|c| c.to_lowercase().replace(' ', "_"))
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}

/// Compact kubectl-style age: "42s", "7m", "3h", "12d".
pub fn format_age(timestamp: Option<&Time>) -> String {
    let Some(Time(created)) = timestamp else {
        return "<unknown>".to_string();
    };
    let elapsed = Utc::now().signed_duration_since(*created);
    let seconds = elapsed.num_seconds().max(0);
    if seconds < 60 {
        format!("{seconds}s")
    } else if seconds < 3600 {
        format!("{}m", seconds / 60)
    } else if seconds < 86_400 {
        format!("{}h", seconds / 3600)
    } else {
        format!("{}d", seconds / 86_400)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn listing_round_trips_rows() {
        let mut listing = Listing::new(&["NAME", "READY"]);
        listing.push_row(vec!["hello".to_string(), "True".to_string()]);
        assert_eq!(listing.rows.len(), 1);

        let rows = listing.to_json_rows();
        assert_eq!(rows[0].get("name"), Some(&"hello".to_string()));
        assert_eq!(rows[0].get("ready"), Some(&"True".to_string()));
    }

    #[test]
    fn age_buckets() {
        let at = |seconds: i64| Time(Utc::now() - Duration::seconds(seconds));
        assert_eq!(format_age(Some(&at(30))), "30s");
        assert_eq!(format_age(Some(&at(150))), "2m");
        assert_eq!(format_age(Some(&at(7200))), "2h");
        assert_eq!(format_age(Some(&at(200_000))), "2d");
        assert_eq!(format_age(None), "<unknown>");
    }
}
