use super::Listing;

pub struct JsonFormatter;

impl JsonFormatter {
    pub fn format(listing: &Listing) -> String {
        let rows = listing.to_json_rows();
        serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string())
    }
}
