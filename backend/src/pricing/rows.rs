//! Header-tolerant CSV row access
//!
//! Price lists come from different spreadsheets, so the same column may be
//! called `Item Name`, `ITEM` or `itemname`. Every row keeps its original
//! headers alongside the normalized ones.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use super::PricingError;

/// Column names tried, in order, for an item's name
pub const NAME_COLUMNS: [&str; 6] = ["name", "Name", "ITEM", "Item", "Item Name", "itemname"];

/// Column names tried, in order, for an item's price
pub const PRICE_COLUMNS: [&str; 5] = ["price", "Price", "SELLING", "Selling", "selling"];

/// Lowercase and drop everything that is not ASCII alphanumeric
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct CsvRow {
    fields: HashMap<String, String>,
}

impl CsvRow {
    fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, String)>) -> Self {
        let mut fields = HashMap::new();
        for (header, value) in pairs {
            let value = value.trim().to_string();
            fields.insert(header.to_string(), value.clone());
            fields.insert(normalize_header(header), value);
        }
        Self { fields }
    }

    /// Non-empty value of a column
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .get(column)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// First non-empty value among `columns`
    pub fn first_of(&self, columns: &[&str]) -> Option<&str> {
        columns.iter().find_map(|c| self.get(c))
    }

    pub fn name(&self) -> Option<&str> {
        self.first_of(&NAME_COLUMNS)
    }

    pub fn price_text(&self) -> Option<&str> {
        self.first_of(&PRICE_COLUMNS)
    }
}

/// Read rows from any CSV source. Invalid UTF-8 is replaced, ragged rows are
/// padded with empty values.
pub fn read_rows_from<R: Read>(reader: R) -> Result<Vec<CsvRow>, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers: Vec<String> = rdr
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    for record in rdr.byte_records() {
        let record = record?;
        let pairs = headers.iter().enumerate().map(|(i, h)| {
            let value = record
                .get(i)
                .map(|v| String::from_utf8_lossy(v).into_owned())
                .unwrap_or_default();
            (h.as_str(), value)
        });
        rows.push(CsvRow::from_pairs(pairs));
    }
    Ok(rows)
}

/// Read rows from a file. A missing file is not an error and yields no rows.
pub fn read_rows(path: &Path) -> Result<Vec<CsvRow>, PricingError> {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("Price list {} not found, skipping", path.display());
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(PricingError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    read_rows_from(file).map_err(|source| PricingError::Csv {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("Item Name"), "itemname");
        assert_eq!(normalize_header(" SELLING-Price ($) "), "sellingprice");
        assert_eq!(normalize_header("length_value"), "lengthvalue");
    }

    #[test]
    fn test_rows_keep_original_and_normalized_keys() {
        let csv = "Item Name,SELLING\nSharp Sand,\"1,090.00\"\n";
        let rows = read_rows_from(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("Item Name"), Some("Sharp Sand"));
        assert_eq!(rows[0].get("itemname"), Some("Sharp Sand"));
        assert_eq!(rows[0].name(), Some("Sharp Sand"));
        assert_eq!(rows[0].price_text(), Some("1,090.00"));
    }

    #[test]
    fn test_empty_values_fall_through() {
        let csv = "name,ITEM,price,selling\n,Cement,,85\n";
        let rows = read_rows_from(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].name(), Some("Cement"));
        assert_eq!(rows[0].price_text(), Some("85"));
    }

    #[test]
    fn test_ragged_rows_are_padded() {
        let csv = "name,price,notes\nBlock 6in,12\n";
        let rows = read_rows_from(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].get("notes"), None);
        assert_eq!(rows[0].price_text(), Some("12"));
    }

    #[test]
    fn test_missing_file_yields_no_rows() {
        let rows = read_rows(Path::new("/nonexistent/prices.csv")).unwrap();
        assert!(rows.is_empty());
    }
}
