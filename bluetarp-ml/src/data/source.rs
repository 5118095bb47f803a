//! Delimited-file loader for the labelled pixel table.

use crate::data::dataset::{Dataset, Observation};
use crate::data::validate::{parse_channel, parse_class};
use crate::error::{MlError, Result};
use std::io::Read;
use std::path::PathBuf;

const CLASS_COLUMN: &str = "Class";
const CHANNEL_COLUMNS: [&str; 3] = ["Red", "Green", "Blue"];

/// CSV (or other single-byte delimited) pixel table on disk.
#[derive(Debug, Clone)]
pub struct CsvSource {
    pub path: PathBuf,
    pub delimiter: u8,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Load and validate the whole table.
    pub fn load(&self) -> Result<Dataset> {
        let file = std::fs::File::open(&self.path)?;
        let dataset = read_pixels(file, self.delimiter)?;
        tracing::info!(
            path = %self.path.display(),
            rows = dataset.len(),
            targets = dataset.target_count(),
            "Loaded pixel table"
        );
        Ok(dataset)
    }
}

/// Read a pixel table with a `Class,Red,Green,Blue` header (any column order,
/// header names case-insensitive, extra columns ignored).
pub fn read_pixels<R: Read>(reader: R, delimiter: u8) -> Result<Dataset> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let position = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h.trim_matches('"').eq_ignore_ascii_case(name))
            .ok_or_else(|| MlError::input(1, format!("missing '{name}' column in header")))
    };
    let class_idx = position(CLASS_COLUMN)?;
    let channel_idx = [
        position(CHANNEL_COLUMNS[0])?,
        position(CHANNEL_COLUMNS[1])?,
        position(CHANNEL_COLUMNS[2])?,
    ];

    let mut observations = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or_default();
        let class = parse_class(record.get(class_idx), line)?;
        let mut rgb = [0u8; 3];
        for (slot, (&idx, name)) in rgb.iter_mut().zip(channel_idx.iter().zip(CHANNEL_COLUMNS)) {
            *slot = parse_channel(name, record.get(idx), line)?;
        }
        observations.push(Observation::new(
            observations.len() + 1,
            class,
            rgb[0],
            rgb[1],
            rgb[2],
        ));
    }

    if observations.is_empty() {
        return Err(MlError::invalid_argument("pixel table has no data rows"));
    }
    Dataset::new(observations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::PixelClass;

    #[test]
    fn test_read_pixels_in_any_column_order() {
        let input = "Red,Class,Blue,Green\n64,Vegetation,57,67\n98,Blue Tarp,190,140\n";
        let ds = read_pixels(input.as_bytes(), b',').unwrap();
        assert_eq!(ds.len(), 2);
        let tarp = ds.get(2).unwrap();
        assert_eq!(tarp.class, PixelClass::BlueTarp);
        assert_eq!((tarp.red, tarp.green, tarp.blue), (98, 140, 190));
    }

    #[test]
    fn test_read_pixels_rejects_out_of_range_with_line() {
        let input = "Class,Red,Green,Blue\nSoil,1,2,3\nSoil,1,300,3\n";
        let err = read_pixels(input.as_bytes(), b',').unwrap_err();
        match err {
            MlError::Input { line, reason } => {
                assert_eq!(line, 3);
                assert!(reason.contains("Green"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_pixels_rejects_missing_value() {
        let input = "Class,Red,Green,Blue\nSoil,1,,3\n";
        assert!(matches!(
            read_pixels(input.as_bytes(), b','),
            Err(MlError::Input { line: 2, .. })
        ));
    }

    #[test]
    fn test_read_pixels_short_row_names_its_line() {
        let input = "Class,Red,Green,Blue\nSoil,1,2,3\nSoil,1,2\n";
        match read_pixels(input.as_bytes(), b',').unwrap_err() {
            MlError::Input { line, reason } => {
                assert_eq!(line, 3);
                assert!(reason.contains("Blue"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }

        let input = "Class,Red,Green,Blue\nVegetation\n";
        assert!(matches!(
            read_pixels(input.as_bytes(), b','),
            Err(MlError::Input { line: 2, .. })
        ));
    }

    #[test]
    fn test_read_pixels_requires_header_columns() {
        let input = "Class,Red,Green\nSoil,1,2\n";
        assert!(read_pixels(input.as_bytes(), b',').is_err());
    }

    #[test]
    fn test_read_pixels_rejects_empty_table() {
        let input = "Class,Red,Green,Blue\n";
        assert!(matches!(
            read_pixels(input.as_bytes(), b','),
            Err(MlError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_read_pixels_other_delimiter() {
        let input = "Class;Red;Green;Blue\nRooftop;10;20;30\n";
        let ds = read_pixels(input.as_bytes(), b';').unwrap();
        assert_eq!(ds.get(1).unwrap().class, PixelClass::Rooftop);
    }

    #[test]
    fn test_csv_source_loads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pixels.csv");
        std::fs::write(&path, "Class,Red,Green,Blue\nBlue Tarp,90,130,180\n").unwrap();
        let ds = CsvSource::new(&path).load().unwrap();
        assert_eq!(ds.target_count(), 1);
        assert!(CsvSource::new(dir.path().join("missing.csv")).load().is_err());
    }
}
