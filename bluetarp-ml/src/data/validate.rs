//! Row validation for the pixel table.
//!
//! Every check here is fatal: a single bad row rejects the whole input.

use crate::data::dataset::PixelClass;
use crate::error::{MlError, Result};

/// Parse one colour channel, rejecting missing, non-integer, or out-of-range values.
pub fn parse_channel(column: &str, raw: Option<&str>, line: u64) -> Result<u8> {
    let value = raw.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(MlError::input(line, format!("missing {column} value")));
    }
    let parsed: i64 = value.parse().map_err(|_| {
        MlError::input(line, format!("{column} value '{value}' is not an integer"))
    })?;
    u8::try_from(parsed)
        .map_err(|_| MlError::input(line, format!("{column} value {parsed} outside [0, 255]")))
}

/// Parse the class label column.
pub fn parse_class(raw: Option<&str>, line: u64) -> Result<PixelClass> {
    let value = raw.map(str::trim).unwrap_or_default();
    if value.is_empty() {
        return Err(MlError::input(line, "missing Class value"));
    }
    value.parse().map_err(|e: String| MlError::input(line, e))
}
