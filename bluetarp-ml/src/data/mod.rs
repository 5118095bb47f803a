//! Pixel data — loading, validation, and the immutable dataset.

pub mod dataset;
pub mod source;
pub mod validate;

pub use dataset::{Dataset, N_FEATURES, Observation, PixelClass};
pub use source::{CsvSource, read_pixels};
