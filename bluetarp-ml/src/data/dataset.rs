//! Immutable pixel dataset with the binary tarp / non-tarp target.

use crate::error::{MlError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Number of feature columns (red, green, blue).
pub const N_FEATURES: usize = 3;

/// Land-cover class of a labelled pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelClass {
    BlueTarp,
    Rooftop,
    Soil,
    VariousNonTarp,
    Vegetation,
}

impl PixelClass {
    pub const ALL: [PixelClass; 5] = [
        PixelClass::BlueTarp,
        PixelClass::Rooftop,
        PixelClass::Soil,
        PixelClass::VariousNonTarp,
        PixelClass::Vegetation,
    ];

    /// Spelling used in the source table.
    pub fn label(&self) -> &'static str {
        match self {
            Self::BlueTarp => "Blue Tarp",
            Self::Rooftop => "Rooftop",
            Self::Soil => "Soil",
            Self::VariousNonTarp => "Various Non-Tarp",
            Self::Vegetation => "Vegetation",
        }
    }

    pub fn is_target(&self) -> bool {
        matches!(self, Self::BlueTarp)
    }
}

impl fmt::Display for PixelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PixelClass {
    type Err = String;

    /// Accepts `Blue Tarp`, `BlueTarp`, `blue_tarp`, `various non-tarp`, ...
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "bluetarp" => Ok(Self::BlueTarp),
            "rooftop" => Ok(Self::Rooftop),
            "soil" => Ok(Self::Soil),
            "variousnontarp" => Ok(Self::VariousNonTarp),
            "vegetation" => Ok(Self::Vegetation),
            _ => Err(format!("unknown class '{}'", s.trim())),
        }
    }
}

/// One labelled pixel. `id` is the stable 1-based row index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub id: usize,
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub class: PixelClass,
}

impl Observation {
    pub fn new(id: usize, class: PixelClass, red: u8, green: u8, blue: u8) -> Self {
        Self {
            id,
            red,
            green,
            blue,
            class,
        }
    }

    /// Derived from `class` on every call.
    pub fn is_target(&self) -> bool {
        self.class.is_target()
    }

    pub fn rgb(&self) -> [f64; N_FEATURES] {
        [self.red as f64, self.green as f64, self.blue as f64]
    }
}

/// The full pixel table. Read-only once built; ids are `1..=len()` in row order.
#[derive(Debug, Clone)]
pub struct Dataset {
    observations: Vec<Observation>,
}

impl Dataset {
    /// Build from already-numbered observations. Ids must run `1..=n` in order.
    pub fn new(observations: Vec<Observation>) -> Result<Self> {
        if observations.is_empty() {
            return Err(MlError::invalid_argument("dataset has no observations"));
        }
        for (i, obs) in observations.iter().enumerate() {
            if obs.id != i + 1 {
                return Err(MlError::invalid_argument(format!(
                    "observation at position {} has id {}, expected {}",
                    i,
                    obs.id,
                    i + 1
                )));
            }
        }
        Ok(Self { observations })
    }

    /// Build from `(class, red, green, blue)` rows, numbering them from 1.
    pub fn from_rows<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (PixelClass, u8, u8, u8)>,
    {
        let observations = rows
            .into_iter()
            .enumerate()
            .map(|(i, (class, r, g, b))| Observation::new(i + 1, class, r, g, b))
            .collect();
        Self::new(observations)
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn get(&self, id: usize) -> Option<&Observation> {
        id.checked_sub(1).and_then(|i| self.observations.get(i))
    }

    /// Targets for every observation in id order.
    pub fn all_targets(&self) -> Vec<bool> {
        self.observations.iter().map(Observation::is_target).collect()
    }

    /// RGB feature matrix (`ids.len() x 3`) in the order of `ids`.
    pub fn features(&self, ids: &[usize]) -> Result<Array2<f64>> {
        let mut data = Vec::with_capacity(ids.len() * N_FEATURES);
        for &id in ids {
            data.extend_from_slice(&self.lookup(id)?.rgb());
        }
        Array2::from_shape_vec((ids.len(), N_FEATURES), data)
            .map_err(|e| MlError::invariant(e.to_string()))
    }

    pub fn targets(&self, ids: &[usize]) -> Result<Vec<bool>> {
        ids.iter()
            .map(|&id| self.lookup(id).map(Observation::is_target))
            .collect()
    }

    pub fn class_counts(&self) -> BTreeMap<PixelClass, usize> {
        let mut counts = BTreeMap::new();
        for obs in &self.observations {
            *counts.entry(obs.class).or_insert(0) += 1;
        }
        counts
    }

    pub fn target_count(&self) -> usize {
        self.observations.iter().filter(|o| o.is_target()).count()
    }

    /// SHA-256 over the canonical `class,red,green,blue` rows.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for obs in &self.observations {
            hasher.update(obs.class.label().as_bytes());
            hasher.update([b',', obs.red, obs.green, obs.blue, b'\n']);
        }
        format!("{:x}", hasher.finalize())
    }

    fn lookup(&self, id: usize) -> Result<&Observation> {
        self.get(id).ok_or_else(|| {
            MlError::invalid_argument(format!(
                "observation id {} outside 1..={}",
                id,
                self.len()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::from_rows(vec![
            (PixelClass::Vegetation, 64, 67, 57),
            (PixelClass::BlueTarp, 98, 140, 190),
            (PixelClass::Soil, 175, 150, 120),
        ])
        .unwrap()
    }

    #[test]
    fn test_class_parsing_variants() {
        assert_eq!("Blue Tarp".parse::<PixelClass>(), Ok(PixelClass::BlueTarp));
        assert_eq!("BlueTarp".parse::<PixelClass>(), Ok(PixelClass::BlueTarp));
        assert_eq!(
            "Various Non-Tarp".parse::<PixelClass>(),
            Ok(PixelClass::VariousNonTarp)
        );
        assert_eq!(" rooftop ".parse::<PixelClass>(), Ok(PixelClass::Rooftop));
        assert!("Water".parse::<PixelClass>().is_err());
    }

    #[test]
    fn test_target_follows_class() {
        let ds = sample();
        assert_eq!(ds.all_targets(), vec![false, true, false]);
        assert_eq!(ds.target_count(), 1);
    }

    #[test]
    fn test_features_follow_requested_order() {
        let ds = sample();
        let x = ds.features(&[3, 1]).unwrap();
        assert_eq!(x.shape(), &[2, 3]);
        assert_eq!(x[[0, 0]], 175.0);
        assert_eq!(x[[1, 2]], 57.0);
        assert!(ds.features(&[4]).is_err());
        assert!(ds.features(&[0]).is_err());
    }

    #[test]
    fn test_new_rejects_gaps_in_ids() {
        let obs = vec![
            Observation::new(1, PixelClass::Soil, 1, 2, 3),
            Observation::new(3, PixelClass::Soil, 1, 2, 3),
        ];
        assert!(Dataset::new(obs).is_err());
        assert!(Dataset::new(Vec::new()).is_err());
    }

    #[test]
    fn test_fingerprint_is_content_sensitive() {
        let a = sample();
        let b = Dataset::from_rows(vec![
            (PixelClass::Vegetation, 64, 67, 57),
            (PixelClass::BlueTarp, 98, 140, 191),
            (PixelClass::Soil, 175, 150, 120),
        ])
        .unwrap();
        assert_eq!(a.fingerprint(), sample().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_class_counts() {
        let counts = sample().class_counts();
        assert_eq!(counts.get(&PixelClass::BlueTarp), Some(&1));
        assert_eq!(counts.get(&PixelClass::Rooftop), None);
    }
}
