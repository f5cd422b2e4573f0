//! Per-category artifact counting over object listings.

use crate::config::ArtifactConfig;
use crate::flight::FlightKey;
use serde::{Deserialize, Serialize};

/// The artifact categories a flight upload contains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// GPS track log.
    Gps,
    /// OO instrument log.
    Oo,
    /// Frame from the ~1 Hz still camera.
    StillImage,
    /// Frame from the ~10 Hz burst camera.
    BurstImage,
}

/// Artifact counts accumulated across all listing pages for one prefix.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTypeCounts {
    pub gps: u64,
    pub oo: u64,
    pub still_images: u64,
    pub burst_images: u64,
    /// Objects under the prefix that matched no category. Logged, never
    /// validated against.
    pub uncategorized: u64,
}

impl FileTypeCounts {
    /// Record one object key, classified against the configured name
    /// patterns. Keys outside the flight prefix are uncategorized.
    pub fn record(&mut self, flight: &FlightKey, key: &str, artifacts: &ArtifactConfig) {
        match classify(flight, key, artifacts) {
            Some(FileKind::Gps) => self.gps += 1,
            Some(FileKind::Oo) => self.oo += 1,
            Some(FileKind::StillImage) => self.still_images += 1,
            Some(FileKind::BurstImage) => self.burst_images += 1,
            None => self.uncategorized += 1,
        }
    }

    pub fn count(&self, kind: FileKind) -> u64 {
        match kind {
            FileKind::Gps => self.gps,
            FileKind::Oo => self.oo,
            FileKind::StillImage => self.still_images,
            FileKind::BurstImage => self.burst_images,
        }
    }

    pub fn total(&self) -> u64 {
        self.gps + self.oo + self.still_images + self.burst_images + self.uncategorized
    }
}

/// Classify one object key relative to its flight prefix.
pub fn classify(flight: &FlightKey, key: &str, artifacts: &ArtifactConfig) -> Option<FileKind> {
    let relative = key.strip_prefix(flight.as_str())?;
    if relative.starts_with(&artifacts.gps_prefix) {
        Some(FileKind::Gps)
    } else if relative == artifacts.oo_file {
        Some(FileKind::Oo)
    } else if relative.contains(&artifacts.still_image_marker) {
        Some(FileKind::StillImage)
    } else if relative.contains(&artifacts.burst_image_marker) {
        Some(FileKind::BurstImage)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifacts() -> ArtifactConfig {
        ArtifactConfig::default()
    }

    fn flight() -> FlightKey {
        FlightKey::parse("2020-03-03/ABCD/").unwrap()
    }

    #[test]
    fn classifies_each_category() {
        let flight = flight();
        let artifacts = artifacts();
        let mut counts = FileTypeCounts::default();
        counts.record(&flight, "2020-03-03/ABCD/gps_0001.log", &artifacts);
        counts.record(&flight, "2020-03-03/ABCD/oo_data.raw", &artifacts);
        counts.record(&flight, "2020-03-03/ABCD/still/frame_0001.jpg", &artifacts);
        counts.record(&flight, "2020-03-03/ABCD/burst/frame_0001.jpg", &artifacts);
        counts.record(&flight, "2020-03-03/ABCD/manifest.txt", &artifacts);

        assert_eq!(counts.gps, 1);
        assert_eq!(counts.oo, 1);
        assert_eq!(counts.still_images, 1);
        assert_eq!(counts.burst_images, 1);
        assert_eq!(counts.uncategorized, 1);
        assert_eq!(counts.total(), 5);
    }

    #[test]
    fn keys_outside_the_prefix_are_uncategorized() {
        let mut counts = FileTypeCounts::default();
        counts.record(&flight(), "2020-03-04/WXYZ/gps_0001.log", &artifacts());
        assert_eq!(counts.gps, 0);
        assert_eq!(counts.uncategorized, 1);
    }
}
