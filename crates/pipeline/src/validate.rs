//! Cross-source consistency validation.
//!
//! Every check compares an observed artifact count against a function of the
//! elapsed flight duration within an absolute tolerance. A flight whose
//! sensors ran for its whole duration produces roughly one GPS row, one OO
//! sample, and one still frame per second, and ten burst frames per second;
//! the tolerances absorb sensor warm-up and shutdown skew.

use hangar_core::FileTypeCounts;
use hangar_core::config::ThresholdsConfig;
use std::fmt;
use thiserror::Error;

/// Nominal burst-camera frame rate relative to the 1 Hz baseline sensors.
pub const BURST_FRAME_RATE_HZ: f64 = 10.0;

/// The individual consistency checks, in evaluation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConsistencyCheck {
    GpsDensity,
    OoDensity,
    StillImageDensity,
    BurstImageDensity,
}

impl ConsistencyCheck {
    pub fn name(&self) -> &'static str {
        match self {
            ConsistencyCheck::GpsDensity => "gps-density",
            ConsistencyCheck::OoDensity => "oo-density",
            ConsistencyCheck::StillImageDensity => "still-image-density",
            ConsistencyCheck::BurstImageDensity => "burst-image-density",
        }
    }
}

impl fmt::Display for ConsistencyCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A failed validation, naming the check and both compared quantities.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConsistencyFailure {
    #[error("insufficient GPS data: {count} reading(s); at least 2 are needed to bound the flight duration")]
    InsufficientGpsData { count: u64 },

    #[error("{check} check failed: observed {observed}, expected {expected:.1} within ±{tolerance}")]
    OutOfTolerance {
        check: ConsistencyCheck,
        observed: u64,
        expected: f64,
        tolerance: f64,
    },
}

/// Validate artifact counts against the elapsed flight duration.
///
/// `elapsed_seconds` is `None` when fewer than two GPS readings exist, which
/// leaves the duration undefined; that is reported as its own failure rather
/// than a tolerance mismatch. Checks run in a fixed order (GPS, OO, still,
/// burst) and the first violation aborts, so a wildly short duration reports
/// the GPS check deterministically even when several checks would fail.
///
/// Pure function of its inputs; no side effects.
pub fn validate(
    counts: &FileTypeCounts,
    elapsed_seconds: Option<f64>,
    thresholds: &ThresholdsConfig,
) -> Result<(), ConsistencyFailure> {
    let Some(elapsed) = elapsed_seconds else {
        return Err(ConsistencyFailure::InsufficientGpsData { count: counts.gps });
    };

    let checks = [
        (ConsistencyCheck::GpsDensity, counts.gps, elapsed, thresholds.gps_tolerance),
        (ConsistencyCheck::OoDensity, counts.oo, elapsed, thresholds.oo_tolerance),
        (
            ConsistencyCheck::StillImageDensity,
            counts.still_images,
            elapsed,
            thresholds.still_image_tolerance,
        ),
        (
            ConsistencyCheck::BurstImageDensity,
            counts.burst_images,
            elapsed * BURST_FRAME_RATE_HZ,
            thresholds.burst_image_tolerance,
        ),
    ];

    for (check, observed, expected, tolerance) in checks {
        if (observed as f64 - expected).abs() > tolerance {
            return Err(ConsistencyFailure::OutOfTolerance {
                check,
                observed,
                expected,
                tolerance,
            });
        }
    }

    Ok(())
}
