/*!
Ground clamper settings and tolerances.

These constants centralize the parameters used by the surface probe, the
surface fitter and the batch coordinator. `ClamperSettings` carries the
tunable subset so applications can override them per clamper (typically from
scenario or level data).

Notes
- Distances are in meters, time in seconds.
- Ranges of `0.0` disable the corresponding level-of-detail rule.
*/

use serde::{Deserialize, Serialize};

/// Minimum time between real queries for intermittently clamped actors (seconds).
pub const DEFAULT_INTERMITTENT_TIME_DELTA: f32 = 1.0;

/// Half-length of a vertical probe segment (meters).
/// Probes span from this far above to this far below the probe origin.
pub const DEFAULT_PROBE_HALF_LENGTH: f32 = 100.0;

/// Expected number of deferred requests per tick. Only a capacity hint.
pub const DEFAULT_BATCH_CAPACITY: usize = 32;

/// Practical small distance for comparisons (meters).
pub const DIST_EPS: f32 = 1.0e-6;

/// Distance a mesh re-cast advances past a crossing before looking for the
/// next layer (meters). Surfaces closer together than this merge into one hit.
pub const LAYER_SKIP_DIST: f32 = 1.0e-3;

/// Cosine tolerance under which two unit normals are treated as identical.
pub const ALIGN_EPS: f32 = 1.0e-6;

/// Tunable clamper parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClamperSettings {
    /// Seconds between real queries on the intermittent path.
    pub intermittent_time_delta: f32,
    /// Beyond this distance from the eye point three-point requests use a single
    /// batched probe. `0.0` disables the rule.
    pub high_res_range: f32,
    /// Beyond this distance from the eye point three-point requests fall back to
    /// intermittent clamping. `0.0` disables the rule.
    pub low_res_range: f32,
    /// Half-length of every vertical probe segment.
    pub probe_half_length: f32,
    /// Initial batch capacity.
    pub batch_capacity: usize,
}

impl Default for ClamperSettings {
    fn default() -> Self {
        Self {
            intermittent_time_delta: DEFAULT_INTERMITTENT_TIME_DELTA,
            high_res_range: 0.0,
            low_res_range: 0.0,
            probe_half_length: DEFAULT_PROBE_HALF_LENGTH,
            batch_capacity: DEFAULT_BATCH_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    #[error("`{field}` must be finite and non-negative, got {value}")]
    Negative { field: &'static str, value: f32 },
    #[error("`probe_half_length` must be finite and positive, got {0}")]
    ProbeLength(f32),
}

impl ClamperSettings {
    /// Check the settings and hand them back unchanged when usable.
    pub fn validated(self) -> Result<Self, SettingsError> {
        let non_negative = [
            ("intermittent_time_delta", self.intermittent_time_delta),
            ("high_res_range", self.high_res_range),
            ("low_res_range", self.low_res_range),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(SettingsError::Negative { field, value });
            }
        }

        if !self.probe_half_length.is_finite() || self.probe_half_length <= DIST_EPS {
            return Err(SettingsError::ProbeLength(self.probe_half_length));
        }

        Ok(self)
    }

    #[inline]
    pub fn high_res_range_sq(&self) -> f32 {
        self.high_res_range * self.high_res_range
    }

    #[inline]
    pub fn low_res_range_sq(&self) -> f32 {
        self.low_res_range * self.low_res_range
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = ClamperSettings::default();
        assert_eq!(s.intermittent_time_delta, 1.0);
        assert_eq!(s.high_res_range, 0.0);
        assert_eq!(s.low_res_range, 0.0);
        assert_eq!(s.probe_half_length, 100.0);
        assert_eq!(s.batch_capacity, 32);
        assert!(s.validated().is_ok());
    }

    #[test]
    fn validation_rejects_negative_and_nan_values() {
        let s = ClamperSettings {
            low_res_range: -1.0,
            ..ClamperSettings::default()
        };
        assert_eq!(
            s.validated(),
            Err(SettingsError::Negative {
                field: "low_res_range",
                value: -1.0
            })
        );

        let s = ClamperSettings {
            intermittent_time_delta: f32::NAN,
            ..ClamperSettings::default()
        };
        assert!(matches!(
            s.validated(),
            Err(SettingsError::Negative {
                field: "intermittent_time_delta",
                ..
            })
        ));

        let s = ClamperSettings {
            probe_half_length: 0.0,
            ..ClamperSettings::default()
        };
        assert_eq!(s.validated(), Err(SettingsError::ProbeLength(0.0)));
    }
}
