use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// `1 / rate` seconds, if that is a non-zero [`Duration`].
fn tick_interval(rate: f32) -> Option<Duration> {
    Duration::try_from_secs_f64(1.0 / f64::from(rate)).ok().filter(|d| !d.is_zero())
}

/// Row count the form update path always uses, whatever the form says.
pub const FIXED_FORM_ROW_COUNT: u32 = 9;

/// Parameters for one board configuration.
///
/// Geometric values are in world units (y grows downward). Material values are
/// handed to the physics world untouched. Any change to any field means the
/// board is rebuilt from scratch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub peg_radius: f32,
    pub column_spacing: f32,
    pub row_spacing: f32,
    pub particle_radius: f32,
    pub density: f32,
    pub restitution: f32,
    pub friction: f32,
    pub air_friction: f32,
    /// Number of peg rows; also the number of bins.
    pub row_count: u32,
    pub gravity_y: f32,
    /// Particles per second.
    pub spawn_rate: f32,
}

impl Default for ParameterSet {
    fn default() -> Self {
        ParameterSet {
            peg_radius: 10.0,
            column_spacing: 80.0,
            row_spacing: 40.0,
            particle_radius: 10.0,
            density: 0.1,
            restitution: 0.5,
            friction: 0.01,
            air_friction: 0.01,
            row_count: FIXED_FORM_ROW_COUNT,
            gravity_y: 1.0,
            spawn_rate: 2.0,
        }
    }
}

impl ParameterSet {
    /// Checks every field, returning the first violation found.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("peg_radius", self.peg_radius),
            ("column_spacing", self.column_spacing),
            ("row_spacing", self.row_spacing),
            ("particle_radius", self.particle_radius),
            ("spawn_rate", self.spawn_rate),
        ];
        let non_negative = [
            ("density", self.density),
            ("restitution", self.restitution),
            ("friction", self.friction),
            ("air_friction", self.air_friction),
        ];

        for (field, value) in positive.iter().chain(non_negative.iter()).copied() {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field, value });
            }
        }
        if !self.gravity_y.is_finite() {
            return Err(ConfigError::NonFinite { field: "gravity_y", value: self.gravity_y });
        }
        for (field, value) in positive {
            if value <= 0.0 {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        for (field, value) in non_negative {
            if value < 0.0 {
                return Err(ConfigError::Negative { field, value });
            }
        }
        if tick_interval(self.spawn_rate).is_none() {
            return Err(ConfigError::InvalidSetting(format!(
                "spawn_rate {} gives no usable tick interval",
                self.spawn_rate
            )));
        }
        if self.row_count < 1 {
            return Err(ConfigError::RowCount(self.row_count));
        }
        Ok(())
    }

    /// Consumes the set and hands it back only if it is valid.
    pub fn validated(self) -> Result<Self> {
        self.validate()?;
        Ok(self)
    }

    /// Time between two spawn ticks (`1000 / spawn_rate` milliseconds).
    ///
    /// Only meaningful for a validated set; anything else yields
    /// [`Duration::MAX`].
    pub fn spawn_interval(&self) -> Duration {
        tick_interval(self.spawn_rate).unwrap_or(Duration::MAX)
    }

    /// Builds a parameter set from raw form input.
    ///
    /// `row_count` is pinned to [`FIXED_FORM_ROW_COUNT`] no matter what the
    /// form carries.
    pub fn from_form(form: &FormValues) -> Result<Self> {
        ParameterSet {
            peg_radius: form.peg_radius,
            column_spacing: form.column_spacing,
            row_spacing: form.row_spacing,
            particle_radius: form.particle_radius,
            density: form.density,
            restitution: form.restitution,
            friction: form.friction,
            air_friction: form.air_friction,
            row_count: FIXED_FORM_ROW_COUNT,
            gravity_y: form.gravity_y,
            spawn_rate: form.spawn_rate,
        }
        .validated()
    }
}

/// Values as entered in the parameter form.
///
/// Missing fields fall back to the defaults of [`ParameterSet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormValues {
    pub peg_radius: f32,
    pub column_spacing: f32,
    pub row_spacing: f32,
    pub particle_radius: f32,
    pub density: f32,
    pub restitution: f32,
    pub friction: f32,
    pub air_friction: f32,
    /// Shown in the form but ignored by [`ParameterSet::from_form`].
    pub row_count: u32,
    pub gravity_y: f32,
    pub spawn_rate: f32,
}

impl Default for FormValues {
    fn default() -> Self {
        FormValues::from(&ParameterSet::default())
    }
}

impl From<&ParameterSet> for FormValues {
    fn from(params: &ParameterSet) -> Self {
        FormValues {
            peg_radius: params.peg_radius,
            column_spacing: params.column_spacing,
            row_spacing: params.row_spacing,
            particle_radius: params.particle_radius,
            density: params.density,
            restitution: params.restitution,
            friction: params.friction,
            air_friction: params.air_friction,
            row_count: params.row_count,
            gravity_y: params.gravity_y,
            spawn_rate: params.spawn_rate,
        }
    }
}

impl FormValues {
    /// Parses a form submission stored as TOML.
    pub fn from_toml_str(input: &str, origin: &str) -> Result<Self> {
        toml::from_str(input).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = ParameterSet::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.row_count, 9);
        assert_eq!(params.column_spacing, 80.0);
        assert_eq!(params.spawn_rate, 2.0);
    }

    #[test]
    fn rejects_non_positive_geometry() {
        let params = ParameterSet { row_spacing: 0.0, ..ParameterSet::default() };
        match params.validate() {
            Err(ConfigError::NonPositive { field, .. }) => assert_eq!(field, "row_spacing"),
            other => panic!("expected NonPositive, got {other:?}"),
        }

        let params = ParameterSet { peg_radius: -1.0, ..ParameterSet::default() };
        assert!(matches!(params.validate(), Err(ConfigError::NonPositive { field: "peg_radius", .. })));
    }

    #[test]
    fn rejects_zero_rows() {
        let params = ParameterSet { row_count: 0, ..ParameterSet::default() };
        assert!(matches!(params.validate(), Err(ConfigError::RowCount(0))));
    }

    #[test]
    fn rejects_nan_and_negative_material() {
        let params = ParameterSet { gravity_y: f32::NAN, ..ParameterSet::default() };
        assert!(matches!(params.validate(), Err(ConfigError::NonFinite { field: "gravity_y", .. })));

        let params = ParameterSet { friction: -0.1, ..ParameterSet::default() };
        assert!(matches!(params.validate(), Err(ConfigError::Negative { field: "friction", .. })));
    }

    #[test]
    fn zero_material_values_are_allowed() {
        let params = ParameterSet {
            density: 0.0,
            restitution: 0.0,
            friction: 0.0,
            air_friction: 0.0,
            gravity_y: -2.0,
            ..ParameterSet::default()
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn spawn_interval_follows_rate() {
        let params = ParameterSet::default();
        assert_eq!(params.spawn_interval(), Duration::from_millis(500));

        let params = ParameterSet { spawn_rate: 4.0, ..ParameterSet::default() };
        assert_eq!(params.spawn_interval(), Duration::from_millis(250));
    }

    #[test]
    fn rejects_rates_without_a_tick_interval() {
        for rate in [1e-25, f32::MIN_POSITIVE, 1e30] {
            let params = ParameterSet { spawn_rate: rate, ..ParameterSet::default() };
            assert!(
                matches!(params.validate(), Err(ConfigError::InvalidSetting(_))),
                "spawn_rate {rate} should be rejected"
            );
            assert_eq!(params.spawn_interval(), Duration::MAX);
        }

        let params = ParameterSet { spawn_rate: 1e-6, ..ParameterSet::default() };
        assert!(params.validate().is_ok());
        assert_eq!(params.spawn_interval().as_secs(), 1_000_000);
    }

    #[test]
    fn form_pins_row_count() {
        let form = FormValues { row_count: 5, column_spacing: 60.0, ..FormValues::default() };
        let params = ParameterSet::from_form(&form).unwrap();
        assert_eq!(params.row_count, FIXED_FORM_ROW_COUNT);
        assert_eq!(params.column_spacing, 60.0);
    }

    #[test]
    fn form_is_validated() {
        let form = FormValues { particle_radius: 0.0, ..FormValues::default() };
        assert!(ParameterSet::from_form(&form).is_err());
    }

    #[test]
    fn form_toml_fills_missing_fields() {
        let form = FormValues::from_toml_str("gravity_y = 2.5\nrow_count = 3\n", "test").unwrap();
        assert_eq!(form.gravity_y, 2.5);
        assert_eq!(form.row_count, 3);
        assert_eq!(form.peg_radius, 10.0);
    }
}
