// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Product parameter sets

use crate::error::{PipeError, PipeResult};
use serde::{Deserialize, Serialize};

/// Dimensions of a hollow circle-to-rectangle transition duct.
///
/// The circular end sits at `z = 0`, the rectangular end at `z = length`,
/// both centered on the z axis. All values share one length unit (mm in
/// practice).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuctParameters {
    pub wall_thickness: f64,
    pub circular_radius: f64,
    pub square_width: f64,
    pub square_height: f64,
    pub length: f64,
}

impl DuctParameters {
    pub fn new(
        wall_thickness: f64,
        circular_radius: f64,
        square_width: f64,
        square_height: f64,
        length: f64,
    ) -> Self {
        Self {
            wall_thickness,
            circular_radius,
            square_width,
            square_height,
            length,
        }
    }

    /// Check every geometric precondition, reporting the first violation.
    pub fn validate(&self) -> PipeResult<()> {
        let fields = [
            ("wall_thickness", self.wall_thickness),
            ("circular_radius", self.circular_radius),
            ("square_width", self.square_width),
            ("square_height", self.square_height),
            ("length", self.length),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(PipeError::invalid(format!("{name} must be finite, got {value}")));
        }

        if self.wall_thickness <= 0.0 {
            return Err(PipeError::invalid(format!(
                "wall_thickness must be positive, got {}",
                self.wall_thickness
            )));
        }
        if self.length <= 0.0 {
            return Err(PipeError::invalid(format!(
                "length must be positive, got {}",
                self.length
            )));
        }
        if self.inner_radius() <= 0.0 {
            return Err(PipeError::invalid(format!(
                "wall_thickness {} leaves no inner radius for circular_radius {}",
                self.wall_thickness, self.circular_radius
            )));
        }
        let (inner_hw, inner_hh) = self.inner_half_extents();
        if inner_hw <= 0.0 || inner_hh <= 0.0 {
            return Err(PipeError::invalid(format!(
                "wall_thickness {} leaves no inner opening for a {} x {} rectangle",
                self.wall_thickness, self.square_width, self.square_height
            )));
        }
        Ok(())
    }

    pub fn outer_half_extents(&self) -> (f64, f64) {
        (self.square_width / 2.0, self.square_height / 2.0)
    }

    pub fn inner_half_extents(&self) -> (f64, f64) {
        let (hw, hh) = self.outer_half_extents();
        (hw - self.wall_thickness, hh - self.wall_thickness)
    }

    pub fn inner_radius(&self) -> f64 {
        self.circular_radius - self.wall_thickness
    }

    /// Artifact file name, stable for identical parameters.
    ///
    /// Gross dimensions are written in shortest form while the wall thickness
    /// always keeps its fractional digit, e.g. `ventilation_pipe_50-30-60-10-1.0.stl`.
    pub fn file_name(&self) -> String {
        format!(
            "ventilation_pipe_{}-{}-{}-{}-{:?}.stl",
            self.square_width,
            self.square_height,
            self.length,
            self.circular_radius,
            self.wall_thickness
        )
    }
}

impl Default for DuctParameters {
    fn default() -> Self {
        Self::new(1.0, 10.0, 50.0, 30.0, 60.0)
    }
}

/// Server rack request. The rack itself is produced by an external CAD
/// service; only its cache identity lives here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RackParameters {
    pub servers: u32,
}

impl Default for RackParameters {
    fn default() -> Self {
        Self { servers: 10 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_parameters_are_valid() {
        assert!(DuctParameters::default().validate().is_ok());
    }

    #[test]
    fn wall_thicker_than_radius_is_rejected() {
        let params = DuctParameters {
            wall_thickness: 12.0,
            ..Default::default()
        };
        let err = params.validate().unwrap_err();
        assert!(matches!(err, PipeError::InvalidGeometryParameters { .. }));
        assert!(err.to_string().contains("inner radius"));
    }

    #[test]
    fn wall_equal_to_half_height_is_rejected() {
        let params = DuctParameters {
            wall_thickness: 15.0,
            circular_radius: 20.0,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(PipeError::InvalidGeometryParameters { .. })
        ));
    }

    #[test]
    fn non_positive_and_non_finite_values_are_rejected() {
        for params in [
            DuctParameters {
                wall_thickness: 0.0,
                ..Default::default()
            },
            DuctParameters {
                wall_thickness: -1.0,
                ..Default::default()
            },
            DuctParameters {
                length: 0.0,
                ..Default::default()
            },
            DuctParameters {
                square_width: f64::NAN,
                ..Default::default()
            },
            DuctParameters {
                circular_radius: f64::INFINITY,
                ..Default::default()
            },
        ] {
            assert!(params.validate().is_err(), "{params:?} should be rejected");
        }
    }

    #[test]
    fn file_name_keeps_established_format() {
        let name = DuctParameters::default().file_name();
        assert_eq!(name, "ventilation_pipe_50-30-60-10-1.0.stl");

        let fractional = DuctParameters::new(1.25, 12.5, 40.0, 20.0, 75.0).file_name();
        assert_eq!(fractional, "ventilation_pipe_40-20-75-12.5-1.25.stl");
    }

    #[test]
    fn deserializes_partial_json_with_defaults() {
        let params: DuctParameters =
            serde_json::from_str(r#"{"square_width": 80, "wall_thickness": 2}"#).unwrap();
        assert_eq!(params.square_width, 80.0);
        assert_eq!(params.wall_thickness, 2.0);
        assert_eq!(params.length, 60.0);
    }
}
