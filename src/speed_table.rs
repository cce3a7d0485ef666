//! Joystick direction to differential drive mapping.
//!
//! The calibration table describes an 8 direction joystick. At every compass
//! point one wheel runs at full speed while the other one sweeps from full
//! forward to full reverse. Directions between compass points are linearly
//! interpolated.

use crate::error::RobotError;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationPoint {
    pub angle: u16,
    pub left: i8,
    pub right: i8,
}

impl CalibrationPoint {
    pub const fn new(angle: u16, left: i8, right: i8) -> Self {
        Self { angle, left, right }
    }
}

/// Both 0 and 360 are listed so that the table is periodic without
/// normalizing the input angle.
pub const CALIBRATION: [CalibrationPoint; 9] = [
    CalibrationPoint::new(0, 1, 1),
    CalibrationPoint::new(45, 1, 0),
    CalibrationPoint::new(90, 1, -1),
    CalibrationPoint::new(135, 0, -1),
    CalibrationPoint::new(180, -1, -1),
    CalibrationPoint::new(225, -1, 0),
    CalibrationPoint::new(270, -1, 1),
    CalibrationPoint::new(315, 0, 1),
    CalibrationPoint::new(360, 1, 1),
];

/// Piecewise linear lookup over an `angle -> value` table.
#[derive(Debug, Clone)]
pub struct AngularInterpolator {
    points: Vec<(f64, f64)>,
}

impl AngularInterpolator {
    /// Angles have to be strictly increasing and there have to be at least two points.
    pub fn new(points: Vec<(f64, f64)>) -> Result<Self, RobotError> {
        if points.len() < 2 {
            return Err(RobotError::InvalidInput(
                points.first().map(|(angle, _)| *angle).unwrap_or(f64::NAN),
            ));
        }
        if let Some(pair) = points.windows(2).find(|pair| pair[0].0 >= pair[1].0) {
            return Err(RobotError::InvalidInput(pair[1].0));
        }
        Ok(Self { points })
    }

    pub fn lookup(&self, angle: f64) -> Result<f64, RobotError> {
        let first = self.points[0].0;
        let last = self.points[self.points.len() - 1].0;
        if !(first..=last).contains(&angle) {
            return Err(RobotError::InvalidInput(angle));
        }

        let upper = self.points.partition_point(|(point, _)| *point < angle);
        let (upper_angle, upper_value) = self.points[upper];
        if upper_angle == angle {
            return Ok(upper_value);
        }
        let (lower_angle, lower_value) = self.points[upper - 1];
        Ok(lower_value
            + (upper_value - lower_value) * (angle - lower_angle) / (upper_angle - lower_angle))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelSpeeds {
    pub left: f64,
    pub right: f64,
}

#[derive(Debug, Clone)]
pub struct SpeedTable {
    left: AngularInterpolator,
    right: AngularInterpolator,
}

impl SpeedTable {
    pub fn from_calibration(points: &[CalibrationPoint]) -> Result<Self, RobotError> {
        let left = points
            .iter()
            .map(|point| (f64::from(point.angle), f64::from(point.left)))
            .collect();
        let right = points
            .iter()
            .map(|point| (f64::from(point.angle), f64::from(point.right)))
            .collect();
        Ok(Self {
            left: AngularInterpolator::new(left)?,
            right: AngularInterpolator::new(right)?,
        })
    }

    /// Table built from [`CALIBRATION`]. Call once during startup to build it eagerly.
    pub fn global() -> &'static SpeedTable {
        static INSTANCE: OnceLock<SpeedTable> = OnceLock::new();
        INSTANCE.get_or_init(|| {
            SpeedTable::from_calibration(&CALIBRATION)
                .expect("built in calibration table has increasing angles")
        })
    }

    pub fn factors_for_angle(&self, angle: f64) -> Result<(f64, f64), RobotError> {
        Ok((self.left.lookup(angle)?, self.right.lookup(angle)?))
    }

    /// Speed is not clamped.
    pub fn from_angle(&self, angle: f64, speed: f64) -> Result<WheelSpeeds, RobotError> {
        let (left, right) = self.factors_for_angle(angle)?;
        Ok(WheelSpeeds {
            left: left * speed,
            right: right * speed,
        })
    }
}
