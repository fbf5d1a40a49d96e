// Sample module - canonical sensor reading and the shared sample store
//
// A CanonicalSample is the only shape the rest of the pipeline sees. Every
// wire format is converted into it by the ingestion adapter, and it can only
// be built through a validating constructor so downstream code never has to
// re-check field counts or NaNs.

pub mod store;

pub use store::{SampleStore, SampleUpdate, StoredSample};

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Three-axis reading (accelerometer or gyroscope)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Sum of absolute components (used by the motion gate)
    pub fn abs_sum(&self) -> f32 {
        self.x.abs() + self.y.abs() + self.z.abs()
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Fixed-shape sensor reading produced by the ingestion adapter
///
/// Flex channel order is meaningful (it matches the calibration profile and
/// rule patterns). The channel count is fixed per deployment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalSample {
    flex: Vec<f32>,
    accel: Vec3,
    gyro: Vec3,
}

impl CanonicalSample {
    /// Build a sample, rejecting wrong channel counts and non-finite values
    pub fn new(
        flex: Vec<f32>,
        accel: Vec3,
        gyro: Vec3,
        flex_channels: usize,
    ) -> Result<Self, ParseError> {
        if flex.len() != flex_channels {
            return Err(ParseError::FieldCount {
                section: "FLEX",
                expected: flex_channels,
                found: flex.len(),
            });
        }
        if let Some(bad) = flex.iter().find(|v| !v.is_finite()) {
            return Err(ParseError::NotFinite {
                token: bad.to_string(),
            });
        }
        if !accel.is_finite() || !gyro.is_finite() {
            return Err(ParseError::NotFinite {
                token: "imu".to_string(),
            });
        }

        Ok(Self { flex, accel, gyro })
    }

    /// All-zero sample used before the first line arrives
    pub fn zeroed(flex_channels: usize) -> Self {
        Self {
            flex: vec![0.0; flex_channels],
            accel: Vec3::default(),
            gyro: Vec3::default(),
        }
    }

    pub fn flex(&self) -> &[f32] {
        &self.flex
    }

    pub fn accel(&self) -> Vec3 {
        self.accel
    }

    pub fn gyro(&self) -> Vec3 {
        self.gyro
    }

    /// Flex values followed by accel x/y/z (delta trigger feature vector)
    pub fn flex_accel_vector(&self) -> Vec<f32> {
        let mut vector = Vec::with_capacity(self.flex.len() + 3);
        vector.extend_from_slice(&self.flex);
        vector.extend_from_slice(&self.accel.to_array());
        vector
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_wrong_channel_count() {
        let result = CanonicalSample::new(vec![1.0, 2.0], Vec3::default(), Vec3::default(), 3);
        assert_eq!(
            result,
            Err(ParseError::FieldCount {
                section: "FLEX",
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn test_new_rejects_nan() {
        let result = CanonicalSample::new(
            vec![1.0, f32::NAN],
            Vec3::default(),
            Vec3::default(),
            2,
        );
        assert!(matches!(result, Err(ParseError::NotFinite { .. })));

        let result = CanonicalSample::new(
            vec![1.0, 2.0],
            Vec3::new(0.0, f32::INFINITY, 0.0),
            Vec3::default(),
            2,
        );
        assert!(matches!(result, Err(ParseError::NotFinite { .. })));
    }

    #[test]
    fn test_flex_accel_vector_order() {
        let sample = CanonicalSample::new(
            vec![1.0, 2.0],
            Vec3::new(3.0, 4.0, 5.0),
            Vec3::new(9.0, 9.0, 9.0),
            2,
        )
        .unwrap();
        assert_eq!(sample.flex_accel_vector(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_abs_sum() {
        assert_eq!(Vec3::new(-0.1, 0.2, -0.3).abs_sum(), 0.1 + 0.2 + 0.3);
    }
}
