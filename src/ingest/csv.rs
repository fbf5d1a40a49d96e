// Comma-separated line format: N flex values, accel x/y/z, gyro x/y/z

use super::parse_numbers;
use crate::error::ParseError;
use crate::sample::{CanonicalSample, Vec3};

pub fn parse(line: &str, flex_channels: usize) -> Result<CanonicalSample, ParseError> {
    let values = parse_numbers(line.split(','))?;
    let expected = flex_channels + 6;
    if values.len() != expected {
        return Err(ParseError::FieldCount {
            section: "CSV",
            expected,
            found: values.len(),
        });
    }

    let (flex, imu) = values.split_at(flex_channels);
    CanonicalSample::new(
        flex.to_vec(),
        Vec3::new(imu[0], imu[1], imu[2]),
        Vec3::new(imu[3], imu[4], imu[5]),
        flex_channels,
    )
}
