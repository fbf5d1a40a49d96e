// Labeled line format: `FLEX:v,v,... | ACC:x,y,z | GYR:x,y,z`
//
// Sections may appear in any order. Labels are matched case-insensitively and
// every section is comma-split on its own. All three sections are required,
// each exactly once.

use super::parse_numbers;
use crate::error::ParseError;
use crate::sample::{CanonicalSample, Vec3};

/// True when the line uses the labeled format
pub fn detect(line: &str) -> bool {
    line.to_ascii_uppercase().contains("FLEX:")
}

pub fn parse(line: &str, flex_channels: usize) -> Result<CanonicalSample, ParseError> {
    let mut flex = None;
    let mut accel = None;
    let mut gyro = None;

    for section in line.split('|') {
        let section = section.trim();
        if section.is_empty() {
            continue;
        }
        let Some((label, body)) = section.split_once(':') else {
            return Err(ParseError::NotNumeric {
                token: section.to_string(),
            });
        };
        let label = label.trim();
        match label.to_ascii_uppercase().as_str() {
            "FLEX" => fill(&mut flex, "FLEX", parse_numbers(body.split(','))?)?,
            "ACC" => fill(&mut accel, "ACC", vec3("ACC", body)?)?,
            "GYR" => fill(&mut gyro, "GYR", vec3("GYR", body)?)?,
            _ => {
                return Err(ParseError::UnknownSection {
                    label: label.to_string(),
                })
            }
        }
    }

    let flex = flex.ok_or(ParseError::MissingSection { section: "FLEX" })?;
    let accel = accel.ok_or(ParseError::MissingSection { section: "ACC" })?;
    let gyro = gyro.ok_or(ParseError::MissingSection { section: "GYR" })?;
    CanonicalSample::new(flex, accel, gyro, flex_channels)
}

fn fill<T>(slot: &mut Option<T>, section: &'static str, value: T) -> Result<(), ParseError> {
    if slot.is_some() {
        return Err(ParseError::DuplicateSection { section });
    }
    *slot = Some(value);
    Ok(())
}

fn vec3(section: &'static str, body: &str) -> Result<Vec3, ParseError> {
    let values = parse_numbers(body.split(','))?;
    match values.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(ParseError::FieldCount {
            section,
            expected: 3,
            found: values.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_sections() {
        let sample = parse("FLEX:1,2,3 | ACC:0.1,0.2,0.9 | GYR:0,0,0.05", 3).unwrap();
        assert_eq!(sample.flex(), &[1.0, 2.0, 3.0]);
        assert_eq!(sample.accel(), Vec3::new(0.1, 0.2, 0.9));
        assert_eq!(sample.gyro(), Vec3::new(0.0, 0.0, 0.05));
    }

    #[test]
    fn labels_are_case_insensitive_and_unordered() {
        let sample = parse("gyr:1,1,1|Flex:5,6|acc:2,2,2", 2).unwrap();
        assert_eq!(sample.flex(), &[5.0, 6.0]);
        assert_eq!(sample.accel(), Vec3::new(2.0, 2.0, 2.0));
        assert!(detect("flex:1|acc:1,1,1|gyr:1,1,1"));
        assert!(!detect("1,2,3,4,5,6,7"));
    }

    #[test]
    fn missing_section_is_rejected() {
        assert_eq!(
            parse("FLEX:1,2 | ACC:0,0,1", 2),
            Err(ParseError::MissingSection { section: "GYR" })
        );
    }

    #[test]
    fn section_count_mismatch_is_rejected() {
        assert_eq!(
            parse("FLEX:1,2 | ACC:0,0 | GYR:0,0,0", 2),
            Err(ParseError::FieldCount {
                section: "ACC",
                expected: 3,
                found: 2
            })
        );
        assert!(matches!(
            parse("FLEX:1,2,3 | ACC:0,0,1 | GYR:0,0,0", 2),
            Err(ParseError::FieldCount { section: "FLEX", .. })
        ));
    }

    #[test]
    fn unknown_label_is_rejected() {
        assert_eq!(
            parse("FLEX:1 | MAG:0,0,0 | ACC:0,0,1 | GYR:0,0,0", 1),
            Err(ParseError::UnknownSection {
                label: "MAG".to_string()
            })
        );
    }

    #[test]
    fn duplicated_section_is_rejected() {
        assert_eq!(
            parse("FLEX:1,2 | ACC:0,0,1 | GYR:0,0,0 | acc:9,9,9", 2),
            Err(ParseError::DuplicateSection { section: "ACC" })
        );
        let err = parse("FLEX:1 | FLEX:2 | ACC:0,0,1 | GYR:0,0,0", 1).unwrap_err();
        assert_eq!(err, ParseError::DuplicateSection { section: "FLEX" });
        assert_eq!(err.kind(), "duplicate_section");
    }
}
