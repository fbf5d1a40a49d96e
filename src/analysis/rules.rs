// Rule table - ordered (finger pattern, palm constraint) -> label mapping
//
// Rules are data, evaluated by one matcher in declaration order. The first
// rule whose pattern and palm constraint both match wins, so overlapping
// rules resolve by position in the table.

use serde::{Deserialize, Serialize};

use crate::calibration::{FingerState, PalmOrientation};
use crate::error::ConfigError;

/// One finger slot in a rule pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FingerMatch {
    Bent,
    Straight,
    Transitional,
    /// Matches every finger state
    Any,
}

impl FingerMatch {
    pub fn matches(&self, state: FingerState) -> bool {
        match self {
            FingerMatch::Any => true,
            FingerMatch::Bent => state == FingerState::Bent,
            FingerMatch::Straight => state == FingerState::Straight,
            FingerMatch::Transitional => state == FingerState::Transitional,
        }
    }
}

/// Palm requirement of a rule
///
/// Serialized as `"ANY"`, `{"IS": "PALM_UP"}` or `{"NOT": "PALM_UP"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PalmConstraint {
    #[default]
    Any,
    Is(PalmOrientation),
    Not(PalmOrientation),
}

impl PalmConstraint {
    pub fn matches(&self, palm: PalmOrientation) -> bool {
        match self {
            PalmConstraint::Any => true,
            PalmConstraint::Is(expected) => palm == *expected,
            PalmConstraint::Not(excluded) => palm != *excluded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub label: String,
    /// One entry per calibrated flex channel
    pub fingers: Vec<FingerMatch>,
    #[serde(default)]
    pub palm: PalmConstraint,
}

impl Rule {
    pub fn new(label: impl Into<String>, fingers: Vec<FingerMatch>, palm: PalmConstraint) -> Self {
        Self {
            label: label.into(),
            fingers,
            palm,
        }
    }

    pub fn matches(&self, fingers: &[FingerState], palm: PalmOrientation) -> bool {
        self.fingers.len() == fingers.len()
            && self
                .fingers
                .iter()
                .zip(fingers)
                .all(|(pattern, state)| pattern.matches(*state))
            && self.palm.matches(palm)
    }
}

/// Ordered rule list, first match wins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Check every pattern has one slot per calibrated channel
    pub fn validate(&self, calibrated_channels: usize) -> Result<(), ConfigError> {
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.label.trim().is_empty() {
                return Err(ConfigError::InvalidRule {
                    index,
                    reason: "label is empty".to_string(),
                });
            }
            if rule.fingers.len() != calibrated_channels {
                return Err(ConfigError::InvalidRule {
                    index,
                    reason: format!(
                        "pattern has {} fingers, calibration has {} channels",
                        rule.fingers.len(),
                        calibrated_channels
                    ),
                });
            }
        }
        Ok(())
    }

    /// Label of the first matching rule
    pub fn first_match(&self, fingers: &[FingerState], palm: PalmOrientation) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.matches(fingers, palm))
            .map(|rule| rule.label.as_str())
    }
}

impl Default for RuleTable {
    /// Vocabulary of the reference glove (index, middle, ring, pinky)
    fn default() -> Self {
        use FingerMatch::{Bent as B, Straight as S};
        use PalmOrientation::PalmUp;

        Self::new(vec![
            Rule::new("HELLO", vec![S, S, S, S], PalmConstraint::Is(PalmUp)),
            Rule::new("I", vec![S, B, B, B], PalmConstraint::Not(PalmUp)),
            Rule::new("YASH", vec![S, S, B, B], PalmConstraint::Is(PalmUp)),
            Rule::new("WE", vec![S, S, S, B], PalmConstraint::Is(PalmUp)),
            Rule::new("TEAM_FSOCIETY", vec![B, B, B, B], PalmConstraint::Any),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use FingerState::{Bent, Straight, Transitional};

    #[test]
    fn test_any_matches_every_state() {
        for state in [Bent, Straight, Transitional] {
            assert!(FingerMatch::Any.matches(state));
        }
        assert!(!FingerMatch::Bent.matches(Straight));
    }

    #[test]
    fn test_palm_constraints() {
        let up = PalmOrientation::PalmUp;
        let down = PalmOrientation::PalmDown;
        assert!(PalmConstraint::Any.matches(down));
        assert!(PalmConstraint::Is(up).matches(up));
        assert!(!PalmConstraint::Is(up).matches(down));
        assert!(PalmConstraint::Not(up).matches(down));
        assert!(!PalmConstraint::Not(up).matches(up));
    }

    #[test]
    fn test_first_match_wins_on_overlap() {
        let table = RuleTable::new(vec![
            Rule::new("FIRST", vec![FingerMatch::Any, FingerMatch::Straight], PalmConstraint::Any),
            Rule::new("SECOND", vec![FingerMatch::Bent, FingerMatch::Straight], PalmConstraint::Any),
        ]);
        assert_eq!(
            table.first_match(&[Bent, Straight], PalmOrientation::Tilted),
            Some("FIRST")
        );
    }

    #[test]
    fn test_no_match_is_none() {
        let table = RuleTable::default();
        assert_eq!(
            table.first_match(&[Transitional; 4], PalmOrientation::PalmUp),
            None
        );
    }

    #[test]
    fn test_default_vocabulary() {
        let table = RuleTable::default();
        assert_eq!(
            table.first_match(&[Straight; 4], PalmOrientation::PalmUp),
            Some("HELLO")
        );
        assert_eq!(
            table.first_match(&[Straight, Bent, Bent, Bent], PalmOrientation::PalmDown),
            Some("I")
        );
        assert_eq!(
            table.first_match(&[Straight, Bent, Bent, Bent], PalmOrientation::PalmUp),
            None
        );
        assert_eq!(
            table.first_match(&[Bent; 4], PalmOrientation::Tilted),
            Some("TEAM_FSOCIETY")
        );
    }

    #[test]
    fn test_validate_rejects_wrong_arity() {
        assert!(RuleTable::default().validate(4).is_ok());
        let err = RuleTable::default().validate(5).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRule { index: 0, .. }));
    }

    #[test]
    fn test_rule_json_shape() {
        let json = r#"[
            {"label": "HELLO", "fingers": ["STRAIGHT", "ANY"], "palm": {"IS": "PALM_UP"}},
            {"label": "I", "fingers": ["BENT", "BENT"], "palm": {"NOT": "PALM_DOWN"}},
            {"label": "FIST", "fingers": ["BENT", "BENT"]}
        ]"#;
        let table: RuleTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rules()[0].palm, PalmConstraint::Is(PalmOrientation::PalmUp));
        assert_eq!(table.rules()[1].palm, PalmConstraint::Not(PalmOrientation::PalmDown));
        assert_eq!(table.rules()[2].palm, PalmConstraint::Any);
    }
}
