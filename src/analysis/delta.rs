// DeltaTrigger - motion-magnitude gesture source
//
// Instead of recognizing a posture, this source fires whenever the hand moves
// enough between two consecutive samples. Each firing emits the next word of
// a fixed cyclic list. Output goes straight to the dispatcher, skipping the
// classifier and the stabilizer.

use std::time::{Duration, Instant};

use crate::config::DeltaConfig;
use crate::sample::CanonicalSample;

#[derive(Debug, Clone, PartialEq)]
pub struct DeltaEvent {
    pub word: String,
    /// Sum of absolute component changes that caused the firing
    pub delta: f32,
}

#[derive(Debug)]
pub struct DeltaTrigger {
    movement_threshold: f32,
    cooldown: Duration,
    words: Vec<String>,
    index: usize,
    previous: Option<Vec<f32>>,
    last_sequence: u64,
    last_trigger: Option<Instant>,
}

impl DeltaTrigger {
    pub fn new(movement_threshold: f32, cooldown: Duration, words: Vec<String>) -> Self {
        Self {
            movement_threshold,
            cooldown,
            words,
            index: 0,
            previous: None,
            last_sequence: 0,
            last_trigger: None,
        }
    }

    pub fn from_config(config: &DeltaConfig) -> Self {
        Self::new(
            config.movement_threshold,
            Duration::from_millis(config.cooldown_ms),
            config.words.clone(),
        )
    }

    /// Index of the word emitted by the next firing
    pub fn next_index(&self) -> usize {
        self.index
    }

    /// Feed the latest stored sample
    ///
    /// `sequence` is the store's write counter; a repeated sequence means no
    /// new data and is ignored, as is sequence 0 (nothing received yet).
    pub fn observe(
        &mut self,
        sample: &CanonicalSample,
        sequence: u64,
        now: Instant,
    ) -> Option<DeltaEvent> {
        if sequence == 0 || sequence == self.last_sequence {
            return None;
        }
        self.last_sequence = sequence;

        let current = sample.flex_accel_vector();
        let delta: f32 = match &self.previous {
            Some(previous) => current
                .iter()
                .zip(previous)
                .map(|(c, p)| (c - p).abs())
                .sum(),
            None => {
                self.previous = Some(current);
                return None;
            }
        };
        self.previous = Some(current);

        if delta <= self.movement_threshold || self.words.is_empty() {
            return None;
        }
        let cooled_down = self
            .last_trigger
            .map(|at| now.saturating_duration_since(at) > self.cooldown)
            .unwrap_or(true);
        if !cooled_down {
            return None;
        }

        let word = self.words[self.index].clone();
        self.index = (self.index + 1) % self.words.len();
        self.last_trigger = Some(now);
        log::debug!("[DeltaTrigger] delta {:.3} fired '{}'", delta, word);

        Some(DeltaEvent { word, delta })
    }

    pub fn reset(&mut self) {
        self.index = 0;
        self.previous = None;
        self.last_sequence = 0;
        self.last_trigger = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Vec3;

    fn sample(flex: f32, accel_x: f32) -> CanonicalSample {
        CanonicalSample::new(
            vec![flex, flex],
            Vec3::new(accel_x, 0.0, 0.0),
            Vec3::default(),
            2,
        )
        .unwrap()
    }

    fn trigger() -> DeltaTrigger {
        DeltaTrigger::new(
            0.3,
            Duration::from_millis(1000),
            vec!["HELLO".to_string(), "WORLD".to_string()],
        )
    }

    #[test]
    fn test_first_sample_only_primes() {
        let mut trigger = trigger();
        let t0 = Instant::now();
        assert!(trigger.observe(&sample(10.0, 0.0), 1, t0).is_none());
        let event = trigger.observe(&sample(0.0, 0.0), 2, t0).unwrap();
        assert_eq!(event.word, "HELLO");
        assert!((event.delta - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_small_movement_does_not_fire() {
        let mut trigger = trigger();
        let t0 = Instant::now();
        trigger.observe(&sample(1.0, 0.0), 1, t0);
        assert!(trigger.observe(&sample(1.05, 0.05), 2, t0).is_none());
    }

    #[test]
    fn test_repeated_sequence_is_ignored() {
        let mut trigger = trigger();
        let t0 = Instant::now();
        trigger.observe(&sample(0.0, 0.0), 1, t0);
        assert!(trigger.observe(&sample(5.0, 0.0), 1, t0).is_none());
        assert!(trigger.observe(&sample(5.0, 0.0), 0, t0).is_none());
    }

    #[test]
    fn test_cooldown_then_cycle() {
        let mut trigger = trigger();
        let t0 = Instant::now();
        trigger.observe(&sample(0.0, 0.0), 1, t0);

        let first = trigger.observe(&sample(5.0, 0.0), 2, t0).unwrap();
        assert_eq!(first.word, "HELLO");

        // Within cooldown: no firing, but the vector still moves on
        let t1 = t0 + Duration::from_millis(500);
        assert!(trigger.observe(&sample(0.0, 0.0), 3, t1).is_none());

        // Exactly at cooldown is still blocked
        let t2 = t0 + Duration::from_millis(1000);
        assert!(trigger.observe(&sample(5.0, 0.0), 4, t2).is_none());

        let t3 = t0 + Duration::from_millis(1001);
        assert_eq!(trigger.observe(&sample(0.0, 0.0), 5, t3).unwrap().word, "WORLD");

        let t4 = t3 + Duration::from_millis(1500);
        assert_eq!(trigger.observe(&sample(5.0, 0.0), 6, t4).unwrap().word, "HELLO");
        assert_eq!(trigger.next_index(), 1);
    }

    #[test]
    fn test_empty_word_list_never_fires() {
        let mut trigger = DeltaTrigger::new(0.3, Duration::ZERO, Vec::new());
        let t0 = Instant::now();
        trigger.observe(&sample(0.0, 0.0), 1, t0);
        assert!(trigger.observe(&sample(9.0, 0.0), 2, t0).is_none());
    }
}
