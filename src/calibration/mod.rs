// Calibration module - per-channel ranges and threshold pairs
//
// The profile is supplied at startup and never mutated during a run. It maps
// raw flex readings into [0, 1] (0 = bent, 1 = straight), then into discrete
// finger states through a hysteresis pair, and maps the accelerometer z axis
// into a palm orientation.

pub mod profile;

pub use profile::{
    CalibrationProfile, ChannelRange, FingerState, HysteresisThresholds, PalmLimits,
    PalmOrientation,
};
