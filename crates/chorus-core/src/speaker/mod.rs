//! Next-speaker selection and anti-repetition.
//!
//! - `WeightedPool`: explicit weighted random choice with injectable PRNG
//! - `RepetitionDetector`: overused-phrase and greeting-spam detection
//! - `SpeakerSelector`: cooldown- and time-of-day-aware persona choice

pub mod repetition;
pub mod selector;
pub mod weighted;
