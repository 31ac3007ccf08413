use rand::Rng;
use std::ops::RangeInclusive;

use super::constants::{CODE_MAX, CODE_MIN};

/// Draw a 4-digit share code, uniformly from `CODE_MIN..=CODE_MAX`
pub fn generate_code() -> u16 {
    generate_code_in(CODE_MIN..=CODE_MAX)
}

/// Draw a code uniformly from `range`
pub fn generate_code_in(range: RangeInclusive<u16>) -> u16 {
    rand::rng().random_range(range)
}
