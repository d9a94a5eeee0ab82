use crate::constants::{LINK_END_OF_PROGRAM, MAX_STEPS_PER_PATTERN};

/// One (temperature, hold time) pair in program memory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub temperature: f64,
    pub minutes: u16,
}

/// A hardware pattern: up to eight consecutive steps, a link to the next
/// pattern (or the end-of-program sentinel) and a repeat count.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub index: u8,
    pub steps: Vec<Step>,
    pub link: u16,
    pub cycles: u16,
}

impl Pattern {
    /// Register value for the step count; the device stores `steps - 1`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn step_count_value(&self) -> u16 {
        self.steps.len() as u16 - 1
    }
}

/// Pair each ramp temperature with its hold time. The very first step of
/// the program may use a distinct duration.
pub fn build_steps(temperatures: &[f64], first_step_minutes: u16, step_minutes: u16) -> Vec<Step> {
    temperatures
        .iter()
        .enumerate()
        .map(|(index, &temperature)| Step {
            temperature,
            minutes: if index == 0 {
                first_step_minutes
            } else {
                step_minutes
            },
        })
        .collect()
}

/// Chunk an ordered step sequence into hardware patterns, chaining each
/// pattern's link to the next and terminating the last one. Pure; callers
/// do the register writes.
#[allow(clippy::cast_possible_truncation)]
pub fn encode(steps: &[Step]) -> Vec<Pattern> {
    let chunks: Vec<&[Step]> = steps.chunks(usize::from(MAX_STEPS_PER_PATTERN)).collect();
    let total = chunks.len();
    chunks
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| Pattern {
            index: index as u8,
            steps: chunk.to_vec(),
            link: if index + 1 == total {
                LINK_END_OF_PROGRAM
            } else {
                index as u16 + 1
            },
            cycles: 0,
        })
        .collect()
}

/// The controller stores temperatures as °C × 10, signed.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn encode_temperature(celsius: f64) -> u16 {
    let raw = (celsius * 10.0).round() as i16;
    raw as u16
}

#[allow(clippy::cast_possible_wrap)]
pub fn decode_temperature(raw: u16) -> f64 {
    f64::from(raw as i16) / 10.0
}

#[cfg(test)]
mod tests {
    use super::{Step, build_steps, decode_temperature, encode, encode_temperature};
    use crate::constants::LINK_END_OF_PROGRAM;

    #[allow(clippy::cast_precision_loss)]
    fn steps(count: usize) -> Vec<Step> {
        (0..count)
            .map(|i| Step {
                temperature: 20.0 + i as f64,
                minutes: 1,
            })
            .collect()
    }

    #[test]
    fn sequences_split_into_ceil_n_over_8_patterns() {
        for (count, expected) in [(1usize, 1usize), (8, 1), (9, 2), (16, 2), (17, 3), (64, 8)] {
            let patterns = encode(&steps(count));
            assert_eq!(patterns.len(), expected, "for {count} steps");
            let total: usize = patterns.iter().map(|p| p.steps.len()).sum();
            assert_eq!(total, count);
            let counted: u16 = patterns.iter().map(|p| p.step_count_value() + 1).sum();
            assert_eq!(usize::from(counted), count);
        }
    }

    #[test]
    fn links_chain_forward_and_terminate() {
        let patterns = encode(&steps(17));
        assert_eq!(patterns[0].link, 1);
        assert_eq!(patterns[1].link, 2);
        assert_eq!(patterns[2].link, LINK_END_OF_PROGRAM);
        assert_eq!(patterns[2].steps.len(), 1);
        assert_eq!(patterns[2].step_count_value(), 0);
    }

    #[test]
    fn first_step_gets_its_own_duration() {
        let built = build_steps(&[20.0, 21.0, 30.0], 1, 20);
        assert_eq!(built[0].minutes, 1);
        assert_eq!(built[1].minutes, 20);
        assert_eq!(built[2].minutes, 20);
    }

    #[test]
    fn temperatures_quantize_to_tenths() {
        assert_eq!(encode_temperature(21.0), 210);
        assert_eq!(encode_temperature(21.34), 213);
        assert_eq!(encode_temperature(21.38), 214);
        // signed fixed point survives the u16 register representation
        assert_eq!(decode_temperature(encode_temperature(-5.5)), -5.5);
    }

    #[test]
    fn quantization_error_stays_within_a_tenth_of_a_degree() {
        for i in 0..500 {
            let t = f64::from(i) * 0.617;
            let recovered = decode_temperature(encode_temperature(t));
            assert!(
                (recovered - t).abs() <= 0.05 + 1e-9,
                "temperature {t} decoded as {recovered}"
            );
        }
    }
}
