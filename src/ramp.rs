use clap::ValueEnum;

use crate::constants::MAX_TOTAL_STEPS;
use crate::error::{ControllerError, Result};

/// Shape of the generated ramp. Both behaviors shipped on the bench at
/// different times and both are kept selectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum RampVariant {
    /// Hold one step at room temperature, then ramp from one degree above
    /// it. The short first step keeps the loop from overshooting.
    #[default]
    GuardedStart,
    /// Ramp from one degree above room temperature with no leading
    /// room-temperature step.
    DirectStart,
}

pub fn check_step_range(total_steps: u16) -> Result<()> {
    if total_steps < 1 || total_steps > MAX_TOTAL_STEPS {
        return Err(ControllerError::StepsOutOfRange(total_steps));
    }
    Ok(())
}

/// Target temperature for every step of the ramp, in order. Fails before
/// any device I/O when `total_steps` is outside 1..=64.
pub fn generate(
    variant: RampVariant,
    total_steps: u16,
    final_temperature: f64,
    room_temperature: f64,
) -> Result<Vec<f64>> {
    check_step_range(total_steps)?;
    let count = usize::from(total_steps);
    let first_target = room_temperature + 1.0;

    Ok(match variant {
        RampVariant::GuardedStart => match count {
            1 => vec![room_temperature],
            2 => vec![room_temperature, first_target],
            _ => {
                let mut temperatures = Vec::with_capacity(count);
                temperatures.push(room_temperature);
                temperatures.extend(linspace(first_target, final_temperature, count - 1));
                temperatures
            }
        },
        RampVariant::DirectStart => linspace(first_target, final_temperature, count),
    })
}

/// `count` evenly spaced values from `start` to `end` inclusive.
#[allow(clippy::cast_precision_loss)]
fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    if count <= 1 {
        return vec![start; count];
    }
    let step = (end - start) / (count - 1) as f64;
    let mut values: Vec<f64> = (0..count).map(|i| start + step * i as f64).collect();
    // pin the endpoint; accumulated rounding must not miss the target
    values[count - 1] = end;
    values
}

#[cfg(test)]
mod tests {
    use super::{RampVariant, generate, linspace};
    use crate::error::ControllerError;

    #[test]
    fn guarded_start_single_step_holds_room_temperature() {
        let temps = generate(RampVariant::GuardedStart, 1, 100.0, 20.0)
            .expect("generation should succeed");
        assert_eq!(temps, vec![20.0]);
    }

    #[test]
    fn guarded_start_two_steps_adds_one_degree() {
        let temps = generate(RampVariant::GuardedStart, 2, 100.0, 20.0)
            .expect("generation should succeed");
        assert_eq!(temps, vec![20.0, 21.0]);
    }

    #[test]
    fn guarded_start_ramps_linearly_after_the_guard_step() {
        let temps = generate(RampVariant::GuardedStart, 3, 100.0, 20.0)
            .expect("generation should succeed");
        assert_eq!(temps, vec![20.0, 21.0, 100.0]);

        let temps = generate(RampVariant::GuardedStart, 5, 27.0, 20.0)
            .expect("generation should succeed");
        assert_eq!(temps, vec![20.0, 21.0, 23.0, 25.0, 27.0]);
    }

    #[test]
    fn direct_start_has_no_room_temperature_step() {
        let temps = generate(RampVariant::DirectStart, 4, 27.0, 20.0)
            .expect("generation should succeed");
        assert_eq!(temps, vec![21.0, 23.0, 25.0, 27.0]);
    }

    #[test]
    fn both_variants_return_exactly_total_steps_values() {
        for steps in 1..=64u16 {
            for variant in [RampVariant::GuardedStart, RampVariant::DirectStart] {
                let temps = generate(variant, steps, 250.0, 21.3)
                    .expect("in-range step count should generate");
                assert_eq!(temps.len(), usize::from(steps));
            }
        }
    }

    #[test]
    fn ramp_is_monotonic_when_heating() {
        let temps = generate(RampVariant::GuardedStart, 64, 300.0, 18.0)
            .expect("generation should succeed");
        for pair in temps.windows(2) {
            assert!(pair[1] >= pair[0], "ramp should never step down");
        }
        assert!((temps.last().copied().expect("ramp is non-empty") - 300.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_step_counts_are_rejected() {
        for steps in [0u16, 65, 1000] {
            for variant in [RampVariant::GuardedStart, RampVariant::DirectStart] {
                let err = generate(variant, steps, 100.0, 20.0)
                    .expect_err("out-of-range step count should fail");
                assert!(matches!(err, ControllerError::StepsOutOfRange(got) if got == steps));
            }
        }
    }

    #[test]
    fn linspace_endpoints_are_exact() {
        let values = linspace(21.0, 100.0, 14);
        assert_eq!(values.len(), 14);
        assert_eq!(values[0], 21.0);
        assert_eq!(values[13], 100.0);
    }
}
