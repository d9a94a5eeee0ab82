use crate::bus::RegisterBus;
use crate::client::RegisterClient;
use crate::constants::{
    MAX_PATTERNS, MAX_STEPS_PER_PATTERN, REG_DERIVATIVE, REG_EXEC_PATTERN, REG_EXEC_STEP,
    REG_INTEGRAL, REG_PROCESS_VALUE, REG_PROPORTIONAL, REG_SETPOINT, duration_register,
    link_register, step_count_register, temperature_register,
};
use crate::error::{ControllerError, Result};
use crate::pattern::{Step, decode_temperature};

/// Where the next appended step should land, as `(pattern, step)`.
///
/// Discovery can mutate the device: when the last used pattern is full, its
/// link register is rewritten to point at the next pattern before that
/// pattern's first slot is returned.
#[allow(clippy::cast_possible_truncation)]
pub fn find_program_end<B: RegisterBus>(client: &mut RegisterClient<B>) -> Result<(u8, u8)> {
    let Some(last) = last_used_pattern(client)? else {
        return Err(ControllerError::NoProgramFound);
    };

    let count = client.read(step_count_register(last))?;
    if count < u16::from(MAX_STEPS_PER_PATTERN) - 1 {
        return Ok((last, (count + 1) as u8));
    }

    if last >= MAX_PATTERNS - 1 {
        return Err(ControllerError::MemoryFull);
    }

    // The full pattern must hand over to its successor before anything is
    // written there, or execution would stop at the old end.
    client.write(link_register(last), u16::from(last) + 1)?;
    Ok((last + 1, 0))
}

/// Whether the device is still executing a scheduled step, as opposed to
/// having finished the program and parked at the final value.
pub fn is_actively_running<B: RegisterBus>(client: &mut RegisterClient<B>) -> Result<bool> {
    let current_pattern = client.read(REG_EXEC_PATTERN)?;
    let current_step = client.read(REG_EXEC_STEP)?;

    let Some(last) = last_used_pattern(client)? else {
        return Ok(false);
    };
    let last_step = client.read(step_count_register(last))?;

    if current_pattern > u16::from(last) {
        return Ok(false);
    }
    if current_pattern == u16::from(last) && current_step > last_step {
        return Ok(false);
    }
    Ok(true)
}

/// Highest-indexed pattern holding programmed steps. Pattern 0 counts as in
/// use even with a zero step count, so a bare device appends at (0, 1); a
/// count of zero there is indistinguishable from a one-step program.
fn last_used_pattern<B: RegisterBus>(client: &mut RegisterClient<B>) -> Result<Option<u8>> {
    let mut last = None;
    for pattern in 0..MAX_PATTERNS {
        let count = client.read(step_count_register(pattern))?;
        if count > 0 {
            last = Some(pattern);
        } else if pattern == 0 && last.is_none() {
            last = Some(0);
        }
    }
    Ok(last)
}

#[derive(Debug, Clone, Copy)]
pub struct PidParameters {
    pub proportional: f64,
    pub integral: u16,
    pub derivative: u16,
}

#[derive(Debug, Clone)]
pub struct PatternReadback {
    pub index: u8,
    pub steps: Vec<Step>,
    pub link: u16,
}

/// Everything the bench tooling reports about the controller in one read
/// pass: live values, active PID parameters and the programmed memory.
#[derive(Debug, Clone)]
pub struct ProgramSnapshot {
    pub process_value: f64,
    pub setpoint: f64,
    pub pid: PidParameters,
    pub patterns: Vec<PatternReadback>,
    pub running: bool,
}

impl ProgramSnapshot {
    pub fn total_steps(&self) -> usize {
        self.patterns.iter().map(|p| p.steps.len()).sum()
    }
}

pub fn read_snapshot<B: RegisterBus>(client: &mut RegisterClient<B>) -> Result<ProgramSnapshot> {
    let process_value = client.read_fixed(REG_PROCESS_VALUE, 1)?;
    let setpoint = client.read_fixed(REG_SETPOINT, 1)?;
    let pid = PidParameters {
        proportional: client.read_fixed(REG_PROPORTIONAL, 1)?,
        integral: client.read(REG_INTEGRAL)?,
        derivative: client.read(REG_DERIVATIVE)?,
    };
    let running = is_actively_running(client)?;

    let mut patterns = Vec::new();
    for pattern in 0..MAX_PATTERNS {
        let count = client.read(step_count_register(pattern))?;
        if count == 0 && pattern != 0 {
            continue;
        }
        #[allow(clippy::cast_possible_truncation)]
        let active = ((count + 1).min(u16::from(MAX_STEPS_PER_PATTERN))) as u8;
        let mut steps = Vec::with_capacity(usize::from(active));
        for step in 0..active {
            let raw = client.read(temperature_register(pattern, step))?;
            let minutes = client.read(duration_register(pattern, step))?;
            steps.push(Step {
                temperature: decode_temperature(raw),
                minutes,
            });
        }
        patterns.push(PatternReadback {
            index: pattern,
            steps,
            link: client.read(link_register(pattern))?,
        });
    }

    Ok(ProgramSnapshot {
        process_value,
        setpoint,
        pid,
        patterns,
        running,
    })
}

#[cfg(test)]
mod tests {
    use super::{find_program_end, is_actively_running, read_snapshot};
    use crate::bus::SimBus;
    use crate::client::{RegisterClient, RetryPolicy};
    use crate::constants::{
        REG_EXEC_PATTERN, REG_EXEC_STEP, link_register, step_count_register, temperature_register,
    };
    use crate::error::ControllerError;

    fn client() -> RegisterClient<SimBus> {
        RegisterClient::new(SimBus::new(), RetryPolicy::without_backoff())
    }

    #[test]
    fn empty_device_appends_after_pattern_zero_step_zero() {
        let mut client = client();
        let (pattern, step) = find_program_end(&mut client).expect("pattern 0 counts as in use");
        assert_eq!((pattern, step), (0, 1));
        assert!(client.bus().journal().is_empty(), "discovery should not write");
    }

    #[test]
    fn append_lands_inside_a_partially_filled_pattern() {
        let mut client = client();
        client.bus_mut().set_register(step_count_register(1), 3);

        let (pattern, step) = find_program_end(&mut client).expect("program end should be found");
        assert_eq!((pattern, step), (1, 4));
    }

    #[test]
    fn full_pattern_links_forward_before_returning_the_next_slot() {
        let mut client = client();
        client.bus_mut().set_register(step_count_register(0), 7);

        let (pattern, step) = find_program_end(&mut client).expect("program end should be found");
        assert_eq!((pattern, step), (1, 0));
        assert_eq!(client.bus().register(link_register(0)), 1);
    }

    #[test]
    fn sixty_four_programmed_steps_leave_no_room() {
        let mut client = client();
        for pattern in 0..8 {
            client.bus_mut().set_register(step_count_register(pattern), 7);
        }

        let err = find_program_end(&mut client).expect_err("memory should be full");
        assert!(matches!(err, ControllerError::MemoryFull));
    }

    #[test]
    fn pointer_past_the_last_step_means_not_running() {
        let mut client = client();
        client.bus_mut().set_register(step_count_register(0), 2);
        client.bus_mut().set_register(REG_EXEC_PATTERN, 0);
        client.bus_mut().set_register(REG_EXEC_STEP, 3);
        assert!(!is_actively_running(&mut client).expect("inspection should succeed"));

        client.bus_mut().set_register(REG_EXEC_PATTERN, 1);
        client.bus_mut().set_register(REG_EXEC_STEP, 0);
        assert!(!is_actively_running(&mut client).expect("inspection should succeed"));
    }

    #[test]
    fn pointer_on_or_before_the_last_step_means_running() {
        let mut client = client();
        client.bus_mut().set_register(step_count_register(0), 7);
        client.bus_mut().set_register(step_count_register(1), 2);

        for (pattern, step) in [(0u16, 5u16), (1, 0), (1, 2)] {
            client.bus_mut().set_register(REG_EXEC_PATTERN, pattern);
            client.bus_mut().set_register(REG_EXEC_STEP, step);
            assert!(
                is_actively_running(&mut client).expect("inspection should succeed"),
                "pointer ({pattern}, {step}) lies within the program"
            );
        }
    }

    #[test]
    fn snapshot_reports_only_patterns_in_use() {
        let mut client = client();
        client.bus_mut().set_register(step_count_register(0), 7);
        client.bus_mut().set_register(step_count_register(1), 1);
        client.bus_mut().set_register(temperature_register(1, 1), 987);
        client.bus_mut().set_register(link_register(1), 0x08);

        let snapshot = read_snapshot(&mut client).expect("snapshot should read");
        assert_eq!(snapshot.patterns.len(), 2);
        assert_eq!(snapshot.total_steps(), 10);
        assert!((snapshot.patterns[1].steps[1].temperature - 98.7).abs() < 1e-9);
        assert!((snapshot.process_value - 21.3).abs() < 1e-9);
    }
}
