use tracing::info;

use crate::bus::RegisterBus;
use crate::client::RegisterClient;
use crate::constants::{
    BIT_AUTOTUNE, BIT_RUN, LINK_END_OF_PROGRAM, MAX_PATTERNS, MAX_STEPS_PER_PATTERN, MODE_PID,
    MODE_PROGRAM, REG_CONTROL_MODE, REG_DERIVATIVE, REG_EXEC_PATTERN, REG_EXEC_STEP, REG_INTEGRAL,
    REG_PID_GROUP, REG_PROCESS_VALUE, REG_PROPORTIONAL, REG_SETPOINT, cycle_count_register,
    duration_register, link_register, step_count_register, temperature_register,
};
use crate::error::Result;
use crate::inspect;
use crate::pattern::{self, encode_temperature};
use crate::ramp::{self, RampVariant};

#[derive(Debug, Clone)]
pub struct RampSpec {
    pub total_steps: u16,
    pub final_temperature: f64,
    pub time_between_steps: u16,
    pub first_step_time: u16,
    pub variant: RampVariant,
    pub clear_before_write: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ProgramSummary {
    pub steps: usize,
    pub patterns: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct ExtendOutcome {
    pub pattern: u8,
    pub step: u8,
    /// True when the program had finished and execution was repositioned to
    /// the new step.
    pub resumed: bool,
}

/// Owns the register client for the duration of an operation; the serial
/// channel is a strictly serialized resource and intermediate states are
/// visible on the device, so operations never interleave.
pub struct ExecutionController<B: RegisterBus> {
    client: RegisterClient<B>,
}

impl<B: RegisterBus> ExecutionController<B> {
    pub fn new(client: RegisterClient<B>) -> Self {
        Self { client }
    }

    pub fn client_mut(&mut self) -> &mut RegisterClient<B> {
        &mut self.client
    }

    /// Wipe pattern memory and the execution state so no stale step stays
    /// reachable: stop, reset the pointer, zero every step and count, and
    /// terminate every link.
    pub fn clear_all_patterns(&mut self) -> Result<()> {
        self.client.write_bit(BIT_RUN, false)?;
        self.client.write(REG_EXEC_PATTERN, 0)?;
        self.client.write(REG_EXEC_STEP, 0)?;

        for pat in 0..MAX_PATTERNS {
            for step in 0..MAX_STEPS_PER_PATTERN {
                self.client.write(temperature_register(pat, step), 0)?;
                self.client.write(duration_register(pat, step), 0)?;
            }
            self.client.write(step_count_register(pat), 0)?;
            self.client.write(cycle_count_register(pat), 0)?;
            self.client.write(link_register(pat), LINK_END_OF_PROGRAM)?;
        }

        info!("pattern memory cleared");
        Ok(())
    }

    /// Upload a linear ramp and start executing it.
    ///
    /// Writes land in dependency order: a pattern's step registers before
    /// its step count, the count before the link that makes the pattern
    /// reachable, and the run bit only after the whole program is in
    /// memory. A fatal write aborts mid-way and leaves a partial program;
    /// the caller must clear and reprogram, never resume.
    pub fn program_and_run(&mut self, spec: &RampSpec) -> Result<ProgramSummary> {
        ramp::check_step_range(spec.total_steps)?;

        self.client.write(REG_CONTROL_MODE, MODE_PROGRAM)?;
        self.client.write_bit(BIT_AUTOTUNE, false)?;
        if spec.clear_before_write {
            self.clear_all_patterns()?;
        }

        // Live PV, never cached; it moves between invocations.
        let room_temperature = self.client.read_fixed(REG_PROCESS_VALUE, 1)?;
        let temperatures = ramp::generate(
            spec.variant,
            spec.total_steps,
            spec.final_temperature,
            room_temperature,
        )?;
        let steps = pattern::build_steps(&temperatures, spec.first_step_time, spec.time_between_steps);
        let patterns = pattern::encode(&steps);

        for pat in &patterns {
            for (index, step) in pat.steps.iter().enumerate() {
                #[allow(clippy::cast_possible_truncation)]
                let index = index as u8;
                self.client.write(
                    temperature_register(pat.index, index),
                    encode_temperature(step.temperature),
                )?;
                self.client
                    .write(duration_register(pat.index, index), step.minutes)?;
            }
            self.client
                .write(step_count_register(pat.index), pat.step_count_value())?;
            self.client.write(link_register(pat.index), pat.link)?;
        }
        for pat in &patterns {
            self.client
                .write(cycle_count_register(pat.index), pat.cycles)?;
        }

        self.client.write(REG_EXEC_PATTERN, 0)?;
        self.client.write(REG_EXEC_STEP, 0)?;
        self.client.write_bit(BIT_RUN, true)?;

        info!(
            steps = steps.len(),
            patterns = patterns.len(),
            "ramp programmed and started"
        );
        Ok(ProgramSummary {
            steps: steps.len(),
            patterns: patterns.len(),
        })
    }

    /// Append one step past the current end of the program without touching
    /// the rest of pattern memory. When the program had already finished,
    /// execution is stopped, repositioned onto the new step and restarted;
    /// a running program reaches the new step on its own.
    pub fn extend_program(&mut self, temperature: f64, minutes: u16) -> Result<ExtendOutcome> {
        let was_running = inspect::is_actively_running(&mut self.client)?;
        let (pat, step) = inspect::find_program_end(&mut self.client)?;

        self.client.write(
            temperature_register(pat, step),
            encode_temperature(temperature),
        )?;
        self.client.write(duration_register(pat, step), minutes)?;
        self.client.write(step_count_register(pat), u16::from(step))?;
        self.client.write(link_register(pat), LINK_END_OF_PROGRAM)?;

        if !was_running {
            self.client.write_bit(BIT_RUN, false)?;
            self.client.write(REG_EXEC_PATTERN, u16::from(pat))?;
            self.client.write(REG_EXEC_STEP, u16::from(step))?;
            self.client.write_bit(BIT_RUN, true)?;
        }

        info!(
            pattern = pat,
            step,
            resumed = !was_running,
            "step appended at {temperature} C for {minutes} min"
        );
        Ok(ExtendOutcome {
            pattern: pat,
            step,
            resumed: !was_running,
        })
    }

    pub fn stop(&mut self) -> Result<()> {
        self.client.write_bit(BIT_RUN, false)
    }

    pub fn set_setpoint(&mut self, celsius: f64) -> Result<()> {
        self.client
            .write(REG_SETPOINT, encode_temperature(celsius))
    }

    /// Switch to plain PID control at the current setpoint and start the
    /// output.
    pub fn run_pid_mode(&mut self) -> Result<()> {
        self.client.write(REG_CONTROL_MODE, MODE_PID)?;
        self.client.write_bit(BIT_RUN, true)
    }

    pub fn set_autotune(&mut self, on: bool) -> Result<()> {
        self.client.write_bit(BIT_AUTOTUNE, on)
    }

    pub fn select_pid_group(&mut self, group: u16) -> Result<()> {
        self.client.write(REG_PID_GROUP, group)
    }

    /// Write P/Ti/Td into a preset group. The proportional band shares the
    /// ×10 fixed-point encoding with temperatures.
    pub fn write_pid_parameters(
        &mut self,
        group: u16,
        proportional: f64,
        integral: u16,
        derivative: u16,
    ) -> Result<()> {
        self.client.write(REG_PID_GROUP, group)?;
        self.client
            .write(REG_PROPORTIONAL, encode_temperature(proportional))?;
        self.client.write(REG_INTEGRAL, integral)?;
        self.client.write(REG_DERIVATIVE, derivative)?;
        Ok(())
    }
}
