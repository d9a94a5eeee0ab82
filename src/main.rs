mod bus;
mod client;
mod constants;
mod controller;
mod error;
mod inspect;
mod interface;
mod pattern;
mod ramp;
mod rtu;

use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use bus::{BusConfig, RegisterBus};
use client::{RegisterClient, RetryPolicy};
use constants::{REG_DERIVATIVE, REG_INTEGRAL, REG_PROPORTIONAL};
use controller::{ExecutionController, RampSpec};
use interface::{InterfaceMode, ParityMode};
use ramp::RampVariant;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Omega CN7800 ramp programmer")]
struct Args {
    /// Serial port path (e.g. /dev/ttyUSB0 or COM8)
    #[arg(short, long)]
    port: Option<String>,

    /// Serial baud rate
    #[arg(short, long, default_value_t = 9600)]
    baud: u32,

    /// Modbus slave address
    #[arg(short, long, default_value_t = 1)]
    address: u8,

    #[arg(long, value_enum, default_value_t = ParityMode::Even)]
    parity: ParityMode,

    /// Per-transaction response timeout in milliseconds
    #[arg(short = 't', long, default_value_t = 200)]
    timeout: u64,

    /// Device interface
    #[arg(short = 'I', long, value_enum, default_value_t = InterfaceMode::Serial)]
    interface: InterfaceMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Show live values and the programmed pattern memory
    Status,
    /// Upload a linear temperature ramp and start executing it
    Run {
        /// Total number of steps (1 to 64)
        #[arg(short = 's', long)]
        steps: u16,

        /// Final temperature to reach, in °C
        #[arg(short = 'T', long)]
        final_temperature: f64,

        /// Minutes per step
        #[arg(short = 'm', long, default_value_t = 20)]
        step_time: u16,

        /// Duration of the first step; kept short so the loop settles
        /// before the ramp proper begins
        #[arg(long, default_value_t = 1)]
        first_step_time: u16,

        #[arg(long, value_enum, default_value_t = RampVariant::GuardedStart)]
        ramp: RampVariant,

        /// Keep whatever is already in pattern memory
        #[arg(long)]
        no_clear: bool,
    },
    /// Append one step to the end of the current program
    Extend {
        #[arg(short = 'T', long)]
        temperature: f64,

        /// Minutes to hold the new step
        #[arg(short = 'm', long, default_value_t = 20)]
        duration: u16,
    },
    /// Wipe pattern memory and reset the execution pointer
    Clear,
    /// Force the run/stop bit off
    Stop,
    /// Write a static setpoint for PID mode
    Setpoint {
        temperature: f64,

        /// Also switch to PID control mode and start the output
        #[arg(long)]
        run: bool,
    },
    /// Turn autotuning on or off
    Autotune {
        #[arg(value_enum)]
        state: Switch,
    },
    /// Select a PID preset group; with -P/-i/-d, write new parameters
    Pid {
        /// Preset group 0-3, or 4 for automatic selection
        #[arg(short, long, default_value_t = 0)]
        group: u16,

        #[arg(short = 'P', long)]
        proportional: Option<f64>,

        #[arg(short = 'i', long)]
        integral: Option<u16>,

        #[arg(short = 'd', long)]
        derivative: Option<u16>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Switch {
    On,
    Off,
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();
    let config = resolve_bus_config(&args)?;
    let bus = bus::build_bus(&config)?;
    let client = RegisterClient::new(bus, RetryPolicy::default());
    let mut controller = ExecutionController::new(client);
    run_command(&mut controller, &args.command)
}

fn resolve_bus_config(args: &Args) -> eyre::Result<BusConfig> {
    let port = match args.interface {
        InterfaceMode::Simulation => None,
        InterfaceMode::Serial => Some(
            args.port
                .clone()
                .ok_or_else(|| eyre::eyre!("serial port required unless using simulation"))?,
        ),
    };

    Ok(BusConfig {
        port,
        baud: args.baud,
        address: args.address,
        parity: args.parity,
        timeout: Duration::from_millis(args.timeout),
        interface: args.interface,
    })
}

fn run_command<B: RegisterBus>(
    controller: &mut ExecutionController<B>,
    command: &Command,
) -> eyre::Result<()> {
    match command {
        Command::Status => print_status(controller)?,
        Command::Run {
            steps,
            final_temperature,
            step_time,
            first_step_time,
            ramp,
            no_clear,
        } => {
            let summary = controller.program_and_run(&RampSpec {
                total_steps: *steps,
                final_temperature: *final_temperature,
                time_between_steps: *step_time,
                first_step_time: *first_step_time,
                variant: *ramp,
                clear_before_write: !no_clear,
            })?;
            println!(
                "ramp started: {} steps across {} patterns",
                summary.steps, summary.patterns
            );
        }
        Command::Extend {
            temperature,
            duration,
        } => {
            let outcome = controller.extend_program(*temperature, *duration)?;
            if outcome.resumed {
                println!(
                    "step added, resumed from pattern {} step {}",
                    outcome.pattern, outcome.step
                );
            } else {
                println!(
                    "step added at pattern {} step {}, program already running",
                    outcome.pattern, outcome.step
                );
            }
        }
        Command::Clear => {
            controller.clear_all_patterns()?;
            println!("pattern memory cleared");
        }
        Command::Stop => {
            controller.stop()?;
            println!("heater output stopped");
        }
        Command::Setpoint { temperature, run } => {
            controller.set_setpoint(*temperature)?;
            if *run {
                controller.run_pid_mode()?;
                println!("setpoint {temperature} °C written, PID mode running");
            } else {
                println!("setpoint {temperature} °C written");
            }
        }
        Command::Autotune { state } => {
            controller.set_autotune(*state == Switch::On)?;
            println!("autotune {}", if *state == Switch::On { "on" } else { "off" });
        }
        Command::Pid {
            group,
            proportional,
            integral,
            derivative,
        } => match (proportional, integral, derivative) {
            (Some(p), Some(i), Some(d)) => {
                controller.write_pid_parameters(*group, *p, *i, *d)?;
                println!("group {group}: P={p} Ti={i} Td={d} written");
            }
            (None, None, None) => {
                controller.select_pid_group(*group)?;
                let client = controller.client_mut();
                let p = client.read_fixed(REG_PROPORTIONAL, 1)?;
                let i = client.read(REG_INTEGRAL)?;
                let d = client.read(REG_DERIVATIVE)?;
                println!("group {group} active: P={p} Ti={i} Td={d}");
            }
            _ => {
                return Err(eyre::eyre!(
                    "provide all of --proportional, --integral and --derivative, or none"
                ));
            }
        },
    }
    Ok(())
}

fn print_status<B: RegisterBus>(controller: &mut ExecutionController<B>) -> eyre::Result<()> {
    let snapshot = inspect::read_snapshot(controller.client_mut())?;

    println!(
        "PV {:.1} °C, SV {:.1} °C",
        snapshot.process_value, snapshot.setpoint
    );
    println!(
        "PID: P={} Ti={} Td={}",
        snapshot.pid.proportional, snapshot.pid.integral, snapshot.pid.derivative
    );
    println!(
        "program: {} patterns, {} steps, {}",
        snapshot.patterns.len(),
        snapshot.total_steps(),
        if snapshot.running {
            "actively running"
        } else {
            "not running"
        }
    );
    for pattern in &snapshot.patterns {
        let link = if pattern.link == constants::LINK_END_OF_PROGRAM {
            "end of program".to_string()
        } else {
            format!("pattern {}", pattern.link)
        };
        println!(
            "  pattern {}: {} steps, then {link}",
            pattern.index,
            pattern.steps.len()
        );
        for (index, step) in pattern.steps.iter().enumerate() {
            println!(
                "    step {index}: {:.1} °C for {} min",
                step.temperature, step.minutes
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Args, Command, InterfaceMode, resolve_bus_config};

    #[test]
    fn serial_interface_requires_a_port() {
        let args = Args::try_parse_from(["bin", "status"]).expect("args should parse");
        let err = resolve_bus_config(&args).expect_err("port should be required");
        assert!(err.to_string().contains("serial port required"));
    }

    #[test]
    fn defaults_match_the_bench_wiring() {
        let args = Args::try_parse_from(["bin", "--port", "/dev/ttyUSB0", "status"])
            .expect("args should parse");
        let config = resolve_bus_config(&args).expect("config should resolve");
        assert_eq!(config.baud, 9600);
        assert_eq!(config.address, 1);
        assert_eq!(config.timeout.as_millis(), 200);
    }

    #[test]
    fn simulation_interface_works_without_a_port() {
        let args = Args::try_parse_from(["bin", "--interface", "simulation", "status"])
            .expect("args should parse");
        let config = resolve_bus_config(&args).expect("config should resolve");
        assert_eq!(config.interface, InterfaceMode::Simulation);
        assert!(config.port.is_none());
    }

    #[test]
    fn run_subcommand_parses_ramp_parameters() {
        let args = Args::try_parse_from([
            "bin", "--port", "COM8", "run", "--steps", "15", "--final-temperature", "100",
        ])
        .expect("args should parse");
        match args.command {
            Command::Run {
                steps,
                final_temperature,
                step_time,
                first_step_time,
                no_clear,
                ..
            } => {
                assert_eq!(steps, 15);
                assert!((final_temperature - 100.0).abs() < 1e-9);
                assert_eq!(step_time, 20);
                assert_eq!(first_step_time, 1);
                assert!(!no_clear);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
