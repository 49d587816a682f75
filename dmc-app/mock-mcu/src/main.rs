mod sim;

use std::{path::PathBuf, process};

use clap::Parser;
use dmc_core::{
    mk_static,
    utils::{
        config::{ConfigError, ControllerConfig},
        controllers::{ControlLoop, MotorChannel, PulseCounter, RampCommand},
        EmbassyClock, RAMP_CHANNEL, STOP_SIGNAL,
    },
};
use embassy_executor::{Executor, Spawner};
use sim::{encoder_task, ConsoleReporter, MotorModel, SimDirection, SimMotor, SimPwm};
use static_cell::StaticCell;
use tracing::{error, info, warn};

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts {
    /// JSON file with controller settings; the flags below override it
    #[clap(long)]
    config: Option<PathBuf>,
    /// number of ramp cycles, alternating forward and reverse (0 = forever)
    #[clap(long, default_value_t = 2)]
    cycles: u32,
    /// encoder pulses per revolution
    #[clap(long)]
    ppr: Option<u32>,
    /// ramp step delay and speed sampling interval
    #[clap(long)]
    step_ms: Option<u32>,
    /// magnitude increment per ramp step
    #[clap(long)]
    accel_step: Option<u8>,
    /// pause at peak magnitude
    #[clap(long)]
    hold_ms: Option<u32>,
    /// simulated shaft speed at full drive
    #[clap(long, default_value_t = 300.0)]
    max_rpm: f32,
    /// print reports as JSON lines
    #[clap(long)]
    json: bool,
    /// read JSON ramp commands from stdin instead of running cycles
    #[clap(long)]
    interactive: bool,
}

#[derive(Debug)]
enum SetupError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Config(ConfigError),
}

type Controller = ControlLoop<'static, SimDirection, SimPwm, EmbassyClock, ConsoleReporter>;

/// Build the controller settings from the optional file and the CLI flags.
fn load_config(opts: &Opts) -> Result<ControllerConfig, SetupError> {
    let mut config = match &opts.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(SetupError::Io)?;
            serde_json::from_str(&text).map_err(SetupError::Json)?
        }
        None => ControllerConfig::default(),
    };
    if let Some(ppr) = opts.ppr {
        config.pulses_per_rev = ppr;
    }
    if let Some(ms) = opts.step_ms {
        config.step_interval_ms = ms;
    }
    if let Some(step) = opts.accel_step {
        config.accel_step = step;
    }
    if let Some(ms) = opts.hold_ms {
        config.hold_ms = ms;
    }
    config.validate().map_err(SetupError::Config)?;
    Ok(config)
}

/// Forward JSON `RampCommand` lines from stdin to the controller.
///
/// `halt` also raises the stop signal so it interrupts a running cycle.
fn spawn_stdin_reader() {
    std::thread::spawn(|| {
        for line in std::io::stdin().lines() {
            let Ok(line) = line else { break };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<RampCommand>(line) {
                Ok(cmd) => {
                    if cmd == RampCommand::Halt {
                        STOP_SIGNAL.signal(());
                    }
                    if RAMP_CHANNEL.try_send(cmd).is_err() {
                        warn!("ramp command queue full, dropped {:?}", cmd);
                    }
                }
                Err(e) => warn!("invalid ramp command {line:?}: {e}"),
            }
        }
        info!("stdin closed");
    });
}

#[embassy_executor::task]
async fn serve_task(mut ctrl: Controller) {
    if let Err(e) = ctrl.serve().await {
        error!("controller stopped: {:?}", e);
        process::exit(1);
    }
}

#[embassy_executor::task]
async fn demo_task(
    mut ctrl: Controller,
    cycles: u32,
) {
    let result = if cycles == 0 {
        ctrl.run().await.map(|never| match never {})
    } else {
        let mut result = Ok(());
        for i in 0..cycles {
            result = ctrl.run_cycle(i % 2 == 0).await;
            if result.is_err() {
                break;
            }
        }
        result
    };
    match result {
        Ok(()) => {
            info!("demo finished after {} cycle(s)", cycles);
            process::exit(0);
        }
        Err(e) => {
            error!("controller stopped: {:?}", e);
            process::exit(1);
        }
    }
}

#[embassy_executor::task]
async fn main_task(
    spawner: Spawner,
    opts: Opts,
    config: ControllerConfig,
) {
    let motor_a: &'static SimMotor = mk_static!(SimMotor, SimMotor::new());
    let motor_b: &'static SimMotor = mk_static!(SimMotor, SimMotor::new());
    let encoder_a: &'static PulseCounter = mk_static!(PulseCounter, PulseCounter::new());
    let encoder_b: &'static PulseCounter = mk_static!(PulseCounter, PulseCounter::new());

    let model = MotorModel {
        max_rpm: opts.max_rpm,
        pulses_per_rev: config.pulses_per_rev,
        response: 0.05,
    };
    spawner.spawn(encoder_task("A", motor_a, encoder_a, model)).unwrap();
    spawner.spawn(encoder_task("B", motor_b, encoder_b, model)).unwrap();
    info!(hz = config.pwm_frequency_hz, "simulated PWM configured");

    let mut ctrl = match Controller::new(
        MotorChannel::new(motor_a.direction(), motor_a.pwm()),
        MotorChannel::new(motor_b.direction(), motor_b.pwm()),
        encoder_a,
        encoder_b,
        config,
        EmbassyClock,
        ConsoleReporter { json: opts.json },
    ) {
        Ok(ctrl) => ctrl,
        Err(e) => {
            error!("invalid controller config: {:?}", e);
            process::exit(2);
        }
    };
    if let Err(e) = ctrl.init() {
        error!("motor init failed: {:?}", e);
        process::exit(1);
    }

    if opts.interactive {
        info!(r#"Reading ramp commands from stdin, e.g. {{"rc":"cycle","forward":true}}"#);
        spawn_stdin_reader();
        spawner.spawn(serve_task(ctrl)).unwrap();
    } else {
        spawner.spawn(demo_task(ctrl, opts.cycles)).unwrap();
    }
}

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let opts = Opts::parse();
    let config = match load_config(&opts) {
        Ok(config) => config,
        Err(e) => {
            error!("failed to load config: {:?}", e);
            process::exit(2);
        }
    };
    info!("=== Dual Motor Control with Encoders (simulated) ===");

    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        spawner.spawn(main_task(spawner, opts, config)).unwrap();
    });
}
