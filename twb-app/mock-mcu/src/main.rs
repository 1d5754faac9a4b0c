use std::path::{Path, PathBuf};

use clap::Parser;
use embassy_executor::{Executor, Spawner};
use embassy_time::{Duration, Timer};
use embedded_hal::digital::PinState;
use static_cell::StaticCell;
use tracing::{error, info};
use twb_core::mk_static;
use twb_core::utils::config::WheelPins;
use twb_core::utils::controllers::board::{
    InterruptTable, MockBoard, MockPin, Side, SystemClock, MAX_DUTY,
};
use twb_core::utils::controllers::{DriveCommand, DriveController, Motor, RotaryEncoder, DRIVE_CHANNEL};
use twb_core::utils::{dd, RobotConfig, TwoWheelOdometryManager};

type SimEncoder = RotaryEncoder<MockPin<'static>, MockPin<'static>, SystemClock>;
type SimMotor = Motor<MockPin<'static>, MockPin<'static>>;
type SimController = DriveController<
    SimMotor,
    SimMotor,
    TwoWheelOdometryManager<&'static SimEncoder, &'static SimEncoder>,
>;

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts
{
    /// robot description (JSON); built-in defaults when omitted
    #[clap(long)]
    config: Option<PathBuf>,
    /// left wheel speed in percent, negative reverses
    #[clap(long, default_value_t = 50.0, allow_hyphen_values = true)]
    left: f32,
    /// right wheel speed in percent, negative reverses
    #[clap(long, default_value_t = 50.0, allow_hyphen_values = true)]
    right: f32,
    /// odometry report period in milliseconds
    #[clap(long, default_value_t = 500, value_parser = clap::value_parser!(u64).range(1..))]
    report_ms: u64,
    /// stop the robot and exit after this many milliseconds
    #[clap(long, default_value_t = 3000, value_parser = clap::value_parser!(u64).range(1..))]
    duration_ms: u64,
}

fn load_config(path: Option<&Path>) -> Result<RobotConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(RobotConfig::from_json(&std::fs::read(path)?)?),
        None => Ok(RobotConfig::default()),
    }
}

/// Move a simulated wheel by one channel A edge.
///
/// Turning forwards, B switches before A so both read the same level at the
/// edge; turning backwards, A switches first and B still holds the old level.
fn quadrature_edge(
    board: &MockBoard,
    pins: WheelPins,
    forwards: bool,
) {
    let a_high = board.value(pins.encoder_a).unwrap_or(0) != 0;
    let (next, old) = if a_high {
        (PinState::Low, PinState::High)
    } else {
        (PinState::High, PinState::Low)
    };
    let _ = board.set_level(pins.encoder_b, if forwards { next } else { old });
    let _ = board.set_level(pins.encoder_a, next);
}

#[embassy_executor::task]
async fn drive_task(ctrl: &'static mut SimController) -> ! {
    ctrl.drive_ch().await
}

/// Turns a wheel at the rate its motor pins command and fires its encoder
/// interrupt on every channel A edge.
#[embassy_executor::task(pool_size = 2)]
async fn wheel_task(
    side: Side,
    board: &'static MockBoard,
    irq: &'static InterruptTable<'static>,
    pins: WheelPins,
    config: RobotConfig,
) -> ! {
    loop {
        let duty = board.value(pins.motor_speed).unwrap_or(0);
        if duty == 0 {
            Timer::after(Duration::from_millis(10)).await;
            continue;
        }
        let forwards = board.value(pins.motor_direction).unwrap_or(0) == 0;
        let rps = config.max_wheel_rps * duty as f32 / MAX_DUTY as f32;
        let interval_us = (config.revolutions_per_edge() / rps * 1_000_000.0) as u64;
        Timer::after(Duration::from_micros(interval_us.max(1))).await;
        quadrature_edge(board, pins, forwards);
        irq.trigger(side);
    }
}

#[embassy_executor::task]
async fn main_task(spawner: Spawner) {
    let opts: Opts = Opts::parse();
    let config = match load_config(opts.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let board: &'static MockBoard = mk_static!(MockBoard, MockBoard::new());

    let encoder = |side: Side, pins: WheelPins| {
        RotaryEncoder::from_board(
            board,
            side,
            pins.encoder_a,
            pins.encoder_b,
            SystemClock,
            config.revolutions_per_edge(),
        )
        .map(|enc| match config.stall_timeout() {
            Some(timeout) => enc.with_stall_timeout(timeout),
            None => enc,
        })
    };
    let (left_enc, right_enc) = match (
        encoder(Side::Left, config.left),
        encoder(Side::Right, config.right),
    ) {
        (Ok(l), Ok(r)) => (l, r),
        (Err(e), _) | (_, Err(e)) => {
            error!("Encoder setup failed: {}", e);
            std::process::exit(1);
        }
    };
    let left_enc: &'static SimEncoder = mk_static!(SimEncoder, left_enc);
    let right_enc: &'static SimEncoder = mk_static!(SimEncoder, right_enc);

    let irq: &'static InterruptTable<'static> =
        mk_static!(InterruptTable<'static>, InterruptTable::new());
    irq.attach(left_enc);
    irq.attach(right_enc);

    let motors = Motor::from_board(board, config.left.motor_direction, config.left.motor_speed)
        .and_then(|l| {
            Motor::from_board(board, config.right.motor_direction, config.right.motor_speed)
                .map(|r| (l, r))
        });
    let (left_motor, right_motor) = match motors {
        Ok(motors) => motors,
        Err(e) => {
            error!("Motor setup failed: {:?}", e);
            std::process::exit(1);
        }
    };

    let drive = dd::new(config.track_width, config.wheel_radius);
    let ctrl = mk_static!(
        SimController,
        DriveController::new(
            left_motor,
            right_motor,
            TwoWheelOdometryManager::with_drive(drive, left_enc, right_enc),
            drive,
            config.max_wheel_rps,
        )
    );
    spawner.spawn(drive_task(ctrl)).unwrap();
    spawner
        .spawn(wheel_task(Side::Left, board, irq, config.left, config))
        .unwrap();
    spawner
        .spawn(wheel_task(Side::Right, board, irq, config.right, config))
        .unwrap();

    info!(left = opts.left, right = opts.right, "Driving");
    DRIVE_CHANNEL
        .send(DriveCommand::W {
            l: opts.left,
            r: opts.right,
        })
        .await;

    let mut elapsed = 0;
    while elapsed < opts.duration_ms {
        Timer::after(Duration::from_millis(opts.report_ms)).await;
        elapsed += opts.report_ms;
        DRIVE_CHANNEL.send(DriveCommand::Odom).await;
    }

    DRIVE_CHANNEL.send(DriveCommand::Stop).await;
    Timer::after(Duration::from_millis(50)).await;
    info!("Simulation finished");
    std::process::exit(0);
}

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        spawner.spawn(main_task(spawner)).unwrap();
    });
}
