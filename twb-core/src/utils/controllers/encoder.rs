//! Quadrature wheel encoders.
//!
//! [`RotaryEncoder`] turns the interrupt stream of a quadrature encoder into a
//! signed wheel rate. Channel A is wired to an external interrupt that fires
//! on every edge (both polarities); channel B is sampled alongside it.
//!
//! ```text
//!  Encoder input A       |‾‾‾|   |‾‾‾|   |‾‾‾|
//!                       _|   |___|   |___|   |___
//!  Encoder input B     |‾‾‾|   |‾‾‾|   |‾‾‾|
//!                     _|   |___|   |___|   |_____
//!  A edges (forwards)    ^   ^   ^   ^   ^   ^      A == B at every edge
//! ```
//!
//! Phase convention: when B leads A, A and B read the same level at each A
//! edge and the wheel is turning [`Direction::Forwards`]. Any other reading is
//! [`Direction::Backwards`]. Which way "forwards" is on the robot depends on
//! how the encoder is mounted; swap A and B to flip it.
//!
//! The edge timestamp, frequency and direction are written only by the
//! interrupt handler and read by foreground queries. Both sides go through a
//! critical-section mutex so a query never observes a half-written sample.

use core::cell::{Cell, RefCell};

use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use embassy_time::{Duration, Instant};
use embedded_hal::digital::InputPin;

use super::board::{Board, EdgeHandler, InvalidPinError, Monotonic, Side};

/// Rotation direction of a wheel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Forwards,
    Backwards,
}

impl Direction {
    /// `1.0` for forwards, `-1.0` for backwards.
    pub const fn sign(self) -> f32 {
        match self {
            Direction::Forwards => 1.0,
            Direction::Backwards => -1.0,
        }
    }
}

/// Anything that can report a wheel's rotation rate.
pub trait Encoder {
    /// Signed rate in revolutions per second. The sign encodes the direction.
    fn revolutions_per_second(&self) -> f32;
}

impl<E: Encoder + ?Sized> Encoder for &E {
    fn revolutions_per_second(&self) -> f32 {
        (**self).revolutions_per_second()
    }
}

#[derive(Debug, Clone, Copy)]
struct EdgeSample {
    last_edge: Option<Instant>,
    frequency_hz: f32,
    direction: Direction,
}

struct Channels<A, B> {
    a: A,
    b: B,
    sample: EdgeSample,
}

impl<A: InputPin, B: InputPin> Channels<A, B> {
    /// Direction from the A/B levels at the current edge, `None` if a pin
    /// could not be read.
    fn phase(&mut self) -> Option<Direction> {
        let a = self.a.is_high().ok()?;
        let b = self.b.is_high().ok()?;
        Some(if a == b {
            Direction::Forwards
        } else {
            Direction::Backwards
        })
    }
}

/// Interrupt-driven quadrature encoder.
pub struct RotaryEncoder<A, B, C> {
    side: Side,
    state: Mutex<CriticalSectionRawMutex, RefCell<Channels<A, B>>>,
    clock: C,
    revolutions_per_edge: f32,
    stall_timeout: Option<Duration>,
}

impl<A, B, C> RotaryEncoder<A, B, C>
where
    A: InputPin,
    B: InputPin,
    C: Monotonic,
{
    /// Create an encoder over channel pins `pin_a` (interrupt) and `pin_b`,
    /// wired to the interrupt line of `side`.
    ///
    /// `revolutions_per_edge` scales the edge frequency into wheel revolutions
    /// per second.
    pub fn new(
        side: Side,
        pin_a: A,
        pin_b: B,
        clock: C,
        revolutions_per_edge: f32,
    ) -> Self {
        Self {
            side,
            state: Mutex::new(RefCell::new(Channels {
                a: pin_a,
                b: pin_b,
                sample: EdgeSample {
                    last_edge: None,
                    frequency_hz: 0.0,
                    direction: Direction::Forwards,
                },
            })),
            clock,
            revolutions_per_edge,
            stall_timeout: None,
        }
    }

    /// Report zero frequency once no edge has arrived for `timeout`.
    ///
    /// Without a timeout the last measured rate is held indefinitely.
    pub fn with_stall_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.stall_timeout = Some(timeout);
        self
    }

    /// Most recent edge frequency in Hz; 0 before two edges have been seen.
    pub fn frequency(&self) -> f32 {
        let sample = self.sample();
        self.live_frequency(&sample)
    }

    /// Direction computed at the most recent edge.
    pub fn direction(&self) -> Direction {
        self.sample().direction
    }

    fn sample(&self) -> EdgeSample {
        self.state.lock(|cell| cell.borrow().sample)
    }

    fn live_frequency(
        &self,
        sample: &EdgeSample,
    ) -> f32 {
        match (self.stall_timeout, sample.last_edge) {
            (Some(timeout), Some(last))
                if self.clock.now().as_micros().saturating_sub(last.as_micros())
                    > timeout.as_micros() =>
            {
                0.0
            }
            _ => sample.frequency_hz,
        }
    }
}

impl<P, C> RotaryEncoder<P, P, C>
where
    P: InputPin,
    C: Monotonic,
{
    /// Claim pins `pin_a` and `pin_b` from `board` and build an encoder on them.
    pub fn from_board<'a, Bd>(
        board: &'a Bd,
        side: Side,
        pin_a: u8,
        pin_b: u8,
        clock: C,
        revolutions_per_edge: f32,
    ) -> Result<Self, InvalidPinError>
    where
        Bd: Board<Pin<'a> = P> + 'a,
    {
        let a = board.pin(pin_a)?;
        let b = board.pin(pin_b)?;
        tracing::debug!(?side, pin_a, pin_b, revolutions_per_edge, "rotary encoder configured");
        Ok(Self::new(side, a, b, clock, revolutions_per_edge))
    }
}

impl<A, B, C> EdgeHandler for RotaryEncoder<A, B, C>
where
    A: InputPin,
    B: InputPin,
    C: Monotonic,
{
    fn side(&self) -> Side {
        self.side
    }

    fn on_edge(&self) {
        let now = self.clock.now();
        self.state.lock(|cell| {
            let mut guard = cell.borrow_mut();
            let channels = &mut *guard;
            let Some(last) = channels.sample.last_edge else {
                channels.sample.last_edge = Some(now);
                channels.sample.frequency_hz = 0.0;
                return;
            };

            // Edges closer than the clock resolution keep the previous rate.
            let dt_us = now.as_micros().saturating_sub(last.as_micros());
            if dt_us > 0 {
                channels.sample.frequency_hz = 1_000_000.0 / dt_us as f32;
            }
            if let Some(direction) = channels.phase() {
                channels.sample.direction = direction;
            }
            channels.sample.last_edge = Some(now);
        });
    }
}

impl<A, B, C> Encoder for RotaryEncoder<A, B, C>
where
    A: InputPin,
    B: InputPin,
    C: Monotonic,
{
    fn revolutions_per_second(&self) -> f32 {
        let sample = self.sample();
        sample.direction.sign() * self.live_frequency(&sample) * self.revolutions_per_edge
    }
}

/// Encoder test double whose rate and direction are set directly.
#[derive(Debug, Default)]
pub struct MockEncoder {
    rate: Cell<f32>,
    direction: Cell<Direction>,
}

impl MockEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the unsigned rate; the sign comes from [`MockEncoder::set_direction`].
    pub fn set_revolutions_per_second(
        &self,
        rate: f32,
    ) {
        self.rate.set(libm::fabsf(rate));
    }

    pub fn set_direction(
        &self,
        direction: Direction,
    ) {
        self.direction.set(direction);
    }

    pub fn direction(&self) -> Direction {
        self.direction.get()
    }
}

impl Encoder for MockEncoder {
    fn revolutions_per_second(&self) -> f32 {
        self.direction.get().sign() * self.rate.get()
    }
}
