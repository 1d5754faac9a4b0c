//! Hardware context for the Two-Wheel Bot.
//!
//! Everything the drivers need from the microcontroller is reached through an
//! explicitly owned context object instead of process-wide registers:
//!
//! - [`Board`]: hands out digital pins by index and rejects indices outside the
//!   board's digital range with [`InvalidPinError`].
//! - [`Monotonic`]: the time source sampled by the encoder interrupt handler.
//! - [`InterruptTable`]: dispatches an external interrupt line to the
//!   [`EdgeHandler`] attached to it.
//!
//! [`MockBoard`] and [`MockClock`] implement the same seams in memory so that
//! tests and the host simulator can each build an independent board.

use core::{cell::Cell, convert::Infallible, fmt};

use embassy_time::{Duration, Instant};
use embedded_hal::{
    digital::{self, InputPin, OutputPin, PinState},
    pwm::{self, SetDutyCycle},
};

/// Number of digital pins exposed by the reference board (Arduino Uno, D0..D13).
pub const DIGITAL_PIN_COUNT: usize = 14;

/// Number of external interrupt lines, one per wheel.
pub const INTERRUPT_CHANNELS: usize = 2;

/// Full-scale PWM duty on the reference board (8-bit timers).
pub const MAX_DUTY: u16 = 255;

/// A pin index outside the board's supported digital range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidPinError {
    pub pin: u8,
}

impl fmt::Display for InvalidPinError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "pin {} is outside the digital range 0..{}",
            self.pin, DIGITAL_PIN_COUNT
        )
    }
}

/// Wheel side, which doubles as the external interrupt channel index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Interrupt channel number (`Left` = 0, `Right` = 1).
    pub const fn channel(self) -> usize {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

/// Source of digital pins for the drivers.
///
/// Obtaining a pin configures it, so a pin handed out once is considered
/// initialized by the board.
pub trait Board {
    type Pin<'a>: InputPin + OutputPin + SetDutyCycle
    where
        Self: 'a;

    fn pin(
        &self,
        id: u8,
    ) -> Result<Self::Pin<'_>, InvalidPinError>;
}

/// Monotonic time source.
pub trait Monotonic {
    fn now(&self) -> Instant;
}

impl<T: Monotonic + ?Sized> Monotonic for &T {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Clock backed by the embassy-time driver linked into the firmware.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Monotonic for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for deterministic timing in tests.
#[derive(Debug, Default)]
pub struct MockClock {
    micros: Cell<u64>,
}

impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(
        &self,
        by: Duration,
    ) {
        self.micros.set(self.micros.get() + by.as_micros());
    }
}

impl Monotonic for MockClock {
    fn now(&self) -> Instant {
        Instant::from_micros(self.micros.get())
    }
}

/// Work performed when an external interrupt line fires.
///
/// Implementations run in interrupt context: they must not block and must
/// only touch state guarded by a critical section.
pub trait EdgeHandler {
    /// Interrupt line this handler is wired to.
    fn side(&self) -> Side;

    fn on_edge(&self);
}

/// Interrupt vector for the two wheel channels.
///
/// A handler is borrowed for the table's lifetime `'a`, so it can never be
/// dispatched after the object behind it is gone. Detaching a channel takes
/// the handler out of service.
pub struct InterruptTable<'a> {
    slots: [Cell<Option<&'a dyn EdgeHandler>>; INTERRUPT_CHANNELS],
}

impl<'a> InterruptTable<'a> {
    pub fn new() -> Self {
        Self {
            slots: [Cell::new(None), Cell::new(None)],
        }
    }

    /// Attach `handler` to the channel it is wired to, returning whether a
    /// previous handler was replaced.
    pub fn attach(
        &self,
        handler: &'a dyn EdgeHandler,
    ) -> bool {
        let side = handler.side();
        let replaced = self.slots[side.channel()].replace(Some(handler)).is_some();
        if replaced {
            tracing::warn!(?side, "interrupt handler replaced");
        } else {
            tracing::debug!(?side, "interrupt handler attached");
        }
        replaced
    }

    pub fn detach(
        &self,
        side: Side,
    ) {
        self.slots[side.channel()].set(None);
        tracing::debug!(?side, "interrupt handler detached");
    }

    pub fn is_attached(
        &self,
        side: Side,
    ) -> bool {
        self.slots[side.channel()].get().is_some()
    }

    /// Fire the interrupt line of `side`. Returns `false` if nothing is attached.
    pub fn trigger(
        &self,
        side: Side,
    ) -> bool {
        match self.slots[side.channel()].get() {
            Some(handler) => {
                handler.on_edge();
                true
            }
            None => false,
        }
    }
}

impl Default for InterruptTable<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory board with [`DIGITAL_PIN_COUNT`] pins.
///
/// Each pin stores a single value: `0`/`1` for digital levels or the last PWM
/// duty written to it, mirroring how an Arduino pin reads back after
/// `digitalWrite`/`analogWrite`.
pub struct MockBoard {
    values: [Cell<u16>; DIGITAL_PIN_COUNT],
    initialized: [Cell<bool>; DIGITAL_PIN_COUNT],
}

impl MockBoard {
    pub fn new() -> Self {
        Self {
            values: core::array::from_fn(|_| Cell::new(0)),
            initialized: core::array::from_fn(|_| Cell::new(false)),
        }
    }

    fn index(id: u8) -> Result<usize, InvalidPinError> {
        let idx = id as usize;
        if idx < DIGITAL_PIN_COUNT {
            Ok(idx)
        } else {
            Err(InvalidPinError { pin: id })
        }
    }

    /// Drive a pin from outside, as the encoder hardware would.
    pub fn set_level(
        &self,
        id: u8,
        level: PinState,
    ) -> Result<(), InvalidPinError> {
        let idx = Self::index(id)?;
        self.values[idx].set(match level {
            PinState::Low => 0,
            PinState::High => 1,
        });
        Ok(())
    }

    pub fn value(
        &self,
        id: u8,
    ) -> Result<u16, InvalidPinError> {
        Ok(self.values[Self::index(id)?].get())
    }

    pub fn is_initialized(
        &self,
        id: u8,
    ) -> Result<bool, InvalidPinError> {
        Ok(self.initialized[Self::index(id)?].get())
    }

    /// Reset every pin to low and uninitialized.
    pub fn clear(&self) {
        for (value, init) in self.values.iter().zip(self.initialized.iter()) {
            value.set(0);
            init.set(false);
        }
    }
}

impl Default for MockBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl Board for MockBoard {
    type Pin<'a> = MockPin<'a>;

    fn pin(
        &self,
        id: u8,
    ) -> Result<MockPin<'_>, InvalidPinError> {
        let idx = Self::index(id)?;
        self.initialized[idx].set(true);
        Ok(MockPin { board: self, idx })
    }
}

/// Handle to one [`MockBoard`] pin.
pub struct MockPin<'a> {
    board: &'a MockBoard,
    idx: usize,
}

impl digital::ErrorType for MockPin<'_> {
    type Error = Infallible;
}

impl InputPin for MockPin<'_> {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.board.values[self.idx].get() != 0)
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(self.board.values[self.idx].get() == 0)
    }
}

impl OutputPin for MockPin<'_> {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.board.values[self.idx].set(0);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.board.values[self.idx].set(1);
        Ok(())
    }
}

impl pwm::ErrorType for MockPin<'_> {
    type Error = Infallible;
}

impl SetDutyCycle for MockPin<'_> {
    fn max_duty_cycle(&self) -> u16 {
        MAX_DUTY
    }

    fn set_duty_cycle(
        &mut self,
        duty: u16,
    ) -> Result<(), Infallible> {
        self.board.values[self.idx].set(duty.min(MAX_DUTY));
        Ok(())
    }
}
