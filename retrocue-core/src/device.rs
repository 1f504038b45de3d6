//! Boundaries to the hardware the engine drives but does not own.

use crate::frame::Drawable;
use crate::trigger::TriggerCode;
use thiserror::Error;

/// Double-buffered output surface. `render` draws off screen, `present` flips.
pub trait Display {
    fn render(&mut self, drawable: &Drawable);

    /// Swaps the back buffer onto the screen. Timing is measured from its return.
    fn present(&mut self);
}

/// Pointer in a centre-origin coordinate space.
pub trait Pointer {
    fn position(&self) -> (f32, f32);
    fn pressed(&self) -> bool;
    fn moved_since_reset(&self) -> bool;
    fn reset(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Ends the current trial, or stops practice.
    Abort,
}

pub trait Keyboard {
    /// True if `key` went down since the last `clear`.
    fn pressed(&mut self, key: Key) -> bool;
    fn clear(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("trigger {code} not delivered: {reason}")]
pub struct TriggerError {
    pub code: String,
    pub reason: String,
}

/// Fire-and-forget marker channel to the recording device.
pub trait TriggerSink {
    fn send(&mut self, code: &TriggerCode) -> Result<(), TriggerError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{device}: {reason}")]
pub struct DeviceError {
    pub device: &'static str,
    pub reason: String,
}

pub trait Eyetracker {
    fn calibrate(&mut self) -> Result<(), DeviceError>;
    fn start_recording(&mut self) -> Result<(), DeviceError>;
    fn stop_recording(&mut self) -> Result<(), DeviceError>;
}

impl<T: Display + ?Sized> Display for &mut T {
    fn render(&mut self, drawable: &Drawable) {
        (**self).render(drawable)
    }

    fn present(&mut self) {
        (**self).present()
    }
}

impl<T: Pointer + ?Sized> Pointer for &mut T {
    fn position(&self) -> (f32, f32) {
        (**self).position()
    }

    fn pressed(&self) -> bool {
        (**self).pressed()
    }

    fn moved_since_reset(&self) -> bool {
        (**self).moved_since_reset()
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

impl<T: Keyboard + ?Sized> Keyboard for &mut T {
    fn pressed(&mut self, key: Key) -> bool {
        (**self).pressed(key)
    }

    fn clear(&mut self) {
        (**self).clear()
    }
}

impl<T: TriggerSink + ?Sized> TriggerSink for &mut T {
    fn send(&mut self, code: &TriggerCode) -> Result<(), TriggerError> {
        (**self).send(code)
    }
}
