//! DSP kernels: pure Rust building blocks for the offline effects.
//!
//! Every kernel is a plain value built fresh per render; nothing here holds
//! state across renders.

pub mod convolver;
pub mod crossover;
pub mod curves;
pub mod delay;
pub mod dynamics;
pub mod envelope;
pub mod filter;
pub mod impulse;
pub mod midside;
pub mod oscillator;
pub mod oversample;
pub mod pitch;
pub mod resample;
pub mod window;
