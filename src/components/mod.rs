//! Built-in components.
//!
//! - `Boundary`: pass-through ports added at runtime, the entry and exit
//!   points of a nested graph
//! - `Oscillator`: tick-driven sine source

mod boundary;
mod oscillator;

pub use boundary::Boundary;
pub use oscillator::Oscillator;
