//! Dual DC motor ramp controller with single-channel encoder speed estimation
//! for no-std embedded platforms.
//!
//! For a runnable host simulation, see the `mock-mcu` crate in `dmc-app/`.
#![no_std]

pub mod utils;
