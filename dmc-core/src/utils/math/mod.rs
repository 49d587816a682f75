//! Math utilities for the dual motor controller.
//!
//! This module provides speed estimation from encoder pulse counts.

pub mod speed;
