//! Roundabout Simulation Library
//!
//! A single-ring roundabout with radial approach lanes, one traffic light and
//! travel-time statistics. Rendering is left to the caller.

pub mod simulation;
