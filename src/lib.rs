//! Handover decisions for user terminals on LEO satellite constellations.
//!
//! The predictive path samples the best satellite at two instants and
//! bisects the window between them for the switch-over time. The event
//! path evaluates recorded RSRP history against A4/A5 rules and is used to
//! corroborate predictions.

pub mod batch;
pub mod config;
pub mod ephemeris;
pub mod events;
pub mod handover;
pub mod records;
pub mod signal;

#[cfg(test)]
pub(crate) mod testing;
