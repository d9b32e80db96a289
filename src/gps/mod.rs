//! Эмуляция GPS по локальной оценке позиции

pub mod emulator;
pub mod geodetic;
pub mod mavlink;
pub mod nmea;
pub mod types;

pub use emulator::{GpsEmulator, GpsMessage};
pub use types::{FixType, GpsFix, GpsProtocol, HomePosition};
