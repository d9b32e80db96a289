//! Удержание позиции по оптическому потоку с эмуляцией GPS
//!
//! Ядро конвейера: интегратор оптического потока, объединение источников высоты,
//! адаптивный к высоте профиль фильтрации, PID стабилизатор позиции и эмулятор GPS
//! (NMEA / MAVLink). Работает без аллокаций и без `std`, тесты запускаются на хосте.
//!
//! Порядок внутри одного такта строго линейный:
//! высота → профиль → интегратор потока → { стабилизатор, эмулятор GPS }.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod macros;

pub mod config;
pub mod control;
pub mod data;
pub mod error;
pub mod gps;
pub mod pipeline;
pub mod sensors;
pub mod utils;

pub use config::PipelineConfig;
pub use control::stabilizer::{PositionStabilizer, StabilizerMode};
pub use data::{
    AltitudeEstimate, AltitudeSample, AttitudeCorrection, FlowSample, PositionEstimate,
};
pub use error::ConfigError;
pub use gps::emulator::GpsEmulator;
pub use gps::types::{GpsFix, GpsProtocol, HomePosition};
pub use pipeline::Pipeline;
pub use sensors::altitude::AltitudeFusion;
pub use sensors::flow::FlowIntegrator;
pub use sensors::profile::{AltitudeAdaptiveParams, AltitudeAdaptiveProfile};
