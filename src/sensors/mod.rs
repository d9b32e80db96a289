//! Обработка датчиков: высота, профиль по высоте, оптический поток

pub mod altitude;
pub mod flow;
pub mod profile;

pub use altitude::{AltitudeFusion, AltitudeSource};
pub use flow::FlowIntegrator;
pub use profile::{AltitudeAdaptiveParams, AltitudeAdaptiveProfile, AltitudeBand, Interpolation};
