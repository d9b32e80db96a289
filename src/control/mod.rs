//! Управление: PID регуляторы и стабилизатор позиции

pub mod pid;
pub mod stabilizer;

pub use pid::{GainSchedule, PositionPid};
pub use stabilizer::{ControllerState, PositionStabilizer, StabilizerMode};
