//! Общее состояние задач прошивки
//!
//! Конвейер живет под мьютексом: быстрый такт и такт GPS берут его по очереди,
//! так что смена режима применяется только между тактами.
//! Остальные поля - копии последних значений для задач, которым не нужен конвейер.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;

use flowhold::{AltitudeSample, AttitudeCorrection, Pipeline, StabilizerMode};

pub struct SystemState {
    pub pipeline: Mutex<CriticalSectionRawMutex, Option<Pipeline>>,
    /// Последний отсчет дальномера
    pub altitude: Mutex<CriticalSectionRawMutex, Option<AltitudeSample>>,
    /// Последняя коррекция для полетного контроллера
    pub correction: Mutex<CriticalSectionRawMutex, Option<AttitudeCorrection>>,
    /// Запрос режима стабилизации, забирается быстрым тактом
    pub mode_request: Signal<CriticalSectionRawMutex, StabilizerMode>,
}

impl SystemState {
    pub const fn new() -> Self {
        Self {
            pipeline: Mutex::new(None),
            altitude: Mutex::new(None),
            correction: Mutex::new(None),
            mode_request: Signal::new(),
        }
    }
}

pub static SYSTEM_STATE: SystemState = SystemState::new();
