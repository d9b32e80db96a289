//! Ошибки конфигурации
//!
//! Единственный фатальный класс ошибок: неверная конфигурация отклоняется при создании
//! компонентов, до запуска конвейера. Деградация входных данных ошибкой не является и
//! передается флагами (`valid`, `confidence`, `low_confidence`).

use core::fmt;

/// Ошибки проверки конфигурации
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// Калибровочный коэффициент потока нулевой, отрицательный или не число
    InvalidScaleFactor,
    /// Неверные границы высоты для масштабирования (min > max, отрицательные)
    InvalidHeightRange,
    /// Неверные границы интервала dt
    InvalidInterval,
    /// Таблица высотных диапазонов пуста
    EmptyProfile,
    /// Первый диапазон должен начинаться с 0 м
    ProfileNotAnchored,
    /// Границы диапазонов не возрастают строго
    NonMonotonicBands { index: usize },
    /// Окно фильтра вне [1, MAX_FILTER_WINDOW] или убывает с высотой
    InvalidFilterWindow { index: usize },
    /// Компенсация масштаба < 1.0 или убывает с высотой
    InvalidScaleCompensation { index: usize },
    /// Множитель достоверности вне (0, 1] или растет с высотой
    InvalidConfidence { index: usize },
    /// Минимальный множитель достоверности вне (0, последний множитель]
    InvalidMinConfidence,
    /// Отрицательный или нечисловой прирост за пределами таблицы
    InvalidExtrapolation,
    /// Отрицательный или нечисловой коэффициент PID
    InvalidGains,
    /// Неверное ограничение интегральной составляющей
    InvalidIntegralLimit,
    /// Неверный максимальный угол наклона
    InvalidTiltLimit,
    /// Неверное значение коэффициента демпфирования
    InvalidDamping,
    /// Порог достоверности вне [0, 1]
    InvalidConfidenceFloor,
    /// Координаты дома вне допустимого диапазона
    InvalidHome,
    /// Неверная частота выдачи GPS
    InvalidEmissionRate,
    /// Неверные параметры качества GPS (HDOP, спутники)
    InvalidGpsQuality,
    /// Вес источника высоты отрицательный или не число
    InvalidFusionWeight,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidScaleFactor => write!(f, "flow scale factor must be finite and > 0"),
            ConfigError::InvalidHeightRange => write!(f, "height range must satisfy 0 < min <= max"),
            ConfigError::InvalidInterval => write!(f, "dt bounds must satisfy 0 < min <= nominal <= max"),
            ConfigError::EmptyProfile => write!(f, "altitude profile has no bands"),
            ConfigError::ProfileNotAnchored => write!(f, "first altitude band must start at 0 m"),
            ConfigError::NonMonotonicBands { index } => {
                write!(f, "altitude band {} does not start above the previous one", index)
            }
            ConfigError::InvalidFilterWindow { index } => {
                write!(f, "altitude band {} has an invalid filter window", index)
            }
            ConfigError::InvalidScaleCompensation { index } => {
                write!(f, "altitude band {} has an invalid scale compensation", index)
            }
            ConfigError::InvalidConfidence { index } => {
                write!(f, "altitude band {} has an invalid confidence multiplier", index)
            }
            ConfigError::InvalidMinConfidence => write!(f, "minimum confidence must be in (0, last band]"),
            ConfigError::InvalidExtrapolation => write!(f, "per-meter increments must be finite and >= 0"),
            ConfigError::InvalidGains => write!(f, "PID gains must be finite and >= 0"),
            ConfigError::InvalidIntegralLimit => write!(f, "integral limit must be finite and > 0"),
            ConfigError::InvalidTiltLimit => write!(f, "max tilt must be in (0, 90) degrees"),
            ConfigError::InvalidDamping => write!(f, "damping parameters must be finite and >= 0"),
            ConfigError::InvalidConfidenceFloor => write!(f, "confidence floor must be in [0, 1]"),
            ConfigError::InvalidHome => write!(f, "home position is out of range"),
            ConfigError::InvalidEmissionRate => write!(f, "GPS emission rate must be in (0, 50] Hz"),
            ConfigError::InvalidGpsQuality => write!(f, "GPS quality fields are out of range"),
            ConfigError::InvalidFusionWeight => write!(f, "altitude source weight must be finite and >= 0"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConfigError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            ConfigError::InvalidScaleFactor => defmt::write!(fmt, "Config: scale factor"),
            ConfigError::InvalidHeightRange => defmt::write!(fmt, "Config: height range"),
            ConfigError::InvalidInterval => defmt::write!(fmt, "Config: dt bounds"),
            ConfigError::EmptyProfile => defmt::write!(fmt, "Config: empty profile"),
            ConfigError::ProfileNotAnchored => defmt::write!(fmt, "Config: profile not anchored at 0 m"),
            ConfigError::NonMonotonicBands { index } => {
                defmt::write!(fmt, "Config: band {} not monotonic", index)
            }
            ConfigError::InvalidFilterWindow { index } => {
                defmt::write!(fmt, "Config: band {} filter window", index)
            }
            ConfigError::InvalidScaleCompensation { index } => {
                defmt::write!(fmt, "Config: band {} scale compensation", index)
            }
            ConfigError::InvalidConfidence { index } => {
                defmt::write!(fmt, "Config: band {} confidence", index)
            }
            ConfigError::InvalidMinConfidence => defmt::write!(fmt, "Config: min confidence"),
            ConfigError::InvalidExtrapolation => defmt::write!(fmt, "Config: extrapolation"),
            ConfigError::InvalidGains => defmt::write!(fmt, "Config: PID gains"),
            ConfigError::InvalidIntegralLimit => defmt::write!(fmt, "Config: integral limit"),
            ConfigError::InvalidTiltLimit => defmt::write!(fmt, "Config: max tilt"),
            ConfigError::InvalidDamping => defmt::write!(fmt, "Config: damping"),
            ConfigError::InvalidConfidenceFloor => defmt::write!(fmt, "Config: confidence floor"),
            ConfigError::InvalidHome => defmt::write!(fmt, "Config: home position"),
            ConfigError::InvalidEmissionRate => defmt::write!(fmt, "Config: GPS rate"),
            ConfigError::InvalidGpsQuality => defmt::write!(fmt, "Config: GPS quality"),
            ConfigError::InvalidFusionWeight => defmt::write!(fmt, "Config: fusion weight"),
        }
    }
}
