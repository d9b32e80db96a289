//! Конфигурация конвейера
//!
//! Вся настройка передается один раз при создании компонентов и дальше не меняется.
//! Значения по умолчанию собраны из констант [`flight`].

pub mod flight;
pub mod hardware;

use crate::error::ConfigError;
use crate::gps::types::{GpsProtocol, HomePosition};
use crate::sensors::profile::AltitudeBand;

/// Ориентация датчика потока относительно корпуса
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorRotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl SensorRotation {
    /// Поворот сырых приращений на угол установки
    pub fn apply(self, x: f32, y: f32) -> (f32, f32) {
        match self {
            SensorRotation::Deg0 => (x, y),
            SensorRotation::Deg90 => (y, -x),
            SensorRotation::Deg180 => (-x, -y),
            SensorRotation::Deg270 => (-y, x),
        }
    }
}

/// Параметры интегратора оптического потока
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowConfig {
    /// Калибровочный коэффициент: метры на единицу датчика на метр высоты
    pub scale_factor: f32,
    /// Ориентация датчика
    pub rotation: SensorRotation,
    /// Границы высоты, используемой для масштабирования
    pub min_height_m: f32,
    pub max_height_m: f32,
    /// Интервалы между отсчетами
    pub nominal_dt_s: f32,
    pub min_dt_s: f32,
    pub max_dt_s: f32,
}

impl Default for FlowConfig {
    fn default() -> Self {
        use flight::tracker::*;
        Self {
            scale_factor: SCALE_FACTOR,
            rotation: SensorRotation::Deg0,
            min_height_m: MIN_HEIGHT_M,
            max_height_m: MAX_HEIGHT_M,
            nominal_dt_s: NOMINAL_DT_S,
            min_dt_s: MIN_DT_S,
            max_dt_s: MAX_DT_S,
        }
    }
}

impl FlowConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            return Err(ConfigError::InvalidScaleFactor);
        }
        if !(self.min_height_m.is_finite() && self.max_height_m.is_finite())
            || self.min_height_m <= 0.0
            || self.min_height_m > self.max_height_m
        {
            return Err(ConfigError::InvalidHeightRange);
        }
        validate_intervals(self.min_dt_s, self.nominal_dt_s, self.max_dt_s)
    }
}

/// Параметры объединения источников высоты
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionConfig {
    /// Значение, которое выдается до первого валидного отсчета
    pub initial_altitude_m: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            initial_altitude_m: flight::altitude::INITIAL_ALTITUDE_M,
        }
    }
}

impl FusionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_altitude_m.is_finite() {
            return Err(ConfigError::InvalidHeightRange);
        }
        Ok(())
    }
}

/// Таблица диапазонов высоты и правила за ее пределами
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileConfig {
    /// Упорядоченные по высоте диапазоны, первый начинается с 0 м
    pub bands: &'static [AltitudeBand],
    /// Прирост компенсации масштаба на метр выше последнего диапазона
    pub scale_per_meter_above: f32,
    /// Снижение множителя достоверности на метр выше последнего диапазона
    pub confidence_per_meter_above: f32,
    /// Нижняя граница множителя достоверности (никогда не 0)
    pub min_confidence: f32,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        use flight::profile::*;
        Self {
            bands: BANDS,
            scale_per_meter_above: SCALE_PER_METER_ABOVE,
            confidence_per_meter_above: CONFIDENCE_PER_METER_ABOVE,
            min_confidence: MIN_CONFIDENCE,
        }
    }
}

impl ProfileConfig {
    /// Проверка таблицы: первый диапазон от 0 м, границы строго растут,
    /// окно и масштаб не убывают, достоверность не растет
    pub fn validate(&self) -> Result<(), ConfigError> {
        let first = self.bands.first().ok_or(ConfigError::EmptyProfile)?;
        if first.floor_m != 0.0 {
            return Err(ConfigError::ProfileNotAnchored);
        }

        let max_window = flight::tracker::MAX_FILTER_WINDOW;
        for (index, band) in self.bands.iter().enumerate() {
            if band.filter_window == 0 || band.filter_window > max_window {
                return Err(ConfigError::InvalidFilterWindow { index });
            }
            if !band.scale_compensation.is_finite() || band.scale_compensation < 1.0 {
                return Err(ConfigError::InvalidScaleCompensation { index });
            }
            if !band.confidence_multiplier.is_finite()
                || band.confidence_multiplier <= 0.0
                || band.confidence_multiplier > 1.0
            {
                return Err(ConfigError::InvalidConfidence { index });
            }

            if index == 0 {
                continue;
            }
            let prev = &self.bands[index - 1];
            if !band.floor_m.is_finite() || band.floor_m <= prev.floor_m {
                return Err(ConfigError::NonMonotonicBands { index });
            }
            if band.filter_window < prev.filter_window {
                return Err(ConfigError::InvalidFilterWindow { index });
            }
            if band.scale_compensation < prev.scale_compensation {
                return Err(ConfigError::InvalidScaleCompensation { index });
            }
            if band.confidence_multiplier > prev.confidence_multiplier {
                return Err(ConfigError::InvalidConfidence { index });
            }
        }

        if !(self.scale_per_meter_above.is_finite() && self.confidence_per_meter_above.is_finite())
            || self.scale_per_meter_above < 0.0
            || self.confidence_per_meter_above < 0.0
        {
            return Err(ConfigError::InvalidExtrapolation);
        }

        // first() прошел, значит last() тоже есть
        let last_confidence = self.bands[self.bands.len() - 1].confidence_multiplier;
        if !self.min_confidence.is_finite()
            || self.min_confidence <= 0.0
            || self.min_confidence > last_confidence
        {
            return Err(ConfigError::InvalidMinConfidence);
        }

        Ok(())
    }
}

/// Коэффициенты PID одной оси
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

impl PidGains {
    pub const fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self { kp, ki, kd }
    }

    fn is_valid(&self) -> bool {
        [self.kp, self.ki, self.kd]
            .iter()
            .all(|g| g.is_finite() && *g >= 0.0)
    }
}

impl Default for PidGains {
    fn default() -> Self {
        use flight::pid::position::*;
        Self::new(KP, KI, KD)
    }
}

/// Параметры стабилизатора позиции
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilizerConfig {
    /// PID по оси X (управляет креном)
    pub gains_x: PidGains,
    /// PID по оси Y (управляет тангажом)
    pub gains_y: PidGains,
    /// Ограничение интеграла ошибки (м*с)
    pub integral_limit: f32,
    /// Максимальный угол коррекции (градусы)
    pub max_tilt_deg: f32,
    /// Коэффициент демпфирования скорости в режиме VelocityDamping
    pub velocity_damping: f32,
    /// Адаптация коэффициентов к высоте
    pub altitude_adaptive: bool,
    /// Дополнительное демпфирование на высоте
    pub high_altitude_damping_boost: f32,
    /// Порог достоверности для флага деградации
    pub confidence_floor: f32,
    /// Интервалы между тактами
    pub nominal_dt_s: f32,
    pub min_dt_s: f32,
    pub max_dt_s: f32,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        use flight::stabilization::*;
        Self {
            gains_x: PidGains::default(),
            gains_y: PidGains::default(),
            integral_limit: flight::pid::position::I_LIMIT,
            max_tilt_deg: MAX_TILT_ANGLE_DEG,
            velocity_damping: VELOCITY_DAMPING,
            altitude_adaptive: true,
            high_altitude_damping_boost: HIGH_ALTITUDE_DAMPING_BOOST,
            confidence_floor: CONFIDENCE_FLOOR,
            nominal_dt_s: flight::tracker::NOMINAL_DT_S,
            min_dt_s: flight::tracker::MIN_DT_S,
            max_dt_s: flight::tracker::MAX_DT_S,
        }
    }
}

impl StabilizerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.gains_x.is_valid() || !self.gains_y.is_valid() {
            return Err(ConfigError::InvalidGains);
        }
        if !self.integral_limit.is_finite() || self.integral_limit <= 0.0 {
            return Err(ConfigError::InvalidIntegralLimit);
        }
        if !self.max_tilt_deg.is_finite() || self.max_tilt_deg <= 0.0 || self.max_tilt_deg >= 90.0 {
            return Err(ConfigError::InvalidTiltLimit);
        }
        if !(self.velocity_damping.is_finite() && self.high_altitude_damping_boost.is_finite())
            || self.velocity_damping < 0.0
            || self.high_altitude_damping_boost < 0.0
        {
            return Err(ConfigError::InvalidDamping);
        }
        if !self.confidence_floor.is_finite() || !(0.0..=1.0).contains(&self.confidence_floor) {
            return Err(ConfigError::InvalidConfidenceFloor);
        }
        validate_intervals(self.min_dt_s, self.nominal_dt_s, self.max_dt_s)
    }
}

/// Параметры эмуляции GPS
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsConfig {
    pub protocol: GpsProtocol,
    /// Начало локальной системы координат
    pub home: HomePosition,
    pub emission_rate_hz: f32,
    pub satellites: u8,
    pub hdop: f32,
    pub vdop: f32,
    /// Ниже этой скорости курс держится на последнем значении
    pub course_hold_speed_mps: f32,
    pub system_id: u8,
    pub component_id: u8,
}

impl Default for GpsConfig {
    fn default() -> Self {
        use flight::gps_emulation::*;
        Self {
            protocol: GpsProtocol::Nmea,
            home: HomePosition::default(),
            emission_rate_hz: EMISSION_RATE_HZ,
            satellites: SATELLITES,
            hdop: HDOP,
            vdop: VDOP,
            course_hold_speed_mps: COURSE_HOLD_SPEED_MPS,
            system_id: MAVLINK_SYSTEM_ID,
            component_id: MAVLINK_COMPONENT_ID,
        }
    }
}

impl GpsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.home.validate()?;
        if !self.emission_rate_hz.is_finite()
            || self.emission_rate_hz <= 0.0
            || self.emission_rate_hz > 50.0
        {
            return Err(ConfigError::InvalidEmissionRate);
        }
        // HDOP в NMEA выводится с одним знаком, в MAVLink - u16 * 100
        let dop_ok = |d: f32| d.is_finite() && d > 0.0 && d < 99.9;
        if self.satellites > 99 || !dop_ok(self.hdop) || !dop_ok(self.vdop) {
            return Err(ConfigError::InvalidGpsQuality);
        }
        if !self.course_hold_speed_mps.is_finite() || self.course_hold_speed_mps < 0.0 {
            return Err(ConfigError::InvalidGpsQuality);
        }
        Ok(())
    }
}

/// Полная конфигурация конвейера
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PipelineConfig {
    pub flow: FlowConfig,
    pub fusion: FusionConfig,
    pub profile: ProfileConfig,
    pub stabilizer: StabilizerConfig,
    pub gps: GpsConfig,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.flow.validate()?;
        self.fusion.validate()?;
        self.profile.validate()?;
        self.stabilizer.validate()?;
        self.gps.validate()
    }
}

fn validate_intervals(min: f32, nominal: f32, max: f32) -> Result<(), ConfigError> {
    let finite = min.is_finite() && nominal.is_finite() && max.is_finite();
    if !finite || min <= 0.0 || nominal < min || max < nominal {
        return Err(ConfigError::InvalidInterval);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::profile::Interpolation;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(PipelineConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_zero_scale_factor_rejected() {
        let mut config = PipelineConfig::default();
        config.flow.scale_factor = 0.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidScaleFactor));
    }

    #[test]
    fn test_negative_gain_rejected() {
        let mut config = StabilizerConfig::default();
        config.gains_y.ki = -0.1;
        assert_eq!(config.validate(), Err(ConfigError::InvalidGains));
    }

    #[test]
    fn test_confidence_floor_out_of_range_rejected() {
        let mut config = StabilizerConfig::default();
        config.confidence_floor = 1.5;
        assert_eq!(config.validate(), Err(ConfigError::InvalidConfidenceFloor));
        config.confidence_floor = f32::NAN;
        assert_eq!(config.validate(), Err(ConfigError::InvalidConfidenceFloor));
    }

    #[test]
    fn test_non_monotonic_bands_rejected() {
        let profile = ProfileConfig {
            bands: &[
                AltitudeBand {
                    floor_m: 0.0,
                    filter_window: 5,
                    scale_compensation: 1.0,
                    confidence_multiplier: 1.0,
                    interpolation: Interpolation::Step,
                },
                AltitudeBand {
                    floor_m: 10.0,
                    filter_window: 7,
                    scale_compensation: 1.1,
                    confidence_multiplier: 0.9,
                    interpolation: Interpolation::Step,
                },
                AltitudeBand {
                    floor_m: 10.0,
                    filter_window: 9,
                    scale_compensation: 1.2,
                    confidence_multiplier: 0.8,
                    interpolation: Interpolation::Step,
                },
            ],
            ..ProfileConfig::default()
        };
        assert_eq!(profile.validate(), Err(ConfigError::NonMonotonicBands { index: 2 }));
    }

    #[test]
    fn test_rising_confidence_rejected() {
        let profile = ProfileConfig {
            bands: &[
                AltitudeBand {
                    floor_m: 0.0,
                    filter_window: 5,
                    scale_compensation: 1.0,
                    confidence_multiplier: 0.8,
                    interpolation: Interpolation::Step,
                },
                AltitudeBand {
                    floor_m: 10.0,
                    filter_window: 7,
                    scale_compensation: 1.1,
                    confidence_multiplier: 0.9,
                    interpolation: Interpolation::Step,
                },
            ],
            ..ProfileConfig::default()
        };
        assert_eq!(profile.validate(), Err(ConfigError::InvalidConfidence { index: 1 }));
    }

    #[test]
    fn test_unanchored_profile_rejected() {
        let profile = ProfileConfig {
            bands: &[AltitudeBand {
                floor_m: 1.0,
                filter_window: 5,
                scale_compensation: 1.0,
                confidence_multiplier: 1.0,
                interpolation: Interpolation::Step,
            }],
            ..ProfileConfig::default()
        };
        assert_eq!(profile.validate(), Err(ConfigError::ProfileNotAnchored));
    }

    #[test]
    fn test_oversized_window_rejected() {
        let profile = ProfileConfig {
            bands: &[AltitudeBand {
                floor_m: 0.0,
                filter_window: flight::tracker::MAX_FILTER_WINDOW + 1,
                scale_compensation: 1.0,
                confidence_multiplier: 1.0,
                interpolation: Interpolation::Step,
            }],
            ..ProfileConfig::default()
        };
        assert_eq!(profile.validate(), Err(ConfigError::InvalidFilterWindow { index: 0 }));
    }

    #[test]
    fn test_sensor_rotation() {
        assert_eq!(SensorRotation::Deg0.apply(1.0, 2.0), (1.0, 2.0));
        assert_eq!(SensorRotation::Deg90.apply(1.0, 2.0), (2.0, -1.0));
        assert_eq!(SensorRotation::Deg180.apply(1.0, 2.0), (-1.0, -2.0));
        assert_eq!(SensorRotation::Deg270.apply(1.0, 2.0), (-2.0, 1.0));
    }

    #[test]
    fn test_invalid_home_rejected() {
        let mut config = GpsConfig::default();
        config.home = HomePosition::new(91.0, 0.0, 0.0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidHome));
    }
}
