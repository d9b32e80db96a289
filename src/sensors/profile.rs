//! Адаптивный к высоте профиль фильтрации
//!
//! Таблица точек разбиения по высоте с явным правилом интерполяции для каждого
//! диапазона. С ростом высоты окно фильтра и компенсация масштаба не убывают,
//! а множитель достоверности не растет.

use crate::config::ProfileConfig;
use crate::error::ConfigError;
use crate::utils::math::{inverse_lerp, lerp};

/// Правило перехода от диапазона к следующему
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Interpolation {
    /// Значения диапазона постоянны до начала следующего
    Step,
    /// Компенсация и достоверность линейно переходят к значениям следующего диапазона
    Linear,
}

/// Диапазон высоты, начинающийся с `floor_m`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AltitudeBand {
    pub floor_m: f32,
    pub filter_window: usize,
    pub scale_compensation: f32,
    pub confidence_multiplier: f32,
    pub interpolation: Interpolation,
}

/// Параметры фильтрации для текущей высоты
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AltitudeAdaptiveParams {
    pub filter_window: usize,
    pub scale_compensation: f32,
    pub confidence_multiplier: f32,
}

impl Default for AltitudeAdaptiveParams {
    fn default() -> Self {
        Self {
            filter_window: 1,
            scale_compensation: 1.0,
            confidence_multiplier: 1.0,
        }
    }
}

/// Профиль: чистая функция высоты
#[derive(Debug, Clone, Copy)]
pub struct AltitudeAdaptiveProfile {
    config: ProfileConfig,
}

impl AltitudeAdaptiveProfile {
    pub fn new(config: ProfileConfig) -> Result<Self, ConfigError> {
        if let Err(e) = config.validate() {
            error!("Профиль высоты отклонен: {}", e);
            return Err(e);
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }

    /// Параметры для заданной высоты (м над землей)
    ///
    /// Не-число и отрицательная высота считаются нулем.
    pub fn params_for(&self, altitude_m: f32) -> AltitudeAdaptiveParams {
        let altitude = if altitude_m.is_nan() { 0.0 } else { altitude_m.clamp(0.0, f32::MAX) };
        let bands = self.config.bands;

        // Таблица проверена: первый диапазон начинается с 0, поэтому индекс есть всегда
        let index = bands
            .iter()
            .rposition(|band| band.floor_m <= altitude)
            .unwrap_or(0);
        let band = &bands[index];

        match bands.get(index + 1) {
            Some(next) => match band.interpolation {
                Interpolation::Step => AltitudeAdaptiveParams {
                    filter_window: band.filter_window,
                    scale_compensation: band.scale_compensation,
                    confidence_multiplier: band.confidence_multiplier,
                },
                Interpolation::Linear => {
                    let t = inverse_lerp(band.floor_m, next.floor_m, altitude);
                    // Округление lerp не должно перешагнуть значение следующего диапазона
                    let scale = lerp(band.scale_compensation, next.scale_compensation, t)
                        .clamp(band.scale_compensation, next.scale_compensation);
                    let confidence = lerp(band.confidence_multiplier, next.confidence_multiplier, t)
                        .clamp(next.confidence_multiplier, band.confidence_multiplier);
                    AltitudeAdaptiveParams {
                        filter_window: band.filter_window,
                        scale_compensation: scale,
                        confidence_multiplier: confidence,
                    }
                }
            },
            None => {
                // Выше последнего диапазона: экстраполяция с фиксированным приростом
                let above = altitude - band.floor_m;
                let scale = band.scale_compensation + above * self.config.scale_per_meter_above;
                let confidence = (band.confidence_multiplier
                    - above * self.config.confidence_per_meter_above)
                    .max(self.config.min_confidence);
                AltitudeAdaptiveParams {
                    filter_window: band.filter_window,
                    scale_compensation: scale,
                    confidence_multiplier: confidence,
                }
            }
        }
    }
}

impl Default for AltitudeAdaptiveProfile {
    fn default() -> Self {
        Self {
            config: ProfileConfig::default(),
        }
    }
}

/// Множитель демпфирования (Kd) для высоты
///
/// До 15 м - 1.0, от 15 до 30 м растет на `boost / 30` на метр,
/// выше 30 м - `1 + boost` плюс 0.02 на метр.
pub fn damping_factor(altitude_m: f32, boost: f32) -> f32 {
    if altitude_m > 30.0 {
        1.0 + boost + (altitude_m - 30.0) * 0.02
    } else if altitude_m > 15.0 {
        1.0 + (altitude_m - 15.0) / 30.0 * boost
    } else {
        1.0
    }
}
