//! Источники высоты: статический, внешний (MAVLink) и барометр

use crate::config::flight::altitude::*;
use crate::data::AltitudeSample;
use crate::error::ConfigError;
use crate::utils::filters::LowPassFilter;

use super::{validate_weight, AltitudeSource};

/// Постоянная высота (стенд, полет на известной высоте)
pub struct StaticAltitude {
    altitude_m: f32,
    weight: Option<f32>,
}

impl StaticAltitude {
    pub fn new(altitude_m: f32, weight: Option<f32>) -> Result<Self, ConfigError> {
        if !altitude_m.is_finite() {
            return Err(ConfigError::InvalidHeightRange);
        }
        Ok(Self {
            altitude_m,
            weight: validate_weight(weight)?,
        })
    }

    pub fn set_altitude(&mut self, altitude_m: f32) {
        if altitude_m.is_finite() {
            self.altitude_m = altitude_m;
        }
    }
}

impl AltitudeSource for StaticAltitude {
    fn sample(&mut self, _now_us: u64) -> AltitudeSample {
        AltitudeSample {
            altitude_m: self.altitude_m,
            vertical_velocity_mps: 0.0,
            valid: true,
            weight: self.weight,
        }
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Последнее значение от внешнего источника
#[derive(Debug, Clone, Copy)]
struct ExternalReading {
    altitude_m: f32,
    vertical_velocity_mps: f32,
    timestamp_us: u64,
}

/// Высота, которую передает внешний сборщик (например, относительная высота из MAVLink)
///
/// Значение считается актуальным в течение таймаута. Если вертикальная скорость не
/// передана, она вычисляется по двум последним значениям.
pub struct ExternalAltitude {
    timeout_us: u64,
    weight: Option<f32>,
    last: Option<ExternalReading>,
}

impl ExternalAltitude {
    pub fn new(weight: Option<f32>) -> Result<Self, ConfigError> {
        Self::with_timeout(EXTERNAL_TIMEOUT_US, weight)
    }

    pub fn with_timeout(timeout_us: u64, weight: Option<f32>) -> Result<Self, ConfigError> {
        if timeout_us == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        Ok(Self {
            timeout_us,
            weight: validate_weight(weight)?,
            last: None,
        })
    }

    /// Новое значение от внешнего источника; не-числа отбрасываются
    pub fn push(&mut self, altitude_m: f32, vertical_velocity_mps: Option<f32>, timestamp_us: u64) {
        if !altitude_m.is_finite() {
            return;
        }

        let vertical_velocity_mps = match vertical_velocity_mps.filter(|v| v.is_finite()) {
            Some(v) => v,
            None => match self.last {
                Some(prev) if timestamp_us > prev.timestamp_us => {
                    let dt = (timestamp_us - prev.timestamp_us) as f32 / 1_000_000.0;
                    (altitude_m - prev.altitude_m) / dt
                }
                Some(prev) => prev.vertical_velocity_mps,
                None => 0.0,
            },
        };

        self.last = Some(ExternalReading {
            altitude_m,
            vertical_velocity_mps,
            timestamp_us,
        });
    }

    /// Было ли значение за последний таймаут
    pub fn is_fresh(&self, now_us: u64) -> bool {
        self.last
            .map(|r| now_us.saturating_sub(r.timestamp_us) < self.timeout_us)
            .unwrap_or(false)
    }
}

impl AltitudeSource for ExternalAltitude {
    fn sample(&mut self, now_us: u64) -> AltitudeSample {
        match self.last {
            Some(reading) if self.is_fresh(now_us) => AltitudeSample {
                altitude_m: reading.altitude_m,
                vertical_velocity_mps: reading.vertical_velocity_mps,
                valid: true,
                weight: self.weight,
            },
            _ => AltitudeSample {
                weight: self.weight,
                ..AltitudeSample::invalid()
            },
        }
    }

    fn name(&self) -> &'static str {
        "external"
    }
}

/// Барометрическая высота над точкой взлета
///
/// До калибровки уровня земли отсчеты невалидны.
pub struct BarometerAltitude {
    /// Фильтр для барометрической высоты
    altitude_filter: LowPassFilter,
    /// Фильтр для вертикальной скорости
    vspeed_filter: LowPassFilter,
    /// Давление на уровне земли (после калибровки)
    ground_pressure: Option<f32>,
    last_altitude: f32,
    last_vspeed: f32,
    /// Время последнего измерения
    last_time_us: Option<u64>,
    weight: Option<f32>,
}

impl BarometerAltitude {
    pub fn new(weight: Option<f32>) -> Result<Self, ConfigError> {
        Ok(Self {
            altitude_filter: LowPassFilter::new(BARO_ALTITUDE_CUTOFF_HZ, BARO_SAMPLE_RATE_HZ),
            vspeed_filter: LowPassFilter::new(BARO_VSPEED_CUTOFF_HZ, BARO_SAMPLE_RATE_HZ),
            ground_pressure: None,
            last_altitude: 0.0,
            last_vspeed: 0.0,
            last_time_us: None,
            weight: validate_weight(weight)?,
        })
    }

    /// Высота по барометрической формуле относительно опорного давления
    fn pressure_altitude(pressure_pa: f32, reference_pa: f32) -> f32 {
        44330.0 * (1.0 - libm::powf(pressure_pa / reference_pa, 0.1903))
    }

    /// Обработка новых данных барометра
    pub fn update(&mut self, pressure_pa: f32, time_us: u64) -> Option<(f32, f32)> {
        let ground = self.ground_pressure?;
        if !pressure_pa.is_finite() || pressure_pa <= 0.0 {
            return None;
        }

        let altitude = self.altitude_filter.filter(Self::pressure_altitude(pressure_pa, ground));

        // Расчет вертикальной скорости
        let vspeed = match self.last_time_us {
            Some(last) if time_us > last => {
                let dt = (time_us - last) as f32 / 1_000_000.0;
                if dt < 1.0 {
                    self.vspeed_filter.filter((altitude - self.last_altitude) / dt)
                } else {
                    0.0
                }
            }
            _ => 0.0,
        };

        self.last_altitude = altitude;
        self.last_vspeed = vspeed;
        self.last_time_us = Some(time_us);

        Some((altitude, vspeed))
    }

    /// Калибровка нулевой высоты по текущему давлению
    pub fn calibrate_ground_level(&mut self, current_pressure_pa: f32) -> Result<(), ConfigError> {
        if !current_pressure_pa.is_finite() || current_pressure_pa <= 0.0 {
            return Err(ConfigError::InvalidHeightRange);
        }
        self.ground_pressure = Some(current_pressure_pa);
        self.altitude_filter.reset();
        self.vspeed_filter.reset();
        self.last_time_us = None;
        self.last_altitude = 0.0;
        self.last_vspeed = 0.0;
        info!("Высота откалибрована, давление на земле: {} Па", current_pressure_pa);
        Ok(())
    }

    /// Высота над уровнем моря по стандартной атмосфере (для журнала)
    pub fn altitude_msl(pressure_pa: f32) -> f32 {
        Self::pressure_altitude(pressure_pa, SEA_LEVEL_PRESSURE_PA)
    }

    pub fn is_calibrated(&self) -> bool {
        self.ground_pressure.is_some()
    }
}

impl AltitudeSource for BarometerAltitude {
    fn sample(&mut self, now_us: u64) -> AltitudeSample {
        let fresh = self
            .last_time_us
            .map(|t| now_us.saturating_sub(t) < BAROMETER_TIMEOUT_US)
            .unwrap_or(false);

        if self.is_calibrated() && fresh {
            AltitudeSample {
                altitude_m: self.last_altitude,
                vertical_velocity_mps: self.last_vspeed,
                valid: true,
                weight: self.weight,
            }
        } else {
            AltitudeSample {
                weight: self.weight,
                ..AltitudeSample::invalid()
            }
        }
    }

    fn name(&self) -> &'static str {
        "barometer"
    }
}
