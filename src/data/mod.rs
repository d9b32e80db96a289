//! Данные, которыми обмениваются компоненты конвейера
//!
//! Все типы - значения (`Copy`): каждый такт копируются целиком, общих ссылок между
//! задачами нет.

use crate::control::stabilizer::StabilizerMode;

/// Отсчет датчика оптического потока
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlowSample {
    pub dx: f32,              // Приращение по X в единицах датчика
    pub dy: f32,              // Приращение по Y в единицах датчика
    pub surface_quality: u8,  // Качество поверхности 0-255
    pub timestamp_us: u64,    // Время отсчета
}

impl FlowSample {
    /// Отсчет из сырых регистров датчика
    pub fn from_raw(dx: i16, dy: i16, surface_quality: u8, timestamp_us: u64) -> Self {
        Self {
            dx: dx as f32,
            dy: dy as f32,
            surface_quality,
            timestamp_us,
        }
    }
}

/// Оценка позиции в локальной (визуальной) системе координат
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PositionEstimate {
    pub x: f32,            // Метры, ось X датчика
    pub y: f32,            // Метры, ось Y датчика ("вперед")
    pub vx: f32,           // м/с
    pub vy: f32,           // м/с
    pub altitude_m: f32,   // Высота над землей, использованная для масштаба
    pub confidence: f32,   // Достоверность 0.0-1.0
    pub timestamp_us: u64,
}

impl PositionEstimate {
    /// Горизонтальная скорость (м/с)
    pub fn ground_speed(&self) -> f32 {
        crate::utils::math::vector2_length(self.vx, self.vy)
    }
}

/// Отсчет одного источника высоты
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AltitudeSample {
    pub altitude_m: f32,
    pub vertical_velocity_mps: f32,
    pub valid: bool,
    /// Вес источника; `None` - вес по умолчанию (1.0)
    pub weight: Option<f32>,
}

impl AltitudeSample {
    /// Валидный отсчет с весом по умолчанию
    pub const fn new(altitude_m: f32, vertical_velocity_mps: f32) -> Self {
        Self {
            altitude_m,
            vertical_velocity_mps,
            valid: true,
            weight: None,
        }
    }

    /// Отсчет источника, у которого сейчас нет данных
    pub const fn invalid() -> Self {
        Self {
            altitude_m: 0.0,
            vertical_velocity_mps: 0.0,
            valid: false,
            weight: None,
        }
    }

    pub const fn with_weight(mut self, weight: f32) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Фактический вес с учетом значения по умолчанию
    pub fn effective_weight(&self) -> f32 {
        self.weight
            .unwrap_or(crate::config::flight::altitude::DEFAULT_WEIGHT)
    }
}

/// Результат объединения источников высоты
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AltitudeEstimate {
    pub altitude_m: f32,
    pub vertical_velocity_mps: f32,
    /// false - значение устарело (последнее хорошее или начальное)
    pub valid: bool,
}

/// Коррекция ориентации для полетного контроллера
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AttitudeCorrection {
    pub pitch_deg: f32,        // Тангаж, управляет осью Y
    pub roll_deg: f32,         // Крен, управляет осью X
    pub mode: StabilizerMode,
    /// Достоверность ниже порога: оценка деградировала (но не отброшена)
    pub low_confidence: bool,
    /// Множитель Kp/Ki, примененный в этом такте
    pub gain_scale: f32,
    /// Множитель Kd, примененный в этом такте
    pub damping_factor: f32,
}

impl AttitudeCorrection {
    /// Нулевая коррекция (режим Off)
    pub const fn neutral(mode: StabilizerMode) -> Self {
        Self {
            pitch_deg: 0.0,
            roll_deg: 0.0,
            mode,
            low_confidence: false,
            gain_scale: 1.0,
            damping_factor: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weight() {
        let sample = AltitudeSample::new(3.0, 0.0);
        assert_eq!(sample.effective_weight(), 1.0);
        assert_eq!(sample.with_weight(2.5).effective_weight(), 2.5);
    }

    #[test]
    fn test_ground_speed() {
        let estimate = PositionEstimate {
            vx: 3.0,
            vy: 4.0,
            ..Default::default()
        };
        assert!((estimate.ground_speed() - 5.0).abs() < 1e-6);
    }
}
