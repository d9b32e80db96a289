//! PID регулятор позиции по одной оси
//!
//! Дифференциальная составляющая берется из отфильтрованной скорости, ошибка повторно
//! не дифференцируется.

use crate::config::PidGains;
use crate::utils::math::constrain;

/// Множители коэффициентов для текущей высоты
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GainSchedule {
    /// Множитель Kp и Ki (0, 1]
    pub responsiveness: f32,
    /// Множитель Kd (>= 1)
    pub damping: f32,
}

impl GainSchedule {
    pub const NEUTRAL: Self = Self {
        responsiveness: 1.0,
        damping: 1.0,
    };
}

/// Регулятор одной оси
#[derive(Debug, Clone)]
pub struct PositionPid {
    gains: PidGains,
    /// Ограничение интеграла (м*с)
    integral_limit: f32,
    /// Ограничение выхода (градусы)
    output_limit: f32,
    integral: f32,
    previous_error: f32,
}

impl PositionPid {
    pub fn new(gains: PidGains, integral_limit: f32, output_limit: f32) -> Self {
        Self {
            gains,
            integral_limit,
            output_limit,
            integral: 0.0,
            previous_error: 0.0,
        }
    }

    /// Один шаг регулятора
    ///
    /// # Параметры
    /// * `error` - цель минус позиция (м)
    /// * `velocity` - скорость по оси (м/с)
    /// * `dt` - интервал (с)
    pub fn update(&mut self, error: f32, velocity: f32, dt: f32, schedule: GainSchedule) -> f32 {
        // Anti-windup: интеграл ограничивается на каждом шаге
        self.integral = constrain(
            self.integral + error * dt,
            -self.integral_limit,
            self.integral_limit,
        );
        self.previous_error = error;

        let p_term = self.gains.kp * schedule.responsiveness * error;
        let i_term = self.gains.ki * schedule.responsiveness * self.integral;
        let d_term = self.gains.kd * schedule.damping * velocity;

        constrain(p_term + i_term - d_term, -self.output_limit, self.output_limit)
    }

    /// Сброс накопленного состояния
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.previous_error = 0.0;
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn previous_error(&self) -> f32 {
        self.previous_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid() -> PositionPid {
        PositionPid::new(PidGains::new(0.5, 0.1, 0.2), 1.0, 15.0)
    }

    #[test]
    fn test_proportional_and_integral() {
        let mut pid = pid();
        let out = pid.update(2.0, 0.0, 0.1, GainSchedule::NEUTRAL);
        // 0.5 * 2 + 0.1 * 0.2
        assert!((out - 1.02).abs() < 1e-6);
        assert!((pid.integral() - 0.2).abs() < 1e-6);
        assert_eq!(pid.previous_error(), 2.0);
    }

    #[test]
    fn test_derivative_opposes_velocity() {
        let mut pid = pid();
        let out = pid.update(0.0, 1.0, 0.02, GainSchedule::NEUTRAL);
        assert!((out + 0.2).abs() < 1e-6);

        let boosted = GainSchedule {
            responsiveness: 1.0,
            damping: 2.0,
        };
        pid.reset();
        let out = pid.update(0.0, 1.0, 0.02, boosted);
        assert!((out + 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_integral_clamped() {
        let mut pid = pid();
        for _ in 0..10_000 {
            pid.update(100.0, 0.0, 0.02, GainSchedule::NEUTRAL);
            assert!(pid.integral() <= 1.0);
        }
        assert_eq!(pid.integral(), 1.0);

        for _ in 0..10_000 {
            pid.update(-100.0, 0.0, 0.02, GainSchedule::NEUTRAL);
        }
        assert_eq!(pid.integral(), -1.0);
    }

    #[test]
    fn test_output_clamped() {
        let mut pid = pid();
        assert_eq!(pid.update(1000.0, 0.0, 0.02, GainSchedule::NEUTRAL), 15.0);
        assert_eq!(pid.update(-1000.0, 0.0, 0.02, GainSchedule::NEUTRAL), -15.0);
    }

    #[test]
    fn test_schedule_scales_kp_ki() {
        let mut pid = pid();
        let reduced = GainSchedule {
            responsiveness: 0.5,
            damping: 1.0,
        };
        let out = pid.update(2.0, 0.0, 0.1, reduced);
        assert!((out - 0.51).abs() < 1e-6);
    }
}
