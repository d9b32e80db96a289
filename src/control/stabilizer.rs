//! Стабилизатор позиции
//!
//! Режимы переключаются только внешним запросом. Запрос применяется в начале
//! следующего такта, поэтому переход никогда не происходит посреди вычислений.
//!
//! Выход: тангаж управляет осью Y, крен - осью X. Все входы очищаются до использования,
//! низкая достоверность не меняет математику регулятора и передается только флагом.

use crate::config::flight::stabilization::{MAX_ALTITUDE_M, MAX_POSITION_M, MAX_VELOCITY_MPS};
use crate::config::StabilizerConfig;
use crate::control::pid::{GainSchedule, PositionPid};
use crate::data::{AttitudeCorrection, PositionEstimate};
use crate::error::ConfigError;
use crate::sensors::profile::{damping_factor, AltitudeAdaptiveParams};
use crate::utils::math::{constrain, sanitize, sanitize_symmetric};

/// Режим стабилизации
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StabilizerMode {
    Off,
    VelocityDamping,
    PositionHold,
}

/// Снимок состояния регулятора
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerState {
    pub mode: StabilizerMode,
    /// Цель удержания; есть только в режиме PositionHold
    pub target: Option<(f32, f32)>,
    /// Интегралы ошибки по осям (x, y)
    pub integral: (f32, f32),
    /// Предыдущая ошибка по осям (x, y)
    pub previous_error: (f32, f32),
}

/// Очищенные входы одного такта
#[derive(Clone, Copy, Debug)]
struct Inputs {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    altitude_m: f32,
    confidence: f32,
}

pub struct PositionStabilizer {
    config: StabilizerConfig,
    mode: StabilizerMode,
    /// Запрошенный режим, применяется в начале следующего такта
    pending_mode: Option<StabilizerMode>,
    target: Option<(f32, f32)>,
    pid_x: PositionPid,
    pid_y: PositionPid,
    last_position: (f32, f32),
    last_timestamp_us: Option<u64>,
    low_confidence: bool,
    last_correction: AttitudeCorrection,
}

impl PositionStabilizer {
    pub fn new(config: StabilizerConfig) -> Result<Self, ConfigError> {
        if let Err(e) = config.validate() {
            error!("Конфигурация стабилизатора отклонена: {}", e);
            return Err(e);
        }

        Ok(Self {
            pid_x: PositionPid::new(config.gains_x, config.integral_limit, config.max_tilt_deg),
            pid_y: PositionPid::new(config.gains_y, config.integral_limit, config.max_tilt_deg),
            config,
            mode: StabilizerMode::Off,
            pending_mode: None,
            target: None,
            last_position: (0.0, 0.0),
            last_timestamp_us: None,
            low_confidence: false,
            last_correction: AttitudeCorrection::neutral(StabilizerMode::Off),
        })
    }

    /// Запрос смены режима; применяется в начале следующего `update`
    ///
    /// Повторный запрос до такта заменяет предыдущий.
    pub fn request_mode(&mut self, mode: StabilizerMode) {
        self.pending_mode = Some(mode);
    }

    /// Расчет коррекции ориентации за один такт
    pub fn update(
        &mut self,
        estimate: &PositionEstimate,
        params: &AltitudeAdaptiveParams,
    ) -> AttitudeCorrection {
        let inputs = Self::sanitize_inputs(estimate);

        if let Some(requested) = self.pending_mode.take() {
            self.apply_mode(requested, &inputs);
        }

        let dt = self.elapsed_s(estimate.timestamp_us);
        self.last_position = (inputs.x, inputs.y);
        self.track_confidence(inputs.confidence);

        let schedule = self.gain_schedule(inputs.altitude_m, params);

        let (pitch_deg, roll_deg) = match self.mode {
            StabilizerMode::Off => (0.0, 0.0),
            StabilizerMode::VelocityDamping => {
                let k = self.config.velocity_damping * schedule.damping;
                let limit = self.config.max_tilt_deg;
                (
                    constrain(-k * inputs.vy, -limit, limit),
                    constrain(-k * inputs.vx, -limit, limit),
                )
            }
            StabilizerMode::PositionHold => {
                // Цель задается при входе в режим
                let (tx, ty) = self.target.unwrap_or((inputs.x, inputs.y));
                let roll = self.pid_x.update(tx - inputs.x, inputs.vx, dt, schedule);
                let pitch = self.pid_y.update(ty - inputs.y, inputs.vy, dt, schedule);
                (pitch, roll)
            }
        };

        self.last_correction = AttitudeCorrection {
            pitch_deg,
            roll_deg,
            mode: self.mode,
            low_confidence: self.low_confidence,
            gain_scale: schedule.responsiveness,
            damping_factor: schedule.damping,
        };

        self.last_correction
    }

    fn sanitize_inputs(estimate: &PositionEstimate) -> Inputs {
        Inputs {
            x: sanitize_symmetric(estimate.x, MAX_POSITION_M),
            y: sanitize_symmetric(estimate.y, MAX_POSITION_M),
            vx: sanitize_symmetric(estimate.vx, MAX_VELOCITY_MPS),
            vy: sanitize_symmetric(estimate.vy, MAX_VELOCITY_MPS),
            altitude_m: sanitize(estimate.altitude_m, 0.0, MAX_ALTITUDE_M),
            confidence: sanitize(estimate.confidence, 0.0, 1.0),
        }
    }

    fn apply_mode(&mut self, requested: StabilizerMode, inputs: &Inputs) {
        if requested == self.mode {
            return;
        }

        let previous = self.mode;
        self.mode = requested;
        self.pid_x.reset();
        self.pid_y.reset();

        self.target = match requested {
            StabilizerMode::PositionHold => Some((inputs.x, inputs.y)),
            StabilizerMode::Off | StabilizerMode::VelocityDamping => None,
        };

        info!("Режим стабилизации: {} -> {}", mode_name(previous), mode_name(requested));
        if let Some((x, y)) = self.target {
            info!("Удержание позиции ({}, {})", x, y);
        }
    }

    fn elapsed_s(&mut self, timestamp_us: u64) -> f32 {
        let dt = match self.last_timestamp_us {
            None => self.config.nominal_dt_s,
            Some(prev) if timestamp_us > prev => constrain(
                (timestamp_us - prev) as f32 / 1_000_000.0,
                self.config.min_dt_s,
                self.config.max_dt_s,
            ),
            Some(_) => self.config.min_dt_s,
        };
        self.last_timestamp_us = Some(timestamp_us);
        dt
    }

    fn track_confidence(&mut self, confidence: f32) {
        let low = confidence < self.config.confidence_floor;
        if low != self.low_confidence {
            if low {
                warn!("Низкая достоверность позиции: {}", confidence);
            } else {
                info!("Достоверность позиции восстановлена: {}", confidence);
            }
        }
        self.low_confidence = low;
    }

    /// Множители коэффициентов: Kp/Ki снижаются вместе с достоверностью профиля,
    /// Kd растет с высотой
    fn gain_schedule(&self, altitude_m: f32, params: &AltitudeAdaptiveParams) -> GainSchedule {
        if !self.config.altitude_adaptive {
            return GainSchedule::NEUTRAL;
        }

        let responsiveness = if params.confidence_multiplier.is_finite() {
            constrain(params.confidence_multiplier, f32::EPSILON, 1.0)
        } else {
            1.0
        };

        GainSchedule {
            responsiveness,
            damping: damping_factor(altitude_m, self.config.high_altitude_damping_boost),
        }
    }

    /// Позиция в пределах допуска от цели
    pub fn is_position_locked(&self, tolerance_m: f32) -> bool {
        match self.position_error() {
            Some((ex, ey)) => libm::fabsf(ex) < tolerance_m && libm::fabsf(ey) < tolerance_m,
            None => false,
        }
    }

    /// Ошибка позиции (цель минус позиция на последнем такте)
    pub fn position_error(&self) -> Option<(f32, f32)> {
        self.target
            .map(|(tx, ty)| (tx - self.last_position.0, ty - self.last_position.1))
    }

    pub fn mode(&self) -> StabilizerMode {
        self.mode
    }

    pub fn pending_mode(&self) -> Option<StabilizerMode> {
        self.pending_mode
    }

    pub fn target(&self) -> Option<(f32, f32)> {
        self.target
    }

    pub fn state(&self) -> ControllerState {
        ControllerState {
            mode: self.mode,
            target: self.target,
            integral: (self.pid_x.integral(), self.pid_y.integral()),
            previous_error: (self.pid_x.previous_error(), self.pid_y.previous_error()),
        }
    }

    pub fn last_correction(&self) -> AttitudeCorrection {
        self.last_correction
    }

    /// Сброс в режим Off без цели
    pub fn reset(&mut self) {
        self.mode = StabilizerMode::Off;
        self.pending_mode = None;
        self.target = None;
        self.pid_x.reset();
        self.pid_y.reset();
        self.low_confidence = false;
        self.last_correction = AttitudeCorrection::neutral(StabilizerMode::Off);
        info!("Стабилизатор сброшен");
    }
}

fn mode_name(mode: StabilizerMode) -> &'static str {
    match mode {
        StabilizerMode::Off => "off",
        StabilizerMode::VelocityDamping => "velocity_damping",
        StabilizerMode::PositionHold => "position_hold",
    }
}
