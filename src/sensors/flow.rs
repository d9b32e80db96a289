//! Интегратор оптического потока
//!
//! Переводит сырые приращения датчика в метры, сглаживает их взвешенным скользящим
//! средним и накапливает позицию в визуальной системе координат датчика.
//! Поправка по рысканию не применяется.

use nalgebra::Vector2;

use crate::config::flight::tracker::MAX_FILTER_WINDOW;
use crate::config::FlowConfig;
use crate::data::{FlowSample, PositionEstimate};
use crate::error::ConfigError;
use crate::sensors::profile::AltitudeAdaptiveParams;
use crate::utils::filters::WeightedWindow;
use crate::utils::math::constrain;

pub struct FlowIntegrator {
    config: FlowConfig,
    /// Буфер последних смещений (метры)
    window: WeightedWindow<MAX_FILTER_WINDOW>,
    /// Накопленная позиция (метры)
    position: Vector2<f32>,
    /// Скорость (м/с)
    velocity: Vector2<f32>,
    /// Время предыдущего отсчета
    last_timestamp_us: Option<u64>,
    /// Последняя выданная оценка
    estimate: PositionEstimate,
}

impl FlowIntegrator {
    pub fn new(config: FlowConfig) -> Result<Self, ConfigError> {
        if let Err(e) = config.validate() {
            error!("Конфигурация потока отклонена: {}", e);
            return Err(e);
        }

        Ok(Self {
            config,
            window: WeightedWindow::new(1),
            position: Vector2::zeros(),
            velocity: Vector2::zeros(),
            last_timestamp_us: None,
            estimate: PositionEstimate::default(),
        })
    }

    /// Обработка одного отсчета датчика
    ///
    /// # Параметры
    /// * `sample` - сырые приращения и качество поверхности
    /// * `altitude_m` - текущая высота над землей из объединения источников
    /// * `params` - параметры профиля для этой высоты
    pub fn update(
        &mut self,
        sample: &FlowSample,
        altitude_m: f32,
        params: &AltitudeAdaptiveParams,
    ) -> PositionEstimate {
        let dt = self.elapsed_s(sample.timestamp_us);

        self.window.resize(params.filter_window);

        // Не-число от датчика считается нулевым движением
        let dx = if sample.dx.is_finite() { sample.dx } else { 0.0 };
        let dy = if sample.dy.is_finite() { sample.dy } else { 0.0 };
        let (dx, dy) = self.config.rotation.apply(dx, dy);

        let height = self.scaling_height(altitude_m);
        let meters_per_unit = height * self.config.scale_factor * params.scale_compensation;
        let displacement = Vector2::new(dx, dy) * meters_per_unit;

        let smoothed = self.window.push(displacement);
        self.position += smoothed;
        self.velocity = smoothed / dt;

        let quality = sample.surface_quality as f32 / 255.0;
        let confidence = constrain(quality * params.confidence_multiplier, 0.0, 1.0);

        #[cfg(feature = "debug-sensors")]
        debug!(
            "Поток: raw=({}, {}) h={} dt={} pos=({}, {})",
            dx, dy, height, dt, self.position.x, self.position.y
        );

        self.estimate = PositionEstimate {
            x: self.position.x,
            y: self.position.y,
            vx: self.velocity.x,
            vy: self.velocity.y,
            altitude_m: height,
            confidence,
            timestamp_us: sample.timestamp_us,
        };

        self.estimate
    }

    /// Высота, по которой масштабируются смещения
    ///
    /// Ограничена `[min_height_m, max_height_m]`; не-число заменяется нижней границей.
    /// По этой же высоте вызывающий код выбирает параметры профиля.
    pub fn scaling_height(&self, altitude_m: f32) -> f32 {
        if altitude_m.is_finite() {
            constrain(altitude_m, self.config.min_height_m, self.config.max_height_m)
        } else {
            self.config.min_height_m
        }
    }

    /// Интервал с предыдущего отсчета с защитой от нуля и скачков времени
    fn elapsed_s(&mut self, timestamp_us: u64) -> f32 {
        let dt = match self.last_timestamp_us {
            None => self.config.nominal_dt_s,
            Some(prev) if timestamp_us > prev => {
                let dt = (timestamp_us - prev) as f32 / 1_000_000.0;
                constrain(dt, self.config.min_dt_s, self.config.max_dt_s)
            }
            // Время не растет - минимальный интервал
            Some(_) => self.config.min_dt_s,
        };
        self.last_timestamp_us = Some(timestamp_us);
        dt
    }

    /// Обнуление начала координат
    ///
    /// Позиция и скорость обнуляются, буфер фильтра очищается. Время последнего
    /// отсчета сохраняется, чтобы следующий интервал был честным.
    pub fn reset_origin(&mut self) {
        self.position = Vector2::zeros();
        self.velocity = Vector2::zeros();
        self.window.clear();
        self.estimate.x = 0.0;
        self.estimate.y = 0.0;
        self.estimate.vx = 0.0;
        self.estimate.vy = 0.0;
        info!("Начало координат потока сброшено");
    }

    /// Последняя оценка
    pub fn estimate(&self) -> PositionEstimate {
        self.estimate
    }

    pub fn position(&self) -> Vector2<f32> {
        self.position
    }

    pub fn velocity(&self) -> Vector2<f32> {
        self.velocity
    }

    /// Текущая длина окна фильтра
    pub fn filter_window(&self) -> usize {
        self.window.window()
    }

    /// Количество отсчетов в буфере фильтра
    pub fn buffered_samples(&self) -> usize {
        self.window.len()
    }
}
