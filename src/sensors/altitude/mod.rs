//! Объединение источников высоты
//!
//! Источники опрашиваются вызывающим кодом (или через [`AltitudeFusion::poll`]),
//! фоновых задач здесь нет. Если валидных отсчетов нет, выдается последнее хорошее
//! значение с `valid = false`.

pub mod rangefinder;
pub mod sources;

use heapless::Vec;

use crate::config::flight::altitude::MAX_SOURCES;
use crate::config::FusionConfig;
use crate::data::{AltitudeEstimate, AltitudeSample};
use crate::error::ConfigError;

pub use rangefinder::{RangefinderAltitude, RangefinderProtocol};
pub use sources::{BarometerAltitude, ExternalAltitude, StaticAltitude};

/// Источник высоты, который можно опросить
pub trait AltitudeSource {
    /// Текущий отсчет источника на момент `now_us`
    fn sample(&mut self, now_us: u64) -> AltitudeSample;

    /// Имя источника для журнала
    fn name(&self) -> &'static str;
}

/// Проверка веса источника при его создании
pub(crate) fn validate_weight(weight: Option<f32>) -> Result<Option<f32>, ConfigError> {
    match weight {
        Some(w) if !w.is_finite() || w < 0.0 => Err(ConfigError::InvalidFusionWeight),
        other => Ok(other),
    }
}

/// Объединение источников высоты взвешенным средним
pub struct AltitudeFusion {
    config: FusionConfig,
    /// Последнее значение, полученное из валидных отсчетов
    last_good: Option<AltitudeEstimate>,
    /// Количество тактов подряд без валидных отсчетов
    stale_ticks: u32,
}

impl AltitudeFusion {
    pub fn new(config: FusionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            last_good: None,
            stale_ticks: 0,
        })
    }

    /// Объединение отсчетов за один такт
    ///
    /// Учитываются только отсчеты с `valid == true`, конечной высотой и
    /// положительным весом. Сумма весов не обязана быть 1: результат делится на нее.
    /// Единственный отсчет передается как есть при любом допустимом весе.
    pub fn fuse(&mut self, samples: &[AltitudeSample]) -> AltitudeEstimate {
        let fused = if let [single] = samples {
            // Один источник - тождественное преобразование, вес не важен
            if single.valid && single.altitude_m.is_finite() {
                Some(AltitudeEstimate {
                    altitude_m: single.altitude_m,
                    vertical_velocity_mps: finite_or_zero(single.vertical_velocity_mps),
                    valid: true,
                })
            } else {
                None
            }
        } else {
            Self::weighted_mean(samples)
        };

        match fused {
            Some(estimate) => {
                if self.stale_ticks > 0 {
                    info!("Высота восстановлена после {} тактов без данных", self.stale_ticks);
                }
                self.stale_ticks = 0;
                self.last_good = Some(estimate);
                estimate
            }
            None => {
                self.stale_ticks = self.stale_ticks.saturating_add(1);
                if self.stale_ticks == 1 {
                    warn!("Нет валидных источников высоты, используется последнее значение");
                }
                self.stale()
            }
        }
    }

    /// Опрос источников и объединение их отсчетов
    ///
    /// Учитываются первые `MAX_SOURCES` источников.
    pub fn poll(&mut self, sources: &mut [&mut dyn AltitudeSource], now_us: u64) -> AltitudeEstimate {
        let mut samples: Vec<AltitudeSample, MAX_SOURCES> = Vec::new();
        for source in sources.iter_mut().take(MAX_SOURCES) {
            let sample = source.sample(now_us);
            #[cfg(feature = "debug-sensors")]
            debug!("Высота {}: {} м, valid={}", source.name(), sample.altitude_m, sample.valid);
            // take() гарантирует место в буфере
            let _ = samples.push(sample);
        }
        self.fuse(&samples)
    }

    fn usable(sample: &AltitudeSample) -> bool {
        let weight = sample.effective_weight();
        sample.valid && sample.altitude_m.is_finite() && weight.is_finite() && weight > 0.0
    }

    fn weighted_mean(samples: &[AltitudeSample]) -> Option<AltitudeEstimate> {
        let mut total_weight = 0.0f32;
        let mut altitude_sum = 0.0f32;
        let mut velocity_sum = 0.0f32;

        for sample in samples.iter().filter(|s| Self::usable(s)) {
            let weight = sample.effective_weight();
            total_weight += weight;
            altitude_sum += sample.altitude_m * weight;
            velocity_sum += finite_or_zero(sample.vertical_velocity_mps) * weight;
        }

        if total_weight > 0.0 && total_weight.is_finite() {
            Some(AltitudeEstimate {
                altitude_m: altitude_sum / total_weight,
                vertical_velocity_mps: velocity_sum / total_weight,
                valid: true,
            })
        } else {
            None
        }
    }

    /// Устаревшее значение: последнее хорошее или начальное
    fn stale(&self) -> AltitudeEstimate {
        match self.last_good {
            Some(last) => AltitudeEstimate { valid: false, ..last },
            None => AltitudeEstimate {
                altitude_m: self.config.initial_altitude_m,
                vertical_velocity_mps: 0.0,
                valid: false,
            },
        }
    }

    /// Последнее значение из валидных отсчетов
    pub fn last_good(&self) -> Option<AltitudeEstimate> {
        self.last_good
    }

    /// Количество тактов подряд без валидных отсчетов
    pub fn stale_ticks(&self) -> u32 {
        self.stale_ticks
    }
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fusion() -> AltitudeFusion {
        AltitudeFusion::new(FusionConfig::default()).unwrap()
    }

    #[test]
    fn test_single_source_is_identity() {
        let mut f = fusion();
        let est = f.fuse(&[AltitudeSample::new(12.34, -0.5).with_weight(0.3)]);
        assert_eq!(est.altitude_m, 12.34);
        assert_eq!(est.vertical_velocity_mps, -0.5);
        assert!(est.valid);
    }

    #[test]
    fn test_single_zero_weight_source_is_identity() {
        let mut f = fusion();
        let est = f.fuse(&[AltitudeSample::new(5.0, 0.1).with_weight(0.0)]);
        assert_eq!(est.altitude_m, 5.0);
        assert_eq!(est.vertical_velocity_mps, 0.1);
        assert!(est.valid);

        let mut ground = StaticAltitude::new(5.0, Some(0.0)).unwrap();
        let mut sources: [&mut dyn AltitudeSource; 1] = [&mut ground];
        let est = fusion().poll(&mut sources, 0);
        assert_eq!(est.altitude_m, 5.0);
        assert!(est.valid);
    }

    #[test]
    fn test_single_invalid_source_is_stale() {
        let mut f = fusion();
        let est = f.fuse(&[AltitudeSample::new(f32::INFINITY, 0.0).with_weight(0.0)]);
        assert!(!est.valid);
        assert_eq!(est.altitude_m, 0.5);
    }

    #[test]
    fn test_weighted_mean_renormalizes() {
        let mut f = fusion();
        let est = f.fuse(&[
            AltitudeSample::new(10.0, 1.0).with_weight(3.0),
            AltitudeSample::new(20.0, 0.0).with_weight(1.0),
        ]);
        assert!((est.altitude_m - 12.5).abs() < 1e-5);
        assert!((est.vertical_velocity_mps - 0.75).abs() < 1e-5);
        assert!(est.valid);
    }

    #[test]
    fn test_default_weight_is_one() {
        let mut f = fusion();
        let est = f.fuse(&[AltitudeSample::new(4.0, 0.0), AltitudeSample::new(8.0, 0.0)]);
        assert!((est.altitude_m - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_samples_ignored() {
        let mut f = fusion();
        let est = f.fuse(&[
            AltitudeSample::new(10.0, 0.0),
            AltitudeSample::invalid(),
            AltitudeSample::new(f32::NAN, 0.0),
            AltitudeSample::new(100.0, 0.0).with_weight(0.0),
        ]);
        assert_eq!(est.altitude_m, 10.0);
        assert!(est.valid);
    }

    #[test]
    fn test_initial_value_before_first_good() {
        let mut f = fusion();
        let est = f.fuse(&[]);
        assert_eq!(est.altitude_m, 0.5);
        assert!(!est.valid);
        assert!(f.last_good().is_none());
    }

    #[test]
    fn test_stale_keeps_last_good() {
        let mut f = fusion();
        f.fuse(&[AltitudeSample::new(7.5, 0.2)]);

        for _ in 0..1000 {
            let est = f.fuse(&[AltitudeSample::invalid(), AltitudeSample::invalid()]);
            assert_eq!(est.altitude_m, 7.5);
            assert_eq!(est.vertical_velocity_mps, 0.2);
            assert!(!est.valid);
        }
        assert_eq!(f.stale_ticks(), 1000);

        let est = f.fuse(&[AltitudeSample::new(8.0, 0.0)]);
        assert!(est.valid);
        assert_eq!(f.stale_ticks(), 0);
    }

    #[test]
    fn test_zero_total_weight_is_stale() {
        let mut f = fusion();
        f.fuse(&[AltitudeSample::new(3.0, 0.0)]);
        let est = f.fuse(&[
            AltitudeSample::new(50.0, 0.0).with_weight(0.0),
            AltitudeSample::new(60.0, 0.0).with_weight(0.0),
        ]);
        assert_eq!(est.altitude_m, 3.0);
        assert!(!est.valid);
    }

    #[test]
    fn test_poll_sources() {
        let mut f = fusion();
        let mut near = StaticAltitude::new(2.0, None).unwrap();
        let mut far = StaticAltitude::new(4.0, Some(3.0)).unwrap();
        let mut sources: [&mut dyn AltitudeSource; 2] = [&mut near, &mut far];
        let est = f.poll(&mut sources, 0);
        assert!((est.altitude_m - 3.5).abs() < 1e-6);
    }

    #[test]
    fn test_negative_weight_rejected() {
        assert_eq!(validate_weight(Some(-1.0)), Err(ConfigError::InvalidFusionWeight));
        assert_eq!(validate_weight(Some(f32::NAN)), Err(ConfigError::InvalidFusionWeight));
        assert_eq!(validate_weight(None), Ok(None));
    }

    proptest! {
        /// Результат лежит между минимальной и максимальной высотой источников
        #[test]
        fn prop_fused_within_bounds(
            a in 0.0f32..200.0f32,
            b in 0.0f32..200.0f32,
            wa in 0.01f32..10.0f32,
            wb in 0.01f32..10.0f32,
        ) {
            let mut f = fusion();
            let est = f.fuse(&[
                AltitudeSample::new(a, 0.0).with_weight(wa),
                AltitudeSample::new(b, 0.0).with_weight(wb),
            ]);
            prop_assert!(est.valid);
            prop_assert!(est.altitude_m >= a.min(b) - 1e-3);
            prop_assert!(est.altitude_m <= a.max(b) + 1e-3);
        }
    }
}
