//! Конвейер удержания позиции
//!
//! Владеет по одному экземпляру каждого компонента и задает порядок внутри такта:
//! высота → профиль → интегратор потока → стабилизатор. Эмулятор GPS работает на
//! своем, более медленном такте и берет последнюю готовую оценку.

use crate::config::PipelineConfig;
use crate::control::stabilizer::{PositionStabilizer, StabilizerMode};
use crate::data::{AltitudeEstimate, AltitudeSample, AttitudeCorrection, FlowSample, PositionEstimate};
use crate::error::ConfigError;
use crate::gps::emulator::{GpsEmulator, GpsMessage};
use crate::gps::types::{GpsFix, HomePosition};
use crate::sensors::altitude::{AltitudeFusion, AltitudeSource};
use crate::sensors::flow::FlowIntegrator;
use crate::sensors::profile::{AltitudeAdaptiveParams, AltitudeAdaptiveProfile};

/// Результат быстрого такта
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlOutput {
    pub altitude: AltitudeEstimate,
    pub params: AltitudeAdaptiveParams,
    pub estimate: PositionEstimate,
    pub correction: AttitudeCorrection,
}

/// Результат такта GPS: фикс и готовые к отправке байты
#[derive(Clone, Debug, PartialEq)]
pub struct GpsOutput {
    pub fix: GpsFix,
    pub message: GpsMessage,
}

pub struct Pipeline {
    fusion: AltitudeFusion,
    profile: AltitudeAdaptiveProfile,
    flow: FlowIntegrator,
    stabilizer: PositionStabilizer,
    gps: GpsEmulator,
    altitude: AltitudeEstimate,
}

impl Pipeline {
    /// Сборка конвейера; неверная конфигурация отклоняется целиком
    pub fn new(config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let pipeline = Self {
            fusion: AltitudeFusion::new(config.fusion)?,
            profile: AltitudeAdaptiveProfile::new(config.profile)?,
            flow: FlowIntegrator::new(config.flow)?,
            stabilizer: PositionStabilizer::new(config.stabilizer)?,
            gps: GpsEmulator::new(config.gps)?,
            altitude: AltitudeEstimate {
                altitude_m: config.fusion.initial_altitude_m,
                vertical_velocity_mps: 0.0,
                valid: false,
            },
        };

        info!("Конвейер готов");
        Ok(pipeline)
    }

    /// Быстрый такт с отсчетами высоты, собранными вызывающей стороной
    pub fn control_tick(&mut self, flow: &FlowSample, altitude_samples: &[AltitudeSample]) -> ControlOutput {
        let altitude = self.fusion.fuse(altitude_samples);
        self.run_control(flow, altitude)
    }

    /// Быстрый такт с опросом источников высоты
    pub fn control_tick_polled(
        &mut self,
        flow: &FlowSample,
        sources: &mut [&mut dyn AltitudeSource],
    ) -> ControlOutput {
        let altitude = self.fusion.poll(sources, flow.timestamp_us);
        self.run_control(flow, altitude)
    }

    fn run_control(&mut self, flow: &FlowSample, altitude: AltitudeEstimate) -> ControlOutput {
        self.altitude = altitude;
        // Профиль и интегратор должны видеть одну и ту же высоту
        let height = self.flow.scaling_height(altitude.altitude_m);
        let params = self.profile.params_for(height);
        let estimate = self.flow.update(flow, altitude.altitude_m, &params);
        let correction = self.stabilizer.update(&estimate, &params);

        ControlOutput {
            altitude,
            params,
            estimate,
            correction,
        }
    }

    /// Такт GPS: `Some`, когда подошло время очередной выдачи
    ///
    /// `now_us` - время UNIX в микросекундах.
    pub fn gps_tick(&mut self, now_us: u64) -> Option<GpsOutput> {
        let estimate = self.flow.estimate();
        let fix = self.gps.poll(now_us, &estimate, &self.altitude)?;
        let message = self.gps.encode(&fix);
        Some(GpsOutput { fix, message })
    }

    /// Перенос точки дома вместе со сбросом начала координат интегратора
    pub fn rehome(&mut self, home: HomePosition) -> Result<(), ConfigError> {
        self.gps.set_home(home)?;
        self.flow.reset_origin();
        Ok(())
    }

    /// Запрос режима; применяется на следующем быстром такте
    pub fn request_mode(&mut self, mode: StabilizerMode) {
        self.stabilizer.request_mode(mode);
    }

    pub fn estimate(&self) -> PositionEstimate {
        self.flow.estimate()
    }

    pub fn altitude(&self) -> AltitudeEstimate {
        self.altitude
    }

    pub fn stabilizer(&self) -> &PositionStabilizer {
        &self.stabilizer
    }

    pub fn gps(&self) -> &GpsEmulator {
        &self.gps
    }

    pub fn fusion(&self) -> &AltitudeFusion {
        &self.fusion
    }

    pub fn flow(&self) -> &FlowIntegrator {
        &self.flow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gps::types::GpsProtocol;
    use crate::sensors::altitude::StaticAltitude;

    const T0: u64 = 1_710_506_096_780_000;

    fn pipeline() -> Pipeline {
        let mut config = PipelineConfig::default();
        config.gps.home = HomePosition::new(37.7749, -122.4194, 10.0);
        Pipeline::new(config).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = PipelineConfig::default();
        config.flow.scale_factor = -1.0;
        assert_eq!(Pipeline::new(config).err(), Some(ConfigError::InvalidScaleFactor));
    }

    #[test]
    fn test_altitude_drives_flow_scale() {
        let mut low = pipeline();
        let mut high = pipeline();
        let sample = FlowSample::from_raw(100, 0, 255, T0);

        let at_2m = low.control_tick(&sample, &[AltitudeSample::new(2.0, 0.0)]);
        let at_4m = high.control_tick(&sample, &[AltitudeSample::new(4.0, 0.0)]);

        assert_eq!(at_2m.altitude.altitude_m, 2.0);
        assert_eq!(at_2m.estimate.altitude_m, 2.0);
        // Оба на высоте первого диапазона профиля: смещение пропорционально высоте
        assert_eq!(at_2m.params, at_4m.params);
        assert!((at_4m.estimate.x - 2.0 * at_2m.estimate.x).abs() < 1e-6);
    }

    #[test]
    fn test_profile_uses_clamped_height() {
        let mut at_limit = pipeline();
        let mut far_above = pipeline();
        let sample = FlowSample::from_raw(10, 0, 255, T0);

        let max = PipelineConfig::default().flow.max_height_m;
        let a = at_limit.control_tick(&sample, &[AltitudeSample::new(max, 0.0)]);
        let b = far_above.control_tick(&sample, &[AltitudeSample::new(10_000.0, 0.0)]);

        assert_eq!(b.estimate.altitude_m, max);
        assert_eq!(a.params, b.params);
        assert_eq!(a.estimate.x, b.estimate.x);
        // Сама оценка высоты остается как есть
        assert_eq!(b.altitude.altitude_m, 10_000.0);
    }

    #[test]
    fn test_stale_altitude_keeps_last_value() {
        let mut p = pipeline();
        p.control_tick(&FlowSample::from_raw(0, 0, 200, T0), &[AltitudeSample::new(3.0, 0.0)]);
        let out = p.control_tick(&FlowSample::from_raw(0, 0, 200, T0 + 20_000), &[AltitudeSample::invalid()]);
        assert!(!out.altitude.valid);
        assert_eq!(out.altitude.altitude_m, 3.0);
        assert_eq!(p.fusion().stale_ticks(), 1);
    }

    #[test]
    fn test_mode_applies_on_next_tick() {
        let mut p = pipeline();
        let samples = [AltitudeSample::new(1.0, 0.0)];
        p.control_tick(&FlowSample::from_raw(50, 50, 255, T0), &samples);

        p.request_mode(StabilizerMode::PositionHold);
        assert_eq!(p.stabilizer().mode(), StabilizerMode::Off);

        let out = p.control_tick(&FlowSample::from_raw(0, 0, 255, T0 + 20_000), &samples);
        assert_eq!(out.correction.mode, StabilizerMode::PositionHold);
        let (tx, ty) = p.stabilizer().target().unwrap();
        assert_eq!((tx, ty), (out.estimate.x, out.estimate.y));
    }

    #[test]
    fn test_polled_sources() {
        let mut p = pipeline();
        let mut ground = StaticAltitude::new(6.0, None).unwrap();
        let mut sources: [&mut dyn AltitudeSource; 1] = [&mut ground];
        let out = p.control_tick_polled(&FlowSample::from_raw(0, 0, 255, T0), &mut sources);
        assert!(out.altitude.valid);
        assert_eq!(out.altitude.altitude_m, 6.0);
    }

    #[test]
    fn test_gps_tick_uses_latest_estimate() {
        let mut p = pipeline();
        let samples = [AltitudeSample::new(2.0, 0.0)];

        let first = p.gps_tick(T0).unwrap();
        assert_eq!(first.fix.latitude, 37.7749);
        assert!(first.message.starts_with(b"$GPGGA"));

        // Пять быстрых тактов между выдачами GPS, в очередь ничего не встает
        for i in 0..5u64 {
            p.control_tick(&FlowSample::from_raw(0, 100, 255, T0 + i * 20_000), &samples);
        }
        assert!(p.gps_tick(T0 + 100_000).is_none());

        let second = p.gps_tick(T0 + 200_000).unwrap();
        assert!(second.fix.latitude > 37.7749);
        assert!((second.fix.altitude_msl_m - 12.0).abs() < 1e-4);
        assert_eq!(p.gps().messages_sent(), 2);
    }

    #[test]
    fn test_rehome_resets_origin() {
        let mut p = pipeline();
        let samples = [AltitudeSample::new(2.0, 0.0)];
        for i in 0..10u64 {
            p.control_tick(&FlowSample::from_raw(100, 0, 255, T0 + i * 20_000), &samples);
        }
        assert!(p.estimate().x > 0.0);

        let home = HomePosition::new(51.5, -0.12, 20.0);
        p.rehome(home).unwrap();
        assert_eq!(p.estimate().x, 0.0);
        assert_eq!(p.gps().home(), home);

        let out = p.gps_tick(T0 + 1_000_000).unwrap();
        assert_eq!(out.fix.latitude, 51.5);
        assert_eq!(out.fix.longitude, -0.12);
    }

    #[test]
    fn test_rehome_rejects_invalid_home() {
        let mut p = pipeline();
        let samples = [AltitudeSample::new(2.0, 0.0)];
        p.control_tick(&FlowSample::from_raw(100, 0, 255, T0), &samples);
        let x = p.estimate().x;

        assert_eq!(
            p.rehome(HomePosition::new(0.0, 200.0, 0.0)),
            Err(ConfigError::InvalidHome)
        );
        // Начало координат не трогается, если дом не принят
        assert_eq!(p.estimate().x, x);
    }

    #[test]
    fn test_mavlink_pipeline() {
        let mut config = PipelineConfig::default();
        config.gps.protocol = GpsProtocol::Mavlink;
        let mut p = Pipeline::new(config).unwrap();
        let out = p.gps_tick(T0).unwrap();
        assert_eq!(out.message[0], 0xFD);
    }
}
