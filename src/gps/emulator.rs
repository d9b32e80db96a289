//! Эмулятор GPS
//!
//! Переводит локальную оценку позиции в географические координаты относительно точки
//! дома и сериализует их в NMEA или MAVLink. Выдача идет с собственной частотой
//! (по умолчанию 5 Гц), берется последняя оценка, пропущенные такты не копятся.
//!
//! Время везде - микросекунды UNIX, задаваемые вызывающей стороной. Часов внутри нет.

use heapless::Vec;

use crate::config::flight::stabilization::{MAX_ALTITUDE_M, MAX_POSITION_M, MAX_VELOCITY_MPS};
use crate::config::GpsConfig;
use crate::data::{AltitudeEstimate, PositionEstimate};
use crate::error::ConfigError;
use crate::gps::geodetic::{course_deg, local_to_geodetic};
use crate::gps::mavlink::{HilGps, MavlinkEncoder};
use crate::gps::nmea;
use crate::gps::types::{FixType, GpsFix, GpsProtocol, HomePosition};
use crate::utils::math::{sanitize_symmetric, vector2_length};
use crate::utils::time::UtcTime;

/// Буфер одной выдачи: GGA + RMC или один кадр MAVLink
pub const MAX_MESSAGE_LEN: usize = 2 * nmea::MAX_SENTENCE_LEN;

pub type GpsMessage = Vec<u8, MAX_MESSAGE_LEN>;

/// Раз в сколько выдач писать статистику
const STATS_INTERVAL: u32 = 50;

pub struct GpsEmulator {
    config: GpsConfig,
    home: HomePosition,
    period_us: u64,
    last_emit_us: Option<u64>,
    /// Последний курс; держится, пока скорость ниже порога
    course_deg: f32,
    messages_sent: u32,
    mavlink: MavlinkEncoder,
}

impl GpsEmulator {
    pub fn new(config: GpsConfig) -> Result<Self, ConfigError> {
        if let Err(e) = config.validate() {
            error!("Конфигурация GPS отклонена: {}", e);
            return Err(e);
        }

        let period_us = libm::roundf(1_000_000.0 / config.emission_rate_hz) as u64;

        info!(
            "Эмулятор GPS: {} Гц, дом {} {}",
            config.emission_rate_hz,
            config.home.latitude,
            config.home.longitude
        );

        Ok(Self {
            config,
            home: config.home,
            period_us: period_us.max(1),
            last_emit_us: None,
            course_deg: 0.0,
            messages_sent: 0,
            mavlink: MavlinkEncoder::new(config.system_id, config.component_id),
        })
    }

    /// Новая точка дома. После нее нужно сбросить начало координат интегратора,
    /// иначе фиксы будут смещены на накопленную позицию.
    pub fn set_home(&mut self, home: HomePosition) -> Result<(), ConfigError> {
        if let Err(e) = home.validate() {
            warn!("Точка дома отклонена: {}", e);
            return Err(e);
        }
        self.home = home;
        info!(
            "Новая точка дома: {} {}, высота {} м",
            home.latitude,
            home.longitude,
            home.altitude_msl_m
        );
        Ok(())
    }

    pub fn home(&self) -> HomePosition {
        self.home
    }

    /// Фикс из текущей оценки позиции и объединенной высоты
    pub fn emit(
        &mut self,
        position: &PositionEstimate,
        altitude: &AltitudeEstimate,
        unix_time_us: u64,
    ) -> GpsFix {
        let x = sanitize_symmetric(position.x, MAX_POSITION_M);
        let y = sanitize_symmetric(position.y, MAX_POSITION_M);
        let vx = sanitize_symmetric(position.vx, MAX_VELOCITY_MPS);
        let vy = sanitize_symmetric(position.vy, MAX_VELOCITY_MPS);
        let alt = sanitize_symmetric(altitude.altitude_m, MAX_ALTITUDE_M);

        let (latitude, longitude, altitude_msl_m) = local_to_geodetic(&self.home, x, y, alt);

        let speed = vector2_length(vx, vy);
        if speed > self.config.course_hold_speed_mps {
            self.course_deg = course_deg(vx, vy);
        }

        GpsFix {
            latitude,
            longitude,
            altitude_msl_m,
            speed_mps: speed,
            course_deg: self.course_deg,
            velocity_north_mps: vy,
            velocity_east_mps: vx,
            fix_type: FixType::Fix3D,
            satellites: self.config.satellites,
            hdop: self.config.hdop,
            vdop: self.config.vdop,
            timestamp_us: unix_time_us,
            utc: UtcTime::from_unix_micros(unix_time_us),
        }
    }

    /// Выдача по расписанию: `Some` не чаще одного раза за период
    ///
    /// Если вызов опоздал больше чем на период или время ушло назад, расписание
    /// начинается заново от `now_us`.
    pub fn poll(
        &mut self,
        now_us: u64,
        position: &PositionEstimate,
        altitude: &AltitudeEstimate,
    ) -> Option<GpsFix> {
        if !self.is_due(now_us) {
            return None;
        }
        Some(self.emit(position, altitude, now_us))
    }

    fn is_due(&mut self, now_us: u64) -> bool {
        let next = match self.last_emit_us {
            None => {
                self.last_emit_us = Some(now_us);
                return true;
            }
            // Часы ушли назад: расписание заново от текущего момента
            Some(last) if now_us < last => {
                debug!("Время GPS ушло назад на {} мкс", last - now_us);
                self.last_emit_us = Some(now_us);
                return true;
            }
            Some(last) => last.saturating_add(self.period_us),
        };
        if now_us < next {
            return false;
        }
        let late = now_us - next >= self.period_us;
        self.last_emit_us = Some(if late { now_us } else { next });
        true
    }

    /// Сериализация фикса в выбранный протокол
    ///
    /// Пустой буфер означает, что фикс не поместился в формат (сообщение пропускается).
    pub fn encode(&mut self, fix: &GpsFix) -> GpsMessage {
        let mut out = GpsMessage::new();
        let encoded = match self.config.protocol {
            GpsProtocol::Nmea => Self::encode_nmea(fix, &mut out),
            GpsProtocol::Mavlink => {
                let frame = self.mavlink.encode_hil_gps(&HilGps::from_fix(fix));
                out.extend_from_slice(&frame).is_ok()
            }
        };

        if !encoded {
            error!("Фикс GPS не помещается в формат {}", protocol_name(self.config.protocol));
            out.clear();
            return out;
        }

        self.messages_sent = self.messages_sent.wrapping_add(1);
        if self.messages_sent % STATS_INTERVAL == 0 {
            debug!(
                "GPS: отправлено {} сообщений, {} {}",
                self.messages_sent,
                fix.latitude,
                fix.longitude
            );
        }
        out
    }

    fn encode_nmea(fix: &GpsFix, out: &mut GpsMessage) -> bool {
        let (Some(gga), Some(rmc)) = (nmea::gga(fix), nmea::rmc(fix)) else {
            return false;
        };
        out.extend_from_slice(gga.as_bytes()).is_ok() && out.extend_from_slice(rmc.as_bytes()).is_ok()
    }

    pub fn messages_sent(&self) -> u32 {
        self.messages_sent
    }

    pub fn protocol(&self) -> GpsProtocol {
        self.config.protocol
    }
}

fn protocol_name(protocol: GpsProtocol) -> &'static str {
    match protocol {
        GpsProtocol::Nmea => "NMEA",
        GpsProtocol::Mavlink => "MAVLink",
    }
}
