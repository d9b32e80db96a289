// gps/types.rs
use crate::error::ConfigError;
use crate::utils::time::UtcTime;

/// Протокол, которым эмулятор общается с полетным контроллером
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GpsProtocol {
    /// $GPGGA + $GPRMC
    Nmea,
    /// MAVLink v2 HIL_GPS
    Mavlink,
}

/// Тип решения GPS (значения совпадают с GPS_FIX_TYPE в MAVLink)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FixType {
    NoFix = 1,
    Fix2D = 2,
    Fix3D = 3,
}

impl FixType {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Начало локальной системы координат
#[derive(Clone, Copy, Debug, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HomePosition {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_msl_m: f32,
}

impl HomePosition {
    pub const fn new(latitude: f64, longitude: f64, altitude_msl_m: f32) -> Self {
        Self {
            latitude,
            longitude,
            altitude_msl_m,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let lat_ok = self.latitude.is_finite() && (-90.0..=90.0).contains(&self.latitude);
        let lon_ok = self.longitude.is_finite() && (-180.0..=180.0).contains(&self.longitude);
        if !lat_ok || !lon_ok || !self.altitude_msl_m.is_finite() {
            return Err(ConfigError::InvalidHome);
        }
        Ok(())
    }
}

/// Эмулированное решение GPS; собирается заново на каждый такт выдачи
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GpsFix {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_msl_m: f32,
    /// Путевая скорость (м/с)
    pub speed_mps: f32,
    /// Курс [0, 360), 0 = +Y ("вперед")
    pub course_deg: f32,
    /// Скорость на север (+Y) и восток (+X), м/с
    pub velocity_north_mps: f32,
    pub velocity_east_mps: f32,
    pub fix_type: FixType,
    pub satellites: u8,
    pub hdop: f32,
    pub vdop: f32,
    /// Время UNIX (мкс), из которого получено `utc`
    pub timestamp_us: u64,
    pub utc: UtcTime,
}
