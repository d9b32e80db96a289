//! Перевод локальных координат в географические
//!
//! Плоская аппроксимация вокруг точки дома на сфере радиуса WGS-84
//! (6 378 137 м). X - восток, Y - север.

use core::f64::consts::PI;

use crate::config::flight::gps_emulation::EARTH_RADIUS_M;
use crate::gps::types::HomePosition;
use crate::utils::math::normalize_degrees;

/// Нижняя граница cos(широты): у полюсов долгота вырождается
const MIN_COS_LATITUDE: f64 = 1e-6;

/// Географические координаты точки (x, y) метров от дома
///
/// Возвращает (широта, долгота, высота над уровнем моря).
pub fn local_to_geodetic(home: &HomePosition, x_m: f32, y_m: f32, altitude_agl_m: f32) -> (f64, f64, f32) {
    let rad_to_deg = 180.0 / PI;
    let cos_lat = libm::cos(home.latitude * PI / 180.0).max(MIN_COS_LATITUDE);

    let lat_offset = (y_m as f64 / EARTH_RADIUS_M) * rad_to_deg;
    let lon_offset = (x_m as f64 / (EARTH_RADIUS_M * cos_lat)) * rad_to_deg;

    (
        (home.latitude + lat_offset).clamp(-90.0, 90.0),
        wrap_longitude(home.longitude + lon_offset),
        home.altitude_msl_m + altitude_agl_m,
    )
}

/// Приведение долготы к [-180, 180)
fn wrap_longitude(longitude: f64) -> f64 {
    if (-180.0..180.0).contains(&longitude) {
        return longitude;
    }
    let wrapped = libm::fmod(longitude + 180.0, 360.0);
    if wrapped < 0.0 {
        wrapped + 180.0
    } else {
        wrapped - 180.0
    }
}

/// Курс движения в градусах [0, 360), 0 = +Y
pub fn course_deg(vx: f32, vy: f32) -> f32 {
    normalize_degrees(libm::atan2f(vx, vy).to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOME: HomePosition = HomePosition::new(37.7749, -122.4194, 10.0);

    #[test]
    fn test_zero_offset_is_home() {
        let (lat, lon, alt) = local_to_geodetic(&HOME, 0.0, 0.0, 0.0);
        assert_eq!(lat, HOME.latitude);
        assert_eq!(lon, HOME.longitude);
        assert_eq!(alt, 10.0);
    }

    #[test]
    fn test_one_degree_north() {
        let meters = (EARTH_RADIUS_M * PI / 180.0) as f32;
        let (lat, lon, _) = local_to_geodetic(&HOME, 0.0, meters, 0.0);
        // f32 на входе дает погрешность ~1e-8 градуса
        assert!((lat - (HOME.latitude + 1.0)).abs() < 1e-6, "lat = {}", lat);
        assert_eq!(lon, HOME.longitude);
    }

    #[test]
    fn test_east_offset_scaled_by_latitude() {
        let equator = HomePosition::new(0.0, 0.0, 0.0);
        let meters = (EARTH_RADIUS_M * PI / 180.0) as f32;
        let (_, lon_eq, _) = local_to_geodetic(&equator, meters, 0.0, 0.0);
        assert!((lon_eq - 1.0).abs() < 1e-6);

        let sixty = HomePosition::new(60.0, 0.0, 0.0);
        let (_, lon_60, _) = local_to_geodetic(&sixty, meters, 0.0, 0.0);
        assert!((lon_60 - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_pole_is_guarded() {
        let pole = HomePosition::new(90.0, 0.0, 0.0);
        let (lat, lon, _) = local_to_geodetic(&pole, 10.0, 0.0, 0.0);
        assert!(lat.is_finite());
        assert!(lon.is_finite());
    }

    #[test]
    fn test_antimeridian_wraps() {
        let east_edge = HomePosition::new(0.0, 179.9999, 0.0);
        let (_, lon, _) = local_to_geodetic(&east_edge, 1000.0, 0.0, 0.0);
        assert!(lon < -179.99 && lon >= -180.0, "lon = {}", lon);

        let west_edge = HomePosition::new(0.0, -179.9999, 0.0);
        let (_, lon, _) = local_to_geodetic(&west_edge, -1000.0, 0.0, 0.0);
        assert!(lon > 179.99 && lon < 180.0, "lon = {}", lon);
    }

    #[test]
    fn test_latitude_clamped_at_pole() {
        let near_pole = HomePosition::new(89.99, 0.0, 0.0);
        let (lat, _, _) = local_to_geodetic(&near_pole, 0.0, 10_000.0, 0.0);
        assert_eq!(lat, 90.0);
        let (lat, _, _) = local_to_geodetic(&HomePosition::new(-89.99, 0.0, 0.0), 0.0, -10_000.0, 0.0);
        assert_eq!(lat, -90.0);
    }

    #[test]
    fn test_course() {
        assert!(course_deg(0.0, 1.0).abs() < 1e-4);
        assert!((course_deg(1.0, 0.0) - 90.0).abs() < 1e-4);
        assert!((course_deg(0.0, -1.0) - 180.0).abs() < 1e-4);
        assert!((course_deg(-1.0, 0.0) - 270.0).abs() < 1e-4);
    }
}
