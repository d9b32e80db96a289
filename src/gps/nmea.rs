//! Формирование предложений NMEA 0183: $GPGGA и $GPRMC
//!
//! Координаты выводятся в формате градусы-минуты (`ddmm.mmmm` / `dddmm.mmmm`) через
//! целочисленную арифметику, чтобы округление минут не давало `60.0000`.

use core::fmt::Write;

use heapless::String;

use crate::config::flight::conversions::MS_TO_KNOTS;
use crate::gps::types::GpsFix;

/// Максимальная длина предложения NMEA вместе с `$`, `*hh` и CRLF
pub const MAX_SENTENCE_LEN: usize = 82;

pub type Sentence = String<MAX_SENTENCE_LEN>;

/// Десятитысячные доли минуты в одном градусе
const TEN_THOUSANDTHS_PER_DEGREE: u64 = 60 * 10_000;

/// Контрольная сумма: XOR всех байт между `$` и `*`
pub fn checksum(body: &str) -> u8 {
    body.bytes().fold(0u8, |acc, b| acc ^ b)
}

/// Обертка тела предложения: `$<body>*HH\r\n`
fn frame(body: &str) -> Option<Sentence> {
    let mut sentence = Sentence::new();
    write!(sentence, "${}*{:02X}\r\n", body, checksum(body)).ok()?;
    Some(sentence)
}

/// Координата в градусах-минутах
///
/// `degree_digits` - 2 для широты, 3 для долготы.
fn write_coordinate<W: Write>(out: &mut W, value: f64, degree_digits: usize) -> core::fmt::Result {
    let total = libm::round(libm::fabs(value) * TEN_THOUSANDTHS_PER_DEGREE as f64) as u64;
    let degrees = total / TEN_THOUSANDTHS_PER_DEGREE;
    let rem = total % TEN_THOUSANDTHS_PER_DEGREE;
    let minutes = rem / 10_000;
    let fraction = rem % 10_000;
    write!(
        out,
        "{:0width$}{:02}.{:04}",
        degrees,
        minutes,
        fraction,
        width = degree_digits
    )
}

fn write_time<W: Write>(out: &mut W, fix: &GpsFix) -> core::fmt::Result {
    let t = &fix.utc;
    write!(out, "{:02}{:02}{:02}.{:02}", t.hour, t.minute, t.second, t.centisecond)
}

fn write_position<W: Write>(out: &mut W, fix: &GpsFix) -> core::fmt::Result {
    write_coordinate(out, fix.latitude, 2)?;
    out.write_str(if fix.latitude >= 0.0 { ",N," } else { ",S," })?;
    write_coordinate(out, fix.longitude, 3)?;
    out.write_str(if fix.longitude >= 0.0 { ",E" } else { ",W" })
}

/// Тело $GPGGA (без `$`, контрольной суммы и CRLF)
pub fn gga_body(fix: &GpsFix) -> Option<Sentence> {
    let mut body = Sentence::new();
    body.push_str("GPGGA,").ok()?;
    write_time(&mut body, fix).ok()?;
    body.push(',').ok()?;
    write_position(&mut body, fix).ok()?;
    write!(
        body,
        ",{},{:02},{:.1},{:.1},M,0.0,M,,",
        fix.fix_type.as_u8(),
        fix.satellites,
        fix.hdop,
        fix.altitude_msl_m
    )
    .ok()?;
    Some(body)
}

/// Тело $GPRMC (статус A - данные достоверны)
pub fn rmc_body(fix: &GpsFix) -> Option<Sentence> {
    let mut body = Sentence::new();
    body.push_str("GPRMC,").ok()?;
    write_time(&mut body, fix).ok()?;
    body.push_str(",A,").ok()?;
    write_position(&mut body, fix).ok()?;
    let t = &fix.utc;
    write!(
        body,
        ",{:.2},{:.2},{:02}{:02}{:02},,,A",
        fix.speed_mps * MS_TO_KNOTS,
        fix.course_deg,
        t.day,
        t.month,
        t.year % 100
    )
    .ok()?;
    Some(body)
}

/// Полное предложение $GPGGA
pub fn gga(fix: &GpsFix) -> Option<Sentence> {
    frame(&gga_body(fix)?)
}

/// Полное предложение $GPRMC
pub fn rmc(fix: &GpsFix) -> Option<Sentence> {
    frame(&rmc_body(fix)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gps::types::FixType;
    use crate::utils::time::UtcTime;

    fn reference_fix() -> GpsFix {
        GpsFix {
            latitude: 37.7749,
            longitude: -122.4194,
            altitude_msl_m: 10.0,
            speed_mps: 0.0,
            course_deg: 0.0,
            velocity_north_mps: 0.0,
            velocity_east_mps: 0.0,
            fix_type: FixType::Fix3D,
            satellites: 12,
            hdop: 1.0,
            vdop: 1.0,
            timestamp_us: 1_710_506_096_780_000,
            utc: UtcTime::from_unix_micros(1_710_506_096_780_000),
        }
    }

    #[test]
    fn test_checksum() {
        // Значения посчитаны вручную XOR по символам
        assert_eq!(
            checksum("GPGGA,123456.78,3746.4940,N,12225.1640,W,3,12,1.0,10.0,M,0.0,M,,"),
            0x7D
        );
        assert_eq!(
            checksum("GPRMC,123456.78,A,3746.4940,N,12225.1640,W,0.00,0.00,150324,,,A"),
            0x4F
        );
    }

    #[test]
    fn test_gga_reference() {
        let sentence = gga(&reference_fix()).unwrap();
        assert_eq!(
            sentence.as_str(),
            "$GPGGA,123456.78,3746.4940,N,12225.1640,W,3,12,1.0,10.0,M,0.0,M,,*7D\r\n"
        );
    }

    #[test]
    fn test_rmc_reference() {
        let sentence = rmc(&reference_fix()).unwrap();
        assert_eq!(
            sentence.as_str(),
            "$GPRMC,123456.78,A,3746.4940,N,12225.1640,W,0.00,0.00,150324,,,A*4F\r\n"
        );
    }

    #[test]
    fn test_southern_eastern_hemisphere() {
        let mut fix = reference_fix();
        fix.latitude = -33.8666666667;
        fix.longitude = 151.21;
        fix.altitude_msl_m = -5.5;
        fix.satellites = 8;
        fix.hdop = 0.9;
        fix.utc = UtcTime::from_unix_micros(0);
        let body = gga_body(&fix).unwrap();
        assert_eq!(
            body.as_str(),
            "GPGGA,000000.00,3352.0000,S,15112.6000,E,3,08,0.9,-5.5,M,0.0,M,,"
        );
        assert_eq!(checksum(&body), 0x68);
    }

    #[test]
    fn test_minutes_never_round_to_sixty() {
        let mut out: String<16> = String::new();
        write_coordinate(&mut out, 10.999999999, 2).unwrap();
        assert_eq!(out.as_str(), "1100.0000");
    }

    #[test]
    fn test_speed_in_knots() {
        let mut fix = reference_fix();
        fix.speed_mps = 10.0;
        fix.course_deg = 271.5;
        let body = rmc_body(&fix).unwrap();
        assert!(body.contains(",19.44,271.50,"), "{}", body.as_str());
    }

    #[test]
    fn test_sentences_fit_limit() {
        let mut fix = reference_fix();
        fix.latitude = -89.9999;
        fix.longitude = -179.9999;
        fix.altitude_msl_m = -9999.9;
        fix.speed_mps = 999.0;
        fix.course_deg = 359.99;
        assert!(gga(&fix).is_some());
        assert!(rmc(&fix).is_some());
    }
}
