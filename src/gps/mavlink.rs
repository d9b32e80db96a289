//! Кадры MAVLink v2 с сообщением HIL_GPS (#113)
//!
//! Кадр: `0xFD LEN INCOMPAT COMPAT SEQ SYSID COMPID MSGID[3] PAYLOAD CRC[2]`.
//! Поля полезной нагрузки идут по убыванию размера типа, хвостовые нули отбрасываются.

use heapless::Vec;

use crate::gps::types::GpsFix;

pub const STX_V2: u8 = 0xFD;
pub const MSG_ID_HIL_GPS: u32 = 113;
pub const HIL_GPS_CRC_EXTRA: u8 = 124;

const HEADER_LEN: usize = 10;
const CHECKSUM_LEN: usize = 2;
/// Основные поля (36 байт) + расширения id (1) и yaw (2)
const HIL_GPS_PAYLOAD_LEN: usize = 39;

pub const MAX_FRAME_LEN: usize = HEADER_LEN + HIL_GPS_PAYLOAD_LEN + CHECKSUM_LEN;

pub type Frame = Vec<u8, MAX_FRAME_LEN>;

/// CRC-16/MCRF4XX (X.25), начальное значение 0xFFFF
pub fn crc_accumulate(crc: u16, byte: u8) -> u16 {
    let mut tmp = byte ^ (crc & 0xFF) as u8;
    tmp ^= tmp << 4;
    (crc >> 8) ^ ((tmp as u16) << 8) ^ ((tmp as u16) << 3) ^ ((tmp as u16) >> 4)
}

pub fn crc_x25(data: &[u8]) -> u16 {
    data.iter().fold(0xFFFF, |crc, b| crc_accumulate(crc, *b))
}

/// Поля HIL_GPS в единицах протокола
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HilGps {
    pub time_usec: u64,
    /// Градусы * 1e7
    pub lat: i32,
    pub lon: i32,
    /// Миллиметры над уровнем моря
    pub alt: i32,
    /// HDOP * 100
    pub eph: u16,
    /// VDOP * 100
    pub epv: u16,
    /// Путевая скорость, см/с
    pub vel: u16,
    /// Скорость NED, см/с
    pub vn: i16,
    pub ve: i16,
    pub vd: i16,
    /// Курс, сотые доли градуса
    pub cog: u16,
    pub fix_type: u8,
    pub satellites_visible: u8,
}

impl HilGps {
    pub fn from_fix(fix: &GpsFix) -> Self {
        let cdeg = libm::roundf(fix.course_deg * 100.0) as u16;
        Self {
            time_usec: fix.timestamp_us,
            lat: libm::round(fix.latitude * 1e7) as i32,
            lon: libm::round(fix.longitude * 1e7) as i32,
            alt: libm::round(fix.altitude_msl_m as f64 * 1000.0) as i32,
            eph: libm::roundf(fix.hdop * 100.0) as u16,
            epv: libm::roundf(fix.vdop * 100.0) as u16,
            vel: libm::roundf(fix.speed_mps * 100.0) as u16,
            vn: libm::roundf(fix.velocity_north_mps * 100.0) as i16,
            ve: libm::roundf(fix.velocity_east_mps * 100.0) as i16,
            // Вертикальная скорость по потоку не оценивается
            vd: 0,
            // 359.995 округляется до 36000
            cog: if cdeg >= 36_000 { 0 } else { cdeg },
            fix_type: fix.fix_type.as_u8(),
            satellites_visible: fix.satellites,
        }
    }

    /// Полезная нагрузка в порядке передачи (до усечения)
    fn payload(&self) -> [u8; HIL_GPS_PAYLOAD_LEN] {
        let mut out = [0u8; HIL_GPS_PAYLOAD_LEN];
        let mut pos = 0;
        let mut put = |bytes: &[u8]| {
            out[pos..pos + bytes.len()].copy_from_slice(bytes);
            pos += bytes.len();
        };
        put(&self.time_usec.to_le_bytes());
        put(&self.lat.to_le_bytes());
        put(&self.lon.to_le_bytes());
        put(&self.alt.to_le_bytes());
        put(&self.eph.to_le_bytes());
        put(&self.epv.to_le_bytes());
        put(&self.vel.to_le_bytes());
        put(&self.vn.to_le_bytes());
        put(&self.ve.to_le_bytes());
        put(&self.vd.to_le_bytes());
        put(&self.cog.to_le_bytes());
        put(&[self.fix_type, self.satellites_visible]);
        // Расширения: id приемника = 0, yaw = 0 (не задан)
        put(&[0]);
        put(&0u16.to_le_bytes());
        out
    }
}

/// Кодировщик кадров; хранит номер последовательности
#[derive(Debug, Clone)]
pub struct MavlinkEncoder {
    system_id: u8,
    component_id: u8,
    sequence: u8,
}

impl MavlinkEncoder {
    pub const fn new(system_id: u8, component_id: u8) -> Self {
        Self {
            system_id,
            component_id,
            sequence: 0,
        }
    }

    /// Кадр HIL_GPS; номер последовательности растет по модулю 256
    pub fn encode_hil_gps(&mut self, msg: &HilGps) -> Frame {
        let payload = msg.payload();
        // В v2 хвостовые нули не передаются, но минимум один байт остается
        let len = payload
            .iter()
            .rposition(|b| *b != 0)
            .map(|i| i + 1)
            .unwrap_or(1);

        let id = MSG_ID_HIL_GPS.to_le_bytes();
        let header = [
            STX_V2,
            len as u8,
            0, // incompat_flags
            0, // compat_flags
            self.sequence,
            self.system_id,
            self.component_id,
            id[0],
            id[1],
            id[2],
        ];
        self.sequence = self.sequence.wrapping_add(1);

        let mut crc = crc_x25(&header[1..]);
        for b in &payload[..len] {
            crc = crc_accumulate(crc, *b);
        }
        crc = crc_accumulate(crc, HIL_GPS_CRC_EXTRA);

        // Размеры вычислены из констант, кадр всегда помещается
        let mut frame = Frame::new();
        let _ = frame.extend_from_slice(&header);
        let _ = frame.extend_from_slice(&payload[..len]);
        let _ = frame.extend_from_slice(&crc.to_le_bytes());
        frame
    }

    pub fn sequence(&self) -> u8 {
        self.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> HilGps {
        HilGps {
            time_usec: 1_710_506_096_780_000,
            lat: 377_749_000,
            lon: -1_224_194_000,
            alt: 10_000,
            eph: 100,
            epv: 100,
            vel: 0,
            vn: 0,
            ve: 0,
            vd: 0,
            cog: 0,
            fix_type: 3,
            satellites_visible: 12,
        }
    }

    #[test]
    fn test_crc_check_value() {
        assert_eq!(crc_x25(b"123456789"), 0x6F91);
    }

    #[test]
    fn test_reference_frame() {
        let mut encoder = MavlinkEncoder::new(1, 220);
        let frame = encoder.encode_hil_gps(&reference());
        let expected: [u8; 48] = [
            0xFD, 0x24, 0x00, 0x00, 0x00, 0x01, 0xDC, 0x71, 0x00, 0x00, // заголовок
            0xE0, 0xE2, 0x48, 0x3C, 0xB2, 0x13, 0x06, 0x00, // time_usec
            0x08, 0xFE, 0x83, 0x16, // lat
            0x30, 0x48, 0x08, 0xB7, // lon
            0x10, 0x27, 0x00, 0x00, // alt
            0x64, 0x00, 0x64, 0x00, // eph, epv
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // vel, vn, ve, vd, cog
            0x03, 0x0C, // fix_type, satellites
            0x0B, 0x60, // crc
        ];
        assert_eq!(frame.as_slice(), &expected[..]);
    }

    #[test]
    fn test_sequence_wraps() {
        let mut encoder = MavlinkEncoder::new(1, 220);
        for _ in 0..255 {
            encoder.encode_hil_gps(&reference());
        }
        assert_eq!(encoder.sequence(), 255);
        let frame = encoder.encode_hil_gps(&reference());
        assert_eq!(frame[4], 255);
        assert_eq!(encoder.sequence(), 0);
    }

    #[test]
    fn test_trailing_zero_truncation_keeps_one_byte() {
        let empty = HilGps {
            time_usec: 0,
            lat: 0,
            lon: 0,
            alt: 0,
            eph: 0,
            epv: 0,
            vel: 0,
            vn: 0,
            ve: 0,
            vd: 0,
            cog: 0,
            fix_type: 0,
            satellites_visible: 0,
        };
        let frame = MavlinkEncoder::new(1, 220).encode_hil_gps(&empty);
        assert_eq!(frame[1], 1);
        assert_eq!(frame.len(), HEADER_LEN + 1 + CHECKSUM_LEN);
    }

    #[test]
    fn test_negative_velocity_encoding() {
        let mut msg = reference();
        msg.vn = -150;
        msg.ve = 250;
        let frame = MavlinkEncoder::new(1, 220).encode_hil_gps(&msg);
        // vn: заголовок 10 + time 8 + lat/lon/alt 12 + eph/epv/vel 6
        assert_eq!(&frame[36..38], &(-150i16).to_le_bytes());
        assert_eq!(&frame[38..40], &250i16.to_le_bytes());
    }
}
