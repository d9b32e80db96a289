//! Последовательные дальномеры
//!
//! Benewake TFmini: кадр 9 байт `0x59 0x59 DIST_L DIST_H STR_L STR_H TEMP_L TEMP_H CHECKSUM`,
//! контрольная сумма - младший байт суммы первых восьми.
//!
//! LightWare (ASCII): строка с расстоянием в метрах, например `3.27\r\n`.

use heapless::String;

use crate::config::flight::altitude::RANGEFINDER_TIMEOUT_US;
use crate::data::AltitudeSample;
use crate::error::ConfigError;

use super::{validate_weight, AltitudeSource};

const FRAME_HEADER: u8 = 0x59;
pub const FRAME_LEN: usize = 9;

/// Сила сигнала ниже этого значения - измерение ненадежно
const MIN_SIGNAL_STRENGTH: u16 = 100;
/// Сила сигнала 65535 - засветка приемника
const SATURATED_STRENGTH: u16 = u16::MAX;

/// Разобранный кадр дальномера
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TfminiFrame {
    pub distance_cm: u16,
    pub strength: u16,
}

impl TfminiFrame {
    pub fn is_reliable(&self) -> bool {
        self.distance_cm > 0
            && self.strength >= MIN_SIGNAL_STRENGTH
            && self.strength != SATURATED_STRENGTH
    }

    pub fn distance_m(&self) -> f32 {
        self.distance_cm as f32 / 100.0
    }
}

/// Потоковый разборщик кадров: принимает байты по одному
#[derive(Debug, Clone)]
pub struct TfminiParser {
    buffer: [u8; FRAME_LEN],
    len: usize,
    checksum_errors: u32,
}

impl TfminiParser {
    pub const fn new() -> Self {
        Self {
            buffer: [0; FRAME_LEN],
            len: 0,
            checksum_errors: 0,
        }
    }

    /// Добавление байта; возвращает кадр, когда он собран и сумма сошлась
    pub fn push(&mut self, byte: u8) -> Option<TfminiFrame> {
        // Синхронизация по двум байтам заголовка
        if self.len < 2 && byte != FRAME_HEADER {
            self.len = 0;
            return None;
        }

        self.buffer[self.len] = byte;
        self.len += 1;
        if self.len < FRAME_LEN {
            return None;
        }
        self.len = 0;

        let checksum = self.buffer[..FRAME_LEN - 1]
            .iter()
            .fold(0u8, |acc, b| acc.wrapping_add(*b));
        if checksum != self.buffer[FRAME_LEN - 1] {
            self.checksum_errors = self.checksum_errors.wrapping_add(1);
            #[cfg(feature = "debug-sensors")]
            debug!("TFmini: ошибка контрольной суммы ({})", self.checksum_errors);
            return None;
        }

        Some(TfminiFrame {
            distance_cm: u16::from_le_bytes([self.buffer[2], self.buffer[3]]),
            strength: u16::from_le_bytes([self.buffer[4], self.buffer[5]]),
        })
    }

    pub fn checksum_errors(&self) -> u32 {
        self.checksum_errors
    }
}

impl Default for TfminiParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Длина строки LightWare без перевода строки
const LIGHTWARE_LINE_LEN: usize = 16;
/// Предел измерений LightWare (м)
const LIGHTWARE_MAX_DISTANCE_M: f32 = 200.0;

/// Построчный разборщик ASCII вывода LightWare
#[derive(Debug, Clone)]
pub struct LightwareParser {
    line: String<LIGHTWARE_LINE_LEN>,
    /// Строка не поместилась: байты пропускаются до конца строки
    overflow: bool,
    errors: u32,
}

impl LightwareParser {
    pub const fn new() -> Self {
        Self {
            line: String::new(),
            overflow: false,
            errors: 0,
        }
    }

    /// Добавление байта; возвращает расстояние (м), когда строка закончена
    pub fn push(&mut self, byte: u8) -> Option<f32> {
        match byte {
            b'\r' | b'\n' => {
                let result = if self.overflow { None } else { self.parse_line() };
                self.line.clear();
                self.overflow = false;
                result
            }
            _ if self.overflow => None,
            _ => {
                if !byte.is_ascii() || self.line.push(byte as char).is_err() {
                    self.overflow = true;
                    self.errors = self.errors.wrapping_add(1);
                }
                None
            }
        }
    }

    fn parse_line(&mut self) -> Option<f32> {
        let text = self.line.trim();
        // Пустая строка - второй байт пары \r\n
        if text.is_empty() {
            return None;
        }
        match text.parse::<f32>() {
            Ok(distance) if distance.is_finite() && distance > 0.0 && distance <= LIGHTWARE_MAX_DISTANCE_M => {
                Some(distance)
            }
            _ => {
                self.errors = self.errors.wrapping_add(1);
                #[cfg(feature = "debug-sensors")]
                debug!("LightWare: нечитаемая строка ({})", self.errors);
                None
            }
        }
    }

    pub fn errors(&self) -> u32 {
        self.errors
    }
}

impl Default for LightwareParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Протокол последовательного дальномера
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RangefinderProtocol {
    /// Benewake TFmini / TFmini Plus, двоичные кадры
    Benewake,
    /// LightWare, ASCII строки в метрах
    LightWare,
}

#[derive(Debug, Clone)]
enum Decoder {
    Benewake(TfminiParser),
    LightWare(LightwareParser),
}

impl Decoder {
    fn new(protocol: RangefinderProtocol) -> Self {
        match protocol {
            RangefinderProtocol::Benewake => Decoder::Benewake(TfminiParser::new()),
            RangefinderProtocol::LightWare => Decoder::LightWare(LightwareParser::new()),
        }
    }

    /// Надежное расстояние (м), если байт завершил измерение
    fn push(&mut self, byte: u8) -> Option<f32> {
        match self {
            Decoder::Benewake(parser) => parser
                .push(byte)
                .filter(TfminiFrame::is_reliable)
                .map(|frame| frame.distance_m()),
            Decoder::LightWare(parser) => parser.push(byte),
        }
    }

    fn errors(&self) -> u32 {
        match self {
            Decoder::Benewake(parser) => parser.checksum_errors(),
            Decoder::LightWare(parser) => parser.errors(),
        }
    }
}

/// Высота по дальномеру; актуальна в течение 1 с после последнего кадра
pub struct RangefinderAltitude {
    decoder: Decoder,
    weight: Option<f32>,
    last_distance_m: Option<f32>,
    last_time_us: u64,
    vertical_velocity_mps: f32,
    frames: u32,
}

impl RangefinderAltitude {
    /// Дальномер TFmini
    pub fn new(weight: Option<f32>) -> Result<Self, ConfigError> {
        Self::with_protocol(RangefinderProtocol::Benewake, weight)
    }

    pub fn with_protocol(protocol: RangefinderProtocol, weight: Option<f32>) -> Result<Self, ConfigError> {
        Ok(Self {
            decoder: Decoder::new(protocol),
            weight: validate_weight(weight)?,
            last_distance_m: None,
            last_time_us: 0,
            vertical_velocity_mps: 0.0,
            frames: 0,
        })
    }

    /// Прием байтов с UART; возвращает количество принятых надежных измерений
    pub fn feed(&mut self, bytes: &[u8], now_us: u64) -> usize {
        let mut accepted = 0;
        for &byte in bytes {
            if let Some(distance_m) = self.decoder.push(byte) {
                self.record(distance_m, now_us);
                accepted += 1;
            }
        }
        accepted
    }

    fn record(&mut self, distance_m: f32, now_us: u64) {
        if let Some(prev) = self.last_distance_m {
            if now_us > self.last_time_us {
                let dt = (now_us - self.last_time_us) as f32 / 1_000_000.0;
                self.vertical_velocity_mps = (distance_m - prev) / dt;
            }
        }
        self.last_distance_m = Some(distance_m);
        self.last_time_us = now_us;
        self.frames = self.frames.wrapping_add(1);
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// Ошибки разбора: контрольная сумма TFmini или нечитаемые строки LightWare
    pub fn decode_errors(&self) -> u32 {
        self.decoder.errors()
    }
}

impl AltitudeSource for RangefinderAltitude {
    fn sample(&mut self, now_us: u64) -> AltitudeSample {
        match self.last_distance_m {
            Some(distance) if now_us.saturating_sub(self.last_time_us) < RANGEFINDER_TIMEOUT_US => {
                AltitudeSample {
                    altitude_m: distance,
                    vertical_velocity_mps: self.vertical_velocity_mps,
                    valid: true,
                    weight: self.weight,
                }
            }
            _ => AltitudeSample {
                weight: self.weight,
                ..AltitudeSample::invalid()
            },
        }
    }

    fn name(&self) -> &'static str {
        "rangefinder"
    }
}
