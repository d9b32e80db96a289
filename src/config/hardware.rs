//! Конфигурация аппаратного обеспечения (RP2040 / Raspberry Pi Pico)

/// Конфигурация частот и скоростей
pub mod frequencies {
    /// Частота SPI для PMW3901 (Гц), датчик допускает до 2 МГц
    pub const FLOW_SPI_FREQUENCY: u32 = 2_000_000;

    /// Скорость UART эмулятора GPS (бод)
    pub const GPS_BAUDRATE: u32 = 115_200;

    /// Скорость UART дальномера (бод), стандарт TFmini
    pub const RANGEFINDER_BAUDRATE: u32 = 115_200;
}

/// Параметры системы
pub mod system {
    use crate::sensors::altitude::rangefinder::RangefinderProtocol;

    /// Частота быстрого такта: поток + стабилизатор (Гц)
    pub const FLOW_LOOP_RATE_HZ: u64 = 50;

    /// Частота опроса эмулятора GPS (Гц), выдача ограничивается самим эмулятором
    pub const GPS_LOOP_RATE_HZ: u64 = 10;

    /// Частота мигания индикатора (Гц)
    pub const HEARTBEAT_RATE_HZ: u64 = 2;

    /// Количество попыток инициализации датчика потока
    pub const INIT_RETRY_COUNT: u8 = 3;

    /// Протокол подключенного дальномера
    pub const RANGEFINDER_PROTOCOL: RangefinderProtocol = RangefinderProtocol::Benewake;

    /// Ожидание байт дальномера (мс); по истечении отсчет проверяется на таймаут
    pub const RANGEFINDER_READ_TIMEOUT_MS: u64 = 20;

    /// Часов реального времени на плате нет: время UNIX отсчитывается от этой
    /// даты (2024-01-01 00:00:00 UTC) с момента загрузки
    pub const BOOT_UNIX_TIME_US: u64 = 1_704_067_200_000_000;
}
