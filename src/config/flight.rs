//! Параметры по умолчанию: трекер потока, профиль высоты, PID, эмуляция GPS

use crate::sensors::profile::{AltitudeBand, Interpolation};

/// Параметры интегратора оптического потока
pub mod tracker {
    /// Перевод единиц датчика в метры на 1 м высоты (PMW3901)
    pub const SCALE_FACTOR: f32 = 0.001;

    /// Минимальная высота для масштабирования (метры)
    pub const MIN_HEIGHT_M: f32 = 0.05;

    /// Максимальная высота для масштабирования (метры)
    pub const MAX_HEIGHT_M: f32 = 120.0;

    /// Номинальный шаг при отсутствии предыдущего отсчета (50 Гц)
    pub const NOMINAL_DT_S: f32 = 0.02;

    /// Минимальный интервал между отсчетами (защита от деления на ~0)
    pub const MIN_DT_S: f32 = 0.001;

    /// Максимальный интервал (после паузы датчика)
    pub const MAX_DT_S: f32 = 0.5;

    /// Емкость кольцевого буфера фильтра (максимальное окно)
    pub const MAX_FILTER_WINDOW: usize = 16;
}

/// Адаптивный к высоте профиль фильтрации
pub mod profile {
    use super::*;

    /// Таблица диапазонов высоты.
    /// [0,5) [5,15) [15,30) - ступени, [30,50) - линейная интерполяция, >=50 - экстраполяция
    pub const BANDS: &[AltitudeBand] = &[
        AltitudeBand {
            floor_m: 0.0,
            filter_window: 5,
            scale_compensation: 1.00,
            confidence_multiplier: 1.00,
            interpolation: Interpolation::Step,
        },
        AltitudeBand {
            floor_m: 5.0,
            filter_window: 7,
            scale_compensation: 1.05,
            confidence_multiplier: 0.95,
            interpolation: Interpolation::Step,
        },
        AltitudeBand {
            floor_m: 15.0,
            filter_window: 10,
            scale_compensation: 1.15,
            confidence_multiplier: 0.85,
            interpolation: Interpolation::Step,
        },
        AltitudeBand {
            floor_m: 30.0,
            filter_window: 15,
            scale_compensation: 1.20,
            confidence_multiplier: 0.85,
            interpolation: Interpolation::Linear,
        },
        AltitudeBand {
            floor_m: 50.0,
            filter_window: 15,
            scale_compensation: 1.40,
            confidence_multiplier: 0.50,
            interpolation: Interpolation::Step,
        },
    ];

    /// Прирост компенсации масштаба на метр выше последнего диапазона
    pub const SCALE_PER_METER_ABOVE: f32 = 0.01;

    /// Снижение множителя достоверности на метр выше последнего диапазона
    pub const CONFIDENCE_PER_METER_ABOVE: f32 = 0.01;

    /// Нижняя граница множителя достоверности
    pub const MIN_CONFIDENCE: f32 = 0.2;
}

/// Параметры PID контроллеров
pub mod pid {
    /// PID коэффициенты для удержания позиции (по каждой оси)
    pub mod position {
        pub const KP: f32 = 0.5; // Пропорциональный коэффициент
        pub const KI: f32 = 0.1; // Интегральный коэффициент
        pub const KD: f32 = 0.2; // Дифференциальный коэффициент
        pub const I_LIMIT: f32 = 1.0; // Ограничение интегральной составляющей (м*с)
    }
}

/// Параметры стабилизации
pub mod stabilization {
    /// Максимальный угол наклона (градусы)
    pub const MAX_TILT_ANGLE_DEG: f32 = 15.0;

    /// Базовый коэффициент демпфирования скорости (градусы на м/с)
    pub const VELOCITY_DAMPING: f32 = 0.3;

    /// Дополнительное демпфирование на большой высоте (30м+)
    pub const HIGH_ALTITUDE_DAMPING_BOOST: f32 = 0.5;

    /// Порог достоверности, ниже которого выставляется флаг деградации
    pub const CONFIDENCE_FLOOR: f32 = 0.3;

    /// Допуск удержания позиции (метры)
    pub const POSITION_TOLERANCE_M: f32 = 0.05;

    /// Ограничения входных величин
    pub const MAX_POSITION_M: f32 = 10_000.0;
    pub const MAX_VELOCITY_MPS: f32 = 30.0;
    pub const MAX_ALTITUDE_M: f32 = 500.0;
}

/// Параметры источников высоты
pub mod altitude {
    /// Высота до первого валидного отсчета (метры)
    pub const INITIAL_ALTITUDE_M: f32 = 0.5;

    /// Таймаут дальномера (мкс)
    pub const RANGEFINDER_TIMEOUT_US: u64 = 1_000_000;

    /// Таймаут внешнего источника, например MAVLink (мкс)
    pub const EXTERNAL_TIMEOUT_US: u64 = 2_000_000;

    /// Таймаут барометра (мкс)
    pub const BAROMETER_TIMEOUT_US: u64 = 1_000_000;

    /// Фильтры барометра: частоты среза при опросе 25 Гц
    pub const BARO_SAMPLE_RATE_HZ: f32 = 25.0;
    pub const BARO_ALTITUDE_CUTOFF_HZ: f32 = 1.0;
    pub const BARO_VSPEED_CUTOFF_HZ: f32 = 2.0;

    /// Максимальное число источников высоты
    pub const MAX_SOURCES: usize = 4;

    /// Вес источника по умолчанию
    pub const DEFAULT_WEIGHT: f32 = 1.0;

    /// Давление на уровне моря (Па)
    pub const SEA_LEVEL_PRESSURE_PA: f32 = 101_325.0;
}

/// Параметры эмуляции GPS
pub mod gps_emulation {
    /// Экваториальный радиус WGS-84 (метры)
    pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

    /// Частота выдачи сообщений (Гц)
    pub const EMISSION_RATE_HZ: f32 = 5.0;

    /// Количество спутников в сообщениях
    pub const SATELLITES: u8 = 12;

    /// Горизонтальный и вертикальный DOP
    pub const HDOP: f32 = 1.0;
    pub const VDOP: f32 = 1.0;

    /// Ниже этой скорости курс не обновляется (м/с)
    pub const COURSE_HOLD_SPEED_MPS: f32 = 0.1;

    /// Идентификаторы MAVLink (MAV_COMP_ID_GPS)
    pub const MAVLINK_SYSTEM_ID: u8 = 1;
    pub const MAVLINK_COMPONENT_ID: u8 = 220;
}

/// Преобразование единиц измерения
pub mod conversions {
    /// Метры в секунду в узлы
    pub const MS_TO_KNOTS: f32 = 1.94384;
}
