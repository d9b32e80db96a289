//! Преобразование времени UNIX в календарную дату и время UTC
//!
//! Часов внутри ядра нет: время приходит от вызывающего кода в микросекундах UNIX.

/// Календарные дата и время UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UtcTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    /// Сотые доли секунды (NMEA выводит время как hhmmss.ss)
    pub centisecond: u8,
}

impl UtcTime {
    /// Разложение времени UNIX (мкс) на дату и время
    pub fn from_unix_micros(unix_us: u64) -> Self {
        let total_seconds = unix_us / 1_000_000;
        let centisecond = ((unix_us % 1_000_000) / 10_000) as u8;

        let days = total_seconds / 86_400;
        let second_of_day = total_seconds % 86_400;
        let (year, month, day) = civil_from_days(days);

        Self {
            year,
            month,
            day,
            hour: (second_of_day / 3600) as u8,
            minute: ((second_of_day % 3600) / 60) as u8,
            second: (second_of_day % 60) as u8,
            centisecond,
        }
    }
}

/// Дни от 1970-01-01 в (год, месяц, день), пролептический григорианский календарь
fn civil_from_days(days: u64) -> (u16, u8, u8) {
    // Отсчет эр от 0000-03-01, чтобы високосный день был последним в году
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
    let year = yoe + era * 400 + u64::from(month <= 2);

    (year as u16, month, day)
}
