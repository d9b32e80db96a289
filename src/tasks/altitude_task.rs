// src/tasks/altitude_task.rs
use embassy_rp::peripherals::UART1;
use embassy_rp::uart::{Async, UartRx};
use embassy_time::{with_timeout, Duration, Instant};

use flowhold::config::hardware::system::{RANGEFINDER_PROTOCOL, RANGEFINDER_READ_TIMEOUT_MS};
use flowhold::sensors::altitude::rangefinder::FRAME_LEN;
use flowhold::sensors::altitude::{AltitudeSource, RangefinderAltitude};

use crate::state::SYSTEM_STATE;

/// Чтение дальномера и публикация последнего отсчета высоты
///
/// Отсчет публикуется и при молчании дальномера: по таймауту он становится невалидным.
#[embassy_executor::task]
pub async fn task(mut uart: UartRx<'static, UART1, Async>) {
    let mut rangefinder = match RangefinderAltitude::with_protocol(RANGEFINDER_PROTOCOL, None) {
        Ok(rangefinder) => rangefinder,
        Err(e) => {
            defmt::error!("Ошибка настройки дальномера: {}", e);
            return;
        }
    };

    defmt::info!("Запуск задачи высоты ({})", RANGEFINDER_PROTOCOL);
    let mut buf = [0u8; FRAME_LEN];
    let mut reported_errors = 0;

    loop {
        let read = with_timeout(
            Duration::from_millis(RANGEFINDER_READ_TIMEOUT_MS),
            uart.read(&mut buf),
        )
        .await;

        match read {
            Ok(Ok(())) => {
                rangefinder.feed(&buf, Instant::now().as_micros());
            }
            Ok(Err(e)) => defmt::warn!("Ошибка UART дальномера: {}", e),
            // Нет данных: отсчет ниже сам уйдет в таймаут
            Err(_) => {}
        }

        if rangefinder.decode_errors() != reported_errors {
            reported_errors = rangefinder.decode_errors();
            defmt::debug!("Дальномер: ошибок разбора {}", reported_errors);
        }

        let sample = rangefinder.sample(Instant::now().as_micros());
        *SYSTEM_STATE.altitude.lock().await = Some(sample);
    }
}
