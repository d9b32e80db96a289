// src/tasks/gps_task.rs
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{Async, UartTx};
use embassy_time::{Duration, Instant, Ticker};

use flowhold::config::hardware::system::{BOOT_UNIX_TIME_US, GPS_LOOP_RATE_HZ};

use crate::state::SYSTEM_STATE;

/// Выдача эмулированного GPS в полетный контроллер
///
/// Задача опрашивает конвейер чаще частоты выдачи, расписание держит сам эмулятор.
#[embassy_executor::task]
pub async fn task(mut uart: UartTx<'static, UART0, Async>) {
    defmt::info!("Запуск задачи эмуляции GPS");

    let mut ticker = Ticker::every(Duration::from_hz(GPS_LOOP_RATE_HZ));

    loop {
        ticker.next().await;

        let now_us = BOOT_UNIX_TIME_US + Instant::now().as_micros();
        let output = {
            let mut guard = SYSTEM_STATE.pipeline.lock().await;
            match guard.as_mut() {
                Some(pipeline) => pipeline.gps_tick(now_us),
                None => None,
            }
        };

        let Some(output) = output else {
            continue;
        };
        if output.message.is_empty() {
            continue;
        }

        // Запись вне мьютекса: быстрый такт не ждет UART
        if let Err(e) = uart.write(&output.message).await {
            defmt::warn!("Ошибка UART GPS: {}", e);
        }
    }
}
