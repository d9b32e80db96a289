// src/tasks/flow_task.rs
use embassy_rp::peripherals::SPI0;
use embassy_time::{Duration, Instant, Ticker};

use flowhold::config::hardware::system::FLOW_LOOP_RATE_HZ;
use flowhold::AltitudeSample;

use crate::drivers::flow::Pmw3901;
use crate::state::SYSTEM_STATE;

/// Быстрый такт: поток → высота → профиль → интегратор → стабилизатор
#[embassy_executor::task]
pub async fn task(mut sensor: Pmw3901<'static, SPI0>) {
    defmt::info!("Запуск задачи оптического потока, {} Гц", FLOW_LOOP_RATE_HZ);

    let mut ticker = Ticker::every(Duration::from_hz(FLOW_LOOP_RATE_HZ));
    let mut read_errors: u32 = 0;

    loop {
        ticker.next().await;

        let sample = match sensor.read_sample(Instant::now().as_micros()) {
            Ok(sample) => sample,
            Err(e) => {
                read_errors = read_errors.wrapping_add(1);
                if read_errors % FLOW_LOOP_RATE_HZ as u32 == 1 {
                    defmt::warn!("Ошибка чтения PMW3901: {} (всего {})", e, read_errors);
                }
                continue;
            }
        };

        let altitude = SYSTEM_STATE
            .altitude
            .lock()
            .await
            .unwrap_or(AltitudeSample::invalid());

        let correction = {
            let mut guard = SYSTEM_STATE.pipeline.lock().await;
            let Some(pipeline) = guard.as_mut() else {
                continue;
            };

            // Запрос применяется между тактами
            if let Some(mode) = SYSTEM_STATE.mode_request.try_take() {
                pipeline.request_mode(mode);
            }

            pipeline.control_tick(&sample, &[altitude]).correction
        };

        *SYSTEM_STATE.correction.lock().await = Some(correction);
    }
}
