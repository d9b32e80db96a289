#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::UART1;
use embassy_rp::spi::{self, Phase, Polarity, Spi};
use embassy_rp::uart::{self, Config as UartConfig, UartRx, UartTx};
use embassy_time::{Duration, Ticker, Timer};
use {defmt_rtt as _, panic_probe as _};

mod drivers;
mod state;
mod tasks;

use flowhold::config::hardware::frequencies::{FLOW_SPI_FREQUENCY, GPS_BAUDRATE, RANGEFINDER_BAUDRATE};
use flowhold::config::hardware::system::{HEARTBEAT_RATE_HZ, INIT_RETRY_COUNT};
use flowhold::{Pipeline, PipelineConfig, StabilizerMode};

use crate::drivers::flow::Pmw3901;
use crate::state::SYSTEM_STATE;
use crate::tasks::*;

bind_interrupts!(struct Irqs {
    UART1_IRQ => uart::InterruptHandler<UART1>;
});

/// Точка входа в программу
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    defmt::info!("=== Удержание позиции по оптическому потоку v0.1.0 ===");
    defmt::info!("Инициализация системы...");

    let mut led = Output::new(p.PIN_25, Level::Low);

    // Мигаем светодиодом при старте
    for _ in 0..3 {
        led.set_high();
        Timer::after(Duration::from_millis(100)).await;
        led.set_low();
        Timer::after(Duration::from_millis(100)).await;
    }

    // Конвейер собирается до запуска задач: неверная конфигурация - фатальная ошибка
    let pipeline = match Pipeline::new(PipelineConfig::default()) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            defmt::error!("Ошибка конфигурации конвейера: {}", e);
            panic!("Invalid pipeline configuration");
        }
    };
    *SYSTEM_STATE.pipeline.lock().await = Some(pipeline);

    // SPI0 для PMW3901 (режим 3): SCK GPIO18, MOSI GPIO19, MISO GPIO16, CS GPIO17
    let mut spi_config = spi::Config::default();
    spi_config.frequency = FLOW_SPI_FREQUENCY;
    spi_config.phase = Phase::CaptureOnSecondTransition;
    spi_config.polarity = Polarity::IdleHigh;
    let spi = Spi::new_blocking(p.SPI0, p.PIN_18, p.PIN_19, p.PIN_16, spi_config);
    let cs = Output::new(p.PIN_17, Level::High);

    let mut flow_sensor = Pmw3901::new(spi, cs);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match flow_sensor.init().await {
            Ok(()) => break,
            Err(e) if attempt < INIT_RETRY_COUNT => {
                defmt::warn!("Ошибка инициализации PMW3901: {}, попытка {}", e, attempt);
                Timer::after(Duration::from_millis(100)).await;
            }
            Err(e) => {
                defmt::error!("Ошибка инициализации PMW3901: {}", e);
                panic!("Flow sensor not available");
            }
        }
    }

    // UART1 - дальномер, RX GPIO9
    let rangefinder_uart = {
        let mut config = UartConfig::default();
        config.baudrate = RANGEFINDER_BAUDRATE;
        UartRx::new(p.UART1, p.PIN_9, Irqs, p.DMA_CH0, config)
    };

    // UART0 - выход GPS к полетному контроллеру, TX GPIO0
    let gps_uart = {
        let mut config = UartConfig::default();
        config.baudrate = GPS_BAUDRATE;
        UartTx::new(p.UART0, p.PIN_0, p.DMA_CH1, config)
    };

    defmt::info!("Запуск задач...");
    spawner.spawn(altitude_task::task(rangefinder_uart)).unwrap();
    spawner.spawn(flow_task::task(flow_sensor)).unwrap();
    spawner.spawn(gps_task::task(gps_uart)).unwrap();

    // Без пульта удержание включается сразу от точки включения
    SYSTEM_STATE.mode_request.signal(StabilizerMode::PositionHold);

    defmt::info!("Система инициализирована");

    // Индикация и периодический отчет
    let mut ticker = Ticker::every(Duration::from_hz(HEARTBEAT_RATE_HZ));
    let mut beats: u64 = 0;
    loop {
        ticker.next().await;
        led.toggle();
        beats += 1;

        if beats % (HEARTBEAT_RATE_HZ * 5) == 0 {
            if let Some(correction) = *SYSTEM_STATE.correction.lock().await {
                defmt::info!(
                    "Коррекция: тангаж {} крен {}, низкая достоверность: {}",
                    correction.pitch_deg,
                    correction.roll_deg,
                    correction.low_confidence
                );
            }
        }
    }
}
