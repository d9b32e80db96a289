//! Драйвер датчика оптического потока PMW3901 (SPI, режим 3)
use embassy_rp::gpio::Output;
use embassy_rp::spi::{Blocking, Error as SpiError, Instance, Spi};
use embassy_time::{Duration, Timer};

use flowhold::FlowSample;

/// Регистры PMW3901
#[allow(dead_code)]
mod regs {
    pub const PRODUCT_ID: u8 = 0x00;
    pub const MOTION: u8 = 0x02;
    pub const DELTA_X_L: u8 = 0x03;
    pub const DELTA_X_H: u8 = 0x04;
    pub const DELTA_Y_L: u8 = 0x05;
    pub const DELTA_Y_H: u8 = 0x06;
    pub const SQUAL: u8 = 0x07;
    pub const POWER_UP_RESET: u8 = 0x3A;
    pub const SHUTDOWN: u8 = 0x3B;
}

const PRODUCT_ID: u8 = 0x49;

/// Бит "есть движение" в регистре MOTION
const MOTION_READY: u8 = 0x80;

/// Минимальная последовательность настройки из документации
const INIT_SEQUENCE: [(u8, u8); 5] = [(0x7F, 0x00), (0x55, 0x01), (0x50, 0x07), (0x7F, 0x0E), (0x43, 0x10)];

/// Ошибки PMW3901
#[derive(Debug)]
pub enum Pmw3901Error {
    Spi(SpiError),
    InvalidDevice(u8),
}

impl defmt::Format for Pmw3901Error {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Pmw3901Error::Spi(_) => defmt::write!(fmt, "PMW3901: SPI error"),
            Pmw3901Error::InvalidDevice(id) => defmt::write!(fmt, "PMW3901: Invalid product ID 0x{:02x}", id),
        }
    }
}

impl From<SpiError> for Pmw3901Error {
    fn from(error: SpiError) -> Self {
        Pmw3901Error::Spi(error)
    }
}

/// Драйвер PMW3901
pub struct Pmw3901<'d, T: Instance> {
    spi: Spi<'d, T, Blocking>,
    cs: Output<'d>,
}

impl<'d, T: Instance> Pmw3901<'d, T> {
    pub fn new(spi: Spi<'d, T, Blocking>, mut cs: Output<'d>) -> Self {
        cs.set_high();
        Self { spi, cs }
    }

    /// Сброс, настройка и проверка ID; можно повторять
    pub async fn init(&mut self) -> Result<(), Pmw3901Error> {
        self.write_register(regs::POWER_UP_RESET, 0x5A)?;
        Timer::after(Duration::from_millis(5)).await;

        for (reg, value) in INIT_SEQUENCE {
            self.write_register(reg, value)?;
            Timer::after(Duration::from_millis(1)).await;
        }
        Timer::after(Duration::from_millis(10)).await;

        let id = self.read_register(regs::PRODUCT_ID)?;
        if id != PRODUCT_ID {
            defmt::error!("Неверный ID PMW3901: 0x{:02x}", id);
            return Err(Pmw3901Error::InvalidDevice(id));
        }

        defmt::info!("PMW3901 инициализирован успешно");
        Ok(())
    }

    /// Приращения с прошлого чтения и качество поверхности
    ///
    /// Без флага движения приращения нулевые, качество читается всегда.
    pub fn read_sample(&mut self, timestamp_us: u64) -> Result<FlowSample, Pmw3901Error> {
        let motion = self.read_register(regs::MOTION)?;

        let (dx, dy) = if motion & MOTION_READY != 0 {
            let x_l = self.read_register(regs::DELTA_X_L)?;
            let x_h = self.read_register(regs::DELTA_X_H)?;
            let y_l = self.read_register(regs::DELTA_Y_L)?;
            let y_h = self.read_register(regs::DELTA_Y_H)?;
            (i16::from_le_bytes([x_l, x_h]), i16::from_le_bytes([y_l, y_h]))
        } else {
            (0, 0)
        };

        let squal = self.read_register(regs::SQUAL)?;
        Ok(FlowSample::from_raw(dx, dy, squal, timestamp_us))
    }

    /// Режим низкого потребления
    #[allow(dead_code)]
    pub fn shutdown(&mut self) -> Result<(), Pmw3901Error> {
        self.write_register(regs::SHUTDOWN, 0xB6)
    }

    fn read_register(&mut self, reg: u8) -> Result<u8, Pmw3901Error> {
        let mut buf = [reg & 0x7F, 0x00];
        self.cs.set_low();
        let result = self.spi.blocking_transfer_in_place(&mut buf);
        self.cs.set_high();
        result?;
        Ok(buf[1])
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Pmw3901Error> {
        self.cs.set_low();
        let result = self.spi.blocking_write(&[reg | 0x80, value]);
        self.cs.set_high();
        result?;
        Ok(())
    }
}
