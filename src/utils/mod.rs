//! Вспомогательные функции: математика, фильтры, время

pub mod filters;
pub mod math;
pub mod time;
