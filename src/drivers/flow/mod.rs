pub mod pmw3901;

pub use pmw3901::Pmw3901;
