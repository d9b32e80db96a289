pub mod altitude_task;
pub mod flow_task;
pub mod gps_task;
