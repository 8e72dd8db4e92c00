pub mod batch;
pub mod log_row;
