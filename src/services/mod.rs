pub mod availability;
pub mod booking;
pub mod storage;
pub mod timeutil;
