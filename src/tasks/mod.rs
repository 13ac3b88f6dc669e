//! Background Tasks Module
//!
//! Recurring maintenance that runs alongside a [`CacheEngine`](crate::cache::CacheEngine).
//!
//! # Tasks
//! - Expiry sweep: removes expired entries at a fixed interval
//! - Pressure monitor: emergency eviction when a pressure signal runs high

mod cleanup;
mod pressure;

pub use cleanup::spawn_cleanup_task;
pub use pressure::{spawn_pressure_monitor, CapacityPressure, PressureSignal};
