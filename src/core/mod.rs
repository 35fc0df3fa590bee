//! Core job scheduling types: field compilation, schedules, settings, jobs.

pub mod field;
pub mod job;
pub mod schedule;
pub mod settings;
