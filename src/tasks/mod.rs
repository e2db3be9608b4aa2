//! Background tasks

pub mod acquisition;
