#![doc = include_str!("../README.md")]
pub mod bus;
pub mod configuration;
pub mod error;
pub mod logging;
pub mod robot;
pub mod robot_group;
pub mod speed_table;
pub mod topics;
pub mod web;
