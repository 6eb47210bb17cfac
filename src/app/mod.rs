//! Application core: sampling logic, zero I/O.
//!
//! [`service::IoService`] ties the point table, the sample filter and the
//! bus scanner into one `tick()`.  All interaction with hardware happens
//! through the **port traits** defined in [`ports`], so the whole core runs
//! against mocks on the host.

pub mod commands;
pub mod ports;
pub mod service;
