#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core motion control for a motorized desk (hardware-agnostic).
//!
//! All hardware goes through the `desk_traits` interfaces: `Encoder`,
//! `Actuator`, `Transport`, `PositionStore` and `Clock`.
//!
//! ## Architecture
//!
//! - **State**: one `DriverState` record shared by every task (`state` module)
//! - **Estimation**: sample fusion, revolution tracking, stall detection (`estimator`)
//! - **Planning**: dead-band and two-tier speed request (`planner`)
//! - **Control**: ACCEL/DECEL ramp, sole owner of the actuator (`controller`)
//! - **Commands / status**: `dispatcher`, `publisher`
//! - **Runtime**: cooperative multi-rate scheduler (`runtime`) built by `builder`
//!
//! ## Units
//!
//! Positions are cumulative encoder degrees in `i32`; speeds are duty percent
//! in `u8`. Percentages are derived from position against `MotionCfg::max_pos`.

pub mod builder;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod dispatcher;
pub mod error;
pub mod estimator;
pub mod hw_error;
pub mod mocks;
pub mod persist;
pub mod planner;
pub mod publisher;
pub mod runtime;
pub mod state;
pub mod topics;

pub use builder::DeskBuilder;
pub use config::{EstimatorCfg, MotionCfg, StartupCfg, TimingCfg};
pub use controller::SpeedController;
pub use dispatcher::{Dispatch, Dispatcher};
pub use error::{BuildError, DeskError, Result};
pub use estimator::{Estimator, EstimatorReport};
pub use planner::{Planner, PlannerOutcome};
pub use publisher::{StatusPublisher, StatusSnapshot};
pub use runtime::{Desk, Task};
pub use state::DriverState;
pub use topics::Topics;
