// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// EchoPrime: Core types and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::{EchoPrimeConfig, MAX_BATCH, OracleConfig, RegistryConfig, default_data_dir};
pub use error::{EchoPrimeError, ErrorScope, Result};
pub use types::*;
