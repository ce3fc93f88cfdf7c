// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! echoprime-oracle: the EchoPrime pipeline from index to published record.
//!
//! [`Oracle::discover`] runs estimate, search, verification and trace
//! construction for one index; [`Oracle::discover_many`] fans indices out
//! over tokio's blocking pool. [`publish`] and [`publish_all`] hand the
//! resulting traces to a [`Registry`](echoprime_registry::Registry).

pub mod logging;
pub mod pipeline;

pub use logging::init_tracing;
pub use pipeline::{Oracle, publish, publish_all};
