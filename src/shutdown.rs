//! Shutdown Module
//!
//! Bounded-time teardown for the long-lived pieces of the system.
//!
//! ## Responsibilities
//! - Define the contract a service must meet to participate in shutdown
//! - Run registered services against one shared time budget, in order
//! - Log every failure and surface the first one to the caller

use std::time::{Duration, Instant};

use crate::error::Result;

// ============================================================
// Shutdown Contract
// ============================================================

/// Implemented by services that can wind down on request.
pub trait Shutdown {
    /// Stop accepting work, finish or abandon what was accepted, release
    /// resources. Must return, success or not, in roughly `timeout`.
    fn shutdown(&self, timeout: Duration) -> Result<()>;
}

// ============================================================
// Coordinator
// ============================================================

/// Shuts a set of services down against one shared deadline.
///
/// Services run in registration order, each given whatever remains of the
/// budget. Register outermost first: the piece that stops new work arriving
/// goes before the pieces that drain it.
pub struct Coordinator<'a> {
    budget: Duration,
    services: Vec<(&'static str, &'a dyn Shutdown)>,
}

impl<'a> Coordinator<'a> {
    pub fn new(budget: Duration) -> Coordinator<'a> {
        Coordinator {
            budget,
            services: Vec::new(),
        }
    }

    /// Add a service to the shutdown order.
    pub fn register(mut self, name: &'static str, service: &'a dyn Shutdown) -> Coordinator<'a> {
        self.services.push((name, service));
        self
    }

    /// Shut everything down.
    ///
    /// A failure in one service never skips the rest: every service gets
    /// its chance (and its share of the remaining budget), every failure is
    /// logged, and the first failure is what the caller sees.
    pub fn run(self) -> Result<()> {
        let deadline = Instant::now() + self.budget;
        let mut first_error = None;

        for (name, service) in self.services {
            let remaining = deadline.saturating_duration_since(Instant::now());
            tracing::info!("shutting down {name} ({remaining:?} left in the budget)");
            match service.shutdown(remaining) {
                Ok(()) => tracing::info!("{name} shut down cleanly"),
                Err(err) => {
                    tracing::error!("{name} failed to shut down: {err}");
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

// ============================================================
// Tests
// ============================================================
