// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;

/// Restoration runs in this order: order, widths, visibility, sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RestoreStep {
    Order,
    Widths,
    Visibility,
    Sort,
}

impl RestoreStep {
    pub const ALL: [Self; 4] = [Self::Order, Self::Widths, Self::Visibility, Self::Sort];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Order => "column order",
            Self::Widths => "column widths",
            Self::Visibility => "column visibility",
            Self::Sort => "column sort",
        }
    }
}

pub trait RestoreTarget {
    fn restore_step(&mut self, step: RestoreStep) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RestoreReport {
    pub completed: Vec<RestoreStep>,
    pub failed: Vec<(RestoreStep, String)>,
}

impl RestoreReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Holds restore requests until the grid signals it is ready.
#[derive(Debug, Clone, Default)]
pub struct RestoreCoordinator {
    pending: Vec<RestoreStep>,
}

impl RestoreCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self) {
        self.pending = RestoreStep::ALL.to_vec();
    }

    pub fn is_armed(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Runs the armed steps against `target`. `None` when nothing was armed.
    pub fn on_grid_ready<T: RestoreTarget + ?Sized>(
        &mut self,
        target: &mut T,
    ) -> Option<RestoreReport> {
        let steps = std::mem::take(&mut self.pending);
        if steps.is_empty() {
            return None;
        }
        Some(run_restore(&steps, target))
    }
}

/// Applies each step in order. A failure is recorded and the rest still run.
fn run_restore<T: RestoreTarget + ?Sized>(steps: &[RestoreStep], target: &mut T) -> RestoreReport {
    let mut report = RestoreReport::default();
    for step in steps {
        match target.restore_step(*step) {
            Ok(()) => report.completed.push(*step),
            Err(error) => {
                log::warn!("restoring {} failed: {error:#}", step.as_str());
                report.failed.push((*step, format!("{error:#}")));
            }
        }
    }
    report
}
