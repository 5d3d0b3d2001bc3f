//! Simulated Wealth Trajectory
//!
//! Output of one simulation run: spread, chosen position and wealth per step,
//! aligned with the spread timestamps (the final spread point is consumed by
//! the last forward difference and has no row of its own).

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One row of a trajectory, ready for plotting
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrajectoryPoint {
    pub timestamp: DateTime<Utc>,
    pub spread: f64,
    pub position: f64,
    pub wealth: f64,
}

/// Read-only result of a wealth simulation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    timestamps: Vec<DateTime<Utc>>,
    spread: Vec<f64>,
    positions: Vec<f64>,
    wealth: Vec<f64>,
    initial_wealth: f64,
    floor_hits: usize,
}

impl Trajectory {
    pub(crate) fn with_capacity(capacity: usize, initial_wealth: f64) -> Self {
        Self {
            timestamps: Vec::with_capacity(capacity),
            spread: Vec::with_capacity(capacity),
            positions: Vec::with_capacity(capacity),
            wealth: Vec::with_capacity(capacity),
            initial_wealth,
            floor_hits: 0,
        }
    }

    pub(crate) fn push(&mut self, point: TrajectoryPoint) {
        self.timestamps.push(point.timestamp);
        self.spread.push(point.spread);
        self.positions.push(point.position);
        self.wealth.push(point.wealth);
    }

    pub(crate) fn record_floor_hit(&mut self) {
        self.floor_hits += 1;
    }

    pub fn len(&self) -> usize {
        self.wealth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wealth.is_empty()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn spread(&self) -> &[f64] {
        &self.spread
    }

    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    pub fn wealth(&self) -> &[f64] {
        &self.wealth
    }

    pub fn initial_wealth(&self) -> f64 {
        self.initial_wealth
    }

    /// Wealth after the last step, or the initial wealth for an empty run
    pub fn final_wealth(&self) -> f64 {
        self.wealth.last().copied().unwrap_or(self.initial_wealth)
    }

    /// Number of steps where wealth was clamped to the positive floor
    pub fn floor_hits(&self) -> usize {
        self.floor_hits
    }

    pub fn get(&self, index: usize) -> Option<TrajectoryPoint> {
        Some(TrajectoryPoint {
            timestamp: *self.timestamps.get(index)?,
            spread: *self.spread.get(index)?,
            position: *self.positions.get(index)?,
            wealth: *self.wealth.get(index)?,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = TrajectoryPoint> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Largest peak-to-trough wealth decline as a fraction of the peak
    pub fn max_drawdown(&self) -> f64 {
        let mut peak = self.initial_wealth;
        let mut worst = 0.0_f64;

        for &w in &self.wealth {
            peak = peak.max(w);
            if peak > 0.0 {
                worst = worst.max((peak - w) / peak);
            }
        }

        worst
    }

    /// Final over initial wealth, minus one
    pub fn total_return(&self) -> f64 {
        self.final_wealth() / self.initial_wealth - 1.0
    }
}
