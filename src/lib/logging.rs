//! Logging utilities for formatted output.
//!
//! This module provides consistent, user-friendly formatting of counts and
//! durations, an operation timer, and the end-of-run summary.

use std::time::{Duration, Instant};

use crate::job::RegionJob;

/// Formats a count with thousands separators.
///
/// # Examples
///
/// ```
/// use chromosplit_lib::logging::format_count;
///
/// assert_eq!(format_count(1234567), "1,234,567");
/// assert_eq!(format_count(123), "123");
/// ```
#[must_use]
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Formats a duration in human-readable form.
///
/// # Examples
///
/// ```
/// use chromosplit_lib::logging::format_duration;
/// use std::time::Duration;
///
/// assert_eq!(format_duration(Duration::from_secs(45)), "45s");
/// assert_eq!(format_duration(Duration::from_secs(135)), "2m 15s");
/// assert_eq!(format_duration(Duration::from_secs(5400)), "1h 30m");
/// ```
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        let mins = secs / 60;
        let remaining_secs = secs % 60;
        if remaining_secs == 0 { format!("{mins}m") } else { format!("{mins}m {remaining_secs}s") }
    } else {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins == 0 { format!("{hours}h") } else { format!("{hours}h {mins}m") }
    }
}

/// Logs a summary of a finished run: how many regions succeeded, which failed
/// and why, and how many were never dispatched.
pub fn log_run_summary(jobs: &[RegionJob], not_dispatched: usize) {
    let succeeded = jobs.iter().filter(|job| job.is_success()).count();
    let failed: Vec<&RegionJob> = jobs.iter().filter(|job| !job.is_success()).collect();

    log::info!("Run Summary:");
    log::info!("  Regions dispatched: {}", format_count(jobs.len() as u64));
    log::info!("  Regions succeeded: {}", format_count(succeeded as u64));
    if !failed.is_empty() {
        log::warn!("  Regions failed: {}", format_count(failed.len() as u64));
        for job in failed {
            if let Some(failure) = job.failure() {
                log::warn!("    {:<24} {} ({})", job.region().name(), failure.stage(), failure);
            }
        }
    }
    if not_dispatched > 0 {
        log::warn!("  Regions not dispatched: {}", format_count(not_dispatched as u64));
    }
}

/// Timer for tracking and logging operation duration.
///
/// # Examples
///
/// ```no_run
/// use chromosplit_lib::logging::OperationTimer;
///
/// let timer = OperationTimer::new("Calling variants");
///
/// // ... do work ...
///
/// timer.log_completion(24, "regions");
/// ```
pub struct OperationTimer {
    operation: String,
    start_time: Instant,
}

impl OperationTimer {
    /// Creates a new operation timer and logs the start.
    #[must_use]
    pub fn new(operation: &str) -> Self {
        log::info!("{operation} ...");
        Self { operation: operation.to_string(), start_time: Instant::now() }
    }

    /// Time elapsed since the timer was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Logs the completion with an item count.
    pub fn log_completion(&self, count: u64, unit: &str) {
        log::info!(
            "{} completed: {} {} in {}",
            self.operation,
            format_count(count),
            unit,
            format_duration(self.elapsed())
        );
    }
}
