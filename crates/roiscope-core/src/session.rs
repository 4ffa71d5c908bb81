use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::ItemCatalog;
use crate::config::{AverageTraceConfig, DerivedTraceConfig, SessionConfig};
use crate::error::{Result, RoiscopeError};
use crate::io::ArrayLoader;
use crate::progress::ProgressReporter;
use crate::roi::RoiRecord;
use crate::selector::RoiSelector;
use crate::trace::{average_trace, build_traces, derived_trace, Trace};

/// A trace that could not be produced.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SkippedTrace {
    pub name: String,
    pub reason: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SessionOutput {
    pub items: Vec<u32>,
    pub rois: Vec<RoiRecord>,
    pub traces: Vec<Trace>,
    pub averages: Vec<Trace>,
    pub derived: Vec<Trace>,
    pub skipped: Vec<SkippedTrace>,
}

impl SessionOutput {
    /// Look up any produced trace by name.
    pub fn trace(&self, name: &str) -> Option<&Trace> {
        self.traces
            .iter()
            .chain(&self.averages)
            .chain(&self.derived)
            .find(|t| t.name == name)
    }
}

/// Replay a recorded session against `catalog`.
///
/// Scans the session directory, replays the selector events, then builds
/// one trace per ROI plus the configured average and derived traces. A
/// derived trace that cannot be produced is reported in `skipped`.
pub fn run_session<L: ArrayLoader>(
    config: &SessionConfig,
    catalog: &mut ItemCatalog<L>,
    reporter: &dyn ProgressReporter,
) -> Result<SessionOutput> {
    catalog.set_directory(&config.directory)?;
    let items = match &config.items {
        Some(items) => items.clone(),
        None => catalog.available_items(),
    };

    let mut selector = RoiSelector::new();
    for event in &config.roi_events {
        selector.apply(event);
    }
    // A multi-point selection left open at the end of the recording still counts.
    selector.end_multi_point();

    if selector.is_empty() {
        return Err(RoiscopeError::InvalidInput(
            "session defines no ROIs".to_string(),
        ));
    }
    info!(
        items = items.len(),
        rois = selector.len(),
        "Running ROI session"
    );

    let traces = build_traces(catalog, &items, selector.rois(), reporter);
    let mut output = SessionOutput {
        items,
        rois: selector.export_rois(),
        traces,
        ..Default::default()
    };

    for avg in &config.averages {
        match compute_average(avg, &output) {
            Ok(trace) => output.averages.push(trace),
            Err(e) => output.skip(&avg.name, e),
        }
    }
    for derived in &config.derived {
        match compute_derived(derived, &output) {
            Ok(trace) => output.derived.push(trace),
            Err(e) => output.skip(&derived.name, e),
        }
    }
    Ok(output)
}

impl SessionOutput {
    fn skip(&mut self, name: &str, error: RoiscopeError) {
        warn!("Trace '{}' skipped: {}", name, error);
        self.skipped.push(SkippedTrace {
            name: name.to_string(),
            reason: error.to_string(),
        });
    }

    fn named(&self, name: &str) -> Result<&Trace> {
        self.trace(name)
            .ok_or_else(|| RoiscopeError::InvalidInput(format!("no trace named '{name}'")))
    }
}

fn compute_average(config: &AverageTraceConfig, output: &SessionOutput) -> Result<Trace> {
    let traces = config
        .traces
        .iter()
        .map(|name| output.named(name))
        .collect::<Result<Vec<_>>>()?;
    average_trace(&config.name, &traces)
}

fn compute_derived(config: &DerivedTraceConfig, output: &SessionOutput) -> Result<Trace> {
    let bindings = config
        .bindings
        .iter()
        .map(|(var, trace)| Ok((var.as_str(), output.named(trace)?)))
        .collect::<Result<Vec<_>>>()?;
    derived_trace(&config.name, &config.expression, &bindings)
}
