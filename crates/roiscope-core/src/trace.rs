use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::ItemCatalog;
use crate::consts::MAX_EXPRESSION_VARIABLES;
use crate::error::{Result, RoiscopeError};
use crate::expr::{Bindings, Expression, Variable};
use crate::io::ArrayLoader;
use crate::progress::{ProgressReporter, Stage};
use crate::roi::Roi;
use crate::statistics::{reduced_image, roi_statistics_on};

/// Scalar series over frame numbers.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub name: String,
    pub points: BTreeMap<u32, f64>,
}

impl Trace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            points: BTreeMap::new(),
        }
    }

    pub fn from_points(name: impl Into<String>, points: impl IntoIterator<Item = (u32, f64)>) -> Self {
        Self {
            name: name.into(),
            points: points.into_iter().collect(),
        }
    }

    pub fn frames(&self) -> impl Iterator<Item = u32> + '_ {
        self.points.keys().copied()
    }

    pub fn get(&self, frame: u32) -> Option<f64> {
        self.points.get(&frame).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One trace per ROI over `frames`, in ROI order.
///
/// Each frame is loaded once. A frame that fails to load, or a ROI that
/// yields no value on it, is left out of the affected traces.
pub fn build_traces<L: ArrayLoader>(
    catalog: &mut ItemCatalog<L>,
    frames: &[u32],
    rois: &[Roi],
    reporter: &dyn ProgressReporter,
) -> Vec<Trace> {
    let mut traces: Vec<Trace> = rois.iter().map(|roi| Trace::new(roi.label())).collect();
    reporter.begin_stage(Stage::Tracing, frames.len());

    for (done, &frame_number) in frames.iter().enumerate() {
        let reduced = catalog
            .load_item(frame_number, false)
            .and_then(|frame| reduced_image(&frame));
        match reduced {
            Ok(values) => {
                for (roi, trace) in rois.iter().zip(traces.iter_mut()) {
                    match roi_statistics_on(roi, &values) {
                        Ok(stats) => {
                            trace.points.insert(frame_number, stats.value());
                        }
                        Err(e) => debug!(frame = frame_number, roi = roi.label(), "No value: {}", e),
                    }
                }
            }
            Err(e) => warn!(frame = frame_number, "Skipping frame: {}", e),
        }
        reporter.advance(done + 1);
    }
    reporter.finish_stage();

    info!(
        frames = frames.len(),
        rois = rois.len(),
        "Built ROI traces"
    );
    traces
}

/// Mean across `traces` at every frame any of them covers.
///
/// A trace without a value at a frame contributes nothing to that frame.
pub fn average_trace(name: &str, traces: &[&Trace]) -> Result<Trace> {
    let mut sums: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for trace in traces {
        for (&frame, &value) in &trace.points {
            let entry = sums.entry(frame).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }
    if sums.is_empty() {
        warn!("Average trace '{}' has no frames", name);
        return Err(RoiscopeError::EmptySequence);
    }
    Ok(Trace::from_points(
        name,
        sums.into_iter()
            .map(|(frame, (sum, count))| (frame, sum / count as f64)),
    ))
}

/// Evaluate `expression` at every frame common to all bound traces.
///
/// `bindings` pairs a variable name (`A`..`D`) with the trace it stands for.
/// Frames where evaluation fails or gives a non-finite value are dropped.
pub fn derived_trace(name: &str, expression: &str, bindings: &[(&str, &Trace)]) -> Result<Trace> {
    if bindings.len() > MAX_EXPRESSION_VARIABLES {
        return Err(RoiscopeError::InvalidInput(format!(
            "at most {} variables can be bound, got {}",
            MAX_EXPRESSION_VARIABLES,
            bindings.len()
        )));
    }

    let mut bound: BTreeMap<Variable, &Trace> = BTreeMap::new();
    for &(var_name, trace) in bindings {
        let var: Variable = var_name.parse().map_err(|_| {
            RoiscopeError::InvalidInput(format!("'{var_name}' is not a variable name (A-D)"))
        })?;
        if bound.insert(var, trace).is_some() {
            return Err(RoiscopeError::InvalidInput(format!(
                "variable {var} is bound twice"
            )));
        }
    }

    let expr = Expression::parse(expression)?;
    if let Some(missing) = expr.variables().into_iter().find(|v| !bound.contains_key(v)) {
        return Err(RoiscopeError::InvalidInput(format!(
            "variable {missing} is used but not bound"
        )));
    }
    if bound.is_empty() {
        return Err(RoiscopeError::InvalidInput(
            "no traces bound to the expression".to_string(),
        ));
    }

    let common = common_frames(bound.values().copied());
    if common.is_empty() {
        warn!("Derived trace '{}': bound traces share no frames", name);
        return Err(RoiscopeError::EmptySequence);
    }

    let mut result = Trace::new(name);
    let mut values = Bindings::new();
    for frame in common {
        values.clear();
        for (&var, trace) in &bound {
            if let Some(v) = trace.get(frame) {
                values.insert(var, v);
            }
        }
        match expr.eval(&values) {
            Ok(v) if v.is_finite() => {
                result.points.insert(frame, v);
            }
            Ok(v) => debug!(frame, "Dropping non-finite value {}", v),
            Err(e) => debug!(frame, "Dropping frame: {}", e),
        }
    }

    if result.is_empty() {
        warn!("Derived trace '{}' evaluated at no frame", name);
        return Err(RoiscopeError::EmptySequence);
    }
    Ok(result)
}

fn common_frames<'a>(mut traces: impl Iterator<Item = &'a Trace>) -> BTreeSet<u32> {
    let Some(first) = traces.next() else {
        return BTreeSet::new();
    };
    let mut common: BTreeSet<u32> = first.frames().collect();
    for trace in traces {
        common.retain(|frame| trace.points.contains_key(frame));
    }
    common
}
