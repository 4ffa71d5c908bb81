use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::frame::Frame;
use crate::roi::{PixelPoint, RectangleBoundary, RectangleCoords, Roi, RoiGeometry, RoiRecord};
use crate::statistics::{reduced_image, roi_statistics_on, RoiStatisticsReport, StatError};

/// What a pointer gesture currently draws.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionKind {
    #[default]
    Rectangle,
    Point,
}

impl fmt::Display for SelectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rectangle => write!(f, "Rectangle"),
            Self::Point => write!(f, "Point"),
        }
    }
}

/// Input event fed to the selector by the host.
///
/// Coordinates are in image pixel space (`x` = column, `y` = row) and may be
/// fractional; they are rounded to the nearest pixel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SelectorEvent {
    Activate,
    Deactivate,
    SetKind { kind: SelectionKind },
    PointerDown { x: f64, y: f64 },
    PointerDrag { x: f64, y: f64 },
    PointerUp { x: f64, y: f64 },
    BeginMultiPoint,
    EndMultiPoint,
    CancelMultiPoint,
    ClearRois,
}

/// Result of handing one event to the selector.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectionOutcome {
    /// The event does not apply in the current state.
    Ignored,
    /// Selector state changed without producing a ROI.
    Updated,
    /// A point was added to the pending multi-point selection.
    Pending { points: usize },
    /// A ROI was completed and appended to the collection.
    Created { label: String },
    /// The gesture finished without producing a ROI.
    Rejected { reason: String },
}

#[derive(Clone, Copy, Debug)]
struct RectangleDrag {
    start: PixelPoint,
    current: PixelPoint,
}

/// Interactive ROI selection state machine.
///
/// Owns the ordered ROI collection of the current image. The host forwards
/// pointer and key events; nothing here knows about a windowing toolkit.
#[derive(Debug, Default)]
pub struct RoiSelector {
    active: bool,
    kind: SelectionKind,
    drag: Option<RectangleDrag>,
    /// `Some` while multi-point accumulation is on.
    pending: Option<Vec<PixelPoint>>,
    rois: Vec<Roi>,
    counter: usize,
    last_status: Option<String>,
}

impl RoiSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn kind(&self) -> SelectionKind {
        self.kind
    }

    pub fn is_accumulating(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_points(&self) -> &[PixelPoint] {
        self.pending.as_deref().unwrap_or(&[])
    }

    pub fn rois(&self) -> &[Roi] {
        &self.rois
    }

    pub fn len(&self) -> usize {
        self.rois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rois.is_empty()
    }

    /// Latest human-readable status message.
    pub fn last_status(&self) -> Option<&str> {
        self.last_status.as_deref()
    }

    pub fn activate(&mut self) -> SelectionOutcome {
        if self.active {
            return SelectionOutcome::Ignored;
        }
        self.active = true;
        debug!("ROI selection active ({})", self.kind);
        SelectionOutcome::Updated
    }

    /// Stop selecting. A pending multi-point selection is completed first.
    pub fn deactivate(&mut self) -> SelectionOutcome {
        if !self.active {
            return SelectionOutcome::Ignored;
        }
        let outcome = self.flush_multi_point();
        self.drag = None;
        self.active = false;
        debug!("ROI selection inactive");
        outcome
    }

    /// Switch the drawing kind. A pending multi-point selection is completed
    /// before the switch, and any rectangle drag in progress is abandoned.
    pub fn set_kind(&mut self, kind: SelectionKind) -> SelectionOutcome {
        let outcome = self.flush_multi_point();
        self.drag = None;
        if self.kind != kind {
            debug!("ROI kind {} -> {}", self.kind, kind);
            self.kind = kind;
        }
        match outcome {
            SelectionOutcome::Ignored => SelectionOutcome::Updated,
            created => created,
        }
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) -> SelectionOutcome {
        let Some(point) = self.accept_point(x, y) else {
            return SelectionOutcome::Ignored;
        };
        match self.kind {
            SelectionKind::Rectangle => {
                self.drag = Some(RectangleDrag {
                    start: point,
                    current: point,
                });
                SelectionOutcome::Updated
            }
            SelectionKind::Point => match self.pending.as_mut() {
                Some(points) => {
                    points.push(point);
                    SelectionOutcome::Pending {
                        points: points.len(),
                    }
                }
                None => self.push_roi(RoiGeometry::Point(point)),
            },
        }
    }

    pub fn pointer_drag(&mut self, x: f64, y: f64) -> SelectionOutcome {
        let Some(point) = self.accept_point(x, y) else {
            return SelectionOutcome::Ignored;
        };
        match self.drag.as_mut() {
            Some(drag) if self.kind == SelectionKind::Rectangle => {
                drag.current = point;
                SelectionOutcome::Updated
            }
            _ => SelectionOutcome::Ignored,
        }
    }

    pub fn pointer_up(&mut self, x: f64, y: f64) -> SelectionOutcome {
        if !self.active || self.kind != SelectionKind::Rectangle {
            return SelectionOutcome::Ignored;
        }
        let Some(drag) = self.drag.take() else {
            return SelectionOutcome::Ignored;
        };
        // A release outside the image keeps the last dragged position.
        let end = round_point(x, y).unwrap_or(drag.current);
        self.complete_rectangle(drag.start, end)
    }

    /// Start accumulating point clicks into one multi-point selection.
    pub fn begin_multi_point(&mut self) -> SelectionOutcome {
        if !self.active || self.kind != SelectionKind::Point || self.pending.is_some() {
            return SelectionOutcome::Ignored;
        }
        self.pending = Some(Vec::new());
        self.set_status("Multi-point selection: click points, release to finish".to_string());
        SelectionOutcome::Updated
    }

    /// Finish the multi-point selection, emitting it if it holds any points.
    pub fn end_multi_point(&mut self) -> SelectionOutcome {
        self.flush_multi_point()
    }

    /// Same as [`RoiSelector::end_multi_point`]: pending points are kept.
    pub fn cancel_multi_point(&mut self) -> SelectionOutcome {
        self.flush_multi_point()
    }

    /// Remove all ROIs and restart label numbering.
    pub fn clear_rois(&mut self) {
        self.rois.clear();
        self.counter = 0;
        self.set_status("Cleared all ROIs".to_string());
    }

    pub fn apply(&mut self, event: &SelectorEvent) -> SelectionOutcome {
        match *event {
            SelectorEvent::Activate => self.activate(),
            SelectorEvent::Deactivate => self.deactivate(),
            SelectorEvent::SetKind { kind } => self.set_kind(kind),
            SelectorEvent::PointerDown { x, y } => self.pointer_down(x, y),
            SelectorEvent::PointerDrag { x, y } => self.pointer_drag(x, y),
            SelectorEvent::PointerUp { x, y } => self.pointer_up(x, y),
            SelectorEvent::BeginMultiPoint => self.begin_multi_point(),
            SelectorEvent::EndMultiPoint => self.end_multi_point(),
            SelectorEvent::CancelMultiPoint => self.cancel_multi_point(),
            SelectorEvent::ClearRois => {
                self.clear_rois();
                SelectionOutcome::Updated
            }
        }
    }

    /// Statistics of every ROI against `image`, in creation order.
    ///
    /// A failure for one ROI is recorded against that ROI only.
    pub fn roi_statistics(&self, image: &Frame) -> RoiStatisticsReport {
        let reduced = reduced_image(image);
        let entries = self
            .rois
            .iter()
            .map(|roi| {
                let stats = match &reduced {
                    Ok(values) => roi_statistics_on(roi, values),
                    Err(e) => Err(StatError::InvalidImage(e.to_string())),
                };
                (roi.label().to_string(), stats)
            })
            .collect();
        RoiStatisticsReport::new(entries)
    }

    pub fn export_rois(&self) -> Vec<RoiRecord> {
        self.rois.iter().map(Roi::record).collect()
    }

    fn accept_point(&self, x: f64, y: f64) -> Option<PixelPoint> {
        if !self.active {
            return None;
        }
        round_point(x, y)
    }

    fn complete_rectangle(&mut self, start: PixelPoint, end: PixelPoint) -> SelectionOutcome {
        // The first and last clicked rows/columns frame the selection.
        let max_x = start.x.max(end.x);
        let max_y = start.y.max(end.y);
        let interior = start
            .x
            .min(end.x)
            .checked_add(1)
            .zip(start.y.min(end.y).checked_add(1));
        let size = interior.and_then(|(min_x, min_y)| {
            max_x.checked_sub(min_x).zip(max_y.checked_sub(min_y))
        });

        let (Some((min_x, min_y)), Some((width, height))) = (interior, size) else {
            let reason = format!(
                "Rectangle from ({}, {}) to ({}, {}) exceeds the pixel coordinate range",
                start.x, start.y, end.x, end.y
            );
            self.set_status(reason.clone());
            return SelectionOutcome::Rejected { reason };
        };

        if width <= 0 || height <= 0 {
            let reason = format!(
                "Rectangle from ({}, {}) to ({}, {}) has no interior pixels",
                start.x, start.y, end.x, end.y
            );
            self.set_status(reason.clone());
            return SelectionOutcome::Rejected { reason };
        }

        self.push_roi(RoiGeometry::Rectangle(RectangleCoords {
            x: min_x,
            y: min_y,
            width,
            height,
            boundary: Some(RectangleBoundary {
                x_min: start.x.min(end.x),
                y_min: start.y.min(end.y),
                x_max: max_x,
                y_max: max_y,
                first_click: start,
                last_click: end,
            }),
        }))
    }

    fn flush_multi_point(&mut self) -> SelectionOutcome {
        match self.pending.take() {
            Some(points) if !points.is_empty() => {
                self.push_roi(RoiGeometry::MultiPoint { points })
            }
            _ => SelectionOutcome::Ignored,
        }
    }

    fn push_roi(&mut self, geometry: RoiGeometry) -> SelectionOutcome {
        let kind = geometry.kind();
        let label = format!("{}_{}", kind, self.counter + 1);
        let Some(roi) = Roi::new(label.clone(), geometry) else {
            let reason = format!("Invalid {kind} selection");
            self.set_status(reason.clone());
            return SelectionOutcome::Rejected { reason };
        };

        self.counter += 1;
        self.set_status(format!("Added {label}"));
        self.rois.push(roi);
        SelectionOutcome::Created { label }
    }

    fn set_status(&mut self, message: String) {
        info!("{}", message);
        self.last_status = Some(message);
    }
}

/// Round to the nearest pixel, ties to even. Non-finite input means the
/// pointer is outside the image.
fn round_point(x: f64, y: f64) -> Option<PixelPoint> {
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    Some(PixelPoint::new(
        x.round_ties_even() as i64,
        y.round_ties_even() as i64,
    ))
}
