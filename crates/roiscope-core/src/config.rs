use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::selector::{SelectionKind, SelectorEvent};

/// A recorded ROI session: where the items live, how the ROIs were drawn,
/// and which derived traces to compute from them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub directory: PathBuf,
    /// Frames to trace; all available items when absent.
    #[serde(default)]
    pub items: Option<Vec<u32>>,
    #[serde(default)]
    pub roi_events: Vec<SelectorEvent>,
    #[serde(default)]
    pub averages: Vec<AverageTraceConfig>,
    #[serde(default)]
    pub derived: Vec<DerivedTraceConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AverageTraceConfig {
    pub name: String,
    /// Names of the traces to average.
    pub traces: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DerivedTraceConfig {
    pub name: String,
    pub expression: String,
    /// Variable name (`A`..`D`) to trace name.
    pub bindings: BTreeMap<String, String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            items: None,
            roi_events: vec![
                SelectorEvent::Activate,
                SelectorEvent::PointerDown { x: 10.0, y: 10.0 },
                SelectorEvent::PointerDrag { x: 30.0, y: 25.0 },
                SelectorEvent::PointerUp { x: 40.0, y: 30.0 },
                SelectorEvent::SetKind {
                    kind: SelectionKind::Point,
                },
                SelectorEvent::PointerDown { x: 5.0, y: 5.0 },
            ],
            averages: vec![AverageTraceConfig {
                name: "mean_all".to_string(),
                traces: vec!["Rectangle_1".to_string(), "Point_2".to_string()],
            }],
            derived: vec![DerivedTraceConfig {
                name: "ratio".to_string(),
                expression: "A / B".to_string(),
                bindings: BTreeMap::from([
                    ("A".to_string(), "Rectangle_1".to_string()),
                    ("B".to_string(), "Point_2".to_string()),
                ]),
            }],
        }
    }
}
