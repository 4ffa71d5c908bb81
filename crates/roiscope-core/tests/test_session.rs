mod common;

use std::collections::BTreeMap;

use roiscope_core::catalog::ItemCatalog;
use roiscope_core::config::{AverageTraceConfig, DerivedTraceConfig, SessionConfig};
use roiscope_core::error::RoiscopeError;
use roiscope_core::progress::NoOpReporter;
use roiscope_core::selector::{SelectionKind, SelectorEvent};
use roiscope_core::session::run_session;

use common::{image, write_npy_item};

fn session_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for n in 1..=3u32 {
        let level = (n * 10) as f64;
        write_npy_item(
            dir.path(),
            &format!("item_{n:03}.npy"),
            &image(8, 8, move |r, _| level + r as f64).into_dyn(),
        );
    }
    dir
}

fn events() -> Vec<SelectorEvent> {
    vec![
        SelectorEvent::Activate,
        SelectorEvent::PointerDown { x: 0.0, y: 0.0 },
        SelectorEvent::PointerUp { x: 3.0, y: 3.0 },
        SelectorEvent::SetKind {
            kind: SelectionKind::Point,
        },
        SelectorEvent::PointerDown { x: 5.0, y: 6.0 },
        SelectorEvent::BeginMultiPoint,
        SelectorEvent::PointerDown { x: 0.0, y: 0.0 },
        SelectorEvent::PointerDown { x: 0.0, y: 2.0 },
    ]
}

#[test]
fn test_default_session_round_trips_through_toml() {
    let config = SessionConfig::default();
    let text = toml::to_string_pretty(&config).unwrap();
    let parsed: SessionConfig = toml::from_str(&text).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_minimal_session_toml() {
    let text = r#"
directory = "/data/run1"

[[roi_events]]
event = "activate"

[[roi_events]]
event = "pointer_down"
x = 1.0
y = 2.0
"#;
    let config: SessionConfig = toml::from_str(text).unwrap();
    assert!(config.items.is_none());
    assert_eq!(config.roi_events.len(), 2);
    assert!(config.averages.is_empty());
    assert!(config.derived.is_empty());
}

#[test]
fn test_run_session() {
    let dir = session_dir();
    let config = SessionConfig {
        directory: dir.path().to_path_buf(),
        items: None,
        roi_events: events(),
        averages: vec![AverageTraceConfig {
            name: "mean".to_string(),
            traces: vec!["Rectangle_1".to_string(), "Point_2".to_string()],
        }],
        derived: vec![
            DerivedTraceConfig {
                name: "diff".to_string(),
                expression: "B - A".to_string(),
                bindings: BTreeMap::from([
                    ("A".to_string(), "Rectangle_1".to_string()),
                    ("B".to_string(), "Point_2".to_string()),
                ]),
            },
            DerivedTraceConfig {
                name: "broken".to_string(),
                expression: "A".to_string(),
                bindings: BTreeMap::from([("A".to_string(), "Nope_9".to_string())]),
            },
        ],
    };

    let mut catalog = ItemCatalog::new();
    let output = run_session(&config, &mut catalog, &NoOpReporter).unwrap();

    assert_eq!(output.items, vec![1, 2, 3]);
    let labels: Vec<&str> = output.rois.iter().map(|r| r.label.as_str()).collect();
    // The open multi-point selection is emitted at the end.
    assert_eq!(labels, vec!["Rectangle_1", "Point_2", "MultiPoint_3"]);

    // Rectangle interior rows 1..3 -> level + 1.5; point row 6 -> level + 6.
    let rect = output.trace("Rectangle_1").unwrap();
    assert_eq!(rect.get(2), Some(21.5));
    let point = output.trace("Point_2").unwrap();
    assert_eq!(point.get(3), Some(36.0));
    let multi = output.trace("MultiPoint_3").unwrap();
    assert_eq!(multi.get(1), Some(11.0));

    assert_eq!(output.trace("mean").unwrap().get(1), Some((11.5 + 16.0) / 2.0));
    let diff = output.trace("diff").unwrap();
    assert_eq!(diff.len(), 3);
    assert_eq!(diff.get(1), Some(4.5));

    assert_eq!(output.skipped.len(), 1);
    assert_eq!(output.skipped[0].name, "broken");
}

#[test]
fn test_run_session_selected_items() {
    let dir = session_dir();
    let config = SessionConfig {
        directory: dir.path().to_path_buf(),
        items: Some(vec![3, 1]),
        roi_events: events(),
        averages: vec![],
        derived: vec![],
    };
    let mut catalog = ItemCatalog::new();
    let output = run_session(&config, &mut catalog, &NoOpReporter).unwrap();
    let rect = output.trace("Rectangle_1").unwrap();
    assert_eq!(rect.frames().collect::<Vec<_>>(), vec![1, 3]);
    assert_eq!(catalog.cached_items(), vec![1, 3]);
}

#[test]
fn test_run_session_without_rois() {
    let dir = session_dir();
    let config = SessionConfig {
        directory: dir.path().to_path_buf(),
        items: None,
        roi_events: vec![SelectorEvent::Activate],
        averages: vec![],
        derived: vec![],
    };
    let mut catalog = ItemCatalog::new();
    assert!(matches!(
        run_session(&config, &mut catalog, &NoOpReporter),
        Err(RoiscopeError::InvalidInput(_))
    ));
}
