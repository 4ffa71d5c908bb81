use roiscope_core::roi::{
    Bounds, PixelPoint, RectangleCoords, Roi, RoiColor, RoiGeometry, RoiKind,
};

fn rect(x: i64, y: i64, width: i64, height: i64) -> RoiGeometry {
    RoiGeometry::Rectangle(RectangleCoords {
        x,
        y,
        width,
        height,
        boundary: None,
    })
}

#[test]
fn test_rectangle_mask_covers_box() {
    let roi = Roi::new("Rectangle_1", rect(1, 2, 3, 2)).unwrap();
    let mask = roi.mask((6, 6));
    assert_eq!(mask.iter().filter(|&&m| m).count(), 6);
    for row in 0..6 {
        for col in 0..6 {
            let inside = (2..4).contains(&row) && (1..4).contains(&col);
            assert_eq!(mask[[row, col]], inside, "pixel ({row}, {col})");
        }
    }
}

#[test]
fn test_mask_is_idempotent() {
    let roi = Roi::new("Rectangle_1", rect(0, 0, 4, 4)).unwrap();
    assert_eq!(roi.mask((8, 8)), roi.mask((8, 8)));
    // The same ROI applies to any image size.
    assert_eq!(roi.mask((2, 2)).iter().filter(|&&m| m).count(), 4);
}

#[test]
fn test_rectangle_mask_clamps_to_image() {
    let roi = Roi::new("Rectangle_1", rect(3, 3, 10, 10)).unwrap();
    let mask = roi.mask((5, 5));
    assert_eq!(mask.iter().filter(|&&m| m).count(), 4);
    assert!(mask[[4, 4]]);
    assert!(!mask[[2, 2]]);
}

#[test]
fn test_rectangle_entirely_outside_image() {
    // Start clamps onto the last row/column, end clamps to the edge.
    let roi = Roi::new("Rectangle_1", rect(20, 20, 5, 5)).unwrap();
    let mask = roi.mask((5, 5));
    assert_eq!(mask.iter().filter(|&&m| m).count(), 1);
    assert!(mask[[4, 4]]);

    // A box ending left of the image is empty.
    let left = Roi::new("Rectangle_2", rect(-10, 0, 5, 5)).unwrap();
    assert!(left.mask((5, 5)).iter().all(|&m| !m));
}

#[test]
fn test_point_mask_and_out_of_bounds() {
    let roi = Roi::new("Point_1", RoiGeometry::Point(PixelPoint::new(2, 1))).unwrap();
    let mask = roi.mask((3, 3));
    assert!(mask[[1, 2]]);
    assert_eq!(mask.iter().filter(|&&m| m).count(), 1);

    let outside = Roi::new("Point_2", RoiGeometry::Point(PixelPoint::new(-1, 1))).unwrap();
    assert!(outside.mask((3, 3)).iter().all(|&m| !m));
}

#[test]
fn test_multi_point_mask_skips_outside_points() {
    let points = vec![
        PixelPoint::new(0, 0),
        PixelPoint::new(2, 2),
        PixelPoint::new(9, 9),
        PixelPoint::new(0, 0),
    ];
    let roi = Roi::new("MultiPoint_1", RoiGeometry::MultiPoint { points }).unwrap();
    let mask = roi.mask((3, 3));
    assert_eq!(mask.iter().filter(|&&m| m).count(), 2);
    assert_eq!(roi.pixel_coordinates().len(), 4);
}

#[test]
fn test_invalid_geometry_rejected() {
    assert!(Roi::new("r", rect(0, 0, 0, 3)).is_none());
    assert!(Roi::new("r", rect(0, 0, 3, -1)).is_none());
    assert!(Roi::new("m", RoiGeometry::MultiPoint { points: vec![] }).is_none());
}

#[test]
fn test_bounds() {
    let roi = Roi::new("Rectangle_1", rect(2, 3, 4, 5)).unwrap();
    assert_eq!(
        roi.bounds(),
        Bounds {
            x_min: 2,
            y_min: 3,
            x_max: 6,
            y_max: 8
        }
    );

    let multi = Roi::new(
        "MultiPoint_1",
        RoiGeometry::MultiPoint {
            points: vec![PixelPoint::new(5, 1), PixelPoint::new(2, 4)],
        },
    )
    .unwrap();
    assert_eq!(
        multi.bounds(),
        Bounds {
            x_min: 2,
            y_min: 1,
            x_max: 6,
            y_max: 5
        }
    );
}

#[test]
fn test_pixel_coordinates_row_major() {
    let roi = Roi::new("Rectangle_1", rect(1, 1, 2, 2)).unwrap();
    assert_eq!(
        roi.pixel_coordinates(),
        vec![
            PixelPoint::new(1, 1),
            PixelPoint::new(2, 1),
            PixelPoint::new(1, 2),
            PixelPoint::new(2, 2),
        ]
    );
}

#[test]
fn test_pixel_count_hint() {
    let roi = Roi::new("Rectangle_1", rect(50, 50, 3, 4)).unwrap();
    assert_eq!(roi.pixel_count_hint(), 12);
    assert_eq!(roi.pixel_coordinates().len(), 12);

    let point = Roi::new("Point_2", RoiGeometry::Point(PixelPoint::new(0, 0))).unwrap();
    assert_eq!(point.pixel_count_hint(), 1);

    let multi = Roi::new(
        "MultiPoint_3",
        RoiGeometry::MultiPoint {
            points: vec![PixelPoint::new(0, 0), PixelPoint::new(9, 9)],
        },
    )
    .unwrap();
    assert_eq!(multi.pixel_count_hint(), 2);
}

#[test]
fn test_huge_rectangle_saturates() {
    let roi = Roi::new("Rectangle_1", rect(i64::MAX - 1, 0, i64::MAX, i64::MAX)).unwrap();
    assert_eq!(roi.pixel_count_hint(), usize::MAX);
    assert_eq!(roi.bounds().x_max, i64::MAX);

    let mask = roi.mask((4, 4));
    assert_eq!(mask.iter().filter(|&&m| m).count(), 4);
    assert!(mask.column(3).iter().all(|&m| m));
}

#[test]
fn test_default_colors() {
    assert_eq!(Roi::new("r", rect(0, 0, 1, 1)).unwrap().color(), RoiColor::RED);
    assert_eq!(
        Roi::new("p", RoiGeometry::Point(PixelPoint::new(0, 0)))
            .unwrap()
            .color(),
        RoiColor::GREEN
    );
    assert_eq!(RoiKind::MultiPoint.default_color().to_string(), "#ffa500");
}

#[test]
fn test_color_override_is_exported() {
    let roi = Roi::new("r", rect(0, 0, 1, 1))
        .unwrap()
        .with_color(RoiColor([1, 2, 3]));
    assert_eq!(roi.color().to_string(), "#010203");
    assert_eq!(roi.record().color, RoiColor([1, 2, 3]));
}

#[test]
fn test_record_serializes_tagged_geometry() {
    let roi = Roi::new("Point_3", RoiGeometry::Point(PixelPoint::new(4, 7))).unwrap();
    let json = serde_json::to_value(roi.record()).unwrap();
    assert_eq!(json["label"], "Point_3");
    assert_eq!(json["kind"], "Point");
    assert_eq!(json["coordinates"]["type"], "point");
    assert_eq!(json["coordinates"]["x"], 4);
    assert_eq!(json["coordinates"]["y"], 7);
}
