//! End-to-end batch run over a small street grid, verifying the written
//! GeoPackage container.

use geo_types::{Geometry, LineString, Point};
use netreach_algorithms::batch::{multi_service_area, MultiServiceAreaParams, CONTAINER_FILE};
use netreach_algorithms::network::{NetworkProvider, ServiceAreaParams};
use netreach_core::io::GeoPackage;
use netreach_core::{Feature, FeatureCollection, NullFeedback};
use tempfile::TempDir;

/// 3x3 grid of streets, 100 units apart
fn grid_network() -> FeatureCollection {
    let mut fc = FeatureCollection::new();
    for i in 0..3 {
        let y = f64::from(i) * 100.0;
        fc.push(Feature::new(Geometry::LineString(LineString::from(vec![
            (0.0, y),
            (100.0, y),
            (200.0, y),
        ]))));
        let x = f64::from(i) * 100.0;
        fc.push(Feature::new(Geometry::LineString(LineString::from(vec![
            (x, 0.0),
            (x, 100.0),
            (x, 200.0),
        ]))));
    }
    fc
}

fn center_start() -> FeatureCollection {
    let mut fc = FeatureCollection::new();
    fc.push(Feature::new(Geometry::Point(Point::new(100.0, 100.0))));
    fc
}

#[test]
fn batch_writes_one_table_per_distance_class() {
    let dir = TempDir::new().unwrap();
    let params = MultiServiceAreaParams {
        from_dist: 0,
        to_dist: 300,
        interval_dist: 100,
        area: ServiceAreaParams::default(),
    };

    let output = multi_service_area(
        &NetworkProvider,
        &grid_network(),
        &center_start(),
        dir.path(),
        &params,
        &mut NullFeedback,
    )
    .unwrap();

    assert_eq!(output.classes_written, 3);
    assert_eq!(output.last.table, "200m");

    let container = dir.path().join(CONTAINER_FILE);
    assert!(container.exists());

    let gpkg = GeoPackage::create(&container).unwrap();
    assert_eq!(
        gpkg.table_names().unwrap(),
        vec!["0m".to_string(), "100m".to_string(), "200m".to_string()]
    );
    for table in ["0m", "100m", "200m"] {
        assert_eq!(gpkg.feature_count(table).unwrap(), 1, "table {table}");
    }
}

#[test]
fn rerun_replaces_existing_tables() {
    let dir = TempDir::new().unwrap();
    let params = MultiServiceAreaParams {
        from_dist: 0,
        to_dist: 200,
        interval_dist: 100,
        area: ServiceAreaParams::default(),
    };

    for _ in 0..2 {
        multi_service_area(
            &NetworkProvider,
            &grid_network(),
            &center_start(),
            dir.path(),
            &params,
            &mut NullFeedback,
        )
        .unwrap();
    }

    let gpkg = GeoPackage::create(&dir.path().join(CONTAINER_FILE)).unwrap();
    assert_eq!(gpkg.table_names().unwrap().len(), 2);
}

#[test]
fn bounds_tables_written_when_requested() {
    let dir = TempDir::new().unwrap();
    let params = MultiServiceAreaParams {
        from_dist: 100,
        to_dist: 200,
        interval_dist: 100,
        area: ServiceAreaParams {
            include_bounds: true,
            ..Default::default()
        },
    };

    multi_service_area(
        &NetworkProvider,
        &grid_network(),
        &center_start(),
        dir.path(),
        &params,
        &mut NullFeedback,
    )
    .unwrap();

    let gpkg = GeoPackage::create(&dir.path().join(CONTAINER_FILE)).unwrap();
    let names = gpkg.table_names().unwrap();
    assert!(names.contains(&"100m".to_string()), "{names:?}");
    assert!(names.contains(&"100m_bounds".to_string()), "{names:?}");
}
