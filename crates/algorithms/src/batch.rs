//! Multi-cutoff service area batch driver
//!
//! Runs the service area extraction once per distance class in
//! `[from_dist, to_dist)` stepped by `interval_dist`, persisting every
//! result as its own table of one GeoPackage container. A failed class
//! aborts the run; tables written before the failure stay on disk.

use crate::network::{ServiceAreaParams, ServiceAreaProvider};
use netreach_core::io::{GeoPackage, TableRef};
use netreach_core::{Error, Feedback, FeatureCollection, Result};
use std::path::Path;
use tracing::info;

/// File name of the output container inside the output directory
pub const CONTAINER_FILE: &str = "multipleDienstbereiche.gpkg";

/// Largest accepted distance value
pub const MAX_DISTANCE: u32 = 100_000;

/// Parameters for the batch driver
#[derive(Debug, Clone)]
pub struct MultiServiceAreaParams {
    /// First distance class (inclusive)
    pub from_dist: u32,
    /// End of the distance range (exclusive)
    pub to_dist: u32,
    /// Distance between classes
    pub interval_dist: u32,
    /// Per-class extraction configuration. `travel_cost` is overwritten
    /// with each class value.
    pub area: ServiceAreaParams,
}

impl Default for MultiServiceAreaParams {
    fn default() -> Self {
        Self {
            from_dist: 0,
            to_dist: 1000,
            interval_dist: 100,
            area: ServiceAreaParams::default(),
        }
    }
}

impl MultiServiceAreaParams {
    /// Check the distance bounds: `0 <= from < to <= 100000` and
    /// `1 <= interval <= 100000`.
    pub fn validate(&self) -> Result<()> {
        if self.to_dist > MAX_DISTANCE {
            return Err(Error::InvalidParameter {
                name: "to_dist",
                value: self.to_dist.to_string(),
                reason: format!("must be <= {MAX_DISTANCE}"),
            });
        }
        if self.from_dist >= self.to_dist {
            return Err(Error::InvalidParameter {
                name: "from_dist",
                value: self.from_dist.to_string(),
                reason: format!("must be < to_dist ({})", self.to_dist),
            });
        }
        if self.interval_dist == 0 || self.interval_dist > MAX_DISTANCE {
            return Err(Error::InvalidParameter {
                name: "interval_dist",
                value: self.interval_dist.to_string(),
                reason: format!("must be in 1..={MAX_DISTANCE}"),
            });
        }
        Ok(())
    }
}

/// Result of a batch run.
#[derive(Debug, Clone)]
pub struct MultiServiceAreaOutput {
    /// Reference to the table of the final distance class. Results for
    /// earlier classes are persisted in the container but not returned
    /// here, matching the long-standing behavior of this operation.
    pub last: TableRef,
    /// Number of tables written
    pub classes_written: usize,
}

/// The half-open arithmetic progression `[from, to)` stepped by `step`.
pub fn distance_classes(from: u32, to: u32, step: u32) -> Vec<u32> {
    (from..to).step_by(step as usize).collect()
}

/// Run the batch: one service area per distance class, each persisted as
/// table `<class>m` of `<out_dir>/multipleDienstbereiche.gpkg`.
///
/// Progress is reported as `index / count * 100` before each class, so
/// it never reaches 100 inside the loop. Cancellation is honored at
/// class boundaries.
pub fn multi_service_area<P: ServiceAreaProvider>(
    provider: &P,
    network: &FeatureCollection,
    starts: &FeatureCollection,
    out_dir: &Path,
    params: &MultiServiceAreaParams,
    feedback: &mut dyn Feedback,
) -> Result<MultiServiceAreaOutput> {
    params.validate()?;

    let classes = distance_classes(params.from_dist, params.to_dist, params.interval_dist);
    let count = classes.len();

    std::fs::create_dir_all(out_dir)?;
    let mut gpkg = GeoPackage::create(&out_dir.join(CONTAINER_FILE))?;
    info!(
        classes = count,
        container = %gpkg.path().display(),
        "starting service area batch"
    );

    let mut last: Option<TableRef> = None;
    for (index, &cutoff) in classes.iter().enumerate() {
        if feedback.is_canceled() {
            return Err(Error::Canceled);
        }
        feedback.set_progress(index as f64 / count as f64 * 100.0);

        let mut area = params.area.clone();
        area.travel_cost = f64::from(cutoff);
        let output = provider.service_area(network, starts, &area)?;

        let table = format!("{cutoff}m");
        last = Some(gpkg.write_layer(&table, &output.lines)?);
        if let Some(bounds) = &output.bounds {
            gpkg.write_layer(&format!("{cutoff}m_bounds"), bounds)?;
        }
    }

    // `validate` guarantees at least one class
    let last = last.expect("validated range produces at least one class");
    info!(tables = count, last = %last, "service area batch finished");
    Ok(MultiServiceAreaOutput {
        last,
        classes_written: count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::ServiceAreaOutput;
    use geo_types::{Geometry, LineString, MultiLineString};
    use netreach_core::{AttributeValue, Feature};
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Provider fake recording the cutoffs it was called with
    #[derive(Default)]
    struct FakeProvider {
        cutoffs: RefCell<Vec<f64>>,
        fail_at: Option<f64>,
    }

    impl ServiceAreaProvider for FakeProvider {
        fn service_area(
            &self,
            _network: &FeatureCollection,
            _starts: &FeatureCollection,
            params: &ServiceAreaParams,
        ) -> Result<ServiceAreaOutput> {
            if self.fail_at == Some(params.travel_cost) {
                return Err(Error::Algorithm("synthetic failure".into()));
            }
            self.cutoffs.borrow_mut().push(params.travel_cost);

            let mut f = Feature::new(Geometry::MultiLineString(MultiLineString::new(vec![
                LineString::from(vec![(0.0, 0.0), (params.travel_cost, 0.0)]),
            ])));
            f.set_property("cutoff", AttributeValue::Float(params.travel_cost));
            let mut lines = FeatureCollection::new();
            lines.push(f);
            Ok(ServiceAreaOutput {
                lines,
                bounds: None,
                reachable_vertices: 0,
            })
        }
    }

    /// Feedback fake recording progress values
    #[derive(Default)]
    struct RecordingFeedback {
        progress: Vec<f64>,
        cancel_after: Option<usize>,
    }

    impl Feedback for RecordingFeedback {
        fn set_progress(&mut self, percent: f64) {
            self.progress.push(percent);
        }

        fn is_canceled(&self) -> bool {
            self.cancel_after
                .is_some_and(|n| self.progress.len() >= n)
        }
    }

    fn params(from: u32, to: u32, step: u32) -> MultiServiceAreaParams {
        MultiServiceAreaParams {
            from_dist: from,
            to_dist: to,
            interval_dist: step,
            area: ServiceAreaParams::default(),
        }
    }

    fn run(
        provider: &FakeProvider,
        dir: &Path,
        p: &MultiServiceAreaParams,
        feedback: &mut RecordingFeedback,
    ) -> Result<MultiServiceAreaOutput> {
        multi_service_area(
            provider,
            &FeatureCollection::new(),
            &FeatureCollection::new(),
            dir,
            p,
            feedback,
        )
    }

    #[test]
    fn test_distance_classes_half_open() {
        assert_eq!(
            distance_classes(0, 1000, 100),
            vec![0, 100, 200, 300, 400, 500, 600, 700, 800, 900]
        );
        assert_eq!(distance_classes(0, 1000, 1000), vec![0]);
        assert_eq!(distance_classes(250, 1000, 300), vec![250, 550, 850]);
    }

    #[test]
    fn test_cutoff_sequence_and_table_names() {
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::default();
        let mut feedback = RecordingFeedback::default();

        let output = run(&provider, dir.path(), &params(0, 1000, 100), &mut feedback).unwrap();

        assert_eq!(
            *provider.cutoffs.borrow(),
            vec![0.0, 100.0, 200.0, 300.0, 400.0, 500.0, 600.0, 700.0, 800.0, 900.0]
        );
        assert_eq!(output.classes_written, 10);

        let gpkg = GeoPackage::create(&dir.path().join(CONTAINER_FILE)).unwrap();
        let mut names = gpkg.table_names().unwrap();
        names.sort_by_key(|n| n.trim_end_matches('m').parse::<u32>().unwrap());
        assert_eq!(
            names,
            vec!["0m", "100m", "200m", "300m", "400m", "500m", "600m", "700m", "800m", "900m"]
        );
    }

    #[test]
    fn test_returns_only_last_class_reference() {
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::default();
        let mut feedback = RecordingFeedback::default();

        let output = run(&provider, dir.path(), &params(0, 1000, 100), &mut feedback).unwrap();

        assert_eq!(output.last.table, "900m");
        assert_eq!(output.last.path, dir.path().join(CONTAINER_FILE));
    }

    #[test]
    fn test_single_class_range() {
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::default();
        let mut feedback = RecordingFeedback::default();

        let output = run(&provider, dir.path(), &params(0, 1000, 1000), &mut feedback).unwrap();

        assert_eq!(*provider.cutoffs.borrow(), vec![0.0]);
        assert_eq!(output.last.table, "0m");
        assert_eq!(feedback.progress, vec![0.0]);
    }

    #[test]
    fn test_progress_monotonic_and_below_100() {
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::default();
        let mut feedback = RecordingFeedback::default();

        run(&provider, dir.path(), &params(0, 1000, 100), &mut feedback).unwrap();

        assert_eq!(feedback.progress.len(), 10);
        assert_eq!(feedback.progress[0], 0.0);
        for pair in feedback.progress.windows(2) {
            assert!(pair[1] >= pair[0], "progress must not decrease: {pair:?}");
        }
        let last = *feedback.progress.last().unwrap();
        assert_eq!(last, 9.0 / 10.0 * 100.0);
        assert!(feedback.progress.iter().all(|p| *p < 100.0));
    }

    #[test]
    fn test_invalid_ranges_rejected_before_any_work() {
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::default();
        let mut feedback = RecordingFeedback::default();

        for (from, to, step, name) in [
            (1000, 1000, 100, "from_dist"),
            (2000, 1000, 100, "from_dist"),
            (0, 100_001, 100, "to_dist"),
            (0, 1000, 0, "interval_dist"),
            (0, 1000, 100_001, "interval_dist"),
        ] {
            let err = run(&provider, dir.path(), &params(from, to, step), &mut feedback)
                .unwrap_err();
            match err {
                Error::InvalidParameter { name: n, .. } => assert_eq!(n, name),
                other => panic!("expected InvalidParameter, got {other:?}"),
            }
        }
        assert!(provider.cutoffs.borrow().is_empty(), "no provider calls");
        assert!(feedback.progress.is_empty(), "no progress reports");
    }

    #[test]
    fn test_failure_keeps_earlier_tables() {
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider {
            fail_at: Some(300.0),
            ..Default::default()
        };
        let mut feedback = RecordingFeedback::default();

        let err = run(&provider, dir.path(), &params(0, 1000, 100), &mut feedback).unwrap_err();
        assert!(matches!(err, Error::Algorithm(_)), "got {err:?}");

        let gpkg = GeoPackage::create(&dir.path().join(CONTAINER_FILE)).unwrap();
        let names = gpkg.table_names().unwrap();
        assert_eq!(names.len(), 3, "0m, 100m, 200m persisted: {names:?}");
    }

    #[test]
    fn test_cancellation_stops_between_classes() {
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::default();
        let mut feedback = RecordingFeedback {
            cancel_after: Some(4),
            ..Default::default()
        };

        let err = run(&provider, dir.path(), &params(0, 1000, 100), &mut feedback).unwrap_err();
        assert!(matches!(err, Error::Canceled));
        assert_eq!(provider.cutoffs.borrow().len(), 4);
    }
}
