mod common;

use approx::assert_abs_diff_eq;
use ndarray::Array2;

use irdash_core::asn::MemberType;
use irdash_core::cosmic::{DetectorRegion, StaticCrDetector};
use irdash_core::dq;
use irdash_core::error::DashError;
use irdash_core::mask::{SourceMask, StaticMaskProvider};
use irdash_core::pipeline::config::ReductionConfig;
use irdash_core::pipeline::{run_reduction, NoOpReporter};
use irdash_core::store::{FrameStore, MemoryStore};

use common::synthetic_exposure;

const NATIVE: (usize, usize) = (48, 48);
const TRIMMED: (usize, usize) = (38, 38);
const TIMES: [f32; 4] = [0.0, 10.0, 25.0, 50.0];

fn unit_flat() -> Array2<f32> {
    Array2::from_elem(NATIVE, 1.0)
}

fn test_config() -> ReductionConfig {
    let mut config = ReductionConfig::default();
    config.cosmic.region = DetectorRegion {
        min_col: 20,
        max_row: 15,
    };
    config
}

#[test]
fn end_to_end_reduction_on_a_synthetic_exposure() {
    let exposure = synthetic_exposure("iabc01", NATIVE, &TIMES, 100.0, [20.0; 4]);

    let mut footprint = Array2::from_elem(TRIMMED, false);
    footprint[[25, 25]] = true;
    let masks =
        StaticMaskProvider::new().with_exposure_mask("iabc01", SourceMask::from_bool(&footprint));

    let mut cr = Array2::from_elem(TRIMMED, false);
    cr[[10, 30]] = true; // in region: row < 15, col > 20
    cr[[30, 30]] = true; // outside region
    let detector = StaticCrDetector::new(cr);

    let mut store = MemoryStore::new();
    let summary = run_reduction(
        &exposure,
        &unit_flat(),
        &masks,
        &detector,
        &mut store,
        &test_config(),
        &NoOpReporter,
    )
    .unwrap();

    assert_eq!(summary.root, "iabc01");
    assert_eq!(summary.frames, vec!["iabc01_01", "iabc01_02"]);

    // Constant 100 e/s signal: the sky estimate per frame is the rate itself.
    assert_eq!(summary.sky_levels.len(), 2);
    for &sky in &summary.sky_levels {
        assert_abs_diff_eq!(sky, 100.0, epsilon = 1e-2);
    }

    // One eligible detection per frame.
    assert_eq!(summary.cr_flagged, 2);

    // Association: both frames present, root trailing as the product.
    assert_eq!(summary.asn.len(), 3);
    assert!(summary.asn.members[..2].iter().all(|m| m.present));
    let product = summary.asn.members.last().unwrap();
    assert_eq!(product.name, "iabc01");
    assert_eq!(product.mem_type, MemberType::Product);
    assert!(!product.present);

    // The store saw the post-reconciliation frames.
    assert_eq!(store.list("iabc01"), vec![1, 2]);
    for index in [1usize, 2] {
        let frame = store.load("iabc01", index).unwrap();
        assert!(frame.bg_subtracted);
        for &v in frame.sci.iter() {
            assert_abs_diff_eq!(v, 0.0, epsilon = 1e-2);
        }
        assert_eq!(frame.dq[[10, 30]] & dq::CR, dq::CR);
        assert_eq!(frame.dq[[30, 30]] & dq::CR, 0);
    }
    assert_eq!(store.load_asn("iabc01").unwrap(), summary.asn);
}

#[test]
fn per_frame_catalogs_come_from_the_frame_masks() {
    let exposure = synthetic_exposure("iabc01", NATIVE, &TIMES, 100.0, [20.0; 4]);

    let mut footprint = Array2::from_elem(TRIMMED, false);
    footprint[[20, 20]] = true;
    footprint[[20, 21]] = true;
    let masks = StaticMaskProvider::new()
        .with_frame_mask("iabc01", 1, SourceMask::from_bool(&footprint));

    let detector = StaticCrDetector::none(TRIMMED);
    let mut store = MemoryStore::new();
    let summary = run_reduction(
        &exposure,
        &unit_flat(),
        &masks,
        &detector,
        &mut store,
        &test_config(),
        &NoOpReporter,
    )
    .unwrap();

    assert_eq!(summary.catalogs.len(), 2);
    assert_eq!(summary.catalogs[0].name, "iabc01_01");
    assert_eq!(summary.catalogs[0].sources.len(), 1);
    let source = &summary.catalogs[0].sources[0];
    assert_eq!(source.area, 2);
    assert_abs_diff_eq!(source.ycentroid, 20.0, epsilon = 1e-6);
    assert_abs_diff_eq!(source.xcentroid, 20.5, epsilon = 1e-6);
    // Frame 2 had no mask registered: no sources.
    assert!(summary.catalogs[1].sources.is_empty());
}

#[test]
fn invalid_exposure_aborts_before_any_work() {
    let mut exposure = synthetic_exposure("iabc01", NATIVE, &TIMES, 100.0, [20.0; 4]);
    exposure.meta.bunit = "COUNTS".into();

    let masks = StaticMaskProvider::new();
    let detector = StaticCrDetector::none(TRIMMED);
    let mut store = MemoryStore::new();
    let result = run_reduction(
        &exposure,
        &unit_flat(),
        &masks,
        &detector,
        &mut store,
        &test_config(),
        &NoOpReporter,
    );

    assert!(matches!(result, Err(DashError::Validation(_))));
    assert_eq!(store.frame_count(), 0);
}

#[test]
fn reduction_is_stable_under_a_second_background_pass() {
    // Frames loaded back from the store carry the subtraction marker, so a
    // second pass must leave the science plane alone.
    let exposure = synthetic_exposure("iabc01", NATIVE, &TIMES, 100.0, [20.0; 4]);
    let masks = StaticMaskProvider::new();
    let detector = StaticCrDetector::none(TRIMMED);
    let mut store = MemoryStore::new();
    let config = test_config();
    run_reduction(
        &exposure,
        &unit_flat(),
        &masks,
        &detector,
        &mut store,
        &config,
        &NoOpReporter,
    )
    .unwrap();

    let mut frame = store.load("iabc01", 1).unwrap();
    let before = frame.sci.clone();
    let seg = SourceMask::empty(TRIMMED);
    let report = irdash_core::background::subtract_background(
        &mut frame,
        &seg,
        None,
        &config.background,
    )
    .unwrap();
    assert!(report.already_subtracted);
    assert_eq!(frame.sci, before);
}
