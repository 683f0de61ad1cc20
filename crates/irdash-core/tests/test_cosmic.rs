mod common;

use ndarray::Array2;

use irdash_core::cosmic::{reconcile, CosmicConfig, DetectorRegion};
use irdash_core::dq;
use irdash_core::error::DashError;
use irdash_core::mask::SourceMask;

use common::flat_frame;

const SHAPE: (usize, usize) = (38, 38);

fn region_config() -> CosmicConfig {
    // The default region bounds target the full-size detector; shrink them
    // to something that exists on a test frame.
    CosmicConfig {
        region: DetectorRegion {
            min_col: 10,
            max_row: 20,
        },
        ..Default::default()
    }
}

fn full_cr_mask() -> Array2<bool> {
    Array2::from_elem(SHAPE, true)
}

// ---------------------------------------------------------------------------
// Setting new flags
// ---------------------------------------------------------------------------

#[test]
fn flags_are_only_set_inside_the_region() {
    let mut frames = vec![flat_frame("iabc01", 1, SHAPE, 5.0)];
    let seg = SourceMask::empty(SHAPE);
    let config = region_config();

    reconcile(&mut frames, &seg, &full_cr_mask(), &config).unwrap();

    for ((y, x), &v) in frames[0].dq.indexed_iter() {
        let expected = x > 10 && y < 20;
        assert_eq!(v & dq::CR != 0, expected, "pixel ({y}, {x})");
    }
}

#[test]
fn detection_outside_the_region_is_ignored() {
    let mut frames = vec![flat_frame("iabc01", 1, SHAPE, 5.0)];
    let seg = SourceMask::empty(SHAPE);
    let mut cr = Array2::from_elem(SHAPE, false);
    cr[[30, 5]] = true; // outside on both axes
    cr[[5, 5]] = true; // outside on columns

    let report = reconcile(&mut frames, &seg, &cr, &region_config()).unwrap();
    assert_eq!(report.total_flagged(), 0);
    assert!(frames[0].dq.iter().all(|&v| v == 0));
}

#[test]
fn bright_source_pixels_are_not_flagged() {
    let mut frames = vec![flat_frame("iabc01", 1, SHAPE, 5.0)];
    let mut footprint = Array2::from_elem(SHAPE, false);
    footprint[[15, 15]] = true;
    footprint[[15, 16]] = true;
    let seg = SourceMask::from_bool(&footprint);
    // One source pixel is essentially unexposed; it stays eligible.
    frames[0].sci[[15, 16]] = 0.2;

    reconcile(&mut frames, &seg, &full_cr_mask(), &region_config()).unwrap();

    assert_eq!(frames[0].dq[[15, 15]] & dq::CR, 0);
    assert_eq!(frames[0].dq[[15, 16]] & dq::CR, dq::CR);
}

// ---------------------------------------------------------------------------
// Clearing spurious in-source flags
// ---------------------------------------------------------------------------

#[test]
fn in_source_flags_are_cleared() {
    let mut frames = vec![flat_frame("iabc01", 1, SHAPE, 5.0)];
    let mut footprint = Array2::from_elem(SHAPE, false);
    footprint[[25, 5]] = true;
    let seg = SourceMask::from_bool(&footprint);
    frames[0].dq[[25, 5]] = dq::CR;
    // A sky flag far from any source stays put.
    frames[0].dq[[30, 30]] = dq::CR;

    let no_cr = Array2::from_elem(SHAPE, false);
    let report = reconcile(&mut frames, &seg, &no_cr, &region_config()).unwrap();

    assert_eq!(report.total_cleared(), 1);
    assert_eq!(frames[0].dq[[25, 5]], 0);
    assert_eq!(frames[0].dq[[30, 30]], dq::CR);
}

#[test]
fn every_frame_of_the_root_is_reconciled() {
    let mut frames = vec![
        flat_frame("iabc01", 1, SHAPE, 5.0),
        flat_frame("iabc01", 2, SHAPE, 5.0),
    ];
    let mut footprint = Array2::from_elem(SHAPE, false);
    footprint[[25, 25]] = true;
    let seg = SourceMask::from_bool(&footprint);
    frames[0].dq[[25, 25]] = dq::CR;
    frames[1].dq[[25, 25]] = dq::CR;

    let no_cr = Array2::from_elem(SHAPE, false);
    let report = reconcile(&mut frames, &seg, &no_cr, &region_config()).unwrap();

    assert_eq!(report.per_frame.len(), 2);
    assert!(frames.iter().all(|f| f.dq[[25, 25]] == 0));
}

// ---------------------------------------------------------------------------
// Custom flag bit
// ---------------------------------------------------------------------------

#[test]
fn custom_removal_without_a_bit_is_a_configuration_error() {
    let mut frames = vec![flat_frame("iabc01", 1, SHAPE, 5.0)];
    let seg = SourceMask::empty(SHAPE);
    let config = CosmicConfig {
        remove_custom: true,
        custom: None,
        ..region_config()
    };
    assert!(matches!(
        reconcile(&mut frames, &seg, &full_cr_mask(), &config),
        Err(DashError::Configuration(_))
    ));
}

#[test]
fn custom_bit_gets_the_same_treatment() {
    let custom = 2048u16;
    let mut frames = vec![flat_frame("iabc01", 1, SHAPE, 5.0)];
    let mut footprint = Array2::from_elem(SHAPE, false);
    footprint[[25, 25]] = true;
    let seg = SourceMask::from_bool(&footprint);
    frames[0].dq[[25, 25]] = custom;

    let mut cr = Array2::from_elem(SHAPE, false);
    cr[[15, 15]] = true;

    let config = CosmicConfig {
        remove_custom: true,
        custom: Some(custom),
        ..region_config()
    };
    reconcile(&mut frames, &seg, &cr, &config).unwrap();

    // In-source custom flag cleared; sky pixel in the region gets both the
    // standard and the custom bit.
    assert_eq!(frames[0].dq[[25, 25]], 0);
    assert_eq!(frames[0].dq[[15, 15]], dq::CR | custom);
}

#[test]
fn shape_mismatch_is_rejected() {
    let mut frames = vec![flat_frame("iabc01", 1, SHAPE, 5.0)];
    let seg = SourceMask::empty((16, 16));
    assert!(matches!(
        reconcile(&mut frames, &seg, &full_cr_mask(), &region_config()),
        Err(DashError::ShapeMismatch { .. })
    ));
}
