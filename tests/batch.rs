mod common;

use common::synthetic_panel::{fill, panel_image, scratch_dir, LeafDisc, MemorySource, BROWN, GREEN};
use infest::batch::{plan_frames, run_batch, table, BatchParams};
use infest::mask::{MaskKind, MaskParams};
use infest::panel::{Layout, PanelParams};
use std::path::Path;
use std::sync::Arc;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn two_leaf_layout() -> Arc<Layout> {
    let text = "right\t10\t70\t50\t110\nleft\t10\t10\t50\t50\n";
    Arc::new(Layout::parse(text, Path::new("grid.layout")).expect("layout"))
}

/// Six frames in which the lesions grow with time.
fn growing_series() -> (MemorySource, Vec<String>) {
    let mut source = MemorySource::default();
    let mut names = Vec::new();
    for t in 0..6 {
        let lesion = 2.0 + 2.0 * t as f32;
        let leaves = [
            LeafDisc { center: (30.0, 30.0), radius: 16.0, lesion_radius: lesion },
            LeafDisc { center: (90.0, 30.0), radius: 15.0, lesion_radius: lesion / 2.0 },
        ];
        let name = format!("frames/{t:02}.png");
        source.insert(&name, panel_image(120, 60, &leaves));
        names.push(name);
    }
    (source, names)
}

#[test]
fn pool_size_does_not_change_the_table() {
    init_logging();
    let (source, names) = growing_series();
    // Shuffled input order.
    let frames = plan_frames(names.iter().rev()).expect("frames");
    let layout = two_leaf_layout();

    let sequential = run_batch(&frames, Arc::clone(&layout), &source, &BatchParams::default())
        .expect("sequential batch");
    let parallel = run_batch(
        &frames,
        layout,
        &source,
        &BatchParams {
            workers: 4,
            ..BatchParams::default()
        },
    )
    .expect("parallel batch");

    assert_eq!(sequential.rows.len(), 12);
    assert_eq!(sequential.rows, parallel.rows);
    assert_eq!(
        table::format_table(&sequential.rows),
        table::format_table(&parallel.rows)
    );
    let first: Vec<(&str, Option<i64>)> = sequential
        .rows
        .iter()
        .take(2)
        .map(|r| (r.id.as_str(), r.time))
        .collect();
    assert_eq!(first, [("left", Some(0)), ("right", Some(0))]);
}

#[test]
fn lesions_grow_over_time() {
    init_logging();
    let (source, names) = growing_series();
    let frames = plan_frames(&names).expect("frames");
    let params = BatchParams {
        panel: PanelParams {
            leaf_mask: MaskParams::with_kind(MaskKind::Otsu),
            ..PanelParams::default()
        },
        ..BatchParams::default()
    };
    let out = run_batch(&frames, two_leaf_layout(), &source, &params).expect("batch");
    let left: Vec<u64> = out
        .rows
        .iter()
        .filter(|r| r.id == "left")
        .map(|r| r.lesion_area)
        .collect();
    assert_eq!(left.len(), 6);
    assert!(left.windows(2).all(|w| w[0] <= w[1]), "{left:?}");
    assert!(left[5] > left[0]);
    for row in &out.rows {
        assert!(row.lesion_area <= row.leaf_area);
        assert!(row.leaf_area <= row.mask_area);
    }
}

#[test]
fn exclude_zone_never_contributes_pixels() {
    init_logging();
    let layout = Arc::new(
        Layout::parse(
            "s1\t5\t5\t35\t55\nEXCLUDE\t10\t40\t30\t50\n",
            Path::new("grid.layout"),
        )
        .expect("layout"),
    );
    let mut source = MemorySource::default();
    for (name, zone) in [("1.png", BROWN), ("2.png", GREEN)] {
        let mut img = panel_image(60, 40, &[]);
        fill(&mut img, 5..35, 5..55, GREEN);
        fill(&mut img, 10..30, 40..50, zone);
        source.insert(name, img);
    }
    let params = BatchParams {
        panel: PanelParams {
            leaf_mask: MaskParams::with_kind(MaskKind::None),
            ..PanelParams::default()
        },
        ..BatchParams::default()
    };
    let frames = plan_frames(["2.png", "1.png"]).expect("frames");
    let out = run_batch(&frames, layout, &source, &params).expect("batch");

    assert_eq!(out.rows.len(), 2);
    let (a, b) = (&out.rows[0], &out.rows[1]);
    assert_eq!((a.time, b.time), (Some(1), Some(2)));
    assert_eq!(a.lesion_area, b.lesion_area);
    assert_eq!(a.leaf_area, b.leaf_area);
    assert_eq!(a.mask_area, b.mask_area);
    assert_eq!(a.ichloro_sum, b.ichloro_sum);
}

#[test]
fn missing_frame_fails_the_batch() {
    init_logging();
    let (source, _) = growing_series();
    let frames = plan_frames(["frames/00.png", "frames/99.png"]).expect("frames");
    let err = run_batch(&frames, two_leaf_layout(), &source, &BatchParams::default()).unwrap_err();
    assert!(err.to_string().contains("99.png"), "{err}");
}

#[test]
fn review_images_are_written_per_leaf_and_frame() {
    init_logging();
    let (source, names) = growing_series();
    let frames = plan_frames(&names[..2]).expect("frames");
    let dir = scratch_dir("artifacts");
    let params = BatchParams {
        workers: 2,
        artifacts_dir: Some(dir.clone()),
        ..BatchParams::default()
    };
    let out = run_batch(&frames, two_leaf_layout(), &source, &params).expect("batch");

    assert_eq!(out.artifacts.len(), out.rows.len());
    for (artifacts, row) in out.artifacts.iter().zip(&out.rows) {
        assert_eq!((&artifacts.id, artifacts.time), (&row.id, row.time));
        for path in [&artifacts.orig, &artifacts.lesion, &artifacts.leaf, &artifacts.ichloro] {
            assert!(path.starts_with(&dir), "{}", path.display());
            // Box plus a 5 px margin on every side.
            let dims = image::image_dimensions(path).expect("readable png");
            assert_eq!(dims, (50, 50), "{}", path.display());
        }
    }
    let first = &out.artifacts[0].lesion;
    assert!(first.ends_with("left_time00000_lesion.png"), "{}", first.display());
    let pngs = std::fs::read_dir(&dir)
        .expect("scratch dir")
        .filter(|e| {
            e.as_ref()
                .map(|e| e.path().extension().is_some_and(|x| x == "png"))
                .unwrap_or(false)
        })
        .count();
    assert_eq!(pngs, 4 * out.rows.len());
    let _ = std::fs::remove_dir_all(&dir);
}
