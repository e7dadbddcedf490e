use image::{Rgb, RgbImage};
use parheq::pipeline::{equalize_file, first_mismatch, is_decode_failure, output_path};
use parheq::{coordinator, EqualizeParams, GroupConfig, Mode};
use std::path::Path;
use tempfile::tempdir;

fn write_gradient(path: &Path, width: u32, height: u32) {
    let mut img = RgbImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let r = ((x * 7 + y) % 256) as u8;
            let g = ((x + y * 3) % 256) as u8;
            let b = ((x * y) % 256) as u8;
            img.put_pixel(x, y, Rgb([r, g, b]));
        }
    }
    img.save(path).unwrap();
}

#[test]
fn test_parallel_and_sequential_outputs_agree() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("gradient.png");
    write_gradient(&input, 37, 23);

    for workers in [1, 2, 4] {
        let coord = coordinator(
            GroupConfig::default().with_workers(workers),
            EqualizeParams::default(),
        )
        .unwrap();

        let par_out = output_path(dir.path(), &input, Mode::Distributed);
        let seq_out = output_path(dir.path(), &input, Mode::Reference);
        let par = equalize_file(&coord, Mode::Distributed, &input, &par_out).unwrap();
        let seq = equalize_file(&coord, Mode::Reference, &input, &seq_out).unwrap();

        assert!(par.encode_error.is_none());
        assert!(seq.encode_error.is_none());
        assert_eq!(first_mismatch(&par.buffer, &seq.buffer), None);

        let written = image::open(&par_out).unwrap().to_luma8();
        assert_eq!(written.dimensions(), (37, 23));
        assert!(written.pixels().all(|p| (1..=20).contains(&p[0])));
        let written_seq = image::open(&seq_out).unwrap().to_luma8();
        assert_eq!(written.as_raw(), written_seq.as_raw());
    }
}

#[test]
fn test_decode_failure_starts_no_collectives() {
    let dir = tempdir().unwrap();
    let coord = coordinator(GroupConfig::default().with_workers(3), EqualizeParams::default())
        .unwrap();

    let missing = dir.path().join("missing.png");
    let out = dir.path().join("missing_parallel.png");
    let err = equalize_file(&coord, Mode::Distributed, &missing, &out).unwrap_err();

    assert!(is_decode_failure(&err));
    assert_eq!(coord.group().collectives_started(), 0);
    assert!(!out.exists());
}

#[test]
fn test_encode_failure_keeps_result() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("flat.png");
    write_gradient(&input, 8, 8);

    let coord = coordinator(GroupConfig::default().with_workers(2), EqualizeParams::default())
        .unwrap();
    let out = dir.path().join("no_such_dir").join("flat_parallel.png");
    let run = equalize_file(&coord, Mode::Distributed, &input, &out).unwrap();

    assert!(matches!(
        run.encode_error,
        Some(parheq::core::Error::Encode { .. })
    ));
    assert_eq!(run.buffer.len(), 64);
    assert!(run.buffer.as_slice().iter().all(|&v| (1..=20).contains(&v)));
    assert!(!out.exists());
}

#[test]
fn test_constant_image_encodes_top_of_range() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("constant.png");
    RgbImage::from_pixel(10, 10, Rgb([90, 90, 90]))
        .save(&input)
        .unwrap();

    let coord = coordinator(GroupConfig::default().with_workers(4), EqualizeParams::default())
        .unwrap();
    let out = dir.path().join("constant_parallel.png");
    let run = equalize_file(&coord, Mode::Distributed, &input, &out).unwrap();

    assert!(run.buffer.as_slice().iter().all(|&v| v == 20));
    let written = image::open(&out).unwrap().to_luma8();
    assert!(written.pixels().all(|p| p[0] == 20));
}
