//! End-to-end processing of generated images on disk.

use std::path::{Path, PathBuf};

use image::ImageEncoder;
use image::codecs::jpeg::JpegEncoder;
use tinyimg::{
    ColorMode, EncodeSettings, FuzzMetric, ImageFormat, ImageMetadata, ImageProcessor,
    LosslessOutcome, Metric, ProcessOptions, Quality, QualityBounds, SearchConfig, SourceImage,
    Stage, Tolerance,
};

fn gradient(width: u32, height: u32) -> image::RgbImage {
    image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            (x * 255 / width) as u8,
            (y * 255 / height) as u8,
            ((x + y) * 127 / (width + height)) as u8,
        ])
    })
}

fn write_jpeg(dir: &Path, name: &str, quality: u8) -> PathBuf {
    let img = gradient(96, 64);
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality)
        .write_image(img.as_raw(), 96, 64, image::ExtendedColorType::Rgb8)
        .unwrap();
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

fn write_png(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    gradient(48, 48).save(&path).unwrap();
    path
}

fn diff(a: &Path, b: &Path) -> f64 {
    let a = SourceImage::decode(&std::fs::read(a).unwrap()).unwrap();
    let b = SourceImage::decode(&std::fs::read(b).unwrap()).unwrap();
    FuzzMetric.difference(&a, &b).unwrap()
}

#[test]
fn jpeg_output_stays_within_tolerance() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_jpeg(dir.path(), "photo.jpg", 100);
    let output = dir.path().join("photo_tiny.jpg");
    let eps = Tolerance::new(0.02).unwrap();

    let report = ImageProcessor::new(ProcessOptions::default())
        .process(&input, &output, eps)
        .unwrap();

    assert_eq!(report.format, ImageFormat::Jpeg);
    assert!(report.iterations <= 7);
    assert!(report.quality < Quality::MAX);
    assert!(
        matches!(
            report.lossless,
            LosslessOutcome::Optimized { .. } | LosslessOutcome::Unchanged
        ),
        "{:?}",
        report.lossless
    );
    assert!(report.output_size <= report.encoded_size);
    assert_eq!(report.output_size, std::fs::metadata(&output).unwrap().len());
    assert!(diff(&input, &output) <= eps.get());
}

#[test]
fn processing_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let processor = ImageProcessor::new(ProcessOptions::default());
    let eps = Tolerance::default();

    for input in [
        write_jpeg(dir.path(), "a.jpg", 95),
        write_png(dir.path(), "b.png"),
    ] {
        let first = input.with_extension("1");
        let second = input.with_extension("2");
        let r1 = processor.process(&input, &first, eps).unwrap();
        let r2 = processor.process(&input, &second, eps).unwrap();
        assert_eq!(r1, r2);
        assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
    }
}

#[test]
fn corrupt_file_does_not_affect_others() {
    let dir = tempfile::tempdir().unwrap();
    let good1 = write_jpeg(dir.path(), "1.jpg", 90);
    let bad = dir.path().join("2.jpg");
    std::fs::write(&bad, b"\xFF\xD8\xFF\xE0 definitely not a jpeg").unwrap();
    let good3 = write_png(dir.path(), "3.png");

    let processor = ImageProcessor::new(ProcessOptions::default());
    let results: Vec<_> = [&good1, &bad, &good3]
        .into_iter()
        .map(|path| {
            let out = path.with_file_name(format!(
                "out_{}",
                path.file_name().unwrap().to_string_lossy()
            ));
            (out.clone(), processor.process(path, &out, Tolerance::default()))
        })
        .collect();

    assert!(results[0].1.is_ok());
    let err = results[1].1.as_ref().unwrap_err();
    assert_eq!(err.stage(), Stage::Decode);
    assert_eq!(err.path(), bad.as_path());
    assert!(!results[1].0.exists());
    assert!(results[2].1.is_ok());

    for (out, _) in [&results[0], &results[2]] {
        let bytes = std::fs::read(out).unwrap();
        assert!(SourceImage::decode(&bytes).is_ok());
    }
}

#[test]
fn in_place_overwrite_shrinks_high_quality_jpeg() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_jpeg(dir.path(), "inplace.jpg", 100);
    let backup = dir.path().join("backup.jpg");
    std::fs::copy(&input, &backup).unwrap();
    let original_size = std::fs::metadata(&input).unwrap().len();
    let eps = Tolerance::default();

    let report = ImageProcessor::new(ProcessOptions::default())
        .process(&input, &input, eps)
        .unwrap();

    let new_size = std::fs::metadata(&input).unwrap().len();
    assert_eq!(report.input_size, original_size);
    assert_eq!(report.output_size, new_size);
    assert!(new_size <= original_size, "{new_size} > {original_size}");
    assert!(diff(&backup, &input) <= eps.get());
}

#[test]
fn skip_if_larger_leaves_destination_alone() {
    let dir = tempfile::tempdir().unwrap();
    // Already heavily compressed: re-encoding at the searched quality cannot win.
    let input = write_jpeg(dir.path(), "small.jpg", 5);
    let before = std::fs::read(&input).unwrap();
    let options = ProcessOptions::default()
        .with_skip_if_larger(true)
        .with_search(SearchConfig::default().with_bounds(QualityBounds::new(90, 100).unwrap()));

    let report = ImageProcessor::new(options)
        .process(&input, &input, Tolerance::new(0.0).unwrap())
        .unwrap();

    assert!(report.skipped);
    assert!(!report.copied);
    assert_eq!(report.output_size, report.input_size);
    assert_eq!(std::fs::read(&input).unwrap(), before);
}

#[test]
fn png_is_recompressed_losslessly() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_png(dir.path(), "flat.png");
    let output = dir.path().join("flat_tiny.png");

    let report = ImageProcessor::new(ProcessOptions::default())
        .process(&input, &output, Tolerance::default())
        .unwrap();

    assert_eq!(report.format, ImageFormat::Png);
    assert!(report.output_size <= report.encoded_size);
    assert_eq!(diff(&input, &output), 0.0);
}

#[test]
fn scaled_output_fits_box() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_jpeg(dir.path(), "wide.jpg", 95);
    let output = dir.path().join("wide_small.jpg");
    let settings = EncodeSettings::default()
        .with_max_dimensions(48, 48)
        .with_color(ColorMode::Preserve);

    ImageProcessor::new(ProcessOptions::default().with_settings(settings))
        .process(&input, &output, Tolerance::default())
        .unwrap();

    let out = SourceImage::decode(&std::fs::read(&output).unwrap()).unwrap();
    assert_eq!(out.dimensions(), (48, 32));
}

#[test]
fn missing_input_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("nowhere.jpg");
    let err = ImageProcessor::new(ProcessOptions::default())
        .process(&input, &input, Tolerance::default())
        .unwrap_err();
    assert_eq!(err.stage(), Stage::Read);
    assert!(!input.exists());
}

fn display_p3_like_profile() -> Vec<u8> {
    let mut icc = vec![0u8; 600];
    icc[0..4].copy_from_slice(&600u32.to_be_bytes());
    icc[12..16].copy_from_slice(b"mntr");
    icc[16..20].copy_from_slice(b"RGB ");
    icc[20..24].copy_from_slice(b"XYZ ");
    icc[36..40].copy_from_slice(b"acsp");
    for (i, b) in icc[128..].iter_mut().enumerate() {
        *b = (i % 251) as u8;
    }
    icc
}

#[test]
fn color_profile_and_exif_survive_processing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("phone.jpg");
    let output = dir.path().join("phone_tiny.jpg");
    // Big-endian TIFF header, one IFD holding Orientation = 6.
    let exif: &[u8] = b"MM\0*\0\0\0\x08\0\x01\x01\x12\0\x03\0\0\0\x01\0\x06\0\0\0\0\0\0";

    let img = gradient(96, 64);
    let mut bytes = Vec::new();
    let mut encoder = jpeg_encoder::Encoder::new(&mut bytes, 100);
    encoder.add_icc_profile(&display_p3_like_profile()).unwrap();
    encoder.add_app_segment(1, &[b"Exif\0\0".as_slice(), exif].concat()).unwrap();
    encoder
        .encode(img.as_raw(), 96, 64, jpeg_encoder::ColorType::Rgb)
        .unwrap();
    std::fs::write(&input, bytes).unwrap();

    let expected = ImageMetadata::none()
        .with_icc_profile(display_p3_like_profile())
        .with_exif(exif.to_vec());
    let source = SourceImage::decode(&std::fs::read(&input).unwrap()).unwrap();
    assert_eq!(source.metadata(), &expected);

    let report = ImageProcessor::new(ProcessOptions::default())
        .process(&input, &output, Tolerance::default())
        .unwrap();
    assert!(!report.skipped);

    let out = SourceImage::decode(&std::fs::read(&output).unwrap()).unwrap();
    assert_eq!(out.metadata(), &expected);
}

#[test]
fn sixteen_bit_png_is_kept_exactly() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("deep.png");
    let output = dir.path().join("deep_tiny.png");
    let pixels: image::ImageBuffer<image::Rgb<u16>, Vec<u16>> =
        image::ImageBuffer::from_fn(32, 32, |x, y| {
            image::Rgb([(x * 2011 + 37) as u16, (y * 1999) as u16, 12345])
        });
    pixels.save(&input).unwrap();

    let report = ImageProcessor::new(ProcessOptions::default())
        .process(&input, &output, Tolerance::new(0.0).unwrap())
        .unwrap();
    assert_eq!(report.format, ImageFormat::Png);

    let out = SourceImage::decode(&std::fs::read(&output).unwrap()).unwrap();
    assert_eq!(out.pixels().color(), image::ColorType::Rgb16);
    assert_eq!(out.pixels().to_rgb16().as_raw(), pixels.as_raw());
}

#[test]
fn skip_if_larger_copies_original_to_separate_destination() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_jpeg(dir.path(), "small.jpg", 5);
    let output = dir.path().join("small_tiny.jpg");
    let options = ProcessOptions::default()
        .with_skip_if_larger(true)
        .with_search(SearchConfig::default().with_bounds(QualityBounds::new(90, 100).unwrap()));

    let report = ImageProcessor::new(options)
        .process(&input, &output, Tolerance::new(0.0).unwrap())
        .unwrap();

    assert!(report.skipped && report.copied);
    assert_eq!(std::fs::read(&output).unwrap(), std::fs::read(&input).unwrap());
}
