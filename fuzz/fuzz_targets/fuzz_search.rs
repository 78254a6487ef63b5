#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tinyimg::{
    Codec, FuzzMetric, ImageCodec, Limits, Metric, QualityBounds, QualitySearcher, SearchConfig,
    Tolerance,
};

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    eps_per_mille: u16,
    min_quality: u8,
    max_quality: u8,
    data: &'a [u8],
}

fuzz_target!(|input: Input<'_>| {
    let Ok(bounds) = QualityBounds::new(input.min_quality.into(), input.max_quality.into()) else {
        return;
    };
    let Ok(eps) = Tolerance::new(f64::from(input.eps_per_mille) / 1000.0) else {
        return;
    };

    let limits = Limits {
        max_width: Some(1024),
        max_height: Some(1024),
        max_pixels: Some(256 * 256),
        ..Limits::default()
    };
    let codec = ImageCodec::new(limits);
    let Ok(original) = codec.decode(input.data) else {
        return;
    };

    let outcome = QualitySearcher::new(&codec, &FuzzMetric)
        .with_config(SearchConfig::default().with_bounds(bounds))
        .find_quality(&original, eps)
        .expect("a decodable image must re-encode");

    assert!(outcome.quality > bounds.min() && outcome.quality <= bounds.max());
    assert!(outcome.iterations <= bounds.max_iterations());

    if outcome.quality < bounds.max() {
        let settings = Default::default();
        let bytes = codec.encode(&original, outcome.quality, &settings).unwrap();
        let candidate = codec.decode(&bytes).unwrap();
        let diff = FuzzMetric.difference(&original, &candidate).unwrap();
        assert!(eps.accepts(diff), "diff {diff} above {eps}");
    }
});
