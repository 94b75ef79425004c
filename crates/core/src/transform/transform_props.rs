//! Property-based tests for the transform stage.

use proptest::prelude::*;

use super::service::tests::sample_png;
use super::service::transform_bytes;
use super::spec::{OutputFormat, TransformSpec};

fn arb_format() -> impl Strategy<Value = OutputFormat> {
    prop_oneof![Just(OutputFormat::Jpeg), Just(OutputFormat::Png)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Output width never exceeds the target and never grows.
    #[test]
    fn prop_width_bounded(
        width in 1u32..160,
        height in 1u32..160,
        target in 1u32..200,
        format in arb_format(),
    ) {
        let spec = TransformSpec::new(target, 0.7, format).unwrap();
        let asset = transform_bytes(&sample_png(width, height), &spec).unwrap();

        prop_assert!(asset.width <= target);
        prop_assert!(asset.width <= width);
        prop_assert!(asset.height <= height);
        prop_assert!(asset.height >= 1);
    }

    /// Aspect ratio is kept within one pixel of rounding.
    #[test]
    fn prop_aspect_ratio_preserved(
        width in 20u32..200,
        height in 20u32..200,
        target in 10u32..100,
    ) {
        let spec = TransformSpec::new(target, 0.5, OutputFormat::Jpeg).unwrap();
        let asset = transform_bytes(&sample_png(width, height), &spec).unwrap();

        let expected = if width <= target {
            height
        } else {
            (u64::from(height) * u64::from(target) / u64::from(width)).max(1) as u32
        };
        prop_assert!(asset.height.abs_diff(expected) <= 1);
    }

    /// Running the same transform twice yields the same asset.
    #[test]
    fn prop_transform_idempotent(
        width in 1u32..120,
        height in 1u32..120,
        target in 1u32..150,
        quality in 0.05f32..=1.0,
        format in arb_format(),
    ) {
        let input = sample_png(width, height);
        let spec = TransformSpec::new(target, quality, format).unwrap();

        let first = transform_bytes(&input, &spec).unwrap();
        let second = transform_bytes(&input, &spec).unwrap();

        prop_assert_eq!((first.width, first.height), (second.width, second.height));
        prop_assert_eq!(first.bytes, second.bytes);
        prop_assert_eq!(first.filename, second.filename);
    }
}
