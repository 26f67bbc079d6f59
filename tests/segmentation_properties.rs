//! Property tests for the segmentation core

use bgtrim::{
    erase_background, find_content_bounds, BoundingBox, CropComposer, PixelBuffer,
    SegmentationStrategy, Tolerance,
};
use proptest::prelude::*;

/// Random small image whose pixels are either pure white or a dark colour,
/// with an occasional near-white pixel to exercise tolerance
fn arb_buffer() -> impl Strategy<Value = PixelBuffer> {
    (1u32..12, 1u32..12).prop_flat_map(|(width, height)| {
        let pixel = prop_oneof![
            3 => Just([255u8, 255, 255, 255]),
            1 => (240u8..=255, 240u8..=255, 240u8..=255).prop_map(|(r, g, b)| [r, g, b, 255]),
            2 => (0u8..200, 0u8..200, 0u8..200).prop_map(|(r, g, b)| [r, g, b, 255]),
        ];
        proptest::collection::vec(pixel, (width * height) as usize).prop_map(move |pixels| {
            PixelBuffer::new(width, height, pixels.concat()).unwrap()
        })
    })
}

fn arb_strategy() -> impl Strategy<Value = SegmentationStrategy> {
    prop_oneof![
        Just(SegmentationStrategy::BorderSeeded),
        (0.0f64..=100.0).prop_map(|min_area_percentage| SegmentationStrategy::AreaFiltered {
            min_area_percentage
        }),
    ]
}

proptest! {
    #[test]
    fn erasing_preserves_dimensions_and_rgb(
        buffer in arb_buffer(),
        tolerance in any::<u8>(),
        strategy in arb_strategy(),
    ) {
        let mut erased = buffer.clone();
        let stats = erase_background(&mut erased, Tolerance::new(tolerance), &strategy);

        prop_assert_eq!(erased.dimensions(), buffer.dimensions());
        prop_assert!(stats.regions_erased <= stats.regions_found);
        prop_assert_eq!(
            buffer.opaque_pixel_count() - erased.opaque_pixel_count(),
            stats.pixels_erased
        );
        for (after, before) in erased.as_bytes().chunks_exact(4).zip(buffer.as_bytes().chunks_exact(4)) {
            prop_assert_eq!(&after[..3], &before[..3]);
            prop_assert!(after[3] == before[3] || after[3] == 0);
        }
    }

    #[test]
    fn erased_pixels_are_background_like(
        buffer in arb_buffer(),
        tolerance in any::<u8>(),
        strategy in arb_strategy(),
    ) {
        let tolerance = Tolerance::new(tolerance);
        let mut erased = buffer.clone();
        erase_background(&mut erased, tolerance, &strategy);

        for (after, before) in erased.as_bytes().chunks_exact(4).zip(buffer.as_bytes().chunks_exact(4)) {
            if after[3] == 0 && before[3] != 0 {
                prop_assert!(tolerance.admits(before[0], before[1], before[2]));
            }
        }
    }

    #[test]
    fn erasing_twice_changes_nothing_more(
        buffer in arb_buffer(),
        tolerance in any::<u8>(),
        strategy in arb_strategy(),
    ) {
        let tolerance = Tolerance::new(tolerance);
        let mut once = buffer;
        erase_background(&mut once, tolerance, &strategy);
        let mut twice = once.clone();
        erase_background(&mut twice, tolerance, &strategy);

        prop_assert_eq!(once, twice);
    }

    #[test]
    fn white_border_ring_is_always_erased(width in 1u32..10, height in 1u32..10, tolerance in any::<u8>()) {
        let mut buffer = PixelBuffer::new(width, height, vec![255; (width * height * 4) as usize]).unwrap();
        erase_background(&mut buffer, Tolerance::new(tolerance), &SegmentationStrategy::BorderSeeded);

        for x in 0..width {
            prop_assert_eq!(buffer.alpha(x, 0), Some(0));
            prop_assert_eq!(buffer.alpha(x, height - 1), Some(0));
        }
        for y in 0..height {
            prop_assert_eq!(buffer.alpha(0, y), Some(0));
            prop_assert_eq!(buffer.alpha(width - 1, y), Some(0));
        }
    }

    #[test]
    fn bounding_box_is_tight(buffer in arb_buffer(), strategy in arb_strategy()) {
        let mut erased = buffer;
        erase_background(&mut erased, Tolerance::new(10), &strategy);

        match find_content_bounds(&erased) {
            None => prop_assert_eq!(erased.opaque_pixel_count(), 0),
            Some(bbox) => {
                prop_assert!(bbox.min_x <= bbox.max_x && bbox.min_y <= bbox.max_y);
                prop_assert!(bbox.max_x < erased.width() && bbox.max_y < erased.height());

                let mut inside = 0;
                for y in 0..erased.height() {
                    for x in 0..erased.width() {
                        if erased.alpha(x, y) != Some(0) {
                            prop_assert!(bbox.contains(x, y));
                            inside += 1;
                        }
                    }
                }
                prop_assert_eq!(inside, erased.opaque_pixel_count());

                // every edge of the box touches a visible pixel
                let visible = |x: u32, y: u32| erased.alpha(x, y) != Some(0);
                prop_assert!((bbox.min_y..=bbox.max_y).any(|y| visible(bbox.min_x, y)));
                prop_assert!((bbox.min_y..=bbox.max_y).any(|y| visible(bbox.max_x, y)));
                prop_assert!((bbox.min_x..=bbox.max_x).any(|x| visible(x, bbox.min_y)));
                prop_assert!((bbox.min_x..=bbox.max_x).any(|x| visible(x, bbox.max_y)));
            },
        }
    }

    #[test]
    fn bounding_box_of_cropped_buffer_is_full_extent(
        buffer in arb_buffer(),
        tolerance in any::<u8>(),
        strategy in arb_strategy(),
    ) {
        let mut erased = buffer;
        erase_background(&mut erased, Tolerance::new(tolerance), &strategy);

        if let Some(bbox) = find_content_bounds(&erased) {
            let cropped = CropComposer::crop_to_bounds(erased, Some(bbox)).unwrap();
            prop_assert_eq!(cropped.dimensions(), (bbox.width(), bbox.height()));

            let cropped = PixelBuffer::from_rgba_image(cropped).unwrap();
            prop_assert_eq!(
                find_content_bounds(&cropped),
                Some(BoundingBox::full(bbox.width(), bbox.height()))
            );
        }
    }
}
