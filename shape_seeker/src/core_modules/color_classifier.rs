// THEORY:
// The `ColorClassifier` is a stateless bucket classifier. It maps one averaged
// (hue, saturation) reading onto the small, fixed palette the operator can ask for.
//
// Hue alone cannot tell these colors apart under real lighting: the ranges overlap
// on purpose and saturation acts as the secondary discriminant. The rules are
// evaluated in a fixed priority order and the first one that matches wins, so the
// order itself is the tie-break policy. Reordering or "cleaning up" the ranges into
// disjoint intervals changes which color overlapping readings receive.
//
// Hue is on the 8-bit OpenCV scale (0..=179, degrees / 2); saturation is 0..=255.

pub mod color_classifier {
    use crate::core_modules::vocabulary::ColorKind;

    pub type Hue = u8;
    pub type Saturation = u8;

    /// One priority-ordered rule: inclusive hue bounds plus a saturation condition.
    struct BucketRule {
        color: ColorKind,
        hue_min: Hue,
        hue_max: Hue,
        saturation: SaturationBound,
    }

    enum SaturationBound {
        AtLeast(Saturation),
        AtMost(Saturation),
        Any,
    }

    impl BucketRule {
        fn matches(&self, hue: Hue, saturation: Saturation) -> bool {
            let hue_ok = hue >= self.hue_min && hue <= self.hue_max;
            let saturation_ok = match self.saturation {
                SaturationBound::AtLeast(min) => saturation >= min,
                SaturationBound::AtMost(max) => saturation <= max,
                SaturationBound::Any => true,
            };
            hue_ok && saturation_ok
        }
    }

    /// The palette, highest priority first. Orange's lower hue bound is exclusive
    /// (hue > 94), written here as the inclusive bound 95.
    const RULES: [BucketRule; 4] = [
        BucketRule {
            color: ColorKind::Pink,
            hue_min: 108,
            hue_max: 170,
            saturation: SaturationBound::AtLeast(100),
        },
        BucketRule {
            color: ColorKind::Orange,
            hue_min: 95,
            hue_max: 179,
            saturation: SaturationBound::AtMost(42),
        },
        BucketRule {
            color: ColorKind::Green,
            hue_min: 38,
            hue_max: 110,
            saturation: SaturationBound::AtLeast(45),
        },
        BucketRule {
            color: ColorKind::Yellow,
            hue_min: 15,
            hue_max: 100,
            saturation: SaturationBound::Any,
        },
    ];

    /// Classifies a (hue, saturation) reading. `None` means the reading falls in no
    /// bucket and the color is reported as Unknown.
    pub fn classify(hue: Hue, saturation: Saturation) -> Option<ColorKind> {
        RULES
            .iter()
            .find(|rule| rule.matches(hue, saturation))
            .map(|rule| rule.color)
    }
}

#[cfg(test)]
mod tests {
    use super::color_classifier::classify;
    use crate::core_modules::vocabulary::ColorKind;

    #[test]
    fn priority_order_at_boundaries() {
        assert_eq!(classify(108, 100), Some(ColorKind::Pink));
        // Green needs saturation >= 45, so this falls through to the yellow range.
        assert_eq!(classify(38, 44), Some(ColorKind::Yellow));
        assert_eq!(classify(38, 45), Some(ColorKind::Green));
        assert_eq!(classify(170, 100), Some(ColorKind::Pink));
        assert_eq!(classify(171, 100), None);
    }

    #[test]
    fn orange_lower_hue_bound_is_exclusive() {
        // Hue 94 with low saturation is not orange; it is inside the yellow range.
        assert_eq!(classify(94, 20), Some(ColorKind::Yellow));
        assert_eq!(classify(95, 20), Some(ColorKind::Orange));
        assert_eq!(classify(179, 42), Some(ColorKind::Orange));
        assert_eq!(classify(179, 43), None);
    }

    #[test]
    fn overlapping_ranges_resolve_to_the_earlier_rule() {
        // Inside both the pink and green ranges.
        assert_eq!(classify(109, 200), Some(ColorKind::Pink));
        // Inside both the orange and yellow ranges.
        assert_eq!(classify(99, 10), Some(ColorKind::Orange));
        // Inside both the green and yellow ranges.
        assert_eq!(classify(60, 200), Some(ColorKind::Green));
    }

    #[test]
    fn out_of_range_hues_are_unknown() {
        assert_eq!(classify(0, 0), None);
        assert_eq!(classify(14, 255), None);
        assert_eq!(classify(101, 44), None);
    }

    #[test]
    fn every_reading_gets_exactly_the_first_matching_bucket() {
        for hue in 0..=179u8 {
            for saturation in 0..=255u8 {
                let expected = if (108..=170).contains(&hue) && saturation >= 100 {
                    Some(ColorKind::Pink)
                } else if hue > 94 && saturation <= 42 {
                    Some(ColorKind::Orange)
                } else if (38..=110).contains(&hue) && saturation >= 45 {
                    Some(ColorKind::Green)
                } else if (15..=100).contains(&hue) {
                    Some(ColorKind::Yellow)
                } else {
                    None
                };
                assert_eq!(classify(hue, saturation), expected, "hue={hue} sat={saturation}");
            }
        }
    }
}
