use crate::models::DetectedRectangle;

/// Standard card ratio, 2.5in x 3.5in
pub const STANDARD_CARD_RATIO: f64 = 2.5 / 3.5;

/// A rectangle is card-like when its ratio is within this distance of the standard
pub const GOOD_MATCH_TOLERANCE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioComparison {
    pub target: f64,
    pub difference: f64,
    pub good_match: bool,
}

/// Compare a rectangle's aspect ratio with the standard card ratio
pub fn compare(rectangle: &DetectedRectangle) -> RatioComparison {
    let difference = (rectangle.aspect_ratio - STANDARD_CARD_RATIO).abs();
    RatioComparison {
        target: STANDARD_CARD_RATIO,
        difference,
        good_match: difference < GOOD_MATCH_TOLERANCE,
    }
}
