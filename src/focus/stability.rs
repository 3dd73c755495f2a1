use super::geometry::{MovementArea, Point2};

/// Scores above this count as a stable device.
pub const STABLE_THRESHOLD: f64 = 80.0;

/// Composite steadiness in `[0, 100]`: the mean of a position score (how far
/// the focus point sits from the band centre, relative to half the band) and a
/// motion score (how large the roll signal is).
pub fn stability_score(area: &MovementArea, focus_point: Point2, roll: f64) -> f64 {
    let max_distance = area.zone_height / 2.0;
    let distance_from_center = (focus_point.y - area.center_y).abs();
    let position_score = if max_distance > 0.0 {
        (100.0 - distance_from_center / max_distance * 100.0).max(0.0)
    } else {
        0.0
    };

    let motion_score = (100.0 - roll.abs() * 100.0).max(0.0);

    ((position_score + motion_score) / 2.0).clamp(0.0, 100.0)
}

pub fn is_stable(score: f64) -> bool {
    score > STABLE_THRESHOLD
}

/// Running mean of the score over one run, reported when the run ends.
#[derive(Debug, Clone, Default)]
pub struct StabilityTracker {
    sum: f64,
    count: u64,
}

impl StabilityTracker {
    pub fn record(&mut self, score: f64) {
        self.sum += score;
        self.count += 1;
    }

    pub fn average(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focus::geometry::ScreenLayout;

    fn area() -> MovementArea {
        MovementArea::from_layout(&ScreenLayout::default())
    }

    #[test]
    fn perfectly_still_and_centered_scores_100() {
        let area = area();
        assert_eq!(stability_score(&area, area.center(), 0.0), 100.0);
        assert!(is_stable(100.0));
    }

    #[test]
    fn averages_position_and_motion() {
        let area = area();
        // Half the band away from centre: position 50. Roll 0.3: motion 70.
        let point = Point2::new(area.center_x, area.center_y + 30.0);
        let score = stability_score(&area, point, 0.3);
        assert!((score - 60.0).abs() < 1e-9);
        assert!(!is_stable(score));
    }

    #[test]
    fn partial_scores_floor_at_zero() {
        let area = area();
        let far = Point2::new(area.center_x, area.max_y);
        assert_eq!(stability_score(&area, far, 2.5), 0.0);
    }

    #[test]
    fn score_stays_in_range() {
        let area = area();
        for roll in [-3.2, -1.0, 0.0, 0.5, 3.2] {
            for y in [area.min_y, area.center_y, area.max_y] {
                let score = stability_score(&area, Point2::new(area.center_x, y), roll);
                assert!((0.0..=100.0).contains(&score));
            }
        }
    }

    #[test]
    fn tracker_reports_mean() {
        let mut tracker = StabilityTracker::default();
        assert_eq!(tracker.average(), None);
        tracker.record(80.0);
        tracker.record(100.0);
        assert_eq!(tracker.average(), Some(90.0));
        tracker.reset();
        assert_eq!(tracker.average(), None);
    }
}
