//! Screen-space geometry for the horizon-gaze exercise.
//!
//! The movement area is a rectangle: horizontally it spans the target zone
//! (a centred band `zone_width_ratio` of the screen wide), vertically it runs
//! from `zone_height + upward_extension` above the screen centre down to
//! `max_y_ratio` of the screen height.

use std::ops::Add;

use serde::{Deserialize, Serialize};

use crate::motion::Smoothable;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Add for Point2 {
    type Output = Point2;

    fn add(self, rhs: Point2) -> Point2 {
        Point2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Smoothable for Point2 {
    fn zero() -> Self {
        Point2::default()
    }

    fn add(self, other: Self) -> Self {
        self + other
    }

    fn scale(self, factor: f64) -> Self {
        Point2::new(self.x * factor, self.y * factor)
    }
}

/// Screen and target-zone dimensions, in points.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ScreenLayout {
    pub width: f64,
    pub height: f64,
    pub zone_width_ratio: f64,
    pub zone_height: f64,
    pub upward_extension: f64,
    pub max_y_ratio: f64,
}

impl Default for ScreenLayout {
    fn default() -> Self {
        Self {
            width: 390.0,
            height: 844.0,
            zone_width_ratio: 0.8,
            zone_height: 120.0,
            upward_extension: 40.0,
            max_y_ratio: 0.85,
        }
    }
}

/// Signal-to-pixel gain for each axis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Sensitivity {
    pub horizontal: f64,
    pub vertical: f64,
}

impl Default for Sensitivity {
    fn default() -> Self {
        Self {
            horizontal: 250.0,
            vertical: 250.0,
        }
    }
}

/// Resolved bounds derived from a [`ScreenLayout`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementArea {
    pub center_x: f64,
    pub center_y: f64,
    pub zone_left: f64,
    pub zone_right: f64,
    pub zone_height: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl MovementArea {
    /// Negative or non-finite lengths in the layout count as zero, so the
    /// resulting bounds are always ordered.
    pub fn from_layout(layout: &ScreenLayout) -> Self {
        let width = non_negative(layout.width);
        let height = non_negative(layout.height);
        let zone_height = non_negative(layout.zone_height);
        let upward_extension = non_negative(layout.upward_extension);

        let zone_width = width * unit(layout.zone_width_ratio);
        let zone_left = (width - zone_width) / 2.0;
        let center_y = height * 0.5;
        let min_y = center_y - zone_height - upward_extension;
        let max_y = (height * unit(layout.max_y_ratio)).max(min_y);

        Self {
            center_x: width / 2.0,
            center_y,
            zone_left,
            zone_right: zone_left + zone_width,
            zone_height,
            min_y,
            max_y,
        }
    }

    pub fn center(&self) -> Point2 {
        Point2::new(self.center_x, self.center_y)
    }

    pub fn clamp(&self, point: Point2) -> Point2 {
        Point2::new(
            point.x.clamp(self.zone_left, self.zone_right),
            point.y.clamp(self.min_y, self.max_y),
        )
    }

    pub fn contains(&self, point: Point2) -> bool {
        (self.zone_left..=self.zone_right).contains(&point.x)
            && (self.min_y..=self.max_y).contains(&point.y)
    }

    /// Whether `y` sits inside the highlighted target band.
    pub fn in_target_zone(&self, y: f64) -> bool {
        let half = self.zone_height / 2.0;
        (self.center_y - half..=self.center_y + half).contains(&y)
    }

    /// Maps yaw/pitch (radians) to a clamped screen position. Tilting the
    /// device up moves the point up the screen, hence the pitch sign.
    pub fn map_signal(&self, yaw: f64, pitch: f64, sensitivity: Sensitivity) -> Point2 {
        let new_x = self.center_x + yaw * sensitivity.horizontal;
        let new_y = self.center_y - pitch * sensitivity.vertical;
        self.clamp(Point2::new(new_x, new_y))
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

fn unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::PI;

    fn area() -> MovementArea {
        MovementArea::from_layout(&ScreenLayout::default())
    }

    #[test]
    fn resolves_reference_layout() {
        let area = area();
        assert_eq!(area.center(), Point2::new(195.0, 422.0));
        assert!((area.zone_left - 39.0).abs() < 1e-9);
        assert!((area.zone_right - 351.0).abs() < 1e-9);
        assert_eq!(area.min_y, 422.0 - 120.0 - 40.0);
        assert!((area.max_y - 717.4).abs() < 1e-9);
    }

    #[test]
    fn zero_signal_maps_to_center() {
        let area = area();
        assert_eq!(area.map_signal(0.0, 0.0, Sensitivity::default()), area.center());
    }

    #[test]
    fn tilting_up_moves_point_up() {
        let area = area();
        let point = area.map_signal(0.0, 0.2, Sensitivity::default());
        assert!((point.y - (422.0 - 50.0)).abs() < 1e-9);
        let point = area.map_signal(0.1, 0.0, Sensitivity::default());
        assert!((point.x - 220.0).abs() < 1e-9);
    }

    #[test]
    fn mapping_always_lands_inside_the_area() {
        let area = area();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..10_000 {
            let yaw = rng.gen_range(-PI..=PI);
            let pitch = rng.gen_range(-PI..=PI);
            let point = area.map_signal(yaw, pitch, Sensitivity::default());
            assert!(area.contains(point), "{point:?} escaped for yaw={yaw} pitch={pitch}");
        }
        for (yaw, pitch) in [(-PI, -PI), (PI, PI), (-PI, PI), (PI, -PI)] {
            assert!(area.contains(area.map_signal(yaw, pitch, Sensitivity::default())));
        }
    }

    #[test]
    fn degenerate_layout_still_maps() {
        let layout = ScreenLayout {
            width: -100.0,
            height: f64::NAN,
            zone_height: -20.0,
            max_y_ratio: f64::INFINITY,
            ..ScreenLayout::default()
        };
        let area = MovementArea::from_layout(&layout);
        assert!(area.zone_left <= area.zone_right);
        assert!(area.min_y <= area.max_y);

        let point = area.map_signal(0.1, -0.3, Sensitivity::default());
        assert!(area.contains(point));
        assert_eq!(point.x, 0.0);
    }

    #[test]
    fn target_band_is_centered() {
        let area = area();
        assert!(area.in_target_zone(422.0));
        assert!(area.in_target_zone(362.0));
        assert!(area.in_target_zone(482.0));
        assert!(!area.in_target_zone(361.9));
        assert!(!area.in_target_zone(482.1));
    }

    #[test]
    fn point_helpers() {
        let sum = Point2::new(1.0, 2.0) + Point2::new(3.0, 4.0);
        assert_eq!(sum, Point2::new(4.0, 6.0));
        assert_eq!(Smoothable::scale(sum, 0.5), Point2::new(2.0, 3.0));
    }
}
