//! Gravity: where a crop rectangle smaller than the image is anchored.
//!
//! # Offset semantics
//!
//! - Anchors (`Center`, edges, corners): offsets point *inward* from the
//!   anchored edge and are added as-is on centered axes. `East` with `x = 10`
//!   leaves a 10px margin to the right edge; `Center` with `x = 10` moves the
//!   crop 10px to the right.
//! - `FocusPoint`: `x`/`y` are a relative point (`0.0..=1.0`) the crop is
//!   centered on.
//! - `Smart` and `Absolute`: `x`/`y` are the top-left origin of the crop in
//!   pixels. `Smart` only uses the origin when it fits; `Absolute` clamps it.
//!
//! Every resolved position is clamped into the image, so offsets never fail.

use serde::{Deserialize, Serialize};

use super::bounds::clamp_to_source_if_bounded;
use super::orientation::Orientation;

/// Gravity modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GravityKind {
    #[default]
    Center,
    North,
    East,
    South,
    West,
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
    /// Content-aware placement; the offsets carry a precomputed origin.
    Smart,
    /// Center the crop on a relative point.
    FocusPoint,
    /// Use the offsets as the crop origin.
    Absolute,
}

impl GravityKind {
    /// Per-axis anchor of an edge/corner mode: `-1` = left/top edge,
    /// `0` = centered, `1` = right/bottom edge. `None` for the other modes.
    pub fn anchor(self) -> Option<(i8, i8)> {
        let anchor = match self {
            GravityKind::Center => (0, 0),
            GravityKind::North => (0, -1),
            GravityKind::East => (1, 0),
            GravityKind::South => (0, 1),
            GravityKind::West => (-1, 0),
            GravityKind::NorthWest => (-1, -1),
            GravityKind::NorthEast => (1, -1),
            GravityKind::SouthWest => (-1, 1),
            GravityKind::SouthEast => (1, 1),
            GravityKind::Smart | GravityKind::FocusPoint | GravityKind::Absolute => return None,
        };
        Some(anchor)
    }

    /// Inverse of [`GravityKind::anchor`].
    pub fn from_anchor(ax: i8, ay: i8) -> Self {
        match (ax.signum(), ay.signum()) {
            (0, -1) => GravityKind::North,
            (1, 0) => GravityKind::East,
            (0, 1) => GravityKind::South,
            (-1, 0) => GravityKind::West,
            (-1, -1) => GravityKind::NorthWest,
            (1, -1) => GravityKind::NorthEast,
            (-1, 1) => GravityKind::SouthWest,
            (1, 1) => GravityKind::SouthEast,
            _ => GravityKind::Center,
        }
    }

    /// Modes whose offsets are a pixel origin rather than an adjustment.
    pub fn is_origin(self) -> bool {
        matches!(self, GravityKind::Smart | GravityKind::Absolute)
    }
}

/// A gravity mode with its offsets.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Gravity {
    #[serde(rename = "type")]
    pub kind: GravityKind,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

impl Gravity {
    /// Gravity of the given kind with zero offsets.
    pub fn new(kind: GravityKind) -> Self {
        Self { kind, x: 0.0, y: 0.0 }
    }

    /// Centered, no offset.
    pub fn center() -> Self {
        Self::new(GravityKind::Center)
    }

    /// Content-aware gravity with a precomputed origin.
    pub fn smart_at(x: f64, y: f64) -> Self {
        Self::new(GravityKind::Smart).with_offset(x, y)
    }

    /// Center the crop on a relative point.
    pub fn focus_point(x: f64, y: f64) -> Self {
        Self::new(GravityKind::FocusPoint).with_offset(x, y)
    }

    /// Place the crop at a fixed origin.
    pub fn absolute(x: f64, y: f64) -> Self {
        Self::new(GravityKind::Absolute).with_offset(x, y)
    }

    pub fn with_offset(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// The origin carried by a `Smart` gravity, if the crop fits there
    /// entirely. This is the shortcut that skips saliency analysis.
    ///
    /// Fractional origins are truncated toward zero.
    pub fn smart_origin(
        &self,
        source_w: u32,
        source_h: u32,
        crop_w: u32,
        crop_h: u32,
    ) -> Option<(u32, u32)> {
        if self.kind != GravityKind::Smart {
            return None;
        }

        let left = origin_pixels(self.x);
        let top = origin_pixels(self.y);
        let fits_x = left >= 0
            && left
                .checked_add(crop_w as i64)
                .is_some_and(|right| right <= source_w as i64);
        let fits_y = top >= 0
            && top
                .checked_add(crop_h as i64)
                .is_some_and(|bottom| bottom <= source_h as i64);

        (fits_x && fits_y).then_some((left as u32, top as u32))
    }

    /// Express this gravity in the image's current orientation.
    ///
    /// `self` is given in the final displayed frame, of size `frame`; the
    /// image will be transformed by `orientation` after cropping. `crop` is
    /// the requested crop size in the final frame (`0` = unbounded) and only
    /// matters for origin modes, whose whole rectangle is mapped.
    pub fn reorient(&self, orientation: Orientation, frame: (u32, u32), crop: (u32, u32)) -> Self {
        if orientation.is_identity() {
            return *self;
        }

        if let Some((ax, ay)) = self.kind.anchor() {
            let (nax, nay) = orientation.undo_vector(ax as f64, ay as f64);
            let (nax, nay) = (nax as i8, nay as i8);

            let (dx, dy) =
                orientation.undo_vector(displacement(ax, self.x), displacement(ay, self.y));

            return Self {
                kind: GravityKind::from_anchor(nax, nay),
                x: displacement(nax, dx),
                y: displacement(nay, dy),
            };
        }

        match self.kind {
            GravityKind::FocusPoint => {
                let (x, y) = orientation.undo_relative_point(self.x, self.y);
                Self { x, y, ..*self }
            }
            _ => {
                let crop_w = clamp_to_source_if_bounded(crop.0, frame.0);
                let crop_h = clamp_to_source_if_bounded(crop.1, frame.1);
                let pixels = if self.kind == GravityKind::Smart {
                    origin_pixels
                } else {
                    to_pixels
                };
                let rect = (pixels(self.x), pixels(self.y), crop_w, crop_h);
                let (x, y, _, _) = orientation.undo_rect(frame, rect);
                Self {
                    x: x as f64,
                    y: y as f64,
                    ..*self
                }
            }
        }
    }
}

/// Compute the top-left corner of a `crop_w x crop_h` rectangle inside a
/// `source_w x source_h` image.
///
/// The result always satisfies `left <= source_w - crop_w` and
/// `top <= source_h - crop_h`; a crop larger than the source pins that axis
/// to zero.
pub fn resolve_position(
    source_w: u32,
    source_h: u32,
    crop_w: u32,
    crop_h: u32,
    gravity: &Gravity,
) -> (u32, u32) {
    let space_x = source_w.saturating_sub(crop_w) as i64;
    let space_y = source_h.saturating_sub(crop_h) as i64;

    let (left, top) = match gravity.kind {
        GravityKind::Smart => match gravity.smart_origin(source_w, source_h, crop_w, crop_h) {
            Some((left, top)) => (left as i64, top as i64),
            // Origin does not fit: fall back to the center
            None => (space_x / 2, space_y / 2),
        },
        GravityKind::FocusPoint => (
            to_pixels(source_w as f64 * gravity.x).saturating_sub((crop_w / 2) as i64),
            to_pixels(source_h as f64 * gravity.y).saturating_sub((crop_h / 2) as i64),
        ),
        GravityKind::Absolute => (to_pixels(gravity.x), to_pixels(gravity.y)),
        kind => {
            let (ax, ay) = kind.anchor().unwrap_or((0, 0));
            (
                anchored(space_x, ax).saturating_add(to_pixels(displacement(ax, gravity.x))),
                anchored(space_y, ay).saturating_add(to_pixels(displacement(ay, gravity.y))),
            )
        }
    };

    (left.clamp(0, space_x) as u32, top.clamp(0, space_y) as u32)
}

/// Base position on one axis for an anchor.
fn anchored(space: i64, anchor: i8) -> i64 {
    match anchor {
        a if a < 0 => 0,
        0 => space / 2,
        _ => space,
    }
}

/// Convert an inward offset into a signed displacement along the axis
/// (and back: the mapping is its own inverse).
fn displacement(anchor: i8, offset: f64) -> f64 {
    if anchor > 0 {
        -offset
    } else {
        offset
    }
}

/// Pixel offsets are capped here (2^40) so `i64` sums with `u32` sizes
/// can't overflow.
const MAX_OFFSET: f64 = 1_099_511_627_776.0;

/// Round an offset to whole pixels. NaN counts as no offset.
fn to_pixels(v: f64) -> i64 {
    v.round().clamp(-MAX_OFFSET, MAX_OFFSET) as i64
}

/// Truncate a precomputed origin to whole pixels.
fn origin_pixels(v: f64) -> i64 {
    v.trunc().clamp(-MAX_OFFSET, MAX_OFFSET) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor_at(kind: GravityKind, x: f64, y: f64) -> Gravity {
        Gravity::new(kind).with_offset(x, y)
    }

    #[test]
    fn test_center() {
        assert_eq!(resolve_position(100, 100, 50, 50, &Gravity::center()), (25, 25));
    }

    #[test]
    fn test_center_crop_height_equals_source() {
        // Height matches, so top pins to 0
        assert_eq!(resolve_position(200, 100, 100, 100, &Gravity::center()), (50, 0));
    }

    #[test]
    fn test_edges() {
        let pos = |kind| resolve_position(200, 100, 50, 40, &Gravity::new(kind));
        assert_eq!(pos(GravityKind::North), (75, 0));
        assert_eq!(pos(GravityKind::South), (75, 60));
        assert_eq!(pos(GravityKind::West), (0, 30));
        assert_eq!(pos(GravityKind::East), (150, 30));
    }

    #[test]
    fn test_corners() {
        let pos = |kind| resolve_position(200, 100, 50, 40, &Gravity::new(kind));
        assert_eq!(pos(GravityKind::NorthWest), (0, 0));
        assert_eq!(pos(GravityKind::NorthEast), (150, 0));
        assert_eq!(pos(GravityKind::SouthWest), (0, 60));
        assert_eq!(pos(GravityKind::SouthEast), (150, 60));
    }

    #[test]
    fn test_offsets_point_inward() {
        let g = anchor_at(GravityKind::SouthEast, 10.0, 5.0);
        assert_eq!(resolve_position(200, 100, 50, 40, &g), (140, 55));

        let g = anchor_at(GravityKind::NorthWest, 10.0, 5.0);
        assert_eq!(resolve_position(200, 100, 50, 40, &g), (10, 5));

        let g = anchor_at(GravityKind::Center, -10.0, 5.0);
        assert_eq!(resolve_position(200, 100, 50, 40, &g), (65, 35));
    }

    #[test]
    fn test_offsets_clamp() {
        let g = anchor_at(GravityKind::West, 1000.0, -1000.0);
        assert_eq!(resolve_position(200, 100, 50, 40, &g), (150, 0));

        let g = anchor_at(GravityKind::East, 1000.0, 0.0);
        assert_eq!(resolve_position(200, 100, 50, 40, &g), (0, 30));
    }

    #[test]
    fn test_smart_shortcut_fits() {
        let g = Gravity::smart_at(10.0, 10.0);
        assert_eq!(g.smart_origin(100, 100, 50, 50), Some((10, 10)));
        assert_eq!(resolve_position(100, 100, 50, 50, &g), (10, 10));
    }

    #[test]
    fn test_smart_falls_back_to_center() {
        let g = Gravity::smart_at(60.0, 60.0);
        assert_eq!(g.smart_origin(100, 100, 50, 50), None);
        assert_eq!(resolve_position(100, 100, 50, 50, &g), (25, 25));
    }

    #[test]
    fn test_smart_exact_fit_on_edge() {
        let g = Gravity::smart_at(50.0, 50.0);
        assert_eq!(g.smart_origin(100, 100, 50, 50), Some((50, 50)));
    }

    #[test]
    fn test_smart_negative_origin_does_not_fit() {
        let g = Gravity::smart_at(-1.0, 0.0);
        assert_eq!(g.smart_origin(100, 100, 50, 50), None);
    }

    #[test]
    fn test_smart_origin_only_for_smart() {
        let g = Gravity::absolute(10.0, 10.0);
        assert_eq!(g.smart_origin(100, 100, 50, 50), None);
    }

    #[test]
    fn test_absolute_clamps() {
        assert_eq!(resolve_position(100, 100, 50, 50, &Gravity::absolute(10.0, 20.0)), (10, 20));
        assert_eq!(resolve_position(100, 100, 50, 50, &Gravity::absolute(80.0, -5.0)), (50, 0));
    }

    #[test]
    fn test_focus_point() {
        // Center on (0.75, 0.5) of a 200x100 image: point (150, 50)
        let g = Gravity::focus_point(0.75, 0.5);
        assert_eq!(resolve_position(200, 100, 50, 40, &g), (125, 30));

        // Near the edge the crop is clamped
        let g = Gravity::focus_point(1.0, 0.0);
        assert_eq!(resolve_position(200, 100, 50, 40, &g), (150, 0));
    }

    #[test]
    fn test_crop_larger_than_source_pins_to_zero() {
        let g = anchor_at(GravityKind::SouthEast, 0.0, 0.0);
        assert_eq!(resolve_position(100, 100, 150, 150, &g), (0, 0));
    }

    #[test]
    fn test_reorient_identity_is_noop() {
        let g = anchor_at(GravityKind::NorthEast, 3.0, 4.0);
        assert_eq!(g.reorient(Orientation::IDENTITY, (100, 100), (10, 10)), g);
    }

    #[test]
    fn test_reorient_anchor_quarter_turn() {
        let o = Orientation::from_degrees(90);
        let reorient = |kind| Gravity::new(kind).reorient(o, (100, 100), (0, 0)).kind;
        assert_eq!(reorient(GravityKind::North), GravityKind::West);
        assert_eq!(reorient(GravityKind::East), GravityKind::North);
        assert_eq!(reorient(GravityKind::South), GravityKind::East);
        assert_eq!(reorient(GravityKind::West), GravityKind::South);
        assert_eq!(reorient(GravityKind::NorthEast), GravityKind::NorthWest);
        assert_eq!(reorient(GravityKind::Center), GravityKind::Center);
    }

    #[test]
    fn test_reorient_anchor_half_turn() {
        let o = Orientation::from_degrees(180);
        let reorient = |kind| Gravity::new(kind).reorient(o, (100, 100), (0, 0)).kind;
        assert_eq!(reorient(GravityKind::North), GravityKind::South);
        assert_eq!(reorient(GravityKind::NorthWest), GravityKind::SouthEast);
    }

    #[test]
    fn test_reorient_flip_swaps_east_west() {
        let o = Orientation::new(0, true);
        let g = anchor_at(GravityKind::East, 7.0, 2.0).reorient(o, (100, 100), (0, 0));
        assert_eq!(g, anchor_at(GravityKind::West, 7.0, 2.0));

        let g = anchor_at(GravityKind::North, 7.0, 2.0).reorient(o, (100, 100), (0, 0));
        assert_eq!(g, anchor_at(GravityKind::North, -7.0, 2.0));
    }

    #[test]
    fn test_reorient_offsets_quarter_turn() {
        let o = Orientation::from_degrees(90);

        // Center offsets rotate as a vector
        let g = anchor_at(GravityKind::Center, 10.0, 20.0).reorient(o, (100, 100), (0, 0));
        assert_eq!(g, anchor_at(GravityKind::Center, 20.0, -10.0));

        // Inward margins swap axes
        let g = anchor_at(GravityKind::East, 10.0, 20.0).reorient(o, (100, 100), (0, 0));
        assert_eq!(g, anchor_at(GravityKind::North, 20.0, 10.0));
    }

    #[test]
    fn test_reorient_focus_point() {
        let o = Orientation::from_degrees(90);
        let g = Gravity::focus_point(0.2, 0.3).reorient(o, (100, 100), (0, 0));
        assert_eq!(g.kind, GravityKind::FocusPoint);
        assert!((g.x - 0.3).abs() < 1e-9);
        assert!((g.y - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_reorient_smart_origin_maps_rectangle() {
        // Final frame 50x100 (current image is 100x50 with a pending 90° turn)
        let o = Orientation::from_degrees(90);
        let g = Gravity::smart_at(0.0, 0.0).reorient(o, (50, 100), (10, 20));
        assert_eq!(g, Gravity::smart_at(0.0, 40.0));
    }

    #[test]
    fn test_huge_anchor_offsets_clamp() {
        for x in [1e19, f64::INFINITY] {
            let g = anchor_at(GravityKind::Center, x, 0.0);
            assert_eq!(resolve_position(200, 100, 100, 50, &g), (100, 25));
        }
        for x in [-1e19, f64::NEG_INFINITY] {
            let g = anchor_at(GravityKind::Center, x, 0.0);
            assert_eq!(resolve_position(200, 100, 100, 50, &g), (0, 25));
        }

        // Inward from the right edge: a huge margin pins to the left
        let g = anchor_at(GravityKind::SouthEast, 1e19, f64::NEG_INFINITY);
        assert_eq!(resolve_position(200, 100, 100, 50, &g), (0, 50));
    }

    #[test]
    fn test_nan_offset_counts_as_zero() {
        let g = anchor_at(GravityKind::Center, f64::NAN, f64::NAN);
        assert_eq!(resolve_position(200, 100, 100, 50, &g), (50, 25));
    }

    #[test]
    fn test_huge_smart_origin_does_not_fit() {
        for (x, y) in [
            (1e19, 0.0),
            (0.0, 1e19),
            (-1e19, 0.0),
            (f64::INFINITY, 0.0),
            (0.0, f64::NEG_INFINITY),
        ] {
            let g = Gravity::smart_at(x, y);
            assert_eq!(g.smart_origin(100, 100, 50, 50), None);
            assert_eq!(resolve_position(100, 100, 50, 50, &g), (25, 25));
        }
    }

    #[test]
    fn test_huge_focus_point_clamps() {
        let g = Gravity::focus_point(1e19, f64::NEG_INFINITY);
        assert_eq!(resolve_position(200, 100, 100, 50, &g), (100, 0));

        let g = Gravity::focus_point(f64::INFINITY, -1e19);
        assert_eq!(resolve_position(200, 100, 100, 50, &g), (100, 0));
    }

    #[test]
    fn test_huge_absolute_origin_clamps() {
        let g = Gravity::absolute(f64::INFINITY, -1e19);
        assert_eq!(resolve_position(200, 100, 100, 50, &g), (100, 0));

        let g = Gravity::absolute(-1e19, 1e19);
        assert_eq!(resolve_position(200, 100, 100, 50, &g), (0, 50));
    }

    #[test]
    fn test_reorient_huge_offsets_stays_in_bounds() {
        let o = Orientation::new(1, true);
        for g in [
            Gravity::absolute(f64::INFINITY, -1e19),
            Gravity::smart_at(1e19, 1e19),
            anchor_at(GravityKind::NorthEast, f64::NEG_INFINITY, 1e19),
            Gravity::focus_point(1e19, f64::INFINITY),
        ] {
            // Final frame 100x200, current frame 200x100
            let reoriented = g.reorient(o, (100, 200), (10, 20));
            let (left, top) = resolve_position(200, 100, 20, 10, &reoriented);
            assert!(left + 20 <= 200 && top + 10 <= 100, "{:?}", g);
        }
    }

    #[test]
    fn test_smart_origin_truncates_fraction() {
        // 50.6 truncates to 50, so the 50px crop still fits
        let g = Gravity::smart_at(50.6, 10.9);
        assert_eq!(g.smart_origin(100, 100, 50, 50), Some((50, 10)));
        assert_eq!(resolve_position(100, 100, 50, 50, &g), (50, 10));
    }
}
