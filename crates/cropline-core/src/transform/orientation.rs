//! Pending orientation of the image relative to its final displayed form.
//!
//! An [`Orientation`] describes what still has to happen to the pixels
//! *after* the crop stage: rotate clockwise by `quarter_turns * 90°`, then
//! mirror horizontally when `flip` is set. Cropping runs before that, so
//! anything the user expressed in the final orientation (gravity, crop size)
//! must be mapped back through the inverse transform.
//!
//! Orientations accumulate from two sources: the implicit auto-rotation read
//! from EXIF, and the explicit rotation of the request. [`Orientation::then`]
//! composes them into a single value.

use std::io::Cursor;

use exif::{In, Reader, Tag};
use serde::{Deserialize, Serialize};

/// A pending rotation (clockwise quarter turns) followed by an optional mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Orientation {
    /// Clockwise quarter turns, always in `0..4`.
    pub quarter_turns: u8,
    /// Horizontal mirror applied after the rotation.
    pub flip: bool,
}

impl Orientation {
    /// No pending transform.
    pub const IDENTITY: Self = Self {
        quarter_turns: 0,
        flip: false,
    };

    /// Create an orientation, normalizing `quarter_turns` into `0..4`.
    pub fn new(quarter_turns: u8, flip: bool) -> Self {
        Self {
            quarter_turns: quarter_turns & 3,
            flip,
        }
    }

    /// Create a pure rotation from degrees.
    ///
    /// Angles are rounded down to a multiple of 90 and normalized, so
    /// `-90` and `270` give the same orientation.
    pub fn from_degrees(angle: i32) -> Self {
        Self::new(angle.div_euclid(90).rem_euclid(4) as u8, false)
    }

    /// Map an EXIF orientation tag (1-8) to the transform that displays the
    /// stored pixels upright. Unknown values map to identity.
    pub fn from_exif(value: u32) -> Self {
        match value {
            2 => Self::new(0, true),
            3 => Self::new(2, false),
            4 => Self::new(2, true),
            5 => Self::new(1, true),
            6 => Self::new(1, false),
            7 => Self::new(3, true),
            8 => Self::new(3, false),
            _ => Self::IDENTITY,
        }
    }

    /// Read the EXIF orientation from JPEG/TIFF bytes.
    ///
    /// Returns identity when the container has no EXIF block or no
    /// orientation tag.
    pub fn from_exif_bytes(bytes: &[u8]) -> Self {
        let mut cursor = Cursor::new(bytes);

        match Reader::new().read_from_container(&mut cursor) {
            Ok(exif) => exif
                .get_field(Tag::Orientation, In::PRIMARY)
                .and_then(|field| field.value.get_uint(0))
                .map(Self::from_exif)
                .unwrap_or(Self::IDENTITY),
            Err(_) => Self::IDENTITY,
        }
    }

    /// Rotation in degrees (0, 90, 180 or 270).
    pub fn degrees(self) -> u32 {
        self.quarter_turns as u32 * 90
    }

    /// Whether the pending transform swaps width and height.
    #[inline]
    pub fn swaps_axes(self) -> bool {
        self.quarter_turns % 2 == 1
    }

    /// Whether there is nothing left to undo.
    pub fn is_identity(self) -> bool {
        self.quarter_turns == 0 && !self.flip
    }

    /// Compose two reorientations: undoing `self` and then undoing `next` is
    /// the same as undoing the result.
    ///
    /// When `next` carries no flip this simply adds the rotations, which is
    /// the case for an explicit request rotation on top of an auto-rotation.
    pub fn then(self, next: Self) -> Self {
        if next.flip {
            Self::new(next.quarter_turns.wrapping_sub(self.quarter_turns), !self.flip)
        } else {
            Self::new(self.quarter_turns.wrapping_add(next.quarter_turns), self.flip)
        }
    }

    /// Map a displacement expressed in the final frame into the current frame.
    ///
    /// The vector is undone through the mirror first, then through each
    /// clockwise quarter turn.
    pub(crate) fn undo_vector(self, dx: f64, dy: f64) -> (f64, f64) {
        let (mut x, mut y) = if self.flip { (-dx, dy) } else { (dx, dy) };
        for _ in 0..self.quarter_turns {
            (x, y) = (y, -x);
        }
        (x, y)
    }

    /// Map a relative point (`0.0..=1.0` on both axes) from the final frame
    /// into the current frame.
    pub(crate) fn undo_relative_point(self, px: f64, py: f64) -> (f64, f64) {
        let (mut x, mut y) = if self.flip { (1.0 - px, py) } else { (px, py) };
        for _ in 0..self.quarter_turns {
            (x, y) = (y, 1.0 - x);
        }
        (x, y)
    }

    /// Map a rectangle from the final frame into the current frame.
    ///
    /// `frame` is the `(width, height)` of the final frame, `rect` is
    /// `(left, top, width, height)`. Coordinates are signed so that
    /// out-of-frame origins survive the mapping and can be rejected or
    /// clamped by the caller.
    pub(crate) fn undo_rect(
        self,
        frame: (u32, u32),
        rect: (i64, i64, u32, u32),
    ) -> (i64, i64, u32, u32) {
        let (mut fw, mut fh) = (frame.0 as i64, frame.1 as i64);
        let (mut x, mut y, mut w, mut h) = rect;

        if self.flip {
            x = fw.saturating_sub(x).saturating_sub(w as i64);
        }

        for _ in 0..self.quarter_turns {
            // Undoing a clockwise turn turns the frame counter-clockwise: the
            // right edge becomes the top edge.
            (x, y, w, h) = (y, fw.saturating_sub(x).saturating_sub(w as i64), h, w);
            (fw, fh) = (fh, fw);
        }

        (x, y, w, h)
    }
}
