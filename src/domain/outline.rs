//! Skyline contour of a laid-out subtree.
//!
//! An [`Outline`] describes, for every horizontal band a subtree occupies, the
//! minimum (top border) and maximum (bottom border) vertical offset of its
//! content relative to the subtree root's center. The horizontal axis runs
//! outward from the subtree root's near edge, so the same outline serves both
//! branch directions. Bands without content are gap segments that never
//! constrain stacking.

use tracing::instrument;

/// One band of a border: `length` units wide at vertical `offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub offset: f64,
    pub length: f64,
}

/// Vertical extent and width of an outline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlineBounds {
    pub min_y: f64,
    pub max_y: f64,
    pub width: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outline {
    top: Vec<Segment>,
    bottom: Vec<Segment>,
}

const GAP_TOP: f64 = f64::INFINITY;
const GAP_BOTTOM: f64 = f64::NEG_INFINITY;

impl Outline {
    /// Outline of a single `width` x `height` rectangle centered on the origin row.
    pub fn for_rectangle(width: f64, height: f64) -> Self {
        let mut outline = Self::default();
        push_segment(&mut outline.top, -height / 2.0, width);
        push_segment(&mut outline.bottom, height / 2.0, width);
        outline
    }

    /// An empty band: occupies horizontal space without vertical extent.
    pub fn gap(length: f64) -> Self {
        let mut outline = Self::default();
        push_segment(&mut outline.top, GAP_TOP, length);
        push_segment(&mut outline.bottom, GAP_BOTTOM, length);
        outline
    }

    pub fn top(&self) -> &[Segment] {
        &self.top
    }

    pub fn bottom(&self) -> &[Segment] {
        &self.bottom
    }

    pub fn is_empty(&self) -> bool {
        self.top.is_empty()
    }

    /// Minimum downward shift of `self` so that its top border clears the
    /// bottom border of `other`, over every band where both have extent.
    ///
    /// Single line sweep over both (horizontally ordered) segment sequences,
    /// always advancing the segment that ends first. Never negative.
    pub fn spacing_above(&self, other: &Outline) -> f64 {
        let mut required: f64 = 0.0;
        let (mut i, mut j) = (0, 0);
        let mut top_left = self.top.first().map_or(0.0, |s| s.length);
        let mut bottom_left = other.bottom.first().map_or(0.0, |s| s.length);

        while i < self.top.len() && j < other.bottom.len() {
            let clearance = other.bottom[j].offset - self.top[i].offset;
            if clearance > required {
                required = clearance;
            }

            if top_left < bottom_left {
                bottom_left -= top_left;
                i += 1;
                top_left = self.top.get(i).map_or(0.0, |s| s.length);
            } else if bottom_left < top_left {
                top_left -= bottom_left;
                j += 1;
                bottom_left = other.bottom.get(j).map_or(0.0, |s| s.length);
            } else {
                i += 1;
                j += 1;
                top_left = self.top.get(i).map_or(0.0, |s| s.length);
                bottom_left = other.bottom.get(j).map_or(0.0, |s| s.length);
            }
        }
        required
    }

    /// Move `self` down until it sits at least `margin` below `upper`.
    /// Returns the applied vertical shift.
    pub fn stack_below(&mut self, upper: &Outline, margin: f64) -> f64 {
        let shift = self.spacing_above(upper) + margin;
        self.translate(0.0, shift);
        shift
    }

    /// Push the outline `horizontal_indent` away from its origin and widen
    /// every vertical offset outward by `margin`.
    pub fn indent(&mut self, horizontal_indent: f64, margin: f64) {
        for seg in &mut self.top {
            seg.offset -= margin;
        }
        for seg in &mut self.bottom {
            seg.offset += margin;
        }
        if horizontal_indent > 0.0 {
            let mut shifted = Outline::gap(horizontal_indent);
            shifted.combine_horizontally(self);
            *self = shifted;
        }
    }

    /// Shift by `dx` horizontally (negative values trim leading bands) and
    /// by `dy` vertically.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        for seg in self.top.iter_mut().chain(self.bottom.iter_mut()) {
            seg.offset += dy;
        }
        if dx > 0.0 {
            self.indent(dx, 0.0);
        } else if dx < 0.0 {
            trim_front(&mut self.top, -dx);
            trim_front(&mut self.bottom, -dx);
        }
    }

    /// Append `other` after this outline's far edge.
    pub fn combine_horizontally(&mut self, other: &Outline) {
        for seg in &other.top {
            push_segment(&mut self.top, seg.offset, seg.length);
        }
        for seg in &other.bottom {
            push_segment(&mut self.bottom, seg.offset, seg.length);
        }
    }

    /// Pointwise envelope of two outlines sharing the same origin.
    #[instrument(level = "trace", skip_all)]
    pub fn merge(&self, other: &Outline) -> Outline {
        Outline {
            top: merge_border(&self.top, &other.top, f64::min),
            bottom: merge_border(&self.bottom, &other.bottom, f64::max),
        }
    }

    /// Bottom-most minus top-most vertical offset.
    pub fn initial_height(&self) -> f64 {
        let bounds = self.bounds();
        bounds.max_y - bounds.min_y
    }

    /// Sum of the top border's segment lengths.
    pub fn width(&self) -> f64 {
        self.top.iter().map(|s| s.length).sum()
    }

    pub fn bounds(&self) -> OutlineBounds {
        let min_y = self
            .top
            .iter()
            .map(|s| s.offset)
            .filter(|o| o.is_finite())
            .fold(f64::INFINITY, f64::min);
        let max_y = self
            .bottom
            .iter()
            .map(|s| s.offset)
            .filter(|o| o.is_finite())
            .fold(f64::NEG_INFINITY, f64::max);

        if min_y.is_finite() && max_y.is_finite() {
            OutlineBounds {
                min_y,
                max_y,
                width: self.width(),
            }
        } else {
            OutlineBounds {
                min_y: 0.0,
                max_y: 0.0,
                width: self.width(),
            }
        }
    }
}

/// Append a band, folding it into the previous one when the offset matches.
fn push_segment(border: &mut Vec<Segment>, offset: f64, length: f64) {
    if length <= 0.0 {
        return;
    }
    match border.last_mut() {
        Some(last) if last.offset == offset => last.length += length,
        _ => border.push(Segment { offset, length }),
    }
}

fn trim_front(border: &mut Vec<Segment>, mut amount: f64) {
    let mut consumed = 0;
    for seg in border.iter_mut() {
        if amount <= 0.0 {
            break;
        }
        if seg.length <= amount {
            amount -= seg.length;
            consumed += 1;
        } else {
            seg.length -= amount;
            amount = 0.0;
        }
    }
    border.drain(..consumed);
}

/// Sweep two borders band by band, combining overlapping offsets with `pick`.
/// Where only one border has bands left it is copied through.
fn merge_border(a: &[Segment], b: &[Segment], pick: fn(f64, f64) -> f64) -> Vec<Segment> {
    let mut merged = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    let mut a_left = a.first().map_or(0.0, |s| s.length);
    let mut b_left = b.first().map_or(0.0, |s| s.length);

    while i < a.len() && j < b.len() {
        let offset = pick(a[i].offset, b[j].offset);
        if a_left < b_left {
            push_segment(&mut merged, offset, a_left);
            b_left -= a_left;
            i += 1;
            a_left = a.get(i).map_or(0.0, |s| s.length);
        } else if b_left < a_left {
            push_segment(&mut merged, offset, b_left);
            a_left -= b_left;
            j += 1;
            b_left = b.get(j).map_or(0.0, |s| s.length);
        } else {
            push_segment(&mut merged, offset, a_left);
            i += 1;
            j += 1;
            a_left = a.get(i).map_or(0.0, |s| s.length);
            b_left = b.get(j).map_or(0.0, |s| s.length);
        }
    }

    if i < a.len() {
        push_segment(&mut merged, a[i].offset, a_left);
        for seg in &a[i + 1..] {
            push_segment(&mut merged, seg.offset, seg.length);
        }
    }
    if j < b.len() {
        push_segment(&mut merged, b[j].offset, b_left);
        for seg in &b[j + 1..] {
            push_segment(&mut merged, seg.offset, seg.length);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangle_outline_has_one_segment_per_border() {
        let outline = Outline::for_rectangle(100.0, 40.0);
        assert_eq!(outline.top(), &[Segment { offset: -20.0, length: 100.0 }]);
        assert_eq!(outline.bottom(), &[Segment { offset: 20.0, length: 100.0 }]);
        assert_eq!(outline.width(), 100.0);
        assert_eq!(outline.initial_height(), 40.0);
    }

    #[test]
    fn spacing_above_is_sum_of_half_heights_for_equal_rectangles() {
        let upper = Outline::for_rectangle(100.0, 40.0);
        let lower = Outline::for_rectangle(100.0, 40.0);
        assert_eq!(lower.spacing_above(&upper), 40.0);
    }

    #[test]
    fn spacing_above_ignores_bands_without_horizontal_overlap() {
        // upper is tall but only 10 wide; lower starts after a 20 wide gap
        let upper = Outline::for_rectangle(10.0, 200.0);
        let mut lower = Outline::for_rectangle(50.0, 20.0);
        lower.indent(20.0, 0.0);
        assert_eq!(lower.spacing_above(&upper), 0.0);
    }

    #[test]
    fn spacing_above_uses_worst_band() {
        // upper: narrow tall node followed by a short wide band
        let mut upper = Outline::for_rectangle(10.0, 100.0);
        upper.combine_horizontally(&Outline::for_rectangle(30.0, 20.0));
        let lower = Outline::for_rectangle(40.0, 20.0);
        // first band: 50 - (-10) = 60, second band: 10 - (-10) = 20
        assert_eq!(lower.spacing_above(&upper), 60.0);
    }

    #[test]
    fn spacing_above_is_zero_floored() {
        let upper = Outline::for_rectangle(10.0, 10.0);
        let mut lower = Outline::for_rectangle(10.0, 10.0);
        lower.translate(0.0, 500.0);
        assert_eq!(lower.spacing_above(&upper), 0.0);
    }

    #[test]
    fn stack_below_adds_margin() {
        let upper = Outline::for_rectangle(100.0, 40.0);
        let mut lower = Outline::for_rectangle(100.0, 40.0);
        let shift = lower.stack_below(&upper, 15.0);
        assert_eq!(shift, 55.0);
        assert_eq!(lower.top()[0].offset, 35.0);
        assert_eq!(lower.spacing_above(&upper), 0.0);
    }

    #[test]
    fn indent_prepends_gap_and_widens() {
        let mut outline = Outline::for_rectangle(10.0, 10.0);
        outline.indent(5.0, 2.0);
        assert_eq!(outline.width(), 15.0);
        assert_eq!(outline.top()[1], Segment { offset: -7.0, length: 10.0 });
        assert_eq!(outline.bottom()[1], Segment { offset: 7.0, length: 10.0 });
        assert_eq!(outline.initial_height(), 14.0);
    }

    #[test]
    fn translate_with_negative_dx_trims_leading_bands() {
        let mut outline = Outline::for_rectangle(10.0, 10.0);
        outline.combine_horizontally(&Outline::for_rectangle(10.0, 30.0));
        outline.translate(-15.0, 0.0);
        assert_eq!(outline.width(), 5.0);
        assert_eq!(outline.top(), &[Segment { offset: -15.0, length: 5.0 }]);
    }

    #[test]
    fn merge_takes_envelope_and_keeps_longer_tail() {
        let short_tall = Outline::for_rectangle(10.0, 40.0);
        let long_flat = Outline::for_rectangle(30.0, 10.0);
        let merged = short_tall.merge(&long_flat);
        assert_eq!(
            merged.top(),
            &[
                Segment { offset: -20.0, length: 10.0 },
                Segment { offset: -5.0, length: 20.0 }
            ]
        );
        assert_eq!(merged.width(), 30.0);
        assert_eq!(merged.initial_height(), 40.0);
    }

    #[test]
    fn gaps_do_not_contribute_to_bounds() {
        let mut outline = Outline::gap(25.0);
        outline.combine_horizontally(&Outline::for_rectangle(10.0, 8.0));
        let bounds = outline.bounds();
        assert_eq!(bounds.min_y, -4.0);
        assert_eq!(bounds.max_y, 4.0);
        assert_eq!(bounds.width, 35.0);
    }

    #[test]
    fn zero_size_rectangle_is_empty() {
        let outline = Outline::for_rectangle(0.0, 0.0);
        assert!(outline.is_empty());
        assert_eq!(outline.initial_height(), 0.0);
    }
}
