use crate::geometry::Point;

/// Static 2D KD-tree over pixel locations.
///
/// Stored implicitly: each sub-slice keeps its splitting element at the
/// middle, with smaller coordinates on the left and larger on the right.
/// Splitting alternates between x (even depth) and y (odd depth).
#[derive(Debug, Clone, Default)]
pub struct KdTree {
    items: Vec<(Point, usize)>,
}

fn axis(p: Point, depth: usize) -> f64 {
    if depth % 2 == 0 {
        p.x
    } else {
        p.y
    }
}

impl KdTree {
    pub fn build(points: impl IntoIterator<Item = (Point, usize)>) -> Self {
        let mut items: Vec<(Point, usize)> = points.into_iter().collect();
        Self::build_recursive(&mut items, 0);
        Self { items }
    }

    fn build_recursive(items: &mut [(Point, usize)], depth: usize) {
        if items.len() <= 1 {
            return;
        }
        let mid = items.len() / 2;
        items.select_nth_unstable_by(mid, |a, b| axis(a.0, depth).total_cmp(&axis(b.0, depth)));
        let (left, right) = items.split_at_mut(mid);
        Self::build_recursive(left, depth + 1);
        Self::build_recursive(&mut right[1..], depth + 1);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Ids of every point within `radius` of `center`, boundary included,
    /// in ascending order.
    pub fn query_radius(&self, center: Point, radius: f64) -> Vec<usize> {
        let mut out = Vec::new();
        if radius >= 0.0 {
            Self::radius_recursive(&self.items, center, radius, 0, &mut out);
        }
        out.sort_unstable();
        out
    }

    fn radius_recursive(
        items: &[(Point, usize)],
        center: Point,
        radius: f64,
        depth: usize,
        out: &mut Vec<usize>,
    ) {
        if items.is_empty() {
            return;
        }
        let mid = items.len() / 2;
        let (point, id) = items[mid];
        if point.distance_squared(center) <= radius * radius {
            out.push(id);
        }

        let diff = axis(center, depth) - axis(point, depth);
        if diff <= radius {
            Self::radius_recursive(&items[..mid], center, radius, depth + 1, out);
        }
        if diff >= -radius {
            Self::radius_recursive(&items[mid + 1..], center, radius, depth + 1, out);
        }
    }

    /// Closest point to `target` as `(id, distance)`.
    pub fn nearest(&self, target: Point) -> Option<(usize, f64)> {
        if self.is_empty() {
            return None;
        }
        let mut best = None;
        Self::nearest_recursive(&self.items, target, 0, &mut best);
        best.map(|(id, d2): (usize, f64)| (id, d2.sqrt()))
    }

    fn nearest_recursive(
        items: &[(Point, usize)],
        target: Point,
        depth: usize,
        best: &mut Option<(usize, f64)>,
    ) {
        if items.is_empty() {
            return;
        }
        let mid = items.len() / 2;
        let (point, id) = items[mid];
        let d2 = point.distance_squared(target);
        if best.map_or(true, |(_, b)| d2 < b) {
            *best = Some((id, d2));
        }

        let diff = axis(target, depth) - axis(point, depth);
        let (near, far) = if diff <= 0.0 {
            (&items[..mid], &items[mid + 1..])
        } else {
            (&items[mid + 1..], &items[..mid])
        };
        Self::nearest_recursive(near, target, depth + 1, best);
        if best.map_or(true, |(_, b)| diff * diff <= b) {
            Self::nearest_recursive(far, target, depth + 1, best);
        }
    }
}
