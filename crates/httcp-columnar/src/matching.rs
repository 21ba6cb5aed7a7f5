//! ΔR matching between two per-event object collections.

use httcp_core::{Error, Result};

use crate::jagged::Jagged;
use crate::vector::Directional;

/// Default ΔR threshold for trigger object matching.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.5;

/// Default reduction axis: reduce over the second collection, one decision per
/// object of the first collection.
pub const DEFAULT_MATCH_AXIS: usize = 2;

/// Full per-event ΔR combinatorics between two collections.
///
/// For event `e` with `n1` left and `n2` right objects the table holds
/// `n1 * n2` values, row-major (left index outer).
#[derive(Debug, Clone, PartialEq)]
pub struct MetricTable {
    n_left: Vec<usize>,
    n_right: Vec<usize>,
    values: Jagged<f64>,
}

impl MetricTable {
    /// Number of events.
    pub fn n_events(&self) -> usize {
        self.n_left.len()
    }

    /// Flattened `n1 * n2` table of event `row`.
    pub fn event(&self, row: usize) -> &[f64] {
        self.values.event(row)
    }

    /// ΔR between left object `i` and right object `j` of event `row`.
    pub fn get(&self, row: usize, i: usize, j: usize) -> Option<f64> {
        if i >= *self.n_left.get(row)? || j >= self.n_right[row] {
            return None;
        }
        Some(self.values.event(row)[i * self.n_right[row] + j])
    }

    /// Reduce `value < threshold` with "any" over one axis of the table.
    ///
    /// Axis 2 reduces over the right collection (result shaped like the left
    /// collection), axis 1 over the left collection (result shaped like the
    /// right collection). Axis 0 would cross events and is rejected.
    pub fn any_below(&self, threshold: f64, axis: usize) -> Result<Jagged<bool>> {
        let (outer, inner) = match axis {
            2 => (&self.n_left, &self.n_right),
            1 => (&self.n_right, &self.n_left),
            _ => {
                return Err(Error::Shape(format!(
                    "axis={axis} exceeds the reducible depth of a metric table (expected 1 or 2)"
                )));
            }
        };

        let mut flat = Vec::with_capacity(outer.iter().sum());
        let mut offsets = Vec::with_capacity(self.n_events() + 1);
        offsets.push(0);
        for (row, (&n_out, &n_in)) in outer.iter().zip(inner).enumerate() {
            let table = self.values.event(row);
            let n_cols = self.n_right[row];
            for a in 0..n_out {
                let hit = (0..n_in).any(|b| {
                    let (i, j) = if axis == 2 { (a, b) } else { (b, a) };
                    table[i * n_cols + j] < threshold
                });
                flat.push(hit);
            }
            offsets.push(flat.len());
        }
        Jagged::new(flat, offsets)
    }
}

/// ΔR between every pair of objects of the same event.
pub fn metric_table<A, B>(left: &Jagged<A>, right: &Jagged<B>) -> Result<MetricTable>
where
    A: Directional,
    B: Directional,
{
    if left.n_events() != right.n_events() {
        return Err(Error::Shape(format!(
            "metric table: {} vs {} events",
            left.n_events(),
            right.n_events()
        )));
    }

    let n_left = left.counts();
    let n_right = right.counts();
    let mut flat = Vec::with_capacity(n_left.iter().zip(&n_right).map(|(a, b)| a * b).sum());
    let mut offsets = Vec::with_capacity(left.n_events() + 1);
    offsets.push(0);
    for (l_ev, r_ev) in left.iter().zip(right.iter()) {
        for a in l_ev {
            flat.extend(r_ev.iter().map(|b| a.delta_r(b)));
        }
        offsets.push(flat.len());
    }

    Ok(MetricTable { n_left, n_right, values: Jagged::new(flat, offsets)? })
}

/// For each object in `vectors1`, whether at least one object of `vectors2` in
/// the same event lies within ΔR `< threshold`.
///
/// `axis` selects the reduction axis of the pairwise table (see
/// [`MetricTable::any_below`]); [`DEFAULT_MATCH_AXIS`] yields one decision per
/// object of `vectors1`.
pub fn trigger_object_matching<A, B>(
    vectors1: &Jagged<A>,
    vectors2: &Jagged<B>,
    threshold: f64,
    axis: usize,
) -> Result<Jagged<bool>>
where
    A: Directional,
    B: Directional,
{
    let dr = metric_table(vectors1, vectors2)?;
    dr.any_below(threshold, axis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::PtEtaPhiM;
    use approx::assert_abs_diff_eq;

    fn v(eta: f64, phi: f64) -> PtEtaPhiM {
        PtEtaPhiM::new(30.0, eta, phi, 0.0)
    }

    #[test]
    fn table_shape_and_values() {
        let l = Jagged::from_nested(vec![vec![v(0.0, 0.0), v(1.0, 0.0)], vec![]]);
        let r = Jagged::from_nested(vec![vec![v(0.0, 0.3), v(0.0, 0.0), v(2.0, 0.0)], vec![v(0.0, 0.0)]]);
        let t = metric_table(&l, &r).unwrap();
        assert_eq!(t.n_events(), 2);
        assert_eq!(t.event(0).len(), 6);
        assert!(t.event(1).is_empty());
        assert_abs_diff_eq!(t.get(0, 0, 0).unwrap(), 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(t.get(0, 1, 2).unwrap(), 1.0, epsilon = 1e-12);
        assert!(t.get(0, 2, 0).is_none());
        assert!(t.get(5, 0, 0).is_none());
    }

    #[test]
    fn matching_per_left_object() {
        let taus = Jagged::from_nested(vec![
            vec![v(0.0, 0.0), v(1.5, 2.0)],
            vec![v(-1.0, 1.0)],
            vec![v(0.0, 0.0)],
        ]);
        let trig = Jagged::from_nested(vec![vec![v(0.1, 0.1)], vec![v(-1.0, 1.6)], vec![]]);
        let m = trigger_object_matching(&taus, &trig, DEFAULT_MATCH_THRESHOLD, DEFAULT_MATCH_AXIS)
            .unwrap();
        assert!(m.same_layout(&taus));
        assert_eq!(m.event(0), &[true, false]);
        assert_eq!(m.event(1), &[false]);
        // No partners: all false.
        assert_eq!(m.event(2), &[false]);
    }

    #[test]
    fn threshold_is_strict() {
        let a = Jagged::from_nested(vec![vec![v(0.0, 0.0)]]);
        let b = Jagged::from_nested(vec![vec![v(0.5, 0.0)]]);
        let m = trigger_object_matching(&a, &b, 0.5, 2).unwrap();
        assert_eq!(m.event(0), &[false]);
        let m = trigger_object_matching(&a, &b, 0.5000001, 2).unwrap();
        assert_eq!(m.event(0), &[true]);
    }

    #[test]
    fn axis_one_reduces_over_left() {
        let a = Jagged::from_nested(vec![vec![v(0.0, 0.0), v(3.0, 0.0)]]);
        let b = Jagged::from_nested(vec![vec![v(3.1, 0.0), v(-2.0, 0.0), v(0.0, 0.2)]]);
        let m = trigger_object_matching(&a, &b, 0.5, 1).unwrap();
        assert!(m.same_layout(&b));
        assert_eq!(m.event(0), &[true, false, true]);
    }

    #[test]
    fn invalid_axis_and_event_mismatch() {
        let a = Jagged::from_nested(vec![vec![v(0.0, 0.0)]]);
        let b = Jagged::from_nested(vec![vec![v(0.0, 0.0)]]);
        assert!(matches!(trigger_object_matching(&a, &b, 0.5, 0), Err(Error::Shape(_))));
        assert!(matches!(trigger_object_matching(&a, &b, 0.5, 3), Err(Error::Shape(_))));

        let c = Jagged::<PtEtaPhiM>::empty_events(2);
        assert!(matches!(trigger_object_matching(&a, &c, 0.5, 2), Err(Error::Shape(_))));
    }
}
