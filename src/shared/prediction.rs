//! Prediction for quantized attribute values.
//!
//! Values are coded vertex by vertex in traversal order. Each vertex gets a
//! prediction from already-coded neighbors; only the folded residual enters
//! the entropy coder. Both sides run the identical schemes over the identical
//! face order, so no side information is needed beyond the scheme choice
//! implied by the connectivity method.
//!
//! All residual arithmetic is modulo `2^bits`, with the sign folded into the
//! low bit so small corrections in either direction stay small.

use enum_dispatch::enum_dispatch;

use crate::core::corner_table::CornerTable;

/// Vertices in first-visit order over the decode-order face list, each with
/// the corner that introduced it. Vertices in no face come last, without a
/// corner.
pub(crate) fn traversal_order(faces: &[[u32; 3]], num_vertices: usize) -> Vec<(u32, Option<u32>)> {
    let mut seen = vec![false; num_vertices];
    let mut out = Vec::with_capacity(num_vertices);
    for (fi, f) in faces.iter().enumerate() {
        for (j, &v) in f.iter().enumerate() {
            if !seen[v as usize] {
                seen[v as usize] = true;
                out.push((v, Some((3 * fi + j) as u32)));
            }
        }
    }
    for (v, &was_seen) in seen.iter().enumerate() {
        if !was_seen {
            out.push((v as u32, None));
        }
    }
    out
}

/// Quantized values coded so far, shared by the encoder and decoder loops.
pub(crate) struct PredictionState {
    values: Vec<u32>,
    coded: Vec<bool>,
    last: Option<u32>,
    num_components: usize,
}

impl PredictionState {
    pub fn new(num_vertices: usize, num_components: usize) -> Self {
        Self {
            values: vec![0; num_vertices * num_components],
            coded: vec![false; num_vertices],
            last: None,
            num_components,
        }
    }

    pub fn set(&mut self, vertex: u32, values: &[u32]) {
        let base = vertex as usize * self.num_components;
        self.values[base..base + self.num_components].copy_from_slice(values);
        self.coded[vertex as usize] = true;
        self.last = Some(vertex);
    }

    fn get(&self, vertex: u32, component: usize) -> u32 {
        self.values[vertex as usize * self.num_components + component]
    }

    fn is_coded(&self, vertex: u32) -> bool {
        self.coded[vertex as usize]
    }
}

#[enum_dispatch]
pub(crate) trait PredictionScheme {
    /// Writes the predicted quantized values for the vertex introduced at
    /// `corner` into `out`.
    fn predict(&self, corner: Option<u32>, state: &PredictionState, out: &mut [u32]);
}

#[enum_dispatch(PredictionScheme)]
pub(crate) enum Prediction {
    MeshParallelogram(MeshParallelogramPrediction),
    Delta(DeltaPrediction),
}

/// Classic parallelogram rule: the new vertex completes the parallelogram
/// spanned by the already-coded face across the introducing edge. Falls back
/// to delta coding when that face is not fully coded yet.
pub(crate) struct MeshParallelogramPrediction {
    corners: CornerTable,
    modulus: u64,
}

impl MeshParallelogramPrediction {
    pub fn new(faces: &[[u32; 3]], bits: u8) -> Self {
        Self {
            corners: CornerTable::new(faces),
            modulus: 1_u64 << bits,
        }
    }
}

impl PredictionScheme for MeshParallelogramPrediction {
    fn predict(&self, corner: Option<u32>, state: &PredictionState, out: &mut [u32]) {
        if let Some(c) = corner {
            if let Some(o) = self.corners.opposite(c as usize) {
                let vo = self.corners.vertex(o);
                let vn = self.corners.vertex(self.corners.next(o));
                let vp = self.corners.vertex(self.corners.prev(o));
                if state.is_coded(vo) && state.is_coded(vn) && state.is_coded(vp) {
                    let mask = self.modulus - 1;
                    for (i, slot) in out.iter_mut().enumerate() {
                        let sum = u64::from(state.get(vn, i))
                            + u64::from(state.get(vp, i))
                            + self.modulus
                            - u64::from(state.get(vo, i));
                        *slot = (sum & mask) as u32;
                    }
                    return;
                }
            }
        }
        delta_predict(state, out);
    }
}

/// Predicts every vertex from the previously coded one, following the same
/// first-visit order over the face list as every other scheme. The only
/// scheme for sequential connectivity, where no corner structure is
/// transmitted.
pub(crate) struct DeltaPrediction;

impl PredictionScheme for DeltaPrediction {
    fn predict(&self, _corner: Option<u32>, state: &PredictionState, out: &mut [u32]) {
        delta_predict(state, out);
    }
}

fn delta_predict(state: &PredictionState, out: &mut [u32]) {
    match state.last {
        Some(last) => {
            for (i, slot) in out.iter_mut().enumerate() {
                *slot = state.get(last, i);
            }
        }
        None => out.fill(0),
    }
}

/// Folds a modular residual so that corrections of either sign map to small
/// non-negative integers.
pub(crate) fn fold_residual(actual: u32, predicted: u32, modulus: u64) -> u64 {
    let r = (u64::from(actual) + modulus - u64::from(predicted)) & (modulus - 1);
    if r < modulus / 2 {
        2 * r
    } else {
        2 * (modulus - r) - 1
    }
}

/// Inverse of [`fold_residual`].
pub(crate) fn unfold_residual(folded: u64, predicted: u32, modulus: u64) -> u32 {
    let r = if folded % 2 == 0 {
        folded / 2
    } else {
        modulus - (folded + 1) / 2
    };
    ((u64::from(predicted) + r) & (modulus - 1)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_is_invertible_across_the_modulus() {
        let modulus = 1_u64 << 10;
        for pred in [0_u32, 1, 511, 512, 1023] {
            for actual in [0_u32, 1, 511, 512, 1023] {
                let folded = fold_residual(actual, pred, modulus);
                assert!(folded < modulus);
                assert_eq!(unfold_residual(folded, pred, modulus), actual);
            }
        }
    }

    #[test]
    fn small_corrections_fold_small() {
        let modulus = 1_u64 << 14;
        assert_eq!(fold_residual(100, 100, modulus), 0);
        assert_eq!(fold_residual(101, 100, modulus), 2);
        assert_eq!(fold_residual(99, 100, modulus), 1);
        assert_eq!(fold_residual(103, 100, modulus), 6);
    }

    #[test]
    fn traversal_visits_in_face_order_and_appends_loose_vertices() {
        let faces = [[0_u32, 1, 2], [2, 1, 3]];
        let order = traversal_order(&faces, 6);
        assert_eq!(
            order,
            vec![
                (0, Some(0)),
                (1, Some(1)),
                (2, Some(2)),
                (3, Some(5)),
                (4, None),
                (5, None),
            ]
        );
    }

    #[test]
    fn parallelogram_is_exact_on_a_flat_grid() {
        // Quad 0-1-3-2 split into two triangles; quantized positions form an
        // exact parallelogram: q(3) = q(1) + q(2) - q(0).
        let faces = [[0_u32, 1, 2], [2, 1, 3]];
        let scheme = MeshParallelogramPrediction::new(&faces, 14);
        let mut state = PredictionState::new(4, 2);
        state.set(0, &[100, 100]);
        state.set(1, &[300, 100]);
        state.set(2, &[100, 250]);
        let order = traversal_order(&faces, 4);
        let (v, corner) = order[3];
        assert_eq!(v, 3);
        let mut out = [0_u32; 2];
        scheme.predict(corner, &state, &mut out);
        assert_eq!(out, [300, 250]);
    }

    #[test]
    fn parallelogram_falls_back_to_delta_on_the_seed_face() {
        let faces = [[0_u32, 1, 2], [2, 1, 3]];
        let scheme = MeshParallelogramPrediction::new(&faces, 14);
        let mut state = PredictionState::new(4, 1);
        let mut out = [0_u32; 1];
        // Nothing coded yet: zero prediction.
        scheme.predict(Some(0), &state, &mut out);
        assert_eq!(out, [0]);
        state.set(0, &[42]);
        // Second seed vertex: delta from the last coded one.
        scheme.predict(Some(1), &state, &mut out);
        assert_eq!(out, [42]);
    }

    #[test]
    fn delta_scheme_repeats_the_last_vertex() {
        let scheme = DeltaPrediction;
        let mut state = PredictionState::new(3, 3);
        let mut out = [0_u32; 3];
        scheme.predict(None, &state, &mut out);
        assert_eq!(out, [0, 0, 0]);
        state.set(0, &[7, 8, 9]);
        scheme.predict(None, &state, &mut out);
        assert_eq!(out, [7, 8, 9]);
    }
}
