//! Corner table connectivity.
//!
//! Corner `c` belongs to face `c / 3`; `next` and `prev` rotate within the
//! face. `opposite(c)` is the corner across the edge spanned by
//! `(vertex(next(c)), vertex(prev(c)))`, or `None` on a boundary. The table
//! is built in O(V + F) from a directed-edge map, which assumes a
//! consistently wound face list; the encoder's preparation pass and the
//! connectivity decoder both guarantee that. On unexpected collisions the
//! first insertion wins, keeping construction deterministic, and the stray
//! corner simply stays unmatched.

use std::collections::HashMap;

/// Connectivity queries over an immutable face list.
pub(crate) struct CornerTable {
    corner_to_vertex: Vec<u32>,
    opposites: Vec<Option<u32>>,
}

impl CornerTable {
    pub fn new(faces: &[[u32; 3]]) -> Self {
        let num_corners = faces.len() * 3;
        let mut corner_to_vertex = Vec::with_capacity(num_corners);
        for face in faces {
            corner_to_vertex.extend_from_slice(face);
        }

        // Directed edge (vertex(next(c)), vertex(prev(c))) -> c.
        let mut edge_to_corner: HashMap<(u32, u32), u32> = HashMap::with_capacity(num_corners);
        for c in 0..num_corners {
            let key = (
                corner_to_vertex[Self::next_of(c)],
                corner_to_vertex[Self::prev_of(c)],
            );
            edge_to_corner.entry(key).or_insert(c as u32);
        }

        let mut opposites = vec![None; num_corners];
        for c in 0..num_corners {
            let reversed = (
                corner_to_vertex[Self::prev_of(c)],
                corner_to_vertex[Self::next_of(c)],
            );
            if let Some(&o) = edge_to_corner.get(&reversed) {
                opposites[c] = Some(o);
            }
        }

        Self {
            corner_to_vertex,
            opposites,
        }
    }

    fn next_of(c: usize) -> usize {
        if c % 3 == 2 {
            c - 2
        } else {
            c + 1
        }
    }

    fn prev_of(c: usize) -> usize {
        if c % 3 == 0 {
            c + 2
        } else {
            c - 1
        }
    }

    pub fn num_corners(&self) -> usize {
        self.corner_to_vertex.len()
    }

    pub fn vertex(&self, c: usize) -> u32 {
        self.corner_to_vertex[c]
    }

    pub fn next(&self, c: usize) -> usize {
        Self::next_of(c)
    }

    pub fn prev(&self, c: usize) -> usize {
        Self::prev_of(c)
    }

    pub fn opposite(&self, c: usize) -> Option<usize> {
        self.opposites[c].map(|o| o as usize)
    }
}
