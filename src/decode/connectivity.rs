//! Connectivity decoding.
//!
//! The edgebreaker path replays the encoder's traversal through the shared
//! border machine: symbols drive the same splices the encoder performed, so
//! faces and vertex ids come out in first-visit order with no look-ahead.
//! Synthetic hole-closure vertices are stripped afterwards using the dummy
//! id list from the stream. The sequential path reads the face list
//! verbatim.

use super::Err;
use crate::core::buffer::BufferReader;
use crate::decode::entropy::decode_symbols;
use crate::shared::connectivity::edgebreaker::{Border, Symbol, SYMBOL_ALPHABET};
use crate::shared::connectivity::Method;
use crate::utils::bit_coder::leb128_read;

const UNASSIGNED: u32 = u32::MAX;

pub(crate) fn decode_connectivity(
    reader: &mut BufferReader,
    num_vertices: usize,
    num_faces: usize,
    method: Method,
) -> Result<Vec<[u32; 3]>, Err> {
    match method {
        Method::Sequential => decode_sequential(reader, num_vertices, num_faces),
        Method::Edgebreaker => decode_edgebreaker(reader, num_vertices, num_faces),
    }
}

fn decode_sequential(
    reader: &mut BufferReader,
    num_vertices: usize,
    num_faces: usize,
) -> Result<Vec<[u32; 3]>, Err> {
    let mut faces = Vec::new();
    for _ in 0..num_faces {
        let mut f = [0_u32; 3];
        for slot in &mut f {
            let v = leb128_read(reader)?;
            if v >= num_vertices as u64 {
                return Err(Err::CorruptStream("face index out of range"));
            }
            *slot = v as u32;
        }
        if f[0] == f[1] || f[1] == f[2] || f[0] == f[2] {
            return Err(Err::CorruptStream("decoded face is degenerate"));
        }
        faces.push(f);
    }
    Ok(faces)
}

fn decode_edgebreaker(
    reader: &mut BufferReader,
    num_vertices: usize,
    num_faces: usize,
) -> Result<Vec<[u32; 3]>, Err> {
    let closed_faces = leb128_read(reader)? as usize;
    // Hole closure adds at most one face per boundary edge, and a face has
    // three edges, so the closed mesh never exceeds four times the real one.
    if closed_faces < num_faces || closed_faces > num_faces.saturating_mul(4) {
        return Err(Err::CorruptStream("closed face count out of range"));
    }
    let num_symbols = leb128_read(reader)? as usize;
    if num_symbols > closed_faces {
        return Err(Err::CorruptStream("more symbols than faces"));
    }
    let symbol_ids = decode_symbols(reader, num_symbols, SYMBOL_ALPHABET)?;
    let mut symbols = Vec::with_capacity(symbol_ids.len());
    for id in symbol_ids {
        symbols.push(
            Symbol::from_id(id).ok_or(Err::CorruptStream("unknown traversal symbol"))?,
        );
    }

    let mut border = Border::new();
    let mut faces_m: Vec<[u32; 3]> = Vec::new();
    let mut next_id: u32 = 0;
    let mut si = 0;
    while faces_m.len() < closed_faces {
        if border.gate().is_none() {
            // A fresh component: the seed face gets three new vertices.
            border
                .init(next_id, next_id + 1, next_id + 2)
                .map_err(|_| Err::CorruptStream("component restart with a live border"))?;
            faces_m.push([next_id, next_id + 1, next_id + 2]);
            next_id += 3;
            continue;
        }
        if si == symbols.len() {
            return Err(Err::CorruptStream("symbol stream ends mid-component"));
        }
        let sym = symbols[si];
        si += 1;
        let (vg, vgn) = border
            .gate_edge()
            .map_err(|_| Err::CorruptStream("gate edge unavailable"))?;
        let invalid = |_| Err::CorruptStream("symbol invalid for the border shape");
        let w = match sym {
            Symbol::C => {
                let w = next_id;
                next_id += 1;
                border.apply_c(w).map_err(invalid)?;
                w
            }
            Symbol::R => border.apply_r().map_err(invalid)?,
            Symbol::L => border.apply_l().map_err(invalid)?,
            Symbol::E => border.apply_e().map_err(invalid)?,
            Symbol::S => {
                let offset = leb128_read(reader)?;
                border.apply_s(offset).map_err(invalid)?
            }
            Symbol::H => {
                let pos = leb128_read(reader)?;
                let offset = leb128_read(reader)?;
                border.apply_h(pos, offset).map_err(invalid)?
            }
        };
        faces_m.push([vg, vgn, w]);
    }
    if si != symbols.len() {
        return Err(Err::CorruptStream("unconsumed traversal symbols"));
    }
    if border.gate().is_some() || border.stack_len() != 0 {
        return Err(Err::CorruptStream("border not closed at end of stream"));
    }

    let num_dummies = leb128_read(reader)? as usize;
    if num_dummies > next_id as usize {
        return Err(Err::CorruptStream("dummy count out of range"));
    }
    let mut remap = vec![0_u32; next_id as usize];
    let mut prev: Option<u64> = None;
    for _ in 0..num_dummies {
        let id = leb128_read(reader)?;
        if id >= u64::from(next_id) || prev.is_some_and(|p| id <= p) {
            return Err(Err::CorruptStream("dummy ids not ascending in range"));
        }
        remap[id as usize] = UNASSIGNED;
        prev = Some(id);
    }
    let mut assigned = 0_u32;
    for slot in remap.iter_mut() {
        if *slot != UNASSIGNED {
            *slot = assigned;
            assigned += 1;
        }
    }
    let num_unreferenced = leb128_read(reader)? as usize;

    let faces: Vec<[u32; 3]> = faces_m
        .iter()
        .filter_map(|f| {
            let mapped = [
                remap[f[0] as usize],
                remap[f[1] as usize],
                remap[f[2] as usize],
            ];
            if mapped.contains(&UNASSIGNED) {
                None
            } else {
                Some(mapped)
            }
        })
        .collect();
    if faces.len() != num_faces {
        return Err(Err::CorruptStream("face count does not match the header"));
    }
    if assigned as usize + num_unreferenced != num_vertices {
        return Err(Err::CorruptStream("vertex count does not match the header"));
    }
    Ok(faces)
}
