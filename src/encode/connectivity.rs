//! Connectivity encoding.
//!
//! The edgebreaker path first prepares the face list: degenerate faces are
//! rejected, non-manifold edges and vertices are rejected or repaired by
//! vertex duplication depending on the policy, windings are made consistent
//! per component, and every boundary loop is closed with a synthetic vertex
//! plus a triangle fan. The prepared mesh is a closed oriented 2-manifold,
//! which the shared border machine then eats face by face, producing the
//! symbol stream and the decode-order face list.
//!
//! The sequential path writes the face list verbatim as leb128 indices and
//! accepts arbitrary topology.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::encode::entropy::{self, encode_symbols};
use crate::shared::connectivity::edgebreaker::{Border, Symbol, SYMBOL_ALPHABET};
use crate::shared::connectivity::{Method, NonManifoldPolicy};
use crate::utils::bit_coder::leb128_write;

const UNASSIGNED: u32 = u32::MAX;

#[remain::sorted]
#[derive(Error, Debug)]
pub enum Err {
    #[error("face {face} repeats a vertex index")]
    DegenerateFace { face: usize },
    #[error("entropy coding failed: {0}")]
    EntropyError(#[from] entropy::Err),
    #[error("traversal invariant broken: {0}")]
    Internal(&'static str),
    #[error("non-manifold input: {0}")]
    NonManifold(String),
    #[error("the mesh contains a non-orientable component")]
    NonOrientable,
}

/// Everything the rest of the encoder needs after connectivity coding.
pub(crate) struct ConnectivityOut {
    /// Serialized connectivity section.
    pub section: Vec<u8>,
    /// Faces as the decoder will see them (decode-order ids).
    pub faces: Vec<[u32; 3]>,
    /// Decoded vertex id -> vertex of the input mesh supplying its values.
    pub order: Vec<u32>,
}

pub(crate) fn encode_connectivity(
    faces: &[[u32; 3]],
    num_vertices: usize,
    method: Method,
    policy: NonManifoldPolicy,
) -> Result<ConnectivityOut, Err> {
    for (i, f) in faces.iter().enumerate() {
        if f[0] == f[1] || f[1] == f[2] || f[0] == f[2] {
            return Err(Err::DegenerateFace { face: i });
        }
    }
    match method {
        Method::Sequential => encode_sequential(faces, num_vertices),
        Method::Edgebreaker => encode_edgebreaker(faces, num_vertices, policy),
    }
}

fn encode_sequential(faces: &[[u32; 3]], num_vertices: usize) -> Result<ConnectivityOut, Err> {
    let mut section = Vec::new();
    for f in faces {
        for &v in f {
            leb128_write(u64::from(v), &mut section);
        }
    }
    Ok(ConnectivityOut {
        section,
        faces: faces.to_vec(),
        order: (0..num_vertices as u32).collect(),
    })
}

fn encode_edgebreaker(
    faces: &[[u32; 3]],
    num_vertices: usize,
    policy: NonManifoldPolicy,
) -> Result<ConnectivityOut, Err> {
    let mut prepared = Prepared {
        faces: faces.to_vec(),
        vertex_source: (0..num_vertices as u32).collect(),
    };
    repair_overloaded_edges(&mut prepared, policy)?;
    orient_components(&mut prepared.faces)?;
    repair_vertex_fans(&mut prepared, policy)?;
    let real_count = prepared.vertex_source.len();
    let num_dummies = close_holes(&mut prepared.faces, real_count as u32)?;

    let run = run_machine(&prepared.faces, real_count + num_dummies)?;

    // Strip the synthetic hole-closure vertices and reindex.
    let mut remap = vec![UNASSIGNED; run.visit_order.len()];
    let mut order_prepared: Vec<u32> = Vec::new();
    let mut dummy_machine_ids: Vec<u64> = Vec::new();
    for (mid, &orig) in run.visit_order.iter().enumerate() {
        if (orig as usize) < real_count {
            remap[mid] = order_prepared.len() as u32;
            order_prepared.push(orig);
        } else {
            dummy_machine_ids.push(mid as u64);
        }
    }
    let final_faces: Vec<[u32; 3]> = run
        .faces
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
    let num_referenced = order_prepared.len();
    for v in 0..real_count {
        if run.machine_id[v] == UNASSIGNED {
            order_prepared.push(v as u32);
        }
    }
    let num_unreferenced = order_prepared.len() - num_referenced;

    let mut section = Vec::new();
    leb128_write(run.faces.len() as u64, &mut section);
    leb128_write(run.symbols.len() as u64, &mut section);
    let symbol_ids: Vec<u32> = run.symbols.iter().map(|s| s.id()).collect();
    encode_symbols(&symbol_ids, SYMBOL_ALPHABET, &mut section)?;
    for &off in &run.offsets {
        leb128_write(off, &mut section);
    }
    leb128_write(dummy_machine_ids.len() as u64, &mut section);
    for &id in &dummy_machine_ids {
        leb128_write(id, &mut section);
    }
    leb128_write(num_unreferenced as u64, &mut section);

    let order = order_prepared
        .iter()
        .map(|&v| prepared.vertex_source[v as usize])
        .collect();
    Ok(ConnectivityOut {
        section,
        faces: final_faces,
        order,
    })
}

struct Prepared {
    faces: Vec<[u32; 3]>,
    /// Prepared vertex -> input vertex carrying its attribute values.
    vertex_source: Vec<u32>,
}

fn undirected(a: u32, b: u32) -> (u32, u32) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// An undirected edge may touch at most two faces. Extra faces either fail
/// encoding or get both endpoints duplicated, detaching them from the edge.
fn repair_overloaded_edges(prepared: &mut Prepared, policy: NonManifoldPolicy) -> Result<(), Err> {
    loop {
        let mut edges: BTreeMap<(u32, u32), Vec<usize>> = BTreeMap::new();
        for (i, f) in prepared.faces.iter().enumerate() {
            for e in 0..3 {
                edges
                    .entry(undirected(f[e], f[(e + 1) % 3]))
                    .or_default()
                    .push(i);
            }
        }
        let offender = edges.into_iter().find(|(_, faces)| faces.len() > 2);
        let Some(((a, b), face_list)) = offender else {
            return Ok(());
        };
        if policy == NonManifoldPolicy::Strict {
            return Err(Err::NonManifold(format!(
                "edge ({a}, {b}) is shared by {} faces",
                face_list.len()
            )));
        }
        for &fi in &face_list[2..] {
            for slot in 0..3 {
                let v = prepared.faces[fi][slot];
                if v == a || v == b {
                    let dup = prepared.vertex_source.len() as u32;
                    prepared
                        .vertex_source
                        .push(prepared.vertex_source[v as usize]);
                    prepared.faces[fi][slot] = dup;
                }
            }
        }
    }
}

fn contains_directed(face: &[u32; 3], a: u32, b: u32) -> bool {
    (face[0] == a && face[1] == b)
        || (face[1] == a && face[2] == b)
        || (face[2] == a && face[0] == b)
}

/// Flips faces so every component is consistently wound; fails on Moebius
/// strips and friends.
fn orient_components(faces: &mut [[u32; 3]]) -> Result<(), Err> {
    let mut edge_faces: HashMap<(u32, u32), Vec<usize>> = HashMap::new();
    for (i, f) in faces.iter().enumerate() {
        for e in 0..3 {
            edge_faces
                .entry(undirected(f[e], f[(e + 1) % 3]))
                .or_default()
                .push(i);
        }
    }
    let mut flip: Vec<Option<bool>> = vec![None; faces.len()];
    let mut queue: Vec<usize> = Vec::new();
    for seed in 0..faces.len() {
        if flip[seed].is_some() {
            continue;
        }
        flip[seed] = Some(false);
        queue.push(seed);
        while let Some(fi) = queue.pop() {
            let flipped = match flip[fi] {
                Some(x) => x,
                None => return Err(Err::Internal("unlabeled face in orientation queue")),
            };
            let face = faces[fi];
            for e in 0..3 {
                let (a, b) = (face[e], face[(e + 1) % 3]);
                let Some(neighbors) = edge_faces.get(&undirected(a, b)) else {
                    continue;
                };
                for &ni in neighbors {
                    if ni == fi {
                        continue;
                    }
                    // This face effectively contains (a -> b) iff not
                    // flipped; the neighbor must contain the reverse.
                    let this_dir = !flipped;
                    let raw_same = contains_directed(&faces[ni], a, b);
                    let need = raw_same == this_dir;
                    match flip[ni] {
                        None => {
                            flip[ni] = Some(need);
                            queue.push(ni);
                        }
                        Some(existing) if existing != need => {
                            return Err(Err::NonOrientable);
                        }
                        Some(_) => {}
                    }
                }
            }
        }
    }
    for (fi, face) in faces.iter_mut().enumerate() {
        if flip[fi] == Some(true) {
            face.swap(1, 2);
        }
    }
    Ok(())
}

/// A vertex whose incident faces form more than one edge-connected fan is a
/// pinch point; extra fans either fail encoding or move to a duplicate.
fn repair_vertex_fans(prepared: &mut Prepared, policy: NonManifoldPolicy) -> Result<(), Err> {
    loop {
        let num_vertices = prepared.vertex_source.len();
        let mut incident: Vec<Vec<usize>> = vec![Vec::new(); num_vertices];
        for (i, f) in prepared.faces.iter().enumerate() {
            for &v in f {
                incident[v as usize].push(i);
            }
        }
        let mut repaired_any = false;
        for v in 0..num_vertices as u32 {
            let faces_v = &incident[v as usize];
            if faces_v.len() <= 1 {
                continue;
            }
            let groups = fan_groups(&prepared.faces, faces_v, v);
            if groups.len() <= 1 {
                continue;
            }
            if policy == NonManifoldPolicy::Strict {
                return Err(Err::NonManifold(format!(
                    "vertex {v} joins {} disconnected fans",
                    groups.len()
                )));
            }
            for group in groups.iter().skip(1) {
                let dup = prepared.vertex_source.len() as u32;
                prepared
                    .vertex_source
                    .push(prepared.vertex_source[v as usize]);
                for &fi in group {
                    for slot in 0..3 {
                        if prepared.faces[fi][slot] == v {
                            prepared.faces[fi][slot] = dup;
                        }
                    }
                }
            }
            repaired_any = true;
            // Duplication can reveal new pinches at neighboring vertices;
            // restart with fresh incidence.
            break;
        }
        if !repaired_any {
            return Ok(());
        }
    }
}

/// Splits the faces incident to `v` into fans connected through shared
/// edges at `v`.
fn fan_groups(faces: &[[u32; 3]], faces_v: &[usize], v: u32) -> Vec<Vec<usize>> {
    let mut parent: Vec<usize> = (0..faces_v.len()).collect();
    fn find(parent: &mut Vec<usize>, i: usize) -> usize {
        if parent[i] != i {
            let root = find(parent, parent[i]);
            parent[i] = root;
        }
        parent[i]
    }
    let mut edge_owner: HashMap<(u32, u32), usize> = HashMap::new();
    for (local, &fi) in faces_v.iter().enumerate() {
        let f = faces[fi];
        for e in 0..3 {
            let (a, b) = (f[e], f[(e + 1) % 3]);
            if a != v && b != v {
                continue;
            }
            let other = if a == v { b } else { a };
            match edge_owner.get(&(v, other)) {
                Some(&first) => {
                    let ra = find(&mut parent, first);
                    let rb = find(&mut parent, local);
                    parent[ra] = rb;
                }
                None => {
                    edge_owner.insert((v, other), local);
                }
            }
        }
    }
    let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for local in 0..faces_v.len() {
        let root = find(&mut parent, local);
        groups.entry(root).or_default().push(faces_v[local]);
    }
    groups.into_values().collect()
}

/// Adds one synthetic vertex per boundary loop plus a fan of faces so the
/// mesh becomes closed. Synthetic ids start at `first_dummy`; returns how
/// many were added.
fn close_holes(faces: &mut Vec<[u32; 3]>, first_dummy: u32) -> Result<usize, Err> {
    let mut present: HashMap<(u32, u32), ()> = HashMap::new();
    for f in faces.iter() {
        for e in 0..3 {
            present.insert((f[e], f[(e + 1) % 3]), ());
        }
    }
    // Missing reversals, keyed by their start vertex so loops walk
    // deterministically.
    let mut missing: BTreeMap<u32, u32> = BTreeMap::new();
    for f in faces.iter() {
        for e in 0..3 {
            let (a, b) = (f[e], f[(e + 1) % 3]);
            if !present.contains_key(&(b, a)) && missing.insert(b, a).is_some() {
                return Err(Err::Internal("boundary vertex with two outgoing edges"));
            }
        }
    }
    let mut next_dummy = first_dummy;
    while let Some((&start, _)) = missing.iter().next() {
        let dummy = next_dummy;
        next_dummy += 1;
        let mut cur = start;
        loop {
            let Some(nxt) = missing.remove(&cur) else {
                return Err(Err::Internal("boundary loop does not close"));
            };
            faces.push([cur, nxt, dummy]);
            cur = nxt;
            if cur == start {
                break;
            }
        }
    }
    Ok((next_dummy - first_dummy) as usize)
}

struct MachineRun {
    symbols: Vec<Symbol>,
    offsets: Vec<u64>,
    /// Decode-order faces in machine-id space, dummies included.
    faces: Vec<[u32; 3]>,
    /// Machine id -> prepared vertex.
    visit_order: Vec<u32>,
    /// Prepared vertex -> machine id, `UNASSIGNED` when never visited.
    machine_id: Vec<u32>,
}

fn third_vertex(face: &[u32; 3], a: u32, b: u32) -> Result<u32, Err> {
    for e in 0..3 {
        if face[e] == a && face[(e + 1) % 3] == b {
            return Ok(face[(e + 2) % 3]);
        }
    }
    Err(Err::Internal("face does not contain the directed edge"))
}

/// Drives the border machine over a closed oriented manifold.
fn run_machine(faces: &[[u32; 3]], num_vertices: usize) -> Result<MachineRun, Err> {
    let mut dir_face: HashMap<(u32, u32), u32> = HashMap::with_capacity(faces.len() * 3);
    for (i, f) in faces.iter().enumerate() {
        for e in 0..3 {
            if dir_face
                .insert((f[e], f[(e + 1) % 3]), i as u32)
                .is_some()
            {
                return Err(Err::Internal("directed edge shared after preparation"));
            }
        }
    }

    let mut run = MachineRun {
        symbols: Vec::with_capacity(faces.len()),
        offsets: Vec::new(),
        faces: Vec::with_capacity(faces.len()),
        visit_order: Vec::with_capacity(num_vertices),
        machine_id: vec![UNASSIGNED; num_vertices],
    };
    let mut visited = vec![false; faces.len()];
    let mut border = Border::new();
    // Directed border edge (by vertex pair) -> its source node.
    let mut border_out: HashMap<(u32, u32), u32> = HashMap::new();

    let mut assign = |run: &mut MachineRun, v: u32| {
        if run.machine_id[v as usize] == UNASSIGNED {
            run.machine_id[v as usize] = run.visit_order.len() as u32;
            run.visit_order.push(v);
        }
    };

    for seed in 0..faces.len() {
        if visited[seed] {
            continue;
        }
        let [a, b, c] = faces[seed];
        border
            .init(a, b, c)
            .map_err(|_| Err::Internal("component restart with a live border"))?;
        visited[seed] = true;
        assign(&mut run, a);
        assign(&mut run, b);
        assign(&mut run, c);
        run.faces.push([
            run.machine_id[a as usize],
            run.machine_id[b as usize],
            run.machine_id[c as usize],
        ]);
        {
            let g = border.gate().ok_or(Err::Internal("gate vanished after init"))?;
            let nc = border.next_node(g);
            let nb = border.next_node(nc);
            border_out.insert((a, c), g);
            border_out.insert((c, b), nc);
            border_out.insert((b, a), nb);
        }

        while let Some(g) = border.gate() {
            let (vg, vgn) = border
                .gate_edge()
                .map_err(|_| Err::Internal("gate edge unavailable"))?;
            let f = *dir_face
                .get(&(vg, vgn))
                .ok_or(Err::Internal("gate edge has no face"))?;
            let fi = f as usize;
            if visited[fi] {
                return Err(Err::Internal("face across the gate already visited"));
            }
            visited[fi] = true;
            let w = third_vertex(&faces[fi], vg, vgn)?;
            let gn = border.next_node(g);

            if run.machine_id[w as usize] == UNASSIGNED {
                run.symbols.push(Symbol::C);
                border
                    .apply_c(w)
                    .map_err(|_| Err::Internal("C splice failed"))?;
                let n = border.gate().ok_or(Err::Internal("gate vanished after C"))?;
                border_out.remove(&(vg, vgn));
                border_out.insert((vg, w), g);
                border_out.insert((w, vgn), n);
                assign(&mut run, w);
            } else {
                // Rotate around w, starting across the edge (w, vg), until a
                // visited face marks the border edge bounding this sector.
                let mut x = vg;
                let mut guard = 0;
                loop {
                    let f2 = *dir_face
                        .get(&(x, w))
                        .ok_or(Err::Internal("open edge during rotation"))?;
                    if visited[f2 as usize] {
                        break;
                    }
                    x = third_vertex(&faces[f2 as usize], x, w)?;
                    guard += 1;
                    if guard > faces.len() {
                        return Err(Err::Internal("rotation around a vertex did not terminate"));
                    }
                }
                let m = *border_out
                    .get(&(w, x))
                    .ok_or(Err::Internal("border edge not tracked"))?;
                let p = border.prev_node(g);
                let nn = border.next_node(gn);
                let triangle = border
                    .is_triangle()
                    .map_err(|_| Err::Internal("triangle test without a gate"))?;

                if triangle && m == nn {
                    run.symbols.push(Symbol::E);
                    border
                        .apply_e()
                        .map_err(|_| Err::Internal("E splice failed"))?;
                    border_out.remove(&(vg, vgn));
                    border_out.remove(&(vgn, w));
                    border_out.remove(&(w, vg));
                } else if m == p {
                    run.symbols.push(Symbol::L);
                    border
                        .apply_l()
                        .map_err(|_| Err::Internal("L splice failed"))?;
                    border_out.remove(&(vg, vgn));
                    border_out.remove(&(w, vg));
                    border_out.insert((w, vgn), p);
                } else if m == nn {
                    run.symbols.push(Symbol::R);
                    border
                        .apply_r()
                        .map_err(|_| Err::Internal("R splice failed"))?;
                    border_out.remove(&(vg, vgn));
                    border_out.remove(&(vgn, w));
                    border_out.insert((vg, w), g);
                } else if let Some(k) = border.find_on_active(m) {
                    run.symbols.push(Symbol::S);
                    run.offsets.push(k);
                    let v_mn = border.vert(border.next_node(m));
                    border
                        .apply_s(k)
                        .map_err(|_| Err::Internal("S splice failed"))?;
                    let m1 = border
                        .stack_top()
                        .ok_or(Err::Internal("split did not push a cycle"))?;
                    let m2 = border.next_node(g);
                    border_out.remove(&(vg, vgn));
                    border_out.insert((vg, w), g);
                    border_out.insert((w, vgn), m1);
                    border_out.insert((w, v_mn), m2);
                } else if let Some((pos, k)) = border.find_on_stack(m) {
                    run.symbols.push(Symbol::H);
                    run.offsets.push(pos);
                    run.offsets.push(k);
                    let v_mn = border.vert(border.next_node(m));
                    border
                        .apply_h(pos, k)
                        .map_err(|_| Err::Internal("H splice failed"))?;
                    let m1 = border.next_node(g);
                    let m2 = border.prev_node(gn);
                    border_out.remove(&(vg, vgn));
                    border_out.insert((vg, w), g);
                    border_out.insert((w, v_mn), m1);
                    border_out.insert((w, vgn), m2);
                } else {
                    return Err(Err::Internal("tip vertex not on any border cycle"));
                }
            }
            run.faces.push([
                run.machine_id[vg as usize],
                run.machine_id[vgn as usize],
                run.machine_id[w as usize],
            ]);
        }
        if !border_out.is_empty() {
            return Err(Err::Internal("border edges left over after a component"));
        }
    }
    Ok(run)
}
