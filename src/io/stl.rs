//! STL import and export.
//!
//! STL stores independent triangles, so import welds vertices that share
//! the exact same bit pattern back into shared indices. NaN coordinates are
//! repaired to zero and triangles that collapse under welding are skipped.
//! Export always writes the binary flavor.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::core::attribute::AttributeType;
use crate::core::buffer::{BufferReader, ByteWriter};
use crate::core::mesh::Mesh;

use super::Err;

pub fn read_stl(path: &Path) -> Result<Mesh, Err> {
    let bytes = fs::read(path)?;
    let triangles = if looks_ascii(&bytes) {
        parse_ascii(&bytes)?
    } else {
        parse_binary(&bytes)?
    };
    weld(triangles)
}

/// Binary STL also often begins with "solid"; require facet syntax too.
fn looks_ascii(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(512)];
    let Ok(text) = std::str::from_utf8(head) else {
        return false;
    };
    text.trim_start().starts_with("solid") && text.contains("facet")
}

fn parse_ascii(bytes: &[u8]) -> Result<Vec<[f32; 9]>, Err> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| Err::Parse("ascii stl is not valid utf-8".into()))?;
    let mut coords: Vec<f32> = Vec::new();
    for (ln, line) in text.lines().enumerate() {
        let mut tokens = line.split_whitespace();
        if tokens.next() != Some("vertex") {
            continue;
        }
        for _ in 0..3 {
            let token = tokens
                .next()
                .ok_or_else(|| Err::Parse(format!("line {}: vertex needs 3 coordinates", ln + 1)))?;
            let value: f32 = token
                .parse()
                .map_err(|_| Err::Parse(format!("line {}: bad coordinate {token:?}", ln + 1)))?;
            coords.push(value);
        }
    }
    if coords.len() % 9 != 0 {
        return Err(Err::Parse("vertex count is not a multiple of three".into()));
    }
    Ok(coords
        .chunks_exact(9)
        .map(|c| {
            let mut tri = [0.0_f32; 9];
            tri.copy_from_slice(c);
            tri
        })
        .collect())
}

fn parse_binary(bytes: &[u8]) -> Result<Vec<[f32; 9]>, Err> {
    let mut reader = BufferReader::new(bytes);
    reader
        .read_bytes(80)
        .map_err(|_| Err::Parse("binary stl shorter than its header".into()))?;
    let count = reader
        .read_u32()
        .map_err(|_| Err::Parse("binary stl missing the triangle count".into()))? as usize;
    let mut triangles = Vec::with_capacity(count);
    for _ in 0..count {
        let mut tri = [0.0_f32; 9];
        // Skip the stored normal; it is recomputed on export.
        for _ in 0..3 {
            reader
                .read_f32()
                .map_err(|_| Err::Parse("truncated triangle record".into()))?;
        }
        for v in tri.iter_mut() {
            *v = reader
                .read_f32()
                .map_err(|_| Err::Parse("truncated triangle record".into()))?;
        }
        reader
            .read_u16()
            .map_err(|_| Err::Parse("truncated triangle record".into()))?;
        triangles.push(tri);
    }
    Ok(triangles)
}

fn weld(triangles: Vec<[f32; 9]>) -> Result<Mesh, Err> {
    let mut positions: Vec<f32> = Vec::new();
    let mut faces: Vec<[u32; 3]> = Vec::new();
    let mut index: HashMap<[u32; 3], u32> = HashMap::new();
    for tri in &triangles {
        let mut face = [0_u32; 3];
        for (corner, chunk) in tri.chunks_exact(3).enumerate() {
            let p = [
                repair(chunk[0]),
                repair(chunk[1]),
                repair(chunk[2]),
            ];
            let key = [p[0].to_bits(), p[1].to_bits(), p[2].to_bits()];
            let next = (positions.len() / 3) as u32;
            face[corner] = *index.entry(key).or_insert_with(|| {
                positions.extend_from_slice(&p);
                next
            });
        }
        if face[0] != face[1] && face[1] != face[2] && face[0] != face[2] {
            faces.push(face);
        }
    }
    let mut builder = Mesh::builder();
    builder.add_attribute(AttributeType::Position, 3, positions);
    builder.set_connectivity(faces);
    Ok(builder.build()?)
}

fn repair(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v
    }
}

pub fn write_stl(mesh: &Mesh, path: &Path) -> Result<(), Err> {
    let positions = mesh
        .position_attribute()
        .ok_or_else(|| Err::Parse("mesh has no position attribute".into()))?;
    if positions.get_num_components() != 3 {
        return Err(Err::Parse("stl requires 3-component positions".into()));
    }
    let faces = mesh.get_faces();
    let mut out: Vec<u8> = Vec::with_capacity(84 + faces.len() * 50);
    out.write_bytes(&[0_u8; 80]);
    out.write_u32(faces.len() as u32);
    for face in faces {
        let a = positions.get(face[0] as usize);
        let b = positions.get(face[1] as usize);
        let c = positions.get(face[2] as usize);
        for v in normal(a, b, c) {
            out.write_f32(v);
        }
        for p in [a, b, c] {
            for &v in p {
                out.write_f32(v);
            }
        }
        out.write_u16(0);
    }
    let mut file = fs::File::create(path)?;
    file.write_all(&out)?;
    Ok(())
}

fn normal(a: &[f32], b: &[f32], c: &[f32]) -> [f32; 3] {
    let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let n = [
        u[1] * v[2] - u[2] * v[1],
        u[2] * v[0] - u[0] * v[2],
        u[0] * v[1] - u[1] * v[0],
    ];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len > 0.0 {
        [n[0] / len, n[1] / len, n[2] / len]
    } else {
        [0.0, 0.0, 0.0]
    }
}
