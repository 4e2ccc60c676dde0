use std::collections::BTreeMap;

use tripack::prelude::*;

fn cube_mesh() -> Mesh {
    // Unit cube: bottom ring 0..4 at z=0, top ring 4..8 at z=1.
    let positions = vec![
        0.0, 0.0, 0.0, //
        1.0, 0.0, 0.0, //
        1.0, 1.0, 0.0, //
        0.0, 1.0, 0.0, //
        0.0, 0.0, 1.0, //
        1.0, 0.0, 1.0, //
        1.0, 1.0, 1.0, //
        0.0, 1.0, 1.0, //
    ];
    let faces = vec![
        [0, 2, 1],
        [0, 3, 2],
        [4, 5, 6],
        [4, 6, 7],
        [0, 1, 5],
        [0, 5, 4],
        [1, 2, 6],
        [1, 6, 5],
        [2, 3, 7],
        [2, 7, 6],
        [3, 0, 4],
        [3, 4, 7],
    ];
    let mut builder = Mesh::builder();
    builder.add_attribute(AttributeType::Position, 3, positions);
    builder.set_connectivity(faces);
    builder.build().unwrap()
}

/// A wavy grid patch with enough irregular vertices to make size and error
/// comparisons meaningful.
fn grid_mesh(n: u32) -> Mesh {
    let mut positions = Vec::new();
    for i in 0..n {
        for j in 0..n {
            let z = ((i * 31 + j * 17) % 7) as f32 * 0.1;
            positions.extend_from_slice(&[i as f32, j as f32, z]);
        }
    }
    let mut faces = Vec::new();
    for i in 0..n - 1 {
        for j in 0..n - 1 {
            let a = i * n + j;
            faces.push([a, a + n, a + n + 1]);
            faces.push([a, a + n + 1, a + 1]);
        }
    }
    let mut builder = Mesh::builder();
    builder.add_attribute(AttributeType::Position, 3, positions);
    builder.set_connectivity(faces);
    builder.build().unwrap()
}

fn face_corners(mesh: &Mesh) -> Vec<[[f32; 3]; 3]> {
    let positions = mesh.position_attribute().unwrap();
    mesh.get_faces()
        .iter()
        .map(|f| {
            let mut corners = [[0.0_f32; 3]; 3];
            for (i, &v) in f.iter().enumerate() {
                corners[i].copy_from_slice(positions.get(v as usize));
            }
            corners
        })
        .collect()
}

fn rotations_match(a: &[[f32; 3]; 3], b: &[[f32; 3]; 3], tol: f32) -> bool {
    (0..3).any(|r| {
        (0..3).all(|i| {
            let (pa, pb) = (a[i], b[(i + r) % 3]);
            (0..3).all(|c| (pa[c] - pb[c]).abs() <= tol)
        })
    })
}

/// The traversal-based method reindexes vertices and faces, so decoded
/// meshes are compared as surfaces: every face must match an input face as
/// an oriented position triple, within `tol` per coordinate.
fn assert_same_surface(original: &Mesh, decoded: &Mesh, tol: f32) {
    let a = face_corners(original);
    let b = face_corners(decoded);
    assert_eq!(a.len(), b.len());
    let mut used = vec![false; b.len()];
    for (i, fa) in a.iter().enumerate() {
        let found = b
            .iter()
            .enumerate()
            .position(|(j, fb)| !used[j] && rotations_match(fa, fb, tol));
        match found {
            Some(j) => used[j] = true,
            None => panic!("input face {i} has no counterpart within {tol}"),
        }
    }
}

fn max_position_error(original: &Mesh, decoded: &Mesh) -> f32 {
    // Sequential coding preserves vertex order, so errors compare directly.
    let a = original.position_attribute().unwrap().data();
    let b = decoded.position_attribute().unwrap().data();
    assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f32::max)
}

#[test]
fn unit_cube_at_14_bits() {
    let mesh = cube_mesh();
    let buffer = encode(&mesh, &[], &Options::default()).unwrap();

    // Header counts: magic(4) version(1) method(1) flags(1), then the two
    // u32 counts little-endian.
    let bytes = buffer.as_bytes();
    assert_eq!(&bytes[0..4], b"TPAK");
    let vertex_count = u32::from_le_bytes(bytes[7..11].try_into().unwrap());
    let face_count = u32::from_le_bytes(bytes[11..15].try_into().unwrap());
    assert_eq!(vertex_count, 8);
    assert_eq!(face_count, 12);

    let decoded = decode(&buffer).unwrap();
    assert_eq!(decoded.num_vertices(), 8);
    assert_eq!(decoded.num_faces(), 12);
    // 14 bits over a unit range: every coordinate within 1/16383.
    assert_same_surface(&mesh, &decoded, 1.0 / 16383.0);
}

#[test]
fn encoding_is_deterministic() {
    let mesh = grid_mesh(6);
    let options = Options::default();
    let first = encode(&mesh, &[], &options).unwrap();
    let second = encode(&mesh, &[], &options).unwrap();
    assert_eq!(first.as_bytes(), second.as_bytes());
    // A structurally identical rebuild encodes to the same bytes too.
    let rebuilt = grid_mesh(6);
    let third = encode(&rebuilt, &[], &options).unwrap();
    assert_eq!(first.as_bytes(), third.as_bytes());
}

#[test]
fn error_shrinks_and_size_grows_with_bit_depth() {
    let mesh = grid_mesh(8);
    let mut results = Vec::new();
    for bits in [8_u8, 12, 16, 20] {
        let mut options = Options::default();
        options.method = Method::Sequential;
        options.position_quantization_bits = bits;
        let buffer = encode(&mesh, &[], &options).unwrap();
        let decoded = decode(&buffer).unwrap();
        results.push((max_position_error(&mesh, &decoded), buffer.len()));
    }
    for pair in results.windows(2) {
        assert!(pair[1].0 <= pair[0].0, "error grew with more bits: {results:?}");
        assert!(pair[1].1 >= pair[0].1, "size shrank with more bits: {results:?}");
    }
}

#[test]
fn edgebreaker_roundtrip_stays_within_the_quantization_bound() {
    let mesh = grid_mesh(7);
    let mut options = Options::default();
    options.position_quantization_bits = 12;
    let buffer = encode(&mesh, &[], &options).unwrap();
    let decoded = decode(&buffer).unwrap();
    // Widest component range is 6.0 across the 7x7 grid.
    let bound = 6.0 / ((1_u32 << 12) - 1) as f32;
    assert_same_surface(&mesh, &decoded, bound);
}

#[test]
fn sequential_preserves_indices_exactly() {
    let mesh = grid_mesh(5);
    let mut options = Options::default();
    options.method = Method::Sequential;
    let buffer = encode(&mesh, &[], &options).unwrap();
    let decoded = decode(&buffer).unwrap();
    assert_eq!(decoded.get_faces(), mesh.get_faces());
    assert_eq!(decoded.num_vertices(), mesh.num_vertices());
}

#[test]
fn non_manifold_edge_respects_the_policy() {
    // Three faces share the edge (0, 1).
    let positions = vec![
        0.0, 0.0, 0.0, //
        1.0, 0.0, 0.0, //
        0.5, 1.0, 0.0, //
        0.5, -1.0, 0.0, //
        0.5, 0.0, 1.0, //
    ];
    let faces = vec![[0, 1, 2], [1, 0, 3], [0, 1, 4]];
    let mut builder = Mesh::builder();
    builder.add_attribute(AttributeType::Position, 3, positions);
    builder.set_connectivity(faces);
    let mesh = builder.build().unwrap();

    let mut options = Options::default();
    options.non_manifold_policy = NonManifoldPolicy::Strict;
    assert!(matches!(
        encode(&mesh, &[], &options),
        Err(tripack::encode::Err::ConnectivityError(_))
    ));

    options.non_manifold_policy = NonManifoldPolicy::Repair;
    let buffer = encode(&mesh, &[], &options).unwrap();
    let decoded = decode(&buffer).unwrap();
    assert_eq!(decoded.num_faces(), 3);
    // The repair duplicated both endpoints for the detached face.
    assert_eq!(decoded.num_vertices(), 7);
    assert_same_surface(&mesh, &decoded, 2.0 / 16383.0);
}

#[test]
fn magic_and_version_gate_before_the_payload() {
    let buffer = encode(&cube_mesh(), &[], &Options::default()).unwrap();

    let mut bad_magic = buffer.clone().into_vec();
    bad_magic[0] = b'X';
    assert_eq!(
        decode(&CompressedBuffer::from_vec(bad_magic)),
        Err(tripack::decode::Err::BadMagic)
    );

    let mut bad_version = buffer.clone().into_vec();
    bad_version[4] = 99;
    assert_eq!(
        decode(&CompressedBuffer::from_vec(bad_version)),
        Err(tripack::decode::Err::UnsupportedVersion(99))
    );

    // The gates need no payload at all.
    let header_only = CompressedBuffer::from_vec(vec![b'T', b'P', b'A', b'K', 99]);
    assert_eq!(
        decode(&header_only),
        Err(tripack::decode::Err::UnsupportedVersion(99))
    );
    let garbage = CompressedBuffer::from_vec(vec![1, 2, 3]);
    assert_eq!(decode(&garbage), Err(tripack::decode::Err::BadMagic));
}

#[test]
fn truncated_streams_are_corrupt() {
    let buffer = encode(&grid_mesh(5), &[], &Options::default()).unwrap();
    let bytes = buffer.as_bytes();
    for cut in [bytes.len() - 1, bytes.len() / 2, 20] {
        let truncated = CompressedBuffer::from_vec(bytes[..cut].to_vec());
        assert!(
            matches!(
                decode(&truncated),
                Err(tripack::decode::Err::CorruptStream(_))
            ),
            "cut at {cut} was not detected"
        );
    }
}

#[test]
fn multiple_attributes_with_per_attribute_bits() {
    let n = 4_u32;
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut uvs = Vec::new();
    for i in 0..n {
        for j in 0..n {
            positions.extend_from_slice(&[i as f32, j as f32, 0.5]);
            normals.extend_from_slice(&[0.0, 0.0, 1.0]);
            uvs.extend_from_slice(&[i as f32 / 3.0, j as f32 / 3.0]);
        }
    }
    let mut faces = Vec::new();
    for i in 0..n - 1 {
        for j in 0..n - 1 {
            let a = i * n + j;
            faces.push([a, a + n, a + n + 1]);
            faces.push([a, a + n + 1, a + 1]);
        }
    }
    let mut builder = Mesh::builder();
    builder.add_attribute(AttributeType::Position, 3, positions);
    builder.add_attribute(AttributeType::Normal, 3, normals);
    builder.add_attribute(AttributeType::TexCoord, 2, uvs);
    builder.set_connectivity(faces);
    let mesh = builder.build().unwrap();

    let mut options = Options::default();
    options.quantization_bits_per_attribute = BTreeMap::from([(2_usize, 8_u8)]);
    let buffer = encode(&mesh, &[], &options).unwrap();
    let decoded = decode(&buffer).unwrap();

    assert_eq!(decoded.get_attributes().len(), 3);
    assert_eq!(
        decoded.get_attributes()[1].get_attribute_type(),
        AttributeType::Normal
    );
    // The constant normal survives exactly.
    assert!(decoded.get_attributes()[1]
        .data()
        .chunks_exact(3)
        .all(|nrm| nrm == [0.0, 0.0, 1.0]));
    // Texcoords span 1.0 at 8 bits.
    let uv_bound = 1.0 / 255.0;
    let decoded_uv = decoded.get_attributes()[2].data();
    assert!(decoded_uv.iter().all(|v| (-uv_bound..=1.0 + uv_bound).contains(v)));
}

#[test]
fn explicit_descriptors_control_the_bit_depth() {
    let mesh = grid_mesh(5);
    let descriptors = [AttributeDescriptor::new(AttributeType::Position, 3, 10)];
    let mut options = Options::default();
    options.method = Method::Sequential;
    let buffer = encode(&mesh, &descriptors, &options).unwrap();
    let decoded = decode(&buffer).unwrap();
    let bound = 4.0 / ((1_u32 << 10) - 1) as f32;
    assert!(max_position_error(&mesh, &decoded) <= bound);
}

#[test]
fn grid_spacing_drives_the_bit_depth() {
    let mesh = cube_mesh();
    let mut options = Options::default();
    options.grid_delta = Some(0.25);
    let buffer = encode(&mesh, &[], &options).unwrap();
    let decoded = decode(&buffer).unwrap();
    // Coarse grid: small stream, error within the spacing.
    assert_same_surface(&mesh, &decoded, 0.25);
    let fine = {
        let mut options = Options::default();
        options.grid_delta = Some(0.001);
        encode(&mesh, &[], &options).unwrap()
    };
    assert!(buffer.len() <= fine.len());
}

#[test]
fn ultra_fine_grid_spacing_keeps_the_data_span() {
    // A spacing far below what 30 bits can resolve: the depth clamps, but
    // the decoded geometry must still span its full range instead of
    // collapsing onto a grid smaller than the data.
    let mut builder = Mesh::builder();
    builder.add_attribute(
        AttributeType::Position,
        3,
        vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
    );
    builder.set_connectivity(vec![[0, 1, 2]]);
    let mesh = builder.build().unwrap();

    let mut options = Options::default();
    options.grid_delta = Some(1e-12);
    let buffer = encode(&mesh, &[], &options).unwrap();
    let decoded = decode(&buffer).unwrap();
    let max_coord = decoded
        .position_attribute()
        .unwrap()
        .data()
        .iter()
        .fold(0.0_f32, |m, &v| m.max(v));
    assert!(
        (max_coord - 1.0).abs() < 1e-3,
        "decoded span collapsed to {max_coord}"
    );
    assert_same_surface(&mesh, &decoded, 1.0 / ((1_u32 << 30) - 1) as f32 + 1e-6);
}

#[test]
fn metadata_rides_along_when_requested() {
    let mut mesh = cube_mesh();
    mesh.add_metadata("generator", "unit-test");
    mesh.add_metadata("units", "meters");

    let silent = encode(&mesh, &[], &Options::default()).unwrap();
    assert!(decode(&silent).unwrap().get_metadata().is_empty());

    let mut options = Options::default();
    options.generate_metadata = true;
    let tagged = encode(&mesh, &[], &options).unwrap();
    let decoded = decode(&tagged).unwrap();
    assert_eq!(
        decoded.get_metadata(),
        &[
            ("generator".to_owned(), "unit-test".to_owned()),
            ("units".to_owned(), "meters".to_owned()),
        ]
    );
}

#[test]
fn open_surface_with_boundary_roundtrips() {
    // A single grid patch has a boundary loop; hole closure handles it
    // without leaking synthetic vertices into the output.
    let mesh = grid_mesh(4);
    let buffer = encode(&mesh, &[], &Options::default()).unwrap();
    let decoded = decode(&buffer).unwrap();
    assert_eq!(decoded.num_vertices(), 16);
    assert_eq!(decoded.num_faces(), 18);
}
