//! Wavefront OBJ import and export, built on `tobj` for the parsing side.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::core::attribute::AttributeType;
use crate::core::mesh::Mesh;

use super::Err;

pub fn read_obj(path: &Path) -> Result<Mesh, Err> {
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ignore_points: true,
            ignore_lines: true,
            ..Default::default()
        },
    )?;

    let mut positions: Vec<f32> = Vec::new();
    let mut normals: Vec<f32> = Vec::new();
    let mut texcoords: Vec<f32> = Vec::new();
    let mut faces: Vec<[u32; 3]> = Vec::new();
    let mut all_have_normals = true;
    let mut all_have_texcoords = true;
    for model in &models {
        let mesh = &model.mesh;
        let offset = (positions.len() / 3) as u32;
        positions.extend_from_slice(&mesh.positions);
        all_have_normals &= mesh.normals.len() == mesh.positions.len();
        all_have_texcoords &= mesh.texcoords.len() / 2 == mesh.positions.len() / 3;
        normals.extend_from_slice(&mesh.normals);
        texcoords.extend_from_slice(&mesh.texcoords);
        for tri in mesh.indices.chunks_exact(3) {
            let face = [tri[0] + offset, tri[1] + offset, tri[2] + offset];
            if face[0] != face[1] && face[1] != face[2] && face[0] != face[2] {
                faces.push(face);
            }
        }
    }

    let mut builder = Mesh::builder();
    builder.add_attribute(AttributeType::Position, 3, positions);
    if all_have_normals && !normals.is_empty() {
        builder.add_attribute(AttributeType::Normal, 3, normals);
    }
    if all_have_texcoords && !texcoords.is_empty() {
        builder.add_attribute(AttributeType::TexCoord, 2, texcoords);
    }
    builder.set_connectivity(faces);
    Ok(builder.build()?)
}

pub fn write_obj(mesh: &Mesh, path: &Path) -> Result<(), Err> {
    let positions = mesh
        .position_attribute()
        .ok_or_else(|| Err::Parse("mesh has no position attribute".into()))?;
    if positions.get_num_components() != 3 {
        return Err(Err::Parse("obj requires 3-component positions".into()));
    }
    let normals = mesh
        .get_attributes()
        .iter()
        .find(|a| a.get_attribute_type() == AttributeType::Normal && a.get_num_components() == 3);
    let texcoords = mesh
        .get_attributes()
        .iter()
        .find(|a| a.get_attribute_type() == AttributeType::TexCoord && a.get_num_components() == 2);

    let mut text = String::new();
    for p in positions.data().chunks_exact(3) {
        text.push_str(&format!("v {} {} {}\n", p[0], p[1], p[2]));
    }
    if let Some(att) = texcoords {
        for t in att.data().chunks_exact(2) {
            text.push_str(&format!("vt {} {}\n", t[0], t[1]));
        }
    }
    if let Some(att) = normals {
        for n in att.data().chunks_exact(3) {
            text.push_str(&format!("vn {} {} {}\n", n[0], n[1], n[2]));
        }
    }
    for face in mesh.get_faces() {
        text.push('f');
        for &v in face {
            let i = v + 1;
            match (texcoords.is_some(), normals.is_some()) {
                (true, true) => text.push_str(&format!(" {i}/{i}/{i}")),
                (true, false) => text.push_str(&format!(" {i}/{i}")),
                (false, true) => text.push_str(&format!(" {i}//{i}")),
                (false, false) => text.push_str(&format!(" {i}")),
            }
        }
        text.push('\n');
    }
    let mut file = fs::File::create(path)?;
    file.write_all(text.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn obj_roundtrips_through_a_temp_file() {
        let mut builder = Mesh::builder();
        builder.add_attribute(
            AttributeType::Position,
            3,
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0],
        );
        builder.add_attribute(
            AttributeType::Normal,
            3,
            vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
        );
        builder.set_connectivity(vec![[0, 1, 2], [2, 1, 3]]);
        let mesh = builder.build().unwrap();

        let path = std::env::temp_dir().join("tripack_obj_roundtrip.obj");
        write_obj(&mesh, &path).unwrap();
        let back = read_obj(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(back.num_vertices(), 4);
        assert_eq!(back.num_faces(), 2);
        assert_eq!(
            back.position_attribute().unwrap().data(),
            mesh.position_attribute().unwrap().data()
        );
        assert_eq!(back.get_attributes().len(), 2);
    }
}
