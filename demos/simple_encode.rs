use std::io::BufWriter;

use awd::material::{Color, Material};
use awd::mesh::MeshData;
use awd::scene::{MeshInstance, SceneNode};
use awd::weld::Welder;
use awd::{AwdDocument, Transform};

#[rustfmt::skip]
static POSITIONS: &[[f64; 3]] = &[
    // Front face
    [-1.0, -1.0,  1.0], [ 1.0, -1.0,  1.0], [ 1.0,  1.0,  1.0], [-1.0,  1.0,  1.0],
    // Back face
    [-1.0, -1.0, -1.0], [ 1.0, -1.0, -1.0], [ 1.0,  1.0, -1.0], [-1.0,  1.0, -1.0],
];

#[rustfmt::skip]
static UVS: &[[f64; 2]] = &[
    // Front face
    [0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0],
    // Back face
    [1.0, 1.0], [1.0, 0.0], [0.0, 1.0], [0.0, 0.0],
];

#[rustfmt::skip]
static INDICES: &[usize] = &[
    // Front face
    0, 1, 2, 2, 3, 0,
    // Back face
    4, 5, 6, 6, 7, 4,
    // Left face
    4, 0, 3, 3, 7, 4,
    // Right face
    1, 5, 6, 6, 2, 1,
    // Top face
    3, 2, 6, 6, 7, 3,
    // Bottom face
    4, 5, 1, 1, 0, 4,
];

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // normals point away from the cube center
    let mut welder = Welder::default();
    for (i, &v) in INDICES.iter().enumerate() {
        let p = POSITIONS[v];
        welder.append(i as u32, p, UVS[v], p, false);
    }
    let mut mesh = MeshData::new("cube");
    welder.build(&mut mesh)?;

    let mut doc = AwdDocument::new();
    let material = doc.add_material(Material::color("orange", Color::new(0xff, 0x80, 0)))?;
    let mesh = doc.add_mesh_data(mesh)?;
    let node = SceneNode::new("cube").with_transform(Transform::from_translation(0.0, 1.0, 0.0));
    doc.add_scene_block(MeshInstance::new(node, mesh).with_material(material))?;

    let file = std::fs::File::create("test.awd")?;
    let mut bufw = BufWriter::new(file);
    doc.flush(&mut bufw)?;
    Ok(())
}
