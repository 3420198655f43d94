use std::io::BufReader;

use awd::material::{BitmapTexture, Color, Material};
use awd::mesh::MeshData;
use awd::scene::{Container, MeshInstance, SceneNode};
use awd::weld::{GeomPrecision, WeldSettings, Welder};
use awd::{AwdDocument, AwdSettings};
use obj::raw::object::Polygon;
use obj::raw::{RawObj, parse_obj};

use crate::CommonArgs;
use crate::prelude::*;

#[derive(clap::Args, Debug)]
pub struct FromObjArgs {
    /// Fold vertices whose normals differ by at most this angle (degrees)
    /// and average their normals
    #[arg(long, default_value_t = 0.0)]
    smooth_angle: f64,
    /// Never merge vertices, every triangle corner is kept as-is
    #[arg(long)]
    hard_edges: bool,
    /// Store positions, normals and uvs as 64-bit floats
    #[arg(long)]
    double_precision: bool,
    /// Use a texture material referencing this image URL
    #[arg(long, conflicts_with = "color")]
    texture: Option<String>,
    /// Use a flat color material (hex RRGGBB)
    #[arg(long, value_parser = parse_color)]
    color: Option<Color>,
    #[command(flatten)]
    warg: crate::WriteArgs,
    #[command(flatten)]
    oarg: crate::OutputArgs,
    #[command(flatten)]
    outpath: crate::OutputPath,
    #[command(flatten)]
    inpaths: crate::InputPaths,
}

fn parse_color(s: &str) -> Result<Color, String> {
    let hex = s.trim_start_matches('#');
    if hex.len() != 6 {
        return Err(format!("expected 6 hex digits, got {:?}", s));
    }
    u32::from_str_radix(hex, 16)
        .map(Color::from_u32)
        .map_err(|e| e.to_string())
}

pub fn run(
    _args_common: &CommonArgs,
    args_cmd: &FromObjArgs,
) -> AnyResult<()> {
    if args_cmd.inpaths.in_files.is_empty() {
        bail!("No input files provided.");
    }
    if args_cmd.smooth_angle.is_nan() || args_cmd.smooth_angle < 0.0 {
        bail!("Smoothing angle must not be negative.");
    }
    let weld_settings = WeldSettings {
        normal_threshold: args_cmd.smooth_angle.to_radians(),
        precision: if args_cmd.double_precision {
            GeomPrecision::Double
        } else {
            GeomPrecision::Single
        },
    };

    let mut doc =
        AwdDocument::new_with_settings(AwdSettings::from(&args_cmd.warg));

    let material = match &args_cmd.texture {
        Some(url) => {
            let tex = doc
                .add_texture(BitmapTexture::external(url.as_str(), url.as_str()))
                .context("Cannot add texture")?;
            Material::texture("material", tex)
        }
        None => Material::color(
            "material",
            args_cmd.color.unwrap_or(Color::new(0xcc, 0xcc, 0xcc)),
        ),
    };
    let material = doc.add_material(material).context("Cannot add material")?;
    let root = doc
        .add_scene_block(Container::new(SceneNode::new("root")))
        .context("Cannot add root node")?;

    for path in args_cmd.inpaths.in_files.iter() {
        let infile = std::fs::File::open(path)
            .with_context(|| format!("Cannot open input OBJ file {:?}", path))?;
        let rawobj = parse_obj(BufReader::new(infile))
            .with_context(|| format!("Cannot parse OBJ file {:?}", path))?;

        let mut welder = Welder::new(weld_settings);
        append_corners(&rawobj, &mut welder, args_cmd.hard_edges)
            .with_context(|| format!("Invalid geometry in {:?}", path))?;
        if welder.is_empty() {
            bail!("No faces in OBJ file {:?}", path);
        }

        let name = rawobj
            .name
            .clone()
            .or_else(|| {
                path.file_stem().map(|s| s.to_string_lossy().into_owned())
            })
            .unwrap_or_default();
        let mut mesh = MeshData::new(name.as_str());
        welder.build(&mut mesh).context("Cannot weld mesh")?;
        let mesh = doc.add_mesh_data(mesh).context("Cannot add mesh")?;
        doc.add_scene_block(
            MeshInstance::new(SceneNode::new(name).with_parent(root), mesh)
                .with_material(material),
        )
        .context("Cannot add mesh instance")?;
    }

    tracing::info!(
        blocks = doc.len(),
        path = %args_cmd.outpath.out_file.display(),
        "writing AWD file"
    );
    doc.flush_to_path(&args_cmd.outpath.out_file, args_cmd.oarg.overwrite)
        .context("Cannot write output file")?;

    Ok(())
}

/// Fan-triangulate every polygon into welder corners.
fn append_corners(
    rawobj: &RawObj,
    welder: &mut Welder,
    hard: bool,
) -> AnyResult<()> {
    let mut next_index = 0u32;
    for polygon in rawobj.polygons.iter() {
        let verts = polygon_vertices(rawobj, polygon)?;
        if verts.len() < 3 {
            tracing::warn!(vertices = verts.len(), "skipping degenerate polygon");
            continue;
        }
        for i in 1..verts.len() - 1 {
            let tri = [verts[0], verts[i], verts[i + 1]];
            let flat = face_normal(tri.map(|v| v.0));
            for (position, uv, normal) in tri {
                welder.append(next_index, position, uv, normal.unwrap_or(flat), hard);
                next_index += 1;
            }
        }
    }
    Ok(())
}

type ObjVertex = ([f64; 3], [f64; 2], Option<[f64; 3]>);

fn polygon_vertices(rawobj: &RawObj, polygon: &Polygon) -> AnyResult<Vec<ObjVertex>> {
    let position = |i: usize| -> AnyResult<[f64; 3]> {
        let p = rawobj.positions.get(i).context("Position index out of range")?;
        Ok([p.0 as f64, p.1 as f64, p.2 as f64])
    };
    let uv = |i: usize| -> AnyResult<[f64; 2]> {
        let t = rawobj.tex_coords.get(i).context("Texture index out of range")?;
        Ok([t.0 as f64, t.1 as f64])
    };
    let normal = |i: usize| -> AnyResult<[f64; 3]> {
        let n = rawobj.normals.get(i).context("Normal index out of range")?;
        Ok([n.0 as f64, n.1 as f64, n.2 as f64])
    };
    match polygon {
        Polygon::P(v) => v
            .iter()
            .map(|&p| Ok((position(p)?, [0.0; 2], None)))
            .collect(),
        Polygon::PT(v) => v
            .iter()
            .map(|&(p, t)| Ok((position(p)?, uv(t)?, None)))
            .collect(),
        Polygon::PN(v) => v
            .iter()
            .map(|&(p, n)| Ok((position(p)?, [0.0; 2], Some(normal(n)?))))
            .collect(),
        Polygon::PTN(v) => v
            .iter()
            .map(|&(p, t, n)| Ok((position(p)?, uv(t)?, Some(normal(n)?))))
            .collect(),
    }
}

/// Unit normal of a counter-clockwise triangle, zero if it has no area.
fn face_normal([a, b, c]: [[f64; 3]; 3]) -> [f64; 3] {
    let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let n = [
        u[1] * v[2] - u[2] * v[1],
        u[2] * v[0] - u[0] * v[2],
        u[0] * v[1] - u[1] * v[0],
    ];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len == 0.0 {
        return [0.0; 3];
    }
    [n[0] / len, n[1] / len, n[2] / len]
}
