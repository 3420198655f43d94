use quickcheck_macros::quickcheck;

use awd::attr::{NumAttrList, UserAttrList};
use awd::stream::{DataStream, ElementType, STREAM_HEADER_LEN, StreamRole};
use awd::weld::{Corner, Welder};
use awd::{Address, Encoding, Matrix4};

fn encodings() -> [Encoding; 2] {
    [
        Encoding::default(),
        Encoding {
            wide_addresses: true,
            wide_matrices: true,
            ..Default::default()
        },
    ]
}

#[quickcheck]
fn numeric_attributes_write_calculated_length(
    ints: Vec<(u16, i32)>,
    floats: Vec<(u16, f64)>,
    addrs: Vec<(u16, u16)>,
) -> bool {
    let mut list = NumAttrList::new();
    for (k, v) in ints {
        list.set(k, v);
    }
    for (k, v) in floats {
        list.set(k, v);
    }
    for (k, v) in addrs {
        if let Some(addr) = Address::new(v as u32) {
            list.set(k, addr);
        }
    }
    list.set(u16::MAX, Matrix4::IDENTITY);
    encodings().iter().all(|enc| {
        let mut buf: Vec<u8> = vec![];
        list.write(&mut buf, enc).is_ok() && buf.len() == list.calc_length(enc)
    })
}

#[quickcheck]
fn user_attributes_write_calculated_length(
    strings: Vec<(u8, String, String)>,
    shorts: Vec<(u8, String, i16)>,
) -> bool {
    let mut list = UserAttrList::new();
    for (ns, k, v) in strings {
        list.set(ns, &k, v);
    }
    for (ns, k, v) in shorts {
        list.set(ns, &k, v);
    }
    encodings().iter().all(|enc| {
        let mut buf: Vec<u8> = vec![];
        list.write(&mut buf, enc).is_ok() && buf.len() == list.calc_length(enc)
    })
}

fn payload(stream: &DataStream) -> Vec<u8> {
    let mut buf: Vec<u8> = vec![];
    stream.write(&mut buf).unwrap();
    buf.split_off(STREAM_HEADER_LEN)
}

#[quickcheck]
fn int_streams_decode_at_declared_width(values: Vec<i64>) -> bool {
    let n = values.len();
    let s16 = DataStream::new(StreamRole::Triangles, ElementType::Int16, values.clone(), n)
        .unwrap();
    let s8 = DataStream::new(StreamRole::JointIndices, ElementType::UInt8, values.clone(), n)
        .unwrap();
    let s32 = DataStream::new(StreamRole::Triangles, ElementType::UInt32, values.clone(), n)
        .unwrap();

    let d16: Vec<i16> = payload(&s16)
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect();
    let d8 = payload(&s8);
    let d32: Vec<u32> = payload(&s32)
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    d16 == values.iter().map(|v| *v as i16).collect::<Vec<_>>()
        && d8 == values.iter().map(|v| *v as u8).collect::<Vec<_>>()
        && d32 == values.iter().map(|v| *v as u32).collect::<Vec<_>>()
}

#[quickcheck]
fn float_streams_decode_at_declared_width(values: Vec<f64>) -> bool {
    let n = values.len();
    let s32 = DataStream::new(StreamRole::Vertices, ElementType::Float32, values.clone(), n)
        .unwrap();
    let s64 = DataStream::new(StreamRole::Vertices, ElementType::Float64, values.clone(), n)
        .unwrap();

    let d32 = payload(&s32);
    let d64 = payload(&s64);
    let narrow_ok = d32.chunks_exact(4).zip(values.iter()).all(|(c, v)| {
        let got = f32::from_le_bytes([c[0], c[1], c[2], c[3]]);
        let want = *v as f32;
        got.to_bits() == want.to_bits() || (got.is_nan() && want.is_nan())
    });
    let wide_ok = d64.chunks_exact(8).zip(values.iter()).all(|(c, v)| {
        let got = f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]);
        got.to_bits() == v.to_bits()
    });
    d32.len() == n * 4 && d64.len() == n * 8 && narrow_ok && wide_ok
}

/// Small value ranges so corners collide often.
fn corners(raw: &[(u8, u8, u8, bool)]) -> Vec<Corner> {
    const COORDS: [f64; 3] = [0.0, -0.0, 1.0];
    const NORMALS: [[f64; 3]; 5] = [
        [0.0, 0.0, 1.0],
        [0.0, 0.0, 2.0],
        [0.0, 0.6, 0.8],
        [1.0, 0.0, 0.0],
        [0.0, 0.0, 0.0],
    ];
    raw.iter()
        .enumerate()
        .map(|(i, &(p, uv, n, hard))| Corner {
            index: i as u32,
            position: [COORDS[p as usize % 3], COORDS[p as usize / 3 % 3], 0.0],
            uv: [COORDS[uv as usize % 2], 0.0],
            normal: NORMALS[n as usize % NORMALS.len()],
            force_hard: hard && p % 4 == 0,
        })
        .collect()
}

fn angle(a: [f64; 3], b: [f64; 3]) -> Option<f64> {
    let dot = a[0] * b[0] + a[1] * b[1] + a[2] * b[2];
    let la = (a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt();
    let lb = (b[0] * b[0] + b[1] * b[1] + b[2] * b[2]).sqrt();
    (la > 0.0 && lb > 0.0).then(|| (dot / (la * lb)).clamp(-1.0, 1.0).acos())
}

fn folds(a: &Corner, b: &Corner, threshold: f64) -> bool {
    !a.force_hard
        && !b.force_hard
        && a.position == b.position
        && a.uv == b.uv
        && (a.normal == b.normal
            || (threshold > 0.0
                && angle(a.normal, b.normal).is_some_and(|t| t <= threshold)))
}

/// Straight scan over every unique vertex, the way the welder is defined.
fn reference_weld(corners: &[Corner], threshold: f64) -> (Vec<u32>, Vec<[f64; 3]>) {
    let mut unique: Vec<(Corner, Vec<[f64; 3]>)> = vec![];
    let mut indices = vec![];
    for c in corners {
        match unique.iter_mut().position(|(u, _)| folds(u, c, threshold)) {
            Some(i) => {
                if !unique[i].1.contains(&c.normal) {
                    unique[i].1.push(c.normal);
                }
                indices.push(i as u32);
            }
            None => {
                indices.push(unique.len() as u32);
                unique.push((*c, vec![c.normal]));
            }
        }
    }
    let normals = unique
        .iter()
        .map(|(u, influences)| {
            if threshold > 0.0 {
                let n = influences.len() as f64;
                let s = influences.iter().fold([0.0; 3], |a, v| {
                    [a[0] + v[0], a[1] + v[1], a[2] + v[2]]
                });
                [s[0] / n, s[1] / n, s[2] / n]
            } else {
                u.normal
            }
        })
        .collect();
    (indices, normals)
}

fn weld(corners: &[Corner], threshold: f64) -> awd::weld::WeldedGeometry {
    let mut welder = Welder::with_threshold(threshold);
    for c in corners {
        welder.push(*c);
    }
    welder.weld().unwrap()
}

#[quickcheck]
fn weld_index_count_matches_corners(raw: Vec<(u8, u8, u8, bool)>, smooth: bool) -> bool {
    let corners = corners(&raw);
    let threshold = if smooth { 1.0 } else { 0.0 };
    let geom = weld(&corners, threshold);
    geom.indices.len() == corners.len()
        && geom.vertex_count() <= corners.len()
        && geom.indices.iter().all(|i| (*i as usize) < geom.vertex_count())
}

#[quickcheck]
fn weld_matches_linear_scan(raw: Vec<(u8, u8, u8, bool)>, smooth: bool) -> bool {
    let corners = corners(&raw);
    let threshold = if smooth { 0.7 } else { 0.0 };
    let geom = weld(&corners, threshold);
    let (indices, normals) = reference_weld(&corners, threshold);
    geom.indices == indices && geom.normals == normals
}

#[quickcheck]
fn hard_corners_never_fold(raw: Vec<(u8, u8, u8, bool)>) -> bool {
    let corners = corners(&raw);
    let geom = weld(&corners, 1.0);
    corners.iter().enumerate().filter(|(_, c)| c.force_hard).all(|(i, _)| {
        let idx = geom.indices[i];
        geom.indices.iter().filter(|j| **j == idx).count() == 1
    })
}

#[quickcheck]
fn exact_welding_folds_only_identical_corners(raw: Vec<(u8, u8, u8, bool)>) -> bool {
    let corners = corners(&raw);
    let geom = weld(&corners, 0.0);
    let n = corners.len();
    (0..n).all(|i| {
        (0..n).all(|j| {
            let same = geom.indices[i] == geom.indices[j];
            let identical = corners[i].position == corners[j].position
                && corners[i].uv == corners[j].uv
                && corners[i].normal == corners[j].normal
                && !corners[i].force_hard
                && !corners[j].force_hard;
            i == j || same == identical
        })
    })
}
