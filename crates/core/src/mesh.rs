//! CPU-side geometry descriptors and mesh generation.

use std::f32::consts::{PI, TAU};

use rand::prelude::*;

use crate::constants::{STAR_RADIUS_MIN, STAR_RADIUS_SPAN, STAR_VERTICAL_SQUASH};

/// Describes a mesh by its parameters; two equal descriptors build identical meshes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Geometry {
    Sphere {
        radius: f32,
        width_segments: u32,
        height_segments: u32,
    },
    /// Flat annulus in the local XY plane.
    Ring {
        inner: f32,
        outer: f32,
        segments: u32,
    },
    /// Open cone along local Y with its apex at `+length / 2`.
    Cone {
        radius: f32,
        length: f32,
        radial_segments: u32,
        height_segments: u32,
    },
    /// Random point shell used for the starfield.
    Points { count: u32, seed: u64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Topology {
    Triangles,
    Points,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
}

#[derive(Clone, Debug)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    /// Empty for point lists.
    pub indices: Vec<u32>,
    pub topology: Topology,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

impl Geometry {
    /// Angular tessellation for rotationally symmetric shapes.
    pub fn angular_segments(&self) -> Option<u32> {
        match *self {
            Geometry::Sphere { width_segments, .. } => Some(width_segments),
            Geometry::Ring { segments, .. } => Some(segments),
            Geometry::Cone {
                radial_segments, ..
            } => Some(radial_segments),
            Geometry::Points { .. } => None,
        }
    }

    pub fn build(&self) -> MeshData {
        match *self {
            Geometry::Sphere {
                radius,
                width_segments,
                height_segments,
            } => sphere(radius, width_segments.max(3), height_segments.max(2)),
            Geometry::Ring {
                inner,
                outer,
                segments,
            } => ring(inner, outer, segments.max(3)),
            Geometry::Cone {
                radius,
                length,
                radial_segments,
                height_segments,
            } => cone(radius, length, radial_segments.max(3), height_segments.max(1)),
            Geometry::Points { count, seed } => star_shell(count, seed),
        }
    }
}

fn ring(inner: f32, outer: f32, segments: u32) -> MeshData {
    let mut vertices = Vec::with_capacity(2 * (segments as usize + 1));
    for j in 0..=1u32 {
        let r = inner + (outer - inner) * j as f32;
        for i in 0..=segments {
            let theta = i as f32 / segments as f32 * TAU;
            vertices.push(Vertex {
                position: [r * theta.cos(), r * theta.sin(), 0.0],
            });
        }
    }
    let stride = segments + 1;
    let mut indices = Vec::with_capacity(segments as usize * 6);
    for i in 0..segments {
        let a = i;
        let b = i + stride;
        let c = i + 1 + stride;
        let d = i + 1;
        indices.extend_from_slice(&[a, b, d, b, c, d]);
    }
    MeshData {
        vertices,
        indices,
        topology: Topology::Triangles,
    }
}

fn sphere(radius: f32, w: u32, h: u32) -> MeshData {
    let mut vertices = Vec::with_capacity(((w + 1) * (h + 1)) as usize);
    for y in 0..=h {
        let v = y as f32 / h as f32;
        for x in 0..=w {
            let u = x as f32 / w as f32;
            vertices.push(Vertex {
                position: [
                    -radius * (u * TAU).cos() * (v * PI).sin(),
                    radius * (v * PI).cos(),
                    radius * (u * TAU).sin() * (v * PI).sin(),
                ],
            });
        }
    }
    let stride = w + 1;
    let mut indices = Vec::with_capacity((w * h * 6) as usize);
    for iy in 0..h {
        for ix in 0..w {
            let a = iy * stride + ix + 1;
            let b = iy * stride + ix;
            let c = (iy + 1) * stride + ix;
            let d = (iy + 1) * stride + ix + 1;
            // pole rows collapse to a single triangle
            if iy != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if iy != h - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }
    MeshData {
        vertices,
        indices,
        topology: Topology::Triangles,
    }
}

fn cone(radius: f32, length: f32, radial: u32, rows: u32) -> MeshData {
    let mut vertices = Vec::with_capacity(((radial + 1) * (rows + 1)) as usize);
    for y in 0..=rows {
        let v = y as f32 / rows as f32;
        let r = v * radius;
        let py = length * 0.5 - v * length;
        for x in 0..=radial {
            let theta = x as f32 / radial as f32 * TAU;
            vertices.push(Vertex {
                position: [r * theta.sin(), py, r * theta.cos()],
            });
        }
    }
    let stride = radial + 1;
    let mut indices = Vec::with_capacity((radial * rows * 6) as usize);
    for y in 0..rows {
        for x in 0..radial {
            let a = y * stride + x;
            let b = (y + 1) * stride + x;
            let c = (y + 1) * stride + x + 1;
            let d = y * stride + x + 1;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }
    MeshData {
        vertices,
        indices,
        topology: Topology::Triangles,
    }
}

fn star_shell(count: u32, seed: u64) -> MeshData {
    let mut rng = StdRng::seed_from_u64(seed);
    let vertices = (0..count)
        .map(|_| {
            let r = STAR_RADIUS_MIN + rng.gen::<f32>() * STAR_RADIUS_SPAN;
            let a = rng.gen::<f32>() * TAU;
            let e = (rng.gen::<f32>() - 0.5) * PI;
            Vertex {
                position: [
                    a.cos() * e.cos() * r,
                    e.sin() * r * STAR_VERTICAL_SQUASH,
                    a.sin() * e.cos() * r,
                ],
            }
        })
        .collect();
    MeshData {
        vertices,
        indices: Vec::new(),
        topology: Topology::Points,
    }
}
