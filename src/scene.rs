//! Scene store: struct-of-arrays primitive attributes laid out for GPU upload.
//!
//! Every 3-component vector is widened to a homogeneous `[f32; 4]` with
//! `w = 1` so the host arrays match `array<vec4<f32>>` storage layout without
//! std430 padding surprises.

use bytemuck::{Pod, Zeroable};

use crate::gpu::slots::{StorageBuffer, STORAGE_SLOTS};

/// Number of spheres in the scene (fixed at compile time).
pub const N_SPHERES: usize = 10;

/// Surface response of a primitive. Discriminants are the GPU codes.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaterialKind {
    #[default]
    Diffuse = 0,
    Metal = 1,
    Dielectric = 2,
    Light = 3,
}

impl MaterialKind {
    /// Integer code written to the material slot.
    #[inline]
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Diffuse),
            1 => Some(Self::Metal),
            2 => Some(Self::Dielectric),
            3 => Some(Self::Light),
            _ => None,
        }
    }
}

/// Source row for one sphere.
#[derive(Debug, Clone, Copy)]
pub struct SceneObject {
    pub position: [f32; 3],
    pub radius: f32,
    pub albedo: [f32; 3],
    pub roughness: f32,
    pub material: MaterialKind,
}

const fn sphere(position: [f32; 3], radius: f32, albedo: [f32; 3], roughness: f32, material: MaterialKind) -> SceneObject {
    SceneObject { position, radius, albedo, roughness, material }
}

/// The built-in scene.
#[rustfmt::skip]
pub const DEFAULT_SCENE: [SceneObject; N_SPHERES] = [
    //      position              radius  albedo             roughness  kind
    sphere([ 2.0,  0.0, -10.0],   1.0,    [2.0, 3.0, 4.0],   0.0,       MaterialKind::Light),
    sphere([ 0.0, -1.0, -10.0],   1.0,    [1.0, 0.2, 0.3],   0.0,       MaterialKind::Diffuse),
    sphere([ 4.0, -1.0,  -9.0],   1.0,    [0.3, 0.9, 0.1],   0.0,       MaterialKind::Diffuse),
    sphere([-4.0, -1.0, -10.0],   1.0,    [0.0, 0.2, 0.9],   0.0,       MaterialKind::Diffuse),
    sphere([ 0.0,  1.0, -10.0],   1.0,    [0.7, 0.6, 0.2],   0.1,       MaterialKind::Metal),
    sphere([ 4.0,  1.0, -10.0],   1.0,    [0.3, 0.8, 0.2],   0.3,       MaterialKind::Metal),
    sphere([-4.0,  1.0, -10.0],   1.0,    [0.3, 0.1, 0.8],   0.5,       MaterialKind::Metal),
    sphere([-2.0,  0.0, -15.0],   3.0,    [0.7, 0.6, 0.3],   0.25,      MaterialKind::Metal),
    sphere([-2.0,  0.0, -10.0],   1.0,    [1.0, 1.0, 1.0],   0.0,       MaterialKind::Dielectric),
    sphere([ 0.5,  0.0,  -7.0],   1.0,    [1.0, 1.0, 1.0],   0.0,       MaterialKind::Dielectric),
];

/// Widen a 3-vector to homogeneous form.
#[inline]
pub fn homogeneous(v: [f32; 3]) -> [f32; 4] {
    [v[0], v[1], v[2], 1.0]
}

/// Sphere attributes, one array per storage slot.
#[derive(Debug, Clone, PartialEq)]
pub struct SphereBuffers {
    pub positions: [[f32; 4]; N_SPHERES],
    pub radius: [f32; N_SPHERES],
    pub material_type: [i32; N_SPHERES],
    pub albedo: [[f32; 4]; N_SPHERES],
    pub emission: [[f32; 4]; N_SPHERES],
    pub roughness: [f32; N_SPHERES],
}

/// One triangle record as read back from the triangle slots.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TriangleRecord {
    pub v0: [f32; 4],
    pub v1: [f32; 4],
    pub v2: [f32; 4],
    pub albedo: [f32; 4],
    pub emission: [f32; 4],
}

/// Triangle attributes. Empty in the default scene.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleBuffers {
    pub v0: Vec<[f32; 4]>,
    pub v1: Vec<[f32; 4]>,
    pub v2: Vec<[f32; 4]>,
    pub albedo: Vec<[f32; 4]>,
    pub emission: Vec<[f32; 4]>,
}

impl TriangleBuffers {
    /// Append a triangle; vertices and colors are widened to w = 1.
    pub fn push_triangle(&mut self, v0: [f32; 3], v1: [f32; 3], v2: [f32; 3], albedo: [f32; 3], emission: [f32; 3]) {
        self.v0.push(homogeneous(v0));
        self.v1.push(homogeneous(v1));
        self.v2.push(homogeneous(v2));
        self.albedo.push(homogeneous(albedo));
        self.emission.push(homogeneous(emission));
    }

    pub fn len(&self) -> usize {
        self.v0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.v0.is_empty()
    }

    pub fn record(&self, i: usize) -> Option<TriangleRecord> {
        Some(TriangleRecord {
            v0: *self.v0.get(i)?,
            v1: *self.v1.get(i)?,
            v2: *self.v2.get(i)?,
            albedo: *self.albedo.get(i)?,
            emission: *self.emission.get(i)?,
        })
    }
}

/// Complete scene data ready for GPU upload.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneBuffers {
    pub spheres: SphereBuffers,
    pub triangles: TriangleBuffers,
}

/// Populate the scene arrays from [`DEFAULT_SCENE`].
///
/// Emission is black (w = 1) for every sphere; light spheres emit through
/// their albedo in the shader.
pub fn init_scene() -> SceneBuffers {
    let mut spheres = SphereBuffers {
        positions: [[0.0; 4]; N_SPHERES],
        radius: [0.0; N_SPHERES],
        material_type: [0; N_SPHERES],
        albedo: [[0.0; 4]; N_SPHERES],
        emission: [[0.0; 4]; N_SPHERES],
        roughness: [0.0; N_SPHERES],
    };

    for (i, obj) in DEFAULT_SCENE.iter().enumerate() {
        spheres.positions[i] = homogeneous(obj.position);
        spheres.albedo[i] = homogeneous(obj.albedo);
        spheres.emission[i] = homogeneous([0.0; 3]);
        spheres.radius[i] = obj.radius;
        spheres.roughness[i] = obj.roughness;
        spheres.material_type[i] = obj.material.code();
    }

    SceneBuffers {
        spheres,
        triangles: TriangleBuffers::default(),
    }
}

impl SceneBuffers {
    pub fn sphere_count(&self) -> u32 {
        N_SPHERES as u32
    }

    pub fn triangle_count(&self) -> u32 {
        self.triangles.len() as u32
    }

    /// Raw bytes for one storage slot.
    pub fn slot_bytes(&self, buffer: StorageBuffer) -> &[u8] {
        let s = &self.spheres;
        let t = &self.triangles;
        match buffer {
            StorageBuffer::SpherePosition => bytemuck::cast_slice(&s.positions),
            StorageBuffer::SphereRadius => bytemuck::cast_slice(&s.radius),
            StorageBuffer::SphereMaterial => bytemuck::cast_slice(&s.material_type),
            StorageBuffer::SphereAlbedo => bytemuck::cast_slice(&s.albedo),
            StorageBuffer::SphereEmission => bytemuck::cast_slice(&s.emission),
            StorageBuffer::SphereRoughness => bytemuck::cast_slice(&s.roughness),
            StorageBuffer::TriangleV0 => bytemuck::cast_slice(&t.v0),
            StorageBuffer::TriangleV1 => bytemuck::cast_slice(&t.v1),
            StorageBuffer::TriangleV2 => bytemuck::cast_slice(&t.v2),
            StorageBuffer::TriangleAlbedo => bytemuck::cast_slice(&t.albedo),
            StorageBuffer::TriangleEmission => bytemuck::cast_slice(&t.emission),
        }
    }

    /// Payload for every slot of the binding table, in table order.
    pub fn storage_payloads(&self) -> impl Iterator<Item = (StorageBuffer, &[u8])> + '_ {
        STORAGE_SLOTS.iter().map(move |e| (e.buffer, self.slot_bytes(e.buffer)))
    }
}
