//! Fixed binding-slot contract between host uploads and the compute shader.
//!
//! Every storage buffer the compute stage reads is listed once in
//! [`STORAGE_SLOTS`]. The uploader, the bind group layout and the WGSL
//! declarations are all derived from that table, so a slot number never
//! appears as a literal anywhere else.
//!
//! ```text
//! group(0) binding(0)      render target   rgba32float read_write  (image unit 0)
//! group(0) binding(1)      debug target    rgba32float read_write  (image unit 1)
//! group(0) binding(10..15) sphere position / radius / material / albedo / emission / roughness
//! group(0) binding(20..24) triangle v0 / v1 / v2 / albedo / emission
//! group(1) binding(0)      frame uniforms
//! ```

use std::fmt::Write as _;

use crate::util::{Error, Result};

/// Bind group holding image units and storage slots in the compute program.
pub const COMPUTE_SLOT_GROUP: u32 = 0;
/// Bind group holding the per-frame uniform block in the compute program.
pub const COMPUTE_UNIFORM_GROUP: u32 = 1;

/// Logical storage buffers consumed by the compute stage.
///
/// Discriminants index [`STORAGE_SLOTS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageBuffer {
    SpherePosition = 0,
    SphereRadius,
    SphereMaterial,
    SphereAlbedo,
    SphereEmission,
    SphereRoughness,
    TriangleV0,
    TriangleV1,
    TriangleV2,
    TriangleAlbedo,
    TriangleEmission,
}

/// One row of the slot table.
#[derive(Debug, Clone, Copy)]
pub struct SlotEntry {
    pub buffer: StorageBuffer,
    /// Binding index inside [`COMPUTE_SLOT_GROUP`].
    pub slot: u32,
    /// Variable name in WGSL (also used as the wgpu label).
    pub name: &'static str,
    /// WGSL element type of the runtime-sized array.
    pub element: &'static str,
    /// Host-side element size in bytes.
    pub stride: u64,
}

const VEC4: u64 = 16;
const SCALAR: u64 = 4;

/// The binding table. Order: sphere slots, then triangle slots.
pub const STORAGE_SLOTS: [SlotEntry; 11] = [
    SlotEntry { buffer: StorageBuffer::SpherePosition, slot: 10, name: "sphere_positions", element: "vec4<f32>", stride: VEC4 },
    SlotEntry { buffer: StorageBuffer::SphereRadius, slot: 11, name: "sphere_radius", element: "f32", stride: SCALAR },
    SlotEntry { buffer: StorageBuffer::SphereMaterial, slot: 12, name: "sphere_material", element: "i32", stride: SCALAR },
    SlotEntry { buffer: StorageBuffer::SphereAlbedo, slot: 13, name: "sphere_albedo", element: "vec4<f32>", stride: VEC4 },
    SlotEntry { buffer: StorageBuffer::SphereEmission, slot: 14, name: "sphere_emission", element: "vec4<f32>", stride: VEC4 },
    SlotEntry { buffer: StorageBuffer::SphereRoughness, slot: 15, name: "sphere_roughness", element: "f32", stride: SCALAR },
    SlotEntry { buffer: StorageBuffer::TriangleV0, slot: 20, name: "triangle_v0", element: "vec4<f32>", stride: VEC4 },
    SlotEntry { buffer: StorageBuffer::TriangleV1, slot: 21, name: "triangle_v1", element: "vec4<f32>", stride: VEC4 },
    SlotEntry { buffer: StorageBuffer::TriangleV2, slot: 22, name: "triangle_v2", element: "vec4<f32>", stride: VEC4 },
    SlotEntry { buffer: StorageBuffer::TriangleAlbedo, slot: 23, name: "triangle_albedo", element: "vec4<f32>", stride: VEC4 },
    SlotEntry { buffer: StorageBuffer::TriangleEmission, slot: 24, name: "triangle_emission", element: "vec4<f32>", stride: VEC4 },
];

impl StorageBuffer {
    /// Table row for this buffer.
    #[inline]
    pub fn entry(self) -> &'static SlotEntry {
        &STORAGE_SLOTS[self as usize]
    }

    /// Binding index of this buffer.
    #[inline]
    pub fn slot(self) -> u32 {
        self.entry().slot
    }

    /// Reverse lookup from a binding index.
    pub fn from_slot(slot: u32) -> Result<Self> {
        STORAGE_SLOTS
            .iter()
            .find(|e| e.slot == slot)
            .map(|e| e.buffer)
            .ok_or(Error::UnknownSlot(slot))
    }
}

/// WGSL `var<storage>` declarations for every slot, generated from the table.
pub fn wgsl_storage_declarations() -> String {
    let mut out = String::new();
    for e in &STORAGE_SLOTS {
        let _ = writeln!(
            out,
            "@group({COMPUTE_SLOT_GROUP}) @binding({}) var<storage, read> {}: array<{}>;",
            e.slot, e.name, e.element
        );
    }
    out
}

/// Access mode of an image unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureAccess {
    ReadOnly,
    ReadWrite,
}

/// Pairing of a render target with its image unit, texture unit and access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureBinding {
    pub role: &'static str,
    /// Storage binding index in the compute program.
    pub image_unit: u32,
    /// Sampled binding index in the display program.
    pub texture_unit: u32,
    pub access: TextureAccess,
}

/// Primary render target: written by compute, sampled by the display pass.
pub const RENDER_TARGET: TextureBinding = TextureBinding {
    role: "render_target",
    image_unit: 0,
    texture_unit: 0,
    access: TextureAccess::ReadWrite,
};

/// Debug target: written by compute only; its texture unit is reserved.
pub const DEBUG_TARGET: TextureBinding = TextureBinding {
    role: "debug_target",
    image_unit: 1,
    texture_unit: 1,
    access: TextureAccess::ReadWrite,
};

/// Both targets as bound every frame.
pub const TARGET_BINDINGS: [TextureBinding; 2] = [RENDER_TARGET, DEBUG_TARGET];

/// Check that no two targets share an image unit or a texture unit, and that
/// no image unit collides with a storage slot.
pub fn validate_texture_bindings(bindings: &[TextureBinding]) -> Result<()> {
    for (i, a) in bindings.iter().enumerate() {
        for b in &bindings[i + 1..] {
            if a.image_unit == b.image_unit {
                return Err(Error::TextureUnitConflict {
                    kind: "image",
                    unit: a.image_unit,
                    first: a.role,
                    second: b.role,
                });
            }
            if a.texture_unit == b.texture_unit {
                return Err(Error::TextureUnitConflict {
                    kind: "texture",
                    unit: a.texture_unit,
                    first: a.role,
                    second: b.role,
                });
            }
        }
        if let Some(e) = STORAGE_SLOTS.iter().find(|e| e.slot == a.image_unit) {
            return Err(Error::TextureUnitConflict {
                kind: "image",
                unit: a.image_unit,
                first: a.role,
                second: e.name,
            });
        }
    }
    Ok(())
}
