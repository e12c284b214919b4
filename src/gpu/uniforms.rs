//! Named uniform blocks.
//!
//! A program's parameters are addressed by name, the way a GL program looks up
//! uniform locations. Each program owns a static [`UniformLayout`] describing
//! name, kind and byte offset of every field under WGSL uniform alignment rules
//! (vec3 and mat4 align to 16, scalars to 4). A [`UniformBlock`] stages the
//! values host-side; the backend copies [`UniformBlock::bytes`] into the
//! program's uniform buffer before dispatch or draw.

use std::fmt::Write as _;

use glam::{Mat4, Vec3};

use crate::util::{Error, Result};

/// Value kind of a uniform field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Int,
    UInt,
    /// Stored as a 32-bit 0/1 (WGSL has no host-shareable bool).
    Bool,
    Vec3,
    Mat4,
}

impl UniformKind {
    pub const fn size(self) -> u64 {
        match self {
            Self::Float | Self::Int | Self::UInt | Self::Bool => 4,
            Self::Vec3 => 12,
            Self::Mat4 => 64,
        }
    }

    pub const fn align(self) -> u64 {
        match self {
            Self::Vec3 | Self::Mat4 => 16,
            _ => 4,
        }
    }

    /// WGSL type used in the generated struct.
    pub const fn wgsl(self) -> &'static str {
        match self {
            Self::Float => "f32",
            Self::Int => "i32",
            Self::UInt | Self::Bool => "u32",
            Self::Vec3 => "vec3<f32>",
            Self::Mat4 => "mat4x4<f32>",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct UniformField {
    pub name: &'static str,
    pub kind: UniformKind,
    pub offset: u64,
}

const fn field(name: &'static str, kind: UniformKind, offset: u64) -> UniformField {
    UniformField { name, kind, offset }
}

/// Static parameter layout of one program.
#[derive(Debug)]
pub struct UniformLayout {
    pub program: &'static str,
    /// WGSL struct name.
    pub struct_name: &'static str,
    /// Total block size, a multiple of 16.
    pub size: u64,
    /// Fields sorted by offset.
    pub fields: &'static [UniformField],
}

/// Per-frame parameters of the compute program.
pub static COMPUTE_UNIFORMS: UniformLayout = UniformLayout {
    program: "compute",
    struct_name: "FrameUniforms",
    size: 160,
    fields: &[
        field("view", UniformKind::Mat4, 0),
        field("lookfrom", UniformKind::Vec3, 64),
        field("time", UniformKind::Float, 76),
        field("lookat", UniformKind::Vec3, 80),
        field("vfov", UniformKind::Float, 92),
        field("ambient_light", UniformKind::Vec3, 96),
        field("yaw", UniformKind::Float, 108),
        field("pitch", UniformKind::Float, 112),
        field("orthographic", UniformKind::Bool, 116),
        field("incremental", UniformKind::Bool, 120),
        field("seed", UniformKind::UInt, 124),
        field("n_samples", UniformKind::Int, 128),
        field("n_bounces", UniformKind::Int, 132),
        field("accumulated_frames", UniformKind::UInt, 136),
        field("n_spheres", UniformKind::UInt, 140),
        field("n_triangles", UniformKind::UInt, 144),
    ],
};

/// Parameters of the display program.
pub static DISPLAY_UNIFORMS: UniformLayout = UniformLayout {
    program: "display",
    struct_name: "DisplayParams",
    size: 16,
    fields: &[
        field("tone_mapping_mode", UniformKind::Int, 0),
        field("exposure", UniformKind::Float, 4),
    ],
};

impl UniformLayout {
    pub fn field(&self, name: &str) -> Option<&UniformField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// WGSL struct matching this layout, with explicit `u32` padding.
    pub fn wgsl_struct(&self) -> String {
        let mut out = format!("struct {} {{\n", self.struct_name);
        let mut cursor = 0u64;
        let mut pad = 0;
        let mut emit_pad = |out: &mut String, from: u64, to: u64| {
            let mut at = from;
            while at < to {
                let _ = writeln!(out, "    _pad{pad}: u32,");
                pad += 1;
                at += 4;
            }
        };
        for f in self.fields {
            // vec3/mat4 gaps are filled by WGSL's own alignment
            if f.offset > cursor && f.kind.align() == 4 {
                emit_pad(&mut out, cursor, f.offset);
            }
            let _ = writeln!(out, "    {}: {},", f.name, f.kind.wgsl());
            cursor = f.offset + f.kind.size();
        }
        emit_pad(&mut out, cursor, self.size);
        out.push_str("}\n");
        out
    }
}

/// Host-staged values for one program's uniform block.
#[derive(Debug, Clone)]
pub struct UniformBlock {
    layout: &'static UniformLayout,
    bytes: Vec<u8>,
    dirty: bool,
}

impl UniformBlock {
    pub fn new(layout: &'static UniformLayout) -> Self {
        Self {
            layout,
            bytes: vec![0u8; layout.size as usize],
            dirty: true,
        }
    }

    pub fn compute() -> Self {
        Self::new(&COMPUTE_UNIFORMS)
    }

    pub fn display() -> Self {
        Self::new(&DISPLAY_UNIFORMS)
    }

    #[inline]
    pub fn program(&self) -> &'static str {
        self.layout.program
    }

    #[inline]
    pub fn layout(&self) -> &'static UniformLayout {
        self.layout
    }

    /// Staged bytes, ready for `queue.write_buffer`.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// True when a value changed since the last [`Self::mark_clean`].
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    fn locate(&self, name: &str, kind: UniformKind) -> Result<usize> {
        let f = self.layout.field(name).ok_or_else(|| Error::UnknownUniform {
            program: self.layout.program,
            name: name.to_string(),
        })?;
        if f.kind != kind {
            return Err(Error::UniformKindMismatch {
                name: name.to_string(),
                expected: f.kind,
                actual: kind,
            });
        }
        Ok(f.offset as usize)
    }

    fn write(&mut self, name: &str, kind: UniformKind, data: &[u8]) -> Result<()> {
        let at = self.locate(name, kind)?;
        let dst = &mut self.bytes[at..at + data.len()];
        if dst != data {
            dst.copy_from_slice(data);
            self.dirty = true;
        }
        Ok(())
    }

    fn read<T: bytemuck::Pod>(&self, name: &str, kind: UniformKind) -> Result<T> {
        let at = self.locate(name, kind)?;
        let len = std::mem::size_of::<T>();
        Ok(bytemuck::pod_read_unaligned(&self.bytes[at..at + len]))
    }

    pub fn set_float(&mut self, name: &str, v: f32) -> Result<()> {
        self.write(name, UniformKind::Float, bytemuck::bytes_of(&v))
    }

    pub fn set_int(&mut self, name: &str, v: i32) -> Result<()> {
        self.write(name, UniformKind::Int, bytemuck::bytes_of(&v))
    }

    pub fn set_uint(&mut self, name: &str, v: u32) -> Result<()> {
        self.write(name, UniformKind::UInt, bytemuck::bytes_of(&v))
    }

    pub fn set_bool(&mut self, name: &str, v: bool) -> Result<()> {
        self.write(name, UniformKind::Bool, bytemuck::bytes_of(&(v as u32)))
    }

    pub fn set_vec3(&mut self, name: &str, v: Vec3) -> Result<()> {
        self.write(name, UniformKind::Vec3, bytemuck::bytes_of(&v.to_array()))
    }

    /// Column-major, as glam stores it.
    pub fn set_mat4(&mut self, name: &str, m: &Mat4) -> Result<()> {
        self.write(name, UniformKind::Mat4, bytemuck::bytes_of(&m.to_cols_array()))
    }

    pub fn get_float(&self, name: &str) -> Result<f32> {
        self.read(name, UniformKind::Float)
    }

    pub fn get_int(&self, name: &str) -> Result<i32> {
        self.read(name, UniformKind::Int)
    }

    pub fn get_uint(&self, name: &str) -> Result<u32> {
        self.read(name, UniformKind::UInt)
    }

    pub fn get_bool(&self, name: &str) -> Result<bool> {
        self.read::<u32>(name, UniformKind::Bool).map(|v| v != 0)
    }

    pub fn get_vec3(&self, name: &str) -> Result<Vec3> {
        self.read::<[f32; 3]>(name, UniformKind::Vec3).map(Vec3::from_array)
    }

    pub fn get_mat4(&self, name: &str) -> Result<Mat4> {
        self.read::<[f32; 16]>(name, UniformKind::Mat4)
            .map(|a| Mat4::from_cols_array(&a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_layout(layout: &UniformLayout) {
        assert_eq!(layout.size % 16, 0);
        let mut end = 0;
        for f in layout.fields {
            assert_eq!(f.offset % f.kind.align(), 0, "{} misaligned", f.name);
            assert!(f.offset >= end, "{} overlaps previous field", f.name);
            end = f.offset + f.kind.size();
        }
        assert!(end <= layout.size);
    }

    #[test]
    fn test_layouts_follow_alignment() {
        check_layout(&COMPUTE_UNIFORMS);
        check_layout(&DISPLAY_UNIFORMS);
    }

    #[test]
    fn test_set_get_by_name() {
        let mut block = UniformBlock::compute();
        block.set_float("time", 1.5).unwrap();
        block.set_bool("orthographic", true).unwrap();
        block.set_uint("seed", 0xdead_beef).unwrap();
        block.set_int("n_samples", 10).unwrap();
        block.set_vec3("lookfrom", Vec3::new(1.0, 2.0, 3.0)).unwrap();
        let m = Mat4::from_translation(Vec3::new(4.0, 5.0, 6.0));
        block.set_mat4("view", &m).unwrap();

        assert_eq!(block.get_float("time").unwrap(), 1.5);
        assert!(block.get_bool("orthographic").unwrap());
        assert_eq!(block.get_uint("seed").unwrap(), 0xdead_beef);
        assert_eq!(block.get_int("n_samples").unwrap(), 10);
        assert_eq!(block.get_vec3("lookfrom").unwrap(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(block.get_mat4("view").unwrap(), m);

        // time sits right after lookfrom in the vec3's padding slot
        assert_eq!(&block.bytes()[76..80], &1.5f32.to_ne_bytes());
    }

    #[test]
    fn test_unknown_name() {
        let mut block = UniformBlock::display();
        let err = block.set_float("gamma", 2.2).unwrap_err();
        assert!(matches!(err, Error::UnknownUniform { program: "display", .. }));
    }

    #[test]
    fn test_kind_mismatch() {
        let mut block = UniformBlock::display();
        let err = block.set_float("tone_mapping_mode", 6.0).unwrap_err();
        assert!(matches!(
            err,
            Error::UniformKindMismatch {
                expected: UniformKind::Int,
                actual: UniformKind::Float,
                ..
            }
        ));
    }

    #[test]
    fn test_dirty_tracking() {
        let mut block = UniformBlock::display();
        block.mark_clean();
        block.set_int("tone_mapping_mode", 0).unwrap();
        assert!(!block.is_dirty());
        block.set_int("tone_mapping_mode", 6).unwrap();
        assert!(block.is_dirty());
    }

    #[test]
    fn test_wgsl_struct() {
        let wgsl = DISPLAY_UNIFORMS.wgsl_struct();
        assert!(wgsl.starts_with("struct DisplayParams {"));
        assert!(wgsl.contains("tone_mapping_mode: i32,"));
        assert!(wgsl.contains("_pad1: u32,"));
        assert!(!wgsl.contains("_pad2"));

        let wgsl = COMPUTE_UNIFORMS.wgsl_struct();
        assert!(wgsl.contains("view: mat4x4<f32>,"));
        assert!(wgsl.contains("orthographic: u32,"));
        // 148..160 padded with three words
        assert!(wgsl.contains("_pad2: u32,"));
        assert!(!wgsl.contains("_pad3"));
    }
}
