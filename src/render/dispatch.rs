//! Compute dispatch sizing.

use crate::gpu::shaders::WORKGROUP_SIZE;

/// Workgroup counts for one compute dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchGrid {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl DispatchGrid {
    /// One 32x32 tile per workgroup. Partial tiles at the right and bottom
    /// edges are dropped, so non-aligned resolutions leave a strip unrendered.
    pub fn for_resolution(width: u32, height: u32) -> Self {
        let grid = Self {
            x: width / WORKGROUP_SIZE,
            y: height / WORKGROUP_SIZE,
            z: 1,
        };
        if width % WORKGROUP_SIZE != 0 || height % WORKGROUP_SIZE != 0 {
            log::debug!(
                "{}x{} is not tile aligned, covering {}x{}",
                width,
                height,
                grid.x * WORKGROUP_SIZE,
                grid.y * WORKGROUP_SIZE
            );
        }
        grid
    }

    pub fn is_empty(&self) -> bool {
        self.x == 0 || self.y == 0 || self.z == 0
    }

    pub fn invocations(&self) -> u64 {
        self.x as u64 * self.y as u64 * self.z as u64 * (WORKGROUP_SIZE * WORKGROUP_SIZE) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_hd() {
        assert_eq!(DispatchGrid::for_resolution(1920, 1080), DispatchGrid { x: 60, y: 33, z: 1 });
    }

    #[test]
    fn test_truncation() {
        assert_eq!(DispatchGrid::for_resolution(64, 64), DispatchGrid { x: 2, y: 2, z: 1 });
        assert_eq!(DispatchGrid::for_resolution(63, 95), DispatchGrid { x: 1, y: 2, z: 1 });
        assert!(DispatchGrid::for_resolution(31, 1080).is_empty());
    }

    #[test]
    fn test_invocations() {
        assert_eq!(DispatchGrid::for_resolution(64, 32).invocations(), 2048);
    }
}
