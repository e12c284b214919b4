//! Seam between frame orchestration and the GPU.
//!
//! The orchestrator drives any [`FrameBackend`]; the wgpu implementation is
//! [`super::renderer::GpuRenderer`]. Tests drive a recording backend.

use crate::gpu::uniforms::UniformBlock;
use crate::util::Result;

use super::dispatch::DispatchGrid;

/// Operations one frame needs from the GPU, in the order they are issued.
pub trait FrameBackend {
    /// Create or overwrite the storage buffer bound at `slot`.
    fn set_storage_buffer(&mut self, slot: u32, bytes: &[u8]) -> Result<()>;

    /// Copy a staged uniform block into its program's uniform buffer.
    fn set_uniforms(&mut self, block: &UniformBlock) -> Result<()>;

    /// Record the compute pass writing the render target.
    fn dispatch_compute(&mut self, grid: DispatchGrid) -> Result<()>;

    /// Make compute writes to the render target visible to sampling.
    fn memory_barrier(&mut self) -> Result<()>;

    /// Clear the display target and draw the tone-mapped quad.
    ///
    /// Must fail with [`crate::Error::ReadBeforeBarrier`] while a compute
    /// write is still pending.
    fn draw_display(&mut self, params: &UniformBlock) -> Result<()>;

    /// Submit whatever the frame still holds.
    fn finish_frame(&mut self) -> Result<()>;
}

impl<B: FrameBackend + ?Sized> FrameBackend for &mut B {
    fn set_storage_buffer(&mut self, slot: u32, bytes: &[u8]) -> Result<()> {
        (**self).set_storage_buffer(slot, bytes)
    }

    fn set_uniforms(&mut self, block: &UniformBlock) -> Result<()> {
        (**self).set_uniforms(block)
    }

    fn dispatch_compute(&mut self, grid: DispatchGrid) -> Result<()> {
        (**self).dispatch_compute(grid)
    }

    fn memory_barrier(&mut self) -> Result<()> {
        (**self).memory_barrier()
    }

    fn draw_display(&mut self, params: &UniformBlock) -> Result<()> {
        (**self).draw_display(params)
    }

    fn finish_frame(&mut self) -> Result<()> {
        (**self).finish_frame()
    }
}

/// Proof that a compute pass wrote the render target and no barrier followed.
#[must_use = "a pending write has to go through a barrier before display"]
#[derive(Debug)]
pub struct PendingWrite {
    grid: DispatchGrid,
}

/// Proof that the render target is safe to sample.
#[derive(Debug)]
pub struct Readable {
    _private: (),
}

impl PendingWrite {
    pub(crate) fn new(grid: DispatchGrid) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> DispatchGrid {
        self.grid
    }

    /// Issue the barrier and hand out the read token.
    pub fn barrier<B: FrameBackend + ?Sized>(self, backend: &mut B) -> Result<Readable> {
        backend.memory_barrier()?;
        Ok(Readable { _private: () })
    }
}
