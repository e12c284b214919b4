//! GPU buffer binder: slot table, storage buffers, uniform blocks,
//! render targets and shader sources.

pub mod shaders;
pub mod slots;
pub mod storage;
pub mod targets;
pub mod uniforms;

pub use slots::{StorageBuffer, TextureAccess, TextureBinding, STORAGE_SLOTS};
pub use storage::StorageBinder;
pub use targets::RenderTargets;
pub use uniforms::{UniformBlock, UniformKind};
