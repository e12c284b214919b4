//! Storage buffers bound to the fixed compute slots.

use std::collections::BTreeMap;

use wgpu::util::DeviceExt;

use super::slots::{SlotEntry, StorageBuffer, STORAGE_SLOTS};
use crate::util::{Error, Result};

/// Smallest buffer created for a slot (wgpu rejects zero-sized bindings).
pub const MIN_SLOT_BYTES: u64 = 16;

/// Byte size a payload occupies once uploaded.
pub fn padded_len(len: usize) -> u64 {
    let len = (len as u64).max(MIN_SLOT_BYTES);
    len.div_ceil(wgpu::COPY_BUFFER_ALIGNMENT) * wgpu::COPY_BUFFER_ALIGNMENT
}

/// A payload must hold whole elements of the slot's type.
pub fn check_payload(entry: &SlotEntry, len: usize) -> Result<()> {
    let len = len as u64;
    if len % entry.stride != 0 {
        return Err(Error::MisalignedPayload { slot: entry.slot, len, stride: entry.stride });
    }
    Ok(())
}

/// Primitive counts are fixed once a slot exists: a rebind must carry
/// exactly as many bytes as the first upload.
pub fn check_rebind(slot: u32, existing: u64, len: usize) -> Result<()> {
    let actual = len as u64;
    if actual != existing {
        return Err(Error::SlotSizeMismatch { slot, expected: existing, actual });
    }
    Ok(())
}

pub struct SlotBuffer {
    pub buffer: wgpu::Buffer,
    /// Payload bytes of the first upload.
    pub len: u64,
    /// Allocation size, at least [`MIN_SLOT_BYTES`].
    pub size: u64,
}

/// Owns one GPU buffer per slot of the binding table.
#[derive(Default)]
pub struct StorageBinder {
    slots: BTreeMap<u32, SlotBuffer>,
    /// Bumped whenever a buffer is (re)created; bind groups key off it.
    generation: u64,
}

impl StorageBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the buffer for `slot`, or overwrite it in place.
    pub fn set(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, slot: u32, bytes: &[u8]) -> Result<()> {
        let entry = StorageBuffer::from_slot(slot)?.entry();
        check_payload(entry, bytes.len())?;

        if let Some(existing) = self.slots.get(&slot) {
            check_rebind(slot, existing.len, bytes.len())?;
            if !bytes.is_empty() {
                queue.write_buffer(&existing.buffer, 0, bytes);
            }
            return Ok(());
        }

        let size = padded_len(bytes.len());
        let mut contents = bytes.to_vec();
        contents.resize(size as usize, 0);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(entry.name),
            contents: &contents,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });
        log::debug!("slot {} ({}) created: {} bytes", slot, entry.name, size);

        self.slots.insert(slot, SlotBuffer { buffer, len: bytes.len() as u64, size });
        self.generation += 1;
        Ok(())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Bind group entries for every slot, in table order.
    pub fn bind_group_entries(&self) -> Result<Vec<wgpu::BindGroupEntry<'_>>> {
        STORAGE_SLOTS
            .iter()
            .map(|e| {
                let slot = self.slots.get(&e.slot).ok_or(Error::MissingSlot(e.slot))?;
                Ok(wgpu::BindGroupEntry {
                    binding: e.slot,
                    resource: slot.buffer.as_entire_binding(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_len() {
        assert_eq!(padded_len(0), MIN_SLOT_BYTES);
        assert_eq!(padded_len(4), MIN_SLOT_BYTES);
        assert_eq!(padded_len(40), 40);
        assert_eq!(padded_len(160), 160);
        assert_eq!(padded_len(41), 44);
    }

    #[test]
    fn test_rebind_size() {
        check_rebind(10, 160, 160).unwrap();
        check_rebind(20, 0, 0).unwrap();
        let err = check_rebind(10, 160, 176).unwrap_err();
        assert!(matches!(err, Error::SlotSizeMismatch { slot: 10, expected: 160, actual: 176 }));
        // same padded size is not enough
        assert!(matches!(check_rebind(11, 44, 41), Err(Error::SlotSizeMismatch { slot: 11, expected: 44, actual: 41 })));
        // an empty triangle slot cannot grow
        assert!(check_rebind(20, 0, 16).is_err());
    }

    #[test]
    fn test_payload_must_hold_whole_elements() {
        let radius = StorageBuffer::SphereRadius.entry();
        check_payload(radius, 40).unwrap();
        assert!(matches!(
            check_payload(radius, 41),
            Err(Error::MisalignedPayload { slot: 11, len: 41, stride: 4 })
        ));
        let v0 = StorageBuffer::TriangleV0.entry();
        check_payload(v0, 0).unwrap();
        assert!(check_payload(v0, 20).is_err());
    }

    #[test]
    fn test_empty_binder_reports_first_slot() {
        let binder = StorageBinder::new();
        assert!(matches!(binder.bind_group_entries(), Err(Error::MissingSlot(10))));
        assert_eq!(binder.generation(), 0);
    }
}
