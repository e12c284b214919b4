//! Frame protocol against a recording backend

use std::collections::BTreeMap;

use glam::{Mat4, Vec3};
use rand::rngs::mock::StepRng;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use raytracer::gpu::slots::{StorageBuffer, STORAGE_SLOTS};
use raytracer::gpu::storage::{check_payload, check_rebind};
use raytracer::gpu::UniformBlock;
use raytracer::render::{DispatchGrid, FrameBackend, FramePhase, Manager, Orchestrator, OrchestratorState, Session};
use raytracer::scene::{init_scene, MaterialKind, N_SPHERES};
use raytracer::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Storage(u32),
    Uniforms(&'static str),
    Dispatch(DispatchGrid),
    Barrier,
    Display,
    Finish,
}

/// Records every call. Slot uploads go through the same checks as
/// `StorageBinder`, and display is refused before the barrier.
#[derive(Default)]
struct RecordingBackend {
    events: Vec<Event>,
    slots: BTreeMap<u32, Vec<u8>>,
    frame_uniforms: Vec<UniformBlock>,
    display_params: Vec<UniformBlock>,
    pending: bool,
}

impl RecordingBackend {
    fn frame_events(&self) -> Vec<Event> {
        self.events
            .iter()
            .filter(|e| !matches!(e, Event::Storage(_)))
            .cloned()
            .collect()
    }
}

impl FrameBackend for RecordingBackend {
    fn set_storage_buffer(&mut self, slot: u32, bytes: &[u8]) -> Result<()> {
        check_payload(StorageBuffer::from_slot(slot)?.entry(), bytes.len())?;
        if let Some(existing) = self.slots.get(&slot) {
            check_rebind(slot, existing.len() as u64, bytes.len())?;
        }
        self.slots.insert(slot, bytes.to_vec());
        self.events.push(Event::Storage(slot));
        Ok(())
    }

    fn set_uniforms(&mut self, block: &UniformBlock) -> Result<()> {
        self.events.push(Event::Uniforms(block.program()));
        self.frame_uniforms.push(block.clone());
        Ok(())
    }

    fn dispatch_compute(&mut self, grid: DispatchGrid) -> Result<()> {
        self.events.push(Event::Dispatch(grid));
        self.pending = true;
        Ok(())
    }

    fn memory_barrier(&mut self) -> Result<()> {
        self.events.push(Event::Barrier);
        self.pending = false;
        Ok(())
    }

    fn draw_display(&mut self, params: &UniformBlock) -> Result<()> {
        if self.pending {
            return Err(Error::ReadBeforeBarrier);
        }
        self.events.push(Event::Display);
        self.display_params.push(params.clone());
        Ok(())
    }

    fn finish_frame(&mut self) -> Result<()> {
        self.events.push(Event::Finish);
        Ok(())
    }
}

/// Copying decode; recorded byte vectors carry no alignment guarantee.
fn decode<T: bytemuck::Pod>(bytes: &[u8]) -> Vec<T> {
    bytes
        .chunks_exact(std::mem::size_of::<T>())
        .map(bytemuck::pod_read_unaligned)
        .collect()
}

fn started() -> (Orchestrator, RecordingBackend) {
    let mut orch = Orchestrator::new();
    let mut backend = RecordingBackend::default();
    orch.start(&init_scene(), &mut backend).unwrap();
    (orch, backend)
}

#[test]
fn test_start_uploads_every_slot_in_table_order() {
    let (orch, backend) = started();
    assert_eq!(orch.state(), OrchestratorState::Running);
    let uploaded: Vec<u32> = backend
        .events
        .iter()
        .filter_map(|e| match e {
            Event::Storage(s) => Some(*s),
            _ => None,
        })
        .collect();
    let expected: Vec<u32> = STORAGE_SLOTS.iter().map(|e| e.slot).collect();
    assert_eq!(uploaded, expected);
}

#[test]
fn test_slot_payloads_decode_to_scene() {
    let (_, backend) = started();
    let scene = init_scene();

    let positions: Vec<[f32; 4]> = decode(&backend.slots[&StorageBuffer::SpherePosition.slot()]);
    let radius: Vec<f32> = decode(&backend.slots[&StorageBuffer::SphereRadius.slot()]);
    let material: Vec<i32> = decode(&backend.slots[&StorageBuffer::SphereMaterial.slot()]);
    let albedo: Vec<[f32; 4]> = decode(&backend.slots[&StorageBuffer::SphereAlbedo.slot()]);

    assert_eq!(positions.len(), N_SPHERES);
    assert_eq!(&positions[..], &scene.spheres.positions[..]);
    assert_eq!(&radius[..], &scene.spheres.radius[..]);
    assert_eq!(&material[..], &scene.spheres.material_type[..]);
    assert_eq!(&albedo[..], &scene.spheres.albedo[..]);

    assert_eq!(positions[0], [2.0, 0.0, -10.0, 1.0]);
    assert_eq!(MaterialKind::from_code(material[0]), Some(MaterialKind::Light));
    assert!(backend.slots[&StorageBuffer::TriangleV0.slot()].is_empty());
}

#[test]
fn test_frame_order() {
    let (mut orch, mut backend) = started();
    let mut session = Session::default();
    let mut rng = StdRng::seed_from_u64(3);

    orch.run_frame(&mut session, &mut backend, &mut rng, 0.016).unwrap();
    assert_eq!(
        backend.frame_events(),
        vec![
            Event::Uniforms("compute"),
            Event::Dispatch(DispatchGrid { x: 60, y: 33, z: 1 }),
            Event::Barrier,
            Event::Display,
            Event::Finish,
        ]
    );
    assert_eq!(orch.phase(), FramePhase::Finished);
}

#[test]
fn test_display_before_barrier_is_rejected() {
    let mut backend = RecordingBackend::default();
    backend.dispatch_compute(DispatchGrid::for_resolution(64, 64)).unwrap();
    let err = backend.draw_display(&UniformBlock::display()).unwrap_err();
    assert!(matches!(err, Error::ReadBeforeBarrier));
}

#[test]
fn test_frame_uniforms() {
    let (mut orch, mut backend) = started();
    let mut session = Session::new(Manager { ambient_light: false, ..Manager::default() });
    let mut rng = StdRng::seed_from_u64(11);
    let expected_seed = StdRng::seed_from_u64(11).next_u32();

    let stats = orch.run_frame(&mut session, &mut backend, &mut rng, 0.5).unwrap();
    assert_eq!(stats.seed, expected_seed);

    let u = &backend.frame_uniforms[0];
    assert_eq!(u.get_uint("seed").unwrap(), expected_seed);
    assert_eq!(u.get_float("time").unwrap(), 0.5);
    assert_eq!(u.get_vec3("ambient_light").unwrap(), Vec3::ZERO);
    assert!(u.get_bool("incremental").unwrap());
    assert!(!u.get_bool("orthographic").unwrap());
    assert_eq!(u.get_int("n_samples").unwrap(), 10);
    assert_eq!(u.get_int("n_bounces").unwrap(), 5);
    assert_eq!(u.get_uint("n_spheres").unwrap(), N_SPHERES as u32);
    assert_eq!(u.get_uint("n_triangles").unwrap(), 0);
    assert_eq!(u.get_float("vfov").unwrap(), 45.0);
    assert_eq!(u.get_vec3("lookfrom").unwrap(), Vec3::ZERO);

    let expected_view = Mat4::look_at_rh(Vec3::ZERO, session.camera.target(), Vec3::Y);
    assert!(u.get_mat4("view").unwrap().abs_diff_eq(expected_view, 1e-6));

    let params = &backend.display_params[0];
    assert_eq!(params.get_int("tone_mapping_mode").unwrap(), 6);
    assert_eq!(params.get_float("exposure").unwrap(), 0.75);
}

#[test]
fn test_seeds_follow_the_rng_stream() {
    let (mut orch, mut backend) = started();
    let mut session = Session::default();
    let mut rng = StdRng::seed_from_u64(42);
    let mut reference = StdRng::seed_from_u64(42);

    for i in 0..4 {
        let stats = orch.run_frame(&mut session, &mut backend, &mut rng, i as f64 * 0.1).unwrap();
        assert_eq!(stats.seed, reference.next_u32());
    }
}

#[test]
fn test_accumulation_across_frames() {
    let (mut orch, mut backend) = started();
    let mut session = Session::default();
    let mut rng = StdRng::seed_from_u64(0);

    for i in 0..3 {
        orch.run_frame(&mut session, &mut backend, &mut rng, i as f64).unwrap();
    }
    assert_eq!(session.manager.accumulated_frames, 3);
    // the third frame blended into two previous ones
    assert_eq!(backend.frame_uniforms[2].get_uint("accumulated_frames").unwrap(), 2);

    session.camera.translate(Vec3::Z, 1.0, 1.0);
    session.manager.reset_accumulation();
    orch.run_frame(&mut session, &mut backend, &mut rng, 3.0).unwrap();
    assert_eq!(backend.frame_uniforms[3].get_uint("accumulated_frames").unwrap(), 0);
    assert_eq!(session.manager.accumulated_frames, 1);
}

#[test]
fn test_timer_is_monotonic_through_frames() {
    let (mut orch, mut backend) = started();
    let mut session = Session::default();
    let mut rng = StdRng::seed_from_u64(0);

    for (i, now) in [1.0, 0.5, 2.0, 1.5].into_iter().enumerate() {
        let stats = orch.run_frame(&mut session, &mut backend, &mut rng, now).unwrap();
        assert!(stats.delta_time >= 0.0);
        assert_eq!(stats.frame, i as u64 + 1);
    }
    assert_eq!(session.manager.current_time, 2.0);
}

#[test]
fn test_shutdown() {
    let (mut orch, mut backend) = started();
    let mut session = Session::default();
    let mut rng = StdRng::seed_from_u64(0);
    orch.run_frame(&mut session, &mut backend, &mut rng, 0.0).unwrap();

    let manager = orch.shutdown(session);
    assert_eq!(orch.state(), OrchestratorState::Terminating);
    assert_eq!(manager.frame_count, 1);

    let mut session = Session::default();
    let err = orch.run_frame(&mut session, &mut backend, &mut rng, 1.0).unwrap_err();
    assert!(matches!(err, Error::InvalidState { .. }));
}

#[test]
fn test_rebinding_keeps_slot_sizes() {
    let (_, mut backend) = started();
    let radius = StorageBuffer::SphereRadius.slot();
    assert!(backend.set_storage_buffer(radius, &[0u8; 40]).is_ok());

    // one radius fewer
    assert!(matches!(
        backend.set_storage_buffer(radius, &[0u8; 36]),
        Err(Error::SlotSizeMismatch { slot: 11, expected: 40, actual: 36 })
    ));
    // not a whole number of floats
    assert!(matches!(
        backend.set_storage_buffer(radius, &[0u8; 41]),
        Err(Error::MisalignedPayload { slot: 11, .. })
    ));
    // the default scene has no triangles and cannot gain one
    assert!(matches!(
        backend.set_storage_buffer(StorageBuffer::TriangleV0.slot(), &[0u8; 16]),
        Err(Error::SlotSizeMismatch { slot: 20, expected: 0, actual: 16 })
    ));
    assert!(matches!(backend.set_storage_buffer(16, &[0u8; 4]), Err(Error::UnknownSlot(16))));
}

#[test]
fn test_unchanged_uniforms_are_not_reuploaded() {
    let (mut orch, mut backend) = started();
    let mut session = Session::new(Manager { incremental_rendering: false, ..Manager::default() });
    // constant seed and clock: the second frame stages identical bytes
    let mut rng = StepRng::new(7, 0);

    orch.run_frame(&mut session, &mut backend, &mut rng, 1.0).unwrap();
    orch.run_frame(&mut session, &mut backend, &mut rng, 1.0).unwrap();
    assert_eq!(backend.frame_uniforms.len(), 1);
    assert_eq!(backend.display_params.len(), 2);

    session.camera.rotate(5.0, 0.0, 1.0);
    orch.run_frame(&mut session, &mut backend, &mut rng, 1.0).unwrap();
    assert_eq!(backend.frame_uniforms.len(), 2);
}

#[test]
fn test_out_of_range_parameters_are_clamped() {
    let (mut orch, mut backend) = started();
    let mut session = Session::default();
    session.manager.n_samples = 1000;
    session.manager.n_bounces = 0;
    session.manager.tone_mapping_mode = -3;
    let mut rng = StdRng::seed_from_u64(1);

    orch.run_frame(&mut session, &mut backend, &mut rng, 0.0).unwrap();
    let u = &backend.frame_uniforms[0];
    assert_eq!(u.get_int("n_samples").unwrap(), 64);
    assert_eq!(u.get_int("n_bounces").unwrap(), 1);
    assert_eq!(backend.display_params[0].get_int("tone_mapping_mode").unwrap(), 0);
    assert_eq!(session.manager.n_samples, 64);
}
