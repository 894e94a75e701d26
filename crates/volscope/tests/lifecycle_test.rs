//! Surface lifecycle, GPU budget and view integration tests.

use std::rc::Rc;

use proptest::prelude::*;
use volscope::*;

const MB: usize = 1 << 20;

fn settings() -> Settings {
    Settings {
        viewport: UVec2::new(20, 20),
        pointer_debounce_ms: 0,
        ..Settings::default()
    }
}

fn phantoms(dims: u32, count: usize) -> (GridGeometry, Vec<ScalarGrid>) {
    let spec = PhantomSpec {
        dims: UVec3::splat(dims),
        ..PhantomSpec::default()
    };
    (spec.geometry(), spec.generate(count))
}

#[test]
fn test_deactivate_reactivate_reproduces_output() {
    let host = Rc::new(HeadlessDisplayHost::new());
    let (geometry, mut grids) = phantoms(12, 1);
    let mut transfer = TransferFunctionTable::from_labels(&brainweb_labels(), 0.3);
    transfer.set_label_opacity(0, 0.0).unwrap();
    let scope = ViewScope::builder(geometry, transfer)
        .host(host.clone())
        .settings(&settings())
        .build();
    let surface = SceneSurface::new(0, grids.remove(0), Rc::clone(&scope)).unwrap();

    surface.set_active(true);
    let image = surface.display_image().unwrap();
    let footprint = surface.memory_footprint();
    assert_eq!(host.live_targets(), 1);
    assert_eq!(scope.broadcaster().surface_count(), 1);

    surface.set_active(false);
    assert_eq!(host.live_targets(), 0);
    assert_eq!(scope.broadcaster().surface_count(), 0);
    assert_eq!(surface.resident_gpu_bytes(), 0);
    assert!(matches!(
        surface.display_image(),
        Err(VolscopeError::SurfaceInactive(0))
    ));

    surface.set_active(true);
    assert_eq!(surface.display_image().unwrap(), image);
    assert_eq!(surface.memory_footprint(), footprint);
    assert_eq!(scope.camera().reset_count(), 1);
}

#[test]
fn test_off_screen_output_requires_active_surface() {
    let (geometry, mut grids) = phantoms(8, 1);
    let scope = ViewScope::builder(geometry, TransferFunctionTable::from_labels(&brainweb_labels(), 0.5))
        .settings(&settings())
        .build();
    let surface = SceneSurface::new(4, grids.remove(0), scope).unwrap();
    surface.set_off_screen(true);
    let err = surface.off_screen_output().unwrap_err();
    assert!(matches!(err, VolscopeError::SurfaceInactive(4)));
    assert!(err.is_precondition());

    surface.set_active(true);
    assert!(surface.off_screen_output().is_ok());
    surface.set_off_screen(false);
    assert!(matches!(
        surface.off_screen_output(),
        Err(VolscopeError::NotOffScreen(4))
    ));
}

#[test]
fn test_hundred_megabyte_budget() {
    assert_eq!(
        assign_render_modes(&[60 * MB, 60 * MB], GpuMemoryBudget::from_megabytes(100)),
        vec![RenderMode::Gpu, RenderMode::RayCast]
    );

    // The same proportions through a view: 60-byte volumes, 100-byte budget.
    let dims = UVec3::new(5, 3, 1);
    let geometry = GridGeometry::with_dims(dims);
    let mut view = JuxtapositionView::new(geometry, &settings());
    view.set_active(true);
    view.gpu_mem_limit_changed(GpuMemoryBudget::from_bytes(100));
    for index in 0..2 {
        let grid = ScalarGrid::filled(dims, 3.0);
        assert_eq!(grid.memory_footprint(), 60);
        view.add_volume(index, grid).unwrap();
    }
    assert_eq!(
        view.render_modes(),
        vec![(0, RenderMode::Gpu), (1, RenderMode::RayCast)]
    );
    let cpu = view.surface(1).unwrap();
    assert!(!cpu.is_gpu_mode());
    assert_eq!(cpu.resident_gpu_bytes(), 0);
    let gpu = view.surface(0).unwrap();
    assert!(gpu.is_gpu_mode());
    if gpu_available() {
        assert_eq!(gpu.resident_gpu_bytes(), 60);
    }
}

#[test]
fn test_byte_labels_stretch_the_budget() {
    let (_, grids) = phantoms(10, 4);
    let footprints: Vec<usize> = grids.iter().map(ScalarGrid::memory_footprint).collect();
    assert_eq!(footprints, vec![1000; 4]);
    let budget = GpuMemoryBudget::from_bytes(4001);
    assert_eq!(
        assign_render_modes(&footprints, budget),
        vec![RenderMode::Gpu; 4]
    );

    let as_floats: Vec<usize> = grids
        .iter()
        .map(|g| g.clone().with_format(VoxelFormat::F32).memory_footprint())
        .collect();
    assert_eq!(
        assign_render_modes(&as_floats, budget),
        vec![
            RenderMode::Gpu,
            RenderMode::RayCast,
            RenderMode::RayCast,
            RenderMode::RayCast
        ]
    );
}

#[test]
fn test_camera_is_shared() {
    let (geometry, grids) = phantoms(10, 2);
    let mut view = JuxtapositionView::new(geometry, &settings());
    view.set_active(true);
    for (index, grid) in grids.into_iter().enumerate() {
        view.add_volume(index, grid).unwrap();
    }
    let other = view.surface(1).unwrap().clone();
    let frames = other.frames_rendered();

    let response = view
        .handle_surface_input(0, &InputEvent::Wheel { delta: 1.0 })
        .unwrap();
    assert_eq!(response, Response::CameraMoved);
    // The other surface redrew with the moved camera.
    assert_eq!(other.frames_rendered(), frames + 1);
}

#[test]
fn test_style_hotkeys_reach_every_surface() {
    let (geometry, grids) = phantoms(8, 2);
    let mut view = JuxtapositionView::new(geometry, &settings());
    view.set_active(true);
    for (index, grid) in grids.into_iter().enumerate() {
        view.add_volume(index, grid).unwrap();
    }
    let key = |code| InputEvent::Key {
        code,
        state: ElementState::Pressed,
    };
    view.handle_surface_input(1, &key(KeyCode::KeyA)).unwrap();
    assert_eq!(view.scope().interactor_style(), InteractorStyle::TrackballActor);
    view.handle_surface_input(0, &key(KeyCode::KeyJ)).unwrap();
    assert_eq!(view.scope().interactor_style(), InteractorStyle::JoystickActor);
}

#[test]
fn test_workspace_paging_session() {
    let spec = PhantomSpec {
        dims: UVec3::splat(10),
        ..PhantomSpec::default()
    };
    let mut workspace = Workspace::new(spec.source(3).unwrap(), settings());
    for index in 0..3 {
        workspace.select(index).unwrap();
    }
    let view = workspace.view_as_mut::<JuxtapositionView>().unwrap();
    view.set_interchangeable(true).unwrap();
    view.set_page(0.5).unwrap();
    let composite = view.composite().unwrap().clone();
    assert_eq!(composite.weights(), vec![0.5, 0.5, 0.0]);

    workspace.deselect(0);
    assert_eq!(composite.members(), vec![1, 2]);
    assert_eq!(composite.linked(), Some(1));

    workspace.set_current_view(ViewKind::ExplicitEncoding).unwrap();
    let explicit = workspace.view_as::<ExplicitEncodingView>().unwrap();
    assert_eq!(explicit.volumes(), vec![1, 2]);
    assert_eq!(explicit.surfaces().len(), 1);

    workspace.close();
    assert!(composite.is_finalized());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_label_edits_round_trip(label in 0usize..12, opacity in 0.0f32..=1.0, r in 0u8..=255, g in 0u8..=255, b in 0u8..=255) {
        let geometry = GridGeometry::with_dims(UVec3::splat(4));
        let view = JuxtapositionView::new(geometry, &settings());
        let color = Vec3::new(f32::from(r), f32::from(g), f32::from(b)) / 255.0;
        let revision = view.scope().transfer_revision();

        view.set_label_opacity(label, opacity).unwrap();
        view.set_label_color(label, color).unwrap();
        prop_assert_eq!(view.scope().label_opacity(label).unwrap(), opacity);
        prop_assert_eq!(view.scope().label_color(label).unwrap(), color);
        prop_assert_eq!(view.scope().transfer_revision(), revision + 2);

        let transfer = view.scope().transfer();
        #[allow(clippy::cast_precision_loss)]
        let center = label as f32;
        prop_assert_eq!(transfer.opacity_at(center), opacity);
        prop_assert_eq!(transfer.color_at(center), color);
    }
}
