//! Headless paging demo.
//!
//! Generates a few head phantoms, shows them in interchangeable mode and
//! writes one composite snapshot per page step to the temp directory.
//!
//! Run with: cargo run --example paging_demo

use volscope::*;

fn main() -> Result<()> {
    init_logging();

    let spec = PhantomSpec {
        dims: UVec3::splat(48),
        ..PhantomSpec::default()
    };
    let settings = Settings {
        viewport: UVec2::new(256, 256),
        ..Settings::default()
    };
    let mut workspace = Workspace::new(spec.source(3)?, settings);
    for index in 0..3 {
        workspace.select(index)?;
    }

    let Some(view) = workspace.view_as_mut::<JuxtapositionView>() else {
        return Ok(());
    };
    // Make skull and white matter visible on top of the defaults.
    view.set_label_opacity(3, 0.3)?;
    view.set_label_opacity(7, 0.05)?;
    view.set_interchangeable(true)?;
    view.set_smoothing_law(SmoothingLaw::Ease)?;

    let out_dir = std::env::temp_dir().join("volscope_paging_demo");
    std::fs::create_dir_all(&out_dir)?;
    let Some(composite) = view.composite().cloned() else {
        return Ok(());
    };
    for step in 0..=8u8 {
        let page = f32::from(step) * 0.25;
        composite.set_page(page)?;
        let path = out_dir.join(format!("page_{step:02}.png"));
        match composite.save_snapshot(&path) {
            Ok(()) => log::info!("page {page:.2} -> {}", path.display()),
            Err(err) => log::warn!("snapshot failed: {err}"),
        }
    }

    workspace.close();
    Ok(())
}
