//! Lifecycle demo
//!
//! Replays the callbacks a `SurfaceView` host delivers (create, rotate,
//! destroy, create again) against the software backend while the render loop
//! runs, then writes the last presented frame to a PNG.
//!
//! Usage: `lifecycle_demo [output.png] [config.toml|config.ron]`

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use surface_renderer::foundation::logging;
use surface_renderer::prelude::*;

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("Failed to write image: {0}")]
    Image(#[from] image::ImageError),

    #[error("No frame presented within {0:?}")]
    Stalled(Duration),

    #[error("Nothing was presented to the surface")]
    EmptyFrame,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct DemoConfig {
    renderer: RendererConfig,
    scene: SceneConfig,
}

impl Config for DemoConfig {}

const PORTRAIT: Extent = Extent::new(360, 640);
const LANDSCAPE: Extent = Extent::new(640, 360);
const FRAMES_PER_PHASE: u64 = 30;

fn main() {
    let mut args = std::env::args().skip(1);
    let output = args.next().unwrap_or_else(|| "lifecycle.png".to_string());
    let config_path = args.next();

    if let Err(e) = run(&output, config_path.as_deref()) {
        log::error!("{e}");
        eprintln!("lifecycle_demo: {e}");
        std::process::exit(1);
    }
}

fn run(output: &str, config_path: Option<&str>) -> Result<(), DemoError> {
    let config = match config_path {
        Some(path) => DemoConfig::load_from_file(path)?,
        None => DemoConfig::default(),
    };
    config.renderer.validate()?;
    config.scene.validate()?;

    logging::init_with_level(&config.renderer.log_level);
    log::info!("{}", identification());

    let interval = config.renderer.frame_interval();
    let renderer = Arc::new(Renderer::new(SoftwareBackend::new()));
    let render_loop = RenderLoop::spawn(Arc::clone(&renderer), SceneAnimator::new(config.scene), interval)?;

    // surfaceCreated + surfaceChanged
    let surface = SoftwareSurface::new(PORTRAIT);
    renderer.attach(surface.clone())?;
    wait_for_frames(&surface, FRAMES_PER_PHASE, interval)?;

    // Rotation: the window changes size under the same surface
    surface.set_extent(LANDSCAPE);
    renderer.resize()?;
    wait_for_frames(&surface, FRAMES_PER_PHASE, interval)?;

    // surfaceDestroyed: after detach returns the host may release the window
    renderer.detach();
    surface.destroy();
    thread::sleep(interval * 3);
    log::info!("While detached: {:?}", renderer.stats());

    match renderer.attach(surface) {
        Err(e) if e.is_surface_error() => log::info!("Stale surface refused: {e}"),
        other => log::warn!("Unexpected result attaching a destroyed surface: {other:?}"),
    }

    // surfaceCreated again
    let surface = SoftwareSurface::new(LANDSCAPE);
    renderer.attach(surface.clone())?;
    wait_for_frames(&surface, FRAMES_PER_PHASE, interval)?;

    if let Some(scene) = render_loop.stop() {
        log::info!("Render loop stopped at line offset {:.2}", scene.offset());
    }

    let (extent, pixels) = surface.snapshot();
    let frame = image::RgbaImage::from_raw(extent.width, extent.height, pixels).ok_or(DemoError::EmptyFrame)?;
    frame.save(output)?;
    log::info!("Wrote {extent} frame to {output}");

    log::info!("Final stats: {:?}", renderer.stats());
    renderer.detach();
    if let Ok(renderer) = Arc::try_unwrap(renderer) {
        renderer.teardown();
    }
    Ok(())
}

/// Block until `count` more frames reach `surface`.
fn wait_for_frames(surface: &SoftwareSurface, count: u64, interval: Duration) -> Result<(), DemoError> {
    let target = surface.presents() + count;
    let budget = (interval * u32::try_from(count).unwrap_or(u32::MAX)).max(Duration::from_millis(100)) * 10;
    let deadline = Instant::now() + budget;

    while surface.presents() < target {
        if Instant::now() > deadline {
            return Err(DemoError::Stalled(budget));
        }
        thread::sleep(interval / 2);
    }
    Ok(())
}
