//! CPU rendering backend
//!
//! Renders frames into an RGBA8 framebuffer and copies finished frames to a
//! shared front buffer standing in for the host's window. Used by tools and
//! tests that have no GPU, and by the lifecycle demo to produce images.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::render::{Extent, Frame, GraphicsBackend, PixelRect, RenderError, RenderResult, SurfaceHandle};

#[derive(Debug, Default)]
struct SurfaceState {
    extent: Extent,
    destroyed: bool,
    front: Vec<u32>,
    front_extent: Extent,
    presents: u64,
}

/// In-memory surface shared between the host side and the renderer.
///
/// Clones refer to the same surface, so the host keeps one clone to resize,
/// destroy, or read back the surface while the renderer holds another.
#[derive(Debug, Clone, Default)]
pub struct SoftwareSurface {
    state: Arc<Mutex<SurfaceState>>,
}

impl SoftwareSurface {
    /// Create a surface with the given size
    pub fn new(extent: Extent) -> Self {
        Self {
            state: Arc::new(Mutex::new(SurfaceState { extent, ..SurfaceState::default() })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SurfaceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Change the size the surface reports, as a host rotation would
    pub fn set_extent(&self, extent: Extent) {
        self.lock().extent = extent;
    }

    /// Current size
    pub fn extent(&self) -> Extent {
        self.lock().extent
    }

    /// Mark the surface destroyed; it can no longer be attached or presented to
    pub fn destroy(&self) {
        self.lock().destroyed = true;
    }

    /// Whether `destroy` was called
    pub fn is_destroyed(&self) -> bool {
        self.lock().destroyed
    }

    /// Number of frames presented to this surface
    pub fn presents(&self) -> u64 {
        self.lock().presents
    }

    /// Copy of the last presented frame as tightly packed RGBA8 bytes
    pub fn snapshot(&self) -> (Extent, Vec<u8>) {
        let state = self.lock();
        (state.front_extent, bytemuck::cast_slice(&state.front).to_vec())
    }

    /// RGBA8 bytes of one pixel of the last presented frame
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let state = self.lock();
        let extent = state.front_extent;
        if x >= extent.width || y >= extent.height {
            return None;
        }
        let index = y as usize * extent.width as usize + x as usize;
        state.front.get(index).map(|p| bytemuck::cast(*p))
    }
}

impl SurfaceHandle for SoftwareSurface {
    fn validate(&self) -> RenderResult<()> {
        if self.is_destroyed() {
            return Err(RenderError::InvalidSurface("software surface destroyed".to_string()));
        }
        Ok(())
    }
}

/// Back buffer bound to one surface
pub struct SoftwareTarget {
    surface: SoftwareSurface,
    extent: Extent,
    pixels: Vec<u32>,
}

impl SoftwareTarget {
    fn fill(&mut self, rect: PixelRect, pixel: u32) {
        let width = self.extent.width as usize;
        let (x, w) = (rect.x as usize, rect.width as usize);
        for row in rect.y..rect.y + rect.height {
            let start = row as usize * width + x;
            self.pixels[start..start + w].fill(pixel);
        }
    }
}

/// Graphics backend rendering on the CPU
#[derive(Debug, Default)]
pub struct SoftwareBackend {
    _private: (),
}

impl SoftwareBackend {
    /// Create the backend
    pub const fn new() -> Self {
        Self { _private: () }
    }
}

impl GraphicsBackend for SoftwareBackend {
    type Surface = SoftwareSurface;
    type Context = ();
    type Target = SoftwareTarget;

    fn name(&self) -> &'static str {
        "software"
    }

    fn create_context(&mut self, _surface: &SoftwareSurface) -> RenderResult<()> {
        Ok(())
    }

    fn create_target(&mut self, _context: &mut (), surface: &SoftwareSurface) -> RenderResult<SoftwareTarget> {
        let extent = surface.extent();
        log::debug!("Software target created ({extent})");
        Ok(SoftwareTarget { surface: surface.clone(), extent, pixels: vec![0; extent.area()] })
    }

    fn target_extent(&self, target: &SoftwareTarget) -> Extent {
        target.extent
    }

    fn query_extent(&self, _context: &(), target: &SoftwareTarget) -> RenderResult<Extent> {
        target.surface.validate()?;
        Ok(target.surface.extent())
    }

    fn rebuild_target(&mut self, _context: &mut (), target: &mut SoftwareTarget, extent: Extent) -> RenderResult<()> {
        target.extent = extent;
        target.pixels = vec![0; extent.area()];
        Ok(())
    }

    fn present(&mut self, _context: &mut (), target: &mut SoftwareTarget, frame: &Frame) -> RenderResult<()> {
        target.surface.validate()?;
        if target.surface.extent() != target.extent {
            return Err(RenderError::TargetOutOfDate);
        }

        target.pixels.fill(bytemuck::cast(frame.clear_color.to_rgba8()));
        for primitive in &frame.primitives {
            if let Some(rect) = primitive.to_pixels(target.extent) {
                target.fill(rect, bytemuck::cast(primitive.color().to_rgba8()));
            }
        }

        let mut state = target.surface.lock();
        state.front.clone_from(&target.pixels);
        state.front_extent = target.extent;
        state.presents += 1;
        Ok(())
    }

    fn destroy_target(&mut self, _context: &mut (), target: SoftwareTarget) {
        log::debug!("Software target released ({})", target.extent);
    }

    fn destroy_context(&mut self, _context: ()) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{Renderer, RendererState, SceneAnimator};

    const WHITE: [u8; 4] = [255, 255, 255, 255];
    const BLACK: [u8; 4] = [0, 0, 0, 255];

    #[test]
    fn test_scene_rect_covers_centre_half() {
        let surface = SoftwareSurface::new(Extent::new(200, 100));
        let renderer = Renderer::new(SoftwareBackend::new());
        renderer.attach(surface.clone()).unwrap();
        renderer.present(&SceneAnimator::default().frame()).unwrap();

        assert_eq!(surface.pixel(100, 25), Some(WHITE));
        assert_eq!(surface.pixel(50, 25), Some(WHITE));
        assert_eq!(surface.pixel(49, 25), Some(BLACK));
        assert_eq!(surface.pixel(150, 25), Some(BLACK));
        assert_eq!(surface.pixel(100, 24), Some(BLACK));
        assert_eq!(surface.pixel(0, 0), Some(BLACK));
    }

    #[test]
    fn test_line_fades_from_left_edge() {
        let surface = SoftwareSurface::new(Extent::new(200, 100));
        let renderer = Renderer::new(SoftwareBackend::new());
        renderer.attach(surface.clone()).unwrap();
        renderer.present(&SceneAnimator::default().frame()).unwrap();

        let left = surface.pixel(0, 50).unwrap();
        let middle_left = surface.pixel(30, 50).unwrap();
        assert!(left[0] > middle_left[0], "{left:?} vs {middle_left:?}");
        assert!(left[0] > 200);
        // offset 0: nothing right of centre yet
        assert_eq!(surface.pixel(190, 50), Some(BLACK));
    }

    #[test]
    fn test_rotation_triggers_rebuild_on_present() {
        let surface = SoftwareSurface::new(Extent::new(64, 32));
        let renderer = Renderer::new(SoftwareBackend::new());
        renderer.attach(surface.clone()).unwrap();

        surface.set_extent(Extent::new(32, 64));
        renderer.present(&Frame::default()).unwrap();

        assert_eq!(surface.snapshot().0, Extent::new(32, 64));
        assert_eq!(surface.snapshot().1.len(), 32 * 64 * 4);
        assert_eq!(renderer.stats().target_rebuilds, 1);
    }

    #[test]
    fn test_destroyed_surface_is_refused() {
        let surface = SoftwareSurface::new(Extent::new(8, 8));
        let renderer = Renderer::new(SoftwareBackend::new());
        renderer.attach(surface.clone()).unwrap();
        surface.destroy();

        assert!(renderer.present(&Frame::default()).unwrap_err().is_surface_error());
        renderer.detach();
        assert!(renderer.attach(surface).unwrap_err().is_surface_error());
        assert_eq!(renderer.state(), RendererState::Detached);
    }

    #[test]
    fn test_presents_are_counted_per_surface() {
        let first = SoftwareSurface::new(Extent::new(4, 4));
        let second = SoftwareSurface::new(Extent::new(4, 4));
        let renderer = Renderer::new(SoftwareBackend::new());

        renderer.attach(first.clone()).unwrap();
        renderer.present(&Frame::default()).unwrap();
        renderer.detach();
        renderer.attach(second.clone()).unwrap();
        renderer.present(&Frame::default()).unwrap();
        renderer.present(&Frame::default()).unwrap();

        assert_eq!((first.presents(), second.presents()), (1, 2));
    }
}
