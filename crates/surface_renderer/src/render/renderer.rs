//! Renderer core: the surface lifecycle state machine
//!
//! The host drives four transitions from its UI thread while a render thread
//! calls `present`:
//!
//! ```text
//! Uninitialized --attach--> Attached --detach--> Detached
//!                            |    ^                  |
//!                            resize                  |
//!                            |    |                  |
//!                            +----+<-----attach------+
//! ```
//!
//! Every transition and every present runs under one mutex. A present in
//! flight therefore always finishes before `detach` starts releasing the
//! presentation target, and `detach` returns only once the backend has
//! released it.
//!
//! The graphics context is created on the first successful attach and kept
//! across detach/attach cycles. It is released by `reset`, by teardown, or
//! when the backend reports the context lost.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::render::{Extent, Frame, GraphicsBackend, RenderError, RenderResult, SurfaceHandle};

/// Lifecycle state of the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RendererState {
    /// No surface has been attached since construction or the last reset
    Uninitialized,
    /// A surface is bound and frames can be presented
    Attached,
    /// The last surface was released; the graphics context may still be alive
    Detached,
}

/// What became of a frame handed to `present`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// The frame reached the surface
    Presented,
    /// The surface has no area to show it; nothing was drawn
    Dropped,
}

/// Counters describing what the renderer has done
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RendererStats {
    /// Frames successfully submitted
    pub frames_presented: u64,
    /// Frames refused or skipped
    pub frames_dropped: u64,
    /// Presentation target rebuilds after a size change
    pub target_rebuilds: u64,
    /// Graphics contexts created
    pub contexts_created: u64,
}

/// Surface and presentation target held while attached
struct Binding<B: GraphicsBackend> {
    target: B::Target,
    surface: B::Surface,
}

/// The target can only be reached through `Slot::Attached`, so it cannot be
/// used in any other state.
enum Slot<B: GraphicsBackend> {
    Uninitialized,
    Attached(Binding<B>),
    Detached,
}

struct Inner<B: GraphicsBackend> {
    backend: B,
    context: Option<B::Context>,
    slot: Slot<B>,
    stats: RendererStats,
}

/// Surface-bound renderer driven by host lifecycle callbacks.
///
/// Construct one per process and share it (typically through an `Arc`) with
/// the host bridge and the render loop. All methods take `&self`.
pub struct Renderer<B: GraphicsBackend> {
    inner: Mutex<Inner<B>>,
}

impl<B: GraphicsBackend> Renderer<B> {
    /// Create a renderer in the Uninitialized state. No graphics resources are
    /// allocated until the first `attach`.
    pub fn new(backend: B) -> Self {
        Self {
            inner: Mutex::new(Inner {
                backend,
                context: None,
                slot: Slot::Uninitialized,
                stats: RendererStats::default(),
            }),
        }
    }

    // A panic inside a backend call must not take the host down with it on
    // the next lifecycle event.
    fn lock(&self) -> MutexGuard<'_, Inner<B>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current lifecycle state
    pub fn state(&self) -> RendererState {
        self.lock().state()
    }

    /// Extent of the presentation target, when attached
    pub fn extent(&self) -> Option<Extent> {
        let inner = self.lock();
        match &inner.slot {
            Slot::Attached(binding) => Some(inner.backend.target_extent(&binding.target)),
            Slot::Uninitialized | Slot::Detached => None,
        }
    }

    /// Whether a graphics context is currently alive
    pub fn has_context(&self) -> bool {
        self.lock().context.is_some()
    }

    /// Snapshot of the renderer counters
    pub fn stats(&self) -> RendererStats {
        self.lock().stats
    }

    /// Bind a new surface.
    ///
    /// Creates the graphics context if none exists yet and builds a
    /// presentation target at the surface's current size. If a surface is
    /// still attached (the host skipped its destroy callback) it is detached
    /// first.
    ///
    /// # Errors
    /// `InvalidSurface` if the handle is null, destroyed, or unusable; the
    /// state is left unchanged. `ContextLoss` if the driver dropped the
    /// context while building the target.
    pub fn attach(&self, surface: B::Surface) -> RenderResult<()> {
        let mut inner = self.lock();
        let result = inner.attach(surface);
        if let Err(err) = &result {
            inner.recover(err);
        }
        result
    }

    /// Re-read the attached surface's size and rebuild the presentation
    /// target if it changed. Never creates a new graphics context.
    ///
    /// # Errors
    /// `NotAttached` outside the Attached state, or a backend error from the
    /// size query or rebuild.
    pub fn resize(&self) -> RenderResult<()> {
        let mut inner = self.lock();
        let result = inner.resize();
        if let Err(err) = &result {
            inner.recover(err);
        }
        result
    }

    /// Release the presentation target and the surface.
    ///
    /// Idempotent and infallible. Waits for an in-flight `present` to finish
    /// and for the backend to release the target before returning, so the
    /// host may destroy the surface as soon as this call returns. The
    /// graphics context is kept for the next `attach`.
    pub fn detach(&self) {
        self.lock().detach();
    }

    /// Render `frame` to the attached surface.
    ///
    /// A target reported out of date is rebuilt at the surface's current size
    /// and the frame retried once. A surface with an empty extent drops the
    /// frame without error and returns `PresentOutcome::Dropped`.
    ///
    /// # Errors
    /// `NotAttached` outside the Attached state (the frame is dropped),
    /// `InvalidSurface` if the surface was lost, `ContextLoss` if the driver
    /// dropped the context (the renderer is then Detached and the next
    /// attach starts over).
    pub fn present(&self, frame: &Frame) -> RenderResult<PresentOutcome> {
        let mut inner = self.lock();
        let result = inner.present(frame);
        if let Err(err) = &result {
            inner.recover(err);
        }
        result
    }

    /// Release every graphics resource and return to Uninitialized.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.release_context();
        inner.slot = Slot::Uninitialized;
        log::info!("Renderer reset");
    }

    /// Final release of everything the renderer owns.
    pub fn teardown(self) {
        log::info!("Renderer teardown");
        drop(self);
    }
}

impl<B: GraphicsBackend> Drop for Renderer<B> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        inner.release_context();
    }
}

impl<B: GraphicsBackend> Inner<B> {
    const fn state(&self) -> RendererState {
        match self.slot {
            Slot::Uninitialized => RendererState::Uninitialized,
            Slot::Attached(_) => RendererState::Attached,
            Slot::Detached => RendererState::Detached,
        }
    }

    fn attach(&mut self, surface: B::Surface) -> RenderResult<()> {
        surface.validate()?;

        if matches!(self.slot, Slot::Attached(_)) {
            log::warn!("attach while already attached; releasing the previous surface first");
            self.release_binding();
        }

        let mut context = match self.context.take() {
            Some(context) => context,
            None => {
                let context = self.backend.create_context(&surface)?;
                self.stats.contexts_created += 1;
                log::info!("Created {} graphics context", self.backend.name());
                context
            }
        };

        let target = self.backend.create_target(&mut context, &surface);
        self.context = Some(context);
        let target = target?;

        let extent = self.backend.target_extent(&target);
        self.slot = Slot::Attached(Binding { target, surface });
        log::info!("Surface attached ({extent})");
        Ok(())
    }

    fn resize(&mut self) -> RenderResult<()> {
        let state = self.state();
        let Self { backend, context, slot, stats } = self;
        let (Slot::Attached(binding), Some(context)) = (slot, context.as_mut()) else {
            return Err(RenderError::NotAttached { operation: "resize", state });
        };

        let current = backend.target_extent(&binding.target);
        let queried = backend.query_extent(context, &binding.target)?;

        if queried == current {
            log::trace!("resize: surface still {current}, nothing to rebuild");
            return Ok(());
        }

        if queried.is_empty() {
            log::debug!("resize: surface reports {queried}, keeping {current} target");
            return Ok(());
        }

        backend.rebuild_target(context, &mut binding.target, queried)?;
        stats.target_rebuilds += 1;
        log::info!("Presentation target rebuilt {current} -> {queried}");
        Ok(())
    }

    fn present(&mut self, frame: &Frame) -> RenderResult<PresentOutcome> {
        let result = self.try_present(frame);
        match &result {
            Ok(PresentOutcome::Presented) => {
                self.stats.frames_presented += 1;
                log::trace!("Frame {} presented", self.stats.frames_presented);
            }
            Ok(PresentOutcome::Dropped) | Err(_) => self.stats.frames_dropped += 1,
        }
        result
    }

    fn try_present(&mut self, frame: &Frame) -> RenderResult<PresentOutcome> {
        let state = self.state();
        let Self { backend, context, slot, stats } = self;
        let (Slot::Attached(binding), Some(context)) = (slot, context.as_mut()) else {
            let err = RenderError::NotAttached { operation: "present", state };
            log::debug!("Frame dropped: {err}");
            return Err(err);
        };

        if backend.target_extent(&binding.target).is_empty() {
            log::trace!("Frame dropped: empty presentation target");
            return Ok(PresentOutcome::Dropped);
        }

        match backend.present(context, &mut binding.target, frame) {
            Ok(()) => Ok(PresentOutcome::Presented),
            Err(RenderError::TargetOutOfDate) => {
                let extent = backend.query_extent(context, &binding.target)?;
                if extent.is_empty() {
                    log::debug!("Frame dropped: surface reports {extent}");
                    return Ok(PresentOutcome::Dropped);
                }
                log::debug!("Presentation target out of date; rebuilding at {extent}");
                backend.rebuild_target(context, &mut binding.target, extent)?;
                stats.target_rebuilds += 1;
                backend.present(context, &mut binding.target, frame)?;
                Ok(PresentOutcome::Presented)
            }
            Err(err) => Err(err),
        }
    }

    fn detach(&mut self) {
        match self.slot {
            Slot::Uninitialized => log::debug!("detach: nothing attached"),
            Slot::Detached => log::debug!("detach: already detached"),
            Slot::Attached(_) => {
                self.release_binding();
                log::info!("Surface detached");
            }
        }
    }

    /// Drop the target and surface, in that order. Only changes the state if
    /// something was attached.
    fn release_binding(&mut self) {
        if !matches!(self.slot, Slot::Attached(_)) {
            return;
        }
        if let Slot::Attached(Binding { target, surface }) = std::mem::replace(&mut self.slot, Slot::Detached) {
            if let Some(context) = self.context.as_mut() {
                self.backend.destroy_target(context, target);
            }
            drop(surface);
        }
    }

    fn release_context(&mut self) {
        self.release_binding();
        if let Some(context) = self.context.take() {
            self.backend.destroy_context(context);
            log::info!("Released {} graphics context", self.backend.name());
        }
    }

    fn recover(&mut self, err: &RenderError) {
        match err {
            RenderError::ContextLoss(reason) => {
                log::error!("Graphics context lost ({reason}); tearing down until next attach");
                self.release_context();
            }
            RenderError::NotAttached { .. } => {}
            other => log::warn!("Renderer operation failed: {other}"),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::render::Color;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{mpsc, Arc};
    use std::thread;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum Event {
        CreateContext(u32),
        CreateTarget { surface: u32, extent: Extent },
        Rebuild { surface: u32, extent: Extent },
        PresentStarted { surface: u32, extent: Extent },
        PresentFinished,
        DestroyTarget(u32),
        DestroyContext(u32),
    }

    #[derive(Debug, Clone, Copy)]
    pub(crate) enum Failure {
        OutOfDate,
        ContextLoss,
        SurfaceLost,
    }

    impl Failure {
        fn into_error(self) -> RenderError {
            match self {
                Self::OutOfDate => RenderError::TargetOutOfDate,
                Self::ContextLoss => RenderError::ContextLoss("device lost".into()),
                Self::SurfaceLost => RenderError::InvalidSurface("surface lost".into()),
            }
        }
    }

    #[derive(Default)]
    pub(crate) struct Script {
        pub events: Vec<Event>,
        pub present_failures: Vec<Failure>,
        pub target_failures: Vec<Failure>,
        pub present_delay: Option<(Duration, mpsc::Sender<()>)>,
    }

    #[derive(Clone)]
    pub(crate) struct MockSurface {
        pub id: u32,
        pub extent: Arc<Mutex<Extent>>,
        pub alive: Arc<AtomicBool>,
    }

    impl MockSurface {
        pub fn new(id: u32, width: u32, height: u32) -> Self {
            Self {
                id,
                extent: Arc::new(Mutex::new(Extent::new(width, height))),
                alive: Arc::new(AtomicBool::new(true)),
            }
        }

        pub fn null() -> Self {
            Self::new(0, 0, 0)
        }

        pub fn set_extent(&self, width: u32, height: u32) {
            *self.extent.lock().unwrap() = Extent::new(width, height);
        }
    }

    impl SurfaceHandle for MockSurface {
        fn validate(&self) -> RenderResult<()> {
            if self.id == 0 {
                return Err(RenderError::InvalidSurface("null surface".into()));
            }
            if !self.alive.load(Ordering::SeqCst) {
                return Err(RenderError::InvalidSurface("surface destroyed".into()));
            }
            Ok(())
        }
    }

    pub(crate) struct MockTarget {
        surface: MockSurface,
        extent: Extent,
    }

    pub(crate) struct MockBackend {
        pub script: Arc<Mutex<Script>>,
        next_context: u32,
    }

    impl MockBackend {
        pub fn new() -> (Self, Arc<Mutex<Script>>) {
            let script = Arc::new(Mutex::new(Script::default()));
            (Self { script: Arc::clone(&script), next_context: 0 }, script)
        }

        fn record(&self, event: Event) {
            self.script.lock().unwrap().events.push(event);
        }
    }

    impl GraphicsBackend for MockBackend {
        type Surface = MockSurface;
        type Context = u32;
        type Target = MockTarget;

        fn name(&self) -> &'static str {
            "mock"
        }

        fn create_context(&mut self, _surface: &MockSurface) -> RenderResult<u32> {
            self.next_context += 1;
            self.record(Event::CreateContext(self.next_context));
            Ok(self.next_context)
        }

        fn create_target(&mut self, _context: &mut u32, surface: &MockSurface) -> RenderResult<MockTarget> {
            if let Some(failure) = self.script.lock().unwrap().target_failures.pop() {
                return Err(failure.into_error());
            }
            let extent = *surface.extent.lock().unwrap();
            self.record(Event::CreateTarget { surface: surface.id, extent });
            Ok(MockTarget { surface: surface.clone(), extent })
        }

        fn target_extent(&self, target: &MockTarget) -> Extent {
            target.extent
        }

        fn query_extent(&self, _context: &u32, target: &MockTarget) -> RenderResult<Extent> {
            if !target.surface.alive.load(Ordering::SeqCst) {
                return Err(RenderError::InvalidSurface("surface destroyed".into()));
            }
            Ok(*target.surface.extent.lock().unwrap())
        }

        fn rebuild_target(&mut self, _context: &mut u32, target: &mut MockTarget, extent: Extent) -> RenderResult<()> {
            target.extent = extent;
            self.record(Event::Rebuild { surface: target.surface.id, extent });
            Ok(())
        }

        fn present(&mut self, _context: &mut u32, target: &mut MockTarget, _frame: &Frame) -> RenderResult<()> {
            let (failure, delay) = {
                let mut script = self.script.lock().unwrap();
                (script.present_failures.pop(), script.present_delay.clone())
            };
            if let Some(failure) = failure {
                return Err(failure.into_error());
            }
            self.record(Event::PresentStarted { surface: target.surface.id, extent: target.extent });
            if let Some((delay, started)) = delay {
                started.send(()).ok();
                thread::sleep(delay);
            }
            self.record(Event::PresentFinished);
            Ok(())
        }

        fn destroy_target(&mut self, _context: &mut u32, target: MockTarget) {
            self.record(Event::DestroyTarget(target.surface.id));
        }

        fn destroy_context(&mut self, context: u32) {
            self.record(Event::DestroyContext(context));
        }
    }

    fn renderer() -> (Renderer<MockBackend>, Arc<Mutex<Script>>) {
        let (backend, script) = MockBackend::new();
        (Renderer::new(backend), script)
    }

    fn events(script: &Arc<Mutex<Script>>) -> Vec<Event> {
        script.lock().unwrap().events.clone()
    }

    fn frame() -> Frame {
        Frame::new(Color::BLACK)
    }

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Attach,
        Resize,
        Detach,
    }

    fn model(state: RendererState, op: Op) -> RendererState {
        match (op, state) {
            (Op::Attach, _) => RendererState::Attached,
            (Op::Resize, s) => s,
            (Op::Detach, RendererState::Uninitialized) => RendererState::Uninitialized,
            (Op::Detach, _) => RendererState::Detached,
        }
    }

    #[test]
    fn test_every_lifecycle_sequence_matches_state_machine() {
        let ops = [Op::Attach, Op::Resize, Op::Detach];
        for len in 0..=6u32 {
            for mut code in 0..3usize.pow(len) {
                let (renderer, _) = renderer();
                let mut expected = RendererState::Uninitialized;
                let mut sequence = Vec::new();
                for step in 0..len {
                    let op = ops[code % 3];
                    code /= 3;
                    sequence.push(op);
                    let surface = MockSurface::new(step + 1, 100 + step, 200);
                    match op {
                        Op::Attach => renderer.attach(surface).unwrap(),
                        Op::Resize => {
                            let result = renderer.resize();
                            assert_eq!(result.is_ok(), expected == RendererState::Attached, "{sequence:?}");
                        }
                        Op::Detach => renderer.detach(),
                    }
                    expected = model(expected, op);
                    assert_eq!(renderer.state(), expected, "after {sequence:?}");
                }
                assert!(renderer.stats().contexts_created <= 1);
            }
        }
    }

    #[test]
    fn test_detach_is_idempotent() {
        let (renderer, script) = renderer();
        renderer.attach(MockSurface::new(1, 640, 480)).unwrap();
        renderer.detach();
        let once = (renderer.state(), events(&script));
        renderer.detach();
        assert_eq!((renderer.state(), events(&script)), once);
        assert_eq!(renderer.state(), RendererState::Detached);
    }

    #[test]
    fn test_detach_without_attach_is_noop() {
        let (renderer, script) = renderer();
        renderer.detach();
        assert_eq!(renderer.state(), RendererState::Uninitialized);
        assert!(!renderer.has_context());
        assert!(events(&script).is_empty());
    }

    #[test]
    fn test_resize_with_unchanged_dimensions_then_present() {
        let (renderer, script) = renderer();
        renderer.attach(MockSurface::new(1, 640, 480)).unwrap();
        renderer.resize().unwrap();
        renderer.present(&frame()).unwrap();

        assert_eq!(renderer.stats().target_rebuilds, 0);
        assert!(!events(&script).iter().any(|e| matches!(e, Event::Rebuild { .. })));
    }

    #[test]
    fn test_present_after_detach_fails_not_attached() {
        let (renderer, _) = renderer();
        renderer.attach(MockSurface::new(1, 640, 480)).unwrap();
        renderer.detach();

        let err = renderer.present(&frame()).unwrap_err();
        assert!(matches!(err, RenderError::NotAttached { state: RendererState::Detached, .. }));
        assert_eq!(renderer.stats().frames_dropped, 1);
    }

    #[test]
    fn test_reattach_presents_with_new_surface_dimensions() {
        let (renderer, script) = renderer();
        renderer.attach(MockSurface::new(1, 640, 480)).unwrap();
        renderer.detach();
        renderer.attach(MockSurface::new(2, 480, 640)).unwrap();
        renderer.present(&frame()).unwrap();

        assert_eq!(renderer.extent(), Some(Extent::new(480, 640)));
        let presents: Vec<_> = events(&script)
            .into_iter()
            .filter(|e| matches!(e, Event::PresentStarted { .. }))
            .collect();
        assert_eq!(presents, vec![Event::PresentStarted { surface: 2, extent: Extent::new(480, 640) }]);
        assert_eq!(renderer.stats().contexts_created, 1);
    }

    #[test]
    fn test_resize_rebuilds_without_new_context() {
        let (renderer, script) = renderer();
        let surface = MockSurface::new(1, 640, 480);
        renderer.attach(surface.clone()).unwrap();

        surface.set_extent(480, 640);
        renderer.resize().unwrap();

        assert_eq!(renderer.extent(), Some(Extent::new(480, 640)));
        assert_eq!(renderer.stats().target_rebuilds, 1);
        let contexts = events(&script).iter().filter(|e| matches!(e, Event::CreateContext(_))).count();
        assert_eq!(contexts, 1);
    }

    #[test]
    fn test_resize_outside_attached_fails() {
        let (renderer, _) = renderer();
        assert!(matches!(
            renderer.resize(),
            Err(RenderError::NotAttached { operation: "resize", state: RendererState::Uninitialized })
        ));
    }

    #[test]
    fn test_resize_to_empty_extent_keeps_target() {
        let (renderer, _) = renderer();
        let surface = MockSurface::new(1, 640, 480);
        renderer.attach(surface.clone()).unwrap();
        surface.set_extent(0, 0);
        renderer.resize().unwrap();
        assert_eq!(renderer.extent(), Some(Extent::new(640, 480)));
    }

    #[test]
    fn test_invalid_surface_leaves_state_unchanged() {
        let (renderer, script) = renderer();
        let err = renderer.attach(MockSurface::null()).unwrap_err();
        assert!(err.is_surface_error());
        assert_eq!(renderer.state(), RendererState::Uninitialized);
        assert!(events(&script).is_empty());

        renderer.attach(MockSurface::new(1, 10, 10)).unwrap();
        renderer.detach();
        let destroyed = MockSurface::new(2, 10, 10);
        destroyed.alive.store(false, Ordering::SeqCst);
        assert!(renderer.attach(destroyed).is_err());
        assert_eq!(renderer.state(), RendererState::Detached);
    }

    #[test]
    fn test_attach_while_attached_releases_previous_surface() {
        let (renderer, script) = renderer();
        renderer.attach(MockSurface::new(1, 10, 10)).unwrap();
        renderer.attach(MockSurface::new(2, 20, 20)).unwrap();

        assert_eq!(renderer.state(), RendererState::Attached);
        assert!(events(&script).contains(&Event::DestroyTarget(1)));
        assert_eq!(renderer.extent(), Some(Extent::new(20, 20)));
    }

    #[test]
    fn test_context_survives_detach_and_reattach() {
        let (renderer, script) = renderer();
        for id in 1..=3 {
            renderer.attach(MockSurface::new(id, 100, 100)).unwrap();
            renderer.detach();
        }
        assert!(renderer.has_context());
        assert_eq!(renderer.stats().contexts_created, 1);
        assert!(!events(&script).iter().any(|e| matches!(e, Event::DestroyContext(_))));
    }

    #[test]
    fn test_context_loss_tears_down_and_next_attach_recreates() {
        let (renderer, script) = renderer();
        renderer.attach(MockSurface::new(1, 100, 100)).unwrap();
        script.lock().unwrap().present_failures.push(Failure::ContextLoss);

        let err = renderer.present(&frame()).unwrap_err();
        assert!(matches!(err, RenderError::ContextLoss(_)));
        assert_eq!(renderer.state(), RendererState::Detached);
        assert!(!renderer.has_context());

        renderer.attach(MockSurface::new(2, 100, 100)).unwrap();
        renderer.present(&frame()).unwrap();
        let log = events(&script);
        assert!(log.contains(&Event::DestroyContext(1)));
        assert!(log.contains(&Event::CreateContext(2)));
    }

    #[test]
    fn test_context_loss_while_building_target() {
        let (renderer, script) = renderer();
        script.lock().unwrap().target_failures.push(Failure::ContextLoss);

        assert!(renderer.attach(MockSurface::new(1, 100, 100)).is_err());
        assert_eq!(renderer.state(), RendererState::Uninitialized);
        assert!(!renderer.has_context());
    }

    #[test]
    fn test_out_of_date_target_is_rebuilt_and_frame_retried() {
        let (renderer, script) = renderer();
        let surface = MockSurface::new(1, 640, 480);
        renderer.attach(surface.clone()).unwrap();
        surface.set_extent(800, 600);
        script.lock().unwrap().present_failures.push(Failure::OutOfDate);

        assert_eq!(renderer.present(&frame()).unwrap(), PresentOutcome::Presented);

        assert_eq!(renderer.extent(), Some(Extent::new(800, 600)));
        let stats = renderer.stats();
        assert_eq!(stats.frames_presented, 1);
        assert_eq!(stats.target_rebuilds, 1);
    }

    #[test]
    fn test_surface_lost_during_present_is_reported_not_fatal() {
        let (renderer, script) = renderer();
        renderer.attach(MockSurface::new(1, 64, 64)).unwrap();
        script.lock().unwrap().present_failures.push(Failure::SurfaceLost);

        assert!(renderer.present(&frame()).unwrap_err().is_surface_error());
        assert_eq!(renderer.state(), RendererState::Attached);
        renderer.detach();
        assert_eq!(renderer.state(), RendererState::Detached);
    }

    #[test]
    fn test_failed_retry_after_out_of_date_counts_dropped_frame() {
        let (renderer, script) = renderer();
        renderer.attach(MockSurface::new(1, 640, 480)).unwrap();
        // Popped last-first: the first present is out of date, the retry loses the surface
        script.lock().unwrap().present_failures.extend([Failure::SurfaceLost, Failure::OutOfDate]);

        assert!(renderer.present(&frame()).unwrap_err().is_surface_error());
        let stats = renderer.stats();
        assert_eq!(stats.frames_presented, 0);
        assert_eq!(stats.frames_dropped, 1);
        assert_eq!(stats.target_rebuilds, 1);
    }

    #[test]
    fn test_out_of_date_with_empty_surface_drops_frame() {
        let (renderer, script) = renderer();
        let surface = MockSurface::new(1, 640, 480);
        renderer.attach(surface.clone()).unwrap();
        surface.set_extent(0, 0);
        script.lock().unwrap().present_failures.push(Failure::OutOfDate);

        assert_eq!(renderer.present(&frame()).unwrap(), PresentOutcome::Dropped);
        assert_eq!(renderer.stats().frames_dropped, 1);
        assert_eq!(renderer.stats().frames_presented, 0);
    }

    #[test]
    fn test_empty_target_drops_frame() {
        let (renderer, script) = renderer();
        renderer.attach(MockSurface::new(1, 0, 480)).unwrap();
        assert_eq!(renderer.present(&frame()).unwrap(), PresentOutcome::Dropped);
        assert_eq!(renderer.stats().frames_dropped, 1);
        assert!(!events(&script).iter().any(|e| matches!(e, Event::PresentStarted { .. })));
    }

    #[test]
    fn test_detach_waits_for_in_flight_present() {
        let (backend, script) = MockBackend::new();
        let renderer = Arc::new(Renderer::new(backend));
        renderer.attach(MockSurface::new(1, 64, 64)).unwrap();

        let (started_tx, started_rx) = mpsc::channel();
        script.lock().unwrap().present_delay = Some((Duration::from_millis(50), started_tx));

        let presenter = {
            let renderer = Arc::clone(&renderer);
            thread::spawn(move || renderer.present(&Frame::default()))
        };

        started_rx.recv().unwrap();
        renderer.detach();

        let log = events(&script);
        let finished = log.iter().position(|e| *e == Event::PresentFinished).unwrap();
        let destroyed = log.iter().position(|e| *e == Event::DestroyTarget(1)).unwrap();
        assert!(finished < destroyed, "target released while present in flight: {log:?}");

        presenter.join().unwrap().unwrap();
        assert_eq!(renderer.state(), RendererState::Detached);
    }

    #[test]
    fn test_reset_returns_to_uninitialized() {
        let (renderer, script) = renderer();
        renderer.attach(MockSurface::new(1, 64, 64)).unwrap();
        renderer.reset();

        assert_eq!(renderer.state(), RendererState::Uninitialized);
        assert!(!renderer.has_context());
        let log = events(&script);
        assert_eq!(&log[log.len() - 2..], &[Event::DestroyTarget(1), Event::DestroyContext(1)]);
    }

    #[test]
    fn test_teardown_releases_target_before_context() {
        let (renderer, script) = renderer();
        renderer.attach(MockSurface::new(7, 64, 64)).unwrap();
        renderer.teardown();

        let log = events(&script);
        assert_eq!(&log[log.len() - 2..], &[Event::DestroyTarget(7), Event::DestroyContext(1)]);
    }
}
