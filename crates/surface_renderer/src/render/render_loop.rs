//! Render thread
//!
//! Presents one scene frame per interval until stopped. The loop never owns
//! the surface: it only calls `Renderer::present`, so lifecycle events from
//! the host keep flowing through the renderer while the loop runs. Frames
//! presented outside the Attached state are dropped and the animation holds
//! its position until a surface is back.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::render::{GraphicsBackend, PresentOutcome, RenderError, RenderResult, Renderer, SceneAnimator};

/// Control messages for the render thread
#[derive(Debug)]
pub enum RenderLoopCommand {
    /// Change the time between frames
    SetInterval(Duration),
    /// Exit the loop
    Stop,
}

/// Handle to a running render thread. Dropping it stops and joins the thread.
pub struct RenderLoop {
    thread_handle: Option<JoinHandle<SceneAnimator>>,
    control_tx: Sender<RenderLoopCommand>,
}

impl RenderLoop {
    /// Start a thread that presents `scene` through `renderer` every `interval`.
    ///
    /// # Errors
    /// `ThreadSpawn` if the OS refuses to create the thread.
    pub fn spawn<B>(renderer: Arc<Renderer<B>>, scene: SceneAnimator, interval: Duration) -> RenderResult<Self>
    where
        B: GraphicsBackend + 'static,
    {
        let (control_tx, control_rx) = mpsc::channel();

        let thread_handle = thread::Builder::new()
            .name("render".to_string())
            .spawn(move || run_render_loop(&renderer, scene, &control_rx, interval))?;

        Ok(Self { thread_handle: Some(thread_handle), control_tx })
    }

    /// Change the frame interval of the running loop.
    pub fn set_interval(&self, interval: Duration) {
        if self.control_tx.send(RenderLoopCommand::SetInterval(interval)).is_err() {
            warn!("RenderLoop: thread already exited, interval change ignored");
        }
    }

    /// Stop the loop and wait for the thread to exit.
    ///
    /// Returns the animator in the state the loop left it, or `None` if the
    /// thread panicked.
    pub fn stop(mut self) -> Option<SceneAnimator> {
        self.join()
    }

    fn join(&mut self) -> Option<SceneAnimator> {
        let handle = self.thread_handle.take()?;
        // Fails only if the thread is gone already, which join reports.
        self.control_tx.send(RenderLoopCommand::Stop).ok();
        match handle.join() {
            Ok(scene) => Some(scene),
            Err(e) => {
                error!("RenderLoop thread panicked: {e:?}");
                None
            }
        }
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.join();
    }
}

fn run_render_loop<B: GraphicsBackend>(
    renderer: &Renderer<B>,
    mut scene: SceneAnimator,
    control_rx: &Receiver<RenderLoopCommand>,
    mut interval: Duration,
) -> SceneAnimator {
    info!("RenderLoop: started ({interval:?} per frame)");

    loop {
        match control_rx.recv_timeout(interval) {
            Ok(RenderLoopCommand::SetInterval(new_interval)) => {
                debug!("RenderLoop: interval changed to {new_interval:?}");
                interval = new_interval;
            }
            Ok(RenderLoopCommand::Stop) => break,
            Err(RecvTimeoutError::Timeout) => match renderer.present(&scene.frame()) {
                Ok(PresentOutcome::Presented) => scene.advance(),
                Ok(PresentOutcome::Dropped) => {}
                Err(RenderError::NotAttached { .. }) => debug!("RenderLoop: no surface, frame skipped"),
                Err(e) => warn!("RenderLoop: present failed: {e}"),
            },
            Err(RecvTimeoutError::Disconnected) => {
                debug!("RenderLoop: control channel closed, exiting");
                break;
            }
        }
    }

    info!("RenderLoop: stopped");
    scene
}
