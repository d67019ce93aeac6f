//! Platform surface handles
//!
//! The host owns the native window and hands the renderer a raw handle to
//! it. The renderer never releases the window itself; it only drops its
//! presentation resources before the host destroys it.

use std::ffi::c_void;

use raw_window_handle::{
    AndroidDisplayHandle, AndroidNdkWindowHandle, HasRawDisplayHandle, HasRawWindowHandle,
    RawDisplayHandle, RawWindowHandle,
};

use crate::render::{RenderError, RenderResult, SurfaceHandle};

/// Raw native window plus the display connection it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeSurface {
    window: RawWindowHandle,
    display: RawDisplayHandle,
}

// SAFETY: the handles are plain identifiers. The constructors require the
// caller to keep the window alive until `Renderer::detach` returns, and the
// renderer only touches the window under its lock.
unsafe impl Send for NativeSurface {}

impl NativeSurface {
    /// Wrap an `ANativeWindow*` obtained from `ANativeWindow_fromSurface`.
    ///
    /// A null pointer is accepted here and rejected by `attach`.
    ///
    /// # Safety
    /// The window must stay valid until the renderer has detached from it.
    pub unsafe fn android(a_native_window: *mut c_void) -> Self {
        let mut window = AndroidNdkWindowHandle::empty();
        window.a_native_window = a_native_window;
        Self {
            window: RawWindowHandle::AndroidNdk(window),
            display: RawDisplayHandle::Android(AndroidDisplayHandle::empty()),
        }
    }

    /// Wrap handles from any windowing library.
    ///
    /// # Safety
    /// Both handles must stay valid until the renderer has detached from the
    /// window.
    pub const unsafe fn from_raw(window: RawWindowHandle, display: RawDisplayHandle) -> Self {
        Self { window, display }
    }

    /// Whether the handle refers to no window at all
    pub fn is_null(&self) -> bool {
        match self.window {
            RawWindowHandle::AndroidNdk(h) => h.a_native_window.is_null(),
            RawWindowHandle::Xlib(h) => h.window == 0,
            RawWindowHandle::Xcb(h) => h.window == 0,
            RawWindowHandle::Wayland(h) => h.surface.is_null(),
            RawWindowHandle::Win32(h) => h.hwnd.is_null(),
            RawWindowHandle::AppKit(h) => h.ns_view.is_null(),
            _ => false,
        }
    }
}

impl SurfaceHandle for NativeSurface {
    fn validate(&self) -> RenderResult<()> {
        if self.is_null() {
            return Err(RenderError::InvalidSurface("null native window".to_string()));
        }
        Ok(())
    }
}

unsafe impl HasRawWindowHandle for NativeSurface {
    fn raw_window_handle(&self) -> RawWindowHandle {
        self.window
    }
}

unsafe impl HasRawDisplayHandle for NativeSurface {
    fn raw_display_handle(&self) -> RawDisplayHandle {
        self.display
    }
}
