//! The boundary between the menu engine and a native windowing layer.
//!
//! The engine never draws. It asks the platform for a handle when a menu
//! instance comes to life, hands it back on destruction, forwards the
//! coalesced recompute/redraw requests when the idle queue is flushed, and
//! tells it which menubar belongs to which toplevel.

pub mod headless;

use thiserror::Error;

use crate::core::{MenuType, WindowId};

pub use headless::{HeadlessPlatform, Journal, PlatformCall};

/// Opaque identifier of a platform menu object (HMENU, MenuRef, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(pub u64);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("native handle limit of {limit} reached")]
    HandleLimit { limit: usize },
}

/// Leaf operations the engine calls out to.
pub trait MenuPlatform {
    /// Allocates the native object backing a menu instance.
    fn create_native_handle(
        &mut self,
        name: &str,
        menu_type: MenuType,
    ) -> Result<NativeHandle, PlatformError>;

    fn destroy_native_handle(&mut self, handle: NativeHandle);

    /// Runs a deferred geometry recomputation for a live menu.
    fn recompute_geometry(&mut self, name: &str, handle: NativeHandle);

    /// Runs a deferred redraw of one entry, or of the whole menu for `None`.
    fn redraw(&mut self, name: &str, handle: NativeHandle, entry: Option<usize>);

    /// Associates (or with `None` clears) the native menubar of a toplevel.
    fn bind_window_menubar(&mut self, window: &WindowId, handle: Option<NativeHandle>);
}
