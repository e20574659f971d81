//! Interaction layer for a medical-image viewer.
//!
//! The crate sits between host input (mouse, touch, wheel, keyboard, the tool
//! selector and the stack slider) and an external imaging toolkit that owns
//! decoding, rendering, and measurement geometry. It decides which toolkit
//! tool is active, keeps the image stack and its slider in step, caps the
//! number of length measurements, and builds the right-click menu for the
//! measurement under the pointer. Everything the toolkit does is reached
//! through the capability traits in [`toolkit`] and [`annotation`], so the
//! core runs unchanged against the browser bridge and the test fakes.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`viewer`] | Per-surface [`viewer::ViewerCore`]: initialization sequence and event routing |
//! | [`controller`] | Active-tool controller (one interactive tool per surface) |
//! | [`stack`] | Image stack, slider sync, and resize debounce |
//! | [`locator`] | First annotation near the pointer |
//! | [`menu`] | Context menu building and actions |
//! | [`policy`] | Measurement cap enforcement |
//! | [`events`] | Surface notifications and the keyed listener registry |
//! | [`tool`] | Tool kinds, device classes, toolkit variants, button masks |
//! | [`annotation`] | Annotation records, bucket map, and the store capability |
//! | [`toolkit`] | Rendering surface, tool library, and hit-test capabilities |
//! | [`input`] | Canvas points and input sources |
//! | [`config`] | Host-provided JSON configuration |
//! | [`error`] | Error types and stable error codes |
//! | [`telemetry`] | Tracing subscriber setup |
//! | [`consts`] | Shared defaults (colors, zoom limits, cap, debounce) |
//! | `web` | `wasm32` only: the `Viewer` class exported to JavaScript |

pub mod annotation;
pub mod config;
pub mod consts;
pub mod controller;
pub mod error;
pub mod events;
pub mod input;
pub mod locator;
pub mod menu;
pub mod policy;
pub mod stack;
pub mod telemetry;
pub mod tool;
pub mod toolkit;
pub mod viewer;

#[cfg(target_arch = "wasm32")]
pub mod web;

#[cfg(test)]
mod test_support;
