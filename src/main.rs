//! Relievo - a two-pass depth-map rendering demo.
//!
//! Relievo renders a scene in two fixed passes per frame: first the scene
//! geometry is rasterized into an off-screen depth map, then a full-screen
//! quad samples that depth map and composes it onto the screen. The point of
//! the crate is the small retained-mode layer in [`renderer`] that makes this
//! expressible without hand-writing GPU state transitions at each call site.
//!
//! # Architecture
//! - `app/`: window lifecycle, input events, and the per-frame pipeline
//! - `renderer/`: the core abstractions (uniforms, vertex buffers, shader
//!   programs, render targets) and the GPU context
//! - `math/`: vector/matrix types and projection/view construction
//!
//! # Usage
//! Run with `cargo run`. Escape or closing the window exits. Set `RUST_LOG`
//! (e.g. `RUST_LOG=debug`) to see input events and frame diagnostics.

pub mod app;
pub mod math;
pub mod renderer;

use winit::event_loop::{ControlFlow, EventLoop};

fn main() {
    env_logger::init();
    run();
}

/// Creates the event loop and runs the application until close is requested.
fn run() {
    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            log::error!("error creating event loop: {err}");
            std::process::exit(1);
        }
    };

    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = app::App::new();

    event_loop.run_app(&mut app).expect("Failed to run app");
}
