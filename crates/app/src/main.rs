//! prism - Main Entry Point
//!
//! A Vulkan renderer whose core is the frame lifecycle: swapchain ownership
//! and recreation, per-image command buffers, and the acquire → record →
//! submit → present loop.

use anyhow::Result;
use tracing::info;

use prism_core::Timer;
use prism_platform::Window;
use prism_renderer::Renderer;

const WINDOW_WIDTH: u32 = 800;
const WINDOW_HEIGHT: u32 = 600;

fn main() -> Result<()> {
    prism_core::init_logging();
    info!("Starting prism");

    let mut window = Window::new(WINDOW_WIDTH, WINDOW_HEIGHT, "prism")?;
    let mut renderer = Renderer::new(&mut window)?;

    let timer = Timer::new();
    let mut frames: u64 = 0;

    while !window.should_close() {
        window.poll_events();
        renderer.draw_frame(&mut window)?;
        frames += 1;
    }

    // Let all in-flight GPU work retire before teardown begins
    renderer.wait_idle()?;

    info!(
        "Rendered {} frames in {:.1}s",
        frames,
        timer.elapsed_secs()
    );

    Ok(())
}
