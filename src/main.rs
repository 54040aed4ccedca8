// =============================================================================
// RENDER CONTEXT - window host for GPU context negotiation
// =============================================================================
//
// Opens a window, negotiates adapter/device/swapchain for it, rebuilds the
// swapchain on resize and tears everything down on close. Drawing belongs to
// a render loop that plugs in on top of `RenderContext`.
//
// LIFECYCLE:
// 1. Load config.toml, initialise logging
// 2. Window created  -> RenderContext::new (instance ... swapchain)
// 3. Window resized  -> rebuild_presentation (skipped while minimized)
// 4. Close requested -> RenderContext dropped (views ... instance)
//
// =============================================================================

use anyhow::{Context, Result};
use render_context::backend::{LogSink, RenderContext};
use render_context::Config;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowAttributes},
};

// =============================================================================
// ENTRY POINT
// =============================================================================

fn main() -> Result<()> {
    // Load configuration from config.toml
    let config = Config::load();

    init_logging(&config);
    log::info!("Starting render context");
    log::info!(
        "Window: {}x{}, preferred present mode: {}",
        config.window.width,
        config.window.height,
        config.graphics.present_mode
    );

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    // Context acquisition failures are fatal: report and exit non-zero
    match app.failure.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn init_logging(config: &Config) {
    use env_logger::{Builder, Env};

    // RUST_LOG wins over the configured level
    Builder::from_env(Env::default().default_filter_or(config.log_level().to_string())).init();
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

/// Window plus the context negotiated for it.
///
/// IMPORTANT: the context must go before the window it presents to.
struct App {
    config: Config,
    context: Option<RenderContext>,
    window: Option<Arc<Window>>,
    /// Set to true when window is minimized (size = 0) - skip rebuilds
    is_minimized: bool,
    failure: Option<anyhow::Error>,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            context: None,
            window: None,
            is_minimized: false,
            failure: None,
        }
    }

    fn init_context(&mut self, window: &Window) -> Result<()> {
        let context = RenderContext::new(
            &self.config.window.title,
            window,
            &self.config.requirements(),
            self.config.swapchain_preferences(),
            Arc::new(LogSink),
        )
        .context("Failed to initialize GPU context")?;

        if let Some(chain) = context.chain() {
            log::info!(
                "Presenting on {}: {}x{} {:?} via {:?}, {} images",
                context.adapter().name,
                chain.extent.width,
                chain.extent.height,
                chain.format.format,
                chain.present_mode,
                chain.images().len()
            );
        }

        self.context = Some(context);
        Ok(())
    }

    fn rebuild(&mut self) -> Result<()> {
        if self.is_minimized {
            return Ok(());
        }
        let (Some(context), Some(window)) = (self.context.as_mut(), self.window.as_ref()) else {
            return Ok(());
        };

        context
            .rebuild_presentation(window.as_ref())
            .context("Failed to rebuild swapchain")?;

        if let Some(chain) = context.chain() {
            log::info!("Swapchain now {}x{}", chain.extent.width, chain.extent.height);
        }
        Ok(())
    }

    /// Record a fatal error and shut down in order
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.failure = Some(error);
        self.shutdown(event_loop);
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        self.context = None;
        self.window = None;
        event_loop.exit();
    }
}

// =============================================================================
// WINIT EVENT HANDLING
// =============================================================================

impl ApplicationHandler for App {
    /// Called when the application is ready to create windows.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attributes = WindowAttributes::default()
            .with_title(&self.config.window.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                self.fail(event_loop, anyhow::Error::new(e).context("Failed to create window"));
                return;
            }
        };

        if let Err(e) = self.init_context(&window) {
            self.fail(event_loop, e);
            return;
        }

        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, shutting down...");
                self.shutdown(event_loop);
            }

            WindowEvent::Resized(size) => {
                log::debug!("Window resized to {}x{}", size.width, size.height);

                if size.width == 0 || size.height == 0 {
                    self.is_minimized = true;
                    return;
                }
                self.is_minimized = false;

                if let Err(e) = self.rebuild() {
                    self.fail(event_loop, e);
                }
            }

            _ => {}
        }
    }
}
