//! SDL2 and OpenGL application management.
//!
//! This module defines the [`App`] struct which encapsulates the SDL2
//! and OpenGL context necessary for creating a windowed application.

use std::sync::Arc;

use crate::error::{Error, Result};

/// Requested properties of the OpenGL context.
#[derive(Debug, Clone, Copy)]
pub struct ContextConfig {
    pub depth_size: u8,
    pub stencil_size: u8,
    /// Antialiasing samples per pixel; 0 disables multisampling.
    pub multisample_samples: u8,
    /// Core-profile OpenGL (major, minor) version.
    pub gl_version: (u8, u8),
}

/// The [`App`] struct encapsulates the SDL2 window, the OpenGL context and
/// the event pump. All rendering happens on the thread that created it.
pub struct App {
    pub window: sdl2::video::Window,
    pub gl: Arc<glow::Context>,
    pub event_pump: sdl2::EventPump,
    // Dropping the GLContext destroys the GL context, so it must live as
    // long as the window it belongs to.
    _gl_context: sdl2::video::GLContext,
}

impl App {
    /// Creates a new [`App`] instance with the specified title and size.
    pub fn new(title: &str, width: u32, height: u32, config: &ContextConfig) -> Result<Self> {
        let sdl = sdl2::init().map_err(Error::Window)?;
        let video_subsystem = sdl.video().map_err(Error::Window)?;

        let gl_attr = video_subsystem.gl_attr();
        gl_attr.set_context_profile(sdl2::video::GLProfile::Core);
        gl_attr.set_context_version(config.gl_version.0, config.gl_version.1);
        gl_attr.set_depth_size(config.depth_size);
        gl_attr.set_stencil_size(config.stencil_size);
        if config.multisample_samples > 0 {
            gl_attr.set_multisample_buffers(1);
            gl_attr.set_multisample_samples(config.multisample_samples);
        }

        let window = video_subsystem
            .window(title, width, height)
            .opengl()
            .resizable()
            .build()
            .map_err(|e| Error::Window(e.to_string()))?;
        let gl_context = window.gl_create_context().map_err(Error::Window)?;
        window.gl_make_current(&gl_context).map_err(Error::Window)?;
        let gl = unsafe {
            glow::Context::from_loader_function(|s| {
                video_subsystem.gl_get_proc_address(s) as *const _
            })
        };
        let event_pump = sdl.event_pump().map_err(Error::Window)?;

        Ok(Self {
            window,
            gl: Arc::new(gl),
            event_pump,
            _gl_context: gl_context,
        })
    }
}
