use std::time::{Duration, Instant};

use glam::{Mat4, Vec3};
use glow::HasContext;
use sdl2::keyboard::Keycode;

use crate::abs::*;
use crate::error::Result;
use crate::transform::Transform;

mod abs;
mod asset;
mod error;
mod transform;

const WINDOW_TITLE: &str = "meshview3d";
const WINDOW_WIDTH: u32 = 1000;
const WINDOW_HEIGHT: u32 = 1000;
const FRAME_CAP: u32 = 130;

const MODEL_PATH: &str = "assets/models/bunny_textured.obj";
const MODEL_FLIP_UVS: bool = true;
const BASE_TEXTURE_PATH: &str = "assets/models/bunny_textured.png";
const EXTRA_TEXTURE_PATHS: [&str; 3] = [
    "assets/models/concrete.png",
    "assets/models/stucco.png",
    "assets/models/missing_texture-lrg.png",
];

const FOV_Y_DEGREES: f32 = 45.0;
const Z_NEAR: f32 = 0.1;
const Z_FAR: f32 = 100.0;

const MODEL_TRANSLATION: Vec3 = Vec3::new(0.2, -1.0, -5.0);
const MODEL_SCALE: f32 = 9.0;
const ROTATE_STEP: f32 = 0.1;

fn setup_logger() -> std::result::Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Debug)
        .chain(std::io::stdout())
        .apply()?;
    Ok(())
}

fn projection_matrix(width: f32, height: f32) -> Mat4 {
    Mat4::perspective_rh_gl(FOV_Y_DEGREES.to_radians(), width / height, Z_NEAR, Z_FAR)
}

fn main() {
    if let Err(e) = setup_logger() {
        eprintln!("failed to set up logging: {e}");
    }
    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut app = App::new(
        WINDOW_TITLE,
        WINDOW_WIDTH,
        WINDOW_HEIGHT,
        &ContextConfig {
            depth_size: 24,
            stencil_size: 8,
            multisample_samples: 2,
            gl_version: (4, 1),
        },
    )?;

    unsafe {
        app.gl.enable(glow::DEPTH_TEST);
    }

    let vert = Shader::new(
        &app.gl,
        ShaderStage::Vertex,
        include_str!("shaders/mesh/vertex_shader.glsl"),
    )?;
    let frag = Shader::new(
        &app.gl,
        ShaderStage::Fragment,
        include_str!("shaders/mesh/fragment_shader.glsl"),
    )?;
    let shader_program = ShaderProgram::new(&app.gl, &[&vert, &frag])?;

    // The camera sits at the origin looking down -Z; only the model moves.
    let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y);
    let (width, height) = app.window.size();
    let mut projection = projection_matrix(width as f32, height as f32);

    shader_program.use_program();
    shader_program.set_uniform("u_view", view);
    shader_program.set_uniform("u_projection", projection);

    let base_texture = asset::load_image(BASE_TEXTURE_PATH)?;
    let mut mesh = asset::import_mesh(&app.gl, MODEL_PATH, MODEL_FLIP_UVS, &base_texture)?;
    log::info!(
        "loaded {} ({} vertices, {} faces)",
        MODEL_PATH,
        mesh.vertex_count(),
        mesh.face_count()
    );
    for path in EXTRA_TEXTURE_PATHS {
        mesh.add_texture(&asset::load_image(path)?)?;
        log::info!("loaded texture {path}");
    }

    let mut model = Transform::identity();
    model.translate(MODEL_TRANSLATION);
    model.grow(Vec3::splat(MODEL_SCALE));

    let frame_budget = Duration::from_secs(1) / FRAME_CAP;
    let mut frames: u32 = 0;
    let mut last_report = Instant::now();

    'running: loop {
        let frame_start = Instant::now();

        for event in app.event_pump.poll_iter() {
            match event {
                sdl2::event::Event::Quit { .. } => break 'running,
                sdl2::event::Event::Window {
                    win_event: sdl2::event::WindowEvent::Resized(width, height),
                    ..
                } => {
                    unsafe {
                        app.gl.viewport(0, 0, width, height);
                    }
                    projection = projection_matrix(width as f32, height as f32);
                    shader_program.use_program();
                    shader_program.set_uniform("u_projection", projection);
                }
                sdl2::event::Event::KeyDown {
                    keycode: Some(keycode),
                    ..
                } => match keycode {
                    Keycode::Right => {
                        let index = mesh.active_tex_inc();
                        log::debug!("active texture -> {index}");
                    }
                    Keycode::Left => {
                        let index = mesh.active_tex_dec();
                        log::debug!("active texture -> {index}");
                    }
                    Keycode::Up => {
                        let index = mesh.active_tex_rand();
                        log::debug!("active texture -> {index}");
                    }
                    Keycode::A => model.rotate(Vec3::new(0.0, ROTATE_STEP, 0.0)),
                    Keycode::D => model.rotate(Vec3::new(0.0, -ROTATE_STEP, 0.0)),
                    _ => {}
                },
                _ => {}
            }
        }

        unsafe {
            app.gl.clear_color(0.0, 0.0, 0.0, 1.0);
            app.gl
                .clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }

        shader_program.use_program();
        shader_program.set_uniform("u_model", model.matrix());
        mesh.render(&shader_program);

        app.window.gl_swap_window();

        frames += 1;
        if last_report.elapsed() >= Duration::from_secs(1) {
            log::debug!("{frames} FPS");
            frames = 0;
            last_report = Instant::now();
        }

        let elapsed = frame_start.elapsed();
        if elapsed < frame_budget {
            std::thread::sleep(frame_budget - elapsed);
        }
    }

    Ok(())
}
