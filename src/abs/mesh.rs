//! Mesh management module.
//!
//! This module defines the [`Mesh3D`] struct: one immutable vertex/index
//! buffer pair on the GPU plus an ordered collection of textures, of which
//! exactly one is active at a time. Geometry is validated and uploaded once
//! at construction; only the texture selection changes afterwards.

use std::sync::Arc;

use glam::{Vec2, Vec3};
use glow::HasContext;
use image::DynamicImage;
use rand::Rng;

use crate::abs::{ShaderProgram, Texture};
use crate::error::{Error, Result};

/// A single vertex: position in object space and a texture coordinate.
///
/// The layout is pinned (20-byte stride, uv at offset 12) and mirrored by
/// [`Vertex3D::vertex_attribs`]; the two must change together.
#[derive(Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct Vertex3D {
    pub position: Vec3,
    pub uv: Vec2,
}

impl Vertex3D {
    pub fn new(x: f32, y: f32, z: f32, u: f32, v: f32) -> Self {
        Self {
            position: Vec3::new(x, y, z),
            uv: Vec2::new(u, v),
        }
    }

    /// Sets up the vertex attribute pointers for the currently bound VAO.
    fn vertex_attribs(gl: &glow::Context) {
        unsafe {
            let stride = std::mem::size_of::<Vertex3D>() as i32;

            // Position attribute
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, stride, 0);

            // Texture coordinate attribute
            gl.enable_vertex_attrib_array(1);
            gl.vertex_attrib_pointer_f32(
                1,
                2,
                glow::FLOAT,
                false,
                stride,
                std::mem::size_of::<Vec3>() as i32,
            );
        }
    }
}

/// Rejects geometry that would index out of bounds or form partial triangles.
/// Runs before any GPU object is created.
fn validate_geometry(vertices: &[Vertex3D], faces: &[u32]) -> Result<()> {
    if vertices.is_empty() {
        return Err(Error::InvalidGeometry {
            reason: "vertex list is empty".to_string(),
        });
    }
    if !faces.len().is_multiple_of(3) {
        return Err(Error::InvalidGeometry {
            reason: format!("{} indices do not form whole triangles", faces.len()),
        });
    }
    if let Some(&bad) = faces.iter().find(|&&i| i as usize >= vertices.len()) {
        return Err(Error::InvalidGeometry {
            reason: format!(
                "face index {} out of range for {} vertices",
                bad,
                vertices.len()
            ),
        });
    }
    Ok(())
}

fn next_index(current: usize, count: usize) -> usize {
    (current + 1) % count
}

fn prev_index(current: usize, count: usize) -> usize {
    (current + count - 1) % count
}

/// Picks a uniformly random index other than `current`. With fewer than two
/// choices there is nothing to switch to and `current` comes back unchanged.
fn random_other_index<R: Rng>(rng: &mut R, current: usize, count: usize) -> usize {
    if count <= 1 {
        return current;
    }
    let picked = rng.random_range(0..count - 1);
    if picked >= current { picked + 1 } else { picked }
}

/// A 1x1 square centered at the origin in world space.
fn square_data() -> (Vec<Vertex3D>, Vec<u32>) {
    let vertices = vec![
        Vertex3D::new(0.5, 0.5, 0.0, 1.0, 0.0),   // top right
        Vertex3D::new(0.5, -0.5, 0.0, 1.0, 1.0),  // bottom right
        Vertex3D::new(-0.5, -0.5, 0.0, 0.0, 1.0), // bottom left
        Vertex3D::new(-0.5, 0.5, 0.0, 0.0, 0.0),  // top left
    ];
    let faces = vec![
        3, 1, 2, //
        3, 1, 0,
    ];
    (vertices, faces)
}

/// The upper-left half of the 1x1 square centered at the origin.
fn triangle_data() -> (Vec<Vertex3D>, Vec<u32>) {
    let vertices = vec![
        Vertex3D::new(-0.5, -0.5, 0.0, 0.0, 1.0),
        Vertex3D::new(-0.5, 0.5, 0.0, 0.0, 0.0),
        Vertex3D::new(0.5, 0.5, 0.0, 1.0, 0.0),
    ];
    let faces = vec![2, 1, 0];
    (vertices, faces)
}

/// A 1x1x1 cube centered at the origin, eight shared corner vertices and
/// twelve triangles.
fn cube_data() -> (Vec<Vertex3D>, Vec<u32>) {
    let vertices = vec![
        Vertex3D::new(0.5, 0.5, -0.5, 0.0, 0.0),   // back upper right
        Vertex3D::new(-0.5, 0.5, -0.5, 0.0, 0.0),  // back upper left
        Vertex3D::new(-0.5, -0.5, -0.5, 1.0, 0.0), // back lower left
        Vertex3D::new(0.5, -0.5, -0.5, 0.0, 1.0),  // back lower right
        Vertex3D::new(0.5, 0.5, 0.5, 1.0, 0.0),    // front upper right
        Vertex3D::new(-0.5, 0.5, 0.5, 1.0, 1.0),   // front upper left
        Vertex3D::new(-0.5, -0.5, 0.5, 0.0, 1.0),  // front lower left
        Vertex3D::new(0.5, -0.5, 0.5, 1.0, 1.0),   // front lower right
    ];
    let faces = vec![
        0, 1, 2, //
        0, 2, 3, //
        4, 0, 3, //
        4, 3, 7, //
        5, 4, 7, //
        5, 7, 6, //
        1, 5, 6, //
        1, 6, 2, //
        4, 5, 1, //
        4, 1, 0, //
        2, 6, 7, //
        2, 7, 3,
    ];
    (vertices, faces)
}

/// Represents a textured mesh stored on the GPU side.
pub struct Mesh3D {
    gl: Arc<glow::Context>,
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    ebo: glow::Buffer,
    textures: Vec<Texture>,
    active_texture: usize,
    vertex_count: usize,
    index_count: usize,
}

impl Mesh3D {
    /// Creates a mesh from existing vertex and face lists, uploading both to
    /// the GPU along with `texture` as the initial (and active) texture.
    ///
    /// Every face index must refer to a vertex and the index list must form
    /// whole triangles; violations fail with
    /// [`Error::InvalidGeometry`](crate::error::Error) before anything is
    /// allocated on the device.
    pub fn new(
        gl: &Arc<glow::Context>,
        vertices: &[Vertex3D],
        faces: &[u32],
        texture: &DynamicImage,
    ) -> Result<Self> {
        validate_geometry(vertices, faces)?;

        // Uploaded first so it cleans itself up if buffer creation fails.
        let initial = Texture::new(gl, texture)?;

        unsafe {
            let vao = gl
                .create_vertex_array()
                .map_err(|reason| Error::ResourceCreation {
                    what: "vertex array",
                    reason,
                })?;
            let vbo = gl.create_buffer().map_err(|reason| {
                gl.delete_vertex_array(vao);
                Error::ResourceCreation {
                    what: "vertex buffer",
                    reason,
                }
            })?;
            let ebo = gl.create_buffer().map_err(|reason| {
                gl.delete_buffer(vbo);
                gl.delete_vertex_array(vao);
                Error::ResourceCreation {
                    what: "index buffer",
                    reason,
                }
            })?;

            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                std::slice::from_raw_parts(
                    vertices.as_ptr() as *const u8,
                    vertices.len() * std::mem::size_of::<Vertex3D>(),
                ),
                glow::STATIC_DRAW,
            );

            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ebo));
            gl.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                std::slice::from_raw_parts(
                    faces.as_ptr() as *const u8,
                    faces.len() * std::mem::size_of::<u32>(),
                ),
                glow::STATIC_DRAW,
            );

            Vertex3D::vertex_attribs(gl);

            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None);

            Ok(Self {
                gl: Arc::clone(gl),
                vao,
                vbo,
                ebo,
                textures: vec![initial],
                active_texture: 0,
                vertex_count: vertices.len(),
                index_count: faces.len(),
            })
        }
    }

    /// Constructs a 1x1 square centered at the origin in world space.
    pub fn square(gl: &Arc<glow::Context>, texture: &DynamicImage) -> Result<Self> {
        let (vertices, faces) = square_data();
        Self::new(gl, &vertices, &faces, texture)
    }

    /// Constructs a 1x1x1 cube centered at the origin in world space.
    pub fn cube(gl: &Arc<glow::Context>, texture: &DynamicImage) -> Result<Self> {
        let (vertices, faces) = cube_data();
        Self::new(gl, &vertices, &faces, texture)
    }

    /// Constructs the upper-left half of the 1x1 square centered at the origin.
    pub fn triangle(gl: &Arc<glow::Context>, texture: &DynamicImage) -> Result<Self> {
        let (vertices, faces) = triangle_data();
        Self::new(gl, &vertices, &faces, texture)
    }

    /// Uploads `image` as a new texture and appends it to the end of the
    /// selectable collection. The active texture is left untouched. On upload
    /// failure the collection is unchanged.
    pub fn add_texture(&mut self, image: &DynamicImage) -> Result<()> {
        let texture = Texture::new(&self.gl, image)?;
        self.textures.push(texture);
        Ok(())
    }

    /// Advances the active texture by one, wrapping around, and returns the
    /// new index.
    pub fn active_tex_inc(&mut self) -> usize {
        self.active_texture = next_index(self.active_texture, self.textures.len());
        self.active_texture
    }

    /// Steps the active texture back by one, wrapping around, and returns the
    /// new index.
    pub fn active_tex_dec(&mut self) -> usize {
        self.active_texture = prev_index(self.active_texture, self.textures.len());
        self.active_texture
    }

    /// Switches to a random texture, never the one already active (unless it
    /// is the only one), and returns the new index.
    pub fn active_tex_rand(&mut self) -> usize {
        self.active_texture =
            random_other_index(&mut rand::rng(), self.active_texture, self.textures.len());
        self.active_texture
    }

    pub fn active_texture_index(&self) -> usize {
        self.active_texture
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn index_count(&self) -> usize {
        self.index_count
    }

    /// Number of triangles in the mesh.
    pub fn face_count(&self) -> usize {
        self.index_count / 3
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Draws the mesh with the active texture on unit 0.
    ///
    /// Leaves the program, VAO and texture bindings in its own state; callers
    /// must not rely on previous bindings surviving.
    pub fn render(&self, shader: &ShaderProgram) {
        shader.use_program();
        shader.set_uniform("u_texture", 0i32);
        self.textures[self.active_texture].bind_to_unit(0);
        unsafe {
            self.gl.bind_vertex_array(Some(self.vao));
            self.gl
                .draw_elements(glow::TRIANGLES, self.index_count as i32, glow::UNSIGNED_INT, 0);
            self.gl.bind_vertex_array(None);
            self.gl.bind_texture(glow::TEXTURE_2D, None);
        }
    }
}

impl Drop for Mesh3D {
    fn drop(&mut self) {
        unsafe {
            self.gl.delete_buffer(self.vbo);
            self.gl.delete_buffer(self.ebo);
            self.gl.delete_vertex_array(self.vao);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_inc_cycles_back_to_start() {
        for count in 1..=6 {
            let mut index = 0;
            for _ in 0..count {
                index = next_index(index, count);
            }
            assert_eq!(index, 0, "inc applied {} times must wrap", count);
        }
    }

    #[test]
    fn test_dec_is_inverse_of_inc() {
        for count in 1..=6 {
            for start in 0..count {
                assert_eq!(prev_index(next_index(start, count), count), start);
                assert_eq!(next_index(prev_index(start, count), count), start);
            }
        }
    }

    #[test]
    fn test_inc_with_single_texture_wraps_to_itself() {
        assert_eq!(next_index(0, 1), 0);
        assert_eq!(prev_index(0, 1), 0);
    }

    #[test]
    fn test_random_pick_never_returns_current() {
        let mut rng = StdRng::seed_from_u64(7);
        for count in 2..=6 {
            for current in 0..count {
                for _ in 0..50 {
                    let picked = random_other_index(&mut rng, current, count);
                    assert_ne!(picked, current);
                    assert!(picked < count);
                }
            }
        }
    }

    #[test]
    fn test_random_pick_reaches_every_other_index() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(random_other_index(&mut rng, 1, 4));
        }
        assert_eq!(seen, [0, 2, 3].into_iter().collect());
    }

    #[test]
    fn test_random_pick_with_one_texture_stays_put() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(random_other_index(&mut rng, 0, 1), 0);
    }

    #[test]
    fn test_square_is_four_vertices_two_faces() {
        let (vertices, faces) = square_data();
        assert_eq!(vertices.len(), 4);
        assert_eq!(faces.len(), 6);
        assert!(validate_geometry(&vertices, &faces).is_ok());
    }

    #[test]
    fn test_triangle_is_three_vertices_one_face() {
        let (vertices, faces) = triangle_data();
        assert_eq!(vertices.len(), 3);
        assert_eq!(faces.len(), 3);
        assert!(validate_geometry(&vertices, &faces).is_ok());
    }

    #[test]
    fn test_cube_is_eight_shared_corners_twelve_triangles() {
        let (vertices, faces) = cube_data();
        assert_eq!(vertices.len(), 8);
        assert_eq!(faces.len(), 36);
        assert!(faces.iter().all(|&i| (i as usize) < vertices.len()));
        assert!(validate_geometry(&vertices, &faces).is_ok());
    }

    #[test]
    fn test_validation_rejects_out_of_range_index() {
        let (vertices, _) = triangle_data();
        let result = validate_geometry(&vertices, &[0, 1, 3]);
        assert!(matches!(result, Err(Error::InvalidGeometry { .. })));
    }

    #[test]
    fn test_validation_rejects_partial_triangles() {
        let (vertices, _) = triangle_data();
        let result = validate_geometry(&vertices, &[0, 1]);
        assert!(matches!(result, Err(Error::InvalidGeometry { .. })));
    }

    #[test]
    fn test_validation_rejects_empty_vertex_list() {
        let result = validate_geometry(&[], &[]);
        assert!(matches!(result, Err(Error::InvalidGeometry { .. })));
    }

    #[test]
    fn test_vertex_layout_is_tightly_packed() {
        // The attribute pointers in vertex_attribs assume this exact layout.
        assert_eq!(std::mem::size_of::<Vertex3D>(), 20);
        assert_eq!(std::mem::size_of::<Vec3>(), 12);
    }
}
