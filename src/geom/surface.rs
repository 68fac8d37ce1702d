//! Grid surface with lazily recomputed triangle normals.
//!
//! A surface is a rectangular `x_res × y_res` grid of vertices stored
//! row-major (`index = x + y * x_res`). Triangles reference grid vertices and
//! cache their face normal. Editing a vertex through [`Surface::modify_vertex`]
//! marks every incident triangle dirty; [`Surface::update`] recomputes exactly
//! those normals in one batch.

use std::io::Write;

use glam::Vec3;

use super::batch::{GpuVertex, RenderBatch, Topology};
use super::render_mode::RenderMode;
use crate::colour::Rgba;
use crate::error::{Result, SculptError};

/// Triangle face referencing three grid vertices
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub indices: [usize; 3],
    pub normal: Vec3,
}

/// Face normal `normalize((v3 - v1) × (v2 - v1))`, zero for degenerate faces
pub fn face_normal(v1: Vec3, v2: Vec3, v3: Vec3) -> Vec3 {
    (v3 - v1).cross(v2 - v1).normalize_or_zero()
}

/// Vertex grid, per-vertex colours and a triangle arena with dirty tracking
#[derive(Debug, Clone)]
pub struct Surface {
    x_res: usize,
    y_res: usize,
    vertices: Vec<Vec3>,
    colours: Vec<Rgba>,
    triangles: Vec<Triangle>,
    /// Vertex index -> ids of triangles touching it
    connected: Vec<Vec<usize>>,
    /// Dirty bit per triangle id
    dirty: Vec<bool>,
    /// Deduplicated ids of dirty triangles
    dirty_list: Vec<usize>,
}

impl Surface {
    /// Create a surface with all vertices at the origin and opaque white colours.
    ///
    /// Fails with `InvalidArgument` if either resolution is below 2.
    pub fn new(x_res: usize, y_res: usize) -> Result<Self> {
        if x_res < 2 || y_res < 2 {
            return Err(SculptError::invalid(format!(
                "X and Y resolution must be > 1 (got {}x{})",
                x_res, y_res
            )));
        }

        let count = x_res * y_res;
        Ok(Self {
            x_res,
            y_res,
            vertices: vec![Vec3::ZERO; count],
            colours: vec![Rgba::WHITE; count],
            triangles: Vec::new(),
            connected: vec![Vec::new(); count],
            dirty: Vec::new(),
            dirty_list: Vec::new(),
        })
    }

    /// Minimal 2×2 surface used before the first full rebuild
    pub fn placeholder() -> Self {
        Self {
            x_res: 2,
            y_res: 2,
            vertices: vec![Vec3::ZERO; 4],
            colours: vec![Rgba::WHITE; 4],
            triangles: Vec::new(),
            connected: vec![Vec::new(); 4],
            dirty: Vec::new(),
            dirty_list: Vec::new(),
        }
    }

    pub fn x_size(&self) -> usize {
        self.x_res
    }

    pub fn y_size(&self) -> usize {
        self.y_res
    }

    fn vertex_index(&self, x: usize, y: usize) -> Result<usize> {
        if x >= self.x_res {
            return Err(SculptError::invalid(format!(
                "Invalid X surface vertex index ({})",
                x
            )));
        }
        if y >= self.y_res {
            return Err(SculptError::invalid(format!(
                "Invalid Y surface vertex index ({})",
                y
            )));
        }
        Ok(x + y * self.x_res)
    }

    /// Current position of grid vertex (x, y)
    pub fn vertex(&self, x: usize, y: usize) -> Result<Vec3> {
        let idx = self.vertex_index(x, y)?;
        Ok(self.vertices[idx])
    }

    /// Mutable access to grid vertex (x, y); marks its incident triangles dirty
    pub fn modify_vertex(&mut self, x: usize, y: usize) -> Result<&mut Vec3> {
        let idx = self.vertex_index(x, y)?;
        for &tri in &self.connected[idx] {
            if !self.dirty[tri] {
                self.dirty[tri] = true;
                self.dirty_list.push(tri);
            }
        }
        Ok(&mut self.vertices[idx])
    }

    pub fn set_vertex(&mut self, x: usize, y: usize, position: Vec3) -> Result<()> {
        *self.modify_vertex(x, y)? = position;
        Ok(())
    }

    /// Set the colour of grid vertex (x, y). Colours never affect normals.
    pub fn set_vertex_colour(&mut self, x: usize, y: usize, colour: Rgba) -> Result<()> {
        let idx = self.vertex_index(x, y)?;
        self.colours[idx] = colour;
        Ok(())
    }

    pub fn vertex_colour(&self, x: usize, y: usize) -> Result<Rgba> {
        let idx = self.vertex_index(x, y)?;
        Ok(self.colours[idx])
    }

    /// Add a triangle over three grid coordinates and return its id.
    ///
    /// Winding decides which side faces outward; callers pass one consistent
    /// winding per shape family.
    pub fn add_triangle(
        &mut self,
        x0: usize,
        y0: usize,
        x1: usize,
        y1: usize,
        x2: usize,
        y2: usize,
    ) -> Result<usize> {
        let indices = [
            self.vertex_index(x0, y0)?,
            self.vertex_index(x1, y1)?,
            self.vertex_index(x2, y2)?,
        ];
        let normal = face_normal(
            self.vertices[indices[0]],
            self.vertices[indices[1]],
            self.vertices[indices[2]],
        );

        let id = self.triangles.len();
        self.triangles.push(Triangle { indices, normal });
        self.dirty.push(false);
        for idx in indices {
            self.connected[idx].push(id);
        }
        Ok(id)
    }

    /// Recompute the normal of every dirty triangle and clear the dirty set
    pub fn update(&mut self) {
        for tri in self.dirty_list.drain(..) {
            let [i1, i2, i3] = self.triangles[tri].indices;
            self.triangles[tri].normal =
                face_normal(self.vertices[i1], self.vertices[i2], self.vertices[i3]);
            self.dirty[tri] = false;
        }
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn colours(&self) -> &[Rgba] {
        &self.colours
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Number of triangles waiting for a normal recomputation
    pub fn dirty_count(&self) -> usize {
        self.dirty_list.len()
    }

    /// Ids of the triangles touching grid vertex (x, y)
    pub fn connected_triangles(&self, x: usize, y: usize) -> Result<&[usize]> {
        let idx = self.vertex_index(x, y)?;
        Ok(&self.connected[idx])
    }

    /// Build a draw batch for the given mode.
    ///
    /// Points and wireframe walk the vertices in row-major order and ignore
    /// normals; solid walks the triangles and emits normal, colour and
    /// position for every corner.
    pub fn render(&self, mode: RenderMode) -> RenderBatch {
        match mode {
            RenderMode::Points => self.render_vertices(Topology::PointList),
            RenderMode::Wireframe => self.render_vertices(Topology::LineStrip),
            RenderMode::Solid => self.render_solid(),
        }
    }

    fn render_vertices(&self, topology: Topology) -> RenderBatch {
        let mut batch = RenderBatch::with_capacity(topology, self.vertices.len());
        batch.vertices.extend(
            self.vertices
                .iter()
                .zip(&self.colours)
                .map(|(&v, &c)| GpuVertex::new(v, Vec3::ZERO, c)),
        );
        batch
    }

    fn render_solid(&self) -> RenderBatch {
        let mut batch = RenderBatch::with_capacity(Topology::TriangleList, self.triangles.len() * 3);
        for tri in &self.triangles {
            for idx in tri.indices {
                batch.vertices.push(GpuVertex::new(
                    self.vertices[idx],
                    tri.normal,
                    self.colours[idx],
                ));
            }
        }
        batch
    }

    /// Write the surface as an ASCII STL solid, coordinates multiplied by `scale`
    pub fn write_stl<W: Write + ?Sized>(&self, w: &mut W, scale: f32) -> Result<()> {
        writeln!(w, "solid Surface")?;
        for tri in &self.triangles {
            let n = tri.normal;
            writeln!(w, "facet normal {} {} {}", n.x, n.y, n.z)?;
            writeln!(w, "outer loop")?;
            for idx in tri.indices {
                let v = self.vertices[idx] * scale;
                writeln!(w, "vertex {} {} {}", v.x, v.y, v.z)?;
            }
            writeln!(w, "endloop")?;
            writeln!(w, "endfacet")?;
        }
        writeln!(w, "endsolid")?;
        Ok(())
    }

    /// Write the surface as Wavefront OBJ.
    ///
    /// Faces list their 1-based indices in reverse order (`f i3 i2 i1`) so that
    /// OBJ viewers see the same outward side as the STL output.
    pub fn write_obj<W: Write + ?Sized>(&self, w: &mut W, scale: f32) -> Result<()> {
        self.write_obj_with_offset(w, scale, 0)
    }

    /// OBJ output for a surface appended after `offset` vertices of a previous one
    pub(crate) fn write_obj_with_offset<W: Write + ?Sized>(
        &self,
        w: &mut W,
        scale: f32,
        offset: usize,
    ) -> Result<()> {
        for v in &self.vertices {
            let v = *v * scale;
            writeln!(w, "v {} {} {}", v.x, v.y, v.z)?;
        }
        writeln!(w)?;
        for tri in &self.triangles {
            let [i1, i2, i3] = tri.indices;
            writeln!(
                w,
                "f {} {} {}",
                i3 + 1 + offset,
                i2 + 1 + offset,
                i1 + 1 + offset
            )?;
        }
        Ok(())
    }
}
