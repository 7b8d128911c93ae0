use crate::node::NodeId;
use glam::{Mat4, Vec3};
use gridview_procgen::Mesh;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Errors a rendering surface can report. None of them are fatal to the
/// scene; the next frame is attempted as usual.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("surface lost")]
    Lost,
    #[error("surface out of memory")]
    OutOfMemory,
    #[error("surface error: {0}")]
    Other(String),
}

/// One node to draw this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem {
    pub node: NodeId,
    pub model: Mat4,
    pub color: [f32; 4],
    pub emissive: [f32; 3],
}

/// Everything a surface needs to produce one frame. Read-only: surfaces
/// never mutate the scene.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub frame: u64,
    pub view_proj: Mat4,
    pub eye: Vec3,
    pub items: &'a [DrawItem],
}

/// Rendering backend driven by the scene graph.
///
/// Meshes are uploaded once per node and released when the node is
/// destroyed; each frame only carries transforms and colors.
pub trait RenderSurface {
    fn resize(&mut self, width: u32, height: u32);

    fn upload(&mut self, node: NodeId, mesh: &Mesh);

    fn release(&mut self, node: NodeId);

    fn draw(&mut self, frame: &FrameView<'_>) -> Result<(), SurfaceError>;
}

/// Headless surface that keeps resident meshes in memory and renders each
/// frame as text. Used by the CLI and tests.
#[derive(Debug, Default)]
pub struct DebugTextSurface {
    pub width: u32,
    pub height: u32,
    resident: BTreeMap<NodeId, (usize, usize)>,
    frames: u64,
    last: String,
    fail_next: bool,
}

impl DebugTextSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Number of meshes currently resident.
    pub fn resident_count(&self) -> usize {
        self.resident.len()
    }

    pub fn is_resident(&self, node: NodeId) -> bool {
        self.resident.contains_key(&node)
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames
    }

    /// Text of the most recent frame.
    pub fn last_frame(&self) -> &str {
        &self.last
    }

    /// Make the next `draw` fail with [`SurfaceError::Lost`].
    pub fn fail_next_draw(&mut self) {
        self.fail_next = true;
    }
}

impl RenderSurface for DebugTextSurface {
    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn upload(&mut self, node: NodeId, mesh: &Mesh) {
        self.resident
            .insert(node, (mesh.vertex_count(), mesh.triangle_count()));
    }

    fn release(&mut self, node: NodeId) {
        self.resident.remove(&node);
    }

    fn draw(&mut self, frame: &FrameView<'_>) -> Result<(), SurfaceError> {
        if std::mem::take(&mut self.fail_next) {
            return Err(SurfaceError::Lost);
        }

        let mut out = String::new();
        let _ = writeln!(
            out,
            "=== Frame {} ({}x{}) ===",
            frame.frame, self.width, self.height
        );
        let _ = writeln!(
            out,
            "Camera: eye=({:.1}, {:.1}, {:.1})",
            frame.eye.x, frame.eye.y, frame.eye.z
        );
        let _ = writeln!(
            out,
            "Draws: {} Resident: {}",
            frame.items.len(),
            self.resident.len()
        );
        for item in frame.items {
            let p = item.model.w_axis;
            let tris = self.resident.get(&item.node).map_or(0, |r| r.1);
            let _ = writeln!(
                out,
                "  [{}] pos=({:.2}, {:.2}, {:.2}) tris={} rgba=({:.2}, {:.2}, {:.2}, {:.2})",
                item.node,
                p.x,
                p.y,
                p.z,
                tris,
                item.color[0],
                item.color[1],
                item.color[2],
                item.color[3]
            );
        }

        self.last = out;
        self.frames += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_resident_meshes() {
        let mut surface = DebugTextSurface::new(640, 480);
        surface.upload(NodeId(1), &Mesh::cuboid(1.0, 1.0, 1.0));
        surface.upload(NodeId(2), &Mesh::cuboid(1.0, 1.0, 1.0));
        assert_eq!(surface.resident_count(), 2);
        surface.release(NodeId(1));
        assert!(!surface.is_resident(NodeId(1)));
        assert!(surface.is_resident(NodeId(2)));
    }

    #[test]
    fn draw_renders_text() {
        let mut surface = DebugTextSurface::new(640, 480);
        surface.upload(NodeId(7), &Mesh::cuboid(1.0, 1.0, 1.0));
        let items = [DrawItem {
            node: NodeId(7),
            model: Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
            color: [1.0, 0.0, 0.0, 1.0],
            emissive: [0.0; 3],
        }];
        let view = FrameView {
            frame: 3,
            view_proj: Mat4::IDENTITY,
            eye: Vec3::ZERO,
            items: &items,
        };
        surface.draw(&view).unwrap();
        let text = surface.last_frame();
        assert!(text.contains("Frame 3 (640x480)"));
        assert!(text.contains("[node7] pos=(1.00, 2.00, 3.00) tris=12"));
        assert_eq!(surface.frames_drawn(), 1);
    }

    #[test]
    fn injected_failure_is_one_shot() {
        let mut surface = DebugTextSurface::default();
        surface.fail_next_draw();
        let view = FrameView {
            frame: 0,
            view_proj: Mat4::IDENTITY,
            eye: Vec3::ZERO,
            items: &[],
        };
        assert!(matches!(surface.draw(&view), Err(SurfaceError::Lost)));
        assert!(surface.draw(&view).is_ok());
    }
}
