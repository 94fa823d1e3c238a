//! 2D cameras with pixel-space orthographic projection.

use glam::{Mat4, Vec2, Vec3};
use tessera_core::geometry::Rect;

/// Which camera a pass draws with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraSlot {
    /// Scene camera that follows the world.
    World,
    /// Fixed camera for interface elements.
    Ui,
}

/// An orthographic camera over pixel coordinates.
///
/// The projection maps `(0, 0)` to the top-left of the viewport and
/// `(width, height)` to the bottom-right, with y growing downward. The view
/// matrix recenters the world on `position` and applies zoom; both matrices
/// are cached behind a dirty flag.
pub struct Camera2D {
    position: Vec2,
    zoom: f32,
    viewport: Vec2,
    /// Cached view matrix
    view_matrix: Mat4,
    /// Cached projection matrix
    projection_matrix: Mat4,
    /// Set when position/zoom/viewport changes
    dirty: bool,
}

impl Camera2D {
    pub fn new(width: f32, height: f32) -> Self {
        let mut camera = Self {
            position: Vec2::ZERO,
            zoom: 1.0,
            viewport: Vec2::new(width, height),
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            dirty: true,
        };
        camera.update_matrices();
        camera
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        if self.position != position {
            self.position = position;
            self.dirty = true;
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        if self.zoom != zoom {
            self.zoom = zoom;
            self.dirty = true;
        }
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        let viewport = Vec2::new(width, height);
        if self.viewport != viewport {
            self.viewport = viewport;
            self.dirty = true;
        }
    }

    fn update_matrices(&mut self) {
        if !self.dirty {
            return;
        }

        self.projection_matrix = Mat4::orthographic_rh(
            0.0,
            self.viewport.x,
            self.viewport.y,
            0.0,
            -1.0,
            1.0,
        );

        // Recenter on `position`, zoom about the viewport center.
        self.view_matrix = Mat4::from_translation(Vec3::new(
            self.viewport.x / 2.0,
            self.viewport.y / 2.0,
            0.0,
        )) * Mat4::from_scale(Vec3::new(self.zoom, self.zoom, 1.0))
            * Mat4::from_translation(Vec3::new(-self.position.x, -self.position.y, 0.0));

        self.dirty = false;
    }

    pub fn view_matrix(&mut self) -> Mat4 {
        self.update_matrices();
        self.view_matrix
    }

    pub fn projection_matrix(&mut self) -> Mat4 {
        self.update_matrices();
        self.projection_matrix
    }

    /// The world-space rectangle the camera can see.
    pub fn view_rect(&self) -> Rect<f32> {
        let extent = self.viewport / self.zoom;
        Rect::new(
            self.position.x - extent.x / 2.0,
            self.position.y - extent.y / 2.0,
            extent.x,
            extent.y,
        )
    }
}

/// The camera pair the frame pipeline draws with.
pub struct Cameras {
    world: Camera2D,
    ui: Camera2D,
}

impl Cameras {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            world: Camera2D::new(width, height),
            ui: Camera2D::new(width, height),
        }
    }

    pub fn get(&self, slot: CameraSlot) -> &Camera2D {
        match slot {
            CameraSlot::World => &self.world,
            CameraSlot::Ui => &self.ui,
        }
    }

    pub fn get_mut(&mut self, slot: CameraSlot) -> &mut Camera2D {
        match slot {
            CameraSlot::World => &mut self.world,
            CameraSlot::Ui => &mut self.ui,
        }
    }

    pub fn world(&self) -> &Camera2D {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut Camera2D {
        &mut self.world
    }

    pub fn ui_mut(&mut self) -> &mut Camera2D {
        &mut self.ui
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.world.set_viewport(width, height);
        self.ui.set_viewport(width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn test_camera_position_projects_to_center() {
        let mut camera = Camera2D::new(800.0, 600.0);
        camera.set_position(Vec2::new(120.0, -40.0));

        let world = Vec4::new(120.0, -40.0, 0.0, 1.0);
        let clip = camera.projection_matrix() * camera.view_matrix() * world;

        assert!(clip.x.abs() < 1e-5);
        assert!(clip.y.abs() < 1e-5);
    }

    #[test]
    fn test_view_rect_is_centered_and_zoomed() {
        let mut camera = Camera2D::new(800.0, 600.0);
        camera.set_position(Vec2::new(400.0, 300.0));
        camera.set_zoom(2.0);

        let rect = camera.view_rect();
        assert_eq!(rect.x, 200.0);
        assert_eq!(rect.y, 150.0);
        assert_eq!(rect.width, 400.0);
        assert_eq!(rect.height, 300.0);
    }

    #[test]
    fn test_top_left_of_view_rect_maps_to_clip_corner() {
        let mut camera = Camera2D::new(640.0, 480.0);
        camera.set_position(Vec2::new(50.0, 50.0));

        let rect = camera.view_rect();
        let corner = Vec4::new(rect.x, rect.y, 0.0, 1.0);
        let clip = camera.projection_matrix() * camera.view_matrix() * corner;

        // Top-left of the view maps to (-1, 1) with y-down pixel space.
        assert!((clip.x + 1.0).abs() < 1e-5);
        assert!((clip.y - 1.0).abs() < 1e-5);
    }
}
