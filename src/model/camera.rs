use glam::{Mat4, UVec2, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Perspective,
    Orthographic,
}

impl Projection {
    pub fn toggled(self) -> Self {
        match self {
            Projection::Perspective => Projection::Orthographic,
            Projection::Orthographic => Projection::Perspective,
        }
    }
}

/// Yaw/pitch fly camera.
///
/// Positive yaw turns right, positive pitch looks down.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    projection: Projection,
    viewport: UVec2,
    proj: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl Camera {
    pub const FOV_Y_DEGREES: f32 = 70.0;
    pub const Z_NEAR: f32 = 0.1;
    pub const Z_FAR: f32 = 50.0;

    pub fn new(width: u32, height: u32) -> Self {
        let mut camera = Self {
            position: Vec3::ZERO,
            yaw: 0.0,
            pitch: 0.0,
            projection: Projection::Perspective,
            viewport: UVec2::new(width, height),
            proj: Mat4::IDENTITY,
        };
        camera.rebuild_projection();
        camera
    }

    pub fn up(&self) -> Vec3 {
        Vec3::Y
    }

    pub fn right(&self) -> Vec3 {
        Vec3::new((-self.yaw).cos(), 0.0, -(-self.yaw).sin())
    }

    /// Forward direction flattened onto the horizontal plane
    pub fn forward_2d(&self) -> Vec3 {
        Vec3::new(-(-self.yaw).sin(), 0.0, -(-self.yaw).cos())
    }

    pub fn forward(&self) -> Vec3 {
        // spherical coordinates, -Z is forward at zero yaw
        let cos_pitch = (-self.pitch).cos();
        Vec3::new(
            cos_pitch * -(-self.yaw).sin(),
            (-self.pitch).sin(),
            -cos_pitch * (-self.yaw).cos(),
        )
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn set_projection(&mut self, projection: Projection) {
        if projection == self.projection {
            return;
        }
        self.projection = projection;
        self.rebuild_projection();
    }

    pub fn toggle_projection(&mut self) {
        self.set_projection(self.projection.toggled());
    }

    pub fn viewport(&self) -> UVec2 {
        self.viewport
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        let viewport = UVec2::new(width, height);
        if viewport == self.viewport {
            return;
        }
        self.viewport = viewport;
        self.rebuild_projection();
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward(), self.up())
    }

    pub fn proj(&self) -> Mat4 {
        self.proj
    }

    pub fn view_proj(&self) -> Mat4 {
        self.proj * self.view()
    }

    fn rebuild_projection(&mut self) {
        // a minimized window reports a zero-sized framebuffer
        let width = self.viewport.x.max(1) as f32;
        let height = self.viewport.y.max(1) as f32;

        self.proj = match self.projection {
            Projection::Perspective => Mat4::perspective_rh_gl(
                Self::FOV_Y_DEGREES.to_radians(),
                width / height,
                Self::Z_NEAR,
                Self::Z_FAR,
            ),
            Projection::Orthographic => Mat4::orthographic_rh_gl(0.0, width, 0.0, height, -1.0, 1.0),
        };
    }
}
