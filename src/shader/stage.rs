use std::fmt;

/// One compilable unit of a GL program
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StageKind {
    Vertex,
    Fragment,
    Compute,
    Geometry,
    Tessellation,
}

impl StageKind {
    pub const ALL: [StageKind; 5] = [
        StageKind::Vertex,
        StageKind::Fragment,
        StageKind::Compute,
        StageKind::Geometry,
        StageKind::Tessellation,
    ];

    /// Map a configuration name to a stage kind.
    ///
    /// Unknown names are not an error, they simply map to `None`. The
    /// tessellation stage is spelled `"tesselation"` in configuration files.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "vertex" => Some(StageKind::Vertex),
            "fragment" => Some(StageKind::Fragment),
            "compute" => Some(StageKind::Compute),
            "geometry" => Some(StageKind::Geometry),
            "tesselation" => Some(StageKind::Tessellation),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StageKind::Vertex => "vertex",
            StageKind::Fragment => "fragment",
            StageKind::Compute => "compute",
            StageKind::Geometry => "geometry",
            StageKind::Tessellation => "tesselation",
        }
    }

    /// GL enum used when creating a shader object of this kind
    pub fn gl_enum(self) -> u32 {
        match self {
            StageKind::Vertex => glow::VERTEX_SHADER,
            StageKind::Fragment => glow::FRAGMENT_SHADER,
            StageKind::Compute => glow::COMPUTE_SHADER,
            StageKind::Geometry => glow::GEOMETRY_SHADER,
            StageKind::Tessellation => glow::TESS_EVALUATION_SHADER,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
