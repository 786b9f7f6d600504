use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use super::{ShaderBackend, ShaderError, ShaderResult, StageKind};

/// A GL program assembled from individually compiled stages.
///
/// Stages are compiled as soon as their source is added and are kept around
/// after linking, so a single stage can be swapped and the program relinked.
/// Linking is lazy: [`ShaderProgram::id`] relinks whenever the stage set
/// changed since the last successful link.
///
/// GL objects can only be released with the context at hand, so call
/// [`ShaderProgram::clear`] before dropping.
pub struct ShaderProgram<B: ShaderBackend> {
    valid: bool,
    program: Option<B::Program>,
    stages: BTreeMap<StageKind, B::Shader>,
    uniforms: HashMap<String, B::UniformLocation>,
    attributes: HashMap<String, u32>,
}

impl<B: ShaderBackend> Default for ShaderProgram<B> {
    fn default() -> Self {
        Self {
            valid: false,
            program: None,
            stages: BTreeMap::new(),
            uniforms: HashMap::new(),
            attributes: HashMap::new(),
        }
    }
}

impl<B: ShaderBackend> ShaderProgram<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source of one stage and compile it.
    ///
    /// A failed compile leaves the other stages alone and does not touch the
    /// link state: a previously linked program stays usable until the next
    /// explicit [`compile`](Self::compile).
    pub fn add_source(&mut self, gl: &B, kind: StageKind, source: &str) -> ShaderResult<()> {
        let shader = self.get_or_create(gl, kind)?;

        if let Err(log) = gl.compile_stage(shader, source) {
            tracing::error!(stage = %kind, "shader compile error: {}", log.trim_end());
            return Err(ShaderError::StageCompile { kind, log });
        }

        self.valid = false;
        Ok(())
    }

    /// Like [`add_source`](Self::add_source) for a source split in several parts
    pub fn add_source_parts(&mut self, gl: &B, kind: StageKind, parts: &[&str]) -> ShaderResult<()> {
        self.add_source(gl, kind, &parts.concat())
    }

    /// Read a UTF-8 source file and add it as `kind`
    pub fn add_file(&mut self, gl: &B, kind: StageKind, path: impl AsRef<Path>) -> ShaderResult<()> {
        let path = path.as_ref();
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                if err.kind() == std::io::ErrorKind::NotFound {
                    tracing::error!(stage = %kind, "shader compile error: {} does not exist or is inaccessible", path.display());
                } else {
                    tracing::error!(stage = %kind, "shader compile error: {}: {}", path.display(), err);
                }
                return Err(ShaderError::FileAccess { path: path.to_path_buf(), source: err });
            }
        };

        tracing::debug!(stage = %kind, path = %path.display(), "loading shader source");
        self.add_source(gl, kind, &source)
    }

    /// Delete one stage. Removing a stage that isn't there is a no-op.
    pub fn remove(&mut self, gl: &B, kind: StageKind) {
        if let Some(shader) = self.stages.remove(&kind) {
            if gl.is_stage(shader) {
                self.valid = false;
                gl.delete_stage(shader);
            }
        }
    }

    /// Release every stage and the program, back to the empty state
    pub fn clear(&mut self, gl: &B) {
        for (_, shader) in std::mem::take(&mut self.stages) {
            if gl.is_stage(shader) {
                gl.delete_stage(shader);
            }
        }

        if let Some(program) = self.program.take() {
            if gl.is_program(program) {
                gl.delete_program(program);
            }
        }

        self.uniforms.clear();
        self.attributes.clear();
        self.valid = false;
    }

    /// Link all current stages into the program and rescan its interface
    pub fn compile(&mut self, gl: &B) -> ShaderResult<()> {
        let program = match self.program.filter(|p| gl.is_program(*p)) {
            Some(program) => program,
            None => {
                let program = gl.create_program().map_err(|err| {
                    tracing::error!("failed to create program: {}", err);
                    self.valid = false;
                    ShaderError::CreateObject(err)
                })?;
                self.program = Some(program);
                program
            }
        };

        let live: Vec<B::Shader> = self.stages.values().copied().filter(|s| gl.is_stage(*s)).collect();

        for &shader in &live {
            gl.attach_stage(program, shader);
        }

        let linked = gl.link_program(program);

        // stages stay owned by us and can be relinked later
        for &shader in &live {
            gl.detach_stage(program, shader);
        }

        match linked {
            Ok(()) => {
                self.valid = true;
                self.scan_interface(gl, program);
                tracing::debug!(
                    stages = live.len(),
                    uniforms = self.uniforms.len(),
                    attributes = self.attributes.len(),
                    "shader program linked"
                );
                Ok(())
            }
            Err(log) => {
                tracing::error!("shader linkage error: {}", log.trim_end());
                self.valid = false;
                Err(ShaderError::Link(log))
            }
        }
    }

    /// The program handle, linking first if the stage set changed.
    ///
    /// Returns `None` when the program cannot be linked.
    pub fn id(&mut self, gl: &B) -> Option<B::Program> {
        if !self.valid {
            // failures are already logged by compile
            let _ = self.compile(gl);
        }
        self.current_id()
    }

    /// The program handle as of the last link, without relinking
    pub fn current_id(&self) -> Option<B::Program> {
        if self.valid {
            self.program
        } else {
            None
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn has_stage(&self, kind: StageKind) -> bool {
        self.stages.contains_key(&kind)
    }

    pub fn stages(&self) -> impl Iterator<Item = StageKind> + '_ {
        self.stages.keys().copied()
    }

    pub fn uniform_location(&self, name: &str) -> Option<B::UniformLocation> {
        self.uniforms.get(name).cloned()
    }

    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.attributes.get(name).copied()
    }

    fn get_or_create(&mut self, gl: &B, kind: StageKind) -> ShaderResult<B::Shader> {
        if let Some(&shader) = self.stages.get(&kind) {
            if gl.is_stage(shader) {
                return Ok(shader);
            }
        }

        let shader = gl.create_stage(kind).map_err(|err| {
            tracing::error!(stage = %kind, "failed to create shader: {}", err);
            ShaderError::CreateObject(err)
        })?;
        self.stages.insert(kind, shader);
        Ok(shader)
    }

    fn scan_interface(&mut self, gl: &B, program: B::Program) {
        self.uniforms = gl.active_uniforms(program).into_iter().collect();
        self.attributes = gl.active_attributes(program).into_iter().collect();
    }
}

impl<B: ShaderBackend> Drop for ShaderProgram<B> {
    fn drop(&mut self) {
        if self.program.is_some() || !self.stages.is_empty() {
            tracing::warn!(
                stages = self.stages.len(),
                "shader program dropped without clear(), GL objects leaked"
            );
        }
    }
}

const FALLBACK_VERTEX: &str = r#"
#version 110

uniform mat4 MVP;
attribute vec3 vPos;

void main()
{
    gl_Position = MVP * vec4(vPos, 1.0);
}
"#;

const FALLBACK_FRAGMENT: &str = r#"
#version 110

void main()
{
    gl_FragColor = vec4(1.0, 0.0, 1.0, 1.0);
}
"#;

/// A magenta program that is guaranteed to be linked.
///
/// Built once at startup by whoever owns the GL context and handed to the
/// components that need a default.
pub struct FallbackShader<B: ShaderBackend> {
    program: ShaderProgram<B>,
}

impl<B: ShaderBackend> FallbackShader<B> {
    pub fn new(gl: &B) -> ShaderResult<Self> {
        let mut fallback = Self { program: ShaderProgram::new() };
        if let Err(err) = fallback.ensure(gl) {
            fallback.clear(gl);
            return Err(err);
        }
        Ok(fallback)
    }

    /// Rebuild the program unless it is already linked
    pub fn ensure(&mut self, gl: &B) -> ShaderResult<()> {
        if self.program.is_valid() {
            return Ok(());
        }

        let built = self
            .program
            .add_source(gl, StageKind::Vertex, FALLBACK_VERTEX)
            .and_then(|()| self.program.add_source(gl, StageKind::Fragment, FALLBACK_FRAGMENT))
            .and_then(|()| self.program.compile(gl));

        match built {
            Ok(()) if self.program.is_valid() => Ok(()),
            Ok(()) => Err(ShaderError::FatalConfiguration("program is not valid after linking".into())),
            Err(err) => {
                tracing::error!("fallback shader failed to build: {}", err);
                Err(ShaderError::FatalConfiguration(err.to_string()))
            }
        }
    }

    pub fn program(&self) -> &ShaderProgram<B> {
        &self.program
    }

    pub fn id(&self) -> Option<B::Program> {
        self.program.current_id()
    }

    pub fn clear(&mut self, gl: &B) {
        self.program.clear(gl);
    }
}
