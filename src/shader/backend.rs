use std::fmt::Debug;

use glow::HasContext;

use super::StageKind;

/// The slice of the graphics API that [`ShaderProgram`](super::ShaderProgram) drives.
///
/// Every call must happen on the thread that owns the GL context.
pub trait ShaderBackend {
    type Shader: Copy + Eq + Debug;
    type Program: Copy + Eq + Debug;
    type UniformLocation: Clone + Debug;

    fn create_stage(&self, kind: StageKind) -> Result<Self::Shader, String>;
    /// Set the stage's source and compile it, returning the info log on failure
    fn compile_stage(&self, shader: Self::Shader, source: &str) -> Result<(), String>;
    fn is_stage(&self, shader: Self::Shader) -> bool;
    fn delete_stage(&self, shader: Self::Shader);

    fn create_program(&self) -> Result<Self::Program, String>;
    fn is_program(&self, program: Self::Program) -> bool;
    fn attach_stage(&self, program: Self::Program, shader: Self::Shader);
    fn detach_stage(&self, program: Self::Program, shader: Self::Shader);
    /// Link the program, returning the info log on failure
    fn link_program(&self, program: Self::Program) -> Result<(), String>;
    fn delete_program(&self, program: Self::Program);

    /// Active uniforms of a linked program with their resolved locations
    fn active_uniforms(&self, program: Self::Program) -> Vec<(String, Self::UniformLocation)>;
    /// Active vertex attributes of a linked program with their resolved locations
    fn active_attributes(&self, program: Self::Program) -> Vec<(String, u32)>;
}

impl ShaderBackend for glow::Context {
    type Shader = glow::Shader;
    type Program = glow::Program;
    type UniformLocation = glow::UniformLocation;

    fn create_stage(&self, kind: StageKind) -> Result<Self::Shader, String> {
        unsafe { self.create_shader(kind.gl_enum()) }
    }

    fn compile_stage(&self, shader: Self::Shader, source: &str) -> Result<(), String> {
        unsafe {
            self.shader_source(shader, source);
            self.compile_shader(shader);
            if self.get_shader_compile_status(shader) {
                Ok(())
            } else {
                Err(self.get_shader_info_log(shader))
            }
        }
    }

    fn is_stage(&self, shader: Self::Shader) -> bool {
        unsafe { self.is_shader(shader) }
    }

    fn delete_stage(&self, shader: Self::Shader) {
        unsafe { self.delete_shader(shader) }
    }

    fn create_program(&self) -> Result<Self::Program, String> {
        unsafe { HasContext::create_program(self) }
    }

    fn is_program(&self, program: Self::Program) -> bool {
        unsafe { HasContext::is_program(self, program) }
    }

    fn attach_stage(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { self.attach_shader(program, shader) }
    }

    fn detach_stage(&self, program: Self::Program, shader: Self::Shader) {
        unsafe { self.detach_shader(program, shader) }
    }

    fn link_program(&self, program: Self::Program) -> Result<(), String> {
        unsafe {
            HasContext::link_program(self, program);
            if self.get_program_link_status(program) {
                Ok(())
            } else {
                Err(self.get_program_info_log(program))
            }
        }
    }

    fn delete_program(&self, program: Self::Program) {
        unsafe { HasContext::delete_program(self, program) }
    }

    fn active_uniforms(&self, program: Self::Program) -> Vec<(String, Self::UniformLocation)> {
        unsafe {
            let count = self.get_active_uniforms(program);
            (0..count)
                .filter_map(|index| self.get_active_uniform(program, index))
                .filter_map(|uniform| {
                    // built-ins such as gl_ModelViewMatrix have no location
                    self.get_uniform_location(program, &uniform.name)
                        .map(|location| (uniform.name, location))
                })
                .collect()
        }
    }

    fn active_attributes(&self, program: Self::Program) -> Vec<(String, u32)> {
        unsafe {
            let count = self.get_active_attributes(program);
            (0..count)
                .filter_map(|index| self.get_active_attribute(program, index))
                .filter_map(|attribute| {
                    self.get_attrib_location(program, &attribute.name)
                        .map(|location| (attribute.name, location))
                })
                .collect()
        }
    }
}
