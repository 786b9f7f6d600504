//! In-memory stand-in for the GL shader API used by unit tests.
//!
//! Compilation only checks that `main` exists and brackets balance; linking
//! needs every attached stage compiled and a fragment stage next to any
//! vertex stage. Uniforms and vertex attributes are picked out of the
//! declarations in the attached sources.

use std::cell::RefCell;
use std::collections::HashMap;

use super::{ShaderBackend, StageKind};

struct FakeStage {
    kind: StageKind,
    source: String,
    compiled: bool,
}

#[derive(Default)]
struct FakeProgram {
    attached: Vec<u32>,
    uniforms: Vec<String>,
    attributes: Vec<String>,
}

#[derive(Default)]
struct State {
    next_id: u32,
    stages: HashMap<u32, FakeStage>,
    programs: HashMap<u32, FakeProgram>,
    programs_created: usize,
    stages_compiled: usize,
    fail_links: bool,
}

#[derive(Default)]
pub struct FakeGl {
    state: RefCell<State>,
}

impl FakeGl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_links(&self, fail: bool) {
        self.state.borrow_mut().fail_links = fail;
    }

    pub fn live_objects(&self) -> usize {
        let state = self.state.borrow();
        state.stages.len() + state.programs.len()
    }

    pub fn programs_created(&self) -> usize {
        self.state.borrow().programs_created
    }

    pub fn stages_compiled(&self) -> usize {
        self.state.borrow().stages_compiled
    }

    pub fn attached_count(&self, program: u32) -> usize {
        self.state.borrow().programs.get(&program).map_or(0, |p| p.attached.len())
    }
}

fn balanced(source: &str, open: char, close: char) -> bool {
    let mut depth = 0i32;
    for c in source.chars() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth < 0 {
                return false;
            }
        }
    }
    depth == 0
}

fn declared(source: &str, qualifiers: &[&str]) -> Vec<String> {
    let tokens: Vec<&str> = source.split_whitespace().collect();
    tokens
        .iter()
        .enumerate()
        .filter(|(_, token)| qualifiers.contains(token))
        .filter_map(|(i, _)| tokens.get(i + 2))
        .map(|name| {
            let name = name.trim_end_matches(';');
            name.split('[').next().unwrap_or(name).to_string()
        })
        .collect()
}

impl ShaderBackend for FakeGl {
    type Shader = u32;
    type Program = u32;
    type UniformLocation = i32;

    fn create_stage(&self, kind: StageKind) -> Result<u32, String> {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = state.next_id;
        state.stages.insert(id, FakeStage { kind, source: String::new(), compiled: false });
        Ok(id)
    }

    fn compile_stage(&self, shader: u32, source: &str) -> Result<(), String> {
        let mut state = self.state.borrow_mut();
        state.stages_compiled += 1;
        let stage = state.stages.get_mut(&shader).ok_or("invalid shader object")?;
        stage.source = source.to_string();
        stage.compiled = source.contains("main") && balanced(source, '{', '}') && balanced(source, '(', ')');
        if stage.compiled {
            Ok(())
        } else {
            Err("0:1(1): error: syntax error, unexpected end of file".to_string())
        }
    }

    fn is_stage(&self, shader: u32) -> bool {
        self.state.borrow().stages.contains_key(&shader)
    }

    fn delete_stage(&self, shader: u32) {
        self.state.borrow_mut().stages.remove(&shader);
    }

    fn create_program(&self) -> Result<u32, String> {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        state.programs_created += 1;
        let id = state.next_id;
        state.programs.insert(id, FakeProgram::default());
        Ok(id)
    }

    fn is_program(&self, program: u32) -> bool {
        self.state.borrow().programs.contains_key(&program)
    }

    fn attach_stage(&self, program: u32, shader: u32) {
        if let Some(p) = self.state.borrow_mut().programs.get_mut(&program) {
            p.attached.push(shader);
        }
    }

    fn detach_stage(&self, program: u32, shader: u32) {
        if let Some(p) = self.state.borrow_mut().programs.get_mut(&program) {
            p.attached.retain(|s| *s != shader);
        }
    }

    fn link_program(&self, program: u32) -> Result<(), String> {
        let mut state = self.state.borrow_mut();
        let state = &mut *state;
        let fail_links = state.fail_links;
        let p = state.programs.get_mut(&program).ok_or("invalid program object")?;

        p.uniforms.clear();
        p.attributes.clear();

        let stages: Vec<&FakeStage> = p.attached.iter().filter_map(|id| state.stages.get(id)).collect();
        let has = |kind: StageKind| stages.iter().any(|s| s.kind == kind);

        if fail_links {
            return Err("error: linking disabled".to_string());
        }
        if stages.is_empty() {
            return Err("error: no shaders attached".to_string());
        }
        if stages.iter().any(|s| !s.compiled) {
            return Err("error: attached shader is not compiled".to_string());
        }
        if has(StageKind::Vertex) && !has(StageKind::Fragment) {
            return Err("error: vertex stage needs a fragment stage".to_string());
        }

        for stage in &stages {
            for name in declared(&stage.source, &["uniform"]) {
                if !p.uniforms.contains(&name) {
                    p.uniforms.push(name);
                }
            }
            if stage.kind == StageKind::Vertex {
                p.attributes.extend(declared(&stage.source, &["attribute", "in"]));
            }
        }
        Ok(())
    }

    fn delete_program(&self, program: u32) {
        self.state.borrow_mut().programs.remove(&program);
    }

    fn active_uniforms(&self, program: u32) -> Vec<(String, i32)> {
        self.state.borrow().programs.get(&program).map_or_else(Vec::new, |p| {
            p.uniforms.iter().cloned().zip(0..).collect()
        })
    }

    fn active_attributes(&self, program: u32) -> Vec<(String, u32)> {
        self.state.borrow().programs.get(&program).map_or_else(Vec::new, |p| {
            p.attributes.iter().cloned().zip(0..).collect()
        })
    }
}
