//! Render contexts
//!
//! A context is one way of drawing: a linked program plus the vertex
//! attributes and uniforms registered against it. At most one context is
//! active. Switching disables the previous context's attribute arrays, binds
//! the new program and enables the new context's arrays. Re-selecting the
//! active context only rebinds the program.

use serde::{ Deserialize, Serialize };

use crate::engine::error::ContextError;
use crate::engine::geometry::Vertex;
use crate::engine::gpu::{
    AttributePointer,
    AttributeType,
    GpuDevice,
    ProgramHandle,
    ShaderHandle,
    UniformLocation,
    UniformValue,
};
use crate::engine::managers::ContextId;

/// Describes one per-vertex input of a program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexAttribute {
    pub name: String,
    pub components: i32,
    #[serde(default = "default_attribute_type")]
    pub kind: AttributeType,
    #[serde(default)]
    pub normalized: bool,
    pub stride: i32,
    pub offset: i32,
}

fn default_attribute_type() -> AttributeType {
    AttributeType::Float
}

impl VertexAttribute {
    pub fn new(name: &str, components: i32, kind: AttributeType, stride: i32, offset: i32) -> Self {
        Self {
            name: name.to_string(),
            components,
            kind,
            normalized: false,
            stride,
            offset,
        }
    }

    /// `position` inside the interleaved [`Vertex`]
    pub fn position() -> Self {
        Self::new("position", 3, AttributeType::Float, Vertex::STRIDE as i32, Vertex::POSITION_OFFSET as i32)
    }

    /// `normal` inside the interleaved [`Vertex`]
    pub fn normal() -> Self {
        Self::new("normal", 3, AttributeType::Float, Vertex::STRIDE as i32, Vertex::NORMAL_OFFSET as i32)
    }

    /// `texcoord` inside the interleaved [`Vertex`]
    pub fn texcoord() -> Self {
        Self::new("texcoord", 2, AttributeType::Float, Vertex::STRIDE as i32, Vertex::TEXCOORD_OFFSET as i32)
    }

    pub fn pointer(&self) -> AttributePointer {
        AttributePointer {
            components: self.components,
            kind: self.kind,
            normalized: self.normalized,
            stride: self.stride,
            offset: self.offset,
        }
    }
}

/// Vertex attribute resolved against a program. `location` is `None` when
/// the program does not define the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundAttribute {
    pub descriptor: VertexAttribute,
    pub location: Option<u32>,
}

/// Uniform resolved against a program. Writes to a `None` location are
/// skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformAttribute {
    pub name: String,
    pub location: Option<UniformLocation>,
}

#[derive(Debug, Clone)]
pub struct RenderContext {
    name: String,
    program: ProgramHandle,
    vertex_attributes: Vec<BoundAttribute>,
    uniforms: Vec<UniformAttribute>,
    layout_generation: u32,
}

impl RenderContext {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    pub fn vertex_attributes(&self) -> &[BoundAttribute] {
        &self.vertex_attributes
    }

    pub fn uniforms(&self) -> &[UniformAttribute] {
        &self.uniforms
    }

    /// Bumped whenever an attribute is registered or the program is relinked.
    /// Vertex arrays recorded under an older generation must be re-pointed.
    pub fn layout_generation(&self) -> u32 {
        self.layout_generation
    }

    pub fn uniform_location(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms
            .iter()
            .find(|uniform| uniform.name == name)
            .and_then(|uniform| uniform.location)
    }

    fn enabled_locations(&self) -> impl Iterator<Item = u32> + '_ {
        self.vertex_attributes.iter().filter_map(|attribute| attribute.location)
    }
}

#[derive(Debug, Default)]
pub struct RenderContextManager {
    contexts: Vec<RenderContext>,
    active: Option<ContextId>,
}

impl RenderContextManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Link a vertex and a fragment stage into a new context
    pub fn try_create_context(
        &mut self,
        gpu: &mut impl GpuDevice,
        name: &str,
        vertex_shader: ShaderHandle,
        fragment_shader: ShaderHandle
    ) -> Result<ContextId, ContextError> {
        if self.find_context(name).is_some() {
            return Err(ContextError::DuplicateName(name.to_string()));
        }

        let program = gpu.link_program(vertex_shader, fragment_shader).map_err(|log| {
            ContextError::Link {
                name: name.to_string(),
                log,
            }
        })?;

        self.contexts.push(RenderContext {
            name: name.to_string(),
            program,
            vertex_attributes: Vec::new(),
            uniforms: Vec::new(),
            layout_generation: 0,
        });
        let id = ContextId::from_index(self.contexts.len() - 1);
        log::info!("✅ Created render context {} as {}", name, id);
        Ok(id)
    }

    pub fn create_context(
        &mut self,
        gpu: &mut impl GpuDevice,
        name: &str,
        vertex_shader: ShaderHandle,
        fragment_shader: ShaderHandle
    ) -> ContextId {
        self.try_create_context(gpu, name, vertex_shader, fragment_shader).unwrap_or_else(|err| {
            log::error!("❌ {}", err);
            ContextId::ERROR
        })
    }

    /// Make `id` the active context
    pub fn try_set_context(&mut self, gpu: &mut impl GpuDevice, id: ContextId) -> Result<(), ContextError> {
        let next = self.contexts.get(id.index()).ok_or(ContextError::UnknownContext(id))?;

        if self.active == Some(id) {
            gpu.use_program(Some(next.program));
            return Ok(());
        }

        if let Some(previous) = self.active.and_then(|active| self.contexts.get(active.index())) {
            for location in previous.enabled_locations() {
                gpu.disable_vertex_attribute(location);
            }
        }
        gpu.use_program(Some(next.program));
        for location in next.enabled_locations() {
            gpu.enable_vertex_attribute(location);
        }

        log::debug!("Switched to render context {}", next.name);
        self.active = Some(id);
        Ok(())
    }

    /// Sentinel form of [`Self::try_set_context`]. False only when `id` names
    /// no context; re-selecting the active context still returns true.
    pub fn set_context(&mut self, gpu: &mut impl GpuDevice, id: ContextId) -> bool {
        match self.try_set_context(gpu, id) {
            Ok(()) => true,
            Err(err) => {
                log::error!("❌ {}", err);
                false
            }
        }
    }

    /// Register a vertex input on the active context. The location is looked
    /// up in the live program; an unknown name is kept with no location.
    /// Registering a name again replaces its descriptor.
    pub fn add_vertex_attribute(
        &mut self,
        gpu: &mut impl GpuDevice,
        attribute: VertexAttribute
    ) -> Result<Option<u32>, ContextError> {
        let context = self.active_context_mut()?;
        let location = gpu.attribute_location(context.program, &attribute.name);
        if location.is_none() {
            log::warn!("⚠️  Context {} has no vertex attribute named {}", context.name, attribute.name);
        }

        let bound = BoundAttribute {
            descriptor: attribute,
            location,
        };
        let existing = context.vertex_attributes
            .iter_mut()
            .find(|existing| existing.descriptor.name == bound.descriptor.name);
        match existing {
            Some(existing) => {
                log::debug!("Replacing vertex attribute {} on {}", bound.descriptor.name, context.name);
                if let Some(previous) = existing.location.filter(|previous| Some(*previous) != location) {
                    gpu.disable_vertex_attribute(previous);
                }
                let already_enabled = existing.location == location;
                *existing = bound;
                if !already_enabled {
                    if let Some(location) = location {
                        gpu.enable_vertex_attribute(location);
                    }
                }
            }
            None => {
                if let Some(location) = location {
                    gpu.enable_vertex_attribute(location);
                }
                context.vertex_attributes.push(bound);
            }
        }
        context.layout_generation = context.layout_generation.wrapping_add(1);
        Ok(location)
    }

    /// Register a uniform on the active context, resolving its location
    pub fn add_uniform_attribute(
        &mut self,
        gpu: &impl GpuDevice,
        name: &str
    ) -> Result<Option<UniformLocation>, ContextError> {
        let context = self.active_context_mut()?;
        let location = gpu.uniform_location(context.program, name);
        if location.is_none() {
            log::warn!("⚠️  Context {} has no uniform named {}", context.name, name);
        }
        match context.uniforms.iter_mut().find(|uniform| uniform.name == name) {
            Some(existing) => {
                existing.location = location;
            }
            None =>
                context.uniforms.push(UniformAttribute {
                    name: name.to_string(),
                    location,
                }),
        }
        Ok(location)
    }

    /// Write a registered uniform of the active context. Returns whether a
    /// write reached the device.
    pub fn set_uniform(&self, gpu: &mut impl GpuDevice, name: &str, value: UniformValue) -> bool {
        let Some(context) = self.active.and_then(|active| self.contexts.get(active.index())) else {
            log::warn!("⚠️  Uniform {} written with no active context", name);
            return false;
        };
        match context.uniform_location(name) {
            Some(location) => {
                gpu.set_uniform(location, value);
                true
            }
            None => false,
        }
    }

    /// Relink a context from new stages. The old program is kept when linking
    /// fails; on success every registered location is resolved again.
    pub fn relink_context(
        &mut self,
        gpu: &mut impl GpuDevice,
        id: ContextId,
        vertex_shader: ShaderHandle,
        fragment_shader: ShaderHandle
    ) -> Result<(), ContextError> {
        let is_active = self.active == Some(id);
        let context = self.contexts.get_mut(id.index()).ok_or(ContextError::UnknownContext(id))?;

        let program = gpu.link_program(vertex_shader, fragment_shader).map_err(|log| {
            ContextError::Link {
                name: context.name.clone(),
                log,
            }
        })?;

        if is_active {
            for location in context.enabled_locations() {
                gpu.disable_vertex_attribute(location);
            }
        }
        gpu.delete_program(context.program);
        context.program = program;

        for attribute in &mut context.vertex_attributes {
            attribute.location = gpu.attribute_location(program, &attribute.descriptor.name);
        }
        for uniform in &mut context.uniforms {
            uniform.location = gpu.uniform_location(program, &uniform.name);
        }
        context.layout_generation = context.layout_generation.wrapping_add(1);

        if is_active {
            gpu.use_program(Some(program));
            for location in context.enabled_locations() {
                gpu.enable_vertex_attribute(location);
            }
        }

        log::info!("🔄 Relinked render context {}", context.name);
        Ok(())
    }

    pub fn find_context(&self, name: &str) -> Option<ContextId> {
        self.contexts
            .iter()
            .position(|context| context.name == name)
            .map(ContextId::from_index)
    }

    pub fn context(&self, id: ContextId) -> Option<&RenderContext> {
        self.contexts.get(id.index())
    }

    pub fn program(&self, id: ContextId) -> Option<ProgramHandle> {
        self.context(id).map(RenderContext::program)
    }

    pub fn active(&self) -> Option<ContextId> {
        self.active
    }

    pub fn active_context(&self) -> Option<&RenderContext> {
        self.active.and_then(|id| self.context(id))
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Delete every program and forget the active context
    pub fn destroy_all(&mut self, gpu: &mut impl GpuDevice) {
        if let Some(active) = self.active.take().and_then(|id| self.contexts.get(id.index())) {
            for location in active.enabled_locations() {
                gpu.disable_vertex_attribute(location);
            }
        }
        if !self.contexts.is_empty() {
            gpu.use_program(None);
        }
        for context in self.contexts.drain(..) {
            gpu.delete_program(context.program);
        }
    }

    fn active_context_mut(&mut self) -> Result<&mut RenderContext, ContextError> {
        let id = self.active.ok_or(ContextError::NotActive(ContextId::ERROR))?;
        self.contexts.get_mut(id.index()).ok_or(ContextError::UnknownContext(id))
    }
}
