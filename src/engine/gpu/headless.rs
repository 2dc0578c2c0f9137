//! Software [`GpuDevice`] for tooling and tests.
//!
//! Objects live in host memory, handles are allocated from a counter and every
//! driver entry point bumps a [`DeviceStats`] counter. Linked programs are
//! reflected from their GLSL source: vertex-stage `in` declarations become
//! attributes, plain `uniform` declarations become uniforms and
//! `uniform Name { ... }` declarations become uniform blocks whose byte size
//! must be declared up front with [`HeadlessDevice::with_block_size`].

use std::collections::{ BTreeSet, HashMap, HashSet };

use super::{
    AttributePointer,
    BufferHandle,
    BufferTarget,
    BufferUsage,
    Capability,
    DrawMode,
    GpuDevice,
    ProgramHandle,
    ShaderHandle,
    ShaderStage,
    UniformLocation,
    UniformValue,
    VertexArrayHandle,
};

/// `GL_MAX_UNIFORM_BUFFER_BINDINGS` guaranteed by OpenGL 3.3
pub const DEFAULT_UNIFORM_BUFFER_BINDINGS: u32 = 36;

/// Call counters observable by tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    pub buffers_created: usize,
    pub buffers_deleted: usize,
    pub vertex_arrays_created: usize,
    pub vertex_arrays_deleted: usize,
    pub shaders_compiled: usize,
    pub shaders_deleted: usize,
    pub programs_linked: usize,
    pub programs_deleted: usize,
    pub program_binds: usize,
    pub attribute_enables: usize,
    pub attribute_disables: usize,
    pub attribute_pointer_calls: usize,
    pub uniform_writes: usize,
    pub buffer_uploads: usize,
    pub bytes_uploaded: usize,
    pub capability_changes: usize,
    pub clears: usize,
    pub draw_calls: usize,
    pub indices_drawn: usize,
    pub vertices_drawn: usize,
}

/// Names a linked program exposes, as found by reflection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramInterface {
    pub attributes: Vec<String>,
    pub uniforms: Vec<String>,
    pub blocks: Vec<String>,
}

impl ProgramInterface {
    /// Collect declarations from the two stages of a program
    pub fn reflect(vertex_source: &str, fragment_source: &str) -> Self {
        let mut interface = Self::default();
        interface.scan(vertex_source, ShaderStage::Vertex);
        interface.scan(fragment_source, ShaderStage::Fragment);
        interface
    }

    fn scan(&mut self, source: &str, stage: ShaderStage) {
        let mut lines = source.lines().peekable();
        while let Some(raw) = lines.next() {
            let line = strip_layout(raw.trim());
            let tokens: Vec<&str> = line.split_whitespace().collect();
            match tokens.as_slice() {
                ["in", .., last] if stage == ShaderStage::Vertex && tokens.len() >= 3 => {
                    push_unique(&mut self.attributes, declared_name(last));
                }
                ["uniform", block, "{", ..] => {
                    push_unique(&mut self.blocks, block.to_string());
                }
                ["uniform", block] if !block.ends_with(';') => {
                    let opens_block = lines
                        .peek()
                        .map(|next| next.trim_start().starts_with('{'))
                        .unwrap_or(false);
                    if opens_block {
                        push_unique(&mut self.blocks, block.to_string());
                    }
                }
                ["uniform", .., last] if tokens.len() >= 3 => {
                    push_unique(&mut self.uniforms, declared_name(last));
                }
                _ => {}
            }
        }
    }
}

fn strip_layout(line: &str) -> &str {
    if line.starts_with("layout") {
        if let Some(end) = line.find(')') {
            return line[end + 1..].trim_start();
        }
    }
    line
}

fn declared_name(token: &str) -> String {
    let name = token.trim_end_matches(';');
    match name.find('[') {
        Some(bracket) => name[..bracket].to_string(),
        None => name.to_string(),
    }
}

fn push_unique(names: &mut Vec<String>, name: String) {
    if !name.is_empty() && !names.contains(&name) {
        names.push(name);
    }
}

#[derive(Debug, Clone)]
struct HeadlessProgram {
    interface: ProgramInterface,
    block_bindings: HashMap<String, u32>,
    uniform_values: HashMap<String, UniformValue>,
}

#[derive(Debug, Default)]
pub struct HeadlessDevice {
    next_handle: u32,
    buffers: HashMap<BufferHandle, Vec<u8>>,
    buffer_usage: HashMap<BufferHandle, BufferUsage>,
    bound_buffers: HashMap<BufferTarget, BufferHandle>,
    indexed_bindings: HashMap<u32, BufferHandle>,
    vertex_arrays: HashSet<VertexArrayHandle>,
    bound_vertex_array: Option<VertexArrayHandle>,
    shaders: HashMap<ShaderHandle, (ShaderStage, String)>,
    programs: HashMap<ProgramHandle, HeadlessProgram>,
    current_program: Option<ProgramHandle>,
    enabled_attributes: BTreeSet<u32>,
    // keyed by the vertex array bound when the pointer was described
    attribute_pointers: HashMap<(Option<VertexArrayHandle>, u32), AttributePointer>,
    capabilities: HashSet<Capability>,
    block_sizes: HashMap<String, usize>,
    pending_link_failure: Option<String>,
    uniform_binding_limit: Option<u32>,
    viewport: [i32; 4],
    stats: DeviceStats,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Byte size the "linker" reports for a uniform block
    pub fn with_block_size(mut self, name: &str, size: usize) -> Self {
        self.declare_block_size(name, size);
        self
    }

    pub fn declare_block_size(&mut self, name: &str, size: usize) {
        self.block_sizes.insert(name.to_string(), size);
    }

    /// Number of indexed uniform buffer binding points the device reports
    pub fn with_uniform_binding_limit(mut self, limit: u32) -> Self {
        self.uniform_binding_limit = Some(limit);
        self
    }

    /// Make the next `link_program` call fail with `log`
    pub fn fail_next_link(&mut self, log: &str) {
        self.pending_link_failure = Some(log.to_string());
    }

    pub fn stats(&self) -> DeviceStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = DeviceStats::default();
    }

    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_vertex_array_count(&self) -> usize {
        self.vertex_arrays.len()
    }

    pub fn live_program_count(&self) -> usize {
        self.programs.len()
    }

    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    pub fn buffer_usage(&self, buffer: BufferHandle) -> Option<BufferUsage> {
        self.buffer_usage.get(&buffer).copied()
    }

    pub fn current_program(&self) -> Option<ProgramHandle> {
        self.current_program
    }

    pub fn bound_vertex_array(&self) -> Option<VertexArrayHandle> {
        self.bound_vertex_array
    }

    pub fn enabled_attributes(&self) -> Vec<u32> {
        self.enabled_attributes.iter().copied().collect()
    }

    /// Pointer recorded for `location` in `vertex_array`
    pub fn attribute_pointer(&self, vertex_array: VertexArrayHandle, location: u32) -> Option<AttributePointer> {
        self.attribute_pointers.get(&(Some(vertex_array), location)).copied()
    }

    pub fn is_capability_enabled(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn viewport_rect(&self) -> [i32; 4] {
        self.viewport
    }

    pub fn program_interface(&self, program: ProgramHandle) -> Option<&ProgramInterface> {
        self.programs.get(&program).map(|p| &p.interface)
    }

    /// Last value written to a uniform of `program`
    pub fn uniform_value(&self, program: ProgramHandle, name: &str) -> Option<UniformValue> {
        self.programs.get(&program).and_then(|p| p.uniform_values.get(name).copied())
    }

    pub fn block_binding(&self, program: ProgramHandle, name: &str) -> Option<u32> {
        self.programs.get(&program).and_then(|p| p.block_bindings.get(name).copied())
    }

    pub fn indexed_binding(&self, binding: u32) -> Option<BufferHandle> {
        self.indexed_bindings.get(&binding).copied()
    }

    fn allocate(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }

    fn bound(&self, target: BufferTarget) -> Option<BufferHandle> {
        self.bound_buffers.get(&target).copied()
    }
}

impl GpuDevice for HeadlessDevice {
    fn create_buffer(&mut self) -> Result<BufferHandle, String> {
        let buffer = BufferHandle(self.allocate());
        self.buffers.insert(buffer, Vec::new());
        self.stats.buffers_created += 1;
        Ok(buffer)
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer).is_some() {
            self.buffer_usage.remove(&buffer);
            self.bound_buffers.retain(|_, bound| *bound != buffer);
            self.indexed_bindings.retain(|_, bound| *bound != buffer);
            self.stats.buffers_deleted += 1;
        }
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferHandle>) {
        match buffer {
            Some(buffer) => {
                self.bound_buffers.insert(target, buffer);
            }
            None => {
                self.bound_buffers.remove(&target);
            }
        }
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        let Some(buffer) = self.bound(target) else {
            log::warn!("buffer_data with no buffer bound to {:?}", target);
            return;
        };
        if let Some(store) = self.buffers.get_mut(&buffer) {
            store.clear();
            store.extend_from_slice(data);
            self.buffer_usage.insert(buffer, usage);
            self.stats.buffer_uploads += 1;
            self.stats.bytes_uploaded += data.len();
        }
    }

    fn buffer_sub_data(&mut self, target: BufferTarget, offset: usize, data: &[u8]) {
        let Some(buffer) = self.bound(target) else {
            log::warn!("buffer_sub_data with no buffer bound to {:?}", target);
            return;
        };
        if let Some(store) = self.buffers.get_mut(&buffer) {
            let len = store.len();
            let Some(range) = store.get_mut(offset..offset + data.len()) else {
                log::warn!("buffer_sub_data out of range ({} + {} > {})", offset, data.len(), len);
                return;
            };
            range.copy_from_slice(data);
            self.stats.buffer_uploads += 1;
            self.stats.bytes_uploaded += data.len();
        }
    }

    fn max_uniform_buffer_bindings(&self) -> u32 {
        self.uniform_binding_limit.unwrap_or(DEFAULT_UNIFORM_BUFFER_BINDINGS)
    }

    fn bind_buffer_base(&mut self, _target: BufferTarget, binding: u32, buffer: Option<BufferHandle>) {
        match buffer {
            Some(buffer) => {
                self.indexed_bindings.insert(binding, buffer);
            }
            None => {
                self.indexed_bindings.remove(&binding);
            }
        }
    }

    fn create_vertex_array(&mut self) -> Result<VertexArrayHandle, String> {
        let vao = VertexArrayHandle(self.allocate());
        self.vertex_arrays.insert(vao);
        self.stats.vertex_arrays_created += 1;
        Ok(vao)
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        if self.vertex_arrays.remove(&vertex_array) {
            if self.bound_vertex_array == Some(vertex_array) {
                self.bound_vertex_array = None;
            }
            self.attribute_pointers.retain(|(owner, _), _| *owner != Some(vertex_array));
            self.stats.vertex_arrays_deleted += 1;
        }
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>) {
        self.bound_vertex_array = vertex_array;
    }

    fn enable_vertex_attribute(&mut self, location: u32) {
        self.enabled_attributes.insert(location);
        self.stats.attribute_enables += 1;
    }

    fn disable_vertex_attribute(&mut self, location: u32) {
        self.enabled_attributes.remove(&location);
        self.stats.attribute_disables += 1;
    }

    fn vertex_attribute_pointer(&mut self, location: u32, pointer: &AttributePointer) {
        self.attribute_pointers.insert((self.bound_vertex_array, location), *pointer);
        self.stats.attribute_pointer_calls += 1;
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderHandle, String> {
        if let Some((line, text)) = source
            .lines()
            .enumerate()
            .find(|(_, text)| text.trim_start().starts_with("#error"))
        {
            let message = text.trim_start().trim_start_matches("#error").trim();
            return Err(format!("ERROR: 0:{}: '#error' : {}", line + 1, message));
        }
        let shader = ShaderHandle(self.allocate());
        self.shaders.insert(shader, (stage, source.to_string()));
        self.stats.shaders_compiled += 1;
        Ok(shader)
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        if self.shaders.remove(&shader).is_some() {
            self.stats.shaders_deleted += 1;
        }
    }

    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle
    ) -> Result<ProgramHandle, String> {
        if let Some(log) = self.pending_link_failure.take() {
            return Err(log);
        }
        let (Some((ShaderStage::Vertex, vs)), Some((ShaderStage::Fragment, fs))) = (
            self.shaders.get(&vertex),
            self.shaders.get(&fragment),
        ) else {
            return Err("ERROR: attached shaders are missing or of the wrong stage".to_string());
        };
        let interface = ProgramInterface::reflect(vs, fs);
        let program = ProgramHandle(self.allocate());
        self.programs.insert(program, HeadlessProgram {
            interface,
            block_bindings: HashMap::new(),
            uniform_values: HashMap::new(),
        });
        self.stats.programs_linked += 1;
        Ok(program)
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        if self.programs.remove(&program).is_some() {
            if self.current_program == Some(program) {
                self.current_program = None;
            }
            self.stats.programs_deleted += 1;
        }
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        self.current_program = program;
        self.stats.program_binds += 1;
    }

    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<u32> {
        let program = self.programs.get(&program)?;
        program.interface.attributes
            .iter()
            .position(|attribute| attribute == name)
            .map(|index| index as u32)
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let program = self.programs.get(&program)?;
        program.interface.uniforms
            .iter()
            .position(|uniform| uniform == name)
            .map(|index| UniformLocation(index as u32))
    }

    fn uniform_block_size(&self, program: ProgramHandle, name: &str) -> Option<usize> {
        let program = self.programs.get(&program)?;
        if !program.interface.blocks.iter().any(|block| block == name) {
            return None;
        }
        self.block_sizes.get(name).copied()
    }

    fn uniform_block_binding(&mut self, program: ProgramHandle, name: &str, binding: u32) -> bool {
        let Some(program) = self.programs.get_mut(&program) else {
            return false;
        };
        if !program.interface.blocks.iter().any(|block| block == name) {
            return false;
        }
        program.block_bindings.insert(name.to_string(), binding);
        true
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        self.stats.uniform_writes += 1;
        let Some(program) = self.current_program.and_then(|p| self.programs.get_mut(&p)) else {
            log::warn!("uniform write with no program in use");
            return;
        };
        if let Some(name) = program.interface.uniforms.get(location.0 as usize) {
            program.uniform_values.insert(name.clone(), value);
        }
    }

    fn set_capability(&mut self, capability: Capability, enabled: bool) {
        if enabled {
            self.capabilities.insert(capability);
        } else {
            self.capabilities.remove(&capability);
        }
        self.stats.capability_changes += 1;
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.viewport = [x, y, width, height];
    }

    fn clear(&mut self, _color: [f32; 4]) {
        self.stats.clears += 1;
    }

    fn draw_elements(&mut self, _mode: DrawMode, count: usize, _offset: usize) {
        if self.bound(BufferTarget::Index).is_none() {
            log::warn!("draw_elements with no index buffer bound");
        }
        self.stats.draw_calls += 1;
        self.stats.indices_drawn += count;
    }

    fn draw_arrays(&mut self, _mode: DrawMode, _first: usize, count: usize) {
        self.stats.draw_calls += 1;
        self.stats.vertices_drawn += count;
    }
}
