use std::num::NonZeroU32;

use glow::HasContext;

use super::{
    AttributePointer,
    AttributeType,
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

/// [`GpuDevice`] backed by a native OpenGL context
pub struct GlowDevice {
    gl: glow::Context,
}

impl GlowDevice {
    pub fn new(gl: glow::Context) -> Self {
        Self { gl }
    }

    /// Build the context from a platform loader (glutin, sdl, ...)
    pub fn from_loader_function<F>(loader: F) -> Self where F: FnMut(&str) -> *const std::ffi::c_void {
        let gl = unsafe { glow::Context::from_loader_function(loader) };
        Self::new(gl)
    }

    pub fn context(&self) -> &glow::Context {
        &self.gl
    }
}

fn target_enum(target: BufferTarget) -> u32 {
    match target {
        BufferTarget::Vertex => glow::ARRAY_BUFFER,
        BufferTarget::Index => glow::ELEMENT_ARRAY_BUFFER,
        BufferTarget::Uniform => glow::UNIFORM_BUFFER,
    }
}

fn usage_enum(usage: BufferUsage) -> u32 {
    match usage {
        BufferUsage::StaticDraw => glow::STATIC_DRAW,
        BufferUsage::DynamicDraw => glow::DYNAMIC_DRAW,
    }
}

fn mode_enum(mode: DrawMode) -> u32 {
    match mode {
        DrawMode::Triangles => glow::TRIANGLES,
        DrawMode::Lines => glow::LINES,
    }
}

fn capability_enum(capability: Capability) -> u32 {
    match capability {
        Capability::DepthTest => glow::DEPTH_TEST,
        Capability::CullFace => glow::CULL_FACE,
        Capability::Blend => glow::BLEND,
    }
}

fn attribute_type_enum(kind: AttributeType) -> u32 {
    match kind {
        AttributeType::Float => glow::FLOAT,
        AttributeType::UnsignedByte => glow::UNSIGNED_BYTE,
        AttributeType::Int => glow::INT,
    }
}

fn native_buffer(handle: BufferHandle) -> Option<glow::NativeBuffer> {
    NonZeroU32::new(handle.0).map(glow::NativeBuffer)
}

fn native_vertex_array(handle: VertexArrayHandle) -> Option<glow::NativeVertexArray> {
    NonZeroU32::new(handle.0).map(glow::NativeVertexArray)
}

fn native_shader(handle: ShaderHandle) -> Option<glow::NativeShader> {
    NonZeroU32::new(handle.0).map(glow::NativeShader)
}

fn native_program(handle: ProgramHandle) -> Option<glow::NativeProgram> {
    NonZeroU32::new(handle.0).map(glow::NativeProgram)
}

impl GpuDevice for GlowDevice {
    fn create_buffer(&mut self) -> Result<BufferHandle, String> {
        unsafe { self.gl.create_buffer().map(|buffer| BufferHandle(buffer.0.get())) }
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if let Some(buffer) = native_buffer(buffer) {
            unsafe { self.gl.delete_buffer(buffer) }
        }
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferHandle>) {
        unsafe { self.gl.bind_buffer(target_enum(target), buffer.and_then(native_buffer)) }
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        unsafe { self.gl.buffer_data_u8_slice(target_enum(target), data, usage_enum(usage)) }
    }

    fn buffer_sub_data(&mut self, target: BufferTarget, offset: usize, data: &[u8]) {
        unsafe { self.gl.buffer_sub_data_u8_slice(target_enum(target), offset as i32, data) }
    }

    fn max_uniform_buffer_bindings(&self) -> u32 {
        let limit = unsafe { self.gl.get_parameter_i32(glow::MAX_UNIFORM_BUFFER_BINDINGS) };
        limit.max(0) as u32
    }

    fn bind_buffer_base(&mut self, target: BufferTarget, binding: u32, buffer: Option<BufferHandle>) {
        unsafe {
            self.gl.bind_buffer_base(target_enum(target), binding, buffer.and_then(native_buffer))
        }
    }

    fn create_vertex_array(&mut self) -> Result<VertexArrayHandle, String> {
        unsafe { self.gl.create_vertex_array().map(|vao| VertexArrayHandle(vao.0.get())) }
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        if let Some(vao) = native_vertex_array(vertex_array) {
            unsafe { self.gl.delete_vertex_array(vao) }
        }
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>) {
        unsafe { self.gl.bind_vertex_array(vertex_array.and_then(native_vertex_array)) }
    }

    fn enable_vertex_attribute(&mut self, location: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(location) }
    }

    fn disable_vertex_attribute(&mut self, location: u32) {
        unsafe { self.gl.disable_vertex_attrib_array(location) }
    }

    fn vertex_attribute_pointer(&mut self, location: u32, pointer: &AttributePointer) {
        unsafe {
            match pointer.kind {
                AttributeType::Float => {
                    self.gl.vertex_attrib_pointer_f32(
                        location,
                        pointer.components,
                        glow::FLOAT,
                        pointer.normalized,
                        pointer.stride,
                        pointer.offset
                    );
                }
                kind if pointer.normalized => {
                    self.gl.vertex_attrib_pointer_f32(
                        location,
                        pointer.components,
                        attribute_type_enum(kind),
                        true,
                        pointer.stride,
                        pointer.offset
                    );
                }
                kind => {
                    self.gl.vertex_attrib_pointer_i32(
                        location,
                        pointer.components,
                        attribute_type_enum(kind),
                        pointer.stride,
                        pointer.offset
                    );
                }
            }
        }
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderHandle, String> {
        let shader_type = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        unsafe {
            let shader = self.gl.create_shader(shader_type)?;
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);

            if !self.gl.get_shader_compile_status(shader) {
                let log = self.gl.get_shader_info_log(shader);
                self.gl.delete_shader(shader);
                return Err(log);
            }
            Ok(ShaderHandle(shader.0.get()))
        }
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        if let Some(shader) = native_shader(shader) {
            unsafe { self.gl.delete_shader(shader) }
        }
    }

    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle
    ) -> Result<ProgramHandle, String> {
        let (Some(vs), Some(fs)) = (native_shader(vertex), native_shader(fragment)) else {
            return Err("invalid shader handle".to_string());
        };
        unsafe {
            let program = self.gl.create_program()?;
            self.gl.attach_shader(program, vs);
            self.gl.attach_shader(program, fs);
            self.gl.link_program(program);

            // Stages stay owned by the shader manager so they can be relinked later
            self.gl.detach_shader(program, vs);
            self.gl.detach_shader(program, fs);

            if !self.gl.get_program_link_status(program) {
                let log = self.gl.get_program_info_log(program);
                self.gl.delete_program(program);
                return Err(log);
            }
            Ok(ProgramHandle(program.0.get()))
        }
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        if let Some(program) = native_program(program) {
            unsafe { self.gl.delete_program(program) }
        }
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        unsafe { self.gl.use_program(program.and_then(native_program)) }
    }

    fn attribute_location(&self, program: ProgramHandle, name: &str) -> Option<u32> {
        let program = native_program(program)?;
        unsafe { self.gl.get_attrib_location(program, name) }
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let program = native_program(program)?;
        unsafe { self.gl.get_uniform_location(program, name).map(|loc| UniformLocation(loc.0)) }
    }

    fn uniform_block_size(&self, program: ProgramHandle, name: &str) -> Option<usize> {
        let program = native_program(program)?;
        unsafe {
            let index = self.gl.get_uniform_block_index(program, name)?;
            let size = self.gl.get_active_uniform_block_parameter_i32(
                program,
                index,
                glow::UNIFORM_BLOCK_DATA_SIZE
            );
            usize::try_from(size).ok()
        }
    }

    fn uniform_block_binding(&mut self, program: ProgramHandle, name: &str, binding: u32) -> bool {
        let Some(program) = native_program(program) else {
            return false;
        };
        unsafe {
            match self.gl.get_uniform_block_index(program, name) {
                Some(index) => {
                    self.gl.uniform_block_binding(program, index, binding);
                    true
                }
                None => false,
            }
        }
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        let location = glow::NativeUniformLocation(location.0);
        let location = Some(&location);
        unsafe {
            match value {
                UniformValue::Int(v) => self.gl.uniform_1_i32(location, v),
                UniformValue::Float(v) => self.gl.uniform_1_f32(location, v),
                UniformValue::Vec3(v) => self.gl.uniform_3_f32(location, v.x, v.y, v.z),
                UniformValue::Vec4(v) => self.gl.uniform_4_f32(location, v.x, v.y, v.z, v.w),
                UniformValue::Mat3(m) => {
                    self.gl.uniform_matrix_3_f32_slice(location, false, &m.to_cols_array())
                }
                UniformValue::Mat4(m) => {
                    self.gl.uniform_matrix_4_f32_slice(location, false, &m.to_cols_array())
                }
            }
        }
    }

    fn set_capability(&mut self, capability: Capability, enabled: bool) {
        unsafe {
            if enabled {
                self.gl.enable(capability_enum(capability));
            } else {
                self.gl.disable(capability_enum(capability));
            }
        }
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn clear(&mut self, color: [f32; 4]) {
        unsafe {
            self.gl.clear_color(color[0], color[1], color[2], color[3]);
            self.gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
    }

    fn draw_elements(&mut self, mode: DrawMode, count: usize, offset: usize) {
        unsafe {
            self.gl.draw_elements(mode_enum(mode), count as i32, glow::UNSIGNED_INT, offset as i32)
        }
    }

    fn draw_arrays(&mut self, mode: DrawMode, first: usize, count: usize) {
        unsafe { self.gl.draw_arrays(mode_enum(mode), first as i32, count as i32) }
    }
}
