use crate::engine::error::ShaderError;
use crate::engine::gpu::{ GpuDevice, ShaderHandle, ShaderStage };
use crate::engine::managers::ShaderId;

#[derive(Debug, Clone)]
struct ShaderEntry {
    name: String,
    stage: ShaderStage,
    source: String,
    handle: ShaderHandle,
}

/// Compiled shader stages, deduplicated by name. Sources are kept so a stage
/// can be inspected or recompiled later.
#[derive(Debug, Default)]
pub struct ShaderManager {
    shaders: Vec<ShaderEntry>,
}

impl ShaderManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `source` under `name`, or return the id of the stage already
    /// compiled under that name
    pub fn try_load_shader(
        &mut self,
        gpu: &mut impl GpuDevice,
        name: &str,
        stage: ShaderStage,
        source: &str
    ) -> Result<ShaderId, ShaderError> {
        if let Some(id) = self.find(name) {
            log::debug!("Shader {} already compiled as {}", name, id);
            return Ok(id);
        }

        let handle = compile(gpu, name, stage, source)?;
        self.shaders.push(ShaderEntry {
            name: name.to_string(),
            stage,
            source: source.to_string(),
            handle,
        });
        let id = ShaderId::from_index(self.shaders.len() - 1);
        log::info!("✅ Compiled {:?} shader {} as {}", stage, name, id);
        Ok(id)
    }

    pub fn load_shader(
        &mut self,
        gpu: &mut impl GpuDevice,
        name: &str,
        stage: ShaderStage,
        source: &str
    ) -> ShaderId {
        self.try_load_shader(gpu, name, stage, source).unwrap_or_else(|err| {
            log::error!("❌ {}", err);
            ShaderId::ERROR
        })
    }

    /// Recompile a stage from new source. The previous stage survives a
    /// failed compile.
    pub fn reload_shader(
        &mut self,
        gpu: &mut impl GpuDevice,
        id: ShaderId,
        source: &str
    ) -> Result<ShaderHandle, ShaderError> {
        let entry = self.shaders.get_mut(id.index()).ok_or(ShaderError::UnknownShader(id))?;
        let handle = compile(gpu, &entry.name, entry.stage, source)?;
        gpu.delete_shader(entry.handle);
        entry.handle = handle;
        entry.source = source.to_string();
        log::info!("🔄 Reloaded shader {}", entry.name);
        Ok(handle)
    }

    pub fn find(&self, name: &str) -> Option<ShaderId> {
        self.shaders
            .iter()
            .position(|entry| entry.name == name)
            .map(ShaderId::from_index)
    }

    pub fn handle(&self, id: ShaderId) -> Option<ShaderHandle> {
        self.shaders.get(id.index()).map(|entry| entry.handle)
    }

    pub fn name(&self, id: ShaderId) -> Option<&str> {
        self.shaders.get(id.index()).map(|entry| entry.name.as_str())
    }

    pub fn source(&self, id: ShaderId) -> Option<&str> {
        self.shaders.get(id.index()).map(|entry| entry.source.as_str())
    }

    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }

    pub fn unload_all(&mut self, gpu: &mut impl GpuDevice) {
        for entry in self.shaders.drain(..) {
            gpu.delete_shader(entry.handle);
        }
    }
}

fn compile(
    gpu: &mut impl GpuDevice,
    name: &str,
    stage: ShaderStage,
    source: &str
) -> Result<ShaderHandle, ShaderError> {
    gpu.compile_shader(stage, source).map_err(|log| ShaderError::Compile {
        name: name.to_string(),
        log,
    })
}
