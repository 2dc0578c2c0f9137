//! Uniform blocks
//!
//! A [`BlockPrint`] names a block layout and its byte size. A
//! [`UniformBlock`] instantiates a print for a program: it owns a GPU buffer
//! attached to its own binding point and a host-side staging copy of the
//! block contents. The program must report exactly the print's size for the
//! block or creation fails.

use bytemuck::Pod;
use serde::{ Deserialize, Serialize };

use crate::engine::error::BlockError;
use crate::engine::gpu::{ BufferHandle, BufferTarget, BufferUsage, GpuDevice, ProgramHandle };
use crate::engine::managers::{ BlockId, BlockPrintId, ContextId, RenderContextManager };

/// Layout schema of a uniform block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPrint {
    pub name: String,
    pub size: usize,
}

impl BlockPrint {
    pub fn new(name: &str, size: usize) -> Self {
        Self {
            name: name.to_string(),
            size,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UniformBlock {
    print: BlockPrintId,
    name: String,
    buffer: BufferHandle,
    binding: u32,
    data: Vec<u8>,
    programs: Vec<ProgramHandle>,
}

impl UniformBlock {
    pub fn print(&self) -> BlockPrintId {
        self.print
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    pub fn binding(&self) -> u32 {
        self.binding
    }

    /// Staged contents, uploaded by the next `send_data`
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Programs whose block of this name reads from this buffer
    pub fn programs(&self) -> &[ProgramHandle] {
        &self.programs
    }
}

#[derive(Debug, Default)]
pub struct UniformBlockManager {
    prints: Vec<BlockPrint>,
    blocks: Vec<UniformBlock>,
}

impl UniformBlockManager {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Prints
    // ========================================================================

    pub fn try_register_block_print(&mut self, print: BlockPrint) -> Result<BlockPrintId, BlockError> {
        if self.find_print(&print.name).is_some() {
            return Err(BlockError::DuplicatePrint(print.name));
        }
        log::info!("✅ Registered block print {} ({} bytes)", print.name, print.size);
        self.prints.push(print);
        Ok(BlockPrintId::from_index(self.prints.len() - 1))
    }

    /// Sentinel form of [`Self::try_register_block_print`]. A duplicate name
    /// is a warning and yields [`BlockPrintId::ERROR`].
    pub fn register_block_print(&mut self, print: BlockPrint) -> BlockPrintId {
        self.try_register_block_print(print).unwrap_or_else(|err| {
            log::warn!("⚠️  {}", err);
            BlockPrintId::ERROR
        })
    }

    pub fn find_print(&self, name: &str) -> Option<BlockPrintId> {
        self.prints
            .iter()
            .position(|print| print.name == name)
            .map(BlockPrintId::from_index)
    }

    pub fn print(&self, id: BlockPrintId) -> Option<&BlockPrint> {
        self.prints.get(id.index())
    }

    // ========================================================================
    // Blocks
    // ========================================================================

    /// Create a block of `print_id` for the program of `context_id`, staging
    /// `data` as its initial contents. Nothing is allocated on failure.
    pub fn try_create_block(
        &mut self,
        gpu: &mut impl GpuDevice,
        contexts: &RenderContextManager,
        print_id: BlockPrintId,
        context_id: ContextId,
        data: &[u8]
    ) -> Result<BlockId, BlockError> {
        let print = self.prints.get(print_id.index()).ok_or(BlockError::UnknownPrint(print_id))?;
        if data.is_empty() {
            return Err(BlockError::MissingData(print.name.clone()));
        }
        if data.len() != print.size {
            return Err(BlockError::DataSize {
                name: print.name.clone(),
                len: data.len(),
                declared: print.size,
            });
        }
        let program = contexts
            .program(context_id)
            .ok_or_else(|| BlockError::InvalidProgram(print.name.clone()))?;
        check_block_size(gpu, program, print)?;

        let binding = self.blocks.len() as u32;
        let limit = gpu.max_uniform_buffer_bindings();
        if binding >= limit {
            return Err(BlockError::NoFreeBinding {
                name: print.name.clone(),
                binding,
                limit,
            });
        }

        let buffer = gpu.create_buffer().map_err(BlockError::Gpu)?;
        gpu.bind_buffer(BufferTarget::Uniform, Some(buffer));
        gpu.buffer_data(BufferTarget::Uniform, data, BufferUsage::DynamicDraw);
        gpu.bind_buffer(BufferTarget::Uniform, None);
        gpu.uniform_block_binding(program, &print.name, binding);
        gpu.bind_buffer_base(BufferTarget::Uniform, binding, Some(buffer));

        let name = print.name.clone();
        self.blocks.push(UniformBlock {
            print: print_id,
            name,
            buffer,
            binding,
            data: data.to_vec(),
            programs: vec![program],
        });
        let id = BlockId::from_index(self.blocks.len() - 1);
        log::info!("✅ Created uniform block {} at binding {} as {}", self.blocks[id.index()].name, binding, id);
        Ok(id)
    }

    pub fn create_block(
        &mut self,
        gpu: &mut impl GpuDevice,
        contexts: &RenderContextManager,
        print_id: BlockPrintId,
        context_id: ContextId,
        data: &[u8]
    ) -> BlockId {
        self.try_create_block(gpu, contexts, print_id, context_id, data).unwrap_or_else(|err| {
            log::error!("❌ {}", err);
            BlockId::ERROR
        })
    }

    /// Route the same block of another context's program to this block's
    /// buffer. The size contract applies to every attached program.
    pub fn attach_block(
        &mut self,
        gpu: &mut impl GpuDevice,
        contexts: &RenderContextManager,
        block_id: BlockId,
        context_id: ContextId
    ) -> Result<(), BlockError> {
        let block = self.blocks.get_mut(block_id.index()).ok_or(BlockError::UnknownBlock(block_id))?;
        let print = self.prints.get(block.print.index()).ok_or(BlockError::UnknownPrint(block.print))?;
        let program = contexts
            .program(context_id)
            .ok_or_else(|| BlockError::InvalidProgram(block.name.clone()))?;
        check_block_size(gpu, program, print)?;

        gpu.uniform_block_binding(program, &block.name, block.binding);
        if !block.programs.contains(&program) {
            block.programs.push(program);
        }
        Ok(())
    }

    /// Overwrite part of the staged contents
    pub fn write(&mut self, id: BlockId, offset: usize, bytes: &[u8]) -> Result<(), BlockError> {
        let block = self.blocks.get_mut(id.index()).ok_or(BlockError::UnknownBlock(id))?;
        let end = offset.checked_add(bytes.len());
        match end.and_then(|end| block.data.get_mut(offset..end)) {
            Some(range) => {
                range.copy_from_slice(bytes);
                Ok(())
            }
            None =>
                Err(BlockError::OutOfBounds {
                    name: block.name.clone(),
                    offset,
                    len: bytes.len(),
                }),
        }
    }

    /// Replace the staged contents with a value laid out like the block
    pub fn write_pod<T: Pod>(&mut self, id: BlockId, value: &T) -> Result<(), BlockError> {
        let bytes = bytemuck::bytes_of(value);
        let block = self.blocks.get_mut(id.index()).ok_or(BlockError::UnknownBlock(id))?;
        if bytes.len() != block.data.len() {
            return Err(BlockError::DataSize {
                name: block.name.clone(),
                len: bytes.len(),
                declared: block.data.len(),
            });
        }
        block.data.copy_from_slice(bytes);
        Ok(())
    }

    /// Upload the staged contents. Always copies the whole block.
    pub fn try_send_data(&self, gpu: &mut impl GpuDevice, id: BlockId) -> Result<(), BlockError> {
        let block = self.blocks.get(id.index()).ok_or(BlockError::UnknownBlock(id))?;
        gpu.bind_buffer(BufferTarget::Uniform, Some(block.buffer));
        gpu.buffer_sub_data(BufferTarget::Uniform, 0, &block.data);
        gpu.bind_buffer(BufferTarget::Uniform, None);
        Ok(())
    }

    pub fn send_data(&self, gpu: &mut impl GpuDevice, id: BlockId) -> bool {
        match self.try_send_data(gpu, id) {
            Ok(()) => true,
            Err(err) => {
                log::error!("❌ {}", err);
                false
            }
        }
    }

    pub fn block(&self, id: BlockId) -> Option<&UniformBlock> {
        self.blocks.get(id.index())
    }

    pub fn find_block(&self, name: &str) -> Option<BlockId> {
        self.blocks
            .iter()
            .position(|block| block.name == name)
            .map(BlockId::from_index)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn print_count(&self) -> usize {
        self.prints.len()
    }

    /// Delete every block buffer and forget all prints
    pub fn unload_all(&mut self, gpu: &mut impl GpuDevice) {
        for block in self.blocks.drain(..) {
            gpu.bind_buffer_base(BufferTarget::Uniform, block.binding, None);
            gpu.delete_buffer(block.buffer);
        }
        self.prints.clear();
    }
}

fn check_block_size(
    gpu: &impl GpuDevice,
    program: ProgramHandle,
    print: &BlockPrint
) -> Result<(), BlockError> {
    match gpu.uniform_block_size(program, &print.name) {
        None => Err(BlockError::NotInProgram(print.name.clone())),
        Some(size) if size != print.size =>
            Err(BlockError::SizeMismatch {
                name: print.name.clone(),
                declared: print.size,
                introspected: size,
            }),
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_print_names_are_rejected() {
        let mut blocks = UniformBlockManager::new();
        let first = blocks.register_block_print(BlockPrint::new("LightBlock", 64));
        let second = blocks.register_block_print(BlockPrint::new("LightBlock", 128));

        assert_eq!(first, BlockPrintId(0));
        assert!(second.is_error());
        assert_eq!(blocks.print(first).map(|print| print.size), Some(64));
        assert_eq!(blocks.print_count(), 1);
    }

    #[test]
    fn unknown_block_send_is_reported() {
        let blocks = UniformBlockManager::new();
        let mut gpu = crate::engine::gpu::HeadlessDevice::new();
        assert!(!blocks.send_data(&mut gpu, BlockId::ERROR));
        assert_eq!(gpu.stats().buffer_uploads, 0);
    }
}
