use super::GpuDevice;

/// Fixed-function switches the renderer toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    DepthTest,
    CullFace,
    Blend,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::DepthTest => "DEPTH_TEST",
            Capability::CullFace => "CULL_FACE",
            Capability::Blend => "BLEND",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of the tracked switches, used to restore state after a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilitySnapshot {
    pub depth_test_enabled: bool,
    pub cull_face_enabled: bool,
    pub blend_enabled: bool,
}

/// Shadow copy of the driver's capability switches.
///
/// The driver is only called when a switch actually changes. The explicit
/// `enable`/`disable` calls treat a redundant transition as a caller mistake
/// and warn; `set` is the silent form used by per-frame setup.
#[derive(Debug, Default)]
pub struct CapabilityState {
    current: CapabilitySnapshot,
}

impl CapabilityState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self, capability: Capability) -> bool {
        match capability {
            Capability::DepthTest => self.current.depth_test_enabled,
            Capability::CullFace => self.current.cull_face_enabled,
            Capability::Blend => self.current.blend_enabled,
        }
    }

    pub fn enable(&mut self, gpu: &mut impl GpuDevice, capability: Capability) {
        if self.is_enabled(capability) {
            log::warn!("⚠️  {} is already enabled", capability);
            return;
        }
        self.apply(gpu, capability, true);
    }

    pub fn disable(&mut self, gpu: &mut impl GpuDevice, capability: Capability) {
        if !self.is_enabled(capability) {
            log::warn!("⚠️  {} is already disabled", capability);
            return;
        }
        self.apply(gpu, capability, false);
    }

    pub fn set(&mut self, gpu: &mut impl GpuDevice, capability: Capability, enabled: bool) {
        if self.is_enabled(capability) != enabled {
            self.apply(gpu, capability, enabled);
        }
    }

    pub fn snapshot(&self) -> CapabilitySnapshot {
        self.current
    }

    pub fn restore(&mut self, gpu: &mut impl GpuDevice, snapshot: CapabilitySnapshot) {
        self.set(gpu, Capability::DepthTest, snapshot.depth_test_enabled);
        self.set(gpu, Capability::CullFace, snapshot.cull_face_enabled);
        self.set(gpu, Capability::Blend, snapshot.blend_enabled);
    }

    fn apply(&mut self, gpu: &mut impl GpuDevice, capability: Capability, enabled: bool) {
        gpu.set_capability(capability, enabled);
        match capability {
            Capability::DepthTest => {
                self.current.depth_test_enabled = enabled;
            }
            Capability::CullFace => {
                self.current.cull_face_enabled = enabled;
            }
            Capability::Blend => {
                self.current.blend_enabled = enabled;
            }
        }
    }
}
