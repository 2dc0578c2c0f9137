//! Point lights and their uniform block layout

use bytemuck::{ Pod, Zeroable };
use glam::Vec3;
use serde::{ Deserialize, Serialize };

pub const MAX_LIGHTS: usize = 8;

/// Byte size of the `LightBlock` uniform block (std140)
pub const LIGHT_BLOCK_SIZE: usize = std::mem::size_of::<LightBlockData>();

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Light {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    /// Constant, linear and quadratic falloff terms
    pub attenuation: Vec3,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            color: Vec3::ONE,
            intensity: 1.0,
            attenuation: Vec3::new(1.0, 0.09, 0.032),
        }
    }
}

impl Light {
    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self {
            position,
            color,
            ..Self::default()
        }
    }
}

/// One light as the shaders see it. `w` components carry the intensity.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct GpuLight {
    pub position: [f32; 4],
    pub color: [f32; 4],
    pub attenuation: [f32; 4],
}

impl From<&Light> for GpuLight {
    fn from(light: &Light) -> Self {
        Self {
            position: light.position.extend(1.0).to_array(),
            color: light.color.extend(light.intensity).to_array(),
            attenuation: light.attenuation.extend(0.0).to_array(),
        }
    }
}

/// Contents of the `LightBlock` uniform block. Occupied slots are packed to
/// the front; `count` says how many are valid.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct LightBlockData {
    pub lights: [GpuLight; MAX_LIGHTS],
    pub count: u32,
    pub _pad: [u32; 3],
}

/// Fixed set of light slots
#[derive(Debug, Clone, Default)]
pub struct LightingSystem {
    slots: [Option<Light>; MAX_LIGHTS],
}

impl LightingSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a light in the first free slot. Returns the slot, or `None` when
    /// all slots are taken.
    pub fn add_light(&mut self, light: Light) -> Option<usize> {
        let Some(slot) = self.first_free_slot() else {
            log::warn!("⚠️  All {} light slots are in use, light dropped", MAX_LIGHTS);
            return None;
        };
        self.slots[slot] = Some(light);
        Some(slot)
    }

    pub fn remove_light(&mut self, slot: usize) -> Option<Light> {
        self.slots.get_mut(slot).and_then(Option::take)
    }

    pub fn light(&self, slot: usize) -> Option<&Light> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn light_mut(&mut self, slot: usize) -> Option<&mut Light> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    pub fn first_free_slot(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    /// Number of occupied slots
    pub fn active_light_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn lights(&self) -> impl Iterator<Item = &Light> {
        self.slots.iter().flatten()
    }

    pub fn clear(&mut self) {
        self.slots = Default::default();
    }

    pub fn block_data(&self) -> LightBlockData {
        let mut data = LightBlockData::default();
        for (target, light) in data.lights.iter_mut().zip(self.lights()) {
            *target = GpuLight::from(light);
        }
        data.count = self.active_light_count() as u32;
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_matches_std140_size() {
        assert_eq!(std::mem::size_of::<GpuLight>(), 48);
        assert_eq!(LIGHT_BLOCK_SIZE, 400);
    }

    #[test]
    fn active_count_is_occupied_slots() {
        let mut lighting = LightingSystem::new();
        assert_eq!(lighting.active_light_count(), 0);

        lighting.add_light(Light::default());
        lighting.add_light(Light::default());
        lighting.add_light(Light::default());
        lighting.remove_light(1);

        assert_eq!(lighting.active_light_count(), 2);
        assert_eq!(lighting.first_free_slot(), Some(1));
    }

    #[test]
    fn full_system_rejects_lights() {
        let mut lighting = LightingSystem::new();
        for _ in 0..MAX_LIGHTS {
            assert!(lighting.add_light(Light::default()).is_some());
        }
        assert_eq!(lighting.add_light(Light::default()), None);
        assert_eq!(lighting.first_free_slot(), None);
    }

    #[test]
    fn block_data_packs_occupied_slots() {
        let mut lighting = LightingSystem::new();
        lighting.add_light(Light::new(Vec3::X, Vec3::ONE));
        lighting.add_light(Light::new(Vec3::Y, Vec3::ONE));
        lighting.add_light(Light::new(Vec3::Z, Vec3::new(1.0, 0.5, 0.0)));
        lighting.remove_light(1);

        let data = lighting.block_data();
        assert_eq!(data.count, 2);
        assert_eq!(data.lights[0].position, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(data.lights[1].position, [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(data.lights[1].color, [1.0, 0.5, 0.0, 1.0]);
        assert_eq!(data.lights[2], GpuLight::default());
    }
}
