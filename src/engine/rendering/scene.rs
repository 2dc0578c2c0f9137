use glam::{ EulerRot, Mat3, Mat4, Quat, Vec3 };
use serde::{ Deserialize, Serialize };

use super::lighting::LightingSystem;
use crate::engine::managers::MeshIndex;

/// Position, rotation (Euler angles in radians, applied yaw, pitch, roll) and
/// scale. The matrix is composed as T * R * S.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn rotation_quat(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.rotation.y, self.rotation.x, self.rotation.z)
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation_quat(), self.position)
    }

    /// Inverse-transpose of the upper 3x3, for transforming normals
    pub fn normal_matrix(&self) -> Mat3 {
        Mat3::from_mat4(self.matrix()).inverse().transpose()
    }
}

/// Perspective camera looking along its yaw/pitch direction. With both at
/// zero it looks down -z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Camera {
    pub position: Vec3,
    /// Degrees
    pub pitch: f32,
    /// Degrees
    pub yaw: f32,
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            pitch: 0.0,
            yaw: 0.0,
            fov: 60.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Camera {
    pub fn forward(&self) -> Vec3 {
        let (pitch, yaw) = (self.pitch.to_radians(), self.yaw.to_radians());
        Vec3::new(yaw.sin() * pitch.cos(), pitch.sin(), -yaw.cos() * pitch.cos())
    }

    pub fn add_rotation_delta(&mut self, pitch_delta: f32, yaw_delta: f32) {
        self.yaw += yaw_delta;
        // keep away from straight up/down where the view basis degenerates
        self.pitch = (self.pitch + pitch_delta).clamp(-89.0, 89.0);
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect_ratio: f32) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov.to_radians(), aspect_ratio, self.near, self.far)
    }
}

/// Surface parameters for the lighting techniques
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
    /// Technique overriding the frame's default, e.g. "Debug"
    pub technique: Option<String>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse: Vec3::splat(0.8),
            specular: Vec3::splat(0.5),
            shininess: 32.0,
            technique: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    Mesh(MeshIndex),
    Material(Material),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneObject {
    pub name: String,
    pub transform: Transform,
    components: Vec<Component>,
}

impl SceneObject {
    pub fn new(name: &str, transform: Transform) -> Self {
        Self {
            name: name.to_string(),
            transform,
            components: Vec::new(),
        }
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.add_component(component);
        self
    }

    /// Add a component, replacing one of the same kind
    pub fn add_component(&mut self, component: Component) {
        let same_kind = |existing: &Component| {
            std::mem::discriminant(existing) == std::mem::discriminant(&component)
        };
        match self.components.iter().position(same_kind) {
            Some(slot) => {
                self.components[slot] = component;
            }
            None => self.components.push(component),
        }
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn mesh(&self) -> Option<MeshIndex> {
        self.components.iter().find_map(|component| match component {
            Component::Mesh(index) => Some(*index),
            _ => None,
        })
    }

    pub fn material(&self) -> Option<&Material> {
        self.components.iter().find_map(|component| match component {
            Component::Material(material) => Some(material),
            _ => None,
        })
    }

    pub fn material_mut(&mut self) -> Option<&mut Material> {
        self.components.iter_mut().find_map(|component| match component {
            Component::Material(material) => Some(material),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub name: String,
    pub objects: Vec<SceneObject>,
    pub camera: Camera,
    pub lighting: LightingSystem,
    pub skybox: Option<MeshIndex>,
}

impl Scene {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn add_object(&mut self, object: SceneObject) -> usize {
        self.objects.push(object);
        self.objects.len() - 1
    }

    pub fn find_object(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|object| object.name == name)
    }
}
