//! External texture allocation and sampler binding.
//!
//! A sampler uniform names a texture unit; a texture is bound to that unit.
//! [`TextureBinder::bind_sampler`] does both for one sampler of the current
//! program: it activates unit `n`, binds the texture to the unit under its
//! target, and writes `n` into the sampler uniform.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::driver::{check_error, GlDriver, ParameterValue, TextureParameter, TextureTarget};
use crate::error::{DriverError, RenderError};

/// Number of texture units a sampler slot may address (`0..MAX_SAMPLER_SLOTS`).
pub const MAX_SAMPLER_SLOTS: u32 = 10;

/// Index of a sampler within a draw call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SamplerSlot(u32);

impl SamplerSlot {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }

    /// Whether the slot addresses one of the supported texture units.
    pub fn is_supported(self) -> bool {
        self.0 < MAX_SAMPLER_SLOTS
    }
}

impl From<u32> for SamplerSlot {
    fn from(index: u32) -> Self {
        Self(index)
    }
}

/// What to do with a slot outside `0..MAX_SAMPLER_SLOTS`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotPolicy {
    /// Bind to unit 0 and log a warning. Matches the behaviour existing
    /// pipelines rely on.
    #[default]
    FallbackToUnitZero,
    /// Fail with [`RenderError::SlotOutOfRange`] without touching the driver.
    Reject,
}

impl SlotPolicy {
    /// Resolves `slot` to the texture unit index to use.
    ///
    /// # Errors
    ///
    /// `RenderError::SlotOutOfRange` for an unsupported slot under `Reject`.
    pub fn resolve(self, slot: SamplerSlot) -> Result<u32, RenderError> {
        if slot.is_supported() {
            return Ok(slot.index());
        }
        match self {
            SlotPolicy::FallbackToUnitZero => {
                warn!(
                    slot = slot.index(),
                    max = MAX_SAMPLER_SLOTS,
                    "sampler slot out of range; binding texture unit 0"
                );
                Ok(0)
            }
            SlotPolicy::Reject => Err(RenderError::SlotOutOfRange {
                slot: slot.index(),
                max: MAX_SAMPLER_SLOTS,
            }),
        }
    }
}

/// Allocates a texture for an external image producer.
///
/// The texture is bound as `External` with linear min/mag filtering and
/// clamp-to-edge wrapping on both axes. It stays bound on return. The
/// driver error state is checked after creation, binding and parameter
/// setup.
///
/// # Errors
///
/// `RenderError::Allocation` if the driver refuses to create the texture,
/// `RenderError::Driver` (fatal) if any step leaves an error pending.
pub fn create_external_texture<G: GlDriver>(gl: &G) -> Result<G::Texture, RenderError> {
    let texture = gl.create_texture().map_err(|reason| RenderError::Allocation {
        object: "texture",
        reason,
    })?;

    if let Err(e) = configure_external(gl, texture) {
        gl.delete_texture(texture);
        return Err(e.into());
    }

    debug!(?texture, "created external texture");
    Ok(texture)
}

fn configure_external<G: GlDriver>(gl: &G, texture: G::Texture) -> Result<(), DriverError> {
    let target = TextureTarget::External;
    check_error(gl, "glGenTextures")?;

    gl.bind_texture(target, Some(texture));
    check_error(gl, format!("glBindTexture {texture:?}"))?;

    gl.tex_parameter(target, TextureParameter::MinFilter, ParameterValue::Linear);
    gl.tex_parameter(target, TextureParameter::MagFilter, ParameterValue::Linear);
    gl.tex_parameter(target, TextureParameter::WrapS, ParameterValue::ClampToEdge);
    gl.tex_parameter(target, TextureParameter::WrapT, ParameterValue::ClampToEdge);
    check_error(gl, "glTexParameter")
}

/// Binds textures to sampler uniforms of the active program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextureBinder {
    policy: SlotPolicy,
}

impl TextureBinder {
    pub fn new(policy: SlotPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> SlotPolicy {
        self.policy
    }

    /// Binds `texture` to the unit for `slot` and points the sampler uniform
    /// at `location` to that unit. Returns the unit index used.
    ///
    /// The program owning `location` must already be in use, and must stay in
    /// use until the draw call; the uniform write applies to the current
    /// program only. Call once per sampler per draw.
    ///
    /// # Errors
    ///
    /// `RenderError::SlotOutOfRange` if the slot is unsupported and the
    /// policy is [`SlotPolicy::Reject`].
    pub fn bind_sampler<G: GlDriver>(
        &self,
        gl: &G,
        slot: SamplerSlot,
        location: Option<&G::UniformLocation>,
        texture: G::Texture,
        target: TextureTarget,
    ) -> Result<u32, RenderError> {
        let unit = self.policy.resolve(slot)?;

        gl.active_texture(unit);
        gl.bind_texture(target, Some(texture));
        gl.uniform_1_i32(location, unit as i32);

        Ok(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{GlCall, RecordingDriver};

    fn bind(
        binder: TextureBinder,
        slot: u32,
        external: bool,
    ) -> (Result<u32, RenderError>, Vec<GlCall>) {
        let gl = RecordingDriver::new();
        let result = binder.bind_sampler(
            &gl,
            SamplerSlot::new(slot),
            Some(&7),
            42,
            TextureTarget::for_external(external),
        );
        (result, gl.calls())
    }

    // --- create_external_texture ---

    #[test]
    fn external_texture_gets_linear_clamped_sampling() {
        let gl = RecordingDriver::new();
        let texture = create_external_texture(&gl).unwrap();
        let target = TextureTarget::External;

        assert!(texture > 0);
        assert_eq!(
            gl.calls(),
            vec![
                GlCall::CreateTexture { texture },
                GlCall::BindTexture {
                    target,
                    texture: Some(texture)
                },
                GlCall::TexParameter {
                    target,
                    parameter: TextureParameter::MinFilter,
                    value: ParameterValue::Linear
                },
                GlCall::TexParameter {
                    target,
                    parameter: TextureParameter::MagFilter,
                    value: ParameterValue::Linear
                },
                GlCall::TexParameter {
                    target,
                    parameter: TextureParameter::WrapS,
                    value: ParameterValue::ClampToEdge
                },
                GlCall::TexParameter {
                    target,
                    parameter: TextureParameter::WrapT,
                    value: ParameterValue::ClampToEdge
                },
            ]
        );
    }

    #[test]
    fn pending_driver_error_is_fatal() {
        let gl = RecordingDriver::new();
        gl.raise_error(0x0500);
        let err = create_external_texture(&gl).unwrap_err();

        assert!(err.is_fatal());
        assert!(
            err.to_string().contains("glGenTextures: glError 0x500"),
            "got: {err}"
        );
        assert_eq!(gl.live_textures(), 0, "texture leaked on the fatal path");
    }

    #[test]
    fn refused_texture_allocation_is_reported() {
        let gl = RecordingDriver::new().with_texture_allocation_failure();
        let err = create_external_texture(&gl).unwrap_err();
        assert!(matches!(err, RenderError::Allocation { object: "texture", .. }));
        assert!(gl.calls().is_empty());
    }

    // --- SamplerSlot / SlotPolicy ---

    #[test]
    fn slots_zero_through_nine_are_supported() {
        assert!((0..10).all(|i| SamplerSlot::new(i).is_supported()));
        assert!(!SamplerSlot::new(10).is_supported());
    }

    #[test]
    fn reject_policy_refuses_out_of_range_slot() {
        let err = SlotPolicy::Reject.resolve(SamplerSlot::new(10)).unwrap_err();
        assert!(matches!(err, RenderError::SlotOutOfRange { slot: 10, max: 10 }));
    }

    #[test]
    fn slot_policy_deserializes_from_snake_case() {
        let policy: SlotPolicy = serde_json::from_str("\"reject\"").unwrap();
        assert_eq!(policy, SlotPolicy::Reject);
        let policy: SlotPolicy = serde_json::from_str("\"fallback_to_unit_zero\"").unwrap();
        assert_eq!(policy, SlotPolicy::FallbackToUnitZero);
    }

    // --- bind_sampler ---

    #[test]
    fn bind_sampler_activates_binds_then_writes_uniform() {
        let (unit, calls) = bind(TextureBinder::default(), 3, true);
        assert_eq!(unit.unwrap(), 3);
        assert_eq!(
            calls,
            vec![
                GlCall::ActiveTexture { unit: 3 },
                GlCall::BindTexture {
                    target: TextureTarget::External,
                    texture: Some(42)
                },
                GlCall::Uniform1i {
                    location: Some(7),
                    value: 3
                },
            ]
        );
    }

    #[test]
    fn bind_sampler_uses_planar_target_for_non_external() {
        let (_, calls) = bind(TextureBinder::default(), 0, false);
        assert!(calls.contains(&GlCall::BindTexture {
            target: TextureTarget::Planar2D,
            texture: Some(42)
        }));
    }

    #[test]
    fn out_of_range_slot_falls_back_to_unit_zero() {
        let (unit, calls) = bind(TextureBinder::default(), 10, true);
        assert_eq!(unit.unwrap(), 0);
        assert_eq!(calls[0], GlCall::ActiveTexture { unit: 0 });
        assert_eq!(
            calls[2],
            GlCall::Uniform1i {
                location: Some(7),
                value: 0
            }
        );
    }

    #[test]
    fn rejected_slot_issues_no_driver_calls() {
        let (unit, calls) = bind(TextureBinder::new(SlotPolicy::Reject), 11, false);
        assert!(unit.is_err());
        assert!(calls.is_empty());
    }

    #[test]
    fn missing_uniform_location_still_binds_texture() {
        let gl = RecordingDriver::new();
        TextureBinder::default()
            .bind_sampler(&gl, SamplerSlot::new(1), None, 5, TextureTarget::Planar2D)
            .unwrap();
        assert_eq!(
            gl.calls()[2],
            GlCall::Uniform1i {
                location: None,
                value: 1
            }
        );
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn supported_slot_binds_matching_unit(slot in 0u32..MAX_SAMPLER_SLOTS, external in any::<bool>()) {
                let (unit, calls) = bind(TextureBinder::default(), slot, external);
                prop_assert_eq!(unit.unwrap(), slot);
                prop_assert_eq!(&calls[0], &GlCall::ActiveTexture { unit: slot });
                prop_assert_eq!(
                    &calls[1],
                    &GlCall::BindTexture {
                        target: TextureTarget::for_external(external),
                        texture: Some(42)
                    }
                );
                prop_assert_eq!(
                    &calls[2],
                    &GlCall::Uniform1i { location: Some(7), value: slot as i32 }
                );
            }

            #[test]
            fn unsupported_slot_always_resolves_to_unit_zero(slot in MAX_SAMPLER_SLOTS..u32::MAX) {
                let (unit, calls) = bind(TextureBinder::default(), slot, true);
                prop_assert_eq!(unit.unwrap(), 0);
                prop_assert_eq!(&calls[0], &GlCall::ActiveTexture { unit: 0 });
                prop_assert_eq!(
                    &calls[2],
                    &GlCall::Uniform1i { location: Some(7), value: 0 }
                );
            }
        }
    }
}
