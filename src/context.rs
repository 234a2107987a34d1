//! GPU context bootstrap and pixel-format capability negotiation.

use crate::error::FluidError;

/// Negotiated texture formats for the three field classes. The chain walks
/// toward wider half-float formats per class and, when half-float render
/// targets are unusable altogether, lands every class on plain 8-bit RGBA.
/// Negotiation is deterministic and never leaves a format unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatChain {
    /// Dye and anything else carrying full color.
    pub rgba: wgpu::TextureFormat,
    /// The two-component velocity field.
    pub rg: wgpu::TextureFormat,
    /// Scalar fields: pressure, divergence, curl.
    pub r: wgpu::TextureFormat,
}

impl FormatChain {
    fn negotiate(adapter: &wgpu::Adapter) -> Self {
        use wgpu::TextureFormat::{R16Float, Rg16Float, Rgba8Unorm, Rgba16Float};

        if !target_usable(adapter, Rgba16Float) {
            log::warn!("half-float render targets unsupported, falling back to rgba8");
            return Self {
                rgba: Rgba8Unorm,
                rg: Rgba8Unorm,
                r: Rgba8Unorm,
            };
        }

        let pick = |candidates: &[wgpu::TextureFormat]| {
            candidates
                .iter()
                .copied()
                .find(|format| target_usable(adapter, *format))
                .unwrap_or(Rgba16Float)
        };

        Self {
            rgba: Rgba16Float,
            rg: pick(&[Rg16Float, Rgba16Float]),
            r: pick(&[R16Float, Rg16Float, Rgba16Float]),
        }
    }
}

/// Render-target completeness probe: the format must be both renderable
/// and samplable to participate in the ping-pong pass chain.
fn target_usable(adapter: &wgpu::Adapter, format: wgpu::TextureFormat) -> bool {
    let features = adapter.get_texture_format_features(format);
    features
        .allowed_usages
        .contains(wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING)
}

fn filterable(adapter: &wgpu::Adapter, format: wgpu::TextureFormat) -> bool {
    adapter
        .get_texture_format_features(format)
        .flags
        .contains(wgpu::TextureFormatFeatureFlags::FILTERABLE)
}

/// Owned GPU context: device, queue, and the negotiated capabilities every
/// pipeline call reads from.
pub struct GpuContext {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub formats: FormatChain,
    /// Whether the chosen field format supports linear sampling. When it
    /// does not, samplers fall back to nearest and the advection shader
    /// switches to manual in-shader bilinear filtering.
    pub linear_filtering: bool,
}

impl GpuContext {
    pub async fn new(
        instance: &wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<Self, FluidError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| FluidError::ContextCreation("no compatible GPU adapter".into()))?;

        let info = adapter.get_info();
        log::info!("using adapter '{}' ({:?})", info.name, info.backend);

        // Optional features only: the effect must come up on the plainest
        // device the adapter offers.
        let mut features = wgpu::Features::empty();
        for wanted in [
            wgpu::Features::TEXTURE_ADAPTER_SPECIFIC_FORMAT_FEATURES,
            wgpu::Features::FLOAT32_FILTERABLE,
        ] {
            if adapter.features().contains(wanted) {
                features |= wanted;
            }
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Splash Device"),
                    required_features: features,
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .map_err(|e| FluidError::ContextCreation(e.to_string()))?;

        let formats = FormatChain::negotiate(&adapter);
        let linear_filtering = filterable(&adapter, formats.rgba);
        if !linear_filtering {
            log::warn!(
                "linear filtering unavailable for {:?}; advection switches to manual bilinear",
                formats.rgba
            );
        }

        Ok(Self {
            adapter,
            device,
            queue,
            formats,
            linear_filtering,
        })
    }
}
