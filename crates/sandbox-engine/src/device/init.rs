use super::SurfaceConfig;

/// Initialization parameters for the GPU layer.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct GpuInit {
    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Present mode (swap behavior).
    ///
    /// FIFO is broadly supported and generally appropriate for UI workloads.
    pub present_mode: wgpu::PresentMode,

    /// Optional alpha mode preference for the surface.
    ///
    /// If provided but unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,

    /// Desired maximum frame latency for the surface (a hint).
    pub desired_maximum_frame_latency: u32,
}

impl GpuInit {
    /// Derives the compositing mode from the scene's background mode.
    ///
    /// A background with any transparency only shows through when the
    /// compositor blends the surface, so premultiplied alpha is requested in
    /// that case.
    pub fn for_surface(mut self, config: &SurfaceConfig) -> Self {
        if self.alpha_mode.is_none() && !config.background.clear_color().is_opaque() {
            self.alpha_mode = Some(wgpu::CompositeAlphaMode::PreMultiplied);
        }
        self
    }
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::BackgroundMode;
    use crate::paint::Color;

    fn with_background(background: BackgroundMode) -> GpuInit {
        GpuInit::default().for_surface(&SurfaceConfig { background, antialias: true })
    }

    #[test]
    fn opaque_background_keeps_the_default_alpha_mode() {
        let init = with_background(BackgroundMode::Opaque(Color::from_rgb_hex(0x000000)));
        assert_eq!(init.alpha_mode, None);
    }

    #[test]
    fn see_through_backgrounds_request_premultiplied_compositing() {
        let translucent = Color::from_srgb_u8(0, 0, 0, 0x80);
        for background in [BackgroundMode::Transparent, BackgroundMode::Opaque(translucent)] {
            assert_eq!(
                with_background(background).alpha_mode,
                Some(wgpu::CompositeAlphaMode::PreMultiplied),
                "{background:?}"
            );
        }
    }

    #[test]
    fn explicit_alpha_mode_wins() {
        let init = GpuInit { alpha_mode: Some(wgpu::CompositeAlphaMode::Opaque), ..GpuInit::default() }
            .for_surface(&SurfaceConfig { background: BackgroundMode::Transparent, antialias: true });
        assert_eq!(init.alpha_mode, Some(wgpu::CompositeAlphaMode::Opaque));
    }
}
