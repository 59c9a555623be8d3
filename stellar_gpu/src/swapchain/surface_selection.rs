/// Surface parameter selection
///
/// Pure functions choosing format, present mode, extent, image count and
/// sharing mode from what the surface reports.

use crate::graphics_device::{
    Extent2D, PresentMode, QueueFamilyIndices, SharingMode, SurfaceCapabilities, SurfaceFormat,
};

/// Preferred format when offered, otherwise the first one offered.
/// `None` only when the surface offers nothing.
pub fn choose_surface_format(
    available: &[SurfaceFormat],
    preferred: SurfaceFormat,
) -> Option<SurfaceFormat> {
    available
        .iter()
        .copied()
        .find(|f| *f == preferred)
        .or_else(|| available.first().copied())
}

/// Preferred mode when offered, otherwise FIFO (always supported)
pub fn choose_present_mode(available: &[PresentMode], preferred: PresentMode) -> PresentMode {
    if available.contains(&preferred) {
        preferred
    } else {
        PresentMode::Fifo
    }
}

/// Surface-dictated extent, or the framebuffer extent clamped to the
/// surface limits when the surface leaves the choice to the application
pub fn choose_extent(capabilities: &SurfaceCapabilities, framebuffer: Extent2D) -> Extent2D {
    if capabilities.current_extent.width != Extent2D::UNDEFINED_SENTINEL {
        return capabilities.current_extent;
    }
    Extent2D {
        width: framebuffer.width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: framebuffer.height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// One more than the minimum, capped by the maximum (0 = no maximum)
pub fn compute_image_count(capabilities: &SurfaceCapabilities) -> u32 {
    let desired = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        desired.min(capabilities.max_image_count)
    } else {
        desired
    }
}

/// Exclusive when one family does both jobs, concurrent over both otherwise
pub fn choose_sharing_mode(families: QueueFamilyIndices) -> SharingMode {
    if families.graphics == families.present {
        SharingMode::Exclusive
    } else {
        SharingMode::Concurrent(vec![families.graphics, families.present])
    }
}

#[cfg(test)]
#[path = "surface_selection_tests.rs"]
mod tests;
