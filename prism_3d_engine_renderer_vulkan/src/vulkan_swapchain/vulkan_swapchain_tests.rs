use super::*;

// ============================================================================
// SURFACE FORMAT SELECTION
// ============================================================================

#[test]
fn test_surface_format_prefers_bgra_srgb() {
    let formats = [
        vk::SurfaceFormatKHR {
            format: vk::Format::R8G8B8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        },
        vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        },
    ];
    let selected = select_surface_format(&formats);
    assert_eq!(selected.format, vk::Format::B8G8R8A8_UNORM);
    assert_eq!(selected.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
}

#[test]
fn test_surface_format_falls_back_to_first() {
    let formats = [
        vk::SurfaceFormatKHR {
            format: vk::Format::R8G8B8A8_SRGB,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        },
        vk::SurfaceFormatKHR {
            format: vk::Format::R8G8B8A8_UNORM,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        },
    ];
    assert_eq!(select_surface_format(&formats).format, vk::Format::R8G8B8A8_SRGB);
}

// ============================================================================
// PRESENT MODE SELECTION
// ============================================================================

#[test]
fn test_present_mode_prefers_mailbox() {
    let modes = [
        vk::PresentModeKHR::FIFO,
        vk::PresentModeKHR::MAILBOX,
        vk::PresentModeKHR::IMMEDIATE,
    ];
    assert_eq!(select_present_mode(&modes), vk::PresentModeKHR::MAILBOX);
}

#[test]
fn test_present_mode_fifo_only() {
    let modes = [vk::PresentModeKHR::FIFO];
    assert_eq!(select_present_mode(&modes), vk::PresentModeKHR::FIFO);
}

#[test]
fn test_present_mode_full_ranking() {
    // fifo-relaxed beats fifo, fifo beats immediate, immediate beats the
    // shared-refresh modes
    assert_eq!(
        select_present_mode(&[vk::PresentModeKHR::FIFO, vk::PresentModeKHR::FIFO_RELAXED]),
        vk::PresentModeKHR::FIFO_RELAXED
    );
    assert_eq!(
        select_present_mode(&[vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO]),
        vk::PresentModeKHR::FIFO
    );
    assert_eq!(
        select_present_mode(&[
            vk::PresentModeKHR::SHARED_DEMAND_REFRESH,
            vk::PresentModeKHR::IMMEDIATE,
        ]),
        vk::PresentModeKHR::IMMEDIATE
    );
    assert_eq!(
        select_present_mode(&[
            vk::PresentModeKHR::SHARED_CONTINUOUS_REFRESH,
            vk::PresentModeKHR::SHARED_DEMAND_REFRESH,
        ]),
        vk::PresentModeKHR::SHARED_DEMAND_REFRESH
    );
}

#[test]
fn test_present_mode_ignores_enumeration_order() {
    let forward = [
        vk::PresentModeKHR::IMMEDIATE,
        vk::PresentModeKHR::FIFO,
        vk::PresentModeKHR::MAILBOX,
    ];
    let reverse = [
        vk::PresentModeKHR::MAILBOX,
        vk::PresentModeKHR::FIFO,
        vk::PresentModeKHR::IMMEDIATE,
    ];
    assert_eq!(select_present_mode(&forward), select_present_mode(&reverse));
}

// ============================================================================
// IMAGE COUNT NEGOTIATION
// ============================================================================

#[test]
fn test_image_count_unbounded_max() {
    // max of 0 means the device reports no upper bound
    assert_eq!(select_image_count(2, 0), 3);
}

#[test]
fn test_image_count_capped_by_max() {
    assert_eq!(select_image_count(2, 2), 2);
    assert_eq!(select_image_count(2, 8), 3);
    assert_eq!(select_image_count(3, 3), 3);
}

// ============================================================================
// EXTENT SELECTION
// ============================================================================

fn capabilities_with(current: u32, min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
    vk::SurfaceCapabilitiesKHR {
        current_extent: vk::Extent2D {
            width: current,
            height: current,
        },
        min_image_extent: vk::Extent2D {
            width: min,
            height: min,
        },
        max_image_extent: vk::Extent2D {
            width: max,
            height: max,
        },
        ..Default::default()
    }
}

#[test]
fn test_extent_uses_fixed_current_extent() {
    let caps = capabilities_with(1280, 1, 4096);
    let extent = select_extent(&caps, vk::Extent2D { width: 854, height: 480 });
    assert_eq!(extent.width, 1280);
    assert_eq!(extent.height, 1280);
}

#[test]
fn test_extent_clamps_when_surface_reports_none() {
    // current_extent of u32::MAX means the surface has no fixed extent
    let caps = capabilities_with(u32::MAX, 200, 800);
    let clamped_up = select_extent(&caps, vk::Extent2D { width: 100, height: 100 });
    assert_eq!(clamped_up.width, 200);
    let clamped_down = select_extent(&caps, vk::Extent2D { width: 2000, height: 2000 });
    assert_eq!(clamped_down.width, 800);
    let in_range = select_extent(&caps, vk::Extent2D { width: 640, height: 480 });
    assert_eq!(in_range.width, 640);
    assert_eq!(in_range.height, 480);
}
