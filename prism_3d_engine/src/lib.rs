/*!
# Prism 3D Engine

Core types for the Prism 3D rendering demo engine.

This crate is platform-agnostic: it holds the error and logging
subsystems, the renderer configuration, the CPU/GPU synchronization-state
contract shared by device-backed resources, vertex layout descriptions,
and the game-object simulator. The Vulkan backend
(`prism_3d_engine_renderer_vulkan`) builds its device machinery on top of
these types.

## Architecture

- **Engine**: process-wide logging facade
- **render**: sync-state contract, uniform data interfaces, vertex layouts
- **sim**: axis-separated collision simulator feeding per-object transforms
- **utils**: frame timing
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod render;
pub mod sim;
pub mod utils;

// Main prism3d namespace module
pub mod prism3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine facade (logging)
    pub use crate::engine::Engine;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
        // Note: engine_* macros are NOT re-exported here - they are internal only
    }

    // Render sub-module with the device-facing types
    pub mod render {
        pub use crate::render::*;
    }

    // Simulation sub-module
    pub mod sim {
        pub use crate::sim::*;
    }

    // Utility sub-module
    pub mod utils {
        pub use crate::utils::*;
    }
}

// Re-export math library at crate root
pub use glam;
