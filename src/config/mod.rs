//! Tool configuration and the deep merge primitive.
//!
//! Configuration is consolidated from tiers with field-by-field YAML merging:
//! 1. **Project** - `<target>/.scaffold-kit/config.yaml`
//! 2. **User** - `~/.scaffold-kit/config.yaml` and environment variables
//!
//! Fields no tier sets take their serde defaults.
//!
//! ## Environment Variables
//! - `SCAFFOLD_KIT_CONFIG_PATH` - Explicit config file (overrides all tiers)
//! - `SCAFFOLD_KIT_USER_DIR` - User config dir (default: `~/.scaffold-kit`)
//! - `SCAFFOLD_KIT_STRATEGY` - Default conflict strategy
//! - `SCAFFOLD_KIT_MANIFEST` - Manifest file name
//! - `SCAFFOLD_KIT_INSTALL_COMMAND` - Package manager executable

mod loader;
mod merge;
mod types;

pub use loader::{CONFIG_DIR_NAME, CONFIG_FILE_NAME, ConfigLoader, ConfigPaths, ConfigTier};
pub use merge::{deep_merge, deep_merge_all, deep_merge_into};
pub use types::*;
