pub mod loader;
pub mod schema;

pub use loader::{config_path, discover, load_from_path, load_from_str, ConfigError, CONFIG_FILE_NAME};
pub use schema::{OptionsSection, RenameFile, RenameSection, ValidationError, ValidationIssue};
