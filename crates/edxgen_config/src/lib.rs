//! # edxgen_config
//!
//! Layered settings store for edxgen.
//!
//! Settings are typed values (string, bool, int, list of strings) keyed by
//! name. They are loaded once from built-in defaults, plugin defaults and the
//! user's `config.yml`, then resolved into an immutable [`Context`] that is
//! passed explicitly to every render call.
//!
//! ## Example
//!
//! ```rust,no_run
//! use edxgen_config::{ConfigLoader, parse_override};
//!
//! let loader = ConfigLoader::new(".");
//! let mut settings = loader.load().unwrap();
//!
//! let (key, value) = parse_override("LMS_HOST=learn.example.com").unwrap();
//! settings.set(key, value);
//!
//! // CMS_HOST defaults to "studio.{{ LMS_HOST }}"
//! let cms_host = settings.render_value("CMS_HOST").unwrap();
//! assert_eq!(cms_host.to_string(), "studio.learn.example.com");
//!
//! let context = settings.resolve().unwrap();
//! ```

pub mod error;
pub mod loader;
pub mod settings;
pub mod value;

pub use error::{ConfigError, ConfigResult};
pub use loader::{parse_override, ConfigLoader, CONFIG_FILE};
pub use settings::{Context, Settings, MAX_RESOLUTION_DEPTH};
pub use value::Value;
