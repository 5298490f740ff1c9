//! # Configuration Management
//!
//! Configuration is read from `SECRETARY_*` environment variables (a `.env`
//! file is loaded first by the CLI) and validated before any backend is built.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `SECRETARY_MODE` | `file` (comma separated: `file`, `env`, `vault`) |
//! | `SECRETARY_FILE` | `$HOME/.secretary.csv` |
//! | `SECRETARY_ROOT_CATEGORY` | `root` |
//! | `SECRETARY_ENV_PREFIX` | `SECRETARY` |
//! | `SECRETARY_CATEGORY_REGEXP` / `SECRETARY_CATEGORY_REPLACE` | unset |
//! | `SECRETARY_MERGE_POLICY` | `last_wins` |
//! | `SECRETARY_ALLOW_OVERRIDES` | `true` |
//! | `SECRETARY_VAULT_ADDR`, `_TOKEN`, `_NAMESPACE`, `_MOUNT`, `_ENGINE` | unset, `secret`, `kv2` |

pub mod settings;

pub use settings::{parse_modes, FileBackendConfig, ObservabilityConfig, SecretsConfig};
