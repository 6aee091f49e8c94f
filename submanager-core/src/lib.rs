//! Sub Manager core library: config models, dynamic state, lock, platform seam.
//!
//! - [`types`]: rendered static config models
//! - [`config`]: load / render defaults / validate / generate the static config
//! - [`state`]: dynamic state models and persistence
//! - [`lock`]: advisory lock over the dynamic state file
//! - [`platform`]: the per-account content-access capability
//! - [`memory`]: in-memory [`platform::Platform`] for tests

pub mod config;
pub mod error;
pub mod lock;
pub mod memory;
pub mod paths;
pub mod platform;
pub mod state;
pub mod types;

pub use error::{ConfigError, IntervalError, LockError};
pub use paths::ConfigPaths;
pub use platform::{Accounts, Platform, PlatformError};
pub use state::{DynamicConfig, DynamicSyncState, DynamicThreadState};
pub use types::{
    ContextConfig, EndpointConfig, EndpointType, FullEndpointConfig, Interval, IntervalUnit,
    MenuConfig, MenuData, MenuLink, MenuSection, PatternConfig, PinMode, StaticConfig, SyncItem,
    SyncManagerConfig, ThreadItem, ThreadManagerConfig,
};
