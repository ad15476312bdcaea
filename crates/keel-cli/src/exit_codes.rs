//! Standard exit codes for CLI operations
//!
//! These exit codes follow Unix conventions and sysexits.h where applicable.

/// Success - operation completed without errors
#[allow(dead_code)]
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Input error - malformed document or wrong kind
pub const INPUT_ERROR: i32 = 2;

/// Not found - the named object does not exist
pub const NOT_FOUND: i32 = 3;

/// Conflict - the object already exists
pub const CONFLICT: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Cluster error - the API server rejected the request
pub const CLUSTER_ERROR: i32 = 6;

/// Usage error - invalid arguments or options (following sysexits.h convention)
pub const USAGE_ERROR: i32 = 64;

/// Configuration error - invalid config file (following sysexits.h convention)
pub const CONFIG_ERROR: i32 = 78;

/// Timed out - the request deadline passed (following timeout(1))
pub const TIMEOUT: i32 = 124;

/// Interrupted - the request was cancelled with Ctrl-C
pub const INTERRUPTED: i32 = 130;
