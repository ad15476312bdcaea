//! Keel Kube - generic Kubernetes resource handlers
//!
//! This crate provides:
//! - **Handler**: one engine for every kind, with create, update, apply
//!   (create falling back to update), get, delete and patch
//! - **Patch Engine**: strategic merge, JSON merge and JSON patch, from a
//!   supplied payload or a diff of two objects, skipping no-op patches
//! - **Control Planes**: a kube-rs backed cluster client and an in-memory
//!   store for tests
//! - **Request Context**: cancellation and deadlines for every blocking step
//! - **Configuration**: default namespace, timeout, field manager and dry run

pub mod config;
pub mod context;
pub mod control_plane;
pub mod error;
pub mod handler;
pub mod patch;

pub use config::{DEFAULT_NAMESPACE, HandlerConfig, HandlerOptions};
pub use context::RequestContext;
pub use control_plane::{ControlPlane, InMemoryControlPlane, KubeControlPlane, OperationCounts};
pub use error::{KubeError, Result};
pub use handler::Handler;
pub use patch::{PatchOperation, PatchStrategy};
