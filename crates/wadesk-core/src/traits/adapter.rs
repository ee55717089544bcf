// SPDX-FileCopyrightText: 2026 Wadesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait shared by storage, LLM, transport and transcription backends.

use async_trait::async_trait;

use crate::error::WadeskError;
use crate::types::{AdapterType, HealthStatus};

/// Identity, health and lifecycle common to every backend adapter.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Human-readable name of this adapter instance.
    fn name(&self) -> &str;

    fn version(&self) -> semver::Version;

    fn adapter_type(&self) -> AdapterType;

    async fn health_check(&self) -> Result<HealthStatus, WadeskError>;

    /// Release held resources. Called once during orderly shutdown.
    async fn shutdown(&self) -> Result<(), WadeskError>;
}
