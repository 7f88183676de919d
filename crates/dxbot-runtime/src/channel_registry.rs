use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dxbot_core::write_text_atomic;

/// Durable set of channel ids the bridge monitors, persisted as a JSON array.
#[derive(Debug, Clone)]
pub struct ChannelRegistry {
    path: PathBuf,
    channels: BTreeSet<String>,
}

impl ChannelRegistry {
    /// Loads the persisted set. A missing or unreadable file yields an empty
    /// registry; the failure is logged and never propagated.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let channels = match read_channel_file(&path) {
            Ok(channels) => channels,
            Err(error) => {
                if path.exists() {
                    tracing::warn!(
                        path = %path.display(),
                        error = %format!("{error:#}"),
                        "channel registry unreadable; starting empty"
                    );
                }
                BTreeSet::new()
            }
        };
        Self { path, channels }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn channels(&self) -> &BTreeSet<String> {
        &self.channels
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.channels.contains(channel)
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn insert(&mut self, channel: impl Into<String>) -> bool {
        self.channels.insert(channel.into())
    }

    pub fn remove(&mut self, channel: &str) -> bool {
        self.channels.remove(channel)
    }

    /// Wholesale replacement; only ever called with a freshly computed set.
    pub fn replace(&mut self, channels: BTreeSet<String>) {
        self.channels = channels;
    }

    /// Writes the full current set. In-memory state is authoritative when this
    /// fails.
    pub fn save(&self) -> Result<()> {
        let mut payload = serde_json::to_string_pretty(&self.channels)
            .context("failed to serialize channel registry")?;
        payload.push('\n');
        write_text_atomic(&self.path, &payload).with_context(|| {
            format!("failed to write channel registry {}", self.path.display())
        })
    }

    /// Saves and logs instead of failing. Returns whether the write succeeded.
    pub fn save_or_warn(&self) -> bool {
        match self.save() {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(
                    path = %self.path.display(),
                    channels = self.channels.len(),
                    error = %format!("{error:#}"),
                    "channel registry save failed; keeping in-memory state"
                );
                false
            }
        }
    }
}

fn read_channel_file(path: &Path) -> Result<BTreeSet<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read channel registry {}", path.display()))?;
    let ids = serde_json::from_str::<Vec<String>>(&raw)
        .with_context(|| format!("failed to parse channel registry {}", path.display()))?;
    Ok(ids
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect())
}
