use serde::Serialize;

use super::Registry;
use crate::models::destination::LocalOptions;
use crate::models::error::LocalError;
use crate::models::state::{Glare, Phase};
use crate::pair::private::LocalPvt;
use crate::traits::channel_host::ChannelHost;

/// Point-in-time view of one pair, for `local show channels` and JSON export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSnapshot {
    pub id: String,
    pub owner: Option<String>,
    pub chan: Option<String>,
    pub exten: String,
    pub context: String,
    pub options: LocalOptions,
    pub phase: Phase,
    pub glare: Glare,
    pub created_at: String,
}

impl ChannelSnapshot {
    pub fn capture<H: ChannelHost>(host: &H, pvt: &LocalPvt<H>) -> Self {
        let (owner, chan, phase, glare) = {
            let inner = pvt.lock();
            (inner.owner.clone(), inner.chan.clone(), inner.phase(), inner.glare())
        };
        let dest = pvt.destination();
        Self {
            id: pvt.id().to_string(),
            owner: owner.map(|c| host.name(&c)),
            chan: chan.map(|c| host.name(&c)),
            exten: dest.exten.clone(),
            context: dest.context.clone(),
            options: dest.options,
            phase,
            glare,
            created_at: pvt.created_at().to_rfc3339(),
        }
    }

    /// One line of `local show channels`.
    pub fn summary(&self) -> String {
        format!(
            "{} -- {}@{}",
            self.owner.as_deref().unwrap_or("<unowned>"),
            self.exten,
            self.context
        )
    }
}

/// Snapshot every registered pair.
pub fn snapshot_all<H: ChannelHost>(host: &H, registry: &Registry<H>) -> Vec<ChannelSnapshot> {
    registry
        .snapshot()
        .iter()
        .map(|pvt| ChannelSnapshot::capture(host, pvt))
        .collect()
}

/// Render `local show channels`.
pub fn show_channels<H: ChannelHost>(host: &H, registry: &Registry<H>) -> String {
    let snapshots = snapshot_all(host, registry);
    if snapshots.is_empty() {
        return "No local channels in use\n".to_string();
    }
    let mut out = String::new();
    for snapshot in &snapshots {
        out.push_str(&snapshot.summary());
        out.push('\n');
    }
    out
}

pub fn to_json(snapshots: &[ChannelSnapshot]) -> Result<String, LocalError> {
    serde_json::to_string_pretty(snapshots)
        .map_err(|e| LocalError::Serialization(e.to_string()))
}
