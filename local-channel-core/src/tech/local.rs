use std::sync::Arc;
use std::time::Duration;

use crate::models::config::LocalConfig;
use crate::models::destination::Destination;
use crate::models::error::LocalError;
use crate::models::format::FormatMask;
use crate::models::frame::{ControlKind, Frame};
use crate::models::state::{DeviceState, Side, SoftHangupCause};
use crate::pair::masquerade;
use crate::pair::module_use::ModuleUse;
use crate::pair::private::LocalPvt;
use crate::registry::diagnostics::{self, ChannelSnapshot};
use crate::registry::Registry;
use crate::traits::channel_host::ChannelHost;
use crate::traits::channel_tech::ChannelTech;

/// Technology name under which Local channels are registered.
pub const LOCAL_TYPE: &str = "Local";

const DESCRIPTION: &str = "Local Proxy Channel Driver";

/// The Local channel technology bound to one host.
///
/// Owns the pair registry and the module-use counter. Hosts register it under
/// [`LOCAL_TYPE`] and dispatch channel operations to its [`ChannelTech`] impl.
pub struct LocalTech<H: ChannelHost> {
    host: Arc<H>,
    config: LocalConfig,
    registry: Registry<H>,
    module: ModuleUse,
}

impl<H: ChannelHost> LocalTech<H> {
    pub fn new(host: Arc<H>, config: LocalConfig) -> Result<Self, LocalError> {
        config.validate().map_err(LocalError::InvalidConfig)?;
        log::debug!("local channel technology configured: {:?}", config);
        Ok(Self {
            host,
            config,
            registry: Registry::new(),
            module: ModuleUse::new(),
        })
    }

    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    pub fn config(&self) -> &LocalConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry<H> {
        &self.registry
    }

    /// Endpoints still holding the module.
    pub fn module_in_use(&self) -> usize {
        self.module.in_use()
    }

    /// The pair `chan` belongs to, if it is a Local endpoint.
    pub fn private_of(&self, chan: &H::Channel) -> Option<Arc<LocalPvt<H>>> {
        self.host.tech_pvt(chan)?.downcast::<LocalPvt<H>>().ok()
    }

    pub fn show_channels(&self) -> String {
        diagnostics::show_channels(&*self.host, &self.registry)
    }

    pub fn snapshots(&self) -> Vec<ChannelSnapshot> {
        diagnostics::snapshot_all(&*self.host, &self.registry)
    }

    pub fn snapshots_json(&self) -> Result<String, LocalError> {
        diagnostics::to_json(&self.snapshots())
    }

    /// Ask every live owner-side to hang up ahead of unloading.
    ///
    /// Returns how many owners were signalled. The module may only go once
    /// [`module_in_use`](Self::module_in_use) has dropped to zero.
    pub fn unload(&self) -> usize {
        let mut signalled = 0;
        for pvt in self.registry.snapshot() {
            if let Some(owner) = pvt.owner() {
                self.host.soft_hangup(&owner, SoftHangupCause::AppUnload);
                signalled += 1;
            }
        }
        log::info!(
            "unloading local channels: {} owners signalled, {} endpoints in use",
            signalled,
            self.module.in_use()
        );
        signalled
    }

    fn require_private(&self, chan: &H::Channel) -> Result<Arc<LocalPvt<H>>, LocalError> {
        self.private_of(chan)
            .ok_or_else(|| LocalError::NotLocal(self.host.name(chan)))
    }

    /// Relay `frame` from `chan` to its peer. `chan` is locked by the host.
    fn relay_from(&self, chan: &H::Channel, frame: Frame) -> Result<(), LocalError> {
        let pvt = self.require_private(chan)?;
        let inner = pvt.lock();
        let side = inner
            .side_of(chan)
            .ok_or_else(|| LocalError::NotLocal(self.host.name(chan)))?;
        drop(pvt.relay(&*self.host, &self.registry, inner, side, frame, Some(chan), true));
        Ok(())
    }
}

impl<H: ChannelHost> ChannelTech<H::Channel> for LocalTech<H> {
    fn type_name(&self) -> &'static str {
        LOCAL_TYPE
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    fn capabilities(&self) -> FormatMask {
        FormatMask::from_bits(u64::MAX)
    }

    fn request(&self, data: &str, format: FormatMask) -> Result<H::Channel, LocalError> {
        let (_, owner) = LocalPvt::create_pair(
            &*self.host,
            &self.registry,
            &self.module,
            &self.config,
            data,
            format,
        )?;
        Ok(owner)
    }

    fn devicestate(&self, data: &str) -> DeviceState {
        let (exten, context) = match Destination::parse_device(data) {
            Some(parsed) => parsed,
            None => {
                log::warn!("someone used Local/{} somewhere without a @context", data);
                return DeviceState::Invalid;
            }
        };
        if !self.host.extension_exists(&context, &exten, 1, None) {
            return DeviceState::Invalid;
        }
        if self.registry.owner_active(&exten, &context) {
            DeviceState::InUse
        } else {
            DeviceState::NotInUse
        }
    }

    fn call(&self, chan: &H::Channel, dest: &str, timeout: Option<Duration>) -> Result<(), LocalError> {
        let pvt = self.require_private(chan)?;
        if let Some(timeout) = timeout {
            log::debug!("ignoring {:?} timeout calling {}", timeout, dest);
        }
        pvt.launch(&*self.host, &self.config, chan)
    }

    fn hangup(&self, chan: &H::Channel) -> Result<(), LocalError> {
        let pvt = self.require_private(chan)?;
        let outcome = pvt.teardown(&*self.host, &self.registry, chan)?;
        log::debug!("hung up {}: {:?}", self.host.name(chan), outcome);
        Ok(())
    }

    fn answer(&self, chan: &H::Channel) -> Result<(), LocalError> {
        let pvt = self.require_private(chan)?;
        let side = pvt.lock().side_of(chan);
        match side {
            Some(Side::Chan) => self.relay_from(chan, Frame::control(ControlKind::Answer)),
            Some(Side::Owner) => {
                log::warn!("huh? local is being asked to answer {}", self.host.name(chan));
                Ok(())
            }
            None => Err(LocalError::NotLocal(self.host.name(chan))),
        }
    }

    fn read(&self, _chan: &H::Channel) -> Frame {
        Frame::Null
    }

    fn write(&self, chan: &H::Channel, frame: Frame) -> Result<(), LocalError> {
        let pvt = self.require_private(chan)?;
        let third = if frame.is_media() && !pvt.options().no_optimization {
            masquerade::direct_bridge(&*self.host, chan)
        } else {
            None
        };
        let mut inner = pvt.lock();
        let side = inner
            .side_of(chan)
            .ok_or_else(|| LocalError::NotLocal(self.host.name(chan)))?;

        let survivor = if frame.is_media() {
            pvt.try_optimize(&*self.host, &mut inner, side, third)
        } else {
            None
        };
        drop(pvt.relay(&*self.host, &self.registry, inner, side, frame, Some(chan), true));

        if let Some(survivor) = survivor {
            masquerade::complete(&*self.host, &survivor);
        }
        Ok(())
    }

    fn indicate(&self, chan: &H::Channel, condition: ControlKind, data: &[u8]) -> Result<(), LocalError> {
        let pvt = self.require_private(chan)?;
        let passthru = pvt.options().moh_passthru;
        match condition {
            ControlKind::Hold if !passthru => {
                let class = std::str::from_utf8(data).ok().filter(|c| !c.is_empty());
                self.host.start_moh(chan, class);
                Ok(())
            }
            ControlKind::Unhold if !passthru => {
                self.host.stop_moh(chan);
                Ok(())
            }
            _ => self.relay_from(
                chan,
                Frame::Control {
                    kind: condition,
                    data: data.to_vec(),
                },
            ),
        }
    }

    fn send_digit_begin(&self, chan: &H::Channel, digit: char) -> Result<(), LocalError> {
        self.relay_from(chan, Frame::DtmfBegin(digit))
    }

    fn send_digit_end(&self, chan: &H::Channel, digit: char, duration_ms: u32) -> Result<(), LocalError> {
        self.relay_from(chan, Frame::DtmfEnd { digit, duration_ms })
    }

    fn send_text(&self, chan: &H::Channel, text: &str) -> Result<(), LocalError> {
        self.relay_from(chan, Frame::Text(text.to_string()))
    }

    fn send_html(&self, chan: &H::Channel, subclass: i32, data: &[u8]) -> Result<(), LocalError> {
        self.relay_from(
            chan,
            Frame::Html {
                subclass,
                data: data.to_vec(),
            },
        )
    }

    fn fixup(&self, old: &H::Channel, new: &H::Channel) -> Result<(), LocalError> {
        let pvt = self.require_private(new)?;
        let mut inner = pvt.lock();
        if inner.owner.as_ref() == Some(old) {
            inner.owner = Some(new.clone());
        } else if inner.chan.as_ref() == Some(old) {
            inner.chan = Some(new.clone());
        } else {
            log::warn!(
                "old channel {} wasn't an endpoint of local pair {}",
                self.host.name(old),
                pvt.destination()
            );
            return Err(LocalError::FixupMismatch(self.host.name(old)));
        }
        Ok(())
    }

    fn bridged_channel(&self, _chan: &H::Channel, bridge: &H::Channel) -> Option<H::Channel> {
        let pvt = match self.private_of(bridge) {
            Some(pvt) => pvt,
            None => {
                log::debug!("asked for the bridged peer of {} with no private record", self.host.name(bridge));
                return None;
            }
        };
        if !pvt.options().bridge_report {
            return Some(bridge.clone());
        }

        let opposite = {
            let inner = pvt.lock();
            match inner.side_of(bridge) {
                Some(side) => inner.endpoint(side.peer()).cloned(),
                None => None,
            }
        };
        match opposite {
            Some(other) => Some(self.host.bridge(&other).unwrap_or(other)),
            None => Some(bridge.clone()),
        }
    }
}
