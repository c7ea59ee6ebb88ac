use std::sync::Arc;

use crate::models::config::LocalConfig;
use crate::models::destination::Destination;
use crate::models::error::LocalError;
use crate::models::format::{ChannelFormats, FormatMask};
use crate::models::state::ChannelState;
use crate::pair::module_use::ModuleUse;
use crate::pair::private::LocalPvt;
use crate::registry::Registry;
use crate::tech::local::LOCAL_TYPE;
use crate::traits::channel_host::{ChannelHost, ChannelRequest, TechPvt};

impl<H: ChannelHost> LocalPvt<H> {
    /// Build a pair for `data` and register it. Returns the record and the
    /// owner-side, which is what the requester gets back.
    ///
    /// On failure nothing stays allocated: a half-built pair releases its
    /// owner-side and never reaches the registry.
    pub(crate) fn create_pair(
        host: &H,
        registry: &Registry<H>,
        module: &ModuleUse,
        config: &LocalConfig,
        data: &str,
        format: FormatMask,
    ) -> Result<(Arc<Self>, H::Channel), LocalError> {
        let destination = Destination::parse(data, &config.default_context)?;
        if !host.extension_exists(&destination.context, &destination.exten, 1, None) {
            log::warn!("no such extension/context {} creating local channel", destination);
        }

        let mut jitterbuffer = config.jitterbuffer.clone();
        jitterbuffer.enabled = destination.options.jitterbuffer;

        let best = format.best().unwrap_or_else(|| {
            log::warn!("no audio format in {} requested for {}", format, destination);
            FormatMask::EMPTY
        });

        let pvt = Arc::new(Self::new(destination, format, jitterbuffer));
        let dest = pvt.destination();
        let tag: u16 = rand::random();
        let base = format!("{}/{}-{:04x}", LOCAL_TYPE, dest, tag);
        let request = |suffix: &str| ChannelRequest {
            tech_type: LOCAL_TYPE,
            name: format!("{};{}", base, suffix),
            state: ChannelState::Down,
            accountcode: String::new(),
            exten: dest.exten.clone(),
            context: dest.context.clone(),
            ama_flags: 0,
        };

        let owner = host.alloc_channel(&request("1")).map_err(|e| {
            log::warn!("unable to allocate local channel {};1: {}", base, e);
            LocalError::from(e)
        })?;
        let chan = match host.alloc_channel(&request("2")) {
            Ok(chan) => chan,
            Err(e) => {
                log::warn!("unable to allocate local channel {};2: {}", base, e);
                host.release_channel(&owner);
                return Err(e.into());
            }
        };

        let formats = ChannelFormats::uniform(best);
        for endpoint in [&owner, &chan] {
            host.set_formats(endpoint, formats);
            host.set_dialplan_location(endpoint, &dest.context, &dest.exten, 1);
            let slot: TechPvt = pvt.clone();
            host.set_tech_pvt(endpoint, Some(slot));
        }
        host.configure_jitterbuffer(&owner, pvt.jitterbuffer());

        {
            let mut inner = pvt.lock();
            inner.owner = Some(owner.clone());
            inner.chan = Some(chan);
            inner.owner_use = Some(module.acquire());
            inner.chan_use = Some(module.acquire());
        }

        registry.register(Arc::clone(&pvt));
        log::info!("created local pair {} as {}", pvt.id(), base);
        Ok((pvt, owner))
    }
}
