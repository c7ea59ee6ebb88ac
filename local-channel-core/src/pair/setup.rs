use crate::models::config::LocalConfig;
use crate::models::error::LocalError;
use crate::models::state::{Phase, Side};
use crate::pair::private::LocalPvt;
use crate::traits::channel_host::ChannelHost;

impl<H: ChannelHost> LocalPvt<H> {
    /// Place the call on the owner-side: hand its call context to the
    /// chan-side and start the dialplan there.
    pub(crate) fn launch(
        &self,
        host: &H,
        config: &LocalConfig,
        endpoint: &H::Channel,
    ) -> Result<(), LocalError> {
        let mut inner = self.lock();
        if inner.side_of(endpoint) != Some(Side::Owner) {
            return Err(LocalError::NotLocal(host.name(endpoint)));
        }
        let (owner, chan) = match (inner.owner.clone(), inner.chan.clone()) {
            (Some(owner), Some(chan)) => (owner, chan),
            _ => return Err(LocalError::EndpointGone(host.name(endpoint))),
        };

        let state = host.state(&owner);
        if !state.can_place_call() {
            log::warn!("refusing to call {} in state {:?}", host.name(&owner), state);
            return Err(LocalError::StateViolation { name: host.name(&owner), state });
        }

        let caller = host.caller_id(&owner);
        let caller_num = caller.num.clone();
        host.set_caller_id(&chan, caller);

        let from = host.call_profile(&owner);
        let mut profile = host.call_profile(&chan);
        profile.language = from.language;
        profile.accountcode = from.accountcode;
        profile.musicclass = from.musicclass;
        profile.cdr_flags = from.cdr_flags;
        if let Some(app) = from.application {
            if app.eq_ignore_ascii_case(&config.queue_application) {
                profile.application = Some(app);
            }
        }
        host.set_call_profile(&chan, profile);

        if host.answered_elsewhere(&owner) {
            host.set_answered_elsewhere(&chan);
        }

        for (name, value) in host.variables(&owner) {
            if config.inherit_filter.as_ref().is_some_and(|f| f.matches(&name, &value)) {
                log::debug!("not inheriting {} onto {}", name, host.name(&chan));
                continue;
            }
            host.push_var(&chan, &name, &value);
        }
        host.inherit_datastores(&owner, &chan);

        let dest = self.destination();
        if !host.extension_exists(&dest.context, &dest.exten, 1, caller_num.as_deref()) {
            log::warn!("no such extension/context {} while calling local channel", dest);
            return Err(LocalError::ExtensionUnreachable {
                exten: dest.exten.clone(),
                context: dest.context.clone(),
            });
        }

        if let Err(e) = host.start_dialplan(&chan) {
            log::error!("unable to start dialplan on {}: {}", host.name(&chan), e);
            return Err(LocalError::DialplanFailed(host.name(&chan)));
        }
        inner.phase = Phase::DialplanLaunched;
        log::debug!("dialplan launched on {}", host.name(&chan));
        Ok(())
    }
}
