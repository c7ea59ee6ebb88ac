mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use local_channel_core::{
    CallProfile, CallerId, ChannelFormats, ChannelHost, ChannelState, ControlKind, DeviceState,
    FormatMask, LocalError, Phase, Side, SoftHangupCause, CHANLOCALSTATUS_VAR, LOCAL_TYPE,
};

use common::{create, launched, setup};

#[test]
fn basic_pair_names_formats_and_options() {
    let (host, local) = setup();
    let owner = host
        .request(LOCAL_TYPE, "100@internal/n", FormatMask::ULAW | FormatMask::ALAW)
        .unwrap();
    let pvt = local.private_of(&owner).unwrap();
    let chan = pvt.chan().unwrap();

    let owner_name = host.name(&owner);
    let chan_name = host.name(&chan);
    let base = owner_name.strip_suffix(";1").unwrap();
    let tag = base.strip_prefix("Local/100@internal-").unwrap();
    assert_eq!(tag.len(), 4);
    assert!(tag.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(chan_name, format!("{};2", base));

    assert_eq!(host.formats(&owner), ChannelFormats::uniform(FormatMask::ULAW));
    assert_eq!(host.formats(&chan), ChannelFormats::uniform(FormatMask::ULAW));

    assert!(pvt.options().no_optimization);
    assert!(!pvt.options().bridge_report);
    assert_eq!(pvt.phase(), Phase::Fresh);
    assert_eq!(host.dialplan_location(&chan), ("internal".to_string(), "100".to_string(), 1));
}

#[test]
fn both_endpoints_share_one_registered_record() {
    let (host, local) = setup();
    let pair = create(&host, &local, "100@internal");

    let from_chan = local.private_of(&pair.chan).unwrap();
    assert!(Arc::ptr_eq(&pair.pvt, &from_chan));
    assert_eq!(local.registry().occurrences(pair.pvt.id()), 1);
    assert_eq!(local.module_in_use(), 2);
}

#[test]
fn format_seeding_picks_preferred_codec() {
    let (host, local) = setup();
    let owner = host
        .request(LOCAL_TYPE, "100@internal", FormatMask::GSM | FormatMask::ALAW | FormatMask::H264)
        .unwrap();
    let chan = local.private_of(&owner).unwrap().chan().unwrap();
    assert_eq!(host.formats(&chan).raw_write, FormatMask::ALAW);
    assert_eq!(host.formats(&owner).native, FormatMask::ALAW);
}

#[test]
fn jitterbuffer_needs_no_optimization() {
    let (host, local) = setup();

    let with_n = create(&host, &local, "100@internal/nj");
    assert!(host.jitterbuffer(&with_n.owner).unwrap().enabled);
    assert!(host.jitterbuffer(&with_n.chan).is_none());

    let without_n = create(&host, &local, "100@internal/j");
    assert!(!without_n.pvt.options().jitterbuffer);
    assert!(!host.jitterbuffer(&without_n.owner).unwrap().enabled);
}

#[test]
fn invalid_destination_is_rejected() {
    let (host, local) = setup();
    let err = host.request(LOCAL_TYPE, "@internal", FormatMask::ULAW).unwrap_err();
    assert!(matches!(err, LocalError::InvalidDestination { .. }));
    assert!(local.registry().is_empty());
}

#[test]
fn refused_chan_allocation_releases_owner() {
    let (host, local) = setup();
    host.refuse_allocations_after(1);

    let err = host.request(LOCAL_TYPE, "100@internal", FormatMask::ULAW).unwrap_err();
    assert_eq!(
        err,
        LocalError::HostAllocFailed("allocation refused: channel limit reached".into())
    );
    assert_eq!(host.released_count(), 1);
    assert_eq!(host.channel_count(), 0);
    assert!(local.registry().is_empty());
    assert_eq!(local.module_in_use(), 0);
}

#[test]
fn refused_owner_allocation_leaves_nothing() {
    let (host, local) = setup();
    host.refuse_allocations_after(0);

    let err = host.request(LOCAL_TYPE, "100@internal", FormatMask::ULAW).unwrap_err();
    assert!(matches!(err, LocalError::HostAllocFailed(_)));
    assert_eq!(host.released_count(), 0);
    assert!(local.registry().is_empty());
}

#[test]
fn call_copies_context_and_launches_dialplan() {
    let (host, local) = setup();
    let pair = create(&host, &local, "100@internal");

    let caller = CallerId {
        num: Some("5551234".into()),
        name: Some("Alice".into()),
        dnid: Some("100".into()),
        presentation: 1,
        ..CallerId::default()
    };
    host.set_caller_id(&pair.owner, caller.clone());
    host.set_call_profile(
        &pair.owner,
        CallProfile {
            language: "fr".into(),
            accountcode: "acct-7".into(),
            musicclass: "jazz".into(),
            cdr_flags: 4,
            application: Some("queue".into()),
        },
    );
    host.set_answered_elsewhere(&pair.owner);
    host.add_datastore(&pair.owner, "dialed-interfaces");

    host.place_call(&pair.owner, "100@internal", Some(Duration::from_secs(30)))
        .unwrap();

    assert_eq!(host.caller_id(&pair.chan), caller);
    let profile = host.call_profile(&pair.chan);
    assert_eq!(profile.language, "fr");
    assert_eq!(profile.accountcode, "acct-7");
    assert_eq!(profile.musicclass, "jazz");
    assert_eq!(profile.cdr_flags, 4);
    assert_eq!(profile.application.as_deref(), Some("queue"));
    assert!(host.answered_elsewhere(&pair.chan));
    assert_eq!(host.datastores(&pair.chan), vec!["dialed-interfaces".to_string()]);
    assert!(host.dialplan_started(&pair.chan));
    assert_eq!(pair.pvt.phase(), Phase::DialplanLaunched);
}

#[test]
fn call_only_carries_queue_application() {
    let (host, local) = setup();
    let pair = create(&host, &local, "100@internal");
    host.set_call_profile(
        &pair.owner,
        CallProfile {
            application: Some("Dial".into()),
            ..CallProfile::default()
        },
    );
    host.place_call(&pair.owner, "100@internal", None).unwrap();
    assert_eq!(host.call_profile(&pair.chan).application, None);
}

#[test]
fn call_filters_alert_info_headers() {
    let (host, local) = setup();
    let pair = create(&host, &local, "100@internal");
    host.set_var(&pair.owner, "SIPADDHEADER01", "Alert-Info: <http://x>;info=ring2");
    host.set_var(&pair.owner, "SIPADDHEADER02", "X-Account: 42");
    host.set_var(&pair.owner, "__TRANSFER_CONTEXT", "xfer");

    host.place_call(&pair.owner, "100@internal", None).unwrap();

    assert_eq!(
        host.variables(&pair.chan),
        vec![
            ("SIPADDHEADER02".to_string(), "X-Account: 42".to_string()),
            ("__TRANSFER_CONTEXT".to_string(), "xfer".to_string()),
        ]
    );
}

#[test]
fn call_refuses_channel_already_up() {
    let (host, local) = setup();
    let pair = create(&host, &local, "100@internal");
    host.set_state(&pair.owner, ChannelState::Up);

    let err = host.place_call(&pair.owner, "100@internal", None).unwrap_err();
    assert!(matches!(err, LocalError::StateViolation { state: ChannelState::Up, .. }));
    assert!(!host.dialplan_started(&pair.chan));
    assert_eq!(pair.pvt.phase(), Phase::Fresh);
}

#[test]
fn call_to_missing_extension_fails() {
    let (host, local) = setup();
    let pair = create(&host, &local, "999@internal");

    let err = host.place_call(&pair.owner, "999@internal", None).unwrap_err();
    assert_eq!(
        err,
        LocalError::ExtensionUnreachable {
            exten: "999".into(),
            context: "internal".into()
        }
    );
    assert_eq!(pair.pvt.phase(), Phase::Fresh);
}

#[test]
fn call_reports_dialplan_refusal() {
    let (host, local) = setup();
    let pair = create(&host, &local, "100@internal");
    host.fail_dialplan(true);

    let err = host.place_call(&pair.owner, "100@internal", None).unwrap_err();
    assert!(matches!(err, LocalError::DialplanFailed(_)));
    assert_eq!(pair.pvt.phase(), Phase::Fresh);
}

#[test]
fn owner_hangup_signals_chan_and_keeps_record() {
    let (host, local) = setup();
    let pair = launched(&host, &local, "100@internal/n");

    host.hangup_channel(&pair.owner).unwrap();

    let frames = host.drain_frames(&pair.chan);
    assert!(frames.iter().any(|f| f.is_control(ControlKind::Hangup)));
    assert!(host.tech_pvt(&pair.owner).is_none());
    assert!(local.registry().contains(pair.pvt.id()));
    assert_eq!(local.module_in_use(), 1);
    assert_eq!(pair.pvt.owner(), None);

    host.hangup_channel(&pair.chan).unwrap();
    assert!(local.registry().is_empty());
    assert!(pair.pvt.is_destroyed());
    assert_eq!(local.registry().stats().destroyed, 1);
    assert_eq!(local.module_in_use(), 0);
}

#[test]
fn owner_hangup_relays_its_cause() {
    let (host, local) = setup();
    let pair = launched(&host, &local, "100@internal/n");
    host.set_hangup_cause(&pair.owner, 17);

    host.hangup_channel(&pair.owner).unwrap();

    let causes: Vec<u32> = host
        .drain_frames(&pair.chan)
        .iter()
        .filter_map(|f| f.hangup_cause())
        .collect();
    assert!(causes.contains(&17));
}

#[test]
fn owner_hangup_before_launch_hangs_up_chan() {
    let (host, local) = setup();
    let pair = create(&host, &local, "100@internal");

    host.hangup_channel(&pair.owner).unwrap();

    assert!(host.is_hungup(&pair.chan));
    assert!(local.registry().is_empty());
    assert!(pair.pvt.is_destroyed());
    assert_eq!(local.module_in_use(), 0);
}

#[test]
fn owner_answered_elsewhere_reaches_chan_on_hangup() {
    let (host, local) = setup();
    let pair = launched(&host, &local, "100@internal");
    host.set_answered_elsewhere(&pair.owner);

    host.hangup_channel(&pair.owner).unwrap();
    assert!(host.answered_elsewhere(&pair.chan));
}

#[test]
fn chan_dialstatus_is_reported_to_owner() {
    let (host, local) = setup();
    let pair = launched(&host, &local, "100@internal");
    host.set_var(&pair.chan, "DIALSTATUS", "BUSY");

    host.hangup_channel(&pair.chan).unwrap();

    assert_eq!(
        host.get_var(&pair.owner, CHANLOCALSTATUS_VAR).as_deref(),
        Some("BUSY")
    );
    let frames = host.drain_frames(&pair.owner);
    assert!(frames.iter().any(|f| f.is_control(ControlKind::Hangup)));
    assert_eq!(pair.pvt.phase(), Phase::Torn);
    assert_eq!(local.module_in_use(), 1);
}

#[test]
fn hangup_of_foreign_channel_is_rejected() {
    let (host, local) = setup();
    let stranger = host.new_channel("SIP/carol-0003");
    let err = local_channel_core::ChannelTech::hangup(&*local, &stranger).unwrap_err();
    assert!(matches!(err, LocalError::NotLocal(_)));
}

#[test]
fn device_state_tracks_live_owners() {
    let (host, local) = setup();

    assert_eq!(host.device_state(LOCAL_TYPE, "100@internal"), Some(DeviceState::NotInUse));
    assert_eq!(host.device_state(LOCAL_TYPE, "nope@internal"), Some(DeviceState::Invalid));
    assert_eq!(host.device_state(LOCAL_TYPE, "100"), Some(DeviceState::Invalid));

    let pair = launched(&host, &local, "100@internal");
    assert_eq!(host.device_state(LOCAL_TYPE, "100@internal/n"), Some(DeviceState::InUse));
    assert_eq!(host.device_state(LOCAL_TYPE, "700@outbound"), Some(DeviceState::NotInUse));

    host.hangup_channel(&pair.owner).unwrap();
    assert_eq!(host.device_state(LOCAL_TYPE, "100@internal"), Some(DeviceState::NotInUse));
}

#[test]
fn show_channels_lists_owners() {
    let (host, local) = setup();
    assert_eq!(local.show_channels(), "No local channels in use\n");

    let pair = launched(&host, &local, "100@internal");
    assert_eq!(
        local.show_channels(),
        format!("{} -- 100@internal\n", host.name(&pair.owner))
    );

    host.hangup_channel(&pair.owner).unwrap();
    assert_eq!(local.show_channels(), "<unowned> -- 100@internal\n");

    let json = local.snapshots_json().unwrap();
    assert!(json.contains("\"exten\": \"100\""));
    assert!(json.contains("\"owner\": null"));
}

#[test]
fn unload_soft_hangs_up_every_owner() {
    let (host, local) = setup();
    let first = launched(&host, &local, "100@internal");
    let second = launched(&host, &local, "700@outbound");

    assert_eq!(local.unload(), 2);
    assert_eq!(host.soft_hangup_cause(&first.owner), Some(SoftHangupCause::AppUnload));
    assert_eq!(host.soft_hangup_cause(&second.owner), Some(SoftHangupCause::AppUnload));
    assert_eq!(local.module_in_use(), 4);

    for pair in [&first, &second] {
        host.hangup_channel(&pair.owner).unwrap();
        host.hangup_channel(&pair.chan).unwrap();
    }
    assert_eq!(local.module_in_use(), 0);
    assert_eq!(local.unload(), 0);
}

#[test]
fn owner_token_lives_as_long_as_the_owner_reference() {
    let (host, local) = setup();
    let pair = launched(&host, &local, "100@internal/n");

    // Hold the chan-side so the owner hangup backs off on it.
    host.lock(&pair.chan);
    let hangup = {
        let host = Arc::clone(&host);
        let owner = pair.owner.clone();
        thread::spawn(move || host.hangup_channel(&owner))
    };
    for _ in 0..2000 {
        let inner = pair.pvt.lock();
        let attached = [Side::Owner, Side::Chan]
            .iter()
            .filter(|side| inner.endpoint(**side).is_some())
            .count();
        assert_eq!(local.module_in_use(), attached);
        drop(inner);
        thread::yield_now();
    }
    host.unlock(&pair.chan);
    hangup.join().unwrap().unwrap();

    assert_eq!(pair.pvt.owner(), None);
    assert_eq!(local.module_in_use(), 1);
    host.hangup_channel(&pair.chan).unwrap();
    assert_eq!(local.module_in_use(), 0);
}

#[test]
fn unregistering_local_frees_host_and_technology() {
    let (host, local) = setup();
    let host_ref = Arc::downgrade(&host);
    let local_ref = Arc::downgrade(&local);

    assert!(host.unregister_tech(LOCAL_TYPE).is_some());
    assert!(host.unregister_tech(LOCAL_TYPE).is_none());
    assert!(host.request(LOCAL_TYPE, "100@internal", FormatMask::ULAW).is_err());

    drop(local);
    drop(host);
    assert!(local_ref.upgrade().is_none());
    assert!(host_ref.upgrade().is_none());
}
