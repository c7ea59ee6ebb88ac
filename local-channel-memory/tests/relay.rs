mod common;

use local_channel_core::{
    ChannelHost, ChannelState, ChannelTech, ControlKind, FormatMask, Frame, BUSY_PEER_VAR,
};

use common::{create, launched, setup};

fn voice(byte: u8) -> Frame {
    Frame::voice(FormatMask::ULAW, vec![byte])
}

#[test]
fn frames_arrive_in_submission_order() {
    let (host, local) = setup();
    let pair = launched(&host, &local, "100@internal/n");

    for i in 0..5 {
        host.write_frame(&pair.owner, voice(i)).unwrap();
    }
    host.send_text_message(&pair.owner, "done").unwrap();

    let mut expected: Vec<Frame> = (0..5).map(voice).collect();
    expected.push(Frame::Text("done".into()));
    assert_eq!(host.drain_frames(&pair.chan), expected);
    assert!(host.drain_frames(&pair.owner).is_empty());
}

#[test]
fn both_directions_are_independent() {
    let (host, local) = setup();
    let pair = launched(&host, &local, "100@internal/n");

    host.write_frame(&pair.owner, voice(1)).unwrap();
    host.write_frame(&pair.chan, voice(2)).unwrap();
    host.write_frame(&pair.owner, voice(3)).unwrap();

    assert_eq!(host.drain_frames(&pair.chan), vec![voice(1), voice(3)]);
    assert_eq!(host.drain_frames(&pair.owner), vec![voice(2)]);
}

#[test]
fn busy_peer_follows_the_frame() {
    let (host, local) = setup();
    let pair = launched(&host, &local, "100@internal/n");
    host.set_var(&pair.chan, BUSY_PEER_VAR, "yes");

    host.write_frame(&pair.chan, voice(1)).unwrap();
    assert_eq!(host.get_var(&pair.owner, BUSY_PEER_VAR).as_deref(), Some("yes"));
}

#[test]
fn ringing_sets_peer_state() {
    let (host, local) = setup();
    let pair = launched(&host, &local, "100@internal");

    host.indicate_condition(&pair.chan, ControlKind::Ringing, &[]).unwrap();

    assert_eq!(host.state(&pair.owner), ChannelState::Ringing);
    assert_eq!(
        host.drain_frames(&pair.owner),
        vec![Frame::control(ControlKind::Ringing)]
    );
}

#[test]
fn other_conditions_pass_through_with_data() {
    let (host, local) = setup();
    let pair = launched(&host, &local, "100@internal");

    host.indicate_condition(&pair.owner, ControlKind::Other(42), b"x").unwrap();
    assert_eq!(
        host.drain_frames(&pair.chan),
        vec![Frame::Control {
            kind: ControlKind::Other(42),
            data: b"x".to_vec()
        }]
    );
}

#[test]
fn generators_on_both_sides_suppress_relay() {
    let (host, local) = setup();
    let pair = launched(&host, &local, "100@internal/n");
    host.set_generator(&pair.owner, true);
    host.set_generator(&pair.chan, true);

    host.write_frame(&pair.owner, voice(1)).unwrap();
    assert!(host.drain_frames(&pair.chan).is_empty());

    host.set_generator(&pair.chan, false);
    host.write_frame(&pair.owner, voice(2)).unwrap();
    assert_eq!(host.drain_frames(&pair.chan), vec![voice(2)]);
}

#[test]
fn only_chan_side_answer_is_relayed() {
    let (host, local) = setup();
    let pair = launched(&host, &local, "100@internal");

    host.answer_channel(&pair.owner).unwrap();
    assert!(host.drain_frames(&pair.chan).is_empty());

    host.answer_channel(&pair.chan).unwrap();
    assert_eq!(
        host.drain_frames(&pair.owner),
        vec![Frame::control(ControlKind::Answer)]
    );
}

#[test]
fn digits_text_and_html_are_relayed() {
    let (host, local) = setup();
    let pair = launched(&host, &local, "100@internal");

    host.send_dtmf_begin(&pair.owner, '5').unwrap();
    host.send_dtmf_end(&pair.owner, '5', 120).unwrap();
    host.send_text_message(&pair.owner, "hello").unwrap();
    host.send_html_frame(&pair.owner, 3, b"<b>").unwrap();

    assert_eq!(
        host.drain_frames(&pair.chan),
        vec![
            Frame::DtmfBegin('5'),
            Frame::DtmfEnd {
                digit: '5',
                duration_ms: 120
            },
            Frame::Text("hello".into()),
            Frame::Html {
                subclass: 3,
                data: b"<b>".to_vec()
            },
        ]
    );
}

#[test]
fn hold_plays_music_locally() {
    let (host, local) = setup();
    let pair = launched(&host, &local, "100@internal");

    host.indicate_condition(&pair.owner, ControlKind::Hold, b"jazz").unwrap();
    assert!(host.moh_playing(&pair.owner));
    assert_eq!(host.moh_class(&pair.owner).as_deref(), Some("jazz"));
    assert!(host.drain_frames(&pair.chan).is_empty());

    host.indicate_condition(&pair.owner, ControlKind::Unhold, &[]).unwrap();
    assert!(!host.moh_playing(&pair.owner));
    assert!(host.drain_frames(&pair.chan).is_empty());
}

#[test]
fn hold_without_class_uses_default_music() {
    let (host, local) = setup();
    let pair = launched(&host, &local, "100@internal");

    host.indicate_condition(&pair.owner, ControlKind::Hold, &[]).unwrap();
    assert!(host.moh_playing(&pair.owner));
    assert_eq!(host.moh_class(&pair.owner), None);
}

#[test]
fn moh_passthru_relays_hold() {
    let (host, local) = setup();
    let pair = launched(&host, &local, "100@internal/m");

    host.indicate_condition(&pair.owner, ControlKind::Hold, b"jazz").unwrap();
    host.indicate_condition(&pair.owner, ControlKind::Unhold, &[]).unwrap();

    assert!(!host.moh_playing(&pair.owner));
    assert_eq!(
        host.drain_frames(&pair.chan),
        vec![
            Frame::Control {
                kind: ControlKind::Hold,
                data: b"jazz".to_vec()
            },
            Frame::control(ControlKind::Unhold),
        ]
    );
}

#[test]
fn frames_to_a_departed_peer_are_dropped() {
    let (host, local) = setup();
    let pair = launched(&host, &local, "100@internal/n");
    host.hangup_channel(&pair.owner).unwrap();
    host.drain_frames(&pair.chan);

    host.write_frame(&pair.chan, voice(1)).unwrap();
    assert!(host.drain_frames(&pair.owner).is_empty());
    assert!(local.registry().contains(pair.pvt.id()));
}

#[test]
fn read_yields_null_frame() {
    let (host, local) = setup();
    let pair = create(&host, &local, "100@internal");
    assert_eq!(local.read(&pair.owner), Frame::Null);
    assert_eq!(local.type_name(), "Local");
    assert!(local.capabilities().contains(FormatMask::ULAW | FormatMask::H264));
}
