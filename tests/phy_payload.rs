use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use lorawan_phy::lorawan::mac::commands::{
    AdrParamSetupReq, BeaconFreqAns, BeaconFreqReq, BeaconTimingAns, ChannelAns, DevStatusAns,
    DeviceClass, DeviceMode, DeviceTimeAns, DlChannelAns, DlChannelReq, DutyCycleReq,
    ForceRejoinReq, LinkAdrAns, LinkAdrReq, LinkCheckAns, MinorVersion, NewChannelReq,
    PingSlotChannelReq, PingSlotInfoReq, RejoinParamSetupAns, RejoinParamSetupReq,
    RxParamSetupAns, RxParamSetupReq, RxTimingSetupReq, TxParamSetupReq,
};
use lorawan_phy::lorawan::{
    CfList, DevAddr, DevNonce, DlSettings, Eui64, FCtrl, FHdr, JoinAcceptPayload,
    JoinRequestPayload, MHdr, MType, MacPayload, Mic, NetId, RejoinRequestPayload,
};
use lorawan_phy::{marshal, marshal_mac, unmarshal, unmarshal_mac, Error, MacCommand, Message, Payload};

#[test]
fn test_unconfirmed_uplink_scenario() {
    let data = [
        0x40, // MHDR
        0x11, 0x22, 0x33, 0x44, // DevAddr
        0x00, // FCtrl
        0x05, 0x00, // FCnt
        0x01, // FPort
        0x01, // FRMPayload
        0xAA, 0xBB, 0xCC, 0xDD, // MIC
    ];
    let msg = unmarshal(&data).unwrap();
    assert_eq!(msg.m_hdr.m_type, MType::UnconfirmedDataUp);
    let pld = msg.mac_payload().unwrap();
    assert_eq!(pld.f_hdr.dev_addr.as_bytes(), &[0x44, 0x33, 0x22, 0x11]);
    assert_eq!(pld.f_hdr.f_cnt, 5);
    assert_eq!(pld.f_port, 1);
    assert_eq!(pld.frm_payload, vec![0x01]);
    assert_eq!(msg.mic, Some(Mic([0xAA, 0xBB, 0xCC, 0xDD])));

    assert_eq!(marshal(&msg).unwrap(), data.to_vec());
}

#[test]
fn test_join_request_scenario() {
    let msg = Message {
        m_hdr: MHdr::new(MType::JoinRequest),
        payload: Payload::JoinRequest(JoinRequestPayload {
            join_eui: "0102030405060708".parse().unwrap(),
            dev_eui: "1122334455667788".parse().unwrap(),
            dev_nonce: "ABCD".parse().unwrap(),
        }),
        mic: Some(Mic([0x10, 0x20, 0x30, 0x40])),
    };
    let b = marshal(&msg).unwrap();
    assert_eq!(
        hex::encode_upper(&b),
        "0008070605040302018877665544332211CDAB10203040"
    );
    assert_eq!(unmarshal(&b).unwrap(), msg);
}

#[test]
fn test_link_adr_req_scenario() {
    let mut channel_mask = [false; 16];
    channel_mask[..4].fill(true);
    let cmds = vec![MacCommand::LinkAdrReq(LinkAdrReq {
        data_rate_index: 3,
        tx_power_index: 2,
        channel_mask,
        channel_mask_control: 0,
        nb_trans: 1,
    })];
    let b = marshal_mac(&cmds, false).unwrap();
    assert_eq!(b, vec![0x03, 0x32, 0x0F, 0x00, 0x01]);
    assert_eq!(unmarshal_mac(&b, false).unwrap(), cmds);
}

#[test]
fn test_device_time_ans_scenario() {
    let time = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap() + Duration::milliseconds(125);
    let cmds = vec![MacCommand::DeviceTimeAns(DeviceTimeAns { time })];
    let b = marshal_mac(&cmds, false).unwrap();
    // GPS seconds 1261872018 (0x4B36A392), fraction 0.125 * 256
    assert_eq!(b, vec![0x0D, 0x92, 0xA3, 0x36, 0x4B, 0x20]);
    assert_eq!(unmarshal_mac(&b, false).unwrap(), cmds);
}

#[test]
fn test_join_accept_cf_list_scenario() {
    let freqs = vec![867_100_000, 867_300_000, 867_500_000, 867_700_000, 867_900_000];
    let mut b = Vec::new();
    CfList::Frequencies(freqs.clone()).append_lorawan(&mut b).unwrap();
    assert_eq!(b.len(), 16);
    assert_eq!(
        b,
        vec![
            0x18, 0x4F, 0x84, // 867.1 MHz
            0xE8, 0x56, 0x84, // 867.3 MHz
            0xB8, 0x5E, 0x84, // 867.5 MHz
            0x88, 0x66, 0x84, // 867.7 MHz
            0x58, 0x6E, 0x84, // 867.9 MHz
            0x00, // CFListType
        ]
    );

    let pld = JoinAcceptPayload {
        net_id: NetId([0x00, 0x00, 0x13]),
        dev_addr: DevAddr::from(0x260B1234),
        dl_settings: DlSettings {
            opt_neg: false,
            rx1_dr_offset: 1,
            rx2_dr: 0,
        },
        rx_delay: 1,
        cf_list: Some(CfList::Frequencies(freqs)),
        ..Default::default()
    };
    let mut plaintext = Vec::new();
    pld.append_plaintext(&mut plaintext).unwrap();
    assert_eq!(plaintext.len(), 28);
    assert_eq!(&plaintext[12..], &b[..]);

    // Simulate reception: the air frame is ciphertext, the caller decrypts it.
    let mut air = vec![0x20];
    air.extend_from_slice(&[0x77; 32]);
    let mut msg = unmarshal(&air).unwrap();
    plaintext.extend_from_slice(&[0x01, 0x02, 0x03, 0x04]);
    msg.apply_decrypted_join_accept(&plaintext).unwrap();
    match &msg.payload {
        Payload::JoinAccept(decoded) => {
            assert_eq!(decoded.encrypted, vec![0x77; 32]);
            assert_eq!(decoded.cf_list, pld.cf_list);
            assert_eq!(decoded.dev_addr, pld.dev_addr);
        }
        _ => panic!("Expected JoinAccept payload"),
    }
    assert_eq!(msg.mic, Some(Mic([0x01, 0x02, 0x03, 0x04])));
}

#[test]
fn test_short_data_frame_scenario() {
    let data = [0x40, 0x11, 0x22, 0x33, 0x44, 0x00, 0x05, 0x00, 0xAA, 0xBB, 0xCC];
    assert_eq!(
        unmarshal(&data),
        Err(Error::LengthMismatch {
            field: "PHYPayload",
            want: 12,
            got: 11
        })
    );
}

#[test]
fn test_join_accept_round_trip_keeps_ciphertext() {
    for n in [16, 32] {
        let msg = Message {
            m_hdr: MHdr::new(MType::JoinAccept),
            payload: Payload::JoinAccept(JoinAcceptPayload {
                encrypted: (0..n as u8).collect(),
                ..Default::default()
            }),
            mic: None,
        };
        let b = marshal(&msg).unwrap();
        assert_eq!(b.len(), 1 + n);
        assert_eq!(unmarshal(&b).unwrap(), msg);
    }
}

#[test]
fn test_join_request_wrong_length() {
    let data = [0x00; 22];
    assert_eq!(
        unmarshal(&data),
        Err(Error::LengthMismatch {
            field: "PHYPayload",
            want: 23,
            got: 22
        })
    );
}

#[test]
fn test_proprietary_is_opaque() {
    let data = [0xE0, 0xDE, 0xAD, 0xBE, 0xEF];
    let msg = unmarshal(&data).unwrap();
    assert_eq!(msg.payload, Payload::Proprietary(vec![0xDE, 0xAD, 0xBE, 0xEF]));
    assert_eq!(msg.mic, None);
    assert_eq!(marshal(&msg).unwrap(), data.to_vec());
}

#[test]
fn test_direction_sensitivity() {
    // FCtrl = ADRAckReq | ClassB/FPending
    let data = [0x40, 0x01, 0x00, 0x00, 0x00, 0x50, 0x00, 0x00, 0xAA, 0xBB, 0xCC, 0xDD];
    let up = unmarshal(&data).unwrap();
    let up_ctrl = up.mac_payload().unwrap().f_hdr.f_ctrl;
    assert!(up_ctrl.adr_ack_req && up_ctrl.class_b && !up_ctrl.f_pending);

    // Same bytes read as a downlink frame
    let mut down_data = data;
    down_data[0] = 0x60;
    let down = unmarshal(&down_data).unwrap();
    let down_ctrl = down.mac_payload().unwrap().f_hdr.f_ctrl;
    assert!(!down_ctrl.adr_ack_req && !down_ctrl.class_b && down_ctrl.f_pending);

    // Re-encoding as downlink drops ADRAckReq
    assert_eq!(marshal(&down).unwrap()[5], 0x10);
}

#[test]
fn test_fopts_mac_commands_in_frame() {
    let fopts = marshal_mac(
        &[
            MacCommand::LinkAdrAns(LinkAdrAns {
                channel_mask_ack: true,
                data_rate_index_ack: true,
                tx_power_index_ack: true,
            }),
            MacCommand::DevStatusAns(DevStatusAns {
                battery: 254,
                margin: -5,
            }),
        ],
        true,
    )
    .unwrap();
    let msg = Message {
        m_hdr: MHdr::new(MType::ConfirmedDataUp),
        payload: Payload::Mac(MacPayload {
            f_hdr: FHdr {
                dev_addr: DevAddr::from(0x260B1234),
                f_ctrl: FCtrl::default(),
                f_cnt: 1,
                f_opts: fopts,
            },
            f_port: 0,
            frm_payload: vec![],
        }),
        mic: Some(Mic::default()),
    };
    let b = marshal(&msg).unwrap();
    // MHDR + FHDR(7 + 5) + MIC
    assert_eq!(b.len(), 17);
    let decoded = unmarshal(&b).unwrap();
    let cmds = decoded.mac_payload().unwrap().f_hdr.mac_commands(true).unwrap();
    assert_eq!(cmds.len(), 2);
    assert_eq!(cmds[1].name(), "DevStatusAns");
}

#[test]
fn test_unknown_cid_keeps_raw_tail() {
    let b = [0x02, 0x80, 0x01, 0x02, 0x03];
    let cmds = unmarshal_mac(&b, true).unwrap();
    assert_eq!(
        cmds,
        vec![
            MacCommand::LinkCheckReq,
            MacCommand::Raw {
                cid: 0x80,
                payload: vec![0x01, 0x02, 0x03]
            }
        ]
    );
    assert_eq!(marshal_mac(&cmds, true).unwrap(), b.to_vec());
}

#[test]
fn test_message_json_round_trip() {
    let msg = unmarshal(&[
        0x80, 0x34, 0x12, 0x0B, 0x26, 0xA2, 0x0A, 0x00, 0x02, 0x02, 0x07, 0xAA, 0xBB, 0xCC, 0xDD,
    ])
    .unwrap();
    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("\"260B1234\""));
    let back: Message = serde_json::from_str(&json).unwrap();
    assert_eq!(back, msg);
}

fn data_message() -> impl Strategy<Value = Message> {
    (
        prop::sample::select(vec![
            MType::UnconfirmedDataUp,
            MType::UnconfirmedDataDown,
            MType::ConfirmedDataUp,
            MType::ConfirmedDataDown,
        ]),
        any::<[u8; 4]>(),
        any::<[bool; 5]>(),
        any::<u16>(),
        prop::collection::vec(any::<u8>(), 0..=15),
        any::<u8>(),
        prop::collection::vec(any::<u8>(), 0..64),
        any::<[u8; 4]>(),
    )
        .prop_map(|(m_type, dev_addr, bits, f_cnt, f_opts, f_port, frm_payload, mic)| {
            let up = m_type.is_uplink();
            Message {
                m_hdr: MHdr::new(m_type),
                payload: Payload::Mac(MacPayload {
                    f_hdr: FHdr {
                        dev_addr: DevAddr(dev_addr),
                        f_ctrl: FCtrl {
                            adr: bits[0],
                            adr_ack_req: up && bits[1],
                            ack: bits[2],
                            class_b: up && bits[3],
                            f_pending: !up && bits[4],
                        },
                        f_cnt: f_cnt as u32,
                        f_opts,
                    },
                    f_port,
                    frm_payload,
                }),
                mic: Some(Mic(mic)),
            }
        })
}

fn rejoin_message() -> impl Strategy<Value = Message> {
    (0u8..=2, any::<[u8; 3]>(), any::<u64>(), any::<u64>(), any::<u16>(), any::<[u8; 4]>()).prop_map(
        |(rejoin_type, net_id, join_eui, dev_eui, rejoin_cnt, mic)| {
            let mut pld = RejoinRequestPayload {
                rejoin_type,
                dev_eui: Eui64::from(dev_eui),
                rejoin_cnt: rejoin_cnt as u32,
                ..Default::default()
            };
            if rejoin_type == 1 {
                pld.join_eui = Eui64::from(join_eui);
            } else {
                pld.net_id = NetId(net_id);
            }
            Message {
                m_hdr: MHdr::new(MType::RejoinRequest),
                payload: Payload::RejoinRequest(pld),
                mic: Some(Mic(mic)),
            }
        },
    )
}

fn frequency() -> impl Strategy<Value = u32> {
    (1_000u32..=0xFF_FFFF).prop_map(|units| units * 100)
}

fn frequency_or_zero() -> impl Strategy<Value = u32> {
    prop_oneof![Just(0), frequency()]
}

fn minor_version() -> impl Strategy<Value = MinorVersion> {
    (0u8..16).prop_map(|minor_version| MinorVersion { minor_version })
}

fn device_mode() -> impl Strategy<Value = DeviceMode> {
    prop::sample::select(vec![DeviceClass::A, DeviceClass::B, DeviceClass::C])
        .prop_map(|class| DeviceMode { class })
}

fn channel_ans() -> impl Strategy<Value = ChannelAns> {
    any::<[bool; 2]>().prop_map(|a| ChannelAns {
        frequency_ack: a[0],
        data_rate_ack: a[1],
    })
}

/// Whole seconds between the GPS epoch and 2096, plus a whole number of
/// 1/256 s steps, so the fractional byte carries the sub-second part exactly.
fn device_time() -> impl Strategy<Value = chrono::DateTime<Utc>> {
    (315_964_800i64..4_000_000_000, 0i64..256).prop_map(|(unix, steps)| {
        Utc.timestamp_opt(unix, 0).unwrap() + Duration::nanoseconds(steps * 3_906_250)
    })
}

fn uplink_command() -> impl Strategy<Value = MacCommand> {
    prop_oneof![
        minor_version().prop_map(MacCommand::ResetInd),
        Just(MacCommand::LinkCheckReq),
        any::<[bool; 3]>().prop_map(|a| {
            MacCommand::LinkAdrAns(LinkAdrAns {
                channel_mask_ack: a[0],
                data_rate_index_ack: a[1],
                tx_power_index_ack: a[2],
            })
        }),
        Just(MacCommand::DutyCycleAns),
        any::<[bool; 3]>().prop_map(|a| {
            MacCommand::RxParamSetupAns(RxParamSetupAns {
                rx2_frequency_ack: a[0],
                rx2_data_rate_index_ack: a[1],
                rx1_data_rate_offset_ack: a[2],
            })
        }),
        (any::<u8>(), -32i8..=31).prop_map(|(battery, margin)| {
            MacCommand::DevStatusAns(DevStatusAns { battery, margin })
        }),
        channel_ans().prop_map(MacCommand::NewChannelAns),
        Just(MacCommand::RxTimingSetupAns),
        Just(MacCommand::TxParamSetupAns),
        any::<[bool; 2]>().prop_map(|a| {
            MacCommand::DlChannelAns(DlChannelAns {
                channel_frequency_ack: a[0],
                uplink_frequency_exists_ack: a[1],
            })
        }),
        minor_version().prop_map(MacCommand::RekeyInd),
        Just(MacCommand::AdrParamSetupAns),
        Just(MacCommand::DeviceTimeReq),
        any::<bool>().prop_map(|max_time_exponent_ack| {
            MacCommand::RejoinParamSetupAns(RejoinParamSetupAns { max_time_exponent_ack })
        }),
        (0u8..8).prop_map(|period| MacCommand::PingSlotInfoReq(PingSlotInfoReq { period })),
        channel_ans().prop_map(MacCommand::PingSlotChannelAns),
        Just(MacCommand::BeaconTimingReq),
        any::<bool>().prop_map(|frequency_ack| {
            MacCommand::BeaconFreqAns(BeaconFreqAns { frequency_ack })
        }),
        device_mode().prop_map(MacCommand::DeviceModeInd),
    ]
}

fn downlink_command() -> impl Strategy<Value = MacCommand> {
    prop_oneof![
        minor_version().prop_map(MacCommand::ResetConf),
        (0u8..=254, any::<u8>()).prop_map(|(margin, gateway_count)| {
            MacCommand::LinkCheckAns(LinkCheckAns {
                margin,
                gateway_count,
            })
        }),
        (0u8..16, 0u8..16, any::<[bool; 16]>(), 0u8..8, 0u8..16).prop_map(
            |(data_rate_index, tx_power_index, channel_mask, channel_mask_control, nb_trans)| {
                MacCommand::LinkAdrReq(LinkAdrReq {
                    data_rate_index,
                    tx_power_index,
                    channel_mask,
                    channel_mask_control,
                    nb_trans,
                })
            }
        ),
        (0u8..16).prop_map(|max_duty_cycle| MacCommand::DutyCycleReq(DutyCycleReq { max_duty_cycle })),
        (0u8..8, 0u8..16, frequency()).prop_map(
            |(rx1_data_rate_offset, rx2_data_rate_index, rx2_frequency)| {
                MacCommand::RxParamSetupReq(RxParamSetupReq {
                    rx1_data_rate_offset,
                    rx2_data_rate_index,
                    rx2_frequency,
                })
            }
        ),
        Just(MacCommand::DevStatusReq),
        (any::<u8>(), frequency_or_zero(), 0u8..16, 0u8..16).prop_map(
            |(channel_index, frequency, min_data_rate_index, max_data_rate_index)| {
                MacCommand::NewChannelReq(NewChannelReq {
                    channel_index,
                    frequency,
                    min_data_rate_index,
                    max_data_rate_index,
                })
            }
        ),
        (0u8..16).prop_map(|delay| MacCommand::RxTimingSetupReq(RxTimingSetupReq { delay })),
        (0u8..16, any::<[bool; 2]>()).prop_map(|(max_eirp_index, dwell)| {
            MacCommand::TxParamSetupReq(TxParamSetupReq {
                max_eirp_index,
                uplink_dwell_time: dwell[0],
                downlink_dwell_time: dwell[1],
            })
        }),
        (any::<u8>(), frequency()).prop_map(|(channel_index, frequency)| {
            MacCommand::DlChannelReq(DlChannelReq {
                channel_index,
                frequency,
            })
        }),
        minor_version().prop_map(MacCommand::RekeyConf),
        (0u8..16, 0u8..16).prop_map(|(adr_ack_limit_exponent, adr_ack_delay_exponent)| {
            MacCommand::AdrParamSetupReq(AdrParamSetupReq {
                adr_ack_limit_exponent,
                adr_ack_delay_exponent,
            })
        }),
        device_time().prop_map(|time| MacCommand::DeviceTimeAns(DeviceTimeAns { time })),
        (0u8..8, 0u8..16, 0u8..8, 0u8..8).prop_map(
            |(rejoin_type, data_rate_index, max_retries, period_exponent)| {
                MacCommand::ForceRejoinReq(ForceRejoinReq {
                    rejoin_type,
                    data_rate_index,
                    max_retries,
                    period_exponent,
                })
            }
        ),
        (0u8..16, 0u8..16).prop_map(|(max_time_exponent, max_count_exponent)| {
            MacCommand::RejoinParamSetupReq(RejoinParamSetupReq {
                max_time_exponent,
                max_count_exponent,
            })
        }),
        Just(MacCommand::PingSlotInfoAns),
        (frequency_or_zero(), 0u8..16).prop_map(|(frequency, data_rate_index)| {
            MacCommand::PingSlotChannelReq(PingSlotChannelReq {
                frequency,
                data_rate_index,
            })
        }),
        (any::<u16>(), any::<u8>()).prop_map(|(delay, channel_index)| {
            MacCommand::BeaconTimingAns(BeaconTimingAns {
                delay,
                channel_index,
            })
        }),
        frequency_or_zero().prop_map(|frequency| MacCommand::BeaconFreqReq(BeaconFreqReq { frequency })),
        device_mode().prop_map(MacCommand::DeviceModeConf),
    ]
}

/// Up to five channels; zero marks an unused slot but never ends the list.
fn cf_list_frequencies() -> impl Strategy<Value = CfList> {
    prop::collection::vec(frequency_or_zero(), 0..=5).prop_map(|mut freqs| {
        while freqs.last() == Some(&0) {
            freqs.pop();
        }
        CfList::Frequencies(freqs)
    })
}

proptest! {
    #[test]
    fn prop_data_frame_round_trip(msg in data_message()) {
        let b = marshal(&msg).unwrap();
        let pld = msg.mac_payload().unwrap();
        let port_len = if pld.f_port != 0 || !pld.frm_payload.is_empty() {
            1 + pld.frm_payload.len()
        } else {
            0
        };
        prop_assert_eq!(b.len(), 1 + 7 + pld.f_hdr.f_opts.len() + port_len + 4);
        prop_assert_eq!(unmarshal(&b).unwrap(), msg);
    }

    #[test]
    fn prop_join_request_round_trip(join_eui in any::<u64>(), dev_eui in any::<u64>(), nonce in any::<u16>(), mic in any::<[u8; 4]>()) {
        let msg = Message {
            m_hdr: MHdr::new(MType::JoinRequest),
            payload: Payload::JoinRequest(JoinRequestPayload {
                join_eui: Eui64::from(join_eui),
                dev_eui: Eui64::from(dev_eui),
                dev_nonce: DevNonce::from(nonce),
            }),
            mic: Some(Mic(mic)),
        };
        let b = marshal(&msg).unwrap();
        prop_assert_eq!(b.len(), 23);
        prop_assert_eq!(unmarshal(&b).unwrap(), msg);
    }

    #[test]
    fn prop_rejoin_request_round_trip(msg in rejoin_message()) {
        let b = marshal(&msg).unwrap();
        let want = match &msg.payload {
            Payload::RejoinRequest(p) if p.rejoin_type == 1 => 24,
            _ => 19,
        };
        prop_assert_eq!(b.len(), want);
        prop_assert_eq!(unmarshal(&b).unwrap(), msg);
    }

    #[test]
    fn prop_mac_stream_closure_uplink(cmds in prop::collection::vec(uplink_command(), 0..8)) {
        let b = marshal_mac(&cmds, true).unwrap();
        prop_assert_eq!(unmarshal_mac(&b, true).unwrap(), cmds);
    }

    #[test]
    fn prop_mac_stream_closure_downlink(cmds in prop::collection::vec(downlink_command(), 0..8)) {
        let b = marshal_mac(&cmds, false).unwrap();
        prop_assert_eq!(unmarshal_mac(&b, false).unwrap(), cmds);
    }

    #[test]
    fn prop_cf_list_round_trip(cf_list in prop_oneof![
        cf_list_frequencies(),
        prop::collection::vec(any::<bool>(), 96).prop_map(CfList::ChannelMasks),
    ]) {
        let mut b = Vec::new();
        cf_list.append_lorawan(&mut b).unwrap();
        prop_assert_eq!(b.len(), 16);
        prop_assert_eq!(CfList::unmarshal_lorawan(&b).unwrap(), cf_list);
    }

    #[test]
    fn prop_decode_never_panics(b in prop::collection::vec(any::<u8>(), 0..64)) {
        let _ = unmarshal(&b);
        let _ = unmarshal_mac(&b, true);
        let _ = unmarshal_mac(&b, false);
    }
}
