//! 条件字段功能测试
//!
//! 验证条件字段的出现/缺席行为与作用域解析

use btel_telegram::schema::catalog;
use btel_telegram::{Packet, PacketNode, TelegramCodec};

#[test]
fn test_unmet_condition_contributes_no_bits() {
    // 数据包5正文：Q_NEWCOUNTRY 为0时 NID_C 不出现在位流中
    let mut packet = Packet::from_spec(&catalog::packet_5()).unwrap();
    let without = packet.contributed_bits().len();

    packet.set_field_value("Q_NEWCOUNTRY", 1).unwrap();
    let with = packet.contributed_bits().len();

    // NID_C 宽度为10位
    assert_eq!(with, without + 10);
}

#[test]
fn test_absent_field_reported_distinct_from_zero() {
    let packet = Packet::from_spec(&catalog::packet_5()).unwrap();
    let snapshot_fields = {
        let mut telegram = btel_telegram::Telegram::new().unwrap();
        telegram.push_packet(packet);
        telegram.snapshot().packets[0].fields.clone()
    };

    // 条件未满足：NID_C 以缺席状态出现，而不是值为0的普通字段
    let nid_c = snapshot_fields
        .iter()
        .find(|field| field.name == "NID_C")
        .unwrap();
    assert!(!nid_c.present);
    assert_eq!(nid_c.label, "absent");
    assert_eq!(nid_c.bits, "");
}

#[test]
fn test_met_condition_shows_field_value() {
    let mut packet = Packet::from_spec(&catalog::packet_5()).unwrap();
    packet.set_field_value("Q_NEWCOUNTRY", 1).unwrap();
    packet.set_field_value("NID_C", 200).unwrap();

    let mut telegram = btel_telegram::Telegram::new().unwrap();
    telegram.push_packet(packet);
    let snapshot = telegram.snapshot();

    let nid_c = snapshot.packets[0]
        .fields
        .iter()
        .find(|field| field.name == "NID_C")
        .unwrap();
    assert!(nid_c.present);
    assert_eq!(nid_c.decimal, 200);
    assert_eq!(nid_c.label, "Germany (200)");
}

#[test]
fn test_instance_local_condition_resolution() {
    // 重复组实例内的条件字段引用同一实例的 Q_NEWCOUNTRY，
    // 各实例独立评估
    let mut packet = Packet::from_spec(&catalog::packet_5()).unwrap();
    packet.set_field_value("N_ITER", 2).unwrap();

    let base_len = packet.contributed_bits().len();

    // 仅实例1的 Q_NEWCOUNTRY 置1
    for node in packet.nodes_mut() {
        if let PacketNode::Group(group) = node {
            let instance = group.instance_mut(1).unwrap();
            let field = instance
                .iter_mut()
                .find_map(|n| n.find_field_mut("Q_NEWCOUNTRY"))
                .unwrap();
            field.set_decimal_value(1).unwrap();
        }
    }

    // 只有实例1多出10位的 NID_C
    assert_eq!(packet.contributed_bits().len(), base_len + 10);
}

#[test]
fn test_conditional_round_trip_through_codec() {
    println!("=== 条件字段编解码往返测试 ===");

    // 1. 构建带条件字段的等级转换数据包
    let mut packet = Packet::from_spec(&catalog::packet_41()).unwrap();
    packet.set_field_value("D_LEVELTR", 500).unwrap();
    // M_LEVELTR = 1 (Level NTC) 使 NID_STM 出现
    packet.set_field_value("M_LEVELTR", 1).unwrap();
    packet.set_field_value("NID_STM", 9).unwrap();

    let mut telegram = btel_telegram::Telegram::new().unwrap();
    telegram.push_packet(packet);

    // 2. 编码再解码
    let codec = TelegramCodec::new();
    let hex = codec.encode(&mut telegram).unwrap();
    println!("编码结果: {} 个十六进制字符", hex.len());
    let report = codec.decode(&hex);
    assert!(report.checksum_ok, "round trip must keep the checksum valid");
    let decoded = report.telegram.unwrap();

    // 3. 条件字段的值与存在性保持不变
    let packet = &decoded.packets()[0];
    assert_eq!(packet.packet_id(), Some(41));
    assert_eq!(packet.find_field("NID_STM").unwrap().decimal_value(), 9);
    assert_eq!(decoded, telegram, "decoded tree must equal the encoded tree");

    // 4. 条件改为不满足后重新往返，NID_STM 不再出现于位流
    let mut telegram2 = decoded;
    telegram2.packets_mut()[0]
        .set_field_value("M_LEVELTR", 2)
        .unwrap();
    let hex2 = codec.encode(&mut telegram2).unwrap();
    let report2 = codec.decode(&hex2);
    let decoded2 = report2.telegram.unwrap();
    let snapshot = decoded2.snapshot();
    let nid_stm = snapshot.packets[0]
        .fields
        .iter()
        .find(|field| field.name == "NID_STM")
        .unwrap();
    assert!(!nid_stm.present, "NID_STM must be absent after the level change");
    println!("✓ 条件字段往返测试完成");
}
