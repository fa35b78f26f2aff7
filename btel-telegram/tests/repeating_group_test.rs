//! 重复组功能测试
//!
//! 验证计数字段与实例个数的一致性维护

use btel_telegram::schema::catalog;
use btel_telegram::{Packet, PacketNode, RepeatingGroup};

/// 取数据包中的第一个重复组
fn first_group_mut(packet: &mut Packet) -> &mut RepeatingGroup {
    for node in packet.nodes_mut() {
        if let PacketNode::Group(group) = node {
            return group;
        }
    }
    panic!("packet has no repeating group");
}

fn first_group(packet: &Packet) -> &RepeatingGroup {
    for node in packet.nodes() {
        if let PacketNode::Group(group) = node {
            return group;
        }
    }
    panic!("packet has no repeating group");
}

#[test]
fn test_count_change_materializes_instances() {
    // 1. 构建坡度剖面数据包，初始计数为0
    let mut packet = Packet::from_spec(&catalog::packet_21()).unwrap();
    assert_eq!(first_group(&packet).instances().len(), 0);

    // 2. 计数置为3后应有3个独立实例
    packet.set_field_value("N_ITER", 3).unwrap();
    assert_eq!(first_group(&packet).instances().len(), 3);

    // 3. 新实例必须是全零值
    for instance in first_group(&packet).instances() {
        for node in instance {
            if let PacketNode::Field(field) = node {
                assert_eq!(field.decimal_value(), 0, "new instance must be zero-valued");
            }
        }
    }
}

#[test]
fn test_shrink_preserves_prefix_and_grow_adds_zeros() {
    let mut packet = Packet::from_spec(&catalog::packet_21()).unwrap();
    packet.set_field_value("N_ITER", 5).unwrap();

    // 1. 给前两个实例写入可区分的值
    {
        let group = first_group_mut(&mut packet);
        for (index, value) in [(0usize, 111u64), (1usize, 222u64)] {
            let instance = group.instance_mut(index).unwrap();
            let field = instance
                .iter_mut()
                .find_map(|node| node.find_field_mut("D_GRADIENT"))
                .unwrap();
            field.set_decimal_value(value).unwrap();
        }
    }

    // 2. 收缩到2：尾部实例被丢弃，前两个保持不变
    packet.set_field_value("N_ITER", 2).unwrap();
    {
        let group = first_group(&packet);
        assert_eq!(group.instances().len(), 2);
        let d0 = group.instances()[0]
            .iter()
            .find_map(|node| node.find_field("D_GRADIENT"))
            .unwrap();
        let d1 = group.instances()[1]
            .iter()
            .find_map(|node| node.find_field("D_GRADIENT"))
            .unwrap();
        assert_eq!(d0.decimal_value(), 111, "shrink must preserve instance 0");
        assert_eq!(d1.decimal_value(), 222, "shrink must preserve instance 1");
    }

    // 3. 再增长到4：重新补充的实例为全零
    packet.set_field_value("N_ITER", 4).unwrap();
    {
        let group = first_group(&packet);
        assert_eq!(group.instances().len(), 4);
        let d2 = group.instances()[2]
            .iter()
            .find_map(|node| node.find_field("D_GRADIENT"))
            .unwrap();
        assert_eq!(d2.decimal_value(), 0, "regrown instance must be zero-valued");
        let d0 = group.instances()[0]
            .iter()
            .find_map(|node| node.find_field("D_GRADIENT"))
            .unwrap();
        assert_eq!(d0.decimal_value(), 111);
    }
}

#[test]
fn test_instances_do_not_alias() {
    let mut packet = Packet::from_spec(&catalog::packet_21()).unwrap();
    packet.set_field_value("N_ITER", 2).unwrap();

    // 修改实例0不得影响实例1或模板
    {
        let group = first_group_mut(&mut packet);
        let instance = group.instance_mut(0).unwrap();
        let field = instance
            .iter_mut()
            .find_map(|node| node.find_field_mut("G_A"))
            .unwrap();
        field.set_decimal_value(42).unwrap();
    }
    let group = first_group(&packet);
    let other = group.instances()[1]
        .iter()
        .find_map(|node| node.find_field("G_A"))
        .unwrap();
    assert_eq!(other.decimal_value(), 0, "instances must not share field state");
    let template_field = group.template()
        .iter()
        .find_map(|node| node.find_field("G_A"))
        .unwrap();
    assert_eq!(template_field.decimal_value(), 0, "template must stay zero-valued");
}

#[test]
fn test_contributed_length_follows_count() {
    // 坡度条目每实例 15+1+8 = 24 位
    let mut packet = Packet::from_spec(&catalog::packet_21()).unwrap();
    let base_len = packet.contributed_bits().len();

    packet.set_field_value("N_ITER", 3).unwrap();
    let grown_len = packet.contributed_bits().len();
    assert_eq!(grown_len, base_len + 3 * 24);
}

#[test]
fn test_nested_groups_in_speed_profile() {
    // 数据包27的外层组模板中嵌套了内层速度差异组
    let mut packet = Packet::from_spec(&catalog::packet_27()).unwrap();
    let base_len = packet.contributed_bits().len();

    // 外层计数置2：每个外层实例 15+7+1+5 = 28 位（内层计数为0）
    let outer = packet
        .nodes_mut()
        .iter_mut()
        .filter_map(|node| match node {
            PacketNode::Group(group) => Some(group),
            _ => None,
        })
        .nth(1)
        .unwrap();
    outer.set_count(2).unwrap();
    assert_eq!(outer.instances().len(), 2);

    // 给外层实例0的内层组计数置3：增加 3×13 位
    {
        let instance = outer.instance_mut(0).unwrap();
        let inner = instance
            .iter_mut()
            .find_map(|node| match node {
                PacketNode::Group(group) => Some(group),
                _ => None,
            })
            .unwrap();
        inner.set_count(3).unwrap();
        assert_eq!(inner.instances().len(), 3);
    }

    let grown_len = packet.contributed_bits().len();
    assert_eq!(grown_len, base_len + 2 * 28 + 3 * 13);
}

#[test]
fn test_clone_gives_independent_tree() {
    let mut packet = Packet::from_spec(&catalog::packet_21()).unwrap();
    packet.set_field_value("N_ITER", 2).unwrap();
    packet.set_field_value("D_GRADIENT", 1000).unwrap();

    let copy = packet.clone();
    packet.set_field_value("D_GRADIENT", 2000).unwrap();

    assert_eq!(copy.find_field("D_GRADIENT").unwrap().decimal_value(), 1000);
    assert_eq!(packet.find_field("D_GRADIENT").unwrap().decimal_value(), 2000);
}
