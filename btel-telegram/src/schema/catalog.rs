//! 标准变量与数据包目录
//!
//! 按信号规范定义应答器报文的变量位宽、含义映射与数据包结构。
//! 构造函数供内置注册表和自定义模式作者使用。

use btel_core::schema_meta::{CountryBand, FieldKind, FieldSpec, NodeSpec, PacketSpec};

fn plain(name: &str, width: u32, description: &str) -> FieldSpec {
    FieldSpec::new(name, width, description, FieldKind::Plain)
}

fn flag(name: &str, width: u32, description: &str, labels: &[(u64, &str)]) -> FieldSpec {
    FieldSpec::new(
        name,
        width,
        description,
        FieldKind::Flag {
            labels: labels
                .iter()
                .map(|(value, label)| (*value, label.to_string()))
                .collect(),
        },
    )
}

fn sentinel(name: &str, width: u32, description: &str, special: &[(u64, &str)]) -> FieldSpec {
    FieldSpec::new(
        name,
        width,
        description,
        FieldKind::Sentinel {
            special: special
                .iter()
                .map(|(value, label)| (*value, label.to_string()))
                .collect(),
        },
    )
}

/// 数据包标识字段
pub fn nid_packet() -> FieldSpec {
    plain("NID_PACKET", 8, "Packet identifier")
}

/// 有效方向字段
pub fn q_dir() -> FieldSpec {
    flag(
        "Q_DIR",
        2,
        "Validity direction",
        &[(0, "Reverse"), (1, "Nominal"), (2, "Both directions")],
    )
}

/// 数据包位长字段，编码时自动重算
pub fn l_packet() -> FieldSpec {
    plain("L_PACKET", 13, "Packet length in bits")
}

/// 距离/长度分辨率字段
pub fn q_scale() -> FieldSpec {
    flag(
        "Q_SCALE",
        2,
        "Distance resolution",
        &[(0, "10 cm"), (1, "1 m"), (2, "10 m")],
    )
}

/// 速度字段：7位，步长5 km/h，最大值表示无限制
pub fn v_field(name: &str, description: &str) -> FieldSpec {
    FieldSpec::new(name, 7, description, FieldKind::Speed)
}

/// 加速度字段：6位，步长0.05 m/s²
pub fn a_field(name: &str, description: &str) -> FieldSpec {
    FieldSpec::new(name, 6, description, FieldKind::Acceleration)
}

/// 重复次数字段
pub fn n_iter() -> FieldSpec {
    plain("N_ITER", 5, "Number of iterations")
}

/// 国家/地区代码字段
pub fn nid_c() -> FieldSpec {
    let bands = [
        (0, 63, "Reserved / test"),
        (64, 127, "United Kingdom"),
        (128, 191, "France"),
        (192, 255, "Germany"),
        (256, 319, "Italy"),
        (320, 383, "Switzerland"),
        (384, 447, "Austria"),
        (448, 511, "Spain"),
        (512, 575, "Sweden"),
        (576, 639, "Poland"),
    ];
    FieldSpec::new(
        "NID_C",
        10,
        "Country or region identity",
        FieldKind::CountryCode {
            bands: bands
                .iter()
                .map(|(from, to, name)| CountryBand {
                    from: *from,
                    to: *to,
                    name: name.to_string(),
                })
                .collect(),
        },
    )
}

/// 应答器组标识字段
pub fn nid_bg() -> FieldSpec {
    sentinel(
        "NID_BG",
        14,
        "Balise group identity",
        &[(16383, "unknown")],
    )
}

/// 帧头字段组：每条报文起始处的50位应答器信息
pub fn header_spec() -> PacketSpec {
    PacketSpec {
        packet_id: None,
        name: "Balise header".to_string(),
        description: "Balise group information preceding the packets".to_string(),
        nodes: vec![
            NodeSpec::Field(flag(
                "Q_UPDOWN",
                1,
                "Transmission direction",
                &[(0, "Down link (train to track)"), (1, "Up link (track to train)")],
            )),
            NodeSpec::Field(plain("M_VERSION", 7, "Language version of the telegram")),
            NodeSpec::Field(flag(
                "Q_MEDIA",
                1,
                "Transmission medium",
                &[(0, "Balise"), (1, "Loop")],
            )),
            NodeSpec::Field(flag(
                "N_PIG",
                3,
                "Position in the balise group",
                &[
                    (0, "1st"),
                    (1, "2nd"),
                    (2, "3rd"),
                    (3, "4th"),
                    (4, "5th"),
                    (5, "6th"),
                    (6, "7th"),
                    (7, "8th"),
                ],
            )),
            NodeSpec::Field(flag(
                "N_TOTAL",
                3,
                "Number of balises in the group",
                &[
                    (0, "1 balise"),
                    (1, "2 balises"),
                    (2, "3 balises"),
                    (3, "4 balises"),
                    (4, "5 balises"),
                    (5, "6 balises"),
                    (6, "7 balises"),
                    (7, "8 balises"),
                ],
            )),
            NodeSpec::Field(flag(
                "M_DUP",
                2,
                "Duplication marker",
                &[
                    (0, "No duplicates"),
                    (1, "Duplicate of the next balise"),
                    (2, "Duplicate of the previous balise"),
                ],
            )),
            NodeSpec::Field(sentinel(
                "M_MCOUNT",
                8,
                "Message counter",
                &[(254, "Never fits telegrams"), (255, "Fits with all telegrams")],
            )),
            NodeSpec::Field(nid_c()),
            NodeSpec::Field(nid_bg()),
            NodeSpec::Field(flag(
                "Q_LINK",
                1,
                "Link status",
                &[(0, "Unlinked"), (1, "Linked")],
            )),
        ],
    }
}

/// 链接条目：数据包5正文与其重复组模板共用的节点序列
fn linking_entry() -> Vec<NodeSpec> {
    vec![
        NodeSpec::Field(plain("D_LINK", 15, "Distance to the linked balise group")),
        NodeSpec::Field(flag(
            "Q_NEWCOUNTRY",
            1,
            "Country change marker",
            &[(0, "Same country"), (1, "New country")],
        )),
        NodeSpec::Conditional {
            inner: Box::new(NodeSpec::Field(nid_c())),
            condition_field: "Q_NEWCOUNTRY".to_string(),
            required_value: 1,
        },
        NodeSpec::Field(nid_bg()),
        NodeSpec::Field(flag(
            "Q_LINKORIENTATION",
            1,
            "Orientation of the linked group",
            &[(0, "Reverse direction"), (1, "Nominal direction")],
        )),
        NodeSpec::Field(flag(
            "Q_LINKREACTION",
            2,
            "Reaction when the linked group is not found",
            &[
                (0, "Train trip"),
                (1, "Apply service brake"),
                (2, "No reaction"),
            ],
        )),
        NodeSpec::Field(plain("Q_LOCACC", 6, "Location accuracy of the balise group")),
    ]
}

/// 数据包5：链接信息
pub fn packet_5() -> PacketSpec {
    let mut nodes = vec![
        NodeSpec::Field(q_dir()),
        NodeSpec::Field(l_packet()),
        NodeSpec::Field(q_scale()),
    ];
    nodes.extend(linking_entry());
    nodes.push(NodeSpec::Group {
        count: n_iter(),
        template: linking_entry(),
    });
    PacketSpec {
        packet_id: Some(5),
        name: "Linking".to_string(),
        description: "Linking information for consecutive balise groups".to_string(),
        nodes,
    }
}

/// 坡度条目
fn gradient_entry() -> Vec<NodeSpec> {
    vec![
        NodeSpec::Field(plain("D_GRADIENT", 15, "Distance to the next gradient change")),
        NodeSpec::Field(flag(
            "Q_GDIR",
            1,
            "Gradient direction",
            &[(0, "Downhill"), (1, "Uphill")],
        )),
        NodeSpec::Field(sentinel(
            "G_A",
            8,
            "Gradient amplitude in per mille",
            &[(255, "End of profile")],
        )),
    ]
}

/// 数据包21：坡度剖面
pub fn packet_21() -> PacketSpec {
    let mut nodes = vec![
        NodeSpec::Field(q_dir()),
        NodeSpec::Field(l_packet()),
        NodeSpec::Field(q_scale()),
    ];
    nodes.extend(gradient_entry());
    nodes.push(NodeSpec::Group {
        count: n_iter(),
        template: gradient_entry(),
    });
    PacketSpec {
        packet_id: Some(21),
        name: "Gradient profile".to_string(),
        description: "Track gradient profile".to_string(),
        nodes,
    }
}

/// 速度差异子组：不同列车类别的速度限制
fn speed_difference_group() -> NodeSpec {
    NodeSpec::Group {
        count: n_iter(),
        template: vec![
            NodeSpec::Field(plain("Q_DIFF", 2, "Kind of the specific speed category")),
            NodeSpec::Field(plain("NC_DIFF", 4, "Specific speed category identity")),
            NodeSpec::Field(v_field("V_DIFF", "Speed limit for the specific category")),
        ],
    }
}

/// 数据包27：静态速度剖面
pub fn packet_27() -> PacketSpec {
    PacketSpec {
        packet_id: Some(27),
        name: "International static speed profile".to_string(),
        description: "Static speed profile with category differences".to_string(),
        nodes: vec![
            NodeSpec::Field(q_dir()),
            NodeSpec::Field(l_packet()),
            NodeSpec::Field(q_scale()),
            NodeSpec::Field(plain("D_STATIC", 15, "Distance to the next speed change")),
            NodeSpec::Field(v_field("V_STATIC", "Static speed limit")),
            NodeSpec::Field(flag(
                "Q_FRONT",
                1,
                "Train length delay on speed increase",
                &[(0, "Train length delay"), (1, "No train length delay")],
            )),
            speed_difference_group(),
            NodeSpec::Group {
                count: n_iter(),
                template: vec![
                    NodeSpec::Field(plain("D_STATIC", 15, "Distance to the next speed change")),
                    NodeSpec::Field(v_field("V_STATIC", "Static speed limit")),
                    NodeSpec::Field(flag(
                        "Q_FRONT",
                        1,
                        "Train length delay on speed increase",
                        &[(0, "Train length delay"), (1, "No train length delay")],
                    )),
                    speed_difference_group(),
                ],
            },
        ],
    }
}

/// 等级转换条目
fn level_transition_entry() -> Vec<NodeSpec> {
    vec![
        NodeSpec::Field(flag(
            "M_LEVELTR",
            3,
            "Level to switch to",
            &[
                (0, "Level 0"),
                (1, "Level NTC"),
                (2, "Level 1"),
                (3, "Level 2"),
                (4, "Level 3"),
            ],
        )),
        NodeSpec::Conditional {
            inner: Box::new(NodeSpec::Field(plain(
                "NID_STM",
                8,
                "National system identity",
            ))),
            condition_field: "M_LEVELTR".to_string(),
            required_value: 1,
        },
        NodeSpec::Field(plain(
            "L_ACKLEVELTR",
            15,
            "Length of the acknowledgement area",
        )),
    ]
}

/// 数据包41：等级转换命令
pub fn packet_41() -> PacketSpec {
    let mut nodes = vec![
        NodeSpec::Field(q_dir()),
        NodeSpec::Field(l_packet()),
        NodeSpec::Field(q_scale()),
        NodeSpec::Field(plain("D_LEVELTR", 15, "Distance to the level transition")),
    ];
    nodes.extend(level_transition_entry());
    nodes.push(NodeSpec::Group {
        count: n_iter(),
        template: level_transition_entry(),
    });
    PacketSpec {
        packet_id: Some(41),
        name: "Level transition order".to_string(),
        description: "Order to switch between control levels".to_string(),
        nodes,
    }
}

/// 结束标志的数据包标识值
pub const END_OF_INFORMATION: u8 = 255;

/// 内置数据包定义
pub fn builtin_packets() -> Vec<PacketSpec> {
    vec![packet_5(), packet_21(), packet_27(), packet_41()]
}
