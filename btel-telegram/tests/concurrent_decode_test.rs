//! 并发解码测试
//!
//! 共享模式树的并发修改不安全，规定的隔离手段是按线程克隆。
//! 验证克隆树在多线程下重复解码/编码的结果一致性。

use std::sync::Arc;
use std::thread;

use btel_telegram::schema::catalog;
use btel_telegram::{Packet, Telegram, TelegramCodec};

fn fixture() -> Telegram {
    let mut telegram = Telegram::new().unwrap();
    telegram.header_mut().set_field_value("NID_BG", 4095).unwrap();
    let mut linking = Packet::from_spec(&catalog::packet_5()).unwrap();
    linking.set_field_value("N_ITER", 3).unwrap();
    linking.set_field_value("D_LINK", 12345).unwrap();
    telegram.push_packet(linking);
    telegram
}

#[test]
fn test_concurrent_decode_produces_identical_trees() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 50;

    let codec = Arc::new(TelegramCodec::new());
    let hex = {
        let mut telegram = fixture();
        codec.encode(&mut telegram).unwrap()
    };

    // 每个线程反复解码同一输入，各自持有独立的树
    let mut handles = Vec::new();
    for _ in 0..THREADS {
        let codec = Arc::clone(&codec);
        let hex = hex.clone();
        handles.push(thread::spawn(move || {
            let mut last = None;
            for _ in 0..ROUNDS {
                let report = codec.decode(&hex);
                assert!(report.checksum_ok);
                last = Some(report.telegram.unwrap().snapshot());
            }
            last.unwrap()
        }));
    }

    let snapshots: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();
    for snapshot in &snapshots[1..] {
        assert_eq!(snapshot, &snapshots[0], "all threads must decode identical values");
    }
}

#[test]
fn test_cloned_trees_encode_identically_across_threads() {
    const THREADS: usize = 4;

    let codec = Arc::new(TelegramCodec::new());
    let hex = {
        let mut telegram = fixture();
        codec.encode(&mut telegram).unwrap()
    };
    let decoded = codec.decode(&hex).telegram.unwrap();

    // 按线程克隆后独立编码，结果必须逐字节一致
    let mut handles = Vec::new();
    for _ in 0..THREADS {
        let codec = Arc::clone(&codec);
        let mut clone = decoded.clone();
        handles.push(thread::spawn(move || codec.encode(&mut clone).unwrap()));
    }
    for handle in handles {
        assert_eq!(handle.join().unwrap(), hex);
    }
}
