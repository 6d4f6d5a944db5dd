//! Codec benchmarks for roomcast-protocol.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use roomcast_protocol::{codec, ChatMessage, ClientFrame, ServerFrame};

fn relayed(text: &str) -> ServerFrame {
    ServerFrame::message(ChatMessage {
        id: "m_1700000000000_4242".to_string(),
        from: "Al".to_string(),
        text: text.to_string(),
        ts: 1_700_000_000_000,
    })
}

fn bench_encode_message(c: &mut Criterion) {
    let frame = relayed(&"x".repeat(64));

    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Bytes(64));
    group.bench_function("message_64B", |b| b.iter(|| codec::encode(black_box(&frame))));
    group.finish();
}

fn bench_decode_message(c: &mut Criterion) {
    let inbound = serde_json::to_string(&ClientFrame::Message {
        id: None,
        text: "x".repeat(64),
    })
    .unwrap();

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(inbound.len() as u64));
    group.bench_function("message_64B", |b| {
        b.iter(|| codec::decode(black_box(&inbound)))
    });
    group.finish();
}

fn bench_relay_hop(c: &mut Criterion) {
    // Decode an inbound message and encode the outbound broadcast frame,
    // the per-message work of a full relay hop.
    let inbound = serde_json::to_string(&ClientFrame::Message {
        id: Some("c-1".to_string()),
        text: "x".repeat(256),
    })
    .unwrap();

    c.bench_function("relay_hop_256B", |b| {
        b.iter(|| {
            let frame = codec::decode(black_box(&inbound)).unwrap();
            match frame {
                ClientFrame::Message { id, text } => {
                    codec::encode(&relayed(&text)).unwrap();
                    black_box(id)
                }
                _ => unreachable!(),
            }
        })
    });
}

criterion_group!(benches, bench_encode_message, bench_decode_message, bench_relay_hop);
criterion_main!(benches);
