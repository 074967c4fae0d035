//! Benchmarks for SNMP message encoding/decoding

use airguard::snmp::{if_speed_oid, sys_up_time_oid, Message, SnmpValue};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn generate_requests(count: usize) -> Vec<Message> {
    (0..count)
        .map(|i| {
            let oids = [sys_up_time_oid(), if_speed_oid(1 + (i % 48) as u32)];
            Message::get_request("public", i as i32, &oids)
        })
        .collect()
}

fn bench_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("encoding");

    let requests = generate_requests(1000);
    group.throughput(Throughput::Elements(1000));

    group.bench_function("encode_1000_get_requests", |b| {
        b.iter(|| {
            for request in &requests {
                black_box(request.encode());
            }
        })
    });

    group.finish();
}

fn bench_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("decoding");

    // Setup - encode responses first
    let responses: Vec<Vec<u8>> = generate_requests(1000)
        .into_iter()
        .map(|request| {
            let varbinds = request
                .pdu
                .varbinds
                .into_iter()
                .map(|(oid, _)| (oid, SnmpValue::Gauge32(1_000_000_000)))
                .collect();
            Message::response(&request.community, request.pdu.request_id, varbinds).encode()
        })
        .collect();

    group.throughput(Throughput::Elements(1000));

    group.bench_function("decode_1000_responses", |b| {
        b.iter(|| {
            for bytes in &responses {
                black_box(Message::decode(bytes).ok());
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_encoding, bench_decoding);
criterion_main!(benches);
