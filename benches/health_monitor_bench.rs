//! # 端点健康监控性能基准测试
//!
//! 测试记录路径和快照路径的开销

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use dashboard_relay::health::EndpointHealthMonitor;
use std::hint::black_box;

const ENDPOINTS: [&str; 5] = ["broker", "trades", "strategies", "gates", "activity"];

/// 单线程记录
fn bench_record(c: &mut Criterion) {
    let monitor = EndpointHealthMonitor::new(20);
    let mut tick: u64 = 0;

    c.bench_function("health_record", |b| {
        b.iter(|| {
            tick = tick.wrapping_add(1);
            let endpoint = ENDPOINTS[(tick % 5) as usize];
            monitor.record(black_box(endpoint), tick % 7 != 0, black_box(tick % 250));
        });
    });
}

/// 不同窗口容量下的快照
fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("health_snapshot");
    for capacity in [20_usize, 200, 2_000] {
        let monitor = EndpointHealthMonitor::new(capacity);
        for i in 0..(capacity as u64 * 2) {
            for endpoint in ENDPOINTS {
                monitor.record(endpoint, i % 3 != 0, i % 400);
            }
        }

        group.bench_with_input(BenchmarkId::from_parameter(capacity), &monitor, |b, monitor| {
            b.iter(|| black_box(monitor.snapshot()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_record, bench_snapshot);
criterion_main!(benches);
