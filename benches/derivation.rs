//! Benchmarks for history buffering and snapshot derivation

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use vitalstream::{
    tail_snr_db, DerivationContext, FallbackMetricsDeriver, HistoryBuffer, RawEngineResult,
    RawQuality,
};

fn generate_signal(count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| 0.5 + 0.05 * (i as f64 * 0.25).sin() + ((i * 7) % 10) as f64 * 0.001)
        .collect()
}

fn bench_history(c: &mut Criterion) {
    let mut group = c.benchmark_group("history");
    let signal = generate_signal(3000);

    group.throughput(Throughput::Elements(signal.len() as u64));
    group.bench_function("push_3000_cap_300", |b| {
        b.iter(|| {
            let mut history = HistoryBuffer::new(300).unwrap();
            for &v in &signal {
                history.push(v);
            }
            black_box(history.size());
        })
    });

    let mut history = HistoryBuffer::new(300).unwrap();
    for &v in &signal {
        history.push(v);
    }
    group.bench_function("tail_150", |b| b.iter(|| black_box(history.tail(150))));

    group.finish();
}

fn bench_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("derivation");
    let tail = generate_signal(150);
    let deriver = FallbackMetricsDeriver::new();

    let native = RawEngineResult {
        bpm: 72.0,
        hf: 0.4,
        lf: 0.6,
        total_power: 2.0,
        peak_list: (0..500).step_by(25).collect(),
        quality: RawQuality {
            good_quality: true,
            total_beats: 20,
            rejection_rate: 0.05,
            native_confidence: Some(0.8),
            native_snr_db: Some(6.0),
        },
    };
    let sparse = RawEngineResult {
        bpm: 68.0,
        ..Default::default()
    };
    let ctx = DerivationContext {
        side_confidence: Some(0.3),
        history_tail: Some(&tail),
        buffer_length: 500,
        window_size: 150,
    };

    group.bench_function("native_result", |b| {
        b.iter(|| black_box(deriver.derive(black_box(&native), &ctx)))
    });
    group.bench_function("full_fallback", |b| {
        b.iter(|| black_box(deriver.derive(black_box(&sparse), &ctx)))
    });
    group.bench_function("tail_snr_150", |b| {
        b.iter(|| black_box(tail_snr_db(black_box(&tail))))
    });

    group.finish();
}

criterion_group!(benches, bench_history, bench_derivation);
criterion_main!(benches);
