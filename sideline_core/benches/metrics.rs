use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use sideline_core::SensorMetricsProcessor;
use sideline_core::config::{HeadMotionCfg, SwayCfg};
use sideline_core::metrics::rotation_angle_deg;
use sideline_traits::PoseSample;

// Synthetic head trace: slow sway with jitter and a small yaw oscillation
fn synth_trace(n: usize, jitter_m: f64, seed: u32) -> Vec<PoseSample> {
    let mut state = seed.max(1);
    let mut next_f64 = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        f64::from(x) / (f64::from(u32::MAX) + 1.0)
    };
    (0..n)
        .map(|i| {
            let t = i as f64 / 30.0;
            let dx = 0.015 * (t * 1.3).sin() + (next_f64() * 2.0 - 1.0) * jitter_m;
            let dz = 0.010 * (t * 0.7).cos();
            let half_yaw = (4.0 * (t * 0.5).sin()).to_radians() / 2.0;
            PoseSample::new(
                [dx, 1.6, dz],
                [0.0, half_yaw.sin(), 0.0, half_yaw.cos()],
                (i as u64) * 33,
            )
        })
        .collect()
}

pub fn bench_ingest(c: &mut Criterion) {
    let mut g = c.benchmark_group("metrics_ingest");
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p sideline_core --bench metrics
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(1));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }

    for &n in &[600usize, 9_000] {
        let trace = synth_trace(n, 0.002, 0xC0FFEE);
        g.bench_function(format!("ingest_{n}"), |b| {
            b.iter_batched(
                || SensorMetricsProcessor::new(SwayCfg::default(), HeadMotionCfg::default()),
                |mut p| {
                    for s in &trace {
                        p.ingest(black_box(s));
                    }
                    black_box(p.snapshot());
                },
                BatchSize::SmallInput,
            );
        });
    }
    g.finish();
}

pub fn bench_rotation_angle(c: &mut Criterion) {
    let trace = synth_trace(1_000, 0.0, 7);
    c.bench_function("rotation_angle_deg", |b| {
        b.iter(|| {
            let first = trace[0].orientation;
            let mut acc = 0.0;
            for s in &trace {
                acc += rotation_angle_deg(black_box(&first), black_box(&s.orientation));
            }
            black_box(acc)
        });
    });
}

criterion_group!(benches, bench_ingest, bench_rotation_angle);
criterion_main!(benches);
