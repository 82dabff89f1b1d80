//! Steady-state append/drain throughput at several chunk sizes.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pipe::{pipe, PipeOptions};

const ROUNDS: usize = 16;

fn pipe_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("append_drain");
    for chunk_size in [256usize, 4 * 1024, 64 * 1024] {
        let payload = vec![0xa5u8; chunk_size];
        group.throughput(Throughput::Bytes((chunk_size * ROUNDS) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            &payload,
            |b, payload| {
                b.iter(|| {
                    let (writer, reader) = pipe(PipeOptions::new());
                    let mut out = vec![0u8; payload.len()];
                    for _ in 0..ROUNDS {
                        writer.append(payload).expect("append succeeds");
                        let mut drained = 0;
                        while drained < out.len() {
                            drained += reader.read(&mut out[drained..]).expect("read succeeds");
                        }
                    }
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, pipe_throughput);
criterion_main!(benches);
