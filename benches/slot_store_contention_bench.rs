/*
Measures SlotStore under the access pattern it is built for: one writer thread
(the receiver) alternating slots while several reader threads (consumer ticks)
snapshot both slots. Compares reader counts to show what the single coarse lock
costs as readers are added.
*/

use criterion::{
    criterion_group,
    criterion_main,
    Criterion,
    BenchmarkId,
};

use glam::{Quat, Vec3};
use motion_ingest::ingest::{
    packet::{MotionSample, PlayerSlot},
    slot_store::SlotStore,
};
use std::{
    hint::black_box,
    sync::Arc,
    thread,
};

//Reader threads contending with the single writer
const READER_COUNTS: &[usize] = &[1, 2, 4, 8];

//Operations per thread per iteration
const OPS_PER_THREAD: usize = 20_000;

fn sample(slot: PlayerSlot, seq: usize) -> Arc<MotionSample> {
    Arc::new(MotionSample {
        timestamp: seq as f64,
        device_id: "bench".into(),
        slot,
        orientation: Quat::IDENTITY,
        angular_velocity: Vec3::ZERO,
        linear_acceleration: Vec3::ZERO,
    })
}

fn bench_slot_store_contention(c: &mut Criterion) {
    let mut group = c.benchmark_group("slot_store_one_writer_many_readers");

    for &readers in READER_COUNTS {
        group.bench_with_input(
            BenchmarkId::from_parameter(readers),
            &readers,
            |b, &readers| {
                let store = Arc::new(SlotStore::new());
                // Samples are built up front so the writer measures put(), not allocation.
                let samples: Arc<Vec<_>> = Arc::new(
                    (0..OPS_PER_THREAD)
                        .map(|i| {
                            let slot = if i % 2 == 0 { PlayerSlot::One } else { PlayerSlot::Two };
                            (slot, sample(slot, i))
                        })
                        .collect(),
                );

                b.iter(|| {
                    let mut handles = Vec::with_capacity(readers + 1);

                    {
                        let store = store.clone();
                        let samples = samples.clone();
                        handles.push(thread::spawn(move || {
                            for (slot, s) in samples.iter() {
                                store.put(*slot, s.clone());
                            }
                        }));
                    }

                    for _ in 0..readers {
                        let store = store.clone();
                        handles.push(thread::spawn(move || {
                            for i in 0..OPS_PER_THREAD {
                                let slot = if i % 2 == 0 { PlayerSlot::One } else { PlayerSlot::Two };
                                black_box(store.get(slot));
                            }
                        }));
                    }

                    for h in handles {
                        let _ = h.join();
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_slot_store_contention);
criterion_main!(benches);
