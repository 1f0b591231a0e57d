//! Tick throughput on a few typical scenes

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use powdersim_core::data::ElementId as E;
use powdersim_core::{LoadMode, Save, SimSettings, Simulation, SlotHint};

/// A block of `element` filling `[x0, x1) x [y0, y1)`
fn fill(sim: &mut Simulation, element: u16, x0: i32, y0: i32, x1: i32, y1: i32) {
    for y in y0..y1 {
        for x in x0..x1 {
            sim.part_create(SlotHint::Auto, x, y, element);
        }
    }
}

fn scene(name: &str) -> Simulation {
    let mut sim = Simulation::new(SimSettings {
        seed: 42,
        ..Default::default()
    });
    match name {
        "sand" => fill(&mut sim, E::DUST, 100, 50, 500, 200),
        "water" => {
            fill(&mut sim, E::GLAS, 80, 300, 520, 310);
            fill(&mut sim, E::WATR, 100, 100, 500, 290);
        }
        "fire" => {
            fill(&mut sim, E::WOOD, 150, 150, 450, 330);
            fill(&mut sim, E::FIRE, 150, 140, 450, 150);
        }
        _ => {}
    }
    sim
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    for name in ["empty", "sand", "water", "fire"] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &name, |b, &name| {
            let mut sim = scene(name);
            b.iter(|| {
                sim.tick();
                black_box(sim.num_parts())
            });
        });
    }
    group.finish();
}

fn bench_save(c: &mut Criterion) {
    let sim = scene("water");
    let save = sim.create_save(0, 0, 612, 384, true);
    let bytes = save.build().unwrap();

    c.bench_function("save_build", |b| b.iter(|| black_box(save.build().unwrap())));
    c.bench_function("save_parse", |b| {
        b.iter(|| black_box(Save::parse(&bytes).unwrap()))
    });
    c.bench_function("save_load", |b| {
        b.iter(|| {
            let mut target = Simulation::default();
            black_box(target.load_save(0, 0, &save, LoadMode::Replace, true))
        })
    });
}

criterion_group!(benches, bench_tick, bench_save);
criterion_main!(benches);
