use std::time::Duration;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use glam::Vec3;
use survival::game::probe::{LineProbe, Level};
use survival::game::rpc::RpcEnvelope;
use survival::game::tick::tick;
use survival::game::types::PickupType;
use survival::{GameConfig, ServerRpc, World};

const FRAME: Duration = Duration::from_micros(16_667);

fn populated_world(players: usize) -> World {
    let mut level = Level::flat(0.0);
    level.spawn_points = (0..players)
        .map(|i| Vec3::new(i as f32 * 300.0, 0.0, 90.0))
        .collect();
    let mut world = World::new(GameConfig::default(), level, 42);
    for _ in 0..players {
        let controller = world.add_controller();
        let _ = world.post_login(controller);
    }
    for i in 0..64 {
        world.spawn_pickup(PickupType::Water, None, Vec3::new(i as f32 * 50.0, 800.0, 20.0));
    }
    world
}

fn bench_idle_tick(c: &mut Criterion) {
    let mut world = populated_world(16);
    c.bench_function("idle_tick_16_players", |bencher| {
        bencher.iter(|| black_box(tick(&mut world, &[], FRAME)))
    });
}

fn bench_request_tick(c: &mut Criterion) {
    let mut world = populated_world(16);
    let requests: Vec<RpcEnvelope> = world
        .controllers
        .keys()
        .map(|&caller| RpcEnvelope { caller, rpc: ServerRpc::Jump })
        .collect();
    c.bench_function("request_tick_16_players", |bencher| {
        bencher.iter(|| black_box(tick(&mut world, &requests, FRAME)))
    });
}

fn bench_line_probe(c: &mut Criterion) {
    let world = populated_world(16);
    let scene = world.scene();
    let start = Vec3::new(-100.0, 800.0, 20.0);
    let end = Vec3::new(4000.0, 800.0, 20.0);
    c.bench_function("line_probe_80_actors", |bencher| {
        bencher.iter(|| black_box(LineProbe::probe(&scene, black_box(start), black_box(end), None)))
    });
}

fn bench_replicate(c: &mut Criterion) {
    let world = populated_world(16);
    let observer = *world.controllers.keys().next().unwrap();
    c.bench_function("replicate_for_observer", |bencher| {
        bencher.iter(|| black_box(world.replicate_for(observer)))
    });
}

criterion_group!(benches, bench_idle_tick, bench_request_tick, bench_line_probe, bench_replicate);
criterion_main!(benches);
