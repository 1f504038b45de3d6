use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use pprof::criterion::{Output, PProfProfiler};
use std::time::Duration;

use retrocue_core::{Display as _, Drawable, HueIndex, HueRing, MonitorGeometry, Position};
use retrocue_render::SkiaDisplay;

fn display() -> SkiaDisplay {
    SkiaDisplay::new(MonitorGeometry::default(), HueRing::default()).expect("display")
}

/// Cost of preparing the frames a trial overlaps with its holds.
pub fn bench_frame_preparation(c: &mut Criterion) {
    let mut g = c.benchmark_group("render_frame");
    g.sample_size(40)
        .measurement_time(Duration::from_secs(10))
        .warm_up_time(Duration::from_secs(2));

    g.bench_function("stimulus_frame", |b| {
        let mut d = display();
        let hue = HueIndex::wrapping(120);
        b.iter(|| {
            d.render(&Drawable::Fixation);
            d.render(black_box(&Drawable::Stimulus {
                hue,
                position: Position::Left,
            }));
            d.present();
        });
    });

    // The ring is rasterised once; every frame blits it rotated.
    g.bench_function("response_frame_rotated_wheel", |b| {
        let mut d = display();
        d.render(&Drawable::Wheel { offset: 17 });
        d.present();
        let mut angle = 0.0f32;
        b.iter(|| {
            angle = (angle + 1.3) % 360.0;
            d.render(&Drawable::Wheel { offset: 17 });
            d.render(&Drawable::Marker {
                hue: HueIndex::wrapping((angle - 17.0).floor() as i64),
                angle_deg: black_box(angle),
            });
            d.present();
        });
    });

    g.bench_function("response_frame_first_wheel", |b| {
        b.iter_batched(
            display,
            |mut d| {
                d.render(&Drawable::Wheel { offset: 211 });
                d.present();
                black_box(d.presented_frames());
            },
            BatchSize::LargeInput,
        )
    });

    g.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
        .confidence_level(0.95)
        .noise_threshold(0.02)
        .significance_level(0.05);
    targets = bench_frame_preparation
}

criterion_main!(benches);
