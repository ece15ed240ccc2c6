use aqua_core::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn build_scenario(id: &str, duration_days: u32) -> Scenario {
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    Scenario {
        id: ScenarioId(id.into()),
        name: id.into(),
        initial_count: 250_000,
        initial_weight_g: 80.0,
        duration_days,
        start_date: start,
        growth: GrowthModelConfig {
            name: "TGC".into(),
            location: "bench".into(),
            tgc: 2.8,
            n1: 1.0,
            n2: 1.0,
            temperature: TemperatureProfile {
                ranges: (0..36)
                    .map(|m| TemperatureRange {
                        start: start + chrono::Days::new(m * 30),
                        end: start + chrono::Days::new(m * 30 + 29),
                        value_c: 6.0 + (m % 12) as f64,
                    })
                    .collect(),
                fill_gaps: false,
                interpolation: InterpolationMethod::None,
                merge_adjacent: true,
            },
        },
        feed: FeedModelConfig {
            name: "FCR".into(),
            basis: StageBasis::Weight,
            segments: vec![
                FcrSegment { stage: StageId("smolt".into()), fcr: 0.9, from: 0.0, to: Some(500.0) },
                FcrSegment { stage: StageId("grow-out".into()), fcr: 1.15, from: 500.0, to: None },
            ],
        },
        mortality: MortalityModelConfig {
            name: "Mortality".into(),
            rate: 0.0003,
            frequency: MortalityFrequency::Daily,
        },
        constraints: Some(BiologicalConstraintSet {
            name: "salmon".into(),
            version: 1,
            active: true,
            bounds: vec![StageBounds {
                temperature_max_c: Some(16.0),
                ..StageBounds::default()
            }],
        }),
        origin: ScenarioOrigin::Manual,
    }
}

fn bench_single(c: &mut Criterion) {
    let s = build_scenario("long", 1_000);
    c.bench_function("projection 1000 days", |b| {
        b.iter(|| {
            let _ = black_box(aqua_runtime::run_projection(&s));
        })
    });
}

fn bench_many(c: &mut Criterion) {
    let scenarios: Vec<Scenario> = (0..32)
        .map(|i| build_scenario(&format!("s{i}"), 540))
        .collect();
    c.bench_function("32 projections x 540 days", |b| {
        b.iter(|| {
            let _ = black_box(aqua_runtime::run_many(&scenarios));
        })
    });
}

criterion_group!(benches, bench_single, bench_many);
criterion_main!(benches);
