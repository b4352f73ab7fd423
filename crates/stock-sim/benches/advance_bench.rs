use criterion::{criterion_group, criterion_main, Criterion};
use stock_core::{
    CostParams, EngineConfig, GrowthParams, Lot, LotId, Registry, SizeClassKey, SpeciesKey,
    SpeciesSpec,
};

fn context() -> stock_sim::SimContext {
    let species = vec![SpeciesSpec {
        key: SpeciesKey("truite-arc".into()),
        name: "Truite Arc-en-ciel".into(),
        latin: None,
        default_prices: None,
        growth: GrowthParams {
            asymptotic_weight_g: 4200.0,
            rate_k: 0.0045,
        },
        cost: CostParams {
            cost_high: 14.0,
            cost_min: 6.2,
            cost_mature: 7.5,
            optimal_weight_g: 300.0,
        },
    }];
    let lots = (1..=48)
        .map(|i| Lot {
            id: LotId(i),
            name: format!("L{i}"),
            species: SpeciesKey("truite-arc".into()),
            size_class: SizeClassKey("e200400".into()),
            quantity: 300.0,
            current_weight_g: 50.0 * i as f64,
            cost_price_per_kg: 7.8,
            sale_price_per_kg: 9.5,
            to_remove: false,
        })
        .collect();
    stock_sim::SimContext::new(
        Registry::new(species, vec![]).unwrap(),
        lots,
        EngineConfig::default(),
        chrono::NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
    )
    .unwrap()
}

fn bench_advance(c: &mut Criterion) {
    let mut ctx = context();
    c.bench_function("advance_30_days", |b| {
        b.iter(|| {
            let _ = stock_sim::advance(&mut ctx, 30);
            let _ = stock_sim::advance(&mut ctx, -30);
        })
    });
}

fn bench_report(c: &mut Criterion) {
    let ctx = context();
    c.bench_function("stock_report", |b| b.iter(|| stock_sim::report(&ctx)));
}

criterion_group!(benches, bench_advance, bench_report);
criterion_main!(benches);
