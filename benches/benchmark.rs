use std::hint::black_box;
use std::path::Path;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};

use placeresolver::cache::set_cache_enabled;
use placeresolver::date::RecordDate;
use placeresolver::range::{PrimitiveRange, split_overlapping_ranges};
use placeresolver::registry::Registry;
use placeresolver::resolve::Resolver;
use placeresolver::towns::build_towns;

const PLACES: [&str; 6] = [
    "Budapest, Pest megye, Magyarország",
    "Kőbánya, Budapest, Pest megye, Magyarország",
    "Cegléd, Pest, Pilis és Solt törvényesen egyesült vármegyék, Magyarország",
    "Kolozsvár, Kolozs vármegye, Magyarország",
    "Debreczen",
    "Pozsony, Pozsony vármegye, Magyarország",
];

fn registry() -> Registry {
    Registry::load_dir(&Path::new(env!("CARGO_MANIFEST_DIR")).join("data")).expect("bundled data loads")
}

fn bench_ranges(c: &mut Criterion) {
    let entries: Vec<(PrimitiveRange, usize)> = (0..200)
        .filter_map(|i| PrimitiveRange::from_tuple(Some(1700 + i), Some(1750 + i * 2)).map(|r| (r, i as usize)))
        .collect();
    c.bench_function("split_overlapping_ranges_200", |b| {
        b.iter(|| black_box(split_overlapping_ranges(black_box(&entries))))
    });
}

fn bench_town_database(c: &mut Criterion) {
    let registry = registry();
    c.bench_function("build_towns_bundled", |b| {
        b.iter(|| black_box(build_towns(registry.countries().map(|country| country.as_ref()))))
    });
}

fn bench_resolution(c: &mut Criterion) {
    let resolver = Resolver::new(Arc::new(registry()));
    let date = RecordDate::Year(1890);
    c.bench_function("resolve_places_cached", |b| {
        b.iter(|| {
            for place in PLACES {
                black_box(resolver.get_valid_county_by_town_and_year(place, Some(&date)));
            }
        })
    });
    set_cache_enabled(false);
    c.bench_function("resolve_places_uncached", |b| {
        b.iter(|| {
            for place in PLACES {
                black_box(resolver.get_valid_county_by_town_and_year(place, Some(&date)));
            }
        })
    });
    set_cache_enabled(true);
}

criterion_group!(benches, bench_ranges, bench_town_database, bench_resolution);
criterion_main!(benches);
