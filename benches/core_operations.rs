use criterion::{black_box, criterion_group, criterion_main, Criterion, BenchmarkId};
use nxresolve::rank::rank;
use nxresolve::{Candidate, PackageSource, normalize_name, score_match};

fn bench_score_match(c: &mut Criterion) {
    let hits = vec![
        ("ripgrep", "legacyPackages.aarch64-darwin.ripgrep", "ripgrep"),
        ("ripgrep", "legacyPackages.aarch64-darwin.ripgrep-all", "ripgrep-all"),
        ("pyyaml", "legacyPackages.aarch64-darwin.python313Packages.pyyaml", "pyyaml"),
        ("redis", "legacyPackages.aarch64-darwin.chickenPackages.eggs.redis", ""),
        ("sdl2", "legacyPackages.aarch64-darwin.SDL2", "SDL2"),
    ];

    c.bench_function("score_match", |b| {
        b.iter(|| {
            for (term, attr, pname) in &hits {
                let _ = score_match(black_box(term), black_box(attr), black_box(pname));
            }
        })
    });
}

fn bench_normalize_name(c: &mut Criterion) {
    c.bench_function("normalize_name", |b| {
        b.iter(|| {
            for name in ["nvim", "rg", "py-yaml", "Firefox", "unmapped-tool"] {
                let _ = normalize_name(black_box(name));
            }
        })
    });
}

fn candidates(count: usize) -> Vec<Candidate> {
    let sources = [
        PackageSource::Nixpkgs,
        PackageSource::Nur,
        PackageSource::FlakeInput,
        PackageSource::Homebrew,
        PackageSource::Cask,
    ];
    (0..count)
        .map(|i| Candidate {
            attr: Some(format!("pkg-{}", i % (count / 2).max(1))),
            confidence: (i % 10) as f64 / 10.0,
            ..Candidate::new("pkg", sources[i % sources.len()])
        })
        .collect()
}

fn bench_rank_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank");

    for size in [10, 100, 1000] {
        let input = candidates(size);
        group.bench_with_input(BenchmarkId::new("candidates", size), &input, |b, input| {
            b.iter(|| rank(black_box(input.clone()), false))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_score_match, bench_normalize_name, bench_rank_sizes);
criterion_main!(benches);
