use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rsolv_evr::{rpmvercmp, Evr, Relation};

fn bench_rpmvercmp(c: &mut Criterion) {
    let cases = [
        ("1.2.3", "1.2.4"),
        ("2.4.6", "2.4.6"),
        ("1.0~rc1", "1.0"),
        ("1.0^git20240101", "1.0"),
        ("5.14.0.427.13.1.el9_4", "5.14.0.427.16.1.el9_4"),
        ("20240101", "20231231"),
        ("1.0a", "1.0b"),
    ];

    c.bench_function("rpmvercmp", |b| {
        b.iter(|| {
            for (a, bver) in cases {
                black_box(rpmvercmp(black_box(a), black_box(bver)));
            }
        })
    });
}

fn bench_parse(c: &mut Criterion) {
    let evrs = ["1.0", "2:4.18.0-553.el8", "0.9.1-0.1.rc2.fc40", "3.12.1-2"];

    c.bench_function("parse_evr", |b| {
        b.iter(|| {
            for evr in evrs {
                black_box(Evr::parse(black_box(evr)).ok());
            }
        })
    });
}

fn bench_intersects(c: &mut Criterion) {
    let requirement = Relation::parse("glibc >= 2.34").unwrap();
    let provides: Vec<Relation> = ["glibc = 2.34-100.el9", "glibc = 2.28-236.el8", "glibc"]
        .iter()
        .map(|p| Relation::parse(p).unwrap())
        .collect();

    c.bench_function("relation_intersects", |b| {
        b.iter(|| {
            for provide in &provides {
                black_box(requirement.intersects(black_box(provide)));
            }
        })
    });
}

criterion_group!(benches, bench_rpmvercmp, bench_parse, bench_intersects);
criterion_main!(benches);
