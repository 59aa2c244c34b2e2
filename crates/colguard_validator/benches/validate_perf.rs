use colguard_protocol::{Column, DataType, Table, Value};
use colguard_schema::{Check, ColumnSpec, Schema};
use colguard_validator::Validator;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const ROWS: usize = 50_000;
const COLUMNS: usize = 8;
const THREADS: &[usize] = &[1, 2, 4];

fn fixture() -> (Schema, Table) {
    let specs = (0..COLUMNS).map(|i| {
        ColumnSpec::new(format!("c{}", i), DataType::Int64)
            .coerce(i % 2 == 0)
            .with_check(Check::ge(0))
            .with_check(Check::lt(ROWS as i64))
    });
    let schema = Schema::declare("bench", specs).expect("bench schema");

    let columns = (0..COLUMNS)
        .map(|i| {
            let values = (0..ROWS)
                .map(|row| {
                    if i % 2 == 0 {
                        Value::String(row.to_string())
                    } else {
                        Value::Int64(row as i64)
                    }
                })
                .collect();
            Column::new(format!("c{}", i), values)
        })
        .collect();
    let table = Table::new(columns).expect("bench table");
    (schema, table)
}

fn bench_validate(c: &mut Criterion) {
    let (schema, table) = fixture();
    let mut group = c.benchmark_group("validate_lazy");
    group.throughput(Throughput::Elements((ROWS * COLUMNS) as u64));
    group.sample_size(20);

    for &threads in THREADS {
        let validator = Validator::lazy().with_threads(threads);
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, _| {
            b.iter(|| validator.validate(&schema, &table).expect("valid table"))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_validate);
criterion_main!(benches);
