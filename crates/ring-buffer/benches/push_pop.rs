use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ring_buffer::RingBuffer;

fn push_pop(c: &mut Criterion) {
    let record = "2024-02-29 10:00:00,VALUE1,21.50";
    let mut buffer = RingBuffer::new(4096);
    let mut scratch = [0u8; 193];

    c.bench_function("push_pop_record", |b| {
        b.iter(|| {
            buffer.push(black_box(record)).unwrap();
            black_box(buffer.pop_into(&mut scratch).unwrap());
        })
    });
}

criterion_group!(benches, push_pop);
criterion_main!(benches);
