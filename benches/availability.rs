use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::HashSet;

use seat_booking::models::Seat;
use seat_booking::services::availability::partition;
use seat_booking::services::catalog::generate_seats;

fn venue(rows: i32, cols: i32) -> Vec<Seat> {
    generate_seats(rows, cols)
        .into_iter()
        .enumerate()
        .map(|(i, seat)| Seat {
            id: i as i64 + 1,
            venue_id: 1,
            row: seat.row,
            number: seat.number,
        })
        .collect()
}

fn bench_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition");

    for (rows, cols) in [(5, 10), (26, 40), (26, 100)] {
        let seats = venue(rows, cols);
        // Занята каждая третья
        let booked: HashSet<i64> = seats.iter().filter(|s| s.id % 3 == 0).map(|s| s.id).collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(seats.len()),
            &(seats, booked),
            |b, (seats, booked)| b.iter(|| partition(black_box(1), black_box(seats), black_box(booked))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_partition);
criterion_main!(benches);
