//! Конкурентные брони пересекающихся мест: выигрывает ровно одна.
//!
//! Тесты гоняются с выключенной предварительной проверкой тоже, чтобы
//! арбитром гарантированно было ограничение хранилища, а не снимок доступности.

mod common;

use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Barrier;

use common::{app_with, customer, test_config, venue_with_event};
use seat_booking::error::AppError;

async fn race(precheck: bool, contenders: usize, seat_sets: impl Fn(usize, &[i64]) -> Vec<i64>) {
    let mut config = test_config();
    config.booking.precheck = precheck;
    let app = app_with(config);
    let (_, event, seats) = venue_with_event(&app.state, 3, 10).await;
    let seat_ids: Vec<i64> = seats.iter().map(|s| s.id).collect();
    let event_id = event.id;

    let barrier = Arc::new(Barrier::new(contenders));
    let handles = (0..contenders).map(|i| {
        let state = app.state.clone();
        let barrier = barrier.clone();
        let wanted = seat_sets(i, &seat_ids);
        tokio::spawn(async move {
            barrier.wait().await;
            let result = state
                .bookings
                .create_booking(&customer(100 + i as i64), event_id, &wanted)
                .await;
            (wanted, result)
        })
    });

    let outcomes: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let winners: Vec<_> = outcomes.iter().filter(|(_, r)| r.is_ok()).collect();
    assert_eq!(winners.len(), 1, "exactly one booking must win");
    for (_, result) in outcomes.iter().filter(|(_, r)| r.is_err()) {
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    // Билеты только победителя и ни одного места дважды
    let (wanted, winner) = winners[0];
    let booking = winner.as_ref().unwrap();
    assert_eq!(app.store.booking_count().unwrap(), 1);
    assert_eq!(app.store.ticket_count().unwrap(), wanted.len());

    let booked: HashSet<i64> = booking.tickets.iter().map(|t| t.seat.id).collect();
    assert_eq!(booked, wanted.iter().copied().collect());

    let availability = app.state.availability.compute(event_id).await.unwrap();
    assert_eq!(availability.booked_seats, wanted.len());
    assert_eq!(availability.available_seats + availability.booked_seats, 30);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_pairs_storage_arbitrates() {
    race(false, 2, |i, seats| vec![seats[i], seats[i + 1]]).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_pairs_with_precheck() {
    race(true, 2, |i, seats| vec![seats[i], seats[i + 1]]).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn many_contenders_for_one_seat() {
    race(false, 32, |i, seats| vec![seats[0], seats[1 + i % 20]]).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn many_contenders_for_one_seat_with_precheck() {
    race(true, 32, |_, seats| vec![seats[5]]).await;
}
