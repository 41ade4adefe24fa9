//! Showtime uniqueness and movie schedules.

#![allow(clippy::expect_used)]

mod common;

use common::TestApp;
use movie_booking::error::AppError;
use movie_booking::models::{EntityStatus, NewMovieSchedule};

const OWNER: i64 = 100;
const OTHER_OWNER: i64 = 200;

#[tokio::test]
async fn one_active_showtime_per_slot() {
    let app = TestApp::start().await;
    let venue = app.venue(OWNER).await;
    let movie = app.movie().await;
    let slot = TestApp::new_showtime(movie.id, venue.screen.id, 18);

    let first = app.schedules.add_showtime(OWNER, &slot).await.expect("first");

    let duplicate = app.schedules.add_showtime(OWNER, &slot).await;
    assert!(matches!(duplicate, Err(AppError::AlreadyExists(_))));

    // Another hour on the same screen is a different slot
    app.schedules
        .add_showtime(OWNER, &TestApp::new_showtime(movie.id, venue.screen.id, 21))
        .await
        .expect("later slot");

    app.schedules.delete_showtime(OWNER, first.id).await.expect("delete");
    assert!(matches!(app.schedules.showtime(first.id).await, Err(AppError::NotFound(_))));

    let again = app.schedules.add_showtime(OWNER, &slot).await.expect("slot freed");
    assert_ne!(again.id, first.id);

    let listed = app.schedules.list_showtimes_by_movie(movie.id).await.expect("list");
    let ids: Vec<i64> = listed.iter().map(|s| s.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&again.id));
    assert!(!ids.contains(&first.id));
}

#[tokio::test]
async fn showtimes_require_owner_movie_and_screen() {
    let app = TestApp::start().await;
    let venue = app.venue(OWNER).await;
    let movie = app.movie().await;

    let stranger = app
        .schedules
        .add_showtime(OTHER_OWNER, &TestApp::new_showtime(movie.id, venue.screen.id, 18))
        .await;
    assert!(matches!(stranger, Err(AppError::Unauthorized(_))));

    let unknown_movie = app
        .schedules
        .add_showtime(OWNER, &TestApp::new_showtime(9_999, venue.screen.id, 18))
        .await;
    assert!(matches!(unknown_movie, Err(AppError::NotFound(_))));

    let unknown_screen = app
        .schedules
        .add_showtime(OWNER, &TestApp::new_showtime(movie.id, 9_999, 18))
        .await;
    assert!(matches!(unknown_screen, Err(AppError::NotFound(_))));

    let showtime = app
        .schedules
        .add_showtime(OWNER, &TestApp::new_showtime(movie.id, venue.screen.id, 18))
        .await
        .expect("showtime");
    let foreign_delete = app.schedules.delete_showtime(OTHER_OWNER, showtime.id).await;
    assert!(matches!(foreign_delete, Err(AppError::Unauthorized(_))));
}

#[tokio::test]
async fn schedules_must_match_their_showtime() {
    let app = TestApp::start().await;
    let show = app.show(OWNER, 2, 10.0, 12.0).await;
    let elsewhere = app.venue(OWNER).await;
    let other_movie = app.movie().await;

    let wrong_movie = app
        .schedules
        .add_movie_schedule(
            OWNER,
            &NewMovieSchedule {
                movie_id: other_movie.id,
                theater_id: show.venue.theater.id,
                showtime_id: show.showtime.id,
            },
        )
        .await;
    assert!(matches!(wrong_movie, Err(AppError::InvalidInput(_))));

    let wrong_theater = app
        .schedules
        .add_movie_schedule(
            OWNER,
            &NewMovieSchedule {
                movie_id: show.movie.id,
                theater_id: elsewhere.theater.id,
                showtime_id: show.showtime.id,
            },
        )
        .await;
    assert!(matches!(wrong_theater, Err(AppError::InvalidInput(_))));

    let stranger = app
        .schedules
        .add_movie_schedule(
            OTHER_OWNER,
            &NewMovieSchedule {
                movie_id: show.movie.id,
                theater_id: show.venue.theater.id,
                showtime_id: show.showtime.id,
            },
        )
        .await;
    assert!(matches!(stranger, Err(AppError::Unauthorized(_))));
}

#[tokio::test]
async fn tombstoned_schedule_is_revived_with_its_id() {
    let app = TestApp::start().await;
    let show = app.show(OWNER, 2, 10.0, 12.0).await;
    let new = NewMovieSchedule {
        movie_id: show.movie.id,
        theater_id: show.venue.theater.id,
        showtime_id: show.showtime.id,
    };

    let schedule = app.schedules.add_movie_schedule(OWNER, &new).await.expect("schedule");
    assert!(matches!(
        app.schedules.add_movie_schedule(OWNER, &new).await,
        Err(AppError::AlreadyExists(_))
    ));

    let listed = app
        .schedules
        .list_schedules_by_theater(show.venue.theater.id)
        .await
        .expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].showtime_id, show.showtime.id);

    app.schedules
        .delete_movie_schedule(OWNER, schedule.id)
        .await
        .expect("delete");
    assert!(app
        .schedules
        .list_schedules_by_theater(show.venue.theater.id)
        .await
        .expect("list after delete")
        .is_empty());

    let revived = app.schedules.add_movie_schedule(OWNER, &new).await.expect("revive");
    assert_eq!(revived.id, schedule.id);
    assert_eq!(revived.status, EntityStatus::Active);
    assert_eq!(app.count("SELECT COUNT(*) FROM movie_schedules").await, 1);
}

#[tokio::test]
async fn listing_schedules_hides_deleted_showtimes() {
    let app = TestApp::start().await;
    let show = app.show(OWNER, 2, 10.0, 12.0).await;
    let later = app
        .schedules
        .add_showtime(OWNER, &TestApp::new_showtime(show.movie.id, show.venue.screen.id, 22))
        .await
        .expect("later showtime");

    for showtime_id in [later.id, show.showtime.id] {
        app.schedules
            .add_movie_schedule(
                OWNER,
                &NewMovieSchedule {
                    movie_id: show.movie.id,
                    theater_id: show.venue.theater.id,
                    showtime_id,
                },
            )
            .await
            .expect("schedule");
    }

    let listed = app
        .schedules
        .list_schedules_by_theater(show.venue.theater.id)
        .await
        .expect("list");
    let order: Vec<i64> = listed.iter().map(|s| s.showtime_id).collect();
    assert_eq!(order, vec![show.showtime.id, later.id]);

    app.schedules.delete_showtime(OWNER, later.id).await.expect("delete showtime");
    let listed = app
        .schedules
        .list_schedules_by_theater(show.venue.theater.id)
        .await
        .expect("list");
    assert_eq!(listed.len(), 1);
}
