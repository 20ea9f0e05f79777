use chrono::{DateTime, Duration, TimeZone, Utc};
use fanfare::config::{AmbiguityPolicy, AppConfig};
use fanfare::domain::{classify, window, Event, Game, GamePhase, PhasePolicy, SeasonType};
use fanfare::error::FanfareError;
use fanfare::persistence::{EventRepository, GameRepository, InMemoryStore};
use fanfare::services::{GameStatusService, IngestService, StatisticsService};
use fanfare::stats::{aggregate, build_grid};
use fanfare::{FixedClock, RawPost};
use std::sync::Arc;

fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn game(id: &str, home: &str, away: &str, kickoff: DateTime<Utc>) -> Game {
    Game {
        game_id: id.to_string(),
        home_team_id: home.to_string(),
        away_team_id: away.to_string(),
        scheduled_start: kickoff,
        week: 1,
        season_type: SeasonType::Reg,
    }
}

fn event(id: &str, team: &str, at: &str, score: f64, game_id: &str) -> Event {
    Event {
        event_id: id.to_string(),
        team_id: team.to_string(),
        posted_at: utc(at),
        sentiment_score: score,
        game_id: Some(game_id.to_string()),
    }
}

#[test]
fn kickoff_exactly_one_week_ago_is_historic() {
    let kickoff = utc("2016-09-11T17:00:00Z");
    assert_eq!(
        classify(kickoff, kickoff + Duration::days(7)),
        Some(GamePhase::Historic)
    );
    assert_eq!(
        classify(kickoff, kickoff + Duration::days(7) - Duration::seconds(1)),
        Some(GamePhase::Recent)
    );
    // A week before kickoff the game is still ahead
    assert_eq!(
        classify(kickoff, utc("2016-09-04T17:00:00Z")),
        Some(GamePhase::Pending)
    );
}

#[test]
fn five_hour_window_has_sixty_buckets() {
    let grid = build_grid(&window(utc("2016-09-11T13:00:00Z")), 5).unwrap();
    assert_eq!(grid.len(), 60);
    assert_eq!(grid.starts()[0], utc("2016-09-11T12:00:00Z"));
    assert_eq!(grid.starts()[59], utc("2016-09-11T16:55:00Z"));
}

#[test]
fn unscored_posts_are_left_out_of_buckets() {
    let g = game("g1", "A", "B", utc("2016-09-11T13:00:00Z"));
    let grid = build_grid(&window(g.scheduled_start), 5).unwrap();
    let events = vec![
        event("1", "A", "2016-09-11T12:03:00Z", 0.5, "g1"),
        event("2", "A", "2016-09-11T12:04:00Z", 0.0, "g1"),
        event("3", "B", "2016-09-11T12:07:00Z", -0.2, "g1"),
    ];

    let buckets = aggregate(&g, &events, &grid);
    assert_eq!(buckets.len(), 60);
    assert_eq!(buckets[0].home_count, 1);
    assert_eq!(buckets[0].home_mean_sentiment, Some(0.5));
    assert_eq!(buckets[1].away_count, 1);
    assert_eq!(buckets[1].away_mean_sentiment, Some(-0.2));
    for bucket in &buckets[2..] {
        assert_eq!(bucket.home_count + bucket.away_count, 0);
        assert_eq!(bucket.home_mean_sentiment, None);
        assert_eq!(bucket.away_mean_sentiment, None);
    }
}

#[tokio::test]
async fn overlapping_games_resolve_by_policy() {
    let schedule = vec![
        game("sun", "NYJ", "CIN", utc("2016-09-11T17:00:00Z")),
        game("makeup", "CIN", "BAL", utc("2016-09-11T19:00:00Z")),
    ];
    let posted_at = utc("2016-09-11T19:30:00Z");

    for _ in 0..3 {
        let earliest = GameStatusService::new(
            Arc::new(InMemoryStore::with_games(schedule.clone())),
            Arc::new(FixedClock::new(utc("2016-09-20T00:00:00Z"))),
            PhasePolicy::default(),
            AmbiguityPolicy::Earliest,
        );
        let id = earliest.attribute_event_to_game("CIN", posted_at).await.unwrap();
        assert_eq!(id.as_deref(), Some("sun"));
    }

    let reject = GameStatusService::new(
        Arc::new(InMemoryStore::with_games(schedule)),
        Arc::new(FixedClock::new(utc("2016-09-20T00:00:00Z"))),
        PhasePolicy::default(),
        AmbiguityPolicy::Reject,
    );
    let err = reject
        .attribute_event_to_game("CIN", posted_at)
        .await
        .unwrap_err();
    assert!(matches!(err, FanfareError::AmbiguousAttribution { .. }));
}

#[tokio::test]
async fn ingest_then_chart_across_midnight() {
    let kickoff = Utc.with_ymd_and_hms(2016, 9, 12, 23, 30, 0).unwrap();
    let store = Arc::new(InMemoryStore::new());
    store.upsert(&game("mnf", "WAS", "PIT", kickoff)).await.unwrap();

    let clock = Arc::new(FixedClock::new(kickoff + Duration::hours(2)));
    let config = AppConfig::default();
    let status = Arc::new(GameStatusService::from_config(store.clone(), clock.clone(), &config));

    let raw: Vec<RawPost> = serde_json::from_str(
        r#"[
            {"tweetid": "1", "teamid": "WAS", "postedtime": "2016-09-12T22:45:00Z", "sent_compound": 0.6},
            {"tweetid": "2", "teamid": "PIT", "postedtime": "Tue Sep 13 01:10:00 +0000 2016", "sent_compound": -0.4},
            {"tweetid": "3", "teamid": "PIT", "postedtime": "2016-09-13T01:12:00", "sent_compound": 0.2},
            {"tweetid": "4", "teamid": "PIT", "postedtime": "2016-09-13T01:13:00Z"},
            {"tweetid": "5", "teamid": "PIT", "postedtime": "2016-09-13T05:00:00Z", "sent_compound": 0.9}
        ]"#,
    )
    .unwrap();

    let report = IngestService::new(status.clone(), store.clone())
        .ingest(raw)
        .await
        .unwrap();
    assert_eq!(report.stored, 5);
    assert_eq!(report.unattributed, 1);

    let stats = StatisticsService::new(status.clone(), store.clone(), 5);
    let chart = stats.game_chart("mnf").await.unwrap();
    assert_eq!(chart.phase, Some(GamePhase::Live));
    assert_eq!(chart.buckets.len(), 60);

    // 22:45 is bucket 3; 01:10 and 01:12 land together past midnight
    assert_eq!(chart.buckets[3].home_count, 1);
    let after_midnight = &chart.buckets[32];
    assert_eq!(after_midnight.bucket_start, utc("2016-09-13T01:10:00Z"));
    assert_eq!(after_midnight.away_count, 2);
    let mean = after_midnight.away_mean_sentiment.unwrap();
    assert!((mean - (-0.1)).abs() < 1e-12);

    // Unscored post is stored but never counted
    assert_eq!(store.list_for_game("mnf", false).await.unwrap().len(), 4);
    assert_eq!(stats.post_counts("mnf").await.unwrap().total, 3);

    // Kickoff is never rewritten by a later upsert
    store
        .upsert(&game("mnf", "WAS", "PIT", kickoff + Duration::hours(1)))
        .await
        .unwrap();
    assert_eq!(status.game("mnf").await.unwrap().scheduled_start, kickoff);

    clock.advance(Duration::days(8));
    assert_eq!(
        status.current_phase("mnf").await.unwrap(),
        Some(GamePhase::Historic)
    );
}

#[tokio::test]
async fn posts_collected_before_the_schedule_reach_the_chart() {
    let kickoff = utc("2016-09-11T17:00:00Z");
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(FixedClock::new(kickoff + Duration::hours(2)));
    let status = Arc::new(GameStatusService::from_config(
        store.clone(),
        clock,
        &AppConfig::default(),
    ));
    let ingest = IngestService::new(status.clone(), store.clone());

    let raw: Vec<RawPost> = serde_json::from_str(
        r#"[
            {"tweetid": "1", "teamid": "NYJ", "postedtime": "2016-09-11T16:42:00Z", "sent_compound": 0.4},
            {"tweetid": "2", "teamid": "CIN", "postedtime": "2016-09-11T17:31:00Z", "sent_compound": -0.3}
        ]"#,
    )
    .unwrap();
    let report = ingest.ingest(raw).await.unwrap();
    assert_eq!(report.unattributed, 2);

    store.upsert(&game("g1", "NYJ", "CIN", kickoff)).await.unwrap();
    assert_eq!(ingest.reattribute().await.unwrap(), 2);

    let stats = StatisticsService::new(status, store.clone(), 5);
    assert_eq!(stats.post_counts("g1").await.unwrap().total, 2);
    let chart = stats.game_chart("g1").await.unwrap();
    // 16:42 is bucket 8, 17:31 is bucket 18
    assert_eq!(chart.buckets[8].home_count, 1);
    assert_eq!(chart.buckets[18].away_count, 1);
    assert!(store.list_unattributed().await.unwrap().is_empty());
}
