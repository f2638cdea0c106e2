use chrono::Utc;
use std::fs;
use tempfile::tempdir;
use trainlive::config::AppConfig;
use trainlive::geo::{haversine_distance, meters_to_latitude_degrees};
use trainlive::replay::{replay_track, ReplayOptions};
use trainlive::track::load_track;
use trainlive::{
    ActiveStrengthSession, CircuitPhase, CircuitRunner, CircuitStep, CompletedSet, CueKind, GpsPoint, IntervalBlock,
    NextPhase, PhaseKind, RestWorkTimer, RunPhase, RunSession, RunType, SessionExercise, TrainLiveError,
};

/// Workflows that cross module boundaries, driven through the public API

#[cfg(test)]
mod integration_tests {
    use super::*;

    fn north(meters: f64, timestamp: i64) -> GpsPoint {
        GpsPoint::new(48.8566 + meters_to_latitude_degrees(meters), 2.3522, timestamp).with_accuracy(5.0)
    }

    fn set(set_number: u32, weight: f64, reps: u32) -> CompletedSet {
        CompletedSet {
            set_number,
            weight,
            reps,
            feeling: Some(3),
            completed_at: Utc::now(),
        }
    }

    /// Five fixes 100 m apart, one every 30 s, ticked in step
    #[test]
    fn test_free_run_end_to_end() {
        let mut run = RunSession::default();
        run.start_run("log-1", None, "Morning", RunType::Free, &[]).unwrap();
        assert_eq!(run.phase(), RunPhase::Free);

        for i in 0..5 {
            if i > 0 {
                for _ in 0..30 {
                    assert!(run.tick().is_none());
                }
            }
            run.add_gps_point(north(100.0 * i as f64, 30_000 * i as i64));
        }

        let summary = run.end_run();
        assert_eq!(summary.track.len(), 5);
        assert_eq!(summary.elapsed_seconds, 120);
        assert!((summary.distance_m - 400.0).abs() < 1.0);

        let expected = summary.elapsed_seconds as f64 / 0.4;
        assert!((summary.average_pace.unwrap() - expected).abs() < 2.0);
        assert!((summary.current_pace.unwrap() - 300.0).abs() < 2.0);

        run.reset();
        assert_eq!(run.phase(), RunPhase::Idle);
        assert!(run.track().is_empty());
        assert_eq!(run.distance_m(), 0.0);
    }

    #[test]
    fn test_interval_run_walks_warmup_main_cooldown() {
        use trainlive::BlockStage;

        let blocks = vec![
            IntervalBlock::work(10).in_stage(BlockStage::Warmup),
            IntervalBlock { position: 1, ..IntervalBlock::work(5).repeated(2) },
            IntervalBlock { position: 2, ..IntervalBlock::rest(10).in_stage(BlockStage::Cooldown) },
        ];

        let mut run = RunSession::default();
        run.start_run("log-2", Some("plan-7".to_string()), "Ladder", RunType::Interval, &blocks).unwrap();
        assert_eq!(run.blocks().len(), 4);
        assert_eq!(run.phase(), RunPhase::Warmup);

        let mut phases = vec![run.phase()];
        let mut cues = Vec::new();
        for _ in 0..30 {
            if let Some(cue) = run.tick() {
                cues.push(cue.kind);
                phases.push(run.phase());
            }
        }

        assert_eq!(
            phases,
            vec![RunPhase::Warmup, RunPhase::Interval, RunPhase::Interval, RunPhase::Cooldown, RunPhase::Complete]
        );
        assert_eq!(cues.last(), Some(&CueKind::RunComplete));
        assert!(run.is_active());

        let summary = run.end_run();
        assert_eq!(summary.plan_id.as_deref(), Some("plan-7"));
        assert_eq!(summary.elapsed_seconds, 30);
    }

    #[test]
    fn test_second_run_start_is_rejected() {
        let mut run = RunSession::default();
        run.start_run("a", None, "A", RunType::Free, &[]).unwrap();
        let err = run.start_run("b", None, "B", RunType::Free, &[]).unwrap_err();
        assert!(matches!(err, TrainLiveError::AlreadyActive { .. }));
    }

    #[test]
    fn test_circuit_cycles_rounds_to_completion() {
        let steps = vec![CircuitStep::timed("squat", 3, 2), CircuitStep::timed("plank", 4, 0)];
        let mut runner = CircuitRunner::default();
        runner.start_workout(steps, 3).unwrap();
        assert_eq!(runner.total_remaining_seconds(), 27);

        let mut exercise_phases = 1;
        let mut ticks = 0;
        while runner.is_active() {
            let before = (runner.phase(), runner.step_index(), runner.round());
            runner.tick();
            ticks += 1;
            let after = (runner.phase(), runner.step_index(), runner.round());
            if after != before && runner.phase() == CircuitPhase::Exercise {
                exercise_phases += 1;
            }
        }

        assert_eq!(exercise_phases, 6);
        assert_eq!(ticks, 27);
        assert_eq!(runner.phase(), CircuitPhase::Complete);
    }

    #[test]
    fn test_strength_session_with_rest_timer() {
        let exercises = vec![
            SessionExercise::new("bench", "Bench press", 2, 90),
            SessionExercise::new("plank", "Plank", 1, 30).timed(45),
        ];

        let mut session = ActiveStrengthSession::new();
        session.start_session("log-3", "session-1", "Push day", exercises).unwrap();
        let mut timer = RestWorkTimer::default();

        let record = session.log_set(0, set(1, 80.0, 8)).unwrap();
        assert_eq!(record.exercise_id, "bench");
        session.countdown_after_set(0).unwrap().start_on(&mut timer);
        assert_eq!(timer.mode(), PhaseKind::Rest);
        assert_eq!(timer.remaining_seconds(), 90);

        session.log_set(0, set(2, 80.0, 6)).unwrap();
        assert!(session.is_exercise_complete(0).unwrap());
        assert!(session.next_exercise());

        session.log_set(1, set(1, 0.0, 1)).unwrap();
        let countdown = session.countdown_after_set(1).unwrap();
        assert_eq!(countdown.then, Some(NextPhase::Rest(30)));
        countdown.start_on(&mut timer);
        assert_eq!(timer.mode(), PhaseKind::Work);
        assert_eq!(timer.remaining_seconds(), 45);

        let mut chained = None;
        for _ in 0..45 {
            let outcome = timer.tick();
            if let Some(next) = outcome.next {
                chained = Some(timer.chain(next));
            }
        }
        assert_eq!(chained.map(|cue| cue.kind), Some(CueKind::RestStart));
        assert_eq!(timer.snapshot().remaining_seconds, 30);

        assert!((session.total_volume() - 80.0 * 14.0).abs() < 1e-9);
        assert!(matches!(
            session.log_set(5, set(1, 10.0, 10)),
            Err(TrainLiveError::InvalidIndex { index: 5, len: 2 })
        ));
    }

    #[test]
    fn test_config_round_trip_drives_sessions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.timer.default_rest_seconds = 45;
        config.run.rolling_window_m = 400.0;
        config.save_to_file(&path).unwrap();

        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.timer, config.timer);
        assert_eq!(loaded.run, config.run);

        let mut timer = RestWorkTimer::new(loaded.timer);
        timer.start(None, PhaseKind::Rest, None);
        assert_eq!(timer.remaining_seconds(), 45);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[run]\nrolling_window_m = 20.0\nmin_window_m = 50.0\n").unwrap();

        assert!(AppConfig::load_from_file(&path).is_err());
    }

    #[test]
    fn test_replay_json_track_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("track.json");

        let points: Vec<GpsPoint> = (0..21).map(|i| north(100.0 * i as f64, 24_000 * i as i64)).collect();
        fs::write(&path, serde_json::to_string(&points).unwrap()).unwrap();

        let loaded = load_track(&path).unwrap();
        assert_eq!(loaded.len(), 21);
        assert!((haversine_distance(
            loaded[0].latitude,
            loaded[0].longitude,
            loaded[20].latitude,
            loaded[20].longitude
        ) - 2000.0)
            .abs()
            < 2.0);

        let report = replay_track(&loaded, &AppConfig::default(), ReplayOptions::free("replay-1", "Tempo")).unwrap();
        assert_eq!(report.summary.elapsed_seconds, 480);
        assert_eq!(report.rejected, 0);

        let one_k = &report.best_efforts[0];
        assert!((one_k.seconds - 240.0).abs() < 1.0);
        assert!(report.best_efforts.len() >= 2);
    }
}
