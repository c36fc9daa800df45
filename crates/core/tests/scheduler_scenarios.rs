//! End-to-end scheduling scenarios driven through the in-memory collaborators.
//!
//! Time only moves when a test calls `poll_timers`, and engine notifications only arrive on
//! `poll_engine`, so every scenario is deterministic.

use std::path::{Path, PathBuf};
use std::time::Duration;

use stageshow_core::testing::{RecordingEngine, RecordingLauncher, RecordingRenderer};
use stageshow_core::{
    ControlEvent, CueError, CueId, CueProperties, CueScheduler, CueStatus, EngineState,
    MediaEngine, SchedulerSettings, SessionId, SurfaceContent, WaitPhase,
};

type Scheduler = CueScheduler<RecordingEngine, RecordingRenderer, RecordingLauncher>;

fn scheduler() -> Scheduler {
    scheduler_with(RecordingEngine::new(), RecordingRenderer::new())
}

fn scheduler_with(engine: RecordingEngine, renderer: RecordingRenderer) -> Scheduler {
    CueScheduler::new(
        engine,
        renderer,
        RecordingLauncher::new(),
        SchedulerSettings::default(),
    )
}

fn session_of(scheduler: &Scheduler, cue: CueId) -> SessionId {
    scheduler
        .cue(cue)
        .and_then(|item| item.playback_handle)
        .expect("cue should hold a session")
}

fn status_of(scheduler: &Scheduler, cue: CueId) -> CueStatus {
    scheduler.cue(cue).unwrap().status
}

/// Let the engine report end of stream for the cue's session and deliver it.
fn finish(scheduler: &mut Scheduler, cue: CueId) {
    let session = session_of(scheduler, cue);
    scheduler.engine_mut().finish(session);
    scheduler.poll_engine();
}

fn images(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(PathBuf::from).collect()
}

#[test]
fn test_finish_without_auto_advance_keeps_active_cue() {
    let mut scheduler = scheduler();
    let a = scheduler.add_cue(CueProperties::audio("a.wav"));
    let b = scheduler.add_cue(CueProperties::audio("b.wav"));

    scheduler.advance();
    assert_eq!(scheduler.active_cue(), Some(a));
    assert_eq!(scheduler.selected_cue(), Some(b));
    let session = session_of(&scheduler, a);

    finish(&mut scheduler, a);

    assert_eq!(scheduler.active_cue(), Some(a));
    assert_eq!(status_of(&scheduler, a), CueStatus::Finished);
    assert_eq!(status_of(&scheduler, b), CueStatus::Idle);
    assert!(scheduler.engine().is_closed(session));
    assert_eq!(scheduler.engine().opened(), vec![PathBuf::from("a.wav")]);
    assert_eq!(scheduler.output_owner(), None);
}

#[test]
fn test_looping_cue_restarts_instead_of_advancing() {
    let mut scheduler = scheduler();
    let a = scheduler.add_cue(CueProperties::audio("a.wav").looping().with_auto_advance());
    scheduler.add_cue(CueProperties::audio("b.wav"));

    scheduler.advance();
    let first = session_of(&scheduler, a);

    for _ in 0..3 {
        finish(&mut scheduler, a);
        assert_eq!(scheduler.active_cue(), Some(a));
        assert_eq!(status_of(&scheduler, a), CueStatus::Running);
    }

    assert!(scheduler.engine().is_closed(first));
    assert_eq!(scheduler.engine().opened(), vec![PathBuf::from("a.wav"); 4]);
    assert_eq!(scheduler.engine().live_sessions().len(), 1);

    let restarts = scheduler
        .take_events()
        .into_iter()
        .filter(|event| *event == ControlEvent::CueRestarted { cue: a })
        .count();
    assert_eq!(restarts, 3);
}

#[test]
fn test_go_then_follow_through_audio_video_and_command() {
    let mut scheduler = scheduler();
    let a = scheduler.add_cue(CueProperties::audio("a.wav").with_auto_advance());
    let b = scheduler.add_cue(CueProperties::video("b.mp4").with_auto_advance());
    let c = scheduler.add_cue(CueProperties::command("echo done").with_post_wait(2));

    scheduler.advance();
    assert_eq!(scheduler.active_cue(), Some(a));
    let a_session = session_of(&scheduler, a);
    assert_eq!(
        scheduler.engine().session(a_session).unwrap().state,
        EngineState::Playing
    );

    finish(&mut scheduler, a);
    assert_eq!(scheduler.active_cue(), Some(b));
    assert_eq!(status_of(&scheduler, a), CueStatus::Finished);
    assert_eq!(scheduler.surface().content(), SurfaceContent::Video(b));

    finish(&mut scheduler, b);
    assert_eq!(scheduler.active_cue(), Some(c));
    assert_eq!(scheduler.launcher().commands(), ["echo done".to_string()]);
    assert_eq!(status_of(&scheduler, c), CueStatus::Running);
    assert_eq!(scheduler.surface().content(), SurfaceContent::Empty);

    scheduler.poll_timers(Duration::from_millis(1_900));
    assert_eq!(status_of(&scheduler, c), CueStatus::Running);

    scheduler.poll_timers(Duration::from_secs(2));
    assert_eq!(status_of(&scheduler, c), CueStatus::Finished);
    assert_eq!(scheduler.active_cue(), Some(c));
    assert_eq!(scheduler.selected_cue(), None);
    assert!(scheduler.engine().live_sessions().is_empty());
    assert_eq!(scheduler.next_timer_deadline(), None);
}

#[test]
fn test_auto_advance_off_the_end_reports_program_end() {
    let mut scheduler = scheduler();
    let a = scheduler.add_cue(CueProperties::command("true").with_auto_advance());

    scheduler.advance();

    assert_eq!(scheduler.active_cue(), Some(a));
    assert_eq!(status_of(&scheduler, a), CueStatus::Finished);
    assert!(scheduler
        .take_events()
        .contains(&ControlEvent::ProgramEnded { cue: a }));
}

#[test]
fn test_post_wait_delays_the_follow_on() {
    let mut scheduler = scheduler();
    let a = scheduler.add_cue(
        CueProperties::audio("a.wav")
            .with_auto_advance()
            .with_post_wait(3),
    );
    let b = scheduler.add_cue(CueProperties::audio("b.wav"));

    scheduler.advance();
    finish(&mut scheduler, a);

    assert_eq!(status_of(&scheduler, a), CueStatus::PostWait);
    assert_eq!(scheduler.active_cue(), Some(a));

    scheduler.poll_timers(Duration::from_secs(3));
    assert_eq!(scheduler.active_cue(), Some(b));
    assert_eq!(status_of(&scheduler, a), CueStatus::Finished);
    assert_eq!(status_of(&scheduler, b), CueStatus::Running);
}

#[test]
fn test_countdowns_report_each_phase_on_its_own() {
    let mut scheduler = scheduler();
    let a = scheduler.add_cue(
        CueProperties::audio("a.wav")
            .with_auto_advance()
            .with_post_wait(3),
    );
    let b = scheduler.add_cue(CueProperties::audio("b.wav").with_pre_wait(2));

    scheduler.advance();
    finish(&mut scheduler, a);

    let countdowns = scheduler.countdowns();
    assert_eq!(countdowns.len(), 1);
    assert_eq!(countdowns[0].cue, a);
    assert_eq!(countdowns[0].phase, WaitPhase::PostWait);
    assert_eq!(countdowns[0].remaining_seconds(), 3);

    scheduler.poll_timers(Duration::from_secs(3));
    let countdowns = scheduler.countdowns();
    assert_eq!(countdowns.len(), 1);
    assert_eq!(countdowns[0].cue, b);
    assert_eq!(countdowns[0].phase, WaitPhase::PreWait);
    assert_eq!(countdowns[0].remaining_seconds(), 2);

    scheduler.poll_timers(Duration::from_millis(4_500));
    assert_eq!(scheduler.countdowns()[0].remaining_seconds(), 1);

    scheduler.poll_timers(Duration::from_secs(5));
    assert!(scheduler.countdowns().is_empty());
    assert_eq!(status_of(&scheduler, b), CueStatus::Running);
}

#[test]
fn test_removing_pending_cue_cancels_its_pre_wait() {
    let mut scheduler = scheduler();
    let a = scheduler.add_cue(CueProperties::audio("a.wav").with_pre_wait(5));

    scheduler.advance();
    assert_eq!(status_of(&scheduler, a), CueStatus::PreWait);

    scheduler.remove_cue(a).unwrap();
    scheduler.poll_timers(Duration::from_secs(10));

    assert!(scheduler.engine().opened().is_empty());
    assert_eq!(scheduler.active_cue(), None);
}

#[test]
fn test_stop_during_pre_wait_prevents_start() {
    let mut scheduler = scheduler();
    let a = scheduler.add_cue(CueProperties::audio("a.wav").with_pre_wait(5));

    scheduler.advance();
    assert!(scheduler.stop());
    scheduler.poll_timers(Duration::from_secs(10));

    assert!(scheduler.engine().opened().is_empty());
    assert_eq!(status_of(&scheduler, a), CueStatus::Stopped);
    assert!(scheduler.countdowns().is_empty());
}

#[test]
fn test_start_immediately_skips_pre_wait_only_on_go() {
    let mut scheduler = scheduler();
    let a = scheduler.add_cue(CueProperties::command("true").with_auto_advance());
    let b = scheduler.add_cue(
        CueProperties::audio("b.wav")
            .with_pre_wait(3)
            .with_start_immediately(),
    );

    // Followed on from a: the pre-wait applies.
    scheduler.advance();
    assert_eq!(scheduler.active_cue(), Some(b));
    assert_eq!(status_of(&scheduler, b), CueStatus::PreWait);
    assert!(scheduler.engine().opened().is_empty());

    // Operator GO: starts at once.
    scheduler.start_cue(b).unwrap();
    assert_eq!(status_of(&scheduler, b), CueStatus::Running);
    assert_eq!(scheduler.engine().opened(), vec![PathBuf::from("b.wav")]);

    scheduler.poll_timers(Duration::from_secs(5));
    assert_eq!(scheduler.engine().opened().len(), 1);
    assert_eq!(status_of(&scheduler, a), CueStatus::Finished);
}

#[test]
fn test_removing_active_cue_releases_its_session() {
    let mut scheduler = scheduler();
    let a = scheduler.add_cue(CueProperties::audio("a.wav"));
    let b = scheduler.add_cue(CueProperties::audio("b.wav"));

    scheduler.advance();
    let session = session_of(&scheduler, a);

    scheduler.remove_cue(a).unwrap();

    assert_eq!(scheduler.active_cue(), None);
    assert_eq!(scheduler.output_owner(), None);
    assert!(scheduler.engine().is_closed(session));
    assert_eq!(scheduler.engine().query_position(session), None);
    assert_eq!(scheduler.selected_cue(), Some(b));

    // A late end of stream for the removed cue changes nothing.
    scheduler.take_events();
    scheduler.engine_mut().finish_late(session);
    scheduler.poll_engine();
    assert!(scheduler.take_events().is_empty());
    assert_eq!(status_of(&scheduler, b), CueStatus::Idle);
}

#[test]
fn test_stale_end_of_stream_is_ignored() {
    let mut scheduler = scheduler();
    let a = scheduler.add_cue(CueProperties::audio("a.wav").with_auto_advance());
    let b = scheduler.add_cue(CueProperties::audio("b.wav"));
    let c = scheduler.add_cue(CueProperties::audio("c.wav"));

    scheduler.advance();
    let a_session = session_of(&scheduler, a);
    scheduler.advance();

    assert_eq!(scheduler.active_cue(), Some(b));
    assert_eq!(status_of(&scheduler, a), CueStatus::Stopped);
    assert!(scheduler.engine().is_closed(a_session));

    scheduler.engine_mut().finish_late(a_session);
    scheduler.poll_engine();
    scheduler.on_cue_finished(a, stageshow_core::Completion::EndOfStream);

    assert_eq!(scheduler.active_cue(), Some(b));
    assert_eq!(status_of(&scheduler, b), CueStatus::Running);
    assert_eq!(status_of(&scheduler, c), CueStatus::Idle);
}

#[test]
fn test_superseded_cue_releases_its_session_when_it_ends() {
    let mut scheduler = scheduler();
    let a = scheduler.add_cue(CueProperties::audio("a.wav").with_auto_advance());
    let b = scheduler.add_cue(CueProperties::command("echo lights").with_post_wait(30));
    let c = scheduler.add_cue(CueProperties::audio("c.wav"));

    scheduler.advance();
    let a_session = session_of(&scheduler, a);
    scheduler.advance();
    assert_eq!(scheduler.active_cue(), Some(b));
    assert_eq!(status_of(&scheduler, a), CueStatus::Running);
    scheduler.take_events();

    finish(&mut scheduler, a);

    let cue = scheduler.cue(a).unwrap();
    assert_eq!(cue.status, CueStatus::Finished);
    assert_eq!(cue.playback_handle, None);
    assert!(scheduler.engine().is_closed(a_session));
    assert_eq!(scheduler.output_owner(), None);
    assert!(scheduler.engine().live_sessions().is_empty());

    assert_eq!(scheduler.active_cue(), Some(b));
    assert_eq!(status_of(&scheduler, b), CueStatus::Running);
    assert_eq!(status_of(&scheduler, c), CueStatus::Idle);
    let events = scheduler.take_events();
    assert!(events.contains(&ControlEvent::CueFinished {
        cue: a,
        status: CueStatus::Finished,
    }));
    assert!(!events
        .iter()
        .any(|event| matches!(event, ControlEvent::CueStarted { .. })));
}

#[test]
fn test_superseded_video_gives_the_surface_back_to_the_fallback() {
    let mut scheduler = scheduler();
    scheduler.set_fallback_image(Some(PathBuf::from("logo.png")));
    let video = scheduler.add_cue(CueProperties::video("opener.mp4"));
    scheduler.add_cue(CueProperties::command("echo lights").with_post_wait(30));

    scheduler.advance();
    scheduler.advance();
    assert_eq!(scheduler.surface().content(), SurfaceContent::Video(video));

    finish(&mut scheduler, video);

    assert_eq!(status_of(&scheduler, video), CueStatus::Finished);
    assert_eq!(scheduler.surface().content(), SurfaceContent::Fallback);
    assert_eq!(
        scheduler.surface().renderer().current(),
        Some(Path::new("logo.png"))
    );
}

#[test]
fn test_long_chain_of_instant_cues_follows_through() {
    let mut scheduler = scheduler();
    let ids: Vec<CueId> = (0..5_000)
        .map(|n| {
            scheduler.add_cue(CueProperties::command(format!("echo {}", n)).with_auto_advance())
        })
        .collect();

    scheduler.advance();

    let last = *ids.last().unwrap();
    assert_eq!(scheduler.active_cue(), Some(last));
    assert_eq!(scheduler.launcher().commands().len(), 5_000);
    assert!(ids
        .iter()
        .all(|id| status_of(&scheduler, *id) == CueStatus::Finished));
    assert!(scheduler
        .take_events()
        .contains(&ControlEvent::ProgramEnded { cue: last }));
}

#[test]
fn test_open_failure_is_handled_like_end_of_stream() {
    let engine = RecordingEngine::new().fail_on("broken.mp4");
    let mut scheduler = scheduler_with(engine, RecordingRenderer::new());
    let a = scheduler.add_cue(CueProperties::audio("a.wav").with_auto_advance());
    let b = scheduler.add_cue(CueProperties::video("broken.mp4").with_auto_advance());
    let c = scheduler.add_cue(CueProperties::audio("c.wav"));

    scheduler.advance();
    finish(&mut scheduler, a);

    assert_eq!(status_of(&scheduler, b), CueStatus::Failed);
    assert_eq!(scheduler.active_cue(), Some(c));
    assert_eq!(status_of(&scheduler, c), CueStatus::Running);
    assert!(scheduler
        .take_events()
        .iter()
        .any(|event| matches!(event, ControlEvent::Error { .. })));
}

#[test]
fn test_playback_failure_advances() {
    let mut scheduler = scheduler();
    let a = scheduler.add_cue(CueProperties::audio("a.wav").looping().with_auto_advance());
    let b = scheduler.add_cue(CueProperties::audio("b.wav"));

    scheduler.advance();
    let session = session_of(&scheduler, a);
    scheduler.engine_mut().fail(session, "decoder error");
    scheduler.poll_engine();

    // A failed cue is never looped.
    assert_eq!(status_of(&scheduler, a), CueStatus::Failed);
    assert!(scheduler.engine().is_closed(session));
    assert_eq!(scheduler.active_cue(), Some(b));
}

#[test]
fn test_command_launch_failure_still_completes() {
    let mut scheduler = CueScheduler::new(
        RecordingEngine::new(),
        RecordingRenderer::new(),
        RecordingLauncher::failing(),
        SchedulerSettings::default(),
    );
    let a = scheduler.add_cue(
        CueProperties::command("missing-tool")
            .with_post_wait(1)
            .with_auto_advance(),
    );
    let b = scheduler.add_cue(CueProperties::audio("b.wav"));

    scheduler.advance();
    assert_eq!(status_of(&scheduler, a), CueStatus::Running);
    assert!(scheduler
        .take_events()
        .iter()
        .any(|event| matches!(event, ControlEvent::Error { .. })));

    scheduler.poll_timers(Duration::from_secs(1));
    assert_eq!(status_of(&scheduler, a), CueStatus::Finished);
    assert_eq!(scheduler.active_cue(), Some(b));
}

#[test]
fn test_fade_up_converges_to_full_volume() {
    let mut scheduler = scheduler();
    let a = scheduler.add_cue(CueProperties::audio("a.wav"));
    scheduler.advance();
    let session = session_of(&scheduler, a);

    scheduler.engine_mut().set_volume(session, 0.95).unwrap();
    assert!(scheduler.fade_up());
    scheduler.poll_timers(Duration::from_millis(100));

    assert_eq!(scheduler.engine().volume(session), Some(1.0));
    assert_eq!(scheduler.next_timer_deadline(), None);

    // Already at the top: one more step, still 1.0, then the ramp ends.
    assert!(scheduler.fade_up());
    scheduler.poll_timers(Duration::from_secs(1));
    assert_eq!(scheduler.engine().volume(session), Some(1.0));
    assert_eq!(scheduler.next_timer_deadline(), None);
}

#[test]
fn test_fade_down_converges_to_silence() {
    let mut scheduler = scheduler();
    let a = scheduler.add_cue(CueProperties::audio("a.wav"));
    scheduler.advance();
    let session = session_of(&scheduler, a);

    scheduler.engine_mut().set_volume(session, 0.05).unwrap();
    assert!(scheduler.fade_down());
    scheduler.poll_timers(Duration::from_millis(100));
    assert_eq!(scheduler.engine().volume(session), Some(0.0));
    assert_eq!(scheduler.next_timer_deadline(), None);

    // A full ramp from the top reaches exactly zero and stops.
    scheduler.engine_mut().set_volume(session, 1.0).unwrap();
    scheduler.take_events();
    assert!(scheduler.fade_down());
    scheduler.poll_timers(Duration::from_secs(10));

    let volumes: Vec<f32> = scheduler
        .take_events()
        .into_iter()
        .filter_map(|event| match event {
            ControlEvent::VolumeChanged { volume, .. } => Some(volume),
            _ => None,
        })
        .collect();
    assert!(volumes.windows(2).all(|pair| pair[1] < pair[0]));
    assert_eq!(volumes.last(), Some(&0.0));
    assert!(volumes.len() <= 21);
    assert_eq!(scheduler.engine().volume(session), Some(0.0));
}

#[test]
fn test_transport_without_session_is_a_no_op() {
    let mut scheduler = scheduler();
    assert!(!scheduler.play());
    assert!(!scheduler.pause());
    assert!(!scheduler.stop());
    assert!(!scheduler.fade_up());
    assert!(!scheduler.fade_down());

    scheduler.add_cue(CueProperties::command("true").with_post_wait(5));
    scheduler.advance();
    assert!(!scheduler.fade_down());
    assert!(!scheduler.pause());
}

#[test]
fn test_global_pause_play_and_stop() {
    let mut scheduler = scheduler();
    let a = scheduler.add_cue(CueProperties::audio("a.wav"));
    scheduler.advance();
    let session = session_of(&scheduler, a);

    assert!(scheduler.pause());
    assert_eq!(status_of(&scheduler, a), CueStatus::Paused);
    assert_eq!(
        scheduler.engine().session(session).unwrap().state,
        EngineState::Paused
    );

    assert!(scheduler.play());
    assert_eq!(status_of(&scheduler, a), CueStatus::Running);

    assert!(scheduler.stop());
    assert_eq!(status_of(&scheduler, a), CueStatus::Stopped);
    assert!(scheduler.engine().is_closed(session));
    assert!(!scheduler.stop());
}

#[test]
fn test_slideshow_next_and_prev_wrap() {
    let mut scheduler = scheduler();
    let show = scheduler.add_cue(CueProperties::slideshow(images(&["0.png", "1.png", "2.png"]), 0));
    scheduler.advance();

    assert_eq!(scheduler.slideshow().index(), 0);
    assert_eq!(scheduler.slideshow_prev(), Some(2));
    assert_eq!(scheduler.slideshow_next(), Some(0));
    assert_eq!(scheduler.slideshow_next(), Some(1));
    assert_eq!(scheduler.slideshow_next(), Some(2));
    assert_eq!(scheduler.slideshow_next(), Some(0));

    // Alternating steps cancel out.
    assert_eq!(scheduler.slideshow_next(), Some(1));
    assert_eq!(scheduler.slideshow_prev(), Some(0));
    assert_eq!(scheduler.slideshow_prev(), Some(2));
    assert_eq!(scheduler.slideshow_next(), Some(0));

    assert_eq!(
        scheduler.surface().renderer().current(),
        Some(Path::new("0.png"))
    );
    assert_eq!(scheduler.surface().content(), SurfaceContent::Slideshow(show));
}

#[test]
fn test_slideshow_without_interval_never_advances() {
    let mut scheduler = scheduler();
    let show = scheduler.add_cue(CueProperties::slideshow(images(&["0.png", "1.png", "2.png"]), 0));
    scheduler.advance();

    assert_eq!(scheduler.next_timer_deadline(), None);
    scheduler.poll_timers(Duration::from_secs(3_600));

    assert_eq!(scheduler.slideshow().index(), 0);
    assert_eq!(
        scheduler.surface().renderer().shown(),
        [PathBuf::from("0.png")]
    );
    assert_eq!(status_of(&scheduler, show), CueStatus::Running);

    assert_eq!(scheduler.slideshow_next(), Some(1));
    assert_eq!(
        scheduler.surface().renderer().current(),
        Some(Path::new("1.png"))
    );
}

#[test]
fn test_timed_slideshow_wraps_and_pauses() {
    let mut scheduler = scheduler();
    let show = scheduler.add_cue(CueProperties::slideshow(images(&["0.png", "1.png", "2.png"]), 2));
    scheduler.advance();

    scheduler.poll_timers(Duration::from_secs(2));
    assert_eq!(scheduler.slideshow().index(), 1);
    scheduler.poll_timers(Duration::from_secs(6));
    assert_eq!(scheduler.slideshow().index(), 0);

    assert!(scheduler.slideshow_pause());
    assert_eq!(status_of(&scheduler, show), CueStatus::Paused);
    scheduler.poll_timers(Duration::from_secs(20));
    assert_eq!(scheduler.slideshow().index(), 0);

    // Manual steps work while paused.
    assert_eq!(scheduler.slideshow_next(), Some(1));

    assert!(scheduler.slideshow_resume());
    assert_eq!(status_of(&scheduler, show), CueStatus::Running);
    scheduler.poll_timers(Duration::from_secs(22));
    assert_eq!(scheduler.slideshow().index(), 2);
}

#[test]
fn test_unreadable_slide_is_skipped() {
    let renderer = RecordingRenderer::new().with_unreadable("1.png");
    let mut scheduler = scheduler_with(RecordingEngine::new(), renderer);
    scheduler.add_cue(CueProperties::slideshow(images(&["0.png", "1.png", "2.png"]), 1));
    scheduler.advance();

    scheduler.poll_timers(Duration::from_secs(1));
    assert_eq!(scheduler.slideshow().index(), 2);
    assert_eq!(scheduler.slideshow_prev(), Some(0));
}

#[test]
fn test_new_visual_cue_takes_the_surface() {
    let mut scheduler = scheduler();
    let show = scheduler.add_cue(CueProperties::slideshow(images(&["0.png"]), 5));
    let video = scheduler.add_cue(CueProperties::video("v.mp4"));
    let other = scheduler.add_cue(CueProperties::video("w.mp4"));

    scheduler.advance();
    assert_eq!(scheduler.slideshow().owner(), Some(show));

    scheduler.advance();
    assert_eq!(scheduler.slideshow().owner(), None);
    assert_eq!(status_of(&scheduler, show), CueStatus::Stopped);
    assert_eq!(scheduler.surface().content(), SurfaceContent::Video(video));
    let first = session_of(&scheduler, video);

    scheduler.advance();
    assert!(scheduler.engine().is_closed(first));
    assert_eq!(status_of(&scheduler, video), CueStatus::Stopped);
    assert_eq!(scheduler.surface().content(), SurfaceContent::Video(other));
    assert_eq!(scheduler.output_owner(), Some(other));
    assert_eq!(scheduler.engine().live_sessions().len(), 1);
}

#[test]
fn test_audio_keeps_playing_under_a_slideshow() {
    let mut scheduler = scheduler();
    let music = scheduler.add_cue(CueProperties::audio("music.wav"));
    let show = scheduler.add_cue(CueProperties::slideshow(images(&["0.png"]), 0));

    scheduler.advance();
    let session = session_of(&scheduler, music);
    scheduler.advance();

    assert_eq!(scheduler.active_cue(), Some(show));
    assert_eq!(status_of(&scheduler, music), CueStatus::Running);
    assert_eq!(scheduler.engine().live_sessions(), vec![session]);
    assert_eq!(scheduler.output_owner(), Some(music));
}

#[test]
fn test_hold_last_frame_freezes_the_surface() {
    let mut scheduler = scheduler();
    scheduler.set_fallback_image(Some(PathBuf::from("logo.png")));
    let held = scheduler.add_cue(CueProperties::video("held.mp4").holding_last_frame());
    let plain = scheduler.add_cue(CueProperties::video("plain.mp4"));

    scheduler.advance();
    let session = session_of(&scheduler, held);
    finish(&mut scheduler, held);

    assert_eq!(status_of(&scheduler, held), CueStatus::Finished);
    assert_eq!(scheduler.surface().content(), SurfaceContent::Frozen(held));
    assert_eq!(
        scheduler.engine().session(session).unwrap().state,
        EngineState::Paused
    );
    assert_eq!(scheduler.output_owner(), Some(held));

    scheduler.advance();
    assert!(scheduler.engine().is_closed(session));
    assert_eq!(status_of(&scheduler, held), CueStatus::Finished);
    assert_eq!(scheduler.surface().content(), SurfaceContent::Video(plain));

    finish(&mut scheduler, plain);
    assert_eq!(scheduler.surface().content(), SurfaceContent::Fallback);
    assert_eq!(
        scheduler.surface().renderer().current(),
        Some(Path::new("logo.png"))
    );
}

#[test]
fn test_reorder_keeps_cue_identity() {
    let mut scheduler = scheduler();
    let a = scheduler.add_cue(CueProperties::audio("a.wav").with_auto_advance());
    let b = scheduler.add_cue(CueProperties::audio("b.wav"));
    let c = scheduler.add_cue(CueProperties::audio("c.wav"));

    scheduler.advance();
    let session = session_of(&scheduler, a);

    assert!(matches!(
        scheduler.reorder(&[a, b]),
        Err(CueError::InvalidOrder)
    ));
    scheduler.reorder(&[c, a, b]).unwrap();

    assert_eq!(scheduler.active_cue(), Some(a));
    assert_eq!(session_of(&scheduler, a), session);
    let rows = scheduler.summaries();
    assert_eq!(rows[1].id, a);
    assert!(rows[1].live);
    assert_eq!(rows[1].number, 2);

    finish(&mut scheduler, a);
    assert_eq!(scheduler.active_cue(), Some(b));
    assert_eq!(status_of(&scheduler, c), CueStatus::Idle);
}

#[test]
fn test_removing_another_cue_leaves_playback_alone() {
    let mut scheduler = scheduler();
    let a = scheduler.add_cue(CueProperties::audio("a.wav").with_auto_advance());
    let b = scheduler.add_cue(CueProperties::audio("b.wav"));
    let c = scheduler.add_cue(CueProperties::audio("c.wav"));

    scheduler.advance();
    let session = session_of(&scheduler, a);
    scheduler.remove_cue(b).unwrap();

    assert_eq!(scheduler.selected_cue(), Some(c));
    assert_eq!(scheduler.engine().live_sessions(), vec![session]);

    finish(&mut scheduler, a);
    assert_eq!(scheduler.active_cue(), Some(c));
}

#[test]
fn test_delete_selected_and_selection_helpers() {
    let mut scheduler = scheduler();
    let a = scheduler.add_cue(CueProperties::command("a"));
    let b = scheduler.add_cue(CueProperties::command("b"));
    let c = scheduler.add_cue(CueProperties::command("c"));

    assert_eq!(scheduler.select_next(), Some(b));
    assert_eq!(scheduler.delete_selected().unwrap(), Some(b));
    assert_eq!(scheduler.selected_cue(), Some(c));
    assert_eq!(scheduler.cues().ids(), vec![a, c]);

    assert_eq!(scheduler.delete_selected().unwrap(), Some(c));
    assert_eq!(scheduler.selected_cue(), Some(a));
}

#[test]
fn test_go_on_empty_list_is_a_no_op() {
    let mut scheduler = scheduler();
    scheduler.advance();
    assert_eq!(scheduler.active_cue(), None);
    assert!(scheduler.take_events().is_empty());
}

#[test]
fn test_go_past_the_end_does_nothing() {
    let mut scheduler = scheduler();
    let a = scheduler.add_cue(CueProperties::command("a"));

    scheduler.advance();
    assert_eq!(scheduler.selected_cue(), None);
    scheduler.take_events();

    scheduler.advance();
    assert_eq!(scheduler.active_cue(), Some(a));
    assert_eq!(scheduler.launcher().commands().len(), 1);
}

#[test]
fn test_shutdown_stops_everything() {
    let mut scheduler = scheduler();
    let music = scheduler.add_cue(CueProperties::audio("music.wav"));
    let show = scheduler.add_cue(CueProperties::slideshow(images(&["0.png"]), 3));
    let later = scheduler.add_cue(CueProperties::audio("later.wav").with_pre_wait(4));

    scheduler.advance();
    scheduler.advance();
    scheduler.advance();
    assert_eq!(status_of(&scheduler, later), CueStatus::PreWait);

    scheduler.shutdown();

    assert!(scheduler.engine().live_sessions().is_empty());
    assert_eq!(scheduler.next_timer_deadline(), None);
    assert_eq!(status_of(&scheduler, music), CueStatus::Stopped);
    assert_eq!(status_of(&scheduler, show), CueStatus::Stopped);
    assert_eq!(status_of(&scheduler, later), CueStatus::Stopped);
    assert_eq!(scheduler.slideshow().owner(), None);
}
