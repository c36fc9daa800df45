use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use stageshow_core::testing::{RecordingEngine, RecordingLauncher, RecordingRenderer};
use stageshow_core::{
    ControlCommand, ControlEvent, CueConsole, CueProperties, CueScheduler, CueStatus,
    SchedulerSettings, Settings, ShowManager,
};

fn sample_cues() -> Vec<CueProperties> {
    vec![
        CueProperties::audio("intro.wav")
            .named("Walk-in music")
            .with_auto_advance()
            .looping(),
        CueProperties::video("opener.mp4")
            .with_pre_wait(3)
            .holding_last_frame(),
        CueProperties::slideshow(vec![PathBuf::from("a.png"), PathBuf::from("b.png")], 8),
        CueProperties::command("echo lights").with_post_wait(2),
    ]
}

/// The same cues as they come back out of a cue list, with default names filled in.
fn named(cues: Vec<CueProperties>) -> Vec<CueProperties> {
    cues.into_iter()
        .map(|cue| {
            let name = cue.resolved_name();
            cue.named(name)
        })
        .collect()
}

#[test]
fn test_save_load_and_list() {
    let temp_dir = TempDir::new().unwrap();
    let mut manager = ShowManager::new(Some(temp_dir.path().to_path_buf())).unwrap();

    manager.new_show("Opening Night".to_string());
    let path = manager
        .save_show(sample_cues(), Some(PathBuf::from("logo.png")))
        .unwrap();
    assert_eq!(path, temp_dir.path().join("opening_night.stageshow"));

    let other = temp_dir.path().join("matinee.stageshow");
    manager
        .save_show_as("Matinee".to_string(), other.clone(), Vec::new(), None)
        .unwrap();
    fs::write(temp_dir.path().join("notes.txt"), "not a show").unwrap();

    assert_eq!(manager.list_shows().unwrap(), vec![other, path.clone()]);

    let show = manager.load_show(&path).unwrap();
    assert_eq!(show.name, "Opening Night");
    assert_eq!(show.cues, sample_cues());
    assert_eq!(show.fallback_image, Some(PathBuf::from("logo.png")));
    assert_eq!(manager.current_path(), Some(path.as_path()));
}

#[test]
fn test_load_rejects_garbage() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.stageshow");
    fs::write(&path, "{ not json").unwrap();

    let mut manager = ShowManager::new(Some(temp_dir.path().to_path_buf())).unwrap();
    assert!(manager.load_show(&path).is_err());
    assert!(manager.current_show().is_none());
}

#[test]
fn test_console_loads_show_over_running_cues() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("opening_night.stageshow");
    let mut manager = ShowManager::new(Some(temp_dir.path().to_path_buf())).unwrap();
    manager
        .save_show_as(
            "Opening Night".to_string(),
            path.clone(),
            sample_cues(),
            Some(PathBuf::from("logo.png")),
        )
        .unwrap();

    let scheduler = CueScheduler::new(
        RecordingEngine::new(),
        RecordingRenderer::new(),
        RecordingLauncher::new(),
        SchedulerSettings::default(),
    );
    let shows = ShowManager::new(Some(temp_dir.path().to_path_buf())).unwrap();
    let mut console = CueConsole::new(scheduler, Settings::default(), shows);

    console
        .process_command(ControlCommand::AddCue {
            properties: CueProperties::audio("old.wav"),
        })
        .unwrap();
    console.process_command(ControlCommand::Advance).unwrap();
    let old = console.scheduler().active_cue().unwrap();
    let old_session = console.scheduler().cue(old).unwrap().playback_handle.unwrap();
    console.take_events();

    console
        .process_command(ControlCommand::LoadShow { path: path.clone() })
        .unwrap();

    let scheduler = console.scheduler();
    assert!(scheduler.engine().is_closed(old_session));
    assert_eq!(scheduler.active_cue(), None);
    assert_eq!(scheduler.definitions(), named(sample_cues()));
    assert_eq!(scheduler.selected_cue(), scheduler.cues().first());
    assert!(scheduler
        .cues()
        .iter()
        .all(|cue| cue.status == CueStatus::Idle));
    assert_eq!(console.settings().fallback_image, Some(PathBuf::from("logo.png")));

    let events = console.take_events();
    assert!(events.contains(&ControlEvent::ShowLoaded {
        name: "Opening Night".to_string(),
        path: Some(path),
    }));
    let rows = events
        .iter()
        .rev()
        .find_map(|event| match event {
            ControlEvent::CueList { cues } => Some(cues.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0].name, "Walk-in music");
    assert_eq!(rows[1].name, "opener.mp4");
    assert_eq!(rows[1].pre_wait, "0:03");
    assert_eq!(rows[2].action, "00:00:16");
    assert_eq!(rows[3].name, "echo lights");
}
