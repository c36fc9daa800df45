use std::thread;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use stageshow_core::{ControlCommand, ControlEvent, CueSummary};
use tokio::sync::mpsc;

const HELP: &str = "space/g GO | up/down select | del remove | p play | k pause | s stop | \
                    +/- fade | n/b slide | w save | l list | q quit";

pub fn enable() -> Result<(), anyhow::Error> {
    enable_raw_mode()?;
    print!("{}\r\n", HELP);
    Ok(())
}

pub fn disable() {
    if let Err(e) = disable_raw_mode() {
        log::warn!("Failed to restore terminal: {}", e);
    }
}

/// Read keys on a background thread and forward them as console commands.
pub fn spawn_keyboard(tx: mpsc::UnboundedSender<ControlCommand>) {
    thread::spawn(move || loop {
        let key = match event::read() {
            Ok(Event::Key(KeyEvent {
                code,
                modifiers,
                kind: KeyEventKind::Press,
                ..
            })) => (code, modifiers),
            Ok(_) => continue,
            Err(e) => {
                log::error!("Keyboard input failed: {}", e);
                let _ = tx.send(ControlCommand::Shutdown);
                return;
            }
        };

        let command = match key {
            (KeyCode::Char(' ') | KeyCode::Char('g'), _) => ControlCommand::Advance,
            (KeyCode::Delete | KeyCode::Backspace, _) => ControlCommand::RemoveSelected,
            (KeyCode::Up, _) => ControlCommand::SelectPrevious,
            (KeyCode::Down, _) => ControlCommand::SelectNext,
            (KeyCode::Char('c'), KeyModifiers::CONTROL) | (KeyCode::Char('q'), _) => {
                let _ = tx.send(ControlCommand::Shutdown);
                return;
            }
            (KeyCode::Char('p'), _) => ControlCommand::Play,
            (KeyCode::Char('k'), _) => ControlCommand::Pause,
            (KeyCode::Char('s'), _) => ControlCommand::Stop,
            (KeyCode::Char('+') | KeyCode::Char('='), _) => ControlCommand::FadeUp,
            (KeyCode::Char('-'), _) => ControlCommand::FadeDown,
            (KeyCode::Char('n') | KeyCode::Right, _) => ControlCommand::SlideshowNext,
            (KeyCode::Char('b') | KeyCode::Left, _) => ControlCommand::SlideshowPrevious,
            (KeyCode::Char('w'), _) => ControlCommand::SaveShow,
            (KeyCode::Char('l'), _) => ControlCommand::QueryCueList,
            _ => continue,
        };

        if tx.send(command).is_err() {
            return;
        }
    });
}

/// Print console events until the console shuts down.
pub fn print_events(mut rx: mpsc::UnboundedReceiver<ControlEvent>) {
    while let Some(event) = rx.blocking_recv() {
        match event {
            ControlEvent::CueList { cues } => print_cue_list(&cues),
            ControlEvent::Progress(update) => print!(
                "  {} {:>3}% {} left\r\n",
                update.cue, update.percent, update.remaining
            ),
            ControlEvent::Countdown(countdown) => print!(
                "  {} {:?} {}s\r\n",
                countdown.cue,
                countdown.phase,
                countdown.remaining_seconds()
            ),
            ControlEvent::SlideChanged { cue, index, path } => {
                print!("  {} slide {}: {}\r\n", cue, index + 1, path.display())
            }
            ControlEvent::VolumeChanged { cue, volume } => {
                print!("  {} volume {:.0}%\r\n", cue, volume * 100.0)
            }
            ControlEvent::Error { message } => print!("! {}\r\n", message),
            ControlEvent::ShowLoaded { name, .. } => print!("Show: {}\r\n", name),
            ControlEvent::ShowSaved { path } => print!("Saved {}\r\n", path.display()),
            ControlEvent::ProgramEnded { cue } => print!("End of program after {}\r\n", cue),
            ControlEvent::ShutdownComplete => print!("Bye\r\n"),
            // Reflected in the next cue list snapshot.
            _ => {}
        }
    }
}

fn print_cue_list(cues: &[CueSummary]) {
    print!("\r\n");
    for cue in cues {
        let live = if cue.live { '>' } else { ' ' };
        let selected = if cue.selected { '*' } else { ' ' };
        print!(
            "{}{} {:>3} {:<24} {:<10} pre {:>5} {:>10} post {:>5} {:>3}% {:?}\r\n",
            live,
            selected,
            cue.number,
            cue.name,
            cue.kind,
            cue.pre_wait,
            cue.action,
            cue.post_wait,
            cue.progress_percent,
            cue.status
        );
    }
    if cues.is_empty() {
        print!("(no cues)\r\n");
    }
}
