use std::error::Error;

use clap::Subcommand;

use crate::core::now_reading::{NowReading, ReaderTab};

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum NowReadingCommand {
    /// Show the player
    Show,
    /// Hide the player
    Hide,
    /// Resume playback
    Play,
    /// Pause playback
    Pause,
    /// Switch between the cover and the chapter text
    Tab { tab: ReaderTab },
    /// Set the volume between 0.0 and 1.0
    Volume { level: f32 },
    /// Jump to a position in seconds
    Seek { seconds: f64 },
}

/// Apply one command; returns true when the state changed.
pub fn apply(state: &mut NowReading, command: NowReadingCommand) -> bool {
    let before = state.clone();
    match command {
        NowReadingCommand::Show => state.set_show(true),
        NowReadingCommand::Hide => state.set_show(false),
        NowReadingCommand::Play => state.play(),
        NowReadingCommand::Pause => state.pause(),
        NowReadingCommand::Tab { tab } => state.set_tab(tab),
        NowReadingCommand::Volume { level } => state.set_volume(level),
        NowReadingCommand::Seek { seconds } => state.set_seek(seconds),
    }
    *state != before
}

pub fn run_now_reading(command: Option<NowReadingCommand>) -> Result<(), Box<dyn Error>> {
    let mut state = NowReading::load()?;
    if let Some(command) = command {
        if apply(&mut state, command) {
            state.save()?;
        }
    }
    for line in state.describe() {
        println!("{line}");
    }
    if state.current_tab == ReaderTab::Content {
        if let Some(raw) = state
            .current_chapter
            .as_ref()
            .and_then(|chapter| chapter.content.raw.as_deref())
        {
            println!();
            println!("{raw}");
        }
    }
    Ok(())
}
