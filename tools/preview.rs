/// Preview — interactive terminal player for dialogue-engine stories.
///
/// Usage: preview --story <path> [--saves <dir>] [--start <node>]
///
/// Commands at the prompt:
///   <n>        — pick choice n
///   (enter)    — advance, or finish the current reveal
///   auto       — toggle auto-advance
///   skip       — toggle skip mode
///   history    — print the session transcript
///   state      — print flags and variables
///   rate <ms>  — set the typewriter base rate
///   help       — list commands
///   quit       — back to the title menu

use dialogue_engine::core::command::{ChoiceView, Command};
use dialogue_engine::core::controller::{ContinueOutcome, DialogueEngine, NewGameGate, Phase};
use dialogue_engine::core::persistence::FileStorage;
use dialogue_engine::core::store::StoryStore;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::{Duration, Instant};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut story_path = None;
    let mut saves_dir = ".vn-saves".to_string();
    let mut start_node = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--story" if i + 1 < args.len() => {
                i += 1;
                story_path = Some(args[i].clone());
            }
            "--saves" if i + 1 < args.len() => {
                i += 1;
                saves_dir = args[i].clone();
            }
            "--start" if i + 1 < args.len() => {
                i += 1;
                start_node = Some(args[i].clone());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let Some(story_path) = story_path else {
        eprintln!("A --story path is required.");
        print_usage();
        std::process::exit(1);
    };

    let path = Path::new(&story_path);
    let story = match path.extension().and_then(|s| s.to_str()) {
        Some("ron") => StoryStore::load_from_ron(path),
        _ => StoryStore::load_from_json(path),
    };
    let story = match story {
        Ok(story) => story,
        Err(e) => {
            eprintln!("ERROR loading story {}: {}", story_path, e);
            std::process::exit(1);
        }
    };
    println!("Loaded {} nodes from {}", story.len(), story_path);

    let mut builder = DialogueEngine::builder()
        .story(story)
        .storage(Box::new(FileStorage::new(&saves_dir)));
    if let Some(ref node) = start_node {
        builder = builder.start_node(node);
    }
    let mut engine = builder.build();

    let epoch = Instant::now();
    title_menu(&mut engine, &epoch);
}

fn now_ms(epoch: &Instant) -> u64 {
    epoch.elapsed().as_millis() as u64
}

fn title_menu(engine: &mut DialogueEngine, epoch: &Instant) {
    let stdin = io::stdin();
    loop {
        println!();
        println!("[n]ew game  [c]ontinue  [q]uit");
        print!("> ");
        io::stdout().flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        match line.trim().to_lowercase().as_str() {
            "n" | "new" => match engine.start_new_game(now_ms(epoch)) {
                NewGameGate::Started(batch) => play_session(engine, batch, epoch),
                NewGameGate::NeedsConfirmation => {
                    if confirm("Overwrite existing progress? [y/N] ") {
                        let batch = engine.confirm_new_game(now_ms(epoch));
                        play_session(engine, batch, epoch);
                    }
                }
            },
            "c" | "continue" => match engine.continue_game(now_ms(epoch)) {
                ContinueOutcome::Resumed(batch) => play_session(engine, batch, epoch),
                ContinueOutcome::AllBranchesPlayed => {
                    println!("Every branch is unlocked.");
                    if confirm("Reset progress and start over? [y/N] ") {
                        let batch = engine.confirm_reset_and_restart(now_ms(epoch));
                        play_session(engine, batch, epoch);
                    }
                }
            },
            "q" | "quit" | "exit" => break,
            other => println!("Unknown command: '{}'", other),
        }
    }
    println!("Goodbye.");
}

fn confirm(question: &str) -> bool {
    print!("{question}");
    io::stdout().flush().ok();
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return false;
    }
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}

/// One play session: drain command batches (honoring scheduled timers with
/// real sleeps), prompting whenever the engine waits on the player.
fn play_session(engine: &mut DialogueEngine, first: Vec<Command>, epoch: &Instant) {
    let mut screen = Screen::default();
    let mut batch = first;
    loop {
        screen.execute(engine, batch, epoch);
        match engine.phase() {
            Phase::Ended => {
                println!();
                return;
            }
            Phase::AwaitingInput => match screen.prompt(engine, epoch) {
                Some(next) => batch = next,
                None => return,
            },
            Phase::Loading | Phase::Presenting => return,
        }
    }
}

#[derive(Default)]
struct Screen {
    /// Text currently on the dialogue line, for delta printing.
    line: String,
    /// Choices as last rendered, in display order.
    choices: Vec<ChoiceView>,
}

impl Screen {
    fn execute(&mut self, engine: &mut DialogueEngine, batch: Vec<Command>, epoch: &Instant) {
        let mut queue: VecDeque<Command> = batch.into();
        while let Some(cmd) = queue.pop_front() {
            match cmd {
                Command::SetBackground { image } => {
                    if let Some(image) = image {
                        println!();
                        println!("[scene: {image}]");
                    }
                }
                Command::SetCharacter { image } => {
                    if let Some(image) = image {
                        println!("[character: {image}]");
                    }
                }
                Command::SetSpeaker { name } => {
                    if !name.is_empty() {
                        println!("{name}:");
                    }
                }
                Command::SetDialogueText { text } => self.print_line(&text),
                Command::ShowChoices { choices } => {
                    println!();
                    println!();
                    for (slot, choice) in choices.iter().enumerate() {
                        println!("  {}) {}", slot + 1, choice.label);
                    }
                    self.choices = choices;
                }
                Command::ClearChoices => self.choices.clear(),
                Command::PlayMusic { track, .. } => match track {
                    Some(track) => println!("[music: {track}]"),
                    None => println!("[music stops]"),
                },
                Command::PlaySound { effect, .. } => println!("[sfx: {effect}]"),
                Command::ShowEnding {
                    text, treatment, ..
                } => {
                    println!();
                    println!();
                    println!("=== {text} ===");
                    println!("({treatment})");
                }
                Command::ScheduleTick { delay_ms, token } => {
                    std::thread::sleep(Duration::from_millis(delay_ms));
                    queue.extend(engine.reveal_tick(token, now_ms(epoch)));
                }
                Command::ScheduleAdvance { delay_ms, token } => {
                    std::thread::sleep(Duration::from_millis(delay_ms));
                    queue.extend(engine.advance_fired(token, now_ms(epoch)));
                }
                Command::ScheduleSkipPoll { delay_ms, token } => {
                    std::thread::sleep(Duration::from_millis(delay_ms));
                    queue.extend(engine.skip_poll_fired(token, now_ms(epoch)));
                }
            }
        }
    }

    fn print_line(&mut self, text: &str) {
        match text.strip_prefix(self.line.as_str()) {
            Some(delta) => print!("{delta}"),
            None => {
                // A new reveal started; drop to a fresh line.
                println!();
                print!("{text}");
            }
        }
        io::stdout().flush().ok();
        self.line = text.to_string();
    }

    fn prompt(&mut self, engine: &mut DialogueEngine, epoch: &Instant) -> Option<Vec<Command>> {
        let stdin = io::stdin();
        loop {
            println!();
            if self.choices.is_empty() {
                print!("[enter]> ");
            } else {
                print!("choice> ");
            }
            io::stdout().flush().ok();

            let mut line = String::new();
            if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
                return None;
            }
            let line = line.trim();

            if line.is_empty() {
                if self.choices.is_empty() {
                    return Some(engine.advance(now_ms(epoch)));
                }
                println!("Pick a choice number.");
                continue;
            }

            if let Ok(slot) = line.parse::<usize>() {
                let Some(view) = self.choices.get(slot.wrapping_sub(1)) else {
                    println!("No such choice: {slot}");
                    continue;
                };
                let index = view.index;
                let Some(node) = engine.current_node().map(str::to_string) else {
                    continue;
                };
                return Some(engine.select_choice(&node, index, now_ms(epoch)));
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts[0].to_lowercase().as_str() {
                "auto" => {
                    let batch = engine.toggle_auto_advance();
                    println!(
                        "Auto-advance {}",
                        if engine.auto_advance() { "on" } else { "off" }
                    );
                    if !batch.is_empty() {
                        return Some(batch);
                    }
                }
                "skip" => {
                    let on = !engine.skip_mode();
                    let batch = engine.set_skip_mode(on);
                    println!("Skip mode {}", if on { "on" } else { "off" });
                    if !batch.is_empty() {
                        return Some(batch);
                    }
                }
                "history" => {
                    for entry in engine.history() {
                        if entry.speaker.is_empty() {
                            println!("  {}", entry.text);
                        } else {
                            println!("  {}: {}", entry.speaker, entry.text);
                        }
                    }
                }
                "state" => {
                    for (name, value) in &engine.game_state().flags {
                        println!("  {name} = {value}");
                    }
                    for (name, value) in &engine.game_state().vars {
                        println!("  {name} = {value}");
                    }
                }
                "rate" => match parts.get(1).and_then(|raw| raw.parse::<f64>().ok()) {
                    Some(ms) => {
                        engine.set_text_reveal_rate(ms);
                        println!("Base rate set to {ms} ms/char");
                    }
                    None => println!("Usage: rate <ms-per-char>"),
                },
                "help" | "h" | "?" => print_help(),
                "quit" | "q" | "title" => return None,
                other => println!("Unknown command: '{}'. Type 'help' for commands.", other),
            }
        }
    }
}

fn print_usage() {
    println!("Preview — interactive terminal player for dialogue-engine stories.");
    println!();
    println!("Usage: preview --story <path> [--saves <dir>] [--start <node>]");
    println!();
    println!("  --story <path>  Story file (.ron, or JSON in the browser format)");
    println!("  --saves <dir>   Save directory (default: .vn-saves)");
    println!("  --start <node>  Override the start node id (default: start)");
}

fn print_help() {
    println!("Commands:");
    println!("  <n>        Pick choice n");
    println!("  (enter)    Advance, or finish the current reveal");
    println!("  auto       Toggle auto-advance");
    println!("  skip       Toggle skip mode");
    println!("  history    Print the session transcript");
    println!("  state      Print flags and variables");
    println!("  rate <ms>  Set the typewriter base rate");
    println!("  help       Show this help");
    println!("  quit       Back to the title menu");
}
