/// Playthrough example — a scripted run of an inline campus story.
///
/// Drives the engine with a simulated clock (no real timers, no terminal
/// input) and prints what a host would render: two sessions against the same
/// storage, showing the typewriter, choices, auto-advance, an ending, and
/// the smart-continue policy landing the second session on the branch the
/// first one never took.
///
/// Run with: cargo run --example playthrough

use dialogue_engine::core::command::Command;
use dialogue_engine::core::controller::{ContinueOutcome, DialogueEngine, NewGameGate};
use dialogue_engine::core::store::StoryStore;
use dialogue_engine::schema::node::{Actions, Choice, StoryNode};

fn main() {
    let mut engine = DialogueEngine::builder().story(campus_story()).build();
    let mut now: u64 = 0;

    println!("========================================");
    println!("   FIRST DAY");
    println!("   A Campus Story in Two Sittings");
    println!("========================================");

    // --- Session 1: sit with Alex, turn in early ---
    banner("Session 1 — a fresh start");

    let batch = match engine.start_new_game(now) {
        NewGameGate::Started(batch) => batch,
        NewGameGate::NeedsConfirmation => unreachable!("storage starts empty"),
    };
    narrate(&run(&mut engine, batch, &mut now));

    let batch = engine.advance(now); // dialogue-box click into the courtyard
    narrate(&run(&mut engine, batch, &mut now));

    let batch = engine.select_choice("courtyard", 0, now); // sit with Alex
    narrate(&run(&mut engine, batch, &mut now));

    let batch = engine.advance(now); // on to the evening
    narrate(&run(&mut engine, batch, &mut now));

    let batch = engine.select_choice("evening", 0, now); // call it a night
    narrate(&run(&mut engine, batch, &mut now));

    // --- Session 2: continue lands on the unexplored branch ---
    banner("Session 2 — smart continue");

    let batch = match engine.continue_game(now) {
        ContinueOutcome::Resumed(batch) => batch,
        ContinueOutcome::AllBranchesPlayed => unreachable!("the library is unvisited"),
    };
    narrate(&run(&mut engine, batch, &mut now));
    println!("(resumed on '{}')", engine.current_node().unwrap());

    let batch = engine.select_choice("courtyard", 1, now); // head to the library
    let seen = run(&mut engine, batch, &mut now);
    narrate(&seen);

    // Let auto-advance carry us out of the library.
    let seen = engine.set_auto_advance(true);
    let delay = seen.iter().find_map(|cmd| match cmd {
        Command::ScheduleAdvance { delay_ms, token } => Some((*delay_ms, *token)),
        _ => None,
    });
    let (delay_ms, token) = delay.expect("a linear node schedules the transition");
    println!("(auto-advance waits {delay_ms} ms)");
    now += delay_ms;
    let batch = engine.advance_fired(token, now);
    narrate(&run(&mut engine, batch, &mut now));

    let batch = engine.select_choice("evening", 1, now); // study late
    narrate(&run(&mut engine, batch, &mut now));

    banner("Where a third session would resume");
    println!("{:?}", engine.resume_target());
}

fn banner(title: &str) {
    println!();
    println!("--- {title} ---");
    println!();
}

/// Follow the reveal-tick chain on a simulated clock until the engine stops
/// scheduling ticks, and return every other command in order.
fn run(engine: &mut DialogueEngine, mut batch: Vec<Command>, now: &mut u64) -> Vec<Command> {
    let mut seen = Vec::new();
    loop {
        let mut next_tick = None;
        for cmd in batch {
            match cmd {
                Command::ScheduleTick { delay_ms, token } => next_tick = Some((delay_ms, token)),
                other => seen.push(other),
            }
        }
        match next_tick {
            Some((delay_ms, token)) => {
                *now += delay_ms;
                batch = engine.reveal_tick(token, *now);
            }
            None => return seen,
        }
    }
}

/// Print a command batch the way a host would render it, collapsing the
/// progressive text updates into the finished line.
fn narrate(commands: &[Command]) {
    let mut speaker = String::new();
    let mut line = String::new();

    for cmd in commands {
        match cmd {
            Command::SetBackground { image: Some(image) } => println!("[scene: {image}]"),
            Command::SetCharacter { image: Some(image) } => println!("[character: {image}]"),
            Command::PlayMusic { track: Some(track), .. } => println!("[music: {track}]"),
            Command::PlaySound { effect, .. } => println!("[sfx: {effect}]"),
            Command::SetSpeaker { name } => speaker = name.clone(),
            Command::SetDialogueText { text } => line = text.clone(),
            Command::ShowChoices { choices } => {
                flush_line(&mut speaker, &mut line);
                for choice in choices {
                    println!("   {}) {}", choice.index + 1, choice.label);
                }
            }
            Command::ShowEnding { text, treatment, .. } => {
                println!();
                println!("=== {text} === ({treatment})");
            }
            _ => {}
        }
    }
    flush_line(&mut speaker, &mut line);
}

fn flush_line(speaker: &mut String, line: &mut String) {
    if line.is_empty() {
        return;
    }
    if speaker.is_empty() {
        println!("{line}");
    } else {
        println!("{speaker}: {line}");
    }
    line.clear();
}

fn campus_story() -> StoryStore {
    let mut story = StoryStore::new();

    story.insert(
        "start",
        StoryNode {
            text: "A new semester begins. The quad hums with first-day nerves.".to_string(),
            background: Some("campus_morning.png".to_string()),
            music: Some("morning_theme.ogg".to_string()),
            goto: Some("courtyard".to_string()),
            ..Default::default()
        },
    );

    story.insert(
        "courtyard",
        StoryNode {
            name: Some("Alex".to_string()),
            character_image: Some("alex_wave.png".to_string()),
            text: "Hey! You're in my study group, right? Want to grab a seat?".to_string(),
            action: Actions(vec![
                "set_flag(met_alex, true)".to_string()
            ]),
            choices: vec![
                Choice {
                    label: "Sit with Alex".to_string(),
                    goto: "bench".to_string(),
                    action: Actions(vec![
                        "increment(friendship_score)".to_string(),
                    ]),
                    ..Default::default()
                },
                Choice {
                    label: "Head to the library".to_string(),
                    goto: "library".to_string(),
                    action: Actions(vec![
                        "increment(study_level)".to_string(),
                    ]),
                    ..Default::default()
                },
            ],
            ..Default::default()
        },
    );

    story.insert(
        "bench",
        StoryNode {
            name: Some("Alex".to_string()),
            text: "You and Alex talk until the shadows stretch across the quad.".to_string(),
            goto: Some("evening".to_string()),
            ..Default::default()
        },
    );

    story.insert(
        "library",
        StoryNode {
            background: Some("library.png".to_string()),
            text: "The reading room is almost empty. You get more done in two hours than you did all week.".to_string(),
            action: Actions(vec![
                "increment(study_level)".to_string()
            ]),
            goto: Some("evening".to_string()),
            ..Default::default()
        },
    );

    story.insert(
        "evening",
        StoryNode {
            background: Some("dorm_night.png".to_string()),
            text: "Back in your room, the day settles over you. Friendship {friendship_score}, study level {study_level}.".to_string(),
            choices: vec![
                Choice {
                    label: "Call it a night".to_string(),
                    goto: "ending_rest".to_string(),
                    ..Default::default()
                },
                Choice {
                    label: "Study late".to_string(),
                    goto: "ending_grind".to_string(),
                    condition: Some("study_level>=1".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        },
    );

    story.insert(
        "ending_rest",
        StoryNode {
            text: "You drift off before your head hits the pillow. Tomorrow is another day."
                .to_string(),
            ..Default::default()
        },
    );

    story.insert(
        "ending_grind",
        StoryNode {
            text: "The lamp burns until three. Whatever the exam brings, you will meet it prepared."
                .to_string(),
            ..Default::default()
        },
    );

    story
}
