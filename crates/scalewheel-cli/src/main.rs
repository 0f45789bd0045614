//! scalewheel: inspect and play pitch-class sets from the command line

mod config;

use std::fmt::Write as _;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use scalewheel_core::bits::{self, Direction};
use scalewheel_core::{parse_pitch_class, Convention, NoteName, ScaleEngine, ScalePreset};
use scalewheel_services::{NoteSink, PlayerEvent, ScalePlayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::AppConfig;

/// Command-line options, applied to the engine in field order
#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    preset: Option<String>,
    mask: Option<u16>,
    root: Option<String>,
    mode: i32,
    transpose: i32,
    toggles: Vec<String>,
    convention: Option<Convention>,
    play: bool,
    config: Option<PathBuf>,
    help: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("scalewheel=info".parse()?))
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    if args.help {
        print_usage();
        return Ok(());
    }

    let config = config::load_config(args.config.as_deref());
    let mut engine = ScaleEngine::default();

    // Subscribe before applying anything so the player tracks every change
    let mut player = if args.play {
        let player = ScalePlayer::new(engine.snapshot(), config.playback)
            .context("Invalid [playback] settings")?;
        let feed = player.feed();
        engine.subscribe(move |e| feed.push(e.snapshot()));
        Some(player)
    } else {
        None
    };

    apply_args(&mut engine, &args, &config)?;
    print!("{}", render_report(&engine));

    if let Some(player) = player.as_mut() {
        let events = player.events();
        player.play(LoggingSink {
            names: *engine.note_names(),
        })?;
        for event in events.iter() {
            if event == PlayerEvent::Stopped {
                break;
            }
        }
        player.stop()?;
    }

    Ok(())
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs> {
    let mut parsed = CliArgs::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let mut value = || {
            args.next()
                .with_context(|| format!("{arg} requires a value"))
        };
        match arg.as_str() {
            "--preset" => parsed.preset = Some(value()?),
            "--mask" => {
                let raw = value()?;
                let mask = parse_mask(&raw).with_context(|| format!("Invalid mask {raw:?}"))?;
                parsed.mask = Some(mask);
            }
            "--root" => parsed.root = Some(value()?),
            "--mode" => {
                parsed.mode = value()?.parse().context("--mode requires an integer")?;
            }
            "--transpose" => {
                parsed.transpose = value()?.parse().context("--transpose requires an integer")?;
            }
            "--toggle" => parsed.toggles.push(value()?),
            "--sharps" => parsed.convention = Some(Convention::Sharp),
            "--flats" => parsed.convention = Some(Convention::Flat),
            "--play" => parsed.play = true,
            "--config" => parsed.config = Some(PathBuf::from(value()?)),
            "--help" | "-h" => parsed.help = true,
            other => bail!("Unknown argument: {other}"),
        }
    }

    Ok(parsed)
}

/// Decimal, `0b` binary or `0x` hex
fn parse_mask(raw: &str) -> Result<u16> {
    let mask = if let Some(bin) = raw.strip_prefix("0b") {
        u16::from_str_radix(bin, 2)?
    } else if let Some(hex) = raw.strip_prefix("0x") {
        u16::from_str_radix(hex, 16)?
    } else {
        raw.parse()?
    };
    if mask > bits::FULL_MASK {
        bail!("mask uses bits above 11");
    }
    Ok(mask)
}

fn apply_args(engine: &mut ScaleEngine, args: &CliArgs, config: &AppConfig) -> Result<()> {
    if let Some(name) = &args.preset {
        match config.preset(name) {
            Some(entry) => {
                let mask = entry
                    .value
                    .mask()
                    .with_context(|| format!("Preset {:?} in config", entry.name))?;
                engine.set_mask(mask);
            }
            None => engine.load_preset(ScalePreset::from_name(name)?),
        }
    }
    if let Some(mask) = args.mask {
        engine.set_mask(mask);
    }
    if let Some(root) = &args.root {
        engine.set_root_note(parse_pitch_class(root)? as i32);
    }
    for _ in 0..args.mode.unsigned_abs() {
        if !engine.rotate_mode(args.mode.signum()) {
            break;
        }
    }
    if args.transpose != 0 {
        engine.transpose(args.transpose);
    }
    for note in &args.toggles {
        engine.toggle_note(parse_pitch_class(note)? as i32);
    }

    // Mutations clear any override, so the preference goes last
    let preference = args
        .convention
        .or(config.spelling.prefer.map(Convention::from));
    if preference.is_some() {
        engine.set_spelling_override(preference);
    }
    Ok(())
}

fn classify(engine: &ScaleEngine) -> String {
    let state = engine.state();
    if state.is_diatonic() {
        "diatonic".to_string()
    } else if let Some(offset) = state.is_harmonic_minor() {
        format!("harmonic minor (rotation {offset})")
    } else {
        "other".to_string()
    }
}

fn join(names: &[NoteName]) -> String {
    names.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(" ")
}

/// Active names starting at the root rather than at C
fn scale_from_root(engine: &ScaleEngine) -> Vec<NoteName> {
    let root = engine.root_note() as i32;
    (root..root + 12)
        .filter(|&pitch| engine.state().is_active(pitch))
        .map(|pitch| engine.spelling().name((pitch % 12) as u8))
        .collect()
}

fn render_report(engine: &ScaleEngine) -> String {
    let spelling = engine.spelling();
    let root = engine.root_note();
    let mut out = String::new();

    let intervals: Vec<String> = bits::intervals(engine.shape(), Direction::Ascending)
        .iter()
        .map(|i| i.to_string())
        .collect();
    let convention = match spelling.convention() {
        Convention::Sharp => "sharps",
        Convention::Flat => "flats",
    };
    let fallback = if spelling.is_spelled() { "" } else { " (chromatic fallback)" };

    let _ = writeln!(out, "Root:           {}", spelling.name(root));
    let mask = engine.absolute_mask();
    let _ = writeln!(out, "Mask:           {mask:012b} ({mask})");
    let _ = writeln!(out, "Scale:          {}", join(&scale_from_root(engine)));
    let _ = writeln!(out, "Intervals:      {}", intervals.join(" "));
    let _ = writeln!(out, "Fingerprint:    {}", engine.state().fingerprint());
    let _ = writeln!(out, "Class:          {}", classify(engine));
    let _ = writeln!(out, "Spelling:       {convention}{fallback}");
    let _ = writeln!(out, "Key signature:  {}", join(&engine.key_signature()));
    let _ = writeln!(out, "Chords:");
    for degree in engine.chord_table() {
        let labels = degree.labels(root);
        let labels = if labels.is_empty() { "-".to_string() } else { labels.join(" ") };
        let _ = writeln!(out, "  {:<4}{labels}", spelling.name(degree.pitch_class).to_string());
    }
    out
}

/// Logs each note under the spelling current when playback started
struct LoggingSink {
    names: [NoteName; 12],
}

impl NoteSink for LoggingSink {
    fn play_note(&mut self, note: u8, duration: Duration) {
        info!(note, name = %self.names[(note % 12) as usize], "Note");
        thread::sleep(duration);
    }
}

fn print_usage() {
    println!("Usage: scalewheel [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --preset <NAME>     Load a built-in or configured preset");
    println!("  --mask <N>          Set the shape (decimal, 0b or 0x)");
    println!("  --root <NOTE>       Reinterpret the set from another root");
    println!("  --mode <STEPS>      Rotate through modes (negative goes down)");
    println!("  --transpose <N>     Shift root and notes by N semitones");
    println!("  --toggle <NOTE>     Flip one pitch class (repeatable)");
    println!("  --sharps, --flats   Force a spelling convention");
    println!("  --play              Play the resulting scale");
    println!("  --config <PATH>     Config file (default: <config dir>/scalewheel/config.toml)");
    println!("  --help, -h          Show this help");
}
