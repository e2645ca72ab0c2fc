//! bleepdrum: play the drum machine from the keyboard and MIDI, render
//! patterns to WAV, and turn samples into voice tables.

mod keyboard;

use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use bd_formats::{check_budget, import_table, ImportOptions, TABLE_BUDGET};
use bd_master::{
    demo_pattern, list_ports, load_kit, parse_mix_mode, Config, Controller, MidiLink, MixMode,
    Registers, Transport,
};
use clap::{Parser, Subcommand};
use keyboard::{Action, Keyboard};

#[derive(Parser)]
#[command(name = "bleepdrum")]
#[command(version, about = "Four-pad drum machine and sequencer", long_about = None)]
struct Cli {
    /// Config file to use instead of the one in the user config dir
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log debug messages
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play live from the keyboard and MIDI
    Play {
        /// Start with the demo pattern loaded
        #[arg(long)]
        demo: bool,

        /// MIDI input port name (substring)
        #[arg(long)]
        midi: Option<String>,

        /// Do not open a MIDI input
        #[arg(long)]
        no_midi: bool,

        /// "direct" or "blend"
        #[arg(long)]
        mix: Option<String>,
    },

    /// Render the demo pattern to an 8-bit WAV file
    Render {
        /// Output WAV path
        #[arg(short, long)]
        output: PathBuf,

        /// Number of 32-step bars
        #[arg(long, default_value_t = 2)]
        bars: u32,

        /// "direct" or "blend"
        #[arg(long)]
        mix: Option<String>,

        /// Ticks per step
        #[arg(long)]
        step_length: Option<u32>,

        /// Also write the DAC word stream, big-endian, next to the WAV
        #[arg(long)]
        dac: bool,
    },

    /// Convert WAV files to raw 8-bit voice tables
    Import {
        /// Source WAV files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Directory for the .raw tables
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Samples to drop from the end of each table
        #[arg(long, default_value_t = 0)]
        trim: usize,
    },

    /// List MIDI input ports
    Ports,
}

fn init_logging(verbose: bool, interactive: bool) {
    use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode, WriteLogger};

    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };

    if !interactive {
        let _ = TermLogger::init(log_level, simplelog::Config::default(), TerminalMode::Stderr, ColorChoice::Auto);
        return;
    }

    // Raw mode owns the terminal, so live sessions log to a file.
    let log_path = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("bleepdrum")
        .join("bleepdrum.log");
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let log_file = File::create(&log_path).or_else(|_| File::create("/tmp/bleepdrum.log"));
    if let Ok(file) = log_file {
        let _ = WriteLogger::init(log_level, simplelog::Config::default(), file);
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, matches!(cli.command, Commands::Play { .. }));

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Play { demo, midi, no_midi, mix } => {
            let mut config = config;
            apply_mix(&mut config, mix.as_deref())?;
            let kit = load_kit(&config)?;
            let mut controller = Controller::new(&config, kit);
            if demo {
                controller.set_pattern(demo_pattern());
            }
            let link = if no_midi {
                None
            } else {
                open_midi(midi.as_deref().or(config.midi_port()), config.midi_channel())
            };
            play(&mut controller, &config, link)
        }
        Commands::Render { output, bars, mix, step_length, dac } => {
            let mut config = config;
            apply_mix(&mut config, mix.as_deref())?;
            if let Some(ticks) = step_length {
                config.set_step_length(ticks);
            }
            let kit = load_kit(&config)?;
            let mut controller = Controller::new(&config, kit);
            controller.set_pattern(demo_pattern());
            render(&controller, &output, bars)?;
            if dac {
                render_dac(&controller, &output.with_extension("dac"), bars)?;
            }
            Ok(())
        }
        Commands::Import { inputs, out_dir, trim } => import(&inputs, &out_dir, trim),
        Commands::Ports => {
            for (i, name) in list_ports()?.iter().enumerate() {
                println!("{}: {}", i, name);
            }
            Ok(())
        }
    }
}

fn apply_mix(config: &mut Config, mix: Option<&str>) -> Result<(), Box<dyn Error>> {
    if let Some(name) = mix {
        let mode = parse_mix_mode(name).ok_or_else(|| format!("unknown mix mode '{}'", name))?;
        config.set_mix_mode(mode);
    }
    Ok(())
}

/// A missing MIDI device is not fatal; the keyboard still works.
fn open_midi(port: Option<&str>, channel: Option<u8>) -> Option<MidiLink> {
    match MidiLink::connect(port, channel) {
        Ok(link) => Some(link),
        Err(e) => {
            log::warn!(target: "midi", "{}", e);
            None
        }
    }
}

fn play(controller: &mut Controller, config: &Config, midi: Option<MidiLink>) -> Result<(), Box<dyn Error>> {
    println!("a s d f: pads | space: play | r: record | t: tap | z: shift | [ ] - =: pots | q: quit");
    if let Some(link) = &midi {
        println!("MIDI: {}", link.port_name());
    }

    let mut keys = Keyboard::start(config.key_hold())?;
    controller.start_audio();

    let period = Duration::from_secs(1) / config.loop_hz();
    let mut next = Instant::now();
    let mut iteration: u32 = 0;

    loop {
        let now = Instant::now();
        if keys.drain(now)? == Action::Quit {
            break;
        }
        if let Some(link) = &midi {
            for command in link.poll() {
                controller.midi(command);
            }
        }
        controller.poll(&keys.panel(now), now);

        if iteration % 32 == 0 {
            keys.status(&status_line(controller.registers()))?;
            if !controller.is_running() {
                keys.stop()?;
                return Err("audio output stopped; see the log".into());
            }
        }
        iteration = iteration.wrapping_add(1);

        next += period;
        let now = Instant::now();
        if next > now {
            std::thread::sleep(next - now);
        } else {
            next = now;
        }
    }

    keys.stop()?;
    controller.stop_audio();
    Ok(())
}

fn status_line(regs: &Registers) -> String {
    let transport = match regs.transport() {
        Transport::Stopped => "stop",
        Transport::Playing => "play",
        Transport::Recording => "REC ",
    };
    format!(
        "{} | step {:2} | bank {:?} | {:?} | {} | click {} {}",
        transport,
        regs.step().get(),
        regs.bank(),
        regs.direction(),
        match regs.mix_mode() {
            MixMode::Direct => "direct",
            MixMode::Blend => "blend",
        },
        if regs.click_enabled() { "on " } else { "off" },
        if regs.just_erased() { "| erased" } else { "" },
    )
}

fn render(controller: &Controller, path: &Path, bars: u32) -> Result<(), Box<dyn Error>> {
    println!("Rendering {} bars to {} at {} Hz...", bars, path.display(), controller.tick_hz());
    let wav = controller.render_to_wav(bars);
    std::fs::write(path, &wav).map_err(|e| format!("{}: {}", path.display(), e))?;
    println!("Wrote {} bytes", wav.len());
    Ok(())
}

fn render_dac(controller: &Controller, path: &Path, bars: u32) -> Result<(), Box<dyn Error>> {
    let bytes: Vec<u8> = controller
        .render_dac_words(bars)
        .iter()
        .flat_map(|w| w.to_be_bytes())
        .collect();
    std::fs::write(path, &bytes).map_err(|e| format!("{}: {}", path.display(), e))?;
    println!("Wrote {} DAC words to {}", bytes.len() / 2, path.display());
    Ok(())
}

fn import(inputs: &[PathBuf], out_dir: &Path, trim: usize) -> Result<(), Box<dyn Error>> {
    let mut tables = Vec::with_capacity(inputs.len());
    for input in inputs {
        let data = std::fs::read(input).map_err(|e| format!("{}: {}", input.display(), e))?;
        let name = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "table".to_string());
        let table = import_table(&data, &name, ImportOptions { trim })?;
        let out = out_dir.join(format!("{}.raw", name));
        std::fs::write(&out, table.data.as_slice()).map_err(|e| format!("{}: {}", out.display(), e))?;
        println!("{:<16} {:>6} bytes -> {}", name, table.len(), out.display());
        tables.push(table);
    }

    match check_budget(tables.iter()) {
        Ok(used) => println!("total {} of {} bytes", used, TABLE_BUDGET),
        Err(e) => println!("warning: {}", e),
    }
    Ok(())
}
