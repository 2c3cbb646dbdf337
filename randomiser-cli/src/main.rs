use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

use randomiser_core::host::HostSnapshot;
use randomiser_core::{run, RandomiserSettings};

#[derive(Debug, Parser)]
#[command(
    name = "eos-randomiser",
    version,
    about = "Explorers of Sky item list and IQ table randomiser"
)]
struct Args {
    /// Host image snapshot (JSON) to randomise.
    #[arg(long)]
    input: PathBuf,

    /// Where to write the randomised snapshot.
    #[arg(long)]
    output: PathBuf,

    /// Settings file (JSON). Flags below switch steps on in addition.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Overrides the seed from the settings file.
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    global_items: bool,

    #[arg(long)]
    randomize_tactics: bool,

    #[arg(long)]
    randomize_iq_gain: bool,

    #[arg(long)]
    randomize_iq_groups: bool,

    #[arg(long)]
    randomize_iq_skills: bool,

    /// Item ids that may never appear in a global item list.
    #[arg(long, value_delimiter = ',')]
    exclude_items: Vec<u16>,

    #[arg(long, default_value_t = false)]
    debug: bool,
}

fn setup_logging(debug: bool) -> std::result::Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(if debug { LevelFilter::Debug } else { LevelFilter::Info })
        .chain(std::io::stderr())
        .apply()
}

fn build_settings(args: &Args) -> randomiser_core::Result<RandomiserSettings> {
    let mut settings = match args.settings.as_ref() {
        Some(path) => RandomiserSettings::load(path)?,
        None => RandomiserSettings::default(),
    };

    if let Some(seed) = args.seed {
        settings.seed = seed;
    }
    settings.global_items |= args.global_items;
    settings.iq.randomize_tactics |= args.randomize_tactics;
    settings.iq.randomize_iq_gain |= args.randomize_iq_gain;
    settings.iq.randomize_iq_groups |= args.randomize_iq_groups;
    settings.iq.randomize_iq_skills |= args.randomize_iq_skills;
    settings.items.excluded.extend(&args.exclude_items);

    Ok(settings)
}

fn randomise(args: &Args) -> randomiser_core::Result<()> {
    let settings = build_settings(args)?;
    log::info!("Seed: {}", settings.seed);

    let mut image = HostSnapshot::load(&args.input)?;
    let catalog = image.catalog.clone();
    let summary = run(&settings, &catalog, &mut image)?;
    image.save(&args.output)?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn main() {
    let args = Args::parse();

    if let Err(err) = setup_logging(args.debug) {
        eprintln!("Failed to set up logging: {err}");
    }

    if let Err(err) = randomise(&args) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
