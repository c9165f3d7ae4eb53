//! # Spokecalc CLI
//!
//! Terminal front end for spoke_core: calculate spoke lengths, keep a
//! collection of saved calculations, exchange them as JSON files and browse
//! the bundled presets.
//!
//! ```text
//! spokecalc calc --erd 590 --pcd-left 45 --pcd-right 45 --flange-left 35 \
//!     --flange-right 20 --spoke-hole 2.6 --spokes 32 --cross-left 3 --cross-right 3
//! spokecalc save "Front wheel" --preset "Disc front 32H 3-cross"
//! spokecalc list
//! spokecalc export front.json --id 3f2a
//! ```

mod terminal;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use clap::{ArgAction, Args, Parser, Subcommand};
use spoke_core::calculations::{CalculationResult, Side, SideBreakdown, SpokeBreakdown};
use spoke_core::exchange;
use spoke_core::inputs::{CalculationInputs, Field};
use spoke_core::notify::{report, Confirm, Notifier, Severity};
use spoke_core::presets::PresetCatalog;
use spoke_core::saved::SavedCalculation;
use spoke_core::session::Session;
use spoke_core::storage::{FileStore, KeyValueStore, MemoryStore};
use spoke_core::{CalcError, CalcResult, Settings};
use tracing_subscriber::EnvFilter;

use terminal::{prompt_field, prompt_line, AssumeYes, StdinConfirm, TerminalNotifier};

#[derive(Parser, Debug)]
#[command(name = "spokecalc", version, about = "Bicycle spoke length calculator")]
struct Cli {
    /// Directory holding saved calculations
    #[arg(long, env = "SPOKECALC_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Settings file (JSON)
    #[arg(long, env = "SPOKECALC_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print errors and warnings besides results
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Calculate spoke lengths
    Calc(CalcCommand),
    /// Enter the wheel geometry field by field
    Prompt(PromptCommand),
    /// Calculate and save under a name
    Save(SaveCommand),
    /// List saved calculations
    List,
    /// Show one saved calculation
    Show {
        /// Id or unique id prefix
        id: String,
    },
    /// Delete a saved calculation
    Delete {
        /// Id or unique id prefix
        id: String,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Write a calculation to a JSON file
    Export(ExportCommand),
    /// Read a calculation from a JSON file
    Import(ImportCommand),
    /// List bundled presets
    Presets {
        #[arg(long)]
        category: Option<String>,
    },
}

/// The nine geometry fields. Values are passed through as typed.
#[derive(Args, Debug, Default)]
struct GeometryArgs {
    /// Effective rim diameter (mm)
    #[arg(long, value_name = "MM", allow_hyphen_values = true)]
    erd: Option<String>,
    /// Left flange pitch circle diameter (mm)
    #[arg(long, value_name = "MM", allow_hyphen_values = true)]
    pcd_left: Option<String>,
    /// Right flange pitch circle diameter (mm)
    #[arg(long, value_name = "MM", allow_hyphen_values = true)]
    pcd_right: Option<String>,
    /// Left flange to center distance (mm)
    #[arg(long, value_name = "MM", allow_hyphen_values = true)]
    flange_left: Option<String>,
    /// Right flange to center distance (mm)
    #[arg(long, value_name = "MM", allow_hyphen_values = true)]
    flange_right: Option<String>,
    /// Flange spoke hole diameter (mm)
    #[arg(long, value_name = "MM", allow_hyphen_values = true)]
    spoke_hole: Option<String>,
    /// Total number of spokes
    #[arg(long, value_name = "N", allow_hyphen_values = true)]
    spokes: Option<String>,
    /// Left side crossings (0 = radial)
    #[arg(long, value_name = "N", allow_hyphen_values = true)]
    cross_left: Option<String>,
    /// Right side crossings (0 = radial)
    #[arg(long, value_name = "N", allow_hyphen_values = true)]
    cross_right: Option<String>,
}

impl GeometryArgs {
    fn edits(&self) -> Vec<(Field, &str)> {
        [
            (Field::Erd, &self.erd),
            (Field::PitchCircleLeft, &self.pcd_left),
            (Field::PitchCircleRight, &self.pcd_right),
            (Field::FlangeDistanceLeft, &self.flange_left),
            (Field::FlangeDistanceRight, &self.flange_right),
            (Field::SpokeHoleDiameter, &self.spoke_hole),
            (Field::NumberOfSpokes, &self.spokes),
            (Field::CrossingsLeft, &self.cross_left),
            (Field::CrossingsRight, &self.cross_right),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.as_deref().map(|v| (field, v)))
        .collect()
    }
}

/// Where the working inputs come from. Geometry flags apply on top.
#[derive(Args, Debug)]
struct SourceArgs {
    /// Start from a bundled preset (display name)
    #[arg(long, conflicts_with = "from")]
    preset: Option<String>,
    /// Start from an exported JSON file
    #[arg(long)]
    from: Option<PathBuf>,
    #[command(flatten)]
    geometry: GeometryArgs,
}

#[derive(Args, Debug)]
struct CalcCommand {
    #[command(flatten)]
    source: SourceArgs,
    /// Show intermediate values
    #[arg(long)]
    explain: bool,
    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct PromptCommand {
    /// Pre-fill from a bundled preset
    #[arg(long)]
    preset: Option<String>,
}

#[derive(Args, Debug)]
struct SaveCommand {
    /// Name for the saved calculation
    name: String,
    #[command(flatten)]
    source: SourceArgs,
}

#[derive(Args, Debug)]
struct ExportCommand {
    /// Output file, or a directory to get a dated file name
    out: PathBuf,
    /// Export a saved calculation instead
    #[arg(long, conflicts_with_all = ["preset", "from"])]
    id: Option<String>,
    #[command(flatten)]
    source: SourceArgs,
}

#[derive(Args, Debug)]
struct ImportCommand {
    file: PathBuf,
    /// Also save the imported calculation under this name
    #[arg(long)]
    save: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut notifier = TerminalNotifier { quiet: cli.quiet };

    match run(cli, &mut notifier) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<CalcError>() {
                Some(calc) => notifier.notify(&calc.to_string(), calc.severity()),
                None => notifier.notify(&format!("{:#}", e), Severity::Error),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli, notifier: &mut dyn Notifier) -> anyhow::Result<()> {
    let mut settings = Settings::load_or_default(cli.config.as_deref()).context("loading settings")?;
    if cli.data_dir.is_some() {
        settings.data_dir = cli.data_dir.clone();
    }
    init_logging(cli.verbose, &settings.log_filter)?;
    tracing::debug!(?settings, "settings loaded");

    match &cli.command {
        Command::Calc(cmd) => cmd_calc(cmd, &settings, notifier)?,
        Command::Prompt(cmd) => cmd_prompt(cmd, &settings, notifier)?,
        Command::Save(cmd) => cmd_save(cmd, &settings, notifier)?,
        Command::List => cmd_list(&settings)?,
        Command::Show { id } => cmd_show(id, &settings)?,
        Command::Delete { id, yes } => cmd_delete(id, *yes, &settings, notifier)?,
        Command::Export(cmd) => cmd_export(cmd, &settings, notifier)?,
        Command::Import(cmd) => cmd_import(cmd, &settings, notifier)?,
        Command::Presets { category } => cmd_presets(category.as_deref(), notifier),
    }
    Ok(())
}

fn init_logging(verbose: u8, default_filter: &str) -> anyhow::Result<()> {
    let level = match verbose {
        0 => default_filter,
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("initializing logging: {}", e))
}

fn open_saved_session(settings: &Settings) -> CalcResult<Session<FileStore>> {
    let dir = settings.resolved_data_dir()?;
    let store = FileStore::open(&dir, settings.user_id.clone())?;
    Session::open(store, settings.export_metadata())
}

fn scratch_session(settings: &Settings) -> CalcResult<Session<MemoryStore>> {
    Session::open(MemoryStore::new(), settings.export_metadata())
}

/// Bundled presets, warning once if any were skipped
fn presets(notifier: &mut dyn Notifier) -> &'static PresetCatalog {
    let catalog = PresetCatalog::bundled();
    catalog.notify_skipped(notifier);
    catalog
}

fn apply_source<S: KeyValueStore>(
    session: &mut Session<S>,
    source: &SourceArgs,
    notifier: &mut dyn Notifier,
) -> CalcResult<()> {
    if let Some(name) = &source.preset {
        session.apply_preset(presets(notifier).find(name)?);
    }
    if let Some(path) = &source.from {
        let imported = exchange::import_from_file(path)?;
        session.apply_import(&imported);
    }
    for (field, value) in source.geometry.edits() {
        session.commit_field(field, value);
    }
    Ok(())
}

/// Calculate unless the working result is already complete
fn ensure_calculated<S: KeyValueStore>(session: &mut Session<S>) -> CalcResult<CalculationResult> {
    if session.results().is_complete() {
        return Ok(*session.results());
    }
    session.calculate()
}

fn notify_warnings<S: KeyValueStore>(session: &Session<S>, notifier: &mut dyn Notifier) {
    for warning in session.warnings() {
        notifier.notify(
            &format!("{}: {}", warning.field.label(), warning.message),
            Severity::Warning,
        );
    }
}

fn cmd_calc(cmd: &CalcCommand, settings: &Settings, notifier: &mut dyn Notifier) -> anyhow::Result<()> {
    let mut session = scratch_session(settings)?;
    apply_source(&mut session, &cmd.source, notifier)?;
    let breakdown = session.calculate_breakdown()?;
    notify_warnings(&session, notifier);

    if cmd.json {
        let json = if cmd.explain {
            serde_json::to_string_pretty(&breakdown)?
        } else {
            session.export_document()?.to_json()?
        };
        println!("{}", json);
        return Ok(());
    }

    print_result(session.inputs(), &breakdown.result());
    if cmd.explain {
        print_breakdown(&breakdown);
    }
    Ok(())
}

fn cmd_prompt(cmd: &PromptCommand, settings: &Settings, notifier: &mut dyn Notifier) -> anyhow::Result<()> {
    let mut session = open_saved_session(settings)?;
    if let Some(name) = &cmd.preset {
        session.apply_preset(presets(notifier).find(name)?);
    }

    println!("Spokecalc - Spoke Length Calculator");
    println!("===================================");
    println!("Press Enter to keep the value in brackets.");
    println!();

    for field in Field::ALL {
        let current = session.inputs().get(field).to_string();
        let value = prompt_field(field.label(), &current).context("input ended")?;
        if value != current {
            session.commit_field(field, value);
        }
    }
    println!();

    let results = ensure_calculated(&mut session)?;
    notify_warnings(&session, notifier);
    print_result(session.inputs(), &results);

    println!();
    if let Some(name) = prompt_line("Save this calculation as (blank to skip): ") {
        if !name.trim().is_empty() {
            report(notifier, session.save(&name), |id| {
                format!("Saved '{}' ({})", name.trim(), short_id(&id.to_string()))
            });
        }
    }
    Ok(())
}

fn cmd_save(cmd: &SaveCommand, settings: &Settings, notifier: &mut dyn Notifier) -> anyhow::Result<()> {
    let mut session = open_saved_session(settings)?;
    apply_source(&mut session, &cmd.source, notifier)?;
    let results = ensure_calculated(&mut session)?;
    notify_warnings(&session, notifier);

    let id = session.save(&cmd.name)?;
    print_result(session.inputs(), &results);
    notifier.notify(&format!("Saved '{}' ({})", cmd.name.trim(), id), Severity::Success);
    Ok(())
}

fn cmd_list(settings: &Settings) -> anyhow::Result<()> {
    let session = open_saved_session(settings)?;
    if session.saved().is_empty() {
        println!("No saved calculations.");
        return Ok(());
    }

    println!("{:<10} {:<30} {:>9} {:>9}  {}", "ID", "NAME", "LEFT", "RIGHT", "SAVED");
    for entry in session.saved().iter() {
        println!(
            "{:<10} {:<30} {:>9} {:>9}  {}",
            short_id(&entry.id.to_string()),
            truncate(&entry.name, 30),
            format_length(entry.results.left),
            format_length(entry.results.right),
            entry.timestamp
        );
    }
    Ok(())
}

fn cmd_show(id: &str, settings: &Settings) -> anyhow::Result<()> {
    let session = open_saved_session(settings)?;
    let entry = session.saved().find(id)?;
    print_saved(entry);
    Ok(())
}

fn cmd_delete(id: &str, yes: bool, settings: &Settings, notifier: &mut dyn Notifier) -> anyhow::Result<()> {
    let mut session = open_saved_session(settings)?;
    let entry = session.saved().find(id)?;
    let (uuid, name) = (entry.id, entry.name.clone());

    let mut confirm: Box<dyn Confirm> = if yes {
        Box::new(AssumeYes)
    } else {
        Box::new(StdinConfirm)
    };
    if session.delete_confirmed(&uuid, confirm.as_mut())? {
        notifier.notify(&format!("Deleted '{}'", name), Severity::Success);
    } else {
        notifier.notify("Nothing deleted", Severity::Info);
    }
    Ok(())
}

fn cmd_export(cmd: &ExportCommand, settings: &Settings, notifier: &mut dyn Notifier) -> anyhow::Result<()> {
    let document = match &cmd.id {
        Some(id) => {
            let mut session = open_saved_session(settings)?;
            let uuid = session.saved().find(id)?.id;
            session.load(&uuid)?;
            for (field, value) in cmd.source.geometry.edits() {
                session.commit_field(field, value);
            }
            ensure_calculated(&mut session)?;
            session.export_document()?
        }
        None => {
            let mut session = scratch_session(settings)?;
            apply_source(&mut session, &cmd.source, notifier)?;
            ensure_calculated(&mut session)?;
            notify_warnings(&session, notifier);
            session.export_document()?
        }
    };

    let path = export_path(&cmd.out);
    exchange::export_to_file(&document, &path)?;
    notifier.notify(&format!("Exported to {}", path.display()), Severity::Success);
    Ok(())
}

fn export_path(out: &Path) -> PathBuf {
    if out.is_dir() {
        out.join(exchange::suggested_file_name(Utc::now()))
    } else {
        out.to_path_buf()
    }
}

fn cmd_import(cmd: &ImportCommand, settings: &Settings, notifier: &mut dyn Notifier) -> anyhow::Result<()> {
    let imported = exchange::import_from_file(&cmd.file)?;
    if let Some(metadata) = &imported.metadata {
        tracing::info!(calculator = %metadata.calculator, version = %metadata.version, "import source");
    }

    match &cmd.save {
        Some(name) => {
            let mut session = open_saved_session(settings)?;
            session.apply_import(&imported);
            let results = ensure_calculated(&mut session)?;
            notify_warnings(&session, notifier);
            let id = session.save(name)?;
            print_result(session.inputs(), &results);
            notifier.notify(&format!("Imported and saved '{}' ({})", name.trim(), id), Severity::Success);
        }
        None => {
            let mut session = scratch_session(settings)?;
            session.apply_import(&imported);
            notify_warnings(&session, notifier);
            print_result(session.inputs(), session.results());
            notifier.notify(&format!("Imported {}", cmd.file.display()), Severity::Success);
        }
    }
    Ok(())
}

fn cmd_presets(category: Option<&str>, notifier: &mut dyn Notifier) {
    let catalog = presets(notifier);
    let selected: Vec<_> = match category {
        Some(category) => catalog.in_category(category).collect(),
        None => catalog.presets().iter().collect(),
    };

    if selected.is_empty() {
        println!("No presets found.");
        println!("Categories: {}", catalog.categories().join(", "));
        return;
    }

    for preset in selected {
        println!(
            "{:<32} {:<9} L {:>7}  R {:>7}",
            preset.display_name,
            preset.category.as_deref().unwrap_or("-"),
            format_length(preset.results.left),
            format_length(preset.results.right)
        );
        if let Some(description) = &preset.description {
            println!("    {}", description);
        }
    }
}

fn print_result(inputs: &CalculationInputs, results: &CalculationResult) {
    println!("Spoke lengths (ERD {} mm, {} spokes)", inputs.erd, inputs.number_of_spokes);
    for (side, crossings) in [
        (Side::Left, &inputs.crossings_left),
        (Side::Right, &inputs.crossings_right),
    ] {
        println!(
            "  {:<6} {}  ({})",
            format!("{}:", side.display_name()),
            format_length(results.side(side)),
            lacing(crossings)
        );
    }
}

fn print_breakdown(breakdown: &SpokeBreakdown) {
    println!();
    for side in [&breakdown.left, &breakdown.right] {
        print_side(side);
    }
}

fn print_side(side: &SideBreakdown) {
    println!("{} side:", side.side.display_name());
    println!("  A (flange radius)   = {:.3} mm", side.flange_radius_mm);
    println!("  B (rim radius)      = {:.3} mm", side.rim_radius_mm);
    println!("  spokes per side     = {}", side.spokes_per_side);
    println!("  θ = 2π·{}/{}       = {:.4} rad", side.crossings, side.spokes_per_side, side.angle_rad);
    println!("  C (planar distance) = {:.3} mm", side.chord_mm);
    println!("  raw length          = {:.3} mm", side.raw_length_mm);
    println!("  length (floor 0.1)  = {:.1} mm", side.length_mm);
}

fn print_saved(entry: &SavedCalculation) {
    println!("{}", entry.name);
    println!("  id:    {}", entry.id);
    println!("  saved: {}", entry.timestamp);
    println!();
    for field in Field::ALL {
        println!("  {:<36} {}", field.label(), entry.inputs.get(field));
    }
    println!();
    print_result(&entry.inputs, &entry.results);
}

fn format_length(length: Option<f64>) -> String {
    match length {
        Some(mm) => format!("{:.1} mm", mm),
        None => "-".to_string(),
    }
}

fn lacing(crossings: &str) -> String {
    match crossings.trim() {
        "0" => "radial".to_string(),
        "" => "?".to_string(),
        n => format!("{}-cross", n),
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}
