//! omr-grade: grade photographed answer sheets from the command line.

use clap::{Args, Parser, Subcommand};
use omr_grader::score::render::{
    photograph, render_sheet, tilted_placement, PencilMark, PhotoOptions, RenderOptions,
};
use omr_grader::score::SheetVersion;
use omr_grader::{
    grade_batch, image_io, BatchOutcome, GradeConfig, GradeReport, GradeStages, SheetGrader,
    SheetInput,
};
use std::path::{Path, PathBuf};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "omr-grade")]
#[command(about = "Grade photographed multiple-choice answer sheets")]
#[command(version)]
struct Cli {
    /// Log level: off, error, warn, info, debug, trace.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade one or more photographs and print a JSON report per image.
    Grade(GradeArgs),

    /// Write the reference grading configuration as JSON.
    ReferenceConfig {
        /// Output path.
        #[arg(long)]
        out: PathBuf,
    },

    /// Render a synthetic photograph of a filled-in sheet.
    Render(RenderArgs),
}

#[derive(Debug, Clone, Args)]
struct GradeArgs {
    /// Grading configuration (JSON). Defaults to the reference configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sheet version for all images; overrides the printed version marks.
    #[arg(long = "sheet-version")]
    sheet_version: Option<String>,

    /// Write the reports here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Write `<stem>-located.png` and `<stem>-bubbles.png` overlays per image
    /// into this directory. Images are then graded one at a time.
    #[arg(long = "debug-dir")]
    debug_dir: Option<PathBuf>,

    /// Input photographs.
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct RenderArgs {
    /// Grading configuration (JSON). Defaults to the reference configuration.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sheet version to print.
    #[arg(long = "sheet-version")]
    sheet_version: String,

    /// One character per question starting at question 1: a letter marks
    /// that option, `.` leaves the question blank.
    #[arg(long, default_value = "")]
    answers: String,

    /// Clockwise quarter turns of the sheet on the table.
    #[arg(long, default_value = "0")]
    turns: usize,

    /// Output image path (format from extension).
    #[arg(long)]
    out: PathBuf,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Grade(args) => run_grade(&args),
        Commands::ReferenceConfig { out } => run_reference_config(&out),
        Commands::Render(args) => run_render(&args),
    }
}

fn init_logging(level: &str) -> CliResult<()> {
    let level = omr_grader::core::parse_level(level)
        .ok_or_else(|| format!("unknown log level: {level}"))?;
    #[cfg(feature = "tracing")]
    omr_grader::core::init_tracing(level, false);
    #[cfg(not(feature = "tracing"))]
    omr_grader::core::init_with_level(level)?;
    Ok(())
}

fn load_config(path: Option<&Path>) -> CliResult<GradeConfig> {
    match path {
        Some(p) => {
            log::info!("loading config {}", p.display());
            Ok(GradeConfig::load_json(p)?)
        }
        None => Ok(GradeConfig::reference()),
    }
}

fn run_grade(args: &GradeArgs) -> CliResult<()> {
    let grader = load_config(args.config.as_deref())?.build_grader()?;
    let hint = args.sheet_version.as_deref().map(SheetVersion::from);

    let mut inputs = Vec::with_capacity(args.images.len());
    let mut unreadable = Vec::new();
    for (idx, path) in args.images.iter().enumerate() {
        let id = path.display().to_string();
        match image_io::load_raw_image(path) {
            Ok(image) => {
                let mut input = SheetInput::new(id, image);
                input.version_hint = hint.clone();
                inputs.push((idx, input));
            }
            Err(e) => {
                log::warn!("cannot read {id}: {e}");
                unreadable.push((idx, GradeReport::unreadable(id, e.to_string())));
            }
        }
    }

    let (order, sheets): (Vec<usize>, Vec<SheetInput>) = inputs.into_iter().unzip();
    let outcomes = match &args.debug_dir {
        Some(dir) => grade_with_overlays(&grader, &sheets, dir)?,
        None => grade_batch(&grader, &sheets),
    };
    let mut reports: Vec<(usize, GradeReport)> = order
        .into_iter()
        .zip(outcomes)
        .map(|(idx, b)| (idx, GradeReport::from_outcome(b.id, b.outcome)))
        .collect();
    reports.extend(unreadable);
    reports.sort_by_key(|(idx, _)| *idx);
    let reports: Vec<GradeReport> = reports.into_iter().map(|(_, r)| r).collect();

    match &args.out {
        Some(out) => {
            GradeReport::write_all_json(&reports, out)?;
            log::info!("reports written to {}", out.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&reports)?),
    }
    Ok(())
}

fn grade_with_overlays(
    grader: &SheetGrader,
    sheets: &[SheetInput],
    dir: &Path,
) -> CliResult<Vec<BatchOutcome>> {
    std::fs::create_dir_all(dir)?;
    let mut out = Vec::with_capacity(sheets.len());
    for input in sheets {
        let gray = input.image.to_gray();
        let mut stages = GradeStages::default();
        let outcome =
            grader.grade_gray_with_stages(&gray.view(), input.version_hint.as_ref(), &mut stages);

        let stem = Path::new(&input.id)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "sheet".to_string());
        let overlays = grader.debug_overlays(&gray.view(), &stages);
        for (kind, img) in [("located", overlays.located), ("bubbles", overlays.bubbles)] {
            if let Some(img) = img {
                let path = dir.join(format!("{stem}-{kind}.png"));
                image_io::save_gray(&img, &path)?;
                log::info!("{kind} overlay written to {}", path.display());
            }
        }
        out.push(BatchOutcome {
            id: input.id.clone(),
            outcome,
        });
    }
    Ok(out)
}

fn run_reference_config(out: &Path) -> CliResult<()> {
    GradeConfig::reference().write_json(out)?;
    log::info!("reference config written to {}", out.display());
    Ok(())
}

fn run_render(args: &RenderArgs) -> CliResult<()> {
    let cfg = load_config(args.config.as_deref())?;
    let version = SheetVersion::from(args.sheet_version.as_str());
    let marks = parse_marks(&args.answers)?;

    let sheet = render_sheet(&cfg.layout, &version, &marks, &RenderOptions::default())?;
    let (corners, w, h) = tilted_placement(sheet.width, sheet.height, args.turns);
    let photo = photograph(&sheet, corners, w, h, &PhotoOptions::default())
        .ok_or("sheet placement is not a valid projection")?;
    image_io::save_gray(&photo, &args.out)?;
    log::info!("rendered version {} to {}", version, args.out.display());
    Ok(())
}

fn parse_marks(answers: &str) -> CliResult<Vec<PencilMark>> {
    let mut marks = Vec::new();
    for (i, ch) in answers.chars().filter(|c| !c.is_whitespace()).enumerate() {
        let question = i as u32 + 1;
        match ch.to_ascii_uppercase() {
            '.' => {}
            c if c.is_ascii_uppercase() => marks.push(PencilMark::new(question, c as u8 - b'A')),
            other => return Err(format!("invalid answer {other:?} for question {question}").into()),
        }
    }
    Ok(marks)
}
