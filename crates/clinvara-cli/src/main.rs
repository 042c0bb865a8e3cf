// crates/clinvara-cli/src/main.rs
// ============================================================================
// Module: Clinvara CLI Entry Point
// Description: Command dispatcher for screening, review, and audit workflows.
// Purpose: Provide a fail-closed CLI over the screening engine and its stores.
// Dependencies: clap, clinvara-config, clinvara-core, clinvara-store-sqlite, serde, thiserror.
// ============================================================================

//! ## Overview
//! The `clinvara` binary validates configuration and criteria documents,
//! screens patient documents against a published criteria version, and
//! exposes the review workflow (explain, override) and the audit chain (show,
//! verify). Each invocation assembles an engine from `clinvara.toml`; durable
//! state across invocations requires the SQLite store.
//!
//! All user-facing strings are routed through the message catalog. Inputs are
//! untrusted: file reads are size-capped and documents are validated before
//! anything is recorded.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use clinvara_cli::t;
use clinvara_config::ClinvaraConfig;
use clinvara_config::EventSinkType;
use clinvara_core::ActorId;
use clinvara_core::AuditRange;
use clinvara_core::BatchReport;
use clinvara_core::ClinicalDate;
use clinvara_core::CriteriaDocument;
use clinvara_core::CriteriaLimits;
use clinvara_core::CriteriaSet;
use clinvara_core::Eligibility;
use clinvara_core::EngineError;
use clinvara_core::EngineStores;
use clinvara_core::EventSink;
use clinvara_core::FileEventSink;
use clinvara_core::HashError;
use clinvara_core::NoopEventSink;
use clinvara_core::OverrideRequest;
use clinvara_core::PatientDocument;
use clinvara_core::PatientId;
use clinvara_core::ScreeningEngine;
use clinvara_core::SequenceNo;
use clinvara_core::StderrEventSink;
use clinvara_core::StudyContext;
use clinvara_core::StudyId;
use clinvara_core::StudySchema;
use clinvara_core::SystemClock;
use clinvara_core::Verdict;
use clinvara_core::VerdictId;
use clinvara_core::VerdictSource;
use clinvara_core::canonical_json_bytes;
use clinvara_store_sqlite::MAX_RECORD_BYTES;
use clinvara_store_sqlite::SqliteScreeningStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a schema or criteria document.
const MAX_DOCUMENT_BYTES: usize = MAX_RECORD_BYTES;
/// Maximum size of a patient document array.
const MAX_PATIENTS_BYTES: usize = MAX_RECORD_BYTES * 8;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "clinvara", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", short = 'V')]
    show_version: bool,
    /// Selected subcommand.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Criteria document utilities.
    Criteria {
        /// Selected criteria subcommand.
        #[command(subcommand)]
        command: CriteriaCommand,
    },
    /// Publish criteria, ingest patients, and evaluate them.
    Evaluate(EvaluateCommand),
    /// Print the rationale for a stored verdict.
    Explain(ExplainCommand),
    /// Record a reviewer override on a stored verdict.
    Override(OverrideCommand),
    /// Audit chain utilities.
    Audit {
        /// Selected audit subcommand.
        #[command(subcommand)]
        command: AuditCommand,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a `clinvara.toml` file.
    Validate(ConfigArgs),
}

/// Criteria subcommands.
#[derive(Subcommand, Debug)]
enum CriteriaCommand {
    /// Load a criteria document against a study schema without publishing it.
    Validate(CriteriaValidateCommand),
}

/// Audit subcommands.
#[derive(Subcommand, Debug)]
enum AuditCommand {
    /// Print audit entries as canonical JSON lines.
    Show(AuditShowCommand),
    /// Recompute the audit chain; exits non-zero on corruption.
    Verify(AuditVerifyCommand),
}

/// Shared `--config` argument.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Config file path (defaults to `CLINVARA_CONFIG` or `./clinvara.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `criteria validate`.
#[derive(Args, Debug)]
struct CriteriaValidateCommand {
    /// Study schema JSON file.
    #[arg(long, value_name = "PATH")]
    schema: PathBuf,
    /// Criteria document JSON file.
    #[arg(long, value_name = "PATH")]
    criteria: PathBuf,
}

/// Arguments for `evaluate`.
#[derive(Args, Debug)]
struct EvaluateCommand {
    /// Study schema JSON file.
    #[arg(long, value_name = "PATH")]
    schema: PathBuf,
    /// Criteria document JSON file.
    #[arg(long, value_name = "PATH")]
    criteria: PathBuf,
    /// JSON array of patient documents.
    #[arg(long, value_name = "PATH")]
    patients: PathBuf,
    /// Reference date (`YYYY-MM-DD`) for temporal criteria and derived ages.
    #[arg(long, value_name = "DATE")]
    reference_date: String,
    /// Output format.
    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,
    /// Config selection.
    #[command(flatten)]
    config: ConfigArgs,
}

/// Arguments for `explain`.
#[derive(Args, Debug)]
struct ExplainCommand {
    /// Study identifier.
    #[arg(long, value_name = "STUDY")]
    study: String,
    /// Verdict identifier.
    #[arg(long, value_name = "VERDICT")]
    verdict: String,
    /// Output format.
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
    /// Config selection.
    #[command(flatten)]
    config: ConfigArgs,
}

/// Arguments for `override`.
#[derive(Args, Debug)]
struct OverrideCommand {
    /// Study identifier.
    #[arg(long, value_name = "STUDY")]
    study: String,
    /// Verdict identifier.
    #[arg(long, value_name = "VERDICT")]
    verdict: String,
    /// Replacement eligibility value.
    #[arg(long, value_enum)]
    value: OverrideValue,
    /// Mandatory justification.
    #[arg(long, value_name = "TEXT")]
    note: String,
    /// Reviewer identifier.
    #[arg(long, value_name = "ACTOR")]
    actor: String,
    /// Config selection.
    #[command(flatten)]
    config: ConfigArgs,
}

/// Arguments for `audit show`.
#[derive(Args, Debug)]
struct AuditShowCommand {
    /// Study identifier.
    #[arg(long, value_name = "STUDY")]
    study: String,
    /// First sequence number (inclusive).
    #[arg(long, value_name = "N")]
    from: Option<u64>,
    /// Last sequence number (inclusive).
    #[arg(long, value_name = "N")]
    to: Option<u64>,
    /// Config selection.
    #[command(flatten)]
    config: ConfigArgs,
}

/// Arguments for `audit verify`.
#[derive(Args, Debug)]
struct AuditVerifyCommand {
    /// Study identifier.
    #[arg(long, value_name = "STUDY")]
    study: String,
    /// Config selection.
    #[command(flatten)]
    config: ConfigArgs,
}

/// Output formats for commands that print records.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Canonical JSON.
    Json,
    /// Human-readable text.
    Text,
}

/// Override values accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OverrideValue {
    /// Patient is eligible.
    Eligible,
    /// Patient is ineligible.
    Ineligible,
    /// Eligibility cannot be decided.
    Indeterminate,
}

impl From<OverrideValue> for Eligibility {
    fn from(value: OverrideValue) -> Self {
        match value {
            OverrideValue::Eligible => Self::Eligible,
            OverrideValue::Ineligible => Self::Ineligible,
            OverrideValue::Indeterminate => Self::Indeterminate,
        }
    }
}

/// JSON output of `evaluate`.
#[derive(Serialize)]
struct EvaluationOutput<'a> {
    /// Batch outcome for the submitted patients.
    batch: &'a BatchReport,
    /// Every verdict recorded at the criteria version.
    verdicts: &'a [Verdict],
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing failures.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Localized message.
    message: String,
}

impl CliError {
    /// Creates a new CLI error.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// Result alias for CLI operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Config {
            command: ConfigCommand::Validate(command),
        } => command_config_validate(&command),
        Commands::Criteria {
            command: CriteriaCommand::Validate(command),
        } => command_criteria_validate(&command),
        Commands::Evaluate(command) => command_evaluate(&command),
        Commands::Explain(command) => command_explain(&command),
        Commands::Override(command) => command_override(command),
        Commands::Audit {
            command,
        } => match command {
            AuditCommand::Show(command) => command_audit_show(&command),
            AuditCommand::Verify(command) => command_audit_verify(&command),
        },
    }
}

/// Prints top-level help.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Engine Assembly
// ============================================================================

/// Loads the config and assembles an engine over the configured stores.
fn build_engine(config_path: Option<&Path>) -> CliResult<ScreeningEngine> {
    let config = ClinvaraConfig::load(config_path)
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    let stores = match config.store.sqlite_config() {
        Some(sqlite) => SqliteScreeningStore::new(&sqlite)
            .map_err(|err| CliError::new(t!("store.open_failed", error = err)))?
            .engine_stores(),
        None => EngineStores::in_memory(),
    };
    let events: Arc<dyn EventSink> = match (config.events.sink, &config.events.path) {
        (EventSinkType::File, Some(path)) => Arc::new(FileEventSink::new(path).map_err(|err| {
            CliError::new(t!("events.open_failed", path = path.display(), error = err))
        })?),
        (EventSinkType::Stderr, _) => Arc::new(StderrEventSink),
        (EventSinkType::None | EventSinkType::File, _) => Arc::new(NoopEventSink),
    };
    Ok(ScreeningEngine::new(config.engine.engine_config(), stores, Arc::new(SystemClock), events))
}

/// Opens a study for review and audit commands, which need no schema.
fn open_existing_study(engine: &ScreeningEngine, study: &str) -> CliResult<StudyContext> {
    engine
        .open_study_without_schema(StudyId::new(study))
        .map_err(|err| CliError::new(t!("study.open_failed", error = err)))
}

/// Halts when the study's audit chain does not verify.
fn ensure_audit_intact(engine: &ScreeningEngine, ctx: &StudyContext) -> CliResult<()> {
    match engine.ensure_audit_intact(ctx) {
        Ok(_) => Ok(()),
        Err(EngineError::AuditCorruption(corruption)) => Err(CliError::new(t!(
            "audit.halted",
            study = corruption.study_id,
            sequence = corruption.sequence_no
        ))),
        Err(err) => Err(CliError::new(t!("audit.read_failed", error = err))),
    }
}

// ============================================================================
// SECTION: Config And Criteria Commands
// ============================================================================

/// Executes `config validate`.
fn command_config_validate(command: &ConfigArgs) -> CliResult<ExitCode> {
    let _config = ClinvaraConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    write_stdout_line(&t!("config.validate.ok"))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `criteria validate` using the default structural limits.
fn command_criteria_validate(command: &CriteriaValidateCommand) -> CliResult<ExitCode> {
    let schema: StudySchema =
        read_json(&command.schema, &t!("input.kind.schema"), MAX_DOCUMENT_BYTES)?;
    let document: CriteriaDocument =
        read_json(&command.criteria, &t!("input.kind.criteria"), MAX_DOCUMENT_BYTES)?;
    schema.validate().map_err(|err| CliError::new(t!("criteria.invalid", error = err)))?;
    let criteria = CriteriaSet::load(&document, &schema, &CriteriaLimits::default())
        .map_err(|err| CliError::new(t!("criteria.invalid", error = err)))?;
    let hash = criteria
        .canonical_hash()
        .map_err(|err| CliError::new(t!("criteria.invalid", error = err)))?;
    write_stdout_line(&t!(
        "criteria.validate.ok",
        study = criteria.study_id,
        version = criteria.version,
        predicates = criteria.predicates().len(),
        hash = hash.value
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Screening Commands
// ============================================================================

/// Executes `evaluate`: verify the chain, publish, ingest, batch evaluate,
/// then list verdicts.
fn command_evaluate(command: &EvaluateCommand) -> CliResult<ExitCode> {
    let reference_date = ClinicalDate::parse(&command.reference_date)
        .map_err(|err| CliError::new(t!("evaluate.reference_date_invalid", error = err)))?;
    let schema: StudySchema =
        read_json(&command.schema, &t!("input.kind.schema"), MAX_DOCUMENT_BYTES)?;
    let document: CriteriaDocument =
        read_json(&command.criteria, &t!("input.kind.criteria"), MAX_DOCUMENT_BYTES)?;
    let patients: Vec<PatientDocument> =
        read_json(&command.patients, &t!("input.kind.patients"), MAX_PATIENTS_BYTES)?;

    let engine = build_engine(command.config.config.as_deref())?;
    let ctx = engine
        .open_study(schema)
        .map_err(|err| CliError::new(t!("study.open_failed", error = err)))?;
    ensure_audit_intact(&engine, &ctx)?;
    let published = engine
        .publish_criteria(&ctx, &document)
        .map_err(|err| CliError::new(t!("evaluate.publish_failed", error = err)))?;
    let version = published.criteria.version;

    for patient in &patients {
        engine.ingest_patient(&ctx, patient).map_err(|err| {
            CliError::new(t!("evaluate.ingest_failed", patient = patient.patient_id, error = err))
        })?;
    }
    let patient_ids: Vec<PatientId> =
        patients.iter().map(|patient| patient.patient_id.clone()).collect();
    let report = engine
        .reevaluate_batch(&ctx, version, &patient_ids, reference_date)
        .map_err(|err| CliError::new(t!("evaluate.failed", error = err)))?;
    let verdicts = engine
        .list_verdicts(&ctx, version)
        .map_err(|err| CliError::new(t!("evaluate.failed", error = err)))?;

    match command.format {
        OutputFormat::Json => write_canonical_json(&EvaluationOutput {
            batch: &report,
            verdicts: &verdicts,
        })?,
        OutputFormat::Text => render_evaluation_text(&report, &verdicts, reference_date)?,
    }
    Ok(ExitCode::SUCCESS)
}

/// Renders `evaluate` output as one line per verdict.
fn render_evaluation_text(
    report: &BatchReport,
    verdicts: &[Verdict],
    reference_date: ClinicalDate,
) -> CliResult<()> {
    let mut output = String::new();
    output.push_str(&t!(
        "evaluate.text.header",
        study = report.study_id,
        version = report.version,
        date = reference_date
    ));
    output.push('\n');
    for verdict in verdicts {
        output.push_str(&t!(
            "evaluate.text.entry",
            patient = verdict.patient_id,
            eligibility = verdict.eligibility,
            verdict = verdict.verdict_id
        ));
        output.push('\n');
    }
    output.push_str(&t!(
        "evaluate.text.summary",
        evaluated = report.evaluated.len(),
        skipped = report.skipped.len(),
        missing = report.missing.len()
    ));
    output.push('\n');
    write_stdout_bytes(output.as_bytes()).map_err(|err| CliError::new(output_error("stdout", &err)))
}

// ============================================================================
// SECTION: Review Commands
// ============================================================================

/// Executes `explain`.
fn command_explain(command: &ExplainCommand) -> CliResult<ExitCode> {
    let engine = build_engine(command.config.config.as_deref())?;
    let ctx = open_existing_study(&engine, &command.study)?;
    ensure_audit_intact(&engine, &ctx)?;
    let verdict_id = VerdictId::new(command.verdict.as_str());
    let rationale = engine
        .explain_verdict(&ctx, &verdict_id)
        .map_err(|err| CliError::new(t!("explain.failed", error = err)))?;
    let effective = engine
        .effective_verdict(&ctx, &verdict_id)
        .map_err(|err| CliError::new(t!("explain.failed", error = err)))?;

    match command.format {
        OutputFormat::Json => write_canonical_json(&rationale)?,
        OutputFormat::Text => {
            let source = match effective.source {
                VerdictSource::Computed => "computed",
                VerdictSource::Override => "override",
            };
            let mut output = rationale.render_text();
            output.push('\n');
            output.push_str(&t!(
                "explain.effective",
                value = effective.value,
                source = source,
                count = effective.override_count
            ));
            output.push('\n');
            write_stdout_bytes(output.as_bytes())
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes `override`.
fn command_override(command: OverrideCommand) -> CliResult<ExitCode> {
    let engine = build_engine(command.config.config.as_deref())?;
    let ctx = open_existing_study(&engine, &command.study)?;
    ensure_audit_intact(&engine, &ctx)?;
    let verdict_id = VerdictId::new(command.verdict);
    let request = OverrideRequest {
        verdict_id: verdict_id.clone(),
        value: command.value.into(),
        note: command.note,
        actor: Some(ActorId::new(command.actor)),
        timestamp: None,
    };
    let applied = engine
        .submit_override(&ctx, &request)
        .map_err(|err| CliError::new(t!("override.failed", error = err)))?;
    let effective = engine
        .effective_verdict(&ctx, &verdict_id)
        .map_err(|err| CliError::new(t!("override.failed", error = err)))?;
    write_stdout_line(&t!(
        "override.applied",
        sequence = applied.sequence_no,
        verdict = applied.verdict_id,
        value = effective.value,
        computed = effective.computed
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Audit Commands
// ============================================================================

/// Executes `audit show`.
fn command_audit_show(command: &AuditShowCommand) -> CliResult<ExitCode> {
    let range = AuditRange {
        from: command.from.map(sequence_bound).transpose()?,
        to: command.to.map(sequence_bound).transpose()?,
    };
    let engine = build_engine(command.config.config.as_deref())?;
    let ctx = open_existing_study(&engine, &command.study)?;
    let entries = engine
        .audit_log(&ctx, range)
        .map_err(|err| CliError::new(t!("audit.read_failed", error = err)))?;
    for entry in &entries {
        write_canonical_json(entry)?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes `audit verify`, failing when the chain does not verify.
fn command_audit_verify(command: &AuditVerifyCommand) -> CliResult<ExitCode> {
    let engine = build_engine(command.config.config.as_deref())?;
    let ctx = open_existing_study(&engine, &command.study)?;
    let report = engine
        .verify_audit_log(&ctx)
        .map_err(|err| CliError::new(t!("audit.read_failed", error = err)))?;
    if let Some(sequence_no) = report.first_corrupt_at {
        return Ok(emit_error(&t!(
            "audit.verify.corrupt",
            study = report.study_id,
            sequence = sequence_no
        )));
    }
    write_stdout_line(&t!("audit.verify.ok", study = report.study_id, checked = report.checked))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Converts a raw range bound into a sequence number.
fn sequence_bound(raw: u64) -> CliResult<SequenceNo> {
    SequenceNo::from_raw(raw).ok_or_else(|| CliError::new(t!("audit.range_invalid", value = raw)))
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Errors returned by bounded file reads.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let metadata = file.metadata().map_err(ReadLimitError::Io)?;
    let size = metadata.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mut limited = file.take(limit.saturating_add(1));
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        let actual = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        return Err(ReadLimitError::TooLarge {
            size: actual,
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Reads and parses a size-capped JSON input file.
fn read_json<T: DeserializeOwned>(path: &Path, kind: &str, max_bytes: usize) -> CliResult<T> {
    let bytes = read_bytes_with_limit(path, max_bytes).map_err(|err| match err {
        ReadLimitError::Io(err) => CliError::new(t!(
            "input.read_failed",
            kind = kind,
            path = path.display(),
            error = err
        )),
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(t!(
            "input.read_too_large",
            kind = kind,
            path = path.display(),
            size = size,
            limit = limit
        )),
    })?;
    serde_json::from_slice(&bytes).map_err(|err| {
        CliError::new(t!("input.parse_failed", kind = kind, path = path.display(), error = err))
    })
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes raw bytes to stdout without adding a newline.
fn write_stdout_bytes(bytes: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes)
}

/// Writes a value as one line of canonical JSON.
fn write_canonical_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut bytes = canonical_json_bytes(value).map_err(|err| match err {
        HashError::Canonicalization(error) => {
            CliError::new(t!("output.serialize_failed", error = error))
        }
    })?;
    bytes.push(b'\n');
    write_stdout_bytes(&bytes).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats a localized output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
