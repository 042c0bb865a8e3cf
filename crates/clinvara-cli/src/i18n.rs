// crates/clinvara-cli/src/i18n.rs
// ============================================================================
// Module: CLI Message Catalog
// Description: Message catalog and formatting utilities for the CLI.
// Purpose: Keep every user-facing string in one place.
// Dependencies: Standard library collections.
// ============================================================================

//! ## Overview
//! The `clinvara` binary stores its user-facing strings in a small catalog
//! keyed by stable message identifiers. All runtime output is routed through
//! the [`t!`](crate::t) macro.
//!
//! ## Invariants
//! - The catalog is initialized once and read-only thereafter.
//! - Missing keys fall back to the key itself.
//! - Placeholders are substituted in argument order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A formatted message argument captured by the [`macro@crate::t`] macro.
#[derive(Clone)]
pub struct MessageArg {
    /// Placeholder name used in message templates (e.g., `"path"`).
    pub key: &'static str,
    /// Formatted value substituted for the placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Static catalog entries.
const CATALOG_ITEMS: &[(&str, &str)] = &[
    ("main.version", "clinvara {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("output.serialize_failed", "Failed to serialize output: {error}"),
    ("input.read_failed", "Failed to read {kind} at {path}: {error}"),
    (
        "input.read_too_large",
        "Refusing to read {kind} at {path} because it is {size} bytes (limit {limit}).",
    ),
    ("input.parse_failed", "Failed to parse {kind} at {path}: {error}"),
    ("input.kind.schema", "study schema"),
    ("input.kind.criteria", "criteria document"),
    ("input.kind.patients", "patient documents"),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.validate.ok", "Config valid."),
    ("store.open_failed", "Failed to open store: {error}"),
    ("events.open_failed", "Failed to open event sink at {path}: {error}"),
    ("study.open_failed", "Failed to open study: {error}"),
    ("criteria.invalid", "Criteria invalid: {error}"),
    (
        "criteria.validate.ok",
        "Criteria valid: study {study} version {version} ({predicates} predicates, hash {hash}).",
    ),
    ("evaluate.reference_date_invalid", "Invalid reference date: {error}"),
    ("evaluate.publish_failed", "Failed to publish criteria: {error}"),
    ("evaluate.ingest_failed", "Failed to ingest patient {patient}: {error}"),
    ("evaluate.failed", "Evaluation failed: {error}"),
    ("evaluate.text.header", "study {study} criteria v{version} reference date {date}"),
    ("evaluate.text.entry", "{patient}  {eligibility}  {verdict}"),
    (
        "evaluate.text.summary",
        "{evaluated} evaluated, {skipped} already recorded, {missing} missing",
    ),
    ("explain.failed", "Failed to explain verdict: {error}"),
    ("explain.effective", "Effective eligibility: {value} ({source}, {count} overrides)"),
    ("override.failed", "Override rejected: {error}"),
    (
        "override.applied",
        "Override recorded at audit entry {sequence}: {verdict} is now {value} (computed \
         {computed}).",
    ),
    ("audit.range_invalid", "Audit range bound must be at least 1, got {value}."),
    ("audit.read_failed", "Failed to read audit log: {error}"),
    (
        "audit.halted",
        "Audit chain for study {study} is corrupt starting at entry {sequence}; refusing to \
         continue.",
    ),
    ("audit.verify.ok", "Audit chain intact for study {study}: {checked} entries verified."),
    ("audit.verify.corrupt", "Audit chain for study {study} is corrupt starting at entry {sequence}."),
];

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Formats a catalog message, substituting `{placeholder}` arguments.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog().get(key).copied().unwrap_or(key);
    if args.is_empty() {
        return template.to_string();
    }

    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

/// Returns the static catalog.
fn catalog() -> &'static HashMap<&'static str, &'static str> {
    static CATALOG: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();

    CATALOG.get_or_init(|| CATALOG_ITEMS.iter().copied().collect())
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a catalog message from a key and named arguments.
///
/// ```
/// use clinvara_cli::t;
///
/// let message = t!("config.load_failed", error = "missing file");
/// assert_eq!(message, "Failed to load config: missing file");
/// ```
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::CATALOG_ITEMS;
    use super::MessageArg;
    use super::translate;

    #[test]
    fn catalog_keys_are_unique() {
        let keys: BTreeSet<&str> = CATALOG_ITEMS.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys.len(), CATALOG_ITEMS.len());
    }

    #[test]
    fn translate_substitutes_every_placeholder() {
        let message = translate(
            "audit.verify.corrupt",
            vec![MessageArg::new("study", "CARD-204"), MessageArg::new("sequence", "7")],
        );
        assert_eq!(message, "Audit chain for study CARD-204 is corrupt starting at entry 7.");
    }

    #[test]
    fn unknown_keys_fall_back_to_the_key() {
        assert_eq!(translate("no.such.key", Vec::new()), "no.such.key");
    }

    #[test]
    fn macro_formats_display_values() {
        let message = crate::t!("audit.range_invalid", value = 0);
        assert_eq!(message, "Audit range bound must be at least 1, got 0.");
    }
}
