use thiserror::Error;

use keel_aml::{AmlParseError, AmlTable, DSDT_SIGNATURE};
use keel_assemble::{assemble, AssembleError, ConfigDocument, ConfigTemplate};
use keel_compat::CompatibilityDb;
use keel_engine::{build_plan, EngineError, Subsystem, Warning};
use keel_profile::{HardwareProfile, ProfileError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    #[error("invalid hardware profile: {0}")]
    Profile(#[from] ProfileError),

    /// The DSDT is the root of the namespace; a run cannot proceed without it.
    #[error("cannot parse the DSDT (table {index}): {source}")]
    FatalAcpi {
        index: usize,
        source: AmlParseError,
    },

    #[error(transparent)]
    Compatibility(#[from] EngineError),

    #[error(transparent)]
    Assembly(#[from] AssembleError),
}

/// Everything one run produces, ready to be written out.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub config: ConfigDocument,
    /// One entry per input table, in input order. Only tables a directive
    /// edited are re-encoded; everything else passes through byte-for-byte,
    /// including tables that failed to parse.
    pub patched_tables: Vec<Vec<u8>>,
    pub supplemental_ssdt: Option<Vec<u8>>,
    /// Driver ids in final load order.
    pub drivers: Vec<String>,
    pub warnings: Vec<Warning>,
}

/// The whole pipeline: validate the profile, parse the tables, plan, apply.
///
/// Tables parse on one worker thread each; parsing dominates run time on
/// real DSDTs and the tables are independent. A malformed non-DSDT table
/// degrades to a warning and passes through unpatched.
pub fn run(
    profile: &HardwareProfile,
    raw_tables: &[Vec<u8>],
    db: &CompatibilityDb,
    template: &ConfigTemplate,
) -> Result<RunOutput, RunError> {
    let _span = tracing::info_span!("run", tables = raw_tables.len()).entered();
    profile.validate()?;

    let results: Vec<Result<AmlTable, AmlParseError>> = std::thread::scope(|s| {
        let handles: Vec<_> = raw_tables
            .iter()
            .map(|raw| s.spawn(move || AmlTable::parse(raw)))
            .collect();
        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });

    let mut warnings: Vec<Warning> = Vec::new();
    let mut indices: Vec<usize> = Vec::new();
    let mut tables: Vec<AmlTable> = Vec::new();
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(table) => {
                indices.push(index);
                tables.push(table);
            }
            Err(source) => {
                if raw_tables[index].get(..4) == Some(&DSDT_SIGNATURE[..]) {
                    return Err(RunError::FatalAcpi { index, source });
                }
                warnings.push(Warning {
                    subsystem: Subsystem::Acpi,
                    subject: format!("table {index}"),
                    message: format!("failed to parse: {source}; passed through unpatched"),
                });
            }
        }
    }

    let plan = build_plan(profile, db, &tables)?;
    let assembled = assemble(&plan, template, &tables)?;

    let mut patched_tables = raw_tables.to_vec();
    for (position, &index) in indices.iter().enumerate() {
        if let Some(encoded) = &assembled.tables[position] {
            patched_tables[index] = encoded.clone();
        }
    }
    warnings.extend(assembled.warnings);

    Ok(RunOutput {
        config: assembled.config,
        patched_tables,
        supplemental_ssdt: assembled.supplemental_ssdt,
        drivers: assembled.drivers,
        warnings,
    })
}
