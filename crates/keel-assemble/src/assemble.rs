use serde_json::{json, Map, Value};

use keel_aml::{encode, AmlEditError, AmlNode, AmlObject, AmlPath, AmlTable, SsdtBuilder};
use keel_engine::{NodeEditOp, PatchDirective, PatchPlan, Subsystem, Warning};

use crate::config::{set_path, ConfigDocument, ConfigTemplate};
use crate::drivers::{order_drivers, DriverPick};
use crate::error::AssembleError;

/// File name the configuration references the supplemental SSDT under.
pub const SUPPLEMENTAL_SSDT_NAME: &str = "SSDT-KEEL.aml";

const SUPPLEMENTAL_OEM_TABLE_ID: &str = "KEELPTCH";

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledOutput {
    pub config: ConfigDocument,
    /// One slot per input table, in the same order. `Some(bytes)` is the
    /// re-encoded form of a table a directive edited; untouched tables stay
    /// `None` so callers keep their original firmware bytes.
    pub tables: Vec<Option<Vec<u8>>>,
    /// Encoded supplemental SSDT, when any directive targeted it.
    pub supplemental_ssdt: Option<Vec<u8>>,
    /// Driver ids in final load order.
    pub drivers: Vec<String>,
    /// Plan warnings plus anything assembly added.
    pub warnings: Vec<Warning>,
}

/// Apply a plan: merge property overrides into the template, run node edits
/// against clones of the parsed tables, re-encode the tables that changed
/// and order the drivers. Assembly is the only place directives take effect;
/// running the same plan against the same inputs again produces
/// byte-identical output.
pub fn assemble(
    plan: &PatchPlan,
    template: &ConfigTemplate,
    tables: &[AmlTable],
) -> Result<AssembledOutput, AssembleError> {
    let mut root = template.clone().into_root();
    let mut warnings = plan.warnings.clone();
    let mut patched: Vec<AmlTable> = tables.to_vec();
    let mut touched = vec![false; tables.len()];
    let mut supplemental = SsdtBuilder::new(SUPPLEMENTAL_OEM_TABLE_ID);
    let mut picks: Vec<DriverPick> = Vec::new();

    for directive in &plan.directives {
        match directive {
            PatchDirective::PropertyOverride { key_path, value } => {
                set_path(&mut root, key_path, value.clone(), &mut warnings);
            }
            PatchDirective::AcpiNodeEdit { table, path, op } => {
                apply_edit(&mut patched, *table, path, op)?;
                touched[*table] = true;
            }
            PatchDirective::AcpiNodeInsert {
                table: Some(index),
                parent,
                node,
            } => {
                if insert_node(&mut patched, *index, parent, node)? {
                    touched[*index] = true;
                }
            }
            PatchDirective::AcpiNodeInsert {
                table: None,
                parent,
                node,
            } => supplemental.push(wrap_in_scopes(parent, node.clone())),
            PatchDirective::DriverSelection {
                id,
                mandatory,
                load_hint,
                depends_on,
            } => picks.push(DriverPick {
                id: id.clone(),
                mandatory: *mandatory,
                load_hint: *load_hint,
                depends_on: depends_on.clone(),
            }),
        }
    }

    let drivers = order_drivers(&picks, &mut warnings)?;
    if !drivers.is_empty() {
        root.insert(
            "Drivers".to_owned(),
            Value::Array(drivers.iter().cloned().map(Value::String).collect()),
        );
    }

    let supplemental_ssdt = if supplemental.is_empty() {
        None
    } else {
        record_supplemental(&mut root, &mut warnings);
        Some(encode(&supplemental.build())?)
    };

    let tables = patched
        .iter()
        .zip(&touched)
        .map(|(table, &hit)| hit.then(|| encode(table)).transpose())
        .collect::<Result<Vec<_>, _>>()?;

    tracing::info!(
        tables = tables.len(),
        edited = touched.iter().filter(|&&hit| hit).count(),
        drivers = drivers.len(),
        supplemental = supplemental_ssdt.is_some(),
        warnings = warnings.len(),
        "assembled"
    );

    Ok(AssembledOutput {
        config: ConfigDocument::new(root),
        tables,
        supplemental_ssdt,
        drivers,
        warnings,
    })
}

fn table_mut(
    tables: &mut [AmlTable],
    index: usize,
) -> Result<&mut AmlTable, AssembleError> {
    let count = tables.len();
    tables
        .get_mut(index)
        .ok_or(AssembleError::NoSuchTable { index, count })
}

fn apply_edit(
    tables: &mut [AmlTable],
    index: usize,
    path: &AmlPath,
    op: &NodeEditOp,
) -> Result<(), AssembleError> {
    let table = table_mut(tables, index)?;
    let node = table
        .root
        .descend_mut(path.segs())
        .ok_or_else(|| AssembleError::MissingNode { path: path.clone() })?;
    let result = match op {
        NodeEditOp::Rename(name) => {
            node.rename(*name);
            Ok(())
        }
        NodeEditOp::ReplaceMethodBody(body) => node.set_method_body(body.clone()),
        NodeEditOp::SetNameInteger(value) => node.set_name_integer(*value),
        NodeEditOp::SetPackageElement { index, value } => {
            node.set_package_element(*index, *value)
        }
    };
    result.map_err(|source| AssembleError::Edit {
        path: path.clone(),
        source,
    })
}

/// Returns whether the table changed; re-inserting an identical node leaves
/// it untouched.
fn insert_node(
    tables: &mut [AmlTable],
    index: usize,
    parent: &AmlPath,
    node: &AmlNode,
) -> Result<bool, AssembleError> {
    let table = table_mut(tables, index)?;
    let target = table
        .root
        .descend_mut(parent.segs())
        .ok_or_else(|| AssembleError::MissingNode {
            path: parent.clone(),
        })?;
    if let Some(existing) = target.child(node.name()) {
        if existing == node {
            return Ok(false);
        }
        return Err(AssembleError::Edit {
            path: parent.child(node.name()),
            source: AmlEditError::DuplicateChild {
                name: node.name().to_string(),
            },
        });
    }
    target
        .insert_child(node.clone())
        .map(|()| true)
        .map_err(|source| AssembleError::Edit {
            path: parent.clone(),
            source,
        })
}

/// Re-open the parent path as nested scopes around `node`, the way a
/// supplemental table has to address names owned by the base tables.
fn wrap_in_scopes(parent: &AmlPath, node: AmlNode) -> AmlNode {
    let mut out = node;
    for &seg in parent.segs().iter().rev() {
        out = AmlNode::with_children(seg, AmlObject::Scope, vec![out]);
    }
    out
}

fn record_supplemental(root: &mut Map<String, Value>, warnings: &mut Vec<Warning>) {
    let acpi = root
        .entry("Acpi".to_owned())
        .or_insert_with(|| Value::Object(Map::new()));
    if !acpi.is_object() {
        warnings.push(Warning {
            subsystem: Subsystem::Assembly,
            subject: "Acpi".to_owned(),
            message: "template key held a scalar; replaced with an object".to_owned(),
        });
        *acpi = Value::Object(Map::new());
    }
    let Value::Object(acpi) = acpi else {
        unreachable!()
    };

    let add = acpi
        .entry("Add".to_owned())
        .or_insert_with(|| Value::Array(Vec::new()));
    if !add.is_array() {
        warnings.push(Warning {
            subsystem: Subsystem::Assembly,
            subject: "Acpi.Add".to_owned(),
            message: "template key held a non-array; replaced with an array".to_owned(),
        });
        *add = Value::Array(Vec::new());
    }
    let Value::Array(add) = add else { unreachable!() };

    let entry = json!({ "Path": SUPPLEMENTAL_SSDT_NAME, "Enabled": true });
    if !add.contains(&entry) {
        add.push(entry);
    }
}
