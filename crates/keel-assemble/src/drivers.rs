use keel_engine::{Subsystem, Warning};

use crate::error::AssembleError;

/// One driver the plan selected, with everything load ordering needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DriverPick {
    pub id: String,
    pub mandatory: bool,
    pub load_hint: u32,
    pub depends_on: Option<String>,
}

/// Final load order: platform-mandatory drivers first in selection order,
/// the rest by load hint, all constrained by `depends_on` edges. A
/// dependency on a driver outside the selection is ignored with a warning;
/// an unsatisfiable edge set is a cycle error.
pub(crate) fn order_drivers(
    picks: &[DriverPick],
    warnings: &mut Vec<Warning>,
) -> Result<Vec<String>, AssembleError> {
    for pick in picks {
        if let Some(dep) = &pick.depends_on {
            if !picks.iter().any(|p| &p.id == dep) {
                warnings.push(Warning {
                    subsystem: Subsystem::Assembly,
                    subject: pick.id.clone(),
                    message: format!("depends on {dep:?}, which is not selected; edge ignored"),
                });
            }
        }
    }

    let mut baseline: Vec<&DriverPick> = picks.iter().filter(|p| p.mandatory).collect();
    let mut rest: Vec<(usize, &DriverPick)> = picks
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.mandatory)
        .collect();
    rest.sort_by_key(|(i, p)| (p.load_hint, *i));
    baseline.extend(rest.into_iter().map(|(_, p)| p));

    // Kahn's algorithm with the baseline as the tie-break: always place the
    // earliest entry whose dependency is satisfied.
    let mut placed: Vec<String> = Vec::with_capacity(baseline.len());
    let mut remaining = baseline;
    while !remaining.is_empty() {
        let ready = remaining.iter().position(|p| match &p.depends_on {
            None => true,
            Some(dep) => {
                placed.iter().any(|x| x == dep) || !remaining.iter().any(|p| &p.id == dep)
            }
        });
        match ready {
            Some(pos) => placed.push(remaining.remove(pos).id.clone()),
            None => {
                return Err(AssembleError::DriverCycle {
                    id: remaining[0].id.clone(),
                })
            }
        }
    }
    Ok(placed)
}
