use log::warn;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::assembly::{Assembly, AssemblyInfo, BindingInfo, ColumnRef};
use crate::error::{ComposerError, Result};
use crate::viewsheet::Viewsheet;

/// Outcome of a trap check; never persisted
#[derive(Clone, Serialize, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TrapResult {
    pub trap: bool,
    pub messages: Vec<String>,
    /// Columns involved in the new traps
    pub columns: Vec<String>,
}

/// Flags data-binding combinations that would produce misleading aggregates
pub trait TrapValidator: Send + Sync {
    fn check_trap(&self, vs: &Viewsheet, before: &Assembly, after: &Assembly)
    -> Result<TrapResult>;
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Trap {
    message: String,
    column: String,
}

/// Rule based validator; only traps introduced by `after` are reported
#[derive(Debug, Default, Clone, Copy)]
pub struct VSTrapService;

impl VSTrapService {
    fn binding_traps(vs: &Viewsheet, binding: &BindingInfo, traps: &mut BTreeSet<Trap>) {
        let primary = binding.table.as_deref();

        for column in binding.columns() {
            Self::unknown_column(vs, column, primary, traps);
        }

        for measure in &binding.measures {
            if !measure.formula.requires_numeric() {
                continue;
            }
            let Some(table) = measure.column.table(primary) else {
                continue;
            };
            let numeric = vs
                .table(table)
                .and_then(|t| t.column(&measure.column.attribute))
                .map(|c| c.data_type.is_numeric());
            if numeric == Some(false) {
                traps.insert(Trap {
                    message: format!(
                        "{:?} of non-numeric column {}",
                        measure.formula,
                        measure.column.full_name()
                    ),
                    column: measure.column.full_name(),
                });
            }
        }

        let measure_tables: BTreeSet<&str> = binding
            .measures
            .iter()
            .filter_map(|m| m.column.table(primary))
            .collect();
        if measure_tables.is_empty() {
            return;
        }
        for dimension in &binding.dimensions {
            let Some(table) = dimension.table(primary) else {
                continue;
            };
            if !measure_tables.contains(table) {
                traps.insert(Trap {
                    message: format!(
                        "measures from {} grouped by {} of another table",
                        measure_tables.iter().cloned().collect::<Vec<_>>().join(", "),
                        dimension.full_name()
                    ),
                    column: dimension.full_name(),
                });
            }
        }
    }

    fn unknown_column(
        vs: &Viewsheet,
        column: &ColumnRef,
        primary: Option<&str>,
        traps: &mut BTreeSet<Trap>,
    ) {
        let Some(table) = column.table(primary) else {
            return;
        };
        // schemas that were never registered are not validated
        if let Some(schema) = vs.table(table) {
            if schema.column(&column.attribute).is_none() {
                traps.insert(Trap {
                    message: format!("{} is not a column of {}", column.attribute, table),
                    column: column.full_name(),
                });
            }
        }
    }

    fn condition_traps(vs: &Viewsheet, info: &AssemblyInfo, traps: &mut BTreeSet<Trap>) {
        let primary = info.binding.table.as_deref();
        let bound = info.binding.tables();

        for condition in &info.conditions {
            Self::unknown_column(vs, &condition.column, primary, traps);
            if let Some(table) = condition.column.table(primary) {
                if !bound.is_empty() && !bound.contains(table) {
                    traps.insert(Trap {
                        message: format!(
                            "condition on {} which the assembly is not bound to",
                            condition.column.full_name()
                        ),
                        column: condition.column.full_name(),
                    });
                }
            }
        }
    }

    fn traps(vs: &Viewsheet, assembly: &Assembly) -> BTreeSet<Trap> {
        let mut traps = BTreeSet::new();
        let info = assembly.info();
        Self::binding_traps(vs, &info.binding, &mut traps);
        Self::condition_traps(vs, info, &mut traps);

        if let Assembly::Table(table) = assembly {
            for highlight in &table.highlights {
                for condition in &highlight.conditions {
                    Self::unknown_column(vs, &condition.column, info.binding.table.as_deref(), &mut traps);
                }
            }
        }
        traps
    }
}

impl TrapValidator for VSTrapService {
    fn check_trap(
        &self,
        vs: &Viewsheet,
        before: &Assembly,
        after: &Assembly,
    ) -> Result<TrapResult> {
        if before.kind() != after.kind() {
            return Err(ComposerError::TypeMismatch {
                name: after.name().to_string(),
                expected: before.kind(),
                actual: after.kind(),
            });
        }

        let existing = Self::traps(vs, before);
        let introduced: Vec<Trap> = Self::traps(vs, after)
            .into_iter()
            .filter(|t| !existing.contains(t))
            .collect();

        if !introduced.is_empty() {
            warn!("{} trap(s) detected on {}", introduced.len(), after.name());
        }

        let mut columns: Vec<String> = introduced.iter().map(|t| t.column.clone()).collect();
        columns.dedup();
        Ok(TrapResult {
            trap: !introduced.is_empty(),
            messages: introduced.into_iter().map(|t| t.message).collect(),
            columns,
        })
    }
}

/// Puts the original assembly back when dropped, whatever happened in between
struct RestoreGuard<'a> {
    vs: &'a mut Viewsheet,
    original: Option<Assembly>,
}

impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        if let Some(original) = self.original.take() {
            let name = original.name().to_string();
            if let Some(slot) = self.vs.assemblies.get_mut(&name) {
                *slot = original;
            } else {
                self.vs.assemblies.insert(name, original);
            }
        }
    }
}

/// Swap `scratch` in place of the live assembly, validate it against the
/// live configuration and swap the original back. The revision is not touched.
pub fn check_trap_with(
    vs: &mut Viewsheet,
    validator: &dyn TrapValidator,
    scratch: Assembly,
) -> Result<TrapResult> {
    let name = scratch.name().to_string();
    let before = vs.get(&name)?.clone();

    let original = vs
        .assemblies
        .insert(name.clone(), scratch)
        .ok_or_else(|| ComposerError::AssemblyNotFound(name.clone()))?;
    let guard = RestoreGuard {
        vs,
        original: Some(original),
    };

    let after = guard.vs.get(&name)?;
    validator.check_trap(guard.vs, &before, after)
}
