use serde::{Deserialize, Serialize};

use super::panes::ColumnOption;
use super::{DialogScope, PropertyDialog, TrapCheckDialog};
use crate::assembly::{Assembly, AssemblyKind, ConditionItem, ConditionOp, Junction};
use crate::error::{ComposerError, Result};
use crate::viewsheet::Viewsheet;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConditionItemModel {
    pub column: ColumnOption,
    pub op: ConditionOp,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub negated: bool,
    #[serde(default)]
    pub junction: Junction,
}

impl ConditionItemModel {
    pub fn read(vs: &Viewsheet, item: &ConditionItem, primary: Option<&str>) -> Self {
        ConditionItemModel {
            column: ColumnOption::read(vs, &item.column, primary),
            op: item.op,
            values: item.values.clone(),
            negated: item.negated,
            junction: item.junction,
        }
    }

    pub fn to_item(&self) -> Result<ConditionItem> {
        let count = self.values.len();
        let valid = match self.op.arity() {
            Some(arity) => count == arity,
            None => count > 0,
        };
        if !valid {
            return Err(ComposerError::validation(format!(
                "{:?} on {} cannot take {} value(s)",
                self.op, self.column.attribute, count
            )));
        }

        Ok(ConditionItem {
            column: self.column.to_column(),
            op: self.op,
            values: self.values.clone(),
            negated: self.negated,
            junction: self.junction,
        })
    }
}

pub fn read_conditions(
    vs: &Viewsheet,
    items: &[ConditionItem],
    primary: Option<&str>,
) -> Vec<ConditionItemModel> {
    items
        .iter()
        .map(|item| ConditionItemModel::read(vs, item, primary))
        .collect()
}

pub fn decode_conditions(models: &[ConditionItemModel]) -> Result<Vec<ConditionItem>> {
    models.iter().map(ConditionItemModel::to_item).collect()
}

/// Filter conditions of a data widget
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConditionDialogModel {
    #[serde(default)]
    pub conditions: Vec<ConditionItemModel>,
    /// Read only: columns that conditions can use
    #[serde(default)]
    pub columns: Vec<ColumnOption>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ConditionDialog;

impl PropertyDialog for ConditionDialog {
    type Model = ConditionDialogModel;

    fn kinds(&self) -> &'static [AssemblyKind] {
        &[AssemblyKind::Chart, AssemblyKind::Gauge, AssemblyKind::Table]
    }

    fn read(&self, scope: &DialogScope<'_>, assembly: &Assembly) -> Result<Self::Model> {
        let info = assembly.info();
        let primary = info.binding.table.as_deref();

        Ok(ConditionDialogModel {
            conditions: read_conditions(scope.vs, &info.conditions, primary),
            columns: ColumnOption::available(scope.vs, primary),
        })
    }

    fn write(
        &self,
        model: &Self::Model,
        vs: &Viewsheet,
        assembly: &mut Assembly,
    ) -> Result<Option<String>> {
        self.apply_binding(model, vs, assembly)?;
        Ok(None)
    }
}

impl TrapCheckDialog for ConditionDialog {
    fn apply_binding(
        &self,
        model: &Self::Model,
        _vs: &Viewsheet,
        scratch: &mut Assembly,
    ) -> Result<()> {
        scratch.info_mut().conditions = decode_conditions(&model.conditions)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::ColumnRef;

    fn item(op: ConditionOp, values: &[&str]) -> ConditionItemModel {
        ConditionItemModel {
            column: ColumnOption {
                entity: None,
                attribute: "Region".to_string(),
                data_type: None,
            },
            op,
            values: values.iter().map(|v| v.to_string()).collect(),
            negated: false,
            junction: Junction::And,
        }
    }

    #[test]
    fn operator_arity_is_checked() {
        assert!(item(ConditionOp::Equal, &["East"]).to_item().is_ok());
        assert!(item(ConditionOp::Between, &["1"]).to_item().is_err());
        assert!(item(ConditionOp::OneOf, &[]).to_item().is_err());
        assert!(item(ConditionOp::Null, &[]).to_item().is_ok());
    }

    #[test]
    fn conditions_replace_the_existing_ones() {
        let vs = Viewsheet::new("Filters");
        let mut table = Assembly::create(AssemblyKind::Table, "Table1");
        table.info_mut().conditions = vec![ConditionItem {
            column: ColumnRef::new("Year"),
            op: ConditionOp::GreaterThan,
            values: vec!["2020".to_string()],
            negated: false,
            junction: Junction::And,
        }];

        let model = ConditionDialogModel {
            conditions: vec![item(ConditionOp::Equal, &["East"])],
            columns: Vec::new(),
        };
        ConditionDialog.write(&model, &vs, &mut table).unwrap();
        assert_eq!(table.info().conditions.len(), 1);
        assert_eq!(table.info().conditions[0].column, ColumnRef::new("Region"));
    }
}
