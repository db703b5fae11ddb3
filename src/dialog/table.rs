use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::condition::{ConditionItemModel, decode_conditions, read_conditions};
use super::panes::{
    BasicGeneralPaneModel, FillPaneModel, ScriptPaneModel, SizePositionPaneModel, TitlePaneModel,
};
use super::{DialogScope, PropertyDialog, TrapCheckDialog, mismatch};
use crate::assembly::{Assembly, AssemblyKind, HighlightInfo};
use crate::error::{ComposerError, Result};
use crate::format::ColorModel;
use crate::viewsheet::Viewsheet;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableGeneralPaneModel {
    pub basic: BasicGeneralPaneModel,
    pub title: TitlePaneModel,
    pub form: bool,
    #[serde(default)]
    pub max_rows: Option<u32>,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableAdvancedPaneModel {
    pub header_rows: u32,
    pub header_cols: u32,
    pub shrink: bool,
    pub wrap_text: bool,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableViewDialogModel {
    pub general: TableGeneralPaneModel,
    pub advanced: TableAdvancedPaneModel,
    pub fill: FillPaneModel,
    pub size_position: SizePositionPaneModel,
    #[serde(default)]
    pub script: ScriptPaneModel,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TableViewDialog;

impl PropertyDialog for TableViewDialog {
    type Model = TableViewDialogModel;

    fn kinds(&self) -> &'static [AssemblyKind] {
        &[AssemblyKind::Table]
    }

    fn read(&self, scope: &DialogScope<'_>, assembly: &Assembly) -> Result<Self::Model> {
        let Assembly::Table(table) = assembly else {
            return Err(mismatch(assembly, AssemblyKind::Table));
        };
        let info = &table.info;

        Ok(TableViewDialogModel {
            general: TableGeneralPaneModel {
                basic: BasicGeneralPaneModel::read(info),
                title: TitlePaneModel::read(info),
                form: table.form,
                max_rows: table.max_rows,
            },
            advanced: TableAdvancedPaneModel {
                header_rows: table.header_rows,
                header_cols: table.header_cols,
                shrink: table.shrink,
                wrap_text: table.wrap_text,
            },
            fill: FillPaneModel::read(info),
            size_position: SizePositionPaneModel::read(scope.vs, info),
            script: ScriptPaneModel::read(info),
        })
    }

    fn write(
        &self,
        model: &Self::Model,
        _vs: &Viewsheet,
        assembly: &mut Assembly,
    ) -> Result<Option<String>> {
        let Assembly::Table(table) = assembly else {
            return Err(mismatch(assembly, AssemblyKind::Table));
        };
        if model.general.max_rows == Some(0) {
            return Err(ComposerError::validation("max rows must be at least 1"));
        }

        model.fill.write(&mut table.info)?;
        model.size_position.write(&mut table.info)?;
        let new_name = model.general.basic.write(&mut table.info);
        model.general.title.write(&mut table.info);
        model.script.write(&mut table.info);

        table.form = model.general.form;
        table.max_rows = model.general.max_rows;
        table.header_rows = model.advanced.header_rows;
        table.header_cols = model.advanced.header_cols;
        table.shrink = model.advanced.shrink;
        table.wrap_text = model.advanced.wrap_text;
        Ok(new_name)
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HighlightModel {
    pub name: String,
    pub foreground: ColorModel,
    pub background: ColorModel,
    #[serde(default)]
    pub conditions: Vec<ConditionItemModel>,
}

/// Conditional formats of a table
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct HighlightDialogModel {
    #[serde(default)]
    pub highlights: Vec<HighlightModel>,
}

fn decode_highlights(models: &[HighlightModel]) -> Result<Vec<HighlightInfo>> {
    let mut names = BTreeSet::new();
    let mut highlights = Vec::with_capacity(models.len());

    for model in models {
        let name = model.name.trim();
        if name.is_empty() || !names.insert(name.to_string()) {
            return Err(ComposerError::validation(format!(
                "highlight names must be unique and non-empty: '{}'",
                name
            )));
        }
        highlights.push(HighlightInfo {
            name: name.to_string(),
            foreground: model.foreground.to_color()?,
            background: model.background.to_color()?,
            conditions: decode_conditions(&model.conditions)?,
        });
    }
    Ok(highlights)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HighlightDialog;

impl PropertyDialog for HighlightDialog {
    type Model = HighlightDialogModel;

    fn kinds(&self) -> &'static [AssemblyKind] {
        &[AssemblyKind::Table]
    }

    fn read(&self, scope: &DialogScope<'_>, assembly: &Assembly) -> Result<Self::Model> {
        let Assembly::Table(table) = assembly else {
            return Err(mismatch(assembly, AssemblyKind::Table));
        };
        let primary = table.info.binding.table.as_deref();

        Ok(HighlightDialogModel {
            highlights: table
                .highlights
                .iter()
                .map(|h| HighlightModel {
                    name: h.name.clone(),
                    foreground: ColorModel::from_color(&h.foreground),
                    background: ColorModel::from_color(&h.background),
                    conditions: read_conditions(scope.vs, &h.conditions, primary),
                })
                .collect(),
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

impl TrapCheckDialog for HighlightDialog {
    fn apply_binding(
        &self,
        model: &Self::Model,
        _vs: &Viewsheet,
        scratch: &mut Assembly,
    ) -> Result<()> {
        let Assembly::Table(table) = scratch else {
            return Err(mismatch(scratch, AssemblyKind::Table));
        };
        table.highlights = decode_highlights(&model.highlights)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ColorMode;

    fn highlight(name: &str) -> HighlightModel {
        HighlightModel {
            name: name.to_string(),
            foreground: ColorModel {
                mode: ColorMode::Static,
                value: Some("#ff0000".to_string()),
                expression: None,
            },
            background: ColorModel::default(),
            conditions: Vec::new(),
        }
    }

    #[test]
    fn duplicate_highlight_names_are_rejected() {
        let vs = Viewsheet::new("Tables");
        let mut table = Assembly::create(AssemblyKind::Table, "Table1");
        let before = table.clone();

        let model = HighlightDialogModel {
            highlights: vec![highlight("Late"), highlight("Late")],
        };
        assert!(HighlightDialog.write(&model, &vs, &mut table).is_err());
        assert_eq!(table, before);
    }

    #[test]
    fn highlight_colors_are_decoded() {
        let vs = Viewsheet::new("Tables");
        let mut table = Assembly::create(AssemblyKind::Table, "Table1");
        let model = HighlightDialogModel {
            highlights: vec![highlight("Late")],
        };

        HighlightDialog.write(&model, &vs, &mut table).unwrap();
        match table {
            Assembly::Table(info) => {
                assert_eq!(info.highlights[0].foreground.rgb(), Some(0xff0000));
                assert!(info.highlights[0].background.is_unset());
            }
            other => panic!("unexpected {:?}", other.kind()),
        }
    }
}
