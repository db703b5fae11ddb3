use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::panes::{BasicGeneralPaneModel, ScriptPaneModel, SizePositionPaneModel};
use super::{DialogScope, PropertyDialog, mismatch};
use crate::assembly::{Assembly, AssemblyKind};
use crate::error::{ComposerError, Result};
use crate::viewsheet::Viewsheet;

/// One tab: the child it shows and its caption
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TabItemModel {
    pub name: String,
    pub label: String,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TabPropertyDialogModel {
    pub general: BasicGeneralPaneModel,
    /// Children in display order
    pub tabs: Vec<TabItemModel>,
    #[serde(default)]
    pub selected: Option<String>,
    pub size_position: SizePositionPaneModel,
    #[serde(default)]
    pub script: ScriptPaneModel,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TabPropertyDialog;

impl PropertyDialog for TabPropertyDialog {
    type Model = TabPropertyDialogModel;

    fn kinds(&self) -> &'static [AssemblyKind] {
        &[AssemblyKind::Tab]
    }

    fn read(&self, scope: &DialogScope<'_>, assembly: &Assembly) -> Result<Self::Model> {
        let Assembly::Tab(tab) = assembly else {
            return Err(mismatch(assembly, AssemblyKind::Tab));
        };

        let tabs = tab
            .children
            .iter()
            .enumerate()
            .map(|(i, child)| TabItemModel {
                name: child.clone(),
                label: tab.labels.get(i).cloned().unwrap_or_else(|| child.clone()),
            })
            .collect();

        Ok(TabPropertyDialogModel {
            general: BasicGeneralPaneModel::read(&tab.info),
            tabs,
            selected: tab.selected.clone(),
            size_position: SizePositionPaneModel::read(scope.vs, &tab.info),
            script: ScriptPaneModel::read(&tab.info),
        })
    }

    /// Tabs can be reordered and relabelled; children are added and removed
    /// through their own container setting
    fn write(
        &self,
        model: &Self::Model,
        _vs: &Viewsheet,
        assembly: &mut Assembly,
    ) -> Result<Option<String>> {
        let Assembly::Tab(tab) = assembly else {
            return Err(mismatch(assembly, AssemblyKind::Tab));
        };

        let current: BTreeSet<&str> = tab.children.iter().map(String::as_str).collect();
        let requested: BTreeSet<&str> = model.tabs.iter().map(|t| t.name.as_str()).collect();
        if current != requested || requested.len() != model.tabs.len() {
            return Err(ComposerError::validation(format!(
                "tabs of {} must list each child exactly once",
                tab.info.name
            )));
        }
        if let Some(selected) = model.selected.as_deref() {
            if !current.contains(selected) {
                return Err(ComposerError::validation(format!(
                    "selected tab {} is not a child of {}",
                    selected, tab.info.name
                )));
            }
        }

        model.size_position.write(&mut tab.info)?;
        let new_name = model.general.write(&mut tab.info);
        model.script.write(&mut tab.info);

        tab.children = model.tabs.iter().map(|t| t.name.clone()).collect();
        tab.labels = model.tabs.iter().map(|t| t.label.clone()).collect();
        tab.selected = model.selected.clone().or_else(|| tab.children.first().cloned());
        Ok(new_name)
    }
}
