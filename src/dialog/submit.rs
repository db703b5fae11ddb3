use serde::{Deserialize, Serialize};

use super::panes::{BasicGeneralPaneModel, FillPaneModel, ScriptPaneModel, SizePositionPaneModel};
use super::{DialogScope, PropertyDialog, mismatch};
use crate::assembly::{Assembly, AssemblyKind};
use crate::error::Result;
use crate::format::FontInfo;
use crate::viewsheet::Viewsheet;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmitGeneralPaneModel {
    pub basic: BasicGeneralPaneModel,
    pub label: String,
    pub refresh_after_submit: bool,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPropertyDialogModel {
    pub general: SubmitGeneralPaneModel,
    pub font: FontInfo,
    pub fill: FillPaneModel,
    pub size_position: SizePositionPaneModel,
    #[serde(default)]
    pub script: ScriptPaneModel,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SubmitPropertyDialog;

impl PropertyDialog for SubmitPropertyDialog {
    type Model = SubmitPropertyDialogModel;

    fn kinds(&self) -> &'static [AssemblyKind] {
        &[AssemblyKind::SubmitButton]
    }

    fn read(&self, scope: &DialogScope<'_>, assembly: &Assembly) -> Result<Self::Model> {
        let Assembly::SubmitButton(submit) = assembly else {
            return Err(mismatch(assembly, AssemblyKind::SubmitButton));
        };

        Ok(SubmitPropertyDialogModel {
            general: SubmitGeneralPaneModel {
                basic: BasicGeneralPaneModel::read(&submit.info),
                label: submit.label.clone(),
                refresh_after_submit: submit.refresh_after_submit,
            },
            font: submit.info.format.font.clone(),
            fill: FillPaneModel::read(&submit.info),
            size_position: SizePositionPaneModel::read(scope.vs, &submit.info),
            script: ScriptPaneModel::read(&submit.info),
        })
    }

    fn write(
        &self,
        model: &Self::Model,
        _vs: &Viewsheet,
        assembly: &mut Assembly,
    ) -> Result<Option<String>> {
        let Assembly::SubmitButton(submit) = assembly else {
            return Err(mismatch(assembly, AssemblyKind::SubmitButton));
        };

        model.fill.write(&mut submit.info)?;
        model.size_position.write(&mut submit.info)?;
        let new_name = model.general.basic.write(&mut submit.info);
        model.script.write(&mut submit.info);

        submit.info.format.font = model.font.clone();
        submit.label = model.general.label.clone();
        submit.refresh_after_submit = model.general.refresh_after_submit;
        Ok(new_name)
    }
}
