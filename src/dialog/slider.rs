use serde::{Deserialize, Serialize};

use super::panes::{
    BasicGeneralPaneModel, DataInputPaneModel, ScriptPaneModel, SizePositionPaneModel,
    TitlePaneModel,
};
use super::{DialogScope, PropertyDialog, mismatch};
use crate::assembly::{Assembly, AssemblyKind};
use crate::error::{ComposerError, Result};
use crate::viewsheet::Viewsheet;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SliderGeneralPaneModel {
    pub basic: BasicGeneralPaneModel,
    pub title: TitlePaneModel,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SliderScalePaneModel {
    pub min: f64,
    pub max: f64,
    pub increment: f64,
    pub snap: bool,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SliderDisplayPaneModel {
    pub ticks_visible: bool,
    pub labels_visible: bool,
    pub min_visible: bool,
    pub max_visible: bool,
    pub current_visible: bool,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SliderPropertyDialogModel {
    pub general: SliderGeneralPaneModel,
    #[serde(default)]
    pub data: DataInputPaneModel,
    pub scale: SliderScalePaneModel,
    pub display: SliderDisplayPaneModel,
    pub size_position: SizePositionPaneModel,
    #[serde(default)]
    pub script: ScriptPaneModel,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SliderPropertyDialog;

impl PropertyDialog for SliderPropertyDialog {
    type Model = SliderPropertyDialogModel;

    fn kinds(&self) -> &'static [AssemblyKind] {
        &[AssemblyKind::Slider]
    }

    fn read(&self, scope: &DialogScope<'_>, assembly: &Assembly) -> Result<Self::Model> {
        let Assembly::Slider(slider) = assembly else {
            return Err(mismatch(assembly, AssemblyKind::Slider));
        };
        let info = &slider.info;

        Ok(SliderPropertyDialogModel {
            general: SliderGeneralPaneModel {
                basic: BasicGeneralPaneModel::read(info),
                title: TitlePaneModel::read(info),
            },
            data: DataInputPaneModel::read(scope.vs, info),
            scale: SliderScalePaneModel {
                min: slider.min,
                max: slider.max,
                increment: slider.increment,
                snap: slider.snap,
            },
            display: SliderDisplayPaneModel {
                ticks_visible: slider.ticks_visible,
                labels_visible: slider.labels_visible,
                min_visible: slider.min_visible,
                max_visible: slider.max_visible,
                current_visible: slider.current_visible,
            },
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
        let Assembly::Slider(slider) = assembly else {
            return Err(mismatch(assembly, AssemblyKind::Slider));
        };

        let scale = &model.scale;
        if !(scale.min < scale.max) {
            return Err(ComposerError::validation(format!(
                "slider minimum {} must be below maximum {}",
                scale.min, scale.max
            )));
        }
        if scale.increment <= 0.0 || scale.increment > scale.max - scale.min {
            return Err(ComposerError::validation(format!(
                "slider increment {} does not fit {}..{}",
                scale.increment, scale.min, scale.max
            )));
        }

        model.size_position.write(&mut slider.info)?;
        let new_name = model.general.basic.write(&mut slider.info);
        model.general.title.write(&mut slider.info);
        model.data.write(&mut slider.info);
        model.script.write(&mut slider.info);

        slider.min = scale.min;
        slider.max = scale.max;
        slider.increment = scale.increment;
        slider.snap = scale.snap;
        // the selected value follows the new range
        slider.value = slider.value.clamp(scale.min, scale.max);

        let display = &model.display;
        slider.ticks_visible = display.ticks_visible;
        slider.labels_visible = display.labels_visible;
        slider.min_visible = display.min_visible;
        slider.max_visible = display.max_visible;
        slider.current_visible = display.current_visible;
        Ok(new_name)
    }
}
