use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::panes::{
    BasicGeneralPaneModel, DataInputPaneModel, ScriptPaneModel, SizePositionPaneModel,
    TitlePaneModel,
};
use super::{DialogScope, PropertyDialog, TrapCheckDialog, mismatch};
use crate::assembly::{Assembly, AssemblyKind, CalendarShowType, CalendarViewMode};
use crate::error::{ComposerError, Result};
use crate::viewsheet::Viewsheet;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarGeneralPaneModel {
    pub basic: BasicGeneralPaneModel,
    pub title: TitlePaneModel,
    pub show_type: CalendarShowType,
    pub view_mode: CalendarViewMode,
    pub submit_on_change: bool,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarAdvancedPaneModel {
    pub period: bool,
    pub year_view: bool,
    pub daily: bool,
    pub single_selection: bool,
    #[serde(default)]
    pub min_date: Option<NaiveDate>,
    #[serde(default)]
    pub max_date: Option<NaiveDate>,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarPropertyDialogModel {
    pub general: CalendarGeneralPaneModel,
    #[serde(default)]
    pub data: DataInputPaneModel,
    pub advanced: CalendarAdvancedPaneModel,
    pub size_position: SizePositionPaneModel,
    #[serde(default)]
    pub script: ScriptPaneModel,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CalendarPropertyDialog;

impl PropertyDialog for CalendarPropertyDialog {
    type Model = CalendarPropertyDialogModel;

    fn kinds(&self) -> &'static [AssemblyKind] {
        &[AssemblyKind::Calendar]
    }

    fn read(&self, scope: &DialogScope<'_>, assembly: &Assembly) -> Result<Self::Model> {
        let Assembly::Calendar(calendar) = assembly else {
            return Err(mismatch(assembly, AssemblyKind::Calendar));
        };
        let info = &calendar.info;

        Ok(CalendarPropertyDialogModel {
            general: CalendarGeneralPaneModel {
                basic: BasicGeneralPaneModel::read(info),
                title: TitlePaneModel::read(info),
                show_type: calendar.show_type,
                view_mode: calendar.view_mode,
                submit_on_change: calendar.submit_on_change,
            },
            data: DataInputPaneModel::read(scope.vs, info),
            advanced: CalendarAdvancedPaneModel {
                period: calendar.period,
                year_view: calendar.year_view,
                daily: calendar.daily,
                single_selection: calendar.single_selection,
                min_date: calendar.min_date,
                max_date: calendar.max_date,
            },
            size_position: SizePositionPaneModel::read(scope.vs, info),
            script: ScriptPaneModel::read(info),
        })
    }

    fn write(
        &self,
        model: &Self::Model,
        vs: &Viewsheet,
        assembly: &mut Assembly,
    ) -> Result<Option<String>> {
        let advanced = &model.advanced;
        if let (Some(min), Some(max)) = (advanced.min_date, advanced.max_date) {
            if min > max {
                return Err(ComposerError::validation(format!(
                    "calendar range starts after it ends: {} > {}",
                    min, max
                )));
            }
        }

        self.apply_binding(model, vs, assembly)?;
        let Assembly::Calendar(calendar) = assembly else {
            return Err(mismatch(assembly, AssemblyKind::Calendar));
        };

        let general = &model.general;
        let new_name = general.basic.write(&mut calendar.info);
        general.title.write(&mut calendar.info);
        model.size_position.write(&mut calendar.info)?;
        model.script.write(&mut calendar.info);

        // a second month only exists in double view, its selection goes with it
        if calendar.view_mode == CalendarViewMode::Double
            && general.view_mode == CalendarViewMode::Single
        {
            calendar.dates.clear();
        }
        calendar.show_type = general.show_type;
        calendar.view_mode = general.view_mode;
        calendar.submit_on_change = general.submit_on_change;

        calendar.period = advanced.period;
        calendar.year_view = advanced.year_view;
        calendar.daily = advanced.daily;
        calendar.single_selection = advanced.single_selection;
        calendar.min_date = advanced.min_date;
        calendar.max_date = advanced.max_date;

        Ok(new_name)
    }
}

impl TrapCheckDialog for CalendarPropertyDialog {
    fn apply_binding(
        &self,
        model: &Self::Model,
        _vs: &Viewsheet,
        scratch: &mut Assembly,
    ) -> Result<()> {
        let Assembly::Calendar(calendar) = scratch else {
            return Err(mismatch(scratch, AssemblyKind::Calendar));
        };
        model.data.write(&mut calendar.info);
        Ok(())
    }
}
