use serde::{Deserialize, Serialize};

use super::panes::{
    BasicGeneralPaneModel, ColumnOption, ScriptPaneModel, SizePositionPaneModel, TitlePaneModel,
};
use super::{DialogScope, PropertyDialog, TrapCheckDialog, mismatch};
use crate::assembly::{AggregateFormula, AggregateRef, Assembly, AssemblyKind, GaugeRange};
use crate::error::{ComposerError, Result};
use crate::format::ColorModel;
use crate::viewsheet::Viewsheet;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GaugeGeneralPaneModel {
    pub basic: BasicGeneralPaneModel,
    pub title: TitlePaneModel,
    pub face: u32,
    pub label_visible: bool,
    pub value_visible: bool,
}

/// The aggregated column the gauge shows
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GaugeDataPaneModel {
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub column: Option<ColumnOption>,
    #[serde(default)]
    pub formula: AggregateFormula,
    #[serde(default)]
    pub columns: Vec<ColumnOption>,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GaugeScalePaneModel {
    pub min: f64,
    pub max: f64,
    pub major_increment: f64,
    pub minor_increment: f64,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GaugeRangeModel {
    pub value: f64,
    pub color: ColorModel,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GaugePropertyDialogModel {
    pub general: GaugeGeneralPaneModel,
    #[serde(default)]
    pub data: GaugeDataPaneModel,
    pub scale: GaugeScalePaneModel,
    #[serde(default)]
    pub ranges: Vec<GaugeRangeModel>,
    pub size_position: SizePositionPaneModel,
    #[serde(default)]
    pub script: ScriptPaneModel,
}

impl GaugeScalePaneModel {
    fn validate(&self) -> Result<()> {
        if !(self.min < self.max) {
            return Err(ComposerError::validation(format!(
                "gauge minimum {} must be below maximum {}",
                self.min, self.max
            )));
        }
        if self.major_increment <= 0.0 || self.minor_increment <= 0.0 {
            return Err(ComposerError::validation("gauge increments must be positive"));
        }
        if self.minor_increment > self.major_increment {
            return Err(ComposerError::validation(
                "minor increment larger than the major increment",
            ));
        }
        Ok(())
    }
}

fn decode_ranges(ranges: &[GaugeRangeModel], min: f64, max: f64) -> Result<Vec<GaugeRange>> {
    let mut decoded = Vec::with_capacity(ranges.len());
    let mut last = min;
    for range in ranges {
        if range.value < last || range.value > max {
            return Err(ComposerError::validation(format!(
                "gauge range {} is out of order or outside {}..{}",
                range.value, min, max
            )));
        }
        last = range.value;
        decoded.push(GaugeRange {
            value: range.value,
            color: range.color.to_color()?,
        });
    }
    Ok(decoded)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct GaugePropertyDialog;

impl PropertyDialog for GaugePropertyDialog {
    type Model = GaugePropertyDialogModel;

    fn kinds(&self) -> &'static [AssemblyKind] {
        &[AssemblyKind::Gauge]
    }

    fn read(&self, scope: &DialogScope<'_>, assembly: &Assembly) -> Result<Self::Model> {
        let Assembly::Gauge(gauge) = assembly else {
            return Err(mismatch(assembly, AssemblyKind::Gauge));
        };
        let info = &gauge.info;
        let table = info.binding.table.clone();
        let measure = info.binding.measures.first();

        Ok(GaugePropertyDialogModel {
            general: GaugeGeneralPaneModel {
                basic: BasicGeneralPaneModel::read(info),
                title: TitlePaneModel::read(info),
                face: gauge.face,
                label_visible: gauge.label_visible,
                value_visible: gauge.value_visible,
            },
            data: GaugeDataPaneModel {
                column: measure.map(|m| ColumnOption::read(scope.vs, &m.column, table.as_deref())),
                formula: measure.map(|m| m.formula).unwrap_or_default(),
                columns: ColumnOption::available(scope.vs, table.as_deref()),
                table,
            },
            scale: GaugeScalePaneModel {
                min: gauge.min,
                max: gauge.max,
                major_increment: gauge.major_increment,
                minor_increment: gauge.minor_increment,
            },
            ranges: gauge
                .ranges
                .iter()
                .map(|r| GaugeRangeModel {
                    value: r.value,
                    color: ColorModel::from_color(&r.color),
                })
                .collect(),
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
        let scale = &model.scale;
        scale.validate()?;
        let ranges = decode_ranges(&model.ranges, scale.min, scale.max)?;

        self.apply_binding(model, vs, assembly)?;
        let Assembly::Gauge(gauge) = assembly else {
            return Err(mismatch(assembly, AssemblyKind::Gauge));
        };

        model.size_position.write(&mut gauge.info)?;
        let general = &model.general;
        let new_name = general.basic.write(&mut gauge.info);
        general.title.write(&mut gauge.info);
        model.script.write(&mut gauge.info);

        gauge.face = general.face;
        gauge.label_visible = general.label_visible;
        gauge.value_visible = general.value_visible;
        gauge.min = scale.min;
        gauge.max = scale.max;
        gauge.major_increment = scale.major_increment;
        gauge.minor_increment = scale.minor_increment;
        gauge.ranges = ranges;
        Ok(new_name)
    }
}

impl TrapCheckDialog for GaugePropertyDialog {
    fn apply_binding(
        &self,
        model: &Self::Model,
        _vs: &Viewsheet,
        scratch: &mut Assembly,
    ) -> Result<()> {
        let Assembly::Gauge(gauge) = scratch else {
            return Err(mismatch(scratch, AssemblyKind::Gauge));
        };
        let binding = &mut gauge.info.binding;

        let data = &model.data;
        let (Some(table), Some(column)) = (data.table.as_ref(), data.column.as_ref()) else {
            binding.clear();
            return Ok(());
        };
        binding.table = Some(table.clone());
        binding.dimensions.clear();
        binding.measures = vec![AggregateRef {
            column: column.to_column(),
            formula: data.formula,
        }];
        Ok(())
    }
}
