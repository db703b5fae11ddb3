//! Chart dialogs
//!
//! Besides the chart property dialog, the axis, legend and title of a chart
//! have their own dialogs. Those read the laid out chart area from the
//! sandbox, so the editor can place the dialog next to the region it edits.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::panes::{
    BasicGeneralPaneModel, ColumnOption, FillPaneModel, ScriptPaneModel, SizePositionPaneModel,
    TitlePaneModel,
};
use super::{DialogScope, PropertyDialog, mismatch};
use crate::assembly::{
    AggregateFormula, AggregateRef, Assembly, AssemblyKind, AxisDescriptor, ChartInfo, ChartType,
    ComparisonOption, DateComparisonInfo, DateLevel, LegendPosition,
};
use crate::chart_area::Region;
use crate::error::{ComposerError, Result};
use crate::format::{ColorModel, FontInfo, LineStyle};
use crate::viewsheet::{DataType, Viewsheet};

fn chart_of(assembly: &Assembly) -> Result<&ChartInfo> {
    match assembly {
        Assembly::Chart(chart) => Ok(chart),
        other => Err(mismatch(other, AssemblyKind::Chart)),
    }
}

fn chart_of_mut(assembly: &mut Assembly) -> Result<&mut ChartInfo> {
    match assembly {
        Assembly::Chart(chart) => Ok(chart),
        other => Err(mismatch(other, AssemblyKind::Chart)),
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChartGeneralPaneModel {
    pub basic: BasicGeneralPaneModel,
    pub title: TitlePaneModel,
    pub chart_type: ChartType,
    pub show_values: bool,
    pub stacked: bool,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MeasureModel {
    pub column: ColumnOption,
    pub formula: AggregateFormula,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChartBindingPaneModel {
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub dimensions: Vec<ColumnOption>,
    #[serde(default)]
    pub measures: Vec<MeasureModel>,
    #[serde(default)]
    pub columns: Vec<ColumnOption>,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChartPropertyDialogModel {
    pub general: ChartGeneralPaneModel,
    #[serde(default)]
    pub data: ChartBindingPaneModel,
    pub fill: FillPaneModel,
    pub size_position: SizePositionPaneModel,
    #[serde(default)]
    pub script: ScriptPaneModel,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ChartPropertyDialog;

impl PropertyDialog for ChartPropertyDialog {
    type Model = ChartPropertyDialogModel;

    fn kinds(&self) -> &'static [AssemblyKind] {
        &[AssemblyKind::Chart]
    }

    fn read(&self, scope: &DialogScope<'_>, assembly: &Assembly) -> Result<Self::Model> {
        let chart = chart_of(assembly)?;
        let info = &chart.info;
        let table = info.binding.table.as_deref();

        Ok(ChartPropertyDialogModel {
            general: ChartGeneralPaneModel {
                basic: BasicGeneralPaneModel::read(info),
                title: TitlePaneModel::read(info),
                chart_type: chart.chart_type,
                show_values: chart.descriptor.show_values,
                stacked: chart.descriptor.stacked,
            },
            data: ChartBindingPaneModel {
                table: info.binding.table.clone(),
                dimensions: info
                    .binding
                    .dimensions
                    .iter()
                    .map(|c| ColumnOption::read(scope.vs, c, table))
                    .collect(),
                measures: info
                    .binding
                    .measures
                    .iter()
                    .map(|m| MeasureModel {
                        column: ColumnOption::read(scope.vs, &m.column, table),
                        formula: m.formula,
                    })
                    .collect(),
                columns: ColumnOption::available(scope.vs, table),
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
        let chart = chart_of_mut(assembly)?;
        if model.general.chart_type == ChartType::Pie && model.general.stacked {
            return Err(ComposerError::validation("pie charts cannot be stacked"));
        }

        let info = &mut chart.info;
        model.fill.write(info)?;
        model.size_position.write(info)?;
        let new_name = model.general.basic.write(info);
        model.general.title.write(info);
        model.script.write(info);

        let data = &model.data;
        match &data.table {
            Some(table) => {
                info.binding.table = Some(table.clone());
                info.binding.dimensions = data.dimensions.iter().map(ColumnOption::to_column).collect();
                info.binding.measures = data
                    .measures
                    .iter()
                    .map(|m| AggregateRef {
                        column: m.column.to_column(),
                        formula: m.formula,
                    })
                    .collect();
            }
            None => info.binding.clear(),
        }

        chart.chart_type = model.general.chart_type;
        chart.descriptor.show_values = model.general.show_values;
        chart.descriptor.stacked = model.general.stacked;
        Ok(new_name)
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChartAxis {
    X,
    Y,
}

impl FromStr for ChartAxis {
    type Err = ComposerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "x" => Ok(ChartAxis::X),
            "y" => Ok(ChartAxis::Y),
            _ => Err(ComposerError::validation(format!("unknown axis: {}", s))),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AxisPropertyDialogModel {
    pub title: String,
    pub title_visible: bool,
    pub label_visible: bool,
    pub line_visible: bool,
    pub line_color: ColorModel,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub increment: Option<f64>,
    pub log_scale: bool,
    pub label_rotation: i32,
    /// Read only: where the axis is drawn
    #[serde(default)]
    pub region: Region,
    /// Read only: the range the axis is drawn with
    #[serde(default)]
    pub scale: (f64, f64),
}

impl AxisPropertyDialogModel {
    fn validate(&self) -> Result<()> {
        if let (Some(min), Some(max)) = (self.min, self.max) {
            if !(min < max) {
                return Err(ComposerError::validation(format!(
                    "axis minimum {} must be below maximum {}",
                    min, max
                )));
            }
        } else if let Some(max) = self.max {
            if max <= 0.0 {
                return Err(ComposerError::validation(format!(
                    "axis maximum {} needs an explicit minimum",
                    max
                )));
            }
        }
        if self.increment.is_some_and(|i| i <= 0.0) {
            return Err(ComposerError::validation("axis increment must be positive"));
        }
        if self.log_scale && self.min.unwrap_or(0.0) <= 0.0 {
            return Err(ComposerError::validation(
                "log scale needs a positive minimum",
            ));
        }
        if !(-90..=90).contains(&self.label_rotation) {
            return Err(ComposerError::validation(format!(
                "label rotation out of range: {}",
                self.label_rotation
            )));
        }
        Ok(())
    }
}

/// Axis dialog of one chart axis
#[derive(Debug, Clone, Copy)]
pub struct AxisPropertyDialog {
    pub axis: ChartAxis,
}

impl AxisPropertyDialog {
    pub fn new(axis: ChartAxis) -> Self {
        AxisPropertyDialog { axis }
    }

    fn descriptor<'a>(&self, chart: &'a ChartInfo) -> &'a AxisDescriptor {
        match self.axis {
            ChartAxis::X => &chart.descriptor.x_axis,
            ChartAxis::Y => &chart.descriptor.y_axis,
        }
    }
}

impl PropertyDialog for AxisPropertyDialog {
    type Model = AxisPropertyDialogModel;

    fn kinds(&self) -> &'static [AssemblyKind] {
        &[AssemblyKind::Chart]
    }

    fn read(&self, scope: &DialogScope<'_>, assembly: &Assembly) -> Result<Self::Model> {
        let chart = chart_of(assembly)?;
        let area = scope.sandbox.chart_area(scope.vs, assembly.name())?;
        let axis = self.descriptor(chart);
        let (region, scale) = match self.axis {
            ChartAxis::X => (area.x_axis, area.x_scale),
            ChartAxis::Y => (area.y_axis, area.y_scale),
        };

        Ok(AxisPropertyDialogModel {
            title: axis.title.clone(),
            title_visible: axis.title_visible,
            label_visible: axis.label_visible,
            line_visible: axis.line_visible,
            line_color: ColorModel::from_color(&axis.line_color),
            min: axis.min,
            max: axis.max,
            increment: axis.increment,
            log_scale: axis.log_scale,
            label_rotation: axis.label_rotation,
            region,
            scale,
        })
    }

    fn write(
        &self,
        model: &Self::Model,
        _vs: &Viewsheet,
        assembly: &mut Assembly,
    ) -> Result<Option<String>> {
        model.validate()?;
        let line_color = model.line_color.to_color()?;

        let chart = chart_of_mut(assembly)?;
        let axis = match self.axis {
            ChartAxis::X => &mut chart.descriptor.x_axis,
            ChartAxis::Y => &mut chart.descriptor.y_axis,
        };
        *axis = AxisDescriptor {
            title: model.title.clone(),
            title_visible: model.title_visible,
            label_visible: model.label_visible,
            line_visible: model.line_visible,
            line_color,
            min: model.min,
            max: model.max,
            increment: model.increment,
            log_scale: model.log_scale,
            label_rotation: model.label_rotation,
        };
        Ok(None)
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LegendPropertyDialogModel {
    pub visible: bool,
    pub position: LegendPosition,
    pub title: String,
    pub title_visible: bool,
    pub border: LineStyle,
    pub border_color: ColorModel,
    /// Read only: where the legend is drawn, if it is visible
    #[serde(default)]
    pub region: Option<Region>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LegendPropertyDialog;

impl PropertyDialog for LegendPropertyDialog {
    type Model = LegendPropertyDialogModel;

    fn kinds(&self) -> &'static [AssemblyKind] {
        &[AssemblyKind::Chart]
    }

    fn read(&self, scope: &DialogScope<'_>, assembly: &Assembly) -> Result<Self::Model> {
        let legend = &chart_of(assembly)?.descriptor.legend;
        let area = scope.sandbox.chart_area(scope.vs, assembly.name())?;

        Ok(LegendPropertyDialogModel {
            visible: legend.visible,
            position: legend.position,
            title: legend.title.clone(),
            title_visible: legend.title_visible,
            border: legend.border,
            border_color: ColorModel::from_color(&legend.border_color),
            region: area.legend,
        })
    }

    fn write(
        &self,
        model: &Self::Model,
        _vs: &Viewsheet,
        assembly: &mut Assembly,
    ) -> Result<Option<String>> {
        let border_color = model.border_color.to_color()?;
        let legend = &mut chart_of_mut(assembly)?.descriptor.legend;

        legend.visible = model.visible;
        legend.position = model.position;
        legend.title = model.title.clone();
        legend.title_visible = model.title_visible;
        legend.border = model.border;
        legend.border_color = border_color;
        Ok(None)
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TitlePropertyDialogModel {
    pub text: String,
    pub visible: bool,
    pub font: FontInfo,
    pub color: ColorModel,
    /// Read only: where the title is drawn, if it is visible
    #[serde(default)]
    pub region: Option<Region>,
}

const TITLE_FONT_SIZES: std::ops::RangeInclusive<u32> = 1..=200;

/// Dialog of the title drawn inside the chart, not the assembly title bar
#[derive(Debug, Default, Clone, Copy)]
pub struct TitlePropertyDialog;

impl PropertyDialog for TitlePropertyDialog {
    type Model = TitlePropertyDialogModel;

    fn kinds(&self) -> &'static [AssemblyKind] {
        &[AssemblyKind::Chart]
    }

    fn read(&self, scope: &DialogScope<'_>, assembly: &Assembly) -> Result<Self::Model> {
        let title = &chart_of(assembly)?.descriptor.title;
        let area = scope.sandbox.chart_area(scope.vs, assembly.name())?;

        Ok(TitlePropertyDialogModel {
            text: title.text.clone(),
            visible: title.visible,
            font: title.font.clone(),
            color: ColorModel::from_color(&title.color),
            region: area.title,
        })
    }

    fn write(
        &self,
        model: &Self::Model,
        _vs: &Viewsheet,
        assembly: &mut Assembly,
    ) -> Result<Option<String>> {
        if !TITLE_FONT_SIZES.contains(&model.font.size) {
            return Err(ComposerError::validation(format!(
                "font size must be between {} and {}: {}",
                TITLE_FONT_SIZES.start(),
                TITLE_FONT_SIZES.end(),
                model.font.size
            )));
        }
        let color = model.color.to_color()?;
        let title = &mut chart_of_mut(assembly)?.descriptor.title;

        title.text = model.text.clone();
        title.visible = model.visible;
        title.font = model.font.clone();
        title.color = color;
        Ok(None)
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DateComparisonDialogModel {
    pub enabled: bool,
    #[serde(default)]
    pub date_field: Option<ColumnOption>,
    pub level: DateLevel,
    pub period_count: u32,
    pub interval: DateLevel,
    pub to_date: bool,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub option: ComparisonOption,
    /// Read only: date columns of the bound table
    #[serde(default)]
    pub date_fields: Vec<ColumnOption>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DateComparisonDialog;

impl PropertyDialog for DateComparisonDialog {
    type Model = DateComparisonDialogModel;

    fn kinds(&self) -> &'static [AssemblyKind] {
        &[AssemblyKind::Chart]
    }

    fn read(&self, scope: &DialogScope<'_>, assembly: &Assembly) -> Result<Self::Model> {
        let chart = chart_of(assembly)?;
        let table = chart.info.binding.table.as_deref();
        let date_fields = ColumnOption::available(scope.vs, table)
            .into_iter()
            .filter(|c| c.data_type == Some(DataType::Date))
            .collect();

        Ok(match &chart.date_comparison {
            Some(dc) => DateComparisonDialogModel {
                enabled: true,
                date_field: Some(ColumnOption::read(scope.vs, &dc.date_field, table)),
                level: dc.level,
                period_count: dc.period_count,
                interval: dc.interval,
                to_date: dc.to_date,
                end_date: dc.end_date,
                option: dc.option,
                date_fields,
            },
            None => DateComparisonDialogModel {
                enabled: false,
                date_field: None,
                level: DateLevel::Year,
                period_count: 2,
                interval: DateLevel::Month,
                to_date: false,
                end_date: None,
                option: ComparisonOption::Value,
                date_fields,
            },
        })
    }

    fn write(
        &self,
        model: &Self::Model,
        vs: &Viewsheet,
        assembly: &mut Assembly,
    ) -> Result<Option<String>> {
        let chart = chart_of_mut(assembly)?;
        if !model.enabled {
            chart.date_comparison = None;
            return Ok(None);
        }

        let field = model
            .date_field
            .as_ref()
            .ok_or_else(|| ComposerError::validation("date comparison needs a date field"))?;
        let column = field.to_column();
        let data_type = column
            .table(chart.info.binding.table.as_deref())
            .and_then(|t| vs.table(t))
            .and_then(|t| t.column(&column.attribute))
            .map(|c| c.data_type);
        if data_type.is_some_and(|t| t != DataType::Date) {
            return Err(ComposerError::validation(format!(
                "{} is not a date column",
                column.full_name()
            )));
        }
        if model.period_count == 0 {
            return Err(ComposerError::validation("compare at least one period"));
        }
        if model.interval > model.level {
            return Err(ComposerError::validation(format!(
                "interval {:?} is coarser than the period {:?}",
                model.interval, model.level
            )));
        }

        chart.date_comparison = Some(DateComparisonInfo {
            date_field: column,
            level: model.level,
            period_count: model.period_count,
            interval: model.interval,
            to_date: model.to_date,
            end_date: model.end_date,
            option: model.option,
        });
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart_area::Sandbox;
    use crate::config::ChartAreaConfig;
    use crate::viewsheet::{ColumnDef, TableSchema};

    fn chart_vs() -> Viewsheet {
        let mut vs = Viewsheet::new("Charts");
        vs.add_table(TableSchema {
            name: "Orders".to_string(),
            columns: vec![
                ColumnDef {
                    name: "OrderDate".to_string(),
                    data_type: DataType::Date,
                },
                ColumnDef {
                    name: "Region".to_string(),
                    data_type: DataType::String,
                },
            ],
        });
        let mut chart = Assembly::create(AssemblyKind::Chart, "Chart1");
        chart.info_mut().binding.table = Some("Orders".to_string());
        vs.add_assembly(chart).unwrap();
        vs
    }

    #[test]
    fn axis_dialog_reports_the_drawn_region() {
        let vs = chart_vs();
        let sandbox = Sandbox::new(ChartAreaConfig::default());
        let scope = DialogScope { vs: &vs, sandbox: &sandbox };

        let model = AxisPropertyDialog::new(ChartAxis::Y)
            .read(&scope, vs.get("Chart1").unwrap())
            .unwrap();
        assert!(model.region.width > 0);
        assert_eq!(model.scale, (0.0, 100.0));
        assert_eq!(sandbox.rebuild_count(), 1);
    }

    #[test]
    fn log_scale_without_positive_minimum_is_rejected() {
        let vs = chart_vs();
        let sandbox = Sandbox::new(ChartAreaConfig::default());
        let scope = DialogScope { vs: &vs, sandbox: &sandbox };
        let dialog = AxisPropertyDialog::new(ChartAxis::X);
        let mut model = dialog.read(&scope, vs.get("Chart1").unwrap()).unwrap();
        model.log_scale = true;

        let mut chart = vs.get("Chart1").unwrap().clone();
        assert!(dialog.write(&model, &vs, &mut chart).is_err());
        model.min = Some(1.0);
        dialog.write(&model, &vs, &mut chart).unwrap();
    }

    #[test]
    fn date_comparison_needs_a_date_column() {
        let vs = chart_vs();
        let sandbox = Sandbox::new(ChartAreaConfig::default());
        let scope = DialogScope { vs: &vs, sandbox: &sandbox };
        let mut model = DateComparisonDialog
            .read(&scope, vs.get("Chart1").unwrap())
            .unwrap();
        assert_eq!(model.date_fields.len(), 1);

        model.enabled = true;
        model.date_field = Some(ColumnOption {
            entity: None,
            attribute: "Region".to_string(),
            data_type: None,
        });
        let mut chart = vs.get("Chart1").unwrap().clone();
        assert!(DateComparisonDialog.write(&model, &vs, &mut chart).is_err());

        model.date_field = model.date_fields.first().cloned();
        DateComparisonDialog.write(&model, &vs, &mut chart).unwrap();
        match chart {
            Assembly::Chart(info) => {
                let dc = info.date_comparison.unwrap();
                assert_eq!(dc.date_field.attribute, "OrderDate");
                assert_eq!(dc.level, DateLevel::Year);
            }
            other => panic!("unexpected {:?}", other.kind()),
        }
    }

    #[test]
    fn axis_of_a_gauge_is_a_type_mismatch() {
        let mut vs = chart_vs();
        vs.add_assembly(Assembly::create(AssemblyKind::Gauge, "Gauge1"))
            .unwrap();
        let sandbox = Sandbox::new(ChartAreaConfig::default());
        let scope = DialogScope { vs: &vs, sandbox: &sandbox };

        let err = AxisPropertyDialog::new(ChartAxis::X)
            .read(&scope, vs.get("Gauge1").unwrap())
            .unwrap_err();
        assert!(matches!(err, ComposerError::TypeMismatch { .. }));
    }

    #[test]
    fn oversized_title_font_is_rejected() {
        let vs = chart_vs();
        let sandbox = Sandbox::new(ChartAreaConfig::default());
        let scope = DialogScope { vs: &vs, sandbox: &sandbox };
        let mut chart = vs.get("Chart1").unwrap().clone();

        let mut model = TitlePropertyDialog.read(&scope, &chart).unwrap();
        model.visible = true;
        model.font.size = u32::MAX;
        let err = TitlePropertyDialog.write(&model, &vs, &mut chart).unwrap_err();
        assert!(matches!(err, ComposerError::Validation(_)));

        model.font.size = 200;
        TitlePropertyDialog.write(&model, &vs, &mut chart).unwrap();
    }
}
