use serde::{Deserialize, Serialize};

use super::panes::{
    BasicGeneralPaneModel, FillPaneModel, LinePaneModel, ScriptPaneModel, SizePositionPaneModel,
};
use super::{DialogScope, PropertyDialog, mismatch};
use crate::assembly::{ArrowStyle, Assembly, AssemblyInfo, AssemblyKind, Point};
use crate::error::Result;
use crate::format::{ColorModel, LineStyle};
use crate::viewsheet::Viewsheet;

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShapeGeneralPaneModel {
    pub basic: BasicGeneralPaneModel,
    pub shadow: bool,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OvalPropertyDialogModel {
    pub general: ShapeGeneralPaneModel,
    pub line: LinePaneModel,
    pub fill: FillPaneModel,
    pub size_position: SizePositionPaneModel,
    #[serde(default)]
    pub script: ScriptPaneModel,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RectanglePropertyDialogModel {
    pub general: ShapeGeneralPaneModel,
    pub round_corner: u32,
    pub line: LinePaneModel,
    pub fill: FillPaneModel,
    pub size_position: SizePositionPaneModel,
    #[serde(default)]
    pub script: ScriptPaneModel,
}

/// Style of a line shape; the colour is the foreground of the format
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineShapePaneModel {
    pub style: LineStyle,
    pub color: ColorModel,
    pub begin_arrow: ArrowStyle,
    pub end_arrow: ArrowStyle,
    pub start: Point,
    pub end: Point,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LinePropertyDialogModel {
    pub general: ShapeGeneralPaneModel,
    pub line: LineShapePaneModel,
    pub size_position: SizePositionPaneModel,
    #[serde(default)]
    pub script: ScriptPaneModel,
}

/// Applies the panes every closed shape shares. Colours are decoded before
/// anything is written so a bad literal leaves `info` as it was.
fn write_closed_shape(
    info: &mut AssemblyInfo,
    general: &ShapeGeneralPaneModel,
    line: &LinePaneModel,
    fill: &FillPaneModel,
    size_position: &SizePositionPaneModel,
    script: &ScriptPaneModel,
) -> Result<Option<String>> {
    let mut staged = info.clone();
    line.write(&mut staged)?;
    fill.write(&mut staged)?;
    size_position.write(&mut staged)?;
    script.write(&mut staged);
    let new_name = general.basic.write(&mut staged);

    *info = staged;
    Ok(new_name)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OvalPropertyDialog;

impl PropertyDialog for OvalPropertyDialog {
    type Model = OvalPropertyDialogModel;

    fn kinds(&self) -> &'static [AssemblyKind] {
        &[AssemblyKind::Oval]
    }

    fn read(&self, scope: &DialogScope<'_>, assembly: &Assembly) -> Result<Self::Model> {
        let Assembly::Oval(oval) = assembly else {
            return Err(mismatch(assembly, AssemblyKind::Oval));
        };

        Ok(OvalPropertyDialogModel {
            general: ShapeGeneralPaneModel {
                basic: BasicGeneralPaneModel::read(&oval.info),
                shadow: oval.shadow,
            },
            line: LinePaneModel::read(&oval.info),
            fill: FillPaneModel::read(&oval.info),
            size_position: SizePositionPaneModel::read(scope.vs, &oval.info),
            script: ScriptPaneModel::read(&oval.info),
        })
    }

    fn write(
        &self,
        model: &Self::Model,
        _vs: &Viewsheet,
        assembly: &mut Assembly,
    ) -> Result<Option<String>> {
        let Assembly::Oval(oval) = assembly else {
            return Err(mismatch(assembly, AssemblyKind::Oval));
        };

        let new_name = write_closed_shape(
            &mut oval.info,
            &model.general,
            &model.line,
            &model.fill,
            &model.size_position,
            &model.script,
        )?;
        oval.shadow = model.general.shadow;
        Ok(new_name)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RectanglePropertyDialog;

impl PropertyDialog for RectanglePropertyDialog {
    type Model = RectanglePropertyDialogModel;

    fn kinds(&self) -> &'static [AssemblyKind] {
        &[AssemblyKind::Rectangle]
    }

    fn read(&self, scope: &DialogScope<'_>, assembly: &Assembly) -> Result<Self::Model> {
        let Assembly::Rectangle(rect) = assembly else {
            return Err(mismatch(assembly, AssemblyKind::Rectangle));
        };

        Ok(RectanglePropertyDialogModel {
            general: ShapeGeneralPaneModel {
                basic: BasicGeneralPaneModel::read(&rect.info),
                shadow: rect.shadow,
            },
            round_corner: rect.round_corner,
            line: LinePaneModel::read(&rect.info),
            fill: FillPaneModel::read(&rect.info),
            size_position: SizePositionPaneModel::read(scope.vs, &rect.info),
            script: ScriptPaneModel::read(&rect.info),
        })
    }

    fn write(
        &self,
        model: &Self::Model,
        _vs: &Viewsheet,
        assembly: &mut Assembly,
    ) -> Result<Option<String>> {
        let Assembly::Rectangle(rect) = assembly else {
            return Err(mismatch(assembly, AssemblyKind::Rectangle));
        };

        let new_name = write_closed_shape(
            &mut rect.info,
            &model.general,
            &model.line,
            &model.fill,
            &model.size_position,
            &model.script,
        )?;
        rect.shadow = model.general.shadow;
        rect.round_corner = model.round_corner;
        Ok(new_name)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LinePropertyDialog;

impl PropertyDialog for LinePropertyDialog {
    type Model = LinePropertyDialogModel;

    fn kinds(&self) -> &'static [AssemblyKind] {
        &[AssemblyKind::Line]
    }

    fn read(&self, scope: &DialogScope<'_>, assembly: &Assembly) -> Result<Self::Model> {
        let Assembly::Line(line) = assembly else {
            return Err(mismatch(assembly, AssemblyKind::Line));
        };

        Ok(LinePropertyDialogModel {
            general: ShapeGeneralPaneModel {
                basic: BasicGeneralPaneModel::read(&line.info),
                shadow: false,
            },
            line: LineShapePaneModel {
                style: line.info.format.line_style,
                color: ColorModel::from_color(&line.info.format.foreground),
                begin_arrow: line.begin_arrow,
                end_arrow: line.end_arrow,
                start: line.start,
                end: line.end,
            },
            size_position: SizePositionPaneModel::read(scope.vs, &line.info),
            script: ScriptPaneModel::read(&line.info),
        })
    }

    fn write(
        &self,
        model: &Self::Model,
        _vs: &Viewsheet,
        assembly: &mut Assembly,
    ) -> Result<Option<String>> {
        let Assembly::Line(line) = assembly else {
            return Err(mismatch(assembly, AssemblyKind::Line));
        };

        let color = model.line.color.to_color()?;
        let mut info = line.info.clone();
        model.size_position.write(&mut info)?;
        model.script.write(&mut info);
        let new_name = model.general.basic.write(&mut info);
        info.format.foreground = color;
        info.format.line_style = model.line.style;

        line.info = info;
        line.begin_arrow = model.line.begin_arrow;
        line.end_arrow = model.line.end_arrow;
        line.start = model.line.start;
        line.end = model.line.end;
        Ok(new_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart_area::Sandbox;
    use crate::config::ChartAreaConfig;
    use crate::format::{ColorMode, DynamicColor};

    fn scope_read<D: PropertyDialog>(dialog: &D, vs: &Viewsheet, name: &str) -> D::Model {
        let sandbox = Sandbox::new(ChartAreaConfig::default());
        let scope = DialogScope { vs, sandbox: &sandbox };
        dialog.read(&scope, vs.get(name).unwrap()).unwrap()
    }

    #[test]
    fn expression_border_reads_without_literal() {
        let mut vs = Viewsheet::new("Shapes");
        let mut oval = Assembly::create(AssemblyKind::Oval, "Oval1");
        oval.info_mut().format.border_color = DynamicColor::from_expression("$(accent)");
        oval.info_mut().format.background = DynamicColor::from_rgb(0xff8800);
        vs.add_assembly(oval).unwrap();

        let model = scope_read(&OvalPropertyDialog, &vs, "Oval1");
        assert_eq!(model.line.color.mode, ColorMode::Expression);
        assert_eq!(model.line.color.value, None);
        assert_eq!(model.line.color.expression.as_deref(), Some("$(accent)"));
        assert_eq!(model.fill.color.value.as_deref(), Some("#ff8800"));

        let mut written = vs.get("Oval1").unwrap().clone();
        OvalPropertyDialog.write(&model, &vs, &mut written).unwrap();
        assert_eq!(&written, vs.get("Oval1").unwrap());
    }

    #[test]
    fn line_color_is_the_foreground() {
        let mut vs = Viewsheet::new("Shapes");
        vs.add_assembly(Assembly::create(AssemblyKind::Line, "Line1"))
            .unwrap();

        let mut model = scope_read(&LinePropertyDialog, &vs, "Line1");
        model.line.color.value = Some("#123456".to_string());
        model.line.end_arrow = ArrowStyle::Filled;

        let mut written = vs.get("Line1").unwrap().clone();
        LinePropertyDialog.write(&model, &vs, &mut written).unwrap();
        match written {
            Assembly::Line(line) => {
                assert_eq!(line.info.format.foreground.rgb(), Some(0x123456));
                assert_eq!(line.end_arrow, ArrowStyle::Filled);
            }
            other => panic!("unexpected {:?}", other.kind()),
        }
    }
}
