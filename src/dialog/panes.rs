use serde::{Deserialize, Serialize};

use crate::assembly::{AssemblyInfo, ColumnRef, Point, Size};
use crate::error::{ComposerError, Result};
use crate::format::{ColorModel, GradientInfo, LineStyle, check_alpha};
use crate::viewsheet::{DataType, Viewsheet};

/// Name and state flags shared by every general pane
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BasicGeneralPaneModel {
    pub name: String,
    pub visible: bool,
    pub enabled: bool,
    pub primary: bool,
}

impl BasicGeneralPaneModel {
    pub fn read(info: &AssemblyInfo) -> Self {
        BasicGeneralPaneModel {
            name: info.name.clone(),
            visible: info.visible,
            enabled: info.enabled,
            primary: info.primary,
        }
    }

    /// Returns the requested new name; the rename itself happens on commit
    pub fn write(&self, info: &mut AssemblyInfo) -> Option<String> {
        info.visible = self.visible;
        info.enabled = self.enabled;
        info.primary = self.primary;

        let name = self.name.trim();
        (!name.is_empty() && name != info.name).then(|| name.to_string())
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TitlePaneModel {
    pub title: String,
    pub visible: bool,
}

impl TitlePaneModel {
    pub fn read(info: &AssemblyInfo) -> Self {
        TitlePaneModel {
            title: info.title.clone(),
            visible: info.title_visible,
        }
    }

    pub fn write(&self, info: &mut AssemblyInfo) {
        info.title = self.title.clone();
        info.title_visible = self.visible;
    }
}

/// Position and size as the editor shows them.
///
/// A layout specific position or size has priority over the canvas value,
/// both when reading and when writing. Positions inside a container are
/// relative to it.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SizePositionPaneModel {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Read only: container the position is relative to
    #[serde(default)]
    pub container: Option<String>,
    /// Read only: canvas position with container offsets resolved
    #[serde(default)]
    pub canvas: Option<Point>,
}

impl SizePositionPaneModel {
    pub fn read(vs: &Viewsheet, info: &AssemblyInfo) -> Self {
        let position = info.layout_position.unwrap_or(info.pixel_offset);
        let size = info.layout_size.unwrap_or(info.pixel_size);

        SizePositionPaneModel {
            x: position.x,
            y: position.y,
            width: size.width,
            height: size.height,
            container: info.container.clone(),
            canvas: vs.pixel_position(&info.name).ok(),
        }
    }

    pub fn write(&self, info: &mut AssemblyInfo) -> Result<()> {
        if self.width <= 0 || self.height <= 0 {
            return Err(ComposerError::validation(format!(
                "size must be positive: {}x{}",
                self.width, self.height
            )));
        }
        if info.container.is_none() && (self.x < 0 || self.y < 0) {
            return Err(ComposerError::validation(format!(
                "position must not be negative: {},{}",
                self.x, self.y
            )));
        }

        let position = Point::new(self.x, self.y);
        let size = Size::new(self.width, self.height);
        match info.layout_position.as_mut() {
            Some(layout) => *layout = position,
            None => info.pixel_offset = position,
        }
        match info.layout_size.as_mut() {
            Some(layout) => *layout = size,
            None => info.pixel_size = size,
        }
        Ok(())
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScriptPaneModel {
    pub expression: String,
    pub enabled: bool,
}

impl ScriptPaneModel {
    pub fn read(info: &AssemblyInfo) -> Self {
        ScriptPaneModel {
            expression: info.script.expression.clone(),
            enabled: info.script.enabled,
        }
    }

    /// Script syntax is checked when the configuration is committed
    pub fn write(&self, info: &mut AssemblyInfo) {
        info.script.expression = self.expression.clone();
        info.script.enabled = self.enabled;
    }
}

/// Border of a shape
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LinePaneModel {
    pub style: LineStyle,
    pub color: ColorModel,
}

impl LinePaneModel {
    pub fn read(info: &AssemblyInfo) -> Self {
        LinePaneModel {
            style: info.format.line_style,
            color: ColorModel::from_color(&info.format.border_color),
        }
    }

    pub fn write(&self, info: &mut AssemblyInfo) -> Result<()> {
        info.format.border_color = self.color.to_color()?;
        info.format.line_style = self.style;
        Ok(())
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FillPaneModel {
    pub color: ColorModel,
    pub alpha: u8,
    #[serde(default)]
    pub gradient: Option<GradientInfo>,
}

impl FillPaneModel {
    pub fn read(info: &AssemblyInfo) -> Self {
        FillPaneModel {
            color: ColorModel::from_color(&info.format.background),
            alpha: info.format.alpha,
            gradient: info.format.gradient.clone(),
        }
    }

    pub fn write(&self, info: &mut AssemblyInfo) -> Result<()> {
        let color = self.color.to_color()?;
        let alpha = check_alpha(self.alpha)?;
        if let Some(gradient) = &self.gradient {
            gradient.validate()?;
        }

        info.format.background = color;
        info.format.alpha = alpha;
        info.format.gradient = self.gradient.clone();
        Ok(())
    }
}

/// A selectable column of a bound table
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnOption {
    #[serde(default)]
    pub entity: Option<String>,
    pub attribute: String,
    #[serde(default)]
    pub data_type: Option<DataType>,
}

impl ColumnOption {
    pub fn read(vs: &Viewsheet, column: &ColumnRef, primary: Option<&str>) -> Self {
        let data_type = column
            .table(primary)
            .and_then(|t| vs.table(t))
            .and_then(|t| t.column(&column.attribute))
            .map(|c| c.data_type);

        ColumnOption {
            entity: column.entity.clone(),
            attribute: column.attribute.clone(),
            data_type,
        }
    }

    pub fn to_column(&self) -> ColumnRef {
        ColumnRef {
            entity: self.entity.clone(),
            attribute: self.attribute.clone(),
        }
    }

    /// Every column of `table` known to the document
    pub fn available(vs: &Viewsheet, table: Option<&str>) -> Vec<ColumnOption> {
        table
            .and_then(|t| vs.table(t))
            .map(|schema| {
                schema
                    .columns
                    .iter()
                    .map(|c| ColumnOption {
                        entity: None,
                        attribute: c.name.clone(),
                        data_type: Some(c.data_type),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Single column binding of an input widget.
///
/// No table or no selected column means the widget is unbound.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DataInputPaneModel {
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub column: Option<ColumnOption>,
    /// Read only: columns that can be selected
    #[serde(default)]
    pub columns: Vec<ColumnOption>,
}

impl DataInputPaneModel {
    pub fn read(vs: &Viewsheet, info: &AssemblyInfo) -> Self {
        let table = info.binding.table.clone();
        let column = info
            .binding
            .dimensions
            .first()
            .map(|c| ColumnOption::read(vs, c, table.as_deref()));

        DataInputPaneModel {
            columns: ColumnOption::available(vs, table.as_deref()),
            table,
            column,
        }
    }

    pub fn write(&self, info: &mut AssemblyInfo) {
        let (Some(table), Some(column)) = (self.table.as_ref(), self.column.as_ref()) else {
            info.binding.clear();
            return;
        };

        let column = column.to_column();
        info.binding.table = Some(table.clone());
        if info.binding.dimensions.first() != Some(&column) {
            info.binding.dimensions = vec![column];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::{AssemblyKind, BindingInfo};
    use crate::format::{ColorMode, DynamicColor};

    #[test]
    fn layout_position_has_priority() {
        let mut info = AssemblyInfo::new("Oval1", AssemblyKind::Oval);
        info.pixel_offset = Point::new(10, 10);
        info.layout_position = Some(Point::new(200, 40));

        let mut pane = SizePositionPaneModel::read(&Viewsheet::new("Layout"), &info);
        assert_eq!((pane.x, pane.y), (200, 40));

        pane.x = 220;
        pane.write(&mut info).unwrap();
        assert_eq!(info.layout_position, Some(Point::new(220, 40)));
        assert_eq!(info.pixel_offset, Point::new(10, 10));
    }

    #[test]
    fn non_positive_size_is_rejected() {
        let mut info = AssemblyInfo::new("Oval1", AssemblyKind::Oval);
        let mut pane = SizePositionPaneModel::read(&Viewsheet::new("Layout"), &info);
        pane.width = 0;
        assert!(matches!(
            pane.write(&mut info),
            Err(ComposerError::Validation(_))
        ));
    }

    #[test]
    fn missing_column_clears_the_binding() {
        let mut info = AssemblyInfo::new("Calendar1", AssemblyKind::Calendar);
        info.binding = BindingInfo {
            table: Some("Orders".to_string()),
            dimensions: vec![ColumnRef::new("OrderDate")],
            measures: Vec::new(),
        };

        let pane = DataInputPaneModel {
            table: Some("Orders".to_string()),
            column: None,
            columns: Vec::new(),
        };
        pane.write(&mut info);
        assert!(info.binding.is_empty());
    }

    #[test]
    fn fill_writes_nothing_on_bad_color() {
        let mut info = AssemblyInfo::new("Rectangle1", AssemblyKind::Rectangle);
        info.format.background = DynamicColor::from_rgb(0x00ff00);
        let before = info.clone();

        let pane = FillPaneModel {
            color: ColorModel {
                mode: ColorMode::Static,
                value: Some("#zzzzzz".to_string()),
                expression: None,
            },
            alpha: 50,
            gradient: None,
        };
        assert!(pane.write(&mut info).is_err());
        assert_eq!(info, before);
    }

    #[test]
    fn general_pane_reports_rename() {
        let mut info = AssemblyInfo::new("Chart1", AssemblyKind::Chart);
        let mut pane = BasicGeneralPaneModel::read(&info);
        assert_eq!(pane.write(&mut info), None);

        pane.name = "Sales".to_string();
        pane.visible = false;
        assert_eq!(pane.write(&mut info), Some("Sales".to_string()));
        assert!(!info.visible);
        assert_eq!(info.name, "Chart1");
    }
}
