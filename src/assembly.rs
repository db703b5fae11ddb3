use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::format::{DynamicColor, FormatInfo, LineStyle};

/// Every widget type a viewsheet can hold
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssemblyKind {
    Calendar,
    Chart,
    Gauge,
    Oval,
    Rectangle,
    Line,
    Table,
    Tab,
    Slider,
    SubmitButton,
}

impl AssemblyKind {
    pub fn from_strng(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "calendar" => Some(AssemblyKind::Calendar),
            "chart" => Some(AssemblyKind::Chart),
            "gauge" => Some(AssemblyKind::Gauge),
            "oval" => Some(AssemblyKind::Oval),
            "rectangle" => Some(AssemblyKind::Rectangle),
            "line" => Some(AssemblyKind::Line),
            "table" => Some(AssemblyKind::Table),
            "tab" => Some(AssemblyKind::Tab),
            "slider" => Some(AssemblyKind::Slider),
            "submit" | "submitbutton" => Some(AssemblyKind::SubmitButton),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssemblyKind::Calendar => "Calendar",
            AssemblyKind::Chart => "Chart",
            AssemblyKind::Gauge => "Gauge",
            AssemblyKind::Oval => "Oval",
            AssemblyKind::Rectangle => "Rectangle",
            AssemblyKind::Line => "Line",
            AssemblyKind::Table => "Table",
            AssemblyKind::Tab => "Tab",
            AssemblyKind::Slider => "Slider",
            AssemblyKind::SubmitButton => "Submit",
        }
    }

    /// Widgets that display aggregated data and are filtered by input widgets
    pub fn is_data(&self) -> bool {
        matches!(
            self,
            AssemblyKind::Chart | AssemblyKind::Gauge | AssemblyKind::Table
        )
    }

    /// Widgets whose selection filters data widgets bound to the same table
    pub fn is_input(&self) -> bool {
        matches!(self, AssemblyKind::Calendar | AssemblyKind::Slider)
    }

    pub fn default_size(&self) -> Size {
        match self {
            AssemblyKind::Calendar => Size::new(200, 180),
            AssemblyKind::Chart => Size::new(400, 300),
            AssemblyKind::Gauge => Size::new(200, 200),
            AssemblyKind::Oval | AssemblyKind::Rectangle => Size::new(100, 100),
            AssemblyKind::Line => Size::new(100, 1),
            AssemblyKind::Table => Size::new(400, 240),
            AssemblyKind::Tab => Size::new(300, 30),
            AssemblyKind::Slider => Size::new(200, 50),
            AssemblyKind::SubmitButton => Size::new(80, 20),
        }
    }
}

impl fmt::Display for AssemblyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Size { width, height }
    }
}

/// A column of a bound table; `entity` is the table it comes from when it is
/// not the assembly's primary table
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnRef {
    pub entity: Option<String>,
    pub attribute: String,
}

impl ColumnRef {
    pub fn new(attribute: &str) -> Self {
        ColumnRef {
            entity: None,
            attribute: attribute.to_string(),
        }
    }

    pub fn qualified(entity: &str, attribute: &str) -> Self {
        ColumnRef {
            entity: Some(entity.to_string()),
            attribute: attribute.to_string(),
        }
    }

    pub fn full_name(&self) -> String {
        match &self.entity {
            Some(entity) => format!("{}.{}", entity, self.attribute),
            None => self.attribute.clone(),
        }
    }

    /// The table this column is read from, given the binding's primary table
    pub fn table<'a>(&'a self, primary: Option<&'a str>) -> Option<&'a str> {
        self.entity.as_deref().or(primary)
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub enum AggregateFormula {
    #[default]
    None,
    Sum,
    Avg,
    Count,
    DistinctCount,
    Min,
    Max,
}

impl AggregateFormula {
    /// Formulas that are only meaningful over numbers
    pub fn requires_numeric(&self) -> bool {
        matches!(self, AggregateFormula::Sum | AggregateFormula::Avg)
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct AggregateRef {
    pub column: ColumnRef,
    pub formula: AggregateFormula,
}

/// Data binding of an assembly: no table means unbound
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct BindingInfo {
    pub table: Option<String>,
    pub dimensions: Vec<ColumnRef>,
    pub measures: Vec<AggregateRef>,
}

impl BindingInfo {
    pub fn is_empty(&self) -> bool {
        self.table.is_none() && self.dimensions.is_empty() && self.measures.is_empty()
    }

    pub fn clear(&mut self) {
        *self = BindingInfo::default();
    }

    /// Every table read by this binding
    pub fn tables(&self) -> BTreeSet<String> {
        let primary = self.table.as_deref();
        let mut tables = BTreeSet::new();
        if let Some(table) = primary {
            tables.insert(table.to_string());
        }
        for column in self.columns() {
            if let Some(table) = column.table(primary) {
                tables.insert(table.to_string());
            }
        }
        tables
    }

    pub fn columns(&self) -> impl Iterator<Item = &ColumnRef> {
        self.dimensions
            .iter()
            .chain(self.measures.iter().map(|m| &m.column))
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct ScriptInfo {
    pub expression: String,
    pub enabled: bool,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum ConditionOp {
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    Between,
    OneOf,
    Contains,
    Null,
}

impl ConditionOp {
    /// Number of values the operator needs, `None` for any number above zero
    pub fn arity(&self) -> Option<usize> {
        match self {
            ConditionOp::Null => Some(0),
            ConditionOp::Between => Some(2),
            ConditionOp::OneOf => None,
            _ => Some(1),
        }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub enum Junction {
    #[default]
    And,
    Or,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ConditionItem {
    pub column: ColumnRef,
    pub op: ConditionOp,
    pub values: Vec<String>,
    pub negated: bool,
    /// Joins this item to the previous one; ignored on the first item
    pub junction: Junction,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct HighlightInfo {
    pub name: String,
    pub foreground: DynamicColor,
    pub background: DynamicColor,
    pub conditions: Vec<ConditionItem>,
}

/// Configuration common to all assemblies
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct AssemblyInfo {
    pub name: String,
    pub visible: bool,
    pub enabled: bool,
    pub primary: bool,
    pub title: String,
    pub title_visible: bool,
    /// Canvas position; relative to `container` when one is set
    pub pixel_offset: Point,
    pub pixel_size: Size,
    /// Set when the active layout positions this assembly explicitly
    pub layout_position: Option<Point>,
    pub layout_size: Option<Size>,
    pub container: Option<String>,
    pub binding: BindingInfo,
    pub format: FormatInfo,
    pub script: ScriptInfo,
    pub conditions: Vec<ConditionItem>,
}

impl AssemblyInfo {
    pub fn new(name: &str, kind: AssemblyKind) -> Self {
        AssemblyInfo {
            name: name.to_string(),
            visible: true,
            enabled: true,
            primary: true,
            title: name.to_string(),
            title_visible: matches!(
                kind,
                AssemblyKind::Calendar | AssemblyKind::Table | AssemblyKind::Gauge
            ),
            pixel_offset: Point::default(),
            pixel_size: kind.default_size(),
            layout_position: None,
            layout_size: None,
            container: None,
            binding: BindingInfo::default(),
            format: FormatInfo::default(),
            script: ScriptInfo::default(),
            conditions: Vec::new(),
        }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub enum CalendarShowType {
    #[default]
    Calendar,
    Dropdown,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub enum CalendarViewMode {
    #[default]
    Single,
    Double,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct CalendarInfo {
    pub info: AssemblyInfo,
    pub show_type: CalendarShowType,
    pub view_mode: CalendarViewMode,
    /// Compare two periods (only meaningful in double view)
    pub period: bool,
    pub year_view: bool,
    pub daily: bool,
    pub single_selection: bool,
    pub submit_on_change: bool,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    pub dates: Vec<NaiveDate>,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub enum ChartType {
    #[default]
    Bar,
    Line,
    Area,
    Point,
    Pie,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct TitleDescriptor {
    pub text: String,
    pub visible: bool,
    pub font: crate::format::FontInfo,
    pub color: DynamicColor,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct AxisDescriptor {
    pub title: String,
    pub title_visible: bool,
    pub label_visible: bool,
    pub line_visible: bool,
    pub line_color: DynamicColor,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub increment: Option<f64>,
    pub log_scale: bool,
    pub label_rotation: i32,
}

impl AxisDescriptor {
    pub fn new(title: &str) -> Self {
        AxisDescriptor {
            title: title.to_string(),
            title_visible: true,
            label_visible: true,
            line_visible: true,
            line_color: DynamicColor::from_rgb(0x4b4b4b),
            min: None,
            max: None,
            increment: None,
            log_scale: false,
            label_rotation: 0,
        }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub enum LegendPosition {
    Top,
    Bottom,
    Left,
    #[default]
    Right,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct LegendDescriptor {
    pub visible: bool,
    pub position: LegendPosition,
    pub title: String,
    pub title_visible: bool,
    pub border: LineStyle,
    pub border_color: DynamicColor,
}

/// Declarative description of how the chart is drawn
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct ChartDescriptor {
    pub title: TitleDescriptor,
    pub x_axis: AxisDescriptor,
    pub y_axis: AxisDescriptor,
    pub legend: LegendDescriptor,
    pub show_values: bool,
    pub stacked: bool,
}

impl Default for ChartDescriptor {
    fn default() -> Self {
        ChartDescriptor {
            title: TitleDescriptor {
                text: String::new(),
                visible: false,
                font: crate::format::FontInfo {
                    size: 14,
                    bold: true,
                    ..Default::default()
                },
                color: DynamicColor::from_rgb(0x2b2b2b),
            },
            x_axis: AxisDescriptor::new(""),
            y_axis: AxisDescriptor::new(""),
            legend: LegendDescriptor {
                visible: true,
                position: LegendPosition::Right,
                title: String::new(),
                title_visible: true,
                border: LineStyle::Thin,
                border_color: DynamicColor::from_rgb(0xdadada),
            },
            show_values: false,
            stacked: false,
        }
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DateLevel {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub enum ComparisonOption {
    #[default]
    Value,
    Change,
    PercentChange,
}

/// Compare the same interval across several consecutive periods
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct DateComparisonInfo {
    pub date_field: ColumnRef,
    pub level: DateLevel,
    pub period_count: u32,
    pub interval: DateLevel,
    pub to_date: bool,
    pub end_date: Option<NaiveDate>,
    pub option: ComparisonOption,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct ChartInfo {
    pub info: AssemblyInfo,
    pub chart_type: ChartType,
    pub descriptor: ChartDescriptor,
    pub date_comparison: Option<DateComparisonInfo>,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct GaugeRange {
    pub value: f64,
    pub color: DynamicColor,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct GaugeInfo {
    pub info: AssemblyInfo,
    pub min: f64,
    pub max: f64,
    pub major_increment: f64,
    pub minor_increment: f64,
    pub ranges: Vec<GaugeRange>,
    pub face: u32,
    pub label_visible: bool,
    pub value_visible: bool,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct OvalInfo {
    pub info: AssemblyInfo,
    pub shadow: bool,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct RectangleInfo {
    pub info: AssemblyInfo,
    pub shadow: bool,
    pub round_corner: u32,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub enum ArrowStyle {
    #[default]
    None,
    Open,
    Filled,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct LineInfo {
    pub info: AssemblyInfo,
    /// Relative to the assembly's position
    pub start: Point,
    pub end: Point,
    pub begin_arrow: ArrowStyle,
    pub end_arrow: ArrowStyle,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct TableInfo {
    pub info: AssemblyInfo,
    pub header_rows: u32,
    pub header_cols: u32,
    pub shrink: bool,
    pub wrap_text: bool,
    pub form: bool,
    pub max_rows: Option<u32>,
    pub highlights: Vec<HighlightInfo>,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct TabInfo {
    pub info: AssemblyInfo,
    pub children: Vec<String>,
    pub labels: Vec<String>,
    pub selected: Option<String>,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct SliderInfo {
    pub info: AssemblyInfo,
    pub min: f64,
    pub max: f64,
    pub increment: f64,
    pub snap: bool,
    pub ticks_visible: bool,
    pub labels_visible: bool,
    pub min_visible: bool,
    pub max_visible: bool,
    pub current_visible: bool,
    pub value: f64,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct SubmitInfo {
    pub info: AssemblyInfo,
    pub label: String,
    pub refresh_after_submit: bool,
}

/// One widget of a viewsheet together with its kind-specific configuration
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub enum Assembly {
    Calendar(CalendarInfo),
    Chart(ChartInfo),
    Gauge(GaugeInfo),
    Oval(OvalInfo),
    Rectangle(RectangleInfo),
    Line(LineInfo),
    Table(TableInfo),
    Tab(TabInfo),
    Slider(SliderInfo),
    SubmitButton(SubmitInfo),
}

impl Assembly {
    /// A freshly inserted assembly of the given kind with default settings
    pub fn create(kind: AssemblyKind, name: &str) -> Self {
        let info = AssemblyInfo::new(name, kind);
        match kind {
            AssemblyKind::Calendar => Assembly::Calendar(CalendarInfo {
                info,
                show_type: CalendarShowType::Calendar,
                view_mode: CalendarViewMode::Single,
                period: false,
                year_view: false,
                daily: true,
                single_selection: false,
                submit_on_change: true,
                min_date: None,
                max_date: None,
                dates: Vec::new(),
            }),
            AssemblyKind::Chart => Assembly::Chart(ChartInfo {
                info,
                chart_type: ChartType::Bar,
                descriptor: ChartDescriptor::default(),
                date_comparison: None,
            }),
            AssemblyKind::Gauge => Assembly::Gauge(GaugeInfo {
                info,
                min: 0.0,
                max: 100.0,
                major_increment: 20.0,
                minor_increment: 5.0,
                ranges: Vec::new(),
                face: 10910,
                label_visible: true,
                value_visible: true,
            }),
            AssemblyKind::Oval => Assembly::Oval(OvalInfo {
                info,
                shadow: false,
            }),
            AssemblyKind::Rectangle => Assembly::Rectangle(RectangleInfo {
                info,
                shadow: false,
                round_corner: 0,
            }),
            AssemblyKind::Line => Assembly::Line(LineInfo {
                info,
                start: Point::new(0, 0),
                end: Point::new(100, 0),
                begin_arrow: ArrowStyle::None,
                end_arrow: ArrowStyle::None,
            }),
            AssemblyKind::Table => Assembly::Table(TableInfo {
                info,
                header_rows: 1,
                header_cols: 0,
                shrink: false,
                wrap_text: false,
                form: false,
                max_rows: None,
                highlights: Vec::new(),
            }),
            AssemblyKind::Tab => Assembly::Tab(TabInfo {
                info,
                children: Vec::new(),
                labels: Vec::new(),
                selected: None,
            }),
            AssemblyKind::Slider => Assembly::Slider(SliderInfo {
                info,
                min: 0.0,
                max: 100.0,
                increment: 1.0,
                snap: true,
                ticks_visible: true,
                labels_visible: true,
                min_visible: true,
                max_visible: true,
                current_visible: true,
                value: 0.0,
            }),
            AssemblyKind::SubmitButton => Assembly::SubmitButton(SubmitInfo {
                info,
                label: "Submit".to_string(),
                refresh_after_submit: true,
            }),
        }
    }

    pub fn kind(&self) -> AssemblyKind {
        match self {
            Assembly::Calendar(_) => AssemblyKind::Calendar,
            Assembly::Chart(_) => AssemblyKind::Chart,
            Assembly::Gauge(_) => AssemblyKind::Gauge,
            Assembly::Oval(_) => AssemblyKind::Oval,
            Assembly::Rectangle(_) => AssemblyKind::Rectangle,
            Assembly::Line(_) => AssemblyKind::Line,
            Assembly::Table(_) => AssemblyKind::Table,
            Assembly::Tab(_) => AssemblyKind::Tab,
            Assembly::Slider(_) => AssemblyKind::Slider,
            Assembly::SubmitButton(_) => AssemblyKind::SubmitButton,
        }
    }

    pub fn info(&self) -> &AssemblyInfo {
        match self {
            Assembly::Calendar(a) => &a.info,
            Assembly::Chart(a) => &a.info,
            Assembly::Gauge(a) => &a.info,
            Assembly::Oval(a) => &a.info,
            Assembly::Rectangle(a) => &a.info,
            Assembly::Line(a) => &a.info,
            Assembly::Table(a) => &a.info,
            Assembly::Tab(a) => &a.info,
            Assembly::Slider(a) => &a.info,
            Assembly::SubmitButton(a) => &a.info,
        }
    }

    pub fn info_mut(&mut self) -> &mut AssemblyInfo {
        match self {
            Assembly::Calendar(a) => &mut a.info,
            Assembly::Chart(a) => &mut a.info,
            Assembly::Gauge(a) => &mut a.info,
            Assembly::Oval(a) => &mut a.info,
            Assembly::Rectangle(a) => &mut a.info,
            Assembly::Line(a) => &mut a.info,
            Assembly::Table(a) => &mut a.info,
            Assembly::Tab(a) => &mut a.info,
            Assembly::Slider(a) => &mut a.info,
            Assembly::SubmitButton(a) => &mut a.info,
        }
    }

    pub fn name(&self) -> &str {
        &self.info().name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_parse_back() {
        for kind in [
            AssemblyKind::Calendar,
            AssemblyKind::Chart,
            AssemblyKind::Gauge,
            AssemblyKind::Oval,
            AssemblyKind::Rectangle,
            AssemblyKind::Line,
            AssemblyKind::Table,
            AssemblyKind::Tab,
            AssemblyKind::Slider,
            AssemblyKind::SubmitButton,
        ] {
            assert_eq!(AssemblyKind::from_strng(kind.as_str()), Some(kind));
            assert_eq!(Assembly::create(kind, "A1").kind(), kind);
        }
    }

    #[test]
    fn binding_tables_include_qualified_columns() {
        let binding = BindingInfo {
            table: Some("Orders".to_string()),
            dimensions: vec![ColumnRef::new("Region")],
            measures: vec![AggregateRef {
                column: ColumnRef::qualified("Returns", "Amount"),
                formula: AggregateFormula::Sum,
            }],
        };

        let tables: Vec<String> = binding.tables().into_iter().collect();
        assert_eq!(tables, vec!["Orders".to_string(), "Returns".to_string()]);
    }
}
