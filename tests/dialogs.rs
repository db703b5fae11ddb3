use chrono::NaiveDate;
use std::sync::Arc;

use composer::assembly::{
    AggregateFormula, AggregateRef, Assembly, AssemblyKind, CalendarViewMode, ColumnRef, Point,
};
use composer::config::ComposerConfig;
use composer::dialog::calendar::CalendarPropertyDialog;
use composer::dialog::chart::{
    AxisPropertyDialog, ChartAxis, ChartPropertyDialog, DateComparisonDialog,
    LegendPropertyDialog, TitlePropertyDialog,
};
use composer::dialog::condition::ConditionDialog;
use composer::dialog::gauge::GaugePropertyDialog;
use composer::dialog::panes::ColumnOption;
use composer::dialog::shape::{LinePropertyDialog, OvalPropertyDialog, RectanglePropertyDialog};
use composer::dialog::slider::SliderPropertyDialog;
use composer::dialog::submit::SubmitPropertyDialog;
use composer::dialog::tab::TabPropertyDialog;
use composer::dialog::table::{HighlightDialog, TableViewDialog};
use composer::dialog::{PropertyDialog, check_dialog_trap, get_dialog_model, set_dialog_model};
use composer::dispatcher::{Broadcast, CommandQueue, UiCommand};
use composer::error::ComposerError;
use composer::format::{ColorMode, ColorModel, DynamicColor};
use composer::handler::AssemblyInfoHandler;
use composer::runtime::{Principal, RuntimeViewsheet, ViewsheetService};
use composer::trap::VSTrapService;
use composer::viewsheet::{ColumnDef, DataType, TableSchema};

fn alice() -> Principal {
    Principal::new("alice")
}

fn orders() -> TableSchema {
    let column = |name: &str, data_type| ColumnDef {
        name: name.to_string(),
        data_type,
    };
    TableSchema {
        name: "Orders".to_string(),
        columns: vec![
            column("OrderDate", DataType::Date),
            column("Region", DataType::String),
            column("Amount", DataType::Double),
        ],
    }
}

/// A document with one assembly of every kind
fn dashboard(service: &ViewsheetService) -> Arc<RuntimeViewsheet> {
    let rvs = service.create("Sales", &alice()).unwrap();
    {
        let mut vs = rvs.write().unwrap();
        vs.add_table(orders());
        for kind in [
            AssemblyKind::Tab,
            AssemblyKind::Calendar,
            AssemblyKind::Chart,
            AssemblyKind::Gauge,
            AssemblyKind::Oval,
            AssemblyKind::Rectangle,
            AssemblyKind::Line,
            AssemblyKind::Table,
            AssemblyKind::Slider,
            AssemblyKind::SubmitButton,
        ] {
            let name = vs.next_name(kind);
            let mut assembly = Assembly::create(kind, &name);
            let binding = &mut assembly.info_mut().binding;
            match kind {
                AssemblyKind::Calendar => {
                    binding.table = Some("Orders".to_string());
                    binding.dimensions = vec![ColumnRef::new("OrderDate")];
                }
                AssemblyKind::Slider => {
                    binding.table = Some("Orders".to_string());
                    binding.dimensions = vec![ColumnRef::new("Amount")];
                }
                AssemblyKind::Gauge => {
                    binding.table = Some("Orders".to_string());
                    binding.measures = vec![AggregateRef {
                        column: ColumnRef::new("Amount"),
                        formula: AggregateFormula::Sum,
                    }];
                }
                AssemblyKind::Chart | AssemblyKind::Table => {
                    binding.table = Some("Orders".to_string());
                }
                _ => {}
            }
            if kind == AssemblyKind::Chart {
                assembly.info_mut().container = Some("Tab1".to_string());
            }
            vs.add_assembly(assembly).unwrap();
        }
    }
    rvs
}

fn setup() -> (tempfile::TempDir, ViewsheetService, Arc<RuntimeViewsheet>) {
    let dir = tempfile::tempdir().unwrap();
    let service = ViewsheetService::new(ComposerConfig {
        storage_dir: dir.path().to_string_lossy().to_string(),
        ..ComposerConfig::default()
    });
    let rvs = dashboard(&service);
    (dir, service, rvs)
}

fn assembly(rvs: &RuntimeViewsheet, name: &str) -> Assembly {
    rvs.read().unwrap().get(name).unwrap().clone()
}

fn commit<D: PropertyDialog>(
    dialog: &D,
    rvs: &RuntimeViewsheet,
    name: &str,
    model: &D::Model,
) -> composer::Result<Vec<UiCommand>> {
    let queue = CommandQueue::new();
    set_dialog_model(
        dialog,
        rvs,
        name,
        model,
        &alice(),
        &AssemblyInfoHandler::new(),
        &queue,
    )?;
    queue.into_commands()
}

fn assert_round_trip<D: PropertyDialog>(dialog: &D, rvs: &RuntimeViewsheet, name: &str) {
    let before = assembly(rvs, name);
    let model = get_dialog_model(dialog, rvs, name, &alice()).unwrap();
    commit(dialog, rvs, name, &model).unwrap();
    assert_eq!(assembly(rvs, name), before, "round trip changed {}", name);
}

#[test]
fn every_dialog_round_trips() {
    let (_dir, _service, rvs) = setup();

    assert_round_trip(&CalendarPropertyDialog, &rvs, "Calendar1");
    assert_round_trip(&OvalPropertyDialog, &rvs, "Oval1");
    assert_round_trip(&RectanglePropertyDialog, &rvs, "Rectangle1");
    assert_round_trip(&LinePropertyDialog, &rvs, "Line1");
    assert_round_trip(&GaugePropertyDialog, &rvs, "Gauge1");
    assert_round_trip(&ChartPropertyDialog, &rvs, "Chart1");
    assert_round_trip(&AxisPropertyDialog::new(ChartAxis::X), &rvs, "Chart1");
    assert_round_trip(&AxisPropertyDialog::new(ChartAxis::Y), &rvs, "Chart1");
    assert_round_trip(&LegendPropertyDialog, &rvs, "Chart1");
    assert_round_trip(&TitlePropertyDialog, &rvs, "Chart1");
    assert_round_trip(&DateComparisonDialog, &rvs, "Chart1");
    assert_round_trip(&TableViewDialog, &rvs, "Table1");
    assert_round_trip(&HighlightDialog, &rvs, "Table1");
    assert_round_trip(&ConditionDialog, &rvs, "Table1");
    assert_round_trip(&SliderPropertyDialog, &rvs, "Slider1");
    assert_round_trip(&SubmitPropertyDialog, &rvs, "Submit1");
    assert_round_trip(&TabPropertyDialog, &rvs, "Tab1");
}

#[test]
fn colors_keep_their_mode() {
    let (_dir, _service, rvs) = setup();
    {
        let mut vs = rvs.write().unwrap();
        let format = &mut vs.get_mut("Oval1").unwrap().info_mut().format;
        format.background = DynamicColor::from_rgb(0x3366cc);
        format.border_color = DynamicColor::from_expression("=if(Slider1 > 5, 255, 0)");
    }

    let model = get_dialog_model(&OvalPropertyDialog, &rvs, "Oval1", &alice()).unwrap();
    assert_eq!(model.fill.color.mode, ColorMode::Static);
    assert_eq!(model.fill.color.value.as_deref(), Some("#3366cc"));
    assert_eq!(model.line.color.mode, ColorMode::Expression);
    assert_eq!(model.line.color.value, None);

    let mut edited = model.clone();
    edited.fill.color = ColorModel {
        mode: ColorMode::Expression,
        value: None,
        expression: Some("$(brand)".to_string()),
    };
    commit(&OvalPropertyDialog, &rvs, "Oval1", &edited).unwrap();

    let format = assembly(&rvs, "Oval1").info().format.clone();
    assert_eq!(format.background.dvalue, "$(brand)");
    assert_eq!(format.border_color.dvalue, "=if(Slider1 > 5, 255, 0)");
}

#[test]
fn failed_write_leaves_the_document_untouched() {
    let (_dir, _service, rvs) = setup();
    let before = rvs.snapshot().unwrap();

    let mut model = get_dialog_model(&RectanglePropertyDialog, &rvs, "Rectangle1", &alice()).unwrap();
    model.round_corner = 8;
    model.line.color = ColorModel {
        mode: ColorMode::Static,
        value: Some("#12345g".to_string()),
        expression: None,
    };

    let err = commit(&RectanglePropertyDialog, &rvs, "Rectangle1", &model).unwrap_err();
    assert!(matches!(err, ComposerError::Validation(_)));
    assert_eq!(rvs.snapshot().unwrap(), before);
}

#[test]
fn trap_check_never_changes_the_document() {
    let (_dir, _service, rvs) = setup();
    let before = rvs.snapshot().unwrap();

    let mut model = get_dialog_model(&GaugePropertyDialog, &rvs, "Gauge1", &alice()).unwrap();
    model.data.column = Some(ColumnOption {
        entity: None,
        attribute: "Region".to_string(),
        data_type: None,
    });
    model.data.formula = AggregateFormula::Sum;

    let result = check_dialog_trap(
        &GaugePropertyDialog,
        &rvs,
        "Gauge1",
        &model,
        &alice(),
        &VSTrapService,
    )
    .unwrap();
    assert!(result.trap);
    assert_eq!(result.columns, vec!["Region".to_string()]);
    assert_eq!(rvs.snapshot().unwrap(), before);

    model.data.formula = AggregateFormula::Count;
    let result = check_dialog_trap(
        &GaugePropertyDialog,
        &rvs,
        "Gauge1",
        &model,
        &alice(),
        &VSTrapService,
    )
    .unwrap();
    assert!(!result.trap);
    assert_eq!(rvs.snapshot().unwrap(), before);
}

#[test]
fn condition_on_an_unbound_table_is_a_trap() {
    let (_dir, _service, rvs) = setup();
    {
        let mut vs = rvs.write().unwrap();
        vs.get_mut("Table1").unwrap().info_mut().binding.measures = vec![AggregateRef {
            column: ColumnRef::new("Amount"),
            formula: AggregateFormula::Sum,
        }];
    }

    let mut model = get_dialog_model(&ConditionDialog, &rvs, "Table1", &alice()).unwrap();
    model
        .conditions
        .push(composer::dialog::condition::ConditionItemModel {
            column: ColumnOption {
                entity: Some("Returns".to_string()),
                attribute: "Reason".to_string(),
                data_type: None,
            },
            op: composer::assembly::ConditionOp::Equal,
            values: vec!["Damaged".to_string()],
            negated: false,
            junction: composer::assembly::Junction::And,
        });

    let result =
        check_dialog_trap(&ConditionDialog, &rvs, "Table1", &model, &alice(), &VSTrapService)
            .unwrap();
    assert!(result.trap);
    assert!(assembly(&rvs, "Table1").info().conditions.is_empty());
}

#[test]
fn leaving_double_view_clears_selected_dates() {
    let (_dir, _service, rvs) = setup();
    {
        let mut vs = rvs.write().unwrap();
        if let Assembly::Calendar(calendar) = vs.get_mut("Calendar1").unwrap() {
            calendar.view_mode = CalendarViewMode::Double;
            calendar.dates = vec![
                NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            ];
        }
    }

    let mut model = get_dialog_model(&CalendarPropertyDialog, &rvs, "Calendar1", &alice()).unwrap();
    model.general.view_mode = CalendarViewMode::Single;
    commit(&CalendarPropertyDialog, &rvs, "Calendar1", &model).unwrap();

    match assembly(&rvs, "Calendar1") {
        Assembly::Calendar(calendar) => {
            assert_eq!(calendar.view_mode, CalendarViewMode::Single);
            assert!(calendar.dates.is_empty());
        }
        other => panic!("unexpected {:?}", other.kind()),
    }
}

#[test]
fn axis_change_rebuilds_the_chart_area() {
    let (_dir, _service, rvs) = setup();
    let dialog = AxisPropertyDialog::new(ChartAxis::X);

    let mut model = get_dialog_model(&dialog, &rvs, "Chart1", &alice()).unwrap();
    get_dialog_model(&dialog, &rvs, "Chart1", &alice()).unwrap();
    assert_eq!(rvs.sandbox.rebuild_count(), 1);

    model.title = "Order Month".to_string();
    commit(&dialog, &rvs, "Chart1", &model).unwrap();
    assert!(!rvs.sandbox.is_cached("Chart1").unwrap());

    let reread = get_dialog_model(&dialog, &rvs, "Chart1", &alice()).unwrap();
    assert_eq!(reread.title, "Order Month");
    assert_eq!(rvs.sandbox.rebuild_count(), 2);
}

#[test]
fn rename_through_the_general_pane() {
    let (_dir, _service, rvs) = setup();

    let mut model = get_dialog_model(&ChartPropertyDialog, &rvs, "Chart1", &alice()).unwrap();
    model.general.basic.name = "Revenue".to_string();
    let commands = commit(&ChartPropertyDialog, &rvs, "Chart1", &model).unwrap();

    assert_eq!(
        commands[0],
        UiCommand::RenameAssembly {
            old_name: "Chart1".to_string(),
            new_name: "Revenue".to_string(),
        }
    );
    assert!(commands.contains(&UiCommand::RefreshChartArea {
        name: "Revenue".to_string()
    }));
    match assembly(&rvs, "Tab1") {
        Assembly::Tab(tab) => assert_eq!(tab.children, vec!["Revenue".to_string()]),
        other => panic!("unexpected {:?}", other.kind()),
    }
}

#[test]
fn calendar_change_refreshes_bound_data_widgets() {
    let (_dir, _service, rvs) = setup();

    let mut model = get_dialog_model(&CalendarPropertyDialog, &rvs, "Calendar1", &alice()).unwrap();
    model.general.title.title = "Order Date".to_string();
    let commands = commit(&CalendarPropertyDialog, &rvs, "Calendar1", &model).unwrap();

    let refreshed: Vec<&str> = commands
        .iter()
        .filter_map(|c| match c {
            UiCommand::RefreshAssembly { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(refreshed[0], "Calendar1");
    for name in ["Chart1", "Gauge1", "Table1"] {
        assert!(refreshed.contains(&name), "{} was not refreshed", name);
    }
    assert!(!refreshed.contains(&"Oval1"));
}

#[test]
fn layout_position_is_edited_in_place() {
    let (_dir, _service, rvs) = setup();
    {
        let mut vs = rvs.write().unwrap();
        let info = vs.get_mut("Submit1").unwrap().info_mut();
        info.pixel_offset = Point::new(5, 5);
        info.layout_position = Some(Point::new(300, 120));
    }

    let mut model = get_dialog_model(&SubmitPropertyDialog, &rvs, "Submit1", &alice()).unwrap();
    assert_eq!((model.size_position.x, model.size_position.y), (300, 120));
    model.size_position.y = 140;
    commit(&SubmitPropertyDialog, &rvs, "Submit1", &model).unwrap();

    let info = assembly(&rvs, "Submit1").info().clone();
    assert_eq!(info.layout_position, Some(Point::new(300, 140)));
    assert_eq!(info.pixel_offset, Point::new(5, 5));
}

#[test]
fn wrong_dialog_kind_is_a_type_mismatch() {
    let (_dir, _service, rvs) = setup();
    let err = get_dialog_model(&GaugePropertyDialog, &rvs, "Oval1", &alice()).unwrap_err();
    assert!(matches!(err, ComposerError::TypeMismatch { .. }));

    let err = get_dialog_model(&GaugePropertyDialog, &rvs, "Gauge9", &alice()).unwrap_err();
    assert!(matches!(err, ComposerError::AssemblyNotFound(_)));
}

#[test]
fn saved_documents_read_the_same_models() {
    let (_dir, service, rvs) = setup();
    {
        let mut vs = rvs.write().unwrap();
        if let Assembly::Gauge(gauge) = vs.get_mut("Gauge1").unwrap() {
            gauge.max = 250.0;
            gauge.info.binding.measures = vec![AggregateRef {
                column: ColumnRef::new("Amount"),
                formula: AggregateFormula::Avg,
            }];
        }
    }
    let before = get_dialog_model(&GaugePropertyDialog, &rvs, "Gauge1", &alice()).unwrap();

    service.save(&rvs.id, &alice()).unwrap();
    let reopened = service.open("Sales", &alice()).unwrap();
    let after = get_dialog_model(&GaugePropertyDialog, &reopened, "Gauge1", &alice()).unwrap();
    assert_eq!(after, before);
    assert_eq!(after.data.column.unwrap().data_type, Some(DataType::Double));
}

#[test]
fn other_principals_cannot_resolve_the_document() {
    let (_dir, service, rvs) = setup();

    let err = service.resolve(&rvs.id, &Principal::new("bob")).unwrap_err();
    assert!(matches!(err, ComposerError::DocumentNotFound(_)));
    assert!(service.resolve(&rvs.id, &alice()).is_ok());
}

#[test]
fn unbinding_an_input_refreshes_every_assembly() {
    let (_dir, _service, rvs) = setup();

    let mut model = get_dialog_model(&CalendarPropertyDialog, &rvs, "Calendar1", &alice()).unwrap();
    model.data.table = None;
    let commands = commit(&CalendarPropertyDialog, &rvs, "Calendar1", &model).unwrap();

    let refreshed: Vec<&str> = commands
        .iter()
        .filter_map(|c| match c {
            UiCommand::RefreshAssembly { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    for name in ["Calendar1", "Chart1", "Oval1", "Submit1", "Tab1"] {
        assert!(refreshed.contains(&name), "{} was not refreshed", name);
    }
}

#[test]
fn canvas_position_adds_container_offsets() {
    let (_dir, _service, rvs) = setup();
    {
        let mut vs = rvs.write().unwrap();
        vs.get_mut("Tab1").unwrap().info_mut().pixel_offset = Point::new(100, 40);
        vs.get_mut("Chart1").unwrap().info_mut().pixel_offset = Point::new(10, 20);
    }

    let model = get_dialog_model(&ChartPropertyDialog, &rvs, "Chart1", &alice()).unwrap();
    assert_eq!((model.size_position.x, model.size_position.y), (10, 20));
    assert_eq!(model.size_position.container.as_deref(), Some("Tab1"));
    assert_eq!(model.size_position.canvas, Some(Point::new(110, 60)));
}

#[test]
fn concurrent_commits_are_serialized() {
    let (_dir, _service, rvs) = setup();
    let start = rvs.read().unwrap().revision;
    let rounds = 20;

    std::thread::scope(|scope| {
        for name in ["Oval1", "Rectangle1"] {
            let rvs = &rvs;
            scope.spawn(move || {
                let handler = AssemblyInfoHandler::new();
                for round in 1..=rounds {
                    let broadcast = Broadcast::new(&rvs.channel);
                    if name == "Oval1" {
                        let mut model =
                            get_dialog_model(&OvalPropertyDialog, rvs, name, &alice()).unwrap();
                        model.size_position.x = round * 10;
                        set_dialog_model(
                            &OvalPropertyDialog, rvs, name, &model, &alice(), &handler, &broadcast,
                        )
                        .unwrap();
                    } else {
                        let mut model =
                            get_dialog_model(&RectanglePropertyDialog, rvs, name, &alice()).unwrap();
                        model.size_position.x = round * 10;
                        set_dialog_model(
                            &RectanglePropertyDialog, rvs, name, &model, &alice(), &handler, &broadcast,
                        )
                        .unwrap();
                    }
                    assert!(broadcast.last_seq().unwrap() > 0);
                }
            });
        }
    });

    assert_eq!(rvs.read().unwrap().revision, start + 2 * rounds as u64);
    let model = get_dialog_model(&OvalPropertyDialog, &rvs, "Oval1", &alice()).unwrap();
    assert_eq!(model.size_position.x, rounds * 10);
    let model = get_dialog_model(&RectanglePropertyDialog, &rvs, "Rectangle1", &alice()).unwrap();
    assert_eq!(model.size_position.x, rounds * 10);

    // channel order follows commit order
    let revisions: Vec<u64> = rvs
        .channel
        .since(0)
        .unwrap()
        .into_iter()
        .filter_map(|entry| match entry.command {
            UiCommand::RefreshAssembly { revision, .. } => Some(revision),
            _ => None,
        })
        .collect();
    assert_eq!(revisions.len(), 2 * rounds as usize);
    assert!(revisions.windows(2).all(|pair| pair[0] < pair[1]));
}
