use axum::{
    Extension, Json, Router,
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::assembly::{Assembly, AssemblyKind};
use crate::chart_area::{ChartArea, ChartRegion};
use crate::config::ComposerConfig;
use crate::dialog::calendar::CalendarPropertyDialog;
use crate::dialog::chart::{
    AxisPropertyDialog, ChartAxis, ChartPropertyDialog, DateComparisonDialog,
    LegendPropertyDialog, TitlePropertyDialog,
};
use crate::dialog::condition::ConditionDialog;
use crate::dialog::gauge::GaugePropertyDialog;
use crate::dialog::shape::{LinePropertyDialog, OvalPropertyDialog, RectanglePropertyDialog};
use crate::dialog::slider::SliderPropertyDialog;
use crate::dialog::submit::SubmitPropertyDialog;
use crate::dialog::tab::TabPropertyDialog;
use crate::dialog::table::{HighlightDialog, TableViewDialog};
use crate::dialog::{
    PropertyDialog, TrapCheckDialog, check_dialog_trap, get_dialog_model, set_dialog_model,
};
use crate::dispatcher::{Broadcast, MessageLevel, SequencedCommand, UiCommand};
use crate::error::{ComposerError, Result};
use crate::handler::AssemblyInfoHandler;
use crate::runtime::{DocumentEntry, Principal, RuntimeViewsheet, ViewsheetService};
use crate::session::{SESSION_COOKIE, SessionRequest, SessionStore};
use crate::trap::{TrapResult, TrapValidator, VSTrapService};
use crate::viewsheet::{TableSchema, is_valid_name};

/// Collaborators shared by every request
pub struct AppState {
    pub service: ViewsheetService,
    pub sessions: SessionStore,
    pub handler: AssemblyInfoHandler,
    pub trap: Box<dyn TrapValidator>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(config: ComposerConfig) -> Self {
        AppState {
            sessions: SessionStore::new(config.session_ttl_secs),
            service: ViewsheetService::new(config),
            handler: AssemblyInfoHandler::new(),
            trap: Box::new(VSTrapService),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

impl IntoResponse for ComposerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ComposerError::DocumentNotFound(_) | ComposerError::AssemblyNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ComposerError::TypeMismatch { .. } => StatusCode::CONFLICT,
            ComposerError::Validation(_) | ComposerError::Json(_) => StatusCode::BAD_REQUEST,
            ComposerError::Compute(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ComposerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            warn!("request failed: {}", self);
        }

        (
            status,
            Json(ErrorBody {
                status: "error",
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Deserialize)]
struct CreateViewsheet {
    name: String,
}

#[derive(Serialize)]
struct ViewsheetResponse {
    id: String,
    name: String,
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    message: Option<String>,
}

#[derive(Deserialize)]
struct NewAssembly {
    kind: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    container: Option<String>,
}

#[derive(Serialize)]
struct AssemblyResponse {
    name: String,
    seq: u64,
}

#[derive(Deserialize)]
struct CommandsQuery {
    #[serde(default)]
    since: u64,
}

#[derive(Deserialize)]
struct PointQuery {
    x: i32,
    y: i32,
}

#[derive(Serialize)]
struct RegionResponse {
    region: Option<ChartRegion>,
}

#[derive(Serialize)]
struct CommandsResponse {
    last_seq: u64,
    commands: Vec<SequencedCommand>,
}

/// Result of a committed dialog: the commands it produced, in order
#[derive(Serialize)]
struct CommitResponse {
    status: &'static str,
    seq: u64,
    commands: Vec<UiCommand>,
}

/// Start the composer server
///
/// # Arguments
/// * `config` - Server configuration, including the bind address
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Error if binding or serving fails
pub async fn run(config: ComposerConfig) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let bind_addr = config.bind_addr.clone();
    let app = build_app(Arc::new(AppState::new(config)));

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("composer listening on {}", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router with every composer endpoint
pub fn build_app(state: SharedState) -> Router {
    let protected = Router::new()
        .route("/api/vs", get(list_viewsheets).post(create_viewsheet))
        .route("/api/vs/open/:file", post(open_viewsheet))
        .route("/api/vs/:vs", delete(close_viewsheet))
        .route("/api/vs/:vs/save", post(save_viewsheet))
        .route("/api/vs/:vs/tables", post(add_table))
        .route("/api/vs/:vs/assemblies", post(add_assembly))
        .route("/api/vs/:vs/assemblies/:assembly", delete(remove_assembly))
        .route("/api/vs/:vs/commands", get(poll_commands))
        .route(
            "/api/vs/:vs/calendar/:assembly",
            get(get_dialog::<CalendarPropertyDialog>).put(set_dialog::<CalendarPropertyDialog>),
        )
        .route(
            "/api/vs/:vs/calendar/:assembly/trap",
            post(trap_dialog::<CalendarPropertyDialog>),
        )
        .route(
            "/api/vs/:vs/oval/:assembly",
            get(get_dialog::<OvalPropertyDialog>).put(set_dialog::<OvalPropertyDialog>),
        )
        .route(
            "/api/vs/:vs/rectangle/:assembly",
            get(get_dialog::<RectanglePropertyDialog>).put(set_dialog::<RectanglePropertyDialog>),
        )
        .route(
            "/api/vs/:vs/line/:assembly",
            get(get_dialog::<LinePropertyDialog>).put(set_dialog::<LinePropertyDialog>),
        )
        .route(
            "/api/vs/:vs/gauge/:assembly",
            get(get_dialog::<GaugePropertyDialog>).put(set_dialog::<GaugePropertyDialog>),
        )
        .route(
            "/api/vs/:vs/gauge/:assembly/trap",
            post(trap_dialog::<GaugePropertyDialog>),
        )
        .route(
            "/api/vs/:vs/chart/:assembly",
            get(get_dialog::<ChartPropertyDialog>).put(set_dialog::<ChartPropertyDialog>),
        )
        .route(
            "/api/vs/:vs/chart/:assembly/axis/:axis",
            get(get_axis_dialog).put(set_axis_dialog),
        )
        .route(
            "/api/vs/:vs/chart/:assembly/legend",
            get(get_dialog::<LegendPropertyDialog>).put(set_dialog::<LegendPropertyDialog>),
        )
        .route(
            "/api/vs/:vs/chart/:assembly/title",
            get(get_dialog::<TitlePropertyDialog>).put(set_dialog::<TitlePropertyDialog>),
        )
        .route(
            "/api/vs/:vs/chart/:assembly/date-comparison",
            get(get_dialog::<DateComparisonDialog>).put(set_dialog::<DateComparisonDialog>),
        )
        .route("/api/vs/:vs/chart/:assembly/area", get(get_chart_area))
        .route("/api/vs/:vs/chart/:assembly/region", get(get_chart_region))
        .route(
            "/api/vs/:vs/table/:assembly",
            get(get_dialog::<TableViewDialog>).put(set_dialog::<TableViewDialog>),
        )
        .route(
            "/api/vs/:vs/highlight/:assembly",
            get(get_dialog::<HighlightDialog>).put(set_dialog::<HighlightDialog>),
        )
        .route(
            "/api/vs/:vs/highlight/:assembly/trap",
            post(trap_dialog::<HighlightDialog>),
        )
        .route(
            "/api/vs/:vs/condition/:assembly",
            get(get_dialog::<ConditionDialog>).put(set_dialog::<ConditionDialog>),
        )
        .route(
            "/api/vs/:vs/condition/:assembly/trap",
            post(trap_dialog::<ConditionDialog>),
        )
        .route(
            "/api/vs/:vs/slider/:assembly",
            get(get_dialog::<SliderPropertyDialog>).put(set_dialog::<SliderPropertyDialog>),
        )
        .route(
            "/api/vs/:vs/submit/:assembly",
            get(get_dialog::<SubmitPropertyDialog>).put(set_dialog::<SubmitPropertyDialog>),
        )
        .route(
            "/api/vs/:vs/tab/:assembly",
            get(get_dialog::<TabPropertyDialog>).put(set_dialog::<TabPropertyDialog>),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        .route("/api/session", post(open_session).delete(close_session))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Middleware to require a valid session
///
/// Puts the session's [`Principal`] into the request extensions.
pub async fn require_session(
    State(state): State<SharedState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return ComposerError::Unauthorized("no session".to_string()).into_response();
    };

    match state.sessions.validate_session(cookie.value()) {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

async fn open_session(
    State(state): State<SharedState>,
    jar: CookieJar,
    Json(request): Json<SessionRequest>,
) -> Result<(CookieJar, Json<StatusResponse>)> {
    let session_id = state.sessions.create_session(&request.username)?;
    let mut cookie = Cookie::new(SESSION_COOKIE, session_id);
    cookie.set_path("/");
    cookie.set_http_only(true);

    Ok((
        jar.add(cookie),
        Json(StatusResponse {
            status: "ok",
            message: Some(request.username),
        }),
    ))
}

async fn close_session(
    State(state): State<SharedState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<StatusResponse>)> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.remove_session(cookie.value())?;
    }
    Ok((
        jar.remove(Cookie::from(SESSION_COOKIE)),
        Json(StatusResponse {
            status: "ok",
            message: None,
        }),
    ))
}

async fn list_viewsheets(
    State(state): State<SharedState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<Vec<DocumentEntry>>> {
    Ok(Json(state.service.list(&principal)?))
}

async fn create_viewsheet(
    State(state): State<SharedState>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<CreateViewsheet>,
) -> Result<(StatusCode, Json<ViewsheetResponse>)> {
    let rvs = state.service.create(&request.name, &principal)?;
    Ok((
        StatusCode::CREATED,
        Json(ViewsheetResponse {
            id: rvs.id.clone(),
            name: request.name,
        }),
    ))
}

async fn open_viewsheet(
    State(state): State<SharedState>,
    Extension(principal): Extension<Principal>,
    Path(file): Path<String>,
) -> Result<Json<ViewsheetResponse>> {
    let name = file.trim_end_matches(".bin.gz");
    let rvs = state.service.open(name, &principal)?;
    Ok(Json(ViewsheetResponse {
        id: rvs.id.clone(),
        name: name.to_string(),
    }))
}

async fn save_viewsheet(
    State(state): State<SharedState>,
    Extension(principal): Extension<Principal>,
    Path(vs): Path<String>,
) -> Result<Json<StatusResponse>> {
    let path = state.service.save(&vs, &principal)?;
    Ok(Json(StatusResponse {
        status: "ok",
        message: Some(path.display().to_string()),
    }))
}

async fn close_viewsheet(
    State(state): State<SharedState>,
    Extension(principal): Extension<Principal>,
    Path(vs): Path<String>,
) -> Result<StatusCode> {
    state.service.close(&vs, &principal)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_table(
    State(state): State<SharedState>,
    Extension(principal): Extension<Principal>,
    Path(vs): Path<String>,
    Json(schema): Json<TableSchema>,
) -> Result<StatusCode> {
    if !is_valid_name(&schema.name) {
        return Err(ComposerError::validation(format!(
            "invalid table name: {}",
            schema.name
        )));
    }
    let rvs = state.service.resolve(&vs, &principal)?;
    rvs.write()?.add_table(schema);
    Ok(StatusCode::NO_CONTENT)
}

async fn add_assembly(
    State(state): State<SharedState>,
    Extension(principal): Extension<Principal>,
    Path(vs): Path<String>,
    Json(request): Json<NewAssembly>,
) -> Result<(StatusCode, Json<AssemblyResponse>)> {
    let kind = AssemblyKind::from_strng(&request.kind).ok_or_else(|| {
        ComposerError::validation(format!("unknown assembly kind: {}", request.kind))
    })?;
    let rvs = state.service.resolve(&vs, &principal)?;

    let mut doc = rvs.write()?;
    let name = request.name.unwrap_or_else(|| doc.next_name(kind));
    let mut assembly = Assembly::create(kind, &name);
    assembly.info_mut().container = request.container;
    doc.add_assembly(assembly)?;

    let seq = rvs.channel.publish(&[UiCommand::RefreshAssembly {
        name: name.clone(),
        kind,
        revision: doc.revision,
    }])?;
    Ok((StatusCode::CREATED, Json(AssemblyResponse { name, seq })))
}

async fn remove_assembly(
    State(state): State<SharedState>,
    Extension(principal): Extension<Principal>,
    Path((vs, assembly)): Path<(String, String)>,
) -> Result<Json<AssemblyResponse>> {
    let rvs = state.service.resolve(&vs, &principal)?;

    let mut doc = rvs.write()?;
    doc.remove_assembly(&assembly)?;
    rvs.sandbox.clear_graph(&assembly)?;

    let seq = rvs.channel.publish(&[UiCommand::RemoveAssembly {
        name: assembly.clone(),
    }])?;
    Ok(Json(AssemblyResponse {
        name: assembly,
        seq,
    }))
}

async fn poll_commands(
    State(state): State<SharedState>,
    Extension(principal): Extension<Principal>,
    Path(vs): Path<String>,
    Query(query): Query<CommandsQuery>,
) -> Result<Json<CommandsResponse>> {
    let rvs = state.service.resolve(&vs, &principal)?;
    Ok(Json(CommandsResponse {
        last_seq: rvs.channel.last_seq()?,
        commands: rvs.channel.since(query.since)?,
    }))
}

/// Commit a dialog model and publish the commands it produced
fn commit<D: PropertyDialog>(
    state: &AppState,
    rvs: &RuntimeViewsheet,
    dialog: &D,
    assembly: &str,
    model: &D::Model,
    principal: &Principal,
) -> Result<CommitResponse> {
    // published while the document write lock is held
    let broadcast = Broadcast::new(&rvs.channel);
    set_dialog_model(
        dialog,
        rvs,
        assembly,
        model,
        principal,
        &state.handler,
        &broadcast,
    )?;

    let seq = match broadcast.last_seq()? {
        0 => rvs.channel.last_seq()?,
        seq => seq,
    };
    let commands = broadcast.into_commands()?;
    Ok(CommitResponse {
        status: "ok",
        seq,
        commands,
    })
}

async fn get_dialog<D: PropertyDialog + Default>(
    State(state): State<SharedState>,
    Extension(principal): Extension<Principal>,
    Path((vs, assembly)): Path<(String, String)>,
) -> Result<Json<D::Model>> {
    let rvs = state.service.resolve(&vs, &principal)?;
    let model = get_dialog_model(&D::default(), &rvs, &assembly, &principal)?;
    Ok(Json(model))
}

async fn set_dialog<D: PropertyDialog + Default>(
    State(state): State<SharedState>,
    Extension(principal): Extension<Principal>,
    Path((vs, assembly)): Path<(String, String)>,
    Json(model): Json<D::Model>,
) -> Result<Json<CommitResponse>> {
    let rvs = state.service.resolve(&vs, &principal)?;
    let response = commit(&state, &rvs, &D::default(), &assembly, &model, &principal)?;
    Ok(Json(response))
}

async fn trap_dialog<D: TrapCheckDialog + Default>(
    State(state): State<SharedState>,
    Extension(principal): Extension<Principal>,
    Path((vs, assembly)): Path<(String, String)>,
    Json(model): Json<D::Model>,
) -> Result<Json<TrapResult>> {
    let rvs = state.service.resolve(&vs, &principal)?;
    let result = check_dialog_trap(
        &D::default(),
        &rvs,
        &assembly,
        &model,
        &principal,
        state.trap.as_ref(),
    )?;
    if result.trap {
        rvs.channel.publish(&[UiCommand::SetRuntimeMessage {
            level: MessageLevel::Warning,
            message: result.messages.join("\n"),
        }])?;
    }
    Ok(Json(result))
}

async fn get_axis_dialog(
    State(state): State<SharedState>,
    Extension(principal): Extension<Principal>,
    Path((vs, assembly, axis)): Path<(String, String, String)>,
) -> Result<Json<<AxisPropertyDialog as PropertyDialog>::Model>> {
    let dialog = AxisPropertyDialog::new(axis.parse::<ChartAxis>()?);
    let rvs = state.service.resolve(&vs, &principal)?;
    Ok(Json(get_dialog_model(&dialog, &rvs, &assembly, &principal)?))
}

async fn set_axis_dialog(
    State(state): State<SharedState>,
    Extension(principal): Extension<Principal>,
    Path((vs, assembly, axis)): Path<(String, String, String)>,
    Json(model): Json<<AxisPropertyDialog as PropertyDialog>::Model>,
) -> Result<Json<CommitResponse>> {
    let dialog = AxisPropertyDialog::new(axis.parse::<ChartAxis>()?);
    let rvs = state.service.resolve(&vs, &principal)?;
    Ok(Json(commit(
        &state, &rvs, &dialog, &assembly, &model, &principal,
    )?))
}

async fn get_chart_area(
    State(state): State<SharedState>,
    Extension(principal): Extension<Principal>,
    Path((vs, assembly)): Path<(String, String)>,
) -> Result<Json<ChartArea>> {
    let rvs = state.service.resolve(&vs, &principal)?;
    let doc = rvs.read()?;
    let area = rvs.sandbox.chart_area(&doc, &assembly)?;
    Ok(Json(area.as_ref().clone()))
}

/// Which part of the chart a click at `x`, `y` landed on
async fn get_chart_region(
    State(state): State<SharedState>,
    Extension(principal): Extension<Principal>,
    Path((vs, assembly)): Path<(String, String)>,
    Query(point): Query<PointQuery>,
) -> Result<Json<RegionResponse>> {
    let rvs = state.service.resolve(&vs, &principal)?;
    let doc = rvs.read()?;
    let area = rvs.sandbox.chart_area(&doc, &assembly)?;
    Ok(Json(RegionResponse {
        region: area.region_at(point.x, point.y),
    }))
}
