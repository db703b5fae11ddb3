use log::debug;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::assembly::{Assembly, AxisDescriptor, ChartInfo, LegendPosition};
use crate::config::ChartAreaConfig;
use crate::error::{ComposerError, Result};
use crate::viewsheet::Viewsheet;

/// Rectangle in chart pixel coordinates, origin at the top left
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    fn from_ranges((x, y): (Range<i32>, Range<i32>)) -> Self {
        Region {
            x: x.start,
            y: y.start,
            width: x.end - x.start,
            height: y.end - y.start,
        }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// Which part of a rendered chart a point falls on
#[derive(Clone, Copy, Serialize, Debug, PartialEq, Eq)]
pub enum ChartRegion {
    Title,
    Legend,
    XAxis,
    YAxis,
    Plot,
}

/// The laid out chart: where the title, axes, legend and plot ended up
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct ChartArea {
    pub width: u32,
    pub height: u32,
    pub title: Option<Region>,
    pub legend: Option<Region>,
    pub plot: Region,
    pub x_axis: Region,
    pub y_axis: Region,
    /// Axis scales used for the plot, `(min, max)`
    pub x_scale: (f64, f64),
    pub y_scale: (f64, f64),
    /// Skeleton rendering of the regions
    pub svg: String,
}

impl ChartArea {
    pub fn region_at(&self, x: i32, y: i32) -> Option<ChartRegion> {
        if self.title.is_some_and(|r| r.contains(x, y)) {
            return Some(ChartRegion::Title);
        }
        if self.legend.is_some_and(|r| r.contains(x, y)) {
            return Some(ChartRegion::Legend);
        }
        if self.x_axis.contains(x, y) {
            return Some(ChartRegion::XAxis);
        }
        if self.y_axis.contains(x, y) {
            return Some(ChartRegion::YAxis);
        }
        if self.plot.contains(x, y) {
            return Some(ChartRegion::Plot);
        }
        None
    }
}

fn axis_scale(axis: &AxisDescriptor) -> Result<(f64, f64)> {
    let min = axis.min.unwrap_or(0.0);
    let max = axis.max.unwrap_or(if min < 100.0 { 100.0 } else { min + 100.0 });
    if !(min.is_finite() && max.is_finite()) || min >= max {
        return Err(ComposerError::compute(format!(
            "invalid axis range {}..{}",
            min, max
        )));
    }
    if axis.log_scale && min <= 0.0 {
        return Err(ComposerError::compute(
            "log scale needs a positive axis minimum",
        ));
    }
    Ok((min, max))
}

fn px(value: u32) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| ComposerError::compute(format!("chart band too large: {}", value)))
}

fn plot_err<E: std::fmt::Display>(err: E) -> ComposerError {
    ComposerError::compute(format!("chart layout failed: {}", err))
}

/// Lay out a chart of the given pixel size
pub fn build_chart_area(
    chart: &ChartInfo,
    width: u32,
    height: u32,
    config: &ChartAreaConfig,
) -> Result<ChartArea> {
    let width = width.max(config.min_width);
    let height = height.max(config.min_height);
    let descriptor = &chart.descriptor;
    let x_scale = axis_scale(&descriptor.x_axis)?;
    let y_scale = axis_scale(&descriptor.y_axis)?;

    let title_h = if descriptor.title.visible {
        let band = descriptor
            .title
            .font
            .size
            .saturating_add(config.margin.saturating_mul(2));
        px(config.title_height.max(band).min(height / 2))?
    } else {
        0
    };
    let x_axis_h = px(
        if descriptor.x_axis.label_visible || descriptor.x_axis.title_visible {
            config.x_axis_height
        } else {
            config.margin
        },
    )?;
    let y_axis_w = px(
        if descriptor.y_axis.label_visible || descriptor.y_axis.title_visible {
            config.y_axis_width
        } else {
            config.margin
        },
    )?;
    let margin = px(config.margin)?;
    let legend_w = px(config.legend_width)?;
    let legend_h = px(config.legend_height)?;

    let mut svg = String::new();
    let (title, legend, plot) = {
        let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(plot_err)?;

        let (title_area, body) = if title_h > 0 {
            let (t, b) = root.split_vertically(title_h);
            (Some(t), b)
        } else {
            (None, root.clone())
        };

        let (body_w, body_h) = body.dim_in_pixel();
        let legend_w = legend_w.min(body_w as i32 / 2);
        let legend_h = legend_h.min(body_h as i32 / 2);
        let (legend_area, plot_host) = if descriptor.legend.visible {
            match descriptor.legend.position {
                LegendPosition::Right => {
                    let (p, l) = body.split_horizontally(body_w as i32 - legend_w);
                    (Some(l), p)
                }
                LegendPosition::Left => {
                    let (l, p) = body.split_horizontally(legend_w);
                    (Some(l), p)
                }
                LegendPosition::Top => {
                    let (l, p) = body.split_vertically(legend_h);
                    (Some(l), p)
                }
                LegendPosition::Bottom => {
                    let (p, l) = body.split_vertically(body_h as i32 - legend_h);
                    (Some(l), p)
                }
            }
        } else {
            (None, body)
        };

        let chart_ctx = ChartBuilder::on(&plot_host)
            .margin(margin)
            .x_label_area_size(x_axis_h)
            .y_label_area_size(y_axis_w)
            .build_cartesian_2d(x_scale.0..x_scale.1, y_scale.0..y_scale.1)
            .map_err(plot_err)?;
        let plot = Region::from_ranges(chart_ctx.plotting_area().get_pixel_range());

        if let Some(area) = &title_area {
            area.fill(&RGBColor(0xf2, 0xf2, 0xf2)).map_err(plot_err)?;
        }
        if let Some(area) = &legend_area {
            area.fill(&RGBColor(0xe8, 0xee, 0xf4)).map_err(plot_err)?;
        }
        root.draw(&Rectangle::new(
            [
                (plot.x, plot.y),
                (plot.x + plot.width, plot.y + plot.height),
            ],
            RGBColor(0x4b, 0x4b, 0x4b).stroke_width(1),
        ))
        .map_err(plot_err)?;
        root.present().map_err(plot_err)?;

        (
            title_area.map(|a| Region::from_ranges(a.get_pixel_range())),
            legend_area.map(|a| Region::from_ranges(a.get_pixel_range())),
            plot,
        )
    };

    let x_axis = Region {
        x: plot.x,
        y: plot.y + plot.height,
        width: plot.width,
        height: x_axis_h,
    };
    let y_axis = Region {
        x: plot.x - y_axis_w,
        y: plot.y,
        width: y_axis_w,
        height: plot.height,
    };

    Ok(ChartArea {
        width,
        height,
        title,
        legend,
        plot,
        x_axis,
        y_axis,
        x_scale,
        y_scale,
        svg,
    })
}

/// Cached graph of one chart; incomplete pairs are rebuilt on the next read
#[derive(Clone, Debug, Default)]
pub struct GraphPair {
    pub area: Option<Arc<ChartArea>>,
    pub complete: bool,
}

/// Per-document owner of derived chart state
#[derive(Debug, Default)]
pub struct Sandbox {
    graphs: Mutex<HashMap<String, GraphPair>>,
    rebuilds: AtomicUsize,
    config: ChartAreaConfig,
}

impl Sandbox {
    pub fn new(config: ChartAreaConfig) -> Self {
        Sandbox {
            graphs: Mutex::new(HashMap::new()),
            rebuilds: AtomicUsize::new(0),
            config,
        }
    }

    /// The chart area of `name`, rebuilt when missing or incomplete.
    /// Callers hold the document read lock.
    pub fn chart_area(&self, vs: &Viewsheet, name: &str) -> Result<Arc<ChartArea>> {
        let chart = match vs.get(name)? {
            Assembly::Chart(chart) => chart,
            other => {
                return Err(ComposerError::TypeMismatch {
                    name: name.to_string(),
                    expected: crate::assembly::AssemblyKind::Chart,
                    actual: other.kind(),
                });
            }
        };

        if let Some(GraphPair {
            area: Some(area),
            complete: true,
        }) = self.graphs.lock()?.get(name)
        {
            return Ok(Arc::clone(area));
        }

        // built without holding the cache lock
        let size = chart.info.layout_size.unwrap_or(chart.info.pixel_size);
        let area = Arc::new(build_chart_area(
            chart,
            size.width.max(0) as u32,
            size.height.max(0) as u32,
            &self.config,
        )?);
        self.rebuilds.fetch_add(1, Ordering::SeqCst);
        debug!("rebuilt chart area for {}", name);

        self.graphs.lock()?.insert(
            name.to_string(),
            GraphPair {
                area: Some(Arc::clone(&area)),
                complete: true,
            },
        );
        Ok(area)
    }

    /// Drop the cached graph so the next read reflects the committed properties
    pub fn clear_graph(&self, name: &str) -> Result<()> {
        self.graphs.lock()?.remove(name);
        Ok(())
    }

    /// Keep the cached area but force a rebuild on the next read
    pub fn mark_incomplete(&self, name: &str) -> Result<()> {
        if let Some(pair) = self.graphs.lock()?.get_mut(name) {
            pair.complete = false;
        }
        Ok(())
    }

    pub fn rename_graph(&self, old_name: &str, new_name: &str) -> Result<()> {
        let mut graphs = self.graphs.lock()?;
        if let Some(pair) = graphs.remove(old_name) {
            graphs.insert(new_name.to_string(), pair);
        }
        Ok(())
    }

    pub fn is_cached(&self, name: &str) -> Result<bool> {
        Ok(self
            .graphs
            .lock()?
            .get(name)
            .is_some_and(|p| p.complete && p.area.is_some()))
    }

    pub fn rebuild_count(&self) -> usize {
        self.rebuilds.load(Ordering::SeqCst)
    }
}
