/*!
# Viewsheet Composer

Property dialog services for a browser based dashboard designer, built in Rust.

## Overview

A dashboard ("viewsheet") is a set of widgets ("assemblies"): calendars,
charts, gauges, shapes, tables, tabs, sliders and submit buttons. The editing
UI never touches the document directly. It asks for a dialog model of one
assembly, edits it, and sends it back; the server overlays the model onto a
clone of the assembly, commits it, recomputes everything depending on it and
pushes UI commands to every client attached to the document.

## Architecture

### Document Layer
- **Assembly**: one tagged variant per widget kind, each with its own configuration
- **Viewsheet**: the assemblies of a document plus the table schemas they bind to
- **Dependency Ordering**: recompute order of an assembly and its dependents

### Dialog Layer
- **Round Trip**: `read` builds a model, `write` overlays it onto a clone
- **Commit Pipeline**: validation, rename, replace, recompute and UI commands
- **Trap Check**: speculative binding validation with guaranteed restore
- **Chart Regions**: axis, legend and title dialogs backed by a cached chart area

### Runtime Layer
- Open documents keyed by runtime id, each with a read/write lock, a sandbox
  for chart state and a command channel
- Gzip compressed bincode persistence per user

## Modules

- **assembly**: widget kinds and their configuration
- **viewsheet**: the document, renames and dependency ordering
- **format**: colours, line styles and the static/expression colour model
- **chart_area**: chart layout and the per-document graph cache
- **dispatcher**: UI commands and the channels that carry them
- **handler**: the commit pipeline
- **trap**: trap validation
- **dialog**: the property dialogs
- **runtime**: open documents and the document accessor
- **saving**: document persistence
- **session**: editor sessions
- **app**: routing and middleware
*/

pub mod assembly;
pub mod chart_area;
pub mod config;
pub mod dialog;
pub mod dispatcher;
pub mod error;
pub mod format;
pub mod handler;
pub mod runtime;
pub mod saving;
pub mod session;
pub mod trap;
pub mod viewsheet;

#[cfg(feature = "web")]
pub mod app;

pub use error::{ComposerError, Result};
