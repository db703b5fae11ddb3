//! Property dialogs of the composer
//!
//! Every dialog follows the same round trip: `read` builds a model from the
//! committed configuration of one assembly, `write` overlays a model onto a
//! clone of that configuration, and the clone is committed through
//! [`AssemblyInfoHandler::apply`]. Dialogs that change data bindings can also
//! be trap checked without committing anything.

use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::assembly::{Assembly, AssemblyKind};
use crate::chart_area::Sandbox;
use crate::dispatcher::CommandDispatcher;
use crate::error::{ComposerError, Result};
use crate::handler::{ApplyOptions, AssemblyInfoHandler};
use crate::runtime::{Principal, RuntimeViewsheet};
use crate::trap::{TrapResult, TrapValidator, check_trap_with};
use crate::viewsheet::Viewsheet;

pub mod calendar;
pub mod chart;
pub mod condition;
pub mod gauge;
pub mod panes;
pub mod shape;
pub mod slider;
pub mod submit;
pub mod tab;
pub mod table;

/// What a dialog may look at while reading a model
pub struct DialogScope<'a> {
    pub vs: &'a Viewsheet,
    pub sandbox: &'a Sandbox,
}

/// One property dialog: a model type plus the mapping to and from an assembly
pub trait PropertyDialog {
    type Model: Serialize + DeserializeOwned + Send;

    /// Assembly kinds this dialog edits; the first one is reported on mismatch
    fn kinds(&self) -> &'static [AssemblyKind];

    fn read(&self, scope: &DialogScope<'_>, assembly: &Assembly) -> Result<Self::Model>;

    /// Overlay `model` onto `assembly`, returning the new name if it was renamed
    fn write(&self, model: &Self::Model, vs: &Viewsheet, assembly: &mut Assembly)
    -> Result<Option<String>>;
}

/// Dialogs whose binding changes can be validated before committing
pub trait TrapCheckDialog: PropertyDialog {
    /// Apply only the binding related part of `model`
    fn apply_binding(&self, model: &Self::Model, vs: &Viewsheet, scratch: &mut Assembly)
    -> Result<()>;
}

pub(crate) fn mismatch(assembly: &Assembly, expected: AssemblyKind) -> ComposerError {
    ComposerError::TypeMismatch {
        name: assembly.name().to_string(),
        expected,
        actual: assembly.kind(),
    }
}

fn check_kind<D: PropertyDialog + ?Sized>(dialog: &D, assembly: &Assembly) -> Result<()> {
    let kinds = dialog.kinds();
    if kinds.contains(&assembly.kind()) {
        return Ok(());
    }
    Err(mismatch(
        assembly,
        kinds.first().copied().unwrap_or(assembly.kind()),
    ))
}

/// Build the dialog model of `name` under the document read lock
pub fn get_dialog_model<D: PropertyDialog>(
    dialog: &D,
    rvs: &RuntimeViewsheet,
    name: &str,
    principal: &Principal,
) -> Result<D::Model> {
    let vs = rvs.read()?;
    let assembly = vs.get(name)?;
    check_kind(dialog, assembly)?;

    debug!("{} reads {} dialog of {}", principal.name, assembly.kind(), name);
    let scope = DialogScope {
        vs: &vs,
        sandbox: &rvs.sandbox,
    };
    dialog.read(&scope, assembly)
}

/// Overlay `model` onto a clone of `name` and commit it.
///
/// The write lock is held from the clone to the end of the commit. Nothing
/// in the document changes if the overlay or the commit fails.
pub fn set_dialog_model<D: PropertyDialog>(
    dialog: &D,
    rvs: &RuntimeViewsheet,
    name: &str,
    model: &D::Model,
    principal: &Principal,
    handler: &AssemblyInfoHandler,
    dispatcher: &dyn CommandDispatcher,
) -> Result<()> {
    let mut vs = rvs.write()?;
    let live = vs.get(name)?;
    check_kind(dialog, live)?;

    let mut clone = live.clone();
    let new_name = match dialog.write(model, &vs, &mut clone) {
        Ok(new_name) => new_name,
        Err(err) => {
            warn!("rejected {} dialog of {}: {}", clone.kind(), name, err);
            return Err(err);
        }
    };

    let (layout_changed, tables_changed) = {
        let before = vs.get(name)?.info();
        let after = clone.info();
        (
            before.pixel_offset != after.pixel_offset
                || before.pixel_size != after.pixel_size
                || before.layout_position != after.layout_position
                || before.layout_size != after.layout_size,
            before.binding.tables() != after.binding.tables(),
        )
    };

    handler.apply(
        &mut vs,
        &rvs.sandbox,
        clone,
        new_name.as_deref(),
        principal,
        dispatcher,
        ApplyOptions {
            // widgets that shared the old table depend on it no longer
            refresh_all: tables_changed,
            layout_changed,
            ..ApplyOptions::default()
        },
    )?;

    debug!("{} wrote dialog of {}", principal.name, name);
    Ok(())
}

/// Validate the binding change in `model` against the live document.
///
/// The scratch configuration is only swapped in for the duration of the check.
pub fn check_dialog_trap<D: TrapCheckDialog>(
    dialog: &D,
    rvs: &RuntimeViewsheet,
    name: &str,
    model: &D::Model,
    principal: &Principal,
    validator: &dyn TrapValidator,
) -> Result<TrapResult> {
    let mut vs = rvs.write()?;
    let live = vs.get(name)?;
    check_kind(dialog, live)?;

    let mut scratch = live.clone();
    dialog.apply_binding(model, &vs, &mut scratch)?;

    debug!("{} checks traps on {}", principal.name, name);
    check_trap_with(&mut vs, validator, scratch)
}
