use log::{debug, warn};

use crate::assembly::{Assembly, AssemblyKind};
use crate::chart_area::Sandbox;
use crate::dispatcher::{CommandDispatcher, UiCommand};
use crate::error::{ComposerError, Result};
use crate::runtime::Principal;
use crate::viewsheet::Viewsheet;

/// Execution control for [`AssemblyInfoHandler::apply`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Re-execute every assembly instead of just the changed one and its dependents
    pub refresh_all: bool,
    /// Reject scripts that do not parse
    pub check_script: bool,
    /// Position or size changed
    pub layout_changed: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        ApplyOptions {
            refresh_all: false,
            check_script: true,
            layout_changed: false,
        }
    }
}

/// Commits a new assembly configuration into a viewsheet
#[derive(Debug, Default, Clone, Copy)]
pub struct AssemblyInfoHandler;

impl AssemblyInfoHandler {
    pub fn new() -> Self {
        AssemblyInfoHandler
    }

    /// Replace the configuration of `info.name()` with `info`, optionally rename
    /// it, then recompute dependents and emit UI commands.
    ///
    /// `vs` stays untouched if validation fails.
    pub fn apply(
        &self,
        vs: &mut Viewsheet,
        sandbox: &Sandbox,
        info: Assembly,
        new_name: Option<&str>,
        principal: &Principal,
        dispatcher: &dyn CommandDispatcher,
        options: ApplyOptions,
    ) -> Result<()> {
        let old_name = info.name().to_string();
        let current_kind = vs.get(&old_name)?.kind();
        if current_kind != info.kind() {
            return Err(ComposerError::TypeMismatch {
                name: old_name,
                expected: current_kind,
                actual: info.kind(),
            });
        }

        if options.check_script && info.info().script.enabled {
            check_script(&info.info().script.expression)?;
        }
        if let Assembly::Tab(tab) = &info {
            for child in &tab.children {
                vs.get(child)?;
            }
        }

        let rename = new_name.filter(|n| !n.is_empty() && *n != old_name);
        if let Some(new_name) = rename {
            vs.check_rename(&old_name, new_name)?;
        }

        // committed under the old name so the rename rewrites its own script too
        vs.replace(info)?;
        if let Some(new_name) = rename {
            vs.rename_assembly(&old_name, new_name)?;
            sandbox.rename_graph(&old_name, new_name)?;
        }

        let name = rename.unwrap_or(old_name.as_str()).to_string();
        debug!("{} committed {} (revision {})", principal.name, name, vs.revision);

        if let Some(new_name) = rename {
            dispatcher.send_command(UiCommand::RenameAssembly {
                old_name: old_name.clone(),
                new_name: new_name.to_string(),
            })?;
        }

        let order = if options.refresh_all {
            vs.full_recompute_order()
        } else {
            vs.recompute_order(&name)
        };

        for target in &order {
            let kind = vs.get(target)?.kind();
            if kind == AssemblyKind::Chart {
                if *target == name {
                    sandbox.clear_graph(target)?;
                } else {
                    sandbox.mark_incomplete(target)?;
                }
            }

            dispatcher.send_command(UiCommand::RefreshAssembly {
                name: target.clone(),
                kind,
                revision: vs.revision,
            })?;

            if kind == AssemblyKind::Chart {
                dispatcher.send_command(UiCommand::RefreshChartArea {
                    name: target.clone(),
                })?;
            }
        }

        // a moved or resized child changes the layout of its tab
        if options.layout_changed {
            if let Some(container) = vs.get(&name)?.info().container.clone() {
                if !order.contains(&container) {
                    debug!("layout of {} changed, refreshing {}", name, container);
                    dispatcher.send_command(UiCommand::RefreshAssembly {
                        kind: vs.get(&container)?.kind(),
                        name: container,
                        revision: vs.revision,
                    })?;
                }
            }
        }

        Ok(())
    }
}

/// Syntax check of a script: balanced brackets and closed string literals
pub fn check_script(script: &str) -> Result<()> {
    let mut stack = Vec::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (pos, ch) in script.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }

        match ch {
            '"' | '\'' => quote = Some(ch),
            '(' | '[' | '{' => stack.push((ch, pos)),
            ')' | ']' | '}' => {
                let expected = match ch {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match stack.pop() {
                    Some((open, _)) if open == expected => {}
                    _ => {
                        warn!("script rejected at {}: unexpected '{}'", pos, ch);
                        return Err(ComposerError::compute(format!(
                            "script error at {}: unexpected '{}'",
                            pos, ch
                        )));
                    }
                }
            }
            _ => {}
        }
    }

    if quote.is_some() {
        return Err(ComposerError::compute("script error: unterminated string"));
    }
    if let Some((open, pos)) = stack.pop() {
        return Err(ComposerError::compute(format!(
            "script error at {}: unclosed '{}'",
            pos, open
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::ColumnRef;
    use crate::config::ChartAreaConfig;
    use crate::dispatcher::CommandQueue;
    use std::sync::Arc;

    fn sheet() -> Viewsheet {
        let mut vs = Viewsheet::new("Sales");
        let mut calendar = Assembly::create(AssemblyKind::Calendar, "Calendar1");
        calendar.info_mut().binding.table = Some("Orders".to_string());
        calendar.info_mut().binding.dimensions = vec![ColumnRef::new("OrderDate")];
        vs.add_assembly(calendar).unwrap();

        let mut chart = Assembly::create(AssemblyKind::Chart, "Chart1");
        chart.info_mut().binding.table = Some("Orders".to_string());
        vs.add_assembly(chart).unwrap();
        vs.add_assembly(Assembly::create(AssemblyKind::Oval, "Oval1"))
            .unwrap();
        vs
    }

    #[test]
    fn commit_refreshes_dependents_in_order() {
        let mut vs = sheet();
        let sandbox = Sandbox::new(ChartAreaConfig::default());
        let queue = CommandQueue::new();
        let mut calendar = vs.get("Calendar1").unwrap().clone();
        calendar.info_mut().title = "Order Date".to_string();

        AssemblyInfoHandler::new()
            .apply(
                &mut vs,
                &sandbox,
                calendar,
                None,
                &Principal::new("alice"),
                &queue,
                ApplyOptions::default(),
            )
            .unwrap();

        let names: Vec<String> = queue
            .into_commands()
            .unwrap()
            .into_iter()
            .filter_map(|c| match c {
                UiCommand::RefreshAssembly { name, .. } => Some(name),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["Calendar1".to_string(), "Chart1".to_string()]);
        assert_eq!(vs.get("Calendar1").unwrap().info().title, "Order Date");
    }

    #[test]
    fn rename_is_announced_first() {
        let mut vs = sheet();
        let sandbox = Sandbox::new(ChartAreaConfig::default());
        let queue = CommandQueue::new();
        let oval = vs.get("Oval1").unwrap().clone();

        AssemblyInfoHandler::new()
            .apply(
                &mut vs,
                &sandbox,
                oval,
                Some("Badge"),
                &Principal::new("alice"),
                &queue,
                ApplyOptions::default(),
            )
            .unwrap();

        let commands = queue.into_commands().unwrap();
        assert!(matches!(&commands[0], UiCommand::RenameAssembly { new_name, .. } if new_name == "Badge"));
        assert!(vs.contains("Badge"));
        assert!(!vs.contains("Oval1"));
    }

    #[test]
    fn broken_script_leaves_document_untouched() {
        let mut vs = sheet();
        let before = vs.clone();
        let sandbox = Sandbox::new(ChartAreaConfig::default());
        let queue = CommandQueue::new();
        let mut oval = vs.get("Oval1").unwrap().clone();
        oval.info_mut().script.enabled = true;
        oval.info_mut().script.expression = "if (Chart1.visible { x = 'a'".to_string();

        let err = AssemblyInfoHandler::new()
            .apply(
                &mut vs,
                &sandbox,
                oval,
                Some("Renamed"),
                &Principal::new("alice"),
                &queue,
                ApplyOptions::default(),
            )
            .unwrap_err();

        assert!(matches!(err, ComposerError::Compute(_)));
        assert_eq!(vs, before);
        assert!(queue.into_commands().unwrap().is_empty());
    }

    #[test]
    fn script_checker() {
        assert!(check_script("Chart1.title = \"a (b\"; f(x[1])").is_ok());
        assert!(check_script("f(x]").is_err());
        assert!(check_script("'open").is_err());
        assert!(check_script("{ a").is_err());
    }

    #[test]
    fn rename_rewrites_the_renamed_script_too() {
        let mut vs = sheet();
        let mut rect = Assembly::create(AssemblyKind::Rectangle, "Rect1");
        rect.info_mut().script.expression = "Oval1.visible = true".to_string();
        vs.add_assembly(rect).unwrap();
        vs.get_mut("Oval1").unwrap().info_mut().script.expression =
            "Oval1.visible = true".to_string();

        let sandbox = Sandbox::new(ChartAreaConfig::default());
        let queue = CommandQueue::new();
        let oval = vs.get("Oval1").unwrap().clone();
        AssemblyInfoHandler::new()
            .apply(
                &mut vs,
                &sandbox,
                oval,
                Some("Badge"),
                &Principal::new("alice"),
                &queue,
                ApplyOptions::default(),
            )
            .unwrap();

        for name in ["Badge", "Rect1"] {
            assert_eq!(
                vs.get(name).unwrap().info().script.expression,
                "Badge.visible = true"
            );
        }
    }

    #[test]
    fn layout_change_refreshes_the_container() {
        let mut vs = sheet();
        vs.add_assembly(Assembly::create(AssemblyKind::Tab, "Tab1"))
            .unwrap();
        let mut oval = Assembly::create(AssemblyKind::Oval, "Oval2");
        oval.info_mut().container = Some("Tab1".to_string());
        vs.add_assembly(oval).unwrap();

        let sandbox = Sandbox::new(ChartAreaConfig::default());
        let refreshed = |options: ApplyOptions, vs: &mut Viewsheet| {
            let queue = CommandQueue::new();
            let oval = vs.get("Oval2").unwrap().clone();
            AssemblyInfoHandler::new()
                .apply(vs, &sandbox, oval, None, &Principal::new("alice"), &queue, options)
                .unwrap();
            queue
                .into_commands()
                .unwrap()
                .into_iter()
                .filter_map(|c| match c {
                    UiCommand::RefreshAssembly { name, .. } => Some(name),
                    _ => None,
                })
                .collect::<Vec<_>>()
        };

        assert_eq!(refreshed(ApplyOptions::default(), &mut vs), vec!["Oval2"]);
        let moved = ApplyOptions {
            layout_changed: true,
            ..ApplyOptions::default()
        };
        assert_eq!(refreshed(moved, &mut vs), vec!["Oval2", "Tab1"]);
    }

    #[test]
    fn dependent_charts_are_marked_incomplete() {
        let mut vs = sheet();
        let sandbox = Sandbox::new(ChartAreaConfig::default());
        let area = sandbox.chart_area(&vs, "Chart1").unwrap();
        assert_eq!(sandbox.rebuild_count(), 1);

        let calendar = vs.get("Calendar1").unwrap().clone();
        AssemblyInfoHandler::new()
            .apply(
                &mut vs,
                &sandbox,
                calendar,
                None,
                &Principal::new("alice"),
                &CommandQueue::new(),
                ApplyOptions::default(),
            )
            .unwrap();

        assert!(!sandbox.is_cached("Chart1").unwrap());
        let rebuilt = sandbox.chart_area(&vs, "Chart1").unwrap();
        assert!(!Arc::ptr_eq(&area, &rebuilt));
        assert_eq!(sandbox.rebuild_count(), 2);
    }
}
