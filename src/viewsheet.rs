use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::assembly::{Assembly, AssemblyKind, Point};
use crate::error::{ComposerError, Result};

lazy_static! {
    static ref NAME_REGEX: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap();
    static ref IDENT_REGEX: Regex = Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").unwrap();
}

/// Deepest container nesting followed when resolving positions
const MAX_CONTAINER_DEPTH: usize = 16;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum DataType {
    String,
    Integer,
    Double,
    Date,
    Boolean,
}

impl DataType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Double)
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
}

/// Columns of a data source the assemblies can bind to
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// The dashboard document: assemblies plus the tables they bind to
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Viewsheet {
    pub name: String,
    pub assemblies: BTreeMap<String, Assembly>,
    pub tables: BTreeMap<String, TableSchema>,
    /// Bumped on every committed change
    pub revision: u64,
}

pub fn is_valid_name(name: &str) -> bool {
    NAME_REGEX.is_match(name)
}

impl Viewsheet {
    pub fn new(name: &str) -> Self {
        Viewsheet {
            name: name.to_string(),
            assemblies: BTreeMap::new(),
            tables: BTreeMap::new(),
            revision: 0,
        }
    }

    pub fn get(&self, name: &str) -> Result<&Assembly> {
        self.assemblies
            .get(name)
            .ok_or_else(|| ComposerError::AssemblyNotFound(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Assembly> {
        self.assemblies
            .get_mut(name)
            .ok_or_else(|| ComposerError::AssemblyNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.assemblies.contains_key(name)
    }

    pub fn add_table(&mut self, table: TableSchema) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }

    /// Next free name of the form `Chart1`, `Chart2`, ...
    pub fn next_name(&self, kind: AssemblyKind) -> String {
        let mut i = 1;
        loop {
            let candidate = format!("{}{}", kind.as_str(), i);
            if !self.contains(&candidate) {
                return candidate;
            }
            i += 1;
        }
    }

    pub fn add_assembly(&mut self, assembly: Assembly) -> Result<()> {
        let name = assembly.name().to_string();
        if !is_valid_name(&name) {
            return Err(ComposerError::validation(format!(
                "invalid assembly name: {}",
                name
            )));
        }
        if self.contains(&name) {
            return Err(ComposerError::validation(format!(
                "assembly already exists: {}",
                name
            )));
        }

        if let Some(container) = assembly.info().container.clone() {
            match self.assemblies.get_mut(&container) {
                Some(Assembly::Tab(tab)) => {
                    tab.children.push(name.clone());
                    tab.labels.push(name.clone());
                    if tab.selected.is_none() {
                        tab.selected = Some(name.clone());
                    }
                }
                Some(other) => {
                    return Err(ComposerError::TypeMismatch {
                        name: container,
                        expected: AssemblyKind::Tab,
                        actual: other.kind(),
                    });
                }
                None => return Err(ComposerError::AssemblyNotFound(container)),
            }
        }

        self.assemblies.insert(name, assembly);
        self.revision += 1;
        Ok(())
    }

    pub fn remove_assembly(&mut self, name: &str) -> Result<Assembly> {
        let removed = self
            .assemblies
            .remove(name)
            .ok_or_else(|| ComposerError::AssemblyNotFound(name.to_string()))?;

        for assembly in self.assemblies.values_mut() {
            if let Assembly::Tab(tab) = assembly {
                if let Some(pos) = tab.children.iter().position(|c| c == name) {
                    tab.children.remove(pos);
                    if pos < tab.labels.len() {
                        tab.labels.remove(pos);
                    }
                    if tab.selected.as_deref() == Some(name) {
                        tab.selected = tab.children.first().cloned();
                    }
                }
            }

            let info = assembly.info_mut();
            if info.container.as_deref() == Some(name) {
                info.container = None;
            }
        }

        self.revision += 1;
        Ok(removed)
    }

    /// Replace a committed assembly with a new configuration of the same name
    pub fn replace(&mut self, assembly: Assembly) -> Result<Assembly> {
        let name = assembly.name().to_string();
        let slot = self.get_mut(&name)?;
        let old = std::mem::replace(slot, assembly);
        self.revision += 1;
        Ok(old)
    }

    /// Whether `old_name` can be renamed to `new_name`
    pub fn check_rename(&self, old_name: &str, new_name: &str) -> Result<()> {
        if !self.contains(old_name) {
            return Err(ComposerError::AssemblyNotFound(old_name.to_string()));
        }
        if !is_valid_name(new_name) {
            return Err(ComposerError::validation(format!(
                "invalid assembly name: {}",
                new_name
            )));
        }
        if old_name != new_name && self.contains(new_name) {
            return Err(ComposerError::validation(format!(
                "assembly already exists: {}",
                new_name
            )));
        }
        Ok(())
    }

    /// Rename an assembly and every reference to it
    pub fn rename_assembly(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        if old_name == new_name {
            return Ok(());
        }
        self.check_rename(old_name, new_name)?;

        let mut assembly = self
            .assemblies
            .remove(old_name)
            .ok_or_else(|| ComposerError::AssemblyNotFound(old_name.to_string()))?;
        assembly.info_mut().name = new_name.to_string();
        self.assemblies.insert(new_name.to_string(), assembly);

        let reference = Regex::new(&format!(r"\b{}\b", regex::escape(old_name)))
            .map_err(|e| ComposerError::compute(e.to_string()))?;

        for assembly in self.assemblies.values_mut() {
            if let Assembly::Tab(tab) = assembly {
                for child in tab.children.iter_mut() {
                    if child == old_name {
                        *child = new_name.to_string();
                    }
                }
                if tab.selected.as_deref() == Some(old_name) {
                    tab.selected = Some(new_name.to_string());
                }
            }

            let info = assembly.info_mut();
            if info.container.as_deref() == Some(old_name) {
                info.container = Some(new_name.to_string());
            }
            if reference.is_match(&info.script.expression) {
                info.script.expression = reference
                    .replace_all(&info.script.expression, new_name)
                    .into_owned();
            }
        }

        self.revision += 1;
        Ok(())
    }

    /// Absolute canvas position, resolving container-relative offsets
    pub fn pixel_position(&self, name: &str) -> Result<Point> {
        let mut current = self.get(name)?;
        let mut pos = current.info().pixel_offset;

        for _ in 0..MAX_CONTAINER_DEPTH {
            let Some(container) = current.info().container.as_deref() else {
                return Ok(pos);
            };
            current = self.get(container)?;
            let offset = current.info().pixel_offset;
            pos = Point::new(pos.x + offset.x, pos.y + offset.y);
        }

        Err(ComposerError::compute(format!(
            "container nesting too deep for {}",
            name
        )))
    }

    /// Names of the assemblies that must be refreshed when `name` changes
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        let Some(source) = self.assemblies.get(name) else {
            return Vec::new();
        };
        let mut dependents = BTreeSet::new();

        if let Assembly::Tab(tab) = source {
            for child in &tab.children {
                if self.contains(child) {
                    dependents.insert(child.clone());
                }
            }
        }

        if source.kind().is_input() {
            let source_tables = source.info().binding.tables();
            for (other_name, other) in &self.assemblies {
                if other_name != name
                    && other.kind().is_data()
                    && !other.info().binding.tables().is_disjoint(&source_tables)
                {
                    dependents.insert(other_name.clone());
                }
            }
        }

        for (other_name, other) in &self.assemblies {
            let script = &other.info().script;
            if other_name != name
                && script.enabled
                && IDENT_REGEX
                    .find_iter(&script.expression)
                    .any(|m| m.as_str() == name)
            {
                dependents.insert(other_name.clone());
            }
        }

        dependents.into_iter().collect()
    }

    /// `name` followed by everything depending on it, each before its own dependents
    pub fn recompute_order(&self, name: &str) -> Vec<String> {
        let mut sorted_nodes = Vec::new();
        let mut visited = BTreeSet::new();
        let mut in_progress = BTreeSet::new();

        let mut work_stack = vec![name.to_string()];

        while let Some(current) = work_stack.pop() {
            if visited.contains(&current) || !self.contains(&current) {
                continue;
            }
            in_progress.insert(current.clone());

            let mut all_dependents_visited = true;
            for dep in self.dependents_of(&current) {
                if !visited.contains(&dep) && !in_progress.contains(&dep) {
                    work_stack.push(current.clone());
                    work_stack.push(dep);
                    all_dependents_visited = false;
                    break;
                }
            }

            if all_dependents_visited {
                in_progress.remove(&current);
                visited.insert(current.clone());
                sorted_nodes.push(current);
            }
        }

        sorted_nodes.reverse();
        sorted_nodes
    }

    /// Every assembly, each before its own dependents
    pub fn full_recompute_order(&self) -> Vec<String> {
        let mut order: Vec<String> = Vec::new();
        let mut seen = BTreeSet::new();
        let mut roots: Vec<&String> = self.assemblies.keys().collect();
        // inputs and containers first so their dependents land after them
        roots.sort_by_key(|n| {
            let kind = self.assemblies[*n].kind();
            !(kind.is_input() || kind == AssemblyKind::Tab)
        });

        for root in roots {
            if seen.contains(root) {
                continue;
            }
            for name in self.recompute_order(root) {
                if seen.insert(name.clone()) {
                    order.push(name);
                }
            }
        }
        order
    }
}
