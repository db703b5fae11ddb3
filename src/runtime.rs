use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::chart_area::Sandbox;
use crate::config::ComposerConfig;
use crate::dispatcher::DocumentChannel;
use crate::error::{ComposerError, Result};
use crate::saving;
use crate::viewsheet::{Viewsheet, is_valid_name};

/// Identity of the user a request acts for
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq, Hash)]
pub struct Principal {
    pub name: String,
}

impl Principal {
    pub fn new(name: &str) -> Self {
        Principal {
            name: name.to_string(),
        }
    }
}

/// An open viewsheet with its derived state.
///
/// Reads of the document or of its chart areas hold `read()`; every commit
/// holds `write()` from the clone of the live configuration to the end of
/// the commit, so writers of one document are serialized.
#[derive(Debug)]
pub struct RuntimeViewsheet {
    pub id: String,
    pub owner: Principal,
    viewsheet: RwLock<Viewsheet>,
    pub sandbox: Sandbox,
    pub channel: DocumentChannel,
}

impl RuntimeViewsheet {
    pub fn new(id: &str, owner: Principal, viewsheet: Viewsheet, config: &ComposerConfig) -> Self {
        RuntimeViewsheet {
            id: id.to_string(),
            owner,
            viewsheet: RwLock::new(viewsheet),
            sandbox: Sandbox::new(config.chart),
            channel: DocumentChannel::new(config.max_commands_per_document),
        }
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, Viewsheet>> {
        Ok(self.viewsheet.read()?)
    }

    pub fn write(&self) -> Result<RwLockWriteGuard<'_, Viewsheet>> {
        Ok(self.viewsheet.write()?)
    }

    /// Copy of the current document, taken under the read lock
    pub fn snapshot(&self) -> Result<Viewsheet> {
        Ok(self.read()?.clone())
    }
}

/// Summary of an open document
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct DocumentEntry {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub assemblies: usize,
    pub revision: u64,
}

/// Registry of open viewsheets keyed by runtime id
pub struct ViewsheetService {
    documents: RwLock<HashMap<String, Arc<RuntimeViewsheet>>>,
    config: ComposerConfig,
}

impl ViewsheetService {
    pub fn new(config: ComposerConfig) -> Self {
        ViewsheetService {
            documents: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    fn insert(&self, viewsheet: Viewsheet, owner: &Principal) -> Result<Arc<RuntimeViewsheet>> {
        let id = Uuid::new_v4().to_string();
        let rvs = Arc::new(RuntimeViewsheet::new(
            &id,
            owner.clone(),
            viewsheet,
            &self.config,
        ));
        self.documents.write()?.insert(id, Arc::clone(&rvs));
        Ok(rvs)
    }

    /// Open a new, empty viewsheet
    pub fn create(&self, name: &str, owner: &Principal) -> Result<Arc<RuntimeViewsheet>> {
        if !is_valid_name(name) {
            return Err(ComposerError::validation(format!(
                "invalid viewsheet name: {}",
                name
            )));
        }
        let rvs = self.insert(Viewsheet::new(name), owner)?;
        info!("{} created viewsheet {} as {}", owner.name, name, rvs.id);
        Ok(rvs)
    }

    /// Open an existing document
    pub fn open_viewsheet(
        &self,
        viewsheet: Viewsheet,
        owner: &Principal,
    ) -> Result<Arc<RuntimeViewsheet>> {
        let rvs = self.insert(viewsheet, owner)?;
        info!("{} opened viewsheet as {}", owner.name, rvs.id);
        Ok(rvs)
    }

    fn user_dir(&self, owner: &Principal) -> Result<PathBuf> {
        if !is_valid_name(&owner.name) {
            return Err(ComposerError::validation(format!(
                "invalid user name: {}",
                owner.name
            )));
        }
        Ok(Path::new(&self.config.storage_dir).join(&owner.name))
    }

    fn file_path(&self, owner: &Principal, name: &str) -> Result<PathBuf> {
        if !is_valid_name(name) {
            return Err(ComposerError::validation(format!(
                "invalid viewsheet name: {}",
                name
            )));
        }
        Ok(self.user_dir(owner)?.join(format!("{}.bin.gz", name)))
    }

    /// Open a viewsheet previously saved by this user
    pub fn open(&self, name: &str, owner: &Principal) -> Result<Arc<RuntimeViewsheet>> {
        let path = self.file_path(owner, name)?;
        if !path.exists() {
            return Err(ComposerError::DocumentNotFound(name.to_string()));
        }
        let viewsheet = saving::load_viewsheet(&path)?;
        self.open_viewsheet(viewsheet, owner)
    }

    /// Write the document to the owner's storage directory
    pub fn save(&self, id: &str, principal: &Principal) -> Result<PathBuf> {
        let rvs = self.resolve(id, principal)?;
        let dir = self.user_dir(principal)?;
        std::fs::create_dir_all(&dir)?;

        let vs = rvs.read()?;
        let path = self.file_path(principal, &vs.name)?;
        saving::save_viewsheet(&vs, &path)?;
        info!("saved viewsheet {} to {}", vs.name, path.display());
        Ok(path)
    }

    /// Locate an open document; unknown ids and other users' documents are not found
    pub fn resolve(&self, id: &str, principal: &Principal) -> Result<Arc<RuntimeViewsheet>> {
        let documents = self.documents.read()?;
        match documents.get(id) {
            Some(rvs) if rvs.owner == *principal => Ok(Arc::clone(rvs)),
            _ => Err(ComposerError::DocumentNotFound(id.to_string())),
        }
    }

    pub fn close(&self, id: &str, principal: &Principal) -> Result<()> {
        self.resolve(id, principal)?;
        self.documents.write()?.remove(id);
        info!("{} closed viewsheet {}", principal.name, id);
        Ok(())
    }

    pub fn list(&self, principal: &Principal) -> Result<Vec<DocumentEntry>> {
        let documents = self.documents.read()?;
        let mut entries = Vec::new();
        for rvs in documents.values().filter(|d| d.owner == *principal) {
            let vs = rvs.read()?;
            entries.push(DocumentEntry {
                id: rvs.id.clone(),
                name: vs.name.clone(),
                owner: rvs.owner.name.clone(),
                assemblies: vs.assemblies.len(),
                revision: vs.revision,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(entries)
    }
}
