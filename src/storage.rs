//! Flow definition storage
//!
//! Flows live as `<flow_id>.flow.json` files anywhere below the flows
//! directory. Loaded flows are cached; saving refreshes the cache.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use botflow_core_types::Flow;
use glob::{glob_with, MatchOptions, Pattern};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::errors::BotFlowError;

pub const FLOW_FILE_SUFFIX: &str = ".flow.json";

/// Flow ids name files, so they must stay a single path component.
pub fn validate_flow_id(flow_id: &str) -> Result<(), BotFlowError> {
    let escapes = flow_id.trim().is_empty()
        || flow_id == "."
        || flow_id == ".."
        || flow_id.contains(['/', '\\', '\0']);
    if escapes {
        return Err(BotFlowError::validation(
            flow_id,
            "flow_id must be a non-empty name without path separators",
        ));
    }
    Ok(())
}

/// Read/write access to flow definitions.
pub trait FlowStore: Send + Sync {
    /// Load a flow, from cache when possible.
    fn load(&self, flow_id: &str) -> Result<Flow, BotFlowError>;

    /// Load a flow from its backing file, bypassing the cache.
    fn reload(&self, flow_id: &str) -> Result<Flow, BotFlowError>;

    /// Every valid flow, keyed by id. Unreadable files are skipped.
    fn load_all(&self) -> Result<BTreeMap<String, Flow>, BotFlowError>;

    /// Persist the whole flow.
    fn save(&self, flow: &Flow) -> Result<PathBuf, BotFlowError>;

    fn list_ids(&self) -> Result<Vec<String>, BotFlowError> {
        Ok(self.load_all()?.into_keys().collect())
    }
}

/// [`FlowStore`] over a directory of JSON files.
pub struct JsonFlowStore {
    flows_dir: PathBuf,
    cache: RwLock<HashMap<String, Flow>>,
}

impl JsonFlowStore {
    pub fn new(flows_dir: impl Into<PathBuf>) -> Self {
        Self {
            flows_dir: flows_dir.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn flows_dir(&self) -> &Path {
        &self.flows_dir
    }

    /// Direct `<dir>/<id>.flow.json` first, then a recursive search.
    pub fn find_flow_file(&self, flow_id: &str) -> Option<PathBuf> {
        if validate_flow_id(flow_id).is_err() {
            return None;
        }
        let file_name = format!("{flow_id}{FLOW_FILE_SUFFIX}");
        let direct = self.flows_dir.join(&file_name);
        if direct.is_file() {
            return Some(direct);
        }
        flow_files(&self.flows_dir)
            .into_iter()
            .find(|path| path.file_name().and_then(|n| n.to_str()) == Some(file_name.as_str()))
    }

    /// Parse and validate every flow file, reporting each outcome.
    pub fn check_all(&self) -> Vec<(PathBuf, Result<String, BotFlowError>)> {
        flow_files(&self.flows_dir)
            .into_iter()
            .map(|path| {
                let stem = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .and_then(|n| n.strip_suffix(FLOW_FILE_SUFFIX))
                    .unwrap_or_default()
                    .to_string();
                let outcome = Self::read_flow(&path, &stem).map(|flow| flow.flow_id);
                (path, outcome)
            })
            .collect()
    }

    fn read_flow(path: &Path, flow_id: &str) -> Result<Flow, BotFlowError> {
        let raw = fs::read_to_string(path)?;
        let flow: Flow = serde_json::from_str(&raw)
            .map_err(|err| BotFlowError::validation(flow_id, format!("Invalid JSON: {err}")))?;
        flow.validate()?;
        Ok(flow)
    }
}

impl FlowStore for JsonFlowStore {
    fn load(&self, flow_id: &str) -> Result<Flow, BotFlowError> {
        if let Some(flow) = self.cache.read().get(flow_id) {
            return Ok(flow.clone());
        }
        self.reload(flow_id)
    }

    fn reload(&self, flow_id: &str) -> Result<Flow, BotFlowError> {
        validate_flow_id(flow_id)?;
        let path = self
            .find_flow_file(flow_id)
            .ok_or_else(|| BotFlowError::FlowNotFound(flow_id.to_string()))?;
        let flow = Self::read_flow(&path, flow_id)?;
        self.cache.write().insert(flow_id.to_string(), flow.clone());
        info!(flow_id, path = %path.display(), "Flow loaded");
        Ok(flow)
    }

    fn load_all(&self) -> Result<BTreeMap<String, Flow>, BotFlowError> {
        let mut flows = BTreeMap::new();
        for path in flow_files(&self.flows_dir) {
            let stem = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(FLOW_FILE_SUFFIX))
                .unwrap_or_default()
                .to_string();
            match Self::read_flow(&path, &stem) {
                Ok(flow) => {
                    flows.insert(flow.flow_id.clone(), flow);
                }
                Err(err) => warn!(path = %path.display(), error = %err, "Skipping unreadable flow"),
            }
        }
        let mut cache = self.cache.write();
        for (id, flow) in &flows {
            cache.insert(id.clone(), flow.clone());
        }
        Ok(flows)
    }

    fn save(&self, flow: &Flow) -> Result<PathBuf, BotFlowError> {
        flow.validate()?;
        validate_flow_id(&flow.flow_id)?;
        let path = self
            .find_flow_file(&flow.flow_id)
            .unwrap_or_else(|| self.flows_dir.join(format!("{}{FLOW_FILE_SUFFIX}", flow.flow_id)));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string_pretty(flow)?;
        fs::write(&path, body)?;
        self.cache.write().insert(flow.flow_id.clone(), flow.clone());
        info!(flow_id = %flow.flow_id, path = %path.display(), "Flow saved");
        Ok(path)
    }
}

/// Every `*.flow.json` below `root`, sorted, hidden entries excluded.
fn flow_files(root: &Path) -> Vec<PathBuf> {
    let pattern = format!(
        "{}/**/*{FLOW_FILE_SUFFIX}",
        Pattern::escape(&root.to_string_lossy())
    );
    let options = MatchOptions {
        require_literal_leading_dot: true,
        ..MatchOptions::new()
    };
    let entries = match glob_with(&pattern, options) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(pattern = %pattern, error = %err, "Invalid flow file pattern");
            return Vec::new();
        }
    };
    let mut found: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(err) => {
                debug!(error = %err, "Cannot read flows directory entry");
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();
    found.sort();
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use botflow_core_types::{FlowStep, StepAction, TargetSelector};

    fn sample(flow_id: &str) -> Flow {
        Flow::new(
            flow_id,
            "example.com",
            vec![FlowStep::new("go", StepAction::Click).with_target(TargetSelector::css("#go"))],
        )
    }

    #[test]
    fn test_save_then_load_from_nested_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("shop");
        fs::create_dir_all(&nested).unwrap();
        fs::write(
            nested.join("checkout.flow.json"),
            serde_json::to_string(&sample("checkout")).unwrap(),
        )
        .unwrap();

        let store = JsonFlowStore::new(dir.path());
        let flow = store.load("checkout").unwrap();
        assert_eq!(flow.steps[0].id, "go");

        let mut edited = flow.clone();
        edited.steps[0].target = Some(TargetSelector::css("#buy").into());
        let path = store.save(&edited).unwrap();
        assert_eq!(path, nested.join("checkout.flow.json"));

        let fresh = JsonFlowStore::new(dir.path());
        assert_eq!(fresh.load("checkout").unwrap(), edited);
    }

    #[test]
    fn test_missing_and_invalid_flows() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.flow.json"), "{ not json").unwrap();
        fs::write(
            dir.path().join("empty.flow.json"),
            r#"{"flow_id": "empty", "site": "x", "steps": []}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("ok.flow.json"),
            serde_json::to_string(&sample("ok")).unwrap(),
        )
        .unwrap();
        let store = JsonFlowStore::new(dir.path());

        assert!(matches!(store.load("ghost"), Err(BotFlowError::FlowNotFound(_))));
        let err = store.load("broken").unwrap_err();
        assert!(err.to_string().contains("Invalid JSON"));
        assert!(matches!(store.load("empty"), Err(BotFlowError::FlowValidation { .. })));

        assert_eq!(store.list_ids().unwrap(), vec!["ok".to_string()]);

        let checked = store.check_all();
        assert_eq!(checked.len(), 3);
        let passed: Vec<&str> = checked
            .iter()
            .filter_map(|(_, outcome)| outcome.as_deref().ok())
            .collect();
        assert_eq!(passed, vec!["ok"]);
    }

    #[test]
    fn test_hidden_directories_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let hidden = dir.path().join(".trash");
        let deep = dir.path().join("team").join("shop");
        fs::create_dir_all(&hidden).unwrap();
        fs::create_dir_all(&deep).unwrap();
        fs::write(
            hidden.join("stale.flow.json"),
            serde_json::to_string(&sample("stale")).unwrap(),
        )
        .unwrap();
        fs::write(
            deep.join("cart.flow.json"),
            serde_json::to_string(&sample("cart")).unwrap(),
        )
        .unwrap();
        fs::write(dir.path().join("notes.json"), "{}").unwrap();

        let store = JsonFlowStore::new(dir.path());
        assert_eq!(store.list_ids().unwrap(), vec!["cart".to_string()]);
        assert_eq!(store.find_flow_file("cart"), Some(deep.join("cart.flow.json")));
        assert!(matches!(store.load("stale"), Err(BotFlowError::FlowNotFound(_))));
        assert_eq!(store.check_all().len(), 1);
    }

    #[test]
    fn test_flow_ids_stay_inside_flows_dir() {
        let dir = tempfile::tempdir().unwrap();
        let flows = dir.path().join("flows");
        fs::create_dir_all(&flows).unwrap();
        fs::write(
            dir.path().join("secret.flow.json"),
            serde_json::to_string(&sample("secret")).unwrap(),
        )
        .unwrap();
        let store = JsonFlowStore::new(&flows);

        assert_eq!(store.find_flow_file("../secret"), None);
        assert!(matches!(
            store.load("../secret"),
            Err(BotFlowError::FlowValidation { .. })
        ));
        for bad in ["../escaped", "nested/id", "..", "a\\b"] {
            assert!(store.save(&sample(bad)).is_err(), "{bad:?} accepted");
        }
        assert!(!dir.path().join("escaped.flow.json").exists());
        assert!(validate_flow_id("checkout-v2").is_ok());
    }

    #[test]
    fn test_cache_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFlowStore::new(dir.path());
        store.save(&sample("cached")).unwrap();
        let first = store.load("cached").unwrap();

        let mut changed = first.clone();
        changed.version = 2;
        fs::write(
            dir.path().join("cached.flow.json"),
            serde_json::to_string(&changed).unwrap(),
        )
        .unwrap();
        assert_eq!(store.load("cached").unwrap().version, 1);
        assert_eq!(store.reload("cached").unwrap().version, 2);
    }
}
