//! Behavior definition loader.
//!
//! # File format
//!
//! A definition file holds either one behavior object or an array of them:
//!
//! ```json
//! [
//!   { "behaviorClass": "Wait", "behaviorID": "ObservingWait" },
//!   { "behaviorClass": "DispatcherPassThrough", "behaviorID": "Observing",
//!     "delegateID": "ObservingWait" }
//! ]
//! ```
//!
//! A directory is loaded by reading every `*.json` file in it, in file name
//! order.  Subdirectories are not visited.

use std::io::Read;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::{SystemError, SystemResult};

/// Load the definitions in one file.
pub fn load_behaviors_file(path: &Path) -> SystemResult<Vec<Value>> {
    let file = std::fs::File::open(path)?;
    load_behaviors_reader(file).map_err(|e| match e {
        SystemError::Json(err) => SystemError::Definitions { path: path.display().to_string(), reason: err.to_string() },
        SystemError::Definitions { reason, .. } => {
            SystemError::Definitions { path: path.display().to_string(), reason }
        }
        other => other,
    })
}

/// Like [`load_behaviors_file`] but accepts any `Read` source.
pub fn load_behaviors_reader<R: Read>(reader: R) -> SystemResult<Vec<Value>> {
    let value: Value = serde_json::from_reader(reader)?;
    let definitions = match value {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        _ => {
            return Err(SystemError::Definitions {
                path:   "<reader>".to_owned(),
                reason: "expected a behavior object or an array of them".to_owned(),
            });
        }
    };
    if let Some(bad) = definitions.iter().position(|d| !d.is_object()) {
        return Err(SystemError::Definitions {
            path:   "<reader>".to_owned(),
            reason: format!("entry {bad} is not a JSON object"),
        });
    }
    Ok(definitions)
}

/// Load every `*.json` file directly inside `dir`, in file name order.
pub fn load_behaviors_dir(dir: &Path) -> SystemResult<Vec<Value>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "json") {
            files.push(path);
        }
    }
    files.sort();

    let mut definitions = Vec::new();
    for file in &files {
        let loaded = load_behaviors_file(file)?;
        debug!(file = %file.display(), count = loaded.len(), "BehaviorLoader.LoadFile");
        definitions.extend(loaded);
    }
    Ok(definitions)
}
