//! JSON files for graphs and persistable state.

use crate::asg::{Asg, Value};
use crate::runtime::Scope;
use crate::tensor::GraphContext;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SerializationError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Unsupported format version '{0}'")]
    UnsupportedVersion(String),
}

type Result<T> = std::result::Result<T, SerializationError>;

const FORMAT_VERSION: &str = "1.0";

/// Main and startup graphs of one context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphBundle {
    pub version: String,
    pub main: Asg,
    pub startup: Asg,
}

impl GraphBundle {
    pub fn from_context(ctx: &GraphContext) -> Self {
        Self {
            version: FORMAT_VERSION.to_string(),
            main: ctx.main_graph().clone(),
            startup: ctx.startup_graph().clone(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let bundle: GraphBundle = serde_json::from_str(json)?;
        check_version(&bundle.version)?;
        Ok(bundle)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    version: String,
    values: BTreeMap<String, Value>,
}

fn check_version(version: &str) -> Result<()> {
    if version != FORMAT_VERSION {
        return Err(SerializationError::UnsupportedVersion(version.to_string()));
    }
    Ok(())
}

fn write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    let mut file = File::create(path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

fn open<P: AsRef<Path>>(path: P) -> Result<BufReader<File>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(SerializationError::FileNotFound(path.to_path_buf()));
    }
    Ok(BufReader::new(File::open(path)?))
}

pub fn save_graphs<P: AsRef<Path>>(path: P, bundle: &GraphBundle) -> Result<()> {
    write_json(path, bundle)
}

pub fn load_graphs<P: AsRef<Path>>(path: P) -> Result<GraphBundle> {
    let bundle: GraphBundle = serde_json::from_reader(open(path)?)?;
    check_version(&bundle.version)?;
    Ok(bundle)
}

/// Writes the scope values of every persistable variable of `graph`.
/// Returns how many values were written.
pub fn save_state<P: AsRef<Path>>(path: P, graph: &Asg, scope: &Scope) -> Result<usize> {
    let values: BTreeMap<String, Value> = graph
        .persistable_vars()
        .filter_map(|v| scope.get(&v.name).map(|value| (v.name.clone(), value.clone())))
        .collect();
    let count = values.len();
    write_json(path, &StateFile { version: FORMAT_VERSION.to_string(), values })?;
    Ok(count)
}

/// Loads saved values into `scope`, replacing what it holds under the same
/// names. Returns how many values were loaded.
pub fn load_state<P: AsRef<Path>>(path: P, scope: &mut Scope) -> Result<usize> {
    let state: StateFile = serde_json::from_reader(open(path)?)?;
    check_version(&state.version)?;
    let count = state.values.len();
    for (name, value) in state.values {
        scope.set(&name, value);
    }
    Ok(count)
}
