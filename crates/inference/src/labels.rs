use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

/// One `index: 'label'` entry of a Python dict literal, single or double quoted.
static NAMES_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\d+)\s*:\s*(?:'((?:[^'\\]|\\.)*)'|"((?:[^"\\]|\\.)*)")"#)
        .expect("names entry pattern is valid")
});

#[derive(Error, Debug)]
pub enum LabelError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Malformed class names: {0}")]
    Malformed(String),

    #[error("Class names are empty")]
    Empty,
}

/// Class index → human readable label, as bound to a loaded model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassNames {
    names: HashMap<usize, String>,
}

impl ClassNames {
    pub fn new(names: HashMap<usize, String>) -> Self {
        Self { names }
    }

    /// Parses the `{0: 'cat', 1: 'dog'}` literal YOLO exporters store in the
    /// ONNX `names` metadata entry.
    pub fn from_metadata(literal: &str) -> Result<Self, LabelError> {
        let trimmed = literal.trim();
        if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
            return Err(LabelError::Malformed(format!(
                "expected a dictionary literal, got `{}`",
                trimmed
            )));
        }

        let mut names = HashMap::new();
        for caps in NAMES_ENTRY.captures_iter(trimmed) {
            let index: usize = caps[1]
                .parse()
                .map_err(|_| LabelError::Malformed(format!("bad class index `{}`", &caps[1])))?;
            let raw = caps.get(2).or_else(|| caps.get(3)).map_or("", |m| m.as_str());
            names.insert(index, unescape(raw));
        }

        if names.is_empty() {
            return Err(LabelError::Empty);
        }
        Ok(Self { names })
    }

    /// One label per line; the line number (from zero) is the class index.
    /// Blank lines leave their index unassigned.
    pub fn from_lines(text: &str) -> Result<Self, LabelError> {
        let names: HashMap<usize, String> = text
            .lines()
            .enumerate()
            .filter_map(|(id, line)| {
                let name = line.trim();
                (!name.is_empty()).then(|| (id, name.to_string()))
            })
            .collect();

        if names.is_empty() {
            return Err(LabelError::Empty);
        }
        Ok(Self { names })
    }

    pub fn from_file(path: &Path) -> Result<Self, LabelError> {
        Self::from_lines(&std::fs::read_to_string(path)?)
    }

    pub fn get(&self, class_id: usize) -> Option<&str> {
        self.names.get(&class_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
