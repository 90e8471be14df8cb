//! Data models: a named schema with its absorption settings, metadata hook and sample files.

use crate::absorb::{AbsorbConfig, AbsorptionResult, Engine};
use crate::ast::Schema;
use crate::metadata::PostAbsorbHook;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One absorbed sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample<'s> {
    /// `{model}_{index:02}`, e.g. `jpg_00`.
    pub name: String,
    pub result: AbsorptionResult<'s>,
}

pub struct DataModel {
    pub name: String,
    /// Extension (without dot) of sample files, matched case-insensitively.
    pub file_extension: String,
    pub schema: Schema,
    pub config: AbsorbConfig,
    pub hook: Option<Box<dyn PostAbsorbHook + Send + Sync>>,
}

impl DataModel {
    pub fn new(name: impl Into<String>, file_extension: impl Into<String>, schema: Schema) -> Self {
        DataModel {
            name: name.into(),
            file_extension: file_extension.into(),
            schema,
            config: AbsorbConfig::default(),
            hook: None,
        }
    }

    pub fn with_config(mut self, config: AbsorbConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_hook(mut self, hook: impl PostAbsorbHook + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn engine(&self) -> Engine<'_> {
        let engine = Engine::new(&self.schema, self.config.clone());
        match self.hook.as_deref() {
            Some(hook) => engine.with_hook(hook),
            None => engine,
        }
    }

    pub fn absorb_sample(&self, data: &[u8], idx: usize) -> Sample<'_> {
        let name = format!("{}_{:02}", self.name, idx);
        let result = self.engine().absorb(data);
        info!(
            "{}: {:?} offset={} size={} remaining={}",
            name,
            result.status,
            result.offset,
            result.consumed_size,
            data.len().saturating_sub(result.consumed_size)
        );
        Sample { name, result }
    }

    /// Absorb independent samples on up to `threads` scoped threads. Results keep input order.
    pub fn absorb_all<'m>(&'m self, samples: &[Vec<u8>], threads: usize) -> Vec<Sample<'m>> {
        let threads = threads.max(1);
        if threads == 1 || samples.len() < 2 {
            return samples.iter().enumerate().map(|(i, d)| self.absorb_sample(d, i)).collect();
        }
        let chunk = samples.len().div_ceil(threads);
        debug!("absorbing {} samples in chunks of {}", samples.len(), chunk);
        std::thread::scope(|scope| {
            let handles: Vec<_> = samples
                .chunks(chunk)
                .enumerate()
                .map(|(c, part)| {
                    scope.spawn(move || {
                        part.iter()
                            .enumerate()
                            .map(|(i, d)| self.absorb_sample(d, c * chunk + i))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect()
        })
    }

    /// Read every file in `dir` with this model's extension, sorted by path.
    pub fn load_samples(&self, dir: &Path) -> std::io::Result<Vec<(PathBuf, Vec<u8>)>> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(&self.file_extension));
            if matches && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        debug!("{}: {} sample file(s) in {}", self.name, paths.len(), dir.display());
        paths
            .into_iter()
            .map(|p| {
                let data = std::fs::read(&p)?;
                Ok((p, data))
            })
            .collect()
    }
}
