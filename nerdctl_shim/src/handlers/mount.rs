use anyhow::Context;
use std::sync::Arc;

use super::{ConversionResult, Converted, PathTranslator, ValueHandler};

/// Rewrites the source of a `source:dest[:options]` volume specification.
///
/// A single field is an anonymous volume and a source without any path
/// separator is a named volume; both are passed through. So is a `~` source,
/// which the wrapped tool expands in its own environment.
#[derive(Debug, Clone)]
pub struct MountHandler {
    translator: Arc<PathTranslator>,
}

impl MountHandler {
    pub fn new(translator: Arc<PathTranslator>) -> Self {
        Self { translator }
    }

    /// Splits off the source, keeping the colon of a leading drive letter.
    fn split_source<'a>(&self, spec: &'a str) -> (&'a str, Option<&'a str>) {
        let skip = if self.translator.has_drive_prefix(spec) { 2 } else { 0 };
        match spec[skip..].find(':') {
            Some(offset) => {
                let split = skip + offset;
                (&spec[..split], Some(&spec[split + 1..]))
            }
            None => (spec, None),
        }
    }

    fn is_named_volume(&self, source: &str) -> bool {
        !source.contains(['/', '\\'])
            && !source.starts_with(['.', '~'])
            && !self.translator.has_drive_prefix(source)
    }
}

impl ValueHandler for MountHandler {
    fn name(&self) -> &str {
        "volume"
    }

    fn convert(&self, value: &str) -> ConversionResult {
        let (source, rest) = self.split_source(value);
        let Some(rest) = rest else {
            return Ok(Converted::new(value));
        };
        if self.is_named_volume(source) || source.starts_with('~') {
            return Ok(Converted::new(value));
        }
        let translated = self
            .translator
            .translate(source)
            .with_context(|| format!("cannot translate volume source in {value:?}"))?;
        Ok(Converted::new(format!("{translated}:{rest}")))
    }
}
