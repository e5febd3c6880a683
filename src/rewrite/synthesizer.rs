//! Unpacker synthesis
//!
//! Turns an app's `Application` subclass and the same-package classes it
//! pulls in into a single desktop program whose `main` replays what
//! `attachBaseContext` did on the device:
//!
//! 1. Rename fields, methods, parameters and locals apart
//! 2. Rename the entry class to the unpacker name
//! 3. Strip the base class, comment out superclass calls
//! 4. `attachBaseContext(Context c)` becomes `main(String[] args)`
//! 5. Comment out package lines
//! 6. Make methods and renamed fields static
//! 7. Drop `this.` qualifiers
//! 8. Rewrite platform APIs per import
//! 9. Comment out remaining platform imports
//! 10. Remove reflection from the merged source

use super::{
    comment_package_lines, comment_platform_imports, comment_super_calls, make_fields_static,
    make_methods_static, remove_self_references, rename_class, rewrite_entry_point,
    strip_base_class, IdentifierRenamer, ImportSubstitutions, ReflectionRemover, RemovalReport,
    RewriteBuffer, RewriteError, RuleContext,
};
use crate::analysis::{AnalysisLog, DependencyCollector};
use crate::config::SynthesisConfig;
use crate::facts::{ClassFact, PackageFacts};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("No Application subclass found")]
    ResolutionMiss,
    #[error("Rewrite failed: {0}")]
    Rewrite(#[from] RewriteError),
}

/// A synthesized standalone unpacker
#[derive(Debug, Clone)]
pub struct SynthesizedUnpacker {
    /// Simple name of the generated class
    pub class_name: String,
    /// `<entry package>.<class name>`
    pub qualified_name: String,
    /// Merged, rewritten source
    pub source: String,
    /// Classes merged into the source, entry point first
    pub classes: Vec<String>,
    /// Platform imports no rule could rewrite
    pub unhandled_imports: Vec<String>,
    pub removal: RemovalReport,
}

pub struct UnpackerSynthesizer {
    config: SynthesisConfig,
    substitutions: ImportSubstitutions,
    remover: ReflectionRemover,
}

impl UnpackerSynthesizer {
    pub fn new(config: SynthesisConfig) -> Self {
        let substitutions = ImportSubstitutions::new(config.platform_namespaces.clone());
        Self {
            config,
            substitutions,
            remover: ReflectionRemover::new(),
        }
    }

    /// `Unpacker_` plus the start of the package's file stem
    pub fn class_name_for(&self, package_path: &Path) -> String {
        let stem = package_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let name: String = stem
            .chars()
            .take(self.config.max_name_len)
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        format!("{}{}", self.config.class_prefix, name)
    }

    pub fn synthesize(
        &self,
        entry: Option<&ClassFact>,
        facts: &PackageFacts,
        package_path: &Path,
        log: &mut AnalysisLog,
    ) -> Result<SynthesizedUnpacker, SynthesisError> {
        let entry = entry.ok_or(SynthesisError::ResolutionMiss)?;
        let classes = DependencyCollector::new().collect(entry, facts, log);
        let class_name = self.class_name_for(package_path);

        let mut renamer = IdentifierRenamer::new()?;
        let inputs: Vec<(&str, &str)> = classes
            .iter()
            .map(|c| (c.simple_name.as_str(), c.source.as_str()))
            .collect();
        let renamed = renamer.rename_all(&inputs)?;

        let mut buffer = RewriteBuffer::new();
        for (class, renamed) in classes.iter().zip(renamed) {
            buffer.push(class.name.clone(), class.imports.clone(), renamed.source);
        }

        for index in 0..buffer.len() {
            if let Some(segment) = buffer.segment_mut(index) {
                segment.text = rename_class(&segment.text, &entry.simple_name, &class_name)?;
            }
        }

        if let Some(segment) = buffer.segment_mut(0) {
            let text = comment_super_calls(&strip_base_class(&segment.text));
            let rewrite = rewrite_entry_point(&text, &self.config.context_stand_in)?;
            match &rewrite.parameter {
                Some(parameter) => log.log(format!(
                    "Replaced {} uses of {} in main",
                    rewrite.replacements, parameter
                )),
                None => log.log("No attachBaseContext found in entry class"),
            }
            segment.text = rewrite.source;
        }

        buffer.map_segments(comment_package_lines);
        buffer.map_segments(make_methods_static);
        buffer.map_segments(make_fields_static);
        buffer.map_segments(remove_self_references);

        let context = RuleContext {
            package_path: package_path.display().to_string(),
            sdk_int: self.config.sdk_int,
        };
        let mut unhandled_imports: Vec<String> = Vec::new();
        for index in 0..buffer.len() {
            if let Some(segment) = buffer.segment_mut(index) {
                let (text, missed) =
                    self.substitutions
                        .apply(&segment.text, &segment.imports, &context, log);
                segment.text = text;
                for import in missed {
                    if !unhandled_imports.contains(&import) {
                        unhandled_imports.push(import);
                    }
                }
            }
        }

        let namespaces = &self.config.platform_namespaces;
        buffer.map_segments(|text| comment_platform_imports(text, namespaces));

        let (source, removal) = self.remover.remove(&buffer.merge(), log)?;

        let qualified_name = if entry.package.is_empty() {
            class_name.clone()
        } else {
            format!("{}.{}", entry.package, class_name)
        };
        log.log(format!(
            "Generated {} from {} classes",
            qualified_name,
            classes.len()
        ));
        if !unhandled_imports.is_empty() {
            log.list("Unhandled imports", &unhandled_imports);
        }

        Ok(SynthesizedUnpacker {
            class_name,
            qualified_name,
            source,
            classes: classes.iter().map(|c| c.name.clone()).collect(),
            unhandled_imports,
            removal,
        })
    }
}
