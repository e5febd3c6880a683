use super::AnalysisLog;
use crate::facts::{ClassFact, PackageFacts};
use tracing::warn;

/// Platform base class of an app's entry point
pub const APPLICATION_BASE_CLASS: &str = "android.app.Application";

/// Finds the app's `Application` subclass
///
/// When several classes qualify, the one named by the manifest's
/// `<application android:name>` wins, then the smallest qualified name.
pub struct EntryPointResolver {
    base_class: String,
}

impl EntryPointResolver {
    pub fn new() -> Self {
        Self {
            base_class: APPLICATION_BASE_CLASS.to_string(),
        }
    }

    pub fn with_base_class(mut self, base_class: impl Into<String>) -> Self {
        self.base_class = base_class.into();
        self
    }

    fn simple_base_name(&self) -> &str {
        self.base_class
            .rsplit('.')
            .next()
            .unwrap_or(&self.base_class)
    }

    /// Whether `class` directly extends the base class
    pub fn extends_base(&self, class: &ClassFact) -> bool {
        match class.superclass.as_deref() {
            Some(sup) if sup == self.base_class => true,
            // Unresolved bare name, accepted only with the matching import
            Some(sup) if sup == self.simple_base_name() => {
                class.imports.iter().any(|i| *i == self.base_class)
            }
            _ => false,
        }
    }

    pub fn resolve<'f>(
        &self,
        facts: &'f PackageFacts,
        preferred: Option<&str>,
        log: &mut AnalysisLog,
    ) -> Option<&'f ClassFact> {
        // Facts are sorted by name, so the first candidate is the smallest
        let candidates: Vec<&ClassFact> = facts
            .classes
            .iter()
            .filter(|c| self.extends_base(c))
            .collect();

        if candidates.len() > 1 {
            let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
            warn!("Multiple Application subclasses: {}", names.join(", "));
            log.list("Application subclass candidates", &names);
        }

        let chosen = preferred
            .and_then(|name| candidates.iter().find(|c| c.name == name))
            .or_else(|| candidates.first())
            .copied();

        if let Some(class) = chosen {
            log.log(format!("Found Application subclass: {}", class.name));
        }

        chosen
    }
}

impl Default for EntryPointResolver {
    fn default() -> Self {
        Self::new()
    }
}
