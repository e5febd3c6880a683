use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::BTreeSet;
use tracing::debug;

/// Component elements whose `android:name` must resolve to a payload class
const COMPONENT_TAGS: &[&str] = &["activity", "service", "receiver", "provider"];

/// What the analysis needs out of AndroidManifest.xml
#[derive(Debug, Default, Clone)]
pub struct ManifestSummary {
    /// Package from the `<manifest package=...>` attribute
    pub package: Option<String>,

    /// Fully qualified `<application android:name>`, if declared
    pub application_class: Option<String>,

    /// Component classes, normalized to `a/b/C.class`
    pub component_classes: BTreeSet<String>,
}

/// Parser for AndroidManifest.xml files
pub struct ManifestParser;

impl ManifestParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse manifest text and extract declared component classes
    ///
    /// Malformed XML stops the scan and returns whatever was collected so
    /// far; decoded manifests from decompilers are not always well formed.
    pub fn parse(&self, contents: &str) -> ManifestSummary {
        let mut summary = ManifestSummary::default();
        let mut components: Vec<String> = Vec::new();
        let mut reader = Reader::from_str(contents);
        reader.trim_text(true);

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                    let tag_name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                    if tag_name == "manifest" {
                        for attr in e.attributes().filter_map(|a| a.ok()) {
                            if attr.key.as_ref() == b"package" {
                                summary.package =
                                    Some(String::from_utf8_lossy(&attr.value).to_string());
                            }
                        }
                    }

                    let is_component = COMPONENT_TAGS.contains(&tag_name.as_str());
                    if is_component || tag_name == "application" {
                        for attr in e.attributes().filter_map(|a| a.ok()) {
                            let key = String::from_utf8_lossy(attr.key.as_ref());
                            if key == "android:name" {
                                let value = String::from_utf8_lossy(&attr.value).to_string();
                                if is_component {
                                    components.push(value);
                                } else {
                                    summary.application_class = Some(value);
                                }
                            }
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    debug!("Error parsing manifest: {:?}", e);
                    break;
                }
                _ => {}
            }
            buf.clear();
        }

        // The package attribute precedes components in practice, but resolve
        // after the scan so attribute order never matters.
        for value in components {
            let class_name = self.resolve_class_name(&value, &summary.package);
            summary.component_classes.insert(normalize_class_name(&class_name));
        }
        summary.application_class = summary
            .application_class
            .take()
            .map(|name| self.resolve_class_name(&name, &summary.package));

        debug!(
            "Parsed manifest: package {:?}, {} component classes",
            summary.package,
            summary.component_classes.len()
        );

        summary
    }

    /// Resolve a class name, handling relative names like ".MainActivity"
    fn resolve_class_name(&self, name: &str, package: &Option<String>) -> String {
        if let Some(relative) = name.strip_prefix('.') {
            // Relative class name
            if let Some(pkg) = package {
                format!("{}.{}", pkg, relative)
            } else {
                relative.to_string()
            }
        } else if !name.contains('.') {
            // Simple class name, assume same package
            if let Some(pkg) = package {
                format!("{}.{}", pkg, name)
            } else {
                name.to_string()
            }
        } else {
            // Fully qualified name
            name.to_string()
        }
    }
}

impl Default for ManifestParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a dotted class name to the `a/b/C.class` payload form
pub fn normalize_class_name(name: &str) -> String {
    format!("{}.class", name.replace('.', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        let parser = ManifestParser::new();
        let manifest = r#"
            <?xml version="1.0" encoding="utf-8"?>
            <manifest xmlns:android="http://schemas.android.com/apk/res/android"
                package="com.example.app">
                <application android:name=".MyApplication">
                    <activity android:name=".MainActivity" />
                    <service android:name="com.other.SyncService" />
                    <receiver android:name="BootReceiver" />
                    <meta-data android:name="ignored.Value" />
                </application>
            </manifest>
        "#;

        let summary = parser.parse(manifest);

        assert_eq!(summary.package.as_deref(), Some("com.example.app"));
        assert_eq!(
            summary.application_class.as_deref(),
            Some("com.example.app.MyApplication")
        );
        assert!(summary
            .component_classes
            .contains("com/example/app/MainActivity.class"));
        assert!(summary.component_classes.contains("com/other/SyncService.class"));
        assert!(summary
            .component_classes
            .contains("com/example/app/BootReceiver.class"));
        assert_eq!(summary.component_classes.len(), 3);
    }

    #[test]
    fn test_resolve_class_name() {
        let parser = ManifestParser::new();
        let package = Some("com.example".to_string());

        assert_eq!(
            parser.resolve_class_name(".MainActivity", &package),
            "com.example.MainActivity"
        );
        assert_eq!(
            parser.resolve_class_name("com.other.Activity", &package),
            "com.other.Activity"
        );
    }

    #[test]
    fn test_malformed_manifest_keeps_partial_result() {
        let parser = ManifestParser::new();
        let manifest = r#"<manifest package="a.b"><activity android:name=".Main"/><oops"#;

        let summary = parser.parse(manifest);
        assert!(summary.component_classes.contains("a/b/Main.class"));
    }
}
