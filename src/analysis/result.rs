use super::detectors::DetectionReport;
use serde::Serialize;
use std::collections::BTreeSet;

/// How the hidden code gets restored at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackerType {
    /// Not packed
    #[default]
    None,
    /// Packed, restored through a managed-runtime class loader
    Managed,
    /// Packed, no managed loader in sight: restored from native code
    Native,
}

impl PackerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackerType::None => "NONE",
            PackerType::Managed => "MANAGED",
            PackerType::Native => "NATIVE",
        }
    }
}

impl std::fmt::Display for PackerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Namespaces that count as "the app's own" code
///
/// A package is inside the scope when it equals one of the namespaces or
/// starts with one followed by `.`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppScope {
    pub package_name: String,
    pub application_package: Option<String>,
}

impl AppScope {
    pub fn new(package_name: impl Into<String>, application_package: Option<String>) -> Self {
        Self {
            package_name: package_name.into(),
            application_package,
        }
    }

    pub fn contains(&self, package: &str) -> bool {
        is_sub_namespace(package, &self.package_name)
            || self
                .application_package
                .as_deref()
                .map(|ns| is_sub_namespace(package, ns))
                .unwrap_or(false)
    }
}

fn is_sub_namespace(package: &str, namespace: &str) -> bool {
    if namespace.is_empty() {
        return false;
    }
    package == namespace
        || (package.len() > namespace.len()
            && package.starts_with(namespace)
            && package.as_bytes()[namespace.len()] == b'.')
}

/// Columns of the batch summary table
pub const TSV_HEADER: &str = "package_name\tapplication_subclass_package_name\tpacker_type\t\
                              reflection\tdcl\treflection_in_app\tdcl_in_app";

/// Outcome of analyzing one package
///
/// The "in app" flags are only ever raised together with the matching "used"
/// flag; [`AnalysisResult::apply_dcl`] and [`AnalysisResult::apply_reflection`]
/// are the only writers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalysisResult {
    pub package_name: String,
    pub application_subclass_package_name: Option<String>,
    pub packer: PackerType,
    pub uses_reflection: bool,
    pub reflection_in_app: bool,
    pub uses_dcl: bool,
    pub dcl_in_app: bool,
    dcl_packages: BTreeSet<String>,
    reflective_packages: BTreeSet<String>,
}

impl AnalysisResult {
    pub fn new(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            ..Default::default()
        }
    }

    /// Fold a dynamic-code-loading detection into the result
    pub fn apply_dcl(&mut self, report: &DetectionReport) {
        if report.used {
            self.uses_dcl = true;
            self.dcl_in_app |= report.in_app;
            self.dcl_packages.extend(report.packages.iter().cloned());
        }
    }

    /// Fold a reflection detection (or removal) into the result
    pub fn apply_reflection(&mut self, report: &DetectionReport) {
        if report.used {
            self.uses_reflection = true;
            self.reflection_in_app |= report.in_app;
            self.reflective_packages
                .extend(report.packages.iter().cloned());
        }
    }

    /// Packages that load code dynamically, sorted
    pub fn dcl_packages(&self) -> Vec<String> {
        self.dcl_packages.iter().cloned().collect()
    }

    /// Packages that use reflection, sorted
    pub fn reflective_packages(&self) -> Vec<String> {
        self.reflective_packages.iter().cloned().collect()
    }

    fn app_subclass_package(&self) -> &str {
        self.application_subclass_package_name
            .as_deref()
            .unwrap_or("null")
    }

    /// One row of the batch summary table, newline terminated
    pub fn tsv_row(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
            self.package_name,
            self.app_subclass_package(),
            self.packer,
            yes_no(self.uses_reflection),
            yes_no(self.uses_dcl),
            yes_no(self.reflection_in_app),
            yes_no(self.dcl_in_app),
        )
    }

    /// `key=value` block written to `results/<package>.txt`
    pub fn file_representation(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("package_name={}\n", self.package_name));
        out.push_str(&format!(
            "application_subclass_package_name={}\n",
            self.app_subclass_package()
        ));
        out.push_str(&format!("packer_type={}\n", self.packer));
        out.push_str(&format!("reflection={}\n", yes_no(self.uses_reflection)));
        out.push_str(&format!("dcl={}\n", yes_no(self.uses_dcl)));
        out.push_str(&format!(
            "reflection_in_app={}\n",
            yes_no(self.reflection_in_app)
        ));
        out.push_str(&format!("dcl_in_app={}\n", yes_no(self.dcl_in_app)));

        for package in &self.reflective_packages {
            out.push_str(&format!("reflective_package_name={}\n", package));
        }
        for package in &self.dcl_packages {
            out.push_str(&format!("dcl_package_name={}\n", package));
        }

        out
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "YES"
    } else {
        "NO"
    }
}
