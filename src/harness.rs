//! Sequential script runner on top of the bridge.
//!
//! Scripts and their shared libraries are foreign modules. Libraries are
//! registered under a bridge-only root namespace (`validation` by default),
//! so scripts can `import validation.<library>`. Each script is then loaded
//! and its entry point is called with the project object:
//!
//! ```text
//! run(project)
//!   ├── install root            validation           (bridge-only)
//!   ├── register libraries      validation.<name>    (foreign-backed)
//!   ├── load scripts            failure → recorded, script skipped
//!   └── call entry points       failure → recorded, next script runs
//!         └── non-None result → project.handle_return_value
//! ```
//!
//! A failing script never stops the run. Failures are logged, reported to
//! the project, and collected in the [`RunReport`].

use crate::error::ImportResult;
use crate::foreign::{ForeignError, ForeignRef};
use crate::import::dotted::child_name;
use crate::import::{NamespaceNode, Registry};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Root namespace libraries are registered under. Scripts import libraries
/// through this name, so it must stay stable.
pub const ROOT_MODULE: &str = "validation";

/// Target kind attached to failures reported to the project.
pub const SCRIPT_TARGET_KIND: &str = "SCRIPT";

// =============================================================================
// Interfaces
// =============================================================================

/// A script file the host can execute.
pub trait Script: Send + Sync {
    /// Location of the script.
    fn path(&self) -> &str;

    /// Execute the script body and return the resulting module object.
    fn load(&self) -> Result<ForeignRef, ForeignError>;
}

/// The project object scripts operate on.
pub trait Project: Send + Sync {
    /// The value passed to each entry point.
    fn as_argument(&self) -> Value;

    /// Consume a non-`None` script return value.
    ///
    /// Returns the issues found in it. `Ok(None)` means the project could
    /// not produce an issue list at all, which is recorded as a run failure.
    fn handle_return_value(&self, value: &Value) -> Result<Option<Vec<Arc<str>>>, ForeignError>;

    /// Report a script failure to the project.
    ///
    /// Returns `false` when the project does not accept error reports.
    fn report_error(
        &self,
        title: &str,
        target: &ScriptTarget,
        message: &str,
    ) -> Result<bool, ForeignError> {
        let _ = (title, target, message);
        Ok(false)
    }
}

/// What a reported failure points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTarget {
    pub paths: Vec<Arc<str>>,
    pub kind: &'static str,
}

impl ScriptTarget {
    pub fn for_script(path: impl Into<Arc<str>>) -> Self {
        Self {
            paths: vec![path.into()],
            kind: SCRIPT_TARGET_KIND,
        }
    }
}

/// Function each script is expected to define.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    /// Validation scripts.
    Validate,
    /// Upgrade rules that change configurables.
    ConfigurationUpgrade,
    /// Upgrade rules that add or remove project components.
    ComponentUpgrade,
    Custom(Arc<str>),
}

impl EntryPoint {
    pub fn name(&self) -> &str {
        match self {
            EntryPoint::Validate => "validate",
            EntryPoint::ConfigurationUpgrade => "configuration_upgrade",
            EntryPoint::ComponentUpgrade => "component_upgrade",
            EntryPoint::Custom(name) => name,
        }
    }
}

impl From<&str> for EntryPoint {
    fn from(name: &str) -> Self {
        match name {
            "validate" => EntryPoint::Validate,
            "configuration_upgrade" => EntryPoint::ConfigurationUpgrade,
            "component_upgrade" => EntryPoint::ComponentUpgrade,
            other => EntryPoint::Custom(Arc::from(other)),
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A library module made importable as `<root>.<name>`.
#[derive(Clone)]
pub struct Library {
    pub name: Arc<str>,
    pub script: Arc<dyn Script>,
}

impl Library {
    pub fn new(name: impl Into<Arc<str>>, script: Arc<dyn Script>) -> Self {
        Self {
            name: name.into(),
            script,
        }
    }
}

// =============================================================================
// Report
// =============================================================================

/// Where a script failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureStage {
    Load,
    MissingEntryPoint,
    Run,
    ReturnIssue,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureStage::Load => "Could not load",
            FailureStage::MissingEntryPoint => "Missing entry point in",
            FailureStage::Run => "Could not run",
            FailureStage::ReturnIssue => "Return value issue in",
        })
    }
}

/// One recorded script failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{stage} {script} at {path}: {message}")]
pub struct ScriptFailure {
    pub script: Arc<str>,
    pub path: Arc<str>,
    pub stage: FailureStage,
    pub message: String,
    /// Foreign error behind the failure, if any.
    pub cause: Option<ForeignError>,
}

/// Outcome of [`ScriptRunner::run`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Scripts whose entry point was called, in order.
    pub ran: Vec<Arc<str>>,
    pub failures: Vec<ScriptFailure>,
    /// Number of non-`None` values handed to the project.
    pub return_values: usize,
}

impl RunReport {
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures_at(&self, stage: FailureStage) -> impl Iterator<Item = &ScriptFailure> {
        self.failures.iter().filter(move |f| f.stage == stage)
    }
}

// =============================================================================
// Runner
// =============================================================================

struct LoadedScript {
    name: Arc<str>,
    path: Arc<str>,
    module: ForeignRef,
}

/// Runs scripts one after another against a project.
pub struct ScriptRunner {
    registry: Arc<Registry>,
    root: Arc<str>,
    entry: EntryPoint,
    libraries: Vec<Library>,
    scripts: Vec<Arc<dyn Script>>,
}

impl ScriptRunner {
    pub fn new(registry: Arc<Registry>, entry: impl Into<EntryPoint>) -> Self {
        Self {
            registry,
            root: Arc::from(ROOT_MODULE),
            entry: entry.into(),
            libraries: Vec::new(),
            scripts: Vec::new(),
        }
    }

    /// Use a different root namespace.
    pub fn with_root(mut self, root: impl Into<Arc<str>>) -> Self {
        self.root = root.into();
        self
    }

    pub fn library(mut self, library: Library) -> Self {
        self.libraries.push(library);
        self
    }

    pub fn script(mut self, script: Arc<dyn Script>) -> Self {
        self.scripts.push(script);
        self
    }

    #[inline]
    pub fn entry_point(&self) -> &EntryPoint {
        &self.entry
    }

    /// Install the root, register libraries, then load and run every script.
    ///
    /// Only library failures abort the run; script failures are recorded.
    pub fn run(&self, project: &dyn Project) -> ImportResult<RunReport> {
        let root = self.install_root();
        for library in &self.libraries {
            self.install_library(&root, library)?;
        }

        let mut report = RunReport::default();
        let loaded = self.load_scripts(project, &mut report);
        for script in &loaded {
            self.run_script(project, script, &mut report);
        }

        tracing::debug!(
            ran = report.ran.len(),
            failures = report.failures.len(),
            "script run finished"
        );
        Ok(report)
    }

    /// Install a fresh bridge-only root namespace.
    fn install_root(&self) -> Arc<NamespaceNode> {
        self.registry.make_module(&self.root, None)
    }

    fn install_library(&self, root: &NamespaceNode, library: &Library) -> ImportResult<()> {
        let fqn = child_name(&self.root, &library.name);
        let handle = library.script.load().inspect_err(|err| {
            tracing::error!(
                library = %fqn,
                path = library.script.path(),
                error = %err,
                "library failed to load"
            );
        })?;
        let node = self.registry.register_foreign_module(&fqn, handle)?;
        root.set_attr(&library.name, Value::Module(node));
        tracing::debug!(library = %fqn, "library installed");
        Ok(())
    }

    fn load_scripts(&self, project: &dyn Project, report: &mut RunReport) -> Vec<LoadedScript> {
        let mut loaded = Vec::with_capacity(self.scripts.len());
        for script in &self.scripts {
            let name: Arc<str> = Arc::from(script_name(script.path()));
            let path: Arc<str> = Arc::from(script.path());
            match script.load() {
                Ok(module) => loaded.push(LoadedScript { name, path, module }),
                Err(err) => {
                    let message = format!("with exception {}", err);
                    self.record(
                        project,
                        report,
                        ScriptFailure {
                            script: name,
                            path,
                            stage: FailureStage::Load,
                            message,
                            cause: Some(err),
                        },
                    );
                }
            }
        }
        loaded
    }

    fn run_script(&self, project: &dyn Project, script: &LoadedScript, report: &mut RunReport) {
        tracing::debug!(script = %script.name, path = %script.path, "running script");
        let fail = |stage: FailureStage, message: String, cause: Option<ForeignError>| {
            ScriptFailure {
                script: Arc::clone(&script.name),
                path: Arc::clone(&script.path),
                stage,
                message,
                cause,
            }
        };

        let entry = match script.module.get_attr(self.entry.name()) {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                let message = format!(
                    "entry point '{}' not part of module {}",
                    self.entry, script.name
                );
                let failure = fail(FailureStage::MissingEntryPoint, message, None);
                self.record(project, report, failure);
                return;
            }
            Err(err) => {
                let message = format!("{} with exception {}", self.entry, err);
                self.record(project, report, fail(FailureStage::Run, message, Some(err)));
                return;
            }
        };

        let callable = match entry {
            Value::Foreign(callable) => callable,
            other => {
                let message =
                    format!("{} is a {}, not a function", self.entry, other.type_name());
                self.record(project, report, fail(FailureStage::Run, message, None));
                return;
            }
        };

        let result = match callable.call(&[project.as_argument()]) {
            Ok(result) => result,
            Err(err) => {
                let message = format!("{} with exception {}", self.entry, err);
                self.record(project, report, fail(FailureStage::Run, message, Some(err)));
                return;
            }
        };
        report.ran.push(Arc::clone(&script.name));
        tracing::debug!(script = %script.name, result = ?result, "script returned");

        if result.is_none() {
            return;
        }
        report.return_values += 1;
        match project.handle_return_value(&result) {
            Ok(Some(issues)) => {
                for issue in issues {
                    let failure = fail(FailureStage::ReturnIssue, issue.to_string(), None);
                    self.record(project, report, failure);
                }
            }
            // Nothing to report issues from: the call itself counts as failed.
            Ok(None) => {
                let message =
                    format!("{} with exception: project returned no issue list", self.entry);
                self.record(project, report, fail(FailureStage::Run, message, None));
            }
            Err(err) => {
                let message = format!("{} return value with exception {}", self.entry, err);
                self.record(project, report, fail(FailureStage::Run, message, Some(err)));
            }
        }
    }

    /// Log a failure, report it to the project, and keep it.
    fn record(&self, project: &dyn Project, report: &mut RunReport, failure: ScriptFailure) {
        tracing::warn!(
            script = %failure.script,
            path = %failure.path,
            stage = ?failure.stage,
            "{}",
            failure.message
        );

        let title = format!("Script Failure {}", failure.script);
        let target = ScriptTarget::for_script(Arc::clone(&failure.path));
        if let Err(err) = project.report_error(&title, &target, &failure.to_string()) {
            tracing::error!(
                script = %failure.script,
                error = %err,
                "cannot report failure to project"
            );
        }
        report.failures.push(failure);
    }
}

impl fmt::Debug for ScriptRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptRunner")
            .field("root", &self.root)
            .field("entry", &self.entry)
            .field("libraries", &self.libraries.len())
            .field("scripts", &self.scripts.len())
            .finish()
    }
}

/// Module name for a script path: the file name with `.py` stripped.
///
/// Both `/` and `\` count as separators.
pub fn script_name(path: &str) -> &str {
    let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
    file.strip_suffix(".py").unwrap_or(file)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foreign::ForeignObject;
    use parking_lot::Mutex;

    // =========================================================================
    // Mocks
    // =========================================================================

    /// Foreign function returning a fixed result.
    struct Function {
        result: Result<Value, ForeignError>,
        calls: Mutex<usize>,
    }

    impl ForeignObject for Function {
        fn type_name(&self) -> &str {
            "function"
        }

        fn get_attr(&self, _name: &str) -> Result<Option<Value>, ForeignError> {
            Ok(None)
        }

        fn call(&self, args: &[Value]) -> Result<Value, ForeignError> {
            assert_eq!(args.len(), 1);
            *self.calls.lock() += 1;
            self.result.clone()
        }
    }

    struct Module {
        attrs: Vec<(&'static str, Value)>,
    }

    impl ForeignObject for Module {
        fn type_name(&self) -> &str {
            "module"
        }

        fn get_attr(&self, name: &str) -> Result<Option<Value>, ForeignError> {
            Ok(self
                .attrs
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.clone()))
        }
    }

    struct FileScript {
        path: &'static str,
        module: Result<ForeignRef, ForeignError>,
    }

    impl Script for FileScript {
        fn path(&self) -> &str {
            self.path
        }

        fn load(&self) -> Result<ForeignRef, ForeignError> {
            self.module.clone()
        }
    }

    #[derive(Default)]
    struct RecordingProject {
        issues: Option<Vec<Arc<str>>>,
        reported: Mutex<Vec<(String, ScriptTarget)>>,
        returned: Mutex<Vec<Value>>,
    }

    impl Project for RecordingProject {
        fn as_argument(&self) -> Value {
            Value::str("project")
        }

        fn handle_return_value(
            &self,
            value: &Value,
        ) -> Result<Option<Vec<Arc<str>>>, ForeignError> {
            self.returned.lock().push(value.clone());
            Ok(self.issues.clone())
        }

        fn report_error(
            &self,
            title: &str,
            target: &ScriptTarget,
            _message: &str,
        ) -> Result<bool, ForeignError> {
            self.reported.lock().push((title.to_string(), target.clone()));
            Ok(true)
        }
    }

    fn function(result: Result<Value, ForeignError>) -> Arc<Function> {
        Arc::new(Function {
            result,
            calls: Mutex::new(0),
        })
    }

    fn script_with(path: &'static str, attrs: Vec<(&'static str, Value)>) -> Arc<dyn Script> {
        Arc::new(FileScript {
            path,
            module: Ok(Arc::new(Module { attrs })),
        })
    }

    // =========================================================================
    // Names
    // =========================================================================

    #[test]
    fn test_script_name() {
        assert_eq!(script_name("/proj/rules/check_pins.py"), "check_pins");
        assert_eq!(script_name("C:\\proj\\rules\\check_pins.py"), "check_pins");
        assert_eq!(script_name("check_pins"), "check_pins");
        assert_eq!(script_name("rules/data.pyc"), "data.pyc");
    }

    #[test]
    fn test_entry_point_names() {
        assert_eq!(EntryPoint::from("validate"), EntryPoint::Validate);
        assert_eq!(EntryPoint::ComponentUpgrade.name(), "component_upgrade");
        assert_eq!(EntryPoint::from("custom").name(), "custom");
    }

    // =========================================================================
    // Running
    // =========================================================================

    #[test]
    fn test_libraries_are_importable_under_root() {
        let registry = Arc::new(Registry::new());
        let helpers = script_with("/lib/helpers.py", vec![("VERSION", Value::Int(3))]);
        let runner = ScriptRunner::new(Arc::clone(&registry), EntryPoint::Validate)
            .library(Library::new("helpers", helpers));

        let report = runner.run(&RecordingProject::default()).unwrap();
        assert!(report.is_clean());

        let root = registry.get(ROOT_MODULE).unwrap();
        assert!(!root.is_foreign_backed());
        let helpers = root.get_attr("helpers").unwrap();
        let helpers = helpers.as_module().unwrap();
        assert_eq!(helpers.name(), "validation.helpers");
        assert_eq!(helpers.get_attr("VERSION").unwrap().as_int(), Some(3));
    }

    #[test]
    fn test_library_load_failure_aborts() {
        let registry = Arc::new(Registry::new());
        let broken: Arc<dyn Script> = Arc::new(FileScript {
            path: "/lib/broken.py",
            module: Err(ForeignError::new("SyntaxError", "invalid syntax")),
        });
        let runner = ScriptRunner::new(Arc::clone(&registry), EntryPoint::Validate)
            .library(Library::new("broken", broken));
        assert!(runner.run(&RecordingProject::default()).is_err());
        assert!(!registry.contains("validation.broken"));
    }

    #[test]
    fn test_scripts_run_in_order() {
        let registry = Arc::new(Registry::new());
        let first = function(Ok(Value::None));
        let second = function(Ok(Value::None));
        let runner = ScriptRunner::new(registry, EntryPoint::Validate)
            .script(script_with("/s/a.py", vec![("validate", Value::Foreign(first.clone()))]))
            .script(script_with("/s/b.py", vec![("validate", Value::Foreign(second.clone()))]));

        let project = RecordingProject::default();
        let report = runner.run(&project).unwrap();
        assert!(report.is_clean());
        let ran: Vec<&str> = report.ran.iter().map(|n| n.as_ref()).collect();
        assert_eq!(ran, vec!["a", "b"]);
        assert_eq!(*first.calls.lock(), 1);
        assert_eq!(*second.calls.lock(), 1);
        assert_eq!(report.return_values, 0);
        assert!(project.returned.lock().is_empty());
    }

    #[test]
    fn test_failures_do_not_stop_the_run() {
        let registry = Arc::new(Registry::new());
        let raising = function(Err(ForeignError::new("ValueError", "bad pin")));
        let last = function(Ok(Value::None));
        let unloadable: Arc<dyn Script> = Arc::new(FileScript {
            path: "/s/unloadable.py",
            module: Err(ForeignError::new("ImportError", "no module named foo")),
        });
        let runner = ScriptRunner::new(registry, EntryPoint::Validate)
            .script(unloadable)
            .script(script_with("/s/no_entry.py", vec![]))
            .script(script_with("/s/raising.py", vec![("validate", Value::Foreign(raising))]))
            .script(script_with("/s/last.py", vec![("validate", Value::Foreign(last.clone()))]));

        let project = RecordingProject::default();
        let report = runner.run(&project).unwrap();

        let stages: Vec<FailureStage> = report.failures.iter().map(|f| f.stage).collect();
        assert_eq!(
            stages,
            vec![FailureStage::Load, FailureStage::MissingEntryPoint, FailureStage::Run]
        );
        assert_eq!(report.failures[2].cause.as_ref().unwrap().kind(), "ValueError");
        assert_eq!(*last.calls.lock(), 1);
        assert_eq!(report.ran.len(), 1);

        let reported = project.reported.lock();
        assert_eq!(reported.len(), 3);
        assert_eq!(reported[0].0, "Script Failure unloadable");
        assert_eq!(reported[0].1, ScriptTarget::for_script("/s/unloadable.py"));
    }

    #[test]
    fn test_non_callable_entry_point() {
        let registry = Arc::new(Registry::new());
        let runner = ScriptRunner::new(registry, EntryPoint::Validate)
            .script(script_with("/s/odd.py", vec![("validate", Value::Int(1))]));
        let report = runner.run(&RecordingProject::default()).unwrap();
        assert_eq!(report.failures_at(FailureStage::Run).count(), 1);
        assert!(report.ran.is_empty());
    }

    #[test]
    fn test_return_values_reach_project() {
        let registry = Arc::new(Registry::new());
        let upgrade = function(Ok(Value::list([Value::str("change")])));
        let runner = ScriptRunner::new(registry, EntryPoint::ComponentUpgrade).script(script_with(
            "/s/upgrade.py",
            vec![("component_upgrade", Value::Foreign(upgrade))],
        ));

        let project = RecordingProject {
            issues: Some(vec![Arc::from("missing 'id' field")]),
            ..RecordingProject::default()
        };
        let report = runner.run(&project).unwrap();
        assert_eq!(report.return_values, 1);
        assert_eq!(project.returned.lock().len(), 1);

        let issues: Vec<&ScriptFailure> = report.failures_at(FailureStage::ReturnIssue).collect();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "missing 'id' field");
    }

    #[test]
    fn test_missing_issue_list_is_recorded() {
        let registry = Arc::new(Registry::new());
        let upgrade = function(Ok(Value::Int(1)));
        let runner = ScriptRunner::new(registry, "configuration_upgrade").script(script_with(
            "/s/cfg.py",
            vec![("configuration_upgrade", Value::Foreign(upgrade))],
        ));
        let report = runner.run(&RecordingProject::default()).unwrap();
        assert_eq!(report.failures_at(FailureStage::ReturnIssue).count(), 0);
        let run: Vec<&ScriptFailure> = report.failures_at(FailureStage::Run).collect();
        assert_eq!(run.len(), 1);
        assert!(run[0].to_string().starts_with("Could not run cfg"));
        assert!(run[0].message.contains("no issue list"));
        assert_eq!(report.ran.len(), 1);
    }

    #[test]
    fn test_custom_root() {
        let registry = Arc::new(Registry::new());
        let runner = ScriptRunner::new(Arc::clone(&registry), EntryPoint::Validate)
            .with_root("rules")
            .library(Library::new("util", script_with("/lib/util.py", vec![])));
        runner.run(&RecordingProject::default()).unwrap();
        assert!(registry.contains("rules"));
        assert!(registry.contains("rules.util"));
        assert!(!registry.contains(ROOT_MODULE));
    }

    #[test]
    fn test_failure_display() {
        let failure = ScriptFailure {
            script: Arc::from("check"),
            path: Arc::from("/s/check.py"),
            stage: FailureStage::Load,
            message: "with exception SyntaxError: bad".to_string(),
            cause: None,
        };
        assert_eq!(
            failure.to_string(),
            "Could not load check at /s/check.py: with exception SyntaxError: bad"
        );
    }
}
