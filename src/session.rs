//! # Editor Session
//!
//! Everything one editor session owns: configuration, block registry,
//! package list, descriptor load progress and the current program. Created
//! when the editor starts and dropped when it goes away.

use crate::archive::{package_archive, ExportArchive};
use crate::block::Program;
use crate::codegen::{register_builtin_blocks, STANDARD_IMPORT_CANDIDATES};
use crate::compiler::compile_program_with_candidates;
use crate::config::SessionConfig;
use crate::error::Result;
use crate::metadata::{
    load_function_blocks, load_struct_blocks, parse_function_descriptors, parse_struct_descriptors, LoadReport,
};
use crate::packages::PackageList;
use crate::registry::BlockRegistry;
use crate::remote::{DescriptorSource, HttpDescriptorSource, HttpProgramStorage, ProgramStorage};
use crate::storage::{backup_program, restore_program, KeyValueStore};
use std::collections::BTreeMap;

/// Which descriptor sets of a package have been processed, successfully or
/// not
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackageLoadState {
    pub functions_done: bool,
    pub structs_done: bool,
}

impl PackageLoadState {
    pub fn is_complete(&self) -> bool {
        self.functions_done && self.structs_done
    }
}

#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    registry: BlockRegistry,
    packages: PackageList,
    load_state: BTreeMap<String, PackageLoadState>,
    program: Program,
}

impl Session {
    /// Session with the built-in blocks and an empty package list
    pub fn new(config: SessionConfig) -> Self {
        Self::with_packages(config, PackageList::new())
    }

    pub fn with_packages(config: SessionConfig, packages: PackageList) -> Self {
        let mut registry = BlockRegistry::new();
        register_builtin_blocks(&mut registry);
        tracing::info!(
            "[GOBLOCKS] Session started ({} built-in blocks, {} packages)",
            registry.len(),
            packages.len()
        );
        Self {
            config,
            registry,
            packages,
            load_state: BTreeMap::new(),
            program: Program::new(),
        }
    }

    /// Session whose package list is read from `store`
    pub fn open(config: SessionConfig, store: &dyn KeyValueStore) -> Result<Self> {
        let packages = PackageList::load(store, &config.package_list_key)?;
        Ok(Self::with_packages(config, packages))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut BlockRegistry {
        &mut self.registry
    }

    pub fn packages(&self) -> &PackageList {
        &self.packages
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Add a package and persist the list. Its blocks become available after
    /// its descriptors are loaded.
    pub fn add_package(&mut self, path: &str, store: &mut dyn KeyValueStore) -> Result<bool> {
        let added = self.packages.add(path)?;
        if added {
            self.packages.save(store, &self.config.package_list_key)?;
        }
        Ok(added)
    }

    /// Remove a package and persist the list. Blocks already registered from
    /// it stay until the next session.
    pub fn remove_package(&mut self, path: &str, store: &mut dyn KeyValueStore) -> Result<bool> {
        let removed = self.packages.remove(path);
        if removed {
            self.load_state.remove(path.trim());
            self.packages.save(store, &self.config.package_list_key)?;
        }
        Ok(removed)
    }

    /// Standard packages followed by the package list
    pub fn import_candidates(&self) -> Vec<String> {
        let mut candidates: Vec<String> = STANDARD_IMPORT_CANDIDATES.iter().map(|p| p.to_string()).collect();
        for path in &self.packages {
            if !candidates.contains(path) {
                candidates.push(path.clone());
            }
        }
        candidates
    }

    fn package_index(&self, import_path: &str) -> usize {
        self.packages
            .iter()
            .position(|p| p == import_path)
            .unwrap_or(self.packages.len())
    }

    /// Register function blocks from a `/map` response
    pub fn register_functions(&mut self, import_path: &str, json: &str) -> Result<LoadReport> {
        self.load_state.entry(import_path.to_string()).or_default().functions_done = true;
        let descriptors = parse_function_descriptors(json)?;
        let index = self.package_index(import_path);
        Ok(load_function_blocks(
            &mut self.registry,
            import_path,
            index,
            &descriptors,
            &self.config,
        ))
    }

    /// Register struct blocks from a `/map_struct` response
    pub fn register_structs(&mut self, import_path: &str, json: &str) -> Result<LoadReport> {
        self.load_state.entry(import_path.to_string()).or_default().structs_done = true;
        let descriptors = parse_struct_descriptors(json)?;
        let index = self.package_index(import_path);
        Ok(load_struct_blocks(
            &mut self.registry,
            import_path,
            index,
            &descriptors,
            &self.config,
        ))
    }

    /// Fetch and register the descriptors of every listed package. A package
    /// that fails to load is recorded in the report and does not stop the
    /// others.
    pub fn load_packages(&mut self, source: &dyn DescriptorSource) -> LoadReport {
        let mut report = LoadReport::default();
        let paths: Vec<String> = self.packages.paths().to_vec();

        for path in &paths {
            let functions = source
                .fetch_functions(path)
                .and_then(|json| self.register_functions(path, &json));
            match functions {
                Ok(loaded) => report.merge(loaded),
                Err(e) => {
                    self.load_state.entry(path.clone()).or_default().functions_done = true;
                    tracing::warn!("[GOBLOCKS] Failed to load functions of {}: {}", path, e);
                    report.skipped.push(format!("{}: {}", path, e));
                }
            }

            let structs = source
                .fetch_structs(path)
                .and_then(|json| self.register_structs(path, &json));
            match structs {
                Ok(loaded) => report.merge(loaded),
                Err(e) => {
                    self.load_state.entry(path.clone()).or_default().structs_done = true;
                    tracing::warn!("[GOBLOCKS] Failed to load structs of {}: {}", path, e);
                    report.skipped.push(format!("{}: {}", path, e));
                }
            }
        }

        tracing::info!(
            "[GOBLOCKS] Packages loaded: {} blocks registered, {} problems",
            report.registered.len(),
            report.skipped.len()
        );
        report
    }

    pub fn load_state(&self, import_path: &str) -> PackageLoadState {
        self.load_state.get(import_path).copied().unwrap_or_default()
    }

    /// True once every listed package has been processed
    pub fn is_ready(&self) -> bool {
        self.packages.iter().all(|path| self.load_state(path).is_complete())
    }

    pub fn set_program(&mut self, program: Program) {
        self.program = program;
    }

    /// Replace the current program with serialized program data. On error
    /// the current program is kept.
    pub fn load_program_json(&mut self, text: &str) -> Result<()> {
        let program = Program::from_json(text)?;
        self.program = program;
        Ok(())
    }

    pub fn compile(&self) -> Result<String> {
        self.compile_program(&self.program)
    }

    pub fn compile_program(&self, program: &Program) -> Result<String> {
        let candidates = self.import_candidates();
        compile_program_with_candidates(&self.registry, &candidates, program, &self.config)
    }

    /// Compile the current program and package it for download
    pub fn export(&self, package_name: &str) -> Result<ExportArchive> {
        let code = self.compile()?;
        package_archive(&code, package_name, &self.config.entry_path)
    }

    pub fn backup(&self, store: &mut dyn KeyValueStore, url: &str) -> Result<()> {
        backup_program(store, url, &self.program)
    }

    /// Restore the page's backup. Returns false when there is none.
    pub fn restore(&mut self, store: &dyn KeyValueStore, url: &str) -> Result<bool> {
        match restore_program(store, url)? {
            Some(program) => {
                self.program = program;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Metadata endpoints at the configured base URL
    pub fn descriptor_source(&self) -> HttpDescriptorSource {
        HttpDescriptorSource::new(self.config.base_url.clone())
    }

    /// Storage endpoint at the configured base URL
    pub fn program_storage(&self) -> HttpProgramStorage {
        HttpProgramStorage::new(&self.config.base_url)
    }

    /// Save the current program to shared storage and return its key. A
    /// program made of a single root block is shared without its canvas
    /// position.
    pub fn share(&self, storage: &dyn ProgramStorage) -> Result<String> {
        let mut shared = self.program.clone();
        if let [root] = shared.blocks.as_mut_slice() {
            root.position = None;
        }
        storage.save(&shared.to_json()?)
    }

    /// Replace the current program with the one stored under `key`
    pub fn open_shared(&mut self, storage: &dyn ProgramStorage, key: &str) -> Result<()> {
        let text = storage.retrieve(key)?;
        self.load_program_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockInstance;
    use crate::error::GoBlocksError;
    use crate::storage::MemoryStore;
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct FakeSource {
        functions: HashMap<String, String>,
        structs: HashMap<String, String>,
    }

    impl DescriptorSource for FakeSource {
        fn fetch_functions(&self, import_path: &str) -> Result<String> {
            self.functions.get(import_path).cloned().ok_or_else(|| GoBlocksError::Transport {
                url: format!("/map?name={}", import_path),
                status: 404,
            })
        }

        fn fetch_structs(&self, import_path: &str) -> Result<String> {
            Ok(self.structs.get(import_path).cloned().unwrap_or_else(|| "[{}]".to_string()))
        }
    }

    #[derive(Default)]
    struct FakeStorage {
        saved: RefCell<HashMap<String, String>>,
    }

    impl ProgramStorage for FakeStorage {
        fn save(&self, program_json: &str) -> Result<String> {
            let mut saved = self.saved.borrow_mut();
            let key = format!("k{}", saved.len());
            saved.insert(key.clone(), program_json.to_string());
            Ok(key)
        }

        fn retrieve(&self, key: &str) -> Result<String> {
            self.saved
                .borrow()
                .get(key)
                .cloned()
                .ok_or_else(|| GoBlocksError::UnknownStorageKey(key.to_string()))
        }
    }

    fn session_with(paths: &[&str]) -> Session {
        let mut packages = PackageList::new();
        for path in paths {
            packages.add(path).unwrap();
        }
        Session::with_packages(SessionConfig::default(), packages)
    }

    #[test]
    fn test_open_reads_package_list() {
        let mut store = MemoryStore::new();
        store.set("pkgs", "fmt,net/http").unwrap();
        let session = Session::open(SessionConfig::default(), &store).unwrap();
        assert_eq!(session.packages().len(), 2);
        assert!(session.registry().contains("main"));
    }

    #[test]
    fn test_package_changes_are_persisted() {
        let mut store = MemoryStore::new();
        let mut session = Session::new(SessionConfig::default());
        assert!(session.add_package("net/http", &mut store).unwrap());
        assert!(session.add_package("fmt", &mut store).unwrap());
        assert!(session.remove_package("net/http", &mut store).unwrap());
        assert_eq!(store.get("pkgs").unwrap().as_deref(), Some("fmt"));
    }

    #[test]
    fn test_import_candidates_order() {
        let session = session_with(&["fmt", "log", "net/http"]);
        assert_eq!(
            session.import_candidates(),
            vec!["context", "log", "os", "os/signal", "time", "strings", "fmt", "net/http"]
        );
    }

    #[test]
    fn test_ready_after_all_packages_processed() {
        let mut session = session_with(&["fmt", "net/http"]);
        assert!(!session.is_ready());
        assert!(Session::new(SessionConfig::default()).is_ready());

        let source = FakeSource {
            functions: HashMap::from([(
                "fmt".to_string(),
                r#"[{"namespace": "fmt", "name": "Println", "params": "a ...any"}, {}]"#.to_string(),
            )]),
            structs: HashMap::new(),
        };
        let report = session.load_packages(&source);

        assert_eq!(report.registered, vec!["fmt_Println"]);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].starts_with("net/http"));
        assert!(session.is_ready());
        assert!(session.registry().contains("fmt_Println"));
    }

    #[test]
    fn test_colour_follows_package_position() {
        let mut session = session_with(&["fmt", "net/http"]);
        session
            .register_functions("net/http", r#"[{"namespace": "http", "name": "Get", "params": "url string"}]"#)
            .unwrap();
        assert_eq!(session.registry().lookup("http_Get").unwrap().descriptor.colour, 80);
        assert!(session.load_state("net/http").functions_done);
        assert!(!session.load_state("net/http").structs_done);
    }

    #[test]
    fn test_malformed_program_keeps_current() {
        let mut session = Session::new(SessionConfig::default());
        let mut program = Program::new();
        program.add_block(BlockInstance::new("m", "main"));
        session.set_program(program.clone());

        let err = session.load_program_json("not json").unwrap_err();
        assert!(matches!(err, GoBlocksError::MalformedProgram(_)));
        assert_eq!(session.program(), &program);
    }

    #[test]
    fn test_share_and_open_shared() {
        let storage = FakeStorage::default();
        let mut session = Session::new(SessionConfig::default());
        let mut program = Program::new();
        program.add_block(BlockInstance::new("m", "main"));
        session.set_program(program.clone());

        let key = session.share(&storage).unwrap();
        let mut other = Session::new(SessionConfig::default());
        other.open_shared(&storage, &key).unwrap();
        assert_eq!(other.program(), &program);
        assert!(matches!(
            other.open_shared(&storage, "missing"),
            Err(GoBlocksError::UnknownStorageKey(_))
        ));
        assert_eq!(other.program(), &program);
    }

    #[test]
    fn test_share_drops_position_of_single_root() {
        let storage = FakeStorage::default();
        let mut session = Session::new(SessionConfig::default());

        let mut single = Program::new();
        single.add_block(BlockInstance::new("m", "main").at(120.0, 45.0));
        session.set_program(single);
        let key = session.share(&storage).unwrap();
        let shared = Program::from_json(&storage.retrieve(&key).unwrap()).unwrap();
        assert_eq!(shared.blocks[0].position, None);
        assert!(session.program().blocks[0].position.is_some());

        let mut pair = Program::new();
        pair.add_block(BlockInstance::new("m", "main").at(0.0, 0.0));
        pair.add_block(BlockInstance::new("g", "go").at(0.0, 200.0));
        session.set_program(pair.clone());
        let key = session.share(&storage).unwrap();
        assert_eq!(Program::from_json(&storage.retrieve(&key).unwrap()).unwrap(), pair);
    }

    #[test]
    fn test_http_collaborators_use_configured_base_url() {
        let config = SessionConfig {
            base_url: "http://blocks.example:8000/".to_string(),
            ..SessionConfig::default()
        };
        let session = Session::new(config);
        assert_eq!(session.descriptor_source().base_url(), "http://blocks.example:8000/");
        assert_eq!(session.program_storage().url(), "http://blocks.example:8000/storage");
    }

    #[test]
    fn test_import_uses_declared_package_name() {
        let mut session = session_with(&["github.com/mattn/go-sqlite3", "github.com/acme/tools/gen"]);
        session
            .register_functions("github.com/mattn/go-sqlite3", r#"[{"namespace": "sqlite3", "name": "Version"}, {}]"#)
            .unwrap();
        session
            .register_functions("github.com/acme/tools/gen", r#"[{"namespace": "generator", "name": "Run"}, {}]"#)
            .unwrap();

        let mut program = Program::new();
        program.add_block(
            BlockInstance::new("m", "main")
                .with_statement("children", BlockInstance::new("v", "sqlite3_Version"))
                .with_statement("children", BlockInstance::new("r", "generator_Run")),
        );

        let code = session.compile_program(&program).unwrap();
        assert!(
            code.contains("import (\n\t\"github.com/mattn/go-sqlite3\"\n\t\"github.com/acme/tools/gen\"\n)\n"),
            "imports missing in:\n{}",
            code
        );
        assert!(code.ends_with("func main() {\n\tsqlite3.Version\n\tgenerator.Run\n}\n"));
    }

    #[test]
    fn test_backup_restore_and_export() {
        let mut store = MemoryStore::new();
        let mut session = Session::new(SessionConfig::default());
        let mut program = Program::new();
        program.add_block(BlockInstance::new("m", "main"));
        session.set_program(program);
        session.backup(&mut store, "http://host/#abc").unwrap();

        let mut restored = Session::new(SessionConfig::default());
        assert!(restored.restore(&store, "http://host/").unwrap());
        assert_eq!(restored.compile().unwrap(), session.compile().unwrap());

        let archive = restored.export("example.com/demo").unwrap();
        assert_eq!(archive.file_name, "example.com.demo.zip");
        assert!(!archive.bytes.is_empty());
    }
}
